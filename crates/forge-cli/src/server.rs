use std::path::{Path, PathBuf};
use std::sync::Arc;

use forge_client::prompt::EXAMPLE_PROMPTS;
use forge_client::{BackendError, Config, GeminiBackend, Orchestrator};
use forge_core::{InventionOutput, Lighting, project_energy, project_speed};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::report;
use crate::shell::{Outcome, Shell};
use crate::viewer::{ModelViewer, ViewerStatus};

#[derive(Clone)]
pub struct ForgeServer {
    shell: Arc<Shell<GeminiBackend>>,
    viewer: Arc<Mutex<Option<ModelViewer>>>,
    tool_router: ToolRouter<Self>,
}

impl ForgeServer {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let backend = GeminiBackend::new(config)?;
        let orchestrator = Orchestrator::new(backend, config.generate_images);
        Ok(Self {
            shell: Arc::new(Shell::new(Arc::new(orchestrator))),
            viewer: Arc::new(Mutex::new(None)),
            tool_router: Self::tool_router(),
        })
    }

    /// Release the viewer's scene before the process exits.
    pub async fn shutdown(&self) {
        if let Some(viewer) = self.viewer.lock().await.take() {
            viewer.dispose().await;
        }
    }

    fn summary(output: &InventionOutput) -> serde_json::Value {
        json!({
            "title": output.title(),
            "stability_percentage": output.stability_percentage,
            "has_image": output.image_url.is_some(),
            "speed_points": project_speed(output.propulsion_phases()).map_or(0, |c| c.points.len()),
            "energy_bars": project_energy(output.energy_requirements()).map_or(0, |c| c.bars.len()),
            "components": output.model_params.as_ref().map_or(0, |m| m.components.len()),
        })
    }

    fn outcome_json(outcome: &Outcome) -> serde_json::Value {
        match outcome {
            Outcome::Ignored => json!({
                "status": "ignored",
                "reason": "empty input, nothing to refine, or a request is already in progress",
            }),
            Outcome::Completed(output) => {
                let mut value = Self::summary(output);
                value["status"] = json!("completed");
                value["document"] = json!(report::terminal_text(output));
                value
            }
            Outcome::Failed { message, restored } => json!({
                "status": "failed",
                "error": message,
                "restored_previous": restored,
            }),
            Outcome::Detached => json!({ "status": "detached" }),
        }
    }

    /// Keep an open viewer on the latest model.
    async fn sync_viewer(&self, outcome: &Outcome) {
        let Outcome::Completed(output) = outcome else {
            return;
        };
        let Some(params) = &output.model_params else {
            return;
        };
        if let Some(viewer) = self.viewer.lock().await.as_ref()
            && let Err(e) = viewer
                .set_params(params.clone(), output.image_url.clone())
                .await
        {
            tracing::warn!("viewer update failed: {e}");
        }
    }

    /// Run one export against the current output. Failures come back as an
    /// `alert` field, not a tool error.
    fn export(
        &self,
        path: Option<String>,
        extension: &str,
        write: fn(&InventionOutput, &Path) -> anyhow::Result<()>,
    ) -> serde_json::Value {
        let Some(output) = self.shell.output() else {
            return json!({ "alert": "nothing to export yet; generate an invention first" });
        };
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| default_export_path(&output, extension));
        match write(&output, &path) {
            Ok(()) => json!({ "path": path.display().to_string() }),
            Err(e) => {
                tracing::warn!("export failed: {e:#}");
                json!({ "alert": format!("{e:#}") })
            }
        }
    }

    fn viewer_json(status: &ViewerStatus) -> serde_json::Value {
        serde_json::to_value(status).unwrap_or_default()
    }
}

/// Bare file name in the working directory, derived from the title.
fn default_export_path(output: &InventionOutput, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}{extension}", output.file_stem()))
}

fn ok_json(value: &serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

fn viewer_closed(e: impl std::fmt::Display) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct GenerateRequest {
    /// Free-text description of the invention to create
    prompt: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RefineRequest {
    /// How to change the current invention
    instruction: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ExportRequest {
    /// Destination file. Defaults to the invention title in the working
    /// directory.
    path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ViewerCommandRequest {
    /// One of "resize", "lighting", "start", "stop"
    command: String,
    /// Viewport width in pixels (resize)
    width: Option<u32>,
    /// Viewport height in pixels (resize)
    height: Option<u32>,
    /// Ambient light intensity (lighting)
    ambient: Option<f32>,
    /// Directional light intensity (lighting)
    directional: Option<f32>,
}

#[tool_router]
impl ForgeServer {
    #[tool(
        description = "Generate a new interstellar propulsion invention from a free-text prompt. Replaces the current invention. Returns the formatted document plus a summary of its charts, timeline and 3D model. Rejected as a no-op while another request is in progress."
    )]
    async fn forge_generate(
        &self,
        Parameters(req): Parameters<GenerateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self.shell.generate(&req.prompt).await;
        self.sync_viewer(&outcome).await;
        ok_json(&Self::outcome_json(&outcome))
    }

    #[tool(
        description = "Rewrite the current invention following an instruction. On failure the previous invention is kept. Requires an existing invention."
    )]
    async fn forge_refine(
        &self,
        Parameters(req): Parameters<RefineRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self.shell.refine(&req.instruction).await;
        self.sync_viewer(&outcome).await;
        ok_json(&Self::outcome_json(&outcome))
    }

    #[tool(description = "Current view state: loading flag, last error, current invention summary and whether the 3D viewer is open.")]
    async fn forge_status(&self) -> Result<CallToolResult, McpError> {
        let state = self.shell.snapshot();
        let viewer = match self.viewer.lock().await.as_ref() {
            Some(viewer) => viewer.status().await.ok().map(|s| Self::viewer_json(&s)),
            None => None,
        };
        ok_json(&json!({
            "loading": state.is_loading(),
            "pending": state.pending.map(|k| k.as_str()),
            "error": state.error,
            "last_request": state.last_request.map(|id| id.to_string()),
            "invention": state.output.as_deref().map(Self::summary),
            "viewer": viewer,
        }))
    }

    #[tool(description = "Export the 3D model of the current invention as a binary glTF (.glb) file.")]
    async fn forge_export_model(
        &self,
        Parameters(req): Parameters<ExportRequest>,
    ) -> Result<CallToolResult, McpError> {
        ok_json(&self.export(req.path, ".glb", report::write_model))
    }

    #[tool(
        description = "Export the full invention document (text, stability, static timeline, charts, concept image) as a self-contained HTML file."
    )]
    async fn forge_export_document(
        &self,
        Parameters(req): Parameters<ExportRequest>,
    ) -> Result<CallToolResult, McpError> {
        ok_json(&self.export(req.path, ".html", report::write_document))
    }

    #[tool(description = "Export the animated mission timeline as a self-contained HTML file.")]
    async fn forge_export_simulation(
        &self,
        Parameters(req): Parameters<ExportRequest>,
    ) -> Result<CallToolResult, McpError> {
        ok_json(&self.export(req.path, "-simulation.html", report::write_simulation))
    }

    #[tool(
        description = "Open the live 3D viewer on the current invention's model. Replaces a viewer that is already open."
    )]
    async fn forge_open_viewer(&self) -> Result<CallToolResult, McpError> {
        let output = self.shell.output();
        let Some(params) = output.as_ref().and_then(|o| o.model_params.as_ref()) else {
            return Err(McpError::invalid_params(
                "no model to view; generate an invention first".to_string(),
                None,
            ));
        };
        let image_url = output.as_ref().and_then(|o| o.image_url.as_deref());

        let mut slot = self.viewer.lock().await;
        if let Some(old) = slot.take() {
            old.dispose().await;
        }
        let viewer = ModelViewer::spawn(Some(params), image_url);
        let status = viewer.status().await.map_err(viewer_closed)?;
        *slot = Some(viewer);
        ok_json(&Self::viewer_json(&status))
    }

    #[tool(
        description = "Send a command to the open 3D viewer: resize (width, height), lighting (ambient, directional), start or stop auto-rotation."
    )]
    async fn forge_viewer_command(
        &self,
        Parameters(req): Parameters<ViewerCommandRequest>,
    ) -> Result<CallToolResult, McpError> {
        let slot = self.viewer.lock().await;
        let Some(viewer) = slot.as_ref() else {
            return Err(McpError::invalid_params(
                "viewer is not open".to_string(),
                None,
            ));
        };

        let status = match req.command.as_str() {
            "resize" => match (req.width, req.height) {
                (Some(width), Some(height)) => viewer.resize(width, height).await,
                _ => {
                    return Err(McpError::invalid_params(
                        "resize needs width and height".to_string(),
                        None,
                    ));
                }
            },
            "lighting" => {
                let current = viewer.status().await.map_err(viewer_closed)?.lighting;
                viewer
                    .set_lighting(Lighting {
                        ambient_intensity: req.ambient.unwrap_or(current.ambient),
                        directional_intensity: req.directional.unwrap_or(current.directional),
                        ..Lighting::default()
                    })
                    .await
            }
            "start" => viewer.start().await,
            "stop" => viewer.stop().await,
            other => {
                return Err(McpError::invalid_params(
                    format!("unknown viewer command '{other}', expected resize, lighting, start or stop"),
                    None,
                ));
            }
        }
        .map_err(viewer_closed)?;

        ok_json(&Self::viewer_json(&status))
    }

    #[tool(description = "Close the 3D viewer and release its scene resources.")]
    async fn forge_close_viewer(&self) -> Result<CallToolResult, McpError> {
        let Some(viewer) = self.viewer.lock().await.take() else {
            return ok_json(&json!({ "closed": false }));
        };
        let tracker = viewer.tracker().clone();
        viewer.dispose().await;
        ok_json(&json!({
            "closed": true,
            "live_resources": tracker.total_live(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for ForgeServer {
    fn get_info(&self) -> ServerInfo {
        let examples = EXAMPLE_PROMPTS
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n");
        ServerInfo {
            instructions: Some(format!(
                "Stellar Forge designs fictional interstellar propulsion inventions grounded in a fixed set of research papers.\n\n\
                 WORKFLOW:\n\
                 1. Call forge_generate with a free-text idea. One request runs at a time; calls made while one is pending are ignored.\n\
                 2. Call forge_refine to rewrite the current invention. If refinement fails the previous invention stays.\n\
                 3. Export with forge_export_document, forge_export_simulation or forge_export_model. Export problems come back as an `alert`.\n\
                 4. forge_open_viewer starts a live 3D view; drive it with forge_viewer_command and release it with forge_close_viewer.\n\n\
                 EXAMPLE PROMPTS:\n{examples}"
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
