//! Exports of the current invention: the printable document, the animated
//! simulation and the 3D model. Each export is best-effort; callers turn a
//! failure into an alert rather than a failed generation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use forge_core::{
    InventionOutput, ResourceTracker, SceneGraph, StabilityBand, Timeline, escape_html, export_glb,
    format, project_energy, project_speed, render_html, render_plain,
};

const DOCUMENT_STYLE: &str = "\
body { font-family: system-ui, sans-serif; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; color: #111827; }
h2 { color: #0e7490; border-bottom: 1px solid #a5f3fc; padding-bottom: 0.25rem; }
h3 { color: #155e75; }
.accent { color: #0891b2; }
.stability { display: inline-block; padding: 0.25rem 0.75rem; border-radius: 9999px; background: #ecfeff; color: #0e7490; font-weight: 600; }
.stability-nominal { background: #f0fdf4; color: #15803d; }
.stability-low { background: #fefce8; color: #a16207; }
.concept { display: block; max-width: 100%; margin: 1rem auto; border-radius: 8px; }
.charts svg { display: block; width: 100%; height: auto; margin: 1rem 0; }
.static-simulation { margin: 2rem 0; page-break-inside: avoid; }
.static-summary, .static-ends { display: flex; justify-content: space-between; font-size: 0.875rem; }
.static-track { position: relative; height: 6rem; margin: 1rem 2rem; }
.static-line { position: absolute; top: 50%; width: 100%; border-top: 2px dashed #0891b2; }
.static-marker { position: absolute; top: 50%; transform: translate(-50%, -50%); text-align: center; }
.static-dot { width: 10px; height: 10px; margin: 0 auto; border-radius: 50%; background: #0891b2; }
.static-label { display: flex; flex-direction: column; font-size: 11px; white-space: nowrap; margin-top: 0.5rem; }
.static-ship { position: absolute; right: -1rem; top: 0; }
.static-ship .ship-image { height: 40px; }
@media print { body { margin: 0; } }
";

const SIMULATION_PAGE_STYLE: &str = "\
body { margin: 0; padding: 2rem; background: #030712; color: #f9fafb; font-family: system-ui, sans-serif; }
h1 { font-size: 1.25rem; color: #67e8f9; }
";

fn page(title: &str, style: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>\n{style}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title)
    )
}

/// The full static layout as one self-contained HTML document.
pub fn document_html(output: &InventionOutput) -> String {
    let mut body = String::new();

    if let Some(stability) = output.stability_percentage {
        let band = StabilityBand::from_percentage(stability);
        body.push_str(&format!(
            "<p class=\"stability {}\">Stability: {stability:.1}%</p>\n",
            band.css_class()
        ));
    }
    if let Some(url) = &output.image_url {
        body.push_str(&format!(
            "<img class=\"concept\" src=\"{}\" alt=\"Invention concept\">\n",
            escape_html(url)
        ));
    }
    body.push_str("<article>\n");
    body.push_str(&render_html(format(&output.text)));
    body.push_str("</article>\n");

    if let Some(timeline) = Timeline::new(output.propulsion_phases()) {
        body.push_str(&timeline.static_view().to_html(output.image_url.as_deref()));
    }

    let speed = project_speed(output.propulsion_phases());
    let energy = project_energy(output.energy_requirements());
    if speed.is_some() || energy.is_some() {
        body.push_str("<section class=\"charts\">\n");
        if let Some(chart) = speed {
            body.push_str(&chart.to_svg());
        }
        if let Some(chart) = energy {
            if !chart.rejected.is_empty() {
                tracing::debug!(rejected = ?chart.rejected, "energy points dropped from chart");
            }
            body.push_str(&chart.to_svg());
        }
        body.push_str("</section>\n");
    }

    page(&output.title(), DOCUMENT_STYLE, &body)
}

/// Animated timeline page, or `None` when there are too few phases.
pub fn simulation_html(output: &InventionOutput, seed: u64) -> Option<String> {
    let timeline = Timeline::new(output.propulsion_phases())?;
    let title = output.title();
    let body = format!(
        "<h1>{}</h1>\n{}",
        escape_html(&title),
        timeline
            .animated()
            .to_html(output.image_url.as_deref(), seed)
    );
    Some(page(&title, SIMULATION_PAGE_STYLE, &body))
}

/// Binary glTF of the procedural model, textured with the concept image
/// when it decodes.
pub fn model_glb(output: &InventionOutput) -> Result<Vec<u8>> {
    let Some(params) = &output.model_params else {
        bail!("invention has no model parameters");
    };
    let tracker = ResourceTracker::new();
    let scene = SceneGraph::build(params, &tracker);
    if let Some(url) = &output.image_url {
        match forge_client::decode_texture(url) {
            Ok(texture) => scene.apply_texture(texture),
            Err(e) => tracing::warn!("exporting without texture: {e}"),
        }
    }
    let bytes = export_glb(&scene).context("failed to serialize model")?;
    scene.dispose();
    Ok(bytes)
}

/// Document text for a terminal.
pub fn terminal_text(output: &InventionOutput) -> String {
    let mut text = render_plain(format(&output.text));
    if let Some(stability) = output.stability_percentage {
        text.push_str(&format!("\nStability: {stability:.1}%\n"));
    }
    text
}

pub fn write_document(output: &InventionOutput, path: &Path) -> Result<()> {
    fs::write(path, document_html(output))
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_simulation(output: &InventionOutput, path: &Path) -> Result<()> {
    let Some(html) = simulation_html(output, rand::random()) else {
        bail!("at least two propulsion phases are needed for a simulation");
    };
    fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_model(output: &InventionOutput, path: &Path) -> Result<()> {
    let bytes = model_glb(output)?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// Result of writing every export into one directory. Each failure is
/// kept as an alert line; the others still get written.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub alerts: Vec<String>,
}

pub fn write_exports(output: &InventionOutput, dir: &Path) -> Result<ExportSummary> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let stem = output.file_stem();
    let mut summary = ExportSummary::default();

    let jobs: [(PathBuf, fn(&InventionOutput, &Path) -> Result<()>); 3] = [
        (dir.join(format!("{stem}.html")), write_document),
        (dir.join(format!("{stem}-simulation.html")), write_simulation),
        (dir.join(format!("{stem}.glb")), write_model),
    ];
    for (path, write) in jobs {
        match write(output, &path) {
            Ok(()) => summary.written.push(path),
            Err(e) => {
                tracing::warn!("export failed: {e:#}");
                summary.alerts.push(format!("{}: {e:#}", path.display()));
            }
        }
    }
    Ok(summary)
}
