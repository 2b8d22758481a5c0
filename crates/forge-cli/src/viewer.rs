//! Headless model viewer state: a render loop task that owns the scene and
//! takes commands over a channel.
//!
//! Nothing is drawn. Each frame only advances the camera orbit; commands
//! update the scene state that `status` reports.
//!
//! The loop holds the only strong reference to the scene. Textures decode
//! off-loop and attach through a weak slot, so an image that lands after the
//! scene was replaced or disposed is dropped on the floor. Dropping the
//! viewer closes the command channel, which also ends the loop.

use std::f32::consts::TAU;
use std::fmt;
use std::time::Duration;

use forge_core::{Lighting, ModelParams, ResourceTracker, SceneGraph};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Target frame interval (~60 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Frames per second the auto-rotate speed is calibrated against.
const REFERENCE_FPS: f32 = 60.0;
const COMMAND_QUEUE: usize = 32;

#[derive(Debug)]
pub enum ViewerError {
    /// The render loop has stopped.
    Closed,
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::Closed => write!(f, "viewer is closed"),
        }
    }
}

impl std::error::Error for ViewerError {}

#[derive(Debug)]
pub enum Command {
    Resize { width: u32, height: u32 },
    SetLighting(Lighting),
    /// Rebuild the scene from new parameters, disposing the old one.
    SetParams {
        params: Box<ModelParams>,
        image_url: Option<String>,
    },
    Start,
    Stop,
    Status,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LightingStatus {
    pub ambient: f32,
    pub directional: f32,
}

/// Snapshot reported after every command.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewerStatus {
    pub running: bool,
    pub frames: u64,
    /// Camera orbit angle in radians, wrapped to [0, 2π).
    pub angle: f32,
    pub nodes: usize,
    pub textured: bool,
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
    pub lighting: LightingStatus,
    pub live_resources: usize,
}

type Request = (Command, oneshot::Sender<ViewerStatus>);

pub struct ModelViewer {
    tx: mpsc::Sender<Request>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    tracker: ResourceTracker,
}

impl ModelViewer {
    /// Spawn the render loop. An empty scene is shown until parameters
    /// arrive. Starts running immediately.
    pub fn spawn(params: Option<&ModelParams>, image_url: Option<&str>) -> Self {
        let tracker = ResourceTracker::new();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);

        let mut render = RenderLoop::new(tracker.clone());
        if let Some(params) = params {
            render.load(params, image_url.map(str::to_string));
        }
        let task = tokio::spawn(render.run(rx, cancel.clone()));

        Self {
            tx,
            cancel,
            task,
            tracker,
        }
    }

    pub async fn send(&self, command: Command) -> Result<ViewerStatus, ViewerError> {
        let (ack, reply) = oneshot::channel();
        self.tx
            .send((command, ack))
            .await
            .map_err(|_| ViewerError::Closed)?;
        reply.await.map_err(|_| ViewerError::Closed)
    }

    pub async fn status(&self) -> Result<ViewerStatus, ViewerError> {
        self.send(Command::Status).await
    }

    pub async fn start(&self) -> Result<ViewerStatus, ViewerError> {
        self.send(Command::Start).await
    }

    pub async fn stop(&self) -> Result<ViewerStatus, ViewerError> {
        self.send(Command::Stop).await
    }

    /// Zero sizes are ignored.
    pub async fn resize(&self, width: u32, height: u32) -> Result<ViewerStatus, ViewerError> {
        self.send(Command::Resize { width, height }).await
    }

    /// Adjusts intensities in place; the scene is not rebuilt.
    pub async fn set_lighting(&self, lighting: Lighting) -> Result<ViewerStatus, ViewerError> {
        self.send(Command::SetLighting(lighting)).await
    }

    pub async fn set_params(
        &self,
        params: ModelParams,
        image_url: Option<String>,
    ) -> Result<ViewerStatus, ViewerError> {
        self.send(Command::SetParams {
            params: Box::new(params),
            image_url,
        })
        .await
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Stop the loop and wait for the scene to be released.
    pub async fn dispose(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("viewer task failed: {e}");
        }
        tracing::debug!(live = self.tracker.total_live(), "viewer disposed");
    }
}

struct RenderLoop {
    scene: Option<SceneGraph>,
    tracker: ResourceTracker,
    running: bool,
    frames: u64,
    angle: f32,
    width: u32,
    height: u32,
    lighting: Lighting,
    base_camera: [f32; 3],
}

impl RenderLoop {
    fn new(tracker: ResourceTracker) -> Self {
        Self {
            scene: None,
            tracker,
            running: true,
            frames: 0,
            angle: 0.0,
            width: 0,
            height: 0,
            lighting: Lighting::default(),
            base_camera: forge_core::Camera::default().position,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                request = rx.recv() => {
                    let Some((command, ack)) = request else { break };
                    self.apply(command);
                    let _ = ack.send(self.status());
                }
                _ = ticker.tick(), if self.running => self.frame(),
            }
        }

        if let Some(scene) = self.scene.take() {
            scene.dispose();
        }
        tracing::debug!(frames = self.frames, "render loop stopped");
    }

    fn load(&mut self, params: &ModelParams, image_url: Option<String>) {
        if let Some(old) = self.scene.take() {
            old.dispose();
        }
        let mut scene = SceneGraph::build(params, &self.tracker);
        if !scene.fallback_colors.is_empty() {
            tracing::warn!(colors = ?scene.fallback_colors, "unparsable colors replaced");
        }
        scene.lighting = self.lighting;
        scene.camera.resize(self.width, self.height);
        if let Some(url) = image_url {
            spawn_texture_load(&scene, url);
        }
        self.scene = Some(scene);
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Resize { width, height } => {
                if width == 0 || height == 0 {
                    tracing::debug!(width, height, "ignoring degenerate resize");
                    return;
                }
                self.width = width;
                self.height = height;
                if let Some(scene) = self.scene.as_mut() {
                    scene.camera.resize(width, height);
                }
            }
            Command::SetLighting(lighting) => {
                self.lighting = lighting;
                if let Some(scene) = self.scene.as_mut() {
                    scene.lighting = lighting;
                }
            }
            Command::SetParams { params, image_url } => self.load(&params, image_url),
            Command::Start => self.running = true,
            Command::Stop => self.running = false,
            Command::Status => {}
        }
    }

    fn frame(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let step = TAU / REFERENCE_FPS / REFERENCE_FPS * scene.orbit.auto_rotate_speed;
        self.angle = (self.angle + step) % TAU;
        let (sin, cos) = self.angle.sin_cos();
        let [x, y, z] = self.base_camera;
        scene.camera.position = [x * cos + z * sin, y, z * cos - x * sin];
        self.frames += 1;
    }

    fn status(&self) -> ViewerStatus {
        let (nodes, textured, aspect, lighting) = match &self.scene {
            Some(scene) => (
                scene.nodes.len(),
                scene.primary_texture().is_some(),
                scene.camera.aspect,
                scene.lighting,
            ),
            None => (0, false, 1.0, self.lighting),
        };
        ViewerStatus {
            running: self.running,
            frames: self.frames,
            angle: self.angle,
            nodes,
            textured,
            width: self.width,
            height: self.height,
            aspect,
            lighting: LightingStatus {
                ambient: lighting.ambient_intensity,
                directional: lighting.directional_intensity,
            },
            live_resources: self.tracker.total_live(),
        }
    }
}

/// Decode on the blocking pool; attach only if the scene is still alive.
fn spawn_texture_load(scene: &SceneGraph, url: String) {
    let slot = scene.texture_slot();
    tokio::spawn(async move {
        match tokio::task::spawn_blocking(move || forge_client::decode_texture(&url)).await {
            Ok(Ok(texture)) => {
                if !slot.apply(texture) {
                    tracing::debug!("scene gone before texture arrived");
                }
            }
            Ok(Err(e)) => tracing::warn!("texture load failed: {e}"),
            Err(e) => tracing::error!("texture task failed: {e}"),
        }
    });
}
