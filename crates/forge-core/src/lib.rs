//! Stellar Forge invention pipeline.
//!
//! Turns a validated AI response into typed invention data and maps it onto
//! three visual encodings: 2D charts, a procedural 3D scene (exportable as
//! binary glTF) and a mission timeline, plus the markdown-subset formatter
//! used for the invention document itself.
//!
//! Zero I/O: pure data mapping with no opinions about transport or rendering.

pub mod chart;
pub mod constants;
pub mod format;
pub mod geometry;
pub mod glb;
pub mod invention;
pub mod quaternion;
pub mod scene;
pub mod schema;
pub mod timeline;

pub use chart::{EnergyChart, SpeedChart, project_energy, project_speed, to_exponential};
pub use format::{Block, Blocks, Span, escape_html, format, render_html, render_plain};
pub use geometry::MeshData;
pub use glb::export_glb;
pub use invention::{
    ChartData, Component, EnergyRequirement, InventionOutput, ModelParams, PropulsionPhase, Rgb,
    Shape, StabilityBand,
};
pub use quaternion::Quaternion;
pub use scene::{
    Camera, Lighting, Material, MaterialRef, Orbit, ResourceKind, ResourceTracker, SceneGraph,
    SceneNode, Texture, TextureSlot,
};
pub use schema::{ParsedResponse, SchemaError, parse_response, response_schema, strip_code_fence};
pub use timeline::{AnimatedTimeline, StaticTimeline, Timeline};
