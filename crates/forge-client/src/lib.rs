//! Stellar Forge I/O: configuration, the Gemini backend, image payloads and
//! the generation orchestrator.

pub mod config;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod image;
pub mod prompt;

pub use config::{Config, ConfigError, FileConfig, default_base_dir};
pub use error::{BackendError, GenerationError};
pub use gemini::GeminiBackend;
pub use generation::{GenerativeBackend, Orchestrator};
pub use image::{ImageError, ImagePayload, decode_texture};
