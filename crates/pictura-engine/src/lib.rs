pub mod config;
pub mod filters;
pub mod gemini;
pub mod media;
pub mod orchestrator;
pub mod pacing;
pub mod session;
pub mod storage;

pub use config::{ClientConfig, StoreConfig};
pub use gemini::{ErrorKind, GeminiClient, GenerationError, GenerationOutcome};
pub use orchestrator::{transform_with_retry, TransformRequest, TransformResult};
pub use session::{SessionConfig, StudioSession};
pub use storage::{StoredImage, TransientStore};
