pub mod model_version;
pub mod pipeline;
pub mod session;
pub mod validate;

pub use model_version::resolve_model_version;
pub use pipeline::TranscriptionPipeline;
pub use session::{SessionOutcome, WorkerSession};
pub use validate::{validate, ValidatedRequest};
