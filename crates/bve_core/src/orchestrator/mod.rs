//! Batch orchestration: drives one encoder process per input file and
//! reports everything that happens through a typed event stream.

mod cancel;
mod errors;
mod events;
mod runner;

pub use cancel::CancelHandle;
pub use errors::{OrchestratorError, OrchestratorResult};
pub use events::EncodeEvent;
pub use runner::EncodeOrchestrator;
