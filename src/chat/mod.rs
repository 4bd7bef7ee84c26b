//! Interactive chat session: messages, session state and the controller
//! that streams replies into it.

pub mod controller;
pub mod error;
pub mod message;
pub mod session;

pub use controller::{DeltaSink, GenerationOutcome, GenerationReport, NullSink, SessionController};
pub use error::ChatError;
pub use message::{ChatMessage, Role};
pub use session::{CancelFlag, Session};
