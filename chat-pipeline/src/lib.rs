pub mod completion;
pub mod documents;
pub mod pipeline;
pub mod prompt;
pub mod relevance;
pub mod session;
pub mod splitter;
pub mod trending;

pub use completion::CompletionClient;
pub use documents::DocumentHostClient;
pub use pipeline::{ChatOutcome, ChatPipeline, StageTimings};
pub use relevance::{Relevance, RelevanceGate};
pub use session::{SessionStore, Turn, TurnRole, MAX_WINDOW_TURNS};
