pub mod chat;
pub mod feedback;
pub mod history;
pub mod liveness;
pub mod rag;
pub mod readiness;
pub mod trending;
