//! Request handlers.

pub mod health;
pub mod history;
pub mod ingest;

pub use health::{health, ready};
pub use history::get_history;
pub use ingest::{ingest_example, ingest_video};
