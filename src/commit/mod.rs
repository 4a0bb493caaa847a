//! Asynchronous page commits
//!
//! Page bodies are written back to the repository by background workers so
//! link extraction can continue while earlier pages are still being saved.
//! The [`CommitTracker`] counts outstanding commits; anything that needs the
//! site fully written (thumbnails, the final report) waits for it to drain.

mod dispatcher;
mod tracker;
mod worker;

pub use dispatcher::CommitDispatcher;
pub use tracker::{CommitTracker, OutstandingGuard};
pub use worker::{AsyncCommitWorker, CommitRequest};
