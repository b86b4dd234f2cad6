//! Core types for the settop runtime.

/// Application context and entry points.
pub mod app;
/// Terminal backends.
pub mod backend;
/// Shared collaborators and the navigation queue.
pub mod context;
/// Single-shot asynchronous results.
pub mod deferred;
/// Debug dump utilities.
pub mod dump;
/// Core error types.
pub mod error;
/// Named-event dispatch.
pub mod event;
/// Focus management.
pub mod focus;
/// Element identifiers.
pub mod id;
/// Remote keys and key dispatch.
pub mod key;
/// Cooperative scheduler.
pub mod poll;
/// Scene router.
pub mod router;
/// Testing utilities.
pub mod testing;
/// Element tree.
pub mod tree;

pub use app::App;
pub use context::{Context, Navigator};
pub use id::ElementId;
pub use poll::Scheduler;
