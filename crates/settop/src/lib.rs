//! Settop: a remote-control driven UI runtime for television applications.
//!
//! Settop turns directional, OK and back key presses into focus changes,
//! screen transitions and asynchronous UI updates on devices that have no
//! pointer and no window manager.
//!
//! # Quick Start
//!
//! The main entry points are:
//! - [`App`] - The application context: element tree, focus, scheduler,
//!   keys and scene router
//! - [`Scene`] - The trait implemented by every screen
//! - [`deferred::Deferred`] - Cancellable asynchronous results
//!
//! # Module Organization
//!
//! - [`event`] - Named-event hub with one-shot listeners and scopes
//! - [`focus`] - The focus manager
//! - [`router`] - Scene lifecycle and history
//! - [`model`] - Observable attribute maps

#![warn(missing_docs)]

// Internal core module - re-export specific items below
mod core;

// Public modules
pub mod model;
pub mod scene;

// Re-export core application types
pub use core::{App, Context, ElementId, Navigator, Scheduler};
pub use core::{
    app, backend, context, deferred, dump, error, event, focus, id, key, poll, router, testing,
    tree,
};

pub use scene::{EventOutcome, Scene, SceneContext, SceneState};
