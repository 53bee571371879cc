//! Browser DOM host for the behirut engine.
//!
//! This crate implements the core's host traits over `web_sys`. It assumes a
//! `wasm32-unknown-unknown` target running inside a page.
//!
//! # Architecture
//!
//! - `dom`: `BrowserDom`, the `TextTree` implementation over `web_sys::Node`
//! - `observer`: `DomSubscription`, the `WatchHost` implementation backed by
//!   a `MutationObserver`
//!
//! # Re-exports
//!
//! This crate re-exports `behirut-core` for convenience, so consumers only
//! need to depend on `behirut-browser`.

// Re-export core crate
pub use behirut_core;
pub use behirut_core::*;

pub mod dom;
pub mod observer;

pub use dom::{BrowserDom, current_hostname};
pub use observer::{DomSubscription, records_to_mutations};
