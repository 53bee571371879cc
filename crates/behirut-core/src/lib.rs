//! behirut-core: Hebrew text restyling engine without browser dependencies.
//!
//! This crate provides:
//! - `TextTree` / `WatchHost` traits over any host document
//! - Script classification (`contains_target_script`, `collect_target_text_units`)
//! - The wrap / restyle / clear transformer
//! - `MutationWatcher` and the host-independent batch callback
//! - `PageController`, settings, custom fonts and the message contract
//! - `ArenaTree`, an in-memory host used natively and in tests

pub mod arena;
pub mod config;
pub mod controller;
pub mod error;
pub mod fonts;
pub mod message;
pub mod script;
pub mod style;
pub mod transform;
pub mod tree;
pub mod watcher;

pub use arena::{ArenaSubscription, ArenaTree, NodeId, SubscriptionId};
pub use config::{
    BUILTIN_FONTS, CustomFont, CustomSetting, DEFAULT_FONT, DEFAULT_LINE_HEIGHT,
    DEFAULT_TEXT_SIZE, FontCatalog, Settings,
};
pub use controller::{DOCUMENT_MARKER_ID, Outcome, PageController, is_document_marked, mark_document};
pub use error::{ConfigError, TreeError};
pub use fonts::{CUSTOM_FONTS_STYLE_ID, inject_custom_fonts};
pub use message::Message;
pub use script::{
    EDITABLE_TAGS, TRANSFORM_MARKER, collect_target_text_units, contains_target_script,
    is_already_transformed, is_editable_context,
};
pub use style::{ORIGINAL_FONT, StyleParameters};
pub use transform::{
    PassReport, SkipReason, StyleOutcome, apply_all, apply_style, clear_all,
    clear_style,
};
pub use tree::{NodeKind, StyleProperty, TextTree};
pub use watcher::{Mutation, MutationWatcher, Subscription, WatchHost, WatcherState, process_batch};
