//! WASM content script for the behirut extension.
//!
//! The extension's content-script shim loads this module and calls
//! [`start`]. From then on the page is driven by storage settings and
//! runtime messages from the popup and background page.

mod content;
mod error;
mod extension;

pub use content::*;
pub use error::ContentError;

use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        let _ = set_global_default(Registry::default().with(wasm_layer));
    }
}
