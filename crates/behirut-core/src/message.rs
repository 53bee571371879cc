//! Messages sent to the content script by the popup and background page.

use serde::{Deserialize, Serialize};

use crate::config::CustomFont;

/// Tagged on `reason`, matching what the extension pages send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum Message {
    /// Settings changed: rerun the whole-document pass and re-arm.
    UpdateAllText,
    /// The custom font list changed.
    InjectCustomFonts {
        #[serde(rename = "customFonts", default)]
        custom_fonts: Vec<CustomFont>,
    },
    /// The extension was switched off.
    ToggleOff,
}

impl Message {
    /// Reason string as sent on the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            Message::UpdateAllText => "updateAllText",
            Message::InjectCustomFonts { .. } => "injectCustomFonts",
            Message::ToggleOff => "toggleOff",
        }
    }
}
