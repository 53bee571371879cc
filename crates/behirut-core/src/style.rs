//! Style parameters applied to Hebrew runs.

use serde::{Deserialize, Serialize};

/// Font name meaning "leave the page's font family alone".
pub const ORIGINAL_FONT: &str = "Original";

/// Size, line height and font applied to every wrapper.
///
/// Percentages are expected in `100..=300`; callers validate before handing
/// parameters to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleParameters {
    pub text_size_percent: u32,
    pub line_height_percent: u32,
    pub font_name: String,
}

impl StyleParameters {
    pub fn new(
        text_size_percent: u32,
        line_height_percent: u32,
        font_name: impl Into<String>,
    ) -> Self {
        Self {
            text_size_percent,
            line_height_percent,
            font_name: font_name.into(),
        }
    }

    /// True when the font family must not be overridden.
    pub fn keeps_original_font(&self) -> bool {
        self.font_name == ORIGINAL_FONT
    }

    /// `font-size` value, e.g. `1.25em` for 125%.
    pub fn font_size(&self) -> String {
        em(self.text_size_percent)
    }

    /// `line-height` value, e.g. `1.45em` for 145%.
    pub fn line_height(&self) -> String {
        em(self.line_height_percent)
    }

    /// Quoted `font-family` value, or `None` for [`ORIGINAL_FONT`].
    pub fn font_family(&self) -> Option<String> {
        if self.keeps_original_font() {
            return None;
        }
        let escaped = self.font_name.replace('\\', "\\\\").replace('"', "\\\"");
        Some(format!("\"{escaped}\""))
    }
}

/// Render a percentage as an `em` length without going through floats.
fn em(percent: u32) -> String {
    let whole = percent / 100;
    let frac = percent % 100;
    if frac == 0 {
        format!("{whole}em")
    } else if frac % 10 == 0 {
        format!("{whole}.{}em", frac / 10)
    } else {
        format!("{whole}.{frac:02}em")
    }
}
