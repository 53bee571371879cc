//! Extension settings as stored in synced storage.
//!
//! Keys match the storage layout (`textSize`, `onOff`, ...). Missing keys
//! take the install-time defaults, so a partially written store still
//! deserializes.

use std::collections::HashSet;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::style::{ORIGINAL_FONT, StyleParameters};

pub const DEFAULT_FONT: &str = "SIL Ezra";
pub const DEFAULT_TEXT_SIZE: u32 = 125;
pub const DEFAULT_LINE_HEIGHT: u32 = 145;

/// Allowed range for both percentages.
pub const PERCENT_RANGE: std::ops::RangeInclusive<u32> = 100..=300;

/// Fonts offered by the options page without any custom registration.
pub const BUILTIN_FONTS: [&str; 12] = [
    "Frank Ruehl",
    "Hadasim",
    "Keter",
    "Miriam",
    "Nachlielie",
    "Shofar",
    "Simple CLM",
    "SIL Ezra",
    "sans-serif",
    "Times New Roman",
    "Arial",
    ORIGINAL_FONT,
];

/// Everything the content script reads from storage.
///
/// Decoding never fails as a whole. Each key is read on its own: a missing,
/// `null` or mistyped value takes its default, and malformed list entries are
/// dropped without touching the rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSettings")]
pub struct Settings {
    pub text_size: u32,
    pub line_height: u32,
    #[serde(rename = "onOff")]
    pub enabled: bool,
    pub font: String,
    /// Hostnames the engine must leave alone.
    pub whitelisted: Vec<String>,
    pub custom_settings: Vec<CustomSetting>,
    pub custom_fonts: Vec<CustomFont>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_size: DEFAULT_TEXT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            enabled: true,
            font: DEFAULT_FONT.to_string(),
            whitelisted: Vec::new(),
            custom_settings: Vec::new(),
            custom_fonts: Vec::new(),
        }
    }
}

impl Settings {
    pub fn is_whitelisted(&self, hostname: &str) -> bool {
        self.whitelisted.iter().any(|h| h == hostname)
    }

    pub fn custom_setting(&self, hostname: &str) -> Option<&CustomSetting> {
        self.custom_settings.iter().find(|c| c.url == hostname)
    }

    /// Global parameters, unless `hostname` has its own override.
    pub fn effective_params(&self, hostname: &str) -> StyleParameters {
        match self.custom_setting(hostname) {
            Some(custom) => custom.params(),
            None => StyleParameters::new(self.text_size, self.line_height, self.font.clone()),
        }
    }

    /// Collect every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        check_percent(&mut errors, "textSize", self.text_size);
        check_percent(&mut errors, "lineHeight", self.line_height);
        if self.font.trim().is_empty() {
            errors.push(ConfigError::Empty("font".to_string()));
        }

        let mut sites = HashSet::new();
        for custom in &self.custom_settings {
            errors.extend(custom.validate().err().unwrap_or_default());
            if !sites.insert(custom.url.as_str()) {
                errors.push(ConfigError::DuplicateSite(custom.url.clone()));
            }
        }

        let mut fonts = HashSet::new();
        for font in &self.custom_fonts {
            if font.font_name.trim().is_empty() {
                errors.push(ConfigError::Empty("customFonts.fontName".to_string()));
            } else if !fonts.insert(font.font_name.as_str()) {
                errors.push(ConfigError::DuplicateFont(font.font_name.clone()));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A value that decoded as `T`, or anything else.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Lenient<T> {
    fn valid(self) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Invalid(_) => None,
        }
    }
}

/// Keep the well-formed entries of a stored list.
fn valid_entries<T>(list: Option<Lenient<Vec<Lenient<T>>>>) -> Option<Vec<T>> {
    list.and_then(Lenient::valid)
        .map(|entries| entries.into_iter().filter_map(Lenient::valid).collect())
}

/// Raw storage snapshot, one independently decoded key per field.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredSettings {
    text_size: Option<Lenient<u32>>,
    line_height: Option<Lenient<u32>>,
    #[serde(rename = "onOff")]
    enabled: Option<Lenient<bool>>,
    font: Option<Lenient<String>>,
    whitelisted: Option<Lenient<Vec<Lenient<String>>>>,
    custom_settings: Option<Lenient<Vec<Lenient<CustomSetting>>>>,
    custom_fonts: Option<Lenient<Vec<Lenient<CustomFont>>>>,
}

impl From<StoredSettings> for Settings {
    fn from(stored: StoredSettings) -> Self {
        let defaults = Settings::default();
        Self {
            text_size: stored
                .text_size
                .and_then(Lenient::valid)
                .unwrap_or(defaults.text_size),
            line_height: stored
                .line_height
                .and_then(Lenient::valid)
                .unwrap_or(defaults.line_height),
            enabled: stored
                .enabled
                .and_then(Lenient::valid)
                .unwrap_or(defaults.enabled),
            font: stored
                .font
                .and_then(Lenient::valid)
                .unwrap_or(defaults.font),
            whitelisted: valid_entries(stored.whitelisted).unwrap_or(defaults.whitelisted),
            custom_settings: valid_entries(stored.custom_settings)
                .unwrap_or(defaults.custom_settings),
            custom_fonts: valid_entries(stored.custom_fonts).unwrap_or(defaults.custom_fonts),
        }
    }
}

fn check_percent(errors: &mut Vec<ConfigError>, field: &str, value: u32) {
    if !PERCENT_RANGE.contains(&value) {
        errors.push(ConfigError::OutOfRange {
            field: field.to_string(),
            value,
        });
    }
}

/// Per-site override of the global parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSetting {
    /// Hostname, e.g. `example.com`.
    pub url: String,
    pub text_size: u32,
    pub line_height: u32,
    pub font: String,
}

impl CustomSetting {
    pub fn params(&self) -> StyleParameters {
        StyleParameters::new(self.text_size, self.line_height, self.font.clone())
    }

    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.url.trim().is_empty() {
            errors.push(ConfigError::Empty("customSettings.url".to_string()));
        }
        check_percent(&mut errors, &format!("{}.textSize", self.url), self.text_size);
        check_percent(&mut errors, &format!("{}.lineHeight", self.url), self.line_height);
        if self.font.trim().is_empty() {
            errors.push(ConfigError::Empty(format!("{}.font", self.url)));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A user-registered font, loaded from the local system, a URL, or both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFont {
    pub font_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CustomFont {
    pub fn new(font_name: impl Into<String>) -> Self {
        Self {
            font_name: font_name.into(),
            local_name: None,
            url: None,
        }
    }

    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = Some(local_name.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// One `@font-face` rule. Sources are `local()` first, then `url()`.
    pub fn font_face_css(&self) -> String {
        let local = self.local_name.as_deref().filter(|s| !s.is_empty());
        let url = self.url.as_deref().filter(|s| !s.is_empty());
        let sources: Vec<String> = local
            .map(|name| format!("local('{}')", css_string(name)))
            .into_iter()
            .chain(url.map(|url| format!("url('{}')", css_string(url))))
            .collect();

        let mut rule = format!("@font-face {{ font-family: '{}';", css_string(&self.font_name));
        if !sources.is_empty() {
            rule.push_str(" src: ");
            rule.push_str(&sources.join(", "));
            rule.push(';');
        }
        rule.push_str("}\n");
        rule
    }
}

fn css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Fonts the engine knows about: the built-in list plus registered custom
/// fonts.
#[derive(Clone, Debug, Default)]
pub struct FontCatalog {
    custom: Vec<String>,
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registered custom fonts.
    pub fn register(&mut self, fonts: &[CustomFont]) {
        self.custom = fonts.iter().map(|f| f.font_name.clone()).collect();
    }

    pub fn contains(&self, name: &str) -> bool {
        BUILTIN_FONTS.contains(&name) || self.custom.iter().any(|f| f == name)
    }
}
