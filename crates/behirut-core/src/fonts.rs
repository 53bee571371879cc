//! `@font-face` injection for user-registered fonts.

use crate::config::CustomFont;
use crate::error::TreeError;
use crate::tree::TextTree;

/// Id of the `<style>` element holding custom font rules.
pub const CUSTOM_FONTS_STYLE_ID: &str = "customFontsStyle";

/// Replace the custom font stylesheet in `head` with one built from `fonts`.
/// At most one such stylesheet exists afterwards.
pub fn inject_custom_fonts<T: TextTree>(
    tree: &mut T,
    fonts: &[CustomFont],
) -> Result<T::Node, TreeError> {
    let head = tree.head().ok_or(TreeError::MissingAnchor("head"))?;

    if let Some(existing) = tree.element_by_id(CUSTOM_FONTS_STYLE_ID) {
        if let Some(parent) = tree.parent(&existing) {
            tree.remove_child(&parent, &existing)?;
        }
    }

    let css: String = fonts.iter().map(CustomFont::font_face_css).collect();
    let style = tree.create_element("style")?;
    tree.set_attribute(&style, "id", CUSTOM_FONTS_STYLE_ID)?;
    if !css.is_empty() {
        tree.append_text(&style, &css)?;
    }
    tree.insert_before(&head, &style, None)?;

    tracing::debug!(count = fonts.len(), "injected custom fonts");
    Ok(style)
}
