//! Script classification: which text is Hebrew, which units were already
//! transformed, and where transforms must not happen.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::tree::{NodeKind, TextTree};

/// Attribute set to `"true"` on every wrapper the engine creates.
pub const TRANSFORM_MARKER: &str = "behirut";

/// Element names treated as form inputs. Text under these is never wrapped.
pub const EDITABLE_TAGS: [&str; 9] = [
    "textarea", "input", "text", "email", "number", "search", "tel", "url", "password",
];

/// Hebrew block (cantillation through punctuation) plus the alphabetic
/// presentation forms. A run starts on a Hebrew character and may carry
/// ASCII digits after it.
static HEBREW_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{0591}-\x{05F4}\x{FB1D}-\x{FB4F}]+[\x{0591}-\x{05F4}\x{FB1D}-\x{FB4F}0-9]*")
        .expect("hebrew run pattern is a valid literal")
});

/// True if `text` holds at least one Hebrew character, whatever surrounds it.
pub fn contains_target_script(text: &str) -> bool {
    HEBREW_RUN.is_match(text)
}

/// Byte ranges of every Hebrew run in `text`, left to right.
pub fn target_runs(text: &str) -> impl Iterator<Item = Range<usize>> + '_ {
    HEBREW_RUN.find_iter(text).map(|m| m.range())
}

/// A piece of text split around its Hebrew runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Target(&'a str),
}

/// Split `text` into alternating plain and Hebrew segments, dropping empty
/// plain pieces. Concatenating the segments gives back `text`.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for run in target_runs(text) {
        if run.start > cursor {
            out.push(Segment::Plain(&text[cursor..run.start]));
        }
        out.push(Segment::Target(&text[run.clone()]));
        cursor = run.end;
    }
    if cursor < text.len() {
        out.push(Segment::Plain(&text[cursor..]));
    }
    out
}

/// Every text leaf under `root` (including `root` itself when it is a text
/// node) whose content is Hebrew, in document order.
///
/// The result is an owned snapshot: callers splice the tree while walking it.
pub fn collect_target_text_units<T: TextTree>(tree: &T, root: &T::Node) -> Vec<T::Node> {
    let mut units = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        match tree.kind(&node) {
            NodeKind::Text => {
                if tree
                    .text(&node)
                    .is_some_and(|text| contains_target_script(&text))
                {
                    units.push(node);
                }
            }
            NodeKind::Element | NodeKind::Other => {
                let children = tree.children(&node);
                stack.extend(children.into_iter().rev());
            }
        }
    }

    units
}

/// True iff the unit's parent carries the transform marker.
pub fn is_already_transformed<T: TextTree>(tree: &T, unit: &T::Node) -> bool {
    tree.parent(unit)
        .and_then(|parent| tree.attribute(&parent, TRANSFORM_MARKER))
        .is_some_and(|value| value == "true")
}

/// True if `node` is a form-input-like element or is content-editable.
pub fn is_editable_context<T: TextTree>(tree: &T, node: &T::Node) -> bool {
    if tree.is_content_editable(node) {
        return true;
    }
    tree.kind(node) == NodeKind::Element
        && tree
            .tag_name(node)
            .is_some_and(|tag| EDITABLE_TAGS.contains(&tag.as_str()))
}
