//! Text transformation: wrap Hebrew runs on first sight, restyle the wrapper
//! afterwards, clear the wrapper's style on toggle-off.

use crate::error::TreeError;
use crate::script::{
    Segment, TRANSFORM_MARKER, collect_target_text_units, is_already_transformed,
    is_editable_context, segments,
};
use crate::style::StyleParameters;
use crate::tree::{StyleProperty, TextTree};

/// Tag used for wrappers.
pub const WRAPPER_TAG: &str = "span";

/// What [`apply_style`] did to one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleOutcome {
    /// First transform: the unit was replaced by `wrappers` styled spans
    /// interleaved with plain text.
    Wrapped { wrappers: usize },
    /// The unit was already wrapped; only the wrapper's style changed.
    Restyled,
    /// Nothing was done.
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a text node, or empty.
    NoText,
    /// No structural parent to splice into.
    Detached,
    /// Inside a form field or content-editable region.
    Editable,
    /// The text no longer holds any Hebrew.
    NoTargetScript,
}

/// Tally of a pass over many units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub wrapped: usize,
    pub restyled: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PassReport {
    pub fn record(&mut self, result: &Result<StyleOutcome, TreeError>) {
        match result {
            Ok(StyleOutcome::Wrapped { .. }) => self.wrapped += 1,
            Ok(StyleOutcome::Restyled) => self.restyled += 1,
            Ok(StyleOutcome::Skipped(_)) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: PassReport) {
        self.wrapped += other.wrapped;
        self.restyled += other.restyled;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Units visited, whatever happened to them.
    pub fn total(&self) -> usize {
        self.wrapped + self.restyled + self.skipped + self.failed
    }
}

/// Style one text unit. Wraps it the first time, restyles its wrapper on
/// every later call.
pub fn apply_style<T: TextTree>(
    tree: &mut T,
    unit: &T::Node,
    params: &StyleParameters,
) -> Result<StyleOutcome, TreeError> {
    if tree.text(unit).is_none_or(|text| text.is_empty()) {
        return Ok(StyleOutcome::Skipped(SkipReason::NoText));
    }

    if is_already_transformed(tree, unit) {
        restyle(tree, unit, params)
    } else {
        wrap(tree, unit, params)
    }
}

fn wrap<T: TextTree>(
    tree: &mut T,
    unit: &T::Node,
    params: &StyleParameters,
) -> Result<StyleOutcome, TreeError> {
    let Some(parent) = tree.parent(unit) else {
        return Ok(StyleOutcome::Skipped(SkipReason::Detached));
    };
    if is_editable_context(tree, &parent) || is_editable_context(tree, unit) {
        return Ok(StyleOutcome::Skipped(SkipReason::Editable));
    }

    let text = tree.text(unit).unwrap_or_default();
    let pieces = segments(&text);
    if !pieces.iter().any(|s| matches!(s, Segment::Target(_))) {
        return Ok(StyleOutcome::Skipped(SkipReason::NoTargetScript));
    }

    // Build every replacement node detached, then splice them all in.
    let mut replacement = Vec::with_capacity(pieces.len());
    let mut wrappers = 0;
    for piece in pieces {
        let node = match piece {
            Segment::Plain(plain) => tree.create_text(plain)?,
            Segment::Target(run) => {
                let wrapper = tree.create_element(WRAPPER_TAG)?;
                tree.set_attribute(&wrapper, TRANSFORM_MARKER, "true")?;
                write_style(tree, &wrapper, params)?;
                tree.append_text(&wrapper, run)?;
                wrappers += 1;
                wrapper
            }
        };
        replacement.push(node);
    }

    let anchor = tree.next_sibling(unit);
    let mut inserted = Vec::with_capacity(replacement.len());
    for node in replacement {
        if let Err(e) = tree.insert_before(&parent, &node, anchor.as_ref()) {
            roll_back(tree, &parent, &inserted);
            return Err(e);
        }
        inserted.push(node);
    }
    if let Err(e) = tree.remove_child(&parent, unit) {
        roll_back(tree, &parent, &inserted);
        return Err(e);
    }

    tracing::trace!(wrappers, "wrapped text unit");
    Ok(StyleOutcome::Wrapped { wrappers })
}

/// Take back a partial splice so the unit is the only copy of its text.
fn roll_back<T: TextTree>(tree: &mut T, parent: &T::Node, inserted: &[T::Node]) {
    for node in inserted.iter().rev() {
        if let Err(e) = tree.remove_child(parent, node) {
            tracing::warn!(node = ?node, error = %e, "failed to roll back partial wrap");
        }
    }
}

fn restyle<T: TextTree>(
    tree: &mut T,
    unit: &T::Node,
    params: &StyleParameters,
) -> Result<StyleOutcome, TreeError> {
    let Some(wrapper) = tree.parent(unit) else {
        return Ok(StyleOutcome::Skipped(SkipReason::Detached));
    };
    write_style(tree, &wrapper, params)?;
    Ok(StyleOutcome::Restyled)
}

/// Overwrite the three owned properties on `wrapper`.
fn write_style<T: TextTree>(
    tree: &mut T,
    wrapper: &T::Node,
    params: &StyleParameters,
) -> Result<(), TreeError> {
    tree.set_style(wrapper, StyleProperty::FontSize, Some(&params.font_size()))?;
    tree.set_style(wrapper, StyleProperty::LineHeight, Some(&params.line_height()))?;
    tree.set_style(
        wrapper,
        StyleProperty::FontFamily,
        params.font_family().as_deref(),
    )
}

/// Unset the owned style properties on a transformed unit's wrapper. The
/// marker stays, so re-enabling restyles instead of re-wrapping.
///
/// Returns whether anything was cleared.
pub fn clear_style<T: TextTree>(tree: &mut T, unit: &T::Node) -> Result<bool, TreeError> {
    if !is_already_transformed(tree, unit) {
        return Ok(false);
    }
    let Some(wrapper) = tree.parent(unit) else {
        return Ok(false);
    };
    for property in StyleProperty::ALL {
        tree.set_style(&wrapper, property, None)?;
    }
    Ok(true)
}

/// Apply [`apply_style`] to every Hebrew unit under `root`. One failing unit
/// never stops the rest.
pub fn apply_all<T: TextTree>(
    tree: &mut T,
    root: &T::Node,
    params: &StyleParameters,
) -> PassReport {
    let mut report = PassReport::default();
    for unit in collect_target_text_units(tree, root) {
        let result = apply_style(tree, &unit, params);
        if let Err(e) = &result {
            tracing::warn!(unit = ?unit, error = %e, "failed to style text unit");
        }
        report.record(&result);
    }
    report
}

/// Clear every transformed unit under `root`. Returns how many wrappers were
/// cleared.
pub fn clear_all<T: TextTree>(tree: &mut T, root: &T::Node) -> usize {
    let mut cleared = 0;
    for unit in collect_target_text_units(tree, root) {
        match clear_style(tree, &unit) {
            Ok(true) => cleared += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(unit = ?unit, error = %e, "failed to clear text unit"),
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::style::ORIGINAL_FONT;
    use crate::tree::NodeKind;
    use crate::{ArenaTree, NodeId};

    fn page(text: &str) -> (ArenaTree, NodeId, NodeId) {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        let p = tree.append_element(body, "p");
        let unit = tree.append_text_node(p, text);
        (tree, p, unit)
    }

    fn only_unit(tree: &ArenaTree, root: NodeId) -> NodeId {
        let units = collect_target_text_units(tree, &root);
        assert_eq!(units.len(), 1, "expected exactly one hebrew unit");
        units[0]
    }

    #[test]
    fn test_wraps_only_the_hebrew_run() {
        let (mut tree, p, unit) = page("שלום world");
        let params = StyleParameters::new(125, 145, ORIGINAL_FONT);

        let outcome = apply_style(&mut tree, &unit, &params).unwrap();
        assert_eq!(outcome, StyleOutcome::Wrapped { wrappers: 1 });
        assert_eq!(
            tree.inner_html(p),
            r#"<span behirut="true" style="font-size:1.25em;line-height:1.45em;">שלום</span> world"#
        );
    }

    #[test]
    fn test_wrap_preserves_sibling_position() {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        let p = tree.append_element(body, "p");
        tree.append_element(p, "br");
        let unit = tree.append_text_node(p, "a שלום b עולם");
        tree.append_element(p, "hr");
        let params = StyleParameters::new(100, 100, "Arial");

        let outcome = apply_style(&mut tree, &unit, &params).unwrap();
        assert_eq!(outcome, StyleOutcome::Wrapped { wrappers: 2 });
        let style = r#"style="font-size:1em;line-height:1em;font-family:&quot;Arial&quot;;""#;
        assert_eq!(
            tree.inner_html(p),
            format!(
                r#"<br>a <span behirut="true" {style}>שלום</span> b <span behirut="true" {style}>עולם</span><hr>"#
            )
        );
    }

    #[test]
    fn test_second_apply_restyles_without_rewrapping() {
        let (mut tree, p, unit) = page("שלום world");
        let params = StyleParameters::new(125, 145, ORIGINAL_FONT);
        apply_style(&mut tree, &unit, &params).unwrap();
        let once = tree.inner_html(p);

        let wrapped_unit = only_unit(&tree, p);
        let outcome = apply_style(&mut tree, &wrapped_unit, &params).unwrap();
        assert_eq!(outcome, StyleOutcome::Restyled);
        assert_eq!(tree.inner_html(p), once);
    }

    #[test]
    fn test_restyle_changes_only_font_family() {
        let (mut tree, p, unit) = page("שלום world");
        apply_style(&mut tree, &unit, &StyleParameters::new(125, 145, ORIGINAL_FONT)).unwrap();
        let wrapped_unit = only_unit(&tree, p);
        let wrapper = tree.parent(&wrapped_unit).unwrap();

        apply_style(&mut tree, &wrapped_unit, &StyleParameters::new(125, 145, "Arial")).unwrap();

        assert_eq!(tree.parent(&wrapped_unit), Some(wrapper));
        assert_eq!(tree.children(&p).len(), 2);
        assert_eq!(
            tree.attribute(&wrapper, "style").as_deref(),
            Some("font-size:1.25em;line-height:1.45em;font-family:\"Arial\";")
        );
    }

    #[test]
    fn test_clear_then_apply_matches_single_apply() {
        let (mut tree, p, unit) = page("שלום world");
        apply_style(&mut tree, &unit, &StyleParameters::new(200, 200, "Keter")).unwrap();
        let wrapped_unit = only_unit(&tree, p);

        assert!(clear_style(&mut tree, &wrapped_unit).unwrap());
        assert_eq!(
            tree.inner_html(p),
            r#"<span behirut="true">שלום</span> world"#
        );

        let final_params = StyleParameters::new(125, 145, ORIGINAL_FONT);
        assert_eq!(
            apply_style(&mut tree, &wrapped_unit, &final_params).unwrap(),
            StyleOutcome::Restyled
        );

        let (mut fresh, fresh_p, fresh_unit) = page("שלום world");
        apply_style(&mut fresh, &fresh_unit, &final_params).unwrap();
        assert_eq!(tree.inner_html(p), fresh.inner_html(fresh_p));
    }

    #[test]
    fn test_clear_ignores_untransformed_units() {
        let (mut tree, p, unit) = page("שלום");
        tree.set_style(&p, StyleProperty::FontSize, Some("2em")).unwrap();
        assert!(!clear_style(&mut tree, &unit).unwrap());
        assert_eq!(tree.attribute(&p, "style").as_deref(), Some("font-size:2em;"));
    }

    #[test]
    fn test_skips_editable_contexts() {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        let textarea = tree.append_element(body, "textarea");
        let in_textarea = tree.append_text_node(textarea, "שלום");
        let editor = tree.append_element(body, "div");
        tree.set_attribute(&editor, "contenteditable", "true").unwrap();
        let in_editor = tree.append_text_node(editor, "שלום");
        let params = StyleParameters::new(125, 145, ORIGINAL_FONT);

        assert_eq!(
            apply_style(&mut tree, &in_textarea, &params).unwrap(),
            StyleOutcome::Skipped(SkipReason::Editable)
        );
        assert_eq!(
            apply_style(&mut tree, &in_editor, &params).unwrap(),
            StyleOutcome::Skipped(SkipReason::Editable)
        );
        assert_eq!(tree.inner_html(textarea), "שלום");
        assert_eq!(tree.inner_html(editor), "שלום");
    }

    #[test]
    fn test_skips_detached_and_non_hebrew_units() {
        let mut tree = ArenaTree::new();
        let params = StyleParameters::new(125, 145, ORIGINAL_FONT);
        let detached = tree.create_text("שלום").unwrap();
        assert_eq!(
            apply_style(&mut tree, &detached, &params).unwrap(),
            StyleOutcome::Skipped(SkipReason::Detached)
        );

        let (mut tree, _, unit) = page("plain");
        assert_eq!(
            apply_style(&mut tree, &unit, &params).unwrap(),
            StyleOutcome::Skipped(SkipReason::NoTargetScript)
        );

        let (mut tree, _, unit) = page("");
        assert_eq!(
            apply_style(&mut tree, &unit, &params).unwrap(),
            StyleOutcome::Skipped(SkipReason::NoText)
        );
    }

    #[test]
    fn test_apply_all_then_clear_all() {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        let p = tree.append_element(body, "p");
        tree.append_text_node(p, "אחת two שלוש");
        let li = tree.append_element(body, "li");
        tree.append_text_node(li, "ארבע");
        let params = StyleParameters::new(150, 150, "Hadasim");

        let report = apply_all(&mut tree, &body, &params);
        assert_eq!(report.wrapped, 2);
        assert_eq!(report.failed, 0);

        let report = apply_all(&mut tree, &body, &params);
        assert_eq!(report.restyled, 3);
        assert_eq!(report.wrapped, 0);

        assert_eq!(clear_all(&mut tree, &body), 3);
        assert!(!tree.inner_html(body).contains("style="));
        assert_eq!(tree.inner_html(body).matches(r#"behirut="true""#).count(), 3);
    }

    /// Arena host whose inserts under one parent start failing after a
    /// fixed number of successes.
    struct FailingInserts {
        inner: ArenaTree,
        parent: NodeId,
        remaining: usize,
    }

    impl TextTree for FailingInserts {
        type Node = NodeId;

        fn kind(&self, node: &NodeId) -> NodeKind {
            self.inner.kind(node)
        }
        fn parent(&self, node: &NodeId) -> Option<NodeId> {
            self.inner.parent(node)
        }
        fn children(&self, node: &NodeId) -> Vec<NodeId> {
            self.inner.children(node)
        }
        fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
            self.inner.next_sibling(node)
        }
        fn text(&self, node: &NodeId) -> Option<String> {
            self.inner.text(node)
        }
        fn tag_name(&self, node: &NodeId) -> Option<String> {
            self.inner.tag_name(node)
        }
        fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
            self.inner.attribute(node, name)
        }
        fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), TreeError> {
            self.inner.set_attribute(node, name, value)
        }
        fn is_content_editable(&self, node: &NodeId) -> bool {
            self.inner.is_content_editable(node)
        }
        fn set_style(
            &mut self,
            node: &NodeId,
            property: StyleProperty,
            value: Option<&str>,
        ) -> Result<(), TreeError> {
            self.inner.set_style(node, property, value)
        }
        fn create_text(&mut self, text: &str) -> Result<NodeId, TreeError> {
            self.inner.create_text(text)
        }
        fn create_element(&mut self, tag: &str) -> Result<NodeId, TreeError> {
            self.inner.create_element(tag)
        }
        fn insert_before(
            &mut self,
            parent: &NodeId,
            child: &NodeId,
            reference: Option<&NodeId>,
        ) -> Result<(), TreeError> {
            if *parent == self.parent {
                if self.remaining == 0 {
                    return Err(TreeError::Host("insert refused".to_string()));
                }
                self.remaining -= 1;
            }
            self.inner.insert_before(parent, child, reference)
        }
        fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), TreeError> {
            self.inner.remove_child(parent, child)
        }
        fn body(&self) -> Option<NodeId> {
            self.inner.body()
        }
        fn head(&self) -> Option<NodeId> {
            self.inner.head()
        }
        fn element_by_id(&self, id: &str) -> Option<NodeId> {
            self.inner.element_by_id(id)
        }
    }

    #[test]
    fn test_failed_splice_leaves_unit_in_place() {
        let (inner, p, unit) = page("a שלום b");
        let mut tree = FailingInserts {
            inner,
            parent: p,
            remaining: 1,
        };
        let params = StyleParameters::new(125, 145, ORIGINAL_FONT);

        assert!(apply_style(&mut tree, &unit, &params).is_err());
        assert_eq!(tree.inner.inner_html(p), "a שלום b");
        assert_eq!(tree.children(&p), vec![unit]);

        let report = apply_all(&mut tree, &p, &params);
        assert_eq!(report.failed, 1);
        assert_eq!(tree.inner.inner_html(p), "a שלום b");
    }

    fn paragraphs() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z0-9 .\u{05D0}-\u{05EA}\u{05B0}-\u{05BC}]{0,16}", 1..5)
    }

    fn any_params() -> impl Strategy<Value = StyleParameters> {
        (
            100u32..=300,
            100u32..=300,
            prop::sample::select(vec![ORIGINAL_FONT, "Arial", "SIL Ezra"]),
        )
            .prop_map(|(size, height, font)| StyleParameters::new(size, height, font))
    }

    fn build(texts: &[String]) -> ArenaTree {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        for text in texts {
            let p = tree.append_element(body, "p");
            tree.append_text_node(p, text);
        }
        tree
    }

    fn text_content(tree: &ArenaTree, node: NodeId) -> String {
        match tree.text(&node) {
            Some(text) => text,
            None => tree
                .children(&node)
                .into_iter()
                .map(|child| text_content(tree, child))
                .collect(),
        }
    }

    proptest! {
        #[test]
        fn prop_apply_all_is_idempotent(texts in paragraphs(), params in any_params()) {
            let mut tree = build(&texts);
            let body = tree.body_id();

            apply_all(&mut tree, &body, &params);
            let once = tree.inner_html(body);
            let again = apply_all(&mut tree, &body, &params);

            prop_assert_eq!(again.wrapped, 0);
            prop_assert_eq!(tree.inner_html(body), once);
        }

        #[test]
        fn prop_clear_then_apply_matches_fresh_apply(
            texts in paragraphs(),
            first in any_params(),
            last in any_params(),
        ) {
            let mut tree = build(&texts);
            let body = tree.body_id();
            apply_all(&mut tree, &body, &first);
            clear_all(&mut tree, &body);
            apply_all(&mut tree, &body, &last);

            let mut fresh = build(&texts);
            let fresh_body = fresh.body_id();
            apply_all(&mut fresh, &fresh_body, &last);

            prop_assert_eq!(tree.inner_html(body), fresh.inner_html(fresh_body));
            prop_assert_eq!(text_content(&tree, body), texts.concat());
        }
    }
}
