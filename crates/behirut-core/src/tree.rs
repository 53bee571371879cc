//! Host document abstraction.
//!
//! The engine never touches concrete DOM types. Everything it needs from a
//! document (walking, reading text, flagging parents, editing inline style,
//! splicing nodes) goes through [`TextTree`]. The browser layer implements it
//! over `web_sys::Node`; [`crate::ArenaTree`] implements it in memory.

use std::fmt;

use crate::error::TreeError;

/// Coarse node classification. Only text leaves and elements matter to the
/// engine; comments, doctypes and the like are `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
    Other,
}

/// The inline style properties the engine owns on a wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    FontSize,
    LineHeight,
    FontFamily,
}

impl StyleProperty {
    /// All owned properties, in the order they are written on a new wrapper.
    pub const ALL: [StyleProperty; 3] = [
        StyleProperty::FontSize,
        StyleProperty::LineHeight,
        StyleProperty::FontFamily,
    ];

    /// CSS property name.
    pub fn css_name(self) -> &'static str {
        match self {
            StyleProperty::FontSize => "font-size",
            StyleProperty::LineHeight => "line-height",
            StyleProperty::FontFamily => "font-family",
        }
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

/// Capability-style view of a mutable document tree.
///
/// Node handles are cheap to clone and compare by identity. The engine only
/// holds them for the duration of one pass or one mutation batch; the host
/// owns the nodes.
///
/// Mutating methods take `&mut self` even where the host has interior
/// mutability (the DOM), so that in-memory hosts stay plain data.
pub trait TextTree {
    type Node: Clone + PartialEq + fmt::Debug;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    /// Structural parent, if the node is attached.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Children in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Character data of a text node. `None` for anything else.
    fn text(&self, node: &Self::Node) -> Option<String>;

    /// Lowercase tag name of an element. `None` for non-elements.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str)
    -> Result<(), TreeError>;

    /// Effective editability, including `contenteditable` inherited from
    /// ancestors.
    fn is_content_editable(&self, node: &Self::Node) -> bool;

    /// Set (`Some`) or clear (`None`) one inline style property.
    fn set_style(
        &mut self,
        node: &Self::Node,
        property: StyleProperty,
        value: Option<&str>,
    ) -> Result<(), TreeError>;

    fn create_text(&mut self, text: &str) -> Result<Self::Node, TreeError>;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node, TreeError>;

    /// Insert `child` under `parent` before `reference`, or append when
    /// `reference` is `None`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), TreeError>;

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), TreeError>;

    fn body(&self) -> Option<Self::Node>;

    fn head(&self) -> Option<Self::Node>;

    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Append a new text child holding `text`.
    fn append_text(&mut self, parent: &Self::Node, text: &str) -> Result<Self::Node, TreeError> {
        let node = self.create_text(text)?;
        self.insert_before(parent, &node, None)?;
        Ok(node)
    }
}
