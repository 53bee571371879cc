//! `TextTree` over the live DOM.

use behirut_core::{NodeKind, StyleProperty, TextTree, TreeError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, Node};

/// Convert a thrown JS value into a tree error.
pub(crate) fn host_error(err: JsValue) -> TreeError {
    TreeError::Host(
        err.as_string()
            .or_else(|| {
                err.dyn_ref::<js_sys::Error>()
                    .map(|e| String::from(e.message()))
            })
            .unwrap_or_else(|| format!("{err:?}")),
    )
}

/// The page document, seen as a [`TextTree`].
///
/// Cloning is cheap: it clones the `Document` handle, not the tree.
#[derive(Clone, Debug)]
pub struct BrowserDom {
    document: Document,
}

impl BrowserDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The current window's document, if there is one.
    pub fn current() -> Option<Self> {
        web_sys::window()
            .and_then(|w| w.document())
            .map(Self::new)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn element<'a>(&self, node: &'a Node) -> Result<&'a Element, TreeError> {
        node.dyn_ref::<Element>()
            .ok_or_else(|| TreeError::Host(format!("{} is not an element", node.node_name())))
    }
}

/// Hostname of the current page, used for whitelist and per-site lookups.
pub fn current_hostname() -> Option<String> {
    web_sys::window()?.location().hostname().ok()
}

impl TextTree for BrowserDom {
    type Node = Node;

    fn kind(&self, node: &Node) -> NodeKind {
        match node.node_type() {
            Node::TEXT_NODE => NodeKind::Text,
            Node::ELEMENT_NODE => NodeKind::Element,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn next_sibling(&self, node: &Node) -> Option<Node> {
        node.next_sibling()
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() == Node::TEXT_NODE {
            node.node_value()
        } else {
            None
        }
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>()
            .map(|el| el.tag_name().to_ascii_lowercase())
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn set_attribute(&mut self, node: &Node, name: &str, value: &str) -> Result<(), TreeError> {
        self.element(node)?
            .set_attribute(name, value)
            .map_err(host_error)
    }

    fn is_content_editable(&self, node: &Node) -> bool {
        node.dyn_ref::<HtmlElement>()
            .is_some_and(|el| el.is_content_editable())
    }

    fn set_style(
        &mut self,
        node: &Node,
        property: StyleProperty,
        value: Option<&str>,
    ) -> Result<(), TreeError> {
        let el = node
            .dyn_ref::<HtmlElement>()
            .ok_or_else(|| TreeError::Host(format!("{} has no inline style", node.node_name())))?;
        let style = el.style();
        match value {
            Some(value) => style
                .set_property(property.css_name(), value)
                .map_err(host_error),
            None => style
                .remove_property(property.css_name())
                .map(|_| ())
                .map_err(host_error),
        }
    }

    fn create_text(&mut self, text: &str) -> Result<Node, TreeError> {
        Ok(self.document.create_text_node(text).into())
    }

    fn create_element(&mut self, tag: &str) -> Result<Node, TreeError> {
        self.document
            .create_element(tag)
            .map(Into::into)
            .map_err(host_error)
    }

    fn insert_before(
        &mut self,
        parent: &Node,
        child: &Node,
        reference: Option<&Node>,
    ) -> Result<(), TreeError> {
        parent
            .insert_before(child, reference)
            .map(|_| ())
            .map_err(host_error)
    }

    fn remove_child(&mut self, parent: &Node, child: &Node) -> Result<(), TreeError> {
        parent.remove_child(child).map(|_| ()).map_err(host_error)
    }

    fn body(&self) -> Option<Node> {
        self.document.body().map(Into::into)
    }

    fn head(&self) -> Option<Node> {
        self.document.head().map(Into::into)
    }

    fn element_by_id(&self, id: &str) -> Option<Node> {
        self.document.get_element_by_id(id).map(Into::into)
    }
}
