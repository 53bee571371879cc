//! In-memory document tree.
//!
//! `ArenaTree` implements [`TextTree`] and [`WatchHost`] without a browser.
//! Nodes live in an index arena and are never freed; removal only detaches.
//! Mutations inside `<body>` are journaled per active subscription, the way
//! a `MutationObserver` queues records, and handed out with
//! [`ArenaTree::take_batches`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::TreeError;
use crate::style::StyleParameters;
use crate::tree::{NodeKind, StyleProperty, TextTree};
use crate::watcher::{Mutation, Subscription, WatchHost};

/// Index of a node in an [`ArenaTree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

const VOID_TAGS: [&str; 7] = ["br", "hr", "img", "input", "link", "meta", "wbr"];

#[derive(Clone, Debug)]
enum NodeData {
    Document,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        style: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct ArenaNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Identifies one journal subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct Journal {
    next_id: u64,
    queues: Vec<(SubscriptionId, Vec<Mutation<NodeId>>)>,
}

impl Journal {
    fn push(&mut self, record: Mutation<NodeId>) {
        for (_, queue) in &mut self.queues {
            queue.push(record.clone());
        }
    }
}

/// Journal subscription returned by [`ArenaTree::observe`].
#[derive(Debug)]
pub struct ArenaSubscription {
    id: SubscriptionId,
    journal: Rc<RefCell<Journal>>,
}

impl ArenaSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Subscription for ArenaSubscription {
    fn cancel(&mut self) {
        self.journal
            .borrow_mut()
            .queues
            .retain(|(id, _)| *id != self.id);
    }

    fn is_active(&self) -> bool {
        self.journal
            .borrow()
            .queues
            .iter()
            .any(|(id, _)| *id == self.id)
    }
}

/// Arena-backed document with `html`, `head` and `body` already in place.
#[derive(Debug)]
pub struct ArenaTree {
    nodes: Vec<ArenaNode>,
    head: NodeId,
    body: NodeId,
    journal: Rc<RefCell<Journal>>,
}

impl Default for ArenaTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: vec![ArenaNode {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            head: NodeId(0),
            body: NodeId(0),
            journal: Rc::new(RefCell::new(Journal::default())),
        };
        let html = tree.append_element(NodeId(0), "html");
        tree.head = tree.append_element(html, "head");
        tree.body = tree.append_element(html, "body");
        tree
    }

    pub fn document_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn head_id(&self) -> NodeId {
        self.head
    }

    pub fn body_id(&self) -> NodeId {
        self.body
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(ArenaNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Result<&ArenaNode, TreeError> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| TreeError::MissingNode(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ArenaNode, TreeError> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| TreeError::MissingNode(id.to_string()))
    }

    /// Builder shorthand: append a new element. Panics on a bad parent id,
    /// which only test fixtures can produce.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            style: Vec::new(),
        });
        self.attach(parent, id, None)
            .unwrap_or_else(|e| panic!("append_element under {parent}: {e}"));
        id
    }

    /// Builder shorthand: append a new text node.
    pub fn append_text_node(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeData::Text(text.to_string()));
        self.attach(parent, id, None)
            .unwrap_or_else(|e| panic!("append_text_node under {parent}: {e}"));
        id
    }

    /// Builder shorthand: append a comment.
    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeData::Comment(text.to_string()));
        self.attach(parent, id, None)
            .unwrap_or_else(|e| panic!("append_comment under {parent}: {e}"));
        id
    }

    /// Replace a text node's character data, the way a script assigning
    /// `nodeValue` would.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        let old = match &mut self.node_mut(node)?.data {
            NodeData::Text(current) => std::mem::replace(current, text.to_string()),
            _ => return Err(TreeError::Host(format!("{node} is not a text node"))),
        };
        if self.in_body(node) {
            self.journal.borrow_mut().push(Mutation::TextChanged {
                target: node,
                old_value: Some(old),
            });
        }
        Ok(())
    }

    /// Detach `node` from its parent, if any.
    pub fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        if let Some(parent) = self.node(node)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != node);
            self.node_mut(node)?.parent = None;
        }
        Ok(())
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError> {
        self.node(parent)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(TreeError::Host(format!(
                "cannot insert {child} into its own subtree"
            )));
        }
        self.detach(child)?;

        let index = match reference {
            Some(reference) => self
                .node(parent)?
                .children
                .iter()
                .position(|c| *c == reference)
                .ok_or_else(|| TreeError::NotAChild {
                    parent: parent.to_string(),
                    child: reference.to_string(),
                })?,
            None => self.node(parent)?.children.len(),
        };
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);

        if self.in_body(parent) {
            self.journal.borrow_mut().push(Mutation::Inserted(child));
        }
        Ok(())
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node.0).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// True for `body` and anything attached beneath it.
    fn in_body(&self, node: NodeId) -> bool {
        node == self.body || self.is_ancestor(self.body, node)
    }

    /// Drain queued mutation records, one batch per active subscription.
    pub fn take_batches(&mut self) -> Vec<(SubscriptionId, Vec<Mutation<NodeId>>)> {
        let mut journal = self.journal.borrow_mut();
        journal
            .queues
            .iter_mut()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(id, queue)| (*id, std::mem::take(queue)))
            .collect()
    }

    /// Number of subscriptions currently receiving records.
    pub fn active_subscriptions(&self) -> usize {
        self.journal.borrow().queues.len()
    }

    /// Serialized children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(n) = self.nodes.get(node.0) {
            for child in &n.children {
                self.write_html(*child, &mut out);
            }
        }
        out
    }

    /// Serialized `node` including itself.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node.0) else {
            return;
        };
        match &n.data {
            NodeData::Document => {
                for child in &n.children {
                    self.write_html(*child, out);
                }
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element {
                tag,
                attributes,
                style,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
                }
                if !style.is_empty() {
                    out.push_str(&format!(
                        " style=\"{}\"",
                        escape_attribute(&serialize_style(style))
                    ));
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) && n.children.is_empty() {
                    return;
                }
                for child in &n.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn serialize_style(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{name}:{value};"))
        .collect()
}

fn parse_style(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            (!name.is_empty() && !value.is_empty())
                .then(|| (name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

impl TextTree for ArenaTree {
    type Node = NodeId;

    fn kind(&self, node: &NodeId) -> NodeKind {
        match self.nodes.get(node.0).map(|n| &n.data) {
            Some(NodeData::Text(_)) => NodeKind::Text,
            Some(NodeData::Element { .. }) => NodeKind::Element,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = &self.nodes.get(parent.0)?.children;
        let index = siblings.iter().position(|c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { style, .. } if name == "style" => {
                (!style.is_empty()).then(|| serialize_style(style))
            }
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        let id = *node;
        match &mut self.node_mut(id)?.data {
            NodeData::Element { style, .. } if name == "style" => {
                *style = parse_style(value);
                Ok(())
            }
            NodeData::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(n, _)| n == name) {
                    Some((_, current)) => *current = value.to_string(),
                    None => attributes.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(TreeError::Host(format!("{id} is not an element"))),
        }
    }

    fn is_content_editable(&self, node: &NodeId) -> bool {
        if self.kind(node) != NodeKind::Element {
            return false;
        }
        let mut current = Some(*node);
        while let Some(id) = current {
            match self.attribute(&id, "contenteditable").as_deref() {
                Some("" | "true" | "plaintext-only") => return true,
                Some("false") => return false,
                _ => current = self.parent(&id),
            }
        }
        false
    }

    fn set_style(
        &mut self,
        node: &NodeId,
        property: StyleProperty,
        value: Option<&str>,
    ) -> Result<(), TreeError> {
        let id = *node;
        let NodeData::Element { style, .. } = &mut self.node_mut(id)?.data else {
            return Err(TreeError::Host(format!("{id} is not an element")));
        };
        let name = property.css_name();
        let existing = style.iter().position(|(n, _)| n == name);
        match (value, existing) {
            (Some(value), Some(index)) => style[index].1 = value.to_string(),
            (Some(value), None) => style.push((name.to_string(), value.to_string())),
            (None, Some(index)) => {
                style.remove(index);
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn create_text(&mut self, text: &str) -> Result<NodeId, TreeError> {
        Ok(self.alloc(NodeData::Text(text.to_string())))
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, TreeError> {
        Ok(self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            style: Vec::new(),
        }))
    }

    fn insert_before(
        &mut self,
        parent: &NodeId,
        child: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), TreeError> {
        self.node(*child)?;
        self.attach(*parent, *child, reference.copied())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), TreeError> {
        if self.node(*child)?.parent != Some(*parent) {
            return Err(TreeError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        self.detach(*child)
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn head(&self) -> Option<NodeId> {
        Some(self.head)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.document_id()];
        while let Some(node) = stack.pop() {
            if self.attribute(&node, "id").as_deref() == Some(id) {
                return Some(node);
            }
            stack.extend(self.children(&node).into_iter().rev());
        }
        None
    }
}

impl WatchHost for ArenaTree {
    type Subscription = ArenaSubscription;

    fn observe(&mut self, _params: &StyleParameters) -> Result<ArenaSubscription, TreeError> {
        let mut journal = self.journal.borrow_mut();
        let id = SubscriptionId(journal.next_id);
        journal.next_id += 1;
        journal.queues.push((id, Vec::new()));
        Ok(ArenaSubscription {
            id,
            journal: Rc::clone(&self.journal),
        })
    }
}
