//! Document model shared by both sides of the bridge.
//!
//! Component renders produce [`Node`] trees, and observable-bound markup is
//! made of the same nodes. Elements are shared handles: bindings mutate
//! them in place (set their text, replace their children, mount a component
//! into them), the way a browser DOM element would be mutated.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Something that can supply the current content of an element, such as a
/// component root mounted into it.
pub trait ViewSource: Send + Sync {
    /// The latest rendered output, or `None` once unmounted.
    fn current_view(&self) -> Option<Node>;
}

/// A node in a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    Fragment(Vec<Node>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Node::Comment(text.into())
    }

    pub fn empty() -> Self {
        Node::Fragment(Vec::new())
    }

    /// The element, if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Concatenated text of this node and its descendants. Comments
    /// contribute nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_text(out),
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
            Node::Fragment(nodes) => nodes.iter().for_each(|n| n.write_text(out)),
        }
    }

    /// Serialize back to markup.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_html(out),
            Node::Text(text) => out.push_str(text),
            Node::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Node::Fragment(nodes) => nodes.iter().for_each(|n| n.write_html(out)),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

/// Shared handle to a mutable element. Clones refer to the same element.
#[derive(Clone)]
pub struct Element {
    inner: Arc<RwLock<ElementData>>,
}

struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
    /// Content supplied by a mounted component; replaces `children` when
    /// reading text or markup.
    mounted: Option<Arc<dyn ViewSource>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ElementData {
                tag: tag.into(),
                attributes: IndexMap::new(),
                children: Vec::new(),
                mounted: None,
            })),
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`Element::append`].
    pub fn with_child(self, child: impl Into<Node>) -> Self {
        self.append(child.into());
        self
    }

    pub fn tag(&self) -> String {
        self.inner.read().tag.clone()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.inner.read().attributes.get(name).cloned()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.write().attributes.insert(name.into(), value.into());
    }

    pub fn children(&self) -> Vec<Node> {
        self.inner.read().children.clone()
    }

    pub fn set_children(&self, children: Vec<Node>) {
        let previous = std::mem::replace(&mut self.inner.write().children, children);
        drop(previous);
    }

    pub fn append(&self, child: Node) {
        self.inner.write().children.push(child);
    }

    /// Replace the child at `index` with `nodes`. Out-of-range indexes are
    /// ignored.
    pub fn replace_child(&self, index: usize, nodes: Vec<Node>) {
        let mut data = self.inner.write();
        if index < data.children.len() {
            data.children.splice(index..=index, nodes);
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&self, text: impl Into<String>) {
        self.set_children(vec![Node::Text(text.into())]);
    }

    /// Let `source` supply this element's content.
    pub fn mount_view(&self, source: Arc<dyn ViewSource>) {
        self.inner.write().mounted = Some(source);
    }

    /// Remove a mounted view source, returning it.
    pub fn unmount_view(&self) -> Option<Arc<dyn ViewSource>> {
        self.inner.write().mounted.take()
    }

    pub fn has_mounted_view(&self) -> bool {
        self.inner.read().mounted.is_some()
    }

    /// Whether two handles refer to the same element.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable identity of the element for dependency comparisons.
    pub fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    /// Current content: the mounted view if any, otherwise the children.
    /// The element lock is released before a mounted view is asked for its
    /// output.
    fn content(&self) -> Vec<Node> {
        let (mounted, children) = {
            let data = self.inner.read();
            (data.mounted.clone(), data.children.clone())
        };
        match mounted {
            Some(source) => source.current_view().into_iter().collect(),
            None => children,
        }
    }

    fn write_text(&self, out: &mut String) {
        for child in self.content() {
            child.write_text(out);
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let (tag, attributes) = {
            let data = self.inner.read();
            (data.tag.clone(), data.attributes.clone())
        };
        out.push('<');
        out.push_str(&tag);
        for (name, value) in &attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
        out.push('>');
        for child in self.content() {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedView(Node);

    impl ViewSource for FixedView {
        fn current_view(&self) -> Option<Node> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn text_content_skips_comments() {
        let div = Element::new("div")
            .with_child("Hello, ")
            .with_child(Node::comment("ignored"))
            .with_child(Element::new("span").with_child("World"));

        assert_eq!(div.text_content(), "Hello, World");
    }

    #[test]
    fn clones_share_the_element() {
        let div = Element::new("div");
        let alias = div.clone();
        alias.set_text("changed");

        assert_eq!(div.text_content(), "changed");
        assert!(div.ptr_eq(&alias));
        assert_eq!(div.key(), alias.key());
        assert_ne!(div, Element::new("div"));
    }

    #[test]
    fn mounted_view_replaces_children() {
        let div = Element::new("div").with_child("placeholder");
        div.mount_view(Arc::new(FixedView(Node::text("from component"))));

        assert_eq!(div.text_content(), "from component");
        assert!(div.unmount_view().is_some());
        assert_eq!(div.text_content(), "placeholder");
    }

    #[test]
    fn replace_child_splices_nodes() {
        let div = Element::new("div")
            .with_child(Node::comment("marker"))
            .with_child("tail");
        div.replace_child(0, vec![Node::text("a"), Node::text("b")]);

        assert_eq!(div.children().len(), 3);
        assert_eq!(div.to_html(), "<div>abtail</div>");
    }

    #[test]
    fn html_quotes_attribute_values() {
        let div = Element::new("div").with_attr("data-bind", "text: \"x\"");
        assert_eq!(div.to_html(), "<div data-bind=\"text: &quot;x&quot;\"></div>");
    }
}
