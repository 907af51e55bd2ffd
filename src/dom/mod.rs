//! Arena DOM backing the node-stream walks.
//!
//! html5ever parses into a flat arena of nodes linked by ids; the parser
//! modules only ever need sibling cursors, subtree text, and a handful of
//! tag/class predicates, so that is all this exposes. The one mutation the
//! pipeline performs (promoting a lone divider out of its wrapper) is
//! `replace_with`.

pub mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, QualName};

use tree_sink::DomSink;

/// Index into the node arena. `NONE` is the absent-link sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }

    fn ok(self) -> Option<NodeId> {
        if self.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub enum NodeData {
    Document,
    Element {
        name: QualName,
        /// (local attribute name, value)
        attrs: Vec<(String, String)>,
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

pub struct Dom {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        dom.document = dom.alloc(Node::new(NodeData::Document));
        dom
    }

    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Dom {
        let sink = DomSink::new();
        parse_document(sink, ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes())
            .into_dom()
    }

    /// Parse a fragment by wrapping it in a minimal document.
    pub fn parse_fragment(html: &str) -> Dom {
        Dom::parse(&format!(
            "<!DOCTYPE html><html><head></head><body>{}</body></html>",
            html
        ))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    /// The <body> element; html5ever always synthesizes one for documents.
    pub fn body(&self) -> NodeId {
        self.find(self.document, |d, id| d.tag(id) == Some("body"))
            .unwrap_or(self.document)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        id.ok().and_then(|id| self.nodes.get(id.0 as usize))
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        id.ok().and_then(move |id| self.nodes.get_mut(id.0 as usize))
    }

    // ── construction (used by the TreeSink) ──

    pub fn create_element(&mut self, name: QualName, attrs: Vec<(String, String)>) -> NodeId {
        let classes = attrs
            .iter()
            .find(|(n, _)| n == "class")
            .map(|(_, v)| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            classes,
        }))
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(c) = self.get_mut(child) {
            c.parent = parent;
            c.prev_sibling = last;
            c.next_sibling = NodeId::NONE;
        }
        if let Some(l) = self.get_mut(last) {
            l.next_sibling = child;
        }
        if let Some(p) = self.get_mut(parent) {
            if p.first_child.is_none() {
                p.first_child = child;
            }
            p.last_child = child;
        }
    }

    /// Append text, merging into a trailing text node when present.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);
        if let Some(node) = self.get_mut(last) {
            if let NodeData::Text(existing) = &mut node.data {
                existing.push_str(text);
                return;
            }
        }
        let t = self.create_text(text.to_string());
        self.append(parent, t);
    }

    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };
        if let Some(n) = self.get_mut(new_node) {
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = sibling;
        }
        if let Some(s) = self.get_mut(sibling) {
            s.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    pub fn detach(&mut self, target: NodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };
        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }
        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }
        if let Some(t) = self.get_mut(target) {
            t.parent = NodeId::NONE;
            t.prev_sibling = NodeId::NONE;
            t.next_sibling = NodeId::NONE;
        }
    }

    /// Put `replacement` where `target` sits and detach `target`.
    pub fn replace_with(&mut self, target: NodeId, replacement: NodeId) {
        self.detach(replacement);
        self.insert_before(target, replacement);
        self.detach(target);
    }

    // ── adapter queries ──

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.ok())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.ok())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.ok())
    }

    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            dom: self,
            current: self
                .get(parent)
                .map(|n| n.first_child)
                .unwrap_or(NodeId::NONE),
        }
    }

    pub fn element_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent)
            .filter(|&c| self.is_element(c))
            .collect()
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(n) = cur {
            if self.is_element(n) {
                return Some(n);
            }
            cur = self.next_sibling(n);
        }
        None
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.prev_sibling(id);
        while let Some(n) = cur {
            if self.is_element(n) {
                return Some(n);
            }
            cur = self.prev_sibling(n);
        }
        None
    }

    /// Next sibling that is not a whitespace-only text node or a comment.
    pub fn next_significant_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.next_sibling(id);
        while let Some(n) = cur {
            if !self.is_noise(n) {
                return Some(n);
            }
            cur = self.next_sibling(n);
        }
        None
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.get(id).map(|n| &n.data),
            Some(NodeData::Element { .. })
        )
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.get(id).map(|n| &n.data), Some(NodeData::Comment(_)))
    }

    /// Whitespace-only text node or comment: invisible to segmentation.
    pub fn is_noise(&self, id: NodeId) -> bool {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Comment(_)) => true,
            Some(NodeData::Text(t)) => t.trim().is_empty(),
            _ => false,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        })
    }

    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == attr_name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        })
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes.iter().any(|c| c == class),
            _ => false,
        }
    }

    pub fn text_node(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of the whole subtree, document order.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element { .. }) | Some(NodeData::Document) => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// All descendants of `root` in document order, excluding `root`.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = {
            let mut kids: Vec<_> = self.children(root).collect();
            kids.reverse();
            kids
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut kids: Vec<_> = self.children(id).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// First node under `root` matching the predicate (depth-first).
    pub fn find<F>(&self, root: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        self.descendants(root).into_iter().find(|&id| pred(self, id))
    }

    /// All nodes under `root` matching the predicate, document order.
    pub fn select<F>(&self, root: NodeId, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        self.descendants(root)
            .into_iter()
            .filter(|&id| pred(self, id))
            .collect()
    }

    /// Nearest ancestor carrying the class, if any.
    pub fn ancestor_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        let mut cur = self.parent(id);
        while let Some(n) = cur {
            if self.has_class(n, class) {
                return Some(n);
            }
            cur = self.parent(n);
        }
        None
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Children<'a> {
    dom: &'a Dom,
    current: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current.ok()?;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_walk_siblings() {
        let dom = Dom::parse_fragment("<p>uno</p> <p>due</p><!-- x --><p>tre</p>");
        let body = dom.body();
        let ps = dom.element_children(body);
        assert_eq!(ps.len(), 3);
        assert_eq!(dom.subtree_text(ps[0]), "uno");
        assert_eq!(dom.next_element_sibling(ps[0]), Some(ps[1]));
        assert_eq!(dom.next_element_sibling(ps[1]), Some(ps[2]));
    }

    #[test]
    fn noise_detection() {
        let dom = Dom::parse_fragment("<b>a</b> <!-- c --><b>b</b>");
        let body = dom.body();
        let first = dom.children(body).next().unwrap();
        // whitespace text and comment are skipped, the next <b> is not
        let next = dom.next_significant_sibling(first).unwrap();
        assert_eq!(dom.tag(next), Some("b"));
        assert_eq!(dom.subtree_text(next), "b");
    }

    #[test]
    fn attributes_and_classes() {
        let dom = Dom::parse_fragment(r#"<span class="tratto raro"><a href="/tratti/magico/">Magico</a></span>"#);
        let span = dom.find(dom.body(), |d, id| d.tag(id) == Some("span")).unwrap();
        assert!(dom.has_class(span, "tratto"));
        assert!(dom.has_class(span, "raro"));
        let a = dom.find(span, |d, id| d.tag(id) == Some("a")).unwrap();
        assert_eq!(dom.attr(a, "href"), Some("/tratti/magico/"));
        assert_eq!(dom.ancestor_with_class(a, "tratto"), Some(span));
    }

    #[test]
    fn replace_with_promotes_node() {
        let mut dom = Dom::parse_fragment("<p>a</p><div><hr></div><p>b</p>");
        let body = dom.body();
        let div = dom.find(body, |d, id| d.tag(id) == Some("div")).unwrap();
        let hr = dom.find(div, |d, id| d.tag(id) == Some("hr")).unwrap();
        dom.replace_with(div, hr);
        let kids = dom.element_children(body);
        let tags: Vec<_> = kids.iter().map(|&k| dom.tag(k).unwrap()).collect();
        assert_eq!(tags, vec!["p", "hr", "p"]);
    }

    #[test]
    fn subtree_text_spans_children() {
        let dom = Dom::parse_fragment("<p><b>Innesco</b> qualcosa <i>accade</i></p>");
        let p = dom.find(dom.body(), |d, id| d.tag(id) == Some("p")).unwrap();
        assert_eq!(dom.subtree_text(p), "Innesco qualcosa accade");
    }
}
