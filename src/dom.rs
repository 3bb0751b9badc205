//! Headless page document.
//!
//! An arena of nodes standing in for the browser DOM. Every widget in this
//! crate reads and writes the page through a shared [`Document`], which keeps
//! the synchronization logic testable without a browser: tests mount the
//! system on a parsed page and assert on classes, attributes and `src` values
//! exactly as they would in a real page.
//!
//! ## Parsing
//!
//! [`Document::parse_html`] is deliberately tolerant. It never fails:
//!
//! - void elements (`img`, `input`, ...) and `/>` never take children
//! - unmatched end tags are ignored, unclosed elements close at end of input
//! - comments and doctypes are skipped
//! - whitespace-only text is dropped
//! - `script`/`style` bodies are kept as raw text
//!
//! ## Selectors
//!
//! [`Selector`] understands one compound selector (`tag.class#id[attr=value]`).
//! Combinators are not supported; scope a query to a subtree instead.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// An element's tag, attributes and inline style properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Root,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn parse_html(src: &str) -> Self {
        HtmlParser::new(src).run()
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            ..Element::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.is_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Whether the node is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root() || self.is_ancestor(self.root(), node)
    }

    /// Deep-copy `node` and its descendants into a new detached subtree.
    pub fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let kind = match &self.nodes[node.0].kind {
            NodeKind::Root => NodeKind::Element(Element {
                tag: "div".to_string(),
                ..Element::default()
            }),
            other => other.clone(),
        };
        let copy = self.push_node(kind);
        let children = self.nodes[node.0].children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Descendants of `scope` in document order, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    // =========================================================================
    // Element access
    // =========================================================================

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attr(name))
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attrs.remove(name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let list = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &list);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let list: Vec<&str> = self
            .attr(node, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect();
        let list = list.join(" ");
        self.set_attr(node, "class", &list);
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)
            .and_then(|e| e.style.get(property))
            .map(String::as_str)
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.style.insert(property.to_string(), value.to_string());
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self, node: NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => text.clone(),
            _ => self
                .descendants(node)
                .into_iter()
                .filter_map(|n| match &self.nodes[n.0].kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Replace all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if self.element(node).is_none() {
            return;
        }
        self.clear_children(node);
        let text_node = self.create_text(text);
        self.append_child(node, text_node);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.element(node).is_some_and(|e| selector.matches(e))
    }

    pub fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    pub fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.matches(n, selector))
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.matches(current, selector) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            self.write_node(child, false, &mut out);
        }
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, false, &mut out);
        out
    }

    fn write_node(&self, node: NodeId, raw: bool, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Root => {
                for &child in self.children(node) {
                    self.write_node(child, false, out);
                }
            }
            NodeKind::Text(text) if raw => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&escape(text, false)),
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attrs {
                    if name == "style" && !element.style.is_empty() {
                        continue;
                    }
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(value, true));
                        out.push('"');
                    }
                }
                if !element.style.is_empty() {
                    let declarations: Vec<String> = element
                        .style
                        .iter()
                        .map(|(k, v)| format!("{k}: {v}"))
                        .collect();
                    out.push_str(" style=\"");
                    out.push_str(&escape(&declarations.join("; "), true));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }
                let raw_children = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
                for &child in self.children(node) {
                    self.write_node(child, raw_children, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_style(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

// =============================================================================
// HTML parsing
// =============================================================================

struct HtmlParser<'a> {
    src: &'a str,
    pos: usize,
    doc: Document,
    stack: Vec<NodeId>,
}

impl<'a> HtmlParser<'a> {
    fn new(src: &'a str) -> Self {
        let doc = Document::new();
        let root = doc.root();
        Self {
            src,
            pos: 0,
            doc,
            stack: vec![root],
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(NodeId(0))
    }

    fn run(mut self) -> Document {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.pos += rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            } else if rest.starts_with("</") {
                self.end_tag();
            } else if rest
                .strip_prefix('<')
                .and_then(|after| after.chars().next())
                .is_some_and(|c| c.is_ascii_alphabetic())
            {
                self.start_tag();
            } else {
                // A '<' that does not open a tag is plain text.
                let skip = rest.chars().next().map_or(1, char::len_utf8);
                let end = rest[skip..].find('<').map(|i| i + skip).unwrap_or(rest.len());
                self.text(&rest[..end]);
                self.pos += end;
            }
        }
        self.doc
    }

    fn text(&mut self, raw: &str) {
        if raw.trim().is_empty() {
            return;
        }
        let node = self.doc.create_text(&decode_entities(raw));
        let parent = self.current();
        self.doc.append_child(parent, node);
    }

    fn end_tag(&mut self) {
        let rest = self.rest();
        let close = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        let name = rest[2..close]
            .trim_end_matches('>')
            .trim()
            .to_ascii_lowercase();
        self.pos += close;
        if let Some(idx) = self
            .stack
            .iter()
            .rposition(|&n| n != NodeId(0) && self.doc.tag(n) == Some(name.as_str()))
        {
            self.stack.truncate(idx);
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self.take_while(|c| !c.is_whitespace() && c != '/' && c != '>');
        let tag = name.to_ascii_lowercase();
        let node = self.doc.create_element(&tag);
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            let attr = self.take_while(|c| !c.is_whitespace() && c != '=' && c != '>' && c != '/');
            if attr.is_empty() {
                self.pos += 1;
                continue;
            }
            self.skip_whitespace();
            let mut value = String::new();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                value = self.attr_value();
            }
            let attr = attr.to_ascii_lowercase();
            let Some(element) = self.doc.element_mut(node) else {
                continue;
            };
            if attr == "style" {
                element.style = parse_style(&value);
            }
            element.attrs.entry(attr).or_insert(value);
        }

        let parent = self.current();
        self.doc.append_child(parent, node);

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return;
        }
        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let rest = self.rest();
            let closing = format!("</{tag}");
            let end = rest
                .to_ascii_lowercase()
                .find(&closing)
                .unwrap_or(rest.len());
            if !rest[..end].is_empty() {
                let text = self.doc.create_text(&rest[..end]);
                self.doc.append_child(node, text);
            }
            self.pos += end;
        }
        self.stack.push(node);
    }

    fn attr_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                self.pos += 1 + end + usize::from(end < body.len());
                decode_entities(&body[..end])
            }
            _ => {
                let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
                decode_entities(raw)
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }
}

// =============================================================================
// Selectors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

/// A single compound selector such as `.swiper-slide.is-gallery` or
/// `.topic_button[data-topic]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let fail = |reason: &str| DomError::Selector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };
        let src = source.trim();
        if src.is_empty() {
            return Err(fail("empty selector"));
        }

        let mut selector = Selector {
            source: src.to_string(),
            tag: None,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        };

        let mut rest = src;
        if let Some(stripped) = rest.strip_prefix('*') {
            rest = stripped;
        } else {
            let (ident, tail) = split_ident(rest);
            if !ident.is_empty() {
                selector.tag = Some(ident.to_ascii_lowercase());
            }
            rest = tail;
        }

        while let Some(c) = rest.chars().next() {
            match c {
                '.' | '#' => {
                    let (ident, tail) = split_ident(&rest[1..]);
                    if ident.is_empty() {
                        return Err(fail("expected a name after '.' or '#'"));
                    }
                    if c == '.' {
                        selector.classes.push(ident.to_string());
                    } else {
                        selector.id = Some(ident.to_string());
                    }
                    rest = tail;
                }
                '[' => {
                    let close = rest.find(']').ok_or_else(|| fail("unclosed '['"))?;
                    let body = &rest[1..close];
                    let (name, value) = match body.split_once('=') {
                        Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
                        None => (body.trim(), None),
                    };
                    if name.is_empty() {
                        return Err(fail("empty attribute name"));
                    }
                    selector.attrs.push(AttrMatch {
                        name: name.to_ascii_lowercase(),
                        value,
                    });
                    rest = &rest[close + 1..];
                }
                c if c.is_whitespace() || c == '>' || c == '+' || c == '~' || c == ',' => {
                    return Err(fail("combinators and selector lists are not supported"));
                }
                _ => return Err(fail("unexpected character")),
            }
        }

        Ok(selector)
    }

    /// `[name]`: any element carrying the attribute.
    pub fn attribute(name: &str) -> Self {
        Self::from_attr_match(name, None)
    }

    /// `[name=value]`.
    pub fn attribute_equals(name: &str, value: &str) -> Self {
        Self::from_attr_match(name, Some(value))
    }

    fn from_attr_match(name: &str, value: Option<&str>) -> Self {
        let name = name.to_ascii_lowercase();
        let source = match value {
            Some(value) => format!("[{name}=\"{value}\"]"),
            None => format!("[{name}]"),
        };
        Selector {
            source,
            tag: None,
            id: None,
            classes: Vec::new(),
            attrs: vec![AttrMatch {
                name,
                value: value.map(str::to_string),
            }],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, element: &Element) -> bool {
        if self.tag.as_deref().is_some_and(|tag| tag != element.tag) {
            return false;
        }
        if self
            .id
            .as_deref()
            .is_some_and(|id| element.attr("id") != Some(id))
        {
            return false;
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|m| match (&m.value, element.attr(&m.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

fn split_ident(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len());
    s.split_at(end)
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    value.to_string()
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl TryFrom<String> for Selector {
    type Error = DomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Selector::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.source
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl serde::Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> serde::Deserialize<'de> for Selector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Selector::parse(&source).map_err(serde::de::Error::custom)
    }
}
