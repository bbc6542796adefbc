//! Document engine
//!
//!     An arena-backed XML tree that can be parsed, queried with the path subset
//!     in [`xpath`], completed with new elements and attributes, and serialized.
//!
//!     Everything above this module (mapper, tidy assembly) talks to documents
//!     only through this interface:
//!         - [`Document::parse`] / [`Document::to_xml_string`]
//!         - [`Document::select`] evaluating a path against a fragment or the root
//!         - [`Document::namespace_uri`] for prefix resolution
//!         - [`Document::create_element`], [`Document::set_attribute`],
//!           [`Document::set_text`] for completion
//!
//!     Node ids index into the arena and stay valid for the life of the document.
//!     Nodes are never removed, so a fragment captured before a mutation still
//!     names the same node afterwards.

mod parser;
mod serializer;
pub mod xpath;

use crate::error::{Result, SemsynError};
use std::collections::BTreeMap;
use std::fmt;

pub use xpath::{PathError, XPath};

/// Index of a node inside its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The document node
    pub const DOCUMENT: NodeId = NodeId(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str, namespace: Option<&str>) -> Self {
        QName {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local: local.to_string(),
            namespace: namespace.filter(|n| !n.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    /// Declarations made on this element: `(prefix, uri)`, `None` for the default
    pub namespace_decls: Vec<(Option<String>, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A node matched by a path: an element, a text node or one attribute of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fragment {
    Element(NodeId),
    Text(NodeId),
    Attribute(NodeId, usize),
}

impl Fragment {
    /// The node itself, or the owning element of an attribute
    pub fn node(&self) -> NodeId {
        match *self {
            Fragment::Element(id) | Fragment::Text(id) | Fragment::Attribute(id, _) => id,
        }
    }

    pub fn as_element(&self) -> Option<NodeId> {
        match *self {
            Fragment::Element(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    namespaces: BTreeMap<String, String>,
    mutations: usize,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            namespaces: BTreeMap::new(),
            mutations: 0,
        }
    }
}

impl Document {
    /// Parse XML text. Whitespace-only text nodes, comments and processing
    /// instructions are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text)
    }

    /// An empty document with a single document element
    pub fn with_root(namespace: Option<&str>, prefix: Option<&str>, local: &str) -> Self {
        let mut doc = Document::default();
        let mut element = Element {
            name: QName::new(prefix, local, namespace),
            attributes: Vec::new(),
            namespace_decls: Vec::new(),
        };
        if let Some(uri) = namespace {
            element
                .namespace_decls
                .push((element.name.prefix.clone(), uri.to_string()));
            doc.namespaces
                .insert(prefix.unwrap_or_default().to_string(), uri.to_string());
        }
        doc.push(NodeId::DOCUMENT, NodeKind::Element(element));
        doc
    }

    pub(crate) fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn register_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        self.namespaces
            .entry(prefix.unwrap_or_default().to_string())
            .or_insert_with(|| uri.to_string());
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Element(element)) => Ok(element),
            _ => Err(SemsynError::Xml(format!("node {} is not an element", id.0))),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::DOCUMENT)
            .iter()
            .copied()
            .find(|id| self.element(*id).is_some())
    }

    /// Namespace URI bound to `prefix` in the document; `""` is the default namespace.
    ///
    /// Declarations on the document element win over those made deeper.
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Namespace bound to `prefix` in scope at `node`
    pub fn lookup_namespace(&self, node: NodeId, prefix: Option<&str>) -> Option<&str> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(element) = self.element(id) {
                let found = element
                    .namespace_decls
                    .iter()
                    .find(|(p, _)| p.as_deref() == prefix);
                if let Some((_, uri)) = found {
                    return (!uri.is_empty()).then_some(uri.as_str());
                }
            }
            current = self.parent(id);
        }
        None
    }

    /// Number of mutations applied since parsing
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Number of nodes in the arena, document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a new element under `parent`.
    ///
    /// A namespace declaration is added to the new element when the binding it
    /// needs is not already in scope.
    pub fn create_element(
        &mut self,
        parent: NodeId,
        namespace: Option<&str>,
        prefix: Option<&str>,
        local: &str,
    ) -> Result<NodeId> {
        match self.kind(parent) {
            Some(NodeKind::Element(_)) | Some(NodeKind::Document) => {}
            _ => {
                return Err(SemsynError::Xml(format!(
                    "cannot append {local} to a non-element node"
                )))
            }
        }
        let name = QName::new(prefix, local, namespace);
        let in_scope = self
            .lookup_namespace(parent, name.prefix.as_deref())
            .map(str::to_string);
        let mut namespace_decls = Vec::new();
        if in_scope != name.namespace {
            namespace_decls.push((
                name.prefix.clone(),
                name.namespace.clone().unwrap_or_default(),
            ));
        }
        let id = self.push(
            parent,
            NodeKind::Element(Element {
                name,
                attributes: Vec::new(),
                namespace_decls,
            }),
        );
        self.mutations += 1;
        Ok(id)
    }

    /// Set (or replace) an attribute. `name` may carry a prefix, resolved in
    /// scope at the element.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<usize> {
        let (prefix, local) = match name.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, name),
        };
        let namespace = match prefix {
            Some(prefix) => self
                .lookup_namespace(element, Some(prefix))
                .or_else(|| self.namespace_uri(prefix))
                .map(str::to_string),
            None => None,
        };
        let qname = QName::new(prefix, local, namespace.as_deref());
        let target = self.element_mut(element)?;
        let index = match target.attributes.iter().position(|a| a.name == qname) {
            Some(index) => {
                target.attributes[index].value = value.to_string();
                index
            }
            None => {
                target.attributes.push(Attribute {
                    name: qname,
                    value: value.to_string(),
                });
                target.attributes.len() - 1
            }
        };
        self.mutations += 1;
        Ok(index)
    }

    /// Replace the text content of an element with `text`.
    pub fn set_text(&mut self, element: NodeId, text: &str) -> Result<NodeId> {
        self.element_mut(element)?;
        let kept: Vec<NodeId> = self
            .children(element)
            .iter()
            .copied()
            .filter(|child| !matches!(self.kind(*child), Some(NodeKind::Text(_))))
            .collect();
        self.nodes[element.0].children = kept;
        let id = self.push(element, NodeKind::Text(text.to_string()));
        self.mutations += 1;
        Ok(id)
    }

    /// String value of a node: concatenated descendant text for elements
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(NodeKind::Element(_)) | Some(NodeKind::Document) => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
            None => String::new(),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in self.children(id) {
            match self.kind(*child) {
                Some(NodeKind::Text(text)) => out.push_str(text),
                Some(NodeKind::Element(_)) => self.collect_text(*child, out),
                _ => {}
            }
        }
    }

    pub fn attribute(&self, element: NodeId, index: usize) -> Option<&Attribute> {
        self.element(element)?.attributes.get(index)
    }

    /// Text content of a matched fragment
    pub fn text_content(&self, fragment: &Fragment) -> String {
        match *fragment {
            Fragment::Element(id) | Fragment::Text(id) => self.string_value(id),
            Fragment::Attribute(id, index) => self
                .attribute(id, index)
                .map(|a| a.value.clone())
                .unwrap_or_default(),
        }
    }

    /// Qualified name of a fragment, `#text` for text nodes
    pub fn fragment_name(&self, fragment: &Fragment) -> String {
        match *fragment {
            Fragment::Element(id) => self
                .element(id)
                .map(|e| e.name.to_string())
                .unwrap_or_default(),
            Fragment::Text(_) => "#text".to_string(),
            Fragment::Attribute(id, index) => self
                .attribute(id, index)
                .map(|a| format!("@{}", a.name))
                .unwrap_or_default(),
        }
    }

    /// Evaluate a path with `context` as the context node; `None` means the
    /// document node.
    pub fn select(
        &self,
        context: Option<&Fragment>,
        path: &str,
    ) -> std::result::Result<Vec<Fragment>, PathError> {
        XPath::compile(path)?.select(self, context)
    }

    pub fn to_xml_string(&self, indent: usize) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, indent)?;
        String::from_utf8(buffer).map_err(|e| SemsynError::Serialize(e.to_string()))
    }

    pub fn write_to<W: std::io::Write>(&self, writer: W, indent: usize) -> Result<()> {
        serializer::write_document(self, writer, indent)
    }
}
