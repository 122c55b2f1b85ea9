use indextree::{Arena, NodeEdge, NodeId};

use crate::config::WriterConfig;
use crate::context::InScopeNamespaces;
use crate::error::Error;
use crate::output::{TextSink, TreeSink};
use crate::sink::OutputSink;
use crate::writer::Writer;

/// A node in a [`Document`].
/// This is a lightweight value and can be copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node(NodeId);

impl Node {
    #[inline]
    pub(crate) fn new(node_id: NodeId) -> Self {
        Node(node_id)
    }

    #[inline]
    pub(crate) fn get(&self) -> NodeId {
        self.0
    }
}

/// An attribute as stored in a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: String,
    pub local_name: String,
    pub namespace: String,
    pub value: String,
}

/// An element as stored in a [`Document`].
///
/// Besides the resolved name it keeps the prefix it was written with and
/// the namespace declarations it carried, so it can be written out again
/// the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub prefix: String,
    pub local_name: String,
    pub namespace: String,
    /// `(prefix, namespace)` declarations on this element, in order.
    pub prefixes: Vec<(String, String)>,
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Look up an attribute value by namespace and local name.
    pub fn get_attribute(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace == namespace && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }
}

/// The value of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// The document root. Holds the document element and anything around
    /// it, or any number of nodes when it's a fragment.
    Root,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: Option<String> },
}

/// A small in-memory XML tree.
///
/// It's what [`TreeSink`] writes into, and what [`Document::parse`] reads
/// into.
#[derive(Debug)]
pub struct Document {
    pub(crate) arena: Arena<Value>,
    root: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document that only has a root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = Node::new(arena.new_node(Value::Root));
        Document { arena, root }
    }

    /// Parse XML text into a document.
    ///
    /// ```rust
    /// use xot_repair::Document;
    ///
    /// let doc = Document::parse(r#"<p:a xmlns:p="http://example.com"/>"#)?;
    /// let a = doc.document_element().unwrap();
    /// assert_eq!(doc.element(a).unwrap().namespace, "http://example.com");
    /// # Ok::<(), xot_repair::Error>(())
    /// ```
    pub fn parse(xml: &str) -> Result<Self, Error> {
        crate::parse::parse(xml)
    }

    pub fn root(&self) -> Node {
        self.root
    }

    pub fn value(&self, node: Node) -> &Value {
        self.arena[node.get()].get()
    }

    pub(crate) fn value_mut(&mut self, node: Node) -> &mut Value {
        self.arena[node.get()].get_mut()
    }

    pub fn element(&self, node: Node) -> Option<&Element> {
        match self.value(node) {
            Value::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node: Node) -> Option<&mut Element> {
        match self.value_mut(node) {
            Value::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text_str(&self, node: Node) -> Option<&str> {
        match self.value(node) {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, node: Node) -> Option<Node> {
        self.arena[node.get()].parent().map(Node::new)
    }

    pub fn first_child(&self, node: Node) -> Option<Node> {
        self.arena[node.get()].first_child().map(Node::new)
    }

    pub fn last_child(&self, node: Node) -> Option<Node> {
        self.arena[node.get()].last_child().map(Node::new)
    }

    pub fn children(&self, node: Node) -> impl Iterator<Item = Node> + '_ {
        node.get().children(&self.arena).map(Node::new)
    }

    /// The first element below the root.
    pub fn document_element(&self) -> Option<Node> {
        self.children(self.root)
            .find(|node| self.element(*node).is_some())
    }

    /// Add a node as the last child of `parent`. Text next to text is
    /// merged into one node.
    pub(crate) fn append(&mut self, parent: Node, value: Value) -> Node {
        if let Value::Text(text) = &value {
            if let Some(last) = self.last_child(parent) {
                if let Value::Text(existing) = self.value_mut(last) {
                    existing.push_str(text);
                    return last;
                }
            }
        }
        let node_id = self.arena.new_node(value);
        parent.get().append(node_id, &mut self.arena);
        Node::new(node_id)
    }

    /// All namespace bindings in scope at `node`: those declared on it and
    /// on its ancestors, outermost first.
    pub fn namespaces_in_scope(&self, node: Node) -> InScopeNamespaces {
        let ancestors = node
            .get()
            .ancestors(&self.arena)
            .map(Node::new)
            .collect::<Vec<_>>();
        let mut namespaces = InScopeNamespaces::new();
        for ancestor in ancestors.into_iter().rev() {
            if let Some(element) = self.element(ancestor) {
                for (prefix, namespace) in &element.prefixes {
                    namespaces.push(prefix, namespace);
                }
            }
        }
        namespaces
    }

    /// A writer whose output is added below `node`, which has to be the
    /// root or an element.
    ///
    /// The namespaces in scope at `node` are available to the writer and
    /// are reused where they fit.
    pub fn writer_at(
        &mut self,
        node: Node,
        config: &WriterConfig,
    ) -> Result<Writer<TreeSink<'_>>, Error> {
        if !matches!(self.value(node), Value::Root | Value::Element(_)) {
            return Err(Error::NotElement);
        }
        let context = self.namespaces_in_scope(node);
        Writer::with_context(TreeSink::new(self, node), config, &context)
    }

    /// Serialize a node and its descendants to XML text.
    ///
    /// The output stands on its own: namespaces declared above `node` are
    /// declared again where they're needed. Stored prefixes are used where
    /// they don't clash. The root of a document that was written as a
    /// fragment may hold several elements; they're all written.
    pub fn to_string(&self, node: Node) -> Result<String, Error> {
        let mut writer = Writer::with_context(
            TextSink::new(Vec::new()),
            &WriterConfig::default(),
            &InScopeNamespaces::new(),
        )?;
        self.write(node, &mut writer)?;
        writer.end_document()?;
        Ok(writer.into_sink().into_string())
    }

    fn write<S: OutputSink>(
        &self,
        node: Node,
        writer: &mut Writer<S>,
    ) -> Result<(), Error> {
        for edge in node.get().traverse(&self.arena) {
            match edge {
                NodeEdge::Start(node_id) => match self.arena[node_id].get() {
                    Value::Root => {}
                    Value::Element(element) => {
                        writer.start_element(
                            &element.namespace,
                            Some(&element.prefix),
                            &element.local_name,
                        )?;
                        for (prefix, namespace) in &element.prefixes {
                            writer.namespace_decl(prefix, namespace)?;
                        }
                        for attribute in &element.attributes {
                            let prefix =
                                Some(attribute.prefix.as_str()).filter(|p| !p.is_empty());
                            writer.attribute(
                                &attribute.namespace,
                                prefix,
                                &attribute.local_name,
                                &attribute.value,
                            )?;
                        }
                    }
                    Value::Text(text) => writer.text(text)?,
                    Value::Comment(text) => writer.comment(text)?,
                    Value::ProcessingInstruction { target, data } => {
                        writer.processing_instruction(target, data.as_deref())?
                    }
                },
                NodeEdge::End(node_id) => {
                    if let Value::Element(_) = self.arena[node_id].get() {
                        writer.end_element()?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_merges_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append(root, Value::Text("a".to_string()));
        let b = doc.append(root, Value::Text("b".to_string()));
        assert_eq!(a, b);
        assert_eq!(doc.text_str(a), Some("ab"));
    }

    #[test]
    fn test_namespaces_in_scope() {
        let doc = Document::parse(
            r#"<a xmlns="urn:a" xmlns:p="urn:p"><b xmlns:p="urn:q"><c/></b></a>"#,
        )
        .unwrap();
        let a = doc.document_element().unwrap();
        let b = doc.first_child(a).unwrap();
        let c = doc.first_child(b).unwrap();
        let namespaces = doc.namespaces_in_scope(c);
        assert_eq!(
            namespaces.iter().collect::<Vec<_>>(),
            vec![("", "urn:a"), ("p", "urn:q")]
        );
    }

    #[test]
    fn test_writer_at_text_node() {
        let mut doc = Document::parse("<a>text</a>").unwrap();
        let a = doc.document_element().unwrap();
        let text = doc.first_child(a).unwrap();
        assert!(matches!(
            doc.writer_at(text, &WriterConfig::default()),
            Err(Error::NotElement)
        ));
    }
}
