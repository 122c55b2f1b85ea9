use crate::document::{Attribute, Document, Element, Node, Value};
use crate::error::Error;
use crate::sink::{Name, OutputSink};

/// Sink that adds what's written to a [`Document`], below a target node.
///
/// Usually obtained through [`Document::writer_at`], which also makes the
/// namespaces in scope at the target available to the writer.
#[derive(Debug)]
pub struct TreeSink<'a> {
    document: &'a mut Document,
    current: Node,
}

impl<'a> TreeSink<'a> {
    pub fn new(document: &'a mut Document, node: Node) -> Self {
        Self {
            document,
            current: node,
        }
    }

    /// The node new content is added to.
    pub fn current(&self) -> Node {
        self.current
    }

    fn current_element(&mut self) -> Result<&mut Element, Error> {
        self.document
            .element_mut(self.current)
            .ok_or(Error::NotElement)
    }
}

impl<'a> OutputSink for TreeSink<'a> {
    fn emit_start(&mut self, name: &Name) -> Result<(), Error> {
        let element = Element {
            prefix: name.prefix.to_string(),
            local_name: name.local_name.to_string(),
            namespace: name.namespace.to_string(),
            ..Default::default()
        };
        self.current = self
            .document
            .append(self.current, Value::Element(element));
        Ok(())
    }

    fn emit_namespace_decl(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
        self.current_element()?
            .prefixes
            .push((prefix.to_string(), namespace.to_string()));
        Ok(())
    }

    fn emit_attribute(&mut self, name: &Name, value: &str) -> Result<(), Error> {
        self.current_element()?.attributes.push(Attribute {
            prefix: name.prefix.to_string(),
            local_name: name.local_name.to_string(),
            namespace: name.namespace.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn emit_end(&mut self, _name: &Name) -> Result<(), Error> {
        self.current = self
            .document
            .parent(self.current)
            .ok_or(Error::NoOpenElement)?;
        Ok(())
    }

    fn emit_text(&mut self, text: &str) -> Result<(), Error> {
        self.document
            .append(self.current, Value::Text(text.to_string()));
        Ok(())
    }

    fn emit_comment(&mut self, text: &str) -> Result<(), Error> {
        self.document
            .append(self.current, Value::Comment(text.to_string()));
        Ok(())
    }

    fn emit_processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<(), Error> {
        self.document.append(
            self.current,
            Value::ProcessingInstruction {
                target: target.to_string(),
                data: data.map(|d| d.to_string()),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_tree() {
        let mut doc = Document::new();
        let root = doc.root();
        let mut sink = TreeSink::new(&mut doc, root);
        let a = Name {
            prefix: "p",
            local_name: "a",
            namespace: "urn:p",
        };
        sink.emit_start(&a).unwrap();
        sink.emit_namespace_decl("p", "urn:p").unwrap();
        sink.emit_text("x").unwrap();
        sink.emit_end(&a).unwrap();
        assert_eq!(sink.current(), root);

        let a = doc.document_element().unwrap();
        let element = doc.element(a).unwrap();
        assert_eq!(element.prefixes, vec![("p".to_string(), "urn:p".to_string())]);
        assert_eq!(doc.text_str(doc.first_child(a).unwrap()), Some("x"));
    }

    #[test]
    fn test_attribute_on_root_fails() {
        let mut doc = Document::new();
        let root = doc.root();
        let mut sink = TreeSink::new(&mut doc, root);
        let name = Name {
            prefix: "",
            local_name: "a",
            namespace: "",
        };
        assert!(matches!(
            sink.emit_attribute(&name, "1"),
            Err(Error::NotElement)
        ));
    }
}
