use std::borrow::Cow;

use xmlparser::{ElementEnd, Token, Tokenizer};

use crate::document::{Attribute, Document, Element, Node, Value};
use crate::entity::parse_entities;
use crate::error::Error;
use crate::names::Names;
use crate::scope::ScopeStack;

// a start tag as it's being read; names are resolved once it's complete
#[derive(Debug, Default)]
struct StartTag {
    prefix: String,
    local_name: String,
    prefixes: Vec<(String, String)>,
    attributes: Vec<(String, String, String)>,
}

struct DocumentBuilder {
    document: Document,
    names: Names,
    scopes: ScopeStack,
    current: Node,
    start_tag: Option<StartTag>,
}

impl DocumentBuilder {
    fn new() -> Self {
        let document = Document::new();
        let names = Names::new();
        let mut scopes = ScopeStack::new(names.empty_prefix_id, names.no_namespace_id);
        scopes.bind(names.xml_prefix_id, names.xml_namespace_id);
        let current = document.root();
        DocumentBuilder {
            document,
            names,
            scopes,
            current,
            start_tag: None,
        }
    }

    fn element_start(&mut self, prefix: &str, local_name: &str) {
        self.start_tag = Some(StartTag {
            prefix: prefix.to_string(),
            local_name: local_name.to_string(),
            ..Default::default()
        });
    }

    fn attribute(&mut self, prefix: &str, local_name: &str, value: Cow<str>) -> Result<(), Error> {
        let value = parse_entities(value)?;
        if let Some(start_tag) = &mut self.start_tag {
            if prefix == "xmlns" {
                start_tag
                    .prefixes
                    .push((local_name.to_string(), value.into_owned()));
            } else if prefix.is_empty() && local_name == "xmlns" {
                start_tag.prefixes.push((String::new(), value.into_owned()));
            } else {
                start_tag.attributes.push((
                    prefix.to_string(),
                    local_name.to_string(),
                    value.into_owned(),
                ));
            }
        }
        Ok(())
    }

    fn namespace(&self, prefix: &str) -> Result<&str, Error> {
        self.names
            .prefix(prefix)
            .and_then(|prefix_id| self.scopes.lookup_namespace(prefix_id))
            .map(|namespace_id| self.names.namespace_str(namespace_id))
            .ok_or_else(|| Error::UnknownPrefix(prefix.to_string()))
    }

    fn open_element(&mut self) -> Result<(), Error> {
        let start_tag = match self.start_tag.take() {
            Some(start_tag) => start_tag,
            None => return Ok(()),
        };
        self.scopes.push();
        for (prefix, namespace) in &start_tag.prefixes {
            let prefix_id = self.names.add_prefix(prefix);
            let namespace_id = self.names.add_namespace(namespace);
            if prefix_id != self.names.empty_prefix_id && namespace_id == self.names.no_namespace_id
            {
                return Err(Error::PrefixWithoutNamespace(prefix.clone()));
            }
            self.names.check_binding(prefix_id, namespace_id)?;
            self.scopes.bind(prefix_id, namespace_id);
        }
        let namespace = self.namespace(&start_tag.prefix)?.to_string();
        let attributes = start_tag
            .attributes
            .into_iter()
            .map(|(prefix, local_name, value)| -> Result<Attribute, Error> {
                // unprefixed attributes are in no namespace
                let namespace = if prefix.is_empty() {
                    String::new()
                } else {
                    self.namespace(&prefix)?.to_string()
                };
                Ok(Attribute {
                    prefix,
                    local_name,
                    namespace,
                    value,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let element = Element {
            prefix: start_tag.prefix,
            local_name: start_tag.local_name,
            namespace,
            prefixes: start_tag.prefixes,
            attributes,
        };
        self.current = self
            .document
            .append(self.current, Value::Element(element));
        Ok(())
    }

    fn close_element(&mut self, prefix: &str, local_name: &str) -> Result<(), Error> {
        let element = self
            .document
            .element(self.current)
            .ok_or(Error::NoOpenElement)?;
        if element.prefix != prefix || element.local_name != local_name {
            return Err(Error::InvalidCloseTag(
                qualified(&element.prefix, &element.local_name),
                qualified(prefix, local_name),
            ));
        }
        self.end()
    }

    fn end(&mut self) -> Result<(), Error> {
        self.scopes.pop();
        self.current = self
            .document
            .parent(self.current)
            .ok_or(Error::NoOpenElement)?;
        Ok(())
    }

    fn add(&mut self, value: Value) {
        self.document.append(self.current, value);
    }
}

fn qualified(prefix: &str, local_name: &str) -> String {
    if prefix.is_empty() {
        local_name.to_string()
    } else {
        format!("{}:{}", prefix, local_name)
    }
}

pub(crate) fn parse(xml: &str) -> Result<Document, Error> {
    let mut builder = DocumentBuilder::new();

    for token in Tokenizer::from(xml) {
        match token? {
            Token::Declaration { .. } => {}
            Token::DtdStart { .. }
            | Token::EmptyDtd { .. }
            | Token::EntityDeclaration { .. }
            | Token::DtdEnd { .. } => {
                return Err(Error::DtdUnsupported);
            }
            Token::ElementStart { prefix, local, .. } => {
                builder.element_start(prefix.as_str(), local.as_str());
            }
            Token::Attribute {
                prefix,
                local,
                value,
                ..
            } => {
                builder.attribute(prefix.as_str(), local.as_str(), value.as_str().into())?;
            }
            Token::ElementEnd { end, .. } => match end {
                ElementEnd::Open => builder.open_element()?,
                ElementEnd::Close(prefix, local) => {
                    builder.close_element(prefix.as_str(), local.as_str())?
                }
                ElementEnd::Empty => {
                    builder.open_element()?;
                    builder.end()?;
                }
            },
            Token::Text { text } => {
                // whitespace between top-level nodes isn't kept
                if builder.current != builder.document.root() {
                    let text = parse_entities(text.as_str().into())?;
                    builder.add(Value::Text(text.into_owned()));
                }
            }
            Token::Cdata { text, .. } => {
                builder.add(Value::Text(text.as_str().to_string()));
            }
            Token::Comment { text, .. } => {
                builder.add(Value::Comment(text.as_str().to_string()));
            }
            Token::ProcessingInstruction {
                target, content, ..
            } => {
                builder.add(Value::ProcessingInstruction {
                    target: target.as_str().to_string(),
                    data: content.map(|c| c.as_str().to_string()),
                });
            }
        }
    }

    Ok(builder.document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefixes() {
        let doc = parse(r#"<a xmlns="urn:a" xmlns:p="urn:p"><p:b p:x="1" y="2"/></a>"#).unwrap();
        let a = doc.document_element().unwrap();
        assert_eq!(doc.element(a).unwrap().namespace, "urn:a");
        let b = doc.element(doc.first_child(a).unwrap()).unwrap();
        assert_eq!(b.namespace, "urn:p");
        assert_eq!(b.get_attribute("urn:p", "x"), Some("1"));
        assert_eq!(b.get_attribute("", "y"), Some("2"));
    }

    #[test]
    fn test_undeclared_default() {
        let doc = parse(r#"<a xmlns="urn:a"><b xmlns=""/></a>"#).unwrap();
        let a = doc.document_element().unwrap();
        let b = doc.element(doc.first_child(a).unwrap()).unwrap();
        assert_eq!(b.namespace, "");
    }

    #[test]
    fn test_xml_prefix() {
        let doc = parse(r#"<a xml:lang="en"/>"#).unwrap();
        let a = doc.element(doc.document_element().unwrap()).unwrap();
        assert_eq!(
            a.get_attribute("http://www.w3.org/XML/1998/namespace", "lang"),
            Some("en")
        );
    }

    #[test]
    fn test_unknown_prefix() {
        assert!(matches!(
            parse("<p:a/>"),
            Err(Error::UnknownPrefix(prefix)) if prefix == "p"
        ));
    }

    #[test]
    fn test_invalid_close_tag() {
        assert!(matches!(
            parse("<a></b>"),
            Err(Error::InvalidCloseTag(open, close)) if open == "a" && close == "b"
        ));
    }

    #[test]
    fn test_dtd_unsupported() {
        assert!(matches!(
            parse("<!DOCTYPE a><a/>"),
            Err(Error::DtdUnsupported)
        ));
    }

    #[test]
    fn test_entities_and_cdata() {
        let doc = parse("<a>x &amp; <![CDATA[<y>]]></a>").unwrap();
        let a = doc.document_element().unwrap();
        assert_eq!(doc.text_str(doc.first_child(a).unwrap()), Some("x & <y>"));
    }
}
