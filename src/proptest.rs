//! Proptest support
//!
//! Proptests allow you to test for *properties* of your code that must hold
//! for arbitrary data. This module generates arbitrary writer scripts: trees
//! of elements, attributes and text described by namespace URI, local name
//! and an optional preferred prefix, which can be replayed on a
//! [`Writer`].
//!
//! This can be enabled by adding the `proptest` feature to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! xot-repair = { version = "0.1", features = ["proptest"] }
//! ```
//!
//! See the [`proptest`](https://docs.rs/proptest/latest/proptest/)
//! documentation for more information.

use ahash::HashSet;
use proptest::prelude::*;

use crate::error::Error;
use crate::sink::OutputSink;
use crate::writer::Writer;

const NAMESPACES: &[&str] = &["", "http://example.com/x", "http://example.com/y"];
const PREFIXES: &[&str] = &["", "x", "y", "ns1"];
const ELEMENT_NAMES: &[&str] = &["a", "b", "c", "d", "e"];
const ATTRIBUTE_NAMES: &[&str] = &["q", "r", "s"];
const XML_STRING: &str = "[\u{0020}-\u{D7FF}\u{E000}-\u{FFFD}]*";

/// An attribute to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAttribute {
    pub namespace: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

/// An element to write, with its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub namespace: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub attributes: Vec<ScriptAttribute>,
    pub children: Vec<ScriptContent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptContent {
    Element(ScriptElement),
    Text(String),
    Comment(String),
}

impl ScriptElement {
    /// Write this element and everything in it.
    pub fn replay<S: OutputSink>(&self, writer: &mut Writer<S>) -> Result<(), Error> {
        writer.start_element(&self.namespace, self.prefix.as_deref(), &self.local_name)?;
        for attribute in &self.attributes {
            writer.attribute(
                &attribute.namespace,
                attribute.prefix.as_deref(),
                &attribute.local_name,
                &attribute.value,
            )?;
        }
        for child in &self.children {
            match child {
                ScriptContent::Element(element) => element.replay(writer)?,
                ScriptContent::Text(text) => writer.text(text)?,
                ScriptContent::Comment(text) => writer.comment(text)?,
            }
        }
        writer.end_element()
    }

    /// All `(namespace, local name)` pairs of elements, in document order.
    pub fn element_names(&self) -> Vec<(String, String)> {
        let mut names = vec![(self.namespace.clone(), self.local_name.clone())];
        for child in &self.children {
            if let ScriptContent::Element(element) = child {
                names.extend(element.element_names());
            }
        }
        names
    }

    /// All `(namespace, local name, value)` triples of attributes, element
    /// by element in document order.
    pub fn attribute_names(&self) -> Vec<(String, String, String)> {
        let mut names = self
            .attributes
            .iter()
            .map(|a| (a.namespace.clone(), a.local_name.clone(), a.value.clone()))
            .collect::<Vec<_>>();
        for child in &self.children {
            if let ScriptContent::Element(element) = child {
                names.extend(element.attribute_names());
            }
        }
        names
    }
}

// a preferred prefix only makes sense for a name in a namespace
fn arb_name(
    names: &'static [&'static str],
) -> impl Strategy<Value = (String, Option<String>, String)> {
    (
        prop::sample::select(NAMESPACES),
        prop::option::of(prop::sample::select(PREFIXES)),
        prop::sample::select(names),
    )
        .prop_map(|(namespace, prefix, local_name)| {
            let prefix = if namespace.is_empty() {
                None
            } else {
                prefix.map(|p| p.to_string())
            };
            (namespace.to_string(), prefix, local_name.to_string())
        })
}

fn arb_attribute() -> impl Strategy<Value = ScriptAttribute> {
    (arb_name(ATTRIBUTE_NAMES), XML_STRING).prop_map(|((namespace, prefix, local_name), value)| {
        ScriptAttribute {
            namespace,
            prefix,
            local_name,
            value,
        }
    })
}

fn arb_comment() -> impl Strategy<Value = String> {
    XML_STRING.prop_filter("comment", |s| !s.contains('-'))
}

fn arb_content() -> impl Strategy<Value = ScriptContent> {
    let leaf = prop_oneof![
        XML_STRING
            .prop_filter("non-empty text", |s| !s.is_empty())
            .prop_map(ScriptContent::Text),
        arb_comment().prop_map(ScriptContent::Comment),
    ];

    leaf.prop_recursive(
        6,   // levels deep
        128, // maximum size of 128 nodes
        6,   // up to 6 items per collection
        |inner| {
            (
                arb_name(ELEMENT_NAMES),
                prop::collection::vec(arb_attribute(), 0..4),
                prop::collection::vec(inner, 0..6),
            )
                .prop_map(|((namespace, prefix, local_name), attributes, children)| {
                    ScriptContent::Element(ScriptElement {
                        namespace,
                        prefix,
                        local_name,
                        attributes: unduplicate_attributes(attributes),
                        children,
                    })
                })
        },
    )
}

// attributes are identified by namespace and local name, whatever the
// prefix
fn unduplicate_attributes(attributes: Vec<ScriptAttribute>) -> Vec<ScriptAttribute> {
    let mut seen = HashSet::default();
    attributes
        .into_iter()
        .filter(|a| seen.insert((a.namespace.clone(), a.local_name.clone())))
        .collect()
}

/// Generate a random document element to replay on a writer.
///
/// Example:
///
/// ```notrust
/// use xot_repair::proptest::arb_script;
/// use xot_repair::{Document, TextSink, Writer};
///
/// proptest! {
///   #[test]
///   fn test_script_output_parses(script in arb_script()) {
///     let mut writer = Writer::new(TextSink::new(Vec::new()));
///     script.replay(&mut writer).unwrap();
///     let xml = writer.into_sink().into_string();
///     prop_assert!(Document::parse(&xml).is_ok());
///   }
/// }
/// ```
pub fn arb_script() -> impl Strategy<Value = ScriptElement> {
    (
        arb_name(ELEMENT_NAMES),
        prop::collection::vec(arb_attribute(), 0..4),
        prop::collection::vec(arb_content(), 0..6),
    )
        .prop_map(
            |((namespace, prefix, local_name), attributes, children)| ScriptElement {
                namespace,
                prefix,
                local_name,
                attributes: unduplicate_attributes(attributes),
                children,
            },
        )
}
