#![forbid(unsafe_code)]

//! A streaming XML writer that repairs namespaces.
//!
//! You write elements and attributes by namespace URI and local name. The
//! [`Writer`] decides which prefix each name gets and which namespace
//! declarations are needed:
//!
//! - A binding that's already in scope is reused; no declaration is
//!   written twice on a path from the root.
//! - A declaration made for one element is only visible in that element
//!   and its descendants, so siblings never see each other's bindings.
//! - Attributes in a namespace always get a prefix, because unprefixed
//!   attributes are in no namespace.
//! - `xml` and `xmlns` keep their reserved meanings.
//!
//! ```rust
//! use xot_repair::{TextSink, Writer};
//!
//! let mut writer = Writer::new(TextSink::new(Vec::new()));
//! writer.set_prefix_hint("ex", "http://example.com")?;
//! writer.start_element("http://example.com", None, "doc")?;
//! writer.attribute("", None, "id", "1")?;
//! writer.start_element("http://example.com", None, "item")?;
//! writer.text("hello")?;
//! writer.end_document()?;
//! assert_eq!(
//!     writer.into_sink().into_string(),
//!     r#"<ex:doc xmlns:ex="http://example.com" id="1"><ex:item>hello</ex:item></ex:doc>"#
//! );
//! # Ok::<(), xot_repair::Error>(())
//! ```
//!
//! Output goes to an [`OutputSink`]: a [`TextSink`] for XML text, or a
//! [`TreeSink`] to add to a [`Document`]. When writing below an element of
//! a document, the namespaces in scope there are reused.

mod allocator;
mod binding;
mod config;
mod context;
mod document;
mod engine;
mod entity;
mod error;
mod id;
mod idmap;
mod names;
pub mod output;
mod parse;
mod pool;
mod scope;
mod sink;
mod writer;

#[cfg(feature = "proptest")]
pub mod proptest;

pub use allocator::PrefixHints;
pub use config::{TextParameters, WriterConfig};
pub use context::{InScopeNamespaces, NamespaceContext};
pub use document::{Attribute, Document, Element, Node, Value};
pub use error::Error;
pub use names::{XMLNS_NAMESPACE, XML_NAMESPACE};
pub use output::{TextSink, TreeSink};
pub use sink::{Name, OutputSink};
pub use writer::Writer;
