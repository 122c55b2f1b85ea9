//! The sinks a [`Writer`](crate::Writer) can write to.
//!
//! [`TextSink`] produces XML text; [`TreeSink`] adds nodes to a
//! [`Document`](crate::Document). Implement
//! [`OutputSink`](crate::OutputSink) for anything else.
mod text;
mod tree;

pub use text::TextSink;
pub use tree::TreeSink;
