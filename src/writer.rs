use tracing::warn;

use crate::config::WriterConfig;
use crate::context::{InScopeNamespaces, NamespaceContext};
use crate::engine::RepairEngine;
use crate::error::Error;
use crate::sink::OutputSink;

/// A streaming XML writer that takes care of namespace prefixes.
///
/// You describe elements and attributes by namespace URI and local name;
/// the writer picks the prefixes, writes the declarations that are needed
/// and leaves out the ones that would be redundant. A preferred prefix can
/// be given with each name, and [`Writer::set_prefix_hint`] suggests one
/// per namespace.
///
/// ```rust
/// use xot_repair::{TextSink, Writer};
///
/// let mut writer = Writer::new(TextSink::new(Vec::new()));
/// writer.start_element("http://example.com", None, "test")?;
/// writer.empty_element("http://example.com", None, "leaf")?;
/// writer.attribute("http://example.com", None, "attr", "value")?;
/// writer.end_element()?;
/// assert_eq!(
///     writer.into_sink().into_string(),
///     r#"<ns1:test xmlns:ns1="http://example.com"><ns1:leaf ns1:attr="value"/></ns1:test>"#
/// );
/// # Ok::<(), xot_repair::Error>(())
/// ```
///
/// A writer made with [`Writer::new`] or [`Writer::with_config`] writes a
/// document: there is one document element, and only whitespace text,
/// comments and processing instructions around it. A writer made with
/// [`Writer::with_context`] writes a fragment below existing content and
/// can write any number of elements and text at the top level.
///
/// Any error is fatal. The writer is poisoned and every later call returns
/// [`Error::Poisoned`].
#[derive(Debug)]
pub struct Writer<S: OutputSink> {
    engine: RepairEngine,
    sink: S,
    fragment: bool,
    document_element_written: bool,
    start_tag_open: bool,
    // the open start tag belongs to an empty element
    pending_empty: bool,
    closed: bool,
    poisoned: bool,
}

impl<S: OutputSink> Writer<S> {
    /// Create a repairing writer with the default configuration.
    pub fn new(sink: S) -> Self {
        Self::from_engine(sink, RepairEngine::with_defaults(), false)
    }

    /// Create a writer with the given configuration.
    ///
    /// Fails if one of the configured hints binds a reserved prefix or
    /// namespace, or if the prefix stem can't start a name.
    pub fn with_config(sink: S, config: &WriterConfig) -> Result<Self, Error> {
        Ok(Self::from_engine(
            sink,
            RepairEngine::new::<InScopeNamespaces>(config, None)?,
            false,
        ))
    }

    /// Create a writer whose output goes below existing content. The
    /// bindings of `context` are in scope from the start. They are reused
    /// when they fit, but never changed.
    ///
    /// The output is a fragment, so there can be more than one element at
    /// the top level.
    pub fn with_context<C: NamespaceContext + ?Sized>(
        sink: S,
        config: &WriterConfig,
        context: &C,
    ) -> Result<Self, Error> {
        Ok(Self::from_engine(
            sink,
            RepairEngine::new(config, Some(context))?,
            true,
        ))
    }

    fn from_engine(sink: S, engine: RepairEngine, fragment: bool) -> Self {
        Self {
            engine,
            sink,
            fragment,
            document_element_written: false,
            start_tag_open: false,
            pending_empty: false,
            closed: false,
            poisoned: false,
        }
    }

    // every public operation goes through here, so that a failure poisons
    // the writer
    fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        if self.closed {
            return Err(Error::Closed);
        }
        let result = f(self);
        if let Err(e) = &result {
            warn!(error = %e, "writer poisoned");
            self.poisoned = true;
        }
        result
    }

    // complete the open start tag before anything structural happens
    fn finish_start_tag(&mut self) -> Result<(), Error> {
        if !self.start_tag_open {
            return Ok(());
        }
        self.engine.verify_start_tag()?;
        self.start_tag_open = false;
        if self.pending_empty {
            self.pending_empty = false;
            self.engine.end_element(&mut self.sink)?;
        }
        Ok(())
    }

    fn open_element(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
        local_name: &str,
    ) -> Result<(), Error> {
        self.finish_start_tag()?;
        let top_level = self.engine.depth() == 0;
        if top_level && !self.fragment && self.document_element_written {
            return Err(Error::DocumentElementClosed);
        }
        self.engine
            .start_element(&mut self.sink, namespace, prefix, local_name)?;
        self.document_element_written |= top_level;
        self.start_tag_open = true;
        Ok(())
    }

    // a document only has whitespace outside the document element
    fn check_top_level_text(&self, text: &str) -> Result<(), Error> {
        if self.fragment || self.engine.depth() > 0 {
            return Ok(());
        }
        if text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            return Ok(());
        }
        if self.document_element_written {
            Err(Error::DocumentElementClosed)
        } else {
            Err(Error::NoOpenElement)
        }
    }

    /// Write the XML declaration.
    pub fn start_document(&mut self) -> Result<(), Error> {
        self.guard(|w| w.sink.emit_declaration())
    }

    /// Close all open elements. The writer can't be used afterwards.
    pub fn end_document(&mut self) -> Result<(), Error> {
        self.guard(|w| {
            w.finish_start_tag()?;
            while w.engine.depth() > 0 {
                w.engine.end_element(&mut w.sink)?;
            }
            w.closed = true;
            Ok(())
        })
    }

    /// Open an element. `prefix` is the preferred prefix; with `None` the
    /// writer decides.
    pub fn start_element(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
        local_name: &str,
    ) -> Result<(), Error> {
        self.guard(|w| w.open_element(namespace, prefix, local_name))
    }

    /// Open an element that has no content. Attributes and declarations can
    /// still be added; the element is closed by the next call that isn't
    /// one of those.
    pub fn empty_element(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
        local_name: &str,
    ) -> Result<(), Error> {
        self.guard(|w| {
            w.open_element(namespace, prefix, local_name)?;
            w.pending_empty = true;
            Ok(())
        })
    }

    /// Close the innermost open element.
    pub fn end_element(&mut self) -> Result<(), Error> {
        self.guard(|w| {
            w.finish_start_tag()?;
            w.engine.end_element(&mut w.sink)
        })
    }

    /// Add an attribute to the open start tag. Attributes without a prefix
    /// are in no namespace, so an attribute in a namespace always gets a
    /// prefix, even where an element in the same namespace wouldn't.
    pub fn attribute(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<(), Error> {
        self.guard(|w| {
            if !w.start_tag_open {
                return Err(Error::NoOpenStartTag);
            }
            w.engine
                .attribute(&mut w.sink, namespace, prefix, local_name, value)
        })
    }

    /// Declare a prefix on the open start tag. An empty prefix sets the
    /// default namespace.
    ///
    /// Declaring a prefix that's already in scope with the same namespace
    /// does nothing in repairing mode.
    pub fn namespace_decl(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
        self.guard(|w| {
            if !w.start_tag_open {
                return Err(Error::NoOpenStartTag);
            }
            w.engine.namespace_decl(&mut w.sink, prefix, namespace)
        })
    }

    /// Set the default namespace on the open start tag. An empty namespace
    /// undeclares it.
    pub fn default_namespace(&mut self, namespace: &str) -> Result<(), Error> {
        self.guard(|w| {
            if !w.start_tag_open {
                return Err(Error::NoOpenStartTag);
            }
            w.engine.default_namespace(&mut w.sink, namespace)
        })
    }

    /// Suggest a prefix to use when a binding for `namespace` has to be
    /// made up. The last suggestion for a namespace wins.
    pub fn set_prefix_hint(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
        self.guard(|w| w.engine.set_prefix_hint(prefix, namespace))
    }

    /// Write text content. Outside the document element only whitespace
    /// is allowed, unless this writer writes a fragment.
    pub fn text(&mut self, text: &str) -> Result<(), Error> {
        self.guard(|w| {
            w.finish_start_tag()?;
            w.check_top_level_text(text)?;
            w.sink.emit_text(text)
        })
    }

    /// Write text content as a CDATA section.
    pub fn cdata(&mut self, text: &str) -> Result<(), Error> {
        self.guard(|w| {
            w.finish_start_tag()?;
            // even whitespace in a CDATA section is content
            if !w.fragment && w.engine.depth() == 0 {
                return Err(if w.document_element_written {
                    Error::DocumentElementClosed
                } else {
                    Error::NoOpenElement
                });
            }
            w.sink.emit_cdata(text)
        })
    }

    /// Write a comment. It may not contain `--` or end with `-`.
    pub fn comment(&mut self, text: &str) -> Result<(), Error> {
        self.guard(|w| {
            if text.contains("--") || text.ends_with('-') {
                return Err(Error::InvalidComment(text.to_string()));
            }
            w.finish_start_tag()?;
            w.sink.emit_comment(text)
        })
    }

    /// Write a processing instruction. The target can't be empty or `xml`
    /// in any case, and the data can't contain `?>`.
    pub fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<(), Error> {
        self.guard(|w| {
            if target.is_empty()
                || target.eq_ignore_ascii_case("xml")
                || target.chars().any(|c| c.is_whitespace() || c == '?')
            {
                return Err(Error::InvalidProcessingInstruction(target.to_string()));
            }
            if let Some(data) = data.filter(|data| data.contains("?>")) {
                return Err(Error::InvalidProcessingInstruction(data.to_string()));
            }
            w.finish_start_tag()?;
            w.sink.emit_processing_instruction(target, data)
        })
    }

    /// The prefix an element in `namespace` would get right now without a
    /// new declaration.
    pub fn prefix_for_namespace(&self, namespace: &str) -> Option<&str> {
        self.engine.prefix_for_namespace(namespace)
    }

    /// The namespace `prefix` is bound to right now. The empty prefix gives
    /// the default namespace, which is empty if there is none.
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.engine.namespace_for_prefix(prefix)
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.engine.depth()
    }

    /// Whether the writer repairs namespaces.
    pub fn is_repairing(&self) -> bool {
        self.engine.is_repairing()
    }

    /// Whether an earlier call failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Get back the sink. Elements that are still open are left as they
    /// are; call [`Writer::end_document`] first to close them.
    pub fn into_sink(self) -> S {
        self.sink
    }

    #[cfg(test)]
    pub(crate) fn pool_stats(&self) -> (usize, usize) {
        self.engine.pool_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::TextSink;

    fn writer() -> Writer<TextSink<Vec<u8>>> {
        Writer::new(TextSink::new(Vec::new()))
    }

    #[test]
    fn test_empty_element_closes_itself() {
        let mut w = writer();
        w.start_element("", None, "a").unwrap();
        w.empty_element("", None, "b").unwrap();
        w.attribute("", None, "x", "1").unwrap();
        w.text("t").unwrap();
        w.end_element().unwrap();
        assert_eq!(w.into_sink().into_string(), r#"<a><b x="1"/>t</a>"#);
    }

    #[test]
    fn test_empty_element_before_end() {
        let mut w = writer();
        w.start_element("", None, "a").unwrap();
        w.empty_element("", None, "b").unwrap();
        w.end_element().unwrap();
        assert_eq!(w.depth(), 0);
        assert_eq!(w.into_sink().into_string(), "<a><b/></a>");
    }

    #[test]
    fn test_end_document_closes_all() {
        let mut w = writer();
        w.start_document().unwrap();
        w.start_element("", None, "a").unwrap();
        w.start_element("", None, "b").unwrap();
        w.text("x").unwrap();
        w.end_document().unwrap();
        assert!(matches!(w.text("y"), Err(Error::Closed)));
        assert_eq!(
            w.into_sink().into_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?><a><b>x</b></a>"#
        );
    }

    #[test]
    fn test_attribute_after_content() {
        let mut w = writer();
        w.start_element("", None, "a").unwrap();
        w.text("x").unwrap();
        assert!(matches!(
            w.attribute("", None, "b", "1"),
            Err(Error::NoOpenStartTag)
        ));
        assert!(w.is_poisoned());
        assert!(matches!(w.end_element(), Err(Error::Poisoned)));
    }

    #[test]
    fn test_invalid_comment() {
        let mut w = writer();
        assert!(matches!(w.comment("a--b"), Err(Error::InvalidComment(_))));
        let mut w = writer();
        assert!(matches!(w.comment("a-"), Err(Error::InvalidComment(_))));
    }

    #[test]
    fn test_pool_reuse() {
        let mut w = writer();
        w.start_element("", None, "root").unwrap();
        for _ in 0..100 {
            w.start_element("urn:a", None, "a").unwrap();
            w.start_element("urn:b", None, "b").unwrap();
            w.end_element().unwrap();
            w.end_element().unwrap();
        }
        w.end_element().unwrap();
        // root scope plus three element scopes, all back in the pool
        assert_eq!(w.pool_stats(), (4, 3));
    }

    #[test]
    fn test_second_document_element_rejected() {
        let mut w = writer();
        w.start_element("", None, "a").unwrap();
        w.end_element().unwrap();
        w.comment(" after ").unwrap();
        w.text("\n").unwrap();
        assert!(matches!(
            w.start_element("", None, "b"),
            Err(Error::DocumentElementClosed)
        ));
        assert!(w.is_poisoned());
        assert_eq!(w.into_sink().into_string(), "<a/><!-- after -->\n");
    }

    #[test]
    fn test_second_empty_document_element_rejected() {
        let mut w = writer();
        w.empty_element("", None, "a").unwrap();
        assert!(matches!(
            w.empty_element("", None, "b"),
            Err(Error::DocumentElementClosed)
        ));
        assert_eq!(w.into_sink().into_string(), "<a/>");
    }

    #[test]
    fn test_text_after_document_element_rejected() {
        let mut w = writer();
        w.start_element("", None, "a").unwrap();
        w.end_element().unwrap();
        assert!(matches!(w.text("junk"), Err(Error::DocumentElementClosed)));
        assert_eq!(w.into_sink().into_string(), "<a/>");
    }

    #[test]
    fn test_text_before_document_element_rejected() {
        let mut w = writer();
        w.text(" ").unwrap();
        assert!(matches!(w.text("junk"), Err(Error::NoOpenElement)));
        let mut w = writer();
        assert!(matches!(w.cdata(" "), Err(Error::NoOpenElement)));
    }

    #[test]
    fn test_fragment_allows_several_top_level_elements() {
        let context: [(&str, &str); 0] = [];
        let mut w = Writer::with_context(
            TextSink::new(Vec::new()),
            &WriterConfig::default(),
            &context,
        )
        .unwrap();
        w.empty_element("", None, "a").unwrap();
        w.text("between").unwrap();
        w.empty_element("", None, "b").unwrap();
        w.end_document().unwrap();
        assert_eq!(w.into_sink().into_string(), "<a/>between<b/>");
    }

    #[test]
    fn test_invalid_processing_instruction() {
        for (target, data) in [
            ("", None),
            ("xml", None),
            ("XmL", Some("x")),
            ("a b", None),
            ("t?", None),
            ("t", Some("x ?> <evil/>")),
        ] {
            let mut w = writer();
            w.start_element("", None, "a").unwrap();
            assert!(
                matches!(
                    w.processing_instruction(target, data),
                    Err(Error::InvalidProcessingInstruction(_))
                ),
                "{:?} {:?}",
                target,
                data
            );
            // the start tag is still open, nothing was written for the call
            assert_eq!(w.into_sink().into_string(), "<a");
        }
    }

    #[test]
    fn test_processing_instruction_with_question_mark_in_data() {
        let mut w = writer();
        w.start_element("", None, "a").unwrap();
        w.processing_instruction("xml-stylesheet", Some("a?b >")).unwrap();
        w.end_element().unwrap();
        assert_eq!(
            w.into_sink().into_string(),
            "<a><?xml-stylesheet a?b >?></a>"
        );
    }

    #[test]
    fn test_invalid_prefix_stem() {
        let config = WriterConfig {
            prefix_stem: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            Writer::with_config(TextSink::new(Vec::new()), &config),
            Err(Error::InvalidPrefixStem(stem)) if stem.is_empty()
        ));
    }
}
