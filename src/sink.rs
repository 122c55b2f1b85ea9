use std::borrow::Cow;

use crate::error::Error;

/// A resolved element or attribute name: the prefix the writer picked,
/// the local name and the namespace URI it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name<'a> {
    /// Prefix, empty for unprefixed names.
    pub prefix: &'a str,
    /// Local name.
    pub local_name: &'a str,
    /// Namespace URI, empty for no namespace.
    pub namespace: &'a str,
}

impl<'a> Name<'a> {
    /// The name as it appears in markup, i.e. `foo` or `ns:foo`.
    pub fn fullname(&self) -> Cow<'a, str> {
        if self.prefix.is_empty() {
            Cow::Borrowed(self.local_name)
        } else {
            Cow::Owned(format!("{}:{}", self.prefix, self.local_name))
        }
    }
}

/// Where a [`Writer`](crate::Writer) sends its output.
///
/// The writer decides every prefix and declaration; a sink only turns the
/// calls into bytes or tree nodes. Calls arrive in document order. For an
/// element that's `emit_start`, then any mix of `emit_namespace_decl` and
/// `emit_attribute` (a declaration always comes before the attributes that
/// need it), then content, then `emit_end`. A sink decides by itself when a
/// start tag is finished: the first call after the declarations and
/// attributes that isn't one of them.
pub trait OutputSink {
    /// The XML declaration, before anything else.
    fn emit_declaration(&mut self) -> Result<(), Error> {
        Ok(())
    }
    /// An element starts.
    fn emit_start(&mut self, name: &Name) -> Result<(), Error>;
    /// A namespace declaration on the element that was just started. The
    /// prefix is empty for the default namespace.
    fn emit_namespace_decl(&mut self, prefix: &str, namespace: &str) -> Result<(), Error>;
    /// An attribute on the element that was just started.
    fn emit_attribute(&mut self, name: &Name, value: &str) -> Result<(), Error>;
    /// The current element ends.
    fn emit_end(&mut self, name: &Name) -> Result<(), Error>;
    /// Text content.
    fn emit_text(&mut self, text: &str) -> Result<(), Error>;
    /// Text content that should be kept in a CDATA section if the sink
    /// can represent one.
    fn emit_cdata(&mut self, text: &str) -> Result<(), Error> {
        self.emit_text(text)
    }
    /// A comment.
    fn emit_comment(&mut self, text: &str) -> Result<(), Error>;
    /// A processing instruction.
    fn emit_processing_instruction(&mut self, target: &str, data: Option<&str>)
        -> Result<(), Error>;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn emit_declaration(&mut self) -> Result<(), Error> {
        (**self).emit_declaration()
    }
    fn emit_start(&mut self, name: &Name) -> Result<(), Error> {
        (**self).emit_start(name)
    }
    fn emit_namespace_decl(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
        (**self).emit_namespace_decl(prefix, namespace)
    }
    fn emit_attribute(&mut self, name: &Name, value: &str) -> Result<(), Error> {
        (**self).emit_attribute(name, value)
    }
    fn emit_end(&mut self, name: &Name) -> Result<(), Error> {
        (**self).emit_end(name)
    }
    fn emit_text(&mut self, text: &str) -> Result<(), Error> {
        (**self).emit_text(text)
    }
    fn emit_cdata(&mut self, text: &str) -> Result<(), Error> {
        (**self).emit_cdata(text)
    }
    fn emit_comment(&mut self, text: &str) -> Result<(), Error> {
        (**self).emit_comment(text)
    }
    fn emit_processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<(), Error> {
        (**self).emit_processing_instruction(target, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullname_unprefixed() {
        let name = Name {
            prefix: "",
            local_name: "a",
            namespace: "http://example.com",
        };
        assert_eq!(name.fullname(), Cow::Borrowed("a"));
    }

    #[test]
    fn test_fullname_prefixed() {
        let name = Name {
            prefix: "p",
            local_name: "a",
            namespace: "http://example.com",
        };
        assert_eq!(name.fullname(), "p:a");
    }
}
