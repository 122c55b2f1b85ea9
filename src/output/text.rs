use std::io;

use crate::config::TextParameters;
use crate::entity::{serialize_attribute, serialize_cdata, serialize_text};
use crate::error::Error;
use crate::sink::{Name, OutputSink};

/// Sink that writes serialized XML to an [`io::Write`].
///
/// Start tags are left open until the sink knows whether the element has
/// content; an element that ends right away is written as `<a/>`.
///
/// ```rust
/// use xot_repair::{TextSink, Writer};
///
/// let mut writer = Writer::new(TextSink::new(Vec::new()));
/// writer.start_element("http://example.com", None, "doc")?;
/// writer.end_element()?;
/// let xml = writer.into_sink().into_string();
/// assert_eq!(xml, r#"<ns1:doc xmlns:ns1="http://example.com"/>"#);
/// # Ok::<(), xot_repair::Error>(())
/// ```
#[derive(Debug)]
pub struct TextSink<W: io::Write> {
    w: W,
    parameters: TextParameters,
    start_tag_open: bool,
}

impl<W: io::Write> TextSink<W> {
    /// Create a sink writing to `w` with default parameters.
    pub fn new(w: W) -> Self {
        Self::with_parameters(w, TextParameters::default())
    }

    pub fn with_parameters(w: W, parameters: TextParameters) -> Self {
        Self {
            w,
            parameters,
            start_tag_open: false,
        }
    }

    /// Get back the underlying writer.
    pub fn into_inner(self) -> W {
        self.w
    }

    fn close_start_tag(&mut self) -> Result<(), Error> {
        if self.start_tag_open {
            self.w.write_all(b">")?;
            self.start_tag_open = false;
        }
        Ok(())
    }
}

impl TextSink<Vec<u8>> {
    /// The output as a string.
    pub fn into_string(self) -> String {
        // only ever fed from &str, so this is valid UTF-8
        match String::from_utf8(self.w) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl<W: io::Write> OutputSink for TextSink<W> {
    fn emit_declaration(&mut self) -> Result<(), Error> {
        self.w
            .write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        Ok(())
    }

    fn emit_start(&mut self, name: &Name) -> Result<(), Error> {
        self.close_start_tag()?;
        write!(self.w, "<{}", name.fullname())?;
        self.start_tag_open = true;
        Ok(())
    }

    fn emit_namespace_decl(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
        let namespace = serialize_attribute(namespace);
        if prefix.is_empty() {
            write!(self.w, " xmlns=\"{}\"", namespace)?;
        } else {
            write!(self.w, " xmlns:{}=\"{}\"", prefix, namespace)?;
        }
        Ok(())
    }

    fn emit_attribute(&mut self, name: &Name, value: &str) -> Result<(), Error> {
        write!(
            self.w,
            " {}=\"{}\"",
            name.fullname(),
            serialize_attribute(value)
        )?;
        Ok(())
    }

    fn emit_end(&mut self, name: &Name) -> Result<(), Error> {
        if self.start_tag_open {
            self.w.write_all(b"/>")?;
            self.start_tag_open = false;
        } else {
            write!(self.w, "</{}>", name.fullname())?;
        }
        Ok(())
    }

    fn emit_text(&mut self, text: &str) -> Result<(), Error> {
        self.close_start_tag()?;
        self.w
            .write_all(serialize_text(text, self.parameters.unescaped_gt).as_bytes())?;
        Ok(())
    }

    fn emit_cdata(&mut self, text: &str) -> Result<(), Error> {
        self.close_start_tag()?;
        self.w.write_all(serialize_cdata(text).as_bytes())?;
        Ok(())
    }

    fn emit_comment(&mut self, text: &str) -> Result<(), Error> {
        self.close_start_tag()?;
        write!(self.w, "<!--{}-->", text)?;
        Ok(())
    }

    fn emit_processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<(), Error> {
        self.close_start_tag()?;
        if let Some(data) = data {
            write!(self.w, "<?{} {}?>", target, data)?;
        } else {
            write!(self.w, "<?{}?>", target)?;
        }
        Ok(())
    }
}
