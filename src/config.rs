use crate::allocator::PrefixHints;

/// Configuration of a [`Writer`](crate::Writer).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriterConfig {
    /// Whether the writer picks prefixes and writes namespace declarations
    /// by itself. This is true by default.
    ///
    /// When false, the caller has to declare every namespace it uses with
    /// [`Writer::namespace_decl`](crate::Writer::namespace_decl) and
    /// [`Writer::default_namespace`](crate::Writer::default_namespace); a
    /// name whose namespace isn't bound fails with
    /// [`Error::UnresolvableNamespace`](crate::Error::UnresolvableNamespace).
    pub repairing: bool,
    /// Synthesized prefixes are this stem followed by a number: `ns1`,
    /// `ns2`, and so on.
    pub prefix_stem: String,
    /// When an element needs a new binding and neither the caller nor a
    /// hint names a prefix, use the default namespace instead of
    /// synthesizing a prefix.
    pub prefer_default_namespace: bool,
    /// Prefix suggestions, available from the start.
    pub hints: PrefixHints,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            repairing: true,
            prefix_stem: "ns".to_string(),
            prefer_default_namespace: false,
            hints: PrefixHints::new(),
        }
    }
}

impl WriterConfig {
    /// Configuration for a writer that doesn't repair namespaces.
    pub fn non_repairing() -> Self {
        Self {
            repairing: false,
            ..Default::default()
        }
    }
}

/// Parameters of the [`TextSink`](crate::TextSink).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextParameters {
    /// Whether to leave `>` in text content unescaped. By default it's
    /// written as `&gt;`. Even when this is set, `>` is escaped when it
    /// completes `]]>`, which may never appear in text.
    pub unescaped_gt: bool,
}
