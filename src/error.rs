use thiserror::Error;

/// Errors raised while writing or reading XML.
///
/// Any error returned by a [`Writer`](crate::Writer) call is fatal: the
/// writer is poisoned and every later call returns [`Error::Poisoned`].
#[derive(Debug, Error)]
pub enum Error {
    /// A reserved prefix (`xml`, `xmlns`) or a reserved namespace URI would
    /// be bound to something it doesn't belong to.
    #[error("reserved binding violation: prefix {prefix:?} cannot be bound to {namespace:?}")]
    ReservedBindingViolation { prefix: String, namespace: String },
    /// An attribute or namespace declaration was written while no start tag
    /// was open.
    #[error("no start tag is open")]
    NoOpenStartTag,
    /// `end_element` was called without an open element.
    #[error("no element is open")]
    NoOpenElement,
    /// A write call arrived after the document was closed.
    #[error("the document is closed")]
    Closed,
    /// A previous call failed and the writer cannot continue.
    #[error("the writer failed earlier and cannot be used anymore")]
    Poisoned,
    /// In non-repairing mode, no binding exists for the namespace.
    #[error("no prefix is bound to namespace {0:?}")]
    UnresolvableNamespace(String),
    /// A non-empty prefix was requested for a name without a namespace.
    #[error("prefix {0:?} requested for a name without a namespace")]
    PrefixWithoutNamespace(String),
    /// The prefix was already declared with another namespace on this
    /// element.
    #[error("prefix {0:?} is already declared on this element")]
    DuplicateNamespaceDeclaration(String),
    /// Declaring the prefix would change the namespace of a name the open
    /// start tag already uses.
    #[error("prefix {prefix:?} is in use for {namespace:?} on this element")]
    PrefixInUse { prefix: String, namespace: String },
    /// Comments cannot contain `--` or end with `-`.
    #[error("invalid comment: {0:?}")]
    InvalidComment(String),
    /// A processing instruction target must be a name other than `xml`,
    /// and its data cannot contain `?>`.
    #[error("invalid processing instruction: {0:?}")]
    InvalidProcessingInstruction(String),
    /// Synthesized prefixes would not be valid names with this stem.
    #[error("invalid prefix stem: {0:?}")]
    InvalidPrefixStem(String),
    /// The document element was closed, so no other element or text can
    /// follow at the top level.
    #[error("the document element is already closed")]
    DocumentElementClosed,
    /// Reading: the prefix is not declared.
    #[error("unknown prefix: {0:?}")]
    UnknownPrefix(String),
    /// Reading: the close tag doesn't match the open tag.
    #[error("invalid close tag: expected {0:?}, found {1:?}")]
    InvalidCloseTag(String, String),
    /// Reading: an entity reference isn't closed with `;`.
    #[error("unclosed entity: {0:?}")]
    UnclosedEntity(String),
    /// Reading: an entity reference isn't one of the predefined ones.
    #[error("invalid entity: {0:?}")]
    InvalidEntity(String),
    /// Reading: document type declarations are not supported.
    #[error("DTD is not supported")]
    DtdUnsupported,
    /// The node is not an element.
    #[error("node is not an element")]
    NotElement,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parser(#[from] xmlparser::Error),
}

impl Error {
    pub(crate) fn reserved(prefix: &str, namespace: &str) -> Self {
        Error::ReservedBindingViolation {
            prefix: prefix.to_string(),
            namespace: namespace.to_string(),
        }
    }
}
