use crate::error::Error;
use crate::id::{NamespaceId, NamespaceLookup, PrefixId, PrefixLookup};

/// The namespace permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// The namespace of `xmlns` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Interned prefixes and namespace URIs of one writer (or one parse).
///
/// The empty prefix, the empty namespace and the two reserved pairs are
/// interned up front so they can be compared by id.
#[derive(Debug, Clone)]
pub(crate) struct Names {
    namespace_lookup: NamespaceLookup,
    prefix_lookup: PrefixLookup,
    pub(crate) no_namespace_id: NamespaceId,
    pub(crate) empty_prefix_id: PrefixId,
    pub(crate) xml_namespace_id: NamespaceId,
    pub(crate) xml_prefix_id: PrefixId,
    pub(crate) xmlns_namespace_id: NamespaceId,
    pub(crate) xmlns_prefix_id: PrefixId,
}

impl Names {
    pub(crate) fn new() -> Self {
        let mut namespace_lookup = NamespaceLookup::new();
        let mut prefix_lookup = PrefixLookup::new();
        let no_namespace_id = namespace_lookup.get_id_mut(String::new());
        let empty_prefix_id = prefix_lookup.get_id_mut(String::new());
        let xml_namespace_id = namespace_lookup.get_id_mut(XML_NAMESPACE.to_string());
        let xml_prefix_id = prefix_lookup.get_id_mut("xml".to_string());
        let xmlns_namespace_id = namespace_lookup.get_id_mut(XMLNS_NAMESPACE.to_string());
        let xmlns_prefix_id = prefix_lookup.get_id_mut("xmlns".to_string());
        Names {
            namespace_lookup,
            prefix_lookup,
            no_namespace_id,
            empty_prefix_id,
            xml_namespace_id,
            xml_prefix_id,
            xmlns_namespace_id,
            xmlns_prefix_id,
        }
    }

    pub(crate) fn add_prefix(&mut self, prefix: &str) -> PrefixId {
        match self.prefix_lookup.get_id(prefix) {
            Some(prefix_id) => prefix_id,
            None => self.prefix_lookup.get_id_mut(prefix.to_string()),
        }
    }

    pub(crate) fn add_namespace(&mut self, namespace: &str) -> NamespaceId {
        match self.namespace_lookup.get_id(namespace) {
            Some(namespace_id) => namespace_id,
            None => self.namespace_lookup.get_id_mut(namespace.to_string()),
        }
    }

    /// Look up a prefix without interning it.
    pub(crate) fn prefix(&self, prefix: &str) -> Option<PrefixId> {
        self.prefix_lookup.get_id(prefix)
    }

    /// Look up a namespace without interning it.
    pub(crate) fn namespace(&self, namespace: &str) -> Option<NamespaceId> {
        self.namespace_lookup.get_id(namespace)
    }

    #[inline]
    pub(crate) fn prefix_str(&self, prefix_id: PrefixId) -> &str {
        self.prefix_lookup.get_value(prefix_id)
    }

    #[inline]
    pub(crate) fn namespace_str(&self, namespace_id: NamespaceId) -> &str {
        self.namespace_lookup.get_value(namespace_id)
    }

    /// Reject bindings that touch `xml` or `xmlns` the wrong way.
    ///
    /// `xml` may only ever be bound to [`XML_NAMESPACE`], nothing else may
    /// be bound to it, and nothing at all may be bound to `xmlns` or its
    /// namespace.
    pub(crate) fn check_binding(
        &self,
        prefix_id: PrefixId,
        namespace_id: NamespaceId,
    ) -> Result<(), Error> {
        let violation = prefix_id == self.xmlns_prefix_id
            || namespace_id == self.xmlns_namespace_id
            || ((prefix_id == self.xml_prefix_id) != (namespace_id == self.xml_namespace_id));
        if violation {
            Err(Error::reserved(
                self.prefix_str(prefix_id),
                self.namespace_str(namespace_id),
            ))
        } else {
            Ok(())
        }
    }
}
