/// Namespace bindings that exist outside of what a writer writes.
///
/// When output is attached below an existing element, the prefixes declared
/// on that element and its ancestors are in scope for everything written.
/// The writer takes a snapshot of them when it's created and treats them as
/// a read-only outermost scope: they're reused when they fit and masked when
/// they don't, but never changed.
pub trait NamespaceContext {
    /// The `(prefix, namespace)` bindings in scope, outermost first. A
    /// later entry for the same prefix masks an earlier one. The empty
    /// prefix stands for the default namespace.
    fn bindings(&self) -> Vec<(&str, &str)>;

    /// The namespace bound to a prefix.
    fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.bindings()
            .into_iter()
            .rev()
            .find(|(p, _)| *p == prefix)
            .map(|(_, namespace)| namespace)
    }
}

impl NamespaceContext for [(&str, &str)] {
    fn bindings(&self) -> Vec<(&str, &str)> {
        self.to_vec()
    }
}

impl<const N: usize> NamespaceContext for [(&str, &str); N] {
    fn bindings(&self) -> Vec<(&str, &str)> {
        self.to_vec()
    }
}

/// Owned snapshot of the namespaces in scope for a node.
///
/// Obtain one through
/// [`Document::namespaces_in_scope`](crate::Document::namespaces_in_scope).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InScopeNamespaces {
    bindings: Vec<(String, String)>,
}

impl InScopeNamespaces {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; it masks earlier bindings of the same prefix.
    pub fn push(&mut self, prefix: &str, namespace: &str) {
        self.bindings.push((prefix.to_string(), namespace.to_string()));
    }

    /// Iterate over the bindings that aren't masked, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .enumerate()
            .filter(move |(i, (prefix, _))| {
                !self.bindings[i + 1..].iter().any(|(p, _)| p == prefix)
            })
            .map(|(_, (p, n))| (p.as_str(), n.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl NamespaceContext for InScopeNamespaces {
    fn bindings(&self) -> Vec<(&str, &str)> {
        self.bindings
            .iter()
            .map(|(p, n)| (p.as_str(), n.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_lookup() {
        let context = [("a", "http://example.com/a"), ("a", "http://example.com/b")];
        assert_eq!(
            context.namespace_for_prefix("a"),
            Some("http://example.com/b")
        );
        assert_eq!(context.namespace_for_prefix("b"), None);
    }

    #[test]
    fn test_in_scope_masking() {
        let mut namespaces = InScopeNamespaces::new();
        namespaces.push("", "http://example.com/outer");
        namespaces.push("x", "http://example.com/x");
        namespaces.push("", "http://example.com/inner");
        assert_eq!(
            namespaces.iter().collect::<Vec<_>>(),
            vec![
                ("x", "http://example.com/x"),
                ("", "http://example.com/inner")
            ]
        );
        assert_eq!(
            namespaces.namespace_for_prefix(""),
            Some("http://example.com/inner")
        );
    }
}
