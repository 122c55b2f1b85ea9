// Prefix to namespace bindings. A scope owns a `BindingMap` with the
// bindings declared on its own element; the `BindingIndex` knows everything
// in scope across the whole stack and is undone as scopes close.

use ahash::HashMap;

use crate::id::{NamespaceId, PrefixId};

/// The bindings declared on one element, and nothing inherited.
///
/// A prefix maps to exactly one namespace. Scopes that declare nothing
/// share one empty map through `Rc`, see [`Scope`](crate::scope::Scope).
#[derive(Debug, Clone, Default)]
pub(crate) struct BindingMap {
    by_prefix: HashMap<PrefixId, NamespaceId>,
}

impl BindingMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn namespace(&self, prefix_id: PrefixId) -> Option<NamespaceId> {
        self.by_prefix.get(&prefix_id).copied()
    }

    /// Bind a prefix, returning the namespace it was bound to before in
    /// this map.
    pub(crate) fn bind(
        &mut self,
        prefix_id: PrefixId,
        namespace_id: NamespaceId,
    ) -> Option<NamespaceId> {
        self.by_prefix.insert(prefix_id, namespace_id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PrefixId, NamespaceId)> + '_ {
        self.by_prefix.iter().map(|(p, ns)| (*p, *ns))
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_prefix.len()
    }
}

/// Every binding in scope, indexed both ways.
///
/// Each prefix has a stack of namespaces, innermost binding last. Each
/// namespace has the prefixes that were bound to it in binding order; some
/// of them may be masked by a later binding of the same prefix, so a
/// prefix only counts while the top of its own stack still agrees.
#[derive(Debug, Default)]
pub(crate) struct BindingIndex {
    by_prefix: HashMap<PrefixId, Vec<NamespaceId>>,
    by_namespace: HashMap<NamespaceId, Vec<PrefixId>>,
}

impl BindingIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn namespace(&self, prefix_id: PrefixId) -> Option<NamespaceId> {
        self.by_prefix
            .get(&prefix_id)
            .and_then(|stack| stack.last().copied())
    }

    pub(crate) fn push(&mut self, prefix_id: PrefixId, namespace_id: NamespaceId) {
        self.by_prefix
            .entry(prefix_id)
            .or_default()
            .push(namespace_id);
        self.by_namespace
            .entry(namespace_id)
            .or_default()
            .push(prefix_id);
    }

    /// Undo the innermost binding of `prefix_id` to `namespace_id`.
    pub(crate) fn remove(&mut self, prefix_id: PrefixId, namespace_id: NamespaceId) {
        if let Some(stack) = self.by_prefix.get_mut(&prefix_id) {
            stack.pop();
            if stack.is_empty() {
                self.by_prefix.remove(&prefix_id);
            }
        }
        if let Some(prefixes) = self.by_namespace.get_mut(&namespace_id) {
            if let Some(i) = prefixes.iter().rposition(|p| *p == prefix_id) {
                prefixes.remove(i);
            }
            if prefixes.is_empty() {
                self.by_namespace.remove(&namespace_id);
            }
        }
    }

    /// Prefixes that currently resolve to the namespace, most recently
    /// bound first.
    pub(crate) fn prefixes(&self, namespace_id: NamespaceId) -> impl Iterator<Item = PrefixId> + '_ {
        self.by_namespace
            .get(&namespace_id)
            .into_iter()
            .flat_map(|prefixes| prefixes.iter().rev().copied())
            .filter(move |p| self.namespace(*p) == Some(namespace_id))
    }
}
