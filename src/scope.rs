use std::rc::Rc;

use crate::binding::{BindingIndex, BindingMap};
use crate::id::{NamespaceId, PrefixId};
use crate::pool::{ScopeId, ScopePool};

/// Namespace scope of one open element.
///
/// `bindings` only holds what's declared on this element. Until it
/// declares something the scope shares the pool's empty map, and the first
/// binding gives it a private copy.
#[derive(Debug)]
pub(crate) struct Scope {
    pub(crate) parent: Option<ScopeId>,
    pub(crate) bindings: Rc<BindingMap>,
    pub(crate) default_namespace: NamespaceId,
    // prefixes the start tag committed to for its own name and attributes,
    // with the namespace each was used for
    used: Vec<(PrefixId, NamespaceId)>,
    // prefix and namespace of the element, kept for the end tag
    pub(crate) element: Option<(PrefixId, NamespaceId)>,
    // reused across pooled elements
    pub(crate) local_name: String,
}

impl Scope {
    pub(crate) fn new(
        parent: Option<ScopeId>,
        bindings: Rc<BindingMap>,
        default_namespace: NamespaceId,
    ) -> Self {
        Self {
            parent,
            bindings,
            default_namespace,
            used: Vec::new(),
            element: None,
            local_name: String::new(),
        }
    }

    pub(crate) fn relink(
        &mut self,
        parent: ScopeId,
        bindings: Rc<BindingMap>,
        default_namespace: NamespaceId,
    ) {
        self.parent = Some(parent);
        self.bindings = bindings;
        self.default_namespace = default_namespace;
        self.used.clear();
        self.element = None;
        self.local_name.clear();
    }

    pub(crate) fn detach(&mut self, empty: Rc<BindingMap>) {
        self.parent = None;
        self.bindings = empty;
    }

    #[inline]
    pub(crate) fn bindings(&self) -> &BindingMap {
        &self.bindings
    }

    /// The namespace the prefix was declared with on this element, if it
    /// was declared here at all.
    #[inline]
    pub(crate) fn declared_namespace(&self, prefix_id: PrefixId) -> Option<NamespaceId> {
        self.bindings.namespace(prefix_id)
    }

    // returns what the prefix was declared with on this element before
    fn bind(
        &mut self,
        prefix_id: PrefixId,
        namespace_id: NamespaceId,
        empty_prefix_id: PrefixId,
    ) -> Option<NamespaceId> {
        if prefix_id == empty_prefix_id {
            self.default_namespace = namespace_id;
        }
        Rc::make_mut(&mut self.bindings).bind(prefix_id, namespace_id)
    }

    pub(crate) fn mark_used(&mut self, prefix_id: PrefixId, namespace_id: NamespaceId) {
        if !self.used.contains(&(prefix_id, namespace_id)) {
            self.used.push((prefix_id, namespace_id));
        }
    }

    /// A namespace other than `namespace_id` that a name on this start tag
    /// already uses `prefix_id` for.
    pub(crate) fn used_otherwise(
        &self,
        prefix_id: PrefixId,
        namespace_id: NamespaceId,
    ) -> Option<NamespaceId> {
        self.used
            .iter()
            .find(|(p, ns)| *p == prefix_id && *ns != namespace_id)
            .map(|(_, ns)| *ns)
    }
}

/// Stack of open element scopes on top of a root scope.
///
/// The root scope stands for the document or the fragment container. Its
/// bindings can be seeded from an outer, read-only namespace context.
/// Lookups go through a [`BindingIndex`] of everything in scope, which is
/// updated on every bind and undone when a scope is popped, so neither
/// depends on how deep the stack is.
#[derive(Debug)]
pub(crate) struct ScopeStack {
    pool: ScopePool,
    index: BindingIndex,
    root: ScopeId,
    current: ScopeId,
    depth: usize,
    empty_prefix_id: PrefixId,
    no_namespace_id: NamespaceId,
}

impl ScopeStack {
    pub(crate) fn new(empty_prefix_id: PrefixId, no_namespace_id: NamespaceId) -> Self {
        let mut pool = ScopePool::new();
        let root = pool.root(no_namespace_id);
        Self {
            pool,
            index: BindingIndex::new(),
            root,
            current: root,
            depth: 0,
            empty_prefix_id,
            no_namespace_id,
        }
    }

    pub(crate) fn push(&mut self) -> ScopeId {
        let id = self.pool.acquire(self.current);
        self.current = id;
        self.depth += 1;
        id
    }

    /// Pop the current scope, undo its bindings and hand it back to the
    /// pool. Returns `None` at the root.
    pub(crate) fn pop(&mut self) -> Option<ScopeId> {
        let scope = self.pool.get(self.current);
        let parent = scope.parent?;
        for (prefix_id, namespace_id) in scope.bindings().iter() {
            self.index.remove(prefix_id, namespace_id);
        }
        let id = self.current;
        self.pool.release(id);
        self.current = parent;
        self.depth -= 1;
        Some(id)
    }

    #[inline]
    pub(crate) fn current(&self) -> &Scope {
        self.pool.get(self.current)
    }

    #[inline]
    pub(crate) fn current_mut(&mut self) -> &mut Scope {
        self.pool.get_mut(self.current)
    }

    #[cfg(test)]
    pub(crate) fn parent(&self) -> Option<&Scope> {
        self.current().parent.map(|id| self.pool.get(id))
    }

    pub(crate) fn is_root(&self) -> bool {
        self.current == self.root
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &ScopePool {
        &self.pool
    }

    pub(crate) fn default_namespace(&self) -> NamespaceId {
        self.current().default_namespace
    }

    pub(crate) fn lookup_namespace(&self, prefix_id: PrefixId) -> Option<NamespaceId> {
        if prefix_id == self.empty_prefix_id {
            Some(self.default_namespace())
        } else {
            self.index.namespace(prefix_id)
        }
    }

    /// Prefix an element in the namespace can use without a declaration.
    ///
    /// The default namespace is preferred, then the most recently bound
    /// prefix. The empty namespace resolves to the empty prefix unless the
    /// default has been set to something else.
    pub(crate) fn lookup_element_prefix(&self, namespace_id: NamespaceId) -> Option<PrefixId> {
        if namespace_id == self.no_namespace_id {
            return (self.default_namespace() == self.no_namespace_id)
                .then_some(self.empty_prefix_id);
        }
        if self.default_namespace() == namespace_id {
            return Some(self.empty_prefix_id);
        }
        self.lookup_attribute_prefix(namespace_id)
    }

    /// Prefix an attribute in the namespace can use without a declaration.
    /// It's never the empty prefix, unless the namespace is empty.
    pub(crate) fn lookup_attribute_prefix(&self, namespace_id: NamespaceId) -> Option<PrefixId> {
        if namespace_id == self.no_namespace_id {
            return Some(self.empty_prefix_id);
        }
        let empty_prefix_id = self.empty_prefix_id;
        self.index
            .prefixes(namespace_id)
            .find(|p| *p != empty_prefix_id)
    }

    /// Bind a prefix in the current scope.
    pub(crate) fn bind(&mut self, prefix_id: PrefixId, namespace_id: NamespaceId) {
        let empty_prefix_id = self.empty_prefix_id;
        let scope = self.pool.get_mut(self.current);
        if let Some(previous) = scope.bind(prefix_id, namespace_id, empty_prefix_id) {
            // declared on this element before, that binding is replaced
            self.index.remove(prefix_id, previous);
        }
        self.index.push(prefix_id, namespace_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::Names;

    fn stack(names: &Names) -> ScopeStack {
        let mut stack = ScopeStack::new(names.empty_prefix_id, names.no_namespace_id);
        stack.bind(names.xml_prefix_id, names.xml_namespace_id);
        stack
    }

    #[test]
    fn test_child_shares_empty_map_until_bind() {
        let mut names = Names::new();
        let p = names.add_prefix("p");
        let ns = names.add_namespace("ns");
        let mut stack = stack(&names);
        stack.push();
        let before = Rc::clone(&stack.current().bindings);
        assert!(before.is_empty());
        stack.bind(p, ns);
        assert!(!Rc::ptr_eq(&before, &stack.current().bindings));
        assert_eq!(stack.current().declared_namespace(p), Some(ns));
        assert_eq!(stack.parent().unwrap().declared_namespace(p), None);
    }

    #[test]
    fn test_declaring_child_does_not_copy_inherited_bindings() {
        let mut names = Names::new();
        let mut stack = stack(&names);
        stack.push();
        for i in 0..10 {
            let p = names.add_prefix(&format!("p{}", i));
            let ns = names.add_namespace(&format!("ns{}", i));
            stack.bind(p, ns);
        }
        stack.push();
        let q = names.add_prefix("q");
        let ns = names.add_namespace("nsq");
        stack.bind(q, ns);
        assert_eq!(stack.current().bindings().len(), 1);
        assert_eq!(stack.parent().unwrap().bindings().len(), 10);
        let p0 = names.prefix("p0").unwrap();
        assert_eq!(stack.lookup_namespace(p0), names.namespace("ns0"));
    }

    #[test]
    fn test_descendants_inherit() {
        let mut names = Names::new();
        let p = names.add_prefix("p");
        let ns = names.add_namespace("ns");
        let mut stack = stack(&names);
        stack.push();
        stack.bind(p, ns);
        stack.push();
        stack.push();
        assert_eq!(stack.lookup_namespace(p), Some(ns));
        assert_eq!(stack.lookup_element_prefix(ns), Some(p));
        assert_eq!(stack.depth(), 3);
    }

    #[test]
    fn test_pop_restores_parent_bindings() {
        let mut names = Names::new();
        let p = names.add_prefix("p");
        let ns1 = names.add_namespace("ns1");
        let ns2 = names.add_namespace("ns2");
        let mut stack = stack(&names);
        stack.push();
        stack.bind(p, ns1);
        stack.push();
        stack.bind(p, ns2);
        assert_eq!(stack.lookup_namespace(p), Some(ns2));
        assert_eq!(stack.lookup_element_prefix(ns1), None);
        stack.pop();
        assert_eq!(stack.lookup_namespace(p), Some(ns1));
        assert_eq!(stack.lookup_element_prefix(ns1), Some(p));
        assert_eq!(stack.lookup_element_prefix(ns2), None);
        stack.pop();
        assert_eq!(stack.lookup_namespace(p), None);
    }

    #[test]
    fn test_rebind_in_same_scope() {
        let mut names = Names::new();
        let p = names.add_prefix("p");
        let ns1 = names.add_namespace("ns1");
        let ns2 = names.add_namespace("ns2");
        let mut stack = stack(&names);
        stack.push();
        stack.bind(p, ns1);
        stack.bind(p, ns2);
        assert_eq!(stack.lookup_element_prefix(ns1), None);
        stack.pop();
        assert_eq!(stack.lookup_namespace(p), None);
        assert_eq!(stack.lookup_element_prefix(ns2), None);
    }

    #[test]
    fn test_default_namespace() {
        let mut names = Names::new();
        let ns = names.add_namespace("ns");
        let mut stack = stack(&names);
        assert_eq!(
            stack.lookup_element_prefix(names.no_namespace_id),
            Some(names.empty_prefix_id)
        );
        stack.push();
        stack.bind(names.empty_prefix_id, ns);
        assert_eq!(
            stack.current().declared_namespace(names.empty_prefix_id),
            Some(ns)
        );
        assert_eq!(stack.lookup_element_prefix(ns), Some(names.empty_prefix_id));
        assert_eq!(stack.lookup_element_prefix(names.no_namespace_id), None);
        assert_eq!(stack.lookup_attribute_prefix(ns), None);
        stack.push();
        assert_eq!(
            stack.current().declared_namespace(names.empty_prefix_id),
            None
        );
        assert_eq!(stack.default_namespace(), ns);
        stack.pop();
        stack.pop();
        assert_eq!(stack.default_namespace(), names.no_namespace_id);
    }

    #[test]
    fn test_pop_at_root() {
        let names = Names::new();
        let mut stack = stack(&names);
        assert!(stack.pop().is_none());
        assert!(stack.is_root());
    }

    #[test]
    fn test_xml_prefix_visible() {
        let names = Names::new();
        let stack = stack(&names);
        assert_eq!(
            stack.lookup_attribute_prefix(names.xml_namespace_id),
            Some(names.xml_prefix_id)
        );
    }
}
