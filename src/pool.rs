// Scopes live in an arena owned by the writer. Closed scopes are put on a
// free list and relinked when the next element opens.

use std::rc::Rc;

use tracing::trace;

use crate::binding::BindingMap;
use crate::id::NamespaceId;
use crate::scope::Scope;

/// Index of a scope in the [`ScopePool`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ScopeId(usize);

#[derive(Debug)]
pub(crate) struct ScopePool {
    scopes: Vec<Scope>,
    free: Vec<ScopeId>,
    // shared by every scope that hasn't declared anything
    empty: Rc<BindingMap>,
}

impl ScopePool {
    pub(crate) fn new() -> Self {
        Self {
            scopes: Vec::new(),
            free: Vec::new(),
            empty: Rc::new(BindingMap::new()),
        }
    }

    /// Add the root scope. It has no parent and is never released.
    pub(crate) fn root(&mut self, default_namespace: NamespaceId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(
            None,
            Rc::new(BindingMap::new()),
            default_namespace,
        ));
        id
    }

    /// Get a scope for a new child of `parent`, reusing a released one if
    /// there is one. The child starts out with the shared empty map and the
    /// parent's default namespace.
    pub(crate) fn acquire(&mut self, parent: ScopeId) -> ScopeId {
        let bindings = Rc::clone(&self.empty);
        let default_namespace = self.scopes[parent.0].default_namespace;
        if let Some(id) = self.free.pop() {
            trace!(scope = id.0, "reusing pooled scope");
            self.scopes[id.0].relink(parent, bindings, default_namespace);
            id
        } else {
            let id = ScopeId(self.scopes.len());
            self.scopes
                .push(Scope::new(Some(parent), bindings, default_namespace));
            id
        }
    }

    pub(crate) fn release(&mut self, id: ScopeId) {
        self.scopes[id.0].detach(Rc::clone(&self.empty));
        self.free.push(id);
    }

    #[inline]
    pub(crate) fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    /// Number of scopes ever allocated, root included.
    #[cfg(test)]
    pub(crate) fn allocated(&self) -> usize {
        self.scopes.len()
    }

    /// Number of scopes waiting to be reused.
    #[cfg(test)]
    pub(crate) fn available(&self) -> usize {
        self.free.len()
    }
}
