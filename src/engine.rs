// Namespace repair: decides which prefix each element and attribute gets,
// keeps the scope stack up to date and sends the declarations that are
// needed to the sink.
//
// Every operation first resolves against the current state without
// changing it. Only when resolution succeeded are bindings made and output
// emitted, so a failed call leaves no partial declaration behind.

use tracing::{debug, trace};

use crate::allocator::{check_prefix_stem, PrefixAllocator};
use crate::config::WriterConfig;
use crate::context::NamespaceContext;
use crate::error::Error;
use crate::id::{NamespaceId, PrefixId};
use crate::names::Names;
use crate::scope::ScopeStack;
use crate::sink::{Name, OutputSink};

// What to do for a name: the prefix to write it with, and whether that
// prefix has to be bound (and declared) first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolution {
    prefix_id: PrefixId,
    namespace_id: NamespaceId,
    declare: bool,
}

impl Resolution {
    fn reuse(prefix_id: PrefixId, namespace_id: NamespaceId) -> Self {
        Self {
            prefix_id,
            namespace_id,
            declare: false,
        }
    }

    fn declare(prefix_id: PrefixId, namespace_id: NamespaceId) -> Self {
        Self {
            prefix_id,
            namespace_id,
            declare: true,
        }
    }
}

#[derive(Debug)]
pub(crate) struct RepairEngine {
    names: Names,
    scopes: ScopeStack,
    allocator: PrefixAllocator,
    repairing: bool,
    prefer_default_namespace: bool,
}

impl RepairEngine {
    /// Engine for the default configuration, with nothing but `xml` in
    /// scope.
    pub(crate) fn with_defaults() -> Self {
        Self::build(Names::new(), Vec::new(), &WriterConfig::default())
    }

    pub(crate) fn new<C: NamespaceContext + ?Sized>(
        config: &WriterConfig,
        context: Option<&C>,
    ) -> Result<Self, Error> {
        check_prefix_stem(&config.prefix_stem)?;
        let mut names = Names::new();
        let mut outer = Vec::new();
        if let Some(context) = context {
            for (prefix, namespace) in context.bindings() {
                let prefix_id = names.add_prefix(prefix);
                let namespace_id = names.add_namespace(namespace);
                names.check_binding(prefix_id, namespace_id)?;
                outer.push((prefix_id, namespace_id));
            }
        }
        let mut engine = Self::build(names, outer, config);
        for (namespace, prefix) in config.hints.iter() {
            engine.set_prefix_hint(prefix, namespace)?;
        }
        Ok(engine)
    }

    // the outer bindings go into the root scope, outermost first
    fn build(names: Names, outer: Vec<(PrefixId, NamespaceId)>, config: &WriterConfig) -> Self {
        let mut scopes = ScopeStack::new(names.empty_prefix_id, names.no_namespace_id);
        for (prefix_id, namespace_id) in outer {
            scopes.bind(prefix_id, namespace_id);
        }
        scopes.bind(names.xml_prefix_id, names.xml_namespace_id);
        Self {
            names,
            scopes,
            allocator: PrefixAllocator::new(&config.prefix_stem),
            repairing: config.repairing,
            prefer_default_namespace: config.prefer_default_namespace,
        }
    }

    pub(crate) fn set_prefix_hint(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
        let namespace_id = self.names.add_namespace(namespace);
        if namespace_id == self.names.no_namespace_id {
            if prefix.is_empty() {
                return Ok(());
            }
            return Err(Error::PrefixWithoutNamespace(prefix.to_string()));
        }
        let prefix_id = self.names.add_prefix(prefix);
        self.names.check_binding(prefix_id, namespace_id)?;
        self.allocator.suggest(namespace_id, prefix_id);
        Ok(())
    }

    pub(crate) fn depth(&self) -> usize {
        self.scopes.depth()
    }

    pub(crate) fn is_repairing(&self) -> bool {
        self.repairing
    }

    pub(crate) fn prefix_for_namespace(&self, namespace: &str) -> Option<&str> {
        let namespace_id = self.names.namespace(namespace)?;
        let prefix_id = self.scopes.lookup_element_prefix(namespace_id)?;
        Some(self.names.prefix_str(prefix_id))
    }

    pub(crate) fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        let prefix_id = self.names.prefix(prefix)?;
        let namespace_id = self.scopes.lookup_namespace(prefix_id)?;
        Some(self.names.namespace_str(namespace_id))
    }

    /// Scopes allocated so far and scopes waiting in the pool.
    #[cfg(test)]
    pub(crate) fn pool_stats(&self) -> (usize, usize) {
        let pool = self.scopes.pool();
        (pool.allocated(), pool.available())
    }

    /// Open an element: resolve its prefix, push a scope and write the
    /// start of the tag plus the declaration it needs, if any.
    pub(crate) fn start_element<S: OutputSink>(
        &mut self,
        sink: &mut S,
        namespace: &str,
        prefix: Option<&str>,
        local_name: &str,
    ) -> Result<(), Error> {
        let resolution = if self.repairing {
            self.resolve_element(namespace, prefix)?
        } else {
            self.resolve_element_strict(namespace, prefix)?
        };

        self.scopes.push();
        if resolution.declare {
            self.scopes
                .bind(resolution.prefix_id, resolution.namespace_id);
        }
        let scope = self.scopes.current_mut();
        scope.element = Some((resolution.prefix_id, resolution.namespace_id));
        scope.local_name.push_str(local_name);
        scope.mark_used(resolution.prefix_id, resolution.namespace_id);

        let name = Name {
            prefix: self.names.prefix_str(resolution.prefix_id),
            local_name,
            namespace: self.names.namespace_str(resolution.namespace_id),
        };
        sink.emit_start(&name)?;
        if resolution.declare {
            debug!(
                prefix = name.prefix,
                namespace = name.namespace,
                element = local_name,
                "declaring namespace for element"
            );
            sink.emit_namespace_decl(name.prefix, name.namespace)?;
        }
        Ok(())
    }

    /// Close the current element and return its scope to the pool.
    pub(crate) fn end_element<S: OutputSink>(&mut self, sink: &mut S) -> Result<(), Error> {
        if self.scopes.is_root() {
            return Err(Error::NoOpenElement);
        }
        let scope = self.scopes.current();
        let (prefix_id, namespace_id) = scope.element.ok_or(Error::NoOpenElement)?;
        let name = Name {
            prefix: self.names.prefix_str(prefix_id),
            local_name: &scope.local_name,
            namespace: self.names.namespace_str(namespace_id),
        };
        sink.emit_end(&name)?;
        self.scopes.pop();
        Ok(())
    }

    /// Write an attribute on the open start tag, declaring a prefix for it
    /// first if needed.
    pub(crate) fn attribute<S: OutputSink>(
        &mut self,
        sink: &mut S,
        namespace: &str,
        prefix: Option<&str>,
        local_name: &str,
        value: &str,
    ) -> Result<(), Error> {
        if self.scopes.is_root() {
            return Err(Error::NoOpenStartTag);
        }
        let resolution = if self.repairing {
            self.resolve_attribute(namespace, prefix)?
        } else {
            self.resolve_attribute_strict(namespace, prefix)?
        };

        if resolution.declare {
            self.scopes
                .bind(resolution.prefix_id, resolution.namespace_id);
        }
        // unprefixed attributes don't depend on the default namespace
        if resolution.prefix_id != self.names.empty_prefix_id {
            self.scopes
                .current_mut()
                .mark_used(resolution.prefix_id, resolution.namespace_id);
        }

        let name = Name {
            prefix: self.names.prefix_str(resolution.prefix_id),
            local_name,
            namespace: self.names.namespace_str(resolution.namespace_id),
        };
        if resolution.declare {
            debug!(
                prefix = name.prefix,
                namespace = name.namespace,
                attribute = local_name,
                "declaring namespace for attribute"
            );
            sink.emit_namespace_decl(name.prefix, name.namespace)?;
        }
        sink.emit_attribute(&name, value)
    }

    /// Explicitly declare a prefix on the open start tag.
    pub(crate) fn namespace_decl<S: OutputSink>(
        &mut self,
        sink: &mut S,
        prefix: &str,
        namespace: &str,
    ) -> Result<(), Error> {
        if prefix.is_empty() {
            return self.default_namespace(sink, namespace);
        }
        if self.scopes.is_root() {
            return Err(Error::NoOpenStartTag);
        }
        let prefix_id = self.names.add_prefix(prefix);
        let namespace_id = self.names.add_namespace(namespace);
        if namespace_id == self.names.no_namespace_id {
            return Err(Error::PrefixWithoutNamespace(prefix.to_string()));
        }
        self.names.check_binding(prefix_id, namespace_id)?;
        // xml is always bound and never declared
        if prefix_id == self.names.xml_prefix_id {
            return Ok(());
        }
        self.declare(sink, prefix_id, namespace_id)
    }

    /// Explicitly set the default namespace on the open start tag.
    pub(crate) fn default_namespace<S: OutputSink>(
        &mut self,
        sink: &mut S,
        namespace: &str,
    ) -> Result<(), Error> {
        if self.scopes.is_root() {
            return Err(Error::NoOpenStartTag);
        }
        let namespace_id = self.names.add_namespace(namespace);
        self.names
            .check_binding(self.names.empty_prefix_id, namespace_id)?;
        self.declare(sink, self.names.empty_prefix_id, namespace_id)
    }

    /// In non-repairing mode the caller declares an element's prefix after
    /// opening it; once the start tag is complete the prefix has to
    /// resolve to the element's namespace.
    pub(crate) fn verify_start_tag(&self) -> Result<(), Error> {
        if self.repairing || self.scopes.is_root() {
            return Ok(());
        }
        if let Some((prefix_id, namespace_id)) = self.scopes.current().element {
            if self.scopes.lookup_namespace(prefix_id) != Some(namespace_id) {
                return Err(Error::UnresolvableNamespace(
                    self.names.namespace_str(namespace_id).to_string(),
                ));
            }
        }
        Ok(())
    }

    fn declare<S: OutputSink>(
        &mut self,
        sink: &mut S,
        prefix_id: PrefixId,
        namespace_id: NamespaceId,
    ) -> Result<(), Error> {
        let scope = self.scopes.current();
        if let Some(declared) = scope.declared_namespace(prefix_id) {
            if declared == namespace_id {
                return Ok(());
            }
            return Err(Error::DuplicateNamespaceDeclaration(
                self.names.prefix_str(prefix_id).to_string(),
            ));
        }
        if self.repairing && self.scopes.lookup_namespace(prefix_id) == Some(namespace_id) {
            trace!(
                prefix = self.names.prefix_str(prefix_id),
                "declaration already in scope"
            );
            return Ok(());
        }
        // in either mode, a name on this start tag may already depend on
        // what the prefix means now
        if let Some(used) = scope.used_otherwise(prefix_id, namespace_id) {
            return Err(Error::PrefixInUse {
                prefix: self.names.prefix_str(prefix_id).to_string(),
                namespace: self.names.namespace_str(used).to_string(),
            });
        }
        self.scopes.bind(prefix_id, namespace_id);
        let prefix = self.names.prefix_str(prefix_id);
        let namespace = self.names.namespace_str(namespace_id);
        debug!(prefix, namespace, "explicit namespace declaration");
        sink.emit_namespace_decl(prefix, namespace)
    }

    fn resolve_element(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
    ) -> Result<Resolution, Error> {
        let namespace_id = self.names.add_namespace(namespace);
        let empty_prefix_id = self.names.empty_prefix_id;
        if namespace_id == self.names.no_namespace_id {
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                return Err(Error::PrefixWithoutNamespace(prefix.to_string()));
            }
            // only the default namespace can put an element in no namespace,
            // so if it's taken it has to be undeclared
            if self.scopes.default_namespace() == namespace_id {
                return Ok(Resolution::reuse(empty_prefix_id, namespace_id));
            }
            return Ok(Resolution::declare(empty_prefix_id, namespace_id));
        }
        if namespace_id == self.names.xmlns_namespace_id {
            return Err(Error::reserved(prefix.unwrap_or(""), namespace));
        }

        if let Some(prefix) = prefix {
            let prefix_id = self.names.add_prefix(prefix);
            self.names.check_binding(prefix_id, namespace_id)?;
            if self.scopes.lookup_namespace(prefix_id) == Some(namespace_id) {
                return Ok(Resolution::reuse(prefix_id, namespace_id));
            }
            return Ok(Resolution::declare(prefix_id, namespace_id));
        }

        if let Some(prefix_id) = self.scopes.lookup_element_prefix(namespace_id) {
            trace!(
                prefix = self.names.prefix_str(prefix_id),
                namespace,
                "reusing binding for element"
            );
            return Ok(Resolution::reuse(prefix_id, namespace_id));
        }

        if let Some(prefix_id) = self.allocator.hint(namespace_id) {
            return Ok(Resolution::declare(prefix_id, namespace_id));
        }
        // a start tag always opens a fresh scope, so its default slot is free
        if self.prefer_default_namespace {
            return Ok(Resolution::declare(empty_prefix_id, namespace_id));
        }
        let prefix_id = self.synthesize_prefix();
        Ok(Resolution::declare(prefix_id, namespace_id))
    }

    fn resolve_attribute(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
    ) -> Result<Resolution, Error> {
        let namespace_id = self.names.add_namespace(namespace);
        let empty_prefix_id = self.names.empty_prefix_id;
        // an unprefixed attribute is in no namespace, whatever the default
        let prefix = prefix.filter(|p| !p.is_empty());
        if namespace_id == self.names.no_namespace_id {
            if let Some(prefix) = prefix {
                return Err(Error::PrefixWithoutNamespace(prefix.to_string()));
            }
            return Ok(Resolution::reuse(empty_prefix_id, namespace_id));
        }
        if namespace_id == self.names.xmlns_namespace_id {
            return Err(Error::reserved(prefix.unwrap_or(""), namespace));
        }

        if let Some(prefix) = prefix {
            let prefix_id = self.names.add_prefix(prefix);
            self.names.check_binding(prefix_id, namespace_id)?;
            match self.scopes.lookup_namespace(prefix_id) {
                Some(bound) if bound == namespace_id => {
                    return Ok(Resolution::reuse(prefix_id, namespace_id));
                }
                None => return Ok(Resolution::declare(prefix_id, namespace_id)),
                // bound to something else: rebinding could change names
                // already written in this start tag
                Some(_) => {}
            }
        }

        if let Some(prefix_id) = self.existing_attribute_prefix(namespace_id) {
            trace!(
                prefix = self.names.prefix_str(prefix_id),
                namespace,
                "reusing binding for attribute"
            );
            return Ok(Resolution::reuse(prefix_id, namespace_id));
        }

        if let Some(prefix_id) = self.allocator.hint(namespace_id) {
            if prefix_id != empty_prefix_id && self.scopes.lookup_namespace(prefix_id).is_none() {
                return Ok(Resolution::declare(prefix_id, namespace_id));
            }
        }
        let prefix_id = self.synthesize_prefix();
        Ok(Resolution::declare(prefix_id, namespace_id))
    }

    // a hinted prefix that is bound to the namespace wins over whatever was
    // bound most recently
    fn existing_attribute_prefix(&self, namespace_id: NamespaceId) -> Option<PrefixId> {
        if let Some(prefix_id) = self.allocator.hint(namespace_id) {
            if prefix_id != self.names.empty_prefix_id
                && self.scopes.lookup_namespace(prefix_id) == Some(namespace_id)
            {
                return Some(prefix_id);
            }
        }
        self.scopes.lookup_attribute_prefix(namespace_id)
    }

    fn synthesize_prefix(&mut self) -> PrefixId {
        let scopes = &self.scopes;
        self.allocator
            .generate(&mut self.names, |prefix_id| {
                scopes.lookup_namespace(prefix_id).is_some()
            })
    }

    fn resolve_element_strict(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
    ) -> Result<Resolution, Error> {
        let namespace_id = self.names.add_namespace(namespace);
        let empty_prefix_id = self.names.empty_prefix_id;
        if namespace_id == self.names.no_namespace_id {
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                return Err(Error::PrefixWithoutNamespace(prefix.to_string()));
            }
            return Ok(Resolution::reuse(empty_prefix_id, namespace_id));
        }
        if namespace_id == self.names.xmlns_namespace_id {
            return Err(Error::reserved(prefix.unwrap_or(""), namespace));
        }
        match prefix {
            Some(prefix) => {
                let prefix_id = self.names.add_prefix(prefix);
                self.names.check_binding(prefix_id, namespace_id)?;
                // the declaration may still follow, see verify_start_tag
                Ok(Resolution::reuse(prefix_id, namespace_id))
            }
            None => self
                .scopes
                .lookup_element_prefix(namespace_id)
                .map(|prefix_id| Resolution::reuse(prefix_id, namespace_id))
                .ok_or_else(|| Error::UnresolvableNamespace(namespace.to_string())),
        }
    }

    fn resolve_attribute_strict(
        &mut self,
        namespace: &str,
        prefix: Option<&str>,
    ) -> Result<Resolution, Error> {
        let namespace_id = self.names.add_namespace(namespace);
        let prefix = prefix.filter(|p| !p.is_empty());
        if namespace_id == self.names.no_namespace_id {
            if let Some(prefix) = prefix {
                return Err(Error::PrefixWithoutNamespace(prefix.to_string()));
            }
            return Ok(Resolution::reuse(self.names.empty_prefix_id, namespace_id));
        }
        if namespace_id == self.names.xmlns_namespace_id {
            return Err(Error::reserved(prefix.unwrap_or(""), namespace));
        }
        let prefix_id = match prefix {
            Some(prefix) => {
                let prefix_id = self.names.add_prefix(prefix);
                self.names.check_binding(prefix_id, namespace_id)?;
                (self.scopes.lookup_namespace(prefix_id) == Some(namespace_id)).then_some(prefix_id)
            }
            None => self.scopes.lookup_attribute_prefix(namespace_id),
        };
        prefix_id
            .map(|prefix_id| Resolution::reuse(prefix_id, namespace_id))
            .ok_or_else(|| Error::UnresolvableNamespace(namespace.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InScopeNamespaces;

    // records what the engine sends out
    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl OutputSink for Recorder {
        fn emit_start(&mut self, name: &Name) -> Result<(), Error> {
            self.events.push(format!("start {}", name.fullname()));
            Ok(())
        }
        fn emit_namespace_decl(&mut self, prefix: &str, namespace: &str) -> Result<(), Error> {
            self.events.push(format!("decl {}={}", prefix, namespace));
            Ok(())
        }
        fn emit_attribute(&mut self, name: &Name, value: &str) -> Result<(), Error> {
            self.events
                .push(format!("attr {}={}", name.fullname(), value));
            Ok(())
        }
        fn emit_end(&mut self, name: &Name) -> Result<(), Error> {
            self.events.push(format!("end {}", name.fullname()));
            Ok(())
        }
        fn emit_text(&mut self, text: &str) -> Result<(), Error> {
            self.events.push(format!("text {}", text));
            Ok(())
        }
        fn emit_comment(&mut self, text: &str) -> Result<(), Error> {
            self.events.push(format!("comment {}", text));
            Ok(())
        }
        fn emit_processing_instruction(
            &mut self,
            target: &str,
            _data: Option<&str>,
        ) -> Result<(), Error> {
            self.events.push(format!("pi {}", target));
            Ok(())
        }
    }

    fn engine() -> RepairEngine {
        RepairEngine::with_defaults()
    }

    #[test]
    fn test_element_synthesizes_once() {
        let mut engine = engine();
        let mut sink = Recorder::default();
        engine
            .start_element(&mut sink, "urn:a", None, "test")
            .unwrap();
        engine
            .start_element(&mut sink, "urn:a", None, "leaf")
            .unwrap();
        engine
            .attribute(&mut sink, "urn:a", None, "attr", "v")
            .unwrap();
        engine.end_element(&mut sink).unwrap();
        engine.end_element(&mut sink).unwrap();
        assert_eq!(
            sink.events,
            vec![
                "start ns1:test",
                "decl ns1=urn:a",
                "start ns1:leaf",
                "attr ns1:attr=v",
                "end ns1:leaf",
                "end ns1:test",
            ]
        );
    }

    #[test]
    fn test_empty_namespace_undeclares_default() {
        let mut engine = engine();
        let mut sink = Recorder::default();
        engine
            .start_element(&mut sink, "urn:a", Some(""), "a")
            .unwrap();
        engine.start_element(&mut sink, "", None, "b").unwrap();
        assert_eq!(
            sink.events,
            vec!["start a", "decl =urn:a", "start b", "decl ="]
        );
    }

    #[test]
    fn test_attribute_does_not_rebind() {
        let mut engine = engine();
        let mut sink = Recorder::default();
        engine
            .start_element(&mut sink, "urn:a", Some("p"), "a")
            .unwrap();
        engine
            .attribute(&mut sink, "urn:b", Some("p"), "x", "1")
            .unwrap();
        assert_eq!(
            sink.events,
            vec!["start p:a", "decl p=urn:a", "decl ns1=urn:b", "attr ns1:x=1"]
        );
        assert_eq!(engine.namespace_for_prefix("p"), Some("urn:a"));
    }

    #[test]
    fn test_attribute_with_no_open_element() {
        let mut engine = engine();
        let mut sink = Recorder::default();
        assert!(matches!(
            engine.attribute(&mut sink, "", None, "a", "1"),
            Err(Error::NoOpenStartTag)
        ));
        assert!(matches!(
            engine.end_element(&mut sink),
            Err(Error::NoOpenElement)
        ));
    }

    #[test]
    fn test_scope_reused_after_close() {
        let mut engine = engine();
        let mut sink = Recorder::default();
        for _ in 0..10 {
            engine.start_element(&mut sink, "", None, "a").unwrap();
            engine.end_element(&mut sink).unwrap();
        }
        assert_eq!(engine.pool_stats(), (2, 1));
    }

    #[test]
    fn test_context_bindings_reused() {
        let mut context = InScopeNamespaces::new();
        context.push("c", "urn:c");
        let mut engine =
            RepairEngine::new(&WriterConfig::default(), Some(&context)).unwrap();
        let mut sink = Recorder::default();
        engine
            .start_element(&mut sink, "urn:c", None, "a")
            .unwrap();
        assert_eq!(sink.events, vec!["start c:a"]);
    }

    #[test]
    fn test_context_reserved_rejected() {
        let context = [("xml", "urn:not-xml")];
        assert!(matches!(
            RepairEngine::new(&WriterConfig::default(), Some(&context)),
            Err(Error::ReservedBindingViolation { .. })
        ));
    }
}
