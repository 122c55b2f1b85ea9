use ahash::HashMap;
use tracing::debug;

use crate::error::Error;
use crate::id::{NamespaceId, PrefixId};
use crate::names::Names;

/// Prefix suggestions by namespace URI.
///
/// Hints are consulted only when the writer has to create a new binding for
/// a namespace; they never bind anything by themselves. A `PrefixHints`
/// value can be prepared once and handed to any number of writers through
/// [`WriterConfig`](crate::WriterConfig).
///
/// ```rust
/// use xot_repair::PrefixHints;
///
/// let mut hints = PrefixHints::new();
/// hints.suggest("http://example.com/a", "a");
/// hints.suggest("http://example.com/a", "x");
/// assert_eq!(hints.get("http://example.com/a"), Some("x"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixHints {
    hints: HashMap<String, String>,
}

impl PrefixHints {
    /// Create an empty set of hints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suggest `prefix` for `namespace`. The last suggestion for a namespace
    /// wins.
    pub fn suggest(&mut self, namespace: &str, prefix: &str) {
        self.hints.insert(namespace.to_string(), prefix.to_string());
    }

    /// The suggested prefix for a namespace.
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.hints.get(namespace).map(|s| s.as_str())
    }

    /// Iterate over `(namespace, prefix)` suggestions.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hints.iter().map(|(n, p)| (n.as_str(), p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

/// Hands out prefixes when a new binding has to be made up.
///
/// The counter belongs to one writer and only ever goes up, so a prefix
/// synthesized earlier is never synthesized again for another namespace.
#[derive(Debug)]
pub(crate) struct PrefixAllocator {
    stem: String,
    counter: usize,
    hints: HashMap<NamespaceId, PrefixId>,
}

impl PrefixAllocator {
    pub(crate) fn new(stem: &str) -> Self {
        Self {
            stem: stem.to_string(),
            counter: 0,
            hints: HashMap::default(),
        }
    }

    pub(crate) fn suggest(&mut self, namespace_id: NamespaceId, prefix_id: PrefixId) {
        self.hints.insert(namespace_id, prefix_id);
    }

    pub(crate) fn hint(&self, namespace_id: NamespaceId) -> Option<PrefixId> {
        self.hints.get(&namespace_id).copied()
    }

    /// Make up a prefix that `is_visible` says isn't in scope.
    pub(crate) fn generate(
        &mut self,
        names: &mut Names,
        is_visible: impl Fn(PrefixId) -> bool,
    ) -> PrefixId {
        loop {
            self.counter += 1;
            let candidate = format!("{}{}", self.stem, self.counter);
            let prefix_id = names.add_prefix(&candidate);
            if !is_visible(prefix_id) {
                debug!(prefix = candidate.as_str(), "synthesized prefix");
                return prefix_id;
            }
        }
    }
}

/// A stem has to start a name and may not contain a colon, otherwise
/// `stem` followed by digits isn't a usable prefix.
pub(crate) fn check_prefix_stem(stem: &str) -> Result<(), Error> {
    let mut chars = stem.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPrefixStem(stem.to_string()))
    }
}
