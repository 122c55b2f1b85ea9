use ahash::HashMap;

pub(crate) trait IdIndex<T> {
    fn to_id(index: usize) -> T;
    fn from_id(id: T) -> usize;
}

/// Interns values, handing out small copyable ids.
#[derive(Debug, Clone)]
pub(crate) struct IdMap<K: Copy + IdIndex<K>, V: Eq + std::hash::Hash + Clone> {
    by_id: Vec<V>,
    by_value: HashMap<V, K>,
}

impl<K: Copy + IdIndex<K>, V: Eq + std::hash::Hash + Clone> IdMap<K, V> {
    pub(crate) fn new() -> Self {
        IdMap {
            by_id: Vec::new(),
            by_value: HashMap::default(),
        }
    }

    pub(crate) fn get_id_mut(&mut self, value: V) -> K {
        if let Some(id) = self.by_value.get(&value) {
            *id
        } else {
            let id = K::to_id(self.by_id.len());
            self.by_value.insert(value.clone(), id);
            self.by_id.push(value);
            id
        }
    }

    pub(crate) fn get_id<Q>(&self, value: &Q) -> Option<K>
    where
        V: std::borrow::Borrow<Q>,
        Q: std::hash::Hash + Eq + ?Sized,
    {
        self.by_value.get(value).copied()
    }

    #[inline]
    pub(crate) fn get_value(&self, id: K) -> &V {
        &self.by_id[K::from_id(id)]
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    struct Id(u32);

    impl IdIndex<Id> for Id {
        fn to_id(index: usize) -> Id {
            Id(index as u32)
        }

        fn from_id(id: Id) -> usize {
            id.0 as usize
        }
    }

    #[test]
    fn test_id_map() {
        let mut map = IdMap::<Id, String>::new();
        let id1 = map.get_id_mut("foo".to_string());
        let id2 = map.get_id_mut("bar".to_string());
        let id3 = map.get_id_mut("foo".to_string());
        assert_eq!(id1, id3);
        assert_ne!(id1, id2);
        assert_eq!(map.get_value(id1), "foo");
        assert_eq!(map.get_value(id2), "bar");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_get_id_does_not_intern() {
        let mut map = IdMap::<Id, String>::new();
        let id = map.get_id_mut("foo".to_string());
        assert_eq!(map.get_id("foo"), Some(id));
        assert_eq!(map.get_id("bar"), None);
        assert_eq!(map.len(), 1);
    }
}
