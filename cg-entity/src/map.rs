//! A map from a dense entity reference to a value, without owning the
//! index space itself (see `PrimaryMap` for that).

use crate::EntityRef;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// A mapping `K -> V` for densely indexed entity references.
///
/// Unlike `PrimaryMap`, a `SecondaryMap` can't be used to allocate entity
/// references; it attaches secondary information (liveness, coloring, DAG
/// value-numbering) to keys allocated elsewhere. Untouched keys read back
/// as the map's default value.
#[derive(Debug, Clone)]
pub struct SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    elems: Vec<V>,
    default: V,
    unused: PhantomData<K>,
}

impl<K, V> SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    /// Create a new empty map using `V::default()` as the default value.
    pub fn new() -> Self {
        Self::with_default(V::default())
    }
}

impl<K, V> SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    /// Create a new empty map with an explicit default value.
    pub fn with_default(default: V) -> Self {
        Self {
            elems: Vec::new(),
            default,
            unused: PhantomData,
        }
    }

    /// Number of entries materialized in the backing vector. Not
    /// necessarily the number of keys that exist upstream.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Get the value at `k`, if this map has materialized an entry for it.
    pub fn get(&self, k: K) -> Option<&V> {
        self.elems.get(k.index())
    }

    pub fn resize(&mut self, n: usize) {
        self.elems.resize(n, self.default.clone());
    }
}

impl<K, V> Default for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Index<K> for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    type Output = V;

    fn index(&self, k: K) -> &V {
        self.get(k).unwrap_or(&self.default)
    }
}

impl<K, V> IndexMut<K> for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    fn index_mut(&mut self, k: K) -> &mut V {
        let i = k.index();
        if i >= self.elems.len() {
            self.resize(i + 1);
        }
        &mut self.elems[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    struct E(u32);

    impl EntityRef for E {
        fn new(i: usize) -> Self {
            E(i as u32)
        }
        fn index(self) -> usize {
            self.0 as usize
        }
    }

    #[test]
    fn untouched_entries_read_as_default() {
        let r0 = E(0);
        let r1 = E(1);
        let r2 = E(2);
        let mut m: SecondaryMap<E, i32> = SecondaryMap::new();

        m[r2] = 3;
        m[r1] = 5;

        assert_eq!(m[r0], 0);
        assert_eq!(m[r1], 5);
        assert_eq!(m[r2], 3);
    }
}
