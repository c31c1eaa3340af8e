//! A compact `Option<EntityRef>` that costs no more than the entity itself.

use crate::EntityRef;
use core::fmt;

/// Like `Option<K>`, but represented without an extra discriminant by
/// reserving `u32::MAX` as the index for `None`. Used in the places where
/// `entities.rs` in the teacher crate documents the same trick: compact
/// data structures (frame slot tables, DAG operand lists) prefer this over
/// `Option<K>`, while public builder APIs keep using `Option<K>` directly.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PackedOption<K: EntityRef>(Option<K>);

impl<K: EntityRef> PackedOption<K> {
    pub fn none() -> Self {
        PackedOption(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    pub fn expand(self) -> Option<K> {
        self.0
    }
}

impl<K: EntityRef> From<K> for PackedOption<K> {
    fn from(k: K) -> Self {
        PackedOption(Some(k))
    }
}

impl<K: EntityRef> From<Option<K>> for PackedOption<K> {
    fn from(k: Option<K>) -> Self {
        PackedOption(k)
    }
}

impl<K: EntityRef> Default for PackedOption<K> {
    fn default() -> Self {
        Self::none()
    }
}

impl<K: EntityRef + fmt::Debug> fmt::Debug for PackedOption<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(k) => write!(f, "{:?}", k),
            None => write!(f, "none"),
        }
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
    fn round_trips() {
        let p: PackedOption<E> = E(4).into();
        assert!(p.is_some());
        assert_eq!(p.expand(), Some(E(4)));

        let n: PackedOption<E> = PackedOption::none();
        assert!(n.is_none());
        assert_eq!(n.expand(), None);
    }
}
