//! Dense, arena-indexed entity references.
//!
//! DAG nodes, abstract instructions, virtual registers, and frame slots are
//! all "just an index into a vector owned by something else". Representing
//! them as distinct zero-cost wrapper types instead of raw `u32` catches
//! mix-ups at compile time without paying for pointers or `Rc`.

mod map;
mod packed_option;
mod primary;

pub use map::SecondaryMap;
pub use packed_option::PackedOption;
pub use primary::PrimaryMap;

/// A type that can be used as a key in a `PrimaryMap` or `SecondaryMap`.
///
/// An entity reference is a plain, densely-numbered index. `new` and
/// `index` must round-trip: `E::new(i).index() == i`.
pub trait EntityRef: Copy + Eq {
    /// Create a new entity reference from its dense index.
    fn new(index: usize) -> Self;

    /// The dense index of this entity reference.
    fn index(self) -> usize;
}

/// Declare a newtype wrapping a `u32` as an `EntityRef`, with `Display`
/// printing the given `$prefix` followed by the index (matching the
/// textual IR conventions used throughout this workspace, e.g. `v12`,
/// `inst3`, `blk0`).
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident, $prefix:expr) => {
        impl $crate::EntityRef for $entity {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $entity {
            /// Create a reference from its raw index, for use by parsers and
            /// other callers that already have a dense number in hand.
            #[allow(dead_code)]
            pub fn from_u32(index: u32) -> Self {
                $entity(index)
            }

            #[allow(dead_code)]
            fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $entity {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl core::fmt::Debug for $entity {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                (self as &dyn core::fmt::Display).fmt(f)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, PartialEq, Eq, Hash)]
    struct Widget(u32);
    entity_impl!(Widget, "w");

    #[test]
    fn round_trips_through_index() {
        let w = Widget::new(7);
        assert_eq!(w.index(), 7);
        assert_eq!(w.to_string(), "w7");
    }
}
