//! Per-function stack frame: the home for spilled values and the vregs
//! the allocator has not yet colored (spec.md §4.4 step 6, §4.6).

use crate::isa::VReg;
use std::collections::HashMap;

/// Tracks spill-slot assignment for one function. Every spilled vreg gets
/// a word-sized slot the first time it is seen; later lookups reuse it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function_name: String,
    word_size: u32,
    slots: HashMap<VReg, i32>,
    next_offset: i32,
}

impl Frame {
    pub fn new(function_name: impl Into<String>) -> Self {
        Frame {
            function_name: function_name.into(),
            word_size: 4,
            slots: HashMap::new(),
            next_offset: 0,
        }
    }

    /// The byte offset (from the frame base) of `vreg`'s spill slot,
    /// allocating a fresh one the first time it is spilled.
    pub fn slot_for(&mut self, vreg: VReg) -> i32 {
        if let Some(&offset) = self.slots.get(&vreg) {
            return offset;
        }
        let offset = self.next_offset;
        self.next_offset += self.word_size as i32;
        self.slots.insert(vreg, offset);
        offset
    }

    /// The total frame size in bytes, rounded up to a 16-byte boundary
    /// (a conservative alignment that satisfies most calling conventions).
    pub fn size(&self) -> u32 {
        let raw = self.next_offset as u32;
        (raw + 15) / 16 * 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_entity::EntityRef;

    #[test]
    fn repeated_spills_of_the_same_vreg_share_a_slot() {
        let mut frame = Frame::new("f");
        let v: VReg = VReg::new(0);
        let a = frame.slot_for(v);
        let b = frame.slot_for(v);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_vregs_get_distinct_slots() {
        let mut frame = Frame::new("f");
        let a = frame.slot_for(VReg::new(0));
        let b = frame.slot_for(VReg::new(1));
        assert_ne!(a, b);
    }

    #[test]
    fn size_rounds_up_to_sixteen_bytes() {
        let mut frame = Frame::new("f");
        frame.slot_for(VReg::new(0));
        assert_eq!(frame.size(), 16);
    }
}
