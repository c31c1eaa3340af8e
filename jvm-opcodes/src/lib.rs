//! Static opcode table for the JVM backend target plugin.
//!
//! A process-wide lookup from opcode byte to `(mnemonic, operand kinds)`.
//! Nothing in the retargetable code generator core touches this crate;
//! it exists purely as the JVM backend's own collaborator, kept honest by
//! the table below and the `#[test]`s that exercise it.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The shape of an instruction's trailing operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A signed 8-bit immediate.
    I8,
    /// A signed 16-bit immediate.
    I16,
    /// An 8-bit constant-pool index.
    Idx8,
    /// A 16-bit constant-pool index.
    Idx16,
    /// A constant-pool index whose width depends on the surrounding
    /// instruction set (`new`, `anewarray`, ...).
    Idx,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub code: u8,
    pub operands: &'static [OperandKind],
}

macro_rules! op {
    ($mnemonic:expr, $code:expr) => {
        Opcode {
            mnemonic: $mnemonic,
            code: $code,
            operands: &[],
        }
    };
    ($mnemonic:expr, $code:expr, $( $operand:expr ),+ $(,)?) => {
        Opcode {
            mnemonic: $mnemonic,
            code: $code,
            operands: &[$( $operand ),+],
        }
    };
}

use OperandKind::*;

/// The opcode table, in declaration order. Not every byte value 0-255 is
/// assigned; gaps are deliberately left unfilled, matching the source
/// table this is grounded on.
pub static OPCODES: &[Opcode] = &[
    op!("nop", 0x00),
    op!("aconst_null", 0x01),
    op!("iconst_m1", 0x02),
    op!("iconst_0", 0x03),
    op!("iconst_1", 0x04),
    op!("iconst_2", 0x05),
    op!("iconst_3", 0x06),
    op!("iconst_4", 0x07),
    op!("iconst_5", 0x08),
    op!("lconst_0", 0x09),
    op!("lconst_1", 0x0a),
    op!("fconst_0", 0x0b),
    op!("fconst_1", 0x0c),
    op!("fconst_2", 0x0d),
    op!("dconst_0", 0x0e),
    op!("dconst_1", 0x0f),
    op!("bipush", 0x10, I8),
    op!("sipush", 0x11, I16),
    op!("ldc", 0x12, Idx8),
    op!("ldc_w", 0x13, Idx16),
    op!("ldc2_w", 0x14, Idx16),
    op!("iload", 0x15, Idx8),
    op!("lload", 0x16, Idx8),
    op!("fload", 0x17, Idx8),
    op!("dload", 0x18, Idx8),
    op!("aload", 0x19, Idx8),
    op!("iload_0", 0x1a),
    op!("iload_1", 0x1b),
    op!("iload_2", 0x1c),
    op!("iload_3", 0x1d),
    op!("istore", 0x36, Idx8),
    op!("lstore", 0x37, Idx8),
    op!("fstore", 0x38, Idx8),
    op!("dstore", 0x39, Idx8),
    op!("istore_0", 0x3b),
    op!("istore_1", 0x3c),
    op!("istore_2", 0x3d),
    op!("istore_3", 0x3e),
    op!("pop", 0x57),
    op!("pop2", 0x58),
    op!("dup", 0x59),
    op!("iadd", 0x60),
    op!("ladd", 0x61),
    op!("fadd", 0x62),
    op!("dadd", 0x63),
    op!("isub", 0x64),
    op!("lsub", 0x65),
    op!("fsub", 0x66),
    op!("dsub", 0x67),
    op!("imul", 0x68),
    op!("lmul", 0x69),
    op!("fmul", 0x6a),
    op!("dmul", 0x6b),
    op!("idiv", 0x6c),
    op!("ldiv", 0x6d),
    op!("fdiv", 0x6e),
    op!("ddiv", 0x6f),
    op!("irem", 0x70),
    op!("lrem", 0x71),
    op!("frem", 0x72),
    op!("drem", 0x73),
    op!("ineg", 0x74),
    op!("lneg", 0x75),
    op!("fneg", 0x76),
    op!("dneg", 0x77),
    op!("ishl", 0x78),
    op!("lshl", 0x79),
    op!("ishr", 0x7a),
    op!("lshr", 0x7b),
    op!("iushr", 0x7c),
    op!("lushr", 0x7d),
    op!("iand", 0x7e),
    op!("land", 0x7f),
    op!("ior", 0x80),
    op!("lor", 0x81),
    op!("ixor", 0x82),
    op!("lxor", 0x83),
    op!("i2l", 0x85),
    op!("i2f", 0x86),
    op!("i2d", 0x87),
    op!("l2i", 0x88),
    op!("l2f", 0x89),
    op!("l2d", 0x8a),
    op!("f2i", 0x8b),
    op!("f2l", 0x8c),
    op!("f2d", 0x8d),
    op!("d2i", 0x8e),
    op!("d2l", 0x8f),
    op!("d2f", 0x90),
    op!("i2b", 0x91),
    op!("i2c", 0x92),
    op!("i2s", 0x93),
    op!("ireturn", 0xac),
    op!("lreturn", 0xad),
    op!("freturn", 0xae),
    op!("dreturn", 0xaf),
    op!("areturn", 0xb0),
    op!("return", 0xb1),
    op!("getstatic", 0xb2, Idx16),
    op!("putstatic", 0xb3, Idx16),
    op!("getfield", 0xb4, Idx16),
    op!("putfield", 0xb5, Idx16),
    op!("invokevirtual", 0xb6, Idx16),
    op!("invokespecial", 0xb7, Idx16),
    op!("invokestatic", 0xb8, Idx16),
    op!("new", 0xbb, Idx),
];

/// Opcode byte -> table row, built once and shared process-wide.
pub static OPCODE_BY_CODE: Lazy<HashMap<u8, &'static Opcode>> =
    Lazy::new(|| OPCODES.iter().map(|op| (op.code, op)).collect());

/// Mnemonic -> table row, for assemblers going the other direction.
pub static OPCODE_BY_MNEMONIC: Lazy<HashMap<&'static str, &'static Opcode>> =
    Lazy::new(|| OPCODES.iter().map(|op| (op.mnemonic, op)).collect());

/// Look up an opcode by its byte value.
pub fn by_code(code: u8) -> Option<&'static Opcode> {
    OPCODE_BY_CODE.get(&code).copied()
}

/// Look up an opcode by its mnemonic.
pub fn by_mnemonic(mnemonic: &str) -> Option<&'static Opcode> {
    OPCODE_BY_MNEMONIC.get(mnemonic).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in OPCODES {
            assert!(seen.insert(op.code), "duplicate opcode byte {:#x}", op.code);
        }
    }

    #[test]
    fn looks_up_both_directions() {
        let add = by_code(0x60).expect("iadd is in the table");
        assert_eq!(add.mnemonic, "iadd");
        assert!(add.operands.is_empty());

        let new = by_mnemonic("new").expect("new is in the table");
        assert_eq!(new.code, 0xbb);
        assert_eq!(new.operands, &[OperandKind::Idx]);
    }

    #[test]
    fn invokestatic_takes_a_16_bit_constant_pool_index() {
        let op = by_code(0xb8).unwrap();
        assert_eq!(op.mnemonic, "invokestatic");
        assert_eq!(op.operands, &[OperandKind::Idx16]);
    }
}
