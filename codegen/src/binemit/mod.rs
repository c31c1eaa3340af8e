//! Rendering allocated abstract instructions to text (spec.md §6).

pub mod outstream;

pub use outstream::{FunctionOutputCollector, FunctionOutputStream, MasterOutputStream, TextOutputStream};

use crate::isa::{PReg, Target};

/// Render one instruction's mnemonic and operands the way a human-readable
/// listing does: `mnemonic dst, uses..., #imm`. Targets whose assembly
/// syntax differs can still use this -- the mnemonics themselves already
/// encode the addressing mode (e.g. `addi` vs `add`).
pub fn render_instruction(target: &dyn Target, mnemonic: &str, def: Option<PReg>, uses: &[PReg], imm: Option<i64>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(d) = def {
        parts.push(target.register_name(d));
    }
    parts.extend(uses.iter().map(|&r| target.register_name(r)));
    if let Some(imm) = imm {
        parts.push(format!("#{}", imm));
    }
    if parts.is_empty() {
        mnemonic.to_string()
    } else {
        format!("{} {}", mnemonic, parts.join(", "))
    }
}
