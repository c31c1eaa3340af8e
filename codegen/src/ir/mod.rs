//! The machine-independent IR consumed by the core (spec.md §3, §6).

pub mod entities;
pub mod function;
pub mod instruction;
pub mod types;

pub use entities::{Block, Inst, Value};
pub use function::{BlockData, Function, GlobalVariable, Module, ValueDef};
pub use instruction::{BinOp, InstructionData, Terminator};
pub use types::Type;

/// The label a block gets in the textual/output form: `<function>_block<idx>`
/// for every block but the entry, which is named `<function>` (spec.md §6).
pub fn block_label(function_name: &str, function: &Function, block: Block) -> String {
    if block == function.entry {
        function_name.to_string()
    } else {
        let idx = function
            .block_order
            .iter()
            .position(|b| *b == block)
            .expect("block belongs to this function");
        format!("{}_block{}", function_name, idx)
    }
}
