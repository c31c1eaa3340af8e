//! A retargetable code generator core: lowers a machine-independent IR
//! through a selection DAG, bottom-up optimal-tiling instruction selection,
//! and Chaitin-Briggs register allocation, down to a target's own
//! instruction text.
//!
//! The pipeline, in order, is [`verifier`] (checked structure), [`splitter`]
//! (block-length limits), [`dag`] (per-block DAG construction with CSE and
//! chain ordering), [`isel`] (tile selection), [`regalloc`] (coloring and
//! spilling), and [`binemit`] (text rendering). [`driver`] drives all of it
//! for a whole [`ir::Module`] against one [`isa::Target`].

pub mod binemit;
pub mod dag;
pub mod driver;
pub mod frame;
pub mod ir;
pub mod isa;
pub mod isel;
pub mod regalloc;
pub mod result;
pub mod settings;
pub mod splitter;
pub mod verifier;

pub use driver::compile_module;
pub use result::{CodegenError, CodegenResult};
pub use settings::Settings;
