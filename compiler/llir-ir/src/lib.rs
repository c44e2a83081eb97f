//! Typed in-memory representation of LLVM IR.
//!
//! The IR is built from the flat records produced by `llir-syntax`. Every record is decoded into a
//! typed [`instruction::Instruction`], instructions are grouped into blocks, and blocks into
//! functions. Blocks refer to their predecessors by id, and calls to intrinsics are linked to the
//! declaring function once the whole module has been assembled.
//!
//! Types live in an [`arena::IrArena`], so two structurally equal types are always the same
//! allocation and can be compared by address.

use crate::arena::IrArena;
use crate::assembler::ModuleAssembler;
use crate::error::{AssemblyError, IrResult};
use crate::module::Module;
use llir_syntax::RawModule;

pub mod arena;
pub mod assembler;
pub mod attribute;
pub mod codes;
pub mod decoder;
pub mod error;
pub mod instruction;
pub mod module;
pub mod passes;
pub mod resolver;
pub mod ty;
pub mod value;

/// Build a linked module from parser records.
pub fn build_module<'ir>(arena: &IrArena<'ir>, raw: &RawModule) -> IrResult<Module<'ir>> {
    ModuleAssembler::new(arena).assemble(raw)
}

/// Parse textual LLVM assembly and build a linked module from it.
///
/// Either the whole module is built, or the first syntax or IR error is returned.
pub fn parse_assembly<'ir>(
    arena: &IrArena<'ir>,
    source: &str,
) -> Result<Module<'ir>, AssemblyError> {
    let raw = llir_syntax::parse_module(source)?;
    let module = build_module(arena, &raw)?;
    Ok(module)
}
