//! Post-link resolution of intrinsic references.
//!
//! Intrinsic functions are referenced by name while instructions are decoded, because the functions
//! they refer to are only assembled later. The assembler records each such operand as a [`Fixup`]
//! in a [`FixupQueue`] that belongs to a single module construction, and the
//! [`PostLinkResolver`] drains the queue once the whole module exists.

use crate::error::{IrResult, UnresolvedIntrinsicError};
use crate::instruction::Instruction;
use crate::module::{BlockId, FunctionId, Module};
use crate::value::ValueKind;
use llir_diagnostics::ice;
use llir_span::Span;

/// A deferred rewrite of one operand into a reference to a module function.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixup {
    pub function: FunctionId,
    pub block: BlockId,
    /// Index of the instruction within its block.
    pub instruction: usize,
    /// Index of the operand in [`Instruction::operands`] order.
    pub operand: usize,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct FixupQueue {
    fixups: Vec<Fixup>,
}

impl FixupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, fixup: Fixup) {
        self.fixups.push(fixup);
    }

    /// Queue every operand of `instruction` that names an intrinsic function.
    pub fn enqueue_intrinsic_operands(
        &mut self,
        function: FunctionId,
        block: BlockId,
        index: usize,
        instruction: &Instruction<'_>,
    ) {
        for (operand, value) in instruction.operands().into_iter().enumerate() {
            if !value.is_intrinsic_reference() {
                continue;
            }
            if let Some(name) = value.as_name() {
                self.enqueue(Fixup {
                    function,
                    block,
                    instruction: index,
                    operand,
                    name: name.to_owned(),
                    span: instruction.span,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fixups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixups.is_empty()
    }
}

pub struct PostLinkResolver();

impl PostLinkResolver {
    /// Apply every queued fixup to `module`. The queue is consumed, so it is drained exactly once.
    pub fn resolve(module: &mut Module<'_>, queue: FixupQueue) -> IrResult<()> {
        log::debug!("resolving {} intrinsic references", queue.len());
        for fixup in queue.fixups {
            let id = match module.functions.get_index_of(&fixup.name) {
                Some(index) => FunctionId(index),
                None => {
                    let function = match module.function(fixup.function) {
                        Some(function) => function.name.clone(),
                        None => ice!("fixup queued for a function outside the module"),
                    };
                    return Err(UnresolvedIntrinsicError {
                        name: fixup.name,
                        function,
                        span: fixup.span,
                    }
                    .into());
                }
            };
            let operand = module
                .functions
                .get_index_mut(fixup.function.0)
                .and_then(|(_, function)| function.blocks.get_index_mut(fixup.block.0))
                .and_then(|(_, block)| block.instructions.get_mut(fixup.instruction))
                .and_then(|instruction| instruction.operands_mut().into_iter().nth(fixup.operand));
            match operand {
                Some(operand) => {
                    log::trace!("linked @{} to function #{}", fixup.name, id.0);
                    operand.kind = ValueKind::Function {
                        id,
                        name: fixup.name,
                    };
                }
                None => ice!("fixup refers to an operand that does not exist"),
            }
        }
        Ok(())
    }
}
