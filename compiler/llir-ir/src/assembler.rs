//! Assembly of parser records into a linked module.
//!
//! Instructions are decoded into blocks, blocks into functions, and functions into the module.
//! Predecessor names are linked to block ids while each function is assembled. Intrinsic references
//! are queued while decoding and resolved after every function is in place.

use crate::arena::IrArena;
use crate::attribute::AttributeMap;
use crate::codes::{CallingConv, Linkage, ThreadLocalMode, UnnamedAddr, Visibility};
use crate::decoder::InstructionDecoder;
use crate::error::{
    DecodeLocation, DuplicateBlockError, DuplicateSymbolError, EmptyBlockError, IrError, IrResult,
    MisplacedTerminatorError, MissingTerminatorError, UnknownSymbolCodeError,
    UnresolvedPredecessorError,
};
use crate::module::{Block, BlockId, Function, FunctionId, GlobalObject, GlobalVariable, Module};
use crate::resolver::{FixupQueue, PostLinkResolver};
use crate::value::Value;
use indexmap::IndexMap;
use llir_diagnostics::ice;
use llir_span::Span;
use llir_syntax::{RawBlock, RawFunction, RawGlobalObject, RawGlobalVariable, RawModule, RawValue};

pub struct ModuleAssembler<'a, 'ir> {
    arena: &'a IrArena<'ir>,
    decoder: InstructionDecoder<'a, 'ir>,
    fixups: FixupQueue,
}

impl<'a, 'ir> ModuleAssembler<'a, 'ir> {
    pub fn new(arena: &'a IrArena<'ir>) -> Self {
        Self {
            arena,
            decoder: InstructionDecoder::new(arena),
            fixups: FixupQueue::new(),
        }
    }

    /// Assemble a module and resolve its intrinsic references.
    pub fn assemble(mut self, raw: &RawModule) -> IrResult<Module<'ir>> {
        log::debug!(
            "assembling module with {} functions and {} globals",
            raw.functions.len(),
            raw.global_variables.len()
        );
        let mut module = Module {
            source_filename: raw.source_filename.clone(),
            target_triple: raw.target_triple.clone(),
            data_layout: raw.data_layout.clone(),
            ..Default::default()
        };
        for global in &raw.global_variables {
            let global = self.assemble_global_variable(global)?;
            if module.global_variables.contains_key(&global.name) {
                return Err(duplicate_symbol(&global.name, global.span));
            }
            module.global_variables.insert(global.name.clone(), global);
        }
        for (index, function) in raw.functions.iter().enumerate() {
            let function = self.assemble_function(FunctionId(index), function)?;
            if module.functions.contains_key(&function.name) {
                return Err(duplicate_symbol(&function.name, function.span));
            }
            module.functions.insert(function.name.clone(), function);
        }
        PostLinkResolver::resolve(&mut module, self.fixups)?;
        Ok(module)
    }

    fn assemble_global_variable(&self, raw: &RawGlobalVariable) -> IrResult<GlobalVariable<'ir>> {
        let name = symbol_name(&raw.value);
        let location = DecodeLocation::Global { name: name.clone() };
        let initializer = match &raw.initializer {
            Some(initializer) => Some(self.decoder.lower_value(initializer, &location)?),
            None => None,
        };
        Ok(GlobalVariable {
            value: self.decoder.lower_value(&raw.value, &location)?,
            initializer,
            is_constant: raw.is_constant,
            attributes: AttributeMap::decode(self.arena, &raw.attributes),
            global_object: global_object(&name, raw.span, &raw.global_object)?,
            is_externally_initialized: raw.is_externally_initialized,
            span: raw.span,
            name,
        })
    }

    fn assemble_function(
        &mut self,
        id: FunctionId,
        raw: &RawFunction,
    ) -> IrResult<Function<'ir>> {
        let name = symbol_name(&raw.value);
        let location = DecodeLocation::Signature {
            function: name.clone(),
        };
        let calling_convention = CallingConv::from_code(raw.calling_convention).ok_or_else(|| {
            unknown_code(&name, raw.span, "calling convention", raw.calling_convention)
        })?;
        let arguments = raw
            .arguments
            .iter()
            .map(|argument| self.decoder.lower_value(argument, &location))
            .collect::<IrResult<Vec<_>>>()?;

        let mut blocks: IndexMap<String, Block<'ir>> = IndexMap::with_capacity(raw.blocks.len());
        for (index, raw_block) in raw.blocks.iter().enumerate() {
            let block = self.assemble_block(id, BlockId(index), &name, raw.span, raw_block)?;
            if blocks.contains_key(&block.name) {
                return Err(IrError::from(DuplicateBlockError {
                    block: block.name,
                    function: name,
                    span: raw.span,
                }));
            }
            blocks.insert(block.name.clone(), block);
        }
        link_predecessors(&mut blocks, raw, &name)?;
        log::debug!("assembled @{} with {} blocks", name, blocks.len());

        Ok(Function {
            id,
            value: self.decoder.lower_value(&raw.value, &location)?,
            arguments,
            blocks,
            attributes: AttributeMap::decode_layers(self.arena, &raw.attributes),
            calling_convention,
            is_vararg: raw.is_vararg,
            global_object: global_object(&name, raw.span, &raw.global_object)?,
            span: raw.span,
            name,
        })
    }

    fn assemble_block(
        &mut self,
        function_id: FunctionId,
        id: BlockId,
        function: &str,
        function_span: Span,
        raw: &RawBlock,
    ) -> IrResult<Block<'ir>> {
        let name = match raw.value.as_name() {
            Some(name) => name.to_owned(),
            None => ice!("block value is not a label name"),
        };
        let mut instructions = Vec::with_capacity(raw.instructions.len());
        for (index, record) in raw.instructions.iter().enumerate() {
            let location = DecodeLocation::instruction(function, &name, index);
            let instruction = self.decoder.decode(record, &location)?;
            self.fixups
                .enqueue_intrinsic_operands(function_id, id, index, &instruction);
            instructions.push(instruction);
        }
        match instructions.last() {
            None => {
                return Err(IrError::from(EmptyBlockError {
                    block: name,
                    function: function.to_owned(),
                    span: function_span,
                }))
            }
            Some(last) if !last.is_terminator() => {
                return Err(IrError::from(MissingTerminatorError {
                    block: name,
                    function: function.to_owned(),
                    span: last.span,
                }))
            }
            Some(_) => {}
        }
        let early = instructions[..instructions.len() - 1]
            .iter()
            .position(|instruction| instruction.is_terminator());
        if let Some(index) = early {
            let instruction = &instructions[index];
            return Err(IrError::from(MisplacedTerminatorError {
                opcode: instruction.opcode.to_string(),
                block: name,
                function: function.to_owned(),
                index,
                span: instruction.span,
            }));
        }
        Ok(Block {
            id,
            parent: function_id,
            value: Value::label(self.arena, name.clone()),
            name,
            instructions,
            predecessors: vec![],
        })
    }
}

/// Resolve the predecessor names of every block into ids of blocks in the same function.
fn link_predecessors(
    blocks: &mut IndexMap<String, Block<'_>>,
    raw: &RawFunction,
    function: &str,
) -> IrResult<()> {
    let mut links = Vec::with_capacity(raw.blocks.len());
    for (raw_block, block) in raw.blocks.iter().zip(blocks.values()) {
        let predecessors = raw_block
            .predecessors
            .iter()
            .map(|predecessor| match blocks.get_index_of(predecessor) {
                Some(index) => Ok(BlockId(index)),
                None => Err(IrError::from(UnresolvedPredecessorError {
                    block: block.name.clone(),
                    predecessor: predecessor.clone(),
                    function: function.to_owned(),
                    span: raw.span,
                })),
            })
            .collect::<IrResult<Vec<_>>>()?;
        links.push(predecessors);
    }
    for (block, predecessors) in blocks.values_mut().zip(links) {
        block.predecessors = predecessors;
    }
    Ok(())
}

fn symbol_name(value: &RawValue) -> String {
    match value.as_name() {
        Some(name) => name.to_owned(),
        None => ice!("symbol value is not a name"),
    }
}

fn global_object(name: &str, span: Span, raw: &RawGlobalObject) -> IrResult<GlobalObject> {
    Ok(GlobalObject {
        address_space: raw.address_space,
        align: raw.align,
        linkage: Linkage::from_code(raw.linkage)
            .ok_or_else(|| unknown_code(name, span, "linkage", raw.linkage))?,
        visibility: Visibility::from_code(raw.visibility)
            .ok_or_else(|| unknown_code(name, span, "visibility", raw.visibility))?,
        unnamed_addr: UnnamedAddr::from_code(raw.unnamed_addr)
            .ok_or_else(|| unknown_code(name, span, "unnamed_addr", raw.unnamed_addr))?,
        thread_local: ThreadLocalMode::from_code(raw.thread_local)
            .ok_or_else(|| unknown_code(name, span, "thread-local mode", raw.thread_local))?,
        section: raw.section.clone(),
    })
}

fn unknown_code(name: &str, span: Span, field: &'static str, code: u32) -> IrError {
    IrError::from(UnknownSymbolCodeError {
        name: name.to_owned(),
        field,
        code: code.to_string(),
        span,
    })
}

fn duplicate_symbol(name: &str, span: Span) -> IrError {
    IrError::from(DuplicateSymbolError {
        name: name.to_owned(),
        span,
    })
}

#[cfg(test)]
mod tests {
    use crate::arena::IrArena;
    use crate::assembler::ModuleAssembler;
    use crate::error::{DecodeLocation, IrError};
    use crate::module::BlockId;
    use bumpalo::Bump;
    use llir_macros::{assert_err, assert_matches, assert_ok};
    use llir_span::Span;
    use llir_syntax::{
        AdditionalData, RawBlock, RawFunction, RawGlobalObject, RawGlobalVariable, RawInstruction,
        RawModule, RawType, RawValue, RawValueKind, OPCODE_NAMES,
    };

    fn instruction(opcode: u32, operands: Vec<RawValue>) -> RawInstruction {
        RawInstruction {
            opcode,
            opcode_name: OPCODE_NAMES[opcode as usize].to_owned(),
            operands,
            additional: AdditionalData::None,
            attributes: vec![],
            result: None,
            span: Span::empty(),
        }
    }

    fn block(name: &str, instructions: Vec<RawInstruction>, predecessors: &[&str]) -> RawBlock {
        RawBlock {
            value: RawValue::label(name),
            instructions,
            predecessors: predecessors.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn function(blocks: Vec<RawBlock>) -> RawModule {
        RawModule {
            functions: vec![RawFunction {
                value: RawValue::name(
                    "f",
                    RawType::Function {
                        parameters: vec![],
                        ret: Box::new(RawType::Void),
                        is_vararg: false,
                    },
                ),
                arguments: vec![],
                blocks,
                attributes: vec![],
                calling_convention: 0,
                is_vararg: false,
                global_object: RawGlobalObject::default(),
                span: Span::empty(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_predecessors_are_linked_to_block_ids() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let raw = function(vec![
            block("entry", vec![instruction(2, vec![RawValue::label("exit")])], &[]),
            block("exit", vec![instruction(1, vec![])], &["entry"]),
        ]);
        let module = assert_ok!(ModuleAssembler::new(&arena).assemble(&raw));
        let function = module.get_function("f").unwrap();
        let exit = function.get_block("exit").unwrap();
        assert_eq!(exit.predecessors, vec![BlockId(0)]);
        assert!(std::ptr::eq(
            function.predecessors(exit.id)[0],
            function.get_block("entry").unwrap()
        ));
        assert_eq!(function.entry_block().unwrap().successors(), vec!["exit"]);
    }

    #[test]
    fn test_unknown_predecessor_is_an_error() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let raw = function(vec![block("entry", vec![instruction(1, vec![])], &["nowhere"])]);
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        assert_matches!(err, IrError::UnresolvedPredecessor(e) => assert_eq!(e.predecessor, "nowhere"));
    }

    #[test]
    fn test_block_must_end_with_terminator() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let raw = function(vec![block("entry", vec![instruction(35, vec![])], &[])]);
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        assert_matches!(err, IrError::MissingTerminator(e) => assert_eq!(e.block, "entry"));

        let raw = function(vec![block("entry", vec![], &[])]);
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        assert_matches!(err, IrError::EmptyBlock(_) => ());
    }

    #[test]
    fn test_duplicate_block_names_are_rejected() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let raw = function(vec![
            block("entry", vec![instruction(7, vec![])], &[]),
            block("entry", vec![instruction(7, vec![])], &[]),
        ]);
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        assert_matches!(err, IrError::DuplicateBlock(_) => ());
    }

    #[test]
    fn test_terminator_before_the_end_is_rejected() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let raw = function(vec![block(
            "entry",
            vec![instruction(7, vec![]), instruction(7, vec![])],
            &[],
        )]);
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        let err = assert_matches!(err, IrError::MisplacedTerminator(e) => e);
        assert_eq!(err.index, 0);
        assert_eq!(err.opcode, "unreachable");
    }

    #[test]
    fn test_decode_errors_abort_the_module() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let raw = function(vec![block(
            "entry",
            vec![instruction(7, vec![]), instruction(59, vec![])],
            &[],
        )]);
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        let err = assert_matches!(err, IrError::UnsupportedOpcode(e) => e);
        assert_eq!(err.location, DecodeLocation::instruction("f", "entry", 1));
        assert_eq!(
            err.to_string(),
            "opcode userop2 is reserved and cannot be decoded at instruction 1 of block entry in @f"
        );
    }

    #[test]
    fn test_global_decode_errors_name_the_global() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let initializer = RawValue::new(
            RawValueKind::Expr(Box::new(instruction(58, vec![]))),
            RawType::ptr(),
        );
        let raw = RawModule {
            global_variables: vec![RawGlobalVariable {
                value: RawValue::name("g", RawType::ptr()),
                initializer: Some(initializer),
                is_constant: false,
                attributes: vec![],
                global_object: RawGlobalObject::default(),
                is_externally_initialized: false,
                span: Span::empty(),
            }],
            ..Default::default()
        };
        let err = assert_err!(ModuleAssembler::new(&arena).assemble(&raw));
        let err = assert_matches!(err, IrError::UnsupportedOpcode(e) => e);
        assert_eq!(err.location, DecodeLocation::Global { name: "g".to_owned() });
        assert_eq!(
            err.to_string(),
            "opcode userop1 is reserved and cannot be decoded at global variable @g"
        );
    }
}
