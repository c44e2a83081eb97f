use crate::attribute::{AttributeLayers, AttributeMap};
use crate::codes::{CallingConv, Linkage, ThreadLocalMode, UnnamedAddr, Visibility};
use crate::instruction::{Instruction, InstructionKind};
use crate::ty::Type;
use crate::value::Value;
use indexmap::IndexMap;
use llir_diagnostics::ice;
use llir_span::Span;

/// Index of a function within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

/// Index of a block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Block<'ir> {
    pub id: BlockId,
    pub parent: FunctionId,
    pub name: String,
    /// The block as a label-typed value.
    pub value: Value<'ir>,
    pub instructions: Vec<Instruction<'ir>>,
    /// Predecessor blocks, most recent use first.
    pub predecessors: Vec<BlockId>,
}

impl<'ir> Block<'ir> {
    /// Get the terminator ending the block.
    pub fn terminator(&self) -> &Instruction<'ir> {
        match self.instructions.last() {
            Some(instruction) if instruction.is_terminator() => instruction,
            _ => ice!(format!("block {} was assembled without a terminator", self.name)),
        }
    }

    /// Get the names of the blocks the terminator may branch to.
    pub fn successors(&self) -> Vec<&str> {
        self.terminator()
            .successors()
            .into_iter()
            .filter_map(|label| label.as_name())
            .collect()
    }

    /// Whether the block contains no calls other than calls to intrinsics.
    pub fn has_no_calls(&self) -> bool {
        self.instructions.iter().all(|instruction| match &instruction.kind {
            InstructionKind::Call { callee, .. }
            | InstructionKind::Invoke { callee, .. }
            | InstructionKind::CallBr { callee, .. } => callee.is_intrinsic(),
            _ => true,
        })
    }
}

/// Linkage and placement properties shared by functions and global variables.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalObject {
    pub address_space: u32,
    pub align: u64,
    pub linkage: Linkage,
    pub visibility: Visibility,
    pub unnamed_addr: UnnamedAddr,
    pub thread_local: ThreadLocalMode,
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function<'ir> {
    pub id: FunctionId,
    pub name: String,
    /// The function as a value, typed with its function type.
    pub value: Value<'ir>,
    pub arguments: Vec<Value<'ir>>,
    /// Blocks in definition order. The first block is the entry block.
    pub blocks: IndexMap<String, Block<'ir>>,
    pub attributes: Vec<AttributeMap<'ir>>,
    pub calling_convention: CallingConv,
    pub is_vararg: bool,
    pub global_object: GlobalObject,
    pub span: Span,
}

impl<'ir> Function<'ir> {
    /// Whether the function has no blocks, i.e. it is only declared in this module.
    pub fn has_no_body(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_declaration(&self) -> bool {
        self.has_no_body()
    }

    pub fn get_block(&self, name: &str) -> Option<&Block<'ir>> {
        self.blocks.get(name)
    }

    pub fn entry_block(&self) -> Option<&Block<'ir>> {
        self.blocks.first().map(|(_, block)| block)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block<'ir>> {
        self.blocks.get_index(id.0).map(|(_, block)| block)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block<'ir>> {
        self.blocks.values()
    }

    /// Get the predecessors of a block as blocks of this function.
    pub fn predecessors(&self, id: BlockId) -> Vec<&Block<'ir>> {
        let block = match self.block(id) {
            Some(block) => block,
            None => return vec![],
        };
        block
            .predecessors
            .iter()
            .map(|predecessor| match self.block(*predecessor) {
                Some(predecessor) => predecessor,
                None => ice!("predecessor was linked to a block outside the function"),
            })
            .collect()
    }

    pub fn return_type(&self) -> Option<&'ir Type<'ir>> {
        self.value.ty.return_type()
    }
}

impl<'ir> AttributeLayers<'ir> for Function<'ir> {
    fn attribute_layers(&self) -> &[AttributeMap<'ir>] {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariable<'ir> {
    pub name: String,
    /// The global as a value, typed with the type of its contents.
    pub value: Value<'ir>,
    pub initializer: Option<Value<'ir>>,
    pub is_constant: bool,
    pub attributes: AttributeMap<'ir>,
    pub global_object: GlobalObject,
    pub is_externally_initialized: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module<'ir> {
    pub source_filename: Option<String>,
    pub target_triple: Option<String>,
    pub data_layout: Option<String>,
    /// Functions in definition order.
    pub functions: IndexMap<String, Function<'ir>>,
    pub global_variables: IndexMap<String, GlobalVariable<'ir>>,
}

impl<'ir> Module<'ir> {
    pub fn get_function(&self, name: &str) -> Option<&Function<'ir>> {
        self.functions.get(name)
    }

    pub fn get_global_variable(&self, name: &str) -> Option<&GlobalVariable<'ir>> {
        self.global_variables.get(name)
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function<'ir>> {
        self.functions.get_index(id.0).map(|(_, function)| function)
    }

    /// Get the function defined first, for callers that need an entry point without a name.
    pub fn first_function(&self) -> Option<&Function<'ir>> {
        self.functions.first().map(|(_, function)| function)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function<'ir>> {
        self.functions.values()
    }

    pub fn global_variables(&self) -> impl Iterator<Item = &GlobalVariable<'ir>> {
        self.global_variables.values()
    }
}
