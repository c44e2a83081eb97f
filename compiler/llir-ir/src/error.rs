use llir_macros::declare_error_type;
use llir_syntax::ParseError;
use llir_span::Span;
use miette::Diagnostic;
use std::fmt;
use std::fmt::{Display, Formatter};
use thiserror::Error;

declare_error_type! {
    #[error("ir error: {0}")]
    pub enum IrError {
        MalformedOpcode(MalformedOpcodeError),
        UnsupportedOpcode(UnsupportedOpcodeError),
        OperandArity(OperandArityError),
        UnexpectedAdditionalData(UnexpectedAdditionalDataError),
        UnknownEnumCode(UnknownEnumCodeError),
        UnknownSymbolCode(UnknownSymbolCodeError),
        InvalidAttributePayload(InvalidAttributePayloadError),
        MissingTerminator(MissingTerminatorError),
        MisplacedTerminator(MisplacedTerminatorError),
        EmptyBlock(EmptyBlockError),
        DuplicateBlock(DuplicateBlockError),
        DuplicateSymbol(DuplicateSymbolError),
        UnresolvedPredecessor(UnresolvedPredecessorError),
        UnresolvedIntrinsic(UnresolvedIntrinsicError),
    }
}

/// Handy type alias for all IR construction errors.
pub type IrResult<T> = Result<T, IrError>;

declare_error_type! {
    #[error("assembly error: {0}")]
    pub enum AssemblyError {
        Syntax(ParseError),
        Ir(IrError),
    }
}

/// Where in the module a record was decoded, used to locate decode errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeLocation {
    Instruction {
        function: String,
        block: String,
        /// Index of the instruction within its block.
        index: usize,
    },
    /// The symbol value and arguments of a function.
    Signature { function: String },
    /// A global variable or its initializer.
    Global { name: String },
}

impl DecodeLocation {
    pub fn instruction(function: &str, block: &str, index: usize) -> Self {
        Self::Instruction {
            function: function.to_owned(),
            block: block.to_owned(),
            index,
        }
    }
}

impl Display for DecodeLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction {
                function,
                block,
                index,
            } => write!(f, "instruction {} of block {} in @{}", index, block, function),
            Self::Signature { function } => write!(f, "the signature of @{}", function),
            Self::Global { name } => write!(f, "global variable @{}", name),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(ir::malformed_opcode),
    help("opcodes are numbered from 1 to 67, and the number must agree with the opcode name")
)]
#[error("malformed opcode {opcode} ('{name}') at {location}")]
pub struct MalformedOpcodeError {
    pub opcode: u32,
    pub name: String,
    pub location: DecodeLocation,
    #[label = "this instruction has no valid opcode"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::unsupported_opcode))]
#[error("opcode {name} is reserved and cannot be decoded at {location}")]
pub struct UnsupportedOpcodeError {
    pub name: String,
    pub location: DecodeLocation,
    #[label = "{name} is not implemented"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::operand_arity))]
#[error("{opcode} expects {expected} operands, but {found} were given at {location}")]
pub struct OperandArityError {
    pub opcode: String,
    pub expected: String,
    pub found: usize,
    pub location: DecodeLocation,
    #[label = "wrong number of operands for {opcode}"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::unexpected_additional_data))]
#[error("{opcode} does not accept {found} additional data at {location}")]
pub struct UnexpectedAdditionalDataError {
    pub opcode: String,
    pub found: String,
    pub location: DecodeLocation,
    #[label = "additional data does not match the opcode"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::unknown_enum_code))]
#[error("unknown {field} '{code}' for {opcode} at {location}")]
pub struct UnknownEnumCodeError {
    pub opcode: String,
    pub field: &'static str,
    pub code: String,
    pub location: DecodeLocation,
    #[label = "no {field} is named '{code}'"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::unknown_symbol_code))]
#[error("unknown {field} '{code}' on @{name}")]
pub struct UnknownSymbolCodeError {
    pub name: String,
    pub field: &'static str,
    pub code: String,
    #[label = "no {field} is numbered {code}"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::invalid_attribute_payload))]
#[error("attribute '{attribute}' of {opcode} has an invalid payload at {location}")]
pub struct InvalidAttributePayloadError {
    pub opcode: String,
    pub attribute: String,
    pub location: DecodeLocation,
    #[label = "expected {expected}"]
    pub span: Span,
    pub expected: &'static str,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(ir::missing_terminator),
    help("every block must end with a terminator such as ret, br or unreachable")
)]
#[error("block {block} in @{function} does not end with a terminator")]
pub struct MissingTerminatorError {
    pub block: String,
    pub function: String,
    #[label = "this is the last instruction of {block}"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::misplaced_terminator))]
#[error("{opcode} ends block {block} in @{function} early, at instruction {index}")]
pub struct MisplacedTerminatorError {
    pub opcode: String,
    pub block: String,
    pub function: String,
    pub index: usize,
    #[label = "only the last instruction of a block may be a terminator"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::empty_block))]
#[error("block {block} in @{function} has no instructions")]
pub struct EmptyBlockError {
    pub block: String,
    pub function: String,
    #[label = "function containing the empty block"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::duplicate_block))]
#[error("block {block} is defined more than once in @{function}")]
pub struct DuplicateBlockError {
    pub block: String,
    pub function: String,
    #[label = "function containing the duplicate block"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::duplicate_symbol))]
#[error("@{name} is defined more than once")]
pub struct DuplicateSymbolError {
    pub name: String,
    #[label = "second definition of @{name}"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(ir::unresolved_predecessor))]
#[error("block {block} in @{function} lists predecessor {predecessor}, which does not exist")]
pub struct UnresolvedPredecessorError {
    pub block: String,
    pub predecessor: String,
    pub function: String,
    #[label = "function containing {block}"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(ir::unresolved_intrinsic),
    help("intrinsics must be declared in the module that calls them")
)]
#[error("intrinsic @{name} used in @{function} is not declared in the module")]
pub struct UnresolvedIntrinsicError {
    pub name: String,
    pub function: String,
    #[label = "use of undeclared intrinsic"]
    pub span: Span,
}
