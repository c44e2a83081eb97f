//! Raw records emitted by the parser.
//!
//! The records are a flat, owned description of the module: every instruction is reduced to its
//! opcode number, a flat operand list in use order, opcode specific additional data, and a list of
//! attribute tuples. Nothing here is linked; references between entities are plain names.

use llir_span::Span;
use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default)]
pub struct RawModule {
    pub source_filename: Option<String>,
    pub target_triple: Option<String>,
    pub data_layout: Option<String>,
    pub functions: Vec<RawFunction>,
    pub global_variables: Vec<RawGlobalVariable>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct RawFunction {
    /// The function as a value, typed with its function type.
    pub value: RawValue,
    pub arguments: Vec<RawValue>,
    pub blocks: Vec<RawBlock>,
    /// Attribute layers in the order `[function, return, arg0, arg1, ...]`.
    ///
    /// Trailing empty layers are dropped, and a function without any attributes has no layers.
    pub attributes: Vec<Vec<RawAttribute>>,
    pub calling_convention: u32,
    pub is_vararg: bool,
    pub global_object: RawGlobalObject,
    pub span: Span,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct RawGlobalVariable {
    pub value: RawValue,
    pub initializer: Option<RawValue>,
    pub is_constant: bool,
    pub attributes: Vec<RawAttribute>,
    pub global_object: RawGlobalObject,
    pub is_externally_initialized: bool,
    pub span: Span,
}

/// Linkage and placement properties shared by functions and global variables.
///
/// The enumerations are carried as their numeric codes.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGlobalObject {
    pub address_space: u32,
    pub align: u64,
    pub linkage: u32,
    pub unnamed_addr: u32,
    pub visibility: u32,
    pub thread_local: u32,
    pub section: Option<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// The block as a label-typed value.
    pub value: RawValue,
    pub instructions: Vec<RawInstruction>,
    /// Names of the predecessor blocks, most recent use first, without duplicates.
    pub predecessors: Vec<String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstruction {
    pub opcode: u32,
    pub opcode_name: String,
    pub operands: Vec<RawValue>,
    pub additional: AdditionalData,
    pub attributes: Vec<RawAttribute>,
    /// The instruction as a value, or `None` when the instruction produces no value.
    pub result: Option<RawValue>,
    pub span: Span,
}

/// Opcode specific data that does not fit in the operand list.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalData {
    None,
    Call {
        calling_convention: u32,
        attributes: Vec<Vec<RawAttribute>>,
    },
    CallBr {
        calling_convention: u32,
        attributes: Vec<Vec<RawAttribute>>,
        indirect_destinations: usize,
    },
    CatchSwitch {
        has_unwind_destination: bool,
    },
    Indices(Vec<u32>),
    AllocatedType(RawType),
    ElementTypes {
        result: RawType,
        source: RawType,
    },
    Predicate(String),
    IncomingBlocks(Vec<RawValue>),
    LandingPad {
        is_cleanup: bool,
        is_catch: Vec<bool>,
    },
    AtomicOperation(String),
    ShuffleMask(Vec<i32>),
    CmpXchgOrderings {
        success: u32,
        failure: u32,
    },
}

/// A single attribute as a name followed by zero or more payloads.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub values: Vec<RawAttributeValue>,
}

impl RawAttribute {
    pub fn marker(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            values: vec![],
        }
    }

    pub fn with_value(name: &str, value: RawAttributeValue) -> Self {
        Self {
            name: name.to_owned(),
            values: vec![value],
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum RawAttributeValue {
    Int(i64),
    Str(String),
    Type(RawType),
    Strings(Vec<String>),
    None,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RawValue {
    pub kind: RawValueKind,
    pub ty: RawType,
}

impl RawValue {
    pub fn new(kind: RawValueKind, ty: RawType) -> Self {
        Self { kind, ty }
    }

    pub fn name(name: impl Into<String>, ty: RawType) -> Self {
        Self::new(RawValueKind::Name(name.into()), ty)
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::name(name, RawType::Label)
    }

    /// Get the referenced name if the value is a plain name reference.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            RawValueKind::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Get the constant integer, looking through splat vectors.
    pub fn as_int(&self) -> Option<i64> {
        match &self.kind {
            RawValueKind::Int(v) => i64::try_from(*v).ok(),
            RawValueKind::IntArray(values) => match values.first() {
                Some(first) if values.iter().all(|v| v == first) => Some(*first),
                _ => None,
            },
            RawValueKind::ZeroInitializer => Some(0),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum RawValueKind {
    Name(String),
    Int(i128),
    Float(f64),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    Aggregate(Vec<RawValue>),
    ZeroInitializer,
    Null,
    Bytes(Vec<u8>),
    BlockAddress { function: String, block: String },
    Expr(Box<RawInstruction>),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatingPointKind {
    Half,
    BFloat,
    Float,
    Double,
    X86Fp80,
    Fp128,
    PpcFp128,
}

impl FloatingPointKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "half" => Some(Self::Half),
            "bfloat" => Some(Self::BFloat),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "x86_fp80" => Some(Self::X86Fp80),
            "fp128" => Some(Self::Fp128),
            "ppc_fp128" => Some(Self::PpcFp128),
            _ => None,
        }
    }

    /// Whether constant arrays of this element type are stored as packed float data.
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Half | Self::BFloat | Self::Float | Self::Double)
    }
}

impl Display for FloatingPointKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Half => write!(f, "half"),
            Self::BFloat => write!(f, "bfloat"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::X86Fp80 => write!(f, "x86_fp80"),
            Self::Fp128 => write!(f, "fp128"),
            Self::PpcFp128 => write!(f, "ppc_fp128"),
        }
    }
}

/// An owned type tree.
///
/// Named structures are resolved at parse time, so a `RawType` never refers to another type by
/// name alone.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    Void,
    Function {
        parameters: Vec<RawType>,
        ret: Box<RawType>,
        is_vararg: bool,
    },
    Integer(u32),
    FloatingPoint(FloatingPointKind),
    X86Amx,
    Pointer {
        address_space: u32,
    },
    TargetExtension {
        name: String,
        types: Vec<RawType>,
        ints: Vec<u32>,
    },
    Vector {
        count: u32,
        element: Box<RawType>,
        is_scalable: bool,
    },
    Label,
    Token,
    Metadata,
    Array {
        count: u64,
        element: Box<RawType>,
    },
    Structure {
        name: Option<String>,
        elements: Vec<RawType>,
        is_packed: bool,
    },
    Opaque,
}

impl RawType {
    pub fn ptr() -> Self {
        Self::Pointer { address_space: 0 }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    /// Get the element type of an array or vector.
    pub fn element(&self) -> Option<&RawType> {
        match self {
            Self::Array { element, .. } | Self::Vector { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Get the type at `index` within an aggregate type.
    pub fn member(&self, index: u64) -> Option<&RawType> {
        match self {
            Self::Structure { elements, .. } => elements.get(index as usize),
            Self::Array { element, .. } | Self::Vector { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Wrap `self` in a vector shaped like `shape` if `shape` is a vector.
    pub fn vectorized_like(self, shape: &RawType) -> RawType {
        match shape {
            Self::Vector {
                count, is_scalable, ..
            } => Self::Vector {
                count: *count,
                element: Box::new(self),
                is_scalable: *is_scalable,
            },
            _ => self,
        }
    }
}
