use crate::arena::IrArena;
use crate::instruction::Instruction;
use crate::module::FunctionId;
use crate::ty::Type;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Any operand of the IR.
///
/// Every value carries its type. A value naming an instruction's result is how consumers refer to
/// the producing instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Value<'ir> {
    pub kind: ValueKind<'ir>,
    pub ty: &'ir Type<'ir>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind<'ir> {
    /// Reference to a named producer: an instruction result, argument, block, global or function.
    Name(String),
    Int(i128),
    Float(f64),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    Aggregate(Vec<Value<'ir>>),
    ZeroInitializer,
    Null,
    Bytes(Vec<u8>),
    BlockAddress {
        function: String,
        block: String,
    },
    /// A constant expression.
    Expr(Box<Instruction<'ir>>),
    /// A function of the module, linked after assembly.
    Function {
        id: FunctionId,
        name: String,
    },
}

impl<'ir> Value<'ir> {
    pub fn new(kind: ValueKind<'ir>, ty: &'ir Type<'ir>) -> Self {
        Self { kind, ty }
    }

    pub fn name(name: impl Into<String>, ty: &'ir Type<'ir>) -> Self {
        Self::new(ValueKind::Name(name.into()), ty)
    }

    pub fn label(arena: &IrArena<'ir>, name: impl Into<String>) -> Self {
        Self::name(name, arena.get_label_ty())
    }

    pub fn int(value: i128, ty: &'ir Type<'ir>) -> Self {
        Self::new(ValueKind::Int(value), ty)
    }

    /// Get the referenced name if the value is a plain name reference.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match &self.kind {
            ValueKind::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Get the function this value was linked to.
    pub fn as_function(&self) -> Option<FunctionId> {
        match &self.kind {
            ValueKind::Function { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Whether the value names an intrinsic function that has not been linked yet.
    pub fn is_intrinsic_reference(&self) -> bool {
        self.ty.is_function() && self.as_name().is_some_and(|name| name.starts_with("llvm."))
    }

    /// Whether the value is an intrinsic function, linked or not.
    pub fn is_intrinsic(&self) -> bool {
        match &self.kind {
            ValueKind::Function { name, .. } => name.starts_with("llvm."),
            _ => self.is_intrinsic_reference(),
        }
    }
}

impl Display for Value<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Name(name) => write!(f, "'{}'", name),
            ValueKind::Int(value) => write!(f, "{}", value),
            ValueKind::Float(value) => write!(f, "{:?}", value),
            ValueKind::IntArray(values) => write!(f, "{:?}", values),
            ValueKind::FloatArray(values) => write!(f, "{:?}", values),
            ValueKind::Aggregate(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "Value({}, {})", value, value.ty)?;
                }
                write!(f, "]")
            }
            ValueKind::ZeroInitializer => write!(f, "zeroinitializer"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bytes(bytes) => {
                write!(f, "b'")?;
                for byte in bytes {
                    match byte {
                        b'\'' | b'\\' => write!(f, "\\{}", *byte as char)?,
                        0x20..=0x7e => write!(f, "{}", *byte as char)?,
                        _ => write!(f, "\\x{:02x}", byte)?,
                    }
                }
                write!(f, "'")
            }
            ValueKind::BlockAddress { function, block } => {
                write!(f, "('{}', '{}')", function, block)
            }
            ValueKind::Expr(instruction) => write!(f, "{}", instruction.opcode),
            ValueKind::Function { name, .. } => write!(f, "Function('{}')", name),
        }
    }
}
