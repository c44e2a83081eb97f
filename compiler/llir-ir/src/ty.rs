use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{DefaultHasher, Hash, Hasher};

pub use llir_syntax::FloatingPointKind;

/// An interned identifier for a type.
///
/// Children of a type are interned before their parent, so the identifier of a compound type is
/// computed from the identifiers of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u64);

impl TypeId {
    fn compute(key: impl Hash) -> Self {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self(hasher.finish())
    }
}

fn ids(types: &[&Type<'_>]) -> Vec<TypeId> {
    types.iter().map(|t| TypeId::from(*t)).collect()
}

impl TypeId {
    /// Identifier of a function type, computed from its already interned parts.
    pub fn of_function(parameters: &[&Type<'_>], ret: &Type<'_>, is_vararg: bool) -> Self {
        TypeId::compute((0x01, ids(parameters), TypeId::from(ret), is_vararg))
    }

    pub fn of_target_extension(name: &str, types: &[&Type<'_>], ints: &[u32]) -> Self {
        TypeId::compute((0x06, name, ids(types), ints))
    }

    pub fn of_structure(name: Option<&str>, elements: &[&Type<'_>], is_packed: bool) -> Self {
        TypeId::compute((0x0c, name, ids(elements), is_packed))
    }
}

impl<'ir> From<&Type<'ir>> for TypeId {
    fn from(ty: &Type<'ir>) -> Self {
        match ty {
            Type::Void => TypeId::compute(0x00),
            Type::Function {
                parameters,
                ret,
                is_vararg,
            } => TypeId::of_function(parameters, ret, *is_vararg),
            Type::Integer(width) => TypeId::compute((0x02, width)),
            Type::FloatingPoint(kind) => TypeId::compute((0x03, kind)),
            Type::X86Amx => TypeId::compute(0x04),
            Type::Pointer { address_space } => TypeId::compute((0x05, address_space)),
            Type::TargetExtension { name, types, ints } => {
                TypeId::of_target_extension(name, types, ints)
            }
            Type::Vector {
                count,
                element,
                is_scalable,
            } => TypeId::compute((0x07, count, TypeId::from(*element), is_scalable)),
            Type::Label => TypeId::compute(0x08),
            Type::Token => TypeId::compute(0x09),
            Type::Metadata => TypeId::compute(0x0a),
            Type::Array { count, element } => {
                TypeId::compute((0x0b, count, TypeId::from(*element)))
            }
            Type::Structure {
                name,
                elements,
                is_packed,
            } => TypeId::of_structure(*name, elements, *is_packed),
            Type::Opaque => TypeId::compute(0x0d),
        }
    }
}

/// A single type of the IR.
///
/// Types are interned in the [`crate::IrArena`], so two structurally equal types are the same
/// allocation. Pointers are opaque and carry no pointee type.
#[derive(Debug, PartialEq)]
pub enum Type<'ir> {
    Void,
    Function {
        parameters: &'ir [&'ir Type<'ir>],
        ret: &'ir Type<'ir>,
        is_vararg: bool,
    },
    Integer(u32),
    FloatingPoint(FloatingPointKind),
    X86Amx,
    Pointer {
        address_space: u32,
    },
    TargetExtension {
        name: &'ir str,
        types: &'ir [&'ir Type<'ir>],
        ints: &'ir [u32],
    },
    Vector {
        count: u32,
        element: &'ir Type<'ir>,
        is_scalable: bool,
    },
    Label,
    Token,
    Metadata,
    Array {
        count: u64,
        element: &'ir Type<'ir>,
    },
    /// A literal or identified structure. Identified structures carry their name.
    Structure {
        name: Option<&'ir str>,
        elements: &'ir [&'ir Type<'ir>],
        is_packed: bool,
    },
    Opaque,
}

impl<'ir> Type<'ir> {
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Type::Label)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// The return type of a function type.
    pub fn return_type(&self) -> Option<&'ir Type<'ir>> {
        match self {
            Type::Function { ret, .. } => Some(*ret),
            _ => None,
        }
    }
}

fn write_list(f: &mut Formatter<'_>, types: &[&Type<'_>]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

impl Display for Type<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Function {
                parameters,
                ret,
                is_vararg,
            } => {
                write!(f, "{} (", ret)?;
                write_list(f, parameters)?;
                match (is_vararg, parameters.is_empty()) {
                    (true, true) => write!(f, "...")?,
                    (true, false) => write!(f, ", ...")?,
                    _ => {}
                }
                write!(f, ")")
            }
            Type::Integer(width) => write!(f, "i{}", width),
            Type::FloatingPoint(kind) => write!(f, "{}", kind),
            Type::X86Amx => write!(f, "x86_amx"),
            Type::Pointer { address_space: 0 } => write!(f, "ptr"),
            Type::Pointer { address_space } => write!(f, "ptr addrspace({})", address_space),
            Type::TargetExtension { name, types, ints } => {
                write!(f, "target(\"{}\"", name)?;
                for ty in types.iter() {
                    write!(f, ", {}", ty)?;
                }
                for int in ints.iter() {
                    write!(f, ", {}", int)?;
                }
                write!(f, ")")
            }
            Type::Vector {
                count,
                element,
                is_scalable: true,
            } => write!(f, "<vscale x {} x {}>", count, element),
            Type::Vector { count, element, .. } => write!(f, "<{} x {}>", count, element),
            Type::Label => write!(f, "label"),
            Type::Token => write!(f, "token"),
            Type::Metadata => write!(f, "metadata"),
            Type::Array { count, element } => write!(f, "[{} x {}]", count, element),
            Type::Structure {
                name: Some(name), ..
            } => write!(f, "%{}", name),
            Type::Structure {
                elements,
                is_packed,
                ..
            } => {
                if *is_packed {
                    write!(f, "<")?;
                }
                match elements.is_empty() {
                    true => write!(f, "{{}}")?,
                    false => {
                        write!(f, "{{ ")?;
                        write_list(f, elements)?;
                        write!(f, " }}")?;
                    }
                }
                if *is_packed {
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Opaque => write!(f, "opaque"),
        }
    }
}
