use crate::ty::{Type, TypeId};
use bumpalo::Bump;
use llir_syntax::RawType;
use std::cell::RefCell;
use std::collections::HashMap;

/// A type arena for IR types.
///
/// Types are allocated once and handed out by reference, so the arena doubles as a cache: looking
/// up a type that already exists returns the existing allocation. This reduces comparison of types
/// to pointer equality.
#[derive(Debug)]
pub struct IrArena<'ir> {
    allocator: &'ir Bump,
    interned_types: RefCell<HashMap<TypeId, &'ir Type<'ir>>>,
}

impl<'ir> IrArena<'ir> {
    pub fn new(bump: &'ir Bump) -> Self {
        Self {
            allocator: bump,
            interned_types: RefCell::new(HashMap::new()),
        }
    }

    /// Get a type from the arena by its identifier.
    pub fn get_type(&self, id: TypeId) -> Option<&'ir Type<'ir>> {
        self.interned_types.borrow().get(&id).copied()
    }

    /// Intern a type whose children are already interned.
    pub fn intern(&self, ty: Type<'ir>) -> &'ir Type<'ir> {
        let id = TypeId::from(&ty);
        *self
            .interned_types
            .borrow_mut()
            .entry(id)
            .or_insert_with(|| self.allocator.alloc(ty))
    }

    pub fn get_void_ty(&self) -> &'ir Type<'ir> {
        self.intern(Type::Void)
    }

    pub fn get_label_ty(&self) -> &'ir Type<'ir> {
        self.intern(Type::Label)
    }

    pub fn get_integer_ty(&self, width: u32) -> &'ir Type<'ir> {
        self.intern(Type::Integer(width))
    }

    pub fn get_pointer_ty(&self, address_space: u32) -> &'ir Type<'ir> {
        self.intern(Type::Pointer { address_space })
    }

    pub fn get_function_ty(
        &self,
        ret: &'ir Type<'ir>,
        parameters: &[&'ir Type<'ir>],
        is_vararg: bool,
    ) -> &'ir Type<'ir> {
        let id = TypeId::of_function(parameters, ret, is_vararg);
        self.get_type(id).unwrap_or_else(|| {
            self.insert(
                id,
                Type::Function {
                    parameters: self.allocator.alloc_slice_copy(parameters),
                    ret,
                    is_vararg,
                },
            )
        })
    }

    /// Intern the type tree of a parser record.
    ///
    /// Children are interned first. Slices and names are only copied into the arena when the
    /// type itself has not been seen before.
    pub fn lower_type(&self, ty: &RawType) -> &'ir Type<'ir> {
        let ty = match ty {
            RawType::Void => Type::Void,
            RawType::Function {
                parameters,
                ret,
                is_vararg,
            } => {
                let parameters = self.lower_children(parameters);
                return self.get_function_ty(self.lower_type(ret), &parameters, *is_vararg);
            }
            RawType::Integer(width) => Type::Integer(*width),
            RawType::FloatingPoint(kind) => Type::FloatingPoint(*kind),
            RawType::X86Amx => Type::X86Amx,
            RawType::Pointer { address_space } => Type::Pointer {
                address_space: *address_space,
            },
            RawType::TargetExtension { name, types, ints } => {
                let types = self.lower_children(types);
                let id = TypeId::of_target_extension(name, &types, ints);
                return self.get_type(id).unwrap_or_else(|| {
                    self.insert(
                        id,
                        Type::TargetExtension {
                            name: self.allocator.alloc_str(name),
                            types: self.allocator.alloc_slice_copy(&types),
                            ints: self.allocator.alloc_slice_copy(ints),
                        },
                    )
                });
            }
            RawType::Vector {
                count,
                element,
                is_scalable,
            } => Type::Vector {
                count: *count,
                element: self.lower_type(element),
                is_scalable: *is_scalable,
            },
            RawType::Label => Type::Label,
            RawType::Token => Type::Token,
            RawType::Metadata => Type::Metadata,
            RawType::Array { count, element } => Type::Array {
                count: *count,
                element: self.lower_type(element),
            },
            RawType::Structure {
                name,
                elements,
                is_packed,
            } => {
                let elements = self.lower_children(elements);
                let id = TypeId::of_structure(name.as_deref(), &elements, *is_packed);
                return self.get_type(id).unwrap_or_else(|| {
                    self.insert(
                        id,
                        Type::Structure {
                            name: name.as_deref().map(|name| &*self.allocator.alloc_str(name)),
                            elements: self.allocator.alloc_slice_copy(&elements),
                            is_packed: *is_packed,
                        },
                    )
                });
            }
            RawType::Opaque => Type::Opaque,
        };
        self.intern(ty)
    }

    fn lower_children(&self, types: &[RawType]) -> Vec<&'ir Type<'ir>> {
        types.iter().map(|t| self.lower_type(t)).collect()
    }

    fn insert(&self, id: TypeId, ty: Type<'ir>) -> &'ir Type<'ir> {
        let ty = &*self.allocator.alloc(ty);
        self.interned_types.borrow_mut().insert(id, ty);
        ty
    }
}

#[cfg(test)]
mod tests {
    use crate::arena::IrArena;
    use crate::ty::Type;
    use bumpalo::Bump;
    use llir_syntax::RawType;

    #[test]
    fn test_structurally_equal_types_are_interned_once() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let a = arena.lower_type(&RawType::Array {
            count: 4,
            element: Box::new(RawType::Integer(8)),
        });
        let b = arena.lower_type(&RawType::Array {
            count: 4,
            element: Box::new(RawType::Integer(8)),
        });
        assert!(std::ptr::eq(a, b));
        let i8_ty = arena.get_integer_ty(8);
        match a {
            Type::Array { element, .. } => assert!(std::ptr::eq(*element, i8_ty)),
            _ => panic!("expected an array type"),
        }
    }

    #[test]
    fn test_function_type_display() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let i32_ty = arena.get_integer_ty(32);
        let ptr = arena.get_pointer_ty(0);
        let printf = arena.get_function_ty(i32_ty, &[ptr], true);
        assert_eq!(printf.to_string(), "i32 (ptr, ...)");
        assert!(std::ptr::eq(printf, arena.get_function_ty(i32_ty, &[ptr], true)));
    }

    #[test]
    fn test_named_structure_prints_its_name() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let pair = arena.lower_type(&RawType::Structure {
            name: Some("struct.pair".to_owned()),
            elements: vec![RawType::Integer(32), RawType::Integer(64)],
            is_packed: false,
        });
        assert_eq!(pair.to_string(), "%struct.pair");
        let literal = arena.lower_type(&RawType::Structure {
            name: None,
            elements: vec![RawType::Integer(32), RawType::Integer(64)],
            is_packed: true,
        });
        assert_eq!(literal.to_string(), "<{ i32, i64 }>");
    }

    #[test]
    fn test_lowering_a_known_type_does_not_grow_the_arena() {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let pair = RawType::Structure {
            name: Some("struct.pair".to_owned()),
            elements: vec![RawType::Integer(32), RawType::ptr()],
            is_packed: false,
        };
        let callee = RawType::Function {
            parameters: vec![pair.clone(), RawType::Integer(64)],
            ret: Box::new(RawType::Void),
            is_vararg: true,
        };
        let first = arena.lower_type(&callee);
        let allocated = bump.allocated_bytes();
        for _ in 0..10_000 {
            assert!(std::ptr::eq(first, arena.lower_type(&callee)));
            arena.lower_type(&pair);
        }
        assert_eq!(bump.allocated_bytes(), allocated);
    }
}
