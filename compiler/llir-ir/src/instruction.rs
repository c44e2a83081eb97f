use crate::attribute::{AttributeLayers, AttributeMap};
use crate::codes::{
    AtomicRmwOperation, CallingConv, FCmpPredicate, FastMathFlag, ICmpPredicate, Opcode, Ordering,
    SyncScope, TailCallKind,
};
use crate::ty::Type;
use crate::value::Value;
use llir_span::Span;

/// A single decoded instruction.
///
/// Instructions that share an operand shape share a variant of [`InstructionKind`]; the opcode
/// tells them apart. The result is `None` for instructions that produce no value and for constant
/// expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction<'ir> {
    pub opcode: Opcode,
    pub result: Option<Value<'ir>>,
    pub kind: InstructionKind<'ir>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind<'ir> {
    Ret {
        value: Option<Value<'ir>>,
    },
    /// A branch. An unconditional branch has neither condition nor true label, and its only
    /// destination is stored as the false label.
    Br {
        condition: Option<Value<'ir>>,
        label_false: Value<'ir>,
        label_true: Option<Value<'ir>>,
    },
    Switch {
        value: Value<'ir>,
        default: Value<'ir>,
        cases: Vec<(Value<'ir>, Value<'ir>)>,
    },
    IndirectBr {
        address: Value<'ir>,
        destinations: Vec<Value<'ir>>,
    },
    Invoke {
        call: CallMetadata<'ir>,
        callee: Value<'ir>,
        arguments: Vec<Value<'ir>>,
        label_normal: Value<'ir>,
        label_unwind: Value<'ir>,
    },
    Resume {
        value: Value<'ir>,
    },
    Unreachable,
    CleanupRet {
        cleanup_pad: Value<'ir>,
        unwind: Option<Value<'ir>>,
    },
    CatchRet {
        catch_pad: Value<'ir>,
        successor: Value<'ir>,
    },
    CatchSwitch {
        parent_pad: Value<'ir>,
        unwind: Option<Value<'ir>>,
        handlers: Vec<Value<'ir>>,
    },
    CallBr {
        call: CallMetadata<'ir>,
        callee: Value<'ir>,
        arguments: Vec<Value<'ir>>,
        fallthrough: Value<'ir>,
        indirect: Vec<Value<'ir>>,
    },
    UnaryOp {
        operand: Value<'ir>,
        flags: ArithmeticFlags,
    },
    BinOp {
        lhs: Value<'ir>,
        rhs: Value<'ir>,
        flags: ArithmeticFlags,
    },
    Alloca {
        allocated_type: &'ir Type<'ir>,
        num_elements: Value<'ir>,
        align: u64,
        is_inalloca: bool,
    },
    Load {
        address: Value<'ir>,
        access: MemoryAccess,
    },
    Store {
        value: Value<'ir>,
        address: Value<'ir>,
        access: MemoryAccess,
    },
    GetElementPtr {
        base: Value<'ir>,
        indices: Vec<Value<'ir>>,
        source_element_type: &'ir Type<'ir>,
        result_element_type: &'ir Type<'ir>,
        flags: GepFlags,
    },
    Fence {
        ordering: Ordering,
        sync_scope: SyncScope,
    },
    CmpXchg {
        address: Value<'ir>,
        expected: Value<'ir>,
        replacement: Value<'ir>,
        success_ordering: Ordering,
        failure_ordering: Ordering,
        sync_scope: SyncScope,
        align: u64,
        is_volatile: bool,
        is_weak: bool,
    },
    AtomicRmw {
        operation: AtomicRmwOperation,
        address: Value<'ir>,
        value: Value<'ir>,
        access: MemoryAccess,
    },
    /// A cast to `ty`.
    Conversion {
        value: Value<'ir>,
        ty: &'ir Type<'ir>,
        flags: ArithmeticFlags,
    },
    CleanupPad {
        parent_pad: Value<'ir>,
        arguments: Vec<Value<'ir>>,
    },
    CatchPad {
        catch_switch: Value<'ir>,
        arguments: Vec<Value<'ir>>,
    },
    ICmp {
        predicate: ICmpPredicate,
        lhs: Value<'ir>,
        rhs: Value<'ir>,
        same_sign: bool,
    },
    FCmp {
        predicate: FCmpPredicate,
        lhs: Value<'ir>,
        rhs: Value<'ir>,
        fast_math: Vec<FastMathFlag>,
    },
    /// A phi node as `(value, incoming block)` pairs.
    Phi {
        incoming: Vec<(Value<'ir>, Value<'ir>)>,
        fast_math: Vec<FastMathFlag>,
    },
    Call {
        call: CallMetadata<'ir>,
        callee: Value<'ir>,
        arguments: Vec<Value<'ir>>,
        tail_kind: TailCallKind,
        fast_math: Vec<FastMathFlag>,
    },
    Select {
        condition: Value<'ir>,
        if_true: Value<'ir>,
        if_false: Value<'ir>,
        fast_math: Vec<FastMathFlag>,
    },
    VaArg {
        list: Value<'ir>,
        ty: &'ir Type<'ir>,
    },
    ExtractElement {
        vector: Value<'ir>,
        index: Value<'ir>,
    },
    InsertElement {
        vector: Value<'ir>,
        element: Value<'ir>,
        index: Value<'ir>,
    },
    ShuffleVector {
        lhs: Value<'ir>,
        rhs: Value<'ir>,
        mask: Vec<i32>,
    },
    ExtractValue {
        aggregate: Value<'ir>,
        indices: Vec<u32>,
    },
    InsertValue {
        aggregate: Value<'ir>,
        element: Value<'ir>,
        indices: Vec<u32>,
    },
    /// A landing pad with its clauses as `(is_catch, value)` pairs. Filter clauses are not catch
    /// clauses.
    LandingPad {
        is_cleanup: bool,
        clauses: Vec<(bool, Value<'ir>)>,
    },
    Freeze {
        value: Value<'ir>,
    },
}

/// Calling convention and attribute layers shared by call, invoke and callbr.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMetadata<'ir> {
    pub calling_convention: CallingConv,
    pub attributes: Vec<AttributeMap<'ir>>,
}

impl<'ir> AttributeLayers<'ir> for CallMetadata<'ir> {
    fn attribute_layers(&self) -> &[AttributeMap<'ir>] {
        &self.attributes
    }
}

/// Flags of binary operators, unary operators and conversions. Absent flags are `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArithmeticFlags {
    pub nuw: bool,
    pub nsw: bool,
    pub exact: bool,
    pub disjoint: bool,
    pub nneg: bool,
    pub fast_math: Vec<FastMathFlag>,
}

/// Memory access modifiers of loads, stores and atomicrmw. An alignment of zero means none was
/// given.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAccess {
    pub align: u64,
    pub is_volatile: bool,
    pub is_atomic: bool,
    pub ordering: Ordering,
    pub sync_scope: SyncScope,
}

impl Default for MemoryAccess {
    fn default() -> Self {
        Self {
            align: 0,
            is_volatile: false,
            is_atomic: false,
            ordering: Ordering::NotAtomic,
            sync_scope: SyncScope::System,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GepFlags {
    pub inbounds: bool,
    pub nusw: bool,
    pub nuw: bool,
    pub inrange: Option<(i64, i64)>,
}

/// Collect the operands of an instruction kind, through either shared or mutable references.
/// `$iter` names the matching slice iterator.
macro_rules! collect_operands {
    ($kind:expr, $iter:ident) => {{
        let mut operands = Vec::new();
        match $kind {
            InstructionKind::Ret { value } => operands.extend(value),
            InstructionKind::Br {
                condition,
                label_false,
                label_true,
            } => {
                operands.extend(condition);
                operands.push(label_false);
                operands.extend(label_true);
            }
            InstructionKind::Switch {
                value,
                default,
                cases,
            } => {
                operands.push(value);
                operands.push(default);
                for (case, label) in cases {
                    operands.push(case);
                    operands.push(label);
                }
            }
            InstructionKind::IndirectBr {
                address,
                destinations,
            } => {
                operands.push(address);
                operands.extend(destinations);
            }
            InstructionKind::Invoke {
                callee,
                arguments,
                label_normal,
                label_unwind,
                ..
            } => {
                operands.extend(arguments);
                operands.push(label_normal);
                operands.push(label_unwind);
                operands.push(callee);
            }
            InstructionKind::Resume { value } => operands.push(value),
            InstructionKind::Unreachable => {}
            InstructionKind::CleanupRet {
                cleanup_pad,
                unwind,
            } => {
                operands.push(cleanup_pad);
                operands.extend(unwind);
            }
            InstructionKind::CatchRet {
                catch_pad,
                successor,
            } => {
                operands.push(catch_pad);
                operands.push(successor);
            }
            InstructionKind::CatchSwitch {
                parent_pad,
                unwind,
                handlers,
            } => {
                operands.push(parent_pad);
                operands.extend(unwind);
                operands.extend(handlers);
            }
            InstructionKind::CallBr {
                callee,
                arguments,
                fallthrough,
                indirect,
                ..
            } => {
                operands.extend(arguments);
                operands.push(fallthrough);
                operands.extend(indirect);
                operands.push(callee);
            }
            InstructionKind::UnaryOp { operand, .. } => operands.push(operand),
            InstructionKind::BinOp { lhs, rhs, .. } => {
                operands.push(lhs);
                operands.push(rhs);
            }
            InstructionKind::Alloca { num_elements, .. } => operands.push(num_elements),
            InstructionKind::Load { address, .. } => operands.push(address),
            InstructionKind::Store { value, address, .. } => {
                operands.push(value);
                operands.push(address);
            }
            InstructionKind::GetElementPtr { base, indices, .. } => {
                operands.push(base);
                operands.extend(indices);
            }
            InstructionKind::Fence { .. } => {}
            InstructionKind::CmpXchg {
                address,
                expected,
                replacement,
                ..
            } => {
                operands.push(address);
                operands.push(expected);
                operands.push(replacement);
            }
            InstructionKind::AtomicRmw { address, value, .. } => {
                operands.push(address);
                operands.push(value);
            }
            InstructionKind::Conversion { value, .. } => operands.push(value),
            InstructionKind::CleanupPad {
                parent_pad,
                arguments,
            } => {
                operands.extend(arguments);
                operands.push(parent_pad);
            }
            InstructionKind::CatchPad {
                catch_switch,
                arguments,
            } => {
                operands.extend(arguments);
                operands.push(catch_switch);
            }
            InstructionKind::ICmp { lhs, rhs, .. } | InstructionKind::FCmp { lhs, rhs, .. } => {
                operands.push(lhs);
                operands.push(rhs);
            }
            InstructionKind::Phi { incoming, .. } => {
                let (values, blocks): (Vec<_>, Vec<_>) = incoming
                    .$iter()
                    .map(|(value, block)| (value, block))
                    .unzip();
                operands.extend(values);
                operands.extend(blocks);
            }
            InstructionKind::Call {
                callee, arguments, ..
            } => {
                operands.extend(arguments);
                operands.push(callee);
            }
            InstructionKind::Select {
                condition,
                if_true,
                if_false,
                ..
            } => {
                operands.push(condition);
                operands.push(if_true);
                operands.push(if_false);
            }
            InstructionKind::VaArg { list, .. } => operands.push(list),
            InstructionKind::ExtractElement { vector, index } => {
                operands.push(vector);
                operands.push(index);
            }
            InstructionKind::InsertElement {
                vector,
                element,
                index,
            } => {
                operands.push(vector);
                operands.push(element);
                operands.push(index);
            }
            InstructionKind::ShuffleVector { lhs, rhs, .. } => {
                operands.push(lhs);
                operands.push(rhs);
            }
            InstructionKind::ExtractValue { aggregate, .. } => operands.push(aggregate),
            InstructionKind::InsertValue {
                aggregate, element, ..
            } => {
                operands.push(aggregate);
                operands.push(element);
            }
            InstructionKind::LandingPad { clauses, .. } => {
                operands.extend(clauses.$iter().map(|(_, value)| value));
            }
            InstructionKind::Freeze { value } => operands.push(value),
        }
        operands
    }};
}

impl<'ir> Instruction<'ir> {
    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }

    /// Get the call metadata of call, invoke and callbr.
    pub fn call_metadata(&self) -> Option<&CallMetadata<'ir>> {
        match &self.kind {
            InstructionKind::Call { call, .. }
            | InstructionKind::Invoke { call, .. }
            | InstructionKind::CallBr { call, .. } => Some(call),
            _ => None,
        }
    }

    pub fn callee(&self) -> Option<&Value<'ir>> {
        match &self.kind {
            InstructionKind::Call { callee, .. }
            | InstructionKind::Invoke { callee, .. }
            | InstructionKind::CallBr { callee, .. } => Some(callee),
            _ => None,
        }
    }

    /// Get the blocks this instruction may transfer control to, as label values in operand order.
    pub fn successors(&self) -> Vec<&Value<'ir>> {
        let labels = match &self.kind {
            InstructionKind::Br {
                label_false,
                label_true,
                ..
            } => {
                let mut labels = vec![label_false];
                labels.extend(label_true);
                labels
            }
            InstructionKind::Switch { default, cases, .. } => {
                let mut labels = vec![default];
                labels.extend(cases.iter().map(|(_, label)| label));
                labels
            }
            InstructionKind::IndirectBr { destinations, .. } => destinations.iter().collect(),
            InstructionKind::Invoke {
                label_normal,
                label_unwind,
                ..
            } => vec![label_normal, label_unwind],
            InstructionKind::CleanupRet { unwind, .. } => unwind.iter().collect(),
            InstructionKind::CatchRet { successor, .. } => vec![successor],
            InstructionKind::CatchSwitch {
                unwind, handlers, ..
            } => unwind.iter().chain(handlers.iter()).collect(),
            InstructionKind::CallBr {
                fallthrough,
                indirect,
                ..
            } => std::iter::once(fallthrough).chain(indirect.iter()).collect(),
            _ => vec![],
        };
        labels.into_iter().filter(|v| v.ty.is_label()).collect()
    }

    /// Visit every operand in the order the parser records them. Phi incoming blocks follow the
    /// incoming values.
    pub fn operands(&self) -> Vec<&Value<'ir>> {
        collect_operands!(&self.kind, iter)
    }

    /// Mutable counterpart of [`Instruction::operands`], visiting operands in the same order.
    pub fn operands_mut(&mut self) -> Vec<&mut Value<'ir>> {
        collect_operands!(&mut self.kind, iter_mut)
    }
}
