//! Instruction decoding.
//!
//! The parser hands every instruction over as an opcode number, a flat operand list, opcode
//! specific additional data, and attribute tuples. The decoder reassembles these pieces into an
//! [`Instruction`] with named fields. Each opcode has its own reconstruction rule, dispatched by an
//! exhaustive match over [`Opcode`].
//!
//! Decoding is pure: the same record always yields the same instruction, and nothing outside the
//! returned value is touched. Names are not resolved here, so operands referring to functions stay
//! plain name references until the module is linked.

use crate::arena::IrArena;
use crate::attribute::{AttributeMap, AttributePayload, AttributeValue};
use crate::codes::{
    AtomicRmwOperation, CallingConv, FCmpPredicate, FastMathFlag, ICmpPredicate, Opcode, Ordering,
    SyncScope, TailCallKind,
};
use crate::error::{
    DecodeLocation, InvalidAttributePayloadError, IrError, IrResult, MalformedOpcodeError,
    OperandArityError, UnexpectedAdditionalDataError, UnknownEnumCodeError,
    UnsupportedOpcodeError,
};
use crate::instruction::{
    ArithmeticFlags, CallMetadata, GepFlags, Instruction, InstructionKind, MemoryAccess,
};
use crate::ty::Type;
use crate::value::{Value, ValueKind};
use llir_syntax::{AdditionalData, RawAttribute, RawInstruction, RawValue, RawValueKind};

pub struct InstructionDecoder<'a, 'ir> {
    arena: &'a IrArena<'ir>,
}

impl<'a, 'ir> InstructionDecoder<'a, 'ir> {
    pub fn new(arena: &'a IrArena<'ir>) -> Self {
        Self { arena }
    }

    /// Decode a single instruction record found at `location`.
    pub fn decode(
        &self,
        record: &RawInstruction,
        location: &DecodeLocation,
    ) -> IrResult<Instruction<'ir>> {
        let ty = record
            .result
            .as_ref()
            .map(|result| self.arena.lower_type(&result.ty));
        self.decode_record(record, location, ty)
    }

    /// Lower a value record, decoding any constant expressions inside it.
    pub fn lower_value(&self, value: &RawValue, location: &DecodeLocation) -> IrResult<Value<'ir>> {
        let ty = self.arena.lower_type(&value.ty);
        let kind = match &value.kind {
            RawValueKind::Name(name) => ValueKind::Name(name.clone()),
            RawValueKind::Int(value) => ValueKind::Int(*value),
            RawValueKind::Float(value) => ValueKind::Float(*value),
            RawValueKind::IntArray(values) => ValueKind::IntArray(values.clone()),
            RawValueKind::FloatArray(values) => ValueKind::FloatArray(values.clone()),
            RawValueKind::Aggregate(values) => ValueKind::Aggregate(
                values
                    .iter()
                    .map(|value| self.lower_value(value, location))
                    .collect::<IrResult<Vec<_>>>()?,
            ),
            RawValueKind::ZeroInitializer => ValueKind::ZeroInitializer,
            RawValueKind::Null => ValueKind::Null,
            RawValueKind::Bytes(bytes) => ValueKind::Bytes(bytes.clone()),
            RawValueKind::BlockAddress { function, block } => ValueKind::BlockAddress {
                function: function.clone(),
                block: block.clone(),
            },
            RawValueKind::Expr(record) => {
                ValueKind::Expr(Box::new(self.decode_record(record, location, Some(ty))?))
            }
        };
        Ok(Value::new(kind, ty))
    }

    /// Decode a record whose produced value has type `ty`. Constant expressions have no result,
    /// so their type comes from the value wrapping them.
    fn decode_record(
        &self,
        record: &RawInstruction,
        location: &DecodeLocation,
        ty: Option<&'ir Type<'ir>>,
    ) -> IrResult<Instruction<'ir>> {
        let decoder = RecordDecoder {
            arena: self.arena,
            record,
            location,
            attributes: AttributeMap::decode(self.arena, &record.attributes),
        };
        let opcode = decoder.opcode()?;
        let result = match &record.result {
            Some(result) => Some(self.lower_value(result, location)?),
            None => None,
        };
        let operands = record
            .operands
            .iter()
            .map(|operand| self.lower_value(operand, location))
            .collect::<IrResult<Vec<_>>>()?;
        let ty = ty.unwrap_or_else(|| self.arena.get_void_ty());
        let kind = decoder.decode_kind(self, opcode, operands, ty)?;
        log::trace!("decoded {} at {}", opcode, location);
        Ok(Instruction {
            opcode,
            result,
            kind,
            span: record.span,
        })
    }
}

/// Decoding state of a single record.
struct RecordDecoder<'d, 'ir> {
    arena: &'d IrArena<'ir>,
    record: &'d RawInstruction,
    location: &'d DecodeLocation,
    attributes: AttributeMap<'ir>,
}

impl<'d, 'ir> RecordDecoder<'d, 'ir> {
    fn opcode(&self) -> IrResult<Opcode> {
        let opcode = Opcode::from_code(self.record.opcode)
            .filter(|opcode| opcode.keyword() == self.record.opcode_name);
        match opcode {
            Some(Opcode::UserOp1 | Opcode::UserOp2) => {
                Err(IrError::from(UnsupportedOpcodeError {
                    name: self.record.opcode_name.clone(),
                    location: self.location.clone(),
                    span: self.record.span,
                }))
            }
            Some(opcode) => Ok(opcode),
            None => Err(IrError::from(MalformedOpcodeError {
                opcode: self.record.opcode,
                name: self.record.opcode_name.clone(),
                location: self.location.clone(),
                span: self.record.span,
            })),
        }
    }

    fn decode_kind(
        &self,
        decoder: &InstructionDecoder<'_, 'ir>,
        opcode: Opcode,
        mut operands: Vec<Value<'ir>>,
        ty: &'ir Type<'ir>,
    ) -> IrResult<InstructionKind<'ir>> {
        if !carries_additional_data(opcode) && self.record.additional != AdditionalData::None {
            return Err(self.unexpected_additional_data());
        }
        let kind = match opcode {
            Opcode::Ret => match operands.len() {
                0 => InstructionKind::Ret { value: None },
                1 => InstructionKind::Ret {
                    value: operands.pop(),
                },
                found => return Err(self.arity_error("0 or 1", found)),
            },
            Opcode::Br => match operands.len() {
                1 => {
                    let [label] = self.exactly::<1>(operands)?;
                    InstructionKind::Br {
                        condition: None,
                        label_false: label,
                        label_true: None,
                    }
                }
                3 => {
                    let [condition, label_false, label_true] = self.exactly::<3>(operands)?;
                    InstructionKind::Br {
                        condition: Some(condition),
                        label_false,
                        label_true: Some(label_true),
                    }
                }
                found => return Err(self.arity_error("1 or 3", found)),
            },
            Opcode::Switch => {
                if operands.len() < 2 || operands.len() % 2 != 0 {
                    return Err(self.arity_error("an even number of, and at least 2,", operands.len()));
                }
                let mut operands = operands.into_iter();
                let (value, default) = match (operands.next(), operands.next()) {
                    (Some(value), Some(default)) => (value, default),
                    _ => llir_diagnostics::ice!("switch operand count was checked"),
                };
                InstructionKind::Switch {
                    value,
                    default,
                    cases: pairs(operands),
                }
            }
            Opcode::IndirectBr => {
                self.at_least(&operands, 1)?;
                let address = operands.remove(0);
                InstructionKind::IndirectBr {
                    address,
                    destinations: operands,
                }
            }
            Opcode::Invoke => {
                let call = match &self.record.additional {
                    AdditionalData::Call {
                        calling_convention,
                        attributes,
                    } => self.call_metadata(*calling_convention, attributes)?,
                    _ => return Err(self.unexpected_additional_data()),
                };
                self.at_least(&operands, 3)?;
                let (callee, label_unwind, label_normal) = pop3(&mut operands);
                InstructionKind::Invoke {
                    call,
                    callee,
                    arguments: operands,
                    label_normal,
                    label_unwind,
                }
            }
            Opcode::Resume => {
                let [value] = self.exactly::<1>(operands)?;
                InstructionKind::Resume { value }
            }
            Opcode::Unreachable => {
                let [] = self.exactly::<0>(operands)?;
                InstructionKind::Unreachable
            }
            Opcode::CleanupRet => match operands.len() {
                1 | 2 => {
                    let cleanup_pad = operands.remove(0);
                    InstructionKind::CleanupRet {
                        cleanup_pad,
                        unwind: operands.pop(),
                    }
                }
                found => return Err(self.arity_error("1 or 2", found)),
            },
            Opcode::CatchRet => {
                let [catch_pad, successor] = self.exactly::<2>(operands)?;
                InstructionKind::CatchRet {
                    catch_pad,
                    successor,
                }
            }
            Opcode::CatchSwitch => {
                let has_unwind_destination = match &self.record.additional {
                    AdditionalData::CatchSwitch {
                        has_unwind_destination,
                    } => *has_unwind_destination,
                    _ => return Err(self.unexpected_additional_data()),
                };
                self.at_least(&operands, 1 + has_unwind_destination as usize)?;
                let parent_pad = operands.remove(0);
                let unwind = match has_unwind_destination {
                    true => Some(operands.remove(0)),
                    false => None,
                };
                InstructionKind::CatchSwitch {
                    parent_pad,
                    unwind,
                    handlers: operands,
                }
            }
            Opcode::CallBr => {
                let (call, indirect_destinations) = match &self.record.additional {
                    AdditionalData::CallBr {
                        calling_convention,
                        attributes,
                        indirect_destinations,
                    } => (
                        self.call_metadata(*calling_convention, attributes)?,
                        *indirect_destinations,
                    ),
                    _ => return Err(self.unexpected_additional_data()),
                };
                self.at_least(&operands, indirect_destinations + 2)?;
                let callee = pop(&mut operands);
                let indirect = operands.split_off(operands.len() - indirect_destinations);
                let fallthrough = pop(&mut operands);
                InstructionKind::CallBr {
                    call,
                    callee,
                    arguments: operands,
                    fallthrough,
                    indirect,
                }
            }
            Opcode::FNeg => {
                let [operand] = self.exactly::<1>(operands)?;
                InstructionKind::UnaryOp {
                    operand,
                    flags: self.arithmetic_flags()?,
                }
            }
            Opcode::Add
            | Opcode::FAdd
            | Opcode::Sub
            | Opcode::FSub
            | Opcode::Mul
            | Opcode::FMul
            | Opcode::UDiv
            | Opcode::SDiv
            | Opcode::FDiv
            | Opcode::URem
            | Opcode::SRem
            | Opcode::FRem
            | Opcode::Shl
            | Opcode::LShr
            | Opcode::AShr
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor => {
                let [lhs, rhs] = self.exactly::<2>(operands)?;
                InstructionKind::BinOp {
                    lhs,
                    rhs,
                    flags: self.arithmetic_flags()?,
                }
            }
            Opcode::Alloca => {
                let allocated_type = match &self.record.additional {
                    AdditionalData::AllocatedType(ty) => self.arena.lower_type(ty),
                    _ => return Err(self.unexpected_additional_data()),
                };
                let [num_elements] = self.exactly::<1>(operands)?;
                InstructionKind::Alloca {
                    allocated_type,
                    num_elements,
                    align: self.align()?,
                    is_inalloca: self.attributes.contains("inalloca"),
                }
            }
            Opcode::Load => {
                let [address] = self.exactly::<1>(operands)?;
                InstructionKind::Load {
                    address,
                    access: self.memory_access()?,
                }
            }
            Opcode::Store => {
                let [value, address] = self.exactly::<2>(operands)?;
                InstructionKind::Store {
                    value,
                    address,
                    access: self.memory_access()?,
                }
            }
            Opcode::GetElementPtr => {
                let (result_element_type, source_element_type) = match &self.record.additional {
                    AdditionalData::ElementTypes { result, source } => {
                        (self.arena.lower_type(result), self.arena.lower_type(source))
                    }
                    _ => return Err(self.unexpected_additional_data()),
                };
                self.at_least(&operands, 1)?;
                let base = operands.remove(0);
                InstructionKind::GetElementPtr {
                    base,
                    indices: operands,
                    source_element_type,
                    result_element_type,
                    flags: self.gep_flags()?,
                }
            }
            Opcode::Fence => {
                let [] = self.exactly::<0>(operands)?;
                InstructionKind::Fence {
                    ordering: self.ordering()?,
                    sync_scope: self.sync_scope()?,
                }
            }
            Opcode::AtomicCmpXchg => {
                let (success, failure) = match &self.record.additional {
                    AdditionalData::CmpXchgOrderings { success, failure } => (*success, *failure),
                    _ => return Err(self.unexpected_additional_data()),
                };
                let [address, expected, replacement] = self.exactly::<3>(operands)?;
                InstructionKind::CmpXchg {
                    address,
                    expected,
                    replacement,
                    success_ordering: self.ordering_code(success as i64)?,
                    failure_ordering: self.ordering_code(failure as i64)?,
                    sync_scope: self.sync_scope()?,
                    align: self.align()?,
                    is_volatile: self.attributes.contains("volatile"),
                    is_weak: self.attributes.contains("weak"),
                }
            }
            Opcode::AtomicRmw => {
                let operation = match &self.record.additional {
                    AdditionalData::AtomicOperation(operation) => {
                        match AtomicRmwOperation::from_keyword(operation) {
                            Some(operation) => operation,
                            None => return Err(self.unknown_code("atomicrmw operation", operation)),
                        }
                    }
                    _ => return Err(self.unexpected_additional_data()),
                };
                let [address, value] = self.exactly::<2>(operands)?;
                InstructionKind::AtomicRmw {
                    operation,
                    address,
                    value,
                    access: MemoryAccess {
                        is_atomic: true,
                        ..self.memory_access()?
                    },
                }
            }
            Opcode::Trunc
            | Opcode::ZExt
            | Opcode::SExt
            | Opcode::FPToUI
            | Opcode::FPToSI
            | Opcode::UIToFP
            | Opcode::SIToFP
            | Opcode::FPTrunc
            | Opcode::FPExt
            | Opcode::PtrToInt
            | Opcode::IntToPtr
            | Opcode::BitCast
            | Opcode::AddrSpaceCast => {
                let [value] = self.exactly::<1>(operands)?;
                InstructionKind::Conversion {
                    value,
                    ty,
                    flags: self.arithmetic_flags()?,
                }
            }
            Opcode::CleanupPad => {
                self.at_least(&operands, 1)?;
                let parent_pad = pop(&mut operands);
                InstructionKind::CleanupPad {
                    parent_pad,
                    arguments: operands,
                }
            }
            Opcode::CatchPad => {
                self.at_least(&operands, 1)?;
                let catch_switch = pop(&mut operands);
                InstructionKind::CatchPad {
                    catch_switch,
                    arguments: operands,
                }
            }
            Opcode::ICmp => {
                let predicate = self.predicate(ICmpPredicate::from_keyword)?;
                let [lhs, rhs] = self.exactly::<2>(operands)?;
                InstructionKind::ICmp {
                    predicate,
                    lhs,
                    rhs,
                    same_sign: self.attributes.contains("samesign"),
                }
            }
            Opcode::FCmp => {
                let predicate = self.predicate(FCmpPredicate::from_keyword)?;
                let [lhs, rhs] = self.exactly::<2>(operands)?;
                InstructionKind::FCmp {
                    predicate,
                    lhs,
                    rhs,
                    fast_math: self.fast_math()?,
                }
            }
            Opcode::Phi => {
                let blocks = match &self.record.additional {
                    AdditionalData::IncomingBlocks(blocks) => blocks,
                    _ => return Err(self.unexpected_additional_data()),
                };
                if operands.len() != blocks.len() {
                    return Err(self.arity_error(&blocks.len().to_string(), operands.len()));
                }
                let blocks = blocks
                    .iter()
                    .map(|block| decoder.lower_value(block, self.location))
                    .collect::<IrResult<Vec<_>>>()?;
                InstructionKind::Phi {
                    incoming: operands.into_iter().zip(blocks).collect(),
                    fast_math: self.fast_math()?,
                }
            }
            Opcode::Call => {
                let call = match &self.record.additional {
                    AdditionalData::Call {
                        calling_convention,
                        attributes,
                    } => self.call_metadata(*calling_convention, attributes)?,
                    _ => return Err(self.unexpected_additional_data()),
                };
                self.at_least(&operands, 1)?;
                let callee = pop(&mut operands);
                InstructionKind::Call {
                    call,
                    callee,
                    arguments: operands,
                    tail_kind: self.tail_kind()?,
                    fast_math: self.fast_math()?,
                }
            }
            Opcode::Select => {
                let [condition, if_true, if_false] = self.exactly::<3>(operands)?;
                InstructionKind::Select {
                    condition,
                    if_true,
                    if_false,
                    fast_math: self.fast_math()?,
                }
            }
            Opcode::UserOp1 | Opcode::UserOp2 => {
                llir_diagnostics::ice!("reserved opcodes are rejected before decoding")
            }
            Opcode::VaArg => {
                let [list] = self.exactly::<1>(operands)?;
                InstructionKind::VaArg { list, ty }
            }
            Opcode::ExtractElement => {
                let [vector, index] = self.exactly::<2>(operands)?;
                InstructionKind::ExtractElement { vector, index }
            }
            Opcode::InsertElement => {
                let [vector, element, index] = self.exactly::<3>(operands)?;
                InstructionKind::InsertElement {
                    vector,
                    element,
                    index,
                }
            }
            Opcode::ShuffleVector => {
                let mask = match &self.record.additional {
                    AdditionalData::ShuffleMask(mask) => mask.clone(),
                    _ => return Err(self.unexpected_additional_data()),
                };
                let [lhs, rhs] = self.exactly::<2>(operands)?;
                InstructionKind::ShuffleVector { lhs, rhs, mask }
            }
            Opcode::ExtractValue => {
                let indices = self.indices()?;
                let [aggregate] = self.exactly::<1>(operands)?;
                InstructionKind::ExtractValue { aggregate, indices }
            }
            Opcode::InsertValue => {
                let indices = self.indices()?;
                let [aggregate, element] = self.exactly::<2>(operands)?;
                InstructionKind::InsertValue {
                    aggregate,
                    element,
                    indices,
                }
            }
            Opcode::LandingPad => {
                let (is_cleanup, is_catch) = match &self.record.additional {
                    AdditionalData::LandingPad {
                        is_cleanup,
                        is_catch,
                    } => (*is_cleanup, is_catch),
                    _ => return Err(self.unexpected_additional_data()),
                };
                if operands.len() != is_catch.len() {
                    return Err(self.arity_error(&is_catch.len().to_string(), operands.len()));
                }
                InstructionKind::LandingPad {
                    is_cleanup,
                    clauses: is_catch.iter().copied().zip(operands).collect(),
                }
            }
            Opcode::Freeze => {
                let [value] = self.exactly::<1>(operands)?;
                InstructionKind::Freeze { value }
            }
        };
        Ok(kind)
    }

    fn exactly<const N: usize>(&self, operands: Vec<Value<'ir>>) -> IrResult<[Value<'ir>; N]> {
        operands
            .try_into()
            .map_err(|operands: Vec<Value<'ir>>| self.arity_error(&N.to_string(), operands.len()))
    }

    fn at_least(&self, operands: &[Value<'ir>], n: usize) -> IrResult<()> {
        match operands.len() >= n {
            true => Ok(()),
            false => Err(self.arity_error(&format!("at least {}", n), operands.len())),
        }
    }

    fn call_metadata(
        &self,
        calling_convention: u32,
        attributes: &[Vec<RawAttribute>],
    ) -> IrResult<CallMetadata<'ir>> {
        let calling_convention = match CallingConv::from_code(calling_convention) {
            Some(calling_convention) => calling_convention,
            None => {
                return Err(self.unknown_code("calling convention", &calling_convention.to_string()))
            }
        };
        Ok(CallMetadata {
            calling_convention,
            attributes: AttributeMap::decode_layers(self.arena, attributes),
        })
    }

    fn arithmetic_flags(&self) -> IrResult<ArithmeticFlags> {
        Ok(ArithmeticFlags {
            nuw: self.attributes.contains("nuw"),
            nsw: self.attributes.contains("nsw"),
            exact: self.attributes.contains("exact"),
            disjoint: self.attributes.contains("disjoint"),
            nneg: self.attributes.contains("nneg"),
            fast_math: self.fast_math()?,
        })
    }

    fn fast_math(&self) -> IrResult<Vec<FastMathFlag>> {
        let flags = match self.attributes.get("fmf") {
            None => return Ok(vec![]),
            Some(AttributeValue::Single(AttributePayload::Strings(flags))) => flags,
            Some(_) => return Err(self.invalid_payload("fmf", "a list of fast-math flags")),
        };
        flags
            .iter()
            .map(|flag| match FastMathFlag::from_keyword(flag) {
                Some(flag) => Ok(flag),
                None => Err(self.unknown_code("fast-math flag", flag)),
            })
            .collect()
    }

    fn int_attribute(&self, name: &str) -> IrResult<Option<i64>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(AttributeValue::Single(AttributePayload::Int(value))) => Ok(Some(*value)),
            Some(_) => Err(self.invalid_payload(name, "an integer")),
        }
    }

    fn align(&self) -> IrResult<u64> {
        match self.int_attribute("align")? {
            None => Ok(0),
            Some(align) => u64::try_from(align).map_err(|_| self.invalid_payload("align", "a positive integer")),
        }
    }

    fn ordering(&self) -> IrResult<Ordering> {
        match self.int_attribute("ordering")? {
            None => Ok(Ordering::NotAtomic),
            Some(code) => self.ordering_code(code),
        }
    }

    fn ordering_code(&self, code: i64) -> IrResult<Ordering> {
        u32::try_from(code)
            .ok()
            .and_then(Ordering::from_code)
            .ok_or_else(|| self.unknown_code("ordering", &code.to_string()))
    }

    fn sync_scope(&self) -> IrResult<SyncScope> {
        match self.attributes.get("syncscope") {
            None => Ok(SyncScope::System),
            Some(AttributeValue::Single(AttributePayload::Int(code))) => SyncScope::from_code(*code)
                .ok_or_else(|| self.unknown_code("sync scope", &code.to_string())),
            Some(AttributeValue::Single(AttributePayload::Str(name))) => {
                Ok(SyncScope::Named(name.clone()))
            }
            Some(_) => Err(self.invalid_payload("syncscope", "a scope code or name")),
        }
    }

    fn memory_access(&self) -> IrResult<MemoryAccess> {
        Ok(MemoryAccess {
            align: self.align()?,
            is_volatile: self.attributes.contains("volatile"),
            is_atomic: self.attributes.contains("atomic"),
            ordering: self.ordering()?,
            sync_scope: self.sync_scope()?,
        })
    }

    fn gep_flags(&self) -> IrResult<GepFlags> {
        let inrange = match self.attributes.get("inrange") {
            None => None,
            Some(_) => match self.attributes.ints("inrange").as_deref() {
                Some([start, end]) => Some((*start, *end)),
                _ => return Err(self.invalid_payload("inrange", "a start and an end offset")),
            },
        };
        Ok(GepFlags {
            inbounds: self.attributes.contains("inbounds"),
            nusw: self.attributes.contains("nusw"),
            nuw: self.attributes.contains("nuw"),
            inrange,
        })
    }

    fn tail_kind(&self) -> IrResult<TailCallKind> {
        match self.attributes.get("tailkind") {
            None | Some(AttributeValue::Single(AttributePayload::None)) => Ok(TailCallKind::None),
            Some(AttributeValue::Single(AttributePayload::Str(kind))) => {
                TailCallKind::from_keyword(kind).ok_or_else(|| self.unknown_code("tail call kind", kind))
            }
            Some(_) => Err(self.invalid_payload("tailkind", "a tail call marker")),
        }
    }

    fn predicate<T>(&self, from_keyword: fn(&str) -> Option<T>) -> IrResult<T> {
        match &self.record.additional {
            AdditionalData::Predicate(predicate) => {
                from_keyword(predicate).ok_or_else(|| self.unknown_code("predicate", predicate))
            }
            _ => Err(self.unexpected_additional_data()),
        }
    }

    fn indices(&self) -> IrResult<Vec<u32>> {
        match &self.record.additional {
            AdditionalData::Indices(indices) => Ok(indices.clone()),
            _ => Err(self.unexpected_additional_data()),
        }
    }

    fn arity_error(&self, expected: &str, found: usize) -> IrError {
        IrError::from(OperandArityError {
            opcode: self.record.opcode_name.clone(),
            expected: expected.to_owned(),
            found,
            location: self.location.clone(),
            span: self.record.span,
        })
    }

    fn unexpected_additional_data(&self) -> IrError {
        IrError::from(UnexpectedAdditionalDataError {
            opcode: self.record.opcode_name.clone(),
            found: additional_data_name(&self.record.additional).to_owned(),
            location: self.location.clone(),
            span: self.record.span,
        })
    }

    fn unknown_code(&self, field: &'static str, code: &str) -> IrError {
        IrError::from(UnknownEnumCodeError {
            opcode: self.record.opcode_name.clone(),
            field,
            code: code.to_owned(),
            location: self.location.clone(),
            span: self.record.span,
        })
    }

    fn invalid_payload(&self, attribute: &str, expected: &'static str) -> IrError {
        IrError::from(InvalidAttributePayloadError {
            opcode: self.record.opcode_name.clone(),
            attribute: attribute.to_owned(),
            location: self.location.clone(),
            span: self.record.span,
            expected,
        })
    }
}

fn carries_additional_data(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::Invoke
            | Opcode::CatchSwitch
            | Opcode::CallBr
            | Opcode::Alloca
            | Opcode::GetElementPtr
            | Opcode::AtomicCmpXchg
            | Opcode::AtomicRmw
            | Opcode::ICmp
            | Opcode::FCmp
            | Opcode::Phi
            | Opcode::Call
            | Opcode::ShuffleVector
            | Opcode::ExtractValue
            | Opcode::InsertValue
            | Opcode::LandingPad
    )
}

fn additional_data_name(additional: &AdditionalData) -> &'static str {
    match additional {
        AdditionalData::None => "no",
        AdditionalData::Call { .. } => "call",
        AdditionalData::CallBr { .. } => "callbr",
        AdditionalData::CatchSwitch { .. } => "catchswitch",
        AdditionalData::Indices(_) => "index",
        AdditionalData::AllocatedType(_) => "allocated type",
        AdditionalData::ElementTypes { .. } => "element type",
        AdditionalData::Predicate(_) => "predicate",
        AdditionalData::IncomingBlocks(_) => "incoming block",
        AdditionalData::LandingPad { .. } => "landingpad",
        AdditionalData::AtomicOperation(_) => "atomic operation",
        AdditionalData::ShuffleMask(_) => "shuffle mask",
        AdditionalData::CmpXchgOrderings { .. } => "ordering",
    }
}

/// Pair up consecutive values. The caller checks that the count is even.
fn pairs<'ir>(values: impl IntoIterator<Item = Value<'ir>>) -> Vec<(Value<'ir>, Value<'ir>)> {
    let mut values = values.into_iter();
    let mut pairs = Vec::new();
    while let (Some(first), Some(second)) = (values.next(), values.next()) {
        pairs.push((first, second));
    }
    pairs
}

fn pop<'ir>(operands: &mut Vec<Value<'ir>>) -> Value<'ir> {
    operands
        .pop()
        .unwrap_or_else(|| llir_diagnostics::ice!("operand count was checked before popping"))
}

fn pop3<'ir>(operands: &mut Vec<Value<'ir>>) -> (Value<'ir>, Value<'ir>, Value<'ir>) {
    let first = pop(operands);
    let second = pop(operands);
    let third = pop(operands);
    (first, second, third)
}
