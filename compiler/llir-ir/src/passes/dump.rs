//! Structural dump of IR modules.
//!
//! Every instruction prints in constructor notation: the variant name, the opcode, the result, and
//! then the fields of the variant, for example
//! `BinOp('add', Value('%3', i32), Value('%1', i32), Value('%2', i32))`. Flags only appear when they
//! differ from their default, as `name=value`.
//!
//! Blocks, functions and modules are separated with hard line breaks, so the output does not
//! depend on the render width. The output is meant for snapshot tests and for humans, and holds no
//! compatibility guarantees.

use crate::attribute::AttributeMap;
use crate::codes::{CallingConv, FastMathFlag, Ordering, SyncScope, TailCallKind};
use crate::instruction::{
    ArithmeticFlags, CallMetadata, GepFlags, Instruction, InstructionKind, MemoryAccess,
};
use crate::module::{Block, Function, GlobalVariable, Module};
use crate::ty::Type;
use crate::value::{Value, ValueKind};
use llir_diagnostics::ice;
use pretty::RcDoc;

pub struct IrDumpPass();

impl IrDumpPass {
    pub fn format_module_to_string(module: &Module<'_>) -> String {
        Self::render(Self::format_module(module))
    }

    pub fn format_function_to_string(function: &Function<'_>) -> String {
        Self::render(Self::format_function(function))
    }

    pub fn format_instruction_to_string(instruction: &Instruction<'_>) -> String {
        Self::render(Self::format_instruction(instruction))
    }

    fn render(doc: RcDoc<'_, ()>) -> String {
        let mut w = Vec::new();
        doc.render(80, &mut w)
            .unwrap_or_else(|_| ice!("failed to render ir dump"));
        String::from_utf8(w).unwrap_or_else(|_| ice!("ir dump is not valid utf-8"))
    }

    pub fn format_module<'a>(module: &'a Module<'_>) -> RcDoc<'a, ()> {
        let globals = module.global_variables().map(Self::format_global_variable);
        let functions = module.functions().map(Self::format_function);
        let items = globals.chain(functions).collect::<Vec<_>>();
        let body = match items.is_empty() {
            true => RcDoc::nil(),
            false => RcDoc::hardline()
                .append(RcDoc::intersperse(items, RcDoc::hardline()))
                .nest(2)
                .append(RcDoc::hardline()),
        };
        RcDoc::text("module")
            .append(RcDoc::space())
            .append(RcDoc::text("{"))
            .append(body)
            .append(RcDoc::text("}"))
    }

    pub fn format_global_variable<'a>(global: &'a GlobalVariable<'_>) -> RcDoc<'a, ()> {
        let keyword = match global.is_constant {
            true => "constant",
            false => "global",
        };
        let head = RcDoc::text(keyword)
            .append(RcDoc::space())
            .append(RcDoc::text(format!("@{}", global.name)))
            .append(RcDoc::text(format!(": {}", global.value.ty)));
        match &global.initializer {
            Some(initializer) => head
                .append(RcDoc::text(" = "))
                .append(Self::format_value(initializer)),
            None => head,
        }
    }

    pub fn format_function<'a>(function: &'a Function<'_>) -> RcDoc<'a, ()> {
        let keyword = match function.is_declaration() {
            true => "declare",
            false => "define",
        };
        let mut arguments = function
            .arguments
            .iter()
            .map(Self::format_value)
            .collect::<Vec<_>>();
        if function.is_vararg {
            arguments.push(RcDoc::text("..."));
        }
        let mut head = RcDoc::text(keyword)
            .append(RcDoc::space())
            .append(RcDoc::text(format!("@{}", function.name)))
            .append(Self::parenthesized(arguments));
        if let Some(ret) = function.return_type() {
            head = head.append(RcDoc::text(format!(" -> {}", ret)));
        }
        if function.calling_convention != CallingConv::C {
            head = head.append(RcDoc::text(format!(" cc={}", function.calling_convention)));
        }
        if function.is_declaration() {
            return head;
        }
        head.append(RcDoc::space())
            .append(RcDoc::text("{"))
            .append(
                RcDoc::hardline()
                    .append(RcDoc::intersperse(
                        function
                            .blocks()
                            .map(|block| Self::format_block(function, block)),
                        RcDoc::hardline(),
                    ))
                    .nest(2),
            )
            .append(RcDoc::hardline())
            .append(RcDoc::text("}"))
    }

    pub fn format_block<'a>(function: &'a Function<'_>, block: &'a Block<'_>) -> RcDoc<'a, ()> {
        let predecessors = function
            .predecessors(block.id)
            .into_iter()
            .map(|predecessor| RcDoc::text(format!("'{}'", predecessor.name)))
            .collect::<Vec<_>>();
        RcDoc::text(format!("block '{}'", block.name))
            .append(RcDoc::text(" preds "))
            .append(Self::bracketed(predecessors))
            .append(RcDoc::text(" {"))
            .append(
                RcDoc::hardline()
                    .append(RcDoc::intersperse(
                        block.instructions.iter().map(Self::format_instruction),
                        RcDoc::hardline(),
                    ))
                    .nest(2),
            )
            .append(RcDoc::hardline())
            .append(RcDoc::text("}"))
    }

    pub fn format_instruction<'a>(instruction: &'a Instruction<'_>) -> RcDoc<'a, ()> {
        let mut fields = vec![
            RcDoc::text(format!("'{}'", instruction.opcode)),
            Self::format_optional_value(instruction.result.as_ref()),
        ];
        match &instruction.kind {
            InstructionKind::Ret { value } => {
                fields.push(Self::format_optional_value(value.as_ref()));
            }
            InstructionKind::Br {
                condition,
                label_false,
                label_true,
            } => {
                fields.push(Self::format_optional_value(condition.as_ref()));
                fields.push(Self::format_value(label_false));
                fields.push(Self::format_optional_value(label_true.as_ref()));
            }
            InstructionKind::Switch {
                value,
                default,
                cases,
            } => {
                fields.push(Self::format_value(value));
                fields.push(Self::format_value(default));
                fields.push(Self::format_pairs(cases));
            }
            InstructionKind::IndirectBr {
                address,
                destinations,
            } => {
                fields.push(Self::format_value(address));
                fields.push(Self::format_values(destinations));
            }
            InstructionKind::Invoke {
                call,
                callee,
                arguments,
                label_normal,
                label_unwind,
            } => {
                fields.push(Self::format_value(callee));
                fields.push(Self::format_values(arguments));
                fields.push(Self::format_value(label_normal));
                fields.push(Self::format_value(label_unwind));
                Self::push_call_metadata(&mut fields, call);
            }
            InstructionKind::Resume { value } => fields.push(Self::format_value(value)),
            InstructionKind::Unreachable => {}
            InstructionKind::CleanupRet {
                cleanup_pad,
                unwind,
            } => {
                fields.push(Self::format_value(cleanup_pad));
                fields.push(Self::format_optional_value(unwind.as_ref()));
            }
            InstructionKind::CatchRet {
                catch_pad,
                successor,
            } => {
                fields.push(Self::format_value(catch_pad));
                fields.push(Self::format_value(successor));
            }
            InstructionKind::CatchSwitch {
                parent_pad,
                unwind,
                handlers,
            } => {
                fields.push(Self::format_value(parent_pad));
                fields.push(Self::format_optional_value(unwind.as_ref()));
                fields.push(Self::format_values(handlers));
            }
            InstructionKind::CallBr {
                call,
                callee,
                arguments,
                fallthrough,
                indirect,
            } => {
                fields.push(Self::format_value(callee));
                fields.push(Self::format_values(arguments));
                fields.push(Self::format_value(fallthrough));
                fields.push(Self::format_values(indirect));
                Self::push_call_metadata(&mut fields, call);
            }
            InstructionKind::UnaryOp { operand, flags } => {
                fields.push(Self::format_value(operand));
                Self::push_arithmetic_flags(&mut fields, flags);
            }
            InstructionKind::BinOp { lhs, rhs, flags } => {
                fields.push(Self::format_value(lhs));
                fields.push(Self::format_value(rhs));
                Self::push_arithmetic_flags(&mut fields, flags);
            }
            InstructionKind::Alloca {
                allocated_type,
                num_elements,
                align,
                is_inalloca,
            } => {
                fields.push(Self::format_type(allocated_type));
                fields.push(Self::format_value(num_elements));
                Self::push_align(&mut fields, *align);
                Self::push_flag(&mut fields, "inalloca", *is_inalloca);
            }
            InstructionKind::Load { address, access } => {
                fields.push(Self::format_value(address));
                Self::push_memory_access(&mut fields, access);
            }
            InstructionKind::Store {
                value,
                address,
                access,
            } => {
                fields.push(Self::format_value(value));
                fields.push(Self::format_value(address));
                Self::push_memory_access(&mut fields, access);
            }
            InstructionKind::GetElementPtr {
                base,
                indices,
                source_element_type,
                result_element_type,
                flags,
            } => {
                fields.push(Self::format_type(source_element_type));
                fields.push(Self::format_value(base));
                fields.push(Self::format_values(indices));
                fields.push(Self::format_type(result_element_type));
                Self::push_gep_flags(&mut fields, flags);
            }
            InstructionKind::Fence {
                ordering,
                sync_scope,
            } => {
                fields.push(RcDoc::text(format!("'{}'", ordering)));
                Self::push_sync_scope(&mut fields, sync_scope);
            }
            InstructionKind::CmpXchg {
                address,
                expected,
                replacement,
                success_ordering,
                failure_ordering,
                sync_scope,
                align,
                is_volatile,
                is_weak,
            } => {
                fields.push(Self::format_value(address));
                fields.push(Self::format_value(expected));
                fields.push(Self::format_value(replacement));
                fields.push(RcDoc::text(format!("'{}'", success_ordering)));
                fields.push(RcDoc::text(format!("'{}'", failure_ordering)));
                Self::push_align(&mut fields, *align);
                Self::push_flag(&mut fields, "volatile", *is_volatile);
                Self::push_flag(&mut fields, "weak", *is_weak);
                Self::push_sync_scope(&mut fields, sync_scope);
            }
            InstructionKind::AtomicRmw {
                operation,
                address,
                value,
                access,
            } => {
                fields.push(RcDoc::text(format!("'{}'", operation)));
                fields.push(Self::format_value(address));
                fields.push(Self::format_value(value));
                Self::push_memory_access(&mut fields, access);
            }
            InstructionKind::Conversion { value, ty, flags } => {
                fields.push(Self::format_value(value));
                fields.push(Self::format_type(ty));
                Self::push_arithmetic_flags(&mut fields, flags);
            }
            InstructionKind::CleanupPad {
                parent_pad,
                arguments,
            } => {
                fields.push(Self::format_value(parent_pad));
                fields.push(Self::format_values(arguments));
            }
            InstructionKind::CatchPad {
                catch_switch,
                arguments,
            } => {
                fields.push(Self::format_value(catch_switch));
                fields.push(Self::format_values(arguments));
            }
            InstructionKind::ICmp {
                predicate,
                lhs,
                rhs,
                same_sign,
            } => {
                fields.push(RcDoc::text(format!("'{}'", predicate)));
                fields.push(Self::format_value(lhs));
                fields.push(Self::format_value(rhs));
                Self::push_flag(&mut fields, "samesign", *same_sign);
            }
            InstructionKind::FCmp {
                predicate,
                lhs,
                rhs,
                fast_math,
            } => {
                fields.push(RcDoc::text(format!("'{}'", predicate)));
                fields.push(Self::format_value(lhs));
                fields.push(Self::format_value(rhs));
                Self::push_fast_math(&mut fields, fast_math);
            }
            InstructionKind::Phi {
                incoming,
                fast_math,
            } => {
                fields.push(Self::format_pairs(incoming));
                Self::push_fast_math(&mut fields, fast_math);
            }
            InstructionKind::Call {
                call,
                callee,
                arguments,
                tail_kind,
                fast_math,
            } => {
                fields.push(Self::format_value(callee));
                fields.push(Self::format_values(arguments));
                if *tail_kind != TailCallKind::None {
                    fields.push(RcDoc::text(format!("tail='{}'", tail_kind)));
                }
                Self::push_fast_math(&mut fields, fast_math);
                Self::push_call_metadata(&mut fields, call);
            }
            InstructionKind::Select {
                condition,
                if_true,
                if_false,
                fast_math,
            } => {
                fields.push(Self::format_value(condition));
                fields.push(Self::format_value(if_true));
                fields.push(Self::format_value(if_false));
                Self::push_fast_math(&mut fields, fast_math);
            }
            InstructionKind::VaArg { list, ty } => {
                fields.push(Self::format_value(list));
                fields.push(Self::format_type(ty));
            }
            InstructionKind::ExtractElement { vector, index } => {
                fields.push(Self::format_value(vector));
                fields.push(Self::format_value(index));
            }
            InstructionKind::InsertElement {
                vector,
                element,
                index,
            } => {
                fields.push(Self::format_value(vector));
                fields.push(Self::format_value(element));
                fields.push(Self::format_value(index));
            }
            InstructionKind::ShuffleVector { lhs, rhs, mask } => {
                fields.push(Self::format_value(lhs));
                fields.push(Self::format_value(rhs));
                fields.push(RcDoc::text(format!("{:?}", mask)));
            }
            InstructionKind::ExtractValue { aggregate, indices } => {
                fields.push(Self::format_value(aggregate));
                fields.push(RcDoc::text(format!("{:?}", indices)));
            }
            InstructionKind::InsertValue {
                aggregate,
                element,
                indices,
            } => {
                fields.push(Self::format_value(aggregate));
                fields.push(Self::format_value(element));
                fields.push(RcDoc::text(format!("{:?}", indices)));
            }
            InstructionKind::LandingPad {
                is_cleanup,
                clauses,
            } => {
                let clauses = clauses
                    .iter()
                    .map(|(is_catch, value)| {
                        let kind = match is_catch {
                            true => "'catch'",
                            false => "'filter'",
                        };
                        Self::parenthesized(vec![RcDoc::text(kind), Self::format_value(value)])
                    })
                    .collect();
                fields.push(Self::bracketed(clauses));
                Self::push_flag(&mut fields, "cleanup", *is_cleanup);
            }
            InstructionKind::Freeze { value } => fields.push(Self::format_value(value)),
        }
        RcDoc::text(kind_name(&instruction.kind)).append(Self::parenthesized(fields))
    }

    pub fn format_value<'a>(value: &'a Value<'_>) -> RcDoc<'a, ()> {
        let inner = match &value.kind {
            ValueKind::Function { name, .. } => return RcDoc::text(format!("Function('{}')", name)),
            ValueKind::Expr(instruction) => Self::format_instruction(instruction),
            ValueKind::Aggregate(values) => Self::format_values(values),
            _ => RcDoc::text(value.to_string()),
        };
        RcDoc::text("Value(")
            .append(inner)
            .append(RcDoc::text(", "))
            .append(Self::format_type(value.ty))
            .append(RcDoc::text(")"))
    }

    fn format_optional_value<'a>(value: Option<&'a Value<'_>>) -> RcDoc<'a, ()> {
        match value {
            Some(value) => Self::format_value(value),
            None => RcDoc::text("None"),
        }
    }

    fn format_values<'a>(values: &'a [Value<'_>]) -> RcDoc<'a, ()> {
        Self::bracketed(values.iter().map(Self::format_value).collect())
    }

    fn format_pairs<'a>(pairs: &'a [(Value<'_>, Value<'_>)]) -> RcDoc<'a, ()> {
        Self::bracketed(
            pairs
                .iter()
                .map(|(first, second)| {
                    Self::parenthesized(vec![Self::format_value(first), Self::format_value(second)])
                })
                .collect(),
        )
    }

    fn format_type<'a>(ty: &Type<'_>) -> RcDoc<'a, ()> {
        RcDoc::text(ty.to_string())
    }

    fn parenthesized(items: Vec<RcDoc<'_, ()>>) -> RcDoc<'_, ()> {
        RcDoc::text("(")
            .append(RcDoc::intersperse(items, RcDoc::text(", ")))
            .append(RcDoc::text(")"))
    }

    fn bracketed(items: Vec<RcDoc<'_, ()>>) -> RcDoc<'_, ()> {
        RcDoc::text("[")
            .append(RcDoc::intersperse(items, RcDoc::text(", ")))
            .append(RcDoc::text("]"))
    }

    fn push_flag(fields: &mut Vec<RcDoc<'_, ()>>, name: &str, value: bool) {
        if value {
            fields.push(RcDoc::text(format!("{}=True", name)));
        }
    }

    fn push_align(fields: &mut Vec<RcDoc<'_, ()>>, align: u64) {
        if align != 0 {
            fields.push(RcDoc::text(format!("align={}", align)));
        }
    }

    fn push_fast_math(fields: &mut Vec<RcDoc<'_, ()>>, flags: &[FastMathFlag]) {
        if !flags.is_empty() {
            let flags = flags
                .iter()
                .map(|flag| format!("'{}'", flag))
                .collect::<Vec<_>>();
            fields.push(RcDoc::text(format!("fmf=[{}]", flags.join(", "))));
        }
    }

    fn push_sync_scope(fields: &mut Vec<RcDoc<'_, ()>>, sync_scope: &SyncScope) {
        if *sync_scope != SyncScope::System {
            fields.push(RcDoc::text(format!("syncscope='{}'", sync_scope)));
        }
    }

    fn push_arithmetic_flags(fields: &mut Vec<RcDoc<'_, ()>>, flags: &ArithmeticFlags) {
        Self::push_flag(fields, "nuw", flags.nuw);
        Self::push_flag(fields, "nsw", flags.nsw);
        Self::push_flag(fields, "exact", flags.exact);
        Self::push_flag(fields, "disjoint", flags.disjoint);
        Self::push_flag(fields, "nneg", flags.nneg);
        Self::push_fast_math(fields, &flags.fast_math);
    }

    fn push_memory_access(fields: &mut Vec<RcDoc<'_, ()>>, access: &MemoryAccess) {
        Self::push_align(fields, access.align);
        Self::push_flag(fields, "volatile", access.is_volatile);
        Self::push_flag(fields, "atomic", access.is_atomic);
        if access.ordering != Ordering::NotAtomic {
            fields.push(RcDoc::text(format!("ordering='{}'", access.ordering)));
        }
        Self::push_sync_scope(fields, &access.sync_scope);
    }

    fn push_gep_flags(fields: &mut Vec<RcDoc<'_, ()>>, flags: &GepFlags) {
        Self::push_flag(fields, "inbounds", flags.inbounds);
        Self::push_flag(fields, "nusw", flags.nusw);
        Self::push_flag(fields, "nuw", flags.nuw);
        if let Some((start, end)) = flags.inrange {
            fields.push(RcDoc::text(format!("inrange=({}, {})", start, end)));
        }
    }

    fn push_call_metadata(fields: &mut Vec<RcDoc<'_, ()>>, call: &CallMetadata<'_>) {
        if call.calling_convention != CallingConv::C {
            fields.push(RcDoc::text(format!("cc='{}'", call.calling_convention)));
        }
        if call.attributes.iter().any(|layer| !layer.is_empty()) {
            let layers = call
                .attributes
                .iter()
                .map(AttributeMap::to_string)
                .collect::<Vec<_>>();
            fields.push(RcDoc::text(format!("attributes=[{}]", layers.join(", "))));
        }
    }
}

fn kind_name(kind: &InstructionKind<'_>) -> &'static str {
    match kind {
        InstructionKind::Ret { .. } => "Ret",
        InstructionKind::Br { .. } => "Br",
        InstructionKind::Switch { .. } => "Switch",
        InstructionKind::IndirectBr { .. } => "IndirectBr",
        InstructionKind::Invoke { .. } => "Invoke",
        InstructionKind::Resume { .. } => "Resume",
        InstructionKind::Unreachable => "Unreachable",
        InstructionKind::CleanupRet { .. } => "CleanupRet",
        InstructionKind::CatchRet { .. } => "CatchRet",
        InstructionKind::CatchSwitch { .. } => "CatchSwitch",
        InstructionKind::CallBr { .. } => "CallBr",
        InstructionKind::UnaryOp { .. } => "UnaryOp",
        InstructionKind::BinOp { .. } => "BinOp",
        InstructionKind::Alloca { .. } => "Alloca",
        InstructionKind::Load { .. } => "Load",
        InstructionKind::Store { .. } => "Store",
        InstructionKind::GetElementPtr { .. } => "GetElementPtr",
        InstructionKind::Fence { .. } => "Fence",
        InstructionKind::CmpXchg { .. } => "CmpXchg",
        InstructionKind::AtomicRmw { .. } => "AtomicRmw",
        InstructionKind::Conversion { .. } => "Conversion",
        InstructionKind::CleanupPad { .. } => "CleanupPad",
        InstructionKind::CatchPad { .. } => "CatchPad",
        InstructionKind::ICmp { .. } => "ICmp",
        InstructionKind::FCmp { .. } => "FCmp",
        InstructionKind::Phi { .. } => "Phi",
        InstructionKind::Call { .. } => "Call",
        InstructionKind::Select { .. } => "Select",
        InstructionKind::VaArg { .. } => "VaArg",
        InstructionKind::ExtractElement { .. } => "ExtractElement",
        InstructionKind::InsertElement { .. } => "InsertElement",
        InstructionKind::ShuffleVector { .. } => "ShuffleVector",
        InstructionKind::ExtractValue { .. } => "ExtractValue",
        InstructionKind::InsertValue { .. } => "InsertValue",
        InstructionKind::LandingPad { .. } => "LandingPad",
        InstructionKind::Freeze { .. } => "Freeze",
    }
}
