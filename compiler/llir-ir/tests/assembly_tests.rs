//! End-to-end tests from textual assembly to a linked module.

use bumpalo::Bump;
use llir_ir::arena::IrArena;
use llir_ir::attribute::{AttributeLayers, AttributePayload, AttributeValue};
use llir_ir::codes::{AtomicRmwOperation, ICmpPredicate, Opcode, Ordering, SyncScope};
use llir_ir::error::{AssemblyError, IrError};
use llir_ir::instruction::InstructionKind;
use llir_ir::module::FunctionId;
use llir_ir::parse_assembly;
use llir_ir::passes::IrDumpPass;
use llir_ir::value::ValueKind;
use llir_macros::{assert_err, assert_matches, assert_none, assert_ok, assert_some};

const FACTORIAL: &str = r#"
source_filename = "factorial.c"
target triple = "x86_64-pc-linux-gnu"

define dso_local i32 @factorial_req(i32 noundef %0) #0 {
  %2 = alloca i32, align 4
  %3 = alloca i32, align 4
  store i32 %0, ptr %3, align 4
  %4 = load i32, ptr %3, align 4
  %5 = icmp eq i32 %4, 1
  br i1 %5, label %6, label %7

6:                                                ; preds = %1
  store i32 1, ptr %2, align 4
  br label %13

7:                                                ; preds = %1
  %8 = load i32, ptr %3, align 4
  %9 = load i32, ptr %3, align 4
  %10 = sub nsw i32 %9, 1
  %11 = call i32 @factorial_req(i32 noundef %10)
  %12 = mul nsw i32 %8, %11
  store i32 %12, ptr %2, align 4
  br label %13

13:                                               ; preds = %7, %6
  %14 = load i32, ptr %2, align 4
  ret i32 %14
}

attributes #0 = { noinline nounwind optnone uwtable "frame-pointer"="all" }
"#;

const MEMCPY: &str = r#"
define void @copy(ptr %dst, ptr %src) {
entry:
  call void @llvm.memcpy.p0.p0.i64(ptr %dst, ptr %src, i64 8, i1 false)
  ret void
}

declare void @llvm.memcpy.p0.p0.i64(ptr noalias nocapture writeonly, ptr noalias nocapture readonly, i64, i1 immarg)
"#;

#[test]
fn test_factorial_blocks_and_predecessors() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
    assert_eq!(module.source_filename.as_deref(), Some("factorial.c"));

    let function = assert_some!(module.get_function("factorial_req"));
    let names = function.blocks().map(|block| block.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["%1", "%6", "%7", "%13"]);

    let exit = assert_some!(function.get_block("%13"));
    let predecessors = function
        .predecessors(exit.id)
        .into_iter()
        .map(|block| block.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(predecessors, vec!["%7", "%6"]);
    assert!(std::ptr::eq(
        function.predecessors(exit.id)[1],
        assert_some!(function.get_block("%6"))
    ));
    assert!(assert_some!(function.entry_block()).predecessors.is_empty());
    assert_none!(function.get_block("%2"));
}

#[test]
fn test_factorial_conditional_branch() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
    let function = assert_some!(module.get_function("factorial_req"));
    let entry = assert_some!(function.entry_block());

    let br = entry.terminator();
    assert_eq!(br.opcode, Opcode::Br);
    assert_none!(&br.result);
    let (condition, label_false, label_true) = assert_matches!(
        &br.kind,
        InstructionKind::Br { condition: Some(condition), label_false, label_true: Some(label_true) } => (condition, label_false, label_true)
    );
    assert_eq!(condition.as_name(), Some("%5"));
    assert_eq!(label_false.as_name(), Some("%7"));
    assert_eq!(label_true.as_name(), Some("%6"));
    assert!(label_true.ty.is_label());
    assert_eq!(entry.successors(), vec!["%7", "%6"]);

    let icmp = &entry.instructions[4];
    let predicate = assert_matches!(&icmp.kind, InstructionKind::ICmp { predicate, .. } => predicate);
    assert_eq!(*predicate, ICmpPredicate::Eq);
}

#[test]
fn test_factorial_attributes() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
    let function = assert_some!(module.get_function("factorial_req"));

    let attributes = assert_some!(function.function_attributes());
    assert!(attributes.contains("noinline"));
    assert_eq!(
        attributes.get("frame-pointer"),
        Some(&AttributeValue::Single(AttributePayload::Str("all".to_owned())))
    );
    assert!(assert_some!(function.ret_attributes()).is_empty());
    assert!(assert_some!(function.argument_attributes(0)).contains("noundef"));
    assert_none!(function.argument_attributes(1));

    let recursive = assert_some!(function.get_block("%7"));
    let call = assert_some!(recursive.instructions[3].call_metadata());
    assert!(assert_some!(call.argument_attributes(0)).contains("noundef"));
}

#[test]
fn test_every_block_ends_with_its_only_terminator() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
    for function in module.functions() {
        for block in function.blocks() {
            let (last, rest) = assert_some!(block.instructions.split_last());
            assert!(last.is_terminator());
            assert!(rest.iter().all(|instruction| !instruction.is_terminator()));
        }
    }
}

#[test]
fn test_factorial_instruction_dumps() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
    let function = assert_some!(module.get_function("factorial_req"));
    let recursive = assert_some!(function.get_block("%7"));

    let sub = IrDumpPass::format_instruction_to_string(&recursive.instructions[2]);
    insta::assert_snapshot!(sub, @"BinOp('sub', Value('%10', i32), Value('%9', i32), Value(1, i32), nsw=True)");
    let mul = IrDumpPass::format_instruction_to_string(&recursive.instructions[4]);
    insta::assert_snapshot!(mul, @"BinOp('mul', Value('%12', i32), Value('%8', i32), Value('%11', i32), nsw=True)");
    let load = IrDumpPass::format_instruction_to_string(&recursive.instructions[0]);
    insta::assert_snapshot!(load, @"Load('load', Value('%8', i32), Value('%3', ptr), align=4)");
    let br = IrDumpPass::format_instruction_to_string(recursive.terminator());
    insta::assert_snapshot!(br, @"Br('br', None, None, Value('%13', label), None)");
}

#[test]
fn test_function_dump_is_deterministic() {
    let first = {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
        IrDumpPass::format_function_to_string(assert_some!(module.get_function("factorial_req")))
    };
    let second = {
        let bump = Bump::new();
        let arena = IrArena::new(&bump);
        let module = assert_ok!(parse_assembly(&arena, FACTORIAL));
        IrDumpPass::format_function_to_string(assert_some!(module.get_function("factorial_req")))
    };
    assert_eq!(first, second);
    assert!(first.starts_with("define @factorial_req(Value('%0', i32)) -> i32 {"));
    assert!(first.contains("  block '%13' preds ['%7', '%6'] {"));
}

#[test]
fn test_small_function_dump() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(
        &arena,
        r#"
define void @f() {
entry:
  ret void
}
"#
    ));
    let dump = IrDumpPass::format_module_to_string(&module);
    insta::assert_snapshot!(dump, @r"
    module {
      define @f() -> void {
        block 'entry' preds [] {
          Ret('ret', None, None)
        }
      }
    }
    ");
}

#[test]
fn test_intrinsic_call_is_linked() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(&arena, MEMCPY));
    let copy = assert_some!(module.get_function("copy"));
    let entry = assert_some!(copy.get_block("entry"));
    let (callee, arguments) = assert_matches!(
        &entry.instructions[0].kind,
        InstructionKind::Call { callee, arguments, .. } => (callee, arguments)
    );
    assert_eq!(
        callee.kind,
        ValueKind::Function {
            id: FunctionId(1),
            name: "llvm.memcpy.p0.p0.i64".to_owned(),
        }
    );
    assert_eq!(arguments.len(), 4);
    assert_eq!(arguments[3].as_int(), Some(0));
    assert!(entry.has_no_calls());

    let declaration = assert_some!(module.get_function("llvm.memcpy.p0.p0.i64"));
    assert!(declaration.is_declaration());
    assert_eq!(declaration.id, FunctionId(1));
}

#[test]
fn test_memory_and_aggregate_instructions() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(
        &arena,
        r#"
%struct.pair = type { i32, i64 }

define i64 @second(ptr %p) {
  %a = getelementptr inbounds %struct.pair, ptr %p, i32 0, i32 1
  %v = load atomic volatile i64, ptr %a syncscope("singlethread") acquire, align 8
  %old = atomicrmw add ptr %a, i64 1 seq_cst
  %pair = cmpxchg weak ptr %a, i64 %v, i64 0 acq_rel monotonic
  %ok = extractvalue { i64, i1 } %pair, 1
  fence release
  ret i64 %v
}
"#
    ));
    let function = assert_some!(module.get_function("second"));
    let instructions = &assert_some!(function.entry_block()).instructions;

    let (indices, flags) = assert_matches!(
        &instructions[0].kind,
        InstructionKind::GetElementPtr { indices, flags, .. } => (indices, flags)
    );
    assert_eq!(indices.len(), 2);
    assert!(flags.inbounds);

    let access = assert_matches!(&instructions[1].kind, InstructionKind::Load { access, .. } => access);
    assert!(access.is_atomic && access.is_volatile);
    assert_eq!(access.ordering, Ordering::Acquire);
    assert_eq!(access.sync_scope, SyncScope::SingleThread);

    let operation = assert_matches!(&instructions[2].kind, InstructionKind::AtomicRmw { operation, .. } => operation);
    assert_eq!(*operation, AtomicRmwOperation::Add);

    let (success, failure, is_weak) = assert_matches!(
        &instructions[3].kind,
        InstructionKind::CmpXchg { success_ordering, failure_ordering, is_weak, .. } => (success_ordering, failure_ordering, is_weak)
    );
    assert_eq!(*success, Ordering::AcquireRelease);
    assert_eq!(*failure, Ordering::Monotonic);
    assert!(*is_weak);

    let indices = assert_matches!(&instructions[4].kind, InstructionKind::ExtractValue { indices, .. } => indices);
    assert_eq!(indices, &vec![1]);

    let ordering = assert_matches!(&instructions[5].kind, InstructionKind::Fence { ordering, .. } => ordering);
    assert_eq!(*ordering, Ordering::Release);
}

#[test]
fn test_syntax_errors_are_reported() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let err = assert_err!(parse_assembly(&arena, "define i32 @f( {"));
    assert_matches!(err, AssemblyError::Syntax(_) => ());
}

#[test]
fn test_missing_terminator_is_reported() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let err = assert_err!(parse_assembly(
        &arena,
        r#"
define void @f() {
entry:
  fence seq_cst
}
"#
    ));
    let err = assert_matches!(err, AssemblyError::Ir(IrError::MissingTerminator(err)) => err);
    assert_eq!(err.block, "entry");
    assert_eq!(err.function, "f");
}

#[test]
fn test_indirect_branch_through_block_address() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(
        &arena,
        r#"
define void @jump() {
entry:
  indirectbr ptr blockaddress(@jump, %a), [label %a, label %b]

a:
  ret void

b:
  ret void
}
"#
    ));
    let function = assert_some!(module.get_function("jump"));
    let entry = assert_some!(function.get_block("entry"));
    let (address, destinations) = assert_matches!(
        &entry.terminator().kind,
        InstructionKind::IndirectBr { address, destinations } => (address, destinations)
    );
    assert_eq!(
        address.kind,
        ValueKind::BlockAddress {
            function: "jump".to_owned(),
            block: "a".to_owned(),
        }
    );
    assert_eq!(destinations.len(), 2);
    let b = assert_some!(function.get_block("b"));
    let predecessors = function
        .predecessors(b.id)
        .into_iter()
        .map(|block| block.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(predecessors, vec!["entry"]);

    let dump = IrDumpPass::format_instruction_to_string(entry.terminator());
    insta::assert_snapshot!(dump, @"IndirectBr('indirectbr', None, Value(('jump', 'a'), ptr), [Value('a', label), Value('b', label)])");
}

#[test]
fn test_block_address_of_unknown_function_is_a_syntax_error() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let err = assert_err!(parse_assembly(
        &arena,
        r#"
define void @jump() {
entry:
  indirectbr ptr blockaddress(@elsewhere, %a), [label %a]

a:
  ret void
}
"#
    ));
    assert_matches!(err, AssemblyError::Syntax(_) => ());
}

#[test]
fn test_wide_integer_constants_survive_decoding() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(
        &arena,
        r#"
define i128 @big() {
entry:
  %r = add i128 170141183460469231731687303715884105727, -170141183460469231731687303715884105728
  ret i128 %r
}
"#
    ));
    let function = assert_some!(module.get_function("big"));
    let entry = assert_some!(function.get_block("entry"));
    let (lhs, rhs) = assert_matches!(
        &entry.instructions[0].kind,
        InstructionKind::BinOp { lhs, rhs, .. } => (lhs, rhs)
    );
    assert_eq!(lhs.as_int(), Some(i128::MAX));
    assert_eq!(rhs.as_int(), Some(i128::MIN));
    let add = IrDumpPass::format_instruction_to_string(&entry.instructions[0]);
    insta::assert_snapshot!(add, @"BinOp('add', Value('r', i128), Value(170141183460469231731687303715884105727, i128), Value(-170141183460469231731687303715884105728, i128))");
}

#[test]
fn test_vararg_functions_are_dumped_with_ellipsis() {
    let bump = Bump::new();
    let arena = IrArena::new(&bump);
    let module = assert_ok!(parse_assembly(
        &arena,
        r#"
declare i32 @p(...)

declare i32 @q()

define void @v(i32 %n, ...) {
entry:
  ret void
}
"#
    ));
    let dump = IrDumpPass::format_module_to_string(&module);
    insta::assert_snapshot!(dump, @r"
    module {
      declare @p(...) -> i32
      declare @q() -> i32
      define @v(Value('n', i32), ...) -> void {
        block 'entry' preds [] {
          Ret('ret', None, None)
        }
      }
    }
    ");
}
