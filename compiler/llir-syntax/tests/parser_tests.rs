use llir_macros::{assert_matches, assert_ok, assert_some};
use llir_syntax::{
    parse_module, AdditionalData, RawAttribute, RawAttributeValue, RawModule, RawType, RawValue,
    RawValueKind,
};

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

fn parse(source: &str) -> RawModule {
    assert_ok!(parse_module(source))
}

fn i32_ty() -> RawType {
    RawType::Integer(32)
}

#[test]
fn test_factorial_blocks_and_predecessors() {
    let module = parse(FACTORIAL);
    assert_eq!(module.source_filename.as_deref(), Some("factorial.c"));
    let function = &module.functions[0];
    let names = function
        .blocks
        .iter()
        .map(|block| block.value.as_name().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["%1", "%6", "%7", "%13"]);
    assert_eq!(function.blocks[3].predecessors, vec!["%7", "%6"]);
    assert_eq!(function.blocks[1].predecessors, vec!["%1"]);
    assert!(function.blocks[0].predecessors.is_empty());
}

#[test]
fn test_factorial_conditional_branch_operand_order() {
    let module = parse(FACTORIAL);
    let br = assert_some!(module.functions[0].blocks[0].instructions.last());
    assert_eq!(br.opcode, 2);
    assert_eq!(br.opcode_name, "br");
    assert_eq!(
        br.operands,
        vec![
            RawValue::name("%5", RawType::Integer(1)),
            RawValue::label("%7"),
            RawValue::label("%6"),
        ]
    );
    assert!(br.result.is_none());
}

#[test]
fn test_factorial_function_record() {
    let module = parse(FACTORIAL);
    let function = &module.functions[0];
    assert_eq!(
        function.value,
        RawValue::name(
            "factorial_req",
            RawType::Function {
                parameters: vec![i32_ty()],
                ret: Box::new(i32_ty()),
                is_vararg: false,
            }
        )
    );
    assert_eq!(function.arguments, vec![RawValue::name("%0", i32_ty())]);
    assert_eq!(function.attributes.len(), 3);
    assert!(function.attributes[1].is_empty());
    assert_eq!(function.attributes[2], vec![RawAttribute::marker("noundef")]);
    assert!(function.attributes[0].contains(&RawAttribute::with_value(
        "frame-pointer",
        RawAttributeValue::Str("all".to_owned())
    )));
}

#[test]
fn test_factorial_instruction_records() {
    let module = parse(FACTORIAL);
    let entry = &module.functions[0].blocks[0];
    let alloca = &entry.instructions[0];
    assert_eq!(alloca.opcode_name, "alloca");
    assert_eq!(alloca.additional, AdditionalData::AllocatedType(i32_ty()));
    assert_eq!(
        alloca.result,
        Some(RawValue::name("%2", RawType::ptr()))
    );
    assert_eq!(
        alloca.operands,
        vec![RawValue::new(RawValueKind::Int(1), i32_ty())]
    );
    let load = &entry.instructions[3];
    assert_eq!(
        load.attributes,
        vec![
            RawAttribute::with_value("align", RawAttributeValue::Int(4)),
            RawAttribute::with_value("syncscope", RawAttributeValue::Int(1)),
            RawAttribute::with_value("ordering", RawAttributeValue::Int(0)),
        ]
    );
    let icmp = &entry.instructions[4];
    assert_eq!(icmp.additional, AdditionalData::Predicate("eq".to_owned()));
    assert_eq!(
        icmp.result,
        Some(RawValue::name("%5", RawType::Integer(1)))
    );

    let recursive = &module.functions[0].blocks[2];
    let sub = &recursive.instructions[2];
    assert_eq!(sub.attributes, vec![RawAttribute::marker("nsw")]);
    let call = &recursive.instructions[3];
    assert_eq!(call.opcode_name, "call");
    assert_eq!(
        call.operands.last().and_then(|v| v.as_name()),
        Some("factorial_req")
    );
    let layers = assert_matches!(
        &call.additional,
        AdditionalData::Call { calling_convention: 0, attributes } => attributes
    );
    assert_eq!(
        layers,
        &vec![vec![], vec![], vec![RawAttribute::marker("noundef")]]
    );
    assert_eq!(
        call.attributes,
        vec![
            RawAttribute::with_value("fmf", RawAttributeValue::Strings(vec![])),
            RawAttribute::with_value("tailkind", RawAttributeValue::None),
        ]
    );
}

#[test]
fn test_global_variables() {
    let module = parse(
        r#"
@.str = private unnamed_addr constant [6 x i8] c"hello\00", align 1
@counter = dso_local global i32 0, align 4
@ext = external global i32
@tls = thread_local(initialexec) global i32 7
@table = internal constant [2 x ptr] [ptr @counter, ptr null]
"#,
    );
    let globals = &module.global_variables;
    assert_eq!(globals.len(), 5);

    let string = &globals[0];
    assert!(string.is_constant);
    assert_eq!(string.global_object.linkage, 8);
    assert_eq!(string.global_object.unnamed_addr, 2);
    assert_eq!(string.global_object.align, 1);
    let initializer = assert_some!(&string.initializer);
    assert_eq!(
        initializer.kind,
        RawValueKind::Bytes(b"hello\0".to_vec())
    );

    let counter = &globals[1];
    assert_eq!(counter.value, RawValue::name("counter", i32_ty()));
    assert_eq!(
        counter.initializer,
        Some(RawValue::new(RawValueKind::Int(0), i32_ty()))
    );

    assert!(globals[2].initializer.is_none());
    assert_eq!(globals[3].global_object.thread_local, 3);

    let table = assert_some!(&globals[4].initializer);
    let elements = assert_matches!(&table.kind, RawValueKind::Aggregate(elements) => elements);
    assert_eq!(elements[0], RawValue::name("counter", i32_ty()));
    assert_eq!(elements[1].kind, RawValueKind::Null);
}

#[test]
fn test_intrinsic_call_names_the_declaration() {
    let module = parse(
        r#"
define void @copy(ptr %dst, ptr %src) {
entry:
  call void @llvm.memcpy.p0.p0.i64(ptr %dst, ptr %src, i64 8, i1 false)
  ret void
}

declare void @llvm.memcpy.p0.p0.i64(ptr noalias nocapture writeonly, ptr noalias nocapture readonly, i64, i1 immarg)
"#,
    );
    assert_eq!(module.functions.len(), 2);
    assert!(module.functions[1].blocks.is_empty());
    let call = &module.functions[0].blocks[0].instructions[0];
    assert!(call.result.is_none());
    let callee = assert_some!(call.operands.last());
    assert_eq!(callee.as_name(), Some("llvm.memcpy.p0.p0.i64"));
    assert_matches!(callee.ty, RawType::Function { .. } => ());
    assert_eq!(
        call.operands[3],
        RawValue::new(RawValueKind::Int(0), RawType::Integer(1))
    );
}

#[test]
fn test_switch_and_phi() {
    let module = parse(
        r#"
define i32 @pick(i32 %x) {
entry:
  switch i32 %x, label %other [
    i32 0, label %zero
    i32 1, label %one
  ]
zero:
  br label %done
one:
  br label %done
other:
  br label %done
done:
  %r = phi i32 [ 10, %zero ], [ 11, %one ], [ -1, %other ]
  ret i32 %r
}
"#,
    );
    let function = &module.functions[0];
    let switch = &function.blocks[0].instructions[0];
    assert_eq!(switch.operands.len(), 6);
    assert_eq!(switch.operands[1], RawValue::label("other"));
    assert_eq!(switch.operands[4], RawValue::new(RawValueKind::Int(1), i32_ty()));
    assert_eq!(function.blocks[4].predecessors, vec!["other", "one", "zero"]);
    assert_eq!(function.blocks[1].predecessors, vec!["entry"]);

    let phi = &function.blocks[4].instructions[0];
    assert_eq!(phi.operands[2], RawValue::new(RawValueKind::Int(-1), i32_ty()));
    let blocks = assert_matches!(&phi.additional, AdditionalData::IncomingBlocks(b) => b);
    assert_eq!(
        blocks,
        &vec![
            RawValue::label("zero"),
            RawValue::label("one"),
            RawValue::label("other")
        ]
    );
}

#[test]
fn test_memory_and_aggregate_instructions() {
    let module = parse(
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
"#,
    );
    let instructions = &module.functions[0].blocks[0].instructions;

    let gep = &instructions[0];
    assert_eq!(gep.attributes, vec![RawAttribute::marker("inbounds")]);
    let (result, source) = assert_matches!(
        &gep.additional,
        AdditionalData::ElementTypes { result, source } => (result, source)
    );
    assert_eq!(result, &RawType::Integer(64));
    assert_matches!(source, RawType::Structure { name: Some(name), .. } => assert_eq!(name, "struct.pair"));

    let load = &instructions[1];
    assert_eq!(
        load.attributes,
        vec![
            RawAttribute::marker("volatile"),
            RawAttribute::with_value("align", RawAttributeValue::Int(8)),
            RawAttribute::with_value("syncscope", RawAttributeValue::Int(0)),
            RawAttribute::with_value("ordering", RawAttributeValue::Int(4)),
            RawAttribute::marker("atomic"),
        ]
    );

    let rmw = &instructions[2];
    assert_eq!(rmw.additional, AdditionalData::AtomicOperation("add".to_owned()));

    let cmpxchg = &instructions[3];
    assert_eq!(
        cmpxchg.additional,
        AdditionalData::CmpXchgOrderings {
            success: 6,
            failure: 2
        }
    );
    assert!(cmpxchg.attributes.contains(&RawAttribute::marker("weak")));

    let extract = &instructions[4];
    assert_eq!(extract.additional, AdditionalData::Indices(vec![1]));
    assert_eq!(extract.result, Some(RawValue::name("ok", RawType::Integer(1))));

    let fence = &instructions[5];
    assert!(fence.result.is_none());
    assert_eq!(fence.opcode_name, "fence");
}
