//! Keyword to numeric code tables.
//!
//! Records carry enumerations as the integer codes LLVM uses internally, so the decoder on the IR
//! side can treat textual and numeric input the same way.

/// Instruction names indexed by opcode number. Index zero is unused.
pub const OPCODE_NAMES: [&str; 68] = [
    "<invalid>",
    "ret",
    "br",
    "switch",
    "indirectbr",
    "invoke",
    "resume",
    "unreachable",
    "cleanupret",
    "catchret",
    "catchswitch",
    "callbr",
    "fneg",
    "add",
    "fadd",
    "sub",
    "fsub",
    "mul",
    "fmul",
    "udiv",
    "sdiv",
    "fdiv",
    "urem",
    "srem",
    "frem",
    "shl",
    "lshr",
    "ashr",
    "and",
    "or",
    "xor",
    "alloca",
    "load",
    "store",
    "getelementptr",
    "fence",
    "cmpxchg",
    "atomicrmw",
    "trunc",
    "zext",
    "sext",
    "fptoui",
    "fptosi",
    "uitofp",
    "sitofp",
    "fptrunc",
    "fpext",
    "ptrtoint",
    "inttoptr",
    "bitcast",
    "addrspacecast",
    "cleanuppad",
    "catchpad",
    "icmp",
    "fcmp",
    "phi",
    "call",
    "select",
    "userop1",
    "userop2",
    "va_arg",
    "extractelement",
    "insertelement",
    "shufflevector",
    "extractvalue",
    "insertvalue",
    "landingpad",
    "freeze",
];

/// Look up the opcode number of an instruction keyword.
///
/// ```
/// use llir_syntax::opcode_number;
///
/// assert_eq!(opcode_number("br"), Some(2));
/// assert_eq!(opcode_number("freeze"), Some(67));
/// assert_eq!(opcode_number("<invalid>"), None);
/// ```
pub fn opcode_number(name: &str) -> Option<u32> {
    OPCODE_NAMES
        .iter()
        .skip(1)
        .position(|candidate| *candidate == name)
        .map(|index| index as u32 + 1)
}

pub fn calling_convention(keyword: &str) -> Option<u32> {
    let code = match keyword {
        "ccc" => 0,
        "fastcc" => 8,
        "coldcc" => 9,
        "ghccc" => 10,
        "webkit_jscc" => 12,
        "anyregcc" => 13,
        "preserve_mostcc" => 14,
        "preserve_allcc" => 15,
        "swiftcc" => 16,
        "cxx_fast_tlscc" => 17,
        "tailcc" => 18,
        "cfguard_checkcc" => 19,
        "swifttailcc" => 20,
        "x86_stdcallcc" => 64,
        "x86_fastcallcc" => 65,
        "arm_apcscc" => 66,
        "arm_aapcscc" => 67,
        "arm_aapcs_vfpcc" => 68,
        "msp430_intrcc" => 69,
        "x86_thiscallcc" => 70,
        "ptx_kernel" => 71,
        "ptx_device" => 72,
        "spir_func" => 75,
        "spir_kernel" => 76,
        "intel_ocl_bicc" => 77,
        "x86_64_sysvcc" => 78,
        "win64cc" => 79,
        "x86_vectorcallcc" => 80,
        "hhvmcc" => 81,
        "hhvm_ccc" => 82,
        "x86_intrcc" => 83,
        "avr_intrcc" => 84,
        "avr_signalcc" => 85,
        "amdgpu_vs" => 87,
        "amdgpu_gs" => 88,
        "amdgpu_ps" => 89,
        "amdgpu_cs" => 90,
        "amdgpu_kernel" => 91,
        "x86_regcallcc" => 92,
        "amdgpu_hs" => 93,
        "amdgpu_ls" => 95,
        "amdgpu_es" => 96,
        "aarch64_vector_pcs" => 97,
        "aarch64_sve_vector_pcs" => 98,
        "amdgpu_gfx" => 100,
        "m68k_intrcc" => 101,
        "aarch64_sme_preservemost_from_x0" => 102,
        "aarch64_sme_preservemost_from_x2" => 103,
        _ => return None,
    };
    Some(code)
}

pub fn linkage(keyword: &str) -> Option<u32> {
    let code = match keyword {
        "external" => 0,
        "available_externally" => 1,
        "linkonce" => 2,
        "linkonce_odr" => 3,
        "weak" => 4,
        "weak_odr" => 5,
        "appending" => 6,
        "internal" => 7,
        "private" => 8,
        "extern_weak" => 9,
        "common" => 10,
        _ => return None,
    };
    Some(code)
}

pub fn visibility(keyword: &str) -> Option<u32> {
    match keyword {
        "default" => Some(0),
        "hidden" => Some(1),
        "protected" => Some(2),
        _ => None,
    }
}

pub fn unnamed_addr(keyword: &str) -> Option<u32> {
    match keyword {
        "local_unnamed_addr" => Some(1),
        "unnamed_addr" => Some(2),
        _ => None,
    }
}

/// Thread local model named inside `thread_local(...)`.
pub fn thread_local_model(keyword: &str) -> Option<u32> {
    match keyword {
        "localdynamic" => Some(2),
        "initialexec" => Some(3),
        "localexec" => Some(4),
        _ => None,
    }
}

pub fn ordering(keyword: &str) -> Option<u32> {
    let code = match keyword {
        "unordered" => 1,
        "monotonic" => 2,
        "acquire" => 4,
        "release" => 5,
        "acq_rel" => 6,
        "seq_cst" => 7,
        _ => return None,
    };
    Some(code)
}

/// Code of the `singlethread` synchronization scope. The default scope is the system scope.
pub const SYNC_SCOPE_SINGLE_THREAD: i64 = 0;
pub const SYNC_SCOPE_SYSTEM: i64 = 1;

/// Dropped or ignored linkage modifiers that may appear between linkage and the entity keyword.
pub fn is_ignored_global_modifier(keyword: &str) -> bool {
    matches!(
        keyword,
        "dso_local" | "dso_preemptable" | "dllimport" | "dllexport"
    )
}
