//! Closed enumerations of the IR.
//!
//! Every enumeration decodes from the numeric code or keyword the parser records carry, and
//! decoding an unknown code fails instead of falling back to a default.

use std::fmt;
use std::fmt::{Display, Formatter};

/// Declare a closed enumeration with a numeric code and a keyword for each variant.
macro_rules! declare_code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $code:literal => $keyword:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn code(&self) -> u32 {
                match self {
                    $(Self::$variant => $code,)*
                }
            }

            pub fn keyword(&self) -> &'static str {
                match self {
                    $(Self::$variant => $keyword,)*
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.keyword())
            }
        }
    };
}

declare_code_enum! {
    /// Instruction opcodes, numbered the way LLVM numbers them.
    pub enum Opcode {
        Ret = 1 => "ret",
        Br = 2 => "br",
        Switch = 3 => "switch",
        IndirectBr = 4 => "indirectbr",
        Invoke = 5 => "invoke",
        Resume = 6 => "resume",
        Unreachable = 7 => "unreachable",
        CleanupRet = 8 => "cleanupret",
        CatchRet = 9 => "catchret",
        CatchSwitch = 10 => "catchswitch",
        CallBr = 11 => "callbr",
        FNeg = 12 => "fneg",
        Add = 13 => "add",
        FAdd = 14 => "fadd",
        Sub = 15 => "sub",
        FSub = 16 => "fsub",
        Mul = 17 => "mul",
        FMul = 18 => "fmul",
        UDiv = 19 => "udiv",
        SDiv = 20 => "sdiv",
        FDiv = 21 => "fdiv",
        URem = 22 => "urem",
        SRem = 23 => "srem",
        FRem = 24 => "frem",
        Shl = 25 => "shl",
        LShr = 26 => "lshr",
        AShr = 27 => "ashr",
        And = 28 => "and",
        Or = 29 => "or",
        Xor = 30 => "xor",
        Alloca = 31 => "alloca",
        Load = 32 => "load",
        Store = 33 => "store",
        GetElementPtr = 34 => "getelementptr",
        Fence = 35 => "fence",
        AtomicCmpXchg = 36 => "cmpxchg",
        AtomicRmw = 37 => "atomicrmw",
        Trunc = 38 => "trunc",
        ZExt = 39 => "zext",
        SExt = 40 => "sext",
        FPToUI = 41 => "fptoui",
        FPToSI = 42 => "fptosi",
        UIToFP = 43 => "uitofp",
        SIToFP = 44 => "sitofp",
        FPTrunc = 45 => "fptrunc",
        FPExt = 46 => "fpext",
        PtrToInt = 47 => "ptrtoint",
        IntToPtr = 48 => "inttoptr",
        BitCast = 49 => "bitcast",
        AddrSpaceCast = 50 => "addrspacecast",
        CleanupPad = 51 => "cleanuppad",
        CatchPad = 52 => "catchpad",
        ICmp = 53 => "icmp",
        FCmp = 54 => "fcmp",
        Phi = 55 => "phi",
        Call = 56 => "call",
        Select = 57 => "select",
        UserOp1 = 58 => "userop1",
        UserOp2 = 59 => "userop2",
        VaArg = 60 => "va_arg",
        ExtractElement = 61 => "extractelement",
        InsertElement = 62 => "insertelement",
        ShuffleVector = 63 => "shufflevector",
        ExtractValue = 64 => "extractvalue",
        InsertValue = 65 => "insertvalue",
        LandingPad = 66 => "landingpad",
        Freeze = 67 => "freeze",
    }
}

impl Opcode {
    pub fn is_terminator(&self) -> bool {
        (1..=11).contains(&self.code())
    }
}

declare_code_enum! {
    pub enum CallingConv {
        C = 0 => "ccc",
        Fast = 8 => "fastcc",
        Cold = 9 => "coldcc",
        Ghc = 10 => "ghccc",
        HiPE = 11 => "cc 11",
        WebKitJs = 12 => "webkit_jscc",
        AnyReg = 13 => "anyregcc",
        PreserveMost = 14 => "preserve_mostcc",
        PreserveAll = 15 => "preserve_allcc",
        Swift = 16 => "swiftcc",
        CxxFastTls = 17 => "cxx_fast_tlscc",
        Tail = 18 => "tailcc",
        CFGuardCheck = 19 => "cfguard_checkcc",
        SwiftTail = 20 => "swifttailcc",
        X86StdCall = 64 => "x86_stdcallcc",
        X86FastCall = 65 => "x86_fastcallcc",
        ArmApcs = 66 => "arm_apcscc",
        ArmAapcs = 67 => "arm_aapcscc",
        ArmAapcsVfp = 68 => "arm_aapcs_vfpcc",
        Msp430Intr = 69 => "msp430_intrcc",
        X86ThisCall = 70 => "x86_thiscallcc",
        PtxKernel = 71 => "ptx_kernel",
        PtxDevice = 72 => "ptx_device",
        SpirFunc = 75 => "spir_func",
        SpirKernel = 76 => "spir_kernel",
        IntelOclBi = 77 => "intel_ocl_bicc",
        X86_64SysV = 78 => "x86_64_sysvcc",
        Win64 = 79 => "win64cc",
        X86VectorCall = 80 => "x86_vectorcallcc",
        Hhvm = 81 => "hhvmcc",
        HhvmC = 82 => "hhvm_ccc",
        X86Intr = 83 => "x86_intrcc",
        AvrIntr = 84 => "avr_intrcc",
        AvrSignal = 85 => "avr_signalcc",
        AmdGpuVs = 87 => "amdgpu_vs",
        AmdGpuGs = 88 => "amdgpu_gs",
        AmdGpuPs = 89 => "amdgpu_ps",
        AmdGpuCs = 90 => "amdgpu_cs",
        AmdGpuKernel = 91 => "amdgpu_kernel",
        X86RegCall = 92 => "x86_regcallcc",
        AmdGpuHs = 93 => "amdgpu_hs",
        AmdGpuLs = 95 => "amdgpu_ls",
        AmdGpuEs = 96 => "amdgpu_es",
        AArch64VectorCall = 97 => "aarch64_vector_pcs",
        AArch64SveVectorCall = 98 => "aarch64_sve_vector_pcs",
        AmdGpuGfx = 100 => "amdgpu_gfx",
        M68kIntr = 101 => "m68k_intrcc",
        AArch64SmePreserveMostFromX0 = 102 => "aarch64_sme_preservemost_from_x0",
        AArch64SmePreserveMostFromX2 = 103 => "aarch64_sme_preservemost_from_x2",
    }
}

declare_code_enum! {
    pub enum Linkage {
        External = 0 => "external",
        AvailableExternally = 1 => "available_externally",
        LinkOnceAny = 2 => "linkonce",
        LinkOnceOdr = 3 => "linkonce_odr",
        WeakAny = 4 => "weak",
        WeakOdr = 5 => "weak_odr",
        Appending = 6 => "appending",
        Internal = 7 => "internal",
        Private = 8 => "private",
        ExternalWeak = 9 => "extern_weak",
        Common = 10 => "common",
    }
}

declare_code_enum! {
    pub enum Visibility {
        Default = 0 => "default",
        Hidden = 1 => "hidden",
        Protected = 2 => "protected",
    }
}

declare_code_enum! {
    pub enum UnnamedAddr {
        None = 0 => "none",
        Local = 1 => "local_unnamed_addr",
        Global = 2 => "unnamed_addr",
    }
}

declare_code_enum! {
    pub enum ThreadLocalMode {
        NotThreadLocal = 0 => "not_thread_local",
        GeneralDynamic = 1 => "generaldynamic",
        LocalDynamic = 2 => "localdynamic",
        InitialExec = 3 => "initialexec",
        LocalExec = 4 => "localexec",
    }
}

declare_code_enum! {
    /// Atomic memory ordering. Non-atomic accesses carry [`Ordering::NotAtomic`].
    pub enum Ordering {
        NotAtomic = 0 => "notatomic",
        Unordered = 1 => "unordered",
        Monotonic = 2 => "monotonic",
        Consume = 3 => "consume",
        Acquire = 4 => "acquire",
        Release = 5 => "release",
        AcquireRelease = 6 => "acq_rel",
        SequentiallyConsistent = 7 => "seq_cst",
    }
}

declare_code_enum! {
    pub enum ICmpPredicate {
        Eq = 32 => "eq",
        Ne = 33 => "ne",
        Ugt = 34 => "ugt",
        Uge = 35 => "uge",
        Ult = 36 => "ult",
        Ule = 37 => "ule",
        Sgt = 38 => "sgt",
        Sge = 39 => "sge",
        Slt = 40 => "slt",
        Sle = 41 => "sle",
    }
}

declare_code_enum! {
    pub enum FCmpPredicate {
        False = 0 => "false",
        Oeq = 1 => "oeq",
        Ogt = 2 => "ogt",
        Oge = 3 => "oge",
        Olt = 4 => "olt",
        Ole = 5 => "ole",
        One = 6 => "one",
        Ord = 7 => "ord",
        Uno = 8 => "uno",
        Ueq = 9 => "ueq",
        Ugt = 10 => "ugt",
        Uge = 11 => "uge",
        Ult = 12 => "ult",
        Ule = 13 => "ule",
        Une = 14 => "une",
        True = 15 => "true",
    }
}

declare_code_enum! {
    /// A fast-math flag. The code is the bit the flag occupies in LLVM's flag set.
    pub enum FastMathFlag {
        AllowReassoc = 0 => "reassoc",
        NoNaNs = 1 => "nnan",
        NoInfs = 2 => "ninf",
        NoSignedZeros = 3 => "nsz",
        AllowReciprocal = 4 => "arcp",
        AllowContract = 5 => "contract",
        ApproxFunc = 6 => "afn",
    }
}

declare_code_enum! {
    pub enum AtomicRmwOperation {
        Xchg = 0 => "xchg",
        Add = 1 => "add",
        Sub = 2 => "sub",
        And = 3 => "and",
        Nand = 4 => "nand",
        Or = 5 => "or",
        Xor = 6 => "xor",
        Max = 7 => "max",
        Min = 8 => "min",
        UMax = 9 => "umax",
        UMin = 10 => "umin",
        FAdd = 11 => "fadd",
        FSub = 12 => "fsub",
        FMax = 13 => "fmax",
        FMin = 14 => "fmin",
        FMaximum = 15 => "fmaximum",
        FMinimum = 16 => "fminimum",
        UIncWrap = 17 => "uinc_wrap",
        UDecWrap = 18 => "udec_wrap",
        USubCond = 19 => "usub_cond",
        USubSat = 20 => "usub_sat",
    }
}

declare_code_enum! {
    pub enum TailCallKind {
        None = 0 => "none",
        Tail = 1 => "tail",
        MustTail = 2 => "musttail",
        NoTail = 3 => "notail",
    }
}

/// Synchronization scope of an atomic access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SyncScope {
    SingleThread,
    #[default]
    System,
    /// A target specific scope, such as `"agent"` on AMDGPU.
    Named(String),
}

impl SyncScope {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::SingleThread),
            1 => Some(Self::System),
            _ => None,
        }
    }
}

impl Display for SyncScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SyncScope::SingleThread => write!(f, "singlethread"),
            SyncScope::System => write!(f, "system"),
            SyncScope::Named(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codes::{CallingConv, ICmpPredicate, Opcode, Ordering, SyncScope};
    use llir_syntax::OPCODE_NAMES;

    #[test]
    fn test_opcode_table_agrees_with_parser() {
        for (code, name) in OPCODE_NAMES.iter().enumerate().skip(1) {
            let opcode = Opcode::from_code(code as u32).unwrap();
            assert_eq!(opcode.keyword(), *name);
        }
        assert!(Opcode::from_code(0).is_none());
        assert!(Opcode::from_code(68).is_none());
    }

    #[test]
    fn test_terminators_are_numbered_first() {
        assert!(Opcode::Ret.is_terminator());
        assert!(Opcode::CallBr.is_terminator());
        assert!(!Opcode::FNeg.is_terminator());
        assert!(!Opcode::Call.is_terminator());
    }

    #[test]
    fn test_unknown_codes_do_not_decode() {
        assert_eq!(CallingConv::from_code(8), Some(CallingConv::Fast));
        assert!(CallingConv::from_code(1).is_none());
        assert_eq!(Ordering::from_code(7), Some(Ordering::SequentiallyConsistent));
        assert!(Ordering::from_code(8).is_none());
        assert_eq!(ICmpPredicate::from_keyword("sle"), Some(ICmpPredicate::Sle));
        assert!(ICmpPredicate::from_keyword("oeq").is_none());
        assert_eq!(SyncScope::from_code(0), Some(SyncScope::SingleThread));
        assert!(SyncScope::from_code(2).is_none());
    }
}
