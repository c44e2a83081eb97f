mod dump;

pub use dump::IrDumpPass;
