mod build;
mod emit_ir;
mod emit_records;
mod parse;

pub use build::BuildOperation;
pub use emit_ir::IrEmitOperation;
pub use emit_records::RecordEmitOperation;
pub use parse::ParseOperation;
