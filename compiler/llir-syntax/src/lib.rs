//! Textual LLVM assembly front-end.
//!
//! The crate turns `.ll` source into the flat record form of [`RawModule`], which is what the IR
//! builder consumes. Records carry names instead of links, and every instruction is reduced to an
//! opcode number, its operands in use order, and opcode specific additional data.

mod codes;
mod error;
mod lexer;
mod parser;
mod record;
mod tok;

pub use codes::*;
pub use error::*;
pub use lexer::*;
pub use parser::*;
pub use record::*;
pub use tok::*;
