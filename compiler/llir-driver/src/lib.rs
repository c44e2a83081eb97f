//! Command line driver for the LLVM IR assembler.
//!
//! The driver runs the pipeline from source text to a linked module, and can print the parser
//! records or the structural dump of the module along the way.

pub mod operations;
pub mod pipeline;
pub mod query;
