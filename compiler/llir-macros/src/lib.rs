//! Shared macros for the assembler crates.
//!
//! - [`declare_error_type!`] builds the diagnostic error union each crate exposes.
//! - The assertion macros are only compiled with the `assertion-macros` feature, and are meant for
//!   tests.

#[cfg(feature = "assertion-macros")]
mod assertions;
mod error;
