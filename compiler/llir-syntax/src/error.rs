//! Error types for the assembly parser.
//!
//! Lexer and parser share one error type. The lexer runs to completion before parsing starts, so
//! lexical errors are reported before any syntax error further up in the file.

use crate::Token;
use llir_macros::declare_error_type;
use llir_span::Span;
use miette::Diagnostic;
use thiserror::Error;

declare_error_type! {
    #[error("parser error: {0}")]
    pub enum ParseError {
        UnexpectedEndOfFile(UnexpectedEndOfFileError),
        UnfinishedToken(UnfinishedTokenError),
        InvalidIntegerLiteral(InvalidIntegerLiteralError),
        IntegerOutOfRange(IntegerOutOfRangeError),
        InvalidFloatLiteral(InvalidFloatLiteralError),
        UnexpectedCharacter(UnexpectedCharacterError),
        UnexpectedToken(UnexpectedTokenError),
        UnknownInstruction(UnknownInstructionError),
        UndefinedNamedType(UndefinedNamedTypeError),
        RecursiveNamedType(RecursiveNamedTypeError),
        UndefinedSymbol(UndefinedSymbolError),
        UndefinedLabel(UndefinedLabelError),
        UndefinedAttributeGroup(UndefinedAttributeGroupError),
        DuplicateDefinition(DuplicateDefinitionError),
        InvalidTypeForConstant(InvalidTypeForConstantError),
        UnsupportedSyntax(UnsupportedSyntaxError),
    }
}

/// Handy type alias for all parsing-related errors.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(syntax::unexpected_end_of_file),
    help("the module ends in the middle of a definition")
)]
#[error("expected more input after this")]
pub struct UnexpectedEndOfFileError {
    #[label = "required more input to parse"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug, PartialEq)]
#[diagnostic(
    code(syntax::unfinished_token),
    help("did you forget to add a '{expected}' character here?")
)]
#[error("expected another '{expected}' character here")]
pub struct UnfinishedTokenError {
    pub expected: char,
    #[label = "this alone does not form a valid token"]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::invalid_integer_literal))]
#[error("found illegal integer literal")]
pub struct InvalidIntegerLiteralError {
    pub buf: String,
    #[label("{buf} does not fit in 128 bits")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::integer_out_of_range))]
#[error("integer {value} is out of range")]
pub struct IntegerOutOfRangeError {
    pub value: i128,
    pub expected: &'static str,
    #[label("{value} does not fit in {expected}")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(syntax::invalid_float_literal),
    help("only decimal, double, half and bfloat hexadecimal forms are supported")
)]
#[error("found illegal floating point literal")]
pub struct InvalidFloatLiteralError {
    pub buf: String,
    #[label("{buf} is not a supported floating point literal")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::unexpected_character))]
#[error("found illegal character during parsing")]
pub struct UnexpectedCharacterError {
    pub ch: char,
    #[label("the character '{ch}' does not parse into any tokens")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::unexpected_token))]
#[error("found unexpected token during parsing")]
pub struct UnexpectedTokenError {
    pub token: Token,
    #[label("was not expecting to find '{token}' in this position")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::unknown_instruction))]
#[error("unknown instruction {name}")]
pub struct UnknownInstructionError {
    pub name: String,
    #[label("{name} is not an instruction")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::undefined_named_type))]
#[error("use of undefined type %{name}")]
pub struct UndefinedNamedTypeError {
    pub name: String,
    #[label("no type named %{name} is defined in this module")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(
    code(syntax::recursive_named_type),
    help("a structure may only refer to itself through a pointer")
)]
#[error("type %{name} contains itself")]
pub struct RecursiveNamedTypeError {
    pub name: String,
    #[label("%{name} is recursive through this reference")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::undefined_symbol))]
#[error("use of undefined symbol @{name}")]
pub struct UndefinedSymbolError {
    pub name: String,
    #[label("no global or function named @{name} exists")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::undefined_label))]
#[error("branch to undefined block {name}")]
pub struct UndefinedLabelError {
    pub name: String,
    #[label("no block named {name} exists in @{function}")]
    pub span: Span,
    pub function: String,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::undefined_attribute_group))]
#[error("use of undefined attribute group #{id}")]
pub struct UndefinedAttributeGroupError {
    pub id: u32,
    #[label("attribute group #{id} is never defined")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::duplicate_definition))]
#[error("redefinition of {name}")]
pub struct DuplicateDefinitionError {
    pub name: String,
    #[label("{name} is already defined")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::invalid_type_for_constant))]
#[error("constant does not match its type")]
pub struct InvalidTypeForConstantError {
    pub ty: String,
    #[label("this constant cannot have type {ty}")]
    pub span: Span,
}

#[derive(Error, Diagnostic, Debug)]
#[diagnostic(code(syntax::unsupported_syntax))]
#[error("unsupported syntax: {what}")]
pub struct UnsupportedSyntaxError {
    pub what: String,
    #[label("{what} is not supported")]
    pub span: Span,
}
