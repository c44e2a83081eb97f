use llir_span::Span;
use std::fmt;
use std::fmt::{Debug, Formatter};

/// A single token lexed from the assembly source.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub span: Span,
    pub ty: TokenType,
}

impl Token {
    /// Create a new token from a span and a token type.
    pub fn new(ty: TokenType, span: Span) -> Self {
        Self { span, ty }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)
    }
}

/// Enumeration of all possible token types.
///
/// Sigiled identifiers hold their name without the sigil, and with quotes and escapes removed.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// `%name`, `%12` or `%"quoted name"`.
    LocalIdent(String),
    /// `@name`, `@0` or `@"quoted name"`.
    GlobalIdent(String),
    /// `name:`, `12:` or `"quoted name":` starting a basic block.
    LabelDef(String),
    /// `#0` referencing an attribute group.
    AttributeGroup(u32),
    /// `#dbg_value` and friends.
    DebugRecord(String),
    /// `!name` or `!12`.
    MetadataRef(String),
    /// `!"text"`.
    MetadataString(String),
    /// `$name` referencing a comdat.
    ComdatRef(String),
    IntegerLiteral(i128),
    FloatLiteral(f64),
    StringLiteral(String),
    /// `c"..."` byte string constants.
    ByteStringLiteral(Vec<u8>),
    /// `i1`, `i32`, and any other integer type.
    IntegerType(u32),
    /// Keywords and any other bare word.
    Word(String),

    Equal,
    Comma,
    Star,
    Bang,
    Ellipsis,
    Colon,

    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenAngle,
    CloseAngle,

    Eof,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::LocalIdent(v) => write!(f, "%{}", v),
            TokenType::GlobalIdent(v) => write!(f, "@{}", v),
            TokenType::LabelDef(v) => write!(f, "{}:", v),
            TokenType::AttributeGroup(v) => write!(f, "#{}", v),
            TokenType::DebugRecord(v) => write!(f, "#{}", v),
            TokenType::MetadataRef(v) => write!(f, "!{}", v),
            TokenType::MetadataString(v) => write!(f, "!\"{}\"", v),
            TokenType::ComdatRef(v) => write!(f, "${}", v),
            TokenType::IntegerLiteral(v) => write!(f, "{}", v),
            TokenType::FloatLiteral(v) => write!(f, "{:e}", v),
            TokenType::StringLiteral(v) => write!(f, "\"{}\"", v),
            TokenType::ByteStringLiteral(v) => write!(f, "c\"{}\"", v.escape_ascii()),
            TokenType::IntegerType(v) => write!(f, "i{}", v),
            TokenType::Word(v) => write!(f, "{}", v),
            TokenType::Equal => write!(f, "="),
            TokenType::Comma => write!(f, ","),
            TokenType::Star => write!(f, "*"),
            TokenType::Bang => write!(f, "!"),
            TokenType::Ellipsis => write!(f, "..."),
            TokenType::Colon => write!(f, ":"),
            TokenType::OpenParen => write!(f, "("),
            TokenType::CloseParen => write!(f, ")"),
            TokenType::OpenBrace => write!(f, "{{"),
            TokenType::CloseBrace => write!(f, "}}"),
            TokenType::OpenBracket => write!(f, "["),
            TokenType::CloseBracket => write!(f, "]"),
            TokenType::OpenAngle => write!(f, "<"),
            TokenType::CloseAngle => write!(f, ">"),
            TokenType::Eof => write!(f, "end of file"),
        }
    }
}

impl TokenType {
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, TokenType::Word(w) if w == word)
    }

    /// The bracket that closes this token, if it opens a bracketed group.
    pub fn closing_bracket(&self) -> Option<TokenType> {
        match self {
            TokenType::OpenParen => Some(TokenType::CloseParen),
            TokenType::OpenBrace => Some(TokenType::CloseBrace),
            TokenType::OpenBracket => Some(TokenType::CloseBracket),
            TokenType::OpenAngle => Some(TokenType::CloseAngle),
            _ => None,
        }
    }

    pub fn is_closing_bracket(&self) -> bool {
        matches!(
            self,
            TokenType::CloseParen
                | TokenType::CloseBrace
                | TokenType::CloseBracket
                | TokenType::CloseAngle
        )
    }
}
