//! Recursive descent parser producing raw records.
//!
//! The parser works over the complete token vector produced by the [`Lexer`]. LLVM assembly allows
//! forward references to named types, globals, and attribute groups, so the parser first indexes
//! the token positions of every top-level entity, and then seeks back into the token stream to
//! build each entity on demand.

mod attribute;
mod instruction;
mod module;
mod ty;
mod value;

use crate::{
    IntegerOutOfRangeError, Lexer, ParseError, ParseResult, RawAttribute, RawModule, RawType,
    Token, TokenType, UnexpectedEndOfFileError, UnexpectedTokenError,
};
use llir_span::Span;
use std::collections::{HashMap, HashSet};

pub use module::ModuleIndex;
pub use value::sign_extend;

/// Parse a complete module from its assembly source.
pub fn parse_module(source: &str) -> ParseResult<RawModule> {
    let tokens = Lexer::new(source).tokenize()?;
    log::debug!("lexed {} tokens", tokens.len());
    let mut parser = Parser::new(source, tokens);
    parser.parse()
}

pub struct ParserInput {
    tokens: Vec<Token>,
    cursor: usize,
}

impl ParserInput {
    /// Create a new input over a token vector terminated by [`TokenType::Eof`].
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }

    /// Peek `n` tokens ahead. Looking past the end yields the end of file token.
    pub fn lookahead_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[usize::min(self.cursor + n, last)]
    }

    /// Consume the next token. The end of file token is never consumed.
    pub fn eat(&mut self) -> Token {
        let token = self.lookahead_nth(0).clone();
        if token.ty != TokenType::Eof {
            self.cursor += 1;
        }
        token
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn seek(&mut self, position: usize) {
        self.cursor = usize::min(position, self.tokens.len() - 1);
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        match self.cursor {
            0 => Span::empty(),
            n => self.tokens[n - 1].span,
        }
    }

    pub fn span_at(&self, position: usize) -> Span {
        self.tokens[usize::min(position, self.tokens.len() - 1)].span
    }
}

/// Numbering state of the function body currently being parsed.
#[derive(Debug, Default)]
pub struct FunctionScope {
    pub name: String,
    /// The next number handed out to an unnamed value.
    pub next_slot: u32,
}

impl FunctionScope {
    /// Take the next slot for an unnamed value.
    pub fn take_slot(&mut self) -> String {
        let name = format!("%{}", self.next_slot);
        self.next_slot += 1;
        name
    }

    /// Record an explicitly written name, keeping the slot counter in sync with numbered names.
    pub fn define(&mut self, name: &str) -> String {
        if let Ok(slot) = name.parse::<u32>() {
            self.next_slot = slot + 1;
        }
        local_name(name)
    }
}

pub struct Parser<'a> {
    input: ParserInput,
    source: &'a str,
    index: ModuleIndex,
    /// Named structure types that have been fully resolved.
    resolved_types: HashMap<String, RawType>,
    /// Named types currently being resolved, used to detect types containing themselves.
    resolving_types: HashSet<String>,
    attribute_groups: HashMap<u32, Vec<RawAttribute>>,
    /// Value types of every global variable and function, keyed by name without sigil.
    symbols: HashMap<String, RawType>,
    scope: FunctionScope,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            input: ParserInput::new(tokens),
            source,
            index: ModuleIndex::default(),
            resolved_types: HashMap::new(),
            resolving_types: HashSet::new(),
            attribute_groups: HashMap::new(),
            symbols: HashMap::new(),
            scope: FunctionScope::default(),
        }
    }

    /// Advance the token stream by one, and return the advanced token.
    pub fn eat(&mut self) -> Token {
        self.input.eat()
    }

    /// Peek at the next token in the source without consuming it.
    pub fn lookahead(&self) -> &Token {
        self.input.lookahead_nth(0)
    }

    pub fn lookahead_nth(&self, n: usize) -> &Token {
        self.input.lookahead_nth(n)
    }

    /// Determine if the next token in the token stream matches the given type.
    pub fn lookahead_check(&self, ty: &TokenType) -> bool {
        self.lookahead().ty == *ty
    }

    pub fn lookahead_word(&self, word: &str) -> bool {
        self.lookahead().ty.is_word(word)
    }

    /// Consume the next token from the token stream and ensure it matches the given type.
    pub fn check(&mut self, ty: &TokenType) -> ParseResult<Token> {
        let token = self.eat();
        match token {
            token if token.ty == *ty => Ok(token),
            token => Err(Self::unexpected(token)),
        }
    }

    /// Consume the next token and ensure it is the given keyword.
    pub fn check_word(&mut self, word: &str) -> ParseResult<Token> {
        let token = self.eat();
        match token {
            token if token.ty.is_word(word) => Ok(token),
            token => Err(Self::unexpected(token)),
        }
    }

    /// Consume the next token only if it matches the given type.
    pub fn eat_if(&mut self, ty: &TokenType) -> Option<Token> {
        if self.lookahead_check(ty) {
            return Some(self.eat());
        }
        None
    }

    /// Consume the next token only if it is the given keyword.
    pub fn eat_if_word(&mut self, word: &str) -> bool {
        if self.lookahead_word(word) {
            self.eat();
            return true;
        }
        false
    }

    pub fn expect_word(&mut self) -> ParseResult<(String, Span)> {
        match self.eat() {
            Token {
                ty: TokenType::Word(word),
                span,
            } => Ok((word, span)),
            token => Err(Self::unexpected(token)),
        }
    }

    pub fn expect_integer(&mut self) -> ParseResult<(i128, Span)> {
        match self.eat() {
            Token {
                ty: TokenType::IntegerLiteral(value),
                span,
            } => Ok((value, span)),
            token => Err(Self::unexpected(token)),
        }
    }

    pub fn expect_string(&mut self) -> ParseResult<String> {
        match self.eat() {
            Token {
                ty: TokenType::StringLiteral(value),
                ..
            } => Ok(value),
            token => Err(Self::unexpected(token)),
        }
    }

    /// Expect an integer literal that fits in `T`.
    pub fn expect_integer_in<T: TryFrom<i128>>(&mut self) -> ParseResult<T> {
        let (value, span) = self.expect_integer()?;
        T::try_from(value).map_err(|_| {
            ParseError::from(IntegerOutOfRangeError {
                value,
                expected: std::any::type_name::<T>(),
                span,
            })
        })
    }

    /// Parse an integer wrapped in parentheses, as in `addrspace(1)` or `dereferenceable(8)`.
    pub fn parenthesized_integer<T: TryFrom<i128>>(&mut self) -> ParseResult<T> {
        self.check(&TokenType::OpenParen)?;
        let value = self.expect_integer_in()?;
        self.check(&TokenType::CloseParen)?;
        Ok(value)
    }

    /// Build the error for a token that is not allowed in the current position.
    pub fn unexpected(token: Token) -> ParseError {
        match token.ty {
            TokenType::Eof => ParseError::from(UnexpectedEndOfFileError { span: token.span }),
            _ => ParseError::from(UnexpectedTokenError {
                span: token.span,
                token,
            }),
        }
    }

    /// Apply the given parser `f` to the parser repeatedly until the next token matches the given
    /// circuit breaker, with each call to `f` being interleaved by a single consumption of the
    /// delimiter token.
    ///
    /// This function does not consume the circuit breaker token.
    pub fn parser_combinator_delimited<T, F>(
        &mut self,
        delimiter: &TokenType,
        circuit_breaker: &TokenType,
        f: F,
    ) -> ParseResult<Vec<T>>
    where
        F: Fn(&mut Self) -> ParseResult<T>,
    {
        let mut items = Vec::new();
        while !self.lookahead_check(circuit_breaker) {
            items.push(f(self)?);
            if !self.lookahead_check(circuit_breaker) {
                self.check(delimiter)?;
            }
        }
        Ok(items)
    }

    /// Apply `f` between a pair of brackets, separated by commas, consuming both brackets.
    pub fn parser_combinator_bracketed<T, F>(
        &mut self,
        open: &TokenType,
        close: &TokenType,
        f: F,
    ) -> ParseResult<Vec<T>>
    where
        F: Fn(&mut Self) -> ParseResult<T>,
    {
        self.check(open)?;
        let items = self.parser_combinator_delimited(&TokenType::Comma, close, f)?;
        self.check(close)?;
        Ok(items)
    }

    /// Skip over a balanced bracketed group, where the opening bracket is the next token.
    ///
    /// Returns the span covering the entire group.
    pub fn skip_balanced(&mut self) -> ParseResult<Span> {
        let open = self.eat();
        let Some(close) = open.ty.closing_bracket() else {
            return Err(Self::unexpected(open));
        };
        let mut depth = 1usize;
        loop {
            let token = self.eat();
            match &token.ty {
                TokenType::Eof => return Err(Self::unexpected(token)),
                ty if *ty == open.ty => depth += 1,
                ty if *ty == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(open.span.merge(&token.span));
                    }
                }
                _ => {}
            }
        }
    }

    /// Take the body of a parenthesized group as source text, as in `memory(argmem: read)`.
    pub fn parenthesized_text(&mut self) -> ParseResult<String> {
        let span = self.skip_balanced()?;
        let inner = Span::new(span.low + 1..span.high - 1);
        Ok(self.source_text(inner).trim().to_owned())
    }

    pub fn source_text(&self, span: Span) -> String {
        self.source
            .get(span.low as usize..span.high as usize)
            .unwrap_or_default()
            .to_owned()
    }

    /// Span from the token at `start` up to and including the most recently consumed token.
    pub fn span_since(&self, start: usize) -> Span {
        self.input.span_at(start).merge(&self.input.previous_span())
    }
}

/// Whether an identifier is a numbered slot like `%12` rather than a name.
pub fn is_slot(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit())
}

/// Name of a local value as it appears in records: numbered values keep their sigil.
///
/// ```
/// use llir_syntax::local_name;
///
/// assert_eq!(local_name("13"), "%13");
/// assert_eq!(local_name("entry"), "entry");
/// ```
pub fn local_name(name: &str) -> String {
    match is_slot(name) {
        true => format!("%{}", name),
        false => name.to_owned(),
    }
}

/// Name of a global value as it appears in records: numbered values keep their sigil.
pub fn global_name(name: &str) -> String {
    match is_slot(name) {
        true => format!("@{}", name),
        false => name.to_owned(),
    }
}
