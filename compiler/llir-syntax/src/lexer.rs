use crate::{
    InvalidFloatLiteralError, InvalidIntegerLiteralError, ParseError, ParseResult, Token,
    TokenType, UnexpectedCharacterError, UnexpectedEndOfFileError, UnfinishedTokenError,
};
use llir_span::{SourcePosition, Span};
use std::iter::Peekable;
use std::str::CharIndices;

pub struct LexerInput<'a> {
    input: Peekable<CharIndices<'a>>,
    source: &'a str,
}

impl<'a> LexerInput<'a> {
    /// Create a new lexer input from a string.
    pub fn new(source: &'a str) -> Self {
        Self {
            input: source.char_indices().peekable(),
            source,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().map(|(_, ch)| *ch)
    }

    /// Peek at the character after the next one.
    fn peek_second(&self) -> Option<char> {
        self.input.clone().nth(1).map(|(_, ch)| ch)
    }

    fn next(&mut self) -> ParseResult<char> {
        let pos = self.pos();
        self.input.next().map(|(_, ch)| ch).ok_or_else(|| {
            ParseError::from(UnexpectedEndOfFileError {
                span: Span::pos(pos),
            })
        })
    }

    fn next_if<F>(&mut self, f: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        self.input.next_if(|(_, ch)| f(*ch)).map(|(_, ch)| ch)
    }

    /// Byte offset of the next character.
    pub fn pos(&mut self) -> SourcePosition {
        let offset = match self.input.peek() {
            Some((offset, _)) => *offset,
            None => self.source.len(),
        };
        offset as SourcePosition
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '$' | '.' | '_')
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '$' | '.' | '_')
}

/// A lexer for textual LLVM assembly.
pub struct Lexer<'a> {
    input: LexerInput<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: LexerInput::new(input),
        }
    }

    pub fn pos(&mut self) -> SourcePosition {
        self.input.pos()
    }

    /// Lex the entire input, terminating the token list with [`TokenType::Eof`].
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.produce()?;
            let done = token.ty == TokenType::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Produce the next token from the input stream.
    pub fn produce(&mut self) -> ParseResult<Token> {
        self.skip_trivia();
        let pos = self.pos();
        let Some(ch) = self.input.peek() else {
            return Ok(Token::new(TokenType::Eof, Span::new(pos..pos)));
        };
        match ch {
            '%' => {
                self.input.next()?;
                let name = self.produce_identifier(pos)?;
                Ok(Token::new(TokenType::LocalIdent(name), self.span_from(pos)))
            }
            '@' => {
                self.input.next()?;
                let name = self.produce_identifier(pos)?;
                Ok(Token::new(TokenType::GlobalIdent(name), self.span_from(pos)))
            }
            '$' => {
                self.input.next()?;
                let name = self.produce_identifier(pos)?;
                Ok(Token::new(TokenType::ComdatRef(name), self.span_from(pos)))
            }
            '!' => self.produce_metadata(pos),
            '#' => self.produce_hash(pos),
            '"' => {
                let value = self.produce_string(pos)?;
                let value = String::from_utf8_lossy(&value).into_owned();
                if self.input.next_if(|ch| ch == ':').is_some() {
                    return Ok(Token::new(TokenType::LabelDef(value), self.span_from(pos)));
                }
                Ok(Token::new(
                    TokenType::StringLiteral(value),
                    self.span_from(pos),
                ))
            }
            '0'..='9' | '-' | '+' => self.produce_number(pos),
            '.' if self.input.peek_second() == Some('.') => {
                for _ in 0..3 {
                    self.input.next_if(|ch| ch == '.').ok_or_else(|| {
                        ParseError::from(UnfinishedTokenError {
                            expected: '.',
                            span: self.span_from(pos),
                        })
                    })?;
                }
                Ok(Token::new(TokenType::Ellipsis, self.span_from(pos)))
            }
            'a'..='z' | 'A'..='Z' | '_' | '.' => self.produce_word(pos),
            _ => {
                let ch = self.input.next()?;
                let ty = match ch {
                    '=' => TokenType::Equal,
                    ',' => TokenType::Comma,
                    '*' => TokenType::Star,
                    ':' => TokenType::Colon,
                    '(' => TokenType::OpenParen,
                    ')' => TokenType::CloseParen,
                    '{' => TokenType::OpenBrace,
                    '}' => TokenType::CloseBrace,
                    '[' => TokenType::OpenBracket,
                    ']' => TokenType::CloseBracket,
                    '<' => TokenType::OpenAngle,
                    '>' => TokenType::CloseAngle,
                    unrecognized_char => {
                        return Err(ParseError::from(UnexpectedCharacterError {
                            ch: unrecognized_char,
                            span: Span::pos(pos),
                        }))
                    }
                };
                Ok(Token::new(ty, Span::pos(pos)))
            }
        }
    }

    fn span_from(&mut self, start: SourcePosition) -> Span {
        Span::new(start..self.pos())
    }

    /// Skip whitespace and `;` line comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.input.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.input.input.next();
                }
                Some(';') => {
                    while self.input.next_if(|ch| ch != '\n').is_some() {}
                }
                _ => return,
            }
        }
    }

    /// Produce the name following a sigil, which is either a bare identifier or a quoted string.
    fn produce_identifier(&mut self, start: SourcePosition) -> ParseResult<String> {
        if self.input.peek() == Some('"') {
            let pos = self.pos();
            let bytes = self.produce_string(pos)?;
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        let mut buf = String::new();
        while let Some(ch) = self.input.next_if(is_identifier_char) {
            buf.push(ch);
        }
        if buf.is_empty() {
            let pos = self.pos();
            return match self.input.peek() {
                Some(ch) => Err(ParseError::from(UnexpectedCharacterError {
                    ch,
                    span: Span::pos(pos),
                })),
                None => Err(ParseError::from(UnexpectedEndOfFileError {
                    span: Span::new(start..pos),
                })),
            };
        }
        Ok(buf)
    }

    /// Produce the contents of a quoted string, resolving `\\` and `\XX` escapes.
    ///
    /// The opening quote has not been consumed yet.
    fn produce_string(&mut self, start: SourcePosition) -> ParseResult<Vec<u8>> {
        self.input.next()?;
        let mut buf = Vec::new();
        loop {
            let ch = self.input.next().map_err(|_| {
                ParseError::from(UnfinishedTokenError {
                    expected: '"',
                    span: self.span_from(start),
                })
            })?;
            match ch {
                '"' => return Ok(buf),
                '\\' => {
                    if self.input.next_if(|ch| ch == '\\').is_some() {
                        buf.push(b'\\');
                        continue;
                    }
                    let high = self.input.next_if(|ch| ch.is_ascii_hexdigit());
                    let low = self.input.next_if(|ch| ch.is_ascii_hexdigit());
                    match (high.and_then(|h| h.to_digit(16)), low.and_then(|l| l.to_digit(16))) {
                        (Some(high), Some(low)) => buf.push((high * 16 + low) as u8),
                        _ => {
                            return Err(ParseError::from(UnfinishedTokenError {
                                expected: '"',
                                span: self.span_from(start),
                            }))
                        }
                    }
                }
                ch => {
                    let mut encoded = [0; 4];
                    buf.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
                }
            }
        }
    }

    fn produce_metadata(&mut self, start: SourcePosition) -> ParseResult<Token> {
        self.input.next()?;
        match self.input.peek() {
            Some('"') => {
                let pos = self.pos();
                let bytes = self.produce_string(pos)?;
                let value = String::from_utf8_lossy(&bytes).into_owned();
                Ok(Token::new(
                    TokenType::MetadataString(value),
                    self.span_from(start),
                ))
            }
            Some(ch) if is_identifier_char(ch) || ch == '\\' => {
                let mut buf = String::new();
                while let Some(ch) = self
                    .input
                    .next_if(|ch| is_identifier_char(ch) || ch == '\\')
                {
                    buf.push(ch);
                }
                Ok(Token::new(TokenType::MetadataRef(buf), self.span_from(start)))
            }
            _ => Ok(Token::new(TokenType::Bang, Span::pos(start))),
        }
    }

    fn produce_hash(&mut self, start: SourcePosition) -> ParseResult<Token> {
        self.input.next()?;
        match self.input.peek() {
            Some(ch) if ch.is_ascii_digit() => {
                let mut buf = String::new();
                while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_digit()) {
                    buf.push(ch);
                }
                let id = buf.parse::<u32>().map_err(|_| {
                    ParseError::from(InvalidIntegerLiteralError {
                        buf: buf.clone(),
                        span: self.span_from(start),
                    })
                })?;
                Ok(Token::new(
                    TokenType::AttributeGroup(id),
                    self.span_from(start),
                ))
            }
            Some(ch) if is_word_char(ch) => {
                let mut buf = String::new();
                while let Some(ch) = self.input.next_if(is_word_char) {
                    buf.push(ch);
                }
                Ok(Token::new(TokenType::DebugRecord(buf), self.span_from(start)))
            }
            Some(ch) => Err(ParseError::from(UnexpectedCharacterError {
                ch,
                span: Span::pos(self.pos()),
            })),
            None => Err(ParseError::from(UnexpectedEndOfFileError {
                span: Span::pos(start),
            })),
        }
    }

    /// Produce an integer literal, a floating point literal, or a numeric label definition.
    fn produce_number(&mut self, start: SourcePosition) -> ParseResult<Token> {
        let mut buf = String::new();
        if let Some(sign) = self.input.next_if(|ch| ch == '-' || ch == '+') {
            buf.push(sign);
        }
        if buf.is_empty() && self.input.peek() == Some('0') && self.input.peek_second() == Some('x')
        {
            return self.produce_hex_float(start);
        }
        while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_digit()) {
            buf.push(ch);
        }
        if buf.len() == 1 && !buf.starts_with(|ch: char| ch.is_ascii_digit()) {
            let pos = self.pos();
            return match self.input.peek() {
                Some(ch) => Err(ParseError::from(UnexpectedCharacterError {
                    ch,
                    span: Span::pos(pos),
                })),
                None => Err(ParseError::from(UnexpectedEndOfFileError {
                    span: Span::pos(start),
                })),
            };
        }
        if self.input.next_if(|ch| ch == '.').is_some() {
            buf.push('.');
            while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_digit()) {
                buf.push(ch);
            }
            if let Some(e) = self.input.next_if(|ch| ch == 'e' || ch == 'E') {
                buf.push(e);
                if let Some(sign) = self.input.next_if(|ch| ch == '-' || ch == '+') {
                    buf.push(sign);
                }
                while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_digit()) {
                    buf.push(ch);
                }
            }
            let value = buf.parse::<f64>().map_err(|_| {
                ParseError::from(InvalidFloatLiteralError {
                    buf: buf.clone(),
                    span: self.span_from(start),
                })
            })?;
            return Ok(Token::new(
                TokenType::FloatLiteral(value),
                self.span_from(start),
            ));
        }
        if buf.starts_with(|ch: char| ch.is_ascii_digit())
            && self.input.next_if(|ch| ch == ':').is_some()
        {
            return Ok(Token::new(TokenType::LabelDef(buf), self.span_from(start)));
        }
        let value = buf.parse::<i128>().map_err(|_| {
            ParseError::from(InvalidIntegerLiteralError {
                buf: buf.clone(),
                span: self.span_from(start),
            })
        })?;
        Ok(Token::new(
            TokenType::IntegerLiteral(value),
            self.span_from(start),
        ))
    }

    /// Produce a hexadecimal floating point literal such as `0x3FF0000000000000` or `0xH3C00`.
    fn produce_hex_float(&mut self, start: SourcePosition) -> ParseResult<Token> {
        self.input.next()?;
        self.input.next()?;
        let prefix = self
            .input
            .next_if(|ch| matches!(ch, 'K' | 'L' | 'M' | 'H' | 'R'));
        let mut digits = String::new();
        while let Some(ch) = self.input.next_if(|ch| ch.is_ascii_hexdigit()) {
            digits.push(ch);
        }
        let invalid = |lexer: &mut Self| {
            let buf = match prefix {
                Some(prefix) => format!("0x{}{}", prefix, digits),
                None => format!("0x{}", digits),
            };
            ParseError::from(InvalidFloatLiteralError {
                buf,
                span: lexer.span_from(start),
            })
        };
        let bits = match u64::from_str_radix(&digits, 16) {
            Ok(bits) => bits,
            Err(_) => return Err(invalid(self)),
        };
        let value = match prefix {
            None => f64::from_bits(bits),
            Some('H') => half_to_f64(bits as u16),
            Some('R') => f32::from_bits((bits as u32) << 16) as f64,
            Some(_) => return Err(invalid(self)),
        };
        Ok(Token::new(
            TokenType::FloatLiteral(value),
            self.span_from(start),
        ))
    }

    /// Produce a keyword, integer type, byte string, or label definition.
    fn produce_word(&mut self, start: SourcePosition) -> ParseResult<Token> {
        let mut buf = String::new();
        while let Some(ch) = self.input.next_if(is_word_char) {
            buf.push(ch);
        }
        if buf == "c" && self.input.peek() == Some('"') {
            let pos = self.pos();
            let bytes = self.produce_string(pos)?;
            return Ok(Token::new(
                TokenType::ByteStringLiteral(bytes),
                self.span_from(start),
            ));
        }
        if self.input.next_if(|ch| ch == ':').is_some() {
            return Ok(Token::new(TokenType::LabelDef(buf), self.span_from(start)));
        }
        if let Some(width) = buf
            .strip_prefix('i')
            .filter(|digits| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()))
        {
            let width = width.parse::<u32>().map_err(|_| {
                ParseError::from(InvalidIntegerLiteralError {
                    buf: buf.clone(),
                    span: self.span_from(start),
                })
            })?;
            return Ok(Token::new(
                TokenType::IntegerType(width),
                self.span_from(start),
            ));
        }
        Ok(Token::new(TokenType::Word(buf), self.span_from(start)))
    }
}

fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let mantissa = (bits & 0x3ff) as f64;
    match exponent {
        0 => sign * mantissa * 2f64.powi(-24),
        0x1f if mantissa == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::{Lexer, ParseError};
    use crate::{
        InvalidFloatLiteralError, Token, TokenType, UnexpectedCharacterError,
        UnfinishedTokenError,
    };
    use llir_span::Span;

    macro_rules! assert_lexer_parse {
        ($input:expr, $($token:expr),*) => {
            let mut lexer = Lexer::new($input);
            $(
                let tok = lexer.produce().unwrap();
                assert_eq!(tok, $token);
            )*
            assert_eq!(lexer.produce().unwrap().ty, TokenType::Eof);
        }
    }

    macro_rules! assert_failure {
        ($input:expr, $pat:pat $(if $cond:expr)?) => {
            let mut lexer = Lexer::new($input);
            assert!(matches!(lexer.produce(), $pat $(if $cond)?));
        };
    }

    #[test]
    fn test_lex_local_identifiers() {
        assert_lexer_parse!(
            "%5",
            Token::new(TokenType::LocalIdent("5".to_owned()), Span::new(0..2))
        );
        assert_lexer_parse!(
            "%struct.node",
            Token::new(
                TokenType::LocalIdent("struct.node".to_owned()),
                Span::new(0..12)
            )
        );
        assert_lexer_parse!(
            "%\"a b\"",
            Token::new(TokenType::LocalIdent("a b".to_owned()), Span::new(0..6))
        );
    }

    #[test]
    fn test_lex_global_and_group_references() {
        assert_lexer_parse!(
            "@factorial_req #0",
            Token::new(
                TokenType::GlobalIdent("factorial_req".to_owned()),
                Span::new(0..14)
            ),
            Token::new(TokenType::AttributeGroup(0), Span::new(15..17))
        );
        assert_lexer_parse!(
            "@llvm.memcpy.p0.p0.i64",
            Token::new(
                TokenType::GlobalIdent("llvm.memcpy.p0.p0.i64".to_owned()),
                Span::new(0..22)
            )
        );
    }

    #[test]
    fn test_lex_label_definitions() {
        assert_lexer_parse!(
            "13:",
            Token::new(TokenType::LabelDef("13".to_owned()), Span::new(0..3))
        );
        assert_lexer_parse!(
            "for.body:",
            Token::new(TokenType::LabelDef("for.body".to_owned()), Span::new(0..9))
        );
        assert_lexer_parse!(
            "\"odd name\":",
            Token::new(TokenType::LabelDef("odd name".to_owned()), Span::new(0..11))
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_lexer_parse!(
            "-42 7",
            Token::new(TokenType::IntegerLiteral(-42), Span::new(0..3)),
            Token::new(TokenType::IntegerLiteral(7), Span::new(4..5))
        );
        assert_lexer_parse!(
            "1.500000e+01",
            Token::new(TokenType::FloatLiteral(15.0), Span::new(0..12))
        );
        assert_lexer_parse!(
            "0x3FF0000000000000",
            Token::new(TokenType::FloatLiteral(1.0), Span::new(0..18))
        );
        assert_lexer_parse!(
            "0xH3C00",
            Token::new(TokenType::FloatLiteral(1.0), Span::new(0..7))
        );
        assert_failure!(
            "0xK3FFF8000000000000000",
            Err(ParseError::InvalidFloatLiteral(InvalidFloatLiteralError { .. }))
        );
    }

    #[test]
    fn test_lex_words_and_types() {
        assert_lexer_parse!(
            "define i32",
            Token::new(TokenType::Word("define".to_owned()), Span::new(0..6)),
            Token::new(TokenType::IntegerType(32), Span::new(7..10))
        );
        assert_lexer_parse!(
            "x86_fp80",
            Token::new(TokenType::Word("x86_fp80".to_owned()), Span::new(0..8))
        );
    }

    #[test]
    fn test_lex_strings() {
        assert_lexer_parse!(
            "c\"hi\\0A\\00\"",
            Token::new(
                TokenType::ByteStringLiteral(vec![b'h', b'i', b'\n', 0]),
                Span::new(0..11)
            )
        );
        assert_lexer_parse!(
            "\"frame-pointer\"",
            Token::new(
                TokenType::StringLiteral("frame-pointer".to_owned()),
                Span::new(0..15)
            )
        );
        assert_failure!(
            "\"unterminated",
            Err(ParseError::UnfinishedToken(UnfinishedTokenError { expected: '"', .. }))
        );
    }

    #[test]
    fn test_lex_metadata_and_comments() {
        assert_lexer_parse!(
            "; a comment\n!dbg !12 !{",
            Token::new(TokenType::MetadataRef("dbg".to_owned()), Span::new(12..16)),
            Token::new(TokenType::MetadataRef("12".to_owned()), Span::new(17..20)),
            Token::new(TokenType::Bang, Span::new(21..22)),
            Token::new(TokenType::OpenBrace, Span::new(22..23))
        );
    }

    #[test]
    fn test_lex_punctuation() {
        assert_lexer_parse!(
            "(...)",
            Token::new(TokenType::OpenParen, Span::new(0..1)),
            Token::new(TokenType::Ellipsis, Span::new(1..4)),
            Token::new(TokenType::CloseParen, Span::new(4..5))
        );
        assert_failure!(
            "^",
            Err(ParseError::UnexpectedCharacter(UnexpectedCharacterError { ch: '^', .. }))
        );
    }
}
