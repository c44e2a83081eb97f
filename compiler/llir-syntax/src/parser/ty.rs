use crate::parser::Parser;
use crate::{
    FloatingPointKind, ParseError, ParseResult, RawType, RecursiveNamedTypeError, Token,
    TokenType, UndefinedNamedTypeError, UnsupportedSyntaxError,
};
use llir_span::Span;

impl Parser<'_> {
    /// Parse a type, including trailing function parameter lists.
    ///
    /// ```text
    /// type ::= first_class_type ( '(' parameter_types ')' )*
    /// ```
    pub fn parse_type(&mut self) -> ParseResult<RawType> {
        let mut ty = self.parse_type_head()?;
        loop {
            match &self.lookahead().ty {
                TokenType::OpenParen => {
                    let (parameters, is_vararg) = self.parse_function_type_parameters()?;
                    ty = RawType::Function {
                        parameters,
                        ret: Box::new(ty),
                        is_vararg,
                    };
                }
                TokenType::Star => {
                    let token = self.eat();
                    return Err(ParseError::from(UnsupportedSyntaxError {
                        what: "typed pointer".to_owned(),
                        span: token.span,
                    }));
                }
                _ => return Ok(ty),
            }
        }
    }

    /// Whether the next token can start a type.
    pub fn lookahead_is_type(&self) -> bool {
        match &self.lookahead().ty {
            TokenType::IntegerType(_)
            | TokenType::LocalIdent(_)
            | TokenType::OpenBrace
            | TokenType::OpenBracket
            | TokenType::OpenAngle => true,
            TokenType::Word(word) => {
                FloatingPointKind::from_keyword(word).is_some()
                    || matches!(
                        word.as_str(),
                        "void" | "ptr" | "label" | "token" | "metadata" | "target" | "x86_amx"
                    )
            }
            _ => false,
        }
    }

    fn parse_type_head(&mut self) -> ParseResult<RawType> {
        let token = self.eat();
        match token.ty {
            TokenType::IntegerType(width) => Ok(RawType::Integer(width)),
            TokenType::LocalIdent(name) => self.resolve_named_type(&name, token.span),
            TokenType::OpenBracket => {
                let count = self.expect_integer_in()?;
                self.check_word("x")?;
                let element = self.parse_type()?;
                self.check(&TokenType::CloseBracket)?;
                Ok(RawType::Array {
                    count,
                    element: Box::new(element),
                })
            }
            TokenType::OpenBrace => {
                let elements = self.parse_structure_body(&TokenType::CloseBrace)?;
                Ok(RawType::Structure {
                    name: None,
                    elements,
                    is_packed: false,
                })
            }
            TokenType::OpenAngle => self.parse_angle_type(),
            TokenType::Word(word) => self.parse_keyword_type(&word, token.span),
            _ => Err(Self::unexpected(token)),
        }
    }

    fn parse_keyword_type(&mut self, word: &str, span: Span) -> ParseResult<RawType> {
        if let Some(kind) = FloatingPointKind::from_keyword(word) {
            return Ok(RawType::FloatingPoint(kind));
        }
        match word {
            "void" => Ok(RawType::Void),
            "label" => Ok(RawType::Label),
            "token" => Ok(RawType::Token),
            "metadata" => Ok(RawType::Metadata),
            "x86_amx" => Ok(RawType::X86Amx),
            "ptr" => {
                let address_space = match self.eat_if_word("addrspace") {
                    true => self.parenthesized_integer()?,
                    false => 0,
                };
                Ok(RawType::Pointer { address_space })
            }
            "target" => self.parse_target_extension_type(),
            "x86_mmx" => Err(ParseError::from(UnsupportedSyntaxError {
                what: "x86_mmx type".to_owned(),
                span,
            })),
            _ => Err(Self::unexpected(Token::new(
                TokenType::Word(word.to_owned()),
                span,
            ))),
        }
    }

    /// Parse a vector type or a packed structure type, after the opening angle bracket.
    ///
    /// ```text
    /// angle_type ::= '{' types '}' '>'
    ///              | 'vscale' 'x' INTEGER 'x' type '>'
    ///              | INTEGER 'x' type '>'
    /// ```
    fn parse_angle_type(&mut self) -> ParseResult<RawType> {
        if self.eat_if(&TokenType::OpenBrace).is_some() {
            let elements = self.parse_structure_body(&TokenType::CloseBrace)?;
            self.check(&TokenType::CloseAngle)?;
            return Ok(RawType::Structure {
                name: None,
                elements,
                is_packed: true,
            });
        }
        let is_scalable = self.eat_if_word("vscale");
        if is_scalable {
            self.check_word("x")?;
        }
        let count = self.expect_integer_in()?;
        self.check_word("x")?;
        let element = self.parse_type()?;
        self.check(&TokenType::CloseAngle)?;
        Ok(RawType::Vector {
            count,
            element: Box::new(element),
            is_scalable,
        })
    }

    /// Parse structure member types up to and including the closing brace.
    fn parse_structure_body(&mut self, close: &TokenType) -> ParseResult<Vec<RawType>> {
        let elements =
            self.parser_combinator_delimited(&TokenType::Comma, close, |p| p.parse_type())?;
        self.check(close)?;
        Ok(elements)
    }

    /// Parse `target("name", type..., int...)`, after the `target` keyword.
    fn parse_target_extension_type(&mut self) -> ParseResult<RawType> {
        self.check(&TokenType::OpenParen)?;
        let name = self.expect_string()?;
        let mut types = Vec::new();
        let mut ints = Vec::new();
        while self.eat_if(&TokenType::Comma).is_some() {
            match self.lookahead().ty {
                TokenType::IntegerLiteral(_) => ints.push(self.expect_integer_in()?),
                _ => types.push(self.parse_type()?),
            }
        }
        self.check(&TokenType::CloseParen)?;
        Ok(RawType::TargetExtension { name, types, ints })
    }

    /// Parse a parenthesized list of parameter types, as found in function types.
    fn parse_function_type_parameters(&mut self) -> ParseResult<(Vec<RawType>, bool)> {
        self.check(&TokenType::OpenParen)?;
        let mut parameters = Vec::new();
        let mut is_vararg = false;
        while !self.lookahead_check(&TokenType::CloseParen) {
            if self.eat_if(&TokenType::Ellipsis).is_some() {
                is_vararg = true;
                break;
            }
            parameters.push(self.parse_type()?);
            // Parameter attributes are permitted in function types, but carry no meaning.
            self.parse_parameter_attributes()?;
            if !self.lookahead_check(&TokenType::CloseParen) {
                self.check(&TokenType::Comma)?;
            }
        }
        self.check(&TokenType::CloseParen)?;
        Ok((parameters, is_vararg))
    }

    /// Resolve a named type such as `%struct.node`, parsing its definition on first use.
    pub fn resolve_named_type(&mut self, name: &str, span: Span) -> ParseResult<RawType> {
        if let Some(ty) = self.resolved_types.get(name) {
            return Ok(ty.clone());
        }
        if self.resolving_types.contains(name) {
            return Err(ParseError::from(RecursiveNamedTypeError {
                name: name.to_owned(),
                span,
            }));
        }
        let Some(position) = self.index.named_types.get(name).copied() else {
            return Err(ParseError::from(UndefinedNamedTypeError {
                name: name.to_owned(),
                span,
            }));
        };
        log::trace!("resolving named type %{}", name);
        self.resolving_types.insert(name.to_owned());
        let resume = self.input.position();
        self.input.seek(position);
        let ty = match self.eat_if_word("opaque") {
            true => RawType::Opaque,
            false => match self.parse_type()? {
                RawType::Structure {
                    elements,
                    is_packed,
                    ..
                } => RawType::Structure {
                    name: Some(name.to_owned()),
                    elements,
                    is_packed,
                },
                other => other,
            },
        };
        self.input.seek(resume);
        self.resolving_types.remove(name);
        self.resolved_types.insert(name.to_owned(), ty.clone());
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::{FloatingPointKind, Lexer, ParseError, RawType};
    use llir_macros::{assert_err, assert_matches};

    fn parse_type(source: &str) -> RawType {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(source, tokens);
        parser.parse_type().unwrap()
    }

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(parse_type("i32"), RawType::Integer(32));
        assert_eq!(
            parse_type("double"),
            RawType::FloatingPoint(FloatingPointKind::Double)
        );
        assert_eq!(
            parse_type("ptr addrspace(3)"),
            RawType::Pointer { address_space: 3 }
        );
    }

    #[test]
    fn test_parse_aggregate_types() {
        assert_eq!(
            parse_type("[4 x <vscale x 2 x i64>]"),
            RawType::Array {
                count: 4,
                element: Box::new(RawType::Vector {
                    count: 2,
                    element: Box::new(RawType::Integer(64)),
                    is_scalable: true,
                }),
            }
        );
        assert_eq!(
            parse_type("<{ i8, ptr }>"),
            RawType::Structure {
                name: None,
                elements: vec![RawType::Integer(8), RawType::ptr()],
                is_packed: true,
            }
        );
    }

    #[test]
    fn test_parse_function_type() {
        assert_eq!(
            parse_type("i32 (ptr, ...)"),
            RawType::Function {
                parameters: vec![RawType::ptr()],
                ret: Box::new(RawType::Integer(32)),
                is_vararg: true,
            }
        );
    }

    #[test]
    fn test_counts_that_overflow_are_rejected() {
        let source = "<4294967297 x i8>";
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(source, tokens);
        let err = assert_err!(parser.parse_type());
        let err = assert_matches!(err, ParseError::IntegerOutOfRange(e) => e);
        assert_eq!(err.value, 4294967297);
        assert_eq!(err.expected, "u32");

        let source = "ptr addrspace(-1)";
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(source, tokens);
        assert_matches!(assert_err!(parser.parse_type()), ParseError::IntegerOutOfRange(_) => ());
    }
}
