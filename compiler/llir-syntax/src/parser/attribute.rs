use crate::parser::Parser;
use crate::{
    ParseError, ParseResult, RawAttribute, RawAttributeValue, Token, TokenType,
    UndefinedAttributeGroupError,
};

/// Attributes that carry no payload.
const ENUM_ATTRIBUTES: &[&str] = &[
    "allocalign",
    "allocptr",
    "alwaysinline",
    "builtin",
    "cold",
    "convergent",
    "coro_elide_safe",
    "coro_only_destroy_when_complete",
    "dead_on_unwind",
    "disable_sanitizer_instrumentation",
    "fn_ret_thunk_extern",
    "hot",
    "hybrid_patchable",
    "immarg",
    "inlinehint",
    "inreg",
    "jumptable",
    "minsize",
    "mustprogress",
    "naked",
    "nest",
    "noalias",
    "nobuiltin",
    "nocallback",
    "nocapture",
    "nocf_check",
    "nodivergencesource",
    "noduplicate",
    "noext",
    "nofree",
    "noimplicitfloat",
    "noinline",
    "nomerge",
    "nonlazybind",
    "nonnull",
    "noprofile",
    "norecurse",
    "noredzone",
    "noreturn",
    "nosanitize_bounds",
    "nosanitize_coverage",
    "nosync",
    "noundef",
    "nounwind",
    "null_pointer_is_valid",
    "optdebug",
    "optforfuzzing",
    "optnone",
    "optsize",
    "presplitcoroutine",
    "readnone",
    "readonly",
    "returned",
    "returns_twice",
    "safestack",
    "sanitize_address",
    "sanitize_hwaddress",
    "sanitize_memory",
    "sanitize_memtag",
    "sanitize_numerical_stability",
    "sanitize_realtime",
    "sanitize_realtime_blocking",
    "sanitize_thread",
    "sanitize_type",
    "shadowcallstack",
    "signext",
    "skipprofile",
    "speculatable",
    "speculative_load_hardening",
    "ssp",
    "sspreq",
    "sspstrong",
    "strictfp",
    "swiftasync",
    "swifterror",
    "swiftself",
    "willreturn",
    "writable",
    "writeonly",
    "zeroext",
];

/// Attributes whose payload is a type, written as `byval(%struct.S)`.
const TYPE_ATTRIBUTES: &[&str] = &[
    "byref",
    "byval",
    "elementtype",
    "inalloca",
    "preallocated",
    "sret",
];

/// Attributes whose payload has its own grammar, carried as source text.
const TEXT_ATTRIBUTES: &[&str] = &[
    "allockind",
    "captures",
    "initializes",
    "memory",
    "nofpclass",
    "range",
];

/// Attributes whose payload is a single parenthesized integer.
const INT_ATTRIBUTES: &[&str] = &["dereferenceable", "dereferenceable_or_null"];

pub fn is_attribute_keyword(word: &str) -> bool {
    ENUM_ATTRIBUTES.contains(&word)
        || TYPE_ATTRIBUTES.contains(&word)
        || TEXT_ATTRIBUTES.contains(&word)
        || INT_ATTRIBUTES.contains(&word)
        || matches!(
            word,
            "align" | "alignstack" | "allocsize" | "uwtable" | "vscale_range"
        )
}

impl Parser<'_> {
    /// Parse attributes attached to a parameter or a return value.
    pub fn parse_parameter_attributes(&mut self) -> ParseResult<Vec<RawAttribute>> {
        let mut attributes = Vec::new();
        while let Some(attribute) = self.parse_attribute()? {
            attributes.push(attribute);
        }
        Ok(attributes)
    }

    /// Parse a single attribute if the next token starts one.
    ///
    /// `align` is accepted in both the `align 8` and the `align(8)` form.
    pub fn parse_attribute(&mut self) -> ParseResult<Option<RawAttribute>> {
        let word = match &self.lookahead().ty {
            TokenType::StringLiteral(_) => return self.parse_string_attribute().map(Some),
            TokenType::Word(word) if is_attribute_keyword(word) => word.clone(),
            _ => return Ok(None),
        };
        self.eat();
        let attribute = match word.as_str() {
            "align" => {
                let value = match self.lookahead_check(&TokenType::OpenParen) {
                    true => self.parenthesized_integer()?,
                    false => self.expect_integer_in()?,
                };
                RawAttribute::with_value(&word, RawAttributeValue::Int(value))
            }
            "alignstack" => {
                let value = match self.eat_if(&TokenType::Equal) {
                    Some(_) => self.expect_integer_in()?,
                    None => self.parenthesized_integer()?,
                };
                RawAttribute::with_value(&word, RawAttributeValue::Int(value))
            }
            "allocsize" => {
                let values = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| Ok(RawAttributeValue::Int(p.expect_integer_in()?)),
                )?;
                RawAttribute {
                    name: word.clone(),
                    values,
                }
            }
            "uwtable" => {
                let kind = match self.lookahead_check(&TokenType::OpenParen) {
                    true => {
                        self.eat();
                        let (kind, _) = self.expect_word()?;
                        self.check(&TokenType::CloseParen)?;
                        kind
                    }
                    false => "async".to_owned(),
                };
                let value = match kind.as_str() {
                    "sync" => 1,
                    _ => 2,
                };
                RawAttribute::with_value(&word, RawAttributeValue::Int(value))
            }
            "vscale_range" => {
                let bounds = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| p.expect_integer_in::<i64>(),
                )?;
                let min = bounds.first().copied().unwrap_or(1);
                let max = bounds.get(1).copied().unwrap_or(min);
                let mut values = vec![RawAttributeValue::Int(min)];
                // A maximum of zero means the range is unbounded.
                if max != 0 {
                    values.push(RawAttributeValue::Int(max));
                }
                RawAttribute {
                    name: word.clone(),
                    values,
                }
            }
            word if INT_ATTRIBUTES.contains(&word) => {
                let value = self.parenthesized_integer()?;
                RawAttribute::with_value(word, RawAttributeValue::Int(value))
            }
            word if TYPE_ATTRIBUTES.contains(&word) => {
                match self.lookahead_check(&TokenType::OpenParen) {
                    true => {
                        self.eat();
                        let ty = self.parse_type()?;
                        self.check(&TokenType::CloseParen)?;
                        RawAttribute::with_value(word, RawAttributeValue::Type(ty))
                    }
                    false => RawAttribute::marker(word),
                }
            }
            word if TEXT_ATTRIBUTES.contains(&word) => {
                let text = self.parenthesized_text()?;
                RawAttribute::with_value(word, RawAttributeValue::Str(text))
            }
            word => RawAttribute::marker(word),
        };
        Ok(Some(attribute))
    }

    /// Parse `"key"="value"` or a bare `"key"`.
    fn parse_string_attribute(&mut self) -> ParseResult<RawAttribute> {
        let key = self.expect_string()?;
        let value = match self.eat_if(&TokenType::Equal) {
            Some(_) => self.expect_string()?,
            None => String::new(),
        };
        Ok(RawAttribute::with_value(&key, RawAttributeValue::Str(value)))
    }

    /// Parse a keyword attribute that has no dedicated grammar, keeping any parenthesized payload as
    /// text.
    fn parse_unknown_attribute(&mut self) -> ParseResult<RawAttribute> {
        let (word, _) = self.expect_word()?;
        match self.lookahead_check(&TokenType::OpenParen) {
            true => {
                let text = self.parenthesized_text()?;
                Ok(RawAttribute::with_value(&word, RawAttributeValue::Str(text)))
            }
            false => Ok(RawAttribute::marker(&word)),
        }
    }

    /// Look up the attributes of a previously parsed attribute group.
    pub fn attribute_group(&self, token: &Token, id: u32) -> ParseResult<Vec<RawAttribute>> {
        self.attribute_groups.get(&id).cloned().ok_or_else(|| {
            ParseError::from(UndefinedAttributeGroupError {
                id,
                span: token.span,
            })
        })
    }

    /// Parse the body of `attributes #0 = { ... }`, starting at the opening brace.
    pub fn parse_attribute_group_body(&mut self) -> ParseResult<Vec<RawAttribute>> {
        self.check(&TokenType::OpenBrace)?;
        let mut attributes = Vec::new();
        while !self.lookahead_check(&TokenType::CloseBrace) {
            match self.parse_attribute()? {
                Some(attribute) => attributes.push(attribute),
                None => attributes.push(self.parse_unknown_attribute()?),
            }
        }
        self.check(&TokenType::CloseBrace)?;
        Ok(attributes)
    }
}

/// Drop trailing empty layers, returning no layers at all when every layer is empty.
pub fn trim_attribute_layers(mut layers: Vec<Vec<RawAttribute>>) -> Vec<Vec<RawAttribute>> {
    while layers.last().is_some_and(|layer| layer.is_empty()) {
        layers.pop();
    }
    layers
}

#[cfg(test)]
mod tests {
    use crate::parser::attribute::trim_attribute_layers;
    use crate::parser::Parser;
    use crate::{Lexer, RawAttribute, RawAttributeValue, RawType};

    fn parse_attributes(source: &str) -> Vec<RawAttribute> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(source, tokens);
        parser.parse_parameter_attributes().unwrap()
    }

    #[test]
    fn test_parse_enum_and_int_attributes() {
        assert_eq!(
            parse_attributes("noundef align 8 dereferenceable(16)"),
            vec![
                RawAttribute::marker("noundef"),
                RawAttribute::with_value("align", RawAttributeValue::Int(8)),
                RawAttribute::with_value("dereferenceable", RawAttributeValue::Int(16)),
            ]
        );
    }

    #[test]
    fn test_parse_payload_attributes() {
        assert_eq!(
            parse_attributes("sret({ i32 }) memory(argmem: readwrite) vscale_range(1,16)"),
            vec![
                RawAttribute::with_value(
                    "sret",
                    RawAttributeValue::Type(RawType::Structure {
                        name: None,
                        elements: vec![RawType::Integer(32)],
                        is_packed: false,
                    })
                ),
                RawAttribute::with_value(
                    "memory",
                    RawAttributeValue::Str("argmem: readwrite".to_owned())
                ),
                RawAttribute {
                    name: "vscale_range".to_owned(),
                    values: vec![RawAttributeValue::Int(1), RawAttributeValue::Int(16)],
                },
            ]
        );
    }

    #[test]
    fn test_parse_string_attributes() {
        assert_eq!(
            parse_attributes("\"frame-pointer\"=\"all\" \"no-builtins\""),
            vec![
                RawAttribute::with_value("frame-pointer", RawAttributeValue::Str("all".to_owned())),
                RawAttribute::with_value("no-builtins", RawAttributeValue::Str(String::new())),
            ]
        );
    }

    #[test]
    fn test_trim_attribute_layers() {
        let noundef = vec![RawAttribute::marker("noundef")];
        assert_eq!(
            trim_attribute_layers(vec![vec![], noundef.clone(), vec![], vec![]]),
            vec![vec![], noundef]
        );
        assert!(trim_attribute_layers(vec![vec![], vec![]]).is_empty());
    }
}
