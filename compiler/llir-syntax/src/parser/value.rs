use crate::parser::{global_name, local_name, Parser};
use crate::{
    opcode_number, AdditionalData, FloatingPointKind, InvalidTypeForConstantError, ParseError,
    ParseResult, RawAttribute, RawAttributeValue, RawInstruction, RawType, RawValue,
    RawValueKind, Token, TokenType, UndefinedSymbolError, UnsupportedSyntaxError, OPCODE_NAMES,
};
use llir_span::Span;

/// Sign-extend the low `width` bits of an integer literal.
///
/// Literals are at most 128 bits wide, so integer types wider than that keep the literal as is.
///
/// ```
/// use llir_syntax::sign_extend;
///
/// assert_eq!(sign_extend(1, 1), -1);
/// assert_eq!(sign_extend(255, 8), -1);
/// assert_eq!(sign_extend(127, 8), 127);
/// assert_eq!(sign_extend(-5, 64), -5);
/// assert_eq!(sign_extend(1 << 64, 65), -(1 << 64));
/// assert_eq!(sign_extend(i128::MAX, 128), i128::MAX);
/// ```
pub fn sign_extend(value: i128, width: u32) -> i128 {
    match width {
        0 => 0,
        width if width >= 128 => value,
        width => {
            let shift = 128 - width;
            (value << shift) >> shift
        }
    }
}

/// Build a constant array, vector, or structure from its elements the way LLVM canonicalizes it.
///
/// Empty and all-zero aggregates collapse into `zeroinitializer`, aggregates of only `undef` or
/// only `poison` collapse into that value, and arrays of simple scalars are packed into data
/// arrays.
pub fn build_aggregate(ty: RawType, elements: Vec<RawValue>) -> RawValue {
    if elements.iter().all(is_zero) {
        return RawValue::new(RawValueKind::ZeroInitializer, ty);
    }
    for filler in ["undef", "poison"] {
        if elements.iter().all(|element| element.as_name() == Some(filler)) {
            return RawValue::name(filler, ty);
        }
    }
    let kind = match ty.element() {
        Some(RawType::Integer(width @ (8 | 16 | 32 | 64))) => {
            let ints = elements
                .iter()
                .map(|element| match element.kind {
                    RawValueKind::Int(value) => i64::try_from(value).ok(),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>();
            match ints {
                Some(bytes) if *width == 8 && matches!(ty, RawType::Array { .. }) => {
                    RawValueKind::Bytes(bytes.into_iter().map(|b| b as u8).collect())
                }
                Some(ints) => RawValueKind::IntArray(ints),
                None => RawValueKind::Aggregate(elements),
            }
        }
        Some(RawType::FloatingPoint(kind)) if kind.is_simple() => {
            let floats = elements
                .iter()
                .map(|element| match element.kind {
                    RawValueKind::Float(value) => Some(value),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>();
            match floats {
                Some(floats) => RawValueKind::FloatArray(floats),
                None => RawValueKind::Aggregate(elements),
            }
        }
        _ => RawValueKind::Aggregate(elements),
    };
    RawValue::new(kind, ty)
}

fn is_zero(value: &RawValue) -> bool {
    match &value.kind {
        RawValueKind::Int(v) => *v == 0,
        RawValueKind::Float(v) => v.to_bits() == 0,
        RawValueKind::Null | RawValueKind::ZeroInitializer => true,
        RawValueKind::IntArray(values) => values.iter().all(|v| *v == 0),
        RawValueKind::FloatArray(values) => values.iter().all(|v| v.to_bits() == 0),
        RawValueKind::Bytes(bytes) => bytes.iter().all(|b| *b == 0),
        _ => false,
    }
}

/// Construct a record for an instruction nested inside a constant expression.
pub fn constant_expression(
    name: &str,
    operands: Vec<RawValue>,
    additional: AdditionalData,
    attributes: Vec<RawAttribute>,
    ty: RawType,
    span: Span,
) -> RawValue {
    let opcode = opcode_number(name).unwrap_or_default();
    let record = RawInstruction {
        opcode,
        opcode_name: OPCODE_NAMES[opcode as usize].to_owned(),
        operands,
        additional,
        attributes,
        result: None,
        span,
    };
    RawValue::new(RawValueKind::Expr(Box::new(record)), ty)
}

impl Parser<'_> {
    /// Parse `type value`.
    pub fn parse_typed_value(&mut self) -> ParseResult<RawValue> {
        let ty = self.parse_type()?;
        self.parse_value(ty)
    }

    /// Parse a value of a known type.
    pub fn parse_value(&mut self, ty: RawType) -> ParseResult<RawValue> {
        if ty == RawType::Metadata {
            return self.parse_metadata_operand();
        }
        let start = self.input.position();
        let token = self.eat();
        match token.ty {
            TokenType::LocalIdent(name) => Ok(RawValue::name(local_name(&name), ty)),
            TokenType::GlobalIdent(name) => self.global_reference(&name, token.span),
            TokenType::IntegerLiteral(value) => match &ty {
                RawType::Integer(width) => {
                    let value = sign_extend(value, *width);
                    Ok(RawValue::new(RawValueKind::Int(value), ty))
                }
                RawType::FloatingPoint(_) => {
                    Ok(RawValue::new(RawValueKind::Float(value as f64), ty))
                }
                _ => Err(self.invalid_constant(&ty, token.span)),
            },
            TokenType::FloatLiteral(value) => match &ty {
                RawType::FloatingPoint(FloatingPointKind::Float) => {
                    Ok(RawValue::new(RawValueKind::Float(value as f32 as f64), ty))
                }
                RawType::FloatingPoint(_) => Ok(RawValue::new(RawValueKind::Float(value), ty)),
                _ => Err(self.invalid_constant(&ty, token.span)),
            },
            TokenType::ByteStringLiteral(bytes) => match bytes.iter().all(|b| *b == 0) {
                true => Ok(RawValue::new(RawValueKind::ZeroInitializer, ty)),
                false => Ok(RawValue::new(RawValueKind::Bytes(bytes), ty)),
            },
            TokenType::OpenBracket => {
                let elements = self.parser_combinator_delimited(
                    &TokenType::Comma,
                    &TokenType::CloseBracket,
                    |p| p.parse_typed_value(),
                )?;
                self.check(&TokenType::CloseBracket)?;
                Ok(build_aggregate(ty, elements))
            }
            TokenType::OpenBrace => {
                let elements = self.parser_combinator_delimited(
                    &TokenType::Comma,
                    &TokenType::CloseBrace,
                    |p| p.parse_typed_value(),
                )?;
                self.check(&TokenType::CloseBrace)?;
                Ok(build_aggregate(ty, elements))
            }
            TokenType::OpenAngle => {
                let packed = self.eat_if(&TokenType::OpenBrace).is_some();
                let close = match packed {
                    true => TokenType::CloseBrace,
                    false => TokenType::CloseAngle,
                };
                let elements = self.parser_combinator_delimited(
                    &TokenType::Comma,
                    &close,
                    |p| p.parse_typed_value(),
                )?;
                self.check(&close)?;
                if packed {
                    self.check(&TokenType::CloseAngle)?;
                }
                Ok(build_aggregate(ty, elements))
            }
            TokenType::Word(word) => self.parse_keyword_value(&word, ty, start),
            _ => Err(Self::unexpected(token)),
        }
    }

    fn parse_keyword_value(
        &mut self,
        word: &str,
        ty: RawType,
        start: usize,
    ) -> ParseResult<RawValue> {
        let span = self.input.span_at(start);
        match word {
            "true" => Ok(RawValue::new(RawValueKind::Int(-1), ty)),
            "false" => Ok(RawValue::new(RawValueKind::Int(0), ty)),
            "null" | "none" => Ok(RawValue::new(RawValueKind::Null, ty)),
            "zeroinitializer" => Ok(RawValue::new(RawValueKind::ZeroInitializer, ty)),
            "undef" | "poison" => Ok(RawValue::name(word, ty)),
            "splat" => {
                self.check(&TokenType::OpenParen)?;
                let element = self.parse_typed_value()?;
                self.check(&TokenType::CloseParen)?;
                let count = match &ty {
                    RawType::Vector { count, .. } => *count as usize,
                    _ => return Err(self.invalid_constant(&ty, span)),
                };
                Ok(build_aggregate(ty, vec![element; count]))
            }
            "blockaddress" => {
                self.check(&TokenType::OpenParen)?;
                let token = self.eat();
                let function = match token.ty {
                    TokenType::GlobalIdent(name) => self.global_reference(&name, token.span)?,
                    _ => return Err(Self::unexpected(token)),
                };
                self.check(&TokenType::Comma)?;
                let token = self.eat();
                let block = match token.ty {
                    TokenType::LocalIdent(name) => local_name(&name),
                    _ => return Err(Self::unexpected(token)),
                };
                self.check(&TokenType::CloseParen)?;
                let function = function.as_name().unwrap_or_default().to_owned();
                Ok(RawValue::new(
                    RawValueKind::BlockAddress { function, block },
                    ty,
                ))
            }
            "asm" => self.parse_inline_asm(start),
            "dso_local_equivalent" | "no_cfi" => Err(ParseError::from(UnsupportedSyntaxError {
                what: format!("{} constant", word),
                span,
            })),
            _ => self.parse_constant_expression(word, start),
        }
    }

    /// Parse the remainder of an inline assembly callee, after the `asm` keyword.
    ///
    /// The callee is kept as a name holding its source text, typed as a pointer.
    fn parse_inline_asm(&mut self, start: usize) -> ParseResult<RawValue> {
        while matches!(&self.lookahead().ty, TokenType::Word(_)) {
            self.eat();
        }
        self.expect_string()?;
        self.check(&TokenType::Comma)?;
        self.expect_string()?;
        let text = self.source_text(self.span_since(start));
        Ok(RawValue::name(text, RawType::ptr()))
    }

    /// Parse a metadata operand, kept as a name holding its source text.
    fn parse_metadata_operand(&mut self) -> ParseResult<RawValue> {
        let start = self.input.position();
        loop {
            match &self.lookahead().ty {
                TokenType::Comma | TokenType::CloseParen | TokenType::Eof => break,
                ty if ty.closing_bracket().is_some() => {
                    self.skip_balanced()?;
                }
                _ => {
                    self.eat();
                }
            }
        }
        if self.input.position() == start {
            return Err(Self::unexpected(self.lookahead().clone()));
        }
        let text = self.source_text(self.span_since(start));
        Ok(RawValue::name(text, RawType::Metadata))
    }

    /// Resolve `@name` to a name typed with the global's value type.
    pub fn global_reference(&mut self, name: &str, span: Span) -> ParseResult<RawValue> {
        let name = global_name(name);
        match self.symbols.get(&name) {
            Some(ty) => Ok(RawValue::name(name, ty.clone())),
            None => Err(ParseError::from(UndefinedSymbolError { name, span })),
        }
    }

    fn invalid_constant(&self, ty: &RawType, span: Span) -> ParseError {
        ParseError::from(InvalidTypeForConstantError {
            ty: format!("{:?}", ty),
            span,
        })
    }

    /// Parse a constant expression such as `getelementptr inbounds (i8, ptr @s, i64 1)`, after
    /// its leading keyword.
    fn parse_constant_expression(&mut self, word: &str, start: usize) -> ParseResult<RawValue> {
        let Some(opcode) = opcode_number(word) else {
            let token = Token::new(TokenType::Word(word.to_owned()), self.input.span_at(start));
            return Err(Self::unexpected(token));
        };
        let name = OPCODE_NAMES[opcode as usize];
        match name {
            "getelementptr" => {
                let flags = self.parse_gep_flags()?;
                self.check(&TokenType::OpenParen)?;
                let source = self.parse_type()?;
                self.check(&TokenType::Comma)?;
                let mut operands = vec![self.parse_typed_value()?];
                while self.eat_if(&TokenType::Comma).is_some() {
                    operands.push(self.parse_typed_value()?);
                }
                self.check(&TokenType::CloseParen)?;
                let (result, ty) = gep_types(&source, &operands);
                let additional = AdditionalData::ElementTypes { result, source };
                let span = self.span_since(start);
                Ok(constant_expression(name, operands, additional, flags, ty, span))
            }
            "trunc" | "zext" | "sext" | "fptrunc" | "fpext" | "fptoui" | "fptosi" | "uitofp"
            | "sitofp" | "ptrtoint" | "inttoptr" | "bitcast" | "addrspacecast" => {
                self.check(&TokenType::OpenParen)?;
                let value = self.parse_typed_value()?;
                self.check_word("to")?;
                let ty = self.parse_type()?;
                self.check(&TokenType::CloseParen)?;
                let span = self.span_since(start);
                let attributes = cast_flags(name, &[]);
                Ok(constant_expression(
                    name,
                    vec![value],
                    AdditionalData::None,
                    attributes,
                    ty,
                    span,
                ))
            }
            "icmp" | "fcmp" => {
                let (predicate, _) = self.expect_word()?;
                let operands = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| p.parse_typed_value(),
                )?;
                let ty = RawType::Integer(1).vectorized_like(&operands_type(&operands));
                let span = self.span_since(start);
                let attributes = match name {
                    "fcmp" => vec![fast_math_attribute(vec![])],
                    _ => vec![],
                };
                Ok(constant_expression(
                    name,
                    operands,
                    AdditionalData::Predicate(predicate),
                    attributes,
                    ty,
                    span,
                ))
            }
            "shufflevector" => {
                let mut operands = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| p.parse_typed_value(),
                )?;
                let mask = match operands.pop() {
                    Some(mask) if operands.len() == 2 => mask,
                    _ => {
                        let span = self.span_since(start);
                        return Err(self.invalid_constant(&RawType::Void, span));
                    }
                };
                let ty = shuffle_result_type(&operands[0].ty, &mask.ty);
                let span = self.span_since(start);
                Ok(constant_expression(
                    name,
                    operands,
                    AdditionalData::ShuffleMask(shuffle_mask(&mask)),
                    vec![],
                    ty,
                    span,
                ))
            }
            "extractelement" | "insertelement" | "select" => {
                let operands = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| p.parse_typed_value(),
                )?;
                let ty = match (name, operands.as_slice()) {
                    ("extractelement", [vector, ..]) => {
                        vector.ty.element().cloned().unwrap_or(RawType::Void)
                    }
                    ("select", [_, value, ..]) => value.ty.clone(),
                    (_, [vector, ..]) => vector.ty.clone(),
                    _ => RawType::Void,
                };
                let attributes = match name {
                    "select" => vec![fast_math_attribute(vec![])],
                    _ => vec![],
                };
                let span = self.span_since(start);
                Ok(constant_expression(
                    name,
                    operands,
                    AdditionalData::None,
                    attributes,
                    ty,
                    span,
                ))
            }
            _ => {
                let mut attributes = Vec::new();
                loop {
                    match &self.lookahead().ty {
                        TokenType::Word(flag)
                            if matches!(flag.as_str(), "nuw" | "nsw" | "exact" | "disjoint") =>
                        {
                            attributes.push(RawAttribute::marker(flag));
                            self.eat();
                        }
                        _ => break,
                    }
                }
                let operands = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| p.parse_typed_value(),
                )?;
                if operands.len() != 2 {
                    let span = self.span_since(start);
                    return Err(ParseError::from(UnsupportedSyntaxError {
                        what: format!("{} constant expression", name),
                        span,
                    }));
                }
                let ty = operands[0].ty.clone();
                let span = self.span_since(start);
                Ok(constant_expression(
                    name,
                    operands,
                    AdditionalData::None,
                    attributes,
                    ty,
                    span,
                ))
            }
        }
    }

    /// Parse the `inbounds`, `nusw`, `nuw` and `inrange(start, end)` flags of a GEP.
    pub fn parse_gep_flags(&mut self) -> ParseResult<Vec<RawAttribute>> {
        let mut flags = Vec::new();
        loop {
            if self.eat_if_word("inbounds") {
                flags.push(RawAttribute::marker("inbounds"));
            } else if self.eat_if_word("nusw") {
                flags.push(RawAttribute::marker("nusw"));
            } else if self.eat_if_word("nuw") {
                flags.push(RawAttribute::marker("nuw"));
            } else if self.eat_if_word("inrange") {
                let bounds = self.parser_combinator_bracketed(
                    &TokenType::OpenParen,
                    &TokenType::CloseParen,
                    |p| Ok(RawAttributeValue::Int(p.expect_integer_in()?)),
                )?;
                flags.push(RawAttribute {
                    name: "inrange".to_owned(),
                    values: bounds,
                });
            } else {
                return Ok(flags);
            }
        }
    }
}

/// The type shared by a list of operands, used to shape comparison results.
fn operands_type(operands: &[RawValue]) -> RawType {
    operands
        .first()
        .map(|operand| operand.ty.clone())
        .unwrap_or(RawType::Void)
}

/// Compute the result element type and the result type of a GEP.
///
/// The first index steps over the base pointer, every further index steps into the source
/// element type. The result is a vector of pointers when any operand is a vector.
pub fn gep_types(source: &RawType, operands: &[RawValue]) -> (RawType, RawType) {
    let mut element = source.clone();
    for index in operands.iter().skip(2) {
        let member = match &element {
            RawType::Structure { .. } => index
                .as_int()
                .and_then(|i| u64::try_from(i).ok())
                .and_then(|i| element.member(i))
                .cloned(),
            _ => element.member(0).cloned(),
        };
        element = member.unwrap_or(RawType::Void);
    }
    let address_space = match operands.first().map(|base| &base.ty) {
        Some(RawType::Pointer { address_space }) => *address_space,
        Some(RawType::Vector { element, .. }) => match element.as_ref() {
            RawType::Pointer { address_space } => *address_space,
            _ => 0,
        },
        _ => 0,
    };
    let pointer = RawType::Pointer { address_space };
    let ty = match operands.iter().find(|operand| operand.ty.is_vector()) {
        Some(vector) => pointer.vectorized_like(&vector.ty),
        None => pointer,
    };
    (element, ty)
}

/// Result type of a `shufflevector`: the element type of the inputs, shaped like the mask.
pub fn shuffle_result_type(input: &RawType, mask: &RawType) -> RawType {
    let element = input.element().cloned().unwrap_or(RawType::Void);
    element.vectorized_like(mask)
}

/// Decode a shuffle mask constant. `undef` and `poison` lanes become `-1`.
pub fn shuffle_mask(mask: &RawValue) -> Vec<i32> {
    let count = match &mask.ty {
        RawType::Vector { count, .. } => *count as usize,
        _ => 0,
    };
    match &mask.kind {
        RawValueKind::ZeroInitializer => vec![0; count],
        RawValueKind::IntArray(values) => values
            .iter()
            .map(|v| i32::try_from(*v).unwrap_or(-1))
            .collect(),
        RawValueKind::Aggregate(values) => values
            .iter()
            .map(|v| match v.kind {
                RawValueKind::Int(i) => i32::try_from(i).unwrap_or(-1),
                _ => -1,
            })
            .collect(),
        _ => vec![-1; count],
    }
}

/// The fast-math flag attribute, carried even when no flag is set.
pub fn fast_math_attribute(flags: Vec<String>) -> RawAttribute {
    RawAttribute::with_value("fmf", RawAttributeValue::Strings(flags))
}

/// Flag attributes of a conversion, from the flags written after its keyword.
pub fn cast_flags(name: &str, written: &[String]) -> Vec<RawAttribute> {
    let mut attributes = Vec::new();
    match name {
        "fptrunc" | "fpext" => attributes.push(fast_math_attribute(canonical_fast_math(written))),
        "trunc" => {
            for flag in ["nuw", "nsw"] {
                if written.iter().any(|w| w == flag) {
                    attributes.push(RawAttribute::marker(flag));
                }
            }
        }
        "zext" | "uitofp" if written.iter().any(|w| w == "nneg") => {
            attributes.push(RawAttribute::marker("nneg"))
        }
        _ => {}
    }
    attributes
}

const FAST_MATH_FLAGS: [&str; 7] = ["reassoc", "nnan", "ninf", "nsz", "arcp", "contract", "afn"];

pub fn is_fast_math_flag(word: &str) -> bool {
    word == "fast" || FAST_MATH_FLAGS.contains(&word)
}

/// Order written fast-math flags canonically, expanding `fast` into every flag.
pub fn canonical_fast_math(written: &[String]) -> Vec<String> {
    let fast = written.iter().any(|w| w == "fast");
    FAST_MATH_FLAGS
        .iter()
        .filter(|flag| fast || written.iter().any(|w| w == *flag))
        .map(|flag| flag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::parser::value::{build_aggregate, canonical_fast_math, shuffle_mask};
    use crate::parser::Parser;
    use crate::{Lexer, RawType, RawValue, RawValueKind};

    fn parse_typed_value(source: &str) -> RawValue {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(source, tokens);
        parser.parse_typed_value().unwrap()
    }

    #[test]
    fn test_integer_constants_are_sign_extended() {
        assert_eq!(parse_typed_value("i1 true").kind, RawValueKind::Int(-1));
        assert_eq!(parse_typed_value("i8 255").kind, RawValueKind::Int(-1));
        assert_eq!(parse_typed_value("i32 1").kind, RawValueKind::Int(1));
    }

    #[test]
    fn test_wide_integer_constants_are_exact() {
        assert_eq!(
            parse_typed_value("i128 170141183460469231731687303715884105727").kind,
            RawValueKind::Int(i128::MAX)
        );
        assert_eq!(
            parse_typed_value("i128 -18446744073709551616").kind,
            RawValueKind::Int(-(1 << 64))
        );
        assert_eq!(
            parse_typed_value("i96 39614081257132168796771975167").kind,
            RawValueKind::Int(-1)
        );
        assert_eq!(
            parse_typed_value("i256 12345678901234567890123").kind,
            RawValueKind::Int(12345678901234567890123)
        );
    }

    #[test]
    fn test_locals_keep_slot_sigils() {
        assert_eq!(parse_typed_value("i32 %5").kind, RawValueKind::Name("%5".to_owned()));
        assert_eq!(parse_typed_value("i32 %x").kind, RawValueKind::Name("x".to_owned()));
        assert_eq!(
            parse_typed_value("i32 undef").kind,
            RawValueKind::Name("undef".to_owned())
        );
    }

    #[test]
    fn test_aggregates_are_canonicalized() {
        assert_eq!(
            parse_typed_value("[2 x i32] [i32 0, i32 0]").kind,
            RawValueKind::ZeroInitializer
        );
        assert_eq!(
            parse_typed_value("[2 x i32] [i32 1, i32 2]").kind,
            RawValueKind::IntArray(vec![1, 2])
        );
        assert_eq!(
            parse_typed_value("[3 x i8] c\"hi\\00\"").kind,
            RawValueKind::Bytes(vec![b'h', b'i', 0])
        );
        assert_eq!(
            parse_typed_value("<2 x double> <double 1.0, double 2.5>").kind,
            RawValueKind::FloatArray(vec![1.0, 2.5])
        );
        assert!(matches!(
            parse_typed_value("{ i32, ptr } { i32 1, ptr null }").kind,
            RawValueKind::Aggregate(ref elements) if elements.len() == 2
        ));
    }

    #[test]
    fn test_splat_and_mask() {
        let splat = parse_typed_value("<4 x i32> splat (i32 7)");
        assert_eq!(splat.kind, RawValueKind::IntArray(vec![7, 7, 7, 7]));
        let mask = parse_typed_value("<2 x i32> <i32 1, i32 poison>");
        assert_eq!(shuffle_mask(&mask), vec![1, -1]);
    }

    #[test]
    fn test_all_undef_aggregate_collapses() {
        let ty = RawType::Array {
            count: 2,
            element: Box::new(RawType::Integer(32)),
        };
        let elements = vec![RawValue::name("undef", RawType::Integer(32)); 2];
        assert_eq!(build_aggregate(ty, elements).as_name(), Some("undef"));
    }

    #[test]
    fn test_fast_math_canonical_order() {
        let written = vec!["nsz".to_owned(), "nnan".to_owned()];
        assert_eq!(canonical_fast_math(&written), vec!["nnan", "nsz"]);
        assert_eq!(canonical_fast_math(&["fast".to_owned()]).len(), 7);
    }
}
