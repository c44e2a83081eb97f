use crate::parser::attribute::trim_attribute_layers;
use crate::parser::value::{
    canonical_fast_math, cast_flags, fast_math_attribute, gep_types, is_fast_math_flag,
    shuffle_mask, shuffle_result_type,
};
use crate::parser::Parser;
use crate::{
    calling_convention, opcode_number, ordering, AdditionalData, ParseError, ParseResult,
    RawAttribute, RawAttributeValue, RawInstruction, RawType, RawValue, RawValueKind, TokenType,
    UnknownInstructionError, OPCODE_NAMES, SYNC_SCOPE_SINGLE_THREAD, SYNC_SCOPE_SYSTEM,
};

/// The pieces of an instruction record, before the record is named.
struct InstructionParts {
    operands: Vec<RawValue>,
    additional: AdditionalData,
    attributes: Vec<RawAttribute>,
    /// Type of the value produced by the instruction.
    ty: RawType,
}

impl InstructionParts {
    fn new(operands: Vec<RawValue>, ty: RawType) -> Self {
        Self {
            operands,
            additional: AdditionalData::None,
            attributes: vec![],
            ty,
        }
    }

    fn with_additional(mut self, additional: AdditionalData) -> Self {
        self.additional = additional;
        self
    }

    fn with_attributes(mut self, attributes: Vec<RawAttribute>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Memory access modifiers shared by load, store, cmpxchg, atomicrmw and fence.
#[derive(Default)]
struct MemoryAccess {
    is_volatile: bool,
    is_atomic: bool,
    align: Option<i64>,
    sync_scope: Option<RawAttributeValue>,
    ordering: u32,
}

impl MemoryAccess {
    fn volatile_attribute(&self, attributes: &mut Vec<RawAttribute>) {
        if self.is_volatile {
            attributes.push(RawAttribute::marker("volatile"));
        }
    }

    fn align_attribute(&self, attributes: &mut Vec<RawAttribute>) {
        if let Some(align) = self.align {
            attributes.push(RawAttribute::with_value("align", RawAttributeValue::Int(align)));
        }
    }

    fn sync_scope_attribute(&self, attributes: &mut Vec<RawAttribute>) {
        let scope = self
            .sync_scope
            .clone()
            .unwrap_or(RawAttributeValue::Int(SYNC_SCOPE_SYSTEM));
        attributes.push(RawAttribute::with_value("syncscope", scope));
    }

    fn ordering_attribute(&self, attributes: &mut Vec<RawAttribute>) {
        attributes.push(RawAttribute::with_value(
            "ordering",
            RawAttributeValue::Int(self.ordering as i64),
        ));
    }
}

impl Parser<'_> {
    /// Parse an instruction, starting at its keyword, and return it with the type of the value it
    /// produces.
    ///
    /// Trailing metadata attachments are skipped. The returned record has no result yet.
    pub fn parse_instruction(&mut self) -> ParseResult<(RawInstruction, RawType)> {
        let start = self.input.position();
        let tail_kind = match &self.lookahead().ty {
            TokenType::Word(word) if matches!(word.as_str(), "tail" | "musttail" | "notail") => {
                Some(self.expect_word()?.0)
            }
            _ => None,
        };
        let (keyword, span) = self.expect_word()?;
        let opcode = match opcode_number(&keyword) {
            Some(opcode) if !matches!(keyword.as_str(), "userop1" | "userop2") => opcode,
            _ => {
                return Err(ParseError::from(UnknownInstructionError {
                    name: keyword,
                    span,
                }))
            }
        };
        let parts = match keyword.as_str() {
            "ret" => self.parse_ret()?,
            "br" => self.parse_br()?,
            "switch" => self.parse_switch()?,
            "indirectbr" => self.parse_indirect_br()?,
            "invoke" | "callbr" | "call" => self.parse_call(&keyword, tail_kind)?,
            "resume" => InstructionParts::new(vec![self.parse_typed_value()?], RawType::Void),
            "unreachable" => InstructionParts::new(vec![], RawType::Void),
            "cleanupret" => self.parse_cleanup_ret()?,
            "catchret" => self.parse_catch_ret()?,
            "catchswitch" => self.parse_catch_switch()?,
            "cleanuppad" | "catchpad" => self.parse_pad()?,
            "fneg" => {
                let flags = self.parse_fast_math_flags();
                let value = self.parse_typed_value()?;
                let ty = value.ty.clone();
                InstructionParts::new(vec![value], ty)
                    .with_attributes(vec![fast_math_attribute(flags)])
            }
            "alloca" => self.parse_alloca()?,
            "load" => self.parse_load()?,
            "store" => self.parse_store()?,
            "getelementptr" => self.parse_get_element_ptr()?,
            "fence" => self.parse_fence()?,
            "cmpxchg" => self.parse_cmpxchg()?,
            "atomicrmw" => self.parse_atomic_rmw()?,
            "icmp" | "fcmp" => self.parse_compare(&keyword)?,
            "phi" => self.parse_phi()?,
            "select" => {
                let flags = self.parse_fast_math_flags();
                let operands = self.parse_typed_values(3)?;
                let ty = operands[1].ty.clone();
                InstructionParts::new(operands, ty)
                    .with_attributes(vec![fast_math_attribute(flags)])
            }
            "va_arg" => {
                let list = self.parse_typed_value()?;
                self.check(&TokenType::Comma)?;
                let ty = self.parse_type()?;
                InstructionParts::new(vec![list], ty)
            }
            "extractelement" => {
                let operands = self.parse_typed_values(2)?;
                let ty = operands[0].ty.element().cloned().unwrap_or(RawType::Void);
                InstructionParts::new(operands, ty)
            }
            "insertelement" => {
                let operands = self.parse_typed_values(3)?;
                let ty = operands[0].ty.clone();
                InstructionParts::new(operands, ty)
            }
            "shufflevector" => {
                let mut operands = self.parse_typed_values(3)?;
                let mask = operands.remove(2);
                let ty = shuffle_result_type(&operands[0].ty, &mask.ty);
                InstructionParts::new(operands, ty)
                    .with_additional(AdditionalData::ShuffleMask(shuffle_mask(&mask)))
            }
            "extractvalue" => {
                let aggregate = self.parse_typed_value()?;
                let indices = self.parse_aggregate_indices()?;
                let mut ty = aggregate.ty.clone();
                for index in &indices {
                    ty = ty.member(*index as u64).cloned().unwrap_or(RawType::Void);
                }
                InstructionParts::new(vec![aggregate], ty)
                    .with_additional(AdditionalData::Indices(indices))
            }
            "insertvalue" => {
                let operands = self.parse_typed_values(2)?;
                let indices = self.parse_aggregate_indices()?;
                let ty = operands[0].ty.clone();
                InstructionParts::new(operands, ty)
                    .with_additional(AdditionalData::Indices(indices))
            }
            "landingpad" => self.parse_landing_pad()?,
            "freeze" => {
                let value = self.parse_typed_value()?;
                let ty = value.ty.clone();
                InstructionParts::new(vec![value], ty)
            }
            name => self.parse_arithmetic(name)?,
        };
        self.skip_metadata_attachments()?;
        let record = RawInstruction {
            opcode,
            opcode_name: OPCODE_NAMES[opcode as usize].to_owned(),
            operands: parts.operands,
            additional: parts.additional,
            attributes: parts.attributes,
            result: None,
            span: self.span_since(start),
        };
        Ok((record, parts.ty))
    }

    /// Parse binary operators and conversions, which share their flag syntax.
    fn parse_arithmetic(&mut self, name: &str) -> ParseResult<InstructionParts> {
        let mut written = Vec::new();
        loop {
            match &self.lookahead().ty {
                TokenType::Word(word)
                    if is_fast_math_flag(word)
                        || matches!(
                            word.as_str(),
                            "nuw" | "nsw" | "exact" | "disjoint" | "nneg"
                        ) =>
                {
                    written.push(self.expect_word()?.0);
                }
                _ => break,
            }
        }
        let value = self.parse_typed_value()?;
        if self.eat_if_word("to") {
            let ty = self.parse_type()?;
            let attributes = cast_flags(name, &written);
            return Ok(InstructionParts::new(vec![value], ty).with_attributes(attributes));
        }
        self.check(&TokenType::Comma)?;
        let ty = value.ty.clone();
        let rhs = self.parse_value(ty.clone())?;
        let mut attributes = Vec::new();
        match name {
            "add" | "sub" | "mul" | "shl" => {
                for flag in ["nuw", "nsw"] {
                    if written.iter().any(|w| w == flag) {
                        attributes.push(RawAttribute::marker(flag));
                    }
                }
            }
            "udiv" | "sdiv" | "lshr" | "ashr" if written.iter().any(|w| w == "exact") => {
                attributes.push(RawAttribute::marker("exact"));
            }
            "or" if written.iter().any(|w| w == "disjoint") => {
                attributes.push(RawAttribute::marker("disjoint"));
            }
            "fadd" | "fsub" | "fmul" | "fdiv" | "frem" => {
                attributes.push(fast_math_attribute(canonical_fast_math(&written)));
            }
            _ => {}
        }
        Ok(InstructionParts::new(vec![value, rhs], ty).with_attributes(attributes))
    }

    fn parse_ret(&mut self) -> ParseResult<InstructionParts> {
        if self.eat_if_word("void") {
            return Ok(InstructionParts::new(vec![], RawType::Void));
        }
        let value = self.parse_typed_value()?;
        Ok(InstructionParts::new(vec![value], RawType::Void))
    }

    /// Parse a branch. A conditional branch lists its false destination before its true
    /// destination in the operand list.
    fn parse_br(&mut self) -> ParseResult<InstructionParts> {
        if self.lookahead_word("label") {
            let destination = self.parse_typed_value()?;
            return Ok(InstructionParts::new(vec![destination], RawType::Void));
        }
        let condition = self.parse_typed_value()?;
        self.check(&TokenType::Comma)?;
        let label_true = self.parse_typed_value()?;
        self.check(&TokenType::Comma)?;
        let label_false = self.parse_typed_value()?;
        Ok(InstructionParts::new(
            vec![condition, label_false, label_true],
            RawType::Void,
        ))
    }

    fn parse_switch(&mut self) -> ParseResult<InstructionParts> {
        let mut operands = self.parse_typed_values(2)?;
        self.check(&TokenType::OpenBracket)?;
        while self.eat_if(&TokenType::CloseBracket).is_none() {
            operands.push(self.parse_typed_value()?);
            self.check(&TokenType::Comma)?;
            operands.push(self.parse_typed_value()?);
        }
        Ok(InstructionParts::new(operands, RawType::Void))
    }

    fn parse_indirect_br(&mut self) -> ParseResult<InstructionParts> {
        let mut operands = vec![self.parse_typed_value()?];
        self.check(&TokenType::Comma)?;
        operands.extend(self.parser_combinator_bracketed(
            &TokenType::OpenBracket,
            &TokenType::CloseBracket,
            |p| p.parse_typed_value(),
        )?);
        Ok(InstructionParts::new(operands, RawType::Void))
    }

    /// Parse `call`, `invoke` and `callbr`, after the keyword.
    ///
    /// The callee is the last operand. Invoke places its normal and unwind destinations before
    /// the callee, and callbr places its fallthrough and indirect destinations there.
    fn parse_call(
        &mut self,
        keyword: &str,
        tail_kind: Option<String>,
    ) -> ParseResult<InstructionParts> {
        let flags = self.parse_fast_math_flags();
        let convention = self.parse_calling_convention()?.unwrap_or(0);
        let ret_attributes = self.parse_parameter_attributes()?;
        if self.eat_if_word("addrspace") {
            self.parenthesized_integer::<u32>()?;
        }
        let ty = match self.parse_type()? {
            RawType::Function { ret, .. } => *ret,
            ty => ty,
        };
        let callee = self.parse_value(RawType::ptr())?;
        self.check(&TokenType::OpenParen)?;
        let mut operands = Vec::new();
        let mut layers = vec![vec![], ret_attributes];
        while self.eat_if(&TokenType::CloseParen).is_none() {
            if !operands.is_empty() {
                self.check(&TokenType::Comma)?;
            }
            if self.eat_if(&TokenType::Ellipsis).is_some() {
                continue;
            }
            let arg_ty = self.parse_type()?;
            layers.push(self.parse_parameter_attributes()?);
            operands.push(self.parse_value(arg_ty)?);
        }
        layers[0] = self.parse_function_attribute_list()?;
        if self.lookahead_check(&TokenType::OpenBracket) {
            // Operand bundles.
            self.skip_balanced()?;
        }
        let attributes = trim_attribute_layers(layers);
        let additional = match keyword {
            "invoke" => {
                self.check_word("to")?;
                operands.push(self.parse_typed_value()?);
                self.check_word("unwind")?;
                operands.push(self.parse_typed_value()?);
                AdditionalData::Call {
                    calling_convention: convention,
                    attributes,
                }
            }
            "callbr" => {
                self.check_word("to")?;
                operands.push(self.parse_typed_value()?);
                let indirect = self.parser_combinator_bracketed(
                    &TokenType::OpenBracket,
                    &TokenType::CloseBracket,
                    |p| p.parse_typed_value(),
                )?;
                let indirect_destinations = indirect.len();
                operands.extend(indirect);
                AdditionalData::CallBr {
                    calling_convention: convention,
                    attributes,
                    indirect_destinations,
                }
            }
            _ => AdditionalData::Call {
                calling_convention: convention,
                attributes,
            },
        };
        operands.push(callee);
        let mut instruction_attributes = Vec::new();
        if keyword == "call" {
            instruction_attributes.push(fast_math_attribute(flags));
            let tail_kind = match tail_kind {
                Some(kind) => RawAttributeValue::Str(kind),
                None => RawAttributeValue::None,
            };
            instruction_attributes.push(RawAttribute::with_value("tailkind", tail_kind));
        }
        Ok(InstructionParts::new(operands, ty)
            .with_additional(additional)
            .with_attributes(instruction_attributes))
    }

    /// Parse a calling convention keyword or `cc N`, if present.
    pub fn parse_calling_convention(&mut self) -> ParseResult<Option<u32>> {
        let code = match &self.lookahead().ty {
            TokenType::Word(word) if word == "cc" => {
                self.eat();
                self.expect_integer_in::<u32>()?
            }
            TokenType::Word(word) => match calling_convention(word) {
                Some(code) => {
                    self.eat();
                    code
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(code))
    }

    /// Parse function attributes following a parameter list, expanding attribute groups.
    pub fn parse_function_attribute_list(&mut self) -> ParseResult<Vec<RawAttribute>> {
        let mut attributes = Vec::new();
        loop {
            match self.lookahead().ty {
                TokenType::AttributeGroup(id) => {
                    let token = self.eat();
                    attributes.extend(self.attribute_group(&token, id)?);
                }
                _ => match self.parse_attribute()? {
                    Some(attribute) => attributes.push(attribute),
                    None => return Ok(attributes),
                },
            }
        }
    }

    fn parse_cleanup_ret(&mut self) -> ParseResult<InstructionParts> {
        self.check_word("from")?;
        let mut operands = vec![self.parse_value(RawType::Token)?];
        self.check_word("unwind")?;
        if let Some(unwind) = self.parse_unwind_destination()? {
            operands.push(unwind);
        }
        Ok(InstructionParts::new(operands, RawType::Void))
    }

    /// Parse `to caller` or `label %dest`.
    fn parse_unwind_destination(&mut self) -> ParseResult<Option<RawValue>> {
        if self.eat_if_word("to") {
            self.check_word("caller")?;
            return Ok(None);
        }
        Ok(Some(self.parse_typed_value()?))
    }

    fn parse_catch_ret(&mut self) -> ParseResult<InstructionParts> {
        self.check_word("from")?;
        let pad = self.parse_value(RawType::Token)?;
        self.check_word("to")?;
        let successor = self.parse_typed_value()?;
        Ok(InstructionParts::new(vec![pad, successor], RawType::Void))
    }

    /// Parse a catchswitch. The unwind destination, when present, precedes the handlers.
    fn parse_catch_switch(&mut self) -> ParseResult<InstructionParts> {
        self.check_word("within")?;
        let parent = self.parse_value(RawType::Token)?;
        let handlers = self.parser_combinator_bracketed(
            &TokenType::OpenBracket,
            &TokenType::CloseBracket,
            |p| p.parse_typed_value(),
        )?;
        self.check_word("unwind")?;
        let unwind = self.parse_unwind_destination()?;
        let has_unwind_destination = unwind.is_some();
        let mut operands = vec![parent];
        operands.extend(unwind);
        operands.extend(handlers);
        Ok(InstructionParts::new(operands, RawType::Token)
            .with_additional(AdditionalData::CatchSwitch {
                has_unwind_destination,
            }))
    }

    /// Parse `cleanuppad` or `catchpad`. The parent pad follows the arguments.
    fn parse_pad(&mut self) -> ParseResult<InstructionParts> {
        self.check_word("within")?;
        let parent = self.parse_value(RawType::Token)?;
        let mut operands = self.parser_combinator_bracketed(
            &TokenType::OpenBracket,
            &TokenType::CloseBracket,
            |p| p.parse_typed_value(),
        )?;
        operands.push(parent);
        Ok(InstructionParts::new(operands, RawType::Token))
    }

    fn parse_alloca(&mut self) -> ParseResult<InstructionParts> {
        let is_inalloca = self.eat_if_word("inalloca");
        let allocated = self.parse_type()?;
        let mut count = RawValue::new(RawValueKind::Int(1), RawType::Integer(32));
        let mut align = None;
        let mut address_space = 0;
        while self.eat_comma_before_operand() {
            if self.eat_if_word("align") {
                align = Some(self.expect_integer_in()?);
            } else if self.eat_if_word("addrspace") {
                address_space = self.parenthesized_integer()?;
            } else {
                count = self.parse_typed_value()?;
            }
        }
        let mut attributes = Vec::new();
        if let Some(align) = align {
            attributes.push(RawAttribute::with_value("align", RawAttributeValue::Int(align)));
        }
        if is_inalloca {
            attributes.push(RawAttribute::marker("inalloca"));
        }
        Ok(InstructionParts::new(vec![count], RawType::Pointer { address_space })
            .with_additional(AdditionalData::AllocatedType(allocated))
            .with_attributes(attributes))
    }

    fn parse_load(&mut self) -> ParseResult<InstructionParts> {
        let mut access = MemoryAccess {
            is_atomic: self.eat_if_word("atomic"),
            is_volatile: self.eat_if_word("volatile"),
            ..Default::default()
        };
        let ty = self.parse_type()?;
        self.check(&TokenType::Comma)?;
        let address = self.parse_typed_value()?;
        self.parse_atomic_suffix(&mut access)?;
        Ok(InstructionParts::new(vec![address], ty).with_attributes(access.load_store_attributes()))
    }

    fn parse_store(&mut self) -> ParseResult<InstructionParts> {
        let mut access = MemoryAccess {
            is_atomic: self.eat_if_word("atomic"),
            is_volatile: self.eat_if_word("volatile"),
            ..Default::default()
        };
        let operands = self.parse_typed_values(2)?;
        self.parse_atomic_suffix(&mut access)?;
        Ok(InstructionParts::new(operands, RawType::Void)
            .with_attributes(access.load_store_attributes()))
    }

    /// Parse the `syncscope(...) ordering` of an atomic access and its `, align N`.
    fn parse_atomic_suffix(&mut self, access: &mut MemoryAccess) -> ParseResult<()> {
        if access.is_atomic {
            access.sync_scope = self.parse_sync_scope()?;
            access.ordering = self.parse_ordering()?;
        }
        access.align = self.parse_trailing_align()?;
        Ok(())
    }

    fn parse_trailing_align(&mut self) -> ParseResult<Option<i64>> {
        if self.lookahead_check(&TokenType::Comma) && self.lookahead_nth(1).ty.is_word("align") {
            self.eat();
            self.eat();
            return Ok(Some(self.expect_integer_in()?));
        }
        Ok(None)
    }

    fn parse_sync_scope(&mut self) -> ParseResult<Option<RawAttributeValue>> {
        if !self.eat_if_word("syncscope") {
            return Ok(None);
        }
        self.check(&TokenType::OpenParen)?;
        let scope = self.expect_string()?;
        self.check(&TokenType::CloseParen)?;
        let value = match scope.as_str() {
            "singlethread" => RawAttributeValue::Int(SYNC_SCOPE_SINGLE_THREAD),
            _ => RawAttributeValue::Str(scope),
        };
        Ok(Some(value))
    }

    fn parse_ordering(&mut self) -> ParseResult<u32> {
        let (word, span) = self.expect_word()?;
        match ordering(&word) {
            Some(code) => Ok(code),
            None => Err(Self::unexpected(crate::Token::new(TokenType::Word(word), span))),
        }
    }

    fn parse_get_element_ptr(&mut self) -> ParseResult<InstructionParts> {
        let flags = self.parse_gep_flags()?;
        let source = self.parse_type()?;
        self.check(&TokenType::Comma)?;
        let mut operands = vec![self.parse_typed_value()?];
        while self.eat_comma_before_operand() {
            operands.push(self.parse_typed_value()?);
        }
        let (result, ty) = gep_types(&source, &operands);
        Ok(InstructionParts::new(operands, ty)
            .with_additional(AdditionalData::ElementTypes { result, source })
            .with_attributes(flags))
    }

    fn parse_fence(&mut self) -> ParseResult<InstructionParts> {
        let access = MemoryAccess {
            sync_scope: self.parse_sync_scope()?,
            ordering: self.parse_ordering()?,
            ..Default::default()
        };
        let mut attributes = Vec::new();
        access.sync_scope_attribute(&mut attributes);
        access.ordering_attribute(&mut attributes);
        Ok(InstructionParts::new(vec![], RawType::Void).with_attributes(attributes))
    }

    fn parse_cmpxchg(&mut self) -> ParseResult<InstructionParts> {
        let is_weak = self.eat_if_word("weak");
        let mut access = MemoryAccess {
            is_volatile: self.eat_if_word("volatile"),
            ..Default::default()
        };
        let operands = self.parse_typed_values(3)?;
        access.sync_scope = self.parse_sync_scope()?;
        let success = self.parse_ordering()?;
        let failure = self.parse_ordering()?;
        access.align = self.parse_trailing_align()?;
        let mut attributes = Vec::new();
        access.volatile_attribute(&mut attributes);
        access.align_attribute(&mut attributes);
        access.sync_scope_attribute(&mut attributes);
        if is_weak {
            attributes.push(RawAttribute::marker("weak"));
        }
        let ty = RawType::Structure {
            name: None,
            elements: vec![operands[1].ty.clone(), RawType::Integer(1)],
            is_packed: false,
        };
        Ok(InstructionParts::new(operands, ty)
            .with_additional(AdditionalData::CmpXchgOrderings { success, failure })
            .with_attributes(attributes))
    }

    fn parse_atomic_rmw(&mut self) -> ParseResult<InstructionParts> {
        let mut access = MemoryAccess {
            is_volatile: self.eat_if_word("volatile"),
            ..Default::default()
        };
        let (operation, _) = self.expect_word()?;
        let operands = self.parse_typed_values(2)?;
        access.sync_scope = self.parse_sync_scope()?;
        access.ordering = self.parse_ordering()?;
        access.align = self.parse_trailing_align()?;
        let mut attributes = Vec::new();
        access.volatile_attribute(&mut attributes);
        access.align_attribute(&mut attributes);
        access.sync_scope_attribute(&mut attributes);
        access.ordering_attribute(&mut attributes);
        let ty = operands[1].ty.clone();
        Ok(InstructionParts::new(operands, ty)
            .with_additional(AdditionalData::AtomicOperation(operation))
            .with_attributes(attributes))
    }

    fn parse_compare(&mut self, keyword: &str) -> ParseResult<InstructionParts> {
        let same_sign = self.eat_if_word("samesign");
        let flags = self.parse_fast_math_flags();
        let (predicate, _) = self.expect_word()?;
        let lhs = self.parse_typed_value()?;
        self.check(&TokenType::Comma)?;
        let rhs = self.parse_value(lhs.ty.clone())?;
        let ty = RawType::Integer(1).vectorized_like(&lhs.ty);
        let attributes = match keyword {
            "fcmp" => vec![fast_math_attribute(flags)],
            _ if same_sign => vec![RawAttribute::marker("samesign")],
            _ => vec![],
        };
        Ok(InstructionParts::new(vec![lhs, rhs], ty)
            .with_additional(AdditionalData::Predicate(predicate))
            .with_attributes(attributes))
    }

    /// Parse a phi node. Incoming values become operands, incoming blocks additional data.
    fn parse_phi(&mut self) -> ParseResult<InstructionParts> {
        let flags = self.parse_fast_math_flags();
        let ty = self.parse_type()?;
        let mut values = Vec::new();
        let mut blocks = Vec::new();
        loop {
            self.check(&TokenType::OpenBracket)?;
            values.push(self.parse_value(ty.clone())?);
            self.check(&TokenType::Comma)?;
            blocks.push(self.parse_value(RawType::Label)?);
            self.check(&TokenType::CloseBracket)?;
            if !self.eat_comma_before_operand() {
                break;
            }
        }
        Ok(InstructionParts::new(values, ty)
            .with_additional(AdditionalData::IncomingBlocks(blocks))
            .with_attributes(vec![fast_math_attribute(flags)]))
    }

    fn parse_landing_pad(&mut self) -> ParseResult<InstructionParts> {
        let ty = self.parse_type()?;
        let is_cleanup = self.eat_if_word("cleanup");
        let mut clauses = Vec::new();
        let mut is_catch = Vec::new();
        loop {
            if self.eat_if_word("catch") {
                is_catch.push(true);
            } else if self.eat_if_word("filter") {
                is_catch.push(false);
            } else {
                break;
            }
            clauses.push(self.parse_typed_value()?);
        }
        Ok(InstructionParts::new(clauses, ty)
            .with_additional(AdditionalData::LandingPad {
                is_cleanup,
                is_catch,
            }))
    }

    /// Parse `n` comma separated typed values.
    fn parse_typed_values(&mut self, n: usize) -> ParseResult<Vec<RawValue>> {
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            if i > 0 {
                self.check(&TokenType::Comma)?;
            }
            values.push(self.parse_typed_value()?);
        }
        Ok(values)
    }

    /// Parse the constant `, N` indices of extractvalue and insertvalue.
    fn parse_aggregate_indices(&mut self) -> ParseResult<Vec<u32>> {
        let mut indices = Vec::new();
        while self.eat_comma_before_operand() {
            indices.push(self.expect_integer_in()?);
        }
        Ok(indices)
    }

    fn parse_fast_math_flags(&mut self) -> Vec<String> {
        let mut written = Vec::new();
        while let TokenType::Word(word) = &self.lookahead().ty {
            if !is_fast_math_flag(word) {
                break;
            }
            written.push(word.clone());
            self.eat();
        }
        canonical_fast_math(&written)
    }

    /// Consume a comma that separates operands, leaving a comma that starts a metadata
    /// attachment in place.
    fn eat_comma_before_operand(&mut self) -> bool {
        if self.lookahead_check(&TokenType::Comma)
            && !matches!(self.lookahead_nth(1).ty, TokenType::MetadataRef(_))
        {
            self.eat();
            return true;
        }
        false
    }

    /// Skip `, !name !node` attachments trailing an instruction.
    pub fn skip_metadata_attachments(&mut self) -> ParseResult<()> {
        while self.lookahead_check(&TokenType::Comma)
            && matches!(self.lookahead_nth(1).ty, TokenType::MetadataRef(_))
        {
            self.eat();
            self.eat();
            self.skip_metadata_node()?;
        }
        Ok(())
    }

    /// Skip a metadata node reference or an inline node such as `!{}` or `!DILocation(...)`.
    pub fn skip_metadata_node(&mut self) -> ParseResult<()> {
        self.eat_if_word("distinct");
        let token = self.eat();
        match token.ty {
            TokenType::MetadataRef(_) | TokenType::Bang => {
                if self.lookahead().ty.closing_bracket().is_some() {
                    self.skip_balanced()?;
                }
                Ok(())
            }
            TokenType::MetadataString(_) => Ok(()),
            _ => Err(Self::unexpected(token)),
        }
    }
}

impl MemoryAccess {
    fn load_store_attributes(&self) -> Vec<RawAttribute> {
        let mut attributes = Vec::new();
        self.volatile_attribute(&mut attributes);
        self.align_attribute(&mut attributes);
        self.sync_scope_attribute(&mut attributes);
        self.ordering_attribute(&mut attributes);
        if self.is_atomic {
            attributes.push(RawAttribute::marker("atomic"));
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::{
        AdditionalData, Lexer, ParseError, ParseResult, RawAttribute, RawAttributeValue,
        RawInstruction, RawType, RawValue, RawValueKind,
    };
    use llir_macros::{assert_err, assert_matches, assert_ok};

    fn parse_with_symbols(
        source: &str,
        symbols: &[(&str, RawType)],
    ) -> ParseResult<(RawInstruction, RawType)> {
        let tokens = assert_ok!(Lexer::new(source).tokenize());
        let mut parser = Parser::new(source, tokens);
        for (name, ty) in symbols {
            parser.symbols.insert(name.to_string(), ty.clone());
        }
        parser.parse_instruction()
    }

    fn parse(source: &str) -> (RawInstruction, RawType) {
        assert_ok!(parse_with_symbols(source, &[]))
    }

    fn function_ty(parameters: Vec<RawType>, ret: RawType) -> RawType {
        RawType::Function {
            parameters,
            ret: Box::new(ret),
            is_vararg: false,
        }
    }

    #[test]
    fn test_arithmetic_flags_become_markers() {
        let (add, ty) = parse("add nuw nsw i32 %a, 1");
        assert_eq!(add.opcode_name, "add");
        assert_eq!(ty, RawType::Integer(32));
        assert_eq!(
            add.attributes,
            vec![RawAttribute::marker("nuw"), RawAttribute::marker("nsw")]
        );
        assert_eq!(
            add.operands,
            vec![
                RawValue::name("a", RawType::Integer(32)),
                RawValue::new(RawValueKind::Int(1), RawType::Integer(32)),
            ]
        );

        let (or, _) = parse("or disjoint i8 %x, %y");
        assert_eq!(or.attributes, vec![RawAttribute::marker("disjoint")]);
        let (zext, ty) = parse("zext nneg i8 %b to i32");
        assert_eq!(zext.attributes, vec![RawAttribute::marker("nneg")]);
        assert_eq!(ty, RawType::Integer(32));
    }

    #[test]
    fn test_fast_math_flags_are_expanded() {
        let (fadd, _) = parse("fadd fast float %x, %y");
        let attribute = assert_matches!(&fadd.attributes[..], [attribute] => attribute);
        assert_eq!(attribute.name, "fmf");
        let flags = assert_matches!(
            &attribute.values[..],
            [RawAttributeValue::Strings(flags)] => flags.clone()
        );
        assert_eq!(
            flags,
            vec!["reassoc", "nnan", "ninf", "nsz", "arcp", "contract", "afn"]
        );
    }

    #[test]
    fn test_alloca_operands_and_attributes() {
        let (alloca, ty) = parse("alloca inalloca i64, i32 4, align 16, addrspace(5)");
        assert_eq!(ty, RawType::Pointer { address_space: 5 });
        assert_eq!(alloca.additional, AdditionalData::AllocatedType(RawType::Integer(64)));
        assert_eq!(
            alloca.operands,
            vec![RawValue::new(RawValueKind::Int(4), RawType::Integer(32))]
        );
        insta::assert_debug_snapshot!(alloca.attributes, @r#"
        [
            RawAttribute {
                name: "align",
                values: [
                    Int(
                        16,
                    ),
                ],
            },
            RawAttribute {
                name: "inalloca",
                values: [],
            },
        ]
        "#);

        let (alloca, _) = parse("alloca i8");
        assert_eq!(
            alloca.operands,
            vec![RawValue::new(RawValueKind::Int(1), RawType::Integer(32))]
        );
        assert!(alloca.attributes.is_empty());
    }

    #[test]
    fn test_invoke_places_destinations_before_the_callee() {
        let may_throw = function_ty(vec![RawType::Integer(32)], RawType::Void);
        let (invoke, _) = assert_ok!(parse_with_symbols(
            "invoke void @may_throw(i32 1) to label %ok unwind label %lpad",
            &[("may_throw", may_throw.clone())],
        ));
        assert_eq!(
            invoke.operands,
            vec![
                RawValue::new(RawValueKind::Int(1), RawType::Integer(32)),
                RawValue::label("ok"),
                RawValue::label("lpad"),
                RawValue::name("may_throw", may_throw),
            ]
        );
        assert_eq!(
            invoke.additional,
            AdditionalData::Call {
                calling_convention: 0,
                attributes: vec![],
            }
        );
    }

    #[test]
    fn test_tail_call_attributes() {
        let sqrt = function_ty(
            vec![RawType::FloatingPoint(crate::FloatingPointKind::Float)],
            RawType::FloatingPoint(crate::FloatingPointKind::Float),
        );
        let (call, _) = assert_ok!(parse_with_symbols(
            "tail call nnan fastcc float @llvm.sqrt.f32(float %x)",
            &[("llvm.sqrt.f32", sqrt)],
        ));
        let calling_convention = assert_matches!(
            call.additional,
            AdditionalData::Call { calling_convention, .. } => calling_convention
        );
        assert_eq!(calling_convention, 8);
        assert_eq!(
            call.attributes,
            vec![
                RawAttribute::with_value(
                    "fmf",
                    RawAttributeValue::Strings(vec!["nnan".to_owned()])
                ),
                RawAttribute::with_value("tailkind", RawAttributeValue::Str("tail".to_owned())),
            ]
        );
        assert_eq!(call.operands.last().and_then(RawValue::as_name), Some("llvm.sqrt.f32"));
    }

    #[test]
    fn test_landing_pad_pairs_clauses_with_their_kind() {
        let (landing_pad, ty) = parse(
            "landingpad { ptr, i32 } cleanup catch ptr null filter [0 x ptr] zeroinitializer",
        );
        assert!(matches!(ty, RawType::Structure { .. }));
        assert_eq!(landing_pad.operands.len(), 2);
        assert_eq!(landing_pad.operands[0].kind, RawValueKind::Null);
        assert_eq!(landing_pad.operands[1].kind, RawValueKind::ZeroInitializer);
        assert_eq!(
            landing_pad.additional,
            AdditionalData::LandingPad {
                is_cleanup: true,
                is_catch: vec![true, false],
            }
        );
    }

    #[test]
    fn test_indirect_branch_through_block_address() {
        let f = function_ty(vec![], RawType::Void);
        let (indirect_br, _) = assert_ok!(parse_with_symbols(
            "indirectbr ptr blockaddress(@f, %a), [label %a, label %b]",
            &[("f", f)],
        ));
        assert_eq!(
            indirect_br.operands,
            vec![
                RawValue::new(
                    RawValueKind::BlockAddress {
                        function: "f".to_owned(),
                        block: "a".to_owned(),
                    },
                    RawType::ptr(),
                ),
                RawValue::label("a"),
                RawValue::label("b"),
            ]
        );
    }

    #[test]
    fn test_block_address_requires_a_known_function() {
        let err = assert_err!(parse_with_symbols(
            "indirectbr ptr blockaddress(@g, %a), [label %a]",
            &[]
        ));
        assert_matches!(err, ParseError::UndefinedSymbol(e) => assert_eq!(e.name, "g"));
    }

    #[test]
    fn test_atomic_memory_access() {
        let (cmpxchg, ty) = parse(
            "cmpxchg weak volatile ptr %p, i32 0, i32 1 syncscope(\"agent\") acq_rel monotonic, align 4",
        );
        assert!(matches!(ty, RawType::Structure { ref elements, .. } if elements.len() == 2));
        assert_eq!(
            cmpxchg.additional,
            AdditionalData::CmpXchgOrderings {
                success: 6,
                failure: 2,
            }
        );
        assert_eq!(
            cmpxchg.attributes,
            vec![
                RawAttribute::marker("volatile"),
                RawAttribute::with_value("align", RawAttributeValue::Int(4)),
                RawAttribute::with_value(
                    "syncscope",
                    RawAttributeValue::Str("agent".to_owned())
                ),
                RawAttribute::marker("weak"),
            ]
        );

        let (load, _) = parse("load atomic i64, ptr %p syncscope(\"singlethread\") acquire, align 8");
        assert_eq!(
            load.attributes,
            vec![
                RawAttribute::with_value("align", RawAttributeValue::Int(8)),
                RawAttribute::with_value("syncscope", RawAttributeValue::Int(0)),
                RawAttribute::with_value("ordering", RawAttributeValue::Int(4)),
                RawAttribute::marker("atomic"),
            ]
        );
    }

    #[test]
    fn test_aggregate_indices() {
        let (extract, ty) = parse("extractvalue { i32, { i8, i64 } } %agg, 1, 1");
        assert_eq!(extract.additional, AdditionalData::Indices(vec![1, 1]));
        assert_eq!(ty, RawType::Integer(64));
    }

    #[test]
    fn test_oversized_integers_are_rejected() {
        let err = assert_err!(parse_with_symbols("alloca i8, align 99999999999999999999", &[]));
        let err = assert_matches!(err, ParseError::IntegerOutOfRange(e) => e);
        assert_eq!(err.value, 99999999999999999999);
        assert_eq!(err.expected, "i64");

        let err = assert_err!(parse_with_symbols("alloca i8, addrspace(4294967296)", &[]));
        assert_matches!(err, ParseError::IntegerOutOfRange(e) => assert_eq!(e.expected, "u32"));

        let err = assert_err!(parse_with_symbols("extractvalue { i32 } %agg, 4294967296", &[]));
        assert_matches!(err, ParseError::IntegerOutOfRange(_) => ());

        let err = assert_err!(parse_with_symbols(
            "call cc 99999999999 void @f()",
            &[("f", function_ty(vec![], RawType::Void))],
        ));
        assert_matches!(err, ParseError::IntegerOutOfRange(e) => assert_eq!(e.value, 99999999999));
    }
}
