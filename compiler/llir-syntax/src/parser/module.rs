use crate::parser::attribute::{is_attribute_keyword, trim_attribute_layers};
use crate::parser::{global_name, FunctionScope, Parser};
use crate::{
    is_ignored_global_modifier, linkage, thread_local_model, unnamed_addr, visibility,
    DuplicateDefinitionError, ParseError, ParseResult, RawAttribute, RawBlock, RawFunction,
    RawGlobalObject, RawGlobalVariable, RawInstruction, RawModule, RawType, RawValue, TokenType,
    UndefinedLabelError, UnsupportedSyntaxError,
};
use llir_diagnostics::ice;
use llir_span::Span;
use std::collections::HashMap;

/// Token positions of every top-level entity in the module.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    /// Position of the body of each named type, right after the `type` keyword.
    pub named_types: HashMap<String, usize>,
    /// Position of the `@name` token of each global variable.
    pub globals: Vec<usize>,
    /// Position of the `define` or `declare` keyword of each function.
    pub functions: Vec<usize>,
    /// Position of the opening brace of each attribute group.
    pub attribute_groups: Vec<(u32, usize)>,
    pub source_filename: Option<String>,
    pub target_triple: Option<String>,
    pub data_layout: Option<String>,
}

/// Everything up to and including the type of a global variable.
struct GlobalSignature {
    name: String,
    span: Span,
    ty: RawType,
    is_constant: bool,
    is_externally_initialized: bool,
    /// Whether the linkage says the definition lives elsewhere, meaning there is no initializer.
    is_external: bool,
    global_object: RawGlobalObject,
}

/// Everything up to and including the parameter list of a function.
struct FunctionSignature {
    name: String,
    span: Span,
    is_definition: bool,
    calling_convention: u32,
    ret: RawType,
    ret_attributes: Vec<RawAttribute>,
    parameters: Vec<Parameter>,
    is_vararg: bool,
    global_object: RawGlobalObject,
}

struct Parameter {
    ty: RawType,
    attributes: Vec<RawAttribute>,
    name: Option<String>,
}

impl FunctionSignature {
    fn ty(&self) -> RawType {
        RawType::Function {
            parameters: self.parameters.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.ret.clone()),
            is_vararg: self.is_vararg,
        }
    }
}

impl Parser<'_> {
    /// Parse the entire module.
    pub fn parse(&mut self) -> ParseResult<RawModule> {
        self.index_module()?;
        log::debug!(
            "indexed {} named types, {} globals, {} functions, {} attribute groups",
            self.index.named_types.len(),
            self.index.globals.len(),
            self.index.functions.len(),
            self.index.attribute_groups.len()
        );
        self.parse_attribute_groups()?;
        self.collect_symbols()?;
        let mut module = RawModule {
            source_filename: self.index.source_filename.clone(),
            target_triple: self.index.target_triple.clone(),
            data_layout: self.index.data_layout.clone(),
            ..Default::default()
        };
        for position in self.index.globals.clone() {
            self.input.seek(position);
            module.global_variables.push(self.parse_global_variable()?);
        }
        for position in self.index.functions.clone() {
            self.input.seek(position);
            module.functions.push(self.parse_function()?);
        }
        Ok(module)
    }

    /// Record the position of every top-level entity, and read the module level strings.
    fn index_module(&mut self) -> ParseResult<()> {
        loop {
            let position = self.input.position();
            let token = self.eat();
            match token.ty {
                TokenType::Eof => return Ok(()),
                TokenType::Word(word) => match word.as_str() {
                    "source_filename" => {
                        self.check(&TokenType::Equal)?;
                        self.index.source_filename = Some(self.expect_string()?);
                    }
                    "target" => {
                        let (kind, span) = self.expect_word()?;
                        self.check(&TokenType::Equal)?;
                        let value = self.expect_string()?;
                        match kind.as_str() {
                            "triple" => self.index.target_triple = Some(value),
                            "datalayout" => self.index.data_layout = Some(value),
                            _ => {
                                return Err(Self::unexpected(crate::Token::new(
                                    TokenType::Word(kind),
                                    span,
                                )))
                            }
                        }
                    }
                    "define" | "declare" => {
                        self.index.functions.push(position);
                        self.skip_to_next_entity();
                    }
                    "attributes" => {
                        let token = self.eat();
                        let TokenType::AttributeGroup(id) = token.ty else {
                            return Err(Self::unexpected(token));
                        };
                        self.check(&TokenType::Equal)?;
                        let body = self.input.position();
                        self.index.attribute_groups.push((id, body));
                        self.skip_to_next_entity();
                    }
                    "module" | "uselistorder" | "uselistorder_bb" => self.skip_to_next_entity(),
                    _ => {
                        return Err(Self::unexpected(crate::Token::new(
                            TokenType::Word(word),
                            token.span,
                        )))
                    }
                },
                TokenType::GlobalIdent(_) if self.lookahead_check(&TokenType::Equal) => {
                    self.index.globals.push(position);
                    self.skip_to_next_entity();
                }
                TokenType::LocalIdent(name) if self.lookahead_check(&TokenType::Equal) => {
                    self.eat();
                    self.check_word("type")?;
                    let body = self.input.position();
                    if self.index.named_types.insert(name.clone(), body).is_some() {
                        return Err(ParseError::from(DuplicateDefinitionError {
                            name: format!("%{}", name),
                            span: token.span,
                        }));
                    }
                    self.skip_to_next_entity();
                }
                TokenType::MetadataRef(_) | TokenType::ComdatRef(_)
                    if self.lookahead_check(&TokenType::Equal) =>
                {
                    self.skip_to_next_entity();
                }
                _ => return Err(Self::unexpected(token)),
            }
        }
    }

    /// Whether the next token starts a new top-level entity.
    fn lookahead_is_entity(&self) -> bool {
        let next = &self.lookahead_nth(1).ty;
        match &self.lookahead().ty {
            TokenType::Eof => true,
            TokenType::Word(word) => match word.as_str() {
                "define" | "declare" | "uselistorder" | "uselistorder_bb" => true,
                "source_filename" => *next == TokenType::Equal,
                "target" => next.is_word("triple") || next.is_word("datalayout"),
                "module" => next.is_word("asm"),
                "attributes" => matches!(next, TokenType::AttributeGroup(_)),
                _ => false,
            },
            TokenType::GlobalIdent(_)
            | TokenType::LocalIdent(_)
            | TokenType::MetadataRef(_)
            | TokenType::ComdatRef(_) => *next == TokenType::Equal,
            _ => false,
        }
    }

    /// Skip tokens until the next top-level entity, outside of any brackets.
    ///
    /// Angle brackets are not counted, since `<` and `>` are unbalanced inside metadata strings of
    /// some producers and never enclose a top-level entity.
    fn skip_to_next_entity(&mut self) {
        let mut depth = 0usize;
        loop {
            if depth == 0 && self.lookahead_is_entity() {
                return;
            }
            match self.eat().ty {
                TokenType::OpenParen | TokenType::OpenBrace | TokenType::OpenBracket => depth += 1,
                TokenType::CloseParen | TokenType::CloseBrace | TokenType::CloseBracket => {
                    depth = depth.saturating_sub(1)
                }
                TokenType::Eof => return,
                _ => {}
            }
        }
    }

    fn parse_attribute_groups(&mut self) -> ParseResult<()> {
        for (id, position) in self.index.attribute_groups.clone() {
            self.input.seek(position);
            let attributes = self.parse_attribute_group_body()?;
            self.attribute_groups.insert(id, attributes);
        }
        Ok(())
    }

    /// Build the symbol table mapping every global and function name to its value type.
    fn collect_symbols(&mut self) -> ParseResult<()> {
        for position in self.index.globals.clone() {
            self.input.seek(position);
            let signature = self.parse_global_signature()?;
            self.define_symbol(signature.name, signature.ty, signature.span)?;
        }
        for position in self.index.functions.clone() {
            self.input.seek(position);
            let signature = self.parse_function_signature()?;
            let ty = signature.ty();
            self.define_symbol(signature.name, ty, signature.span)?;
        }
        Ok(())
    }

    fn define_symbol(&mut self, name: String, ty: RawType, span: Span) -> ParseResult<()> {
        if self.symbols.contains_key(&name) {
            return Err(ParseError::from(DuplicateDefinitionError {
                name: format!("@{}", name),
                span,
            }));
        }
        self.symbols.insert(name, ty);
        Ok(())
    }

    /// Parse `@name = <modifiers> global|constant <type>`.
    fn parse_global_signature(&mut self) -> ParseResult<GlobalSignature> {
        let token = self.eat();
        let TokenType::GlobalIdent(name) = token.ty else {
            return Err(Self::unexpected(token));
        };
        self.check(&TokenType::Equal)?;
        let mut global_object = RawGlobalObject::default();
        let mut is_external = false;
        let mut is_externally_initialized = false;
        let is_constant = loop {
            let (word, span) = self.expect_word()?;
            if let Some(code) = linkage(&word) {
                global_object.linkage = code;
                is_external = matches!(word.as_str(), "external" | "extern_weak");
            } else if let Some(code) = visibility(&word) {
                global_object.visibility = code;
            } else if let Some(code) = unnamed_addr(&word) {
                global_object.unnamed_addr = code;
            } else if is_ignored_global_modifier(&word) {
                continue;
            } else {
                match word.as_str() {
                    "thread_local" => global_object.thread_local = self.parse_thread_local()?,
                    "addrspace" => {
                        global_object.address_space = self.parenthesized_integer()?
                    }
                    "externally_initialized" => is_externally_initialized = true,
                    "global" => break false,
                    "constant" => break true,
                    "alias" | "ifunc" => {
                        return Err(ParseError::from(UnsupportedSyntaxError {
                            what: format!("global {}", word),
                            span,
                        }))
                    }
                    _ => {
                        return Err(Self::unexpected(crate::Token::new(
                            TokenType::Word(word),
                            span,
                        )))
                    }
                }
            }
        };
        let ty = self.parse_type()?;
        Ok(GlobalSignature {
            name: global_name(&name),
            span: token.span,
            ty,
            is_constant,
            is_externally_initialized,
            is_external,
            global_object,
        })
    }

    /// Parse the optional `(model)` after `thread_local`. A bare `thread_local` is the general
    /// dynamic model.
    fn parse_thread_local(&mut self) -> ParseResult<u32> {
        if self.eat_if(&TokenType::OpenParen).is_none() {
            return Ok(1);
        }
        let (model, span) = self.expect_word()?;
        let Some(code) = thread_local_model(&model) else {
            return Err(Self::unexpected(crate::Token::new(
                TokenType::Word(model),
                span,
            )));
        };
        self.check(&TokenType::CloseParen)?;
        Ok(code)
    }

    fn parse_global_variable(&mut self) -> ParseResult<RawGlobalVariable> {
        let start = self.input.position();
        let mut signature = self.parse_global_signature()?;
        let initializer = match signature.is_external {
            true => None,
            false => Some(self.parse_value(signature.ty.clone())?),
        };
        while self.eat_if(&TokenType::Comma).is_some() {
            let token = self.eat();
            match &token.ty {
                TokenType::Word(word) => match word.as_str() {
                    "section" => signature.global_object.section = Some(self.expect_string()?),
                    "partition" | "code_model" => {
                        self.expect_string()?;
                    }
                    "comdat" => {
                        if self.lookahead_check(&TokenType::OpenParen) {
                            self.skip_balanced()?;
                        }
                    }
                    "align" => signature.global_object.align = self.expect_integer_in()?,
                    "no_sanitize_address"
                    | "no_sanitize_hwaddress"
                    | "sanitize_address_dyninit"
                    | "sanitize_memtag" => {}
                    _ => return Err(Self::unexpected(token)),
                },
                TokenType::MetadataRef(_) => self.skip_metadata_node()?,
                _ => return Err(Self::unexpected(token)),
            }
        }
        let attributes = self.parse_function_attribute_list()?;
        log::trace!("parsed global @{}", signature.name);
        Ok(RawGlobalVariable {
            value: RawValue::name(signature.name, signature.ty),
            initializer,
            is_constant: signature.is_constant,
            attributes,
            global_object: signature.global_object,
            is_externally_initialized: signature.is_externally_initialized,
            span: self.span_since(start),
        })
    }

    /// Parse a function header up to and including its parameter list.
    ///
    /// ```text
    /// function_signature ::= ('define' | 'declare') modifier* return_attribute* type
    ///                        GLOBAL_IDENT '(' parameters ')'
    /// ```
    fn parse_function_signature(&mut self) -> ParseResult<FunctionSignature> {
        let (keyword, _) = self.expect_word()?;
        let mut global_object = RawGlobalObject::default();
        let mut calling_convention = 0;
        let mut ret_attributes = Vec::new();
        loop {
            let word = match &self.lookahead().ty {
                TokenType::Word(word) => word.clone(),
                TokenType::StringLiteral(_) => {
                    ret_attributes.extend(self.parse_attribute()?);
                    continue;
                }
                _ => break,
            };
            if let Some(code) = linkage(&word) {
                global_object.linkage = code;
            } else if let Some(code) = visibility(&word) {
                global_object.visibility = code;
            } else if is_ignored_global_modifier(&word) {
            } else if let Some(code) = self.parse_calling_convention()? {
                calling_convention = code;
                continue;
            } else if is_attribute_keyword(&word) {
                ret_attributes.extend(self.parse_attribute()?);
                continue;
            } else {
                break;
            }
            self.eat();
        }
        let ret = self.parse_type()?;
        let token = self.eat();
        let TokenType::GlobalIdent(name) = token.ty else {
            return Err(Self::unexpected(token));
        };
        self.check(&TokenType::OpenParen)?;
        let mut parameters = Vec::new();
        let mut is_vararg = false;
        while self.eat_if(&TokenType::CloseParen).is_none() {
            if !parameters.is_empty() || is_vararg {
                self.check(&TokenType::Comma)?;
            }
            if self.eat_if(&TokenType::Ellipsis).is_some() {
                is_vararg = true;
                continue;
            }
            let ty = self.parse_type()?;
            let attributes = self.parse_parameter_attributes()?;
            let name = match &self.lookahead().ty {
                TokenType::LocalIdent(name) => {
                    let name = name.clone();
                    self.eat();
                    Some(name)
                }
                _ => None,
            };
            parameters.push(Parameter {
                ty,
                attributes,
                name,
            });
        }
        Ok(FunctionSignature {
            name: global_name(&name),
            span: token.span,
            is_definition: keyword == "define",
            calling_convention,
            ret,
            ret_attributes,
            parameters,
            is_vararg,
            global_object,
        })
    }

    /// Parse everything between the parameter list and the body of a function, returning the
    /// function attributes.
    fn parse_function_trailer(
        &mut self,
        global_object: &mut RawGlobalObject,
    ) -> ParseResult<Vec<RawAttribute>> {
        let mut attributes = Vec::new();
        loop {
            match &self.lookahead().ty {
                TokenType::AttributeGroup(id) => {
                    let id = *id;
                    let token = self.eat();
                    attributes.extend(self.attribute_group(&token, id)?);
                    continue;
                }
                TokenType::MetadataRef(_) if !self.lookahead_nth(1).ty.eq(&TokenType::Equal) => {
                    self.eat();
                    self.skip_metadata_node()?;
                    continue;
                }
                TokenType::Word(word) => {
                    if let Some(code) = unnamed_addr(word) {
                        global_object.unnamed_addr = code;
                        self.eat();
                        continue;
                    }
                }
                _ => {}
            }
            if self.eat_if_word("addrspace") {
                global_object.address_space = self.parenthesized_integer()?;
            } else if self.eat_if_word("section") {
                global_object.section = Some(self.expect_string()?);
            } else if self.eat_if_word("partition") || self.eat_if_word("gc") {
                self.expect_string()?;
            } else if self.eat_if_word("comdat") {
                if self.lookahead_check(&TokenType::OpenParen) {
                    self.skip_balanced()?;
                }
            } else if self.lookahead_word("align") {
                self.eat();
                global_object.align = self.expect_integer_in()?;
            } else if self.eat_if_word("prefix")
                || self.eat_if_word("prologue")
                || self.eat_if_word("personality")
            {
                self.parse_typed_value()?;
            } else {
                match self.parse_attribute()? {
                    Some(attribute) => attributes.push(attribute),
                    None => return Ok(attributes),
                }
            }
        }
    }

    fn parse_function(&mut self) -> ParseResult<RawFunction> {
        let start = self.input.position();
        let signature = self.parse_function_signature()?;
        self.scope = FunctionScope {
            name: signature.name.clone(),
            next_slot: 0,
        };
        let mut arguments = Vec::with_capacity(signature.parameters.len());
        for parameter in &signature.parameters {
            let name = match &parameter.name {
                Some(name) => self.scope.define(name),
                None => self.scope.take_slot(),
            };
            arguments.push(RawValue::name(name, parameter.ty.clone()));
        }
        let mut global_object = signature.global_object.clone();
        let function_attributes = self.parse_function_trailer(&mut global_object)?;
        let mut blocks = match signature.is_definition {
            true => self.parse_function_body()?,
            false => vec![],
        };
        link_predecessors(&mut blocks, &signature.name)?;
        log::trace!(
            "parsed function @{} with {} blocks",
            signature.name,
            blocks.len()
        );
        let ty = signature.ty();
        let mut layers = vec![function_attributes, signature.ret_attributes];
        layers.extend(signature.parameters.into_iter().map(|p| p.attributes));
        Ok(RawFunction {
            value: RawValue::name(signature.name, ty),
            arguments,
            blocks,
            attributes: trim_attribute_layers(layers),
            calling_convention: signature.calling_convention,
            is_vararg: signature.is_vararg,
            global_object,
            span: self.span_since(start),
        })
    }

    fn parse_function_body(&mut self) -> ParseResult<Vec<RawBlock>> {
        self.check(&TokenType::OpenBrace)?;
        let mut blocks = Vec::new();
        while self.eat_if(&TokenType::CloseBrace).is_none() {
            blocks.push(self.parse_block()?);
        }
        Ok(blocks)
    }

    /// Parse a basic block up to and including its terminator.
    ///
    /// A block without a label takes the next numbered slot.
    fn parse_block(&mut self) -> ParseResult<RawBlock> {
        let name = match &self.lookahead().ty {
            TokenType::LabelDef(name) => {
                let name = name.clone();
                self.eat();
                self.scope.define(&name)
            }
            _ => self.scope.take_slot(),
        };
        let mut instructions = Vec::new();
        loop {
            match &self.lookahead().ty {
                TokenType::DebugRecord(_) => {
                    self.eat();
                    self.skip_balanced()?;
                    continue;
                }
                TokenType::LabelDef(_) | TokenType::CloseBrace | TokenType::Eof => break,
                _ => {}
            }
            let instruction = self.parse_statement()?;
            let is_terminator = is_terminator(&instruction);
            instructions.push(instruction);
            if is_terminator {
                break;
            }
        }
        Ok(RawBlock {
            value: RawValue::label(name),
            instructions,
            predecessors: vec![],
        })
    }

    /// Parse an instruction with its optional `%name =` assignment.
    fn parse_statement(&mut self) -> ParseResult<RawInstruction> {
        let assigned = match (&self.lookahead().ty, &self.lookahead_nth(1).ty) {
            (TokenType::LocalIdent(name), TokenType::Equal) => {
                let name = name.clone();
                self.eat();
                self.eat();
                Some(name)
            }
            _ => None,
        };
        let (mut instruction, ty) = self.parse_instruction()?;
        if !ty.is_void() {
            let name = match assigned {
                Some(name) => self.scope.define(&name),
                None => self.scope.take_slot(),
            };
            instruction.result = Some(RawValue::name(name, ty));
        }
        Ok(instruction)
    }
}

/// Whether the instruction is one of the terminators, whose opcodes are numbered first.
fn is_terminator(instruction: &RawInstruction) -> bool {
    (1..=11).contains(&instruction.opcode)
}

/// Fill in the predecessors of every block from the labels used by each terminator.
///
/// Predecessors are listed with the most recent use first, which is the order a use list yields
/// them in, and each predecessor is listed once.
pub fn link_predecessors(blocks: &mut [RawBlock], function: &str) -> ParseResult<()> {
    let names = blocks
        .iter()
        .map(|block| match block.value.as_name() {
            Some(name) => name.to_owned(),
            None => ice!("block value is not a name"),
        })
        .collect::<Vec<_>>();
    let mut positions = HashMap::new();
    for (index, name) in names.iter().enumerate() {
        if positions.insert(name.as_str(), index).is_some() {
            let span = blocks[index]
                .instructions
                .first()
                .map(|i| i.span)
                .unwrap_or_else(Span::empty);
            return Err(ParseError::from(DuplicateDefinitionError {
                name: name.clone(),
                span,
            }));
        }
    }
    let mut predecessors = vec![Vec::<String>::new(); blocks.len()];
    for (index, block) in blocks.iter().enumerate() {
        let Some(terminator) = block.instructions.last().filter(|i| is_terminator(i)) else {
            continue;
        };
        let targets = terminator
            .operands
            .iter()
            .filter(|operand| operand.ty == RawType::Label)
            .filter_map(|operand| operand.as_name());
        for target in targets {
            let Some(&position) = positions.get(target) else {
                return Err(ParseError::from(UndefinedLabelError {
                    name: target.to_owned(),
                    span: terminator.span,
                    function: function.to_owned(),
                }));
            };
            predecessors[position].push(names[index].clone());
        }
    }
    for (block, mut names) in blocks.iter_mut().zip(predecessors) {
        names.reverse();
        let mut seen = Vec::<String>::with_capacity(names.len());
        for name in names {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        block.predecessors = seen;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::{parse_module, Lexer, ParseError};
    use llir_macros::{assert_err, assert_matches, assert_ok};

    fn index(source: &str) -> Parser<'_> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut parser = Parser::new(source, tokens);
        parser.index_module().unwrap();
        parser
    }

    #[test]
    fn test_index_finds_top_level_entities() {
        let parser = index(
            r#"
            source_filename = "a.c"
            target triple = "x86_64-pc-linux-gnu"
            %struct.pair = type { i32, i32 }
            @g = global i32 0, align 4
            declare i32 @puts(ptr)
            define void @f() { ret void }
            attributes #0 = { nounwind }
            !0 = !{i32 1}
            "#,
        );
        assert_eq!(parser.index.source_filename.as_deref(), Some("a.c"));
        assert_eq!(
            parser.index.target_triple.as_deref(),
            Some("x86_64-pc-linux-gnu")
        );
        assert!(parser.index.named_types.contains_key("struct.pair"));
        assert_eq!(parser.index.globals.len(), 1);
        assert_eq!(parser.index.functions.len(), 2);
        assert_eq!(parser.index.attribute_groups.len(), 1);
    }

    #[test]
    fn test_target_extension_type_is_not_an_entity() {
        let parser = index(r#"@t = global target("spirv.Event") zeroinitializer"#);
        assert_eq!(parser.index.globals.len(), 1);
        assert!(parser.index.target_triple.is_none());
    }

    #[test]
    fn test_duplicate_functions_are_rejected() {
        let result = parse_module("declare void @f()\ndeclare void @f()\n");
        let error = assert_err!(result);
        assert_matches!(error, ParseError::DuplicateDefinition(_) => ());
    }

    #[test]
    fn test_branch_to_missing_block_is_rejected() {
        let result = parse_module("define void @f() {\nentry:\n  br label %nowhere\n}\n");
        let error = assert_err!(result);
        assert_matches!(error, ParseError::UndefinedLabel(_) => ());
    }

    #[test]
    fn test_predecessors_are_most_recent_first_without_duplicates() {
        let module = assert_ok!(parse_module(
            r#"
            define void @f(i1 %c) {
            entry:
              br i1 %c, label %join, label %join
            other:
              br label %join
            join:
              ret void
            }
            "#
        ));
        let join = &module.functions[0].blocks[2];
        assert_eq!(join.predecessors, vec!["other", "entry"]);
    }
}
