//! Recursive-descent parser for HEART text.
//!
//! Parsing runs in three passes over one token stream so that any name can
//! be used before its declaration:
//! 1. module headers and struct names
//! 2. struct members, endpoints, variables, nodes, connections and function
//!    signatures
//! 3. function bodies

use crate::errors;
use crate::lexer::{lex, unescape_string};
use crate::token::{HeartToken, Token};
use crate::HEART_VERSION;
use resonate_diagnostics::Diagnostic;
use resonate_ir::{
    Annotation, Block, BlockId, ClockRatio, Connection, Endpoint, EndpointDetails,
    EndpointDirection, EndpointKind, EndpointRef, Expr, Function, FunctionId, FunctionKind,
    InterpolationType, ModuleId, ModuleKind, PathSegment, PrimitiveType, ProcessorInstance,
    ProcessorProperty, Program, Statement, SubElementIndex, Terminator, Type, UnaryOp, BinaryOp,
    Value, Variable, VariableId, VariableRole, PATH_SEPARATOR,
};
use resonate_source::{FileId, SourceFile, Span};
use std::collections::HashMap;
use tracing::debug;

/// Parses HEART text. Spans point into file 0, which is the first file
/// added to a fresh [`SourceDb`](resonate_source::SourceDb).
pub fn parse(text: &str) -> Result<Program, Diagnostic> {
    parse_source(text, FileId::from_raw(0))
}

/// Parses a registered source file.
pub fn parse_file(file: &SourceFile) -> Result<Program, Diagnostic> {
    parse_source(&file.content, file.id)
}

fn parse_source(text: &str, file: FileId) -> Result<Program, Diagnostic> {
    let tokens = lex(text, file)?;
    let mut parser = Parser {
        source: text,
        tokens,
        pos: 0,
        program: Program::new(),
    };
    parser.parse_program()?;
    debug!(
        modules = parser.program.modules.len(),
        functions = parser.program.functions.len(),
        "parsed HEART program"
    );
    Ok(parser.program)
}

struct ModuleOutline {
    id: ModuleId,
    annotation_pos: usize,
    body_start: usize,
}

struct FunctionOutline {
    id: FunctionId,
    body_start: usize,
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    program: Program,
}

type ParseResult<T> = Result<T, Diagnostic>;

impl<'src> Parser<'src> {
    // ---- token helpers ----

    fn current(&self) -> HeartToken {
        self.tokens[self.pos].kind
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn current_text(&self) -> &'src str {
        self.text_of(self.tokens[self.pos])
    }

    fn text_of(&self, token: Token) -> &'src str {
        let source: &'src str = self.source;
        &source[token.span.start as usize..token.span.end as usize]
    }

    fn kind_at(&self, offset: usize) -> HeartToken {
        self.tokens
            .get(self.pos + offset)
            .map_or(HeartToken::Eof, |t| t.kind)
    }

    fn at(&self, kind: HeartToken) -> bool {
        self.current() == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.at(HeartToken::Identifier) && self.current_text() == keyword
    }

    fn peek_is(&self, kind: HeartToken) -> bool {
        self.kind_at(1) == kind
    }

    fn advance(&mut self) {
        if !self.at(HeartToken::Eof) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: HeartToken) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expected(&self, what: &str) -> Diagnostic {
        let found = match self.current() {
            HeartToken::Eof => "end of file".to_string(),
            _ => format!("'{}'", self.current_text()),
        };
        errors::expected(what, &found, self.current_span())
    }

    fn expect(&mut self, kind: HeartToken) -> ParseResult<Span> {
        let span = self.current_span();
        if self.eat(kind) {
            Ok(span)
        } else {
            Err(self.expected(kind.describe()))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{keyword}'")))
        }
    }

    fn expect_text(&mut self, kind: HeartToken) -> ParseResult<&'src str> {
        let text = self.current_text();
        self.expect(kind)?;
        Ok(text)
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        self.expect_text(HeartToken::Identifier).map(str::to_string)
    }

    fn expect_u32(&mut self) -> ParseResult<u32> {
        let span = self.current_span();
        let text = self.expect_text(HeartToken::Integer)?;
        text.parse()
            .map_err(|_| errors::invalid_literal(text, span))
    }

    fn expect_i64(&mut self) -> ParseResult<i64> {
        let span = self.current_span();
        let text = self.expect_text(HeartToken::Integer)?;
        text.trim_end_matches('L')
            .parse()
            .map_err(|_| errors::invalid_literal(text, span))
    }

    fn span_from(&self, start: usize) -> Span {
        let first = self.tokens[start].span;
        let last = self.tokens[self.pos.saturating_sub(1).max(start)].span;
        Span::new(first.file, first.start, last.end.max(first.start))
    }

    /// Skips a balanced `open ... close` group starting at the current token.
    fn skip_balanced(&mut self, open: HeartToken, close: HeartToken) -> ParseResult<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.current() {
                HeartToken::Eof => return Err(self.expected(close.describe())),
                k if k == open => depth += 1,
                k if k == close => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    fn parse_comma_list<T>(
        &mut self,
        close: HeartToken,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(HeartToken::Comma)?;
        }
    }

    fn parse_qualified_name(&mut self) -> ParseResult<String> {
        let mut name = self.expect_identifier()?;
        while self.at(HeartToken::DoubleColon) && self.peek_is(HeartToken::Identifier) {
            self.advance();
            name.push_str(PATH_SEPARATOR);
            name.push_str(self.current_text());
            self.advance();
        }
        Ok(name)
    }

    // ---- pass 1 ----

    fn parse_program(&mut self) -> ParseResult<()> {
        let outlines = self.parse_outlines()?;
        let mut functions = Vec::new();
        for outline in &outlines {
            functions.extend(self.parse_module_items(outline)?);
        }
        for function in &functions {
            self.pos = function.body_start;
            self.parse_function_body(function.id)?;
        }
        Ok(())
    }

    fn parse_header(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let valid = self.eat(HeartToken::Hash)
            && self.eat_keyword("HEART")
            && self.at(HeartToken::Integer)
            && self.current_text() == HEART_VERSION.to_string();
        if !valid {
            let span = self.span_from(start).cover(self.current_span());
            let found = &self.source[span.start as usize..span.end as usize];
            return Err(errors::unsupported_version(found, span));
        }
        self.advance();
        Ok(())
    }

    fn parse_outlines(&mut self) -> ParseResult<Vec<ModuleOutline>> {
        self.parse_header()?;
        let mut outlines = Vec::new();
        while !self.at(HeartToken::Eof) {
            let start = self.pos;
            let kind = ModuleKind::from_keyword(self.current_text())
                .filter(|_| self.at(HeartToken::Identifier))
                .ok_or_else(|| self.expected("'processor', 'graph' or 'namespace'"))?;
            self.advance();
            let name = self.parse_qualified_name()?;
            let id = self.program.add_module(kind, name);
            self.program.modules[id].span = self.span_from(start);

            let annotation_pos = self.pos;
            if self.at(HeartToken::LeftBracket) {
                self.skip_balanced(HeartToken::LeftBracket, HeartToken::RightBracket)?;
            }
            self.expect(HeartToken::LeftBrace)?;
            let body_start = self.pos;
            self.scan_struct_names(id)?;
            outlines.push(ModuleOutline {
                id,
                annotation_pos,
                body_start,
            });
        }
        Ok(outlines)
    }

    /// Registers the module's struct names and moves past its closing brace.
    fn scan_struct_names(&mut self, module: ModuleId) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            match self.current() {
                HeartToken::Eof => return Err(self.expected("'}'")),
                HeartToken::LeftBrace => depth += 1,
                HeartToken::RightBrace if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                HeartToken::RightBrace => depth -= 1,
                HeartToken::Identifier if depth == 0 && self.current_text() == "struct" => {
                    let start = self.pos;
                    self.advance();
                    let name = self.expect_identifier()?;
                    let id = self.program.add_struct(module, name);
                    self.program.structs[id].span = self.span_from(start);
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ---- pass 2 ----

    fn parse_module_items(&mut self, outline: &ModuleOutline) -> ParseResult<Vec<FunctionOutline>> {
        let module = outline.id;
        self.pos = outline.annotation_pos;
        let annotation = self.parse_optional_annotation()?;
        self.program.modules[module].annotation = annotation;

        self.pos = outline.body_start;
        let mut functions = Vec::new();
        while !self.eat(HeartToken::RightBrace) {
            match self.current_text() {
                "struct" if self.at(HeartToken::Identifier) => self.parse_struct(module)?,
                "input" | "output" => self.parse_endpoint(module)?,
                "param" => self.parse_param(module)?,
                "var" | "let" => self.parse_state_variable(module)?,
                "node" => self.parse_node(module)?,
                "connection" => self.parse_connection(module)?,
                "function" | "event" | "intrinsic" => {
                    if let Some(outline) = self.parse_function_signature(module)? {
                        functions.push(outline);
                    }
                }
                _ => return Err(self.expected("a module item")),
            }
        }
        Ok(functions)
    }

    fn parse_struct(&mut self, module: ModuleId) -> ParseResult<()> {
        self.expect_keyword("struct")?;
        let name_span = self.current_span();
        let name = self.expect_identifier()?;
        let id = self
            .program
            .find_struct(module, &name)
            .ok_or_else(|| errors::unknown_name("struct", &name, name_span))?;
        self.expect(HeartToken::LeftBrace)?;
        while !self.eat(HeartToken::RightBrace) {
            let start = self.pos;
            let ty = self.parse_type()?;
            let member = self.expect_identifier()?;
            self.expect(HeartToken::Semicolon)?;
            let span = self.span_from(start);
            self.program.add_struct_member(id, member, ty, span)?;
        }
        Ok(())
    }

    fn parse_endpoint(&mut self, module: ModuleId) -> ParseResult<()> {
        let start = self.pos;
        let direction = if self.eat_keyword("input") {
            EndpointDirection::Input
        } else {
            self.expect_keyword("output")?;
            EndpointDirection::Output
        };
        let name = self.expect_identifier()?;

        let mut endpoint = if self.eat(HeartToken::Equals) {
            let path = self.parse_hoisted_path()?;
            Endpoint::hoisted(name, direction, path)
        } else {
            let array_size = if self.eat(HeartToken::LeftBracket) {
                let size = self.expect_u32()?;
                self.expect(HeartToken::RightBracket)?;
                Some(size)
            } else {
                None
            };
            let kind = EndpointKind::from_name(self.current_text())
                .filter(|_| self.at(HeartToken::Identifier))
                .ok_or_else(|| self.expected("'stream', 'value' or 'event'"))?;
            self.advance();
            let data_types = if self.eat(HeartToken::LeftParen) {
                self.parse_comma_list(HeartToken::RightParen, |p| p.parse_type())?
            } else {
                vec![self.parse_type()?]
            };
            Endpoint::new(
                name,
                direction,
                EndpointDetails {
                    kind,
                    data_types,
                    array_size,
                },
            )
        };
        endpoint.needs_exposure = self.eat_keyword("exposed");
        endpoint.annotation = self.parse_optional_annotation()?;
        self.expect(HeartToken::Semicolon)?;
        endpoint.span = self.span_from(start);
        self.program.modules[module].add_endpoint(endpoint);
        Ok(())
    }

    fn parse_hoisted_path(&mut self) -> ParseResult<Vec<PathSegment>> {
        let mut path = Vec::new();
        loop {
            let mut segment = PathSegment::new(self.expect_identifier()?);
            if self.eat(HeartToken::LeftBracket) {
                segment.index = Some(self.expect_u32()?);
                self.expect(HeartToken::RightBracket)?;
            }
            path.push(segment);
            if !self.eat(HeartToken::Dot) {
                return Ok(path);
            }
        }
    }

    fn parse_param(&mut self, module: ModuleId) -> ParseResult<()> {
        let start = self.pos;
        self.expect_keyword("param")?;
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        self.expect(HeartToken::Semicolon)?;
        let id = self.program.add_specialisation_param(module, name, ty);
        self.program.variables[id].span = self.span_from(start);
        Ok(())
    }

    fn parse_state_variable(&mut self, module: ModuleId) -> ParseResult<()> {
        let start = self.pos;
        let role = if self.eat_keyword("let") {
            VariableRole::Constant
        } else {
            self.expect_keyword("var")?;
            if self.eat_keyword("external") {
                VariableRole::External
            } else {
                VariableRole::State
            }
        };
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        let mut variable = Variable::new(name, ty, role);
        if self.eat(HeartToken::Equals) {
            let value = self.parse_constant()?;
            variable.initial_value = Some(self.program.intern(value));
        }
        variable.annotation = self.parse_optional_annotation()?;
        self.expect(HeartToken::Semicolon)?;
        variable.span = self.span_from(start);
        self.program.add_state_variable(module, variable);
        Ok(())
    }

    fn parse_node(&mut self, module: ModuleId) -> ParseResult<()> {
        let start = self.pos;
        self.expect_keyword("node")?;
        let name = self.expect_identifier()?;
        self.expect(HeartToken::Equals)?;
        let mut instance = ProcessorInstance::new(name, self.parse_qualified_name()?);
        if self.eat(HeartToken::LeftBracket) {
            instance.array_size = Some(self.expect_u32()?);
            self.expect(HeartToken::RightBracket)?;
        }
        if self.eat(HeartToken::LeftParen) {
            let args = self.parse_comma_list(HeartToken::RightParen, |p| p.parse_constant())?;
            instance.specialisation_args = args.into_iter().map(|v| self.program.intern(v)).collect();
        }
        let ratio_span = self.current_span();
        if self.eat(HeartToken::Star) {
            instance.clock_ratio = ClockRatio::multiplier(self.expect_i64()?, ratio_span)?;
        } else if self.eat(HeartToken::Slash) {
            instance.clock_ratio = ClockRatio::divider(self.expect_i64()?, ratio_span)?;
        }
        self.expect(HeartToken::Semicolon)?;
        instance.span = self.span_from(start);
        self.program.modules[module].add_instance(instance);
        Ok(())
    }

    fn parse_connection(&mut self, module: ModuleId) -> ParseResult<()> {
        let start = self.pos;
        self.expect_keyword("connection")?;
        let mut interpolation = InterpolationType::None;
        if self.at(HeartToken::Identifier) && self.peek_is(HeartToken::Identifier) {
            if let Some(kind) = InterpolationType::from_name(self.current_text()) {
                interpolation = kind;
                self.advance();
            }
        }
        let source = self.parse_endpoint_ref(module)?;
        self.expect(HeartToken::Arrow)?;
        let mut delay_length = None;
        if self.eat(HeartToken::LeftBracket) {
            delay_length = Some(self.expect_i64()?);
            self.expect(HeartToken::RightBracket)?;
            self.expect(HeartToken::Arrow)?;
        }
        let dest = self.parse_endpoint_ref(module)?;
        self.expect(HeartToken::Semicolon)?;

        let mut connection = Connection::new(source, dest);
        connection.interpolation = interpolation;
        connection.delay_length = delay_length;
        connection.span = self.span_from(start);
        self.program.modules[module].add_connection(connection);
        Ok(())
    }

    fn parse_endpoint_ref(&mut self, module: ModuleId) -> ParseResult<EndpointRef> {
        let first_span = self.current_span();
        let first = self.expect_identifier()?;
        let mut endpoint_ref = if self.eat(HeartToken::Dot) {
            let instance = self.program.modules[module]
                .find_instance(&first)
                .ok_or_else(|| errors::unknown_name("processor instance", &first, first_span))?;
            EndpointRef::child(instance, self.expect_identifier()?)
        } else {
            EndpointRef::own(first)
        };
        if self.eat(HeartToken::LeftBracket) {
            endpoint_ref.index = Some(self.expect_u32()?);
            self.expect(HeartToken::RightBracket)?;
        }
        Ok(endpoint_ref)
    }

    fn parse_function_signature(&mut self, module: ModuleId) -> ParseResult<Option<FunctionOutline>> {
        let start = self.pos;
        let keyword = self.expect_identifier()?;
        let name = self.expect_identifier()?;
        self.expect(HeartToken::LeftParen)?;
        let parameters = self.parse_comma_list(HeartToken::RightParen, |p| {
            let start = p.pos;
            let ty = p.parse_type()?;
            let name = p.expect_text(HeartToken::LocalName)?;
            let mut variable = Variable::new(name, ty, VariableRole::Parameter);
            variable.span = p.span_from(start);
            Ok(p.program.add_variable(variable))
        })?;
        self.expect(HeartToken::Arrow)?;
        let return_type = self.parse_type()?;

        let kind = match keyword.as_str() {
            "event" => FunctionKind::Event,
            "intrinsic" => FunctionKind::Intrinsic,
            _ if self.program.modules[module].is_processor() => {
                FunctionKind::for_processor_function(&name)
            }
            _ => FunctionKind::Normal,
        };
        let mut function = Function::new(name, module, kind, return_type);
        function.parameters = parameters;
        function.annotation = self.parse_optional_annotation()?;
        function.span = self.span_from(start);
        let id = self.program.add_function(function);

        if self.eat(HeartToken::Semicolon) {
            return Ok(None);
        }
        let body_start = self.pos;
        self.skip_balanced(HeartToken::LeftBrace, HeartToken::RightBrace)?;
        Ok(Some(FunctionOutline { id, body_start }))
    }

    // ---- pass 3 ----

    fn parse_function_body(&mut self, function: FunctionId) -> ParseResult<()> {
        let mut body = BodyScope::default();
        for &p in &self.program.functions[function].parameters {
            body.variables
                .insert(self.program.variables[p].name.clone(), p);
        }
        self.expect(HeartToken::LeftBrace)?;

        while self.at_keyword("var") || self.at_keyword("let") {
            let start = self.pos;
            let role = if self.eat_keyword("let") {
                VariableRole::Constant
            } else {
                self.advance();
                VariableRole::MutableLocal
            };
            let ty = self.parse_type()?;
            let name = self.expect_text(HeartToken::LocalName)?;
            self.expect(HeartToken::Semicolon)?;
            let mut variable = Variable::new(name, ty, role);
            variable.span = self.span_from(start);
            let id = self.program.add_variable(variable);
            self.program.functions[function].locals.push(id);
            body.variables.insert(name.to_string(), id);
        }

        self.declare_blocks(function, &mut body);

        while !self.eat(HeartToken::RightBrace) {
            self.parse_block(function, &mut body)?;
        }
        Ok(())
    }

    /// Creates every block of the body in textual order, so that branches
    /// can target blocks further down.
    fn declare_blocks(&mut self, function: FunctionId, body: &mut BodyScope) {
        let mut depth = 0usize;
        for i in self.pos..self.tokens.len() {
            match self.tokens[i].kind {
                HeartToken::LeftBrace => depth += 1,
                HeartToken::RightBrace if depth == 0 => return,
                HeartToken::RightBrace => depth -= 1,
                HeartToken::BlockLabel => {
                    let previous = self.tokens[i - 1].kind;
                    if matches!(previous, HeartToken::Semicolon | HeartToken::LeftBrace) {
                        let name = self.text_of(self.tokens[i]);
                        let id = self.program.functions[function].blocks.alloc(Block::new(name));
                        body.blocks.insert(name.to_string(), id);
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_block(&mut self, function: FunctionId, body: &mut BodyScope) -> ParseResult<()> {
        let start = self.pos;
        let block = self.parse_block_label(body)?;
        if self.eat(HeartToken::LeftParen) {
            let params = self.parse_comma_list(HeartToken::RightParen, |p| {
                let ty = p.parse_type()?;
                let name = p.expect_text(HeartToken::LocalName)?;
                let id = p.program.add_variable(Variable::new(name, ty, VariableRole::Parameter));
                Ok((name.to_string(), id))
            })?;
            for (name, id) in params {
                self.program.functions[function].blocks[block].parameters.push(id);
                body.variables.insert(name, id);
            }
        }
        self.expect(HeartToken::Colon)?;
        self.program.functions[function].blocks[block].span = self.span_from(start);

        loop {
            let terminator = if self.eat_keyword("branch") {
                let (target, args) = self.parse_branch_target(body)?;
                Some(Terminator::Branch { target, args })
            } else if self.eat_keyword("branch_if") {
                let condition = self.parse_expr(body)?;
                self.expect(HeartToken::Question)?;
                let (if_true, true_args) = self.parse_branch_target(body)?;
                self.expect(HeartToken::Colon)?;
                let (if_false, false_args) = self.parse_branch_target(body)?;
                Some(Terminator::BranchIf {
                    condition,
                    targets: [if_true, if_false],
                    args: [true_args, false_args],
                })
            } else if self.eat_keyword("return") {
                if self.at(HeartToken::Semicolon) {
                    Some(Terminator::ReturnVoid)
                } else {
                    Some(Terminator::ReturnValue(self.parse_expr(body)?))
                }
            } else {
                None
            };

            match terminator {
                Some(terminator) => {
                    self.expect(HeartToken::Semicolon)?;
                    self.program.functions[function].blocks[block].terminator = terminator;
                    return Ok(());
                }
                None => {
                    let statement = self.parse_statement(body)?;
                    self.program.functions[function].blocks[block]
                        .statements
                        .push(statement);
                }
            }
        }
    }

    fn parse_block_label(&mut self, body: &BodyScope) -> ParseResult<BlockId> {
        let span = self.current_span();
        let name = self.expect_text(HeartToken::BlockLabel)?;
        body.blocks
            .get(name)
            .copied()
            .ok_or_else(|| errors::unknown_name("block", name, span))
    }

    fn parse_branch_target(&mut self, body: &BodyScope) -> ParseResult<(BlockId, Vec<Expr>)> {
        let block = self.parse_block_label(body)?;
        let args = if self.eat(HeartToken::LeftParen) {
            self.parse_comma_list(HeartToken::RightParen, |p| p.parse_expr(body))?
        } else {
            Vec::new()
        };
        Ok((block, args))
    }

    fn parse_statement(&mut self, body: &BodyScope) -> ParseResult<Statement> {
        if self.eat_keyword("advance") {
            self.expect(HeartToken::Semicolon)?;
            return Ok(Statement::AdvanceClock);
        }
        if self.at_keyword("call") {
            let (function, args) = self.parse_call(body)?;
            self.expect(HeartToken::Semicolon)?;
            return Ok(Statement::Call {
                target: None,
                function,
                args,
            });
        }
        if self.eat_keyword("write") {
            let endpoint = self.expect_identifier()?;
            let element = if self.eat(HeartToken::LeftBracket) {
                let element = self.parse_expr(body)?;
                self.expect(HeartToken::RightBracket)?;
                Some(element)
            } else {
                None
            };
            let value = self.parse_expr(body)?;
            self.expect(HeartToken::Semicolon)?;
            return Ok(Statement::WriteStream {
                endpoint,
                element,
                value,
            });
        }

        self.eat_keyword("let");
        let target = self.parse_expr(body)?;
        self.expect(HeartToken::Equals)?;
        let statement = if self.eat_keyword("read") {
            Statement::ReadStream {
                target,
                endpoint: self.expect_identifier()?,
            }
        } else if self.at_keyword("call") {
            let (function, args) = self.parse_call(body)?;
            Statement::Call {
                target: Some(target),
                function,
                args,
            }
        } else {
            Statement::Assign {
                target,
                value: self.parse_expr(body)?,
            }
        };
        self.expect(HeartToken::Semicolon)?;
        Ok(statement)
    }

    fn parse_call(&mut self, body: &BodyScope) -> ParseResult<(FunctionId, Vec<Expr>)> {
        self.expect_keyword("call")?;
        let function = self.parse_function_ref()?;
        self.expect(HeartToken::LeftParen)?;
        let args = self.parse_comma_list(HeartToken::RightParen, |p| p.parse_expr(body))?;
        Ok((function, args))
    }

    fn parse_function_ref(&mut self) -> ParseResult<FunctionId> {
        let span = self.current_span();
        let path = self.parse_qualified_name()?;
        self.program
            .find_function_by_path(&path)
            .ok_or_else(|| errors::unknown_name("function", &path, span))
    }

    // ---- expressions ----

    fn parse_expr(&mut self, body: &BodyScope) -> ParseResult<Expr> {
        let mut expr = self.parse_primary(body)?;
        loop {
            if self.at(HeartToken::LeftBracket) {
                self.advance();
                let index = if self.at(HeartToken::Integer) && self.peek_is(HeartToken::RightBracket) {
                    SubElementIndex::Fixed(self.expect_u32()?)
                } else if self.at(HeartToken::Integer) && self.peek_is(HeartToken::Colon) {
                    let start = self.expect_u32()?;
                    self.expect(HeartToken::Colon)?;
                    SubElementIndex::Slice(start, self.expect_u32()?)
                } else {
                    SubElementIndex::Dynamic(Box::new(self.parse_expr(body)?))
                };
                self.expect(HeartToken::RightBracket)?;
                expr = Expr::SubElement {
                    parent: Box::new(expr),
                    index,
                };
            } else if self.at(HeartToken::Dot) && self.peek_is(HeartToken::Identifier) {
                self.advance();
                expr = expr.member(self.expect_identifier()?);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self, body: &BodyScope) -> ParseResult<Expr> {
        match self.current() {
            HeartToken::LocalName => {
                let span = self.current_span();
                let name = self.current_text();
                let id = body
                    .variables
                    .get(name)
                    .copied()
                    .ok_or_else(|| errors::unknown_name("variable", name, span))?;
                self.advance();
                Ok(Expr::Variable(id))
            }
            HeartToken::Identifier => self.parse_identifier_expr(body),
            HeartToken::Integer | HeartToken::Float | HeartToken::StringLiteral => {
                let value = self.parse_constant()?;
                Ok(Expr::Constant(self.program.intern(value)))
            }
            _ => Err(self.expected("an expression")),
        }
    }

    fn parse_identifier_expr(&mut self, body: &BodyScope) -> ParseResult<Expr> {
        let text = self.current_text();
        let call_like = self.peek_is(HeartToken::LeftParen);
        if text == "cast" {
            self.advance();
            let ty = self.parse_type()?;
            self.expect(HeartToken::LeftParen)?;
            let source = self.parse_expr(body)?;
            self.expect(HeartToken::RightParen)?;
            return Ok(Expr::Cast {
                ty,
                source: Box::new(source),
            });
        }
        if text == "pure_call" {
            self.advance();
            let function = self.parse_function_ref()?;
            self.expect(HeartToken::LeftParen)?;
            let args = self.parse_comma_list(HeartToken::RightParen, |p| p.parse_expr(body))?;
            return Ok(Expr::PureCall { function, args });
        }
        if text == "processor" && self.peek_is(HeartToken::Dot) {
            self.advance();
            self.advance();
            let span = self.current_span();
            let name = self.expect_identifier()?;
            let property = ProcessorProperty::from_name(&name)
                .ok_or_else(|| errors::unknown_name("processor property", &name, span))?;
            return Ok(Expr::ProcessorProperty(property));
        }
        if call_like {
            if let Some(op) = UnaryOp::from_name(text) {
                self.advance();
                self.advance();
                let source = self.parse_expr(body)?;
                self.expect(HeartToken::RightParen)?;
                return Ok(Expr::Unary {
                    op,
                    source: Box::new(source),
                });
            }
            if let Some(op) = BinaryOp::from_name(text) {
                self.advance();
                self.advance();
                let lhs = self.parse_expr(body)?;
                self.expect(HeartToken::Comma)?;
                let rhs = self.parse_expr(body)?;
                self.expect(HeartToken::RightParen)?;
                return Ok(Expr::binary(op, lhs, rhs));
            }
        }
        if self.peek_is(HeartToken::DoubleColon) {
            let saved = self.pos;
            let path = self.parse_qualified_name()?;
            if let Some(variable) = self.program.find_variable_by_path(&path) {
                return Ok(Expr::Variable(variable));
            }
            self.pos = saved;
        }
        let value = self.parse_constant()?;
        Ok(Expr::Constant(self.program.intern(value)))
    }

    // ---- types, constants, annotations ----

    fn at_array_suffix(&self) -> bool {
        self.at(HeartToken::LeftBracket)
            && (self.peek_is(HeartToken::RightBracket)
                || (self.peek_is(HeartToken::Integer) && self.kind_at(2) == HeartToken::RightBracket))
    }

    fn parse_type(&mut self) -> ParseResult<Type> {
        let is_const = self.eat_keyword("const");
        let span = self.current_span();
        let text = self.current_text();
        let mut ty = if !self.at(HeartToken::Identifier) {
            return Err(self.expected("a type"));
        } else if let Some(primitive) = PrimitiveType::from_name(text) {
            self.advance();
            if self.eat(HeartToken::Less) {
                let size = self.expect_u32()?;
                self.expect(HeartToken::Greater)?;
                Type::vector(primitive, size)
            } else {
                Type::Primitive(primitive)
            }
        } else if text == "string" {
            self.advance();
            Type::StringLiteral
        } else {
            let path = self.parse_qualified_name()?;
            let id = self
                .program
                .find_struct_by_path(&path)
                .ok_or_else(|| errors::unknown_name("type", &path, span))?;
            Type::Struct(id)
        };
        while self.at_array_suffix() {
            self.advance();
            ty = if self.eat(HeartToken::RightBracket) {
                Type::unsized_array(ty)
            } else {
                let size = self.expect_u32()?;
                self.expect(HeartToken::RightBracket)?;
                Type::array(ty, size)
            };
        }
        if is_const {
            ty = ty.make_const();
        }
        if self.eat(HeartToken::Ampersand) {
            ty = ty.make_reference();
        }
        Ok(ty)
    }

    fn parse_constant(&mut self) -> ParseResult<Value> {
        let span = self.current_span();
        let text = self.current_text();
        let value = match self.current() {
            HeartToken::Integer => {
                let value = match text.strip_suffix('L') {
                    Some(digits) => digits.parse().map(Value::Int64).ok(),
                    None => text.parse().map(Value::Int32).ok(),
                };
                value.ok_or_else(|| errors::invalid_literal(text, span))?
            }
            HeartToken::Float => {
                let value = match text.strip_suffix('f') {
                    Some(digits) => digits.parse().map(Value::Float32).ok(),
                    None => text.parse().map(Value::Float64).ok(),
                };
                value.ok_or_else(|| errors::invalid_literal(text, span))?
            }
            HeartToken::StringLiteral => Value::String(self.program.strings.intern(&unescape_string(text))),
            HeartToken::Identifier => match text {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "_nan32" => Value::Float32(f32::NAN),
                "_inf32" => Value::Float32(f32::INFINITY),
                "_ninf32" => Value::Float32(f32::NEG_INFINITY),
                "_nan64" => Value::Float64(f64::NAN),
                "_inf64" => Value::Float64(f64::INFINITY),
                "_ninf64" => Value::Float64(f64::NEG_INFINITY),
                "void" if !self.peek_is(HeartToken::LeftParen) => Value::Void,
                _ => {
                    let ty = self.parse_type()?;
                    self.expect(HeartToken::LeftParen)?;
                    let elements = self.parse_comma_list(HeartToken::RightParen, |p| p.parse_constant())?;
                    return Ok(Value::aggregate(ty, elements));
                }
            },
            _ => return Err(self.expected("a constant")),
        };
        self.advance();
        Ok(value)
    }

    fn parse_optional_annotation(&mut self) -> ParseResult<Annotation> {
        let mut annotation = Annotation::new();
        if !(self.at(HeartToken::LeftBracket) && self.peek_is(HeartToken::LeftBracket)) {
            return Ok(annotation);
        }
        self.advance();
        self.advance();
        let properties = self.parse_comma_list(HeartToken::RightBracket, |p| {
            let key = match p.current() {
                HeartToken::StringLiteral => unescape_string(p.current_text()),
                _ => p.current_text().to_string(),
            };
            if !p.eat(HeartToken::StringLiteral) {
                p.expect(HeartToken::Identifier)?;
            }
            p.expect(HeartToken::Colon)?;
            let value = p.parse_constant()?;
            Ok((key, p.program.intern(value)))
        })?;
        self.expect(HeartToken::RightBracket)?;
        for (key, value) in properties {
            annotation.set(key, value);
        }
        Ok(annotation)
    }
}

#[derive(Default)]
struct BodyScope {
    variables: HashMap<String, VariableId>,
    blocks: HashMap<String, BlockId>,
}
