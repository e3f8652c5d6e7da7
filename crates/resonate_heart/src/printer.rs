//! Canonical HEART text output.

use crate::lexer::escape_string;
use crate::HEART_VERSION;
use resonate_ir::{
    Annotation, BlockId, Connection, Endpoint, EndpointRef, Expr, Function, FunctionKind, Module, ModuleId,
    Program, Statement, SubElementIndex, Terminator, Type, Value, VariableId, VariableRole,
    PATH_SEPARATOR,
};
use std::collections::HashMap;
use std::fmt::Write;

/// Prints a program as HEART text.
///
/// The output is canonical: printing a program, parsing the text and
/// printing the result gives the same text again.
pub fn to_heart(program: &Program) -> String {
    let mut printer = Printer::new(program);
    printer.print_program();
    printer.out
}

struct Printer<'a> {
    program: &'a Program,
    out: String,
    owners: HashMap<VariableId, ModuleId>,
}

impl<'a> Printer<'a> {
    fn new(program: &'a Program) -> Self {
        let mut owners = HashMap::new();
        for (id, module) in program.modules.iter() {
            for v in module.state_variables.iter().chain(&module.specialisation_params) {
                owners.insert(*v, id);
            }
        }
        Self {
            program,
            out: String::new(),
            owners,
        }
    }

    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn print_program(&mut self) {
        let program = self.program;
        self.line(0, &format!("#HEART {HEART_VERSION}"));
        for module in program.modules.values() {
            self.out.push('\n');
            self.print_module(module);
        }
    }

    fn print_module(&mut self, module: &Module) {
        let program = self.program;
        let header = format!(
            "{} {}{}",
            module.kind.keyword(),
            module.full_name,
            self.annotation(&module.annotation)
        );
        self.line(0, &header);
        self.line(0, "{");

        for s in &module.structs {
            let structure = &program.structs[*s];
            self.line(1, &format!("struct {}", structure.name));
            self.line(1, "{");
            for member in &structure.members {
                let text = format!("{} {};", self.ty(&member.ty), member.name);
                self.line(2, &text);
            }
            self.line(1, "}");
        }

        for endpoint in module.endpoints.values() {
            let text = self.endpoint(endpoint);
            self.line(1, &text);
        }

        for v in &module.specialisation_params {
            let var = &program.variables[*v];
            let text = format!("param {} {};", self.ty(&var.ty), var.name);
            self.line(1, &text);
        }

        for v in &module.state_variables {
            let text = self.state_variable(*v);
            self.line(1, &text);
        }

        for instance in module.instances.values() {
            let mut text = format!("node {} = {}", instance.name, instance.source_name);
            if let Some(size) = instance.array_size {
                let _ = write!(text, "[{size}]");
            }
            if !instance.specialisation_args.is_empty() {
                let args: Vec<String> = instance
                    .specialisation_args
                    .iter()
                    .map(|c| self.value(program.constant(*c)))
                    .collect();
                let _ = write!(text, " ({})", args.join(", "));
            }
            let ratio = instance.clock_ratio;
            if ratio.multiplier_value() != 1 {
                let _ = write!(text, " * {}", ratio.multiplier_value());
            } else if ratio.divider_value() != 1 {
                let _ = write!(text, " / {}", ratio.divider_value());
            }
            text.push(';');
            self.line(1, &text);
        }

        for connection in module.connections.values() {
            let text = self.connection(module, connection);
            self.line(1, &text);
        }

        for f in &module.functions {
            self.print_function(&program.functions[*f]);
        }

        self.line(0, "}");
    }

    fn endpoint(&self, endpoint: &Endpoint) -> String {
        let mut text = format!("{} {}", endpoint.direction.keyword(), endpoint.name);
        match (&endpoint.details, &endpoint.hoisted_path) {
            (Some(details), _) => {
                if let Some(size) = details.array_size {
                    let _ = write!(text, "[{size}]");
                }
                let _ = write!(text, " {} ", details.kind.name());
                match details.data_types.as_slice() {
                    [single] => text.push_str(&self.ty(single)),
                    types => {
                        let names: Vec<String> = types.iter().map(|t| self.ty(t)).collect();
                        let _ = write!(text, "({})", names.join(", "));
                    }
                }
            }
            (None, Some(path)) => {
                let parts: Vec<String> = path
                    .iter()
                    .map(|seg| match seg.index {
                        Some(i) => format!("{}[{i}]", seg.name),
                        None => seg.name.clone(),
                    })
                    .collect();
                let _ = write!(text, " = {}", parts.join("."));
            }
            (None, None) => text.push_str(" = ?"),
        }
        if endpoint.needs_exposure {
            text.push_str(" exposed");
        }
        text.push_str(&self.annotation(&endpoint.annotation));
        text.push(';');
        text
    }

    fn state_variable(&self, id: VariableId) -> String {
        let var = &self.program.variables[id];
        let keyword = match var.role {
            VariableRole::External => "var external",
            VariableRole::Constant => "let",
            _ => "var",
        };
        let mut text = format!("{keyword} {} {}", self.ty(&var.ty), var.name);
        if let Some(init) = var.initial_value {
            let _ = write!(text, " = {}", self.value(self.program.constant(init)));
        }
        text.push_str(&self.annotation(&var.annotation));
        text.push(';');
        text
    }

    fn connection(&self, module: &Module, connection: &Connection) -> String {
        let mut text = String::from("connection ");
        if connection.interpolation != resonate_ir::InterpolationType::None {
            let _ = write!(text, "{} ", connection.interpolation.name());
        }
        text.push_str(&endpoint_ref(module, &connection.source));
        text.push_str(" -> ");
        if let Some(delay) = connection.delay_length {
            let _ = write!(text, "[{delay}] -> ");
        }
        text.push_str(&endpoint_ref(module, &connection.dest));
        text.push(';');
        text
    }

    fn print_function(&mut self, function: &Function) {
        let keyword = match function.kind {
            FunctionKind::Event => "event",
            FunctionKind::Intrinsic => "intrinsic",
            _ => "function",
        };
        let params: Vec<String> = function
            .parameters
            .iter()
            .map(|p| self.declaration(*p))
            .collect();
        let mut header = format!(
            "{keyword} {} ({}) -> {}",
            function.name,
            params.join(", "),
            self.ty(&function.return_type)
        );
        header.push_str(&self.annotation(&function.annotation));
        if !function.has_body() {
            header.push(';');
            self.line(1, &header);
            return;
        }
        self.line(1, &header);
        self.line(1, "{");
        for local in &function.locals {
            let keyword = match self.program.variables[*local].role {
                VariableRole::Constant => "let",
                _ => "var",
            };
            let text = format!("{keyword} {};", self.declaration(*local));
            self.line(2, &text);
        }
        for block in function.blocks.values() {
            let mut label = block.name.clone();
            if !block.parameters.is_empty() {
                let params: Vec<String> = block
                    .parameters
                    .iter()
                    .map(|p| self.declaration(*p))
                    .collect();
                let _ = write!(label, " ({})", params.join(", "));
            }
            label.push(':');
            self.line(2, &label);
            for statement in &block.statements {
                let text = self.statement(statement);
                self.line(3, &text);
            }
            let text = self.terminator(function, &block.terminator);
            self.line(3, &text);
        }
        self.line(1, "}");
    }

    fn declaration(&self, id: VariableId) -> String {
        let var = &self.program.variables[id];
        format!("{} {}", self.ty(&var.ty), var.name)
    }

    fn statement(&self, statement: &Statement) -> String {
        match statement {
            Statement::Assign { target, value } => {
                let prefix = match target {
                    Expr::Variable(v)
                        if self.program.variables[*v].role == VariableRole::Constant =>
                    {
                        "let "
                    }
                    _ => "",
                };
                format!("{prefix}{} = {};", self.expr(target), self.expr(value))
            }
            Statement::Call {
                target,
                function,
                args,
            } => {
                let call = format!(
                    "call {} ({})",
                    self.program.function_full_name(*function),
                    self.exprs(args)
                );
                match target {
                    Some(target) => format!("{} = {call};", self.expr(target)),
                    None => format!("{call};"),
                }
            }
            Statement::ReadStream { target, endpoint } => {
                format!("{} = read {endpoint};", self.expr(target))
            }
            Statement::WriteStream {
                endpoint,
                element,
                value,
            } => match element {
                Some(element) => format!(
                    "write {endpoint}[{}] {};",
                    self.expr(element),
                    self.expr(value)
                ),
                None => format!("write {endpoint} {};", self.expr(value)),
            },
            Statement::AdvanceClock => "advance;".to_string(),
        }
    }

    fn terminator(&self, function: &Function, terminator: &Terminator) -> String {
        let target = |block: BlockId, args: &[Expr]| {
            let name = &function.blocks[block].name;
            if args.is_empty() {
                name.clone()
            } else {
                format!("{name} ({})", self.exprs(args))
            }
        };
        match terminator {
            Terminator::Branch { target: b, args } => format!("branch {};", target(*b, args)),
            Terminator::BranchIf {
                condition,
                targets,
                args,
            } => format!(
                "branch_if {} ? {} : {};",
                self.expr(condition),
                target(targets[0], &args[0]),
                target(targets[1], &args[1])
            ),
            Terminator::ReturnVoid => "return;".to_string(),
            Terminator::ReturnValue(value) => format!("return {};", self.expr(value)),
        }
    }

    fn exprs(&self, exprs: &[Expr]) -> String {
        exprs.iter().map(|e| self.expr(e)).collect::<Vec<_>>().join(", ")
    }

    fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Variable(v) => {
                let name = &self.program.variables[*v].name;
                match self.owners.get(v) {
                    Some(module) => format!(
                        "{}{PATH_SEPARATOR}{name}",
                        self.program.modules[*module].full_name
                    ),
                    None => name.clone(),
                }
            }
            Expr::Constant(c) => self.value(self.program.constant(*c)),
            Expr::SubElement { parent, index } => {
                let parent = self.expr(parent);
                match index {
                    SubElementIndex::Fixed(i) => format!("{parent}[{i}]"),
                    SubElementIndex::Dynamic(e) => format!("{parent}[{}]", self.expr(e)),
                    SubElementIndex::Member(m) => format!("{parent}.{m}"),
                    SubElementIndex::Slice(a, b) => format!("{parent}[{a}:{b}]"),
                }
            }
            Expr::Cast { ty, source } => format!("cast {} ({})", self.ty(ty), self.expr(source)),
            Expr::Unary { op, source } => format!("{} ({})", op.name(), self.expr(source)),
            Expr::Binary { op, lhs, rhs } => {
                format!("{} ({}, {})", op.name(), self.expr(lhs), self.expr(rhs))
            }
            Expr::PureCall { function, args } => format!(
                "pure_call {} ({})",
                self.program.function_full_name(*function),
                self.exprs(args)
            ),
            Expr::ProcessorProperty(p) => format!("processor.{}", p.name()),
        }
    }

    fn ty(&self, ty: &Type) -> String {
        self.program.type_description(ty)
    }

    fn value(&self, value: &Value) -> String {
        match value {
            Value::Void => "void".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => format!("{v}L"),
            Value::Float32(v) => float_text(f64::from(*v), 32, format!("{v:?}f")),
            Value::Float64(v) => float_text(*v, 64, format!("{v:?}")),
            Value::String(s) => {
                escape_string(self.program.strings.try_resolve(*s).unwrap_or_default())
            }
            Value::Aggregate { ty, elements } => {
                let elements: Vec<String> = elements.iter().map(|e| self.value(e)).collect();
                format!("{} ({})", self.ty(ty), elements.join(", "))
            }
            Value::Zero(ty) => format!("{} ()", self.ty(ty)),
        }
    }

    fn annotation(&self, annotation: &Annotation) -> String {
        if annotation.is_empty() {
            return String::new();
        }
        let properties: Vec<String> = annotation
            .iter()
            .map(|(key, value)| {
                let key = if is_identifier(key) {
                    key.to_string()
                } else {
                    escape_string(key)
                };
                format!("{key}: {}", self.value(self.program.constant(value)))
            })
            .collect();
        format!(" [[{}]]", properties.join(", "))
    }
}

fn endpoint_ref(module: &Module, r: &EndpointRef) -> String {
    let mut text = match r.processor {
        Some(instance) => match module.instances.try_get(instance) {
            Some(node) => format!("{}.{}", node.name, r.endpoint),
            None => format!("?.{}", r.endpoint),
        },
        None => r.endpoint.clone(),
    };
    if let Some(index) = r.index {
        let _ = write!(text, "[{index}]");
    }
    text
}

fn float_text(value: f64, bits: u32, finite: String) -> String {
    if value.is_nan() {
        format!("_nan{bits}")
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "n" };
        format!("_{sign}inf{bits}")
    } else {
        finite
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
