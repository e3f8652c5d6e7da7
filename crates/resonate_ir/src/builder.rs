//! Incremental construction of function bodies.

use crate::function::{Block, Function, FunctionKind};
use crate::ids::{BlockId, FunctionId, ModuleId, VariableId};
use crate::program::Program;
use crate::stmt::{Expr, Statement, Terminator};
use crate::types::Type;
use crate::value::Value;
use crate::variable::{Variable, VariableRole};

/// Builds one function inside a module and adds it to the program on
/// [`finish`](FunctionBuilder::finish).
///
/// Statements go to the current block. Adding a statement before any block
/// exists creates an entry block named `@block_0`.
pub struct FunctionBuilder<'a> {
    program: &'a mut Program,
    function: Function,
    current: Option<BlockId>,
}

impl<'a> FunctionBuilder<'a> {
    /// Starts a function. Inside a processor the kind follows from the name;
    /// elsewhere it is [`FunctionKind::Normal`].
    pub fn new(program: &'a mut Program, module: ModuleId, name: &str, return_type: Type) -> Self {
        let kind = if program.modules[module].is_processor() {
            FunctionKind::for_processor_function(name)
        } else {
            FunctionKind::Normal
        };
        Self {
            program,
            function: Function::new(name, module, kind, return_type),
            current: None,
        }
    }

    /// Overrides the function kind.
    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.function.kind = kind;
        self
    }

    /// Gives read access to the program being built into.
    pub fn program(&self) -> &Program {
        self.program
    }

    /// Interns a constant and returns an expression for it.
    pub fn constant(&mut self, value: Value) -> Expr {
        Expr::Constant(self.program.intern(value))
    }

    /// Adds a parameter.
    pub fn add_parameter(&mut self, name: &str, ty: Type) -> VariableId {
        let id = self
            .program
            .add_variable(Variable::new(local_name(name), ty, VariableRole::Parameter));
        self.function.parameters.push(id);
        id
    }

    /// Adds a mutable local.
    pub fn add_local(&mut self, name: &str, ty: Type) -> VariableId {
        self.add_local_with_role(name, ty, VariableRole::MutableLocal)
    }

    /// Adds a local that is assigned once.
    pub fn add_constant_local(&mut self, name: &str, ty: Type) -> VariableId {
        self.add_local_with_role(name, ty, VariableRole::Constant)
    }

    fn add_local_with_role(&mut self, name: &str, ty: Type, role: VariableRole) -> VariableId {
        let id = self.program.add_variable(Variable::new(local_name(name), ty, role));
        self.function.locals.push(id);
        id
    }

    /// Adds an empty block without making it current.
    pub fn add_block(&mut self, name: &str) -> BlockId {
        self.function.blocks.alloc(Block::new(name))
    }

    /// Adds a parameter to a block.
    pub fn add_block_parameter(&mut self, block: BlockId, name: &str, ty: Type) -> VariableId {
        let id = self
            .program
            .add_variable(Variable::new(local_name(name), ty, VariableRole::Parameter));
        self.function.blocks[block].parameters.push(id);
        id
    }

    /// Makes `block` the target of subsequent statements.
    pub fn begin_block(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    /// Adds a block and makes it current.
    pub fn create_block(&mut self, name: &str) -> BlockId {
        let id = self.add_block(name);
        self.begin_block(id);
        id
    }

    fn current_block(&mut self) -> BlockId {
        match self.current {
            Some(block) => block,
            None => self.create_block("@block_0"),
        }
    }

    /// Appends a statement to the current block.
    pub fn add_statement(&mut self, statement: Statement) {
        let block = self.current_block();
        self.function.blocks[block].statements.push(statement);
    }

    /// Appends `target = value`.
    pub fn assign(&mut self, target: Expr, value: Expr) {
        self.add_statement(Statement::Assign { target, value });
    }

    /// Appends a call.
    pub fn call(&mut self, target: Option<Expr>, function: FunctionId, args: Vec<Expr>) {
        self.add_statement(Statement::Call {
            target,
            function,
            args,
        });
    }

    /// Appends a stream read.
    pub fn read_stream(&mut self, target: Expr, endpoint: &str) {
        self.add_statement(Statement::ReadStream {
            target,
            endpoint: endpoint.to_string(),
        });
    }

    /// Appends a stream write.
    pub fn write_stream(&mut self, endpoint: &str, element: Option<Expr>, value: Expr) {
        self.add_statement(Statement::WriteStream {
            endpoint: endpoint.to_string(),
            element,
            value,
        });
    }

    /// Appends an `advance`.
    pub fn advance(&mut self) {
        self.add_statement(Statement::AdvanceClock);
    }

    /// Sets the current block's terminator.
    pub fn terminate(&mut self, terminator: Terminator) {
        let block = self.current_block();
        self.function.blocks[block].terminator = terminator;
    }

    /// Ends the current block with an unconditional branch.
    pub fn branch(&mut self, target: BlockId, args: Vec<Expr>) {
        self.terminate(Terminator::Branch { target, args });
    }

    /// Ends the current block with a conditional branch.
    pub fn branch_if(&mut self, condition: Expr, if_true: BlockId, if_false: BlockId) {
        self.terminate(Terminator::BranchIf {
            condition,
            targets: [if_true, if_false],
            args: [Vec::new(), Vec::new()],
        });
    }

    /// Ends the current block with a void return.
    pub fn return_void(&mut self) {
        self.terminate(Terminator::ReturnVoid);
    }

    /// Ends the current block by returning a value.
    pub fn return_value(&mut self, value: Expr) {
        self.terminate(Terminator::ReturnValue(value));
    }

    /// Adds the function to the program and its module.
    pub fn finish(self) -> FunctionId {
        self.program.add_function(self.function)
    }
}

fn local_name(name: &str) -> String {
    if name.starts_with('$') {
        name.to_string()
    } else {
        format!("${name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;
    use crate::stmt::BinaryOp;

    #[test]
    fn builds_a_counting_loop() {
        let mut program = Program::new();
        let m = program.add_module(ModuleKind::Processor, "Counter");
        let mut b = FunctionBuilder::new(&mut program, m, "run", Type::void());
        let count = b.add_local("count", Type::int32());
        let zero = b.constant(Value::Int32(0));
        b.assign(Expr::Variable(count), zero);
        let body = b.add_block("@loop");
        b.branch(body, vec![]);
        b.begin_block(body);
        let one = b.constant(Value::Int32(1));
        b.assign(
            Expr::Variable(count),
            Expr::binary(BinaryOp::Add, Expr::Variable(count), one),
        );
        b.advance();
        b.branch(body, vec![]);
        let run = b.finish();

        let f = &program.functions[run];
        assert_eq!(f.kind, FunctionKind::Run);
        assert_eq!(f.blocks.len(), 2);
        assert_eq!(f.blocks[f.entry_block().unwrap()].name, "@block_0");
        assert_eq!(program.variables[count].name, "$count");
        assert!(f.calls_advance());
        assert_eq!(program.modules[m].functions, vec![run]);
    }

    #[test]
    fn kind_defaults_outside_processors() {
        let mut program = Program::new();
        let ns = program.add_module(ModuleKind::Namespace, "Lib");
        let f = FunctionBuilder::new(&mut program, ns, "run", Type::void()).finish();
        assert_eq!(program.functions[f].kind, FunctionKind::Normal);
        let g = FunctionBuilder::new(&mut program, ns, "onNote", Type::void())
            .with_kind(FunctionKind::Event)
            .finish();
        assert_eq!(program.functions[g].kind, FunctionKind::Event);
    }

    #[test]
    fn block_parameters() {
        let mut program = Program::new();
        let ns = program.add_module(ModuleKind::Namespace, "Lib");
        let mut b = FunctionBuilder::new(&mut program, ns, "pick", Type::int32());
        let entry = b.create_block("@entry");
        let exit = b.add_block("@exit");
        let p = b.add_block_parameter(exit, "result", Type::int32());
        let seven = b.constant(Value::Int32(7));
        b.branch(exit, vec![seven]);
        b.begin_block(exit);
        b.return_value(Expr::Variable(p));
        let f = b.finish();
        assert_eq!(program.functions[f].entry_block(), Some(entry));
        let exit_block = &program.functions[f].blocks[exit];
        assert_eq!(exit_block.parameters, vec![p]);
        assert!(exit_block.terminator.is_return());
    }
}
