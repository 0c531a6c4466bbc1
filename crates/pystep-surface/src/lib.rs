//! `ruff_python_parser`-backed lowering from Python source text directly into
//! `pystep_core`'s IR.
//!
//! Structurally this is the reference implementation's `Visitor` (a stack of
//! "currently open" blocks, one rejection message per unsupported surface
//! form) restructured against `ruff_python_ast` node shapes and driven
//! through `pystep_core::builder::IrBuilder` instead of building its own
//! parallel statement tree. Unlike the reference implementation's companion
//! *simplifier*, which rewrites nonconforming programs (injecting `else:
//! pass`, extracting nested calls into temporaries), this crate performs no
//! normalization: it rejects anything outside the subset with a `BuildError`
//! the moment it's found. The IR builder contract is specified only by the
//! guarantees it provides to the core, and rejection is one valid such
//! guarantee.

use pystep_core::builder::IrBuilder;
use pystep_core::error::BuildError;
use pystep_core::expr::{BinaryOp, CompareOp, Constant, Expr as CoreExpr, UnaryOp};
use pystep_core::intern::Name;
use pystep_core::ir::{Instruction, Program};

use ruff_python_ast::{
    self as ast, BoolOp, CmpOp, ElifElseClause, Expr as AstExpr, Operator as AstOperator, Stmt,
    StmtFunctionDef, StmtIf, StmtWhile, UnaryOp as AstUnaryOp,
};
use ruff_python_parser::parse_module;
use ruff_text_size::{Ranged, TextSize};

/// Parses `source` and lowers it into a [`Program`], or the first
/// [`BuildError`] encountered while walking the tree.
pub fn lower(source: &str) -> Result<Program, BuildError> {
    let parsed = parse_module(source).map_err(|err| BuildError::Unsupported {
        what: format!("syntax error: {err}"),
        line: 1,
    })?;
    let module = parsed.into_syntax();

    let mut lowerer = Lowerer::new(source);
    lowerer.lower_suite(module.body)?;
    let program = lowerer.builder.finish();

    tracing::debug!(first_line = program.first_line(), "lowered source into IR");
    Ok(program)
}

struct Lowerer<'a> {
    builder: IrBuilder,
    /// Byte offset of every `'\n'` in the source, used to turn a
    /// `ruff_text_size::TextSize` range start into a 1-based source line —
    /// ruff's AST carries byte ranges, not line numbers, so this index is
    /// rebuilt once up front rather than scanned per node.
    line_ends: Vec<usize>,
    _source: &'a str,
}

impl<'a> Lowerer<'a> {
    fn new(source: &'a str) -> Self {
        let line_ends = source.char_indices().filter(|&(_, c)| c == '\n').map(|(i, _)| i).collect();
        Self { builder: IrBuilder::new(), line_ends, _source: source }
    }

    fn line_of(&self, offset: TextSize) -> u32 {
        let offset: usize = offset.into();
        for (i, &end) in self.line_ends.iter().enumerate() {
            if offset <= end {
                return (i + 1) as u32;
            }
        }
        (self.line_ends.len() + 1) as u32
    }

    fn lower_suite(&mut self, body: Vec<Stmt>) -> Result<(), BuildError> {
        for stmt in body {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: Stmt) -> Result<(), BuildError> {
        match stmt {
            Stmt::Pass(_) => {
                self.builder.add_leaf(self.line_of(stmt_start(&stmt)), Instruction::Pass);
                Ok(())
            }
            Stmt::Break(node) => {
                self.builder.add_leaf(self.line_of(node.range.start()), Instruction::Break);
                Ok(())
            }
            Stmt::Continue(node) => {
                self.builder.add_leaf(self.line_of(node.range.start()), Instruction::Continue);
                Ok(())
            }
            Stmt::Assign(node) => self.lower_assign(node),
            Stmt::If(node) => self.lower_if(node),
            Stmt::While(node) => self.lower_while(node),
            Stmt::FunctionDef(node) => self.lower_def(node),
            Stmt::Return(node) => self.lower_return(node),
            Stmt::Global(node) => self.lower_global(node),
            Stmt::Nonlocal(node) => self.lower_nonlocal(node),
            other => Err(BuildError::Unsupported { what: unsupported_stmt_name(&other), line: self.line_of(stmt_start(&other)) }),
        }
    }

    fn lower_assign(&mut self, node: ast::StmtAssign) -> Result<(), BuildError> {
        let ast::StmtAssign { targets, value, range, .. } = node;
        let line = self.line_of(range.start());
        if targets.len() != 1 {
            return Err(BuildError::BadAssignTarget { line });
        }
        let AstExpr::Name(ast::ExprName { id: target_id, .. }) = &targets[0] else {
            return Err(BuildError::BadAssignTarget { line });
        };
        let target = self.builder.intern(target_id.as_str());
        self.builder.update_locals(target);

        if let AstExpr::Call(call) = *value {
            let ast::ExprCall { func, arguments, .. } = call;
            let AstExpr::Name(ast::ExprName { id: callee_id, .. }) = *func else {
                return Err(BuildError::BadAssignTarget { line });
            };
            if !arguments.keywords.is_empty() {
                return Err(BuildError::Unsupported { what: "keyword arguments".to_owned(), line });
            }
            let callee = self.builder.intern(callee_id.as_str());
            let mut args = Vec::with_capacity(arguments.args.len());
            for arg in arguments.args {
                args.push(self.lower_expr(arg)?);
            }
            self.builder.add_leaf(line, Instruction::CallAssign { target, callee, args });
        } else {
            let expr = self.lower_expr(*value)?;
            self.builder.add_leaf(line, Instruction::ExprAssign { target, expr });
        }
        Ok(())
    }

    fn lower_if(&mut self, node: StmtIf) -> Result<(), BuildError> {
        let StmtIf { test, body, elif_else_clauses, range } = node;
        let line = self.line_of(range.start());
        if elif_else_clauses.len() != 1 {
            return Err(BuildError::IfWithoutElse { line });
        }
        let ElifElseClause { test: clause_test, body: else_body, .. } =
            elif_else_clauses.into_iter().next().expect("checked len == 1 above");
        if clause_test.is_some() {
            return Err(BuildError::IfWithoutElse { line });
        }

        let test_expr = self.lower_expr(*test)?;
        self.builder.enter_block(false);
        self.lower_suite(body)?;
        let then_block = self.builder.exit_block();
        self.builder.enter_block(false);
        self.lower_suite(else_body)?;
        let else_block = self.builder.exit_block();
        self.builder.add_if(line, test_expr, then_block, else_block);
        Ok(())
    }

    fn lower_while(&mut self, node: StmtWhile) -> Result<(), BuildError> {
        let StmtWhile { test, body, orelse, range } = node;
        let line = self.line_of(range.start());
        if !orelse.is_empty() {
            return Err(BuildError::Unsupported { what: "while-else".to_owned(), line });
        }
        let test_expr = self.lower_expr(*test)?;
        self.builder.enter_block(false);
        self.lower_suite(body)?;
        let body_block = self.builder.exit_block();
        self.builder.add_while(line, test_expr, body_block);
        Ok(())
    }

    fn lower_def(&mut self, node: StmtFunctionDef) -> Result<(), BuildError> {
        let StmtFunctionDef { name, parameters, body, range, .. } = node;
        let line = self.line_of(range.start());
        if !parameters.posonlyargs.is_empty() || !parameters.kwonlyargs.is_empty() || parameters.vararg.is_some() || parameters.kwarg.is_some() {
            return Err(BuildError::Unsupported { what: "positional-only, keyword-only, *args, or **kwargs parameters".to_owned(), line });
        }
        if parameters.args.iter().any(|p| p.default.is_some()) {
            return Err(BuildError::Unsupported { what: "default parameter values".to_owned(), line });
        }

        let formals: Vec<Name> = parameters.args.iter().map(|p| self.builder.intern(p.parameter.name.id.as_str())).collect();
        let def_name = self.builder.intern(name.id.as_str());
        self.builder.update_locals(def_name);

        self.builder.enter_block(true);
        for &formal in &formals {
            self.builder.update_locals(formal);
        }
        self.lower_suite(body)?;
        let func_block = self.builder.exit_block();
        self.builder.add_def(line, def_name, formals, func_block);
        Ok(())
    }

    fn lower_return(&mut self, node: ast::StmtReturn) -> Result<(), BuildError> {
        let ast::StmtReturn { value, range, .. } = node;
        let line = self.line_of(range.start());
        let Some(value) = value else {
            return Err(BuildError::ReturnWithoutValue { line });
        };
        let expr = self.lower_expr(*value)?;
        self.builder.add_leaf(line, Instruction::Ret { expr });
        Ok(())
    }

    fn lower_global(&mut self, node: ast::StmtGlobal) -> Result<(), BuildError> {
        let ast::StmtGlobal { names, range, .. } = node;
        let line = self.line_of(range.start());
        let names: Vec<Name> = names.iter().map(|id| self.builder.intern(id.id.as_str())).collect();
        self.builder.declare_global(&names, line)?;
        self.builder.add_leaf(line, Instruction::Global { names });
        Ok(())
    }

    fn lower_nonlocal(&mut self, node: ast::StmtNonlocal) -> Result<(), BuildError> {
        let ast::StmtNonlocal { names, range, .. } = node;
        let line = self.line_of(range.start());
        let names: Vec<Name> = names.iter().map(|id| self.builder.intern(id.id.as_str())).collect();
        self.builder.declare_nonlocal(&names, line)?;
        self.builder.add_leaf(line, Instruction::Nonlocal { names });
        Ok(())
    }

    /// Lowers a surface expression. Per the expression invariant (§3/§10.5),
    /// no `Call` node may appear here — a call is only valid as the bare RHS
    /// of an assignment, handled directly in `lower_assign`.
    fn lower_expr(&mut self, expr: AstExpr) -> Result<CoreExpr, BuildError> {
        let line = self.line_of(expr.range().start());
        match expr {
            AstExpr::NumberLiteral(ast::ExprNumberLiteral { value, .. }) => match value {
                ast::Number::Int(i) => i
                    .as_i64()
                    .map(|n| CoreExpr::Constant(Constant::Int(n)))
                    .ok_or_else(|| BuildError::Unsupported { what: "integer literal out of i64 range".to_owned(), line }),
                ast::Number::Float(f) => Ok(CoreExpr::Constant(Constant::Float(f))),
                ast::Number::Complex { .. } => Err(BuildError::Unsupported { what: "complex literals".to_owned(), line }),
            },
            AstExpr::BooleanLiteral(ast::ExprBooleanLiteral { value, .. }) => Ok(CoreExpr::Constant(Constant::Bool(value))),
            AstExpr::NoneLiteral(_) => Ok(CoreExpr::Constant(Constant::None)),
            AstExpr::StringLiteral(ast::ExprStringLiteral { value, .. }) => Ok(CoreExpr::Constant(Constant::Str(value.to_str().to_owned()))),
            AstExpr::Name(ast::ExprName { id, .. }) => Ok(CoreExpr::Name(self.builder.intern(id.as_str()))),
            AstExpr::UnaryOp(ast::ExprUnaryOp { op, operand, .. }) => {
                let operand = Box::new(self.lower_expr(*operand)?);
                Ok(CoreExpr::Unary { op: convert_unary_op(op), operand })
            }
            AstExpr::BinOp(ast::ExprBinOp { left, op, right, .. }) => {
                let left = Box::new(self.lower_expr(*left)?);
                let right = Box::new(self.lower_expr(*right)?);
                Ok(CoreExpr::Binary { op: convert_binary_op(op), left, right })
            }
            AstExpr::BoolOp(ast::ExprBoolOp { op, values, .. }) => {
                // `a and b and c` right-folds into nested binary nodes, per
                // the deliberate narrow extension documented in DESIGN.md.
                let bin_op = convert_bool_op(op);
                let mut values = values.into_iter().rev();
                let last = values.next().expect("ruff never produces an empty BoolOp.values");
                let mut acc = self.lower_expr(last)?;
                for value in values {
                    let left = self.lower_expr(value)?;
                    acc = CoreExpr::Binary { op: bin_op, left: Box::new(left), right: Box::new(acc) };
                }
                Ok(acc)
            }
            AstExpr::Compare(ast::ExprCompare { left, ops, comparators, .. }) => {
                let first = Box::new(self.lower_expr(*left)?);
                let mut rest = Vec::with_capacity(ops.len());
                for (op, comparator) in ops.into_iter().zip(comparators.into_iter()) {
                    rest.push((convert_compare_op(op), self.lower_expr(comparator)?));
                }
                Ok(CoreExpr::Compare { first, rest })
            }
            AstExpr::Call(_) => Err(BuildError::CallInExpression { line }),
            other => Err(BuildError::Unsupported { what: unsupported_expr_name(&other), line }),
        }
    }
}

fn convert_unary_op(op: AstUnaryOp) -> UnaryOp {
    match op {
        AstUnaryOp::Invert => UnaryOp::Invert,
        AstUnaryOp::Not => UnaryOp::Not,
        AstUnaryOp::UAdd => UnaryOp::Plus,
        AstUnaryOp::USub => UnaryOp::Minus,
    }
}

fn convert_binary_op(op: AstOperator) -> BinaryOp {
    match op {
        AstOperator::Add => BinaryOp::Add,
        AstOperator::Sub => BinaryOp::Sub,
        AstOperator::Mult => BinaryOp::Mult,
        AstOperator::MatMult => BinaryOp::MatMult,
        AstOperator::Div => BinaryOp::Div,
        AstOperator::Mod => BinaryOp::Mod,
        AstOperator::Pow => BinaryOp::Pow,
        AstOperator::LShift => BinaryOp::LShift,
        AstOperator::RShift => BinaryOp::RShift,
        AstOperator::BitOr => BinaryOp::BitOr,
        AstOperator::BitXor => BinaryOp::BitXor,
        AstOperator::BitAnd => BinaryOp::BitAnd,
        AstOperator::FloorDiv => BinaryOp::FloorDiv,
    }
}

fn convert_bool_op(op: BoolOp) -> BinaryOp {
    match op {
        BoolOp::And => BinaryOp::And,
        BoolOp::Or => BinaryOp::Or,
    }
}

fn convert_compare_op(op: CmpOp) -> CompareOp {
    match op {
        CmpOp::Eq => CompareOp::Eq,
        CmpOp::NotEq => CompareOp::NotEq,
        CmpOp::Lt => CompareOp::Lt,
        CmpOp::LtE => CompareOp::LtE,
        CmpOp::Gt => CompareOp::Gt,
        CmpOp::GtE => CompareOp::GtE,
        CmpOp::Is => CompareOp::Is,
        CmpOp::IsNot => CompareOp::IsNot,
        CmpOp::In => CompareOp::In,
        CmpOp::NotIn => CompareOp::NotIn,
    }
}

fn stmt_start(stmt: &Stmt) -> TextSize {
    stmt.range().start()
}

fn unsupported_stmt_name(stmt: &Stmt) -> String {
    match stmt {
        Stmt::For(_) => "for loops".to_owned(),
        Stmt::With(_) => "with statements".to_owned(),
        Stmt::Try(_) => "try/except".to_owned(),
        Stmt::Import(_) | Stmt::ImportFrom(_) => "import statements".to_owned(),
        Stmt::ClassDef(_) => "class definitions".to_owned(),
        Stmt::AugAssign(_) => "augmented assignment".to_owned(),
        Stmt::AnnAssign(_) => "annotated assignment".to_owned(),
        Stmt::Match(_) => "match statements".to_owned(),
        Stmt::Raise(_) => "raise statements".to_owned(),
        Stmt::Assert(_) => "assert statements".to_owned(),
        Stmt::Delete(_) => "del statements".to_owned(),
        Stmt::TypeAlias(_) => "type alias statements".to_owned(),
        Stmt::Expr(_) => "bare expression statements".to_owned(),
        Stmt::IpyEscapeCommand(_) => "IPython escape commands".to_owned(),
        _ => "unsupported statement".to_owned(),
    }
}

fn unsupported_expr_name(expr: &AstExpr) -> String {
    match expr {
        AstExpr::List(_) => "list literals".to_owned(),
        AstExpr::Dict(_) => "dict literals".to_owned(),
        AstExpr::Set(_) => "set literals".to_owned(),
        AstExpr::Tuple(_) => "tuple literals".to_owned(),
        AstExpr::Lambda(_) => "lambda expressions".to_owned(),
        AstExpr::FString(_) => "f-strings".to_owned(),
        AstExpr::Subscript(_) => "subscripting".to_owned(),
        AstExpr::Attribute(_) => "attribute access".to_owned(),
        AstExpr::ListComp(_) => "list comprehensions".to_owned(),
        AstExpr::SetComp(_) => "set comprehensions".to_owned(),
        AstExpr::DictComp(_) => "dict comprehensions".to_owned(),
        AstExpr::Generator(_) => "generator expressions".to_owned(),
        AstExpr::Yield(_) | AstExpr::YieldFrom(_) => "yield".to_owned(),
        AstExpr::Await(_) => "await".to_owned(),
        AstExpr::Starred(_) => "starred expressions".to_owned(),
        AstExpr::If(_) => "conditional expressions".to_owned(),
        AstExpr::Named(_) => "named (walrus) expressions".to_owned(),
        AstExpr::Slice(_) => "slice expressions".to_owned(),
        _ => "unsupported expression".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pystep_core::state::State;

    fn run_to_completion(source: &str) -> State {
        let program = lower(source).expect("source should lower");
        pystep_core::validate::validate(&program).expect("lowered program should validate");
        let mut state = State::create(program);
        state.run_to_completion(pystep_core::state::StepLimits::default()).expect("program should run to completion");
        state
    }

    #[test]
    fn straight_line_assignment() {
        let state = run_to_completion("x = 1\ny = x + 2\npass\n");
        let snap = state.snapshot();
        let globals = &snap.e[&pystep_core::env::GLOBAL_ENV_ID.index()];
        assert_eq!(globals["x"], serde_json::json!(1));
        assert_eq!(globals["y"], serde_json::json!(3));
    }

    #[test]
    fn if_else_takes_the_true_branch() {
        let state = run_to_completion("x = 5\nif x > 0:\n    y = 1\nelse:\n    y = -1\npass\n");
        let snap = state.snapshot();
        let globals = &snap.e[&pystep_core::env::GLOBAL_ENV_ID.index()];
        assert_eq!(globals["y"], serde_json::json!(1));
    }

    #[test]
    fn while_loop_accumulates() {
        let state = run_to_completion("i = 0\ns = 0\nwhile i < 3:\n    s = s + i\n    i = i + 1\n    continue\npass\n");
        let snap = state.snapshot();
        let globals = &snap.e[&pystep_core::env::GLOBAL_ENV_ID.index()];
        assert_eq!(globals["i"], serde_json::json!(3));
        assert_eq!(globals["s"], serde_json::json!(3));
    }

    #[test]
    fn function_call_and_closure_over_parent() {
        let source = "\
def make_adder(n):
    def add(x):
        r = x + n
        return r
    return add
f = make_adder(10)
y = f(5)
";
        let state = run_to_completion(source);
        let snap = state.snapshot();
        let globals = &snap.e[&pystep_core::env::GLOBAL_ENV_ID.index()];
        assert_eq!(globals["y"], serde_json::json!(15));
    }

    #[test]
    fn division_result_is_float() {
        let state = run_to_completion("x = 7 / 2\npass\n");
        let snap = state.snapshot();
        let globals = &snap.e[&pystep_core::env::GLOBAL_ENV_ID.index()];
        assert_eq!(globals["x"], serde_json::json!(3.5));
    }

    #[test]
    fn boolean_and_or_lower_to_chained_binary_ops() {
        let state = run_to_completion("x = 1\ny = 0\nz = x and y\npass\n");
        let snap = state.snapshot();
        let globals = &snap.e[&pystep_core::env::GLOBAL_ENV_ID.index()];
        assert_eq!(globals["z"], serde_json::json!(false));
    }
}
