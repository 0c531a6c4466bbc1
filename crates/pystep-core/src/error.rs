//! Error taxonomy. Every enum here gets a hand-rolled `Display` and a blanket
//! `std::error::Error` impl, following the teacher's `CompileError`
//! (`bytecode/compiler.rs`) rather than pulling in a derive-macro error crate.

use crate::intern::Name;
use std::fmt;

/// Surface form outside the subset, raised while building the IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    Unsupported { what: String, line: u32 },
    BadAssignTarget { line: u32 },
    CallInExpression { line: u32 },
    ReturnWithoutValue { line: u32 },
    IfWithoutElse { line: u32 },
    ScopeConflict { name: String, line: u32 },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Unsupported { what, line } => {
                write!(f, "line {line}: unsupported construct: {what}")
            }
            BuildError::BadAssignTarget { line } => {
                write!(f, "line {line}: only assignment to a single name is supported")
            }
            BuildError::CallInExpression { line } => {
                write!(f, "line {line}: function calls are not allowed inside expressions")
            }
            BuildError::ReturnWithoutValue { line } => {
                write!(f, "line {line}: return without a value is not supported")
            }
            BuildError::IfWithoutElse { line } => {
                write!(f, "line {line}: if must have an else block")
            }
            BuildError::ScopeConflict { name, line } => {
                write!(f, "line {line}: '{name}' declared both global and nonlocal")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Name-resolution failures during evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    UnboundName { name: Name, line: u32 },
    UnboundLocal { name: Name, line: u32 },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::UnboundName { name, line } => {
                write!(f, "line {line}: unbound name {name}")
            }
            LookupError::UnboundLocal { name, line } => {
                write!(f, "line {line}: local {name} read before assignment")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Failures in `CallAssign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    NotCallable { name: Name, line: u32 },
    Arity { expected: usize, got: usize, line: u32 },
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::NotCallable { name, line } => {
                write!(f, "line {line}: {name} is not callable")
            }
            CallError::Arity { expected, got, line } => {
                write!(f, "line {line}: expected {expected} argument(s), got {got}")
            }
        }
    }
}

impl std::error::Error for CallError {}

/// Failures in the expression evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    TypeMismatch { op: String, line: u32 },
    DivisionByZero { line: u32 },
    UnsupportedOperator { op: String, line: u32 },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::TypeMismatch { op, line } => {
                write!(f, "line {line}: operator '{op}' not defined on these operands")
            }
            EvalError::DivisionByZero { line } => write!(f, "line {line}: division by zero"),
            EvalError::UnsupportedOperator { op, line } => {
                write!(f, "line {line}: unsupported operator '{op}'")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Corrupted IR or state. Fatal; indicates a bug in this crate, not in the
/// interpreted program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Internal {
    InstructionIndexMiss { line: u32 },
    CtfTableMiss { which: &'static str, line: u32 },
    EmptyContinuation,
    StepBudgetExceeded { limit: usize },
    DepthBudgetExceeded { limit: usize },
}

impl fmt::Display for Internal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Internal::InstructionIndexMiss { line } => {
                write!(f, "no instruction indexed at line {line}")
            }
            Internal::CtfTableMiss { which, line } => {
                write!(f, "no '{which}' CTF entry for line {line}")
            }
            Internal::EmptyContinuation => write!(f, "continuation stack is empty"),
            Internal::StepBudgetExceeded { limit } => {
                write!(f, "step budget of {limit} exceeded")
            }
            Internal::DepthBudgetExceeded { limit } => {
                write!(f, "continuation depth budget of {limit} exceeded")
            }
        }
    }
}

impl std::error::Error for Internal {}

/// Unifies every error kind so `create`/`step` can return one `Result` type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Build(BuildError),
    Lookup(LookupError),
    Call(CallError),
    Eval(EvalError),
    Internal(Internal),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Build(e) => write!(f, "{e}"),
            Error::Lookup(e) => write!(f, "{e}"),
            Error::Call(e) => write!(f, "{e}"),
            Error::Eval(e) => write!(f, "{e}"),
            Error::Internal(e) => write!(f, "internal error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<BuildError> for Error {
    fn from(e: BuildError) -> Self {
        Error::Build(e)
    }
}
impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        Error::Lookup(e)
    }
}
impl From<CallError> for Error {
    fn from(e: CallError) -> Self {
        Error::Call(e)
    }
}
impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Eval(e)
    }
}
impl From<Internal> for Error {
    fn from(e: Internal) -> Self {
        Error::Internal(e)
    }
}
