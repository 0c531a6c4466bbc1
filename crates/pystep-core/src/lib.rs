//! Small-step, observable interpreter core for a restricted Python-like
//! subset: an intermediate representation, control-transfer-function (CTF)
//! tables precomputed per line, and a stepper that advances one instruction
//! at a time under proper lexical scoping.
//!
//! This crate knows nothing about Python syntax — it consumes the minimal
//! typed IR built by [`builder::IrBuilder`] (or any other front end; see
//! `pystep-surface` for a `ruff_python_parser`-backed one) and exposes the
//! debugger-facing primitives a host needs: [`state::State::step`],
//! [`state::State::is_final`], [`state::State::snapshot`], and
//! [`state::program_structure`].

pub mod builder;
pub mod continuation;
pub mod ctf;
pub mod env;
pub mod error;
pub mod eval;
pub mod expr;
pub mod intern;
pub mod ir;
pub mod parent_chain;
pub mod resolver;
pub mod session;
pub mod state;
pub mod stepper;
pub mod validate;
pub mod value;

pub use crate::builder::IrBuilder;
pub use crate::ctf::CtfTables;
pub use crate::env::{EnvId, EnvStore, GLOBAL_ENV_ID};
pub use crate::error::{BuildError, CallError, Error, EvalError, Internal, LookupError};
pub use crate::ir::{Instruction, Program};
pub use crate::session::{SessionId, SessionManager};
pub use crate::state::{program_structure, Snapshot, State, StepLimits};
pub use crate::value::{Closure, Value};
