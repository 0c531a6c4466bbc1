//! The dispatch loop (§4.8): given the current continuation top, looks up
//! the instruction at that line and applies exactly one of the rules below,
//! then advances (or pushes/pops) the continuation. A step either commits
//! cleanly or returns an error leaving `envs`/`parents`/`k` untouched — every
//! failure path below returns before any mutation happens.

use crate::continuation::{Context, Continuation};
use crate::ctf::CtfTables;
use crate::env::EnvStore;
use crate::error::{CallError, Error, Internal};
use crate::eval::{eval, EvalCtx, EvalFailure};
use crate::intern::Name;
use crate::ir::{Instruction, Ir, StmtId, StmtNode};
use crate::parent_chain::ParentChain;
use crate::resolver::Resolver;
use crate::value::{Closure, Value};

fn next_line(ctfs: &CtfTables, line: u32) -> Result<u32, Internal> {
    ctfs.next.get(&line).copied().ok_or(Internal::CtfTableMiss { which: "next", line })
}

fn true_line(ctfs: &CtfTables, line: u32) -> Result<u32, Internal> {
    ctfs.true_.get(&line).copied().ok_or(Internal::CtfTableMiss { which: "true", line })
}

fn false_line(ctfs: &CtfTables, line: u32) -> Result<u32, Internal> {
    ctfs.false_.get(&line).copied().ok_or(Internal::CtfTableMiss { which: "false", line })
}

fn stmt_at(ir: &Ir, line: u32) -> Result<StmtId, Internal> {
    ir.stmt_at_line(line).ok_or(Internal::InstructionIndexMiss { line })
}

impl From<EvalFailure> for Error {
    fn from(e: EvalFailure) -> Self {
        match e {
            EvalFailure::Lookup(e) => Error::Lookup(e),
            EvalFailure::Eval(e) => Error::Eval(e),
        }
    }
}

/// Advances `state` by exactly one instruction. Callers must check
/// `ctfs.is_final(pc)` first — stepping a terminal PC is a caller bug, not a
/// runtime error, and is not guarded against here.
pub fn step(
    ir: &Ir,
    ctfs: &CtfTables,
    envs: &mut EnvStore,
    parents: &mut ParentChain,
    k: &mut Continuation,
) -> Result<(), Error> {
    let (line, top_env) = {
        let ctx = k.top()?;
        (ctx.lineno, ctx.env_id)
    };
    let stmt = stmt_at(ir, line)?;

    match ir.stmt(stmt) {
        StmtNode::Leaf { instr, .. } => match &instr.kind {
            Instruction::Pass | Instruction::Break | Instruction::Continue | Instruction::Global { .. } | Instruction::Nonlocal { .. } => {
                advance(ctfs, k, line)
            }
            Instruction::ExprAssign { target, expr } => {
                let value = eval_in(ir, envs, parents, stmt, top_env, line, expr)?;
                let resolver = Resolver::new(ir, envs, parents);
                let env_id = resolver.resolve_env(stmt, top_env, *target, line)?;
                envs.bind(env_id, *target, value);
                advance(ctfs, k, line)
            }
            Instruction::CallAssign { callee, args, .. } => step_call(ir, envs, parents, k, stmt, top_env, line, *callee, args),
            Instruction::Ret { expr } => step_return(ir, ctfs, envs, parents, k, stmt, top_env, line, expr),
            Instruction::Def { .. } | Instruction::IfTest { .. } | Instruction::WhileTest { .. } => {
                unreachable!("Def/IfTest/WhileTest are head instructions of their own StmtNode variant, never wrapped in a Leaf")
            }
        },
        StmtNode::If { test, .. } => step_test(ir, ctfs, envs, parents, k, stmt, top_env, line, &test.kind),
        StmtNode::While { test, .. } => step_test(ir, ctfs, envs, parents, k, stmt, top_env, line, &test.kind),
        StmtNode::Def { head, body, .. } => {
            let Instruction::Def { name, formals } = &head.kind else {
                unreachable!("a Def statement's head instruction is always Instruction::Def")
            };
            let closure = Value::Closure(Closure {
                entry_line: ir.block_first_line(*body),
                formals: formals.clone(),
                parent_env_id: top_env,
            });
            let resolver = Resolver::new(ir, envs, parents);
            let env_id = resolver.resolve_env(stmt, top_env, *name, line)?;
            envs.bind(env_id, *name, closure);
            advance(ctfs, k, line)
        }
    }
}

fn advance(ctfs: &CtfTables, k: &mut Continuation, line: u32) -> Result<(), Error> {
    let next = next_line(ctfs, line)?;
    k.top_mut()?.lineno = next;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn eval_in(
    ir: &Ir,
    envs: &EnvStore,
    parents: &ParentChain,
    stmt: StmtId,
    top_env: crate::env::EnvId,
    line: u32,
    expr: &crate::expr::Expr,
) -> Result<Value, Error> {
    let ctx = EvalCtx { ir, envs, parents, stmt, top_env, line };
    Ok(eval(expr, &ctx)?)
}

#[allow(clippy::too_many_arguments)]
fn step_test(
    ir: &Ir,
    ctfs: &CtfTables,
    envs: &mut EnvStore,
    parents: &mut ParentChain,
    k: &mut Continuation,
    stmt: StmtId,
    top_env: crate::env::EnvId,
    line: u32,
    kind: &Instruction,
) -> Result<(), Error> {
    let expr = match kind {
        Instruction::IfTest { expr } | Instruction::WhileTest { expr } => expr,
        _ => unreachable!("step_test only ever sees a test instruction"),
    };
    let value = eval_in(ir, envs, parents, stmt, top_env, line, expr)?;
    let target = if value.truthy() { true_line(ctfs, line)? } else { false_line(ctfs, line)? };
    k.top_mut()?.lineno = target;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn step_call(
    ir: &Ir,
    envs: &mut EnvStore,
    parents: &mut ParentChain,
    k: &mut Continuation,
    stmt: StmtId,
    top_env: crate::env::EnvId,
    line: u32,
    callee: Name,
    args: &[crate::expr::Expr],
) -> Result<(), Error> {
    let resolver = Resolver::new(ir, envs, parents);
    let callee_value = resolver.lookup_val(stmt, top_env, callee, line)?;
    let closure = match callee_value {
        Value::Closure(c) => c.clone(),
        _ => return Err(CallError::NotCallable { name: callee, line }.into()),
    };
    if closure.formals.len() != args.len() {
        return Err(CallError::Arity { expected: closure.formals.len(), got: args.len(), line }.into());
    }

    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(eval_in(ir, envs, parents, stmt, top_env, line, arg)?);
    }

    let body = body_block_of(ir, closure.entry_line).ok_or(Internal::InstructionIndexMiss { line: closure.entry_line })?;
    let new_env = envs.new_env();

    if let Some(info) = &ir.block(body).lexical {
        for &local in &info.locals {
            if info.nonlocals.contains(&local) || info.globals.contains(&local) {
                continue;
            }
            envs.bind(new_env, local, Value::Bottom);
        }
    }
    for (formal, value) in closure.formals.iter().zip(arg_values) {
        envs.bind(new_env, *formal, value);
    }

    parents.add_edge(new_env, closure.parent_env_id);
    k.push(Context { lineno: closure.entry_line, env_id: new_env });
    let _ = ctfs;
    Ok(())
}

/// Recovers the `Def`'s body block from its entry line, so the caller can
/// read the callee's `LexicalInfo` and pre-bind its locals to `Bottom`.
fn body_block_of(ir: &Ir, entry_line: u32) -> Option<crate::ir::BlockId> {
    let first_stmt = ir.stmt_at_line(entry_line)?;
    Some(ir.stmt(first_stmt).parent_block())
}

#[allow(clippy::too_many_arguments)]
fn step_return(
    ir: &Ir,
    ctfs: &CtfTables,
    envs: &mut EnvStore,
    parents: &ParentChain,
    k: &mut Continuation,
    stmt: StmtId,
    top_env: crate::env::EnvId,
    line: u32,
    expr: &crate::expr::Expr,
) -> Result<(), Error> {
    let value = eval_in(ir, envs, parents, stmt, top_env, line, expr)?;
    let _ = k.pop()?;
    let caller = k.top_mut()?;
    let caller_line = caller.lineno;
    let call_stmt = stmt_at(ir, caller_line)?;
    let StmtNode::Leaf { instr, .. } = ir.stmt(call_stmt) else {
        return Err(Internal::InstructionIndexMiss { line: caller_line }.into());
    };
    let Instruction::CallAssign { target, .. } = &instr.kind else {
        return Err(Internal::InstructionIndexMiss { line: caller_line }.into());
    };
    let caller_env = caller.env_id;
    envs.bind(caller_env, *target, value);
    caller.lineno = next_line(ctfs, caller_line)?;
    Ok(())
}
