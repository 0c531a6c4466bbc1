//! Boundary scenarios (SPEC_FULL §8, S1-S5): literal IR fixtures exercising
//! straight-line code, branching, looping, and the call/return round trip,
//! built directly against `pystep_core::builder::IrBuilder` the way
//! `bytecode_limits.rs` builds literal source fixtures against `MontyRun`.

use pretty_assertions::assert_eq;
use pystep_core::builder::IrBuilder;
use pystep_core::env::GLOBAL_ENV_ID;
use pystep_core::expr::{BinaryOp, CompareOp, Constant, Expr};
use pystep_core::ir::Instruction;
use pystep_core::state::{State, StepLimits};

/// S1: straight-line assignment reaches a final state with the expected
/// global bindings after exactly as many steps as instructions.
#[test]
fn s1_straight_line_assignment() {
    let mut b = IrBuilder::new();
    let x = b.intern("x");
    b.update_locals(x);
    b.add_leaf(1, Instruction::ExprAssign { target: x, expr: Expr::Constant(Constant::Int(41)) });
    b.add_leaf(
        2,
        Instruction::ExprAssign {
            target: x,
            expr: Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Name(x)),
                right: Box::new(Expr::Constant(Constant::Int(1))),
            },
        },
    );
    b.add_leaf(3, Instruction::Pass);
    let program = b.finish();

    let mut state = State::create(program);
    assert!(!state.is_final());
    state.run_to_completion(StepLimits::default()).unwrap();
    assert!(state.is_final());

    let snap = state.snapshot();
    let globals = &snap.e[&GLOBAL_ENV_ID.index()];
    assert_eq!(globals["x"], serde_json::json!(42));
}

/// S2: an `if`/`else` test selects exactly one branch's assignment.
#[test]
fn s2_if_else_selects_true_branch() {
    let mut b = IrBuilder::new();
    let x = b.intern("x");
    let y = b.intern("y");
    b.update_locals(x);
    b.update_locals(y);
    b.add_leaf(1, Instruction::ExprAssign { target: x, expr: Expr::Constant(Constant::Int(5)) });

    b.enter_block(false);
    b.add_leaf(3, Instruction::ExprAssign { target: y, expr: Expr::Constant(Constant::Int(1)) });
    let then_block = b.exit_block();

    b.enter_block(false);
    b.add_leaf(4, Instruction::ExprAssign { target: y, expr: Expr::Constant(Constant::Int(-1)) });
    let else_block = b.exit_block();

    b.add_if(
        2,
        Expr::Compare { first: Box::new(Expr::Name(x)), rest: vec![(CompareOp::Gt, Expr::Constant(Constant::Int(0)))] },
        then_block,
        else_block,
    );
    b.add_leaf(5, Instruction::Pass);
    let program = b.finish();

    let mut state = State::create(program);
    state.run_to_completion(StepLimits::default()).unwrap();
    let snap = state.snapshot();
    let globals = &snap.e[&GLOBAL_ENV_ID.index()];
    assert_eq!(globals["y"], serde_json::json!(1));
}

/// S3: a `while` loop with a `continue`-terminated body iterates until its
/// test goes false, then falls through to the statement after the loop.
#[test]
fn s3_while_loop_accumulates_and_terminates() {
    let mut b = IrBuilder::new();
    let i = b.intern("i");
    let total = b.intern("total");
    b.update_locals(i);
    b.update_locals(total);
    b.add_leaf(1, Instruction::ExprAssign { target: i, expr: Expr::Constant(Constant::Int(0)) });
    b.add_leaf(2, Instruction::ExprAssign { target: total, expr: Expr::Constant(Constant::Int(0)) });

    b.enter_block(false);
    b.add_leaf(
        4,
        Instruction::ExprAssign {
            target: total,
            expr: Expr::Binary { op: BinaryOp::Add, left: Box::new(Expr::Name(total)), right: Box::new(Expr::Name(i)) },
        },
    );
    b.add_leaf(
        5,
        Instruction::ExprAssign {
            target: i,
            expr: Expr::Binary { op: BinaryOp::Add, left: Box::new(Expr::Name(i)), right: Box::new(Expr::Constant(Constant::Int(1))) },
        },
    );
    b.add_leaf(6, Instruction::Continue);
    let body = b.exit_block();

    b.add_while(
        3,
        Expr::Compare { first: Box::new(Expr::Name(i)), rest: vec![(CompareOp::Lt, Expr::Constant(Constant::Int(4)))] },
        body,
    );
    b.add_leaf(7, Instruction::Pass);
    let program = b.finish();

    let mut state = State::create(program);
    state.run_to_completion(StepLimits::default()).unwrap();
    let snap = state.snapshot();
    let globals = &snap.e[&GLOBAL_ENV_ID.index()];
    assert_eq!(globals["i"], serde_json::json!(4));
    assert_eq!(globals["total"], serde_json::json!(0 + 1 + 2 + 3));
}

/// S4: calling a `def` pushes a continuation frame into a fresh environment
/// whose parent is the caller's frame; returning pops it and binds the
/// caller's assignment target, then the child environment is retained for
/// inspection rather than torn down.
#[test]
fn s4_call_and_return_round_trip_retains_callee_env() {
    let mut b = IrBuilder::new();
    let double = b.intern("double");
    let n = b.intern("n");
    let result = b.intern("result");
    let y = b.intern("y");
    b.update_locals(double);
    b.update_locals(y);

    b.enter_block(true);
    b.update_locals(n);
    b.update_locals(result);
    b.add_leaf(
        2,
        Instruction::ExprAssign {
            target: result,
            expr: Expr::Binary { op: BinaryOp::Mult, left: Box::new(Expr::Name(n)), right: Box::new(Expr::Constant(Constant::Int(2))) },
        },
    );
    b.add_leaf(3, Instruction::Ret { expr: Expr::Name(result) });
    let func_body = b.exit_block();
    b.add_def(1, double, vec![n], func_body);

    b.add_leaf(4, Instruction::CallAssign { target: y, callee: double, args: vec![Expr::Constant(Constant::Int(21))] });
    b.add_leaf(5, Instruction::Pass);
    let program = b.finish();

    let mut state = State::create(program);
    state.run_to_completion(StepLimits::default()).unwrap();

    let snap = state.snapshot();
    let globals = &snap.e[&GLOBAL_ENV_ID.index()];
    assert_eq!(globals["y"], serde_json::json!(42));
    // the callee's frame is retained, not reclaimed, for debugger inspection.
    assert!(snap.e.values().any(|env| env.get("result") == Some(&serde_json::json!(42))));
}

/// S5: recursion. `factorial(3)` returns to continuation depth 1 at
/// finality, having allocated one fresh environment per activation.
#[test]
fn s5_recursive_factorial() {
    let mut b = IrBuilder::new();
    let factorial = b.intern("factorial");
    let n = b.intern("n");
    let result = b.intern("result");
    let prev = b.intern("prev");
    let answer = b.intern("answer");

    b.enter_block(true);
    b.update_locals(n);
    b.update_locals(result);
    b.update_locals(prev);

    b.enter_block(false);
    b.add_leaf(3, Instruction::ExprAssign { target: result, expr: Expr::Constant(Constant::Int(1)) });
    let base_case = b.exit_block();

    b.enter_block(false);
    b.add_leaf(
        5,
        Instruction::CallAssign {
            target: prev,
            callee: factorial,
            args: vec![Expr::Binary { op: BinaryOp::Sub, left: Box::new(Expr::Name(n)), right: Box::new(Expr::Constant(Constant::Int(1))) }],
        },
    );
    b.add_leaf(
        6,
        Instruction::ExprAssign {
            target: result,
            expr: Expr::Binary { op: BinaryOp::Mult, left: Box::new(Expr::Name(n)), right: Box::new(Expr::Name(prev)) },
        },
    );
    let recursive_case = b.exit_block();

    b.add_if(
        2,
        Expr::Compare { first: Box::new(Expr::Name(n)), rest: vec![(CompareOp::LtE, Expr::Constant(Constant::Int(1)))] },
        base_case,
        recursive_case,
    );
    b.add_leaf(7, Instruction::Ret { expr: Expr::Name(result) });
    let func_body = b.exit_block();
    b.add_def(1, factorial, vec![n], func_body);

    b.add_leaf(8, Instruction::CallAssign { target: answer, callee: factorial, args: vec![Expr::Constant(Constant::Int(3))] });
    b.add_leaf(9, Instruction::Pass);
    let program = b.finish();

    let mut state = State::create(program);
    state.run_to_completion(StepLimits::default()).unwrap();
    assert_eq!(state.depth(), 1);

    let snap = state.snapshot();
    let globals = &snap.e[&GLOBAL_ENV_ID.index()];
    assert_eq!(globals["answer"], serde_json::json!(6));
    // one activation per call: the initial call plus three recursive frames.
    assert_eq!(snap.e.len(), 1 + 4);
}

/// `break` inside a `while` body jumps straight past the loop, skipping any
/// later iterations the loop test would otherwise have allowed.
#[test]
fn break_exits_the_loop_early() {
    let mut b = IrBuilder::new();
    let i = b.intern("i");
    b.update_locals(i);
    b.add_leaf(1, Instruction::ExprAssign { target: i, expr: Expr::Constant(Constant::Int(0)) });

    b.enter_block(false);
    b.add_leaf(
        3,
        Instruction::ExprAssign {
            target: i,
            expr: Expr::Binary { op: BinaryOp::Add, left: Box::new(Expr::Name(i)), right: Box::new(Expr::Constant(Constant::Int(1))) },
        },
    );

    b.enter_block(false);
    b.add_leaf(5, Instruction::Break);
    let then_block = b.exit_block();
    b.enter_block(false);
    b.add_leaf(6, Instruction::Continue);
    let else_block = b.exit_block();
    b.add_if(
        4,
        Expr::Compare { first: Box::new(Expr::Name(i)), rest: vec![(CompareOp::Eq, Expr::Constant(Constant::Int(2)))] },
        then_block,
        else_block,
    );
    let body = b.exit_block();
    b.add_while(2, Expr::Constant(Constant::Bool(true)), body);
    b.add_leaf(7, Instruction::Pass);
    let program = b.finish();

    let mut state = State::create(program);
    state.run_to_completion(StepLimits::default()).unwrap();
    let snap = state.snapshot();
    let globals = &snap.e[&GLOBAL_ENV_ID.index()];
    assert_eq!(globals["i"], serde_json::json!(2));
}
