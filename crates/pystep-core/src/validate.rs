//! Optional structural validator for the simplifier contract (§9's design
//! note): every `while` body ends in `continue`, every function body ends
//! in `return`, and every instruction line is unique. `pystep-surface` runs
//! this after lowering; an embedder feeding the IR through some other front
//! end can call it directly instead of trusting its own lowering by hand.

use crate::error::BuildError;
use crate::ir::{BlockId, Instruction, Ir, Program, StmtId, StmtNode};
use ahash::AHashSet;

pub fn validate(program: &Program) -> Result<(), BuildError> {
    check_unique_lines(&program.ir)?;
    walk_block(&program.ir, program.top_block)
}

fn check_unique_lines(ir: &Ir) -> Result<(), BuildError> {
    let mut seen = AHashSet::default();
    for stmt in &ir.stmts {
        let line = stmt.first_line();
        if !seen.insert(line) {
            return Err(BuildError::Unsupported {
                what: format!("duplicate instruction line {line}"),
                line,
            });
        }
    }
    Ok(())
}

fn walk_block(ir: &Ir, block_id: BlockId) -> Result<(), BuildError> {
    for &stmt_id in &ir.block(block_id).stmts {
        walk_stmt(ir, stmt_id)?;
    }
    Ok(())
}

fn walk_stmt(ir: &Ir, stmt_id: StmtId) -> Result<(), BuildError> {
    match ir.stmt(stmt_id) {
        StmtNode::If { then_block, else_block, .. } => {
            walk_block(ir, *then_block)?;
            walk_block(ir, *else_block)?;
        }
        StmtNode::While { test, body, .. } => {
            if !ends_with(ir, *body, |kind| matches!(kind, Instruction::Continue)) {
                return Err(BuildError::Unsupported {
                    what: "while body must end in continue".to_owned(),
                    line: test.lineno,
                });
            }
            walk_block(ir, *body)?;
        }
        StmtNode::Def { head, body, .. } => {
            if !ends_with(ir, *body, |kind| matches!(kind, Instruction::Ret { .. })) {
                return Err(BuildError::Unsupported {
                    what: "function body must end in return".to_owned(),
                    line: head.lineno,
                });
            }
            walk_block(ir, *body)?;
        }
        StmtNode::Leaf { .. } => {}
    }
    Ok(())
}

fn ends_with(ir: &Ir, block: BlockId, pred: impl Fn(&Instruction) -> bool) -> bool {
    let Some(&last) = ir.block(block).stmts.last() else {
        return false;
    };
    matches!(ir.stmt(last), StmtNode::Leaf { instr, .. } if pred(&instr.kind))
}
