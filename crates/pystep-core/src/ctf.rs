//! Control-transfer function (CTF) tables: a single walk over the IR fills
//! three line→line maps (`next`, `true`, `false`) that reduce stepping to a
//! table lookup. Ported from the reference implementation's `ctf`/`stf`/
//! `helper` modules, restructured against the arena IR (`ir.rs`) instead of
//! object back-references, and specialized so the terminal "one past the
//! end" fixed point is a line number rather than a statement id (see
//! `SPEC_FULL.md` §4.2/§9 for the `last+1` sentinel resolution).

use crate::ir::{BlockId, Instruction, Ir, Program, StmtId, StmtNode};
use ahash::AHashMap;

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CtfTables {
    pub next: AHashMap<u32, u32>,
    pub true_: AHashMap<u32, u32>,
    pub false_: AHashMap<u32, u32>,
}

impl CtfTables {
    #[must_use]
    pub fn is_final(&self, pc: u32) -> bool {
        self.next.get(&pc) == Some(&pc)
    }
}

/// The statement-transfer function: the line to enter after `stmt`
/// completes, under the `next` edge. Mirrors `STF.next` in the reference
/// implementation, except the top-level fixed point yields `last_line + 1`
/// directly rather than looping `stmt` onto itself — this is what lets
/// `next[last_line] = last_line + 1` and the separately-inserted
/// `next[last_line + 1] = last_line + 1` jointly produce the one-step
/// transient PC the design notes describe.
fn stf_next_line(ir: &Ir, stmt: StmtId) -> u32 {
    match ir.stmt(stmt) {
        StmtNode::Leaf { instr, .. } if matches!(instr.kind, Instruction::Continue) => {
            let while_stmt = ir
                .enclosing_while(stmt)
                .expect("continue outside while: malformed IR");
            ir.stmt(while_stmt).first_line()
        }
        StmtNode::Leaf { instr, .. } if matches!(instr.kind, Instruction::Break) => {
            let while_stmt = ir
                .enclosing_while(stmt)
                .expect("break outside while: malformed IR");
            stf_next_line(ir, while_stmt)
        }
        StmtNode::Leaf { instr, .. } if matches!(instr.kind, Instruction::Ret { .. }) => {
            unreachable!("STF.next is undefined for Ret; the stepper handles returns specially")
        }
        node => {
            let block_id = node.parent_block();
            let block = ir.block(block_id);
            let i = node.idx();
            if i + 1 < block.stmts.len() {
                ir.stmt(block.stmts[i + 1]).first_line()
            } else if block.is_top_level() {
                last_instr_line(ir, stmt) + 1
            } else {
                let parent_stmt = block
                    .parent_stmt
                    .expect("non-top-level block has a parent statement");
                stf_next_line(ir, parent_stmt)
            }
        }
    }
}

/// `STF.true`: defined only for `If`/`While`.
fn stf_true_line(ir: &Ir, stmt: StmtId) -> u32 {
    match ir.stmt(stmt) {
        StmtNode::While { body, .. } => ir.block_first_line(*body),
        StmtNode::If { then_block, .. } => ir.block_first_line(*then_block),
        _ => unreachable!("STF.true is undefined outside If/While"),
    }
}

/// `STF.false`: defined only for `If`/`While`.
fn stf_false_line(ir: &Ir, stmt: StmtId) -> u32 {
    match ir.stmt(stmt) {
        StmtNode::While { .. } => stf_next_line(ir, stmt),
        StmtNode::If { else_block, .. } => ir.block_first_line(*else_block),
        _ => unreachable!("STF.false is undefined outside If/While"),
    }
}

/// The line of the last instruction reachable from `stmt`, recursing into
/// `else_block`/`body` for composites — `Statement.last()` in the reference
/// implementation. Exposed crate-wide so `program_structure` can report each
/// statement's `last_line` without re-deriving this recursion.
pub(crate) fn last_instr_line(ir: &Ir, stmt: StmtId) -> u32 {
    match ir.stmt(stmt) {
        StmtNode::Leaf { instr, .. } => instr.lineno,
        StmtNode::If { else_block, .. } => last_instr_line(ir, last_stmt_of(ir, *else_block)),
        StmtNode::While { body, .. } => last_instr_line(ir, last_stmt_of(ir, *body)),
        StmtNode::Def { body, .. } => last_instr_line(ir, last_stmt_of(ir, *body)),
    }
}

fn last_stmt_of(ir: &Ir, block: BlockId) -> StmtId {
    *ir.block(block)
        .stmts
        .last()
        .expect("blocks built by IrBuilder are never empty")
}

/// Walks `program`'s IR once, producing the three CTF maps per §4.2's walk
/// rules.
#[must_use]
pub fn build_ctf(program: &Program) -> CtfTables {
    let mut tables = CtfTables::default();
    walk_block(&program.ir, program.top_block, &mut tables);
    if let Some(&last_top) = program.ir.block(program.top_block).stmts.last() {
        let last_line = last_instr_line(&program.ir, last_top);
        tables.next.insert(last_line + 1, last_line + 1);
    }
    tables
}

fn walk_block(ir: &Ir, block_id: BlockId, tables: &mut CtfTables) {
    for &stmt_id in &ir.block(block_id).stmts {
        walk_stmt(ir, stmt_id, tables);
    }
}

fn walk_stmt(ir: &Ir, stmt_id: StmtId, tables: &mut CtfTables) {
    match ir.stmt(stmt_id) {
        StmtNode::If { test, then_block, else_block, .. } => {
            tables.true_.insert(test.lineno, ir.block_first_line(*then_block));
            tables.false_.insert(test.lineno, ir.block_first_line(*else_block));
            walk_block(ir, *then_block, tables);
            walk_block(ir, *else_block, tables);
        }
        StmtNode::While { test, body, .. } => {
            tables.true_.insert(test.lineno, ir.block_first_line(*body));
            tables.false_.insert(test.lineno, stf_next_line(ir, stmt_id));
            walk_block(ir, *body, tables);
        }
        StmtNode::Def { head, body, .. } => {
            // Resolved open question (SPEC_FULL §9): emitted from the Def
            // instruction directly.
            tables.next.insert(head.lineno, stf_next_line(ir, stmt_id));
            walk_block(ir, *body, tables);
        }
        StmtNode::Leaf { instr, .. } => {
            if !matches!(instr.kind, Instruction::Ret { .. }) {
                tables.next.insert(instr.lineno, stf_next_line(ir, stmt_id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IrBuilder;
    use crate::expr::{Constant, Expr};
    use crate::ir::Instruction;

    #[test]
    fn straight_line_ctf_chains_forward() {
        let mut b = IrBuilder::new();
        let x = b.intern("x");
        b.add_leaf(1, Instruction::ExprAssign { target: x, expr: Expr::Constant(Constant::Int(1)) });
        b.add_leaf(2, Instruction::Pass);
        let program = b.finish();
        let ctfs = build_ctf(&program);
        assert_eq!(ctfs.next.get(&1), Some(&2));
        assert_eq!(ctfs.next.get(&3), Some(&3));
        assert!(ctfs.is_final(3));
    }

    #[test]
    fn if_else_true_false_point_into_branches() {
        let mut b = IrBuilder::new();
        let x = b.intern("x");
        b.enter_block(false);
        b.add_leaf(2, Instruction::Pass);
        let then_block = b.exit_block();
        b.enter_block(false);
        b.add_leaf(3, Instruction::Pass);
        let else_block = b.exit_block();
        b.add_if(1, Expr::Name(x), then_block, else_block);
        b.add_leaf(4, Instruction::Pass);
        let program = b.finish();
        let ctfs = build_ctf(&program);
        assert_eq!(ctfs.true_.get(&1), Some(&2));
        assert_eq!(ctfs.false_.get(&1), Some(&3));
        assert_eq!(ctfs.next.get(&2), Some(&4));
        assert_eq!(ctfs.next.get(&3), Some(&4));
    }

    #[test]
    fn while_false_skips_to_statement_after_loop() {
        let mut b = IrBuilder::new();
        let i = b.intern("i");
        b.enter_block(false);
        b.add_leaf(2, Instruction::Continue);
        let body = b.exit_block();
        b.add_while(1, Expr::Name(i), body);
        b.add_leaf(3, Instruction::Pass);
        let program = b.finish();
        let ctfs = build_ctf(&program);
        assert_eq!(ctfs.true_.get(&1), Some(&2));
        assert_eq!(ctfs.false_.get(&1), Some(&3));
        assert_eq!(ctfs.next.get(&2), Some(&1));
    }
}
