//! Safe arena-construction API for the IR. Mirrors the reference
//! implementation's `Visitor`: a stack of "currently open" blocks, leaf
//! statements appended to the block on top, composite statements built from
//! blocks that were pushed/popped around the visit of their body.
//!
//! This module knows nothing about any concrete surface syntax — it is the
//! contract `pystep-surface` (or any other front end) builds against.

use crate::error::BuildError;
use crate::expr::Expr;
use crate::intern::{Interner, Name};
use crate::ir::{BlockId, BlockNode, Instruction, InstrNode, Ir, LexicalInfo, Program, StmtId, StmtNode};

pub struct IrBuilder {
    stmts: Vec<StmtNode>,
    blocks: Vec<BlockNode>,
    interner: Interner,
    block_stack: Vec<BlockId>,
}

impl IrBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self {
            stmts: Vec::new(),
            blocks: Vec::new(),
            interner: Interner::new(),
            block_stack: Vec::new(),
        };
        let top = builder.push_block_node(None, true);
        builder.block_stack.push(top);
        builder
    }

    fn push_block_node(&mut self, parent_stmt: Option<StmtId>, lexical: bool) -> BlockId {
        let id = BlockId::new(self.blocks.len().try_into().expect("block arena overflow"));
        self.blocks.push(BlockNode {
            stmts: Vec::new(),
            parent_stmt,
            lexical: lexical.then(LexicalInfo::default),
        });
        id
    }

    pub fn intern(&mut self, text: &str) -> Name {
        self.interner.intern(text)
    }

    #[must_use]
    pub fn current_block(&self) -> BlockId {
        *self.block_stack.last().expect("block stack never empty")
    }

    /// Opens a fresh block and makes it current. Caller later passes its id
    /// to `add_if`/`add_while`/`add_def`, which patches `parent_stmt` once
    /// the owning composite statement's id is known.
    pub fn enter_block(&mut self, lexical: bool) -> BlockId {
        let id = self.push_block_node(None, lexical);
        self.block_stack.push(id);
        id
    }

    /// Closes the innermost open block, returning its id.
    pub fn exit_block(&mut self) -> BlockId {
        self.block_stack.pop().expect("unbalanced enter_block/exit_block")
    }

    fn next_idx_in_current(&self) -> usize {
        self.blocks[self.current_block().index()].stmts.len()
    }

    fn record_in_current(&mut self, stmt_id: StmtId) {
        let cur = self.current_block();
        self.blocks[cur.index()].stmts.push(stmt_id);
    }

    /// Adds a leaf statement wrapping a single instruction to the current
    /// block.
    pub fn add_leaf(&mut self, lineno: u32, kind: Instruction) -> StmtId {
        let parent_block = self.current_block();
        let idx = self.next_idx_in_current();
        let stmt_id = StmtId::new(self.stmts.len().try_into().expect("stmt arena overflow"));
        let instr = InstrNode { lineno, parent_stmt: stmt_id, kind };
        self.stmts.push(StmtNode::Leaf { idx, parent_block, instr });
        self.record_in_current(stmt_id);
        stmt_id
    }

    /// Adds an `If` statement. `then_block`/`else_block` must already have
    /// been closed via `exit_block`; this patches their `parent_stmt`.
    pub fn add_if(&mut self, lineno: u32, test: Expr, then_block: BlockId, else_block: BlockId) -> StmtId {
        let parent_block = self.current_block();
        let idx = self.next_idx_in_current();
        let stmt_id = StmtId::new(self.stmts.len().try_into().expect("stmt arena overflow"));
        let test_instr = InstrNode {
            lineno,
            parent_stmt: stmt_id,
            kind: Instruction::IfTest { expr: test },
        };
        self.stmts.push(StmtNode::If {
            idx,
            parent_block,
            test: test_instr,
            then_block,
            else_block,
        });
        self.blocks[then_block.index()].parent_stmt = Some(stmt_id);
        self.blocks[else_block.index()].parent_stmt = Some(stmt_id);
        self.record_in_current(stmt_id);
        stmt_id
    }

    pub fn add_while(&mut self, lineno: u32, test: Expr, body: BlockId) -> StmtId {
        let parent_block = self.current_block();
        let idx = self.next_idx_in_current();
        let stmt_id = StmtId::new(self.stmts.len().try_into().expect("stmt arena overflow"));
        let test_instr = InstrNode {
            lineno,
            parent_stmt: stmt_id,
            kind: Instruction::WhileTest { expr: test },
        };
        self.stmts.push(StmtNode::While { idx, parent_block, test: test_instr, body });
        self.blocks[body.index()].parent_stmt = Some(stmt_id);
        self.record_in_current(stmt_id);
        stmt_id
    }

    pub fn add_def(&mut self, lineno: u32, name: Name, formals: Vec<Name>, body: BlockId) -> StmtId {
        let parent_block = self.current_block();
        let idx = self.next_idx_in_current();
        let stmt_id = StmtId::new(self.stmts.len().try_into().expect("stmt arena overflow"));
        let head = InstrNode {
            lineno,
            parent_stmt: stmt_id,
            kind: Instruction::Def { name, formals },
        };
        self.stmts.push(StmtNode::Def { idx, parent_block, head, body });
        self.blocks[body.index()].parent_stmt = Some(stmt_id);
        self.record_in_current(stmt_id);
        stmt_id
    }

    /// The nearest enclosing lexical block on the open-block stack, per
    /// `_encl_lexical_block` in the reference implementation.
    fn enclosing_lexical_in_stack(&self) -> BlockId {
        for &block in self.block_stack.iter().rev() {
            if self.blocks[block.index()].is_lexical() {
                return block;
            }
        }
        unreachable!("top-level block is always lexical")
    }

    /// Records `name` as a local of the nearest enclosing lexical block,
    /// skipping the module-level block (whose locals are definitionally
    /// global) — `_update_locals` in the reference implementation.
    pub fn update_locals(&mut self, name: Name) {
        let lexical = self.enclosing_lexical_in_stack();
        if self.block_stack.iter().position(|&b| b == lexical) != Some(0) {
            self.blocks[lexical.index()]
                .lexical
                .as_mut()
                .expect("enclosing_lexical_in_stack always returns a lexical block")
                .locals
                .insert(name);
        }
    }

    /// Records `names` as `global` declarations on the enclosing lexical
    /// block, rejecting any name already declared `nonlocal` there.
    pub fn declare_global(&mut self, names: &[Name], line: u32) -> Result<(), BuildError> {
        let lexical = self.enclosing_lexical_in_stack();
        let info = self.blocks[lexical.index()].lexical.as_mut().expect("lexical");
        for &name in names {
            if info.nonlocals.contains(&name) {
                return Err(BuildError::ScopeConflict {
                    name: self.interner.resolve(name).to_owned(),
                    line,
                });
            }
            info.globals.insert(name);
        }
        Ok(())
    }

    /// Records `names` as `nonlocal` declarations, symmetric to `declare_global`.
    pub fn declare_nonlocal(&mut self, names: &[Name], line: u32) -> Result<(), BuildError> {
        let lexical = self.enclosing_lexical_in_stack();
        let info = self.blocks[lexical.index()].lexical.as_mut().expect("lexical");
        for &name in names {
            if info.globals.contains(&name) {
                return Err(BuildError::ScopeConflict {
                    name: self.interner.resolve(name).to_owned(),
                    line,
                });
            }
            info.nonlocals.insert(name);
        }
        Ok(())
    }

    /// Finalizes construction, consuming the builder. Panics if blocks are
    /// still open — a front end that calls `enter_block` must always pair
    /// it with `exit_block` before calling `finish`.
    #[must_use]
    pub fn finish(mut self) -> Program {
        let top = self.block_stack.pop().expect("top-level block always present");
        assert!(self.block_stack.is_empty(), "unbalanced enter_block/exit_block at finish");
        let line_index = self
            .stmts
            .iter()
            .enumerate()
            .map(|(i, stmt)| (stmt.first_line(), StmtId::new(i.try_into().expect("stmt arena overflow"))))
            .collect();
        let ir = Ir {
            stmts: self.stmts,
            blocks: self.blocks,
            interner: self.interner,
            line_index,
        };
        Program { ir, top_block: top }
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}
