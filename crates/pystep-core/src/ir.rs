//! The intermediate representation: instructions, statements, and blocks,
//! held in a flat arena and addressed by integer index rather than by
//! owning pointer — per the design note that parent back-references
//! (statement → block, block → statement, instruction → statement) would
//! otherwise form reference cycles. `StmtId`/`BlockId` are write-once after
//! [`crate::builder::IrBuilder`] finishes; the arena itself never mutates
//! after that point.

use crate::expr::Expr;
use crate::intern::Name;
use ahash::{AHashMap, AHashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct StmtId(u32);

impl StmtId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BlockId(u32);

impl BlockId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

/// A leaf operation. Carries its own line number (its identity across every
/// CTF/instruction-index table) and a back-reference to the statement that
/// owns it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InstrNode {
    pub lineno: u32,
    pub parent_stmt: StmtId,
    pub kind: Instruction,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Instruction {
    Pass,
    ExprAssign { target: Name, expr: Expr },
    CallAssign { target: Name, callee: Name, args: Vec<Expr> },
    IfTest { expr: Expr },
    WhileTest { expr: Expr },
    Def { name: Name, formals: Vec<Name> },
    Ret { expr: Expr },
    Break,
    Continue,
    Global { names: Vec<Name> },
    Nonlocal { names: Vec<Name> },
}

impl Instruction {
    #[must_use]
    pub fn is_test(&self) -> bool {
        matches!(self, Instruction::IfTest { .. } | Instruction::WhileTest { .. })
    }
}

/// A statement: either a leaf wrapping exactly one instruction, or one of
/// the three composites that own inner blocks.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StmtNode {
    Leaf {
        idx: usize,
        parent_block: BlockId,
        instr: InstrNode,
    },
    If {
        idx: usize,
        parent_block: BlockId,
        test: InstrNode,
        then_block: BlockId,
        else_block: BlockId,
    },
    While {
        idx: usize,
        parent_block: BlockId,
        test: InstrNode,
        body: BlockId,
    },
    Def {
        idx: usize,
        parent_block: BlockId,
        head: InstrNode,
        body: BlockId,
    },
}

impl StmtNode {
    #[must_use]
    pub fn idx(&self) -> usize {
        match self {
            StmtNode::Leaf { idx, .. }
            | StmtNode::If { idx, .. }
            | StmtNode::While { idx, .. }
            | StmtNode::Def { idx, .. } => *idx,
        }
    }

    #[must_use]
    pub fn parent_block(&self) -> BlockId {
        match self {
            StmtNode::Leaf { parent_block, .. }
            | StmtNode::If { parent_block, .. }
            | StmtNode::While { parent_block, .. }
            | StmtNode::Def { parent_block, .. } => *parent_block,
        }
    }

    /// The line number of this statement's head instruction: for a leaf,
    /// the wrapped instruction's line; for a composite, its test/def line.
    #[must_use]
    pub fn first_line(&self) -> u32 {
        match self {
            StmtNode::Leaf { instr, .. } => instr.lineno,
            StmtNode::If { test, .. } | StmtNode::While { test, .. } => test.lineno,
            StmtNode::Def { head, .. } => head.lineno,
        }
    }

    #[must_use]
    pub fn head_instr(&self) -> &InstrNode {
        match self {
            StmtNode::Leaf { instr, .. } => instr,
            StmtNode::If { test, .. } | StmtNode::While { test, .. } => test,
            StmtNode::Def { head, .. } => head,
        }
    }
}

/// Lexical blocks (module body, function body) carry scope-declaration
/// sets. Invariant (spec §3): `nonlocals ∩ globals = ∅`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LexicalInfo {
    pub locals: AHashSet<Name>,
    pub nonlocals: AHashSet<Name>,
    pub globals: AHashSet<Name>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockNode {
    pub stmts: Vec<StmtId>,
    pub parent_stmt: Option<StmtId>,
    pub lexical: Option<LexicalInfo>,
}

impl BlockNode {
    #[must_use]
    pub fn is_lexical(&self) -> bool {
        self.lexical.is_some()
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.parent_stmt.is_none()
    }
}

/// The arena: every statement and block ever built, plus the interner that
/// owns their names. Immutable once `IrBuilder::finish` has run.
#[derive(Debug, Clone)]
pub struct Ir {
    pub stmts: Vec<StmtNode>,
    pub blocks: Vec<BlockNode>,
    pub interner: crate::intern::Interner,
    /// Every statement's head line, for the stepper's PC -> instruction
    /// lookup. Built once in `IrBuilder::finish`.
    pub line_index: AHashMap<u32, StmtId>,
}

impl Ir {
    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &StmtNode {
        &self.stmts[id.index()]
    }

    /// The statement whose head instruction lives at `line`, if any.
    #[must_use]
    pub fn stmt_at_line(&self, line: u32) -> Option<StmtId> {
        self.line_index.get(&line).copied()
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &BlockNode {
        &self.blocks[id.index()]
    }

    /// The line number of the first instruction of `block`. Panics on an
    /// empty block — the IR builder contract never produces one (every
    /// `If`/`While`/`Def` block has at least one statement, injected `pass`
    /// if nothing else).
    #[must_use]
    pub fn block_first_line(&self, block: BlockId) -> u32 {
        let b = self.block(block);
        self.stmt(b.stmts[0]).first_line()
    }

    /// Climbs to the nearest enclosing lexical block starting from `stmt`'s
    /// owning block, per §4.7's resolver setup.
    #[must_use]
    pub fn enclosing_lexical_block(&self, mut block: BlockId) -> BlockId {
        loop {
            if self.block(block).is_lexical() {
                return block;
            }
            let parent_stmt = self.block(block).parent_stmt.expect(
                "non-lexical block without a parent statement: malformed IR",
            );
            block = self.stmt(parent_stmt).parent_block();
        }
    }

    /// Finds the innermost enclosing `While` statement for `stmt`, climbing
    /// `block.parent_stmt` chains. Ported from `encl_while` in the reference
    /// implementation.
    #[must_use]
    pub fn enclosing_while(&self, stmt: StmtId) -> Option<StmtId> {
        let mut block = self.stmt(stmt).parent_block();
        loop {
            let parent_stmt = self.block(block).parent_stmt?;
            if matches!(self.stmt(parent_stmt), StmtNode::While { .. }) {
                return Some(parent_stmt);
            }
            block = self.stmt(parent_stmt).parent_block();
        }
    }
}

/// The top-level wrapper: a program is just its module block.
#[derive(Debug, Clone)]
pub struct Program {
    pub ir: Ir,
    pub top_block: BlockId,
}

impl Program {
    #[must_use]
    pub fn first_line(&self) -> u32 {
        self.ir.block_first_line(self.top_block)
    }
}
