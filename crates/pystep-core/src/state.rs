//! The State façade (§2.9/§6): bundles the environment store, parent chain,
//! continuation, and CTF tables behind `create`/`step`/`is_final`/`snapshot`,
//! plus the standalone `program_structure` tree used by debugger UIs.
//!
//! Grounded on the teacher's `RunSnapshot`/`Snapshot<T>` pair in `run.rs`:
//! one type built once from parsed code, a narrow stepping surface, and a
//! serializable result handed back to the host.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::continuation::Continuation;
use crate::ctf::{build_ctf, last_instr_line, CtfTables};
use crate::env::EnvStore;
use crate::error::Error;
use crate::ir::{BlockId, Instruction, Ir, Program, StmtId, StmtNode};
use crate::parent_chain::ParentChain;
use crate::stepper;

/// A running interpreter instance: one [`Program`] plus everything the
/// stepper mutates. Owns its `Program`, so the caller never has to keep the
/// IR alive separately.
#[derive(Debug, Clone)]
pub struct State {
    program: Program,
    ctfs: CtfTables,
    envs: EnvStore,
    parents: ParentChain,
    k: Continuation,
}

impl State {
    /// `create(program)` per §6: builds the CTF tables and instruction
    /// index once, and initializes `envs = {0: {}}`, an empty parent chain,
    /// and the continuation at the program's first line with `env_id = 0`.
    #[must_use]
    pub fn create(program: Program) -> Self {
        let ctfs = build_ctf(&program);
        let k = Continuation::new(program.first_line());
        tracing::debug!(first_line = program.first_line(), "state created");
        Self { program, ctfs, envs: EnvStore::new(), parents: ParentChain::new(), k }
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn ctfs(&self) -> &CtfTables {
        &self.ctfs
    }

    /// Current program counter: the active frame's line.
    ///
    /// # Panics
    /// Never, in practice — the continuation invariant (§3) guarantees it is
    /// nonempty for the lifetime of a `State`.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.k.top().expect("continuation is never empty").lineno
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.k.depth()
    }

    /// §4.9: `is_final ⇔ next[pc] == pc`.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.ctfs.is_final(self.pc())
    }

    /// Advances by exactly one instruction. A no-op on a final state, per
    /// the State façade's higher-level contract (§4.9) — `step` itself has
    /// no notion of finality, so the façade short-circuits here instead.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.is_final() {
            return Ok(());
        }
        let result = stepper::step(&self.program.ir, &self.ctfs, &mut self.envs, &mut self.parents, &mut self.k);
        if let Err(ref err) = result {
            tracing::debug!(pc = self.pc(), %err, "step failed");
        }
        result
    }

    /// Runs to completion, honoring an optional step/depth budget. Returns
    /// `Internal::StepBudgetExceeded`/`DepthBudgetExceeded` rather than
    /// looping forever on a non-terminating program.
    pub fn run_to_completion(&mut self, limits: StepLimits) -> Result<(), Error> {
        let mut steps = 0usize;
        while !self.is_final() {
            if let Some(max_steps) = limits.max_steps {
                if steps >= max_steps {
                    return Err(crate::error::Internal::StepBudgetExceeded { limit: max_steps }.into());
                }
            }
            self.step()?;
            steps += 1;
            if let Some(max_depth) = limits.max_depth {
                if self.depth() > max_depth {
                    return Err(crate::error::Internal::DepthBudgetExceeded { limit: max_depth }.into());
                }
            }
        }
        tracing::debug!(steps, "run_to_completion finished");
        Ok(())
    }

    /// The wire-level snapshot (§6): `e`, `p`, `k`, `ctfs`.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let interner = &self.program.ir.interner;
        let e = self
            .envs
            .iter()
            .map(|(id, bindings)| {
                let display: IndexMap<String, serde_json::Value> = bindings
                    .iter()
                    .map(|(name, value)| (interner.resolve(*name).to_owned(), value.display(interner)))
                    .collect();
                (id.index(), display)
            })
            .collect();
        let p = self.parents.iter().map(|(child, parent)| (child.index(), parent.index())).collect();
        let k = self.k.frames().iter().map(|ctx| ContextView { lineno: ctx.lineno, env_id: ctx.env_id.index() }).collect();
        Snapshot { e, p, k, ctfs: self.ctfs.clone() }
    }
}

/// Step/depth budget consumed by [`State::run_to_completion`] (§5/§10.4),
/// generalizing the teacher's `ResourceLimits` from heap allocations and
/// recursion depth to this subset's two scarce resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepLimits {
    pub max_steps: Option<usize>,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ContextView {
    pub lineno: u32,
    pub env_id: u32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    pub e: AHashMap<u32, IndexMap<String, serde_json::Value>>,
    pub p: AHashMap<u32, u32>,
    pub k: Vec<ContextView>,
    pub ctfs: CtfTables,
}

/// `program_structure(program)` per §6: a tree of blocks/statements with
/// `type`/`idx`/`first_line`/`last_line`, nested blocks, and sorted
/// `locals`/`nonlocals`/`globals` on lexical blocks.
#[must_use]
pub fn program_structure(program: &Program) -> BlockView {
    build_block_view(&program.ir, program.top_block)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BlockView {
    pub lexical: Option<LexicalView>,
    pub statements: Vec<StatementView>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LexicalView {
    pub locals: Vec<String>,
    pub nonlocals: Vec<String>,
    pub globals: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type")]
pub enum StatementView {
    Leaf { idx: usize, first_line: u32, last_line: u32 },
    If { idx: usize, first_line: u32, last_line: u32, then_block: Box<BlockView>, else_block: Box<BlockView> },
    While { idx: usize, first_line: u32, last_line: u32, body: Box<BlockView> },
    Def { idx: usize, first_line: u32, last_line: u32, name: String, formals: Vec<String>, body: Box<BlockView> },
}

fn build_block_view(ir: &Ir, block_id: BlockId) -> BlockView {
    let block = ir.block(block_id);
    let lexical = block.lexical.as_ref().map(|info| LexicalView {
        locals: sorted_names(ir, &info.locals),
        nonlocals: sorted_names(ir, &info.nonlocals),
        globals: sorted_names(ir, &info.globals),
    });
    let statements = block.stmts.iter().map(|&stmt_id| build_stmt_view(ir, stmt_id)).collect();
    BlockView { lexical, statements }
}

fn sorted_names(ir: &Ir, names: &ahash::AHashSet<crate::intern::Name>) -> Vec<String> {
    let mut out: Vec<String> = names.iter().map(|&n| ir.interner.resolve(n).to_owned()).collect();
    out.sort_unstable();
    out
}

fn build_stmt_view(ir: &Ir, stmt_id: StmtId) -> StatementView {
    let idx = ir.stmt(stmt_id).idx();
    let first_line = ir.stmt(stmt_id).first_line();
    let last_line = last_instr_line(ir, stmt_id);
    match ir.stmt(stmt_id) {
        StmtNode::Leaf { .. } => StatementView::Leaf { idx, first_line, last_line },
        StmtNode::If { then_block, else_block, .. } => StatementView::If {
            idx,
            first_line,
            last_line,
            then_block: Box::new(build_block_view(ir, *then_block)),
            else_block: Box::new(build_block_view(ir, *else_block)),
        },
        StmtNode::While { body, .. } => {
            StatementView::While { idx, first_line, last_line, body: Box::new(build_block_view(ir, *body)) }
        }
        StmtNode::Def { head, body, .. } => {
            let Instruction::Def { name, formals } = &head.kind else {
                unreachable!("a Def statement's head instruction is always Instruction::Def")
            };
            StatementView::Def {
                idx,
                first_line,
                last_line,
                name: ir.interner.resolve(*name).to_owned(),
                formals: formals.iter().map(|&f| ir.interner.resolve(f).to_owned()).collect(),
                body: Box::new(build_block_view(ir, *body)),
            }
        }
    }
}
