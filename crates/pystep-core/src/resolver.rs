//! Name resolution (§4.7): given the current frame and instruction, finds
//! which environment a name's lookup or assignment should hit, honoring
//! `global`/`nonlocal` declarations on the enclosing lexical block.

use crate::env::{EnvId, EnvStore, GLOBAL_ENV_ID};
use crate::error::LookupError;
use crate::intern::Name;
use crate::ir::{Ir, StmtId};
use crate::parent_chain::ParentChain;

pub struct Resolver<'a> {
    ir: &'a Ir,
    envs: &'a EnvStore,
    parents: &'a ParentChain,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(ir: &'a Ir, envs: &'a EnvStore, parents: &'a ParentChain) -> Self {
        Self { ir, envs, parents }
    }

    /// Finds the environment where `name` resolves (for read or write),
    /// given the instruction's owning statement and the active frame's
    /// environment.
    pub fn resolve_env(&self, stmt: StmtId, top_env: EnvId, name: Name, line: u32) -> Result<EnvId, LookupError> {
        let owner_block = self.ir.stmt(stmt).parent_block();
        let lexical_block = self.ir.enclosing_lexical_block(owner_block);
        let block = self.ir.block(lexical_block);

        if block.parent_stmt.is_none() {
            return Ok(GLOBAL_ENV_ID);
        }

        let info = block.lexical.as_ref().expect("enclosing_lexical_block always returns a lexical block");
        if info.globals.contains(&name) {
            return Ok(GLOBAL_ENV_ID);
        }

        let chain = self.parents.chain(top_env);
        if info.nonlocals.contains(&name) {
            let search_range = if chain.len() > 1 { &chain[1..chain.len() - 1] } else { &[][..] };
            return search_range
                .iter()
                .copied()
                .find(|&env| self.envs.has(env, name))
                .ok_or(LookupError::UnboundName { name, line });
        }

        chain
            .iter()
            .copied()
            .find(|&env| self.envs.has(env, name))
            .ok_or(LookupError::UnboundName { name, line })
    }

    /// `lookup_val(n) = lookup_env(n)[n]`, additionally rejecting a `Bottom`
    /// read as `UnboundLocal`.
    pub fn lookup_val(
        &self,
        stmt: StmtId,
        top_env: EnvId,
        name: Name,
        line: u32,
    ) -> Result<&'a crate::value::Value, LookupError> {
        let env = self.resolve_env(stmt, top_env, name, line)?;
        match self.envs.get(env, name) {
            Some(crate::value::Value::Bottom) => Err(LookupError::UnboundLocal { name, line }),
            Some(value) => Ok(value),
            None => Err(LookupError::UnboundName { name, line }),
        }
    }
}
