//! The continuation (call) stack: a nonempty LIFO of `(lineno, env_id)`
//! frames. The top frame's `lineno` is rewritten in place after every
//! non-call, non-return step; `push`/`pop` happen only at `CallAssign`/`Ret`.

use crate::env::{EnvId, GLOBAL_ENV_ID};
use crate::error::Internal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Context {
    pub lineno: u32,
    pub env_id: EnvId,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Continuation {
    frames: Vec<Context>,
}

impl Continuation {
    #[must_use]
    pub fn new(first_line: u32) -> Self {
        Self {
            frames: vec![Context { lineno: first_line, env_id: GLOBAL_ENV_ID }],
        }
    }

    pub fn top(&self) -> Result<&Context, Internal> {
        self.frames.last().ok_or(Internal::EmptyContinuation)
    }

    pub fn top_mut(&mut self) -> Result<&mut Context, Internal> {
        self.frames.last_mut().ok_or(Internal::EmptyContinuation)
    }

    pub fn push(&mut self, ctx: Context) {
        self.frames.push(ctx);
    }

    pub fn pop(&mut self) -> Result<Context, Internal> {
        self.frames.pop().ok_or(Internal::EmptyContinuation)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Ordered bottom-to-top, for the wire snapshot's `k` field.
    pub fn frames(&self) -> &[Context] {
        &self.frames
    }
}
