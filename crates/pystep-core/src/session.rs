//! In-process implementation of the host-facing session surface (§6):
//! create/step/get-state/reset/delete, plus a `run_to_completion`
//! convenience built from repeated `step`.
//!
//! Grounded on the existence of a session-registry component in this
//! family of interpreters (`parcadei-ouros`'s `session_manager.rs`, not
//! chosen as this repo's teacher but confirming the shape is idiomatic);
//! this `SessionManager` is an original, smaller implementation scoped to
//! exactly what §6 asks for. It is generic over a lowering function so
//! `pystep-core` never depends on `pystep-surface` — any `Fn(&str) ->
//! Result<Program, BuildError>` can drive it, keeping the core's "no
//! hidden dependency on a concrete front end" property from §9 intact.

use ahash::AHashMap;
use std::fmt;

use crate::error::{BuildError, Error};
use crate::ir::Program;
use crate::state::{Snapshot, State, StepLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound(SessionId),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(id) => write!(f, "no such session: {id}"),
        }
    }
}

impl std::error::Error for SessionError {}

struct Session {
    source: String,
    state: State,
}

/// Outcome of [`SessionManager::step`]: the post-step snapshot plus whether
/// the session has reached a final state.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub snapshot: Snapshot,
    pub finished: bool,
}

pub struct SessionManager<F> {
    sessions: AHashMap<SessionId, Session>,
    next_id: u64,
    lower: F,
}

impl<F> SessionManager<F>
where
    F: Fn(&str) -> Result<Program, BuildError>,
{
    #[must_use]
    pub fn new(lower: F) -> Self {
        Self { sessions: AHashMap::default(), next_id: 0, lower }
    }

    fn alloc_id(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Lowers `source`, builds a `State`, and registers a new session.
    pub fn create_session(&mut self, source: &str) -> Result<SessionId, BuildError> {
        let program = (self.lower)(source)?;
        let id = self.alloc_id();
        tracing::debug!(session = %id, "session created");
        self.sessions.insert(id, Session { source: source.to_owned(), state: State::create(program) });
        Ok(id)
    }

    fn get(&self, id: SessionId) -> Result<&Session, SessionError> {
        self.sessions.get(&id).ok_or(SessionError::NotFound(id))
    }

    fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, SessionError> {
        self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))
    }

    /// Advances `id` by one instruction and returns the post-step snapshot.
    pub fn step(&mut self, id: SessionId) -> Result<StepOutcome, SessionStepError> {
        let session = self.get_mut(id)?;
        session.state.step()?;
        let finished = session.state.is_final();
        if finished {
            tracing::debug!(session = %id, "session finished");
        }
        Ok(StepOutcome { snapshot: session.state.snapshot(), finished })
    }

    /// The session's current snapshot, without advancing it.
    pub fn state(&self, id: SessionId) -> Result<Snapshot, SessionError> {
        Ok(self.get(id)?.state.snapshot())
    }

    pub fn is_final(&self, id: SessionId) -> Result<bool, SessionError> {
        Ok(self.get(id)?.state.is_final())
    }

    pub fn program_structure(&self, id: SessionId) -> Result<crate::state::BlockView, SessionError> {
        Ok(crate::state::program_structure(self.get(id)?.state.program()))
    }

    /// Replaces the session's program with a fresh lowering of `new_source`,
    /// keeping the same `SessionId`.
    pub fn reset(&mut self, id: SessionId, new_source: &str) -> Result<(), SessionResetError> {
        if !self.sessions.contains_key(&id) {
            return Err(SessionResetError::Session(SessionError::NotFound(id)));
        }
        let program = (self.lower)(new_source).map_err(SessionResetError::Build)?;
        let session = self.sessions.get_mut(&id).expect("checked above");
        session.source = new_source.to_owned();
        session.state = State::create(program);
        tracing::debug!(session = %id, "session reset");
        Ok(())
    }

    pub fn delete(&mut self, id: SessionId) -> Result<(), SessionError> {
        self.sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        tracing::debug!(session = %id, "session deleted");
        Ok(())
    }

    /// Runs `id` to completion under `limits`, per §5/§10.4.
    pub fn run_to_completion(&mut self, id: SessionId, limits: StepLimits) -> Result<Snapshot, SessionStepError> {
        let session = self.get_mut(id)?;
        session.state.run_to_completion(limits)?;
        Ok(session.state.snapshot())
    }

    #[must_use]
    pub fn source(&self, id: SessionId) -> Option<&str> {
        self.sessions.get(&id).map(|s| s.source.as_str())
    }
}

/// Error from an operation that both looks up a session and runs the core
/// interpreter against it (`step`/`run_to_completion`): either the id was
/// unknown, or the core raised one of its own errors mid-run.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStepError {
    Session(SessionError),
    Core(Error),
}

impl fmt::Display for SessionStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStepError::Session(e) => write!(f, "{e}"),
            SessionStepError::Core(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionStepError {}

impl From<SessionError> for SessionStepError {
    fn from(e: SessionError) -> Self {
        SessionStepError::Session(e)
    }
}
impl From<Error> for SessionStepError {
    fn from(e: Error) -> Self {
        SessionStepError::Core(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResetError {
    Session(SessionError),
    Build(BuildError),
}

impl fmt::Display for SessionResetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionResetError::Session(e) => write!(f, "{e}"),
            SessionResetError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionResetError {}
