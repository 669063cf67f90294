//! Module: txn
//!
//! Caller-owned transaction context. Every handler operation takes a
//! `&mut TxContext`; while a relational transaction is open the context
//! owns the pinned connection, so nothing is keyed by thread.

use crate::{
    driver::{ConnectionSource, DriverError, IsolationLevel, SqlConnection},
    error::{ErrorOrigin, InternalError},
};
use std::fmt;

///
/// TxContext
///

#[derive(Default)]
pub struct TxContext {
    state: TxState,
}

#[derive(Default)]
enum TxState {
    #[default]
    Idle,
    Pinned(Pinned),
    Conditional,
}

// Pinned connection plus the defaults captured when the transaction began.
struct Pinned {
    conn: Box<dyn SqlConnection>,
    auto_commit: bool,
    isolation: IsolationLevel,
}

impl TxContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self.state, TxState::Idle)
    }

    /// True while column-family writes must use their conditional form.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self.state, TxState::Conditional)
    }

    /// Begin a relational transaction on a fresh connection. A no-op when a
    /// relational transaction is already open.
    ///
    /// Repeatable read is requested first; serializable is the fallback.
    pub(crate) fn open_pinned(&mut self, source: &dyn ConnectionSource) -> Result<(), InternalError> {
        match self.state {
            TxState::Pinned(_) => return Ok(()),
            TxState::Conditional => return Err(mixed_families()),
            TxState::Idle => {}
        }

        let mut conn = source.connection().map_err(begin_failed)?;
        let auto_commit = conn.auto_commit().map_err(begin_failed)?;
        let isolation = conn.isolation().map_err(begin_failed)?;

        conn.set_auto_commit(false).map_err(begin_failed)?;
        if let Err(err) = conn.set_isolation(IsolationLevel::RepeatableRead) {
            tracing::warn!(
                error = %err,
                "repeatable read rejected, falling back to serializable"
            );
            conn.set_isolation(IsolationLevel::Serializable)
                .map_err(begin_failed)?;
        }

        self.state = TxState::Pinned(Pinned {
            conn,
            auto_commit,
            isolation,
        });

        Ok(())
    }

    /// Switch column-family writes to their conditional form. A no-op when
    /// already conditional.
    pub(crate) fn open_conditional(&mut self) -> Result<(), InternalError> {
        match self.state {
            TxState::Pinned(_) => Err(mixed_families()),
            TxState::Conditional | TxState::Idle => {
                self.state = TxState::Conditional;
                Ok(())
            }
        }
    }

    pub(crate) fn commit(&mut self) -> Result<(), InternalError> {
        self.finish(Outcome::Commit)
    }

    pub(crate) fn rollback(&mut self) -> Result<(), InternalError> {
        self.finish(Outcome::Rollback)
    }

    /// The pinned connection, when a relational transaction is open.
    pub(crate) fn pinned(&mut self) -> Result<Option<&mut dyn SqlConnection>, InternalError> {
        match &mut self.state {
            TxState::Idle => Ok(None),
            TxState::Pinned(pinned) => Ok(Some(pinned.conn.as_mut())),
            TxState::Conditional => Err(mixed_families()),
        }
    }

    /// Fail when a relational transaction is open on this context.
    pub(crate) fn ensure_not_pinned(&self) -> Result<(), InternalError> {
        if matches!(self.state, TxState::Pinned(_)) {
            return Err(mixed_families());
        }

        Ok(())
    }

    /// Fail when a column-family transaction is open on this context.
    pub(crate) fn ensure_not_conditional(&self) -> Result<(), InternalError> {
        if self.is_conditional() {
            return Err(mixed_families());
        }

        Ok(())
    }

    // The state always returns to idle and the pinned connection is always
    // released, whatever the driver reports.
    fn finish(&mut self, outcome: Outcome) -> Result<(), InternalError> {
        match std::mem::take(&mut self.state) {
            TxState::Idle => Err(InternalError::invariant(
                ErrorOrigin::Transaction,
                format!("cannot {outcome}: no transaction is open"),
            )),
            TxState::Conditional => Ok(()),
            TxState::Pinned(mut pinned) => {
                let result = match outcome {
                    Outcome::Commit => pinned.conn.commit(),
                    Outcome::Rollback => pinned.conn.rollback(),
                };
                let restored = pinned.restore();
                drop(pinned);

                result.map_err(|cause| {
                    InternalError::connectivity(
                        ErrorOrigin::Transaction,
                        format!("transaction {outcome} failed"),
                        cause,
                    )
                })?;
                if let Err(cause) = restored {
                    tracing::warn!(error = %cause, "failed to restore connection defaults");
                }

                Ok(())
            }
        }
    }
}

impl fmt::Debug for TxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            TxState::Idle => "idle",
            TxState::Pinned(_) => "pinned",
            TxState::Conditional => "conditional",
        };
        f.debug_struct("TxContext").field("state", &state).finish()
    }
}

impl Pinned {
    fn restore(&mut self) -> Result<(), DriverError> {
        self.conn.set_isolation(self.isolation)?;
        self.conn.set_auto_commit(self.auto_commit)
    }
}

#[derive(Clone, Copy)]
enum Outcome {
    Commit,
    Rollback,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        })
    }
}

fn begin_failed(cause: DriverError) -> InternalError {
    InternalError::connectivity(ErrorOrigin::Transaction, "opening a transaction failed", cause)
}

fn mixed_families() -> InternalError {
    InternalError::invariant(
        ErrorOrigin::Transaction,
        "transaction context is already bound to the other backend family",
    )
}

///
/// TESTS
///
