//! Driver and sink doubles shared by unit tests.

mod cql;
mod sink;
mod sql;

pub(crate) use cql::RecordingSession;
pub(crate) use sink::{Recorded, RecordingSink};
pub(crate) use sql::{FakeSource, FakeTable};
