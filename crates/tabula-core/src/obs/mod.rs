//! Observability boundary. Execution code reports through [`sink`] only.

pub mod sink;
