//! # palisade-audit: Decision audit trail
//!
//! Defines the shape of an audit record and the contract for writing it.
//!
//! ```text
//! AuthorizationDecision ─┐
//! AuthorizationRequest ──┼──► AuditRecord::for_decision ──► AuditSink::write
//! Policy id/version ─────┤         (immutable)               (all-or-nothing)
//! decision id, corr id, ─┘
//! timestamp
//! ```
//!
//! Records are only ever built from an existing decision. Durable storage
//! is up to the sink; [`JsonlAuditSink`] appends JSON lines to a local file.

pub mod record;
pub mod sink;

pub use record::AuditRecord;
pub use sink::{AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink};
