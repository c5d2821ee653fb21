//! Audit event utility functions
//!
//! Provides a best-effort helper for writing audit events outside of a
//! verdict transaction.

use crate::db::queries;
use crate::models::AuditEvent;
use rusqlite::Connection;

/// Insert an audit event, logging instead of failing when the write errors
///
/// Used where the audited action has already succeeded and must not be undone
/// by a bookkeeping failure. Returns the new event id when the insert worked.
pub fn record_audit_event(conn: &Connection, event: &AuditEvent) -> Option<i64> {
    match queries::insert_audit_event(conn, event) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(
                event_type = %event.event_type,
                company_id = event.company_id,
                "Failed to record audit event: {:#}",
                e
            );
            None
        }
    }
}
