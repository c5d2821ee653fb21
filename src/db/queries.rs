use rusqlite::{Connection, params, OptionalExtension, Row};
use anyhow::{anyhow, Result, Context};
use serde_json::Value;
use crate::models::*;
use crate::utils::timestamp_now;

// ===== COMPANY CRUD =====

fn company_from_row(row: &Row) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        is_deleted: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn insert_company(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO companies (name, created_at) VALUES (?, ?)",
        params![name, timestamp_now()],
    ).context("Failed to insert company")?;

    Ok(conn.last_insert_rowid())
}

pub fn select_company(conn: &Connection, id: i64) -> Result<Option<Company>> {
    let company = conn
        .query_row(
            "SELECT id, name, is_deleted, created_at FROM companies WHERE id = ?",
            params![id],
            company_from_row,
        )
        .optional()
        .context("Failed to query company")?;

    Ok(company)
}

pub fn select_company_by_name(conn: &Connection, name: &str) -> Result<Option<Company>> {
    let company = conn
        .query_row(
            "SELECT id, name, is_deleted, created_at FROM companies WHERE name = ?",
            params![name],
            company_from_row,
        )
        .optional()
        .context("Failed to query company by name")?;

    Ok(company)
}

pub fn select_active_companies(conn: &Connection) -> Result<Vec<Company>> {
    let mut stmt = conn
        .prepare("SELECT id, name, is_deleted, created_at FROM companies WHERE is_deleted = 0 ORDER BY id")
        .context("Failed to prepare select companies query")?;

    let companies = stmt
        .query_map([], company_from_row)
        .context("Failed to map companies from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect companies")?;

    Ok(companies)
}

pub fn delete_company(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM companies WHERE id = ?", params![id])
        .context("Failed to delete company")?;

    Ok(())
}

// ===== USER CRUD =====

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        company_id: row.get(3)?,
        role: row.get(4)?,
    })
}

pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    company_id: Option<i64>,
    role: Role,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, company_id, role) VALUES (?, ?, ?, ?)",
        params![username, email, company_id, role],
    ).context("Failed to insert user")?;

    Ok(conn.last_insert_rowid())
}

pub fn select_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, email, company_id, role FROM users WHERE id = ?",
            params![id],
            user_from_row,
        )
        .optional()
        .context("Failed to query user")?;

    Ok(user)
}

pub fn select_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, email, company_id, role FROM users WHERE username = ?",
            params![username],
            user_from_row,
        )
        .optional()
        .context("Failed to query user by username")?;

    Ok(user)
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM users WHERE id = ?", params![id])
        .context("Failed to delete user")?;

    Ok(())
}

// ===== CONTROL CRUD =====

const CONTROL_COLUMNS: &str = "id, company_id, name, status, is_deleted, created_by, created_at";

fn control_from_row(row: &Row) -> rusqlite::Result<Control> {
    Ok(Control {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        is_deleted: row.get(4)?,
        created_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_control(conn: &Connection, company_id: i64, name: &str, created_by: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO controls (company_id, name, status, created_by, created_at) VALUES (?, ?, ?, ?, ?)",
        params![company_id, name, ControlStatus::NotImplemented, created_by, timestamp_now()],
    ).context("Failed to insert control")?;

    Ok(conn.last_insert_rowid())
}

/// Look up a control by id regardless of tenant or soft-delete state
pub fn select_control(conn: &Connection, id: i64) -> Result<Option<Control>> {
    let control = conn
        .query_row(
            &format!("SELECT {} FROM controls WHERE id = ?", CONTROL_COLUMNS),
            params![id],
            control_from_row,
        )
        .optional()
        .context("Failed to query control")?;

    Ok(control)
}

/// Look up a live control owned by `company_id`
pub fn select_control_for_company(conn: &Connection, company_id: i64, id: i64) -> Result<Option<Control>> {
    let control = conn
        .query_row(
            &format!(
                "SELECT {} FROM controls WHERE id = ? AND company_id = ? AND is_deleted = 0",
                CONTROL_COLUMNS
            ),
            params![id, company_id],
            control_from_row,
        )
        .optional()
        .context("Failed to query control for company")?;

    Ok(control)
}

pub fn select_control_by_name(conn: &Connection, company_id: i64, name: &str) -> Result<Option<Control>> {
    let control = conn
        .query_row(
            &format!(
                "SELECT {} FROM controls WHERE company_id = ? AND name = ? AND is_deleted = 0 ORDER BY id LIMIT 1",
                CONTROL_COLUMNS
            ),
            params![company_id, name],
            control_from_row,
        )
        .optional()
        .context("Failed to query control by name")?;

    Ok(control)
}

pub fn select_controls(conn: &Connection, company_id: i64) -> Result<Vec<Control>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM controls WHERE company_id = ? AND is_deleted = 0 ORDER BY id",
            CONTROL_COLUMNS
        ))
        .context("Failed to prepare select controls query")?;

    let controls = stmt
        .query_map(params![company_id], control_from_row)
        .context("Failed to map controls from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect controls")?;

    Ok(controls)
}

pub fn update_control_status(conn: &Connection, id: i64, status: ControlStatus) -> Result<()> {
    conn.execute(
        "UPDATE controls SET status = ? WHERE id = ?",
        params![status, id],
    ).context("Failed to update control status")?;

    Ok(())
}

pub fn delete_control(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM controls WHERE id = ?", params![id])
        .context("Failed to delete control")?;

    Ok(())
}

// ===== EVIDENCE CRUD =====

const EVIDENCE_COLUMNS: &str =
    "id, control_id, company_id, name, file, status, is_deleted, created_by, created_at";

fn evidence_from_row(row: &Row) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: row.get(0)?,
        control_id: row.get(1)?,
        company_id: row.get(2)?,
        name: row.get(3)?,
        file: row.get(4)?,
        status: row.get(5)?,
        is_deleted: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert evidence under `control`; the company is always taken from the control
pub fn insert_evidence(
    conn: &Connection,
    control: &Control,
    name: &str,
    file: &str,
    created_by: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO evidence (control_id, company_id, name, file, status, created_by, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            control.id,
            control.company_id,
            name,
            file,
            EvidenceStatus::Rejected,
            created_by,
            timestamp_now()
        ],
    ).context("Failed to insert evidence")?;

    Ok(conn.last_insert_rowid())
}

/// Look up evidence by id regardless of tenant or soft-delete state
pub fn select_evidence(conn: &Connection, id: i64) -> Result<Option<Evidence>> {
    let evidence = conn
        .query_row(
            &format!("SELECT {} FROM evidence WHERE id = ?", EVIDENCE_COLUMNS),
            params![id],
            evidence_from_row,
        )
        .optional()
        .context("Failed to query evidence")?;

    Ok(evidence)
}

/// Look up live evidence owned by `company_id`
pub fn select_evidence_for_company(conn: &Connection, company_id: i64, id: i64) -> Result<Option<Evidence>> {
    let evidence = conn
        .query_row(
            &format!(
                "SELECT {} FROM evidence WHERE id = ? AND company_id = ? AND is_deleted = 0",
                EVIDENCE_COLUMNS
            ),
            params![id, company_id],
            evidence_from_row,
        )
        .optional()
        .context("Failed to query evidence for company")?;

    Ok(evidence)
}

pub fn select_evidence_list(conn: &Connection, company_id: i64) -> Result<Vec<Evidence>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM evidence WHERE company_id = ? AND is_deleted = 0 ORDER BY created_at DESC, id DESC",
            EVIDENCE_COLUMNS
        ))
        .context("Failed to prepare select evidence query")?;

    let evidence = stmt
        .query_map(params![company_id], evidence_from_row)
        .context("Failed to map evidence from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect evidence")?;

    Ok(evidence)
}

pub fn select_evidence_for_control(conn: &Connection, control_id: i64) -> Result<Vec<Evidence>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM evidence WHERE control_id = ? AND is_deleted = 0 ORDER BY id",
            EVIDENCE_COLUMNS
        ))
        .context("Failed to prepare select evidence for control query")?;

    let evidence = stmt
        .query_map(params![control_id], evidence_from_row)
        .context("Failed to map evidence from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect evidence")?;

    Ok(evidence)
}

pub fn update_evidence_status(conn: &Connection, id: i64, status: EvidenceStatus) -> Result<()> {
    conn.execute(
        "UPDATE evidence SET status = ? WHERE id = ?",
        params![status, id],
    ).context("Failed to update evidence status")?;

    Ok(())
}

/// Soft-delete the listed evidence items that belong to `company_id`
///
/// Ids owned by other tenants are silently skipped. Returns the ids actually deleted.
pub fn soft_delete_evidence(conn: &Connection, company_id: i64, ids: &[i64]) -> Result<Vec<i64>> {
    let mut deleted = Vec::new();

    for id in ids {
        let changed = conn
            .execute(
                "UPDATE evidence SET is_deleted = 1 WHERE id = ? AND company_id = ? AND is_deleted = 0",
                params![id, company_id],
            )
            .context("Failed to soft-delete evidence")?;

        if changed == 1 {
            deleted.push(*id);
        }
    }

    Ok(deleted)
}

// ===== COMPLIANCE CHECK CRUD =====

const CHECK_SELECT: &str = "SELECT c.id, c.evidence_id, e.company_id, c.status, c.ai_analysis,
        c.rejection_reason, c.recommendations, c.created_at, c.updated_at
     FROM compliance_checks c
     JOIN evidence e ON e.id = c.evidence_id";

/// Decode a JSON text column, reporting corrupt content as a conversion failure
fn json_column<T: serde::de::DeserializeOwned>(index: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn check_from_row(row: &Row) -> rusqlite::Result<ComplianceCheck> {
    let ai_analysis: Option<String> = row.get(4)?;
    let recommendations: String = row.get(6)?;

    Ok(ComplianceCheck {
        id: row.get(0)?,
        evidence_id: row.get(1)?,
        company_id: row.get(2)?,
        status: row.get(3)?,
        ai_analysis: ai_analysis.map(|raw| json_column(4, &raw)).transpose()?,
        rejection_reason: row.get(5)?,
        recommendations: json_column(6, &recommendations)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn select_check(conn: &Connection, id: i64) -> Result<Option<ComplianceCheck>> {
    let check = conn
        .query_row(&format!("{} WHERE c.id = ?", CHECK_SELECT), params![id], check_from_row)
        .optional()
        .context("Failed to query compliance check")?;

    Ok(check)
}

pub fn select_check_for_evidence(conn: &Connection, evidence_id: i64) -> Result<Option<ComplianceCheck>> {
    let check = conn
        .query_row(
            &format!("{} WHERE c.evidence_id = ?", CHECK_SELECT),
            params![evidence_id],
            check_from_row,
        )
        .optional()
        .context("Failed to query compliance check for evidence")?;

    Ok(check)
}

/// Return the check for `evidence_id`, creating a `pending` one if none exists
///
/// The unique constraint on `evidence_id` makes concurrent callers converge on one row.
pub fn get_or_create_check(conn: &Connection, evidence_id: i64) -> Result<ComplianceCheck> {
    let now = timestamp_now();
    conn.execute(
        "INSERT OR IGNORE INTO compliance_checks (evidence_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?)",
        params![evidence_id, CheckStatus::Pending, now, now],
    ).context("Failed to create compliance check")?;

    select_check_for_evidence(conn, evidence_id)?
        .ok_or_else(|| anyhow!("Compliance check for evidence {} vanished after insert", evidence_id))
}

/// Atomically move a claimable check (pending/rejected/error) to `processing`
///
/// Returns the claim stamp (the new `updated_at`) or None when another caller
/// already holds the check. The stamp must be passed back to [`finish_check`].
pub fn claim_check(conn: &Connection, id: i64) -> Result<Option<String>> {
    let stamp = timestamp_now();
    let changed = conn
        .execute(
            "UPDATE compliance_checks SET status = ?, updated_at = ?
             WHERE id = ? AND status IN ('pending', 'rejected', 'error')",
            params![CheckStatus::Processing, stamp, id],
        )
        .context("Failed to claim compliance check")?;

    Ok((changed == 1).then_some(stamp))
}

/// Reset a check to `pending` only if it still has the status and timestamp the caller saw
pub fn reset_check_for_retry(
    conn: &Connection,
    id: i64,
    seen_status: CheckStatus,
    seen_updated_at: &str,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE compliance_checks SET status = ?, rejection_reason = '', updated_at = ?
             WHERE id = ? AND status = ? AND updated_at = ?",
            params![CheckStatus::Pending, timestamp_now(), id, seen_status, seen_updated_at],
        )
        .context("Failed to reset compliance check")?;

    Ok(changed == 1)
}

/// Write the outcome of an evaluation onto a check claimed with `claim_stamp`
///
/// Returns false when the claim is no longer held (a stale retry reclaimed it).
pub fn finish_check(
    conn: &Connection,
    id: i64,
    claim_stamp: &str,
    status: CheckStatus,
    ai_analysis: Option<&Value>,
    rejection_reason: &str,
    recommendations: &[String],
) -> Result<bool> {
    let recommendations = serde_json::to_string(recommendations)
        .context("Failed to serialize recommendations")?;

    let changed = conn
        .execute(
            "UPDATE compliance_checks
             SET status = ?, ai_analysis = ?, rejection_reason = ?, recommendations = ?, updated_at = ?
             WHERE id = ? AND status = 'processing' AND updated_at = ?",
            params![
                status,
                ai_analysis.map(|v| v.to_string()),
                rejection_reason,
                recommendations,
                timestamp_now(),
                id,
                claim_stamp
            ],
        )
        .context("Failed to record compliance check outcome")?;

    Ok(changed == 1)
}

/// List all checks for live evidence of `company_id`, newest first
pub fn select_checks_for_company(conn: &Connection, company_id: i64) -> Result<Vec<ComplianceCheckSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.evidence_id, e.company_id, c.status, c.ai_analysis,
                    c.rejection_reason, c.recommendations, c.created_at, c.updated_at,
                    e.name, ctl.name
             FROM compliance_checks c
             JOIN evidence e ON e.id = c.evidence_id
             JOIN controls ctl ON ctl.id = e.control_id
             WHERE e.company_id = ? AND e.is_deleted = 0
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .context("Failed to prepare select compliance checks query")?;

    let checks = stmt
        .query_map(params![company_id], |row| {
            Ok(ComplianceCheckSummary {
                check: check_from_row(row)?,
                evidence_name: row.get(9)?,
                control_name: row.get(10)?,
            })
        })
        .context("Failed to map compliance checks from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect compliance checks")?;

    Ok(checks)
}

// ===== AUDIT EVENTS =====

pub fn insert_audit_event(conn: &Connection, event: &AuditEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_events (event_type, company_id, evidence_id, control_id, description, metadata, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            event.event_type,
            event.company_id,
            event.evidence_id,
            event.control_id,
            event.description,
            event.metadata,
            event.created_at
        ],
    ).context("Failed to insert audit event")?;

    Ok(conn.last_insert_rowid())
}

pub fn select_audit_events(conn: &Connection, company_id: i64, limit: i64) -> Result<Vec<AuditEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, event_type, company_id, evidence_id, control_id, description, metadata, created_at
             FROM audit_events WHERE company_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .context("Failed to prepare select audit events query")?;

    let events = stmt
        .query_map(params![company_id, limit], |row| {
            Ok(AuditEvent {
                id: row.get(0)?,
                event_type: row.get(1)?,
                company_id: row.get(2)?,
                evidence_id: row.get(3)?,
                control_id: row.get(4)?,
                description: row.get(5)?,
                metadata: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .context("Failed to map audit events from query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect audit events")?;

    Ok(events)
}
