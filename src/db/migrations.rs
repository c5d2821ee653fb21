use rusqlite::Connection;
use anyhow::{Result, Context};

use crate::db::queries;
use crate::models::{control::DEFAULT_CONTROL_NAMES, Role};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Index creation statements extracted for idempotent execution
/// These are safe to run on every init because they use IF NOT EXISTS
const INDEX_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_users_company_id ON users(company_id);
CREATE INDEX IF NOT EXISTS idx_controls_company_id ON controls(company_id);
CREATE INDEX IF NOT EXISTS idx_evidence_company_id ON evidence(company_id);
CREATE INDEX IF NOT EXISTS idx_evidence_control_id ON evidence(control_id);
CREATE INDEX IF NOT EXISTS idx_compliance_checks_status ON compliance_checks(status);
CREATE INDEX IF NOT EXISTS idx_audit_events_company_id ON audit_events(company_id);
CREATE INDEX IF NOT EXISTS idx_audit_events_created_at ON audit_events(created_at);
";

/// Latest schema version understood by this build
pub const SCHEMA_VERSION: i64 = 1;

/// Get current database schema version
fn get_schema_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to get schema version")?;
    Ok(version)
}

/// Set database schema version
fn set_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {}", version))
        .context("Failed to set schema version")?;
    Ok(())
}

/// Migrate from v0 (empty) to v1 (initial schema)
fn migrate_to_v1(conn: &Connection) -> Result<()> {
    // Tables, foreign keys and tenant triggers
    conn.execute_batch(SCHEMA_SQL)
        .context("Failed to execute v1 schema migration")?;

    conn.execute_batch(INDEX_SQL)
        .context("Failed to create v1 indexes")?;

    Ok(())
}

/// Run all database migrations
/// Uses PRAGMA user_version to track schema state:
/// - v0: Empty database (no tables)
/// - v1: Tenants, controls, evidence, compliance checks, audit events
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        anyhow::bail!(
            "Database schema v{} is newer than this build supports (v{})",
            current_version,
            SCHEMA_VERSION
        );
    }

    if current_version < 1 {
        migrate_to_v1(conn)?;
        set_schema_version(conn, 1)?;
    }

    Ok(())
}

/// Result of a control seeding run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub companies_processed: usize,
    pub admins_created: usize,
    pub controls_created: usize,
}

/// Seed the default MFA and SSO controls for every active company
///
/// Ensures a "Default Company" exists, then gives each non-deleted company an
/// `admin_<company>` user and the two default controls. Safe to run repeatedly:
/// existing users and controls are left untouched.
pub fn seed_default_controls(conn: &Connection) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    if queries::select_company_by_name(conn, "Default Company")?.is_none() {
        queries::insert_company(conn, "Default Company")?;
    }

    for company in queries::select_active_companies(conn)? {
        summary.companies_processed += 1;

        let slug = company.name.to_lowercase().replace(' ', "_");
        let username = format!("admin_{}", slug);

        let admin_id = match queries::select_user_by_username(conn, &username)? {
            Some(user) => user.id,
            None => {
                summary.admins_created += 1;
                queries::insert_user(
                    conn,
                    &username,
                    &format!("admin@{}.com", slug),
                    Some(company.id),
                    Role::Admin,
                )?
            }
        };

        for name in DEFAULT_CONTROL_NAMES {
            if queries::select_control_by_name(conn, company.id, name)?.is_none() {
                queries::insert_control(conn, company.id, name, admin_id)
                    .context(format!("Failed to seed control {:?} for {}", name, company.name))?;
                summary.controls_created += 1;
            }
        }
    }

    Ok(summary)
}

/// Seed a small demo tenant: Acme Corp with an admin, an employee, two
/// controls and a placeholder evidence item (no file) per control
pub fn seed_demo(conn: &Connection) -> Result<()> {
    let company_id = match queries::select_company_by_name(conn, "Acme Corp")? {
        Some(company) => company.id,
        None => queries::insert_company(conn, "Acme Corp")?,
    };

    let admin_id = match queries::select_user_by_username(conn, "admin")? {
        Some(user) => user.id,
        None => queries::insert_user(conn, "admin", "admin@example.com", Some(company_id), Role::Admin)?,
    };

    if queries::select_user_by_username(conn, "employee")?.is_none() {
        queries::insert_user(conn, "employee", "employee@example.com", Some(company_id), Role::Employee)?;
    }

    for (control_name, evidence_name) in [
        ("MFA Control", "MFA Screenshot Placeholder"),
        ("SSO Login Control", "SSO Screenshot Placeholder"),
    ] {
        let control = match queries::select_control_by_name(conn, company_id, control_name)? {
            Some(control) => control,
            None => {
                let id = queries::insert_control(conn, company_id, control_name, admin_id)?;
                queries::select_control(conn, id)?
                    .context("Seeded control could not be read back")?
            }
        };

        let existing = queries::select_evidence_for_control(conn, control.id)?;
        if existing.is_empty() {
            queries::insert_evidence(conn, &control, evidence_name, "", admin_id)?;
        }
    }

    Ok(())
}
