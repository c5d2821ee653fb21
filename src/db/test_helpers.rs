//! Test isolation and database setup helpers
//!
//! Provides utilities for proper test database isolation without race conditions

use super::{init_db, queries, Database};
use crate::models::Role;
use rusqlite::Connection;

/// Test database guard that manages an isolated test database
/// Each test gets its own temporary directory and database file
pub struct TestDbGuard {
    pub temp_dir: tempfile::TempDir,
}

impl TestDbGuard {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().unwrap();
        TestDbGuard { temp_dir }
    }

    /// Initialize a fresh, migrated database
    pub fn init_db(&self) -> anyhow::Result<Connection> {
        init_db(&self.temp_dir.path().join("compliance.db"))
    }

    /// Same database wrapped in the shared handle used by the engine
    pub fn database(&self) -> anyhow::Result<Database> {
        Ok(Database::from_connection(self.init_db()?))
    }
}

impl Default for TestDbGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Ids of a seeded tenant
#[derive(Debug, Clone, Copy)]
pub struct TenantFixture {
    pub company_id: i64,
    pub admin_id: i64,
    pub employee_id: i64,
}

/// Create a company with one admin and one employee
pub fn seed_tenant(conn: &Connection, name: &str) -> TenantFixture {
    let slug = name.to_lowercase();
    let company_id = queries::insert_company(conn, name).unwrap();
    let admin_id = queries::insert_user(
        conn,
        &format!("{}-admin", slug),
        &format!("admin@{}.test", slug),
        Some(company_id),
        Role::Admin,
    )
    .unwrap();
    let employee_id = queries::insert_user(
        conn,
        &format!("{}-employee", slug),
        &format!("employee@{}.test", slug),
        Some(company_id),
        Role::Employee,
    )
    .unwrap();

    TenantFixture {
        company_id,
        admin_id,
        employee_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_isolation() {
        {
            let guard1 = TestDbGuard::new();
            let conn1 = guard1.init_db().expect("Failed to initialize database");
            seed_tenant(&conn1, "Acme");

            let count: i64 = conn1
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 2);
        }

        // Second guard gets a clean database
        {
            let guard2 = TestDbGuard::new();
            let conn2 = guard2.init_db().expect("Failed to initialize database");

            let count: i64 = conn2
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0);
        }
    }
}
