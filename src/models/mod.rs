// Compliance evidence data models

pub mod audit;
pub mod company;
pub mod compliance_check;
pub mod control;
pub mod evidence;
pub mod tenant;

// Re-exports for convenience
pub use audit::{AuditEvent, AuditEventType};
pub use company::{Company, Role, User};
pub use compliance_check::{CheckStatus, ComplianceCheck, ComplianceCheckSummary};
pub use control::{Control, ControlStatus};
pub use evidence::{Evidence, EvidenceStatus};
pub use tenant::{is_same_tenant, TenantScoped};

/// Stores a status enum as its lowercase TEXT form in SQLite
///
/// The enum must provide `as_str` and `from_str` like every status type in this module.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                <$ty>::from_str(text).ok_or_else(|| {
                    rusqlite::types::FromSqlError::Other(
                        format!("unknown {} value: {}", stringify!($ty), text).into(),
                    )
                })
            }
        }
    };
}

pub(crate) use sql_text_enum;
