//! Tenant ownership
//!
//! Every record that belongs to a company implements [`TenantScoped`], so
//! authorization is one uniform comparison instead of per-type checks.

use super::{ComplianceCheck, Control, Evidence};

/// A record owned by exactly one company
pub trait TenantScoped {
    fn owner_company(&self) -> i64;
}

impl TenantScoped for Control {
    fn owner_company(&self) -> i64 {
        self.company_id
    }
}

impl TenantScoped for Evidence {
    fn owner_company(&self) -> i64 {
        self.company_id
    }
}

impl TenantScoped for ComplianceCheck {
    fn owner_company(&self) -> i64 {
        self.company_id
    }
}

/// True when `record` belongs to `company_id`
///
/// Callers turn a `false` into "not found" so foreign ids never leak existence.
pub fn is_same_tenant<T: TenantScoped + ?Sized>(record: &T, company_id: i64) -> bool {
    record.owner_company() == company_id
}
