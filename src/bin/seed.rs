use compliance_evidence::{db, utils::AppConfig};

// Seeding helper for fresh deployments and local demos.
// Usage: cargo run --bin seed -- [controls|demo]
// `controls` (the default) gives every active company an admin and the default controls.
// `demo` creates Acme Corp with two users, MFA/SSO controls and placeholder evidence.
fn main() -> anyhow::Result<()> {
    compliance_evidence::utils::load_env().ok();

    let command = std::env::args().nth(1).unwrap_or_else(|| "controls".to_string());

    let config = AppConfig::from_env()?;
    let db_path = db::get_db_path(&config.data_dir)?;
    println!("Using database {}", db_path.display());

    let conn = db::init_db(&db_path)?;

    match command.as_str() {
        "controls" => {
            let summary = db::seed_default_controls(&conn)?;
            println!(
                "companies={} | admins_created={} | controls_created={}",
                summary.companies_processed, summary.admins_created, summary.controls_created
            );
        }
        "demo" => {
            db::seed_demo(&conn)?;
            println!("Demo data ready (company: Acme Corp, users: admin, employee)");
        }
        other => {
            anyhow::bail!("unknown command: {} (expected `controls` or `demo`)", other);
        }
    }

    Ok(())
}
