//! Startup self-checks
//!
//! Runs before the server starts accepting requests:
//! - Store reachable (listing count)
//! - Data directory writable (critical for the SQLite backend)
//! - Seed file present and parseable
//! - JWT secret configured

use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{Config, StorageBackend};
use crate::db::{load_seed_file, Store};

/// Result of a single startup check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// Whether failure should abort startup
    pub critical: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            critical: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            passed: false,
            critical,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Aggregated startup check results
#[derive(Debug, Clone)]
pub struct StartupCheckReport {
    pub checks: Vec<CheckResult>,
    pub all_critical_passed: bool,
    /// Whether all checks passed (including non-critical)
    pub all_passed: bool,
    pub summary: String,
}

impl StartupCheckReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let all_critical_passed = checks.iter().filter(|c| c.critical).all(|c| c.passed);
        let all_passed = checks.iter().all(|c| c.passed);

        let failed_critical = checks.iter().filter(|c| c.critical && !c.passed).count();
        let failed_non_critical = checks.iter().filter(|c| !c.critical && !c.passed).count();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();

        let summary = if all_passed {
            format!("All {} startup checks passed", total)
        } else if all_critical_passed {
            format!(
                "{}/{} checks passed ({} non-critical warnings)",
                passed, total, failed_non_critical
            )
        } else {
            format!(
                "{}/{} checks passed ({} critical failures)",
                passed, total, failed_critical
            )
        };

        Self {
            checks,
            all_critical_passed,
            all_passed,
            summary,
        }
    }
}

/// Run all startup self-checks
pub async fn run_startup_checks(config: &Config, store: &dyn Store) -> StartupCheckReport {
    info!("Running startup self-checks...");

    let checks = vec![
        check_store(store).await,
        check_data_directory(&config.storage.data_dir, config.storage.backend),
        check_seed_file(config.storage.seed_file.as_deref()),
        check_jwt_secret(config),
    ];

    let report = StartupCheckReport::new(checks);

    for check in &report.checks {
        if check.passed {
            info!(check = %check.name, message = %check.message, "Startup check PASSED");
        } else if check.critical {
            error!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (CRITICAL)"
            );
        } else {
            warn!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (non-critical)"
            );
        }
    }

    info!(
        summary = %report.summary,
        all_passed = report.all_passed,
        all_critical_passed = report.all_critical_passed,
        "Startup checks completed"
    );

    report
}

async fn check_store(store: &dyn Store) -> CheckResult {
    match store.count_listings().await {
        Ok(count) => CheckResult::pass("store", format!("{} store reachable", store.backend_name()))
            .with_details(format!("{} listings", count)),
        Err(e) => CheckResult::fail("store", "Failed to query the store", true)
            .with_details(e.to_string()),
    }
}

/// The data directory only matters when listings are persisted there.
fn check_data_directory(data_dir: &Path, backend: StorageBackend) -> CheckResult {
    let critical = backend == StorageBackend::Sqlite;
    let test_file = data_dir.join(".unistay_write_test");

    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = std::fs::remove_file(&test_file);
            CheckResult::pass("data_directory", "Data directory is writable")
                .with_details(format!("Path: {}", data_dir.display()))
        }
        Err(e) => CheckResult::fail("data_directory", "Data directory is not writable", critical)
            .with_details(format!("{}: {}", data_dir.display(), e)),
    }
}

fn check_seed_file(seed_file: Option<&Path>) -> CheckResult {
    let Some(path) = seed_file else {
        return CheckResult::pass("seed_file", "No seed file configured");
    };

    if !path.exists() {
        return CheckResult::fail("seed_file", "Seed file not found", false)
            .with_details(path.display().to_string());
    }

    match load_seed_file(path) {
        Ok(listings) => CheckResult::pass("seed_file", "Seed file is valid")
            .with_details(format!("{}: {} listings", path.display(), listings.len())),
        Err(e) => CheckResult::fail("seed_file", "Seed file is invalid", false)
            .with_details(format!("{:#}", e)),
    }
}

fn check_jwt_secret(config: &Config) -> CheckResult {
    match config.auth.jwt_secret.as_deref() {
        Some(secret) if secret.len() >= 32 => {
            CheckResult::pass("jwt_secret", "JWT secret configured")
        }
        Some(_) => CheckResult::fail("jwt_secret", "JWT secret is shorter than 32 bytes", false),
        None => CheckResult::fail(
            "jwt_secret",
            "No JWT secret configured; tokens will not survive a restart",
            false,
        ),
    }
}
