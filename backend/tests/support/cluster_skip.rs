//! Policy for embedded cluster setup failures.
//!
//! Hosts without the embedded PostgreSQL binaries (or running as root without
//! a worker) cannot start the cluster. Suites print a skip marker there unless
//! `REQUIRE_TEST_CLUSTER` is truthy, in which case the failure is fatal so CI
//! breakage is not masked.

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Returns true when a cluster failure must fail the test.
pub fn cluster_required() -> bool {
    env_flag("REQUIRE_TEST_CLUSTER") && !env_flag("SKIP_TEST_CLUSTER")
}

/// Handles embedded cluster setup failures consistently across suites.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if cluster_required() {
        panic!("Test cluster setup failed: {reason}. Unset REQUIRE_TEST_CLUSTER to skip.");
    }
    eprintln!("SKIP-TEST-CLUSTER: {reason}");
    None
}
