//! Shared integration test setup.

use std::sync::Once;

use turnkey::auth::AuthConfig;
use turnkey::db::Database;
use turnkey::session::SessionService;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars-long";

static INIT_TRACING: Once = Once::new();

/// Route log output through the test harness. `RUST_LOG` controls verbosity.
fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a session service over a fresh in-memory database.
pub async fn test_service() -> SessionService {
    init_tracing();

    let db = Database::in_memory().await.expect("in-memory database");
    SessionService::new(db.pool().clone(), &AuthConfig::new(TEST_SECRET))
        .expect("session service construction")
}
