mod authr;
mod credentials;

pub use authr::{Authr, CredentialStore, Mode};
pub use credentials::{verify_by_credentials, CredentialEntry};

use std::time::Duration;

/// The only rate-limiting mechanism in the system: a failed authentication
/// attempt sleeps this long while the caller still holds the owning
/// database's mutex, serializing brute-force attempts globally per
/// database.
pub const FAILURE_PENALTY: Duration = Duration::from_secs(1);

/// Something that can run a user-supplied `ByQuery` authentication lookup
/// against the owning database's live connection. Implemented by the
/// engine layer, which is the only place holding that connection; kept as
/// a trait here so this crate never needs to depend on the engine crate.
pub trait CredentialQueryExecutor {
    fn check(&self, sql: &str, user: &str, password: &str) -> Result<bool, String>;
}
