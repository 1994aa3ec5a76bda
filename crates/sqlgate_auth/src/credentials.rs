use std::sync::RwLock;

/// One `byCredentials[]` entry, plus the "last successful plaintext" cache.
///
/// The cache is a single nullable slot, guarded so readers never block on
/// writers for long: they take a read lock, compare bytes, and drop it.
/// Writers only take the write lock on a successful bcrypt verification,
/// which happens at most once per distinct (user, password) pair.
pub struct CredentialEntry {
    pub user: String,
    pub hashed_password: String,
    plaintext_cache: RwLock<Option<String>>,
}

impl CredentialEntry {
    pub fn new(user: String, hashed_password: String, prepopulated: Option<String>) -> Self {
        Self {
            user,
            hashed_password,
            plaintext_cache: RwLock::new(prepopulated),
        }
    }
}

/// Verifies `password` against `user` within `entries`, per the two-tier
/// lookup: a cheap cache hit first, bcrypt only on a cache miss.
pub fn verify_by_credentials(entries: &[CredentialEntry], user: &str, password: &str) -> bool {
    let Some(entry) = entries.iter().find(|e| e.user == user) else {
        return false;
    };

    if let Some(cached) = entry.plaintext_cache.read().unwrap().as_deref() {
        if cached == password {
            return true;
        }
    }

    match bcrypt::verify(password, &entry.hashed_password) {
        Ok(true) => {
            *entry.plaintext_cache.write().unwrap() = Some(password.to_string());
            true
        }
        Ok(false) => false,
        Err(e) => {
            log::warn!("bcrypt verification error for user {user}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, password: &str) -> CredentialEntry {
        let hashed = bcrypt::hash(password, bcrypt::DEFAULT_COST).unwrap();
        CredentialEntry::new(user.to_string(), hashed, None)
    }

    #[test]
    fn unknown_user_is_rejected() {
        let entries = vec![entry("pietro", "hey")];
        assert!(!verify_by_credentials(&entries, "nope", "hey"));
    }

    #[test]
    fn correct_password_succeeds_and_populates_cache() {
        let entries = vec![entry("pietro", "hey")];
        assert!(verify_by_credentials(&entries, "pietro", "hey"));
        assert!(entries[0]
            .plaintext_cache
            .read()
            .unwrap()
            .as_deref()
            == Some("hey"));
    }

    #[test]
    fn wrong_password_fails_without_poisoning_cache() {
        let entries = vec![entry("pietro", "hey")];
        assert!(!verify_by_credentials(&entries, "pietro", "wrong"));
        assert!(entries[0].plaintext_cache.read().unwrap().is_none());
    }

    #[test]
    fn prepopulated_plaintext_cache_skips_bcrypt() {
        let hashed = bcrypt::hash("hey", bcrypt::DEFAULT_COST).unwrap();
        let entries = vec![CredentialEntry::new(
            "pietro".to_string(),
            hashed,
            Some("hey".to_string()),
        )];
        assert!(verify_by_credentials(&entries, "pietro", "hey"));
    }
}
