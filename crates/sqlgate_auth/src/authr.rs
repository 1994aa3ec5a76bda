use sqlgate_core::{AuthSection, GatewayError, GatewayResult};

use crate::credentials::{verify_by_credentials, CredentialEntry};
use crate::CredentialQueryExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Inline,
    Http,
}

impl Mode {
    fn parse(raw: &str) -> GatewayResult<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "INLINE" => Ok(Self::Inline),
            "HTTP" => Ok(Self::Http),
            other => Err(GatewayError::Config(format!("invalid auth.mode: {other}"))),
        }
    }
}

pub enum CredentialStore {
    ByCredentials(Vec<CredentialEntry>),
    ByQuery(String),
}

pub struct Authr {
    pub mode: Mode,
    pub custom_error_code: Option<u16>,
    pub store: CredentialStore,
}

impl Authr {
    pub fn from_config(section: &AuthSection) -> GatewayResult<Self> {
        let mode = Mode::parse(section.mode.as_deref().unwrap_or("INLINE"))?;

        let store = match (&section.by_query, &section.by_credentials) {
            (Some(_), Some(_)) => {
                return Err(GatewayError::Config(
                    "auth must set exactly one of byQuery or byCredentials".into(),
                ))
            }
            (None, None) => {
                return Err(GatewayError::Config(
                    "auth must set exactly one of byQuery or byCredentials".into(),
                ))
            }
            (Some(query), None) => {
                if !query.contains(":user") || !query.contains(":password") {
                    return Err(GatewayError::Config(
                        "auth.byQuery must reference both :user and :password".into(),
                    ));
                }
                CredentialStore::ByQuery(query.clone())
            }
            (None, Some(entries)) => {
                if entries.is_empty() {
                    return Err(GatewayError::Config(
                        "auth.byCredentials must not be empty".into(),
                    ));
                }
                let mut built = Vec::with_capacity(entries.len());
                for entry in entries {
                    match (&entry.password, &entry.hashed_password) {
                        (Some(_), Some(_)) | (None, None) => {
                            return Err(GatewayError::Config(format!(
                                "user {}: exactly one of password or hashedPassword is required",
                                entry.user
                            )))
                        }
                        (Some(password), None) => {
                            let hashed = bcrypt::hash(password, bcrypt::DEFAULT_COST)
                                .map_err(|e| GatewayError::Config(e.to_string()))?;
                            built.push(CredentialEntry::new(
                                entry.user.clone(),
                                hashed,
                                Some(password.clone()),
                            ));
                        }
                        (None, Some(hashed)) => {
                            built.push(CredentialEntry::new(
                                entry.user.clone(),
                                hashed.clone(),
                                None,
                            ));
                        }
                    }
                }
                CredentialStore::ByCredentials(built)
            }
        };

        Ok(Self {
            mode,
            custom_error_code: section.custom_error_code,
            store,
        })
    }

    pub fn error_code(&self) -> u16 {
        self.custom_error_code.unwrap_or(401)
    }

    /// Verifies `user`/`password`. `query_executor` is only invoked for the
    /// `ByQuery` store; it is expected to run under the same database mutex
    /// the caller already holds.
    pub fn verify(
        &self,
        user: &str,
        password: &str,
        query_executor: &dyn CredentialQueryExecutor,
    ) -> GatewayResult<bool> {
        match &self.store {
            CredentialStore::ByCredentials(entries) => {
                Ok(verify_by_credentials(entries, user, password))
            }
            CredentialStore::ByQuery(sql) => query_executor
                .check(sql, user, password)
                .map_err(GatewayError::Execution),
        }
    }
}
