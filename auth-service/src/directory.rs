use std::collections::HashMap;
use std::path::Path;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use common_auth::{Principal, Role};
use rand_core::OsRng;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read principal directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse principal directory: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("duplicate principal email '{0}'")]
    DuplicateEmail(String),
    #[error("password hash error: {0}")]
    Hash(String),
}

/// Credential lookup. Returns the principal when the password matches and
/// `None` for an unknown email or a wrong password alike.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>, DirectoryError>;
}

/// One principal as stored on disk. `passwordHash` is an argon2 PHC string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    // Keyed by lower-cased email.
    entries: HashMap<String, DirectoryEntry>,
}

impl InMemoryDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Result<Self, DirectoryError> {
        let mut directory = Self::default();
        for entry in entries {
            directory.insert(entry)?;
        }
        Ok(directory)
    }

    /// Parse a JSON array of [`DirectoryEntry`].
    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        let entries: Vec<DirectoryEntry> = serde_json::from_str(raw)?;
        Self::new(entries)
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Add a principal with a plaintext password, hashing it first.
    pub fn with_user(
        mut self,
        id: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        password: &str,
    ) -> Result<Self, DirectoryError> {
        let entry = DirectoryEntry {
            id: id.into(),
            email: email.into(),
            role,
            password_hash: hash_password(password)?,
        };
        self.insert(entry)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: DirectoryEntry) -> Result<(), DirectoryError> {
        PasswordHash::new(&entry.password_hash)
            .map_err(|err| DirectoryError::Hash(format!("{}: {err}", entry.email)))?;

        let key = normalize_email(&entry.email);
        if self.entries.contains_key(&key) {
            return Err(DirectoryError::DuplicateEmail(entry.email));
        }
        self.entries.insert(key, entry);
        Ok(())
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryDirectory {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>, DirectoryError> {
        let Some(entry) = self.entries.get(&normalize_email(email)) else {
            return Ok(None);
        };

        let parsed = PasswordHash::new(&entry.password_hash)
            .map_err(|err| DirectoryError::Hash(err.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }

        Ok(Some(Principal::new(
            entry.id.clone(),
            entry.email.clone(),
            entry.role,
        )))
    }
}

pub fn hash_password(password: &str) -> Result<String, DirectoryError> {
    if password.trim().is_empty() {
        return Err(DirectoryError::EmptyPassword);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| DirectoryError::Hash(err.to_string()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
