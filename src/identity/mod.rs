//! Account directory: registration, authentication, and bootstrap seeding.
//!
//! The [`AccountDirectory`] exclusively owns the account collection. Every
//! mutation holds the write guard across the uniqueness check and the
//! snapshot save, so concurrent registrations of the same identity cannot
//! both succeed. A started save always reaches its commit, even when the
//! caller is cancelled.

pub mod password;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::markers::AUTOMATED_DETECTION;
use crate::persist::{save_then_commit, SnapshotStore, StorageError};

/// Privilege level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// May create and delete markers.
    #[serde(alias = "admin")]
    Operator,
    /// May only read markers.
    #[serde(alias = "user")]
    Viewer,
}

impl Privilege {
    /// Lowercase name used on the wire and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Viewer => "viewer",
        }
    }
}

/// An authenticated or looked-up account, without its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Stable account id.
    pub id: String,
    /// Login identity, unique across the directory.
    #[serde(rename = "username")]
    pub identity: String,
    /// Privilege level.
    #[serde(rename = "role")]
    pub privilege: Privilege,
}

/// Persisted account record, including the credential hash.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Stable account id (UUID v4).
    pub id: String,
    /// Login identity.
    pub username: String,
    /// PHC-format credential hash.
    #[serde(rename = "password")]
    pub password_hash: String,
    /// Privilege level.
    pub role: Privilege,
}

impl AccountRecord {
    fn to_account(&self) -> Account {
        Account {
            id: self.id.clone(),
            identity: self.username.clone(),
            privilege: self.role,
        }
    }
}

impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"__REDACTED__")
            .field("role", &self.role)
            .finish()
    }
}

/// Errors from the account directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The identity is already registered.
    #[error("identity already registered: {0}")]
    DuplicateIdentity(String),
    /// Unknown identity or wrong secret. Deliberately indistinguishable.
    #[error("invalid identity or secret")]
    InvalidCredentials,
    /// Identity or secret failed shape checks.
    #[error("invalid account field: {0}")]
    InvalidIdentity(&'static str),
    /// The credential hasher failed.
    #[error("credential hashing failed: {0}")]
    Hashing(String),
    /// The account snapshot could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Durable account collection.
pub struct AccountDirectory {
    records: Arc<RwLock<Vec<AccountRecord>>>,
    snapshot: Arc<dyn SnapshotStore<AccountRecord>>,
}

impl AccountDirectory {
    /// Open the directory, loading the last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Storage`] if the snapshot cannot be read.
    pub async fn open(
        snapshot: Arc<dyn SnapshotStore<AccountRecord>>,
    ) -> Result<Self, DirectoryError> {
        let records = snapshot.load().await?;
        debug!(accounts = records.len(), "account directory loaded");

        let unverifiable: Vec<&str> = records
            .iter()
            .filter(|r| !password::is_supported_hash(&r.password_hash))
            .map(|r| r.username.as_str())
            .collect();
        if !unverifiable.is_empty() {
            warn!(
                count = unverifiable.len(),
                identities = ?unverifiable,
                "accounts hold credential hashes in an unsupported format and cannot log in; \
                 re-register them or remove them so the bootstrap operator is seeded"
            );
        }

        Ok(Self {
            records: Arc::new(RwLock::new(records)),
            snapshot,
        })
    }

    /// Self-register a viewer account.
    ///
    /// Identity comparison is exact and case-sensitive.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::DuplicateIdentity`] if the identity exists,
    /// [`DirectoryError::InvalidIdentity`] for empty fields, or
    /// [`DirectoryError::Storage`] if the save fails. On any error the
    /// directory is unchanged.
    pub async fn register(&self, identity: &str, secret: &str) -> Result<Account, DirectoryError> {
        validate_fields(identity, secret)?;
        let password_hash = hash_blocking(secret).await?;

        let records = Arc::clone(&self.records).write_owned().await;
        if records.iter().any(|r| r.username == identity) {
            return Err(DirectoryError::DuplicateIdentity(identity.to_owned()));
        }

        let record = new_record(identity, password_hash, Privilege::Viewer);
        let account = self.commit(records, record).await?;
        info!(identity = %account.identity, role = account.privilege.as_str(), "account registered");
        Ok(account)
    }

    /// Verify `secret` for `identity` and return the account.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidCredentials`] for an unknown
    /// identity or a wrong secret.
    pub async fn authenticate(
        &self,
        identity: &str,
        secret: &str,
    ) -> Result<Account, DirectoryError> {
        let found = {
            let records = self.records.read().await;
            records.iter().find(|r| r.username == identity).cloned()
        };

        let secret = secret.to_owned();
        match found {
            Some(record) => {
                let stored = record.password_hash.clone();
                let verified = tokio::task::spawn_blocking(move || {
                    password::verify_secret(&secret, &stored)
                })
                .await
                .map_err(|e| DirectoryError::Hashing(e.to_string()))?;
                if verified {
                    Ok(record.to_account())
                } else {
                    debug!(identity, "credential mismatch");
                    Err(DirectoryError::InvalidCredentials)
                }
            }
            None => {
                tokio::task::spawn_blocking(move || password::verify_against_dummy(&secret))
                    .await
                    .map_err(|e| DirectoryError::Hashing(e.to_string()))?;
                debug!(identity, "unknown identity");
                Err(DirectoryError::InvalidCredentials)
            }
        }
    }

    /// Create the bootstrap operator if and only if the directory is empty.
    ///
    /// Returns the created account, or `None` when accounts already exist.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Storage`] if the save fails.
    pub async fn seed_default_admin(
        &self,
        identity: &str,
        secret: &str,
    ) -> Result<Option<Account>, DirectoryError> {
        if !self.records.read().await.is_empty() {
            return Ok(None);
        }
        validate_fields(identity, secret)?;
        let password_hash = hash_blocking(secret).await?;

        let records = Arc::clone(&self.records).write_owned().await;
        // Re-checked under the write guard; emptiness is the only seed marker.
        if !records.is_empty() {
            return Ok(None);
        }

        let record = new_record(identity, password_hash, Privilege::Operator);
        let account = self.commit(records, record).await?;
        warn!(
            identity = %account.identity,
            "seeded bootstrap operator account; change its secret"
        );
        Ok(Some(account))
    }

    /// Resolve an account by its stable id.
    pub async fn find_by_id(&self, id: &str) -> Option<Account> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .map(AccountRecord::to_account)
    }

    /// Number of registered accounts.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no accounts exist.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Persist `records + record`, then publish it in memory.
    async fn commit(
        &self,
        records: OwnedRwLockWriteGuard<Vec<AccountRecord>>,
        record: AccountRecord,
    ) -> Result<Account, DirectoryError> {
        let account = record.to_account();
        let mut next = records.clone();
        next.push(record);
        save_then_commit(records, next, Arc::clone(&self.snapshot)).await?;
        Ok(account)
    }
}

fn validate_fields(identity: &str, secret: &str) -> Result<(), DirectoryError> {
    if identity.trim().is_empty() {
        return Err(DirectoryError::InvalidIdentity("identity must not be empty"));
    }
    // Provenance of open-ingress markers must never name a real account.
    if identity == AUTOMATED_DETECTION {
        return Err(DirectoryError::InvalidIdentity("identity is reserved"));
    }
    if secret.is_empty() {
        return Err(DirectoryError::InvalidIdentity("secret must not be empty"));
    }
    Ok(())
}

fn new_record(identity: &str, password_hash: String, role: Privilege) -> AccountRecord {
    AccountRecord {
        id: Uuid::new_v4().to_string(),
        username: identity.to_owned(),
        password_hash,
        role,
    }
}

async fn hash_blocking(secret: &str) -> Result<String, DirectoryError> {
    let secret = secret.to_owned();
    tokio::task::spawn_blocking(move || password::hash_secret(&secret))
        .await
        .map_err(|e| DirectoryError::Hashing(e.to_string()))?
        .map_err(|e| DirectoryError::Hashing(e.to_string()))
}
