//! Salted password hashing for the connection store.
//!
//! The digest is only used to check a password typed by the user against the
//! stored record; it is never sent to the server.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CredentialError;
use crate::profile::ConnectionProfile;
use crate::store::ProfileRecord;

pub const SALT_LEN: usize = 16;

pub struct CredentialStore;

impl CredentialStore {
    /// 16 random bytes from the OS CSPRNG, base64 encoded.
    pub fn generate_salt() -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        STANDARD.encode(salt)
    }

    /// SHA-256 over `decode(salt) || utf8(password)`, base64 encoded.
    pub fn hash(password: &str, salt: &str) -> Result<String, CredentialError> {
        let salt_bytes = STANDARD
            .decode(salt)
            .map_err(|e| CredentialError::InvalidSalt(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&salt_bytes);
        hasher.update(password.as_bytes());
        Ok(STANDARD.encode(hasher.finalize()))
    }

    /// Fails closed: no stored hash/salt, or a malformed salt, means `false`.
    pub fn verify(profile: &ConnectionProfile, entered_password: &str) -> bool {
        let (Some(expected), Some(salt)) = (profile.password_hash(), profile.salt()) else {
            return false;
        };
        if expected.is_empty() || salt.is_empty() {
            return false;
        }

        match Self::hash(entered_password, salt) {
            Ok(entered) => entered == expected,
            Err(e) => {
                log::warn!("[{}] Cannot verify password: {}", profile.name, e);
                false
            }
        }
    }

    /// Build the at-rest record for a profile: fresh salt, hash of the
    /// in-memory password, no plaintext.
    pub fn seal(profile: &ConnectionProfile) -> Result<ProfileRecord, CredentialError> {
        let salt = Self::generate_salt();
        let password_hash = Self::hash(&profile.password, &salt)?;

        Ok(ProfileRecord {
            id: profile.id().to_string(),
            name: profile.name.clone(),
            host: profile.host.clone(),
            port: profile.port,
            username: profile.username.clone(),
            password_hash,
            salt,
            passive_mode: profile.passive_mode,
        })
    }

    /// Rebuild a profile from a record. The password stays empty until
    /// verified interactively.
    pub fn unseal(record: &ProfileRecord) -> ConnectionProfile {
        let mut profile = ConnectionProfile::with_id(
            &record.id,
            &record.name,
            &record.host,
            record.port,
            &record.username,
            "",
        );
        profile.passive_mode = record.passive_mode;
        profile.set_stored_credentials(&record.password_hash, &record.salt);
        profile
    }
}
