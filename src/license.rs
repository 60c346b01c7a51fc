//! License validation gate
//!
//! The scheduler checks the gate once at start and periodically while
//! running; an invalid or expired license forces a graceful stop. The
//! file-backed implementation reads the JSON key file the activation
//! tooling writes next to the binary.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// License validity oracle consumed by the scheduler
pub trait LicenseGate {
    /// Whether the license currently permits running
    fn is_valid(&self) -> bool;

    /// Time left before expiry, zero when already expired
    fn remaining_time(&self) -> Duration;
}

/// Errors loading a license file
#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    #[error("license file unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("license file corrupted: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("license has no key")]
    MissingKey,
}

/// On-disk license format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LicenseData {
    license_key: String,
    #[serde(default)]
    user_id: Option<String>,
    expires_at: DateTime<Utc>,
}

/// License loaded from a local key file
pub struct FileLicense {
    key: String,
    user_id: Option<String>,
    expires_at: DateTime<Utc>,
}

impl FileLicense {
    /// Load and sanity-check a license file
    pub fn load(path: &Path) -> Result<Self, LicenseError> {
        let raw = std::fs::read_to_string(path)?;
        let data: LicenseData = serde_json::from_str(&raw)?;
        if data.license_key.trim().is_empty() {
            return Err(LicenseError::MissingKey);
        }
        log::info!(
            "License loaded for {} (expires {})",
            data.user_id.as_deref().unwrap_or("unknown user"),
            data.expires_at
        );
        Ok(Self {
            key: data.license_key,
            user_id: data.user_id,
            expires_at: data.expires_at,
        })
    }

    /// Build a license directly from its fields
    pub fn from_parts(
        key: &str,
        user_id: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.to_string(),
            user_id: user_id.map(|s| s.to_string()),
            expires_at,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl LicenseGate for FileLicense {
    fn is_valid(&self) -> bool {
        !self.key.is_empty() && Utc::now() < self.expires_at
    }

    fn remaining_time(&self) -> Duration {
        (self.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// A gate that always permits running; development builds only
pub struct UnlimitedLicense;

impl LicenseGate for UnlimitedLicense {
    fn is_valid(&self) -> bool {
        true
    }

    fn remaining_time(&self) -> Duration {
        Duration::MAX
    }
}
