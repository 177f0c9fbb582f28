//! Shared-secret authentication.
//!
//! The policy is evaluated in a fixed order:
//!
//! 1. development mode with the bypass flag set accepts everything,
//! 2. an absent or empty key is rejected as missing,
//! 3. a key that differs from the configured secret is rejected as invalid,
//! 4. otherwise the request is accepted.

use crate::config::{EnvironmentMode, ServiceConfig};
use subtle::ConstantTimeEq;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthGrant {
    /// Accepted because auth is bypassed in development.
    DevBypass,
    /// Accepted because the presented key matched.
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    Missing,
    Invalid,
}

impl AuthRejection {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthRejection::Missing => "missing",
            AuthRejection::Invalid => "invalid",
        }
    }

    /// Message returned to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            AuthRejection::Missing => "API key is missing",
            AuthRejection::Invalid => "Invalid API key",
        }
    }
}

/// Validates presented keys against the configured secret.
///
/// Pure over its inputs: no logging of key material, no ambient state.
#[derive(Clone)]
pub struct Authenticator {
    api_key: String,
    environment: EnvironmentMode,
    bypass: bool,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("environment", &self.environment)
            .field("bypass", &self.bypass)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(api_key: impl Into<String>, environment: EnvironmentMode, bypass: bool) -> Self {
        Self {
            api_key: api_key.into(),
            environment,
            bypass,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.environment.clone(),
            config.auth_bypass_enabled,
        )
    }

    /// Development mode with the bypass flag set.
    pub fn bypass_active(&self) -> bool {
        self.environment.is_development() && self.bypass
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<AuthGrant, AuthRejection> {
        if self.bypass_active() {
            return Ok(AuthGrant::DevBypass);
        }

        let presented = match presented {
            Some(key) if !key.is_empty() => key,
            _ => return Err(AuthRejection::Missing),
        };

        if bool::from(presented.as_bytes().ct_eq(self.api_key.as_bytes())) {
            Ok(AuthGrant::Key)
        } else {
            Err(AuthRejection::Invalid)
        }
    }
}
