//! Local-only login stub. No credentials are checked anywhere.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::diagnostics;
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// The persisted identity. Only exists when token, role and email are all
/// stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub token: String,
    pub role: Role,
    pub email: String,
}

/// Session persistence over the same medium as the data store.
#[derive(Clone)]
pub struct AuthStub {
    medium: Arc<dyn KeyValueStore>,
}

impl AuthStub {
    pub fn new(medium: Arc<dyn KeyValueStore>) -> Self {
        Self { medium }
    }

    /// Fabricate a token and persist the session. The password is ignored.
    pub fn login(&self, email: &str, _password: &str, role: Role) -> LoginResponse {
        let millis = Utc::now().timestamp_millis();
        let token = format!("mock_token_{}_{}", role, millis);

        self.store(keys::AUTH_TOKEN, &token);
        self.store(keys::USER_ROLE, role.as_str());
        self.store(keys::USER_EMAIL, email);
        info!(email, role = %role, "logged in");

        LoginResponse {
            token,
            user: LoginUser {
                id: format!("user_{}", millis),
                email: email.to_string(),
                role,
            },
        }
    }

    pub fn logout(&self) {
        for key in [keys::AUTH_TOKEN, keys::USER_ROLE, keys::USER_EMAIL] {
            if let Err(e) = self.medium.remove_item(key) {
                diagnostics::storage_degraded("remove", key, &e);
            }
        }
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        let token = self.load(keys::AUTH_TOKEN)?;
        let role = self.load(keys::USER_ROLE)?;
        let email = self.load(keys::USER_EMAIL)?;

        Some(CurrentUser {
            token,
            role: Role::parse(&role)?,
            email,
        })
    }

    /// The bearer token for backend calls, if any.
    pub fn token(&self) -> Option<String> {
        self.load(keys::AUTH_TOKEN)
    }

    fn store(&self, key: &str, value: &str) {
        if let Err(e) = self.medium.set_item(key, value) {
            diagnostics::storage_degraded("write", key, &e);
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.medium.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                diagnostics::storage_degraded("read", key, &e);
                None
            }
        }
    }
}
