//! The authenticated principal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The user a session belongs to.
///
/// Fields the backend sends beyond the ones modelled here are kept in
/// `attributes` so they survive a persist/restore cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Backend user id.
    pub id: String,
    /// Role name, e.g. `MERCHANT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Any other profile fields, preserved verbatim.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Identity {
    /// Creates an identity with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: None,
            email: None,
            phone: None,
            username: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Role comparison is case-insensitive; the backend is not consistent
    /// about `MERCHANT` versus `merchant`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(role))
    }

    /// Best human-readable label: username, then email, then phone, then id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .or(self.phone.as_deref())
            .unwrap_or(&self.id)
    }

    /// Merges the non-empty fields of `patch` into this identity.
    pub fn apply(&mut self, patch: IdentityPatch) {
        if let Some(email) = patch.email {
            self.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(username) = patch.username {
            self.username = Some(username);
        }
        self.attributes.extend(patch.attributes);
    }
}

/// Partial update to the current identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPatch {
    /// New email.
    #[serde(default)]
    pub email: Option<String>,
    /// New phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// New username.
    #[serde(default)]
    pub username: Option<String>,
    /// Extra profile fields to set.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl IdentityPatch {
    /// Builds a patch from a profile document.
    ///
    /// String `email`, `phone` and `username` fill the named fields. `id`
    /// and `role` are never taken from a profile; everything else lands in
    /// `attributes`.
    #[must_use]
    pub fn from_profile(mut profile: BTreeMap<String, serde_json::Value>) -> Self {
        let mut take = |key: &str| match profile.remove(key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };
        let email = take("email");
        let phone = take("phone");
        let username = take("username");
        profile.remove("id");
        profile.remove("role");
        Self {
            email,
            phone,
            username,
            attributes: profile,
        }
    }
}
