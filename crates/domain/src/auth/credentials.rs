//! Login and registration payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a user proves who they are when logging in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    /// Email, phone or username plus password.
    Password {
        /// Email, phone number or username.
        identifier: String,
        /// Account password.
        password: String,
    },
    /// One-time code delivered by SMS.
    PhoneCode {
        /// Phone number the code was sent to.
        phone: String,
        /// The verification code.
        code: String,
    },
    /// One-time code delivered by email.
    EmailCode {
        /// Email address the code was sent to.
        email: String,
        /// The verification code.
        code: String,
    },
}

impl Credentials {
    /// Creates password credentials.
    #[must_use]
    pub fn password(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            identifier: identifier.into(),
            password: password.into(),
        }
    }

    /// Creates SMS-code credentials.
    #[must_use]
    pub fn phone_code(phone: impl Into<String>, code: impl Into<String>) -> Self {
        Self::PhoneCode {
            phone: phone.into(),
            code: code.into(),
        }
    }

    /// Creates email-code credentials.
    #[must_use]
    pub fn email_code(email: impl Into<String>, code: impl Into<String>) -> Self {
        Self::EmailCode {
            email: email.into(),
            code: code.into(),
        }
    }

    /// The non-secret half of the credentials, safe to log.
    #[must_use]
    pub fn principal(&self) -> &str {
        match self {
            Self::Password { identifier, .. } => identifier,
            Self::PhoneCode { phone, .. } => phone,
            Self::EmailCode { email, .. } => email,
        }
    }

    /// Which login method these credentials use.
    #[must_use]
    pub const fn method(&self) -> AuthMethod {
        match self {
            Self::Password { .. } => AuthMethod::Password,
            Self::PhoneCode { .. } => AuthMethod::PhoneCode,
            Self::EmailCode { .. } => AuthMethod::EmailCode,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("method", &self.method())
            .field("principal", &self.principal())
            .finish_non_exhaustive()
    }
}

/// Details for creating a new account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Registration {
    /// Password account with at least one contact identifier.
    Password {
        /// Contact email.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        /// Contact phone.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phone: Option<String>,
        /// Login name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        /// Account password.
        password: String,
    },
    /// Account verified by an SMS code.
    PhoneCode {
        /// Phone number the code was sent to.
        phone: String,
        /// The verification code.
        code: String,
    },
    /// Account verified by an email code.
    EmailCode {
        /// Email address the code was sent to.
        email: String,
        /// The verification code.
        code: String,
    },
}

impl Registration {
    /// Creates a password registration keyed by email.
    #[must_use]
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            email: Some(email.into()),
            phone: None,
            username: None,
            password: password.into(),
        }
    }

    /// Which registration method this uses.
    #[must_use]
    pub const fn method(&self) -> AuthMethod {
        match self {
            Self::Password { .. } => AuthMethod::Password,
            Self::PhoneCode { .. } => AuthMethod::PhoneCode,
            Self::EmailCode { .. } => AuthMethod::EmailCode,
        }
    }

    /// The first contact identifier present, safe to log.
    #[must_use]
    pub fn principal(&self) -> &str {
        match self {
            Self::Password {
                email,
                phone,
                username,
                ..
            } => email
                .as_deref()
                .or(phone.as_deref())
                .or(username.as_deref())
                .unwrap_or(""),
            Self::PhoneCode { phone, .. } => phone,
            Self::EmailCode { email, .. } => email,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("method", &self.method())
            .field("principal", &self.principal())
            .finish_non_exhaustive()
    }
}

/// Verification method behind a login or registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Password based.
    Password,
    /// SMS one-time code.
    PhoneCode,
    /// Email one-time code.
    EmailCode,
}

/// Where a one-time verification code is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeChannel {
    /// Text message to a phone number.
    Sms,
    /// Message to an email address.
    Email,
}

impl CodeChannel {
    /// The code-based login method this channel feeds.
    #[must_use]
    pub const fn method(self) -> AuthMethod {
        match self {
            Self::Sms => AuthMethod::PhoneCode,
            Self::Email => AuthMethod::EmailCode,
        }
    }
}

/// What a verification code will be used for.
///
/// Registration codes are only sent to contacts that have no account yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    /// Login and other checks on an existing account.
    #[default]
    General,
    /// Creating a new account.
    Register,
}

/// A request to the token service's authenticate operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    /// Sign in to an existing account.
    Login(Credentials),
    /// Create an account and sign in.
    Register(Registration),
}

impl AuthRequest {
    /// The verification method used.
    #[must_use]
    pub const fn method(&self) -> AuthMethod {
        match self {
            Self::Login(c) => c.method(),
            Self::Register(r) => r.method(),
        }
    }

    /// Returns true for registrations.
    #[must_use]
    pub const fn is_registration(&self) -> bool {
        matches!(self, Self::Register(_))
    }
}
