//! Sessions and the administrator allow-list
//!
//! A session is the only authorization signal: either anonymous or bound
//! to an identity resolved by the auth provider. Write access is granted
//! when the identity's email exactly matches an allow-listed address.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    /// Credential forwarded to the backend on writes.
    #[serde(skip)]
    pub id_token: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>, id_token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            id_token: id_token.into(),
        }
    }
}

/// The current caller: anonymous or authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.email.as_deref())
    }

    pub fn id_token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id_token.as_str())
    }
}

/// Emails allowed to write to the feed. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList {
    emails: BTreeSet<String>,
}

impl AdminList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, ignoring blank entries.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn is_admin(&self, session: &Session) -> bool {
        session.email().is_some_and(|email| self.contains(email))
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }
}
