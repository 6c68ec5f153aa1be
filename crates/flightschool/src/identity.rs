//! Who is acting.
//!
//! The scheduling core trusts the student and instructor ids it is given and
//! never asks who the caller is. Front ends use an [`IdentityProvider`] to
//! fill those ids in for the signed-in user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What a user is allowed to do in the school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Books lessons.
    Student,
    /// Publishes availability and confirms lessons.
    Instructor,
    /// Manages the school.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Instructor => write!(f, "instructor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            "admin" => Ok(Self::Admin),
            other => Err(Error::validation(
                "role",
                format!("expected student, instructor or admin, got '{other}'"),
            )),
        }
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User identifier, used as student or instructor id.
    pub id: String,
    /// The user's role.
    pub role: Role,
}

/// Supplies the signed-in user, if any.
pub trait IdentityProvider {
    /// The current user, or `None` when nobody is signed in.
    fn current_user(&self) -> Option<CurrentUser>;

    /// The current user's id when they hold `role`.
    fn id_as(&self, role: Role) -> Option<String> {
        self.current_user()
            .filter(|user| user.role == role)
            .map(|user| user.id)
    }
}

/// A fixed identity, typically read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    user: Option<CurrentUser>,
}

impl StaticIdentity {
    /// An identity that always reports `user`.
    #[must_use]
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self { user }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("Instructor".parse::<Role>().unwrap(), Role::Instructor);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert!("pilot".parse::<Role>().is_err());
    }

    #[test]
    fn test_id_as_matches_role() {
        let identity = StaticIdentity::new(Some(CurrentUser {
            id: "S1".to_string(),
            role: Role::Student,
        }));
        assert_eq!(identity.id_as(Role::Student).as_deref(), Some("S1"));
        assert_eq!(identity.id_as(Role::Instructor), None);
    }

    #[test]
    fn test_anonymous() {
        let identity = StaticIdentity::default();
        assert!(identity.current_user().is_none());
        assert!(identity.id_as(Role::Student).is_none());
    }
}
