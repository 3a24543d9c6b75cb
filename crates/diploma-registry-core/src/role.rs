//! Roles resolved for wallet addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The role an address acts under.
///
/// Addresses without an explicit role are students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    StudentService,
    #[default]
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::StudentService, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::StudentService => "STUDENT_SERVICE",
            Role::Student => "STUDENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("STUDENT_SERVICE".parse::<Role>(), Ok(Role::StudentService));
        assert_eq!("STUDENT".parse::<Role>(), Ok(Role::Student));
        assert_eq!(
            "admin".parse::<Role>(),
            Err(ValidationError::UnknownRole("admin".into()))
        );
    }

    #[test]
    fn test_role_serde_names() {
        let json = serde_json::to_string(&Role::StudentService).unwrap();
        assert_eq!(json, "\"STUDENT_SERVICE\"");
        assert_eq!(Role::default(), Role::Student);
    }
}
