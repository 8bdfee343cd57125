//! User entity
//!
//! Owner of a wallet. Only the argon2 hash of the password is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::now;

/// Kind of account holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserType {
    Common,
    Shopkeeper,
}

impl UserType {
    pub const NAMES: &'static [&'static str] = &["COMMON", "SHOPKEEPER"];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Common => "COMMON",
            UserType::Shopkeeper => "SHOPKEEPER",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMMON" => Ok(UserType::Common),
            "SHOPKEEPER" => Ok(UserType::Shopkeeper),
            other => Err(format!("unknown user type '{}'", other)),
        }
    }
}

/// User entity
///
/// `id == 0` means the user has not been stored yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: i64,
    name: String,
    email: String,
    #[serde(skip_serializing)]
    password_hash: String,
    user_type: UserType,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn create(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        user_type: UserType,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            user_type,
            created_at: now(),
        }
    }

    pub fn reconstitute(
        id: i64,
        name: String,
        email: String,
        password_hash: String,
        user_type: UserType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            password_hash,
            user_type,
            created_at,
        }
    }

    /// Same user with the store-assigned id
    pub fn with_id(&self, id: i64) -> Self {
        Self { id, ..self.clone() }
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn user_type(&self) -> UserType {
        self.user_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_new_until_stored() {
        let user = User::create("Alice", "alice@example.com", "$argon2id$hash", UserType::Common);
        assert!(user.is_new());

        let stored = user.with_id(7);
        assert!(!stored.is_new());
        assert_eq!(stored.id(), 7);
        assert_eq!(stored.email(), "alice@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::create("Alice", "alice@example.com", "$argon2id$hash", UserType::Common);
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(user.password_hash(), "$argon2id$hash");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "alice@example.com");
    }

    #[test]
    fn test_user_type_parse() {
        assert_eq!("SHOPKEEPER".parse::<UserType>().unwrap(), UserType::Shopkeeper);
        assert!("ADMIN".parse::<UserType>().is_err());
        for name in UserType::NAMES {
            assert_eq!(name.parse::<UserType>().unwrap().as_str(), *name);
        }
    }
}
