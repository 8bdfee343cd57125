//! User Service
//!
//! Registration: a user and their wallet are created together or not at all.
//! Login: email and password exchanged for a session token.

use crate::auth::{self, TokenIssuer};
use crate::domain::{User, UserType, Wallet};
use crate::error::{AppError, AppResult};
use crate::store::{RepositoryError, Session};
use crate::validation::{self, FieldRules, Rule, ValidationErrors};

use super::{Unit, WalletService};

/// Validation applied to [`Registration`]
pub const REGISTRATION_RULES: &[FieldRules] = &[
    ("name", &[Rule::Required, Rule::Max(255)]),
    (
        "email",
        &[Rule::Required, Rule::Email, Rule::Max(255), Rule::Unique("email")],
    ),
    (
        "password",
        &[
            Rule::Required,
            Rule::Min(8),
            Rule::Max(255),
            Rule::Confirmed("password_confirmation"),
        ],
    ),
    ("type", &[Rule::Required, Rule::OneOf(UserType::NAMES)]),
];

/// Raw registration input; every field is checked before use
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub user_type: Option<String>,
}

impl Registration {
    fn field(&self, field: &str) -> Option<&str> {
        match field {
            "name" => self.name.as_deref(),
            "email" => self.email.as_deref(),
            "password" => self.password.as_deref(),
            "password_confirmation" => self.password_confirmation.as_deref(),
            "type" => self.user_type.as_deref(),
            _ => None,
        }
    }
}

fn email_in_use() -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("email", "This email is already in use.");
    AppError::Validation(errors)
}

pub struct UserService<'a, S: Session + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: Session + ?Sized> UserService<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self { session }
    }

    /// Validate and store a new user together with their empty wallet.
    ///
    /// # Errors
    /// - `Validation` with per-field messages, including an email taken
    ///   by a concurrent registration
    /// - anything `WalletService::create_wallet_for_user` raises (unit rolled back)
    pub async fn register(&mut self, registration: &Registration) -> AppResult<(User, Wallet)> {
        let email = registration
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        let email_taken = match email {
            Some(email) => self.session.users().find_by_email(email).await?.is_some(),
            None => false,
        };

        validation::validate(
            REGISTRATION_RULES,
            |field| registration.field(field),
            |column, _| column == "email" && email_taken,
        )?;

        // validated above: all present and the type is a known name
        let user_type: UserType = registration
            .user_type
            .as_deref()
            .unwrap_or_default()
            .trim()
            .parse()
            .map_err(AppError::InvalidRequest)?;
        let password_hash =
            auth::hash_password(registration.password.as_deref().unwrap_or_default()).await?;
        let user = User::create(
            registration.name.as_deref().unwrap_or_default().trim(),
            email.unwrap_or_default(),
            password_hash,
            user_type,
        );

        let unit = Unit::enter(&mut *self.session).await?;
        let result = self.create_with_wallet(&user).await;
        let (user, wallet) = unit.finish(&mut *self.session, result).await?;

        tracing::info!(
            user_id = user.id(),
            wallet_id = %wallet.id(),
            user_type = %user.user_type(),
            "User registered"
        );

        Ok((user, wallet))
    }

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or a wrong password
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        tokens: &TokenIssuer,
    ) -> AppResult<String> {
        let user = self
            .session
            .users()
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !auth::verify_password(password, user.password_hash()).await {
            tracing::warn!(user_id = user.id(), "Login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let token = tokens.issue(&user)?;
        tracing::info!(user_id = user.id(), "User logged in");

        Ok(token)
    }

    async fn create_with_wallet(&mut self, user: &User) -> AppResult<(User, Wallet)> {
        // the email check above runs before the unit; a racing registration
        // can still win the unique index
        let user = match self.session.users().save(user).await {
            Err(RepositoryError::Conflict(_)) => return Err(email_in_use()),
            saved => saved?,
        };
        let wallet = WalletService::new(&mut *self.session)
            .create_wallet_for_user(user.id())
            .await?;
        Ok((user, wallet))
    }
}
