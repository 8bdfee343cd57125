//! API Routes
//!
//! HTTP endpoint definitions.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Money, Transaction, TransactionStatus, TransactionType, Wallet};
use crate::error::AppError;
use crate::services::{Registration, TransactionService, UserService, WalletService};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirmation: Option<String>,
    #[serde(default, rename = "type")]
    pub user_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: i64,
    pub wallet_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

/// Body of deposit and withdraw
#[derive(Debug, Default, Deserialize)]
pub struct AmountRequest {
    /// JSON number or numeric string, in major units
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub from_wallet_id: Option<String>,
    #[serde(default)]
    pub to_wallet_id: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse<T> {
    pub message: &'static str,
    pub data: T,
}

/// Wallet balance as shown to clients
#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub amount: f64,
    pub formatted: String,
    pub cents: i64,
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub id: String,
    pub user_id: i64,
    pub balance: BalanceView,
    pub created_at: String,
    pub updated_at: String,
}

/// Transaction amount as shown to clients
#[derive(Debug, Serialize)]
pub struct MoneyView {
    pub cents: i64,
    pub formatted: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub from_wallet_id: Option<String>,
    pub to_wallet_id: Option<String>,
    pub amount: MoneyView,
    pub description: String,
    pub status: TransactionStatus,
    pub created_at: String,
    pub updated_at: String,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        let balance = wallet.balance();
        Self {
            id: wallet.id().to_string(),
            user_id: wallet.user_id(),
            balance: BalanceView {
                amount: balance.to_float(),
                formatted: balance.format(),
                cents: balance.to_cents(),
            },
            created_at: timestamp(wallet.created_at()),
            updated_at: timestamp(wallet.updated_at()),
        }
    }
}

impl From<&Transaction> for TransactionView {
    fn from(transaction: &Transaction) -> Self {
        let amount = transaction.amount();
        Self {
            id: transaction.id().to_string(),
            transaction_type: transaction.transaction_type(),
            from_wallet_id: transaction.from_wallet_id().map(String::from),
            to_wallet_id: transaction.to_wallet_id().map(String::from),
            amount: MoneyView {
                cents: amount.to_cents(),
                formatted: amount.format(),
                value: amount.to_float(),
            },
            description: transaction.description().to_string(),
            status: transaction.status(),
            created_at: timestamp(transaction.created_at()),
            updated_at: timestamp(transaction.updated_at()),
        }
    }
}

/// Exact parse of a client amount into cents.
///
/// Accepts JSON numbers and numeric strings; rounding and the sign check
/// happen in [`Money::from_decimal`].
pub fn parse_amount(value: Option<&serde_json::Value>) -> Result<Money, AppError> {
    let text = match value {
        Some(serde_json::Value::Number(number)) => number.to_string(),
        Some(serde_json::Value::String(text)) => text.trim().to_string(),
        Some(_) => return Err(AppError::InvalidRequest("amount must be numeric".to_string())),
        None => return Err(AppError::InvalidRequest("amount is required".to_string())),
    };

    let decimal = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| AppError::InvalidRequest(format!("amount must be numeric: {}", text)))?;

    Ok(Money::from_decimal(decimal)?)
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest(format!("{} is required", field)))
}

fn description_or(description: Option<String>, default: &str) -> String {
    description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

// =========================================================================
// Router
// =========================================================================

/// Routes mounted under `/api/v1`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/wallets", get(list_wallets))
        .route("/wallets/:wallet_id", get(get_wallet))
        .route("/transactions/deposit/:wallet_id", post(deposit))
        .route("/transactions/withdraw/:wallet_id", post(withdraw))
        .route("/transactions/transfer", post(transfer))
        .route("/transactions/:transaction_id", get(get_transaction))
}

// =========================================================================
// Users
// =========================================================================

/// Register a user and open their wallet
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let registration = Registration {
        name: request.name,
        email: request.email,
        password: request.password,
        password_confirmation: request.password_confirmation,
        user_type: request.user_type,
    };

    let mut session = state.store.session();
    let (user, wallet) = UserService::new(session.as_mut())
        .register(&registration)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully.",
            user_id: user.id(),
            wallet_id: wallet.id().to_string(),
        }),
    ))
}

/// Exchange email and password for a session token
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let mut session = state.store.session();
    let token = UserService::new(session.as_mut())
        .login(&email, &password, &state.tokens)
        .await?;

    Ok(Json(LoginResponse {
        message: "User logged in successfully.",
        token,
    }))
}

// =========================================================================
// Wallets
// =========================================================================

async fn list_wallets(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<WalletView>>>, AppError> {
    let mut session = state.store.session();
    let wallets = WalletService::new(session.as_mut()).find_all().await?;

    Ok(Json(DataResponse {
        data: wallets.iter().map(WalletView::from).collect(),
    }))
}

async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<DataResponse<WalletView>>, AppError> {
    let mut session = state.store.session();
    let wallet = WalletService::new(session.as_mut())
        .find_by_id(&wallet_id)
        .await?
        .ok_or(AppError::ResourceNotFound("Wallet"))?;

    Ok(Json(DataResponse {
        data: WalletView::from(&wallet),
    }))
}

// =========================================================================
// Transactions
// =========================================================================

async fn deposit(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<TransactionView>>), AppError> {
    let amount = parse_amount(request.amount.as_ref())?;
    let description = description_or(request.description, "Deposit");

    let mut session = state.store.session();
    let transaction = TransactionService::new(session.as_mut())
        .deposit(&wallet_id, amount, &description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Deposit completed successfully.",
            data: TransactionView::from(&transaction),
        }),
    ))
}

async fn withdraw(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<TransactionView>>), AppError> {
    let amount = parse_amount(request.amount.as_ref())?;
    let description = description_or(request.description, "Withdrawal");

    let mut session = state.store.session();
    let transaction = TransactionService::new(session.as_mut())
        .withdraw(&wallet_id, amount, &description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Withdrawal completed successfully.",
            data: TransactionView::from(&transaction),
        }),
    ))
}

async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<CreatedResponse<TransactionView>>), AppError> {
    let from_wallet_id = required(request.from_wallet_id, "from_wallet_id")?;
    let to_wallet_id = required(request.to_wallet_id, "to_wallet_id")?;
    let amount = parse_amount(request.amount.as_ref())?;
    let description = description_or(request.description, "Transfer");

    let mut session = state.store.session();
    let transaction = TransactionService::new(session.as_mut())
        .transfer(&from_wallet_id, &to_wallet_id, amount, &description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Transfer completed successfully.",
            data: TransactionView::from(&transaction),
        }),
    ))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<DataResponse<TransactionView>>, AppError> {
    let mut session = state.store.session();
    let transaction = TransactionService::new(session.as_mut())
        .find_by_id(&transaction_id)
        .await?
        .ok_or(AppError::ResourceNotFound("Transaction"))?;

    Ok(Json(DataResponse {
        data: TransactionView::from(&transaction),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use serde_json::json;

    fn cents_of(value: serde_json::Value) -> i64 {
        parse_amount(Some(&value)).unwrap().to_cents()
    }

    #[test]
    fn test_parse_amount_numbers_and_strings() {
        assert_eq!(cents_of(json!(100)), 10_000);
        assert_eq!(cents_of(json!(100.5)), 10_050);
        assert_eq!(cents_of(json!("25.99")), 2_599);
        assert_eq!(cents_of(json!(" 7 ")), 700);
        assert_eq!(cents_of(json!("1e2")), 10_000);
    }

    #[test]
    fn test_parse_amount_rounds_half_away_from_zero() {
        assert_eq!(cents_of(json!("10.555")), 1_056);
        assert_eq!(cents_of(json!("0.004")), 0);
    }

    #[test]
    fn test_parse_amount_rejects_non_numeric() {
        for value in [json!("abc"), json!(true), json!([1]), json!("")] {
            assert!(matches!(
                parse_amount(Some(&value)),
                Err(AppError::InvalidRequest(_))
            ));
        }
        assert!(matches!(parse_amount(None), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_amount_negative_is_invalid_amount() {
        assert!(matches!(
            parse_amount(Some(&json!(-100))),
            Err(AppError::Domain(DomainError::InvalidAmount(_)))
        ));
    }

    #[test]
    fn test_parse_amount_top_of_range_is_invalid_amount() {
        for value in [
            json!("79228162514264337593543950335"),
            json!("92233720368547758.08"),
            json!(9.3e16),
        ] {
            assert!(matches!(
                parse_amount(Some(&value)),
                Err(AppError::Domain(DomainError::InvalidAmount(_)))
            ));
        }
        assert_eq!(cents_of(json!("92233720368547758.07")), i64::MAX);
    }

    #[test]
    fn test_register_request_reads_type_field() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"name":"Ana","email":"ana@example.com","password":"password123",
                "password_confirmation":"password123","type":"COMMON"}"#,
        )
        .unwrap();

        assert_eq!(request.user_type.as_deref(), Some("COMMON"));
        assert_eq!(request.password_confirmation.as_deref(), Some("password123"));
    }

    #[test]
    fn test_wallet_view() {
        let wallet = Wallet::create(3).deposit(&Money::from_cents(123_456).unwrap());
        let view = serde_json::to_value(WalletView::from(&wallet)).unwrap();

        assert_eq!(view["user_id"], 3);
        assert_eq!(view["balance"]["cents"], 123_456);
        assert_eq!(view["balance"]["amount"], 1234.56);
        assert_eq!(view["balance"]["formatted"], "R$ 1.234,56");
        assert!(view["created_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_transaction_view() {
        let transaction =
            Transaction::create_deposit("w-1", Money::from_cents(5_000).unwrap(), "Deposit").unwrap();
        let view = serde_json::to_value(TransactionView::from(&transaction)).unwrap();

        assert_eq!(view["type"], "DEPOSIT");
        assert_eq!(view["status"], "COMPLETED");
        assert_eq!(view["from_wallet_id"], serde_json::Value::Null);
        assert_eq!(view["to_wallet_id"], "w-1");
        assert_eq!(view["amount"]["cents"], 5_000);
        assert_eq!(view["amount"]["value"], 50.0);
        assert_eq!(view["amount"]["formatted"], "R$ 50,00");
    }

    #[test]
    fn test_description_defaults() {
        assert_eq!(description_or(None, "Deposit"), "Deposit");
        assert_eq!(description_or(Some("  ".into()), "Transfer"), "Transfer");
        assert_eq!(description_or(Some("Rent".into()), "Transfer"), "Rent");
    }
}
