use axum::{
    extract::{Extension, Json},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::{error, info};

use crate::bank::{BankError, NewCustomerRequest, ProfileFields, SagaReceipt, TransferOrder};
use crate::error::PortalError;
use crate::startup::AppState;

/// Session key holding the profile fields returned by the banking service.
pub const PROFILE_KEY: &str = "profile";

// Saga receipt of the most recent account action, surfaced once on the next
// dashboard load.
const SAGA_ID_KEY: &str = "new_bank_saga_id";
const SAGA_REASON_KEY: &str = "new_bank_reason";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NewAccountRequest {
    pub account_type: String,
    pub sub_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account: String,
    pub to_account: String,
    pub amount: String,
    pub password: String,
}

pub(crate) async fn load_profile(session: &Session) -> Result<Option<ProfileFields>, PortalError> {
    Ok(session.get::<ProfileFields>(PROFILE_KEY).await?)
}

async fn require_profile(session: &Session) -> Result<ProfileFields, PortalError> {
    load_profile(session).await?.ok_or(PortalError::NotLoggedIn)
}

pub(crate) fn profile_str(profile: &ProfileFields, key: &str) -> Option<String> {
    profile.get(key).and_then(Value::as_str).map(str::to_owned)
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, PortalError> {
    let fields = app_state
        .bank
        .login(&request.username, &request.password)
        .await
        .map_err(|e| match e {
            BankError::Refused(_) | BankError::Unexpected(_) => PortalError::LoginFailed,
            other => {
                error!("login call failed: {other}");
                PortalError::Bank(other)
            }
        })?;

    session.insert(PROFILE_KEY, &fields).await?;
    if let Some(ucid) = profile_str(&fields, "ucid") {
        info!("user {ucid} logged in");
    }
    Ok(Json(fields))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, PortalError> {
    session.flush().await?;
    Ok(Json(json!({ "status": "logged out" })))
}

pub async fn dashboard(session: Session) -> Result<impl IntoResponse, PortalError> {
    let profile = require_profile(&session).await?;
    let saga_id = session.remove_value(SAGA_ID_KEY).await?;
    let reason = session.remove_value(SAGA_REASON_KEY).await?;

    Ok(Json(json!({
        "user_data": profile,
        "saga_id": saga_id,
        "reason": reason,
    })))
}

pub async fn refresh_dashboard(
    Extension(app_state): Extension<AppState>,
    session: Session,
) -> Result<impl IntoResponse, PortalError> {
    let profile = require_profile(&session).await?;
    let ucid = profile_str(&profile, "ucid").ok_or(PortalError::CorruptSession)?;
    let ossn = profile_str(&profile, "ossn").ok_or(PortalError::CorruptSession)?;

    let fields = app_state.bank.refresh(&ucid, &ossn).await?;
    session.insert(PROFILE_KEY, &fields).await?;
    Ok(Json(fields))
}

pub async fn create_new_account(
    Extension(app_state): Extension<AppState>,
    Json(request): Json<NewCustomerRequest>,
) -> Result<impl IntoResponse, PortalError> {
    let login_id = app_state.bank.new_customer(&request).await?;
    info!("new customer registered with login id {login_id}");
    Ok(Json(json!({ "login_id": login_id })))
}

pub async fn create_bank_account(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(request): Json<NewAccountRequest>,
) -> Result<impl IntoResponse, PortalError> {
    let profile = require_profile(&session).await?;
    let ucid = profile_str(&profile, "ucid").ok_or(PortalError::CorruptSession)?;

    let receipt = match request.account_type.as_str() {
        "BANK_ACCOUNT" => {
            let sub_type = request.sub_type.ok_or(PortalError::InvalidRequest)?;
            app_state.bank.new_bank_account(&ucid, &sub_type).await?
        }
        "CREDIT_CARD" => app_state.bank.new_credit_card(&ucid).await?,
        _ => return Err(PortalError::InvalidRequest),
    };

    remember_receipt(&session, &receipt).await?;
    Ok(Json(json!({ "id": receipt.id, "reason": receipt.reason })))
}

pub async fn transfer(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, PortalError> {
    let profile = require_profile(&session).await?;
    let ucid = profile_str(&profile, "ucid").ok_or(PortalError::CorruptSession)?;

    let order = TransferOrder {
        ucid,
        to_account_number: request.to_account,
        from_account_number: request.from_account,
        amount: request.amount,
        password: request.password,
    };
    let receipt = app_state.bank.transfer(&order).await?;

    remember_receipt(&session, &receipt).await?;
    Ok(Json(json!({ "id": receipt.id, "reason": receipt.reason })))
}

pub async fn account_details(session: Session) -> Result<impl IntoResponse, PortalError> {
    let profile = require_profile(&session).await?;

    let mut details = serde_json::Map::new();
    for key in ["full_name", "email", "phone", "address", "ossn", "ucid"] {
        if let Some(value) = profile.get(key) {
            details.insert(key.to_string(), value.clone());
        }
    }
    Ok(Json(Value::Object(details)))
}

async fn remember_receipt(session: &Session, receipt: &SagaReceipt) -> Result<(), PortalError> {
    session.insert(SAGA_ID_KEY, &receipt.id).await?;
    session.insert(SAGA_REASON_KEY, &receipt.reason).await?;
    Ok(())
}
