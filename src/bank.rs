use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Profile fields returned by the banking service at login/refresh, keyed by
/// field name. List-valued fields (CHECKING, SAVING, CREDIT_CARD) stay as
/// JSON arrays.
pub type ProfileFields = Map<String, Value>;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("banking service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("banking service returned status {0}")]
    Unexpected(StatusCode),
    #[error("{0}")]
    Refused(String),
    #[error("malformed banking service payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct SagaReceipt {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewCustomerRequest {
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub ossn: String,
    pub password: String,
    pub bank: String,
}

#[derive(Debug, Serialize)]
pub struct TransferOrder {
    pub ucid: String,
    pub to_account_number: String,
    pub from_account_number: String,
    pub amount: String,
    pub password: String,
}

/// The service double-encodes its payloads: the envelope is JSON, and its
/// `data` field is itself an encoded JSON document.
#[derive(Deserialize)]
struct DataEnvelope {
    data: String,
}

#[derive(Deserialize)]
struct NotificationEnvelope {
    data: Option<String>,
}

#[derive(Deserialize)]
struct NewCustomerReply {
    login_id: String,
}

#[derive(Deserialize)]
struct RejectReply {
    reason: Option<String>,
}

/// HTTP client for the remote banking service. Cheap to clone; all requests
/// share one pooled connection with a bounded timeout so a stalled service
/// cannot stall a polling cycle.
#[derive(Clone)]
pub struct BankClient {
    http: reqwest::Client,
    base_url: String,
}

impl BankClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(BankClient { http, base_url })
    }

    pub async fn login(&self, id: &str, pwd: &str) -> Result<ProfileFields, BankError> {
        let response = self
            .http
            .post(self.url("login"))
            .json(&serde_json::json!({ "id": id, "pwd": pwd }))
            .send()
            .await?;
        let envelope: DataEnvelope = expect_accepted(response).await?.json().await?;
        Ok(serde_json::from_str(&envelope.data)?)
    }

    pub async fn refresh(&self, ucid: &str, ossn: &str) -> Result<ProfileFields, BankError> {
        let response = self
            .http
            .post(self.url("refresh"))
            .json(&serde_json::json!({ "ucid": ucid, "ossn": ossn }))
            .send()
            .await?;
        let envelope: DataEnvelope = expect_accepted(response).await?.json().await?;
        Ok(serde_json::from_str(&envelope.data)?)
    }

    /// Returns the login id assigned to the newly created customer.
    pub async fn new_customer(&self, request: &NewCustomerRequest) -> Result<String, BankError> {
        let response = self
            .http
            .post(self.url("newCustomer"))
            .json(request)
            .send()
            .await?;
        let reply: NewCustomerReply = expect_accepted(response).await?.json().await?;
        Ok(reply.login_id)
    }

    pub async fn new_bank_account(
        &self,
        ucid: &str,
        account_type: &str,
    ) -> Result<SagaReceipt, BankError> {
        self.open_account("newBankAccount", "NEW_BANK_ACCOUNT", ucid, account_type)
            .await
    }

    pub async fn new_credit_card(&self, ucid: &str) -> Result<SagaReceipt, BankError> {
        self.open_account("newCreditCard", "NEW_CREDIT_CARD", ucid, "CREDIT_CARD")
            .await
    }

    pub async fn transfer(&self, order: &TransferOrder) -> Result<SagaReceipt, BankError> {
        let response = self
            .http
            .post(self.url("transfer"))
            .json(order)
            .send()
            .await?;
        Ok(expect_accepted(response).await?.json().await?)
    }

    /// One poll of the notification endpoint. Returns the encoded event list
    /// from the envelope, or `None` when the service reports nothing.
    pub async fn notifications(&self) -> Result<Option<String>, BankError> {
        let response = self.http.get(self.url("notification")).send().await?;
        let envelope: NotificationEnvelope = expect_accepted(response).await?.json().await?;
        Ok(envelope.data)
    }

    async fn open_account(
        &self,
        endpoint: &str,
        operation_type: &str,
        ucid: &str,
        account_type: &str,
    ) -> Result<SagaReceipt, BankError> {
        let response = self
            .http
            .post(self.url(endpoint))
            .json(&serde_json::json!({
                "operation_type": operation_type,
                "ucid": ucid,
                "account_type": account_type,
            }))
            .send()
            .await?;
        Ok(expect_accepted(response).await?.json().await?)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url.trim_end_matches('/'))
    }
}

/// The service signals success with 202 Accepted. Anything else is a failure;
/// a `reason` field in the body becomes a `Refused` error the portal can show.
async fn expect_accepted(response: reqwest::Response) -> Result<reqwest::Response, BankError> {
    match response.status() {
        StatusCode::ACCEPTED => Ok(response),
        status => {
            let reason = response
                .json::<RejectReply>()
                .await
                .ok()
                .and_then(|reply| reply.reason);
            Err(match reason {
                Some(reason) => BankError::Refused(reason),
                None => BankError::Unexpected(status),
            })
        }
    }
}
