//! Invoice payments through an external processor.
//!
//! The processor only issues client secrets. The front end confirms the
//! payment with the provider and reports the outcome back, which is the only
//! way an invoice becomes `paid`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Invoice, InvoiceStatus};
use crate::repo::Repository;
use crate::store::server_timestamp;

#[derive(Debug)]
pub enum PaymentError {
    Request(String),
    Declined(String),
    InvalidResponse(String),
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::Request(msg) => write!(f, "Payment request failed: {msg}"),
            PaymentError::Declined(msg) => write!(f, "Payment declined: {msg}"),
            PaymentError::InvalidResponse(msg) => write!(f, "Invalid payment response: {msg}"),
        }
    }
}

impl std::error::Error for PaymentError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_intent(&self, amount: f64) -> Result<PaymentIntent, PaymentError>;
}

/// Talks to a payment backend exposing `POST /create-payment-intent`.
pub struct HttpPaymentProcessor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentProcessor {
    pub fn new(base_url: &str) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn create_intent(&self, amount: f64) -> Result<PaymentIntent, PaymentError> {
        let url = format!("{}/create-payment-intent", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(512)
                .collect::<String>();
            return Err(if status.is_client_error() {
                PaymentError::Declined(body)
            } else {
                PaymentError::Request(format!("{status}: {body}"))
            });
        }

        resp.json::<PaymentIntent>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

/// Confirmation result reported by the front end.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PaymentOutcome {
    Succeeded {
        #[serde(rename = "paymentIntentId", default)]
        payment_intent_id: Option<String>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub paid_at: String,
    pub created_at: String,
}

/// One lock per invoice, held while a payment outcome is applied.
#[derive(Default)]
pub struct Settlements {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Settlements {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock(&self, invoice_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(invoice_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

async fn payable_invoice(repo: &Repository<Invoice>, invoice_id: &str) -> Result<Invoice, AppError> {
    let invoice = repo
        .get(invoice_id)
        .await
        .ok_or_else(|| AppError::NotFound("Invoice not found".to_string()))?;
    if invoice.status == InvoiceStatus::Paid {
        return Err(AppError::BadRequest("Invoice is already paid".to_string()));
    }
    Ok(invoice)
}

/// Ask the processor for a client secret covering the invoice amount.
pub async fn start_payment(
    processor: &dyn PaymentProcessor,
    repo: &Repository<Invoice>,
    invoice_id: &str,
) -> Result<PaymentIntent, AppError> {
    let invoice = payable_invoice(repo, invoice_id).await?;
    let intent = processor.create_intent(invoice.amount).await?;
    tracing::info!("Payment intent created for invoice {invoice_id}");
    Ok(intent)
}

/// Apply a reported payment outcome. Success marks the invoice paid; failure
/// leaves it untouched.
pub async fn settle_invoice(
    settlements: &Settlements,
    repo: &Repository<Invoice>,
    invoice_id: &str,
    outcome: PaymentOutcome,
) -> Result<(Invoice, Payment), AppError> {
    let _guard = settlements.lock(invoice_id).await;
    let mut invoice = payable_invoice(repo, invoice_id).await?;

    let transaction_id = match outcome {
        PaymentOutcome::Failed { message } => {
            tracing::warn!("Payment for invoice {invoice_id} failed: {message}");
            return Err(AppError::PaymentFailed(message));
        }
        PaymentOutcome::Succeeded { payment_intent_id } => payment_intent_id,
    };

    repo.write_status(invoice_id, &InvoiceStatus::Paid).await;
    invoice.status = InvoiceStatus::Paid;

    let now = server_timestamp(Utc::now());
    let payment = Payment {
        id: Uuid::now_v7().to_string(),
        invoice_id: invoice_id.to_string(),
        amount: invoice.amount,
        currency: "usd".to_string(),
        status: PaymentStatus::Completed,
        method: "stripe".to_string(),
        transaction_id,
        paid_at: now.clone(),
        created_at: now,
    };

    tracing::info!("Invoice {invoice_id} paid ({})", invoice.amount);
    Ok((invoice, payment))
}
