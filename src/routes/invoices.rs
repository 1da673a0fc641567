use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use super::{StatusBody, delete_in_scope, find_in_scope, owner_scope, validation};
use crate::auth::extractor::AuthUser;
use crate::auth::permissions::{Action, Resource};
use crate::error::AppError;
use crate::models::{Invoice, InvoiceInput, InvoiceStatus, UserRole};
use crate::notifications::{NewNotification, NotificationKind, Priority};
use crate::payments::{self, Payment, PaymentIntent, PaymentOutcome};
use crate::repo::Scope;
use crate::state::SharedState;

/// Employees see the invoices issued to them; everyone else what they own.
fn invoice_scope(auth: &AuthUser) -> Scope {
    if auth.role() == UserRole::Employee {
        Scope::by("employeeId", auth.id())
    } else {
        owner_scope(auth)
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    auth.require(Resource::Invoices, Action::Read)?;
    Ok(Json(state.repo::<Invoice>().list(&invoice_scope(&auth)).await))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<InvoiceInput>,
) -> Result<Json<Invoice>, AppError> {
    auth.require(Resource::Invoices, Action::Create)?;
    req.validate()?;
    validation::required(&req.employee_id, "Employee")?;
    validation::required(&req.invoice_number, "Invoice number")?;
    validation::optional_date(&req.due_date, "Due date")?;

    let invoice = state
        .repo::<Invoice>()
        .create(req, &Scope::by("ownerId", auth.id()))
        .await;
    tracing::info!("Invoice {} created by {}", invoice.id, auth.id());
    Ok(Json(invoice))
}

pub async fn set_status(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StatusBody<InvoiceStatus>>,
) -> Result<Json<Invoice>, AppError> {
    auth.require(Resource::Invoices, Action::Update)?;

    let repo = state.repo::<Invoice>();
    let mut invoice = find_in_scope(&repo, &id, &owner_scope(&auth)).await?;
    if invoice.status == InvoiceStatus::Paid {
        return Err(AppError::BadRequest(
            "Paid invoices cannot change status".to_string(),
        ));
    }
    repo.set_status(&id, &req.status).await?;
    invoice.status = req.status;
    Ok(Json(invoice))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_removal(Resource::Invoices)?;
    delete_in_scope(&state.repo::<Invoice>(), &id, &owner_scope(&auth)).await
}

pub async fn payment_intent(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentIntent>, AppError> {
    auth.require(Resource::Invoices, Action::Read)?;
    let processor = state
        .payments
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Payments are not configured".to_string()))?;

    let repo = state.repo::<Invoice>();
    find_in_scope(&repo, &id, &invoice_scope(&auth)).await?;

    let intent = payments::start_payment(processor.as_ref(), &repo, &id).await?;
    Ok(Json(intent))
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub invoice: Invoice,
    pub payment: Payment,
}

pub async fn payment(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(outcome): Json<PaymentOutcome>,
) -> Result<Json<PaymentResponse>, AppError> {
    auth.require(Resource::Invoices, Action::Read)?;

    let repo = state.repo::<Invoice>();
    find_in_scope(&repo, &id, &invoice_scope(&auth)).await?;

    let (invoice, payment) = payments::settle_invoice(&state.settlements, &repo, &id, outcome).await?;

    if !invoice.owner_id.is_empty() {
        state.notifications.add(
            &invoice.owner_id,
            NewNotification::new(
                NotificationKind::Payment,
                Priority::High,
                "Payment received",
                &format!(
                    "Invoice {} was paid ({:.2})",
                    invoice.invoice_number, invoice.amount
                ),
            )
            .metadata(serde_json::json!({ "invoiceId": invoice.id, "paymentId": payment.id })),
        );
    }

    Ok(Json(PaymentResponse { invoice, payment }))
}
