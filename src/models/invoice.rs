use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient, lenient_string, to_field};
use crate::error::AppError;
use crate::repo::{CreateContext, Entity};
use crate::store::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub employee_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub employee_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub owner_id: String,
    #[serde(deserialize_with = "lenient")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient")]
    pub status: InvoiceStatus,
    #[serde(deserialize_with = "lenient_string")]
    pub due_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub invoice_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    pub employee_id: String,
    #[serde(default)]
    pub employee_name: String,
    pub amount: f64,
    #[serde(default)]
    pub due_date: String,
    pub invoice_number: String,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

impl InvoiceInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AppError::BadRequest(
                "Amount must be a non-negative number".to_string(),
            ));
        }
        if self.status == Some(InvoiceStatus::Paid) {
            return Err(AppError::BadRequest(
                "Invoices can only be marked paid by a completed payment".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

impl Entity for Invoice {
    const COLLECTION: &'static str = "invoices";
    const CACHE_KEY: &'static str = "shifter_invoices";

    type Input = InvoiceInput;
    type Patch = InvoicePatch;
    type Status = InvoiceStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn new_fields(input: InvoiceInput, _ctx: &CreateContext) -> Fields {
        let mut fields = Fields::new();
        fields.insert("employeeId".into(), Value::String(input.employee_id));
        fields.insert("employeeName".into(), Value::String(input.employee_name));
        fields.insert("amount".into(), to_field(&input.amount));
        fields.insert("status".into(), to_field(&input.status.unwrap_or_default()));
        fields.insert("dueDate".into(), Value::String(input.due_date));
        fields.insert("invoiceNumber".into(), Value::String(input.invoice_number));
        fields
    }

    fn validate_status(status: &InvoiceStatus) -> Result<(), AppError> {
        if *status == InvoiceStatus::Paid {
            return Err(AppError::BadRequest(
                "Invoices can only be marked paid by a completed payment".to_string(),
            ));
        }
        Ok(())
    }
}
