use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_no: String,
    pub student_id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
    pub status: String,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "UNPAID",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(InvoiceStatus::Unpaid),
            "PARTIALLY_PAID" => Some(InvoiceStatus::PartiallyPaid),
            "PAID" => Some(InvoiceStatus::Paid),
            "CANCELLED" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

/// Invoice numbers are derived server-side: INV-<year>-<zero-padded seq>.
pub fn invoice_number(year: i32, seq: i64) -> String {
    format!("INV-{}-{:05}", year, seq)
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub student_id: Option<Uuid>,
    pub category: Option<String>,
    /// Accepts a JSON number or a numeric string such as "123.45".
    pub amount: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug)]
pub struct NewInvoice {
    pub student_id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
    pub due_date: NaiveDate,
}

impl CreateInvoice {
    pub fn validate(self) -> Result<NewInvoice, ApiError> {
        let category = non_blank(self.category);

        let mut missing = Vec::new();
        if self.student_id.is_none() {
            missing.push("student_id");
        }
        if category.is_none() {
            missing.push("category");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.due_date.is_none() {
            missing.push("due_date");
        }

        let (Some(student_id), Some(category), Some(amount), Some(due_date)) =
            (self.student_id, category, self.amount, self.due_date)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        if amount < Decimal::ZERO {
            return Err(ApiError::bad_request("amount cannot be negative"));
        }
        let discount = self.discount.unwrap_or(Decimal::ZERO);
        if discount < Decimal::ZERO {
            return Err(ApiError::bad_request("discount cannot be negative"));
        }
        if discount > amount {
            return Err(ApiError::bad_request("discount cannot exceed amount"));
        }

        Ok(NewInvoice {
            student_id,
            category,
            amount,
            discount,
            final_amount: amount - discount,
            due_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoice {
    pub category: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl UpdateInvoice {
    pub fn parsed_status(&self) -> Result<Option<InvoiceStatus>, ApiError> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(s) => InvoiceStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid invoice status: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CreateInvoice {
        CreateInvoice {
            student_id: Some(Uuid::new_v4()),
            category: Some("TUITION".to_string()),
            amount: Some(Decimal::new(150000, 2)), // 1500.00
            discount: None,
            due_date: NaiveDate::from_ymd_opt(2026, 10, 1),
        }
    }

    #[test]
    fn test_final_amount_is_amount_minus_discount() {
        let payload = CreateInvoice {
            discount: Some(Decimal::new(25050, 2)), // 250.50
            ..base()
        };
        let invoice = payload.validate().unwrap();
        assert_eq!(invoice.final_amount, Decimal::new(124950, 2)); // 1249.50
    }

    #[test]
    fn test_discount_defaults_to_zero() {
        let invoice = base().validate().unwrap();
        assert_eq!(invoice.discount, Decimal::ZERO);
        assert_eq!(invoice.final_amount, invoice.amount);
    }

    #[test]
    fn test_discount_greater_than_amount_rejected() {
        let payload = CreateInvoice {
            amount: Some(Decimal::new(100, 0)),
            discount: Some(Decimal::new(101, 0)),
            ..base()
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_decimal_accepts_string_and_number_json() {
        let from_string: CreateInvoice =
            serde_json::from_value(serde_json::json!({ "amount": "123.45" })).unwrap();
        let from_number: CreateInvoice =
            serde_json::from_value(serde_json::json!({ "amount": 123.45 })).unwrap();
        assert_eq!(from_string.amount, from_number.amount);
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(invoice_number(2026, 1), "INV-2026-00001");
        assert_eq!(invoice_number(2026, 12345), "INV-2026-12345");
        assert_eq!(invoice_number(2027, 123456), "INV-2027-123456");
    }
}
