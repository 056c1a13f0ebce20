use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub category: String,
    pub amount: Decimal,
    pub incurred_on: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpense {
    pub title: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub incurred_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct NewExpense {
    pub title: String,
    pub category: String,
    pub amount: Decimal,
    pub incurred_on: NaiveDate,
    pub notes: Option<String>,
}

impl CreateExpense {
    pub fn validate(self) -> Result<NewExpense, ApiError> {
        let title = non_blank(self.title);
        let category = non_blank(self.category);

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if category.is_none() {
            missing.push("category");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.incurred_on.is_none() {
            missing.push("incurred_on");
        }

        let (Some(title), Some(category), Some(amount), Some(incurred_on)) =
            (title, category, self.amount, self.incurred_on)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        if amount < Decimal::ZERO {
            return Err(ApiError::bad_request("amount cannot be negative"));
        }

        Ok(NewExpense {
            title,
            category,
            amount,
            incurred_on,
            notes: non_blank(self.notes),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpense {
    pub title: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub incurred_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl UpdateExpense {
    pub fn check(&self) -> Result<(), ApiError> {
        if let Some(amount) = self.amount {
            if amount < Decimal::ZERO {
                return Err(ApiError::bad_request("amount cannot be negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_amount_rejected() {
        let payload = CreateExpense {
            title: Some("Lab equipment".to_string()),
            category: Some("SUPPLIES".to_string()),
            amount: Some(Decimal::new(-500, 2)),
            incurred_on: NaiveDate::from_ymd_opt(2026, 3, 10),
            notes: None,
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_update_check_ignores_absent_amount() {
        let payload = UpdateExpense {
            title: Some("Renamed".to_string()),
            category: None,
            amount: None,
            incurred_on: None,
            notes: None,
        };
        assert!(payload.check().is_ok());
    }
}
