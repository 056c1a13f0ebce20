use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub requester_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// PENDING is the only state transitions start from; APPROVED and REJECTED
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(LeaveStatus::Pending),
            "APPROVED" => Some(LeaveStatus::Approved),
            "REJECTED" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLeave {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct NewLeave {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

impl CreateLeave {
    pub fn validate(self) -> Result<NewLeave, ApiError> {
        let reason = non_blank(self.reason);

        let mut missing = Vec::new();
        if self.start_date.is_none() {
            missing.push("start_date");
        }
        if self.end_date.is_none() {
            missing.push("end_date");
        }
        if reason.is_none() {
            missing.push("reason");
        }

        let (Some(start_date), Some(end_date), Some(reason)) =
            (self.start_date, self.end_date, reason)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        if end_date < start_date {
            return Err(ApiError::bad_request("end_date cannot be before start_date"));
        }

        Ok(NewLeave {
            start_date,
            end_date,
            reason,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeave {
    /// APPROVED or REJECTED triggers a transition; PENDING is not a target.
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub rejection_reason: Option<String>,
}

impl UpdateLeave {
    pub fn parsed_status(&self) -> Result<Option<LeaveStatus>, ApiError> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(s) => LeaveStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid leave status: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_date_range_rejected() {
        let payload = CreateLeave {
            start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 8),
            reason: Some("Family function".to_string()),
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_single_day_leave_is_valid() {
        let payload = CreateLeave {
            start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            reason: Some("Medical appointment".to_string()),
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_status_parse_round_trip() {
        for s in ["PENDING", "APPROVED", "REJECTED"] {
            assert_eq!(LeaveStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(LeaveStatus::parse("CANCELLED").is_none());
    }
}
