use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub staff_no: String,
    pub first_name: String,
    pub last_name: String,
    pub designation: String,
    pub department: Option<String>,
    pub status: String,
    pub hire_date: NaiveDate,
    pub phone: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffStatus {
    Active,
    OnLeave,
    Terminated,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStatus::Active => "ACTIVE",
            StaffStatus::OnLeave => "ON_LEAVE",
            StaffStatus::Terminated => "TERMINATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(StaffStatus::Active),
            "ON_LEAVE" => Some(StaffStatus::OnLeave),
            "TERMINATED" => Some(StaffStatus::Terminated),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStaff {
    pub staff_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

#[derive(Debug)]
pub struct NewStaff {
    pub staff_no: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub designation: String,
    pub department: Option<String>,
    pub status: StaffStatus,
    pub hire_date: NaiveDate,
    pub phone: Option<String>,
}

impl CreateStaff {
    pub fn validate(self) -> Result<NewStaff, ApiError> {
        let staff_no = non_blank(self.staff_no);
        let first_name = non_blank(self.first_name);
        let last_name = non_blank(self.last_name);
        let email = non_blank(self.email);
        let designation = non_blank(self.designation);

        let mut missing = Vec::new();
        if staff_no.is_none() {
            missing.push("staff_no");
        }
        if first_name.is_none() {
            missing.push("first_name");
        }
        if last_name.is_none() {
            missing.push("last_name");
        }
        if email.is_none() {
            missing.push("email");
        }
        if designation.is_none() {
            missing.push("designation");
        }
        if self.hire_date.is_none() {
            missing.push("hire_date");
        }

        let (
            Some(staff_no),
            Some(first_name),
            Some(last_name),
            Some(email),
            Some(designation),
            Some(hire_date),
        ) = (staff_no, first_name, last_name, email, designation, self.hire_date)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        if !email.contains('@') {
            return Err(ApiError::validation_error(
                "Invalid email address",
                Some(std::collections::HashMap::from([(
                    "email".to_string(),
                    "Must be a valid email address".to_string(),
                )])),
            ));
        }

        let status = match self.status.as_deref() {
            None => StaffStatus::Active,
            Some(s) => StaffStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid staff status: {}", s)))?,
        };

        Ok(NewStaff {
            staff_no,
            first_name,
            last_name,
            email,
            password: non_blank(self.password),
            designation,
            department: non_blank(self.department),
            status,
            hire_date,
            phone: non_blank(self.phone),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaff {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub phone: Option<String>,
}

impl UpdateStaff {
    pub fn parsed_status(&self) -> Result<Option<StaffStatus>, ApiError> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(s) => StaffStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid staff status: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lists_missing_fields() {
        let payload = CreateStaff {
            staff_no: None,
            first_name: Some("Vikram".to_string()),
            last_name: None,
            email: Some("v@school.test".to_string()),
            password: None,
            designation: None,
            department: None,
            status: None,
            hire_date: None,
            phone: None,
        };
        let err = payload.validate().unwrap_err();
        let body = err.to_json();
        for field in ["staff_no", "last_name", "designation", "hire_date"] {
            assert!(body["field_errors"][field].is_string(), "missing {}", field);
        }
    }

    #[test]
    fn test_default_status_is_active() {
        let payload = CreateStaff {
            staff_no: Some("STF-9".to_string()),
            first_name: Some("Vikram".to_string()),
            last_name: Some("Mehta".to_string()),
            email: Some("v@school.test".to_string()),
            password: None,
            designation: Some("Mathematics Teacher".to_string()),
            department: Some("Science".to_string()),
            status: None,
            hire_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            phone: None,
        };
        assert_eq!(payload.validate().unwrap().status, StaffStatus::Active);
    }
}
