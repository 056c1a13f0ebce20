use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub class_id: Option<Uuid>,
    pub status: String,
    pub admission_date: NaiveDate,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentStatus {
    Enrolled,
    Suspended,
    Graduated,
    Withdrawn,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Enrolled => "ENROLLED",
            StudentStatus::Suspended => "SUSPENDED",
            StudentStatus::Graduated => "GRADUATED",
            StudentStatus::Withdrawn => "WITHDRAWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ENROLLED" => Some(StudentStatus::Enrolled),
            "SUSPENDED" => Some(StudentStatus::Suspended),
            "GRADUATED" => Some(StudentStatus::Graduated),
            "WITHDRAWN" => Some(StudentStatus::Withdrawn),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStudent {
    pub admission_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Initial login password; a random one is generated when omitted.
    pub password: Option<String>,
    pub class_id: Option<Uuid>,
    pub status: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
}

#[derive(Debug)]
pub struct NewStudent {
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub class_id: Option<Uuid>,
    pub status: StudentStatus,
    pub admission_date: NaiveDate,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
}

impl CreateStudent {
    pub fn validate(self) -> Result<NewStudent, ApiError> {
        let admission_no = non_blank(self.admission_no);
        let first_name = non_blank(self.first_name);
        let last_name = non_blank(self.last_name);
        let email = non_blank(self.email);

        let mut missing = Vec::new();
        if admission_no.is_none() {
            missing.push("admission_no");
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
        if self.admission_date.is_none() {
            missing.push("admission_date");
        }

        let (Some(admission_no), Some(first_name), Some(last_name), Some(email), Some(admission_date)) =
            (admission_no, first_name, last_name, email, self.admission_date)
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
            None => StudentStatus::Enrolled,
            Some(s) => StudentStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid student status: {}", s)))?,
        };

        Ok(NewStudent {
            admission_no,
            first_name,
            last_name,
            email,
            password: non_blank(self.password),
            class_id: self.class_id,
            status,
            admission_date,
            date_of_birth: self.date_of_birth,
            guardian_name: non_blank(self.guardian_name),
            guardian_phone: non_blank(self.guardian_phone),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudent {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub class_id: Option<Uuid>,
    pub status: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
}

impl UpdateStudent {
    /// Check the supplied status value without touching absent fields.
    pub fn parsed_status(&self) -> Result<Option<StudentStatus>, ApiError> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(s) => StudentStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid student status: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> CreateStudent {
        CreateStudent {
            admission_no: Some("ADM-001".to_string()),
            first_name: Some("Asha".to_string()),
            last_name: Some("Rao".to_string()),
            email: Some("asha.rao@school.test".to_string()),
            password: None,
            class_id: None,
            status: None,
            admission_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            date_of_birth: None,
            guardian_name: Some("R. Rao".to_string()),
            guardian_phone: None,
        }
    }

    #[test]
    fn test_validate_accepts_complete_payload() {
        let new_student = full_payload().validate().unwrap();
        assert_eq!(new_student.admission_no, "ADM-001");
        assert_eq!(new_student.status, StudentStatus::Enrolled);
    }

    #[test]
    fn test_validate_names_every_missing_field() {
        let payload = CreateStudent {
            admission_no: None,
            first_name: Some("".to_string()),
            ..full_payload()
        };
        let err = payload.validate().unwrap_err();
        let body = err.to_json();
        assert!(body["field_errors"]["admission_no"].is_string());
        assert!(body["field_errors"]["first_name"].is_string());
        assert!(body["field_errors"].get("last_name").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let payload = CreateStudent {
            email: Some("not-an-email".to_string()),
            ..full_payload()
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_validate_rejects_unknown_status() {
        let payload = CreateStudent {
            status: Some("EXPELLED".to_string()),
            ..full_payload()
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["ENROLLED", "SUSPENDED", "GRADUATED", "WITHDRAWN"] {
            assert_eq!(StudentStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(StudentStatus::parse("enrolled").is_none());
    }
}
