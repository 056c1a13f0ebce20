use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Examination {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub subject: String,
    pub class_id: Uuid,
    pub exam_date: NaiveDate,
    pub max_marks: i32,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Scheduled => "SCHEDULED",
            ExamStatus::Completed => "COMPLETED",
            ExamStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(ExamStatus::Scheduled),
            "COMPLETED" => Some(ExamStatus::Completed),
            "CANCELLED" => Some(ExamStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateExamination {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub class_id: Option<Uuid>,
    pub exam_date: Option<NaiveDate>,
    pub max_marks: Option<i32>,
}

#[derive(Debug)]
pub struct NewExamination {
    pub name: String,
    pub subject: String,
    pub class_id: Uuid,
    pub exam_date: NaiveDate,
    pub max_marks: i32,
}

impl CreateExamination {
    pub fn validate(self) -> Result<NewExamination, ApiError> {
        let name = non_blank(self.name);
        let subject = non_blank(self.subject);

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if subject.is_none() {
            missing.push("subject");
        }
        if self.class_id.is_none() {
            missing.push("class_id");
        }
        if self.exam_date.is_none() {
            missing.push("exam_date");
        }

        let (Some(name), Some(subject), Some(class_id), Some(exam_date)) =
            (name, subject, self.class_id, self.exam_date)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        let max_marks = self.max_marks.unwrap_or(100);
        if max_marks <= 0 {
            return Err(ApiError::bad_request("max_marks must be positive"));
        }

        Ok(NewExamination {
            name,
            subject,
            class_id,
            exam_date,
            max_marks,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateExamination {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub class_id: Option<Uuid>,
    pub exam_date: Option<NaiveDate>,
    pub max_marks: Option<i32>,
    pub status: Option<String>,
}

impl UpdateExamination {
    pub fn parsed_status(&self) -> Result<Option<ExamStatus>, ApiError> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(s) => ExamStatus::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid examination status: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_marks_defaults_to_hundred() {
        let payload = CreateExamination {
            name: Some("Midterm".to_string()),
            subject: Some("Physics".to_string()),
            class_id: Some(Uuid::new_v4()),
            exam_date: NaiveDate::from_ymd_opt(2026, 9, 15),
            max_marks: None,
        };
        assert_eq!(payload.validate().unwrap().max_marks, 100);
    }

    #[test]
    fn test_missing_class_and_date_are_both_reported() {
        let payload = CreateExamination {
            name: Some("Midterm".to_string()),
            subject: Some("Physics".to_string()),
            class_id: None,
            exam_date: None,
            max_marks: None,
        };
        let body = payload.validate().unwrap_err().to_json();
        assert!(body["field_errors"]["class_id"].is_string());
        assert!(body["field_errors"]["exam_date"].is_string());
    }
}
