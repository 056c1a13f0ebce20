use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Class {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub grade_level: i32,
    pub section: Option<String>,
    pub academic_year: String,
    pub class_teacher_id: Option<Uuid>,
    pub capacity: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClass {
    pub name: Option<String>,
    pub grade_level: Option<i32>,
    pub section: Option<String>,
    pub academic_year: Option<String>,
    pub class_teacher_id: Option<Uuid>,
    pub capacity: Option<i32>,
}

#[derive(Debug)]
pub struct NewClass {
    pub name: String,
    pub grade_level: i32,
    pub section: Option<String>,
    pub academic_year: String,
    pub class_teacher_id: Option<Uuid>,
    pub capacity: i32,
}

impl CreateClass {
    pub fn validate(self) -> Result<NewClass, ApiError> {
        let name = non_blank(self.name);
        let academic_year = non_blank(self.academic_year);

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if self.grade_level.is_none() {
            missing.push("grade_level");
        }
        if academic_year.is_none() {
            missing.push("academic_year");
        }

        let (Some(name), Some(grade_level), Some(academic_year)) =
            (name, self.grade_level, academic_year)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        let capacity = self.capacity.unwrap_or(40);
        if capacity <= 0 {
            return Err(ApiError::bad_request("capacity must be positive"));
        }

        Ok(NewClass {
            name,
            grade_level,
            section: non_blank(self.section),
            academic_year,
            class_teacher_id: self.class_teacher_id,
            capacity,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateClass {
    pub name: Option<String>,
    pub grade_level: Option<i32>,
    pub section: Option<String>,
    pub academic_year: Option<String>,
    pub class_teacher_id: Option<Uuid>,
    pub capacity: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_defaults_to_forty() {
        let payload = CreateClass {
            name: Some("Grade 6".to_string()),
            grade_level: Some(6),
            section: Some("A".to_string()),
            academic_year: Some("2026-2027".to_string()),
            class_teacher_id: None,
            capacity: None,
        };
        assert_eq!(payload.validate().unwrap().capacity, 40);
    }

    #[test]
    fn test_nonpositive_capacity_rejected() {
        let payload = CreateClass {
            name: Some("Grade 6".to_string()),
            grade_level: Some(6),
            section: None,
            academic_year: Some("2026-2027".to_string()),
            class_teacher_id: None,
            capacity: Some(0),
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }
}
