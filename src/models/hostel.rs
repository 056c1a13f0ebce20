use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Hostel {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub warden_name: Option<String>,
    pub capacity: i32,
    pub occupied: i32,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHostel {
    pub name: Option<String>,
    pub warden_name: Option<String>,
    pub capacity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct NewHostel {
    pub name: String,
    pub warden_name: Option<String>,
    pub capacity: i32,
    pub notes: Option<String>,
}

impl CreateHostel {
    pub fn validate(self) -> Result<NewHostel, ApiError> {
        let Some(name) = non_blank(self.name) else {
            return Err(ApiError::missing_fields(&["name"]));
        };

        let capacity = self.capacity.unwrap_or(0);
        if capacity < 0 {
            return Err(ApiError::bad_request("capacity cannot be negative"));
        }

        Ok(NewHostel {
            name,
            warden_name: non_blank(self.warden_name),
            capacity,
            notes: non_blank(self.notes),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateHostel {
    pub name: Option<String>,
    pub warden_name: Option<String>,
    pub capacity: Option<i32>,
    pub occupied: Option<i32>,
    pub notes: Option<String>,
}

impl UpdateHostel {
    pub fn check(&self) -> Result<(), ApiError> {
        if matches!(self.capacity, Some(n) if n < 0) {
            return Err(ApiError::bad_request("capacity cannot be negative"));
        }
        if matches!(self.occupied, Some(n) if n < 0) {
            return Err(ApiError::bad_request("occupied cannot be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostel_requires_name() {
        let payload = CreateHostel {
            name: Some("   ".to_string()),
            warden_name: None,
            capacity: Some(120),
            notes: None,
        };
        let err = payload.validate().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let payload = CreateHostel {
            name: Some("North Wing".to_string()),
            warden_name: None,
            capacity: Some(-1),
            notes: None,
        };
        assert!(payload.validate().is_err());
    }
}
