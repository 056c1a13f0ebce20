use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub body: String,
    pub audience: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DRAFT -> PUBLISHED -> ARCHIVED, one direction only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementStatus {
    Draft,
    Published,
    Archived,
}

impl AnnouncementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementStatus::Draft => "DRAFT",
            AnnouncementStatus::Published => "PUBLISHED",
            AnnouncementStatus::Archived => "ARCHIVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(AnnouncementStatus::Draft),
            "PUBLISHED" => Some(AnnouncementStatus::Published),
            "ARCHIVED" => Some(AnnouncementStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Students,
    Staff,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::All => "ALL",
            Audience::Students => "STUDENTS",
            Audience::Staff => "STAFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ALL" => Some(Audience::All),
            "STUDENTS" => Some(Audience::Students),
            "STAFF" => Some(Audience::Staff),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncement {
    pub title: Option<String>,
    pub body: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug)]
pub struct NewAnnouncement {
    pub title: String,
    pub body: String,
    pub audience: Audience,
}

impl CreateAnnouncement {
    pub fn validate(self) -> Result<NewAnnouncement, ApiError> {
        let title = non_blank(self.title);
        let body = non_blank(self.body);

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if body.is_none() {
            missing.push("body");
        }

        let (Some(title), Some(body)) = (title, body) else {
            return Err(ApiError::missing_fields(&missing));
        };

        let audience = match self.audience.as_deref() {
            None => Audience::All,
            Some(a) => Audience::parse(a)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid audience: {}", a)))?,
        };

        Ok(NewAnnouncement {
            title,
            body,
            audience,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnouncement {
    pub title: Option<String>,
    pub body: Option<String>,
    pub audience: Option<String>,
}

impl UpdateAnnouncement {
    pub fn parsed_audience(&self) -> Result<Option<Audience>, ApiError> {
        match self.audience.as_deref() {
            None => Ok(None),
            Some(a) => Audience::parse(a)
                .map(Some)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid audience: {}", a))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_defaults_to_all() {
        let payload = CreateAnnouncement {
            title: Some("Term dates".to_string()),
            body: Some("Term starts on the 5th.".to_string()),
            audience: None,
        };
        assert_eq!(payload.validate().unwrap().audience, Audience::All);
    }

    #[test]
    fn test_unknown_audience_rejected() {
        let payload = CreateAnnouncement {
            title: Some("Term dates".to_string()),
            body: Some("Term starts on the 5th.".to_string()),
            audience: Some("PARENTS".to_string()),
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }
}
