use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunicationLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub message_id: Uuid,
    pub recipient_id: Uuid,
    pub channel: String,
    pub created_at: DateTime<Utc>,
}

/// SCHEDULED and SENT both advance to READ; READ is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Scheduled,
    Sent,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Scheduled => "SCHEDULED",
            MessageStatus::Sent => "SENT",
            MessageStatus::Read => "READ",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(MessageStatus::Scheduled),
            "SENT" => Some(MessageStatus::Sent),
            "READ" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMessage {
    pub recipient_id: Option<Uuid>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// When present the message is stored as SCHEDULED instead of SENT.
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewMessage {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CreateMessage {
    pub fn validate(self) -> Result<NewMessage, ApiError> {
        let subject = non_blank(self.subject);
        let body = non_blank(self.body);

        let mut missing = Vec::new();
        if self.recipient_id.is_none() {
            missing.push("recipient_id");
        }
        if subject.is_none() {
            missing.push("subject");
        }
        if body.is_none() {
            missing.push("body");
        }

        let (Some(recipient_id), Some(subject), Some(body)) =
            (self.recipient_id, subject, body)
        else {
            return Err(ApiError::missing_fields(&missing));
        };

        if let Some(at) = self.scheduled_at {
            if at <= Utc::now() {
                return Err(ApiError::bad_request("scheduled_at must be in the future"));
            }
        }

        Ok(NewMessage {
            recipient_id,
            subject,
            body,
            scheduled_at: self.scheduled_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkMessage {
    #[serde(default)]
    pub recipient_ids: Vec<Uuid>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug)]
pub struct NewBulkMessage {
    pub recipient_ids: Vec<Uuid>,
    pub subject: String,
    pub body: String,
}

impl BulkMessage {
    pub fn validate(self) -> Result<NewBulkMessage, ApiError> {
        let subject = non_blank(self.subject);
        let body = non_blank(self.body);

        let mut missing = Vec::new();
        if self.recipient_ids.is_empty() {
            missing.push("recipient_ids");
        }
        if subject.is_none() {
            missing.push("subject");
        }
        if body.is_none() {
            missing.push("body");
        }

        let (Some(subject), Some(body)) = (subject, body) else {
            return Err(ApiError::missing_fields(&missing));
        };
        if self.recipient_ids.is_empty() {
            return Err(ApiError::missing_fields(&missing));
        }

        // Preserve caller order while dropping duplicates.
        let mut seen = std::collections::HashSet::new();
        let recipient_ids: Vec<Uuid> = self
            .recipient_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        Ok(NewBulkMessage {
            recipient_ids,
            subject,
            body,
        })
    }
}

/// Outcome report for a bulk send: valid recipients got one message each,
/// unknown ids are listed back to the caller instead of failing the batch.
#[derive(Debug, Serialize)]
pub struct BulkSendReport {
    pub created: usize,
    pub message_ids: Vec<Uuid>,
    pub skipped_recipient_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_past_schedule_time_rejected() {
        let payload = CreateMessage {
            recipient_id: Some(Uuid::new_v4()),
            subject: Some("Fee reminder".to_string()),
            body: Some("Please pay by Friday.".to_string()),
            scheduled_at: Some(Utc::now() - Duration::hours(1)),
        };
        assert_eq!(payload.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_future_schedule_time_accepted() {
        let payload = CreateMessage {
            recipient_id: Some(Uuid::new_v4()),
            subject: Some("Fee reminder".to_string()),
            body: Some("Please pay by Friday.".to_string()),
            scheduled_at: Some(Utc::now() + Duration::hours(4)),
        };
        assert!(payload.validate().unwrap().scheduled_at.is_some());
    }

    #[test]
    fn test_bulk_requires_recipients() {
        let payload = BulkMessage {
            recipient_ids: vec![],
            subject: Some("Notice".to_string()),
            body: Some("School closed tomorrow.".to_string()),
        };
        let body = payload.validate().unwrap_err().to_json();
        assert!(body["field_errors"]["recipient_ids"].is_string());
    }

    #[test]
    fn test_bulk_dedupes_preserving_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let payload = BulkMessage {
            recipient_ids: vec![a, b, a, b, a],
            subject: Some("Notice".to_string()),
            body: Some("Sports day moved.".to_string()),
        };
        assert_eq!(payload.validate().unwrap().recipient_ids, vec![a, b]);
    }
}
