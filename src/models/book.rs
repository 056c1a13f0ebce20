use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::non_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub total_copies: Option<i32>,
}

pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub total_copies: i32,
}

impl CreateBook {
    pub fn validate(self) -> Result<NewBook, ApiError> {
        let title = non_blank(self.title);
        let author = non_blank(self.author);

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if author.is_none() {
            missing.push("author");
        }

        let (Some(title), Some(author)) = (title, author) else {
            return Err(ApiError::missing_fields(&missing));
        };

        let total_copies = self.total_copies.unwrap_or(1);
        if total_copies <= 0 {
            return Err(ApiError::bad_request("total_copies must be positive"));
        }

        Ok(NewBook {
            title,
            author,
            isbn: non_blank(self.isbn),
            category: non_blank(self.category),
            total_copies,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
}

impl UpdateBook {
    pub fn check(&self) -> Result<(), ApiError> {
        if matches!(self.total_copies, Some(n) if n <= 0) {
            return Err(ApiError::bad_request("total_copies must be positive"));
        }
        if matches!(self.available_copies, Some(n) if n < 0) {
            return Err(ApiError::bad_request("available_copies cannot be negative"));
        }
        if let (Some(total), Some(available)) = (self.total_copies, self.available_copies) {
            if available > total {
                return Err(ApiError::bad_request(
                    "available_copies cannot exceed total_copies",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_book_starts_fully_available() {
        let payload = CreateBook {
            title: Some("A Wrinkle in Time".to_string()),
            author: Some("Madeleine L'Engle".to_string()),
            isbn: None,
            category: Some("Fiction".to_string()),
            total_copies: Some(3),
        };
        let book = payload.validate().unwrap();
        assert_eq!(book.total_copies, 3);
    }

    #[test]
    fn test_available_cannot_exceed_total() {
        let payload = UpdateBook {
            title: None,
            author: None,
            isbn: None,
            category: None,
            total_copies: Some(2),
            available_copies: Some(5),
        };
        assert_eq!(payload.check().unwrap_err().status_code(), 400);
    }
}
