//! Row types and request payloads, one module per resource family.
//!
//! Row structs map 1:1 onto table columns via `sqlx::FromRow` and serialize
//! straight into response envelopes. Create payloads use `Option` fields so
//! validation can name every missing field at once instead of failing on the
//! first; update payloads are all-optional by nature.

pub mod announcement;
pub mod book;
pub mod class;
pub mod examination;
pub mod expense;
pub mod hostel;
pub mod invoice;
pub mod leave;
pub mod message;
pub mod role;
pub mod staff;
pub mod student;
pub mod tenant;
pub mod user;

/// Drop a supplied-but-blank string so presence checks see it as missing.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_filters() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some("   \t".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("ok".to_string())), Some("ok".to_string()));
    }
}
