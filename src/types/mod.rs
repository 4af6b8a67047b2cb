//! Wire models for the Subspace REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = String;

/// Message ID type
pub type MessageId = String;

/// Subspace user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Account creation time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Up to two initials taken from the words of the name
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect()
    }

    /// Get the best display name for this user
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Paged list wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Items in this page
    pub data: Vec<T>,
    /// Page size
    pub limit: u32,
    /// Offset of the first item
    pub offset: u32,
    /// Total item count, when the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Message as returned by the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Message ID
    pub id: MessageId,
    /// Owning user
    pub user_id: UserId,
    /// Message text
    pub content: String,
    /// Message kind
    pub kind: String,
    /// Read flag
    pub is_read: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Update timestamp
    pub updated_at: String,
}

/// Unread message counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    /// Number of unread messages
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: "user-123".into(),
            name: name.into(),
            email: "john.doe@example.com".into(),
            avatar_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_initials() {
        assert_eq!(user("John Doe").initials(), "JD");
        assert_eq!(user("Jean Luc Picard").initials(), "JL");
        assert_eq!(user("Data").initials(), "D");
        assert_eq!(user("").initials(), "");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(user("John Doe").display_name(), "John Doe");
        assert_eq!(user("").display_name(), "john.doe@example.com");
    }

    #[test]
    fn test_user_decodes_iso8601() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","name":"Ada","email":"ada@example.com","avatarUrl":"https://example.com/a.png","createdAt":"2025-10-03T09:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(user.avatar_url.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(user.created_at.to_rfc3339(), "2025-10-03T09:30:00+00:00");
    }

    #[test]
    fn test_list_response_total_optional() {
        let list: ListResponse<UnreadCountResponse> =
            serde_json::from_str(r#"{"data":[{"unreadCount":4}],"limit":20,"offset":0}"#).unwrap();
        assert_eq!(list.data[0].unread_count, 4);
        assert_eq!(list.total, None);
    }
}
