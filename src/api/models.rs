use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned contact identifier. Never changes once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
}

impl Contact {
    /// Last-known fields, used to re-create the contact after a delete.
    pub fn snapshot(&self) -> NewContact {
        NewContact {
            name: self.name.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// A contact before the backend has assigned it an id.
/// Also the request body for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactsEnvelope {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAck {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_parses_python_iso_timestamp() {
        let raw = r#"{"id":"a1","role":"assistant","content":"hi","createdAt":"2025-03-01T10:15:30.123456+00:00"}"#;
        let msg: ChatMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.created_at.timestamp(), 1740824130);
    }

    #[test]
    fn user_messages_get_distinct_ids() {
        let a = ChatMessage::user("hello");
        let b = ChatMessage::user("hello");
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, Role::User);
    }

    #[test]
    fn contact_id_is_transparent_on_the_wire() {
        let c: Contact = serde_json::from_str(r#"{"id":7,"name":"Ann","phone":"+48500100200"}"#).unwrap();
        assert_eq!(c.id, ContactId(7));
        assert_eq!(c.snapshot(), NewContact { name: "Ann".into(), phone: "+48500100200".into() });
    }
}
