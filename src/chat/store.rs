use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::api::models::ChatMessage;
use crate::storage::SessionPersistence;

pub const DEFAULT_BUCKET: &str = "chat-storage";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub is_typing: bool,
}

impl ChatSession {
    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }
}

/// What survives a restart. The typing flag is deliberately absent.
#[derive(Serialize, Deserialize)]
struct Persisted {
    messages: Vec<ChatMessage>,
}

type Listener = Box<dyn Fn(&ChatSession) + Send + Sync>;

/// The conversation shown in the chat panel.
///
/// Loads its bucket once on construction and writes it back after every
/// message change. Observers get a snapshot after each mutation.
pub struct ChatStore {
    session: Mutex<ChatSession>,
    persistence: Box<dyn SessionPersistence>,
    bucket: String,
    listeners: Mutex<Vec<Listener>>,
}

impl ChatStore {
    pub fn load(persistence: Box<dyn SessionPersistence>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let messages = match persistence.load(&bucket) {
            Ok(Some(raw)) => match serde_json::from_str::<Persisted>(&raw) {
                Ok(p) => p.messages,
                Err(e) => {
                    warn!("discarding unreadable session '{}': {}", bucket, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("could not load session '{}': {}", bucket, e);
                Vec::new()
            }
        };
        debug!("session '{}' rehydrated with {} messages", bucket, messages.len());
        Self {
            session: Mutex::new(ChatSession {
                messages,
                is_typing: false,
            }),
            persistence,
            bucket,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> ChatSession {
        self.session.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.session.lock().map(|s| s.messages.is_empty()).unwrap_or(true)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.session.lock().map(|s| s.contains(id)).unwrap_or(false)
    }

    pub fn add_message(&self, message: ChatMessage) {
        self.update(true, |s| s.messages.push(message));
    }

    /// Appends unless a message with the same id is already present.
    pub fn add_message_once(&self, message: ChatMessage) -> bool {
        let mut added = false;
        self.update(true, |s| {
            if !s.contains(&message.id) {
                s.messages.push(message);
                added = true;
            }
        });
        added
    }

    pub fn set_is_typing(&self, is_typing: bool) {
        self.update(false, |s| s.is_typing = is_typing);
    }

    pub fn clear_messages(&self) {
        self.update(true, |s| s.messages.clear());
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ChatSession) + Send + Sync + 'static,
    {
        if let Ok(mut l) = self.listeners.lock() {
            l.push(Box::new(listener));
        }
    }

    fn update(&self, persist: bool, f: impl FnOnce(&mut ChatSession)) {
        let snapshot = {
            let Ok(mut s) = self.session.lock() else {
                return;
            };
            f(&mut s);
            s.clone()
        };
        if persist {
            self.save(&snapshot);
        }
        if let Ok(listeners) = self.listeners.lock() {
            for l in listeners.iter() {
                l(&snapshot);
            }
        }
    }

    fn save(&self, session: &ChatSession) {
        let payload = Persisted {
            messages: session.messages.clone(),
        };
        let result = serde_json::to_string(&payload)
            .map_err(crate::error::StorageError::from)
            .and_then(|raw| self.persistence.save(&self.bucket, &raw));
        if let Err(e) = result {
            warn!("could not persist session '{}': {}", self.bucket, e);
        }
    }
}
