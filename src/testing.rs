//! In-memory backend and notifier used by the coordinator tests.

use chrono::Utc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::api::gateway::{ChatGateway, ContactGateway};
use crate::api::models::{ChatMessage, Contact, ContactId, DeleteAck, NewContact, Role};
use crate::error::ApiError;
use crate::notify::{Notifier, Toast};

#[derive(Default)]
pub struct FakeBackend {
    contacts: Mutex<Vec<Contact>>,
    next_id: AtomicUsize,
    /// Number of upcoming calls that fail with HTTP 500.
    failures: AtomicU32,
    pub creates: Mutex<Vec<NewContact>>,
    pub deletes: Mutex<Vec<ContactId>>,
    pub lists: AtomicUsize,
    pub sends: Mutex<Vec<String>>,
    pub greetings: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_contacts(Vec::new())
    }

    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        let next = contacts.iter().map(|c| c.id.0).max().unwrap_or(0) as usize + 1;
        Self {
            contacts: Mutex::new(contacts),
            next_id: AtomicUsize::new(next),
            ..Self::default()
        }
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.lock().unwrap().clone()
    }

    fn trip(&self) -> Result<(), ApiError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(ApiError::Http { status: 500, detail: None });
        }
        Ok(())
    }
}

impl ContactGateway for FakeBackend {
    async fn list(&self) -> Result<Vec<Contact>, ApiError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.trip()?;
        Ok(self.contacts())
    }

    async fn create(&self, contact: &NewContact) -> Result<Contact, ApiError> {
        self.creates.lock().unwrap().push(contact.clone());
        self.trip()?;
        let id = ContactId(self.next_id.fetch_add(1, Ordering::SeqCst) as i64);
        let created = Contact {
            id,
            name: contact.name.clone(),
            phone: contact.phone.clone(),
        };
        self.contacts.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: ContactId, contact: &NewContact) -> Result<Contact, ApiError> {
        self.trip()?;
        let mut all = self.contacts.lock().unwrap();
        let slot = all
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ApiError::Http { status: 404, detail: Some("Contact not found".into()) })?;
        slot.name = contact.name.clone();
        slot.phone = contact.phone.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: ContactId) -> Result<DeleteAck, ApiError> {
        self.deletes.lock().unwrap().push(id);
        self.trip()?;
        let mut all = self.contacts.lock().unwrap();
        let before = all.len();
        all.retain(|c| c.id != id);
        if all.len() == before {
            return Err(ApiError::Http { status: 404, detail: Some("Contact not found".into()) });
        }
        Ok(DeleteAck { message: Some("Contact deleted successfully".into()) })
    }
}

impl ChatGateway for FakeBackend {
    async fn send(&self, content: &str) -> Result<ChatMessage, ApiError> {
        self.sends.lock().unwrap().push(content.to_string());
        self.trip()?;
        Ok(ChatMessage {
            id: format!("srv-{}", self.sends.lock().unwrap().len()),
            role: Role::Assistant,
            content: format!("echo: {content}"),
            created_at: Utc::now(),
        })
    }

    async fn greeting(&self) -> Result<ChatMessage, ApiError> {
        self.greetings.fetch_add(1, Ordering::SeqCst);
        self.trip()?;
        Ok(ChatMessage {
            id: "hello-1".into(),
            role: Role::Assistant,
            content: "Hello from the server".into(),
            created_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}
