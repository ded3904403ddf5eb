use std::future::Future;

use crate::api::models::{ChatMessage, Contact, ContactId, DeleteAck, NewContact};
use crate::error::ApiError;

/// CRUD against the backend's contacts resource.
pub trait ContactGateway: Send + Sync {
    fn list(&self) -> impl Future<Output = Result<Vec<Contact>, ApiError>> + Send;

    fn create(&self, contact: &NewContact) -> impl Future<Output = Result<Contact, ApiError>> + Send;

    fn update(
        &self,
        id: ContactId,
        contact: &NewContact,
    ) -> impl Future<Output = Result<Contact, ApiError>> + Send;

    fn delete(&self, id: ContactId) -> impl Future<Output = Result<DeleteAck, ApiError>> + Send;
}

/// The assistant endpoint.
pub trait ChatGateway: Send + Sync {
    fn send(&self, content: &str) -> impl Future<Output = Result<ChatMessage, ApiError>> + Send;

    /// Greeting shown when a session starts empty.
    fn greeting(&self) -> impl Future<Output = Result<ChatMessage, ApiError>> + Send;
}
