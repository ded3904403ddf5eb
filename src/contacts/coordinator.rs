use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::gateway::ContactGateway;
use crate::api::models::{Contact, ContactId, NewContact};
use crate::error::{ApiError, MutationError};
use crate::notify::{Notifier, RecoveryAction, Toast};
use crate::query::{QueryClient, QueryKey, RetryPolicy};

/// One tracked lifecycle per logical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Add,
    Update(ContactId),
    Delete(ContactId),
    /// Keyed by the id the contact had before it was deleted.
    Restore(ContactId),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

/// Runs contact mutations against the backend and turns their outcome into
/// cache invalidation and toasts.
///
/// The visible list is never edited optimistically; it only changes when the
/// contacts query is refetched after an invalidation.
pub struct ContactCoordinator<G> {
    gateway: Arc<G>,
    queries: Arc<QueryClient>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    states: Mutex<HashMap<MutationKey, MutationState>>,
}

impl<G: ContactGateway> ContactCoordinator<G> {
    pub fn new(gateway: Arc<G>, queries: Arc<QueryClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            queries,
            notifier,
            retry: RetryPolicy::default(),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn mutation_state(&self, key: &MutationKey) -> MutationState {
        self.states
            .lock()
            .ok()
            .and_then(|s| s.get(key).cloned())
            .unwrap_or_default()
    }

    fn set_state(&self, key: MutationKey, state: MutationState) {
        if let Ok(mut s) = self.states.lock() {
            s.insert(key, state);
        }
    }

    /// Pending → Success/Error bookkeeping around one gateway call.
    fn settle<T>(
        &self,
        key: MutationKey,
        verb: &'static str,
        result: Result<T, ApiError>,
    ) -> Result<T, MutationError> {
        match result {
            Ok(v) => {
                self.set_state(key, MutationState::Success);
                self.queries.invalidate(QueryKey::Contacts);
                info!("{:?} succeeded", key);
                Ok(v)
            }
            Err(source) => {
                let err = MutationError::Failed { verb, source };
                warn!("{:?}: {}", key, err);
                self.set_state(key, MutationState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    pub async fn add(&self, contact: NewContact) -> Result<Contact, MutationError> {
        let contact = crate::contacts::form::validate(&contact.name, &contact.phone)?;
        self.set_state(MutationKey::Add, MutationState::Pending);
        let result = self.retry.run(|| self.gateway.create(&contact)).await;
        self.settle(MutationKey::Add, "add", result).inspect_err(|e| {
            self.notifier
                .notify(Toast::error("Error adding contact").with_description(e.to_string()));
        })
    }

    /// Failure is returned to the caller, which keeps the edit dialog open.
    pub async fn update(&self, contact: Contact) -> Result<Contact, MutationError> {
        let fields = crate::contacts::form::validate(&contact.name, &contact.phone)?;
        let key = MutationKey::Update(contact.id);
        self.set_state(key, MutationState::Pending);
        let result = self
            .retry
            .run(|| self.gateway.update(contact.id, &fields))
            .await;
        self.settle(key, "update", result)
    }

    /// Deletes by id. On success the toast offers Undo, which re-creates the
    /// contact from the fields captured here.
    pub async fn delete(&self, contact: &Contact) -> Result<(), MutationError> {
        let key = MutationKey::Delete(contact.id);
        self.set_state(key, MutationState::Pending);
        let result = self.retry.run(|| self.gateway.delete(contact.id)).await;
        match self.settle(key, "delete", result) {
            Ok(_) => {
                self.notifier.notify(
                    Toast::success("Successfully deleted contact")
                        .with_action(RecoveryAction::Undo(contact.clone())),
                );
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(
                    Toast::error("Error deleting contact")
                        .with_description(e.to_string())
                        .with_action(RecoveryAction::RetryDelete(contact.clone())),
                );
                Err(e)
            }
        }
    }

    /// Undo for a delete. Creates a new contact; the old id is gone for good.
    /// On failure the toast keeps the deleted fields around for another try.
    pub async fn restore(&self, deleted: &Contact) -> Result<Contact, MutationError> {
        let key = MutationKey::Restore(deleted.id);
        let snapshot = deleted.snapshot();
        self.set_state(key, MutationState::Pending);
        let result = self.retry.run(|| self.gateway.create(&snapshot)).await;
        match self.settle(key, "restore", result) {
            Ok(created) => {
                self.notifier.notify(Toast::success("Successfully restored contact"));
                Ok(created)
            }
            Err(e) => {
                self.notifier.notify(
                    Toast::error("Error restoring contact")
                        .with_description(e.to_string())
                        .with_action(RecoveryAction::RetryRestore(deleted.clone())),
                );
                Err(e)
            }
        }
    }

    /// Runs the action behind a toast button. Chat retries belong to the
    /// chat coordinator and are ignored here.
    pub async fn recover(&self, action: RecoveryAction) -> Result<(), MutationError> {
        match action {
            RecoveryAction::Undo(deleted) | RecoveryAction::RetryRestore(deleted) => {
                self.restore(&deleted).await.map(|_| ())
            }
            RecoveryAction::RetryDelete(contact) => self.delete(&contact).await,
            RecoveryAction::RetryChat(content) => {
                debug!("chat retry for {:?} is handled by the chat coordinator", content);
                Ok(())
            }
        }
    }
}
