use chrono::Utc;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::gateway::ChatGateway;
use crate::api::models::{ChatMessage, Role};
use crate::chat::store::ChatStore;
use crate::config::ChatPolicy;
use crate::error::{SubmitError, ValidationError};
use crate::notify::{Notifier, RecoveryAction, Toast};
use crate::query::{QueryClient, QueryKey, RetryPolicy};

pub const FALLBACK_GREETING_ID: &str = "welcome-fallback";
pub const FALLBACK_GREETING: &str = "Hi! I'm your contact book assistant. I can list, add, \
update, delete and search your contacts. What would you like to do?";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

/// Cancellation barrier for the greeting fetch. Cancel it when the chat view
/// is torn down; a greeting that arrives afterwards is dropped.
#[derive(Debug, Clone, Default)]
pub struct BootstrapGuard {
    cancelled: Arc<AtomicBool>,
}

impl BootstrapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub fn validate(content: &str, policy: &ChatPolicy) -> Result<(), ValidationError> {
    let len = content.trim().chars().count();
    if len < policy.min_len {
        return Err(ValidationError::TooShort { min: policy.min_len });
    }
    if len > policy.max_len {
        return Err(ValidationError::TooLong { max: policy.max_len });
    }
    Ok(())
}

pub fn fallback_greeting() -> ChatMessage {
    ChatMessage {
        id: FALLBACK_GREETING_ID.to_string(),
        role: Role::Assistant,
        content: FALLBACK_GREETING.to_string(),
        created_at: Utc::now(),
    }
}

pub struct ChatCoordinator<G> {
    gateway: Arc<G>,
    store: Arc<ChatStore>,
    queries: Arc<QueryClient>,
    notifier: Arc<dyn Notifier>,
    policy: ChatPolicy,
    retry: RetryPolicy,
    state: Mutex<SubmissionState>,
    draft: Mutex<String>,
    greeted: AtomicBool,
}

impl<G: ChatGateway> ChatCoordinator<G> {
    pub fn new(
        gateway: Arc<G>,
        store: Arc<ChatStore>,
        queries: Arc<QueryClient>,
        notifier: Arc<dyn Notifier>,
        policy: ChatPolicy,
    ) -> Self {
        Self {
            gateway,
            store,
            queries,
            notifier,
            policy,
            retry: RetryPolicy::default(),
            state: Mutex::new(SubmissionState::Idle),
            draft: Mutex::new(String::new()),
            greeted: AtomicBool::new(false),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    pub fn state(&self) -> SubmissionState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == SubmissionState::Pending
    }

    fn set_state(&self, state: SubmissionState) {
        if let Ok(mut s) = self.state.lock() {
            *s = state;
        }
    }

    pub fn draft(&self) -> String {
        self.draft.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn set_draft(&self, content: impl Into<String>) {
        if let Ok(mut d) = self.draft.lock() {
            *d = content.into();
        }
    }

    /// Sends one message. The user's message is shown immediately; on failure
    /// it stays in the history and its content goes back into the draft.
    pub async fn submit(&self, content: String) -> Result<ChatMessage, SubmitError> {
        validate(&content, &self.policy)?;
        self.store.add_message(ChatMessage::user(content.clone()));
        self.set_draft("");
        self.exchange(content).await
    }

    /// Clears the draft only when it still holds `content`, so text typed
    /// after a failure survives a retry. Returns whether it was cleared.
    pub fn clear_draft_if_unchanged(&self, content: &str) -> bool {
        match self.draft.lock() {
            Ok(mut d) if d.as_str() == content => {
                d.clear();
                true
            }
            _ => false,
        }
    }

    /// Resends content whose user message is already in the history.
    pub async fn retry(&self, content: String) -> Result<ChatMessage, SubmitError> {
        validate(&content, &self.policy)?;
        self.clear_draft_if_unchanged(&content);
        self.exchange(content).await
    }

    async fn exchange(&self, content: String) -> Result<ChatMessage, SubmitError> {
        self.set_state(SubmissionState::Pending);
        self.store.set_is_typing(true);
        let result = self.retry.run(|| self.gateway.send(&content)).await;
        self.store.set_is_typing(false);
        match result {
            Ok(reply) => {
                self.store.add_message(reply.clone());
                self.set_state(SubmissionState::Success);
                // The assistant may have edited contacts server-side.
                self.queries.invalidate(QueryKey::Contacts);
                info!("assistant replied ({})", reply.id);
                Ok(reply)
            }
            Err(source) => {
                warn!("chat send failed: {}", source);
                self.set_state(SubmissionState::Error(source.to_string()));
                self.set_draft(content.clone());
                self.notifier.notify(
                    Toast::error("Error sending message")
                        .with_description(source.to_string())
                        .with_action(RecoveryAction::RetryChat(content.clone())),
                );
                Err(SubmitError::Failed {
                    unsent: content,
                    source,
                })
            }
        }
    }

    /// Puts a greeting into an empty conversation, at most once per
    /// coordinator. Falls back to a local greeting when the fetch fails.
    pub async fn bootstrap(&self, guard: &BootstrapGuard) {
        if !self.store.is_empty() || self.greeted.swap(true, Ordering::SeqCst) {
            return;
        }
        let greeting = match self.gateway.greeting().await {
            Ok(msg) => msg,
            Err(e) => {
                warn!("greeting fetch failed, using fallback: {}", e);
                fallback_greeting()
            }
        };
        if guard.is_cancelled() {
            debug!("greeting arrived after teardown, dropped");
            self.greeted.store(false, Ordering::SeqCst);
            return;
        }
        self.store.add_message_once(greeting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteSessionStorage;
    use crate::testing::{FakeBackend, RecordingNotifier};
    use std::sync::atomic::Ordering;

    struct Harness {
        backend: Arc<FakeBackend>,
        queries: Arc<QueryClient>,
        notifier: Arc<RecordingNotifier>,
        chat: ChatCoordinator<FakeBackend>,
    }

    fn harness() -> Harness {
        let backend = Arc::new(FakeBackend::new());
        let queries = Arc::new(QueryClient::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(ChatStore::load(
            Box::new(SqliteSessionStorage::in_memory().unwrap()),
            "chat-storage",
        ));
        let chat = ChatCoordinator::new(
            backend.clone(),
            store,
            queries.clone(),
            notifier.clone(),
            ChatPolicy::default(),
        );
        Harness { backend, queries, notifier, chat }
    }

    #[test]
    fn length_bounds_follow_policy() {
        let policy = ChatPolicy::default();
        assert_eq!(validate("a", &policy), Err(ValidationError::TooShort { min: 2 }));
        assert_eq!(validate("  a  ", &policy), Err(ValidationError::TooShort { min: 2 }));
        assert!(validate("ab", &policy).is_ok());
        assert!(validate(&"x".repeat(400), &policy).is_ok());
        assert_eq!(validate(&"x".repeat(401), &policy), Err(ValidationError::TooLong { max: 400 }));

        let strict = ChatPolicy { min_len: 2, max_len: 100 };
        assert!(validate(&"x".repeat(101), &strict).is_err());
        assert!(validate(&"ż".repeat(100), &strict).is_ok());
    }

    #[tokio::test]
    async fn too_short_never_hits_the_network() {
        let h = harness();
        let err = h.chat.submit("a".into()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(h.backend.sends.lock().unwrap().is_empty());
        assert!(h.chat.store().is_empty());
    }

    #[tokio::test]
    async fn successful_send_appends_both_sides() {
        let h = harness();
        h.chat.set_draft("list my contacts");
        let reply = h.chat.submit("list my contacts".into()).await.unwrap();

        let session = h.chat.store().snapshot();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "list my contacts");
        assert_eq!(session.messages[1], reply);
        assert!(!session.is_typing);
        assert_eq!(h.chat.draft(), "");
        assert_eq!(h.chat.state(), SubmissionState::Success);
        assert_eq!(h.queries.generation(QueryKey::Contacts), 1);
    }

    #[tokio::test]
    async fn failed_send_restores_draft_and_offers_retry() {
        let h = harness();
        h.backend.fail_next(2);
        let err = h.chat.submit("add Ann please".into()).await.unwrap_err();
        match err {
            SubmitError::Failed { unsent, .. } => assert_eq!(unsent, "add Ann please"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.chat.draft(), "add Ann please");

        let session = h.chat.store().snapshot();
        assert_eq!(session.messages.len(), 1);
        assert!(session.messages.iter().all(|m| m.role == Role::User));
        assert!(!session.is_typing);
        assert_eq!(h.queries.generation(QueryKey::Contacts), 0);

        let toast = h.notifier.last().unwrap();
        assert_eq!(toast.action, Some(RecoveryAction::RetryChat("add Ann please".into())));
    }

    #[tokio::test]
    async fn retry_resends_without_duplicating_user_message() {
        let h = harness();
        h.backend.fail_next(2);
        let _ = h.chat.submit("add Ann please".into()).await;
        h.chat.retry("add Ann please".into()).await.unwrap();

        let session = h.chat.store().snapshot();
        let roles: Vec<_> = session.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(h.backend.sends.lock().unwrap().last().unwrap(), "add Ann please");
    }

    #[tokio::test]
    async fn retry_keeps_text_typed_after_the_failure() {
        let h = harness();
        h.backend.fail_next(2);
        let _ = h.chat.submit("add Ann please".into()).await;
        assert_eq!(h.chat.draft(), "add Ann please");

        h.chat.set_draft("and Bob too");
        h.chat.retry("add Ann please".into()).await.unwrap();
        assert_eq!(h.chat.draft(), "and Bob too");

        h.backend.fail_next(2);
        let _ = h.chat.submit("add Carl".into()).await;
        assert!(h.chat.clear_draft_if_unchanged("add Carl"));
        assert_eq!(h.chat.draft(), "");
    }

    #[tokio::test]
    async fn failed_greeting_falls_back_once() {
        let h = harness();
        h.backend.fail_next(1);
        let guard = BootstrapGuard::new();
        h.chat.bootstrap(&guard).await;
        h.chat.bootstrap(&guard).await;

        let session = h.chat.store().snapshot();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].id, FALLBACK_GREETING_ID);
        assert_eq!(session.messages[0].role, Role::Assistant);
        assert_eq!(h.backend.greetings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn greeting_is_fetched_only_for_empty_history() {
        let h = harness();
        h.chat.submit("hello there".into()).await.unwrap();
        h.chat.bootstrap(&BootstrapGuard::new()).await;
        assert_eq!(h.backend.greetings.load(Ordering::SeqCst), 0);
        assert_eq!(h.chat.store().snapshot().messages.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_bootstrap_leaves_session_alone() {
        let h = harness();
        let guard = BootstrapGuard::new();
        guard.cancel();
        h.chat.bootstrap(&guard).await;
        assert!(h.chat.store().is_empty());
    }

    #[tokio::test]
    async fn server_greeting_is_used_when_available() {
        let h = harness();
        h.chat.bootstrap(&BootstrapGuard::new()).await;
        let session = h.chat.store().snapshot();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].id, "hello-1");
    }
}
