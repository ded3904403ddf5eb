use crate::api::models::Contact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// The single recovery affordance a toast may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-create a deleted contact from its last-known fields. The backend
    /// assigns a new id, so identity is not preserved.
    Undo(Contact),
    /// A failed Undo. Still holds the deleted contact so it can be tried again.
    RetryRestore(Contact),
    RetryDelete(Contact),
    RetryChat(String),
}

impl RecoveryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::Undo(_) => "Undo",
            RecoveryAction::RetryRestore(_)
            | RecoveryAction::RetryDelete(_)
            | RecoveryAction::RetryChat(_) => "Retry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
    pub action: Option<RecoveryAction>,
}

impl Toast {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            title: title.into(),
            description: None,
            action: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            ..Self::success(title)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_action(mut self, action: RecoveryAction) -> Self {
        self.action = Some(action);
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Logs toasts instead of showing them. Used when no UI is attached.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        log::info!("toast [{:?}] {}", toast.kind, toast.title);
    }
}
