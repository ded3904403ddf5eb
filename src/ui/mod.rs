pub mod chat_view;
pub mod contact_dialog;
pub mod main_window;
pub mod sidebar;

use contactbook::chat::store::ChatSession;
use contactbook::notify::{Notifier, Toast};
use gtk4::glib;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Everything background work needs the main loop to react to.
pub enum UiEvent {
    Toast(Toast),
    ContactsInvalidated,
    Session(ChatSession),
}

pub fn ui_channel<T: Send + 'static>() -> (UnboundedSender<T>, UnboundedReceiver<T>) {
    unbounded_channel()
}

/// Drains `rx` on the GTK main loop until `f` breaks or every sender is gone.
pub fn attach<T, F>(mut rx: UnboundedReceiver<T>, mut f: F)
where
    T: 'static,
    F: FnMut(T) -> glib::ControlFlow + 'static,
{
    glib::MainContext::default().spawn_local(async move {
        while let Some(item) = rx.recv().await {
            if matches!(f(item), glib::ControlFlow::Break) {
                break;
            }
        }
    });
}

pub fn run_async_to_main<T, E, Fut>(fut: Fut) -> UnboundedReceiver<Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
    Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
{
    let (tx, rx) = ui_channel::<Result<T, E>>();
    contactbook::utils::spawn_async(async move {
        let res = fut.await;
        let _ = tx.send(res);
    });
    rx
}

/// Thread-safe handle onto the UI event channel.
pub struct UiSender(UnboundedSender<UiEvent>);

impl UiSender {
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self(tx)
    }

    pub fn send(&self, event: UiEvent) {
        let _ = self.0.send(event);
    }
}

impl Notifier for UiSender {
    fn notify(&self, toast: Toast) {
        self.send(UiEvent::Toast(toast));
    }
}

pub const AVATAR_COLORS: [(&str, &str); contactbook::contacts::list::AVATAR_PALETTE_LEN] = [
    ("#3b82f6", "white"),
    ("#22c55e", "white"),
    ("#a855f7", "white"),
    ("#ec4899", "white"),
    ("#6366f1", "white"),
    ("#ef4444", "white"),
    ("#eab308", "black"),
    ("#14b8a6", "white"),
    ("#f97316", "white"),
    ("#06b6d4", "white"),
    ("#f43f5e", "white"),
    ("#10b981", "white"),
];

pub fn load_css() {
    let mut css = String::from(
        ".avatar { border-radius: 9999px; min-width: 28px; min-height: 28px; font-weight: bold; }\n\
         .bubble { padding: 6px 10px; border-radius: 12px; }\n\
         .bubble.user { background: alpha(@accent_bg_color, 0.2); }\n\
         .bubble.assistant { background: alpha(@window_fg_color, 0.06); }\n",
    );
    for (idx, (bg, fg)) in AVATAR_COLORS.iter().enumerate() {
        css.push_str(&format!(".avatar-{idx} {{ background: {bg}; color: {fg}; }}\n"));
    }
    let provider = gtk4::CssProvider::new();
    provider.load_from_data(&css);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}
