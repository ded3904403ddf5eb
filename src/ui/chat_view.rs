use gtk4::prelude::*;
use gtk4 as gtk;
use gtk4::glib;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;

use contactbook::api::models::{ChatMessage, Role};
use contactbook::app::AppContext;
use contactbook::chat::coordinator::{validate, BootstrapGuard};
use contactbook::chat::store::ChatSession;
use contactbook::error::SubmitError;

pub struct ChatView {
    root: gtk::Box,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    typing: gtk::Label,
    entry: gtk::Entry,
    send_btn: gtk::Button,
    error: gtk::Label,
    ctx: Rc<AppContext>,
    guard: BootstrapGuard,
}

impl ChatView {
    pub fn new(ctx: Rc<AppContext>) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        let typing = gtk::Label::new(Some("Assistant is typing…"));
        typing.add_css_class("dim-label");
        typing.set_halign(gtk::Align::Start);
        typing.set_visible(false);
        root.append(&typing);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Ask anything..."));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        let error = gtk::Label::new(None);
        error.add_css_class("error");
        error.set_halign(gtk::Align::Start);
        error.set_visible(false);
        root.append(&error);

        let hint = gtk::Label::new(Some("Chat history is not stored on the server."));
        hint.add_css_class("dim-label");
        hint.add_css_class("caption");
        hint.set_halign(gtk::Align::Start);
        root.append(&hint);

        let view = Rc::new(Self {
            root,
            scroller,
            messages_box,
            typing,
            entry,
            send_btn,
            error,
            ctx,
            guard: BootstrapGuard::new(),
        });

        {
            let chat = view.ctx.chat.clone();
            view.entry.connect_changed(move |e| chat.set_draft(e.text().to_string()));
        }
        {
            let v = view.clone();
            view.send_btn.connect_clicked(move |_| v.send());
        }
        {
            let v = view.clone();
            view.entry.connect_activate(move |_| v.send());
        }

        view.render(&view.ctx.chat.store().snapshot());
        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Fetches the greeting for an empty conversation.
    pub fn mount(&self) {
        let chat = self.ctx.chat.clone();
        let guard = self.guard.clone();
        contactbook::utils::spawn_async(async move {
            chat.bootstrap(&guard).await;
        });
    }

    pub fn unmount(&self) {
        self.guard.cancel();
    }

    pub fn render(&self, session: &ChatSession) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        for msg in &session.messages {
            let lbl = gtk::Label::new(Some(&msg.content));
            lbl.set_wrap(true);
            lbl.set_selectable(true);
            lbl.add_css_class("bubble");
            lbl.set_tooltip_text(Some(&msg.created_at.with_timezone(&chrono::Local).format("%H:%M").to_string()));
            match msg.role {
                Role::User => {
                    lbl.set_halign(gtk::Align::End);
                    lbl.add_css_class("user");
                }
                Role::Assistant => {
                    lbl.set_halign(gtk::Align::Start);
                    lbl.add_css_class("assistant");
                }
            }
            self.messages_box.append(&lbl);
        }
        self.typing.set_visible(session.is_typing);
        let adj = self.scroller.vadjustment();
        adj.set_value(adj.upper());
    }

    /// Puts content back into the input after a failed send.
    pub fn restore_input(&self, content: &str) {
        self.entry.set_text(content);
        self.entry.set_position(-1);
    }

    fn send(self: &Rc<Self>) {
        if self.ctx.chat.is_pending() {
            return;
        }
        let content = self.entry.text().to_string();
        if let Err(e) = validate(&content, &self.ctx.config.chat) {
            self.error.set_label(&e.to_string());
            self.error.set_visible(true);
            return;
        }
        self.error.set_visible(false);
        self.entry.set_text("");
        self.send_btn.set_sensitive(false);

        let chat = self.ctx.chat.clone();
        let rx = crate::ui::run_async_to_main(async move { chat.submit(content).await });
        self.finish_send(rx);
    }

    /// Resends a message from the error toast's Retry button.
    pub fn retry(self: &Rc<Self>, content: String) {
        if self.ctx.chat.is_pending() {
            return;
        }
        if content == self.entry.text().as_str() {
            self.restore_input("");
        }
        self.send_btn.set_sensitive(false);
        let chat = self.ctx.chat.clone();
        let rx = crate::ui::run_async_to_main(async move { chat.retry(content).await });
        self.finish_send(rx);
    }

    fn finish_send(self: &Rc<Self>, rx: UnboundedReceiver<Result<ChatMessage, SubmitError>>) {
        let view = self.clone();
        crate::ui::attach(rx, move |res| {
            view.send_btn.set_sensitive(true);
            match res {
                Ok(_) => {}
                Err(SubmitError::Failed { unsent, .. }) => view.restore_input(&unsent),
                Err(SubmitError::Validation(e)) => {
                    view.error.set_label(&e.to_string());
                    view.error.set_visible(true);
                }
            }
            glib::ControlFlow::Continue
        });
    }
}
