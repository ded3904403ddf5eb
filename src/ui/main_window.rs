use adw::prelude::*;
use adw::Application;
use gtk4::glib;
use std::rc::Rc;
use std::sync::Arc;

use contactbook::app::AppContext;
use contactbook::config::Config;
use contactbook::notify::{RecoveryAction, Toast};

use crate::ui::{UiEvent, UiSender};

pub fn show_main_window(app: &Application) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Contacts")
        .default_width(1080)
        .default_height(720)
        .build();

    let (tx, rx) = crate::ui::ui_channel::<UiEvent>();
    let events = Arc::new(UiSender::new(tx));
    let ctx = Rc::new(AppContext::new(
        Config::load(),
        events.clone(),
        AppContext::default_persistence(),
    ));
    {
        let events = events.clone();
        ctx.queries.subscribe(move |_| events.send(UiEvent::ContactsInvalidated));
    }
    {
        let events = events.clone();
        ctx.chat
            .store()
            .subscribe(move |session| events.send(UiEvent::Session(session.clone())));
    }

    let overlay = adw::ToastOverlay::new();

    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .flap_position(gtk4::PackType::End)
        .build();

    let sidebar = crate::ui::sidebar::Sidebar::new(ctx.clone(), window.clone().upcast());
    split.set_flap(Some(&sidebar.widget()));

    let chat = crate::ui::chat_view::ChatView::new(ctx.clone());
    split.set_content(Some(&chat.widget()));

    overlay.set_child(Some(&split));

    let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk4::Label::new(Some("Contacts"));
    header.set_title_widget(Some(&title));

    let toggle_btn = gtk4::ToggleButton::builder()
        .icon_name("sidebar-show-right-symbolic")
        .active(true)
        .tooltip_text("Toggle sidebar")
        .build();
    header.pack_end(&toggle_btn);
    let add_btn = gtk4::Button::with_label("Add contact");
    add_btn.add_css_class("suggested-action");
    header.pack_end(&add_btn);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));
    crate::ui::load_css();
    window.present();

    {
        let split = split.clone();
        toggle_btn.connect_toggled(move |btn| split.set_reveal_flap(btn.is_active()));
    }
    {
        let ctx = ctx.clone();
        let parent: gtk4::Window = window.clone().upcast();
        add_btn.connect_clicked(move |_| {
            crate::ui::contact_dialog::show_contact_dialog(&parent, ctx.clone(), None);
        });
    }
    {
        let chat = chat.clone();
        window.connect_close_request(move |_| {
            chat.unmount();
            glib::Propagation::Proceed
        });
    }

    {
        let ctx = ctx.clone();
        let sidebar = sidebar.clone();
        let chat = chat.clone();
        crate::ui::attach(rx, move |event| {
            match event {
                UiEvent::Toast(toast) => show_toast(&overlay, &ctx, &chat, toast),
                UiEvent::ContactsInvalidated => sidebar.refresh(),
                UiEvent::Session(session) => chat.render(&session),
            }
            glib::ControlFlow::Continue
        });
    }

    sidebar.refresh();
    chat.mount();
}

fn show_toast(
    overlay: &adw::ToastOverlay,
    ctx: &Rc<AppContext>,
    chat: &Rc<crate::ui::chat_view::ChatView>,
    toast: Toast,
) {
    let title = match &toast.description {
        Some(desc) => format!("{}: {}", toast.title, desc),
        None => toast.title.clone(),
    };
    let widget = adw::Toast::new(&title);
    widget.set_timeout(ctx.config.toast_timeout_secs);

    if let Some(action) = toast.action {
        widget.set_button_label(Some(action.label()));
        let ctx = ctx.clone();
        let chat = chat.clone();
        widget.connect_button_clicked(move |_| match action.clone() {
            RecoveryAction::RetryChat(content) => chat.retry(content),
            other => {
                let coordinator = ctx.contacts.clone();
                contactbook::utils::spawn_async(async move {
                    let _ = coordinator.recover(other).await;
                });
            }
        });
    }

    overlay.add_toast(widget);
}
