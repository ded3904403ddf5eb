use gtk4::prelude::*;
use gtk4 as gtk;
use gtk4::glib;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use contactbook::api::gateway::ContactGateway;
use contactbook::api::models::Contact;
use contactbook::app::AppContext;
use contactbook::contacts::list::{avatar_palette_index, initials, ContactListView};
use contactbook::query::{QueryKey, QueryStatus};

pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    status: gtk::Label,
    view: RefCell<ContactListView>,
    fetching: Cell<bool>,
    ctx: Rc<AppContext>,
    window: gtk::Window,
}

impl Sidebar {
    pub fn new(ctx: Rc<AppContext>, window: gtk::Window) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(280);

        let title = gtk::Label::new(Some("Contacts"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        title.set_hexpand(true);
        let reload_btn = gtk::Button::from_icon_name("view-refresh-symbolic");
        reload_btn.add_css_class("flat");
        reload_btn.set_tooltip_text(Some("Reload contacts"));
        let title_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        title_row.append(&title);
        title_row.append(&reload_btn);
        root.append(&title_row);

        let search = gtk::SearchEntry::new();
        search.set_placeholder_text(Some("Find contact"));
        root.append(&search);

        let status = gtk::Label::new(Some("Loading..."));
        status.add_css_class("dim-label");
        status.set_halign(gtk::Align::Start);
        root.append(&status);

        let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::None);
        scroller.set_child(Some(&list));
        root.append(&scroller);

        let sidebar = Rc::new(Self {
            root,
            list,
            status,
            view: RefCell::new(ContactListView::new()),
            fetching: Cell::new(false),
            ctx,
            window,
        });

        {
            let sidebar = sidebar.clone();
            search.connect_search_changed(move |entry| {
                sidebar.view.borrow_mut().set_search(entry.text().to_string());
                sidebar.render();
            });
        }

        {
            let sidebar = sidebar.clone();
            // A failed fetch leaves the query stale, so this refetches it.
            reload_btn.connect_clicked(move |_| sidebar.refresh());
        }

        sidebar
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Refetches the contacts when they were invalidated since the last fetch.
    pub fn refresh(self: &Rc<Self>) {
        if self.fetching.get() || !self.view.borrow().needs_refresh(&self.ctx.queries) {
            return;
        }
        self.fetching.set(true);
        let generation = self.ctx.queries.generation(QueryKey::Contacts);
        let client = self.ctx.client.clone();
        let retry = self.ctx.config.retry_policy();
        let rx = crate::ui::run_async_to_main(async move { retry.run(|| client.list()).await });

        let sidebar = self.clone();
        crate::ui::attach(rx, move |res| {
            sidebar.fetching.set(false);
            sidebar.view.borrow_mut().apply(generation, res);
            sidebar.render();
            // Invalidated again while the request was in flight.
            if ContactListView::superseded(&sidebar.ctx.queries, generation) {
                sidebar.refresh();
            }
            glib::ControlFlow::Continue
        });
    }

    fn render(self: &Rc<Self>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let view = self.view.borrow();
        match view.query().status() {
            QueryStatus::Loading => self.status.set_label("Loading..."),
            QueryStatus::Failed(err) if view.query().data().is_none() => {
                self.status.set_label(&format!("Error: {err}"))
            }
            _ => self.status.set_label(""),
        }
        self.status.set_visible(!self.status.label().is_empty());

        for contact in view.visible() {
            self.list.append(&self.row(contact));
        }
    }

    fn row(self: &Rc<Self>, contact: &Contact) -> gtk::ListBoxRow {
        let row = gtk::ListBoxRow::new();
        let line = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        line.set_margin_top(6);
        line.set_margin_bottom(6);
        line.set_margin_start(6);
        line.set_margin_end(6);

        let avatar = gtk::Label::new(Some(&initials(&contact.name)));
        avatar.add_css_class("avatar");
        avatar.add_css_class(&format!("avatar-{}", avatar_palette_index(&contact.name)));
        line.append(&avatar);

        let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
        text.set_hexpand(true);
        let name = gtk::Label::new(Some(&contact.name));
        name.set_halign(gtk::Align::Start);
        name.set_ellipsize(gtk::pango::EllipsizeMode::End);
        let phone = gtk::Label::new(Some(&contact.phone));
        phone.add_css_class("dim-label");
        phone.add_css_class("caption");
        phone.set_halign(gtk::Align::Start);
        text.append(&name);
        text.append(&phone);
        line.append(&text);

        let edit_btn = gtk::Button::from_icon_name("document-edit-symbolic");
        edit_btn.add_css_class("flat");
        edit_btn.set_tooltip_text(Some("Edit contact"));
        let delete_btn = gtk::Button::from_icon_name("user-trash-symbolic");
        delete_btn.add_css_class("flat");
        delete_btn.set_tooltip_text(Some("Delete contact"));
        line.append(&edit_btn);
        line.append(&delete_btn);

        {
            let sidebar = self.clone();
            let contact = contact.clone();
            edit_btn.connect_clicked(move |_| {
                crate::ui::contact_dialog::show_contact_dialog(
                    &sidebar.window,
                    sidebar.ctx.clone(),
                    Some(contact.clone()),
                );
            });
        }
        {
            let coordinator = self.ctx.contacts.clone();
            let contact = contact.clone();
            delete_btn.connect_clicked(move |_| {
                // No confirmation: the toast offers Undo.
                let coordinator = coordinator.clone();
                let contact = contact.clone();
                contactbook::utils::spawn_async(async move {
                    let _ = coordinator.delete(&contact).await;
                });
            });
        }

        row.set_child(Some(&line));
        row
    }
}
