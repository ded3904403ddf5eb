use gtk4::prelude::*;
use gtk4 as gtk;
use gtk4::glib;
use std::cell::RefCell;
use std::rc::Rc;

use contactbook::api::models::Contact;
use contactbook::app::AppContext;
use contactbook::contacts::form::ContactForm;

/// Add dialog when `existing` is `None`, edit dialog otherwise. Stays open
/// with the typed values on any failure.
pub fn show_contact_dialog(parent: &gtk::Window, ctx: Rc<AppContext>, existing: Option<Contact>) {
    let title = if existing.is_some() { "Edit Contact" } else { "Add Contact" };
    let dialog = gtk::Dialog::builder()
        .title(title)
        .transient_for(parent)
        .modal(true)
        .build();
    let content = gtk::Box::new(gtk::Orientation::Vertical, 12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);

    let form = Rc::new(RefCell::new(match &existing {
        Some(c) => ContactForm::prefilled(&c.snapshot()),
        None => ContactForm::new(),
    }));

    let name_entry = gtk::Entry::new();
    name_entry.set_placeholder_text(Some("Name"));
    name_entry.set_text(&form.borrow().name);
    content.append(&name_entry);

    let phone_entry = gtk::Entry::new();
    phone_entry.set_placeholder_text(Some("Phone number with country code, e.g. +48 500 100 200"));
    phone_entry.set_text(&form.borrow().phone);
    phone_entry.set_input_purpose(gtk::InputPurpose::Phone);
    content.append(&phone_entry);

    let error = gtk::Label::new(None);
    error.add_css_class("error");
    error.set_halign(gtk::Align::Start);
    error.set_wrap(true);
    error.set_visible(false);
    content.append(&error);

    dialog.set_child(Some(&content));
    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let ok_btn = dialog.add_button("Submit", gtk::ResponseType::Ok);
    ok_btn.add_css_class("suggested-action");
    dialog.set_default_response(gtk::ResponseType::Ok);

    let show_error = {
        let error = error.clone();
        move |form: &ContactForm| {
            error.set_label(form.error().unwrap_or_default());
            error.set_visible(form.error().is_some());
        }
    };

    dialog.connect_response(move |dlg, resp| {
        if resp != gtk::ResponseType::Ok {
            dlg.close();
            return;
        }
        let fields = {
            let mut f = form.borrow_mut();
            f.name = name_entry.text().to_string();
            f.phone = phone_entry.text().to_string();
            let res = f.validate();
            show_error(&*f);
            match res {
                Ok(fields) => fields,
                Err(_) => return,
            }
        };

        ok_btn.set_sensitive(false);
        let coordinator = ctx.contacts.clone();
        let target = existing.clone();
        let rx = crate::ui::run_async_to_main(async move {
            match target {
                Some(c) => coordinator
                    .update(Contact { id: c.id, name: fields.name, phone: fields.phone })
                    .await
                    .map(|_| ()),
                None => coordinator.add(fields).await.map(|_| ()),
            }
        });

        let dlg = dlg.clone();
        let form = form.clone();
        let ok_btn = ok_btn.clone();
        let show_error = show_error.clone();
        crate::ui::attach(rx, move |res| {
            ok_btn.set_sensitive(true);
            match res {
                Ok(()) => {
                    form.borrow_mut().reset();
                    dlg.close();
                }
                Err(e) => {
                    let mut f = form.borrow_mut();
                    f.submit_failed(&e);
                    show_error(&*f);
                }
            }
            glib::ControlFlow::Continue
        });
    });

    dialog.present();
}
