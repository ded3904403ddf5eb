mod ui;

use adw::prelude::*;
use adw::Application;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = Application::builder()
        .application_id("com.example.Contactbook")
        .build();
    app.connect_activate(|app| {
        crate::ui::main_window::show_main_window(app);
    });
    app.run();
}
