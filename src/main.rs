mod api;
mod app;
mod config;
mod models;
mod services;
mod ui;

use relm4::prelude::*;
use tracing_subscriber::EnvFilter;

use app::App;
use config::APP_ID;
use services::Location;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // `chatprobe [LOCATION]`: a chatprobe://chat?thread_id=... url or a bare thread id
    let location = match std::env::args().nth(1) {
        Some(arg) => Location::parse(&arg).unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid location '{}': {}", arg, e);
            Location::default()
        }),
        None => Location::default(),
    };

    let app = adw::Application::builder().application_id(APP_ID).build();

    // GTK would otherwise try to interpret the location argument itself
    let relm = RelmApp::from_app(app).with_args(Vec::new());
    relm.set_global_css(include_str!("../data/style.css"));
    relm.run_async::<App>(location);
}
