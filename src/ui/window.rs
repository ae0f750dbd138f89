use adw::prelude::*;
use relm4::prelude::*;
use url::Url;

use crate::app::AppMsg;
use crate::config;
use crate::models::Settings;
use crate::ui::onboarding::{OnboardingOutput, OnboardingWindow};

pub fn create_about_dialog(parent: &adw::ApplicationWindow) {
    let about = adw::AboutWindow::builder()
        .application_name(config::APP_NAME)
        .version(config::VERSION)
        .developer_name("Chat Probe Contributors")
        .license_type(gtk::License::Gpl30)
        .comments("Exercise a conversational-AI messaging backend from the desktop")
        .application_icon(config::APP_ID)
        .build();
    about.set_transient_for(Some(parent));
    about.present();
}

pub fn create_shortcuts_window(parent: &adw::ApplicationWindow) {
    let window = gtk::ShortcutsWindow::builder()
        .transient_for(parent)
        .modal(true)
        .build();

    let general_group = gtk::ShortcutsGroup::builder().title("General").build();
    for (title, accel) in [
        ("Open location", "<Control>l"),
        ("Copy location", "<Control><Shift>c"),
        ("Reset conversation", "<Control>n"),
        ("Reload history", "<Control>r"),
        ("Toggle inspector", "<Control>i"),
    ] {
        let shortcut = gtk::ShortcutsShortcut::builder()
            .title(title)
            .accelerator(accel)
            .build();
        general_group.add_shortcut(&shortcut);
    }

    let chat_group = gtk::ShortcutsGroup::builder().title("Chat").build();
    for (title, accel) in [("Send message", "Return"), ("New line", "<Shift>Return")] {
        let shortcut = gtk::ShortcutsShortcut::builder()
            .title(title)
            .accelerator(accel)
            .build();
        chat_group.add_shortcut(&shortcut);
    }

    let section = gtk::ShortcutsSection::builder()
        .title(config::APP_NAME)
        .build();
    section.add_group(&general_group);
    section.add_group(&chat_group);

    window.add_section(&section);
    window.present();
}

/// Ask for a session location (full url or bare thread id) and hand it to the app.
pub fn create_location_dialog(
    parent: &adw::ApplicationWindow,
    sender: &relm4::Sender<AppMsg>,
    current: &Url,
) {
    let entry = gtk::Entry::builder()
        .text(current.as_str())
        .activates_default(true)
        .hexpand(true)
        .build();

    let dialog = adw::AlertDialog::builder()
        .heading("Open Location")
        .body("Paste a chatprobe://chat?thread_id=… location or a bare thread id")
        .extra_child(&entry)
        .build();
    dialog.add_responses(&[("cancel", "Cancel"), ("open", "Open")]);
    dialog.set_response_appearance("open", adw::ResponseAppearance::Suggested);
    dialog.set_default_response(Some("open"));
    dialog.set_close_response("cancel");

    let sender = sender.clone();
    dialog.connect_response(None, move |_, response| {
        if response == "open" {
            sender.emit(AppMsg::OpenLocation(entry.text().to_string()));
        }
    });

    dialog.present(Some(parent));
}

pub fn create_reset_settings_dialog(parent: &adw::ApplicationWindow, sender: &relm4::Sender<AppMsg>) {
    let dialog = adw::AlertDialog::builder()
        .heading("Reset Settings?")
        .body("The saved company and customer will be forgotten and the conversation cleared.")
        .build();
    dialog.add_responses(&[("cancel", "Cancel"), ("reset", "Reset")]);
    dialog.set_response_appearance("reset", adw::ResponseAppearance::Destructive);
    dialog.set_close_response("cancel");

    let sender = sender.clone();
    dialog.connect_response(None, move |_, response| {
        if response == "reset" {
            sender.emit(AppMsg::ResetSettings);
        }
    });

    dialog.present(Some(parent));
}

pub fn create_onboarding(
    parent: &adw::ApplicationWindow,
    sender: &relm4::Sender<AppMsg>,
    existing: Option<Settings>,
) -> AsyncController<OnboardingWindow> {
    let onboarding = OnboardingWindow::builder().launch(existing).forward(
        sender,
        |output| match output {
            OnboardingOutput::Submitted(settings) => AppMsg::SettingsSubmitted(settings),
            OnboardingOutput::Cancelled => AppMsg::OnboardingCancelled,
        },
    );

    onboarding.widget().set_transient_for(Some(parent));
    onboarding.widget().present();

    onboarding
}
