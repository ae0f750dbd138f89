use adw::prelude::*;
use relm4::prelude::*;

use crate::config;
use crate::models::Settings;

/// Form that collects the identifiers every request is made with.
/// Shown at first launch and again when the user edits their settings.
pub struct OnboardingWindow {
    company_id: String,
    customer_phone: String,
    customer_name: String,
    api_base_url: String,
    error: Option<String>,
    editing: bool,
}

#[derive(Debug)]
pub enum OnboardingMsg {
    CompanyIdChanged(String),
    PhoneChanged(String),
    NameChanged(String),
    ApiBaseChanged(String),
    Submit,
    Cancel,
}

#[derive(Debug)]
pub enum OnboardingOutput {
    Submitted(Settings),
    Cancelled,
}

#[relm4::component(pub, async)]
impl AsyncComponent for OnboardingWindow {
    type Init = Option<Settings>;
    type Input = OnboardingMsg;
    type Output = OnboardingOutput;
    type CommandOutput = ();

    view! {
        adw::Window {
            #[watch]
            set_title: Some(if model.editing { "Edit Settings" } else { "Welcome to Chat Probe" }),
            set_default_width: 520,
            set_default_height: -1,
            set_modal: true,

            adw::ToolbarView {
                add_top_bar = &adw::HeaderBar {
                    set_show_end_title_buttons: false,

                    pack_start = &gtk::Button {
                        set_label: "Cancel",
                        #[watch]
                        set_visible: model.editing,
                        connect_clicked => OnboardingMsg::Cancel,
                    },

                    pack_end = &gtk::Button {
                        #[watch]
                        set_label: if model.editing { "Save" } else { "Start Chatting" },
                        add_css_class: "suggested-action",
                        #[watch]
                        set_sensitive: model.is_submittable(),
                        connect_clicked => OnboardingMsg::Submit,
                    },
                },

                #[wrap(Some)]
                set_content = &adw::Clamp {
                    set_maximum_size: 440,
                    set_margin_all: 16,

                    gtk::Box {
                        set_orientation: gtk::Orientation::Vertical,
                        set_spacing: 16,

                        gtk::Label {
                            set_label: "Enter the company and customer this session speaks as",
                            add_css_class: "dim-label",
                            set_wrap: true,
                        },

                        adw::PreferencesGroup {
                            set_title: "Customer",

                            #[name = "company_row"]
                            adw::EntryRow {
                                set_title: "Company ID",
                                connect_changed[sender] => move |entry| {
                                    sender.input(OnboardingMsg::CompanyIdChanged(entry.text().to_string()));
                                },
                                connect_entry_activated => OnboardingMsg::Submit,
                            },

                            #[name = "phone_row"]
                            adw::EntryRow {
                                set_title: "Customer Phone",
                                set_input_purpose: gtk::InputPurpose::Phone,
                                connect_changed[sender] => move |entry| {
                                    sender.input(OnboardingMsg::PhoneChanged(entry.text().to_string()));
                                },
                                connect_entry_activated => OnboardingMsg::Submit,
                            },

                            #[name = "name_row"]
                            adw::EntryRow {
                                set_title: "Customer Name (optional)",
                                connect_changed[sender] => move |entry| {
                                    sender.input(OnboardingMsg::NameChanged(entry.text().to_string()));
                                },
                                connect_entry_activated => OnboardingMsg::Submit,
                            },
                        },

                        adw::PreferencesGroup {
                            set_title: "Backend",
                            set_description: Some(&format!(
                                "Leave empty to use ${} or {}",
                                config::API_BASE_ENV,
                                config::DEFAULT_API_BASE
                            )),

                            #[name = "api_base_row"]
                            adw::EntryRow {
                                set_title: "API Base URL (optional)",
                                set_input_purpose: gtk::InputPurpose::Url,
                                connect_changed[sender] => move |entry| {
                                    sender.input(OnboardingMsg::ApiBaseChanged(entry.text().to_string()));
                                },
                                connect_entry_activated => OnboardingMsg::Submit,
                            },
                        },

                        gtk::Label {
                            add_css_class: "error",
                            set_wrap: true,
                            #[watch]
                            set_label: model.error.as_deref().unwrap_or(""),
                            #[watch]
                            set_visible: model.error.is_some(),
                        },
                    },
                },
            },
        }
    }

    async fn init(
        existing: Self::Init,
        root: Self::Root,
        sender: AsyncComponentSender<Self>,
    ) -> AsyncComponentParts<Self> {
        let editing = existing.is_some();
        let existing = existing.unwrap_or(Settings {
            company_id: String::new(),
            customer_phone: String::new(),
            customer_name: None,
            api_base_url: None,
        });

        let model = Self {
            company_id: existing.company_id.clone(),
            customer_phone: existing.customer_phone.clone(),
            customer_name: existing.customer_name.clone().unwrap_or_default(),
            api_base_url: existing.api_base_url.clone().unwrap_or_default(),
            error: None,
            editing,
        };

        let widgets = view_output!();

        // Pre-fill after the view exists; the changed handlers keep the model in sync
        widgets.company_row.set_text(&model.company_id);
        widgets.phone_row.set_text(&model.customer_phone);
        widgets.name_row.set_text(&model.customer_name);
        widgets.api_base_row.set_text(&model.api_base_url);

        AsyncComponentParts { model, widgets }
    }

    async fn update(
        &mut self,
        msg: Self::Input,
        sender: AsyncComponentSender<Self>,
        root: &Self::Root,
    ) {
        match msg {
            OnboardingMsg::CompanyIdChanged(text) => {
                self.company_id = text;
                self.error = None;
            }
            OnboardingMsg::PhoneChanged(text) => {
                self.customer_phone = text;
                self.error = None;
            }
            OnboardingMsg::NameChanged(text) => self.customer_name = text,
            OnboardingMsg::ApiBaseChanged(text) => {
                self.api_base_url = text;
                self.error = None;
            }
            OnboardingMsg::Submit => match self.validate() {
                Ok(settings) => {
                    // Send output BEFORE closing - closing may tear down the component
                    let _ = sender.output(OnboardingOutput::Submitted(settings));
                    root.close();
                }
                Err(e) => self.error = Some(e),
            },
            OnboardingMsg::Cancel => {
                let _ = sender.output(OnboardingOutput::Cancelled);
                root.close();
            }
        }
    }
}

impl OnboardingWindow {
    fn is_submittable(&self) -> bool {
        !self.company_id.trim().is_empty() && !self.customer_phone.trim().is_empty()
    }

    fn validate(&self) -> Result<Settings, String> {
        let settings = Settings::from_form(
            &self.company_id,
            &self.customer_phone,
            &self.customer_name,
            &self.api_base_url,
        )
        .map_err(|e| e.to_string())?;

        if let Some(base) = &settings.api_base_url {
            match url::Url::parse(base) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => return Err(format!("'{}' is not an http(s) URL", base)),
            }
        }

        Ok(settings)
    }
}
