use std::sync::Arc;

use adw::prelude::*;
use chrono::Utc;
use relm4::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::api::stream::run_push_channel;
use crate::api::{ApiClient, Backend, PushEvent, Resource};
use crate::config;
use crate::models::{ConversationContext, Message, RequestTrace, Settings};
use crate::services::chat::{self, ChatResult};
use crate::services::activity::Activity;
use crate::services::thread_sync::thread_id_from_lookup;
use crate::services::{
    ChangeOrigin, ConversationLog, Database, Location, LocationChange, SettingsStore, SyncAction,
    ThreadSync,
};
use crate::ui::chat_view::{ChatView, ChatViewMsg, ChatViewOutput};
use crate::ui::inspector::{InspectorMsg, InspectorPanel};
use crate::ui::onboarding::OnboardingWindow;

const SESSION_STARTED_BANNER: &str = "New session started";

pub struct App {
    store: Option<SettingsStore>,
    settings: Option<Settings>,
    client: ApiClient,
    backend: Arc<dyn Backend>,
    sync: ThreadSync,
    sync_started: bool,
    log: ConversationLog,
    context: ConversationContext,
    chat_view: Controller<ChatView>,
    inspector: Controller<InspectorPanel>,
    inspector_visible: bool,
    toast_overlay: adw::ToastOverlay,
    onboarding: Option<AsyncController<OnboardingWindow>>,
    activity: Activity,
    // Push channel
    push_cancel: Option<CancellationToken>,
    push_thread: Option<String>,
    push_connected: bool,
}

#[derive(Debug)]
pub enum AppMsg {
    InitComplete(Database),
    InitFailed(String),
    ShowToast(String),
    ShowOnboarding,
    EditSettings,
    SettingsSubmitted(Settings),
    OnboardingCancelled,
    ConfirmResetSettings,
    ResetSettings,
    SendMessage(String),
    ResetConversation,
    ReloadHistory,
    ResumeOpenThread,
    ShowOpenLocation,
    OpenLocation(String),
    CopyLocation,
    ToggleInspector,
    Inspect(RequestTrace),
    ShowAbout,
    ShowShortcuts,
}

#[derive(Debug)]
pub enum AppCmd {
    Initialized(Database),
    InitFailed(String),
    SettingsLoaded(Option<Settings>),
    SettingsSaved(Settings),
    SettingsCleared,
    StorageError(String),
    ChatReply {
        serial: u64,
        user_message_id: String,
        result: ChatResult,
    },
    HistoryLoaded {
        serial: u64,
        thread_id: String,
        result: Result<Vec<Message>, String>,
    },
    OpenThreadFound(Result<Option<String>, String>),
    Push {
        thread_id: String,
        event: PushEvent,
    },
}

#[relm4::component(pub, async)]
impl AsyncComponent for App {
    type Init = Location;
    type Input = AppMsg;
    type Output = ();
    type CommandOutput = AppCmd;

    view! {
        adw::ApplicationWindow {
            set_title: Some(config::APP_NAME),
            set_default_width: 1100,
            set_default_height: 760,
            set_width_request: 480,
            set_height_request: 420,

            #[local_ref]
            toast_overlay -> adw::ToastOverlay {
                #[wrap(Some)]
                set_child = &adw::ToolbarView {
                    add_top_bar = &adw::HeaderBar {
                        #[wrap(Some)]
                        set_title_widget = &adw::WindowTitle {
                            set_title: config::APP_NAME,
                            #[watch]
                            set_subtitle: model.sync.location().as_str(),
                        },

                        pack_start = &gtk::Button {
                            set_icon_name: "view-refresh-symbolic",
                            set_tooltip_text: Some("Reset conversation"),
                            #[watch]
                            set_sensitive: model.settings.is_some(),
                            connect_clicked => AppMsg::ResetConversation,
                        },

                        pack_start = &gtk::Image {
                            #[watch]
                            set_icon_name: Some(if model.push_connected {
                                "network-transmit-receive-symbolic"
                            } else {
                                "network-offline-symbolic"
                            }),
                            #[watch]
                            set_tooltip_text: Some(if model.push_connected {
                                "Live updates connected"
                            } else {
                                "Live updates disconnected"
                            }),
                            #[watch]
                            set_visible: model.push_thread.is_some(),
                        },

                        pack_end = &gtk::MenuButton {
                            set_icon_name: "open-menu-symbolic",
                            set_menu_model: Some(&Self::main_menu()),
                        },

                        pack_end = &gtk::ToggleButton {
                            set_icon_name: "system-search-symbolic",
                            set_tooltip_text: Some("Inspector"),
                            #[watch]
                            set_active: model.inspector_visible,
                            connect_clicked => AppMsg::ToggleInspector,
                        },
                    },

                    #[wrap(Some)]
                    set_content = &adw::OverlaySplitView {
                        set_sidebar_position: gtk::PackType::End,
                        set_min_sidebar_width: 300.0,
                        set_max_sidebar_width: 480.0,
                        #[watch]
                        set_show_sidebar: model.inspector_visible,
                        set_content: Some(model.chat_view.widget()),
                        set_sidebar: Some(model.inspector.widget()),
                    },
                },
            },
        }
    }

    async fn init(
        location: Self::Init,
        root: Self::Root,
        sender: AsyncComponentSender<Self>,
    ) -> AsyncComponentParts<Self> {
        let chat_view = ChatView::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                ChatViewOutput::SendMessage(text) => AppMsg::SendMessage(text),
                ChatViewOutput::Inspect(trace) => AppMsg::Inspect(trace),
            });
        chat_view.emit(ChatViewMsg::SetInputEnabled(false));

        let client = match ApiClient::new(&config::resolve_api_base(None)) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Ignoring ${}: {}", config::API_BASE_ENV, e);
                ApiClient::new(config::DEFAULT_API_BASE)
                    .expect("DEFAULT_API_BASE must be a valid URL")
            }
        };
        let backend: Arc<dyn Backend> = Arc::new(client.clone());

        let inspector = InspectorPanel::builder().launch(backend.clone()).detach();

        let toast_overlay = adw::ToastOverlay::new();
        toast_overlay.set_hexpand(true);
        toast_overlay.set_vexpand(true);

        tracing::info!("Starting at {}", location.url());

        let model = App {
            store: None,
            settings: None,
            client,
            backend,
            sync: ThreadSync::new(location),
            sync_started: false,
            log: ConversationLog::new(config::PUSH_DEDUP_WINDOW),
            context: ConversationContext::default(),
            chat_view,
            inspector,
            inspector_visible: false,
            toast_overlay: toast_overlay.clone(),
            onboarding: None,
            activity: Activity::default(),
            push_cancel: None,
            push_thread: None,
            push_connected: false,
        };

        let widgets = view_output!();

        // App actions and their accelerators
        let app = relm4::main_adw_application();
        let actions: [(&str, fn() -> AppMsg, &[&str]); 10] = [
            ("open-location", || AppMsg::ShowOpenLocation, &["<Control>l"]),
            ("copy-location", || AppMsg::CopyLocation, &["<Control><Shift>c"]),
            ("reset-conversation", || AppMsg::ResetConversation, &["<Control>n"]),
            ("reload-history", || AppMsg::ReloadHistory, &["<Control>r"]),
            ("resume-thread", || AppMsg::ResumeOpenThread, &[]),
            ("toggle-inspector", || AppMsg::ToggleInspector, &["<Control>i"]),
            ("edit-settings", || AppMsg::EditSettings, &["<Control>comma"]),
            ("reset-settings", || AppMsg::ConfirmResetSettings, &[]),
            ("show-shortcuts", || AppMsg::ShowShortcuts, &["<Control>slash"]),
            ("about", || AppMsg::ShowAbout, &[]),
        ];
        for (name, msg, accels) in actions {
            let action = gio::SimpleAction::new(name, None);
            let sender_action = sender.input_sender().clone();
            action.connect_activate(move |_, _| sender_action.emit(msg()));
            app.add_action(&action);
            if !accels.is_empty() {
                app.set_accels_for_action(&format!("app.{}", name), accels);
            }
        }

        sender.command(|out, _| {
            Box::pin(async move {
                let _ = match Database::new().await {
                    Ok(db) => out.send(AppCmd::Initialized(db)),
                    Err(e) => out.send(AppCmd::InitFailed(format!("{:#}", e))),
                };
            })
        });

        AsyncComponentParts { model, widgets }
    }

    async fn update(
        &mut self,
        msg: Self::Input,
        sender: AsyncComponentSender<Self>,
        root: &Self::Root,
    ) {
        match msg {
            AppMsg::InitComplete(db) => {
                let store = SettingsStore::new(db);
                self.store = Some(store.clone());
                sender.command(move |out, _| {
                    Box::pin(async move {
                        let _ = match store.load().await {
                            Ok(settings) => out.send(AppCmd::SettingsLoaded(settings)),
                            Err(e) => out.send(AppCmd::StorageError(format!(
                                "Failed to load settings: {:#}",
                                e
                            ))),
                        };
                    })
                });
            }
            AppMsg::InitFailed(err) => {
                tracing::error!("Initialization failed: {}", err);
                self.show_toast(&format!("Error: {}", err));
                // Without storage the session still works, settings just don't persist
                sender.input(AppMsg::ShowOnboarding);
            }
            AppMsg::ShowToast(msg) => self.show_toast(&msg),
            AppMsg::ShowOnboarding => {
                self.show_onboarding(root, sender.input_sender().clone(), None);
            }
            AppMsg::EditSettings => {
                let existing = self.settings.clone();
                self.show_onboarding(root, sender.input_sender().clone(), existing);
            }
            AppMsg::SettingsSubmitted(settings) => {
                self.onboarding = None;
                match self.store.clone() {
                    Some(store) => {
                        sender.command(move |out, _| {
                            Box::pin(async move {
                                let _ = match store.save(&settings).await {
                                    Ok(()) => out.send(AppCmd::SettingsSaved(settings)),
                                    Err(e) => out.send(AppCmd::StorageError(format!(
                                        "Failed to save settings: {:#}",
                                        e
                                    ))),
                                };
                            })
                        });
                    }
                    None => self.apply_settings(settings, &sender),
                }
            }
            AppMsg::OnboardingCancelled => {
                self.onboarding = None;
                if self.settings.is_none() {
                    self.show_toast("Company ID and phone are required to chat");
                }
            }
            AppMsg::ConfirmResetSettings => {
                crate::ui::window::create_reset_settings_dialog(root, sender.input_sender());
            }
            AppMsg::ResetSettings => match self.store.clone() {
                Some(store) => {
                    sender.command(move |out, _| {
                        Box::pin(async move {
                            let _ = match store.clear().await {
                                Ok(()) => out.send(AppCmd::SettingsCleared),
                                Err(e) => out.send(AppCmd::StorageError(format!(
                                    "Failed to clear settings: {:#}",
                                    e
                                ))),
                            };
                        })
                    });
                }
                None => self.forget_settings(root, &sender),
            },
            AppMsg::SendMessage(text) => self.handle_send_message(text, &sender),
            AppMsg::ResetConversation => {
                if self.log.is_empty() && self.sync.tracked_thread().is_none() {
                    return;
                }
                self.reset_conversation();
                self.show_toast("Conversation reset");
            }
            AppMsg::ReloadHistory => match self.sync.reload() {
                Some(SyncAction::FetchHistory(thread_id)) => {
                    self.fetch_history(thread_id, &sender)
                }
                None => self.show_toast("No thread to reload"),
            },
            AppMsg::ResumeOpenThread => {
                let Some(settings) = self.settings.clone() else {
                    self.show_toast("Configure your settings first");
                    return;
                };
                let backend = self.backend.clone();
                sender.oneshot_command(async move {
                    let resource = Resource::OpenThread {
                        company_id: settings.company_id,
                        customer_phone: settings.customer_phone,
                    };
                    let result = backend
                        .fetch(&resource)
                        .await
                        .map(|payload| thread_id_from_lookup(&payload))
                        .map_err(|e| e.to_string());
                    AppCmd::OpenThreadFound(result)
                });
            }
            AppMsg::ShowOpenLocation => {
                crate::ui::window::create_location_dialog(
                    root,
                    sender.input_sender(),
                    self.sync.location(),
                );
            }
            AppMsg::OpenLocation(input) => match Location::parse(&input) {
                Ok(location) => {
                    self.handle_location_change(
                        LocationChange {
                            url: location.url().clone(),
                            origin: ChangeOrigin::External,
                        },
                        &sender,
                    );
                }
                Err(e) => self.show_toast(&format!("Invalid location: {}", e)),
            },
            AppMsg::CopyLocation => {
                if let Some(display) = gtk::gdk::Display::default() {
                    display.clipboard().set_text(self.sync.location().as_str());
                    self.show_toast("Location copied");
                }
            }
            AppMsg::ToggleInspector => {
                self.inspector_visible = !self.inspector_visible;
            }
            AppMsg::Inspect(trace) => {
                self.inspector_visible = true;
                self.inspector.emit(InspectorMsg::ShowTrace(trace));
            }
            AppMsg::ShowAbout => crate::ui::window::create_about_dialog(root),
            AppMsg::ShowShortcuts => crate::ui::window::create_shortcuts_window(root),
        }
    }

    async fn update_cmd(
        &mut self,
        msg: Self::CommandOutput,
        sender: AsyncComponentSender<Self>,
        root: &Self::Root,
    ) {
        match msg {
            AppCmd::Initialized(db) => sender.input(AppMsg::InitComplete(db)),
            AppCmd::InitFailed(err) => sender.input(AppMsg::InitFailed(err)),
            AppCmd::SettingsLoaded(Some(settings)) => self.apply_settings(settings, &sender),
            AppCmd::SettingsLoaded(None) => {
                tracing::info!("No saved settings, starting onboarding");
                sender.input(AppMsg::ShowOnboarding);
            }
            AppCmd::SettingsSaved(settings) => {
                tracing::info!("Settings saved for company {}", settings.company_id);
                self.apply_settings(settings, &sender);
            }
            AppCmd::SettingsCleared => self.forget_settings(root, &sender),
            AppCmd::StorageError(err) => {
                tracing::error!("{}", err);
                self.show_toast(&err);
            }
            AppCmd::ChatReply {
                serial,
                user_message_id,
                result,
            } => {
                if !self.activity.finish_send(serial) {
                    tracing::debug!("Dropping reply to an abandoned conversation");
                    return;
                }
                self.handle_chat_reply(&user_message_id, result, &sender);
            }
            AppCmd::HistoryLoaded {
                serial,
                thread_id,
                result,
            } => {
                if !self.activity.finish_history(serial) {
                    tracing::debug!("Dropping stale history for thread {}", thread_id);
                    return;
                }
                self.sync_loading();
                if !self.sync.is_current(&thread_id) {
                    tracing::debug!("Dropping history for untracked thread {}", thread_id);
                    return;
                }
                match result {
                    Ok(messages) => {
                        self.log.replace_all(messages);
                        self.chat_view
                            .emit(ChatViewMsg::LoadMessages(self.log.messages().to_vec()));
                        self.chat_view.emit(ChatViewMsg::ShowBanner(None));
                        self.chat_view.emit(ChatViewMsg::ShowError(None));
                    }
                    Err(e) => {
                        tracing::error!("Failed to load history for {}: {}", thread_id, e);
                        let message = format!("Could not load the conversation history: {}", e);
                        self.chat_view
                            .emit(ChatViewMsg::ShowError(Some(message.clone())));
                        self.show_toast(&message);
                    }
                }
            }
            AppCmd::OpenThreadFound(Ok(Some(thread_id))) => {
                tracing::info!("Resuming open thread {}", thread_id);
                let url = Location::default().with_thread_id(Some(&thread_id));
                self.handle_location_change(
                    LocationChange {
                        url,
                        origin: ChangeOrigin::External,
                    },
                    &sender,
                );
            }
            AppCmd::OpenThreadFound(Ok(None)) => {
                self.show_toast("No open thread for this customer");
            }
            AppCmd::OpenThreadFound(Err(e)) => {
                tracing::warn!("Open thread lookup failed: {}", e);
                self.show_toast(&format!("Lookup failed: {}", e));
            }
            AppCmd::Push { thread_id, event } => {
                if self.push_thread.as_deref() != Some(thread_id.as_str()) {
                    return;
                }
                match event {
                    PushEvent::Connected => self.push_connected = true,
                    PushEvent::Disconnected { reason } => {
                        tracing::debug!("Push channel for {} down: {}", thread_id, reason);
                        self.push_connected = false;
                    }
                    PushEvent::OpenMessage { text } => {
                        match self.log.append_pushed(&text, Utc::now()) {
                            Some(message) => self.chat_view.emit(ChatViewMsg::AddMessage(message)),
                            None => tracing::debug!("Dropped duplicate pushed message"),
                        }
                    }
                }
            }
        }
    }

    fn shutdown(&mut self, _widgets: &mut Self::Widgets, _output: relm4::Sender<Self::Output>) {
        if let Some(token) = self.push_cancel.take() {
            token.cancel();
        }
    }
}

impl App {
    fn main_menu() -> gio::Menu {
        let menu = gio::Menu::new();

        let session = gio::Menu::new();
        session.append(Some("Open Location…"), Some("app.open-location"));
        session.append(Some("Copy Location"), Some("app.copy-location"));
        session.append(Some("Resume Open Thread"), Some("app.resume-thread"));
        session.append(Some("Reload History"), Some("app.reload-history"));
        session.append(Some("Reset Conversation"), Some("app.reset-conversation"));
        menu.append_section(None, &session);

        let settings = gio::Menu::new();
        settings.append(Some("Edit Settings…"), Some("app.edit-settings"));
        settings.append(Some("Reset Settings…"), Some("app.reset-settings"));
        menu.append_section(None, &settings);

        let about = gio::Menu::new();
        about.append(Some("Keyboard Shortcuts"), Some("app.show-shortcuts"));
        about.append(Some("About Chat Probe"), Some("app.about"));
        menu.append_section(None, &about);

        menu
    }

    fn show_toast(&self, message: &str) {
        let toast = adw::Toast::new(message);
        toast.set_timeout(3);
        self.toast_overlay.add_toast(toast);
    }

    fn show_onboarding(
        &mut self,
        parent: &adw::ApplicationWindow,
        sender: relm4::Sender<AppMsg>,
        existing: Option<Settings>,
    ) {
        self.onboarding = Some(crate::ui::window::create_onboarding(
            parent, &sender, existing,
        ));
    }

    /// Make `settings` current: rebuild the client for its base URL and,
    /// on first configuration, start following the session location.
    fn apply_settings(&mut self, settings: Settings, sender: &AsyncComponentSender<Self>) {
        let base = config::resolve_api_base(settings.api_base_url.as_deref());
        if base != self.client.base_url().as_str().trim_end_matches('/') {
            match ApiClient::new(&base) {
                Ok(client) => {
                    tracing::info!("Using backend {}", client.base_url());
                    self.backend = Arc::new(client.clone());
                    self.client = client;
                    self.inspector
                        .emit(InspectorMsg::SetBackend(self.backend.clone()));
                    // Reconnect against the new base
                    self.stop_push();
                }
                Err(e) => self.show_toast(&format!("Keeping previous backend: {}", e)),
            }
        }

        self.inspector
            .emit(InspectorMsg::SetSettings(Some(settings.clone())));
        self.settings = Some(settings);
        self.chat_view.emit(ChatViewMsg::SetInputEnabled(true));

        if !self.sync_started {
            self.sync_started = true;
            if let Some(SyncAction::FetchHistory(thread_id)) = self.sync.start() {
                self.fetch_history(thread_id, sender);
            }
            self.inspector
                .emit(InspectorMsg::SetThread(self.sync.tracked_thread().map(str::to_string)));
        }
        self.reconnect_push(sender);
    }

    fn forget_settings(&mut self, root: &adw::ApplicationWindow, sender: &AsyncComponentSender<Self>) {
        tracing::info!("Settings cleared");
        self.settings = None;
        self.inspector.emit(InspectorMsg::SetSettings(None));
        self.reset_conversation();
        self.sync_started = false;
        self.chat_view.emit(ChatViewMsg::SetInputEnabled(false));
        self.show_onboarding(root, sender.input_sender().clone(), None);
    }

    fn handle_send_message(&mut self, text: String, sender: &AsyncComponentSender<Self>) {
        let text = text.trim().to_string();
        if text.is_empty() || self.activity.is_sending() {
            return;
        }
        let Some(settings) = self.settings.clone() else {
            self.show_toast("Configure your settings first");
            return;
        };

        let user_message = Message::user(&text);
        let user_message_id = user_message.id.clone();
        self.log.push(user_message.clone());
        self.chat_view.emit(ChatViewMsg::AddMessage(user_message));
        self.chat_view.emit(ChatViewMsg::ShowError(None));

        let serial = self.activity.begin_send();
        self.sync_loading();

        let backend = self.backend.clone();
        let location = self.sync.location().clone();
        sender.oneshot_command(async move {
            let result = chat::send_message(backend, settings, text, Some(location)).await;
            AppCmd::ChatReply {
                serial,
                user_message_id,
                result,
            }
        });
    }

    fn handle_chat_reply(
        &mut self,
        user_message_id: &str,
        result: ChatResult,
        sender: &AsyncComponentSender<Self>,
    ) {
        self.sync_loading();

        if !result.context.is_empty() {
            self.context.merge(result.context.clone());
            self.inspector.emit(InspectorMsg::SetContext(self.context.clone()));
        }
        self.inspector.emit(InspectorMsg::SetTrace(result.trace.clone()));

        if let Some(err) = &result.error {
            tracing::error!("Send failed: {}", err);
            self.chat_view.emit(ChatViewMsg::ShowError(Some(err.clone())));
            self.show_toast(err);
        }

        let reply_sync = self
            .sync
            .apply_reply(result.context.thread_id.as_deref(), result.action);

        if reply_sync.thread_switched {
            tracing::info!("Backend switched threads, keeping only the latest exchange");
            self.log.start_new_session(user_message_id, result.reply);
            self.chat_view
                .emit(ChatViewMsg::LoadMessages(self.log.messages().to_vec()));
            self.chat_view
                .emit(ChatViewMsg::ShowBanner(Some(SESSION_STARTED_BANNER.to_string())));
        } else {
            self.log.push(result.reply.clone());
            self.chat_view.emit(ChatViewMsg::AddMessage(result.reply));
        }

        if let Some(notice) = reply_sync.notice {
            let message = Message::system(notice);
            self.log.push(message.clone());
            self.chat_view.emit(ChatViewMsg::AddMessage(message));
        }

        if reply_sync.location_change.is_some() {
            self.inspector
                .emit(InspectorMsg::SetThread(self.sync.tracked_thread().map(str::to_string)));
            self.reconnect_push(sender);
        }
    }

    /// Follow a location the user opened. Loads history when the thread changed.
    fn handle_location_change(&mut self, change: LocationChange, sender: &AsyncComponentSender<Self>) {
        if !self.sync_started {
            // Picked up by `sync.start()` once settings exist
            if let Ok(location) = Location::parse(change.url.as_str()) {
                self.sync = ThreadSync::new(location);
            }
            return;
        }

        let previous = self.sync.tracked_thread().map(str::to_string);
        let action = self.sync.observe(change);
        let current = self.sync.tracked_thread().map(str::to_string);

        if previous != current {
            // Anything in flight belongs to the thread being left
            self.activity.abandon();
            self.sync_loading();
            self.log.clear();
            self.chat_view.emit(ChatViewMsg::Clear);
            self.chat_view.emit(ChatViewMsg::ShowBanner(None));
        }
        self.inspector.emit(InspectorMsg::SetThread(current));

        if let Some(SyncAction::FetchHistory(thread_id)) = action {
            self.fetch_history(thread_id, sender);
        }
        self.reconnect_push(sender);
    }

    fn reset_conversation(&mut self) {
        tracing::info!("Resetting conversation ({} messages)", self.log.len());
        // Outstanding replies and history loads belong to the old conversation
        self.activity.abandon();
        self.sync_loading();

        self.log.clear();
        self.context = ConversationContext::default();
        self.chat_view.emit(ChatViewMsg::Clear);
        self.chat_view.emit(ChatViewMsg::ShowBanner(None));
        self.inspector.emit(InspectorMsg::SetContext(ConversationContext::default()));
        self.inspector.emit(InspectorMsg::SetThread(None));

        self.sync.reset();
        self.stop_push();
    }

    fn fetch_history(&mut self, thread_id: String, sender: &AsyncComponentSender<Self>) {
        tracing::info!("Loading history for thread {}", thread_id);
        let serial = self.activity.begin_history();
        self.sync_loading();

        let backend = self.backend.clone();
        let location = self.sync.location().clone();
        sender.oneshot_command(async move {
            let result = chat::load_history(backend, thread_id.clone(), Some(location))
                .await
                .map_err(|e| e.to_string());
            AppCmd::HistoryLoaded {
                serial,
                thread_id,
                result,
            }
        });
    }

    fn sync_loading(&self) {
        self.chat_view
            .emit(ChatViewMsg::SetLoading(self.activity.is_busy()));
    }

    /// Bind the push channel to the tracked thread, replacing any previous connection.
    fn reconnect_push(&mut self, sender: &AsyncComponentSender<Self>) {
        let target = self.sync.push_target().map(str::to_string);
        if target == self.push_thread && (target.is_none() || self.push_cancel.is_some()) {
            return;
        }
        self.stop_push();

        let Some(thread_id) = target else {
            return;
        };
        let url = match self.client.stream_url(&thread_id) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot open push channel for {}: {}", thread_id, e);
                return;
            }
        };

        tracing::info!("Binding push channel to thread {}", thread_id);
        let cancel = CancellationToken::new();
        self.push_cancel = Some(cancel.clone());
        self.push_thread = Some(thread_id.clone());

        let http = self.client.http();
        sender.command(move |out, _| {
            Box::pin(async move {
                run_push_channel(http, url, cancel, |event| {
                    out.send(AppCmd::Push {
                        thread_id: thread_id.clone(),
                        event,
                    })
                    .is_ok()
                })
                .await;
            })
        });
    }

    fn stop_push(&mut self) {
        if let Some(token) = self.push_cancel.take() {
            token.cancel();
        }
        self.push_thread = None;
        self.push_connected = false;
    }
}
