use gtk::prelude::*;
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;

use crate::models::{Message, RequestTrace};
use crate::ui::input_area::{InputArea, InputAreaMsg, InputAreaOutput};
use crate::ui::message_widget::{MessageWidget, MessageWidgetOutput};

pub struct ChatView {
    messages: FactoryVecDeque<MessageWidget>,
    input_area: Controller<InputArea>,
    loading: bool,
    scrolled_window: gtk::ScrolledWindow,
    user_scrolled_up: bool,
    error: Option<String>,
    banner: Option<String>,
}

#[derive(Debug)]
pub enum ChatViewMsg {
    AddMessage(Message),
    LoadMessages(Vec<Message>),
    Clear,
    SetLoading(bool),
    SetInputEnabled(bool),
    ShowError(Option<String>),
    ShowBanner(Option<String>),
    ScrollToBottom,
    ScrollPositionChanged,
    UserSendMessage(String),
    CopyToClipboard(String),
    ForwardInspect(RequestTrace),
}

#[derive(Debug)]
pub enum ChatViewOutput {
    SendMessage(String),
    Inspect(RequestTrace),
}

#[relm4::component(pub)]
impl Component for ChatView {
    type Init = ();
    type Input = ChatViewMsg;
    type Output = ChatViewOutput;
    type CommandOutput = ();

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_vexpand: true,

            // "New session started" and similar notices
            adw::Banner {
                #[watch]
                set_title: model.banner.as_deref().unwrap_or_default(),
                #[watch]
                set_revealed: model.banner.is_some(),
            },

            gtk::Overlay {
                set_vexpand: true,

                #[local_ref]
                scrolled_window -> gtk::ScrolledWindow {
                    set_vexpand: true,
                    set_hscrollbar_policy: gtk::PolicyType::Never,

                    #[local_ref]
                    message_list -> gtk::Box {
                        set_orientation: gtk::Orientation::Vertical,
                        set_spacing: 0,
                        set_margin_top: 8,
                        set_margin_bottom: 8,
                        set_margin_start: 16,
                        set_margin_end: 16,
                    },
                },

                add_overlay = &gtk::Button {
                    set_icon_name: "go-down-symbolic",
                    set_tooltip_text: Some("Scroll to bottom"),
                    set_halign: gtk::Align::Center,
                    set_valign: gtk::Align::End,
                    add_css_class: "circular",
                    add_css_class: "osd",
                    #[watch]
                    set_visible: model.user_scrolled_up,
                    connect_clicked => ChatViewMsg::ScrollToBottom,
                },
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_halign: gtk::Align::Start,
                set_margin_start: 20,
                set_margin_bottom: 8,
                set_spacing: 8,
                #[watch]
                set_visible: model.loading,

                gtk::Spinner {
                    set_spinning: true,
                },
                gtk::Label {
                    set_label: "Waiting for the assistant...",
                    add_css_class: "dim-label",
                },
            },

            gtk::Label {
                set_halign: gtk::Align::Start,
                set_margin_start: 20,
                set_margin_end: 20,
                set_margin_bottom: 8,
                set_wrap: true,
                set_xalign: 0.0,
                add_css_class: "error",
                #[watch]
                set_label: model.error.as_deref().unwrap_or_default(),
                #[watch]
                set_visible: model.error.is_some(),
            },

            gtk::Separator {
                set_orientation: gtk::Orientation::Horizontal,
            },

            model.input_area.widget().clone(),
        }
    }

    fn init(
        _init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let messages = FactoryVecDeque::builder()
            .launch(gtk::Box::default())
            .forward(sender.input_sender(), |output| match output {
                MessageWidgetOutput::CopyText(text) => ChatViewMsg::CopyToClipboard(text),
                MessageWidgetOutput::Inspect(trace) => ChatViewMsg::ForwardInspect(trace),
            });

        let input_area = InputArea::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                InputAreaOutput::SendMessage(text) => ChatViewMsg::UserSendMessage(text),
            });

        let scrolled_window = gtk::ScrolledWindow::new();

        let model = Self {
            messages,
            input_area,
            loading: false,
            scrolled_window: scrolled_window.clone(),
            user_scrolled_up: false,
            error: None,
            banner: None,
        };

        let message_list = model.messages.widget();
        let widgets = view_output!();

        let sender_scroll = sender.input_sender().clone();
        scrolled_window
            .vadjustment()
            .connect_value_changed(move |_| {
                sender_scroll.emit(ChatViewMsg::ScrollPositionChanged);
            });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            ChatViewMsg::AddMessage(message) => {
                self.messages.guard().push_back(message);
                self.auto_scroll_to_bottom(&sender);
            }
            ChatViewMsg::LoadMessages(messages) => {
                let mut guard = self.messages.guard();
                guard.clear();
                for message in messages {
                    guard.push_back(message);
                }
                drop(guard);
                sender.input(ChatViewMsg::ScrollToBottom);
            }
            ChatViewMsg::Clear => {
                self.messages.guard().clear();
                self.error = None;
            }
            ChatViewMsg::SetLoading(loading) => {
                self.loading = loading;
                self.input_area.emit(InputAreaMsg::SetSending(loading));
                if !loading {
                    self.input_area.emit(InputAreaMsg::GrabFocus);
                }
            }
            ChatViewMsg::SetInputEnabled(enabled) => {
                self.input_area.emit(InputAreaMsg::SetEnabled(enabled));
            }
            ChatViewMsg::ShowError(error) => {
                self.error = error;
            }
            ChatViewMsg::ShowBanner(banner) => {
                self.banner = banner;
            }
            ChatViewMsg::ScrollToBottom => {
                self.user_scrolled_up = false;
                let adj = self.scrolled_window.vadjustment();
                glib::idle_add_local_once(move || {
                    adj.set_value(adj.upper());
                });
            }
            ChatViewMsg::ScrollPositionChanged => {
                let adj = self.scrolled_window.vadjustment();
                let at_bottom = adj.value() >= adj.upper() - adj.page_size() - 50.0;
                self.user_scrolled_up = !at_bottom;
            }
            ChatViewMsg::UserSendMessage(text) => {
                self.error = None;
                let _ = sender.output(ChatViewOutput::SendMessage(text));
            }
            ChatViewMsg::CopyToClipboard(content) => {
                if let Some(display) = gtk::gdk::Display::default() {
                    display.clipboard().set_text(&content);
                }
            }
            ChatViewMsg::ForwardInspect(trace) => {
                let _ = sender.output(ChatViewOutput::Inspect(trace));
            }
        }
    }
}

impl ChatView {
    fn auto_scroll_to_bottom(&mut self, sender: &ComponentSender<Self>) {
        let adj = self.scrolled_window.vadjustment();
        let at_bottom = adj.value() >= adj.upper() - adj.page_size() - 50.0;
        self.user_scrolled_up = !at_bottom;

        if !self.user_scrolled_up {
            sender.input(ChatViewMsg::ScrollToBottom);
        }
    }
}
