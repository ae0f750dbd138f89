use gtk::prelude::*;
use relm4::prelude::*;

use crate::models::{AnswerSegment, Message, RequestTrace, Role};
use crate::services::markdown::to_pango_markup;

pub struct MessageWidget {
    pub message: Message,
}

#[derive(Debug)]
pub enum MessageWidgetMsg {
    RequestCopy,
    RequestInspect,
}

#[derive(Debug)]
pub enum MessageWidgetOutput {
    CopyText(String),
    Inspect(RequestTrace),
}

#[relm4::factory(pub)]
impl FactoryComponent for MessageWidget {
    type Init = Message;
    type Input = MessageWidgetMsg;
    type Output = MessageWidgetOutput;
    type CommandOutput = ();
    type ParentWidget = gtk::Box;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_spacing: 0,
        }
    }

    fn init_model(message: Self::Init, _index: &DynamicIndex, _sender: FactorySender<Self>) -> Self {
        Self { message }
    }

    fn init_widgets(
        &mut self,
        _index: &DynamicIndex,
        root: Self::Root,
        _returned_widget: &<Self::ParentWidget as relm4::factory::FactoryView>::ReturnedWidget,
        sender: FactorySender<Self>,
    ) -> Self::Widgets {
        let widgets = view_output!();

        if self.message.role == Role::System {
            root.append(&build_system_row(&self.message));
            return widgets;
        }

        let is_user = self.message.role == Role::User;

        let bubble = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(4)
            .build();
        bubble.add_css_class("card");
        bubble.add_css_class(if is_user {
            "message-bubble-user"
        } else {
            "message-bubble-assistant"
        });

        // Role, timestamp and actions
        let header = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(8)
            .margin_start(8)
            .margin_end(4)
            .margin_top(4)
            .build();

        let role_label = gtk::Label::builder()
            .label(if is_user { "You" } else { "Assistant" })
            .halign(gtk::Align::Start)
            .hexpand(true)
            .build();
        role_label.add_css_class("caption");
        role_label.add_css_class("dim-label");
        header.append(&role_label);

        let time_label = gtk::Label::builder()
            .label(
                self.message
                    .created_at
                    .with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string(),
            )
            .build();
        time_label.add_css_class("caption");
        time_label.add_css_class("dim-label");
        header.append(&time_label);

        if self.message.trace.is_some() {
            let inspect_btn = gtk::Button::builder()
                .icon_name("system-search-symbolic")
                .tooltip_text("Inspect request and response")
                .build();
            inspect_btn.add_css_class("flat");
            inspect_btn.add_css_class("circular");
            let sender_inspect = sender.input_sender().clone();
            inspect_btn.connect_clicked(move |_| {
                sender_inspect.emit(MessageWidgetMsg::RequestInspect);
            });
            header.append(&inspect_btn);
        }

        let copy_btn = gtk::Button::builder()
            .icon_name("edit-copy-symbolic")
            .tooltip_text("Copy message")
            .build();
        copy_btn.add_css_class("flat");
        copy_btn.add_css_class("circular");
        let sender_copy = sender.input_sender().clone();
        copy_btn.connect_clicked(move |_| {
            sender_copy.emit(MessageWidgetMsg::RequestCopy);
        });
        header.append(&copy_btn);

        bubble.append(&header);

        let content_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(6)
            .margin_start(8)
            .margin_end(8)
            .margin_bottom(8)
            .build();

        match &self.message.segments {
            Some(segments) if !segments.is_empty() => {
                for segment in segments {
                    content_box.append(&segment_to_widget(segment));
                }
            }
            _ => {
                let label = plain_label(&self.message.text);
                content_box.append(&label);
            }
        }
        bubble.append(&content_box);

        let message_row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .margin_top(4)
            .margin_bottom(4)
            .margin_start(if is_user { 64 } else { 12 })
            .margin_end(if is_user { 12 } else { 64 })
            .halign(if is_user {
                gtk::Align::End
            } else {
                gtk::Align::Start
            })
            .build();
        message_row.append(&bubble);
        root.append(&message_row);

        widgets
    }

    fn update(&mut self, msg: Self::Input, sender: FactorySender<Self>) {
        match msg {
            MessageWidgetMsg::RequestCopy => {
                let _ = sender.output(MessageWidgetOutput::CopyText(self.message.text.clone()));
            }
            MessageWidgetMsg::RequestInspect => {
                if let Some(trace) = &self.message.trace {
                    let _ = sender.output(MessageWidgetOutput::Inspect(trace.clone()));
                }
            }
        }
    }
}

fn build_system_row(message: &Message) -> gtk::Widget {
    let label = gtk::Label::builder()
        .label(&message.text)
        .halign(gtk::Align::Center)
        .wrap(true)
        .justify(gtk::Justification::Center)
        .margin_top(8)
        .margin_bottom(8)
        .build();
    label.add_css_class("dim-label");
    label.add_css_class("caption");
    label.add_css_class("system-message");
    label.upcast()
}

fn plain_label(text: &str) -> gtk::Label {
    gtk::Label::builder()
        .label(text)
        .halign(gtk::Align::Start)
        .xalign(0.0)
        .wrap(true)
        .wrap_mode(gtk::pango::WrapMode::WordChar)
        .selectable(true)
        .build()
}

fn segment_to_widget(segment: &AnswerSegment) -> gtk::Widget {
    match segment {
        AnswerSegment::Text { text } => {
            let label = plain_label("");
            label.set_use_markup(true);
            label.set_markup(&to_pango_markup(text));
            label.upcast()
        }
        AnswerSegment::Link { href, label } => {
            let button = gtk::LinkButton::with_label(href, label);
            button.set_halign(gtk::Align::Start);
            button.set_tooltip_text(Some(href));
            button.add_css_class("cta-link");
            button.upcast()
        }
        AnswerSegment::Other { kind, value } => {
            let container = gtk::Box::builder()
                .orientation(gtk::Orientation::Vertical)
                .spacing(2)
                .build();
            let tag = gtk::Label::builder()
                .label(format!("[{}]", kind.as_deref().unwrap_or("unknown")))
                .halign(gtk::Align::Start)
                .build();
            tag.add_css_class("caption");
            tag.add_css_class("dim-label");
            container.append(&tag);

            let body = plain_label(
                &serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
            );
            body.add_css_class("monospace");
            container.append(&body);
            container.upcast()
        }
    }
}
