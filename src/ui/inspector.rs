use std::sync::Arc;

use gtk::prelude::*;
use relm4::prelude::*;
use serde_json::Value;

use crate::api::Backend;
use crate::config;
use crate::models::{ConversationContext, RequestTrace, Settings};
use crate::services::chat;
use crate::services::inspector::{
    build_tree, copy_text, error_value, Expansion, InspectorNode, InspectorSource, NodeKind,
    RequestSerial,
};

/// Side panel showing the last exchange or a backend lookup as a JSON tree.
pub struct InspectorPanel {
    backend: Arc<dyn Backend>,
    source: InspectorSource,
    settings: Option<Settings>,
    context: ConversationContext,
    thread_id: Option<String>,
    trace: Option<RequestTrace>,
    tree: Option<InspectorNode>,
    expansion: Expansion,
    serial: RequestSerial,
    loading: bool,
    tree_box: gtk::Box,
    source_dropdown: gtk::DropDown,
}

#[derive(Debug)]
pub enum InspectorMsg {
    SelectSource(u32),
    Refresh,
    /// Record the latest exchange; refreshes only when a trace is on screen.
    SetTrace(RequestTrace),
    /// Record an exchange and switch to it.
    ShowTrace(RequestTrace),
    SetBackend(Arc<dyn Backend>),
    SetSettings(Option<Settings>),
    SetContext(ConversationContext),
    SetThread(Option<String>),
    Toggle(String),
    ExpandAll,
    CollapseAll,
    Copy(String),
}

#[derive(Debug)]
pub enum InspectorCmd {
    Loaded { serial: u64, title: String, value: Value },
}

#[relm4::component(pub)]
impl Component for InspectorPanel {
    type Init = Arc<dyn Backend>;
    type Input = InspectorMsg;
    type Output = ();
    type CommandOutput = InspectorCmd;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_width_request: 320,
            add_css_class: "inspector",

            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_spacing: 6,
                set_margin_all: 8,

                #[local_ref]
                source_dropdown -> gtk::DropDown {
                    set_hexpand: true,
                    set_model: Some(&gtk::StringList::new(
                        &InspectorSource::ALL.map(|s| s.label()),
                    )),
                    connect_selected_notify[sender] => move |dd| {
                        sender.input(InspectorMsg::SelectSource(dd.selected()));
                    },
                },

                gtk::Button {
                    set_icon_name: "view-refresh-symbolic",
                    set_tooltip_text: Some("Reload"),
                    add_css_class: "flat",
                    #[watch]
                    set_sensitive: !model.loading,
                    connect_clicked => InspectorMsg::Refresh,
                },
                gtk::Button {
                    set_icon_name: "list-add-symbolic",
                    set_tooltip_text: Some("Expand all"),
                    add_css_class: "flat",
                    connect_clicked => InspectorMsg::ExpandAll,
                },
                gtk::Button {
                    set_icon_name: "list-remove-symbolic",
                    set_tooltip_text: Some("Collapse all"),
                    add_css_class: "flat",
                    connect_clicked => InspectorMsg::CollapseAll,
                },
            },

            gtk::Spinner {
                #[watch]
                set_spinning: model.loading,
                #[watch]
                set_visible: model.loading,
            },

            gtk::ScrolledWindow {
                set_vexpand: true,
                set_hscrollbar_policy: gtk::PolicyType::Automatic,

                #[local_ref]
                tree_box -> gtk::Box {
                    set_orientation: gtk::Orientation::Vertical,
                    set_spacing: 2,
                    set_margin_all: 8,
                },
            },
        }
    }

    fn init(
        backend: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let tree_box = gtk::Box::new(gtk::Orientation::Vertical, 2);
        let source_dropdown = gtk::DropDown::builder().build();

        let model = Self {
            backend,
            source: InspectorSource::LastResponse,
            settings: None,
            context: ConversationContext::default(),
            thread_id: None,
            trace: None,
            tree: None,
            expansion: Expansion::default(),
            serial: RequestSerial::default(),
            loading: false,
            tree_box: tree_box.clone(),
            source_dropdown: source_dropdown.clone(),
        };

        let widgets = view_output!();
        model.source_dropdown.set_selected(model.source.index());
        model.render(&sender);

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            InspectorMsg::SelectSource(index) => {
                let Some(source) = InspectorSource::from_index(index) else {
                    return;
                };
                if source != self.source {
                    self.source = source;
                    self.load(&sender);
                }
            }
            InspectorMsg::Refresh => self.load(&sender),
            InspectorMsg::SetTrace(trace) => {
                self.trace = Some(trace);
                if self.source.is_trace() {
                    self.load(&sender);
                }
            }
            InspectorMsg::ShowTrace(trace) => {
                self.trace = Some(trace);
                if !self.source.is_trace() {
                    self.source = InspectorSource::LastResponse;
                    // The queued SelectSource for this index is a no-op
                    self.source_dropdown.set_selected(self.source.index());
                }
                self.load(&sender);
            }
            InspectorMsg::SetBackend(backend) => self.backend = backend,
            InspectorMsg::SetSettings(settings) => self.settings = settings,
            InspectorMsg::SetContext(context) => self.context = context,
            InspectorMsg::SetThread(thread_id) => self.thread_id = thread_id,
            InspectorMsg::Toggle(path) => {
                self.expansion.toggle(&path);
                self.render(&sender);
            }
            InspectorMsg::ExpandAll => {
                if let Some(tree) = &self.tree {
                    self.expansion.expand_all(tree);
                }
                self.render(&sender);
            }
            InspectorMsg::CollapseAll => {
                self.expansion.collapse_all();
                self.render(&sender);
            }
            InspectorMsg::Copy(path) => {
                let text = self
                    .tree
                    .as_ref()
                    .and_then(|tree| tree.find(&path))
                    .map(|node| copy_text(&node.value));
                if let (Some(text), Some(display)) = (text, gtk::gdk::Display::default()) {
                    display.clipboard().set_text(&text);
                }
            }
        }
    }

    fn update_cmd(
        &mut self,
        msg: Self::CommandOutput,
        sender: ComponentSender<Self>,
        _root: &Self::Root,
    ) {
        match msg {
            InspectorCmd::Loaded {
                serial,
                title,
                value,
            } => {
                if !self.serial.is_latest(serial) {
                    tracing::debug!("Dropping stale inspector result #{}", serial);
                    return;
                }
                self.loading = false;
                self.show(&title, &value, &sender);
            }
        }
    }
}

impl InspectorPanel {
    fn load(&mut self, sender: &ComponentSender<Self>) {
        let serial = self.serial.next();

        if self.source.is_trace() {
            self.loading = false;
            let value = match (&self.trace, self.source) {
                (Some(trace), InspectorSource::LastRequest) => trace.request_json(),
                (Some(trace), _) => trace.response_json(),
                (None, _) => Value::Null,
            };
            self.show(self.source.label(), &value, sender);
            return;
        }

        let resource = match self.source.resource(
            self.settings.as_ref(),
            &self.context,
            self.thread_id.as_deref(),
        ) {
            Some(Ok(resource)) => resource,
            Some(Err(reason)) => {
                self.loading = false;
                self.show(self.source.label(), &error_value(&reason), sender);
                return;
            }
            None => return,
        };

        self.loading = true;
        let backend = self.backend.clone();
        sender.oneshot_command(async move {
            let title = resource.title();
            let value = chat::load_resource(backend, resource).await;
            InspectorCmd::Loaded {
                serial,
                title,
                value,
            }
        });
    }

    fn show(&mut self, title: &str, value: &Value, sender: &ComponentSender<Self>) {
        self.tree = Some(build_tree(title, value, config::INSPECTOR_MAX_DEPTH));
        self.expansion = Expansion::default();
        self.render(sender);
    }

    fn render(&self, sender: &ComponentSender<Self>) {
        while let Some(child) = self.tree_box.first_child() {
            self.tree_box.remove(&child);
        }

        match &self.tree {
            Some(tree) => append_node(&self.tree_box, tree, &self.expansion, sender),
            None => {
                let empty = gtk::Label::builder()
                    .label("Nothing to inspect yet")
                    .halign(gtk::Align::Start)
                    .build();
                empty.add_css_class("dim-label");
                self.tree_box.append(&empty);
            }
        }
    }
}

fn append_node(
    parent: &gtk::Box,
    node: &InspectorNode,
    expansion: &Expansion,
    sender: &ComponentSender<InspectorPanel>,
) {
    let expanded = node.is_container() && expansion.is_expanded(&node.path);

    let row = gtk::Box::builder()
        .orientation(gtk::Orientation::Horizontal)
        .spacing(4)
        .build();

    if node.is_container() && !node.truncated {
        let toggle = gtk::Button::builder()
            .icon_name(if expanded {
                "pan-down-symbolic"
            } else {
                "pan-end-symbolic"
            })
            .build();
        toggle.add_css_class("flat");
        toggle.add_css_class("circular");
        let path = node.path.clone();
        let sender_toggle = sender.input_sender().clone();
        toggle.connect_clicked(move |_| {
            sender_toggle.emit(InspectorMsg::Toggle(path.clone()));
        });
        row.append(&toggle);
    } else {
        // Keep scalars aligned with container labels
        let spacer = gtk::Box::builder().width_request(34).build();
        row.append(&spacer);
    }

    let key = gtk::Label::builder()
        .label(format!("{}:", node.label))
        .halign(gtk::Align::Start)
        .build();
    key.add_css_class("heading");
    row.append(&key);

    let preview = gtk::Label::builder()
        .label(if expanded {
            kind_summary(&node.kind)
        } else {
            node.preview.clone()
        })
        .halign(gtk::Align::Start)
        .hexpand(true)
        .ellipsize(gtk::pango::EllipsizeMode::End)
        .selectable(true)
        .build();
    preview.add_css_class("monospace");
    if node.truncated || matches!(node.kind, NodeKind::Null) {
        preview.add_css_class("dim-label");
    }
    row.append(&preview);

    let copy = gtk::Button::builder()
        .icon_name("edit-copy-symbolic")
        .tooltip_text("Copy value")
        .build();
    copy.add_css_class("flat");
    copy.add_css_class("circular");
    let path = node.path.clone();
    let sender_copy = sender.input_sender().clone();
    copy.connect_clicked(move |_| {
        sender_copy.emit(InspectorMsg::Copy(path.clone()));
    });
    row.append(&copy);

    parent.append(&row);

    if expanded {
        let children = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(2)
            .margin_start(16)
            .build();
        for child in &node.children {
            append_node(&children, child, expansion, sender);
        }
        parent.append(&children);
    }
}

fn kind_summary(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Object(n) => format!("{{{} keys}}", n),
        NodeKind::Array(n) => format!("[{} items]", n),
        _ => String::new(),
    }
}
