use std::collections::HashSet;

use serde_json::Value;

use crate::api::Resource;
use crate::models::{ConversationContext, Settings};

pub const ROOT_PATH: &str = "$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Object(usize),
    Array(usize),
    String,
    Number,
    Bool,
    Null,
}

/// One row of the JSON tree.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorNode {
    pub path: String,
    pub label: String,
    pub kind: NodeKind,
    /// Short rendering for scalars and collapsed containers.
    pub preview: String,
    pub value: Value,
    pub children: Vec<InspectorNode>,
    /// Children were not built because the depth limit was reached.
    pub truncated: bool,
}

impl InspectorNode {
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Object(_) | NodeKind::Array(_))
    }

    pub fn find(&self, path: &str) -> Option<&InspectorNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

pub fn build_tree(label: &str, value: &Value, max_depth: usize) -> InspectorNode {
    build_node(ROOT_PATH.to_string(), label.to_string(), value, 0, max_depth)
}

fn build_node(path: String, label: String, value: &Value, depth: usize, max_depth: usize) -> InspectorNode {
    let kind = match value {
        Value::Object(obj) => NodeKind::Object(obj.len()),
        Value::Array(items) => NodeKind::Array(items.len()),
        Value::String(_) => NodeKind::String,
        Value::Number(_) => NodeKind::Number,
        Value::Bool(_) => NodeKind::Bool,
        Value::Null => NodeKind::Null,
    };
    let truncated = depth >= max_depth && matches!(kind, NodeKind::Object(n) | NodeKind::Array(n) if n > 0);

    let children = if truncated {
        Vec::new()
    } else {
        match value {
            Value::Object(obj) => {
                let mut keys: Vec<&String> = obj.keys().collect();
                keys.sort();
                keys.into_iter()
                    .map(|key| {
                        build_node(
                            child_path(&path, key),
                            key.clone(),
                            &obj[key.as_str()],
                            depth + 1,
                            max_depth,
                        )
                    })
                    .collect()
            }
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    build_node(
                        format!("{}[{}]", path, i),
                        array_entry_label(item, i),
                        item,
                        depth + 1,
                        max_depth,
                    )
                })
                .collect(),
            _ => Vec::new(),
        }
    };

    InspectorNode {
        path,
        label,
        preview: preview(value),
        kind,
        value: value.clone(),
        children,
        truncated,
    }
}

/// `$.key` for plain keys. Keys that could be read as path syntax are
/// quoted, as in `$["a.b"]`, so every node keeps a distinct path.
fn child_path(parent: &str, key: &str) -> String {
    let plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    if plain {
        format!("{}.{}", parent, key)
    } else {
        let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{}\"", key));
        format!("{}[{}]", parent, quoted)
    }
}

/// Array entries are labelled by their `name` or `id` when they have one.
pub fn array_entry_label(item: &Value, index: usize) -> String {
    ["name", "id"]
        .iter()
        .filter_map(|key| item.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("[{}]", index))
}

fn preview(value: &Value) -> String {
    match value {
        Value::Object(obj) => match obj.len() {
            1 => "{1 key}".to_string(),
            n => format!("{{{} keys}}", n),
        },
        Value::Array(items) => match items.len() {
            1 => "[1 item]".to_string(),
            n => format!("[{} items]", n),
        },
        Value::String(s) => {
            let shown: String = s.chars().take(120).collect();
            if shown.len() < s.len() {
                format!("\"{}…\"", shown)
            } else {
                format!("\"{}\"", shown)
            }
        }
        other => other.to_string(),
    }
}

/// Text placed on the clipboard for a node: strings unquoted, everything
/// else as pretty JSON.
pub fn copy_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Which paths are expanded. Each node toggles independently.
#[derive(Debug, Clone)]
pub struct Expansion {
    expanded: HashSet<String>,
}

impl Default for Expansion {
    fn default() -> Self {
        let mut expanded = HashSet::new();
        expanded.insert(ROOT_PATH.to_string());
        Self { expanded }
    }
}

impl Expansion {
    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Returns the new state.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.expanded.remove(path) {
            false
        } else {
            self.expanded.insert(path.to_string());
            true
        }
    }

    pub fn expand_all(&mut self, node: &InspectorNode) {
        if node.is_container() && !node.truncated {
            self.expanded.insert(node.path.clone());
            for child in &node.children {
                self.expand_all(child);
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}

/// Monotonic counter used to drop results of superseded loads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSerial(u64);

impl RequestSerial {
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn is_latest(&self, serial: u64) -> bool {
        self.0 == serial
    }
}

/// Body shown for a failed load.
pub fn error_value(message: &str) -> Value {
    serde_json::json!({ "error": message })
}

/// What the inspector panel can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorSource {
    LastRequest,
    LastResponse,
    Companies,
    Company,
    Customer,
    Assistant,
    ThreadMessages,
    OpenThread,
}

impl InspectorSource {
    pub const ALL: [InspectorSource; 8] = [
        InspectorSource::LastRequest,
        InspectorSource::LastResponse,
        InspectorSource::Companies,
        InspectorSource::Company,
        InspectorSource::Customer,
        InspectorSource::Assistant,
        InspectorSource::ThreadMessages,
        InspectorSource::OpenThread,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u32 {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) as u32
    }

    pub fn label(&self) -> &'static str {
        match self {
            InspectorSource::LastRequest => "Last request",
            InspectorSource::LastResponse => "Last response",
            InspectorSource::Companies => "Companies",
            InspectorSource::Company => "Company",
            InspectorSource::Customer => "Customer",
            InspectorSource::Assistant => "Assistant",
            InspectorSource::ThreadMessages => "Thread messages",
            InspectorSource::OpenThread => "Open thread lookup",
        }
    }

    pub fn is_trace(&self) -> bool {
        matches!(self, InspectorSource::LastRequest | InspectorSource::LastResponse)
    }

    /// Backend resource for a fetchable source, built from the identifiers
    /// known so far. `None` for trace sources; `Err` when an id is missing.
    pub fn resource(
        &self,
        settings: Option<&Settings>,
        context: &ConversationContext,
        thread_id: Option<&str>,
    ) -> Option<Result<Resource, String>> {
        fn require(id: Option<&str>, what: &str) -> Result<String, String> {
            id.map(str::to_string)
                .ok_or_else(|| format!("No {} known yet", what))
        }

        let company = context
            .company_id
            .as_deref()
            .or(settings.map(|s| s.company_id.as_str()));
        let thread = thread_id.or(context.thread_id.as_deref());

        let resource = match self {
            InspectorSource::LastRequest | InspectorSource::LastResponse => return None,
            InspectorSource::Companies => Ok(Resource::Companies),
            InspectorSource::Company => require(company, "company id").map(Resource::Company),
            InspectorSource::Customer => {
                require(context.customer_id.as_deref(), "customer id").map(Resource::Customer)
            }
            InspectorSource::Assistant => {
                require(context.assistant_id.as_deref(), "assistant id").map(Resource::Assistant)
            }
            InspectorSource::ThreadMessages => {
                require(thread, "thread id").map(Resource::ThreadMessages)
            }
            InspectorSource::OpenThread => match settings {
                Some(s) => Ok(Resource::OpenThread {
                    company_id: s.company_id.clone(),
                    customer_phone: s.customer_phone.clone(),
                }),
                None => Err("Settings are not configured".to_string()),
            },
        };
        Some(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_keys_sorted() {
        let tree = build_tree("root", &json!({"zeta": 1, "alpha": 2, "mid": 3}), 8);
        let labels: Vec<_> = tree.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "mid", "zeta"]);
        assert_eq!(tree.kind, NodeKind::Object(3));
        assert_eq!(tree.children[0].path, "$.alpha");
    }

    #[test]
    fn test_array_labels() {
        let tree = build_tree(
            "list",
            &json!([{"name": "Acme", "id": 1}, {"id": 7}, {"other": true}, "plain"]),
            8,
        );
        let labels: Vec<_> = tree.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Acme", "7", "[2]", "[3]"]);
        assert_eq!(tree.children[2].path, "$[2]");
    }

    #[test]
    fn test_depth_limit_truncates() {
        let value = json!({"a": {"b": {"c": {"d": 1}}}, "empty": {}});
        let tree = build_tree("root", &value, 2);
        let b = tree.find("$.a.b").unwrap();
        assert!(b.truncated);
        assert!(b.children.is_empty());
        assert_eq!(b.preview, "{1 key}");
        assert!(!tree.find("$.empty").unwrap().truncated);
    }

    #[test]
    fn test_expansion_is_independent() {
        let tree = build_tree("root", &json!({"a": {"x": 1}, "b": [1, 2]}), 8);
        let mut expansion = Expansion::default();
        assert!(expansion.is_expanded("$"));
        assert!(!expansion.is_expanded("$.a"));

        assert!(expansion.toggle("$.a"));
        assert!(expansion.is_expanded("$.a"));
        assert!(!expansion.is_expanded("$.b"));
        assert!(!expansion.toggle("$.a"));

        expansion.expand_all(&tree);
        assert!(expansion.is_expanded("$.b"));
        expansion.collapse_all();
        assert!(!expansion.is_expanded("$"));
    }

    #[test]
    fn test_keys_with_path_syntax_get_distinct_paths() {
        let value = json!({"a.b": 1, "a": {"b": 2}, "x[0]": 3, "": 4});
        let tree = build_tree("root", &value, 8);

        assert_eq!(tree.find("$.a.b").map(|n| &n.value), Some(&json!(2)));
        assert_eq!(tree.find("$[\"a.b\"]").map(|n| &n.value), Some(&json!(1)));
        assert_eq!(tree.find("$[\"x[0]\"]").map(|n| &n.value), Some(&json!(3)));
        assert_eq!(tree.find("$[\"\"]").map(|n| &n.value), Some(&json!(4)));

        let mut expansion = Expansion::default();
        expansion.toggle("$.a");
        assert!(!expansion.is_expanded("$[\"a.b\"]"));
    }

    #[test]
    fn test_copy_text() {
        assert_eq!(copy_text(&json!("raw")), "raw");
        assert_eq!(copy_text(&json!({"k": 1})), "{\n  \"k\": 1\n}");
    }

    #[test]
    fn test_request_serial_drops_stale() {
        let mut serial = RequestSerial::default();
        let first = serial.next();
        let second = serial.next();
        assert!(!serial.is_latest(first));
        assert!(serial.is_latest(second));
    }

    #[test]
    fn test_string_preview_truncates() {
        let long = "x".repeat(200);
        let tree = build_tree("s", &json!(long), 8);
        assert!(tree.preview.ends_with("…\""));
    }

    #[test]
    fn test_source_resources() {
        let settings = Settings::from_form("acme", "+5511", "", "").unwrap();
        let mut context = ConversationContext::default();

        assert_eq!(InspectorSource::LastRequest.resource(Some(&settings), &context, None), None);
        assert_eq!(
            InspectorSource::Company.resource(Some(&settings), &context, None),
            Some(Ok(Resource::Company("acme".into())))
        );
        assert!(matches!(
            InspectorSource::Customer.resource(Some(&settings), &context, None),
            Some(Err(_))
        ));

        context.customer_id = Some("c-1".into());
        context.thread_id = Some("t-old".into());
        assert_eq!(
            InspectorSource::Customer.resource(Some(&settings), &context, None),
            Some(Ok(Resource::Customer("c-1".into())))
        );
        assert_eq!(
            InspectorSource::ThreadMessages.resource(Some(&settings), &context, Some("t-new")),
            Some(Ok(Resource::ThreadMessages("t-new".into())))
        );
        assert!(matches!(
            InspectorSource::OpenThread.resource(None, &context, None),
            Some(Err(_))
        ));
    }

    #[test]
    fn test_source_index_round_trip() {
        for source in InspectorSource::ALL {
            assert_eq!(InspectorSource::from_index(source.index()), Some(source));
        }
        assert_eq!(InspectorSource::from_index(99), None);
    }
}
