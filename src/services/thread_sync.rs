use serde_json::Value;
use url::Url;

use super::context::ThreadAction;
use crate::config::LOCATION_BASE;

const THREAD_PARAM: &str = "thread_id";

/// The session location mirroring the current thread id, e.g.
/// `chatprobe://chat?thread_id=abc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            url: base_url(),
        }
    }
}

fn base_url() -> Url {
    Url::parse(LOCATION_BASE).expect("LOCATION_BASE must be a valid URL")
}

impl Location {
    /// Accepts a full location URL or a bare thread id.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let input = input.trim();
        if input.contains("://") {
            return Url::parse(input).map(|url| Self { url });
        }
        let mut location = Self::default();
        if !input.is_empty() {
            location.url = location.with_thread_id(Some(input));
        }
        Ok(location)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn thread_id(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == THREAD_PARAM)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// The same location with `thread_id` replaced or removed; other query
    /// parameters keep their order.
    pub fn with_thread_id(&self, thread_id: Option<&str>) -> Url {
        let others: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != THREAD_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = self.url.clone();
        url.set_query(None);
        if !others.is_empty() || thread_id.is_some() {
            let mut pairs = url.query_pairs_mut();
            pairs.extend_pairs(others.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            if let Some(id) = thread_id {
                pairs.append_pair(THREAD_PARAM, id);
            }
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Initial,
    /// The user opened a location.
    External,
    /// The client rewrote the location itself.
    Programmatic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
    pub url: Url,
    pub origin: ChangeOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    FetchHistory(String),
}

/// How a send reply affected thread tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplySync {
    /// A different thread than the tracked one took over.
    pub thread_switched: bool,
    pub notice: Option<&'static str>,
    pub location_change: Option<LocationChange>,
}

/// Keeps the tracked thread id, the session location and history loading
/// consistent. Owned by the root component.
#[derive(Debug, Clone, Default)]
pub struct ThreadSync {
    location: Location,
    tracked: Option<String>,
    /// Thread whose history was last requested or is already on screen.
    requested: Option<String>,
}

impl ThreadSync {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            tracked: None,
            requested: None,
        }
    }

    pub fn location(&self) -> &Url {
        self.location.url()
    }

    pub fn tracked_thread(&self) -> Option<&str> {
        self.tracked.as_deref()
    }

    /// Thread the push channel should be bound to.
    pub fn push_target(&self) -> Option<&str> {
        self.tracked.as_deref()
    }

    pub fn is_current(&self, thread_id: &str) -> bool {
        self.tracked.as_deref() == Some(thread_id)
    }

    /// Observe the location the client started with.
    pub fn start(&mut self) -> Option<SyncAction> {
        self.observe(LocationChange {
            url: self.location.url().clone(),
            origin: ChangeOrigin::Initial,
        })
    }

    pub fn observe(&mut self, change: LocationChange) -> Option<SyncAction> {
        self.location = Location { url: change.url };
        let thread_id = self.location.thread_id();
        self.tracked.clone_from(&thread_id);

        match (change.origin, thread_id) {
            (ChangeOrigin::Programmatic, thread_id) => {
                self.requested = thread_id;
                None
            }
            (_, Some(thread_id)) => {
                if self.requested.as_deref() == Some(thread_id.as_str()) {
                    return None;
                }
                self.requested = Some(thread_id.clone());
                Some(SyncAction::FetchHistory(thread_id))
            }
            (_, None) => {
                self.requested = None;
                None
            }
        }
    }

    /// Request the tracked thread's history again, on explicit user demand.
    pub fn reload(&mut self) -> Option<SyncAction> {
        let thread_id = self.tracked.clone()?;
        self.requested = Some(thread_id.clone());
        Some(SyncAction::FetchHistory(thread_id))
    }

    pub fn apply_reply(&mut self, thread_id: Option<&str>, action: Option<ThreadAction>) -> ReplySync {
        if let Some(action) = action {
            let location_change = self.rewrite(None);
            return ReplySync {
                thread_switched: false,
                notice: Some(action.notice()),
                location_change,
            };
        }

        let Some(thread_id) = thread_id.map(str::trim).filter(|t| !t.is_empty()) else {
            return ReplySync::default();
        };

        let thread_switched = self
            .tracked
            .as_deref()
            .is_some_and(|tracked| tracked != thread_id);

        ReplySync {
            thread_switched,
            notice: None,
            location_change: self.rewrite(Some(thread_id)),
        }
    }

    /// Forget the current thread (user reset).
    pub fn reset(&mut self) -> Option<LocationChange> {
        self.rewrite(None)
    }

    fn rewrite(&mut self, thread_id: Option<&str>) -> Option<LocationChange> {
        if self.tracked.as_deref() == thread_id {
            return None;
        }
        let change = LocationChange {
            url: self.location.with_thread_id(thread_id),
            origin: ChangeOrigin::Programmatic,
        };
        self.observe(change.clone());
        tracing::info!("Session location is now {}", change.url);
        Some(change)
    }
}

/// Thread id from an open-thread lookup, which may be a bare object, a
/// wrapped one or a list of candidates.
pub fn thread_id_from_lookup(payload: &Value) -> Option<String> {
    let candidate = match payload {
        Value::Array(items) => items.first()?,
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(items)) => items.first()?,
            Some(data @ Value::Object(_)) => data,
            _ => payload,
        },
        _ => return None,
    };

    let id = candidate
        .get("thread_id")
        .or_else(|| candidate.get("thread").and_then(|t| t.get("id")))
        .or_else(|| candidate.get("id"))?;
    match id {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sync_at(input: &str) -> ThreadSync {
        ThreadSync::new(Location::parse(input).unwrap())
    }

    #[test]
    fn test_location_parse_bare_thread_id() {
        let location = Location::parse("thr_1").unwrap();
        assert_eq!(location.url().as_str(), "chatprobe://chat?thread_id=thr_1");
        assert_eq!(location.thread_id().as_deref(), Some("thr_1"));
    }

    #[test]
    fn test_with_thread_id_preserves_other_params() {
        let location = Location::parse("chatprobe://chat?debug=1&thread_id=a&lang=pt").unwrap();
        let url = location.with_thread_id(Some("b"));
        assert_eq!(url.as_str(), "chatprobe://chat?debug=1&lang=pt&thread_id=b");
        let cleared = location.with_thread_id(None);
        assert_eq!(cleared.as_str(), "chatprobe://chat?debug=1&lang=pt");
    }

    #[test]
    fn test_start_fetches_history_once() {
        let mut sync = sync_at("chatprobe://chat?thread_id=T");
        assert_eq!(sync.start(), Some(SyncAction::FetchHistory("T".into())));

        // Re-observing the same location must not fetch again
        assert_eq!(sync.start(), None);
        let again = LocationChange {
            url: sync.location().clone(),
            origin: ChangeOrigin::External,
        };
        assert_eq!(sync.observe(again), None);
        assert_eq!(sync.tracked_thread(), Some("T"));
    }

    #[test]
    fn test_start_without_thread() {
        let mut sync = ThreadSync::default();
        assert_eq!(sync.start(), None);
        assert_eq!(sync.push_target(), None);
    }

    #[test]
    fn test_external_change_to_new_thread_fetches() {
        let mut sync = sync_at("T1");
        sync.start();
        let change = LocationChange {
            url: Location::parse("T2").unwrap().url().clone(),
            origin: ChangeOrigin::External,
        };
        assert_eq!(sync.observe(change), Some(SyncAction::FetchHistory("T2".into())));
    }

    #[test]
    fn test_first_reply_adopts_thread_without_switch() {
        let mut sync = ThreadSync::default();
        sync.start();
        let outcome = sync.apply_reply(Some("T1"), None);
        assert!(!outcome.thread_switched);
        let change = outcome.location_change.unwrap();
        assert_eq!(change.origin, ChangeOrigin::Programmatic);
        assert_eq!(change.url.as_str(), "chatprobe://chat?thread_id=T1");
        assert_eq!(sync.push_target(), Some("T1"));

        // The programmatic rewrite must not trigger a history reload
        assert_eq!(sync.observe(change), None);
    }

    #[test]
    fn test_reply_with_different_thread_switches() {
        let mut sync = sync_at("T1");
        sync.start();
        let outcome = sync.apply_reply(Some("T2"), None);
        assert!(outcome.thread_switched);
        assert_eq!(sync.tracked_thread(), Some("T2"));
        assert!(sync.is_current("T2"));
        assert!(!sync.is_current("T1"));
    }

    #[test]
    fn test_reply_with_same_thread_is_noop() {
        let mut sync = sync_at("T1");
        sync.start();
        assert_eq!(sync.apply_reply(Some("T1"), None), ReplySync::default());
        assert_eq!(sync.apply_reply(None, None), ReplySync::default());
    }

    #[test]
    fn test_close_and_delete_actions_clear_thread() {
        for action in [ThreadAction::Close, ThreadAction::DeleteUser] {
            let mut sync = sync_at("T1");
            sync.start();
            let outcome = sync.apply_reply(Some("T1"), Some(action));
            assert_eq!(outcome.notice, Some(action.notice()));
            assert_eq!(
                outcome.location_change.map(|c| c.url.to_string()),
                Some("chatprobe://chat".to_string())
            );
            assert_eq!(sync.tracked_thread(), None);
        }
    }

    #[test]
    fn test_reload_forces_fetch() {
        let mut sync = sync_at("T1");
        sync.start();
        assert_eq!(sync.reload(), Some(SyncAction::FetchHistory("T1".into())));
        assert_eq!(ThreadSync::default().reload(), None);
    }

    #[test]
    fn test_thread_id_from_lookup() {
        assert_eq!(
            thread_id_from_lookup(&json!({"thread_id": "a"})).as_deref(),
            Some("a")
        );
        assert_eq!(
            thread_id_from_lookup(&json!({"data": {"id": 7}})).as_deref(),
            Some("7")
        );
        assert_eq!(
            thread_id_from_lookup(&json!([{"thread": {"id": "b"}}])).as_deref(),
            Some("b")
        );
        assert_eq!(thread_id_from_lookup(&json!({"data": []})), None);
        assert_eq!(thread_id_from_lookup(&json!(null)), None);
    }
}
