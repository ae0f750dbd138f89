//! Turns the loosely-typed `answer` payload of a backend reply into
//! renderable segments. Nothing here returns an error: anything the parser
//! does not understand degrades to literal text or is dropped.

use serde_json::Value;
use url::Url;

use crate::models::AnswerSegment;

const CTA_TYPE: &str = "cta_url";
const REDIRECT_PARAM: &str = "redirect_url";

/// Extract segments from a full reply body (or its `data` object).
pub fn parse_answer(reply: &Value, current_location: Option<&Url>) -> Vec<AnswerSegment> {
    match select_answer(reply) {
        Some(answer) => parse_answer_value(answer, current_location),
        None => Vec::new(),
    }
}

/// Segments for a bare answer value, as found in thread history.
pub fn parse_answer_value(answer: &Value, current_location: Option<&Url>) -> Vec<AnswerSegment> {
    raw_elements(answer)
        .into_iter()
        .filter_map(|element| element_to_segment(element, current_location))
        .flat_map(|segment| unwrap_embedded_json(segment, current_location))
        .collect()
}

fn select_answer(reply: &Value) -> Option<&Value> {
    let data = match reply.get("data") {
        Some(data) if data.is_object() => data,
        _ => reply,
    };

    let primary = data.pointer("/disparo/answer").filter(|v| !is_blank(v));
    primary.or_else(|| {
        data.pointer("/assistant_response/answer")
            .filter(|v| !is_blank(v))
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn raw_elements(answer: &Value) -> Vec<&Value> {
    match answer {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn element_to_segment(element: &Value, current_location: Option<&Url>) -> Option<AnswerSegment> {
    match element {
        Value::Null => None,
        Value::String(s) => Some(AnswerSegment::text(s.clone())),
        Value::Bool(_) | Value::Number(_) => Some(AnswerSegment::text(element.to_string())),
        Value::Array(_) => Some(AnswerSegment::Other {
            kind: None,
            value: element.clone(),
        }),
        Value::Object(obj) => {
            let kind = obj.get("type").and_then(Value::as_str);

            if kind == Some(CTA_TYPE) {
                if let Some(url) = obj
                    .get("url")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                {
                    let label = ["display", "text", "title"]
                        .iter()
                        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
                        .map(str::trim)
                        .find(|s| !s.is_empty())
                        .unwrap_or(url)
                        .to_string();
                    return Some(AnswerSegment::Link {
                        href: with_redirect(url, current_location),
                        label,
                    });
                }
            }

            if kind == Some("text") {
                if let Some(text) = obj.get("text").and_then(Value::as_str) {
                    return Some(AnswerSegment::text(text));
                }
            }

            Some(AnswerSegment::Other {
                kind: kind.map(str::to_string),
                value: element.clone(),
            })
        }
    }
}

/// Append `redirect_url=<current location>` unless the link already has one.
pub fn with_redirect(href: &str, current_location: Option<&Url>) -> String {
    let Some(location) = current_location else {
        return href.to_string();
    };
    let Ok(mut url) = Url::parse(href) else {
        return href.to_string();
    };
    if url.query_pairs().any(|(key, _)| key == REDIRECT_PARAM) {
        return href.to_string();
    }
    url.query_pairs_mut()
        .append_pair(REDIRECT_PARAM, location.as_str());
    url.to_string()
}

/// Fallback heuristic: some backends serialize a whole segment array into a
/// text field. A text that parses as such an array is replaced by its
/// segments; anything else stays literal. Applied one level deep only.
fn unwrap_embedded_json(segment: AnswerSegment, current_location: Option<&Url>) -> Vec<AnswerSegment> {
    let AnswerSegment::Text { text } = &segment else {
        return vec![segment];
    };

    let trimmed = text.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return vec![segment];
    }

    let parsed: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return vec![segment],
    };

    let nested: Vec<AnswerSegment> = raw_elements(&parsed)
        .into_iter()
        .filter_map(|element| element_to_segment(element, current_location))
        .collect();

    if nested.is_empty() {
        vec![segment]
    } else {
        nested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location() -> Url {
        Url::parse("chatprobe://chat?thread_id=T1").unwrap()
    }

    fn texts(segments: &[AnswerSegment]) -> Vec<&str> {
        segments
            .iter()
            .filter_map(|s| match s {
                AnswerSegment::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_disparo_strings_in_order() {
        let reply = json!({
            "success": true,
            "data": {"disparo": {"answer": ["first", "second", "third"]}}
        });
        let segments = parse_answer(&reply, None);
        assert_eq!(segments.len(), 3);
        assert_eq!(texts(&segments), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_assistant_response_fallback() {
        let reply = json!({"data": {"assistant_response": {"answer": "only this"}}});
        assert_eq!(
            parse_answer(&reply, None),
            vec![AnswerSegment::text("only this")]
        );

        let empty_disparo = json!({
            "data": {
                "disparo": {"answer": []},
                "assistant_response": {"answer": "fallback"}
            }
        });
        assert_eq!(
            parse_answer(&empty_disparo, None),
            vec![AnswerSegment::text("fallback")]
        );
    }

    #[test]
    fn test_data_object_accepted_directly() {
        let data = json!({"disparo": {"answer": "direct"}});
        assert_eq!(parse_answer(&data, None), vec![AnswerSegment::text("direct")]);
    }

    #[test]
    fn test_no_answer_yields_nothing() {
        assert!(parse_answer(&json!({"success": true, "data": {}}), None).is_empty());
        assert!(parse_answer(&json!("plain"), None).is_empty());
    }

    #[test]
    fn test_cta_gets_redirect_url() {
        let loc = location();
        let reply = json!({"data": {"disparo": {"answer": [
            {"type": "cta_url", "url": "https://x", "display": "Open"}
        ]}}});
        let segments = parse_answer(&reply, Some(&loc));
        assert_eq!(segments.len(), 1);
        match &segments[0] {
            AnswerSegment::Link { href, label } => {
                assert_eq!(label, "Open");
                let parsed = Url::parse(href).unwrap();
                let redirect = parsed
                    .query_pairs()
                    .find(|(k, _)| k == "redirect_url")
                    .map(|(_, v)| v.into_owned());
                assert_eq!(redirect.as_deref(), Some(loc.as_str()));
            }
            other => panic!("Expected Link, got {:?}", other),
        }
    }

    #[test]
    fn test_cta_existing_redirect_preserved() {
        let loc = location();
        let original = "https://pay.example.com/checkout?redirect_url=https%3A%2F%2Fshop&x=1";
        let reply = json!({"data": {"disparo": {"answer": [
            {"type": "cta_url", "url": original, "display": "Pay"}
        ]}}});
        match &parse_answer(&reply, Some(&loc))[0] {
            AnswerSegment::Link { href, .. } => assert_eq!(href, original),
            other => panic!("Expected Link, got {:?}", other),
        }
    }

    #[test]
    fn test_cta_without_url_passes_through() {
        let reply = json!({"data": {"disparo": {"answer": [
            {"type": "cta_url", "url": "", "display": "Broken"}
        ]}}});
        match &parse_answer(&reply, None)[0] {
            AnswerSegment::Other { kind, .. } => assert_eq!(kind.as_deref(), Some("cta_url")),
            other => panic!("Expected Other, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_object_passes_through() {
        let reply = json!({"data": {"disparo": {"answer": [
            "hello",
            {"type": "image", "url": "https://img"}
        ]}}});
        let segments = parse_answer(&reply, None);
        assert_eq!(segments.len(), 2);
        assert!(matches!(
            &segments[1],
            AnswerSegment::Other { kind: Some(k), .. } if k == "image"
        ));
    }

    #[test]
    fn test_embedded_json_array_is_unwrapped() {
        let loc = location();
        let embedded = r#"[{"type":"text","text":"Hi!"},{"type":"cta_url","url":"https://x","display":"Go"}]"#;
        let reply = json!({"data": {"disparo": {"answer": [embedded]}}});
        let segments = parse_answer(&reply, Some(&loc));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], AnswerSegment::text("Hi!"));
        assert!(matches!(&segments[1], AnswerSegment::Link { label, .. } if label == "Go"));
    }

    #[test]
    fn test_json_looking_text_stays_literal() {
        let reply = json!({"data": {"disparo": {"answer": ["[not json", "[]"]}}});
        let segments = parse_answer(&reply, None);
        assert_eq!(texts(&segments), vec!["[not json", "[]"]);
    }

    #[test]
    fn test_embedded_json_not_reparsed_twice() {
        let inner = r#"["[\"deep\"]"]"#;
        let reply = json!({"data": {"disparo": {"answer": inner}}});
        let segments = parse_answer(&reply, None);
        assert_eq!(texts(&segments), vec![r#"["deep"]"#]);
    }

    #[test]
    fn test_redirect_left_alone_without_location_or_bad_url() {
        assert_eq!(with_redirect("https://x", None), "https://x");
        let loc = location();
        assert_eq!(with_redirect("not a url", Some(&loc)), "not a url");
    }
}
