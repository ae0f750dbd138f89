use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::PUSH_RETRY_DELAY;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    byte_buf: Vec<u8>,
    buffer: String,
    retry: Option<Duration>,
    last_event_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay most recently announced by the server.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Discard any half-received frame, keeping `retry` and the last event id
    /// for the next connection.
    pub fn reset_stream(&mut self) {
        self.byte_buf.clear();
        self.buffer.clear();
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.byte_buf.extend_from_slice(bytes);

        // Multi-byte characters may straddle chunk boundaries
        let decoded = match std::str::from_utf8(&self.byte_buf) {
            Ok(s) => {
                let decoded = s.to_string();
                self.byte_buf.clear();
                decoded
            }
            Err(e) if e.error_len().is_some() => {
                let decoded = String::from_utf8_lossy(&self.byte_buf).into_owned();
                self.byte_buf.clear();
                decoded
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                let decoded = String::from_utf8_lossy(&self.byte_buf[..valid_up_to]).into_owned();
                self.byte_buf.drain(..valid_up_to);
                decoded
            }
        };

        self.buffer.push_str(&decoded);
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut events = Vec::new();
        while let Some(event_end) = self.buffer.find("\n\n") {
            let block = self.buffer[..event_end].to_string();
            self.buffer.drain(..event_end + 2);
            if let Some(event) = self.parse_block(&block) {
                events.push(event);
            }
        }
        events
    }

    fn parse_block(&mut self, block: &str) -> Option<SseEvent> {
        let mut event = None;
        let mut id = None;
        let mut data_lines: Vec<&str> = Vec::new();

        for line in block.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "data" => data_lines.push(value),
                "event" => event = Some(value.to_string()),
                "id" => id = Some(value.to_string()),
                "retry" => {
                    if let Ok(ms) = value.trim().parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
                _ => {}
            }
        }

        if id.is_some() {
            self.last_event_id.clone_from(&id);
        }
        if data_lines.is_empty() {
            return None;
        }
        Some(SseEvent {
            event,
            data: data_lines.join("\n"),
            id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Connected,
    OpenMessage { text: String },
    Disconnected { reason: String },
}

/// Interpret an SSE event as an out-of-band assistant message.
pub fn parse_push_event(event: &SseEvent) -> Option<PushEvent> {
    let payload: Value = match serde_json::from_str(&event.data) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Ignoring non-JSON push payload: {}", e);
            return None;
        }
    };

    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .or(event.event.as_deref());
    if kind != Some("open_message") {
        return None;
    }

    let text = payload.get("text").and_then(Value::as_str)?.trim();
    if text.is_empty() {
        return None;
    }
    Some(PushEvent::OpenMessage {
        text: text.to_string(),
    })
}

/// Keep a push connection open until `cancel` fires, reconnecting after
/// drops. `on_event` returns `false` once the receiver is gone.
pub async fn run_push_channel<F>(
    http: reqwest::Client,
    url: Url,
    cancel: CancellationToken,
    mut on_event: F,
) where
    F: FnMut(PushEvent) -> bool + Send,
{
    let mut decoder = SseDecoder::new();

    loop {
        if cancel.is_cancelled() {
            return;
        }
        decoder.reset_stream();

        let mut request = http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(last_id) = decoder.last_event_id() {
            request = request.header("Last-Event-ID", last_id);
        }

        let connect = tokio::select! {
            _ = cancel.cancelled() => return,
            result = request.send() => result,
        };

        let reason = match connect {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Push channel connected: {}", url);
                if !on_event(PushEvent::Connected) {
                    return;
                }
                let mut stream = response.bytes_stream();
                loop {
                    let chunk = tokio::select! {
                        _ = cancel.cancelled() => return,
                        chunk = stream.next() => chunk,
                    };
                    match chunk {
                        Some(Ok(bytes)) => {
                            for event in decoder.feed(&bytes) {
                                if let Some(push) = parse_push_event(&event) {
                                    if !on_event(push) {
                                        return;
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => break format!("Stream error: {}", e),
                        None => break "Stream closed by server".to_string(),
                    }
                }
            }
            Ok(response) => format!("HTTP {}", response.status().as_u16()),
            Err(e) => format!("Failed to connect: {}", e),
        };

        tracing::warn!("Push channel disconnected: {}", reason);
        if !on_event(PushEvent::Disconnected { reason }) {
            return;
        }

        let delay = decoder.retry().unwrap_or(PUSH_RETRY_DELAY);
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    const SSE_HEADERS: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\nconnection: close\r\n\r\n";

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&request).to_ascii_lowercase()
    }

    #[test]
    fn test_decoder_handles_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"open_").is_empty());
        assert!(decoder.feed(b"message\",\"text\":\"hi\"}\r\n").is_empty());
        let events = decoder.feed(b"\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, r#"{"type":"open_message","text":"hi"}"#);
    }

    #[test]
    fn test_decoder_multiline_data_and_fields() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keepalive\n\nretry: 1500\nid: 7\nevent: note\ndata: a\ndata:b\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
        assert_eq!(events[0].event.as_deref(), Some("note"));
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(decoder.retry(), Some(Duration::from_millis(1500)));
        assert_eq!(decoder.last_event_id(), Some("7"));
    }

    #[test]
    fn test_decoder_utf8_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: olá\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.feed(&bytes[..split]).is_empty());
        let events = decoder.feed(&bytes[split..]);
        assert_eq!(events[0].data, "olá");
    }

    #[test]
    fn test_parse_push_event() {
        let event = SseEvent {
            event: None,
            data: r#"{"type":"open_message","text":" Hello there "}"#.into(),
            id: None,
        };
        assert_eq!(
            parse_push_event(&event),
            Some(PushEvent::OpenMessage {
                text: "Hello there".into()
            })
        );

        let other = SseEvent {
            event: None,
            data: r#"{"type":"typing"}"#.into(),
            id: None,
        };
        assert_eq!(parse_push_event(&other), None);

        let named = SseEvent {
            event: Some("open_message".into()),
            data: r#"{"text":"from event name"}"#.into(),
            id: None,
        };
        assert!(matches!(
            parse_push_event(&named),
            Some(PushEvent::OpenMessage { .. })
        ));

        let garbage = SseEvent {
            event: None,
            data: "ping".into(),
            id: None,
        };
        assert_eq!(parse_push_event(&garbage), None);
    }

    #[test]
    fn test_reset_stream_drops_partial_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"retry: 50\nid: 9\n\ndata: {\"type\":\"open_").is_empty());
        decoder.reset_stream();

        let events = decoder.feed(b"data: {\"type\":\"open_message\",\"text\":\"hello\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(
            parse_push_event(&events[0]),
            Some(PushEvent::OpenMessage {
                text: "hello".into()
            })
        );
        assert_eq!(decoder.retry(), Some(Duration::from_millis(50)));
        assert_eq!(decoder.last_event_id(), Some("9"));
    }

    #[tokio::test]
    async fn test_push_channel_reconnects_after_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (request_tx, mut request_rx) = tokio::sync::mpsc::unbounded_channel();

        let server = tokio::spawn(async move {
            // First connection announces a short retry, then dies mid-frame
            let (mut socket, _) = listener.accept().await.unwrap();
            request_tx.send(read_request(&mut socket).await).unwrap();
            socket.write_all(SSE_HEADERS).await.unwrap();
            socket
                .write_all(b"retry: 50\nid: 9\n\ndata: {\"type\":\"open_")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
            drop(socket);

            let (mut socket, _) = listener.accept().await.unwrap();
            request_tx.send(read_request(&mut socket).await).unwrap();
            socket.write_all(SSE_HEADERS).await.unwrap();
            socket
                .write_all(b"data: {\"type\":\"open_message\",\"text\":\"hello\"}\n\n")
                .await
                .unwrap();
            let mut buf = [0u8; 64];
            while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
        });

        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let url = Url::parse(&format!("http://{}/push", addr)).unwrap();
        let channel = tokio::spawn(run_push_channel(http, url, cancel.clone(), move |event| {
            event_tx.send((Instant::now(), event)).is_ok()
        }));

        let mut events = Vec::new();
        timeout(Duration::from_secs(5), async {
            while let Some((at, event)) = event_rx.recv().await {
                let done = matches!(event, PushEvent::OpenMessage { .. });
                events.push((at, event));
                if done {
                    break;
                }
            }
        })
        .await
        .expect("pushed message did not arrive");

        let kinds: Vec<_> = events.iter().map(|(_, e)| e.clone()).collect();
        assert_eq!(kinds.len(), 4, "{:?}", kinds);
        assert_eq!(kinds[0], PushEvent::Connected);
        assert!(matches!(kinds[1], PushEvent::Disconnected { .. }));
        assert_eq!(kinds[2], PushEvent::Connected);
        assert_eq!(
            kinds[3],
            PushEvent::OpenMessage {
                text: "hello".into()
            }
        );

        // Server-announced retry replaces the default delay
        let waited = events[2].0.duration_since(events[1].0);
        assert!(waited < PUSH_RETRY_DELAY, "waited {:?}", waited);

        let first = request_rx.recv().await.unwrap();
        let second = request_rx.recv().await.unwrap();
        assert!(first.contains("accept: text/event-stream"));
        assert!(!first.contains("last-event-id"));
        assert!(second.contains("last-event-id: 9"));

        cancel.cancel();
        timeout(Duration::from_secs(2), channel)
            .await
            .expect("push channel ignored cancellation")
            .unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn test_push_channel_cancelled_while_waiting_to_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let url = Url::parse(&format!("http://{}/push", addr)).unwrap();
        let channel = tokio::spawn(run_push_channel(http, url, cancel.clone(), move |event| {
            event_tx.send(event).is_ok()
        }));

        let event = timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .expect("no disconnect reported")
            .unwrap();
        assert_eq!(
            event,
            PushEvent::Disconnected {
                reason: "HTTP 503".into()
            }
        );

        // Now sleeping for the default retry delay
        cancel.cancel();
        timeout(Duration::from_secs(1), channel)
            .await
            .expect("push channel ignored cancellation")
            .unwrap();
        server.abort();
    }
}
