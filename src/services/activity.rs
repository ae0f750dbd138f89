use super::inspector::RequestSerial;

/// In-flight send and history loads of the chat view.
///
/// Each load is stamped with a serial. A result whose serial was superseded
/// is reported stale and leaves the busy state alone.
#[derive(Debug, Default)]
pub struct Activity {
    send: RequestSerial,
    history: RequestSerial,
    sending: bool,
    loading_history: bool,
}

impl Activity {
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Input stays locked while this is true.
    pub fn is_busy(&self) -> bool {
        self.sending || self.loading_history
    }

    pub fn begin_send(&mut self) -> u64 {
        self.sending = true;
        self.send.next()
    }

    /// Returns `false` for a reply to an abandoned send.
    pub fn finish_send(&mut self, serial: u64) -> bool {
        if !self.send.is_latest(serial) {
            return false;
        }
        self.sending = false;
        true
    }

    pub fn begin_history(&mut self) -> u64 {
        self.loading_history = true;
        self.history.next()
    }

    /// Returns `false` for history of an abandoned load.
    pub fn finish_history(&mut self, serial: u64) -> bool {
        if !self.history.is_latest(serial) {
            return false;
        }
        self.loading_history = false;
        true
    }

    /// Forget everything in flight. Late results come back stale.
    pub fn abandon(&mut self) {
        self.send.next();
        self.history.next();
        self.sending = false;
        self.loading_history = false;
    }
}
