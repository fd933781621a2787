use std::collections::HashMap;

/// Identifies one in-flight request for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub key: String,
    nonce: u64,
}

/// Discards responses that were overtaken by a newer request for the same key
/// or by a switch to a different key.
#[derive(Debug, Default)]
pub struct RequestGuard {
    next_nonce: u64,
    latest: HashMap<String, u64>,
    active_key: Option<String>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `key`, superseding any earlier one.
    pub fn begin(&mut self, key: &str) -> Ticket {
        self.next_nonce = self.next_nonce.wrapping_add(1);
        self.latest.insert(key.to_string(), self.next_nonce);
        self.active_key = Some(key.to_string());
        Ticket {
            key: key.to_string(),
            nonce: self.next_nonce,
        }
    }

    /// True only for the newest ticket of the key that was begun last.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.active_key.as_deref() == Some(ticket.key.as_str())
            && self.latest.get(&ticket.key) == Some(&ticket.nonce)
    }

    /// Forget the active key, so every outstanding ticket becomes stale.
    pub fn cancel(&mut self) {
        self.active_key = None;
    }
}
