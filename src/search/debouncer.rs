//! Search debounce control
//!
//! Tracks the single pending search of a controller. Arming a new search
//! cancels the previous one, so at most one timer is ever live. Each armed
//! search gets a ticket; a timer that wakes up must present the current ticket
//! to claim its query, which makes a cancel that races with wake-up harmless.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A search waiting for its quiescence window to elapse.
#[derive(Debug)]
pub struct PendingSearch {
    pub ticket: u64,
    pub query: String,
    pub cancellation_token: CancellationToken,
}

/// Search debounce controller for rate-limiting search requests
#[derive(Debug)]
pub struct SearchDebouncer {
    /// Quiescence window
    debounce_delay: Duration,

    pending: Option<PendingSearch>,

    next_ticket: u64,
}

impl SearchDebouncer {
    /// Create new search debouncer with custom delay
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            debounce_delay: delay,
            pending: None,
            next_ticket: 0,
        }
    }

    /// Replace any pending search with `query`.
    ///
    /// Returns the new ticket, the token the timer task must watch, and how
    /// long that task should sleep before presenting the ticket.
    pub fn arm(&mut self, query: String) -> (u64, CancellationToken, Duration) {
        self.cancel();

        self.next_ticket += 1;
        let token = CancellationToken::new();
        self.pending = Some(PendingSearch {
            ticket: self.next_ticket,
            query,
            cancellation_token: token.clone(),
        });
        (self.next_ticket, token, self.debounce_delay)
    }

    /// Cancel the pending search, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.cancellation_token.cancel();
                log::debug!("Cancelled pending search '{}' (ticket {})", pending.query, pending.ticket);
                true
            }
            None => false,
        }
    }

    /// Claim the pending query if `ticket` is still the live one.
    pub fn take_ready(&mut self, ticket: u64) -> Option<String> {
        let live = matches!(
            &self.pending,
            Some(pending) if pending.ticket == ticket && !pending.cancellation_token.is_cancelled()
        );
        if live {
            self.pending.take().map(|p| p.query)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> SearchDebouncer {
        SearchDebouncer::with_delay(Duration::from_millis(500))
    }

    #[test]
    fn test_arm_hands_out_configured_delay() {
        let delay = Duration::from_millis(200);
        let mut debouncer = SearchDebouncer::with_delay(delay);
        let (_, _, armed) = debouncer.arm("dune".to_string());
        assert_eq!(armed, delay);
    }

    #[test]
    fn test_arm_cancels_previous_token() {
        let mut debouncer = debouncer();
        let (first_ticket, first_token, _) = debouncer.arm("spi".to_string());
        let (second_ticket, second_token, _) = debouncer.arm("spider".to_string());

        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        assert_ne!(first_ticket, second_ticket);
        assert_eq!(debouncer.take_ready(second_ticket), Some("spider".to_string()));
    }

    #[test]
    fn test_take_ready_rejects_superseded_ticket() {
        let mut debouncer = debouncer();
        let (old, _, _) = debouncer.arm("spi".to_string());
        let (new, _, _) = debouncer.arm("spider".to_string());

        assert_eq!(debouncer.take_ready(old), None);
        assert_eq!(debouncer.take_ready(new), Some("spider".to_string()));
        assert_eq!(debouncer.take_ready(new), None);
    }

    #[test]
    fn test_cancel_clears_pending_search() {
        let mut debouncer = debouncer();
        let (ticket, token, _) = debouncer.arm("test".to_string());

        assert!(debouncer.cancel());
        assert!(token.is_cancelled());
        assert_eq!(debouncer.take_ready(ticket), None);
        assert!(!debouncer.cancel());
    }
}
