//! Duplicate delivery suppression for redirect messages

use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_DELIVERY_WINDOW: Duration = Duration::from_millis(300);

/// Result of offering a delivery to the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Arrived inside the window of the last accepted delivery
    Suppressed { same_delivery: bool },
}

/// Remembers the last accepted delivery and the instant it was accepted
///
/// Any delivery arriving within `window` of that instant is suppressed,
/// whether or not it carries the same id. Suppressed deliveries do not
/// extend the window.
#[derive(Debug, Clone)]
pub struct DeliveryGuard {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Default for DeliveryGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_WINDOW)
    }
}

impl DeliveryGuard {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Offer delivery `id` arriving at `now`
    pub fn admit(&mut self, id: &str, now: Instant) -> Admission {
        if let Some((last_id, accepted_at)) = &self.last {
            if now.saturating_duration_since(*accepted_at) < self.window {
                return Admission::Suppressed {
                    same_delivery: last_id == id,
                };
            }
        }
        self.last = Some((id.to_string(), now));
        Admission::Accepted
    }

    /// Restart the window once the accepted delivery has been processed
    ///
    /// Duplicates that queued up while it was being processed then fall
    /// inside the window when they are finally read.
    pub fn mark_processed(&mut self, now: Instant) {
        if let Some((_, instant)) = &mut self.last {
            *instant = now;
        }
    }

    /// Id of the last accepted delivery
    #[must_use]
    pub fn last_accepted(&self) -> Option<&str> {
        self.last.as_ref().map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_delivery_accepted() {
        let mut guard = DeliveryGuard::default();
        assert_eq!(guard.admit("github:abc", Instant::now()), Admission::Accepted);
        assert_eq!(guard.last_accepted(), Some("github:abc"));
    }

    #[test]
    fn test_duplicate_inside_window_suppressed() {
        let mut guard = DeliveryGuard::default();
        let start = Instant::now();
        guard.admit("github:abc", start);

        assert_eq!(
            guard.admit("github:abc", start + Duration::from_millis(120)),
            Admission::Suppressed { same_delivery: true }
        );
        assert_eq!(
            guard.admit("github:other", start + Duration::from_millis(200)),
            Admission::Suppressed { same_delivery: false }
        );
    }

    #[test]
    fn test_window_boundary() {
        let mut guard = DeliveryGuard::new(Duration::from_millis(300));
        let start = Instant::now();
        guard.admit("github:abc", start);

        assert!(matches!(
            guard.admit("github:abc", start + Duration::from_millis(299)),
            Admission::Suppressed { .. }
        ));
        assert_eq!(
            guard.admit("github:abc", start + Duration::from_millis(300)),
            Admission::Accepted
        );
    }

    #[test]
    fn test_mark_processed_restarts_window() {
        let mut guard = DeliveryGuard::default();
        let start = Instant::now();
        guard.admit("a", start);
        guard.mark_processed(start + Duration::from_secs(2));

        assert!(matches!(
            guard.admit("a", start + Duration::from_millis(2100)),
            Admission::Suppressed { same_delivery: true }
        ));
    }

    #[test]
    fn test_suppressed_delivery_does_not_extend_window() {
        let mut guard = DeliveryGuard::default();
        let start = Instant::now();
        guard.admit("a", start);
        guard.admit("a", start + Duration::from_millis(250));

        assert_eq!(guard.admit("a", start + Duration::from_millis(310)), Admission::Accepted);
    }
}
