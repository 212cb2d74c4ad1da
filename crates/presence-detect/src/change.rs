/// MD5 hex digest of a raw status payload.
pub fn digest(payload: &[u8]) -> String {
    format!("{:x}", md5::compute(payload))
}

/// Result of comparing a payload against the last accepted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// New content; carries its digest so the caller can accept it after parsing.
    Changed(String),
    Unchanged,
}

/// Content-hash de-duplication plus staleness tracking for a status source.
///
/// A digest only becomes the comparison baseline once the caller `accept`s it,
/// so a payload that failed to parse is re-examined on the next read.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    last_digest: Option<String>,
    last_seen: Option<i64>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `payload` with the last accepted digest.
    pub fn check(&self, payload: &[u8], force: bool) -> Change {
        let d = digest(payload);
        if !force && self.last_digest.as_deref() == Some(d.as_str()) {
            Change::Unchanged
        } else {
            Change::Changed(d)
        }
    }

    /// Record `digest` as the new baseline and mark the source as seen.
    pub fn accept(&mut self, digest: String, now: i64) {
        self.last_digest = Some(digest);
        self.touch(now);
    }

    /// Mark a successful read that produced no new content.
    pub fn touch(&mut self, now: i64) {
        self.last_seen = Some(self.last_seen.map_or(now, |seen| seen.max(now)));
    }

    /// Drop the digest baseline so the next read is processed in full.
    pub fn forget(&mut self) {
        self.last_digest = None;
    }

    /// Epoch seconds of the last successful read.
    pub fn last_seen(&self) -> Option<i64> {
        self.last_seen
    }

    /// Whether the source has gone unseen for longer than `timeout_secs`.
    /// A source that was never read is stale.
    pub fn is_stale(&self, now: i64, timeout_secs: i64) -> bool {
        match self.last_seen {
            Some(seen) => now - seen > timeout_secs,
            None => true,
        }
    }

    /// Current time, never earlier than the last successful read.
    pub fn clock(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();
        self.last_seen.map_or(now, |seen| seen.max(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"state":"playing","time":30,"length":300}"#;

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest(PAYLOAD), digest(PAYLOAD));
        assert_ne!(digest(PAYLOAD), digest(b"{}"));
        assert_eq!(digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_same_payload_twice_is_unchanged() {
        let mut detector = ChangeDetector::new();
        let Change::Changed(d) = detector.check(PAYLOAD, false) else {
            panic!("first read must be Changed");
        };
        detector.accept(d, 100);
        assert_eq!(detector.check(PAYLOAD, false), Change::Unchanged);
    }

    #[test]
    fn test_force_bypasses_dedup() {
        let mut detector = ChangeDetector::new();
        detector.accept(digest(PAYLOAD), 100);
        assert!(matches!(detector.check(PAYLOAD, true), Change::Changed(_)));
    }

    #[test]
    fn test_unaccepted_digest_is_not_baseline() {
        let detector = ChangeDetector::new();
        assert!(matches!(detector.check(PAYLOAD, false), Change::Changed(_)));
        assert!(matches!(detector.check(PAYLOAD, false), Change::Changed(_)));
    }

    #[test]
    fn test_forget_reprocesses() {
        let mut detector = ChangeDetector::new();
        detector.accept(digest(PAYLOAD), 100);
        detector.forget();
        assert!(matches!(detector.check(PAYLOAD, false), Change::Changed(_)));
    }

    #[test]
    fn test_staleness() {
        let mut detector = ChangeDetector::new();
        assert!(detector.is_stale(100, 5));

        detector.touch(100);
        assert!(!detector.is_stale(103, 5));
        assert!(!detector.is_stale(105, 5));
        assert!(detector.is_stale(106, 5));
    }

    #[test]
    fn test_last_seen_never_moves_backwards() {
        let mut detector = ChangeDetector::new();
        detector.touch(200);
        detector.touch(150);
        assert_eq!(detector.last_seen(), Some(200));
        assert!(detector.clock() >= 200);
    }
}
