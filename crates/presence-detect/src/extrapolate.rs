use crate::snapshot::{MediaSnapshot, Playback};

/// Advances the last real playing snapshot by wall-clock time while the
/// source has nothing fresh to report.
///
/// The synthetic position is always derived from the last *real* sample, so
/// repeated extrapolation never accumulates drift.
#[derive(Debug, Clone, Default)]
pub struct PositionExtrapolator {
    baseline: Option<MediaSnapshot>,
    /// Epoch seconds at which the baseline position was observed.
    last_position_update: i64,
}

impl PositionExtrapolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline with a real snapshot read at `now`.
    pub fn accept(&mut self, snapshot: &MediaSnapshot, now: i64) {
        self.baseline = Some(snapshot.clone());
        self.last_position_update = now;
    }

    /// The last real snapshot, if any.
    pub fn last(&self) -> Option<&MediaSnapshot> {
        self.baseline.as_ref()
    }

    pub fn clear(&mut self) {
        self.baseline = None;
        self.last_position_update = 0;
    }

    /// Synthesize a snapshot at `now`, or `None` unless the baseline was playing.
    pub fn extrapolate(&self, now: i64) -> Option<MediaSnapshot> {
        let base = self.baseline.as_ref().filter(|s| s.is_playing())?;
        let elapsed = now.saturating_sub(self.last_position_update).max(0);
        let playback = Playback::new(
            base.playback.position.saturating_add(elapsed),
            base.playback.duration,
            None,
        );

        Some(MediaSnapshot {
            timestamp: base.timestamp.max(now),
            playback,
            ..base.clone()
        })
    }
}
