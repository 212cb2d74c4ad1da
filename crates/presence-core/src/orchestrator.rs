//! One presence cycle: poll outcome in, sink command out.

use presence_api::{ImageSearch, MetadataSearch};
use presence_detect::{ChangeDetector, MediaSnapshot, MediaType, PollOutcome, PositionExtrapolator};
use presence_parse::ContentClassification;

use crate::cover_art::CoverArtResolver;
use crate::error::PresenceError;
use crate::presence::{self, Enrichment, PresenceSettings, PresenceState};
use crate::sink::{Delivery, PresenceSink, Presenter};

/// Result of one processed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub state: PresenceState,
    pub delivery: Delivery,
    /// The snapshot was synthesized from the last real read.
    pub extrapolated: bool,
}

/// Owns everything that lives across cycles: the extrapolation baseline,
/// the cover-art cache and the sink connection.
pub struct PresenceEngine<M, I, S> {
    extrapolator: PositionExtrapolator,
    resolver: Option<CoverArtResolver<M, I>>,
    presenter: Presenter<S>,
    settings: PresenceSettings,
    status_timeout_secs: i64,
}

impl<M, I, S> PresenceEngine<M, I, S>
where
    M: MetadataSearch,
    I: ImageSearch,
    S: PresenceSink,
{
    /// `resolver = None` disables cover art entirely.
    pub fn new(
        resolver: Option<CoverArtResolver<M, I>>,
        sink: S,
        settings: PresenceSettings,
        status_timeout_secs: u64,
    ) -> Self {
        Self {
            extrapolator: PositionExtrapolator::new(),
            resolver,
            presenter: Presenter::new(sink),
            settings,
            status_timeout_secs: i64::try_from(status_timeout_secs).unwrap_or(i64::MAX),
        }
    }

    /// A sink failure happened; the next status read should bypass change detection.
    pub fn needs_refresh(&self) -> bool {
        self.presenter.is_degraded()
    }

    pub fn presenter(&self) -> &Presenter<S> {
        &self.presenter
    }

    /// Turn a poll outcome into a presence action and deliver it.
    #[tracing::instrument(skip_all)]
    pub async fn process(
        &mut self,
        outcome: PollOutcome,
        detector: &ChangeDetector,
        now: i64,
    ) -> Result<CycleReport, PresenceError> {
        let (state, snapshot, extrapolated) = self.current(outcome, detector, now);

        let classification = snapshot.as_ref().and_then(classify_snapshot);

        let artwork_url = match (&mut self.resolver, &snapshot) {
            (Some(resolver), Some(s)) if !state.is_idle() => {
                resolver.resolve(s, classification.as_ref()).await
            }
            _ => None,
        };

        let enrichment = Enrichment {
            classification: classification.as_ref(),
            artwork_url: artwork_url.as_deref(),
        };
        let action = presence::render(state, snapshot.as_ref(), &enrichment, &self.settings, now);
        let delivery = self.presenter.apply(state, action).await?;

        if delivery != Delivery::Skipped {
            tracing::debug!(%state, ?delivery, extrapolated, "Presence cycle");
        }
        Ok(CycleReport {
            state,
            delivery,
            extrapolated,
        })
    }

    /// The snapshot to render this cycle and the state it maps to.
    fn current(
        &mut self,
        outcome: PollOutcome,
        detector: &ChangeDetector,
        now: i64,
    ) -> (PresenceState, Option<MediaSnapshot>, bool) {
        match outcome {
            PollOutcome::Snapshot(snapshot) => {
                self.extrapolator.accept(&snapshot, now);
                (PresenceState::dispatch(Some(&snapshot)), Some(snapshot), false)
            }
            PollOutcome::Unchanged => match self.extrapolator.extrapolate(now) {
                Some(synthetic) => (PresenceState::Playing, Some(synthetic), true),
                None => {
                    let last = self.extrapolator.last().cloned();
                    (PresenceState::dispatch(last.as_ref()), last, false)
                }
            },
            PollOutcome::Unavailable => {
                if self.extrapolator.last().is_none() {
                    return (PresenceState::NoStatus, None, false);
                }
                if detector.is_stale(now, self.status_timeout_secs) {
                    return (PresenceState::Stopped, None, false);
                }
                match self.extrapolator.extrapolate(now) {
                    Some(synthetic) => (PresenceState::Playing, Some(synthetic), true),
                    None => {
                        let last = self.extrapolator.last().cloned();
                        (PresenceState::dispatch(last.as_ref()), last, false)
                    }
                }
            }
        }
    }

    /// Clear the presence and close the sink.
    pub async fn shutdown(&mut self) {
        self.presenter.shutdown().await;
    }
}

/// Filename classification, for video items with a title.
pub fn classify_snapshot(snapshot: &MediaSnapshot) -> Option<ContentClassification> {
    (snapshot.media_type == MediaType::Video && snapshot.media.has_title())
        .then(|| presence_parse::classify(&snapshot.media.title))
}
