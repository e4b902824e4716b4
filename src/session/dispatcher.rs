use crate::clock::Clock;
use crate::media::{MediaElement, PlaybackError};
use crate::session::drift::DriftCorrector;
use crate::session::playback_state::{GroupPlaybackState, TransportAction};
use crate::session::recovery::ErrorRecoveryPolicy;
use chrono::Duration;
use log::debug;

/// Translates accepted group states into the minimal media element commands
/// needed to match them. The dispatcher exclusively owns the element; nothing
/// else on this client touches it.
pub struct ActionDispatcher<Media> {
	media: Media,
	recovery: ErrorRecoveryPolicy,
	corrector: DriftCorrector,
}

impl<Media: MediaElement> ActionDispatcher<Media> {
	pub fn new(media: Media, drift_tolerance: Duration, clock: Clock) -> Self {
		Self {
			media,
			recovery: ErrorRecoveryPolicy::default(),
			corrector: DriftCorrector::new(drift_tolerance, clock),
		}
	}

	/// Bring the local element in line with a freshly accepted group state.
	/// The element's transport state is only touched if it differs from the
	/// target; a redundant play call could re-trigger autoplay blocking.
	pub async fn apply(&mut self, state: &GroupPlaybackState) -> Result<(), PlaybackError> {
		match state.action {
			TransportAction::Play => {
				if self.media.is_playing() {
					debug!("Element is already playing, not issuing another play call");
				} else {
					self.recovery.protected_play(&mut self.media).await?;
				}
			}
			TransportAction::Pause => {
				if self.media.is_playing() {
					self.media.pause().await?;
				}
			}
		}

		// The declared position can differ from where the element sits,
		// e.g. after a late join or a delayed broadcast.
		self.corrector.reconcile(state, &mut self.media).await;
		Ok(())
	}

	/// Reconcile against the current state without touching the transport
	/// state, used by the periodic check for silent local drift.
	pub async fn check_drift(&mut self, state: &GroupPlaybackState) {
		self.corrector.reconcile(state, &mut self.media).await;
	}

	/// Re-enter the bounded mute-and-retry recovery after the element
	/// reported a blocked play asynchronously.
	pub async fn recover_blocked_play(&mut self) -> Result<(), PlaybackError> {
		self.recovery.protected_play(&mut self.media).await
	}

	/// Park the element in a paused state after an unrecoverable failure,
	/// leaving the client in a known degraded state.
	pub async fn halt(&mut self) {
		if self.media.is_playing() {
			if let Err(error) = self.media.pause().await {
				debug!("Ignoring pause failure while halting: {error}");
			}
		}
		self.corrector.cancel();
	}

	pub fn cancel_pending_correction(&mut self) {
		self.corrector.cancel();
	}

	pub fn local_position(&self) -> Duration {
		self.media.position()
	}

	pub fn media(&self) -> &Media {
		&self.media
	}

	#[cfg(test)]
	pub fn media_mut(&mut self) -> &mut Media {
		&mut self.media
	}
}
