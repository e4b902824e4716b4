use crate::clock::Clock;
use crate::media::MediaElement;
use crate::session::playback_state::GroupPlaybackState;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// A corrective seek that has been issued but not yet observed to land.
/// Tied to the declaration time of the state it was issued for.
struct PendingCorrection {
	declared_at: DateTime<Utc>,
	target: Duration,
}

/// Compares the local element position against the position implied by the
/// accepted group state and seeks when the drift exceeds the tolerance.
/// Corrections are silent seeks; there is no pause-seek-resume choreography.
pub struct DriftCorrector {
	tolerance: Duration,
	clock: Clock,
	pending: Option<PendingCorrection>,
}

impl DriftCorrector {
	pub fn new(tolerance: Duration, clock: Clock) -> Self {
		Self {
			tolerance,
			clock,
			pending: None,
		}
	}

	/// Reconcile the element against `state`, issuing at most one corrective
	/// seek per accepted state. A newer state supersedes an outstanding
	/// correction instead of queueing behind it.
	pub async fn reconcile<Media: MediaElement>(&mut self, state: &GroupPlaybackState, media: &mut Media) {
		let expected = state.expected_position(self.clock.now());
		let local = media.position();

		if let Some(pending) = &self.pending {
			if pending.declared_at != state.declared_at {
				self.pending = None;
			} else if (local - pending.target).abs() <= self.tolerance {
				// the seek landed
				self.pending = None;
			} else {
				debug!(
					"Correction to {}ms is still in flight, not issuing another seek",
					pending.target.num_milliseconds()
				);
				return;
			}
		}

		let drift = local - expected;
		if drift.abs() > self.tolerance {
			info!(
				"Local position {}ms drifted {}ms from the group timeline, seeking to {}ms",
				local.num_milliseconds(),
				drift.num_milliseconds(),
				expected.num_milliseconds()
			);
			media.seek_to(expected).await;
			self.pending = Some(PendingCorrection {
				declared_at: state.declared_at,
				target: expected,
			});
		}
	}

	/// Abandon any in-flight correction, e.g. on session teardown.
	pub fn cancel(&mut self) {
		self.pending = None;
	}
}
