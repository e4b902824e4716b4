use crate::media::{MediaElement, MediaError, PlaybackError};
use log::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryState {
	Idle,
	Attempting,
	BlockedRetrying,
	Succeeded,
	Failed,
}

/// Wraps play invocations with the single automatic recovery the core knows
/// about: when the autoplay policy blocks an unmuted element, mute it and
/// play again, exactly once. Every other error kind surfaces unchanged, the
/// dispatcher does not guess corrective action for unknown causes.
#[derive(Default)]
pub struct ErrorRecoveryPolicy {
	state: RecoveryState,
}

impl Default for RecoveryState {
	fn default() -> Self {
		Self::Idle
	}
}

impl ErrorRecoveryPolicy {
	pub fn state(&self) -> RecoveryState {
		self.state
	}

	pub async fn protected_play<Media: MediaElement>(&mut self, media: &mut Media) -> Result<(), PlaybackError> {
		self.state = RecoveryState::Attempting;

		match media.play().await {
			Ok(()) => {
				self.state = RecoveryState::Succeeded;
				Ok(())
			}
			Err(MediaError::AutoplayBlocked) => {
				self.state = RecoveryState::BlockedRetrying;
				warn!("Play was blocked by the autoplay policy. Muting the element and retrying once.");
				media.set_muted(true);

				match media.play().await {
					Ok(()) => {
						self.state = RecoveryState::Succeeded;
						Ok(())
					}
					Err(error) => {
						self.state = RecoveryState::Failed;
						Err(error.into())
					}
				}
			}
			Err(error) => {
				self.state = RecoveryState::Failed;
				Err(error.into())
			}
		}
	}
}
