use crate::clock::Clock;
use crate::media::{MediaElement, MediaError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// In-memory media element driven by the session clock. Stands in for a real
/// playback surface in the demonstration binary and in tests. Failures can
/// be scripted per play call.
pub struct SimulatedMediaElement {
	clock: Clock,
	playing: bool,
	muted: bool,
	position: Duration,
	position_taken_at: DateTime<Utc>,
	scripted_play_failures: VecDeque<MediaError>,
	play_attempts: usize,
	seek_count: usize,
}

impl SimulatedMediaElement {
	pub fn new(clock: Clock) -> Self {
		let position_taken_at = clock.now();
		Self {
			clock,
			playing: false,
			muted: false,
			position: Duration::zero(),
			position_taken_at,
			scripted_play_failures: VecDeque::new(),
			play_attempts: 0,
			seek_count: 0,
		}
	}

	/// Queue an error for an upcoming play call. Queued errors are consumed
	/// in order, one per call.
	pub fn fail_next_play(&mut self, error: MediaError) {
		self.scripted_play_failures.push_back(error);
	}

	pub fn play_attempts(&self) -> usize {
		self.play_attempts
	}

	pub fn seek_count(&self) -> usize {
		self.seek_count
	}

	fn current_position(&self) -> Duration {
		if self.playing {
			self.position + (self.clock.now() - self.position_taken_at)
		} else {
			self.position
		}
	}

	fn freeze_position(&mut self) {
		self.position = self.current_position();
		self.position_taken_at = self.clock.now();
	}
}

#[async_trait]
impl MediaElement for SimulatedMediaElement {
	async fn play(&mut self) -> Result<(), MediaError> {
		self.play_attempts += 1;
		if let Some(error) = self.scripted_play_failures.pop_front() {
			return Err(error);
		}

		if !self.playing {
			self.freeze_position();
			self.playing = true;
		}
		Ok(())
	}

	async fn pause(&mut self) -> Result<(), MediaError> {
		if self.playing {
			self.freeze_position();
			self.playing = false;
		}
		Ok(())
	}

	async fn seek_to(&mut self, position: Duration) {
		self.position = position.max(Duration::zero());
		self.position_taken_at = self.clock.now();
		self.seek_count += 1;
	}

	fn position(&self) -> Duration {
		self.current_position()
	}

	fn is_playing(&self) -> bool {
		self.playing
	}

	fn muted(&self) -> bool {
		self.muted
	}

	fn set_muted(&mut self, muted: bool) {
		self.muted = muted;
	}
}
