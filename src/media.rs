use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

pub mod simulated;

/// Failures a media element can report. Detecting a blocked autoplay is the
/// element's job; the synchronization core only ever sees the named kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
	#[error("Playback was blocked by the autoplay policy.")]
	AutoplayBlocked,
	#[error("Failed to decode the medium: {0}")]
	Decode(String),
	#[error("Network failure while fetching the medium: {0}")]
	Network(String),
	#[error("The medium's source is not supported: {0}")]
	UnsupportedSource(String),
}

/// Failures surfaced by the synchronization core to the embedding UI layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
	#[error("Media element failed: {0}")]
	Media(#[from] MediaError),
}

/// The local playback surface. Each client owns exactly one element and only
/// the action dispatcher mutates it, so no locking is required.
#[async_trait]
pub trait MediaElement: Send {
	async fn play(&mut self) -> Result<(), MediaError>;
	async fn pause(&mut self) -> Result<(), MediaError>;
	async fn seek_to(&mut self, position: Duration);
	fn position(&self) -> Duration;
	fn is_playing(&self) -> bool;
	fn muted(&self) -> bool;
	fn set_muted(&mut self, muted: bool);
}
