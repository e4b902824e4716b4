use crate::member::MemberId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque identifier of the asset the group is watching, e.g. a media URL.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for TrackId {
	fn from(track_id: &str) -> Self {
		TrackId(track_id.to_string())
	}
}

impl From<String> for TrackId {
	fn from(track_id: String) -> Self {
		TrackId(track_id)
	}
}

impl Display for TrackId {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "{}", self.0)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportAction {
	Play,
	Pause,
}

/// The single logical playback state shared by all members of a session.
/// Each client holds its own replica and reconciles via accept/reject.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupPlaybackState {
	pub track_id: TrackId,
	pub action: TransportAction,
	/// Position in the medium at the moment the state was declared.
	pub position: Duration,
	pub declared_at: DateTime<Utc>,
	pub originator: MemberId,
}

impl GroupPlaybackState {
	/// Where the group timeline should be at `now`. Elapsed wall time is
	/// projected only while playing; a paused state pins the exact position.
	pub fn expected_position(&self, now: DateTime<Utc>) -> Duration {
		match self.action {
			TransportAction::Play => (self.position + (now - self.declared_at)).max(Duration::zero()),
			TransportAction::Pause => self.position,
		}
	}

	/// Last-writer-wins by declaration time: only a strictly newer
	/// declaration replaces the held state.
	pub fn supersedes(&self, other: &GroupPlaybackState) -> bool {
		self.declared_at > other.declared_at
	}
}
