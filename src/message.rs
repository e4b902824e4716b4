use crate::member::MemberId;
use crate::session::playback_state::{GroupPlaybackState, TrackId, TransportAction};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire representation of a state change, broadcast to every member of the
/// group session. Positions travel as milliseconds so that every client
/// interprets them identically.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StateChangeBroadcast {
	pub track_id: TrackId,
	pub action: TransportAction,
	pub position_in_milliseconds: u64,
	pub declared_at: DateTime<Utc>,
	pub originator: MemberId,
}

impl StateChangeBroadcast {
	pub fn to_json(&self) -> String {
		serde_json::to_string(self).expect("Failed to serialize state change broadcast to JSON.")
	}
}

impl From<GroupPlaybackState> for StateChangeBroadcast {
	fn from(state: GroupPlaybackState) -> Self {
		#[allow(clippy::cast_sign_loss)]
		let position_in_milliseconds = state.position.num_milliseconds().max(0) as u64;
		Self {
			track_id: state.track_id,
			action: state.action,
			position_in_milliseconds,
			declared_at: state.declared_at,
			originator: state.originator,
		}
	}
}

impl From<StateChangeBroadcast> for GroupPlaybackState {
	fn from(broadcast: StateChangeBroadcast) -> Self {
		#[allow(clippy::cast_possible_wrap)]
		let position = Duration::milliseconds(broadcast.position_in_milliseconds.min(i64::MAX as u64) as i64);
		Self {
			track_id: broadcast.track_id,
			action: broadcast.action,
			position,
			declared_at: broadcast.declared_at,
			originator: broadcast.originator,
		}
	}
}

#[derive(Error, Debug)]
pub enum MessageError {
	#[error("Failed to deserialize broadcast with error: '{error}'; message was '{json}'")]
	DeserializationFailed { error: String, json: String },
}

impl TryFrom<&str> for StateChangeBroadcast {
	type Error = MessageError;

	fn try_from(json: &str) -> Result<Self, Self::Error> {
		serde_json::from_str(json).map_err(|error| MessageError::DeserializationFailed {
			error: error.to_string(),
			json: json.to_string(),
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn test_broadcast() -> StateChangeBroadcast {
		let declared_at = "2023-05-04T13:37:00Z"
			.parse::<DateTime<Utc>>()
			.expect("Failed to parse timestamp");
		let originator = "6fa459ea-ee8a-3ca4-894e-db77e160355e"
			.parse::<uuid::Uuid>()
			.expect("Failed to parse UUID");
		StateChangeBroadcast {
			track_id: TrackId::from("https://example.com/trailer.mov"),
			action: TransportAction::Play,
			position_in_milliseconds: 30_000,
			declared_at,
			originator: MemberId::from(originator),
		}
	}

	#[test]
	fn state_change_broadcast_should_serialize_and_deserialize() {
		let broadcast = test_broadcast();

		let json = broadcast.to_json();
		assert_eq!(
			r#"{"track_id":"https://example.com/trailer.mov","action":"play","position_in_milliseconds":30000,"declared_at":"2023-05-04T13:37:00Z","originator":"6fa459ea-ee8a-3ca4-894e-db77e160355e"}"#,
			json
		);

		let deserialized = StateChangeBroadcast::try_from(json.as_str()).expect("Failed to deserialize broadcast");
		assert_eq!(broadcast, deserialized);
	}

	#[test]
	fn invalid_json_should_fail_with_a_message_error() {
		let result = StateChangeBroadcast::try_from("{\"type\": \"garbage\"}");

		let Err(MessageError::DeserializationFailed { json, .. }) = result else {
			panic!("Expected deserialization failure");
		};
		assert_eq!("{\"type\": \"garbage\"}", json);
	}

	#[test]
	fn broadcast_should_round_trip_through_the_domain_state() {
		let broadcast = test_broadcast();

		let state = GroupPlaybackState::from(broadcast.clone());
		assert_eq!(Duration::seconds(30), state.position);
		assert_eq!(TransportAction::Play, state.action);

		assert_eq!(broadcast, StateChangeBroadcast::from(state));
	}

	#[test]
	fn negative_positions_should_not_survive_the_wire_conversion() {
		let declared_at = Utc::now();
		let state = GroupPlaybackState {
			track_id: TrackId::from("The Universe"),
			action: TransportAction::Pause,
			position: Duration::seconds(-13),
			declared_at,
			originator: MemberId::random(),
		};

		let broadcast = StateChangeBroadcast::from(state);

		assert_eq!(0, broadcast.position_in_milliseconds);
	}
}
