use crate::member::MemberId;
use crate::message::StateChangeBroadcast;
use async_trait::async_trait;
use thiserror::Error;

pub mod local;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
	#[error("The group session is closed, the broadcast could not be delivered.")]
	SessionClosed,
}

/// What the group transport delivers to a member.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
	StateChange(StateChangeBroadcast),
	MemberJoined(MemberId),
	MemberLeft(MemberId),
}

/// Broadcast channel connecting the members of a group session. Guarantees
/// per-sender ordering and at-least-once delivery to all current members,
/// including the sender itself; it does not guarantee a global order across
/// senders. Conflicts between senders are resolved by the playback state
/// store, not by the transport.
#[async_trait]
pub trait GroupTransport: Send {
	async fn broadcast(&self, broadcast: StateChangeBroadcast) -> Result<(), TransportError>;
	/// The next inbound event, or `None` once the session is torn down.
	async fn receive(&mut self) -> Option<TransportEvent>;
	fn member_id(&self) -> MemberId;
	fn current_members(&self) -> Vec<MemberId>;
}
