use crate::member::MemberId;
use crate::message::StateChangeBroadcast;
use crate::transport::{GroupTransport, TransportError, TransportEvent};
use async_trait::async_trait;
use futures_channel::mpsc;
use futures_util::StreamExt;
use log::{error, info};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What travels over the in-process wire. State changes are carried as the
/// serialized JSON a real transport would deliver, so every member goes
/// through the same encode/decode path as it would remotely.
enum Delivery {
	State(String),
	MemberJoined(MemberId),
	MemberLeft(MemberId),
}

struct HubInner {
	members: BTreeMap<MemberId, mpsc::UnboundedSender<Delivery>>,
	/// The hub's view of the winning state, handed to late joiners.
	current_state: Option<StateChangeBroadcast>,
	closed: bool,
}

impl HubInner {
	fn deliver_to_all(&self, delivery_for: impl Fn() -> Delivery) {
		for sender in self.members.values() {
			// a member that is gone but not yet removed just misses out
			let _ = sender.unbounded_send(delivery_for());
		}
	}
}

/// In-process stand-in for the group broadcast primitive: per-sender ordered,
/// delivers to every current member including the sender. The sender's own
/// echo is dropped by the store's acceptance rule, not by the transport.
#[derive(Clone, Default)]
pub struct LocalHub {
	inner: Arc<Mutex<HubInner>>,
}

impl Default for HubInner {
	fn default() -> Self {
		Self {
			members: BTreeMap::new(),
			current_state: None,
			closed: false,
		}
	}
}

impl LocalHub {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a member to the session. Returns its transport handle and the
	/// state the session currently holds, for late-join seeding.
	pub fn join(&self, member_id: MemberId) -> (LocalTransport, Option<StateChangeBroadcast>) {
		let (sender, receiver) = mpsc::unbounded();

		let mut inner = self.inner.lock();
		inner.deliver_to_all(|| Delivery::MemberJoined(member_id));
		inner.members.insert(member_id, sender);
		let current_state = inner.current_state.clone();

		info!("{member_id} joined the session, {} members total", inner.members.len());

		let transport = LocalTransport {
			member_id,
			hub: Arc::clone(&self.inner),
			receiver,
		};
		(transport, current_state)
	}

	/// Tear the session down. All members see their event streams end.
	pub fn close(&self) {
		let mut inner = self.inner.lock();
		inner.closed = true;
		inner.members.clear();
	}
}

pub struct LocalTransport {
	member_id: MemberId,
	hub: Arc<Mutex<HubInner>>,
	receiver: mpsc::UnboundedReceiver<Delivery>,
}

#[async_trait]
impl GroupTransport for LocalTransport {
	async fn broadcast(&self, broadcast: StateChangeBroadcast) -> Result<(), TransportError> {
		let json = broadcast.to_json();

		let mut inner = self.hub.lock();
		if inner.closed || !inner.members.contains_key(&self.member_id) {
			return Err(TransportError::SessionClosed);
		}

		let is_newer = match &inner.current_state {
			Some(current) => broadcast.declared_at > current.declared_at,
			None => true,
		};
		if is_newer {
			inner.current_state = Some(broadcast);
		}

		inner.deliver_to_all(|| Delivery::State(json.clone()));
		Ok(())
	}

	async fn receive(&mut self) -> Option<TransportEvent> {
		loop {
			match self.receiver.next().await? {
				Delivery::State(json) => match StateChangeBroadcast::try_from(json.as_str()) {
					Ok(broadcast) => return Some(TransportEvent::StateChange(broadcast)),
					Err(error) => {
						error!("Dropping undecodable broadcast: {error}");
					}
				},
				Delivery::MemberJoined(member_id) => return Some(TransportEvent::MemberJoined(member_id)),
				Delivery::MemberLeft(member_id) => return Some(TransportEvent::MemberLeft(member_id)),
			}
		}
	}

	fn member_id(&self) -> MemberId {
		self.member_id
	}

	fn current_members(&self) -> Vec<MemberId> {
		self.hub.lock().members.keys().copied().collect()
	}
}

impl Drop for LocalTransport {
	fn drop(&mut self) {
		let mut inner = self.hub.lock();
		if inner.members.remove(&self.member_id).is_some() {
			inner.deliver_to_all(|| Delivery::MemberLeft(self.member_id));
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::session::playback_state::{GroupPlaybackState, TrackId, TransportAction};
	use chrono::{Duration, Utc};

	fn test_broadcast(member_id: MemberId, position_in_milliseconds: u64) -> StateChangeBroadcast {
		StateChangeBroadcast::from(GroupPlaybackState {
			track_id: TrackId::from("The Universe"),
			action: TransportAction::Play,
			position: Duration::milliseconds(
				i64::try_from(position_in_milliseconds).expect("Position does not fit into an i64"),
			),
			declared_at: Utc::now(),
			originator: member_id,
		})
	}

	#[tokio::test]
	async fn broadcasts_should_arrive_in_sender_order() {
		let hub = LocalHub::new();
		let sender_id = MemberId::random();
		let (sender, _) = hub.join(sender_id);
		let (mut receiver, _) = hub.join(MemberId::random());

		for position in 0..3 {
			sender
				.broadcast(test_broadcast(sender_id, position))
				.await
				.expect("Failed to broadcast");
		}

		for position in 0..3 {
			let event = receiver.receive().await.expect("Event stream ended prematurely");
			match event {
				TransportEvent::StateChange(broadcast) => {
					assert_eq!(position, broadcast.position_in_milliseconds);
				}
				other => panic!("Expected state change, got {other:?}"),
			}
		}
	}

	#[tokio::test]
	async fn sender_should_receive_its_own_echo() {
		let hub = LocalHub::new();
		let sender_id = MemberId::random();
		let (mut sender, _) = hub.join(sender_id);

		let broadcast = test_broadcast(sender_id, 42);
		sender.broadcast(broadcast.clone()).await.expect("Failed to broadcast");

		assert_eq!(
			Some(TransportEvent::StateChange(broadcast)),
			sender.receive().await,
		);
	}

	#[tokio::test]
	async fn late_joiner_should_get_the_current_state() {
		let hub = LocalHub::new();
		let sender_id = MemberId::random();
		let (sender, initial_state) = hub.join(sender_id);
		assert_eq!(None, initial_state);

		let broadcast = test_broadcast(sender_id, 1337);
		sender.broadcast(broadcast.clone()).await.expect("Failed to broadcast");

		let (_late_joiner, initial_state) = hub.join(MemberId::random());
		assert_eq!(Some(broadcast), initial_state);
	}

	#[tokio::test]
	async fn members_should_be_notified_about_joins_and_leaves() {
		let hub = LocalHub::new();
		let (mut observer, _) = hub.join(MemberId::random());

		let other_id = MemberId::random();
		let (other, _) = hub.join(other_id);
		assert_eq!(Some(TransportEvent::MemberJoined(other_id)), observer.receive().await);
		assert_eq!(2, observer.current_members().len());

		drop(other);
		assert_eq!(Some(TransportEvent::MemberLeft(other_id)), observer.receive().await);
		assert_eq!(1, observer.current_members().len());
	}

	#[tokio::test]
	async fn broadcasting_into_a_closed_session_should_fail() {
		let hub = LocalHub::new();
		let sender_id = MemberId::random();
		let (sender, _) = hub.join(sender_id);

		hub.close();

		assert_eq!(
			Err(TransportError::SessionClosed),
			sender.broadcast(test_broadcast(sender_id, 0)).await,
		);
	}

	#[tokio::test]
	async fn closing_the_hub_should_end_the_event_streams() {
		let hub = LocalHub::new();
		let (mut member, _) = hub.join(MemberId::random());

		hub.close();

		assert_eq!(None, member.receive().await);
	}
}
