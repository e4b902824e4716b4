use crate::clock::Clock;
use crate::member::MemberId;
use crate::session::playback_state::{GroupPlaybackState, TrackId, TransportAction};
use chrono::Duration;
use log::debug;

/// This client's replica of the group playback state. All replicas converge
/// because every one of them applies the same acceptance rule: a state is
/// only accepted if it was declared strictly later than the held one,
/// independent of the order in which states arrive.
pub struct PlaybackStateStore {
	member_id: MemberId,
	clock: Clock,
	current: Option<GroupPlaybackState>,
}

impl PlaybackStateStore {
	pub fn new(member_id: MemberId, clock: Clock) -> Self {
		Self {
			member_id,
			clock,
			current: None,
		}
	}

	/// Initialize the replica from the state a joined session already holds.
	/// Anything arriving after the seed goes through the acceptance rule.
	pub fn seed(&mut self, state: GroupPlaybackState) {
		if self.current.is_some() {
			self.apply_incoming(state);
		} else {
			self.current = Some(state);
		}
	}

	/// Stamp a local user intent and apply it optimistically. Returns the
	/// stamped state so the caller can broadcast it to the group.
	///
	/// The declaration time is nudged past the held state's if the wall
	/// clocks tie, so a local intent always supersedes the state it was
	/// derived from.
	pub fn propose(&mut self, track_id: TrackId, action: TransportAction, position: Duration) -> GroupPlaybackState {
		let mut declared_at = self.clock.now();
		if let Some(current) = &self.current {
			if declared_at <= current.declared_at {
				declared_at = current.declared_at + Duration::milliseconds(1);
			}
		}

		let state = GroupPlaybackState {
			track_id,
			action,
			position: position.max(Duration::zero()),
			declared_at,
			originator: self.member_id,
		};
		self.current = Some(state.clone());
		state
	}

	/// Accept an inbound state only if it supersedes the held one. Stale
	/// states are dropped silently; this also drops the echo of our own
	/// broadcasts, which carry an equal declaration time.
	pub fn apply_incoming(&mut self, state: GroupPlaybackState) -> bool {
		if let Some(current) = &self.current {
			if !state.supersedes(current) {
				debug!(
					"Dropping stale state from {} declared at {}, holding one declared at {}",
					state.originator, state.declared_at, current.declared_at
				);
				return false;
			}
		}

		self.current = Some(state);
		true
	}

	pub fn current(&self) -> Option<&GroupPlaybackState> {
		self.current.as_ref()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use rand::seq::SliceRandom;

	fn test_store(clock: &Clock) -> PlaybackStateStore {
		PlaybackStateStore::new(MemberId::random(), clock.clone())
	}

	fn incoming_state(position_seconds: i64, clock: &Clock) -> GroupPlaybackState {
		GroupPlaybackState {
			track_id: "The Universe".into(),
			action: TransportAction::Play,
			position: Duration::seconds(position_seconds),
			declared_at: clock.now(),
			originator: MemberId::random(),
		}
	}

	#[test]
	fn propose_should_stamp_originator_and_declaration_time() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let state = store.propose("The Universe".into(), TransportAction::Play, Duration::seconds(13));

		assert_eq!(store.member_id, state.originator);
		assert_eq!(clock.now(), state.declared_at);
		assert_eq!(Some(&state), store.current());
	}

	#[test]
	fn propose_should_clamp_negative_positions() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let state = store.propose("The Universe".into(), TransportAction::Pause, Duration::seconds(-13));

		assert_eq!(Duration::zero(), state.position);
	}

	#[test]
	fn propose_should_supersede_the_held_state_even_when_clocks_tie() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let first = store.propose("The Universe".into(), TransportAction::Play, Duration::zero());
		let second = store.propose("The Universe".into(), TransportAction::Pause, Duration::zero());

		assert!(second.supersedes(&first));
		assert_eq!(Some(&second), store.current());
	}

	#[test]
	fn apply_incoming_should_reject_older_states() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let older = incoming_state(10, &clock);
		clock.advance(Duration::seconds(1));
		let newer = incoming_state(20, &clock);

		assert!(store.apply_incoming(newer.clone()));
		assert!(!store.apply_incoming(older));
		assert_eq!(Some(&newer), store.current());
	}

	#[test]
	fn apply_incoming_should_reject_equal_declaration_times() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let state = incoming_state(10, &clock);
		let echo = incoming_state(20, &clock);

		assert!(store.apply_incoming(state.clone()));
		assert!(!store.apply_incoming(echo));
		assert_eq!(Some(&state), store.current());
	}

	#[test]
	fn apply_incoming_should_never_decrease_the_declaration_time() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let mut states = vec![];
		for position in 0..10 {
			states.push(incoming_state(position, &clock));
			clock.advance(Duration::milliseconds(10));
		}

		let mut rng = rand::rng();
		states.shuffle(&mut rng);

		let mut highest_accepted = None;
		for state in states {
			let declared_at = state.declared_at;
			if store.apply_incoming(state) {
				assert!(Some(declared_at) > highest_accepted);
				highest_accepted = Some(declared_at);
			}
		}
	}

	#[test]
	fn replicas_should_converge_regardless_of_delivery_order() {
		let clock = Clock::test();

		let mut proposals = vec![];
		for member in 0..3 {
			let mut store = test_store(&clock);
			for position in 0..4 {
				clock.advance(Duration::milliseconds(7));
				proposals.push(store.propose(
					"The Universe".into(),
					TransportAction::Play,
					Duration::seconds(member * 100 + position),
				));
			}
		}
		let winner = proposals
			.iter()
			.max_by_key(|state| state.declared_at)
			.expect("No proposals")
			.clone();

		let mut rng = rand::rng();
		for _ in 0..20 {
			let mut delivery_order = proposals.clone();
			delivery_order.shuffle(&mut rng);

			let mut replica = test_store(&clock);
			for state in delivery_order {
				replica.apply_incoming(state);
			}

			assert_eq!(Some(&winner), replica.current());
		}
	}

	#[test]
	fn seed_should_initialize_an_empty_replica() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let state = incoming_state(30, &clock);
		store.seed(state.clone());

		assert_eq!(Some(&state), store.current());
	}

	#[test]
	fn seeding_twice_should_fall_back_to_the_acceptance_rule() {
		let clock = Clock::test();
		let mut store = test_store(&clock);

		let first = incoming_state(30, &clock);
		let stale = incoming_state(50, &clock);

		store.seed(first.clone());
		store.seed(stale);

		assert_eq!(Some(&first), store.current());
	}
}
