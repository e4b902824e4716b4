use crate::clock::Clock;
use crate::configuration::Configuration;
use crate::media::{MediaElement, MediaError, PlaybackError};
use crate::member::MemberView;
use crate::message::StateChangeBroadcast;
use crate::session::dispatcher::ActionDispatcher;
use crate::session::playback_state::{GroupPlaybackState, TrackId, TransportAction};
use crate::session::store::PlaybackStateStore;
use crate::transport::{GroupTransport, TransportError, TransportEvent};
use chrono::Duration;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use log::{error, info, warn};
use thiserror::Error;

pub mod dispatcher;
pub mod drift;
pub mod playback_state;
pub mod recovery;
pub mod store;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
	#[error("Controls are disabled until the session state has been synchronized.")]
	NotYetSynchronized,
}

/// User intents, as issued by the playback controls.
#[derive(Clone, Debug, PartialEq)]
pub enum UserCommand {
	Play,
	Pause,
	SeekTo(Duration),
	StartOver,
	Shutdown,
}

/// Notifications surfaced to the embedding UI layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
	/// The initial state seed completed; local controls are now enabled.
	Synchronized,
	/// A state was accepted and applied to the local element.
	StateChanged(GroupPlaybackState),
	/// A broadcast failed; this client's replica may go stale from now on.
	Desynced,
	/// The local element failed in a way the core does not recover from.
	PlaybackFailed(PlaybackError),
	/// The session has been torn down.
	Left,
}

enum Wake {
	Transport(Option<TransportEvent>),
	Command(Option<UserCommand>),
	MediaError(Option<MediaError>),
	DriftCheck,
}

/// One client's participation in a group session: holds the replica of the
/// group state, owns the local media element through the dispatcher and
/// reconciles the two. All state transitions run as discrete, non-overlapping
/// event handler invocations on a single task.
pub struct Session<Media, Transport> {
	member_view: MemberView,
	store: PlaybackStateStore,
	dispatcher: ActionDispatcher<Media>,
	transport: Transport,
	track_id: TrackId,
	sync_check_interval: std::time::Duration,
	events: UnboundedSender<SessionEvent>,
	desynced: bool,
}

impl<Media, Transport> Session<Media, Transport>
where
	Media: MediaElement,
	Transport: GroupTransport,
{
	pub fn new(
		transport: Transport,
		media: Media,
		configuration: &Configuration,
		clock: Clock,
		events: UnboundedSender<SessionEvent>,
	) -> Self {
		let member_id = transport.member_id();
		let drift_tolerance = Duration::from_std(configuration.drift_tolerance)
			.expect("Drift tolerance does not fit into a chrono::Duration.");

		Self {
			member_view: MemberView::new(member_id, clock.now()),
			store: PlaybackStateStore::new(member_id, clock.clone()),
			dispatcher: ActionDispatcher::new(media, drift_tolerance, clock),
			transport,
			track_id: TrackId::from(configuration.track_id.as_str()),
			sync_check_interval: configuration.sync_check_interval,
			events,
			desynced: false,
		}
	}

	/// Seed the replica from the state the joined session already holds and
	/// align the local element with it, then enable the local controls.
	/// A session without a state yet (this member is the first) just enables
	/// the controls; the first user intent will initialize the group state.
	pub async fn synchronize(&mut self, initial_state: Option<StateChangeBroadcast>) {
		if let Some(broadcast) = initial_state {
			let state = GroupPlaybackState::from(broadcast);
			info!(
				"{} caught up with group state declared at {}",
				self.member_view.member_id(),
				state.declared_at
			);
			self.store.seed(state.clone());
			self.apply_state(state).await;
		}

		self.member_view.enable_controls();
		self.notify(SessionEvent::Synchronized);
	}

	/// Drive the session until the user shuts it down or the transport
	/// closes. `media_errors` carries failures the element reports outside
	/// of a command invocation, e.g. a decode error in the middle of
	/// playback.
	pub async fn run(mut self, mut commands: UnboundedReceiver<UserCommand>, mut media_errors: UnboundedReceiver<MediaError>) {
		let sync_check_interval = self.sync_check_interval;
		let start = tokio::time::Instant::now() + sync_check_interval;
		let mut drift_check = tokio::time::interval_at(start, sync_check_interval);
		let mut media_errors_open = true;

		loop {
			let wake = tokio::select! {
				event = self.transport.receive() => Wake::Transport(event),
				command = commands.next() => Wake::Command(command),
				media_error = media_errors.next(), if media_errors_open => Wake::MediaError(media_error),
				_ = drift_check.tick() => Wake::DriftCheck,
			};

			match wake {
				Wake::Transport(Some(event)) => self.handle_transport_event(event).await,
				Wake::Transport(None) => {
					info!("{} lost its transport, leaving the session", self.member_view.member_id());
					break;
				}
				Wake::Command(Some(UserCommand::Shutdown)) | Wake::Command(None) => break,
				Wake::Command(Some(command)) => {
					if let Err(session_error) = self.handle_user_command(command).await {
						warn!("Ignoring user command: {session_error}");
					}
				}
				Wake::MediaError(Some(media_error)) => self.handle_media_error(media_error).await,
				Wake::MediaError(None) => media_errors_open = false,
				Wake::DriftCheck => self.handle_drift_check().await,
			}
		}

		self.dispatcher.cancel_pending_correction();
		self.notify(SessionEvent::Left);
	}

	async fn handle_user_command(&mut self, command: UserCommand) -> Result<(), SessionError> {
		if !self.member_view.controls_enabled() {
			return Err(SessionError::NotYetSynchronized);
		}

		let current_action = self.store.current().map(|state| state.action);
		let (action, position) = match command {
			UserCommand::Play => (TransportAction::Play, self.dispatcher.local_position()),
			UserCommand::Pause => (TransportAction::Pause, self.dispatcher.local_position()),
			// seeking keeps the current transport state
			UserCommand::SeekTo(position) => (current_action.unwrap_or(TransportAction::Pause), position),
			UserCommand::StartOver => (current_action.unwrap_or(TransportAction::Pause), Duration::zero()),
			UserCommand::Shutdown => unreachable!("Shutdown is handled by the event loop."),
		};

		self.propose_and_apply(action, position).await;
		Ok(())
	}

	async fn propose_and_apply(&mut self, action: TransportAction, position: Duration) {
		let state = self.store.propose(self.track_id.clone(), action, position);

		// optimistically applied, now tell the group
		if let Err(transport_error) = self.transport.broadcast(state.clone().into()).await {
			self.flag_desynced(&transport_error);
		}
		self.apply_state(state).await;
	}

	async fn handle_transport_event(&mut self, event: TransportEvent) {
		match event {
			TransportEvent::StateChange(broadcast) => {
				let state = GroupPlaybackState::from(broadcast);
				if self.store.apply_incoming(state.clone()) {
					self.apply_state(state).await;
				}
			}
			TransportEvent::MemberJoined(member_id) => info!("{member_id} joined the group session"),
			TransportEvent::MemberLeft(member_id) => info!("{member_id} left the group session"),
		}
	}

	async fn apply_state(&mut self, state: GroupPlaybackState) {
		match self.dispatcher.apply(&state).await {
			Ok(()) => self.notify(SessionEvent::StateChanged(state)),
			Err(playback_error) => {
				error!("Failed to apply group state to the local element: {playback_error}");
				self.notify(SessionEvent::PlaybackFailed(playback_error));
			}
		}
	}

	async fn handle_media_error(&mut self, media_error: MediaError) {
		match media_error {
			MediaError::AutoplayBlocked => {
				let group_wants_play = self
					.store
					.current()
					.is_some_and(|state| state.action == TransportAction::Play);
				if group_wants_play {
					if let Err(playback_error) = self.dispatcher.recover_blocked_play().await {
						self.notify(SessionEvent::PlaybackFailed(playback_error));
					}
				}
			}
			other => {
				error!("Media element reported an unrecoverable error: {other}");
				// leave the client in a known degraded state: paused
				self.dispatcher.halt().await;
				self.notify(SessionEvent::PlaybackFailed(other.into()));
			}
		}
	}

	async fn handle_drift_check(&mut self) {
		if let Some(state) = self.store.current().cloned() {
			self.dispatcher.check_drift(&state).await;
		}
	}

	fn flag_desynced(&mut self, transport_error: &TransportError) {
		error!(
			"Broadcast failed: {transport_error}. {} may be out of sync from now on.",
			self.member_view.member_id()
		);
		if !self.desynced {
			self.desynced = true;
			self.notify(SessionEvent::Desynced);
		}
	}

	fn notify(&self, event: SessionEvent) {
		// the UI layer having gone away must not stop synchronization
		let _ = self.events.unbounded_send(event);
	}
}
