use crate::clock::Clock;
use crate::configuration::Configuration;
use crate::error::WatchsyncError;
use crate::media::simulated::SimulatedMediaElement;
use crate::member::MemberId;
use crate::session::{Session, SessionEvent, UserCommand};
use crate::transport::local::LocalHub;
use futures_channel::mpsc::{self, UnboundedSender};
use futures_util::StreamExt;
use log::info;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(clap::Parser)]
pub struct Commandline {
	#[clap(short = 'c', long = "config-file", default_value = "configuration.toml")]
	pub configuration_file_path: String,
	#[clap(subcommand)]
	pub command: Option<BaseCommand>,
}

#[derive(clap::Parser)]
pub enum BaseCommand {
	/// Run a demonstration group session with two synchronized local members
	Run,
	/// Print the configuration
	Configuration,
}

impl Default for BaseCommand {
	fn default() -> Self {
		Self::Run
	}
}

impl Commandline {
	pub async fn run(self) -> Result<(), WatchsyncError> {
		let configuration = Configuration::from_file(&self.configuration_file_path)?;

		env_logger::Builder::new()
			.parse_filters(&configuration.log_filters)
			.init();

		match self.command.unwrap_or_default() {
			BaseCommand::Run => run_demonstration(&configuration).await?,
			BaseCommand::Configuration => println!("{configuration:?}"),
		}
		Ok(())
	}
}

/// Spin up an in-process group session and walk it through the motions:
/// one member starts playback, a second joins late and catches up, playback
/// is restarted from the beginning and finally paused.
async fn run_demonstration(configuration: &Configuration) -> Result<(), WatchsyncError> {
	let clock = Clock::default();
	let hub = LocalHub::new();

	info!("Starting a demonstration session for '{}'", configuration.track_id);

	let (alice_commands, alice_task) = spawn_member("alice", &hub, configuration, &clock).await;
	alice_commands.unbounded_send(UserCommand::Play).ok();
	tokio::time::sleep(Duration::from_millis(1500)).await;

	// bob joins while the session is already playing
	let (bob_commands, bob_task) = spawn_member("bob", &hub, configuration, &clock).await;
	tokio::time::sleep(Duration::from_millis(1500)).await;

	alice_commands.unbounded_send(UserCommand::StartOver).ok();
	tokio::time::sleep(Duration::from_millis(1000)).await;

	bob_commands.unbounded_send(UserCommand::Pause).ok();
	tokio::time::sleep(Duration::from_millis(500)).await;

	alice_commands.unbounded_send(UserCommand::Shutdown).ok();
	bob_commands.unbounded_send(UserCommand::Shutdown).ok();
	alice_task.await?;
	bob_task.await?;

	info!("Demonstration session finished");
	Ok(())
}

async fn spawn_member(
	name: &'static str,
	hub: &LocalHub,
	configuration: &Configuration,
	clock: &Clock,
) -> (UnboundedSender<UserCommand>, JoinHandle<()>) {
	let (transport, initial_state) = hub.join(MemberId::random());
	let media = SimulatedMediaElement::new(clock.clone());
	let (event_sender, mut event_receiver) = mpsc::unbounded();

	let mut session = Session::new(transport, media, configuration, clock.clone(), event_sender);
	session.synchronize(initial_state).await;

	tokio::spawn(async move {
		while let Some(event) = event_receiver.next().await {
			match event {
				SessionEvent::StateChanged(state) => info!(
					"[{name}] {:?} at {}ms (declared by {})",
					state.action,
					state.position.num_milliseconds(),
					state.originator
				),
				other => info!("[{name}] {other:?}"),
			}
		}
	});

	let (command_sender, command_receiver) = mpsc::unbounded();
	let (_media_error_sender, media_error_receiver) = mpsc::unbounded();
	let task = tokio::spawn(session.run(command_receiver, media_error_receiver));

	(command_sender, task)
}
