use crate::commandline::Commandline;
use crate::error::WatchsyncError;
use clap::Parser;

mod clock;
mod commandline;
mod configuration;
mod error;
mod media;
mod member;
mod message;
mod session;
mod transport;

#[tokio::main]
async fn main() -> Result<(), WatchsyncError> {
	let commandline = Commandline::try_parse()?;
	commandline.run().await
}
