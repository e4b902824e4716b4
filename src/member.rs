use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MemberId(uuid::Uuid);

impl MemberId {
	pub fn random() -> Self {
		Self(uuid::Uuid::new_v4())
	}
}

impl From<uuid::Uuid> for MemberId {
	fn from(id: uuid::Uuid) -> Self {
		MemberId(id)
	}
}

impl Display for MemberId {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "MemberId({})", self.0)
	}
}

/// This client's own participation in the group session. Local playback
/// controls stay disabled until the initial state seed has completed so that
/// user intents can't race an uninitialized replica.
#[derive(Debug)]
pub struct MemberView {
	member_id: MemberId,
	joined_at: DateTime<Utc>,
	controls_enabled: bool,
}

impl MemberView {
	pub fn new(member_id: MemberId, joined_at: DateTime<Utc>) -> Self {
		Self {
			member_id,
			joined_at,
			controls_enabled: false,
		}
	}

	pub fn member_id(&self) -> MemberId {
		self.member_id
	}

	pub fn joined_at(&self) -> DateTime<Utc> {
		self.joined_at
	}

	pub fn enable_controls(&mut self) {
		self.controls_enabled = true;
	}

	pub fn controls_enabled(&self) -> bool {
		self.controls_enabled
	}
}
