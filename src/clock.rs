use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Wall clock used for stamping state declarations and projecting playback
/// positions. In test mode, time stands still and is advanced by hand.
#[derive(Clone, Default)]
pub struct Clock {
	test_time: Option<Arc<Mutex<DateTime<Utc>>>>,
}

impl Clock {
	pub fn test() -> Self {
		Self {
			test_time: Some(Arc::new(Mutex::new(Utc::now()))),
		}
	}

	pub fn now(&self) -> DateTime<Utc> {
		match &self.test_time {
			None => Utc::now(),
			Some(test_time) => *test_time.lock(),
		}
	}

	pub fn advance(&self, by_duration: Duration) {
		let test_time = self.test_time.as_ref().expect("Can only be called in test mode.");
		let mut test_time = test_time.lock();
		*test_time = *test_time + by_duration;
	}
}
