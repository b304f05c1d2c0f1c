//! Scheduled polling with cancellation and terminal detection.
//!
//! A [`StatusPoller`] probes once immediately and then once per interval until
//! the probe reports a terminal answer, the attempt budget or time budget runs
//! out, or the shared [`StopHandle`] is triggered. Callers that need to update
//! their own state between probes drive a [`PollTicker`] directly.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Shared cancellation flag, checked before every poll.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
	inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
	stopped: AtomicBool,
	notify: Notify,
}

impl StopHandle {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stops every poller holding this handle. Sleeping pollers wake up.
	pub fn stop(&self) {
		self.inner.stopped.store(true, Ordering::SeqCst);
		self.inner.notify.notify_waiters();
	}

	pub fn is_stopped(&self) -> bool {
		self.inner.stopped.load(Ordering::SeqCst)
	}

	async fn stopped(&self) {
		if !self.is_stopped() {
			self.inner.notify.notified().await;
		}
	}
}

/// Answer of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
	/// Terminal answer; polling stops.
	Ready(T),
	/// Not there yet; carries the observed status.
	Pending(String),
}

/// Why polling ended without a terminal answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollStop {
	#[error("polling cancelled")]
	Cancelled,
	#[error("no terminal status after {attempts} attempts")]
	Exhausted { attempts: u32 },
	#[error("no terminal status after {}s", .elapsed.as_secs())]
	TimedOut { elapsed: Duration },
}

/// Failure of [`StatusPoller::run`].
#[derive(Debug, Error)]
pub enum PollError<E> {
	#[error(transparent)]
	Stopped(PollStop),
	/// The probe itself failed.
	#[error("probe failed: {0}")]
	Probe(E),
}

/// Polling schedule.
#[derive(Debug, Clone)]
pub struct StatusPoller {
	interval: Duration,
	max_attempts: Option<u32>,
	timeout: Option<Duration>,
	stop: StopHandle,
}

impl StatusPoller {
	pub fn new(interval: Duration) -> Self {
		Self {
			interval,
			max_attempts: None,
			timeout: None,
			stop: StopHandle::new(),
		}
	}

	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = Some(max_attempts);
		self
	}

	/// Bounds the total polling time. `None` polls until stopped.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
		self.stop = stop;
		self
	}

	pub fn stop_handle(&self) -> StopHandle {
		self.stop.clone()
	}

	/// Starts a schedule. The first tick fires immediately.
	pub fn ticker(&self) -> PollTicker<'_> {
		PollTicker {
			poller: self,
			started: Instant::now(),
			attempts: 0,
		}
	}

	/// Invokes `probe` on schedule until it answers [`PollOutcome::Ready`].
	///
	/// The probe receives the 1-based attempt number.
	pub async fn run<T, E, F, Fut>(&self, mut probe: F) -> Result<T, PollError<E>>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<PollOutcome<T>, E>>,
	{
		let mut ticker = self.ticker();
		loop {
			let attempt = ticker.tick().await.map_err(PollError::Stopped)?;
			match probe(attempt).await.map_err(PollError::Probe)? {
				PollOutcome::Ready(value) => return Ok(value),
				PollOutcome::Pending(status) => {
					tracing::debug!(attempt, status = %status, "Still pending");
				},
			}
		}
	}
}

/// One running schedule of a [`StatusPoller`].
pub struct PollTicker<'a> {
	poller: &'a StatusPoller,
	started: Instant,
	attempts: u32,
}

impl PollTicker<'_> {
	/// Waits for the next poll slot and returns its 1-based attempt number.
	pub async fn tick(&mut self) -> Result<u32, PollStop> {
		let poller = self.poller;
		if poller.stop.is_stopped() {
			return Err(PollStop::Cancelled);
		}
		if let Some(max) = poller.max_attempts {
			if self.attempts >= max {
				return Err(PollStop::Exhausted {
					attempts: self.attempts,
				});
			}
		}

		if self.attempts > 0 {
			tokio::select! {
				_ = tokio::time::sleep(poller.interval) => {},
				_ = poller.stop.stopped() => {},
			}
			if poller.stop.is_stopped() {
				return Err(PollStop::Cancelled);
			}
		}

		if let Some(timeout) = poller.timeout {
			let elapsed = self.started.elapsed();
			if elapsed >= timeout {
				return Err(PollStop::TimedOut { elapsed });
			}
		}

		self.attempts += 1;
		Ok(self.attempts)
	}

	/// Polls performed so far.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}
}
