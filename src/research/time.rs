//! Time abstraction for test timeouts and retry backoff.
//!
//! The orchestrator never reads a clock directly; it only sleeps through a
//! [`TimeProvider`], so tests can substitute timers that fire immediately or
//! never.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, Either};
use thiserror::Error;

/// Errors that can occur during time operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
	/// The operation timed out.
	#[error("operation timed out")]
	Elapsed,

	/// No timer facility is reachable (e.g. no browser window).
	#[error("timer unavailable: {0}")]
	Unavailable(String),
}

/// Sleeping, in whatever environment the experiment runs.
#[async_trait(?Send)]
pub trait TimeProvider {
	/// Resolve after `duration`.
	async fn sleep(&self, duration: Duration) -> Result<(), TimeError>;
}

/// Run `future` with a time budget.
///
/// Returns `Err(TimeError::Elapsed)` if the sleep finishes first. A failing
/// timer is reported as-is rather than treated as elapsed.
pub async fn timeout<F, T>(
	time: &dyn TimeProvider,
	duration: Duration,
	future: F,
) -> Result<T, TimeError>
where
	F: Future<Output = T>,
{
	let sleep = time.sleep(duration);
	futures::pin_mut!(future);
	match future::select(future, sleep).await {
		Either::Left((value, _)) => Ok(value),
		Either::Right((Ok(()), _)) => Err(TimeError::Elapsed),
		Either::Right((Err(e), _)) => Err(e),
	}
}

/// Browser timers through `window.setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTime;

#[async_trait(?Send)]
impl TimeProvider for BrowserTime {
	async fn sleep(&self, duration: Duration) -> Result<(), TimeError> {
		let window =
			web_sys::window().ok_or_else(|| TimeError::Unavailable("no window".to_owned()))?;
		let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
		let mut scheduled = Ok(0);
		let promise = js_sys::Promise::new(&mut |resolve, _reject| {
			scheduled =
				window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
		});
		scheduled.map_err(|e| TimeError::Unavailable(format!("{e:?}")))?;
		wasm_bindgen_futures::JsFuture::from(promise)
			.await
			.map(|_| ())
			.map_err(|e| TimeError::Unavailable(format!("{e:?}")))
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use super::*;

	/// Sleeps complete immediately.
	#[derive(Debug, Clone, Copy, Default)]
	pub struct InstantTime;

	#[async_trait(?Send)]
	impl TimeProvider for InstantTime {
		async fn sleep(&self, _duration: Duration) -> Result<(), TimeError> {
			Ok(())
		}
	}

	/// Sleeps never complete.
	#[derive(Debug, Clone, Copy, Default)]
	pub struct FrozenTime;

	#[async_trait(?Send)]
	impl TimeProvider for FrozenTime {
		async fn sleep(&self, _duration: Duration) -> Result<(), TimeError> {
			future::pending().await
		}
	}
}
