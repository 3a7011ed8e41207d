//! A "scope guard" that will reset a port's timeout when it goes out of scope.

use crate::{backend::Backend, port::Port};
use std::{io, time::Duration};

/// A "scope guard" that will update the port's read timeout and then reset it
/// when it goes out of scope.
///
/// To create a guard, use the port's [`timeout_guard`](Port::timeout_guard) method.
///
/// While the guard is in scope, the port can only be accessed through the guard.
/// However, because the guard implements [`Deref`](std::ops::Deref) and
/// [`DerefMut`](std::ops::DerefMut) callers can treat the guard as the port.
///
/// Slow commands, such as homing, reply only once the motion completes, long
/// after the default read timeout. Extend the timeout for just those commands:
///
/// ```
/// # use marsproto::{backend::Backend, error::Error, port::Port, command::Command};
/// # use std::time::Duration;
/// # fn wrapper<B: Backend>(port: &mut Port<B>) -> Result<(), Error> {
/// let mut guard = port.timeout_guard(Some(Duration::from_secs(30)))?;
/// guard.command_reply(Command::move_to_home())?;
/// // The original timeout is restored here.
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TimeoutGuard<'a, B: Backend> {
	/// The underlying port.
	port: &'a mut Port<B>,
	/// The original timeout that will be restored when the guard is dropped.
	original_timeout: Option<Duration>,
}

impl<'a, B: Backend> TimeoutGuard<'a, B> {
	/// Update the port's timeout and return a [`TimeoutGuard`] wrapping the port.
	pub(crate) fn new(port: &'a mut Port<B>, timeout: Option<Duration>) -> Result<Self, io::Error> {
		let backend = port.backend_mut();
		let original_timeout = backend.read_timeout()?;
		backend.set_read_timeout(timeout)?;
		log::trace!("read timeout changed from {original_timeout:?} to {timeout:?}");
		Ok(TimeoutGuard {
			port,
			original_timeout,
		})
	}
}

impl<B: Backend> std::ops::Deref for TimeoutGuard<'_, B> {
	type Target = Port<B>;
	/// Get a shared reference to the underlying port.
	fn deref(&self) -> &Self::Target {
		self.port
	}
}

impl<B: Backend> std::ops::DerefMut for TimeoutGuard<'_, B> {
	/// Get an exclusive reference to the underlying port.
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.port
	}
}

impl<B: Backend> std::ops::Drop for TimeoutGuard<'_, B> {
	fn drop(&mut self) {
		if let Err(err) = self
			.port
			.backend_mut()
			.set_read_timeout(self.original_timeout)
		{
			self.port.poison(io::Error::new(
				io::ErrorKind::Other,
				if let Some(timeout) = self.original_timeout {
					format!(
						"failed to reset timeout to {} ms: {}",
						timeout.as_millis(),
						err
					)
				} else {
					format!("failed to reset to an infinite timeout: {err}")
				},
			));
		}
	}
}
