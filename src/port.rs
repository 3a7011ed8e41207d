//! Types for opening and using a serial connection to a printer.
//!
//! All communication with a printer goes through a [`Port`]. The protocol is
//! strictly request then response: a command is written, and for commands that
//! reply, exactly one line is read back.
//!
//! ```rust
//! # use marsproto::{command::Command, error::Error, port::Port};
//! # fn wrapper() -> Result<(), Error> {
//! let mut port = Port::open_serial("/dev/serial0")?;
//! let reply = port.command_reply(Command::firmware_version())?;
//! println!("{}", reply.firmware_version()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Framing
//!
//! The firmware does not mark the end of a reply, and some replies span
//! several lines. A port reads exactly one line (up to and including `\n`) and
//! then discards up to [`DRAIN_LIMIT`] bytes that are still buffered, so that
//! leftovers from one reply are not mistaken for the next one. Anything after
//! the first line of a multi-line reply is lost. The wait for trailing bytes is
//! capped at [`DRAIN_TIMEOUT`], whatever the port's read timeout is.
//!
//! A reply cut off by the read timeout before its line feed is a
//! [`ProtocolViolation`](Error::ProtocolViolation).

mod options;
#[cfg(test)]
mod test;

#[cfg(any(test, feature = "mock"))]
use crate::backend::Mock;
use crate::{
	backend::{Backend, Serial, UNKNOWN_BACKEND_NAME},
	command::Command,
	error::{Error, ProtocolViolationError},
	response::{check::Check, Response},
	timeout_guard::TimeoutGuard,
};
pub use options::*;
use std::{io, time::Duration};

/// The maximum number of bytes discarded after reading a reply's first line.
pub const DRAIN_LIMIT: usize = 1024;

/// The longest time to wait for trailing bytes after a reply's first line.
pub const DRAIN_TIMEOUT: Duration = OpenSerialOptions::DEFAULT_TIMEOUT;

/// The byte that ends a line of a reply.
pub(crate) const LINE_FEED: u8 = b'\n';

/// A connection to a printer.
///
/// A port is parameterized by the type of [`Backend`] used to send/receive
/// bytes. Use [`open_serial`](Port::open_serial) to open a serial port
/// (`Port<Serial>`), or [`OpenSerialOptions`] to customize how it is opened.
///
/// The backend is released when the port is dropped.
pub struct Port<B> {
	/// The underlying backend
	backend: B,
	/// If populated, the error that has "poisoned" the port. This error MUST be
	/// reported before the port is used for communication again.
	///
	/// A port becomes "poisoned" when an error occurs that cannot be reported
	/// where it happened, such as a [`TimeoutGuard`] failing to restore the
	/// original timeout in its Drop implementation.
	poison: Option<io::Error>,
}

impl<B: Backend> std::fmt::Debug for Port<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Port")
			.field("name", &self.backend.name())
			.finish_non_exhaustive()
	}
}

impl Port<Serial> {
	/// Open the serial port at the specified path using the default options.
	///
	/// Alternatively, use [`Port::open_serial_options`] to customize how the port is opened.
	///
	/// ## Example
	///
	/// ```rust
	/// # use marsproto::port::Port;
	/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
	/// let mut port = Port::open_serial("/dev/serial0")?;
	/// // Or equivalently
	/// let mut port = Port::open_serial_options().open("/dev/serial0")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn open_serial(path: &str) -> Result<Port<Serial>, Error> {
		OpenSerialOptions::new().open(path)
	}

	/// Get an [`OpenSerialOptions`] to customize how a serial port is opened.
	pub fn open_serial_options() -> OpenSerialOptions {
		OpenSerialOptions::default()
	}
}

#[cfg(any(test, feature = "mock"))]
impl Port<Mock> {
	/// Open a port backed by an in-memory [`Mock`].
	pub fn open_mock() -> Port<Mock> {
		Port::from_backend(Mock::new())
	}
}

impl<B: Backend> Port<B> {
	/// Create a `Port` from a [`Backend`] type.
	pub(crate) fn from_backend(backend: B) -> Self {
		let port = Port {
			backend,
			poison: None,
		};
		log::info!("{} opened", port.name());
		port
	}

	/// The name of the backend, for logging.
	fn name(&self) -> String {
		self.backend
			.name()
			.unwrap_or_else(|| UNKNOWN_BACKEND_NAME.to_string())
	}

	/// Check if the port is poisoned and report the error if it exists.
	fn check_poisoned(&mut self) -> Result<(), io::Error> {
		if let Some(poison) = self.poison.take() {
			Err(poison)
		} else {
			Ok(())
		}
	}

	/// Poison the port, so `e` is reported by the next operation.
	pub(crate) fn poison(&mut self, e: io::Error) {
		log::warn!("{} poisoned: {}", self.name(), e);
		self.poison = Some(e);
	}

	/// Get a shared reference to the underlying backend.
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// Get an exclusive reference to the underlying backend.
	///
	/// Bytes read from or written to the backend directly bypass the port's
	/// framing.
	pub fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	/// Consume the port and return the underlying backend.
	pub fn into_backend(self) -> B {
		self.backend
	}

	/// Get the port's read timeout.
	pub fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		self.backend.read_timeout()
	}

	/// Set the port's read timeout.
	///
	/// To change the timeout only temporarily, use [`timeout_guard`](Port::timeout_guard).
	pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		self.backend.set_read_timeout(timeout)
	}

	/// Set the port's read timeout until the returned guard is dropped.
	///
	/// See [`TimeoutGuard`] for an example.
	pub fn timeout_guard(
		&mut self,
		timeout: Option<Duration>,
	) -> Result<TimeoutGuard<'_, B>, io::Error> {
		TimeoutGuard::new(self, timeout)
	}

	/// Send a command. A reply is not read.
	///
	/// The command bytes are written verbatim.
	///
	/// ## Example
	///
	/// ```rust
	/// # use marsproto::{backend::Backend, command::Command, port::Port};
	/// # fn wrapper<B: Backend>(mut port: Port<B>) -> Result<(), Box<dyn std::error::Error>> {
	/// port.command(Command::reboot(0))?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn command<C: Into<Command>>(&mut self, cmd: C) -> Result<(), Error> {
		self.internal_command(&cmd.into())
	}

	fn internal_command(&mut self, cmd: &Command) -> Result<(), Error> {
		self.check_poisoned()?;
		log::debug!("{} TX:   {}", self.name(), cmd);
		self.backend.write_all(cmd.as_bytes())?;
		self.backend.flush()?;
		Ok(())
	}

	/// Transmit a command and receive its reply.
	///
	/// Exactly one line is read and any bytes buffered after it, up to
	/// [`DRAIN_LIMIT`], are discarded.
	///
	/// The contents of the reply are not checked. Use one of the decoding
	/// methods on [`Response`] or [`command_reply_with_check`](Port::command_reply_with_check).
	///
	/// ## Example
	///
	/// ```rust
	/// # use marsproto::{backend::Backend, command::Command, port::Port};
	/// # fn wrapper<B: Backend>(mut port: Port<B>) -> Result<(), Box<dyn std::error::Error>> {
	/// let z = port.command_reply(Command::z_position())?.z_position()?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn command_reply<C: Into<Command>>(&mut self, cmd: C) -> Result<Response, Error> {
		self.internal_command(&cmd.into())?;
		self.response()
	}

	/// Transmit a command, receive its reply, and check the reply with the
	/// custom [`Check`].
	///
	/// ## Example
	///
	/// ```rust
	/// # use marsproto::{backend::Backend, command::Command, port::Port, response::check};
	/// # fn wrapper<B: Backend>(mut port: Port<B>) -> Result<(), Box<dyn std::error::Error>> {
	/// port.command_reply_with_check(Command::pause_printing(), check::ok())?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn command_reply_with_check<C, K>(&mut self, cmd: C, checker: K) -> Result<Response, Error>
	where
		C: Into<Command>,
		K: Check,
	{
		Ok(self.command_reply(cmd)?.check(checker)?)
	}

	/// Receive a single reply without sending a command first.
	///
	/// The same framing as [`command_reply`](Port::command_reply) applies.
	pub fn response(&mut self) -> Result<Response, Error> {
		self.check_poisoned()?;
		let (bytes, complete) = self.read_line_bytes()?;
		log::debug!(
			"{} RECV: {}",
			self.name(),
			String::from_utf8_lossy(&bytes).trim_end()
		);
		let drained = self.bounded_drain()?;
		if drained > 0 {
			log::trace!("{} discarded {} trailing bytes", self.name(), drained);
		}
		if !complete {
			return Err(ProtocolViolationError::new(
				String::from_utf8_lossy(&bytes),
				"reply ended before the line terminator",
			)
			.into());
		}
		Ok(Response::from_bytes(bytes)?)
	}

	/// Read the bytes of one line, including the line feed.
	///
	/// Also returns whether the line feed was read. If the port times out part
	/// way through a line, the partial line is returned as incomplete. If it
	/// times out before any byte arrives, the timeout error is returned.
	fn read_line_bytes(&mut self) -> Result<(Vec<u8>, bool), Error> {
		let mut buf = Vec::with_capacity(64);
		let mut complete = false;
		for byte in io::Read::bytes(&mut self.backend) {
			match byte {
				Ok(byte) => {
					buf.push(byte);
					if byte == LINE_FEED {
						complete = true;
						break;
					}
				}
				Err(e) if e.kind() == io::ErrorKind::TimedOut && !buf.is_empty() => break,
				Err(e) => return Err(e.into()),
			}
		}
		if buf.is_empty() {
			return Err(io::Error::new(
				io::ErrorKind::UnexpectedEof,
				"the printer closed the connection",
			)
			.into());
		}
		if !complete {
			log::debug!("{} timed out before the end of the line", self.name());
		}
		Ok((buf, complete))
	}

	/// Drain trailing bytes, waiting at most [`DRAIN_TIMEOUT`] for them.
	///
	/// A longer (or infinite) read timeout is shortened for the drain only.
	fn bounded_drain(&mut self) -> Result<usize, Error> {
		let within_bound = matches!(self.read_timeout()?, Some(timeout) if timeout <= DRAIN_TIMEOUT);
		if within_bound {
			self.drain()
		} else {
			self.timeout_guard(Some(DRAIN_TIMEOUT))?.drain()
		}
	}

	/// Discard up to [`DRAIN_LIMIT`] buffered bytes, returning how many were
	/// discarded.
	fn drain(&mut self) -> Result<usize, Error> {
		let mut buf = [0; DRAIN_LIMIT];
		let mut drained = 0;
		while drained < DRAIN_LIMIT {
			match io::Read::read(&mut self.backend, &mut buf[drained..]) {
				Ok(0) => break,
				Ok(n) => drained += n,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
				Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
				Err(e) => return Err(e.into()),
			}
		}
		Ok(drained)
	}
}
