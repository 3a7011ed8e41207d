//! Types that can exchange (read/write) bytes with a connected printer.
//!
//! The [`Backend`] trait represents all such types.

use std::io;
use std::time::Duration;

use serialport as sp;

#[cfg(windows)]
use sp::COMPort as ExternSerial;
use sp::SerialPort;
#[cfg(unix)]
use sp::TTYPort as ExternSerial;

/// The placeholder name for a backend that doesn't have a name.
pub(crate) const UNKNOWN_BACKEND_NAME: &str = "<unknown backend>";

/// Types that allow reading and writing bytes with a connected printer.
pub trait Backend: io::Read + io::Write + private::Sealed {
	/// Set the read timeout.
	///
	/// If timeout is `None`, reads will block indefinitely.
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error>;

	/// Get the read timeout.
	///
	/// If timeout is `None`, reads will block indefinitely.
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error>;

	/// Get the "name" of the backend.
	///
	/// This can be in any format, but should uniquely identify the backend
	/// instance.
	fn name(&self) -> Option<String>;
}

impl<C: Backend + ?Sized> Backend for Box<C> {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		(**self).set_read_timeout(timeout)
	}
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		(**self).read_timeout()
	}
	fn name(&self) -> Option<String> {
		(**self).name()
	}
}

/// A platform agnostic serial port backend.
//
// `serialport` exposes `COMPort` on windows and `TTYPort` on unix. Wrapping
// whichever one the platform provides in a newtype keeps the rest of the crate
// free of both dynamic dispatch and an extra type parameter.
#[derive(Debug)]
pub struct Serial(pub(crate) ExternSerial);

impl io::Read for Serial {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.0.read(buf)
	}
}

impl io::Write for Serial {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.0.flush()
	}
}

impl Backend for Serial {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		// The serialport API does not support infinite timeouts, so use the
		// largest possible duration when `timeout` is `None`.
		Ok(self.0.set_timeout(timeout.unwrap_or(Duration::MAX))?)
	}
	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		Ok(Some(self.0.timeout()))
	}
	fn name(&self) -> Option<String> {
		self.0.name()
	}
}

/// A mock backend for use in testing.
///
/// It has the following features:
///   * It records all data written to it.
///   * It can be filled with data for reading.
///   * Specific errors can be inserted for calls to `read`, `write`, `flush`,
///     and `set_read_timeout`.
///
/// When no data is left to read, `read` fails with a
/// [`TimedOut`](io::ErrorKind::TimedOut) error, as a real serial port would
/// once its read timeout elapses.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug)]
pub struct Mock {
	/// The buffer data is read from
	buffer: io::Cursor<Vec<u8>>,
	/// Replies appended to the read buffer one per call to `write`.
	queued_replies: std::collections::VecDeque<Vec<u8>>,
	/// Every byte written to the mock, in order.
	written: Vec<u8>,
	/// The error to surface on the next read, if any. It is only surfaced once.
	read_error: Option<io::Error>,
	/// The error to surface on the next write, if any. It is only surfaced once.
	write_error: Option<io::Error>,
	/// The error to surface on the next flush, if any. It is only surfaced once.
	flush_error: Option<io::Error>,
	/// The error to surface on the next `set_read_timeout`, if any. It is only surfaced once.
	set_read_timeout_error: Option<io::Error>,
	/// The read timeout. Reads never wait, but the timeout of each read is recorded.
	read_timeout: Option<Duration>,
	/// The read timeout in effect for every call to `read`, in order.
	read_timeouts: Vec<Option<Duration>>,
}

#[cfg(any(test, feature = "mock"))]
impl Mock {
	/// Create a new Mock backend.
	pub fn new() -> Self {
		Mock {
			buffer: io::Cursor::new(Vec::new()),
			queued_replies: std::collections::VecDeque::new(),
			written: Vec::new(),
			read_error: None,
			write_error: None,
			flush_error: None,
			set_read_timeout_error: None,
			read_timeout: Some(Duration::ZERO),
			read_timeouts: Vec::new(),
		}
	}
	/// Append data to the read buffer.
	///
	/// The data is not validated in any way.
	pub fn push<T: AsRef<[u8]>>(&mut self, bytes: T) {
		self.buffer.get_mut().extend_from_slice(bytes.as_ref());
	}
	/// Queue data to be appended to the read buffer by a later `write`.
	///
	/// Each `write` releases one queued reply, so a reply only becomes
	/// readable once the command it answers was sent.
	pub fn queue_reply<T: AsRef<[u8]>>(&mut self, bytes: T) {
		self.queued_replies.push_back(bytes.as_ref().to_vec());
	}
	/// Clear the read buffer and any queued replies.
	pub fn clear(&mut self) {
		self.queued_replies.clear();
		self.buffer.get_mut().clear();
		self.buffer.set_position(0);
	}
	/// Whether the mock has any data available or not
	pub fn is_empty(&self) -> bool {
		usize::try_from(self.buffer.position())
			.map_or(true, |pos| pos >= self.buffer.get_ref().len())
	}
	/// The bytes written to the mock so far.
	pub fn written(&self) -> &[u8] {
		&self.written
	}
	/// Take the bytes written to the mock so far, leaving it empty.
	pub fn take_written(&mut self) -> Vec<u8> {
		std::mem::take(&mut self.written)
	}
	/// The read timeout in effect for every call to `read` so far, in order.
	pub fn read_timeouts(&self) -> &[Option<Duration>] {
		&self.read_timeouts
	}
	/// Set the error for the next `read`, if any.
	pub fn read_error(&mut self, err: Option<io::Error>) {
		self.read_error = err;
	}
	/// Set the error for the next `write`, if any.
	pub fn write_error(&mut self, err: Option<io::Error>) {
		self.write_error = err;
	}
	/// Set the error for the next `flush`, if any.
	pub fn flush_error(&mut self, err: Option<io::Error>) {
		self.flush_error = err;
	}
	/// Set the error for the next `set_read_timeout`, if any.
	pub fn set_read_timeout_error(&mut self, err: Option<io::Error>) {
		self.set_read_timeout_error = err;
	}
}

#[cfg(any(test, feature = "mock"))]
impl Default for Mock {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(any(test, feature = "mock"))]
impl Backend for Mock {
	fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), io::Error> {
		if let Some(err) = self.set_read_timeout_error.take() {
			Err(err)
		} else {
			self.read_timeout = timeout;
			Ok(())
		}
	}

	fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		Ok(self.read_timeout)
	}

	fn name(&self) -> Option<String> {
		Some(format!("<mock {:p}>", self as *const Mock))
	}
}

#[cfg(any(test, feature = "mock"))]
impl io::Read for Mock {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.read_timeouts.push(self.read_timeout);
		if let Some(err) = self.read_error.take() {
			Err(err)
		} else if self.is_empty() {
			// A real port would wait and then time out. The data is in memory,
			// so time out immediately.
			Err(io::Error::new(
				io::ErrorKind::TimedOut,
				"Simulated timeout error",
			))
		} else {
			io::Read::read(&mut self.buffer, buf)
		}
	}
}

#[cfg(any(test, feature = "mock"))]
impl io::Write for Mock {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		if let Some(err) = self.write_error.take() {
			Err(err)
		} else {
			self.written.extend_from_slice(buf);
			if let Some(reply) = self.queued_replies.pop_front() {
				self.push(reply);
			}
			Ok(buf.len())
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		if let Some(err) = self.flush_error.take() {
			Err(err)
		} else {
			Ok(())
		}
	}
}

mod private {
	pub trait Sealed {}

	impl Sealed for super::Serial {}
	#[cfg(any(test, feature = "mock"))]
	impl Sealed for super::Mock {}
	impl<C: super::Backend + ?Sized> Sealed for Box<C> {}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::{Read as _, Write as _};

	#[test]
	fn mock_records_writes_and_replays_reads() {
		let mut mock = Mock::new();
		mock.write_all(b"M4002").unwrap();
		mock.write_all(b"M27").unwrap();
		assert_eq!(mock.written(), b"M4002M27");
		assert_eq!(mock.take_written(), b"M4002M27");
		assert!(mock.written().is_empty());

		mock.push(b"ok\r\n");
		let mut buf = [0; 8];
		let n = mock.read(&mut buf).unwrap();
		assert_eq!(&buf[..n], b"ok\r\n");
		assert!(mock.is_empty());
	}

	#[test]
	fn mock_times_out_when_empty() {
		let mut mock = Mock::new();
		let mut buf = [0; 8];
		let err = mock.read(&mut buf).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::TimedOut);

		mock.push(b"stale");
		mock.clear();
		assert!(mock.is_empty());
	}

	#[test]
	fn mock_releases_queued_replies_on_write() {
		let mut mock = Mock::new();
		mock.queue_reply(b"ok 'a.ctb'\r\n");
		mock.queue_reply(b"ok\r\n");
		assert!(mock.is_empty());

		mock.write_all(b"M4006").unwrap();
		let mut buf = [0; 16];
		let n = mock.read(&mut buf).unwrap();
		assert_eq!(&buf[..n], b"ok 'a.ctb'\r\n");
		assert!(mock.is_empty());

		mock.write_all(b"M25").unwrap();
		let n = mock.read(&mut buf).unwrap();
		assert_eq!(&buf[..n], b"ok\r\n");
	}

	#[test]
	fn mock_injected_errors_surface_once() {
		let mut mock = Mock::new();
		mock.write_error(Some(io::Error::new(io::ErrorKind::BrokenPipe, "gone")));
		assert_eq!(
			mock.write(b"M25").unwrap_err().kind(),
			io::ErrorKind::BrokenPipe
		);
		assert_eq!(mock.write(b"M25").unwrap(), 3);

		mock.set_read_timeout_error(Some(io::Error::new(io::ErrorKind::Other, "nope")));
		assert!(mock.set_read_timeout(None).is_err());
		mock.set_read_timeout(None).unwrap();
		assert_eq!(mock.read_timeout().unwrap(), None);
	}

	#[test]
	fn mock_records_read_timeouts() {
		let mut mock = Mock::new();
		mock.push(b"ok");
		let mut buf = [0; 1];
		mock.read(&mut buf).unwrap();
		mock.set_read_timeout(None).unwrap();
		mock.read(&mut buf).unwrap();
		assert!(mock.read(&mut buf).is_err());
		assert_eq!(mock.read_timeouts(), [Some(Duration::ZERO), None, None]);
	}
}
