//! Types defining the different options when opening a port.

use super::Port;
use crate::{
	backend::{Backend, Serial},
	error::Error,
};
use serialport as sp;
use std::time::Duration;

/// The serial device a printer is usually attached to.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/serial0";

/// Options for configuring and opening a serial port.
///
/// ## Example
///
/// ```rust
/// # use marsproto::port::OpenSerialOptions;
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut port = OpenSerialOptions::new()
///     .timeout(Some(Duration::from_millis(250)))
///     .open("/dev/ttyUSB0")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenSerialOptions {
	/// The custom baud rate
	baud_rate: u32,
	/// The custom timeout
	timeout: Option<Duration>,
}

impl OpenSerialOptions {
	/// The default baud rate: 115,200.
	pub const DEFAULT_BAUD_RATE: u32 = 115_200;

	/// The default read timeout: 100 ms.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

	/// Create a blank set of options ready for configuration.
	///
	/// The default baud rate and read timeout are 115,200 and 100 ms, respectively.
	///
	/// Equivalent to [`default`](OpenSerialOptions::default).
	pub fn new() -> Self {
		OpenSerialOptions {
			baud_rate: OpenSerialOptions::DEFAULT_BAUD_RATE,
			timeout: Some(OpenSerialOptions::DEFAULT_TIMEOUT),
		}
	}

	/// Set a custom baud rate.
	///
	/// The default is 115,200.
	pub fn baud_rate(&mut self, baud_rate: u32) -> &mut Self {
		self.baud_rate = baud_rate;
		self
	}

	/// Set a custom read timeout.
	///
	/// If duration is `None`, reads will block indefinitely. The default is 100 ms.
	///
	/// The timeout also bounds how long the port waits for trailing bytes
	/// after each reply, so every command that reads a reply takes at least
	/// this long.
	pub fn timeout(&mut self, duration: Option<Duration>) -> &mut Self {
		self.timeout = duration;
		self
	}

	/// Open a [`Serial`] port configured as 8N1 without flow control.
	fn open_serial_port(&self, path: &str) -> Result<Serial, Error> {
		// The baud rate passed to `new` is ignored by some platforms, so it is
		// set again with the `baud_rate` method below.
		let serial = sp::new(path, OpenSerialOptions::DEFAULT_BAUD_RATE)
			.data_bits(sp::DataBits::Eight)
			.parity(sp::Parity::None)
			.flow_control(sp::FlowControl::None)
			.stop_bits(sp::StopBits::One)
			.timeout(self.timeout.unwrap_or(Duration::MAX))
			.baud_rate(self.baud_rate)
			.open_native()
			.map(Serial)?;
		log::debug!(
			"opened {path} at {} baud, timeout {:?}",
			self.baud_rate,
			self.timeout
		);
		Ok(serial)
	}

	/// Open the port at the specified path with the custom options.
	pub fn open(&self, path: &str) -> Result<Port<Serial>, Error> {
		Ok(Port::from_backend(self.open_serial_port(path)?))
	}

	/// Open the port at [`DEFAULT_SERIAL_PATH`] with the custom options.
	pub fn open_default(&self) -> Result<Port<Serial>, Error> {
		self.open(DEFAULT_SERIAL_PATH)
	}

	/// Open the port at the specified path with the custom options.
	///
	/// The type of the underlying backend is erased via dynamic dispatch,
	/// which does have runtime overhead. [`OpenSerialOptions::open`] should
	/// generally be used instead, except when the type of the underlying
	/// backend may not be known at compile time.
	pub fn open_dyn(&self, path: &str) -> Result<Port<Box<dyn Backend>>, Error> {
		Ok(Port::from_backend(Box::new(self.open_serial_port(path)?)))
	}
}

impl Default for OpenSerialOptions {
	fn default() -> Self {
		OpenSerialOptions::new()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn defaults() {
		let options = OpenSerialOptions::default();
		assert_eq!(options.baud_rate, 115_200);
		assert_eq!(options.timeout, Some(Duration::from_millis(100)));
	}

	#[test]
	fn builder_overrides() {
		let mut options = OpenSerialOptions::new();
		options.baud_rate(9600).timeout(None);
		assert_eq!(options.baud_rate, 9600);
		assert_eq!(options.timeout, None);
	}

	#[test]
	fn missing_device_fails_to_open() {
		let err = OpenSerialOptions::new()
			.open("/dev/this-serial-device-does-not-exist")
			.unwrap_err();
		assert!(!err.is_unexpected_response());
	}
}
