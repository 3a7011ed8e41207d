//! A client with one method per command supported by the printer firmware.
//!
//! ```rust
//! # use marsproto::{error::Error, printer::Printer};
//! # fn wrapper() -> Result<(), Error> {
//! let mut printer = Printer::open("/dev/serial0")?;
//! println!("firmware {}", printer.firmware_version()?);
//! printer.select_file("cube.ctb")?;
//! printer.start_printing("cube.ctb")?;
//! printer.close();
//! # Ok(())
//! # }
//! ```

use crate::{
	backend::{Backend, Serial},
	command::{Command, DEFAULT_FEED_RATE},
	error::Error,
	port::{OpenSerialOptions, Port},
	response::{check, Response},
	status::{self, PrintStatus, ProgressReport, SlicedFileMetadata},
};

#[cfg(any(test, feature = "mock"))]
use crate::backend::Mock;

/// The acknowledgement of a successful `M23`.
const FILE_OPENED: &str = "File opened";
/// The marker of a failed `M33`.
const ERROR_MARKER: &str = "Error";

/// A session with a printer.
///
/// Each method sends one command and validates the reply against the grammar
/// of that command. Replies that do not match are reported as an
/// [`Error`] holding the raw reply.
///
/// The serial line is released when the printer is dropped or
/// [`close`](Printer::close)d.
pub struct Printer<B: Backend> {
	/// The port used to talk to the printer.
	port: Port<B>,
}

impl<B: Backend> std::fmt::Debug for Printer<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Printer").field("port", &self.port).finish()
	}
}

impl Printer<Serial> {
	/// Open a session with the printer attached to the serial device at `path`.
	pub fn open(path: &str) -> Result<Self, Error> {
		Printer::open_with(&OpenSerialOptions::new(), path)
	}

	/// Open a session with custom serial options.
	pub fn open_with(options: &OpenSerialOptions, path: &str) -> Result<Self, Error> {
		Ok(Printer::from_port(options.open(path)?))
	}

	/// Open a session, run `f` with it, and close the session again.
	///
	/// The session is closed however `f` exits, including early returns
	/// through `?`.
	///
	/// ## Example
	///
	/// ```rust
	/// # use marsproto::{error::Error, printer::Printer};
	/// # fn wrapper() -> Result<(), Error> {
	/// let z = Printer::with_session("/dev/serial0", |printer| printer.z_position())?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn with_session<T, F>(path: &str, f: F) -> Result<T, Error>
	where
		F: FnOnce(&mut Printer<Serial>) -> Result<T, Error>,
	{
		let mut printer = Printer::open(path)?;
		f(&mut printer)
	}
}

#[cfg(any(test, feature = "mock"))]
impl Printer<Mock> {
	/// Open a session backed by an in-memory [`Mock`].
	pub fn open_mock() -> Self {
		Printer::from_port(Port::open_mock())
	}
}

impl<B: Backend> Printer<B> {
	/// Start a session on an already open port.
	pub fn from_port(port: Port<B>) -> Self {
		Printer { port }
	}

	/// Get a shared reference to the underlying port.
	pub fn port(&self) -> &Port<B> {
		&self.port
	}

	/// Get an exclusive reference to the underlying port.
	///
	/// This can be used to send commands this type does not cover.
	pub fn port_mut(&mut self) -> &mut Port<B> {
		&mut self.port
	}

	/// Close the session, releasing the serial line.
	///
	/// Equivalent to dropping the printer.
	pub fn close(self) {}

	/// The firmware version, e.g. `V4.3.12_LCDC`.
	pub fn firmware_version(&mut self) -> Result<String, Error> {
		let reply = self.port.command_reply(Command::firmware_version())?;
		Ok(reply.firmware_version()?.to_string())
	}

	/// The raw, undecoded reply to `M4000`.
	pub fn state(&mut self) -> Result<Response, Error> {
		self.port.command_reply(Command::state())
	}

	/// The print progress reported by the firmware.
	pub fn print_status(&mut self) -> Result<PrintStatus, Error> {
		let reply = self.port.command_reply(Command::print_status())?;
		Ok(reply.print_status()?)
	}

	/// The position of the Z axis, in mm.
	pub fn z_position(&mut self) -> Result<f64, Error> {
		let reply = self.port.command_reply(Command::z_position())?;
		Ok(reply.z_position()?)
	}

	/// The name of the file currently selected on the printer.
	pub fn selected_file(&mut self) -> Result<String, Error> {
		let reply = self.port.command_reply(Command::selected_file())?;
		Ok(reply.selected_file()?.to_string())
	}

	/// Select the file `name` on the SD card.
	///
	/// `name` is sent verbatim and must not contain line breaks.
	pub fn select_file(&mut self, name: &str) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::select_file(name), check::contains(FILE_OPENED))?;
		Ok(())
	}

	/// Move the build plate by `z_dist_mm` at `mm_per_min`.
	///
	/// The distance is sent with one decimal.
	pub fn move_by(&mut self, z_dist_mm: f64, mm_per_min: u32) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::move_by(z_dist_mm, mm_per_min), check::ok())?;
		Ok(())
	}

	/// Move the build plate by `z_dist_mm` at [`DEFAULT_FEED_RATE`].
	pub fn move_by_default_feed(&mut self, z_dist_mm: f64) -> Result<(), Error> {
		self.move_by(z_dist_mm, DEFAULT_FEED_RATE)
	}

	/// Move the build plate to the absolute position `z_pos_mm`.
	///
	/// The reply is returned without being checked.
	pub fn move_to(&mut self, z_pos_mm: f64) -> Result<Response, Error> {
		self.port.command_reply(Command::move_to(z_pos_mm))
	}

	/// Home the Z axis.
	///
	/// The firmware may only acknowledge once the motion completes, so a
	/// longer read timeout can be needed, see
	/// [`Port::timeout_guard`](crate::port::Port::timeout_guard).
	pub fn move_to_home(&mut self) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::move_to_home(), check::ok())?;
		Ok(())
	}

	/// Start printing the file `name`.
	pub fn start_printing(&mut self, name: &str) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::start_printing(name), check::ok())?;
		Ok(())
	}

	/// Pause the current print.
	pub fn pause_printing(&mut self) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::pause_printing(), check::ok())?;
		Ok(())
	}

	/// Resume a paused print.
	pub fn resume_printing(&mut self) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::resume_printing(), check::ok())?;
		Ok(())
	}

	/// Stop the current print.
	pub fn stop_printing(&mut self) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::stop_printing(), check::excludes(ERROR_MARKER))?;
		Ok(())
	}

	/// Stop the motors immediately.
	pub fn stop_motors(&mut self) -> Result<(), Error> {
		self.port
			.command_reply_with_check(Command::stop_motors(), check::ok())?;
		Ok(())
	}

	/// Reboot the printer after `delay_ms` milliseconds.
	///
	/// No reply is read.
	pub fn reboot(&mut self, delay_ms: u32) -> Result<(), Error> {
		self.port.command(Command::reboot(delay_ms))
	}

	/// Reboot the printer immediately.
	pub fn reboot_now(&mut self) -> Result<(), Error> {
		self.reboot(0)
	}

	/// Query the selected file and the print progress, and combine them with
	/// the file's metadata, if known.
	///
	/// ## Example
	///
	/// ```rust
	/// # use marsproto::{error::Error, printer::Printer};
	/// # fn wrapper() -> Result<(), Error> {
	/// let mut printer = Printer::open("/dev/serial0")?;
	/// let report = printer.progress_report(None)?;
	/// println!("{} {}", report.state, report.selected_file);
	/// # Ok(())
	/// # }
	/// ```
	pub fn progress_report(
		&mut self,
		file: Option<&SlicedFileMetadata>,
	) -> Result<ProgressReport, Error> {
		let selected_file = self.selected_file()?;
		let print_status = self.print_status()?;
		Ok(status::translate(&print_status, &selected_file, file))
	}
}

impl<B: Backend> Drop for Printer<B> {
	fn drop(&mut self) {
		log::info!(
			"{} released",
			self.port.backend().name().unwrap_or_else(|| crate::backend::UNKNOWN_BACKEND_NAME.to_string())
		);
	}
}
