//! The G-code and vendor M-code commands understood by the printer firmware.
//!
//! A [`Command`] only describes the bytes put on the wire. Which reply is
//! acceptable is decided by the operation that sends it, see
//! [`Printer`](crate::printer::Printer) and [`check`](crate::response::check).

use std::fmt;

/// The feed rate used for relative moves when none is given, in mm/min.
pub const DEFAULT_FEED_RATE: u32 = 600;

/// The bytes of a single command, ready to be written to the printer.
///
/// The bytes are sent verbatim: no line terminator is appended and string
/// parameters are not escaped. Callers must not pass filenames that contain
/// `'` or line breaks.
///
/// ## Example
///
/// ```
/// # use marsproto::command::Command;
/// assert_eq!(Command::move_by(-1.5, 300).as_bytes(), b"G0 Z-1.5 F300 I0");
/// assert_eq!(Command::select_file("cube.ctb").as_bytes(), b"M23 cube.ctb");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
	/// The raw command bytes.
	data: Vec<u8>,
}

impl Command {
	/// Create a command from raw bytes.
	pub fn new<D: Into<Vec<u8>>>(data: D) -> Command {
		Command { data: data.into() }
	}

	/// The bytes that will be written to the printer.
	pub fn as_bytes(&self) -> &[u8] {
		&self.data
	}

	/// `M4002`: report the firmware version.
	pub fn firmware_version() -> Command {
		Command::new("M4002")
	}

	/// `M4000`: report the raw printer state.
	pub fn state() -> Command {
		Command::new("M4000")
	}

	/// `M27`: report the SD card print progress.
	pub fn print_status() -> Command {
		Command::new("M27")
	}

	/// `M114`: report the current position.
	pub fn z_position() -> Command {
		Command::new("M114")
	}

	/// `M4006`: report the currently selected file.
	pub fn selected_file() -> Command {
		Command::new("M4006")
	}

	/// `M23 <name>`: select a file on the SD card.
	pub fn select_file(name: &str) -> Command {
		Command::new(format!("M23 {name}"))
	}

	/// `G0 Z<dist> F<feed> I0`: move the build plate by `z_dist_mm` at
	/// `mm_per_min`.
	pub fn move_by(z_dist_mm: f64, mm_per_min: u32) -> Command {
		Command::new(format!("G0 Z{z_dist_mm:.1} F{mm_per_min} I0"))
	}

	/// `G0 Z<pos>`: move the build plate to the absolute position `z_pos_mm`.
	pub fn move_to(z_pos_mm: f64) -> Command {
		Command::new(format!("G0 Z{z_pos_mm:.1}"))
	}

	/// `G28`: home the Z axis.
	pub fn move_to_home() -> Command {
		Command::new("G28")
	}

	/// `M6030 '<name>'`: start printing a file.
	pub fn start_printing(name: &str) -> Command {
		Command::new(format!("M6030 '{name}'"))
	}

	/// `M25`: pause the current print.
	pub fn pause_printing() -> Command {
		Command::new("M25")
	}

	/// `M24`: resume a paused print.
	pub fn resume_printing() -> Command {
		Command::new("M24")
	}

	/// `M33`: stop the current print.
	pub fn stop_printing() -> Command {
		Command::new("M33")
	}

	/// `M112`: stop the motors immediately.
	pub fn stop_motors() -> Command {
		Command::new("M112")
	}

	/// `M6040 I<delay>`: reboot the printer after `delay_ms` milliseconds.
	pub fn reboot(delay_ms: u32) -> Command {
		Command::new(format!("M6040 I{delay_ms}"))
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", String::from_utf8_lossy(&self.data))
	}
}

impl From<&str> for Command {
	fn from(other: &str) -> Self {
		Command::new(other)
	}
}

impl From<String> for Command {
	fn from(other: String) -> Self {
		Command::new(other)
	}
}

impl From<&[u8]> for Command {
	fn from(other: &[u8]) -> Self {
		Command::new(other)
	}
}

impl From<Vec<u8>> for Command {
	fn from(other: Vec<u8>) -> Self {
		Command::new(other)
	}
}

impl From<&Command> for Command {
	fn from(other: &Command) -> Self {
		other.clone()
	}
}
