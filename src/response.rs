//! The text a printer sends back for a command, and the decoders for each
//! command's reply grammar.
//!
//! A [`Response`] is the single line read back after a command, exactly as it
//! was received (line terminator included). It is not interpreted until one of
//! its decoding methods, or a [`Check`](check::Check), is applied.
//!
//! ```
//! # use marsproto::{response::Response, status::PrinterState};
//! let response = Response::from("SD printing byte 42/120\r\n");
//! let status = response.print_status()?;
//! assert_eq!(status.state, PrinterState::Printing);
//! assert_eq!(status.current_byte, Some(42));
//! # Ok::<(), marsproto::error::ResponseError>(())
//! ```

pub mod check;

use crate::{
	error::{ProtocolViolationError, ResponseError, UnexpectedResponseError, UnimplementedError},
	status::PrintStatus,
};
use std::fmt;

/// Marks a reply to `M27` while a file is being printed.
const PRINTING_MARKER: &str = "SD printing byte";
/// Marks a reply to `M27` while nothing is being printed.
const NOT_PRINTING_MARKER: &str = "It's not printing now";
/// Precedes the Z position in a reply to `M114`.
const Z_POSITION_MARKER: &str = "Z:";
/// Precedes the quoted file name in a reply to `M4006`.
const SELECTED_FILE_MARKER: &str = "ok '";

/// The raw text of a reply read from the printer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Response(String);

impl Response {
	/// Decode the bytes read from the printer.
	///
	/// Bytes that are not valid UTF-8 are a protocol violation.
	pub(crate) fn from_bytes(bytes: Vec<u8>) -> Result<Response, ResponseError> {
		String::from_utf8(bytes).map(Response).map_err(|err| {
			let text = String::from_utf8_lossy(err.as_bytes()).into_owned();
			ProtocolViolationError::new(text, "response is not valid UTF-8").into()
		})
	}

	/// The full text of the response, including any line terminator.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The text of the response without the trailing line terminator.
	pub fn line(&self) -> &str {
		self.0.trim_end_matches(['\r', '\n'])
	}

	/// Whether the response contains `pattern` anywhere.
	pub fn contains(&self, pattern: &str) -> bool {
		self.0.contains(pattern)
	}

	/// Check the response with `checker`, returning the response on success.
	pub fn check<K: check::Check>(self, checker: K) -> Result<Response, ResponseError> {
		checker.check(self)
	}

	/// Decode a reply to `M4002`: `ok <version>`.
	///
	/// The version is made of ASCII letters, digits, `_` and `.`, and must be
	/// the only thing on the line.
	pub fn firmware_version(&self) -> Result<&str, ResponseError> {
		self.line()
			.strip_prefix("ok ")
			.filter(|version| {
				!version.is_empty()
					&& version
						.bytes()
						.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
			})
			.ok_or_else(|| UnexpectedResponseError::new(self.as_str()).into())
	}

	/// Decode a reply to `M27`.
	///
	/// * `SD printing byte <current>/<total>` is a print in progress.
	/// * `It's not printing now` is an idle printer.
	///
	/// Any other reply is reported as [`Unimplemented`](ResponseError::Unimplemented)
	/// so that unknown firmware phases are never misreported.
	pub fn print_status(&self) -> Result<PrintStatus, ResponseError> {
		if let Some(start) = self.0.find(PRINTING_MARKER) {
			let progress = &self.0[start + PRINTING_MARKER.len()..];
			let (current_byte, total_bytes) = self.parse_byte_progress(progress)?;
			Ok(PrintStatus::printing(current_byte, total_bytes))
		} else if self.contains(NOT_PRINTING_MARKER) {
			Ok(PrintStatus::idle())
		} else {
			Err(UnimplementedError::new(self.as_str()).into())
		}
	}

	/// Parse ` <current>/<total>` following the printing marker.
	fn parse_byte_progress(&self, text: &str) -> Result<(u64, u64), ResponseError> {
		let violation = |reason: &str| ProtocolViolationError::new(self.as_str(), reason);
		let (current, rest) = text
			.strip_prefix(' ')
			.and_then(|text| text.split_once('/'))
			.ok_or_else(|| violation("expected `<current>/<total>` byte counts"))?;
		let total = leading_matching(rest, |c| c.is_ascii_digit());
		let current_byte = parse_digits(current).ok_or_else(|| violation("current byte is not a number"))?;
		let total_bytes = parse_digits(total).ok_or_else(|| violation("total bytes is not a number"))?;
		if current_byte > total_bytes {
			return Err(violation("current byte exceeds total bytes").into());
		}
		Ok((current_byte, total_bytes))
	}

	/// Decode a reply to `M114`, returning the number following `Z:`.
	pub fn z_position(&self) -> Result<f64, ResponseError> {
		let start = self
			.0
			.find(Z_POSITION_MARKER)
			.ok_or_else(|| UnexpectedResponseError::new(self.as_str()))?;
		let value = leading_matching(&self.0[start + Z_POSITION_MARKER.len()..], |c| {
			c.is_ascii_digit() || c == '.'
		});
		if value.is_empty() {
			return Err(UnexpectedResponseError::new(self.as_str()).into());
		}
		value
			.parse()
			.map_err(|_| ProtocolViolationError::new(self.as_str(), "z position is not a number").into())
	}

	/// Decode a reply to `M4006`: `ok '<name>'`.
	pub fn selected_file(&self) -> Result<&str, ResponseError> {
		self.0
			.find(SELECTED_FILE_MARKER)
			.map(|start| &self.0[start + SELECTED_FILE_MARKER.len()..])
			.and_then(|rest| rest.split_once('\''))
			.filter(|(name, rest)| !name.is_empty() && is_line_end(rest))
			.map(|(name, _)| name)
			.ok_or_else(|| UnexpectedResponseError::new(self.as_str()).into())
	}
}

impl fmt::Display for Response {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.line())
	}
}

impl AsRef<str> for Response {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Response {
	fn from(other: &str) -> Self {
		Response(other.to_string())
	}
}

impl From<String> for Response {
	fn from(other: String) -> Self {
		Response(other)
	}
}

impl From<Response> for String {
	fn from(other: Response) -> Self {
		other.0
	}
}

/// The longest prefix of `text` whose characters all satisfy `pred`.
fn leading_matching(text: &str, pred: impl Fn(char) -> bool) -> &str {
	let end = text.find(|c: char| !pred(c)).unwrap_or(text.len());
	&text[..end]
}

/// Parse a non-empty run of ASCII digits.
fn parse_digits(text: &str) -> Option<u64> {
	if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	text.parse().ok()
}

/// Whether `rest` is nothing but a line terminator.
fn is_line_end(rest: &str) -> bool {
	rest.trim_end_matches(['\r', '\n']).is_empty()
}
