//! Types for checking the contents of a [`Response`] via a `Port`'s
//! [`command_reply_with_check`](crate::port::Port::command_reply_with_check)
//! method.
//!
//! Most printer commands acknowledge success with a reply containing `ok`,
//! so [`ok`] covers most cases. The [`Check`] trait is implemented for all
//! closures that take a [`Response`] and return a
//! `Result<Response, ResponseError>`, so custom grammars are easy to express:
//!
//! ```rust
//! # use marsproto::{
//! #     error::ResponseError,
//! #     response::{check::{self, Check}, Response},
//! # };
//! # fn wrapper() -> impl Check {
//! // Acknowledged, and not reporting an error.
//! |response: Response| -> Result<Response, ResponseError> {
//!     check::ok()
//!         .check(response)
//!         .and_then(|response| check::excludes("Error").check(response))
//! }
//! # }
//! ```

use super::Response;
use crate::error::{ResponseError, UnexpectedResponseError};

/// A trait for checking the contents of a response.
///
/// See the [`check`](self) module level documentation for more information about this trait.
pub trait Check {
	/// Check the contents of a response.
	///
	/// If the contents of the response are considered valid, the response should be returned.
	/// Otherwise return the response as a member in the error.
	fn check(&self, response: Response) -> Result<Response, ResponseError>;
}

impl<F: Fn(Response) -> Result<Response, ResponseError>> Check for F {
	fn check(&self, response: Response) -> Result<Response, ResponseError> {
		(self)(response)
	}
}

/// Accept any response.
pub fn unchecked() -> impl Check {
	|response: Response| -> Result<Response, ResponseError> { Ok(response) }
}

/// Accept responses that contain `pattern` anywhere.
pub fn contains<S: AsRef<str>>(pattern: S) -> impl Check {
	move |response: Response| -> Result<Response, ResponseError> {
		if response.contains(pattern.as_ref()) {
			Ok(response)
		} else {
			Err(UnexpectedResponseError::new(response.as_str()).into())
		}
	}
}

/// Accept responses that do not contain `pattern` anywhere.
pub fn excludes<S: AsRef<str>>(pattern: S) -> impl Check {
	move |response: Response| -> Result<Response, ResponseError> {
		if response.contains(pattern.as_ref()) {
			Err(UnexpectedResponseError::new(response.as_str()).into())
		} else {
			Ok(response)
		}
	}
}

/// Accept responses acknowledging the command with `ok`.
pub fn ok() -> impl Check {
	contains("ok")
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn unchecked_accepts_anything() {
		for text in ["", "ok\r\n", "Error: nope\r\n"] {
			assert_eq!(unchecked().check(Response::from(text)), Ok(Response::from(text)));
		}
	}

	#[test]
	fn contains_and_ok() {
		assert!(ok().check(Response::from("ok N:1\r\n")).is_ok());
		let err = ok().check(Response::from("Error: busy\r\n")).unwrap_err();
		assert!(err.is_unexpected_response());
		assert_eq!(err.response(), "Error: busy\r\n");

		let opened = contains("File opened");
		assert!(opened.check(Response::from("File opened: x.ctb Size:12\r\n")).is_ok());
		assert!(opened.check(Response::from("open failed, File: x.ctb\r\n")).is_err());
	}

	#[test]
	fn excludes_rejects_pattern() {
		let no_error = excludes("Error");
		assert!(no_error.check(Response::from("ok\r\n")).is_ok());
		assert!(no_error.check(Response::from("")).is_ok());
		assert!(no_error
			.check(Response::from("Error:It's not printing now!\r\n"))
			.unwrap_err()
			.is_unexpected_response());
	}

	#[test]
	fn closures_are_checks() {
		let starts_with_ok = |response: Response| -> Result<Response, ResponseError> {
			if response.as_str().starts_with("ok") {
				Ok(response)
			} else {
				Err(UnexpectedResponseError::new(response.as_str()).into())
			}
		};
		assert!(Response::from("ok\r\n").check(starts_with_ok).is_ok());
		assert!(Response::from("not ok\r\n").check(starts_with_ok).is_err());
	}
}
