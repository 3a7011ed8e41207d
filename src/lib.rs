//! A library for driving resin 3D printers, such as the Elegoo Mars, over
//! their serial G-code protocol.
//!
//! The crate is layered:
//!
//! * a [`Port`](port::Port) sends [`Command`](command::Command)s over a
//!   [`Backend`](backend::Backend) and reads back one
//!   [`Response`](response::Response) line per command,
//! * a [`Printer`](printer::Printer) wraps a port with one method per
//!   supported command, validating each reply against that command's grammar,
//! * the [`status`] module turns raw print progress and a sliced file's layer
//!   table into a [`ProgressReport`](status::ProgressReport).
//!
//! ```rust
//! # use marsproto::{error::Error, printer::Printer};
//! # fn wrapper() -> Result<(), Error> {
//! let mut printer = Printer::open("/dev/serial0")?;
//! let report = printer.progress_report(None)?;
//! println!("{}: {:?}%", report.state, report.progress_percent);
//! # Ok(())
//! # }
//! ```
//!
//! The `mock` feature exposes [`Mock`](backend::Mock), an in-memory backend
//! for testing code that talks to a printer without one attached.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(missing_debug_implementations)]

pub mod backend;
pub mod command;
pub mod error;
pub mod port;
pub mod printer;
pub mod response;
pub mod status;
pub mod timeout_guard;
