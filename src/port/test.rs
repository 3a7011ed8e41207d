use crate::{
	backend::{Backend, Mock, Serial},
	command::Command,
	error::*,
	port::{Port, DRAIN_LIMIT, DRAIN_TIMEOUT},
	response::check,
};
use static_assertions::assert_impl_all;
use std::{io, time::Duration};

assert_impl_all!(Port<Serial>: Send, std::fmt::Debug);
assert_impl_all!(Port<Mock>: Send);

#[test]
fn command_is_written_verbatim() {
	let mut port = Port::open_mock();
	port.command(Command::select_file("cube.ctb")).unwrap();
	port.command("M27").unwrap();
	assert_eq!(port.backend().written(), b"M23 cube.ctbM27");
	// Nothing is read for a plain command.
	port.backend_mut().push(b"ok\r\n");
	port.command(Command::reboot(0)).unwrap();
	assert!(!port.backend().is_empty());
}

#[test]
fn command_reply_reads_one_line() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"ok V4.3.12_LCDC\r\n");
	let reply = port.command_reply(Command::firmware_version()).unwrap();
	assert_eq!(reply.as_str(), "ok V4.3.12_LCDC\r\n");
	assert_eq!(reply.firmware_version().unwrap(), "V4.3.12_LCDC");
	assert_eq!(port.backend().written(), b"M4002");
}

#[test]
fn trailing_bytes_are_drained() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"ok 'a.ctb'\r\nok N:0\r\nstale\r\n");
	let reply = port.command_reply(Command::selected_file()).unwrap();
	assert_eq!(reply.selected_file().unwrap(), "a.ctb");
	assert!(port.backend().is_empty());

	// The next command reads its own reply, not the leftovers.
	port.backend_mut().push(b"Error:It's not printing now!\r\n");
	let status = port
		.command_reply(Command::print_status())
		.unwrap()
		.print_status()
		.unwrap();
	assert!(status.current_byte.is_none());
}

#[test]
fn drain_is_bounded() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"ok\r\n");
	port.backend_mut().push(vec![b'x'; DRAIN_LIMIT + 100]);
	port.command_reply("G28").unwrap();
	assert!(!port.backend().is_empty());

	// Whatever was not drained is read as the next reply, which is cut off.
	let err = port.command_reply("M4002").unwrap_err();
	let err = ProtocolViolationError::try_from(err).unwrap();
	assert_eq!(err.response().len(), 100);
}

#[test]
fn timeout_before_any_byte_is_an_error() {
	let mut port = Port::open_mock();
	let err = port.command_reply(Command::z_position()).unwrap_err();
	assert!(err.is_timeout(), "{err:?}");
	// The command was still sent.
	assert_eq!(port.backend().written(), b"M114");
}

#[test]
fn reply_cut_off_before_line_feed_is_a_protocol_violation() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"ok V4.3");
	let err = port.command_reply(Command::firmware_version()).unwrap_err();
	let err = ProtocolViolationError::try_from(err).unwrap();
	assert_eq!(err.response(), "ok V4.3");
	assert_eq!(err.reason(), "reply ended before the line terminator");

	// A status that could have continued as `12/120`.
	port.backend_mut().push(b"SD printing byte 12/12");
	let err = port.command_reply(Command::print_status()).unwrap_err();
	let err = ProtocolViolationError::try_from(err).unwrap();
	assert_eq!(err.response(), "SD printing byte 12/12");

	port.backend_mut().push(b"ok 'trunc");
	assert!(port
		.command_reply(Command::selected_file())
		.unwrap_err()
		.is_protocol_violation());
}

#[test]
fn drain_waits_at_most_the_drain_timeout() {
	let mut port = Port::open_mock();
	port.set_read_timeout(None).unwrap();
	port.backend_mut().push(b"ok\r\n");
	port.command_reply(Command::pause_printing()).unwrap();
	// Four reads for the line, then the drain.
	assert_eq!(
		port.backend().read_timeouts(),
		[None, None, None, None, Some(DRAIN_TIMEOUT)]
	);
	assert_eq!(port.read_timeout().unwrap(), None);

	// A long timeout for a slow command does not lengthen the drain.
	let mut guard = port.timeout_guard(Some(Duration::from_secs(30))).unwrap();
	guard.backend_mut().push(b"ok\r\n");
	guard.command_reply(Command::move_to_home()).unwrap();
	assert_eq!(guard.backend().read_timeouts().last(), Some(&Some(DRAIN_TIMEOUT)));
	assert_eq!(guard.read_timeout().unwrap(), Some(Duration::from_secs(30)));
}

#[test]
fn drain_keeps_a_shorter_timeout() {
	let mut port = Port::open_mock();
	let short = Duration::from_millis(10);
	port.set_read_timeout(Some(short)).unwrap();
	port.backend_mut().push(b"ok\r\n");
	port.command_reply(Command::resume_printing()).unwrap();
	assert!(port.backend().read_timeouts().iter().all(|&t| t == Some(short)));
}

#[test]
fn invalid_utf8_is_a_protocol_violation() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"ok \xfe\xff\r\n");
	let err = port.command_reply(Command::state()).unwrap_err();
	assert!(err.is_protocol_violation(), "{err:?}");
	// The reply was still consumed.
	assert!(port.backend().is_empty());
}

#[test]
fn transport_errors_are_propagated() {
	let mut port = Port::open_mock();
	port.backend_mut()
		.write_error(Some(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")));
	let err = port.command(Command::stop_motors()).unwrap_err();
	assert!(err.is_io());
	assert!(!err.is_timeout());

	port.backend_mut()
		.read_error(Some(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")));
	let err = port.command_reply(Command::stop_motors()).unwrap_err();
	assert!(err.is_io());

	port.backend_mut()
		.flush_error(Some(io::Error::new(io::ErrorKind::Other, "flush")));
	assert!(port.command(Command::stop_motors()).unwrap_err().is_io());
}

#[test]
fn command_reply_with_check() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"ok\r\n");
	port.command_reply_with_check(Command::pause_printing(), check::ok())
		.unwrap();

	port.backend_mut().push(b"Error: busy\r\n");
	let err = port
		.command_reply_with_check(Command::pause_printing(), check::ok())
		.unwrap_err();
	let err = UnexpectedResponseError::try_from(err).unwrap();
	assert_eq!(err.response(), "Error: busy\r\n");
}

#[test]
fn response_without_command() {
	let mut port = Port::open_mock();
	port.backend_mut().push(b"wait\r\n");
	assert_eq!(port.response().unwrap().line(), "wait");
	assert!(port.backend().written().is_empty());
}

#[test]
fn timeout_guard_restores_timeout() {
	let mut port = Port::open_mock();
	port.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
	{
		let mut guard = port.timeout_guard(Some(Duration::from_secs(30))).unwrap();
		assert_eq!(guard.read_timeout().unwrap(), Some(Duration::from_secs(30)));
		guard.backend_mut().push(b"ok\r\n");
		guard.command_reply(Command::move_to_home()).unwrap();
	}
	assert_eq!(port.read_timeout().unwrap(), Some(Duration::from_millis(100)));
}

#[test]
fn failed_timeout_restore_poisons_port() {
	let mut port = Port::open_mock();
	{
		let mut guard = port.timeout_guard(None).unwrap();
		guard
			.backend_mut()
			.set_read_timeout_error(Some(io::Error::new(io::ErrorKind::Other, "stuck")));
	}
	port.backend_mut().push(b"ok\r\n");
	let err = port.command_reply(Command::move_to_home()).unwrap_err();
	assert!(err.is_io());
	// The poisoned command was never sent.
	assert!(port.backend().written().is_empty());

	// The error is only reported once.
	port.command_reply(Command::move_to_home()).unwrap();
}

#[test]
fn boxed_backend_forwards_to_inner_backend() {
	let mut mock = Mock::new();
	mock.push(b"ok\r\n");
	let mut port: Port<Box<dyn Backend>> = Port::from_backend(Box::new(mock));
	port.set_read_timeout(None).unwrap();
	port.command_reply(Command::stop_motors()).unwrap();
	assert_eq!(port.read_timeout().unwrap(), None);
	assert!(port.backend().name().is_some_and(|name| name.starts_with("<mock")));
}
