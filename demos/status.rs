//! Print the firmware version, Z position, and print progress of a connected printer.

use marsproto::{
	port::{OpenSerialOptions, DEFAULT_SERIAL_PATH},
	printer::Printer,
};
use simple_logger::SimpleLogger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Enable logging
	SimpleLogger::new().init()?;

	// The device path can be given as the first argument.
	let path = std::env::args()
		.nth(1)
		.unwrap_or_else(|| DEFAULT_SERIAL_PATH.to_string());

	let mut printer = Printer::open_with(&OpenSerialOptions::new(), &path)?;
	println!("firmware: {}", printer.firmware_version()?);
	println!("z: {:.1} mm", printer.z_position()?);

	let report = printer.progress_report(None)?;
	match report.progress_percent {
		Some(progress) => println!("{} {} ({progress}%)", report.state, report.selected_file),
		None => println!("{} {}", report.state, report.selected_file),
	}
	printer.close();
	Ok(())
}
