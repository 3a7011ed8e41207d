//! Translation of raw print progress into a user facing [`ProgressReport`].
//!
//! The printer only reports how many bytes of the sliced file it has consumed.
//! Combined with the file's [`SlicedFileMetadata`], that sample becomes a
//! percentage and a layer number:
//!
//! ```
//! # use marsproto::status::{translate, PrintStatus, PrinterState, SlicedFileMetadata};
//! let offsets = (1..=19).map(|layer| layer * 6).collect();
//! let file = SlicedFileMetadata::new(19, 200, offsets)?;
//! let status = PrintStatus::new(PrinterState::Printing, 42, 120);
//!
//! let report = translate(&status, "foobar.ctb", Some(&file));
//! assert_eq!(report.progress_percent, Some(35.0));
//! assert_eq!(report.current_layer, Some(7));
//! # Ok::<(), marsproto::error::InvalidLayerTableError>(())
//! ```
//!
//! Everything in this module is pure; nothing talks to the printer.

use crate::error::InvalidLayerTableError;
use std::fmt;

/// The state a printer is in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
	feature = "serde",
	derive(serde::Serialize),
	serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
#[non_exhaustive]
pub enum PrinterState {
	/// Nothing is being printed.
	Idle,
	/// A print was started but no layer has been consumed yet.
	StartingPrint,
	/// A print is in progress.
	Printing,
	/// A print is paused.
	Paused,
}

impl PrinterState {
	/// The name of the state, as shown to users (e.g. `STARTING_PRINT`).
	pub fn as_str(&self) -> &'static str {
		match self {
			PrinterState::Idle => "IDLE",
			PrinterState::StartingPrint => "STARTING_PRINT",
			PrinterState::Printing => "PRINTING",
			PrinterState::Paused => "PAUSED",
		}
	}
}

impl fmt::Display for PrinterState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single sample of a printer's progress through the selected file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PrintStatus {
	/// The state of the printer.
	pub state: PrinterState,
	/// The number of bytes of the file consumed so far, if printing.
	pub current_byte: Option<u64>,
	/// The size of the file being printed, if printing.
	pub total_bytes: Option<u64>,
}

impl PrintStatus {
	/// Create a status with byte progress.
	pub fn new(state: PrinterState, current_byte: u64, total_bytes: u64) -> Self {
		PrintStatus {
			state,
			current_byte: Some(current_byte),
			total_bytes: Some(total_bytes),
		}
	}

	/// The status of a printer that is not printing.
	pub fn idle() -> Self {
		PrintStatus {
			state: PrinterState::Idle,
			current_byte: None,
			total_bytes: None,
		}
	}

	/// The status of a printer that is printing.
	pub fn printing(current_byte: u64, total_bytes: u64) -> Self {
		PrintStatus::new(PrinterState::Printing, current_byte, total_bytes)
	}
}

/// The cumulative byte offset marking the end of each layer of a sliced file.
///
/// Entry `i` is the offset at which layer `i` (0-indexed) ends. The table is
/// never empty and never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerOffsetTable(Vec<u64>);

impl LayerOffsetTable {
	/// Validate and wrap a list of layer end offsets.
	pub fn new(end_byte_offset_by_layer: Vec<u64>) -> Result<Self, InvalidLayerTableError> {
		if end_byte_offset_by_layer.is_empty() {
			return Err(InvalidLayerTableError::new("the table has no layers"));
		}
		if let Some(index) = end_byte_offset_by_layer
			.windows(2)
			.position(|pair| pair[1] < pair[0])
		{
			return Err(InvalidLayerTableError::new(format!(
				"layer {} ends before layer {}",
				index + 1,
				index
			)));
		}
		Ok(LayerOffsetTable(end_byte_offset_by_layer))
	}

	/// The number of layers in the table.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the table has no layers. Always `false` for a validated table.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The offsets, one per layer.
	pub fn as_slice(&self) -> &[u64] {
		&self.0
	}

	/// The offset at which the last layer ends.
	pub fn total_bytes(&self) -> u64 {
		self.0.last().copied().unwrap_or_default()
	}

	/// The 1-indexed layer being printed once `current_byte` bytes have been
	/// consumed.
	///
	/// This is the first layer whose end offset is at or beyond `current_byte`,
	/// so reaching a layer's end offset still counts as that layer. The result
	/// is always within `1..=len()`.
	pub fn layer_at(&self, current_byte: u64) -> usize {
		if current_byte == 0 {
			return 1;
		}
		let index = self.0.partition_point(|&end| end < current_byte);
		index.min(self.0.len().saturating_sub(1)) + 1
	}
}

impl TryFrom<Vec<u64>> for LayerOffsetTable {
	type Error = InvalidLayerTableError;
	fn try_from(other: Vec<u64>) -> Result<Self, Self::Error> {
		LayerOffsetTable::new(other)
	}
}

/// What a sliced file tells us about the print it describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlicedFileMetadata {
	/// The number of layers.
	layer_count: u32,
	/// The estimated print duration.
	print_time_secs: u32,
	/// Where each layer ends.
	end_byte_offset_by_layer: LayerOffsetTable,
}

impl SlicedFileMetadata {
	/// Describe a sliced file.
	///
	/// `end_byte_offset_by_layer` must hold exactly `layer_count` non-decreasing
	/// offsets.
	pub fn new(
		layer_count: u32,
		print_time_secs: u32,
		end_byte_offset_by_layer: Vec<u64>,
	) -> Result<Self, InvalidLayerTableError> {
		let table = LayerOffsetTable::new(end_byte_offset_by_layer)?;
		if usize::try_from(layer_count).ok() != Some(table.len()) {
			return Err(InvalidLayerTableError::new(format!(
				"expected {layer_count} layers, found {}",
				table.len()
			)));
		}
		Ok(SlicedFileMetadata {
			layer_count,
			print_time_secs,
			end_byte_offset_by_layer: table,
		})
	}

	/// The number of layers.
	pub fn layer_count(&self) -> u32 {
		self.layer_count
	}

	/// The estimated print duration, in seconds.
	pub fn print_time_secs(&self) -> u32 {
		self.print_time_secs
	}

	/// Where each layer ends.
	pub fn end_byte_offset_by_layer(&self) -> &LayerOffsetTable {
		&self.end_byte_offset_by_layer
	}
}

/// The status of a printer as shown to users.
///
/// When idle only `state` and `selected_file` are populated. Otherwise
/// `progress_percent` is populated, and the layer fields are populated when
/// the file's metadata was available.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProgressReport {
	/// The state of the printer.
	pub state: PrinterState,
	/// The file selected on the printer.
	pub selected_file: String,
	/// How much of the file has been printed, from 0.0 to 100.0 with one decimal.
	#[cfg_attr(
		feature = "serde",
		serde(rename = "progress", skip_serializing_if = "Option::is_none")
	)]
	pub progress_percent: Option<f64>,
	/// The number of layers in the file.
	#[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
	pub layer_count: Option<u32>,
	/// The layer being printed, starting from 1.
	#[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
	pub current_layer: Option<u32>,
	/// The estimated print duration, in seconds.
	#[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
	pub print_time_secs: Option<u32>,
}

/// The percentage of `total_bytes` that `current_byte` represents, rounded to
/// one decimal.
///
/// Halves round to the even decimal, so 0.25% is reported as 0.2% and 0.75%
/// as 0.8%.
///
/// Returns `0.0` when `total_bytes` is zero.
pub fn progress_percent(current_byte: u64, total_bytes: u64) -> f64 {
	if total_bytes == 0 {
		return 0.0;
	}
	let percent = current_byte as f64 / total_bytes as f64 * 100.0;
	(percent * 10.0).round_ties_even() / 10.0
}

/// Combine a printer's status with the selected file's metadata.
pub fn translate(
	status: &PrintStatus,
	selected_file: &str,
	file: Option<&SlicedFileMetadata>,
) -> ProgressReport {
	let mut report = ProgressReport {
		state: status.state,
		selected_file: selected_file.to_string(),
		progress_percent: None,
		layer_count: None,
		current_layer: None,
		print_time_secs: None,
	};
	if status.state == PrinterState::Idle {
		return report;
	}

	let current_byte = status.current_byte.unwrap_or(0);
	report.progress_percent = Some(progress_percent(
		current_byte,
		status.total_bytes.unwrap_or(0),
	));
	if let Some(file) = file {
		let layer = file.end_byte_offset_by_layer.layer_at(current_byte);
		report.layer_count = Some(file.layer_count);
		report.current_layer = Some(u32::try_from(layer).unwrap_or(file.layer_count));
		report.print_time_secs = Some(file.print_time_secs);
	}
	report
}

#[cfg(test)]
mod test {
	use super::*;

	/// 19 layers of 6 bytes each.
	fn nineteen_layers() -> SlicedFileMetadata {
		SlicedFileMetadata::new(19, 200, (1..=19).map(|layer| layer * 6).collect()).unwrap()
	}

	#[test]
	fn progress_is_rounded_to_one_decimal() {
		assert!((progress_percent(42, 120) - 35.0).abs() < 1e-9);
		assert!((progress_percent(1, 3) - 33.3).abs() < 1e-9);
		assert!((progress_percent(2, 3) - 66.7).abs() < 1e-9);
		assert!((progress_percent(120, 120) - 100.0).abs() < 1e-9);
		assert!((progress_percent(0, 120)).abs() < 1e-9);
		assert!((progress_percent(1, 1_000_000) - 0.0).abs() < 1e-9);
		assert!((progress_percent(999_999, 1_000_000) - 100.0).abs() < 1e-9);
	}

	#[test]
	fn progress_without_total_is_zero() {
		assert!(progress_percent(0, 0).abs() < f64::EPSILON);
		assert!(progress_percent(10, 0).abs() < f64::EPSILON);
	}

	#[test]
	fn progress_halves_round_to_even() {
		for (current, total, expected) in [
			(1, 400, 0.2),
			(3, 400, 0.8),
			(5, 400, 1.2),
			(7, 400, 1.8),
			(9, 400, 2.2),
			(1, 8, 12.5),
			(1, 800, 0.1),
			(3, 800, 0.4),
		] {
			let actual = progress_percent(current, total);
			assert!((actual - expected).abs() < 1e-9, "{current}/{total}: {actual}");
		}
	}

	#[test]
	fn progress_is_within_range() {
		for total in [1_u64, 7, 120, 4_096, 123_457] {
			for current in (0..=total).step_by(usize::try_from(total / 7 + 1).unwrap()) {
				let actual = progress_percent(current, total);
				assert!((0.0..=100.0).contains(&actual), "{current}/{total}");
			}
		}
	}

	#[test]
	fn layer_lookup() {
		let table = nineteen_layers();
		let table = table.end_byte_offset_by_layer();
		assert_eq!(table.len(), 19);
		assert_eq!(table.total_bytes(), 114);
		assert_eq!(table.layer_at(0), 1);
		assert_eq!(table.layer_at(1), 1);
		assert_eq!(table.layer_at(6), 1);
		assert_eq!(table.layer_at(7), 2);
		assert_eq!(table.layer_at(42), 7);
		assert_eq!(table.layer_at(43), 8);
		assert_eq!(table.layer_at(114), 19);
		// Past the end of the table still reports the last layer.
		assert_eq!(table.layer_at(120), 19);
	}

	#[test]
	fn layer_lookup_with_repeated_offsets() {
		let table = LayerOffsetTable::new(vec![0, 10, 10, 10, 20]).unwrap();
		assert_eq!(table.layer_at(0), 1);
		assert_eq!(table.layer_at(5), 2);
		assert_eq!(table.layer_at(10), 2);
		assert_eq!(table.layer_at(11), 5);
		assert_eq!(table.layer_at(20), 5);

		let single = LayerOffsetTable::try_from(vec![500]).unwrap();
		for current_byte in [0, 1, 500, 501] {
			assert_eq!(single.layer_at(current_byte), 1);
		}
	}

	#[test]
	fn layer_is_always_in_range() {
		let table = LayerOffsetTable::new((0..50).map(|i| i * i).collect()).unwrap();
		let last = *table.as_slice().last().unwrap();
		for current_byte in 0..=last + 10 {
			let layer = table.layer_at(current_byte);
			assert!((1..=table.len()).contains(&layer), "{current_byte} -> {layer}");
		}
		assert_eq!(table.layer_at(last), table.len());
	}

	#[test]
	fn invalid_tables_are_rejected() {
		let err = LayerOffsetTable::new(vec![]).unwrap_err();
		assert_eq!(err.reason(), "the table has no layers");

		let err = LayerOffsetTable::new(vec![6, 12, 11]).unwrap_err();
		assert_eq!(err.reason(), "layer 2 ends before layer 1");

		let err = SlicedFileMetadata::new(3, 10, vec![1, 2]).unwrap_err();
		assert_eq!(err.reason(), "expected 3 layers, found 2");
	}

	#[test]
	fn report_while_printing() {
		let file = nineteen_layers();
		let report = translate(&PrintStatus::printing(42, 120), "foobar.ctb", Some(&file));
		assert_eq!(
			report,
			ProgressReport {
				state: PrinterState::Printing,
				selected_file: "foobar.ctb".into(),
				progress_percent: Some(35.0),
				layer_count: Some(19),
				current_layer: Some(7),
				print_time_secs: Some(200),
			}
		);
	}

	#[test]
	fn report_while_paused() {
		let file = nineteen_layers();
		let status = PrintStatus::new(PrinterState::Paused, 42, 120);
		let report = translate(&status, "foobar.ctb", Some(&file));
		assert_eq!(report.state, PrinterState::Paused);
		assert_eq!(report.progress_percent, Some(35.0));
		assert_eq!(report.current_layer, Some(7));
	}

	#[test]
	fn report_while_starting_print() {
		let file = nineteen_layers();
		let status = PrintStatus::new(PrinterState::StartingPrint, 0, 120);
		let report = translate(&status, "foobar.ctb", Some(&file));
		assert_eq!(report.state, PrinterState::StartingPrint);
		assert_eq!(report.progress_percent, Some(0.0));
		assert_eq!(report.current_layer, Some(1));
		assert_eq!(report.layer_count, Some(19));
		assert_eq!(report.print_time_secs, Some(200));
	}

	#[test]
	fn report_while_idle_has_no_progress() {
		let file = nineteen_layers();
		for status in [PrintStatus::idle(), PrintStatus::new(PrinterState::Idle, 0, 0)] {
			let report = translate(&status, "foobar.ctb", Some(&file));
			assert_eq!(report.state, PrinterState::Idle);
			assert_eq!(report.selected_file, "foobar.ctb");
			assert_eq!(report.progress_percent, None);
			assert_eq!(report.layer_count, None);
			assert_eq!(report.current_layer, None);
			assert_eq!(report.print_time_secs, None);
		}
	}

	#[test]
	fn report_without_metadata_has_no_layers() {
		let report = translate(&PrintStatus::printing(60, 120), "foobar.ctb", None);
		assert_eq!(report.progress_percent, Some(50.0));
		assert_eq!(report.current_layer, None);
		assert_eq!(report.layer_count, None);
	}

	#[test]
	fn state_names() {
		assert_eq!(PrinterState::Idle.to_string(), "IDLE");
		assert_eq!(PrinterState::StartingPrint.to_string(), "STARTING_PRINT");
		assert_eq!(PrinterState::Printing.as_str(), "PRINTING");
		assert_eq!(PrinterState::Paused.as_str(), "PAUSED");
	}

	#[cfg(feature = "serde")]
	#[test]
	fn report_json_shape() {
		let file = nineteen_layers();
		let report = translate(&PrintStatus::printing(42, 120), "foobar.ctb", Some(&file));
		assert_eq!(
			serde_json::to_value(&report).unwrap(),
			serde_json::json!({
				"state": "PRINTING",
				"selected_file": "foobar.ctb",
				"progress": 35.0,
				"layer_count": 19,
				"current_layer": 7,
				"print_time_secs": 200,
			})
		);

		let report = translate(&PrintStatus::idle(), "foobar.ctb", Some(&file));
		assert_eq!(
			serde_json::to_value(&report).unwrap(),
			serde_json::json!({
				"state": "IDLE",
				"selected_file": "foobar.ctb",
			})
		);
	}
}
