//! Printer access and the print job lifecycle.
//!
//! - **Device**: [`PrintDevice`] trait, the only seam to the printing system
//! - **CUPS**: [`CupsDevice`], the command-line binding used in production
//! - **Options**: [`PrintOptions`], verbatim key/value map with layered overrides
//! - **Job**: [`JobId`], [`JobState`], [`JobOutcome`], [`PrintJob`]
//! - **Controller**: [`PrintController`], resolved printer plus submit/poll/cancel

mod controller;
pub mod cups;
mod device;
pub mod job;
mod options;

pub use controller::{PrintController, resolve_printer};
pub use cups::CupsDevice;
pub use device::{PrintDevice, PrinterError, PrinterState, PrinterStatus};
pub use job::{JobId, JobOutcome, JobState, PrintJob};
pub use options::PrintOptions;

#[cfg(test)]
pub(crate) use device::tests::FakeDevice;
