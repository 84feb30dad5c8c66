//! Management commands.
//!
//! - [`DumpDataCommand`] captures entity kinds from a source store
//! - [`LoadDataCommand`] loads fixture files into a destination store

mod dumpdata;
mod loaddata;

pub use dumpdata::{DumpDataArgs, DumpDataCommand, DumpDataOptions, DumpResult};
pub use loaddata::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
