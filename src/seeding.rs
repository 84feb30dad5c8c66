//! Fixture module.
//!
//! Fixture generation, formats, identity-remapping loads and the
//! `dumpdata` / `loaddata` commands.
//!
//! # Examples
//!
//! ```rust,ignore
//! use rekey::seeding::commands::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
//! ```

pub use rekey_seeding::*;
