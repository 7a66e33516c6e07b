//! CLI commands module.

mod profile;
mod sighting;
mod util;

pub use profile::ProfileCommand;
pub use sighting::SightingCommand;

pub(crate) use util::*;
