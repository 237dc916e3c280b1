//! Builds the identifier mapping tables for a world migration.
//!
//! Two game configurations (old and new) are parsed into symbol → id
//! lookups, combined with per-mod rule dictionaries into a block table and
//! an item table, and frozen into a [`MapInfo`] that the traversal engine
//! reads for the rest of the run.

mod config;
mod rules;
mod table;

pub use config::{Config, ConfigDescriptor, ConfigError, ConfigFormat};
pub use rules::{ModRules, RuleKey, RuleTarget};
pub use table::{MapError, MapInfo, MapTarget};
