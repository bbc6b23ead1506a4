//! One module per `skill` subcommand group, each a thin translation from
//! parsed CLI args to a [`skill_runtime::Session`] facade call plus
//! human-readable output — mirroring the teacher's one-file-per-subcommand
//! layout.

pub mod artifacts;
pub mod deps;
pub mod run;
pub mod serve;
pub mod skills;
pub mod tools;
