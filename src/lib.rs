//! recall: an interactive console for re-running past commands, jumping to
//! remembered positions and driving a few desktop utilities.
//!
//! The history pickers all go through [`candidates::build_candidates`] and
//! [`candidates::select_candidate`]; everything else is glue around them.

pub mod candidates;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod history;
pub mod load_path;
pub mod marks;
pub mod parser;
pub mod process;
pub mod repl;
pub mod session;
pub mod util;
pub mod utilities;
