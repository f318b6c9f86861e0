//! Application-level orchestration utilities.
//!
//! This module owns request lifecycle control (one fetch or upload at a time) and
//! post-fetch processing such as sorting, snapshots and exports. UI/CLI layers call into
//! this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::{process_fetch, sort_order};
