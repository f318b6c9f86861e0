//! Post-fetch processing utilities.
//!
//! Handles sorting, snapshot saving and exports after a roster arrives.

use crate::cli::Cli;
use crate::model::{SortOrder, Student};
use crate::roster;
use crate::storage;

/// Result of post-fetch processing, ready for presentation layers.
pub(crate) struct ProcessedFetch {
    pub students: Vec<Student>,
    /// Successful exports, one line each.
    pub export_messages: Vec<String>,
    /// Failed exports, kept apart so callers can stop on them.
    pub export_errors: Vec<String>,
    pub exported_paths: Vec<std::path::PathBuf>,
    pub saved_path: Option<std::path::PathBuf>,
}

/// Process a fetched roster: apply the requested sort, save a snapshot, export.
pub(crate) fn process_fetch(args: &Cli, save: bool, mut students: Vec<Student>) -> ProcessedFetch {
    if let Some(key) = args.sort {
        roster::sort_students(&mut students, key, sort_order(args));
    }

    let saved_path = if save {
        match storage::save_snapshot(&students) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("snapshot save failed: {e:#}");
                None
            }
        }
    } else {
        None
    };

    let mut export_messages = Vec::new();
    let mut export_errors = Vec::new();
    let mut exported_paths = Vec::new();
    if let Some(export_path) = args.export_json.as_deref() {
        match storage::export_json(export_path, &students) {
            Ok(_) => {
                export_messages.push(format!("Exported JSON: {}", export_path.display()));
                exported_paths.push(export_path.to_path_buf());
            }
            Err(e) => export_errors.push(format!("Export JSON failed: {e:#}")),
        }
    }
    if let Some(export_path) = args.export_csv.as_deref() {
        match storage::export_csv(export_path, &students) {
            Ok(_) => {
                export_messages.push(format!("Exported CSV: {}", export_path.display()));
                exported_paths.push(export_path.to_path_buf());
            }
            Err(e) => export_errors.push(format!("Export CSV failed: {e:#}")),
        }
    }

    ProcessedFetch {
        students,
        export_messages,
        export_errors,
        exported_paths,
        saved_path,
    }
}

pub(crate) fn sort_order(args: &Cli) -> SortOrder {
    if args.descending {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}
