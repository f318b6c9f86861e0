//! Roster data handling: body parsing, table rendering and sorting, upload encoding.

mod parse;
mod payload;
mod table;

pub use parse::parse_body;
pub use payload::encode_upload;
pub use table::{rebuild, sort_students, RosterTable, COLUMNS};
