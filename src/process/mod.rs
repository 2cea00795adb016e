// src/process/mod.rs
pub mod aggregate;
pub mod extract;
pub mod parse;
pub mod table;

pub use aggregate::{
    count_status, group_counts, process_data, write_summary, Summary, SummaryReport,
};
pub use extract::{extract_first_csv, list_csv_entries};
pub use parse::parse_absentee_file;
pub use table::RecordTable;
