use std::path::PathBuf;

use clap::Parser;

use crate::persistence::TableSources;

#[derive(Parser, Debug)]
#[command(
	name = "bookrec-engine",
	about = "Book recommendations (co-read pairs and affinity joins) over JSON-RPC / NDJSON stdio"
)]
pub struct CliArgs {
	/// Directory holding the three source tables
	#[arg(long, default_value = "./dataframes", env = "BOOKREC_DATA_DIR")]
	pub data_dir: PathBuf,

	/// Base name of the reading-event table
	#[arg(long, default_value = "work_df", env = "BOOKREC_EVENTS_TABLE")]
	pub events_table: String,

	/// Base name of the affinity table used for books-for-reader queries
	#[arg(long, default_value = "recommend_books", env = "BOOKREC_READER_AFFINITY_TABLE")]
	pub reader_affinity_table: String,

	/// Base name of the affinity table used for readers-for-book queries
	#[arg(long, default_value = "recommend_readers", env = "BOOKREC_BOOK_AFFINITY_TABLE")]
	pub book_affinity_table: String,

	/// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
	#[arg(long, default_value = "info", env = "BOOKREC_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn table_sources(&self) -> TableSources {
		TableSources {
			data_dir: self.data_dir.clone(),
			events: self.events_table.clone(),
			reader_affinity: self.reader_affinity_table.clone(),
			book_affinity: self.book_affinity_table.clone(),
		}
	}
}
