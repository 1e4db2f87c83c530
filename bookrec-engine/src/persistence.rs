// ---------------------------------------------------------------------------
// Table loading: NDJSON rows, optionally gzip-compressed
// ---------------------------------------------------------------------------
//
// Each table lives in the data directory under a base name. The first existing
// file among the candidate suffixes wins. Content starting with the gzip magic
// bytes is decompressed regardless of suffix. One JSON object per line; blank
// lines are skipped.
// ---------------------------------------------------------------------------

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::LibraryError;
use crate::types::{AffinityRow, ReadingEvent};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistenceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Not found: no table file for '{0}'")]
	Missing(String),
	#[error("Corruption: {0}")]
	Corruption(String),
	#[error("Serialization: {0}")]
	Serialization(String),
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

pub const CANDIDATE_SUFFIXES: &[&str] = &["", ".ndjson", ".jsonl", ".ndjson.gz", ".jsonl.gz"];

/// Where the three source tables live.
#[derive(Debug, Clone)]
pub struct TableSources {
	pub data_dir: PathBuf,
	pub events: String,
	pub reader_affinity: String,
	pub book_affinity: String,
}

/// The three tables as loaded, before indexing.
#[derive(Debug)]
pub struct LoadedTables {
	pub events: Vec<ReadingEvent>,
	pub reader_affinity: Vec<AffinityRow>,
	pub book_affinity: Vec<AffinityRow>,
}

// ---------------------------------------------------------------------------
// Gzip
// ---------------------------------------------------------------------------

/// Check if data starts with gzip magic bytes (0x1f, 0x8b).
pub fn is_gzipped(data: &[u8]) -> bool {
	data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Gunzip-decompress a byte slice.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, PersistenceError> {
	let mut decoder = GzDecoder::new(data);
	let mut decompressed = Vec::new();
	decoder
		.read_to_end(&mut decompressed)
		.map_err(|e| PersistenceError::Corruption(format!("Invalid gzip data: {}", e)))?;
	Ok(decompressed)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// First existing file for `name` under `dir`, trying each candidate suffix.
pub fn resolve_table_path(dir: &Path, name: &str) -> Option<PathBuf> {
	CANDIDATE_SUFFIXES
		.iter()
		.map(|suffix| dir.join(format!("{}{}", name, suffix)))
		.find(|path| path.is_file())
}

/// Parse NDJSON text into rows, also returning how many blank lines were
/// skipped. Errors name the 1-based line number.
fn parse_lines<T: DeserializeOwned>(text: &str) -> Result<(Vec<T>, usize), PersistenceError> {
	let mut rows = Vec::new();
	let mut blank = 0;
	for (idx, line) in text.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() {
			blank += 1;
			continue;
		}
		let row = serde_json::from_str(line).map_err(|e| {
			PersistenceError::Serialization(format!("line {}: {}", idx + 1, e))
		})?;
		rows.push(row);
	}
	Ok((rows, blank))
}

/// Parse NDJSON text into rows. Blank lines are skipped with a warning.
pub fn parse_rows<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, PersistenceError> {
	let (rows, blank) = parse_lines(text)?;
	if blank > 0 {
		tracing::warn!(blank_lines = blank, rows = rows.len(), "Skipped blank lines in table");
	}
	Ok(rows)
}

/// Read one table file, decompressing if needed.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
	let raw = std::fs::read(path)?;
	let bytes = if is_gzipped(&raw) {
		decompress(&raw)?
	} else {
		raw
	};
	let text = String::from_utf8(bytes)
		.map_err(|e| PersistenceError::Corruption(format!("Invalid UTF-8: {}", e)))?;
	parse_rows(&text)
}

/// Resolve and read the table called `name` under `dir`.
pub fn load_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, PersistenceError> {
	let path = resolve_table_path(dir, name)
		.ok_or_else(|| PersistenceError::Missing(dir.join(name).display().to_string()))?;
	let rows = read_table(&path)?;
	tracing::info!(table = name, path = %path.display(), rows = rows.len(), "Loaded table");
	Ok(rows)
}

fn unavailable(table: &str, err: PersistenceError) -> LibraryError {
	LibraryError::DataUnavailable {
		table: table.to_string(),
		reason: err.to_string(),
	}
}

/// Load all three tables. Any failure is fatal: no partial result.
pub fn load_tables(sources: &TableSources) -> Result<LoadedTables, LibraryError> {
	let dir = sources.data_dir.as_path();
	let events = load_table(dir, &sources.events).map_err(|e| unavailable(&sources.events, e))?;
	let reader_affinity = load_table(dir, &sources.reader_affinity)
		.map_err(|e| unavailable(&sources.reader_affinity, e))?;
	let book_affinity = load_table(dir, &sources.book_affinity)
		.map_err(|e| unavailable(&sources.book_affinity, e))?;
	Ok(LoadedTables {
		events,
		reader_affinity,
		book_affinity,
	})
}
