// ---------------------------------------------------------------------------
// RecommendServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Reads JSON-RPC 2.0 requests (NDJSON over stdin) and answers them from a
// shared, already-loaded `Library`. The server never loads or mutates data;
// it only validates params, runs a query and writes the result.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde::Serialize;

use crate::error::LibraryError;
use crate::library::Library;
use crate::protocol::*;
use crate::transport::NdjsonTransport;

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum DispatchError {
	UnknownMethod(String),
	Library(LibraryError),
}

impl From<LibraryError> for DispatchError {
	fn from(e: LibraryError) -> Self {
		Self::Library(e)
	}
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct RecommendServer<W: Write = io::Stdout> {
	transport: NdjsonTransport<W>,
	library: Arc<Library>,
}

impl<W: Write> RecommendServer<W> {
	pub fn new(transport: NdjsonTransport<W>, library: Arc<Library>) -> Self {
		Self { transport, library }
	}

	/// Main loop over stdin; returns when stdin closes.
	pub fn run(&mut self) -> Result<(), LibraryError> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	/// Answer each request line from `reader` in order. Blank lines are
	/// keep-alives and skipped without a log; unparseable lines are logged
	/// and skipped with no response.
	pub fn serve<R: BufRead>(&mut self, reader: R) -> Result<(), LibraryError> {
		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		match self.handle(&req.method, req.params) {
			Ok(value) => self.transport.write_response(id, value),
			Err(DispatchError::UnknownMethod(method)) => self.transport.write_error(
				id,
				METHOD_NOT_FOUND,
				format!("Unknown method: {}", method),
				None,
			),
			Err(DispatchError::Library(e)) => {
				let code = match &e {
					LibraryError::MalformedInput(_) => INVALID_PARAMS,
					LibraryError::Serialization(_) => INTERNAL_ERROR,
					_ => LIBRARY_ERROR,
				};
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()));
			}
		}
	}

	pub fn into_transport(self) -> NdjsonTransport<W> {
		self.transport
	}

	/// Run one method against the library and build its result object.
	pub fn handle(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<serde_json::Value, DispatchError> {
		let lib = self.library.as_ref();
		let value = match method {
			// -- Catalog -------------------------------------------------
			"library/stats" => to_value(&lib.stats())?,
			"catalog/readers" => serde_json::json!({ "readers": lib.reader_ids() }),
			"catalog/titles" => serde_json::json!({ "titles": lib.titles() }),
			"catalog/isbns" => serde_json::json!({ "isbns": lib.isbns() }),

			// -- Co-read pairs -------------------------------------------
			"pairs/top" => {
				let p: TopPairsParams = parse_params(params)?;
				serde_json::json!({ "pairs": lib.find_top_pairs(&p.title)? })
			}

			// -- Affinity joins ------------------------------------------
			"recommend/booksForReader" => {
				let p: BooksForReaderParams = parse_params(params)?;
				let books = limit(lib.recommend_books_for_reader(p.reader_id), p.max_results);
				serde_json::json!({ "books": books })
			}
			"recommend/readersForBook" => {
				let p: ReadersForBookParams = parse_params(params)?;
				let readers = limit(lib.recommend_readers_for_book(&p.isbn13), p.max_results);
				serde_json::json!({ "readers": readers })
			}
			"recommend/readerIdsForBook" => {
				let p: ReadersForBookParams = parse_params(params)?;
				let ids = limit(lib.recommend_reader_ids_for_book(&p.isbn13), p.max_results);
				serde_json::json!({ "readerIds": ids })
			}

			_ => return Err(DispatchError::UnknownMethod(method.to_string())),
		};
		Ok(value)
	}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, LibraryError> {
	serde_json::from_value(params)
		.map_err(|e| LibraryError::MalformedInput(format!("Invalid params: {}", e)))
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, LibraryError> {
	serde_json::to_value(value).map_err(|e| LibraryError::Serialization(e.to_string()))
}

fn limit<T>(mut rows: Vec<T>, max_results: Option<usize>) -> Vec<T> {
	if let Some(max) = max_results {
		rows.truncate(max);
	}
	rows
}
