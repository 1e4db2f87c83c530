// ---------------------------------------------------------------------------
// Integration tests for bookrec-engine JSON-RPC 2.0 / NDJSON protocol
// ---------------------------------------------------------------------------
//
// Each test writes fixture tables into a temp directory, spawns a fresh
// bookrec-engine binary pointed at it, and talks newline-delimited JSON-RPC
// over stdin/stdout.
// ---------------------------------------------------------------------------

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const DUNE: &str = "9780441172719";
const FOUNDATION: &str = "9780553293357";
const HYPERION: &str = "9780553283686";

const EVENTS: &str = r#"{"userId": 1, "bookId": 1, "isbn13": 9780441172719, "title": "Dune", "language": "eng"}
{"userId": 1, "bookId": 2, "isbn13": 9780553293357, "title": "Foundation", "language": "eng"}
{"userId": 2, "bookId": 1, "isbn13": 9780441172719, "title": "Dune", "language": "eng"}
{"userId": 2, "bookId": 2, "isbn13": 9780553293357, "title": "Foundation", "language": "eng"}
{"userId": 2, "bookId": 3, "isbn13": 9780553283686, "title": "Hyperion", "language": "eng"}
{"userId": 3, "bookId": 4, "isbn13": "978-0-441-17271-9", "title": "Dune", "language": "eng"}
"#;

// books 1 and 4 are two editions of the same (title, isbn13, language)
const READER_AFFINITY: &str = r#"{"bookId": 1, "targetId": 7}
{"bookId": 4, "targetId": 7}
{"bookId": 3, "targetId": 7}
{"bookId": 2, "targetId": 8}
"#;

const BOOK_AFFINITY: &str = r#"{"bookId": 1, "targetId": 20}
{"bookId": 1, "targetId": 21}
{"bookId": 4, "targetId": 20}
{"bookId": 4, "targetId": 22}
{"bookId": 1, "targetId": 23}
{"bookId": 1, "targetId": 24}
{"bookId": 1, "targetId": 25}
"#;

fn write_fixtures(dir: &Path) {
	std::fs::write(dir.join("work_df.ndjson"), EVENTS).unwrap();
	std::fs::write(dir.join("recommend_books.ndjson"), READER_AFFINITY).unwrap();
	std::fs::write(dir.join("recommend_readers.jsonl"), BOOK_AFFINITY).unwrap();
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

struct EngineProcess {
	child: Child,
	reader: BufReader<std::process::ChildStdout>,
	next_id: AtomicU64,
	_data: TempDir,
}

impl EngineProcess {
	fn spawn() -> Self {
		let data = tempfile::tempdir().expect("failed to create temp dir");
		write_fixtures(data.path());

		let bin = env!("CARGO_BIN_EXE_bookrec-engine");
		let mut child = Command::new(bin)
			.arg("--data-dir")
			.arg(data.path())
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.spawn()
			.expect("failed to spawn bookrec-engine");

		let stdout = child.stdout.take().expect("no stdout");
		let reader = BufReader::new(stdout);

		Self {
			child,
			reader,
			next_id: AtomicU64::new(1),
			_data: data,
		}
	}

	fn write_raw(&mut self, line: &str) {
		let stdin = self.child.stdin.as_mut().expect("no stdin");
		stdin.write_all(line.as_bytes()).unwrap();
		stdin.write_all(b"\n").unwrap();
		stdin.flush().unwrap();
	}

	fn send(&mut self, method: &str, params: Value) -> RpcResponse {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let request = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});
		self.write_raw(&serde_json::to_string(&request).unwrap());

		loop {
			let mut buf = String::new();
			let bytes_read = self
				.reader
				.read_line(&mut buf)
				.expect("failed to read from stdout");
			if bytes_read == 0 {
				panic!("unexpected EOF while waiting for response to id={}", id);
			}
			let buf = buf.trim();
			if buf.is_empty() {
				continue;
			}
			let parsed: Value = serde_json::from_str(buf)
				.unwrap_or_else(|e| panic!("invalid JSON from engine: {e}\nline: {buf}"));
			let resp_id = parsed["id"].as_u64().expect("response id is not u64");
			assert_eq!(resp_id, id, "response id mismatch");
			if let Some(error) = parsed.get("error") {
				return RpcResponse::Error(error.clone());
			}
			return RpcResponse::Ok(parsed.get("result").cloned().unwrap_or(Value::Null));
		}
	}

	fn call(&mut self, method: &str, params: Value) -> Value {
		match self.send(method, params) {
			RpcResponse::Ok(v) => v,
			RpcResponse::Error(e) => panic!("expected success, got error: {e}"),
		}
	}

	fn call_err(&mut self, method: &str, params: Value) -> Value {
		match self.send(method, params) {
			RpcResponse::Error(e) => e,
			RpcResponse::Ok(v) => panic!("expected error, got success: {v}"),
		}
	}
}

impl Drop for EngineProcess {
	fn drop(&mut self) {
		drop(self.child.stdin.take());
		let _ = self.child.wait();
	}
}

#[derive(Debug)]
enum RpcResponse {
	Ok(Value),
	Error(Value),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn stats_after_startup() {
	let mut proc = EngineProcess::spawn();
	let stats = proc.call("library/stats", json!({}));
	assert_eq!(stats["events"], 6);
	assert_eq!(stats["readers"], 3);
	assert_eq!(stats["titles"], 3);
	assert_eq!(stats["readerAffinityRows"], 4);
	assert_eq!(stats["bookAffinityRows"], 7);
}

#[test]
fn catalog_lists_readers_titles_and_isbns() {
	let mut proc = EngineProcess::spawn();
	assert_eq!(proc.call("catalog/readers", json!({}))["readers"], json!([1, 2, 3]));
	assert_eq!(
		proc.call("catalog/titles", json!({}))["titles"],
		json!(["Dune", "Foundation", "Hyperion"])
	);
	assert_eq!(
		proc.call("catalog/isbns", json!({}))["isbns"],
		json!([DUNE, FOUNDATION, HYPERION])
	);
}

#[test]
fn top_pairs_for_dune() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("pairs/top", json!({ "title": "Dune" }));
	assert_eq!(
		result["pairs"],
		json!([
			{ "bookA": "Dune", "bookB": "Foundation", "count": 2 },
			{ "bookA": "Dune", "bookB": "Hyperion", "count": 1 },
		])
	);
}

#[test]
fn top_pairs_for_unknown_title_is_empty() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("pairs/top", json!({ "title": "NoSuchBook" }));
	assert_eq!(result["pairs"], json!([]));
}

#[test]
fn top_pairs_is_idempotent() {
	let mut proc = EngineProcess::spawn();
	let first = proc.call("pairs/top", json!({ "title": "Foundation" }));
	let second = proc.call("pairs/top", json!({ "title": "Foundation" }));
	assert_eq!(
		serde_json::to_string(&first).unwrap(),
		serde_json::to_string(&second).unwrap()
	);
}

#[test]
fn books_for_reader_collapses_duplicate_editions() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("recommend/booksForReader", json!({ "readerId": 7 }));
	assert_eq!(
		result["books"],
		json!([
			{ "title": "Dune", "isbn13": DUNE, "language": "eng" },
			{ "title": "Hyperion", "isbn13": HYPERION, "language": "eng" },
		])
	);
}

#[test]
fn books_for_reader_without_affinity_is_empty() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("recommend/booksForReader", json!({ "readerId": 42 }));
	assert_eq!(result["books"], json!([]));
}

#[test]
fn books_for_reader_rejects_non_numeric_id() {
	let mut proc = EngineProcess::spawn();
	let err = proc.call_err("recommend/booksForReader", json!({ "readerId": "forty-two" }));
	assert_eq!(err["code"], -32602);
	assert_eq!(err["data"]["libraryCode"], "BOOKREC_MALFORMED_INPUT");
}

#[test]
fn readers_for_book_dedupes_targets() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("recommend/readersForBook", json!({ "isbn13": DUNE }));
	let targets: Vec<u64> = result["readers"]
		.as_array()
		.unwrap()
		.iter()
		.map(|r| r["targetReaderId"].as_u64().unwrap())
		.collect();
	assert_eq!(targets, vec![20, 21, 23, 24, 25, 22]);
	assert!(result["readers"]
		.as_array()
		.unwrap()
		.iter()
		.all(|r| r["title"] == "Dune"));
}

#[test]
fn readers_for_book_with_max_results() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call(
		"recommend/readerIdsForBook",
		json!({ "isbn13": DUNE, "maxResults": 5 }),
	);
	assert_eq!(result["readerIds"], json!([20, 21, 23, 24, 25]));
}

#[test]
fn readers_for_unknown_isbn_is_empty() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("recommend/readersForBook", json!({ "isbn13": "9999999999999" }));
	assert_eq!(result["readers"], json!([]));
}

#[test]
fn readers_for_book_rejects_malformed_isbn() {
	let mut proc = EngineProcess::spawn();
	let err = proc.call_err("recommend/readersForBook", json!({ "isbn13": "not-an-isbn" }));
	assert_eq!(err["code"], -32602);
}

#[test]
fn unknown_method_returns_method_not_found() {
	let mut proc = EngineProcess::spawn();
	let err = proc.call_err("store/initialize", json!({}));
	assert_eq!(err["code"], -32601);
}

#[test]
fn garbage_line_is_skipped() {
	let mut proc = EngineProcess::spawn();
	proc.write_raw("this is not json");
	let stats = proc.call("library/stats", json!({}));
	assert_eq!(stats["events"], 6);
}

#[test]
fn missing_table_fails_at_startup() {
	let data = tempfile::tempdir().unwrap();
	std::fs::write(data.path().join("work_df.ndjson"), EVENTS).unwrap();

	let status = Command::new(env!("CARGO_BIN_EXE_bookrec-engine"))
		.arg("--data-dir")
		.arg(data.path())
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.expect("failed to run bookrec-engine");
	assert!(!status.success());
}
