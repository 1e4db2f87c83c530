// ---------------------------------------------------------------------------
// NDJSON response writer
// ---------------------------------------------------------------------------
//
// One JSON-RPC response per line, flushed after each write so a client
// reading line by line never waits on a buffer. Generic over the sink: the
// binary writes to stdout, tests write into a `Vec<u8>`.
// ---------------------------------------------------------------------------

use std::io::{self, Write};

use crate::protocol::JsonRpcResponse;

pub struct NdjsonTransport<W: Write = io::Stdout> {
	out: W,
}

impl NdjsonTransport<io::Stdout> {
	pub fn stdout() -> Self {
		Self::new(io::stdout())
	}
}

impl<W: Write> NdjsonTransport<W> {
	pub fn new(out: W) -> Self {
		Self { out }
	}

	pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
		self.send(&JsonRpcResponse::success(id, result));
	}

	pub fn write_error(
		&mut self,
		id: u64,
		code: i32,
		message: impl Into<String>,
		data: Option<serde_json::Value>,
	) {
		self.send(&JsonRpcResponse::failure(id, code, message, data));
	}

	/// Write failures are logged, not returned: a closed stdout ends the
	/// session anyway once stdin closes.
	fn send(&mut self, response: &JsonRpcResponse) {
		if let Err(e) = self.write_line(response) {
			tracing::error!(id = response.id, "Failed to write response: {}", e);
		}
	}

	fn write_line(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
		serde_json::to_writer(&mut self.out, response)?;
		self.out.write_all(b"\n")?;
		self.out.flush()
	}

	pub fn into_inner(self) -> W {
		self.out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protocol::INVALID_PARAMS;

	fn lines(buf: Vec<u8>) -> Vec<serde_json::Value> {
		String::from_utf8(buf)
			.unwrap()
			.lines()
			.map(|l| serde_json::from_str(l).unwrap())
			.collect()
	}

	#[test]
	fn writes_one_response_per_line() {
		let mut transport = NdjsonTransport::new(Vec::new());
		transport.write_response(1, serde_json::json!({ "titles": ["Dune"] }));
		transport.write_error(
			2,
			INVALID_PARAMS,
			"bad isbn",
			Some(serde_json::json!({ "libraryCode": "BOOKREC_MALFORMED_INPUT" })),
		);

		let out = lines(transport.into_inner());
		assert_eq!(out.len(), 2);
		assert_eq!(out[0]["id"], 1);
		assert_eq!(out[0]["result"]["titles"][0], "Dune");
		assert_eq!(out[1]["error"]["code"], INVALID_PARAMS);
		assert_eq!(out[1]["error"]["data"]["libraryCode"], "BOOKREC_MALFORMED_INPUT");
	}

	#[test]
	fn broken_sink_reports_write_error() {
		struct Broken;
		impl Write for Broken {
			fn write(&mut self, _: &[u8]) -> io::Result<usize> {
				Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
			}
			fn flush(&mut self) -> io::Result<()> {
				Ok(())
			}
		}
		let mut transport = NdjsonTransport::new(Broken);
		let resp = JsonRpcResponse::success(1, serde_json::json!(null));
		assert!(transport.write_line(&resp).is_err());
		// logged and swallowed
		transport.write_response(1, serde_json::json!(null));
	}
}
