use std::sync::Arc;

use bookrec_engine::config::CliArgs;
use bookrec_engine::library::Library;
use bookrec_engine::server::RecommendServer;
use bookrec_engine::transport::NdjsonTransport;
use clap::Parser;

fn main() {
	let args = CliArgs::parse();

	// stdout carries the protocol; logs go to stderr
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let sources = args.table_sources();
	tracing::info!(data_dir = %sources.data_dir.display(), "Loading tables");

	let library = match Library::load(&sources) {
		Ok(lib) => Arc::new(lib),
		Err(e) => {
			tracing::error!("Startup failed: {}", e);
			std::process::exit(1);
		}
	};

	let mut server = RecommendServer::new(NdjsonTransport::stdout(), library);

	tracing::info!("bookrec-engine ready");

	if let Err(e) = server.run() {
		tracing::error!("Server error: {}", e);
		std::process::exit(1);
	}
}
