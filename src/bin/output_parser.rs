//! # Legacy Capture Parser
//!
//! Splits a line-delimited capture file back into `K_image.<ext>` and
//! `K_data.json` pairs.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin output-parser -- --infile output.json --outdir out/
//! ```

use clap::Parser;
use std::path::Path;

use goat_ingest::common::logging::init_logger;
use goat_ingest::common::store::ArtifactStore;
use goat_ingest::processing::legacy::DEFAULT_MAX_LINE_BYTES;
use goat_ingest::processing::LegacyDecoder;

/// Command-line arguments for the capture parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to file with json data
    #[arg(long, default_value = "output.json")]
    infile: String,

    /// Output directory where the images are created
    #[arg(long, default_value = "out/")]
    outdir: String,

    /// Lines longer than this many bytes are skipped
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    max_line_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let store = ArtifactStore::open(&args.outdir).await?;
    let decoder = LegacyDecoder::new(store).with_max_line_bytes(args.max_line_bytes);

    decoder.run(Path::new(&args.infile)).await?;

    Ok(())
}
