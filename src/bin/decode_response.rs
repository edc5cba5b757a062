//! Decode a saved Prometheus/Loki response and print its frames.

use promframes::telemetry::init_logging;
use promframes::{decode, DecoderOptions, Frame};

use anyhow::Context;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Print the frames decoded from a query response body
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Response file, or "-" for stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Emit dataplane frame type tags (also enabled by PROMFRAMES_DATAPLANE)
    #[arg(long)]
    dataplane: bool,

    /// Print frame metadata as JSON instead of tables
    #[arg(long)]
    meta_only: bool,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json_logs)?;

    let payload = read_input(&args.input)?;
    let env_opts = DecoderOptions::from_env().context("invalid decoder environment")?;
    let opts = options(env_opts, args.dataplane);

    let frames = decode(&payload, &opts)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;
    info!(frames = frames.len(), bytes = payload.len(), "Decoded response");

    for (i, frame) in frames.iter().enumerate() {
        print_frame(i, frame, args.meta_only)?;
    }
    Ok(())
}

/// `--dataplane` can only switch tagging on
fn options(env_opts: DecoderOptions, dataplane_flag: bool) -> DecoderOptions {
    env_opts.with_dataplane(env_opts.dataplane || dataplane_flag)
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_frame(index: usize, frame: &Frame, meta_only: bool) -> anyhow::Result<()> {
    let name = if frame.name.is_empty() {
        "<unnamed>"
    } else {
        frame.name.as_str()
    };
    println!("frame {index}: {name} ({} rows)", frame.row_count());
    println!("meta: {}", serde_json::to_string(&frame.meta)?);

    if !meta_only {
        let batch = frame.to_record_batch()?;
        println!("{}", pretty_format_batches(&[batch])?);
    }
    Ok(())
}
