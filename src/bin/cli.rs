//! blockstore CLI
//!
//! Command-line interface for creating, inspecting and editing block files.

use std::path::PathBuf;
use std::process;

use blockstore::{BlockFile, Config, FileReport};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blockstore CLI
#[derive(Parser, Debug)]
#[command(name = "blockstore-cli")]
#[command(about = "Inspect and edit blockstore files")]
#[command(version)]
struct Args {
    /// Path of the block file
    path: PathBuf,

    /// Payload size of newly allocated stream blocks
    #[arg(short, long, default_value = "1024")]
    block_size: u32,

    /// Payload size of directory blocks
    #[arg(short, long, default_value = "64")]
    directory_block_size: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the file (and its directory) if it does not exist
    Init,

    /// Print every chain with its blocks
    Inspect,

    /// Append a new empty stream to the directory
    NewStream,

    /// Write text into a stream
    Write {
        /// Stream index
        stream: usize,

        /// Text to write
        text: String,

        /// Logical offset to start at (defaults to the end of the stream)
        #[arg(short, long)]
        offset: Option<u64>,

        /// Discard everything after the written text
        #[arg(short, long)]
        truncate: bool,
    },

    /// Print a stream's contents
    Cat {
        /// Stream index
        stream: usize,
    },

    /// Check link consistency and report orphaned space
    Verify,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> blockstore::Result<()> {
    let config = Config::builder()
        .path(&args.path)
        .block_size(args.block_size)
        .directory_block_size(args.directory_block_size)
        .create_if_missing(matches!(args.command, Commands::Init))
        .build();

    let mut file = BlockFile::open(config)?;

    match args.command {
        Commands::Init => {
            println!("{}: {} stream(s)", args.path.display(), file.stream_count());
        }
        Commands::Inspect => {
            let header = file.directory().header();
            println!("directory @{}", header.position());
            print_blocks(header);
            for (index, structure) in file.directory().structures().iter().enumerate() {
                println!("stream {} @{}", index, structure.position());
                print_blocks(structure);
            }
        }
        Commands::NewStream => {
            let index = file.create_stream()?;
            println!("{}", index);
        }
        Commands::Write {
            stream,
            text,
            offset,
            truncate,
        } => {
            let mut io = file.stream(stream)?;
            let offset = offset.unwrap_or_else(|| io.size());
            io.seek(offset)?;
            io.write(text.as_bytes(), truncate)?;
            println!("{} bytes", io.size());
        }
        Commands::Cat { stream } => {
            let mut io = file.stream(stream)?;
            let data = io.read_all()?;
            println!("{}", String::from_utf8_lossy(&data));
        }
        Commands::Verify => {
            let report = FileReport::scan(file.file_mut(), 0)?;
            println!(
                "directory: {} block(s), {} stream(s)",
                report.directory.block_count(),
                report.streams.len()
            );
            for (index, stream) in report.streams.iter().enumerate() {
                println!(
                    "stream {}: {} block(s), {}/{} bytes written, links {}",
                    index,
                    stream.block_count(),
                    stream.written,
                    stream.capacity,
                    if stream.backward_consistent { "ok" } else { "BROKEN" }
                );
            }
            println!(
                "file: {} bytes, {} reachable, {} orphaned",
                report.file_len,
                report.reachable,
                report.orphaned()
            );
            if !report.is_consistent() {
                process::exit(2);
            }
        }
    }

    file.close()
}

fn print_blocks(structure: &blockstore::BlockStructure) {
    for block in structure.blocks() {
        println!(
            "  block @{:<8} size={:<6} used={:<6} next={:<8} prev={}",
            block.start,
            block.size,
            block.next_empty,
            block
                .next
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            block
                .prev
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}
