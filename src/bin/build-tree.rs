//! Offline builder: reads a line-delimited transaction file, builds a
//! `SchemaTree`, and saves it to disk. Grounded on `load_mrt.rs`'s
//! `#[derive(Parser)]` CLI shape.

#![cfg(feature = "cli")]

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use schema_rec::builder::{build_tree, BuildOptions};
use schema_rec::stats::SchemaTreeStats;
use schema_rec::transactions::LineDelimitedFileSource;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Line-delimited transaction file, one whitespace-separated property
    /// set per line.
    input: PathBuf,

    /// Where to write the serialized tree.
    output: PathBuf,

    /// Minimum support retained in the serialized header (not enforced by
    /// the core itself).
    #[arg(long, default_value_t = 1)]
    min_sup: u32,

    /// Treat `t#`-prefixed tokens in the input as type tokens rather than
    /// dropping them.
    #[arg(long, default_value_t = false)]
    typed: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let source = LineDelimitedFileSource::new(&cli.input);
    let options = BuildOptions {
        min_sup: cli.min_sup,
        typed: cli.typed,
    };

    let tree = match build_tree(&source, options) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("build failed: {err}");
            std::process::exit(1);
        }
    };

    let stats = SchemaTreeStats::collect(&tree);
    println!("{stats}");

    let file = match File::create(&cli.output) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("could not create {:?}: {err}", cli.output);
            std::process::exit(1);
        }
    };
    if let Err(err) = schema_rec::serialize::save(&tree, &mut BufWriter::new(file)) {
        eprintln!("save failed: {err}");
        std::process::exit(1);
    }
    println!("wrote {:?}", cli.output);
}
