//! Interactive query loop against a previously-built, serialized tree:
//! reads one whitespace-separated property set per line from stdin, prints
//! ranked recommendations. Grounded on `load_mrt.rs`'s CLI shape; the
//! read-eval-print loop itself uses plain `std::io` rather than `rustyline`
//! (a teacher dependency this crate has no further use for — see
//! `DESIGN.md`'s dropped-dependency list).

#![cfg(feature = "cli")]

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use schema_rec::config::{to_workflow, Configuration};
use schema_rec::recommend::recommend;
use schema_rec::wire::{resolve_query, RecommenderRequest};
use schema_rec::SchemaTree;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Serialized tree produced by `build-tree`.
    tree: PathBuf,

    /// Optional workflow configuration (JSON); without it, queries go
    /// straight through the direct recommender with no backoff layers.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Include type tokens among the candidates.
    #[arg(long, default_value_t = false)]
    types: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let file = File::open(&cli.tree).unwrap_or_else(|err| {
        eprintln!("could not open {:?}: {err}", cli.tree);
        std::process::exit(1);
    });
    let tree: SchemaTree = schema_rec::serialize::load(&mut BufReader::new(file)).unwrap_or_else(|err| {
        eprintln!("could not load tree: {err}");
        std::process::exit(1);
    });

    let workflow = cli.config.map(|path| {
        let text = std::fs::read_to_string(&path).unwrap_or_else(|err| {
            eprintln!("could not read {path:?}: {err}");
            std::process::exit(1);
        });
        let config = Configuration::from_json(&text).unwrap_or_else(|err| {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        });
        to_workflow(&config).unwrap_or_else(|err| {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        })
    });

    println!("enter whitespace-separated property names, or an empty line to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }

        let request = RecommenderRequest {
            types: Vec::new(),
            properties: trimmed.split_whitespace().map(str::to_owned).collect(),
        };
        let query = resolve_query(&tree, &request);

        let recommendations = match &workflow {
            Some(wf) => wf.recommend(&tree, &query, cli.types),
            None => recommend(&tree, &query, cli.types),
        };

        for r in recommendations.iter().take(10) {
            println!(
                "  {:<40} {:.4}",
                tree.dictionary().record(r.pid).name(),
                r.probability
            );
        }
    }
}
