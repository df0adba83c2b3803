use std::{fs, path::PathBuf};

use blame_track::{TrackConfig, script::replay_script};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay an edit script and print the blame map and history", long_about = None)]
struct Args {
    /// Path to the edit script
    input: PathBuf,

    /// Print the document as it was just before this commit instead of the blame map
    #[arg(long, short)]
    revision: Option<usize>,

    /// Include hidden commits in the history listing
    #[arg(long)]
    all: bool,

    /// Reject stale transforms and check blame coverage after every transform
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = TrackConfig {
        verify_base: args.strict,
        verify_coverage: args.strict,
    };

    let source = fs::read_to_string(&args.input)?;
    let replay = replay_script(&source, &cfg)?;
    let state = &replay.state;

    if let Some(index) = args.revision {
        print!("{}", state.revision(&replay.doc, index)?);
        return Ok(());
    }

    println!("document: {:?}", replay.doc);
    println!("history:");
    for (id, commit) in state.commits().iter().enumerate() {
        if commit.hidden && !args.all {
            continue;
        }
        println!(
            "  #{id} {:?} at {} ({} steps){}",
            commit.message,
            commit.time,
            commit.len(),
            if commit.hidden { " [hidden]" } else { "" }
        );
    }
    if state.has_uncommitted() {
        println!("  (uncommitted: {} steps)", state.uncommitted_steps().len());
    }

    println!("blame:");
    for span in state.blame_map() {
        let who = match span.commit {
            Some(id) => format!("#{id}"),
            None => "-".to_string(),
        };
        let text = replay.doc.get(span.from..span.to).unwrap_or_default();
        println!("  {:>5}..{:<5} {who:<4} {text:?}", span.from, span.to);
    }

    Ok(())
}
