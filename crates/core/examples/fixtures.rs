use std::{fs, path::PathBuf};

use blame_track::{TrackConfig, blame::render_blame, script::replay_script};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fixtures")]
#[command(about = "Create or validate expected blame output for edit scripts", long_about = None)]
struct Args {
    /// Write fixtures instead of validating them
    #[arg(long, short)]
    write: bool,

    /// Path to the fixtures directory (defaults to "./fixtures")
    #[arg(long, default_value = "fixtures")]
    dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let cfg = TrackConfig {
        verify_base: true,
        verify_coverage: true,
    };

    let mut scripts = Vec::new();
    for entry in fs::read_dir(&args.dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("script") {
            scripts.push(path);
        }
    }
    scripts.sort();

    let mut mismatches = Vec::new();
    for script_path in &scripts {
        let filename = script_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("invalid filename")?;

        let replay = replay_script(&fs::read_to_string(script_path)?, &cfg)?;
        let blame = render_blame(replay.state.blame_map());
        let blame_path = script_path.with_extension("blame");

        if args.write {
            fs::write(&blame_path, &blame)?;
            println!("  Created {}", blame_path.display());
            continue;
        }

        match fs::read_to_string(&blame_path) {
            Ok(expected) if expected == blame => println!("  ✓ {filename}"),
            Ok(_) => mismatches.push(format!("{filename}: blame mismatch")),
            Err(_) => mismatches.push(format!(
                "{filename}: missing blame file {}",
                blame_path.display()
            )),
        }
    }

    if !mismatches.is_empty() {
        eprintln!("\nValidation failed:");
        for mismatch in &mismatches {
            eprintln!("  ✗ {mismatch}");
        }
        return Err(format!("{} validation error(s)", mismatches.len()).into());
    }

    println!("\nProcessed {} fixtures.", scripts.len());
    Ok(())
}
