use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use xliff_merge::compare::{ComparisonRow, DiffKind, diff_words};
use xliff_merge::loader::{RenameOutcome, apply_renames, plan_renames};
use xliff_merge::{
    SelectionConfig, Session, VersionSlot, load_document_from_file, merge_file_name,
    serialize_document,
};

#[derive(Parser)]
#[command(name = "xliff-merge", version, about = "Compare and merge versions of an XLIFF file")]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how the targets of each source differ between versions
    Compare {
        /// XLIFF files as PATH or PATH=LABEL, loaded into slots 1, 2, ...
        #[arg(required = true, num_args = 2..)]
        files: Vec<String>,
        /// Only list rows whose targets differ
        #[arg(short, long)]
        different: bool,
    },
    /// Merge the versions into one XLIFF file following the LATEST (or first) version
    Merge {
        #[arg(required = true, num_args = 1..)]
        files: Vec<String>,
        /// Output path; defaults to merged_<label>_<timestamp>.xlf in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Selection configuration to apply before merging
        #[arg(short, long)]
        selections: Option<PathBuf>,
    },
    /// Write the current version selections as JSON
    Selections {
        #[arg(required = true, num_args = 2..)]
        files: Vec<String>,
        /// Start from a previously exported configuration
        #[arg(short, long)]
        import: Option<PathBuf>,
        /// Output path; defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Word diff between the targets of two versions
    Diff {
        old: String,
        new: String,
    },
    /// Rename platform exports like `name (983).xlf` to `983.xlf`
    Rename {
        dir: PathBuf,
        /// Perform the renames instead of only listing them
        #[arg(long)]
        apply: bool,
    },
}

/// Split `PATH=LABEL`; the label is inferred from the file name when absent
fn split_file_arg(arg: &str) -> (PathBuf, Option<&str>) {
    match arg.rsplit_once('=') {
        Some((path, label)) if !path.is_empty() && !label.is_empty() => (PathBuf::from(path), Some(label)),
        _ => (PathBuf::from(arg), None),
    }
}

fn load_session(files: &[String]) -> Result<Session, Box<dyn std::error::Error>> {
    let mut session = Session::new();
    for arg in files {
        let (path, label) = split_file_arg(arg);
        let document = load_document_from_file(&path, label)?;
        let slot = session.load(document)?;
        eprintln!("[{}] {} ({})", slot, path.display(), session.documents()[&slot].version_label);
    }
    for warning in session.warnings() {
        eprintln!("⚠️  {}", warning);
    }
    Ok(session)
}

fn print_row(row: &ComparisonRow) {
    let marker = if row.is_different {
        "≠"
    } else if row.is_singleton() {
        "1"
    } else {
        "="
    };
    println!("{} #{} \"{}\"", marker, row.row_id, row.source);
    for (slot, target) in &row.targets {
        let mut notes = Vec::new();
        if row.selected_version == Some(*slot) {
            notes.push("selected".to_string());
        }
        if let Some(pattern) = row.pattern(*slot) {
            notes.push(format!("{:?}", pattern));
        }
        if notes.is_empty() {
            println!("    [{}] {}", slot, target);
        } else {
            println!("    [{}] {}  ({})", slot, target, notes.join(", "));
        }
    }
}

fn read_selections(path: &Path) -> Result<SelectionConfig, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(SelectionConfig::from_json(&text)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Compare { files, different } => {
            let session = load_session(&files)?;
            let rows = session.rows();
            for row in rows.iter().filter(|row| !different || row.is_different) {
                print_row(row);
            }
            let summary = session.summary();
            println!(
                "\n{} rows, {} different, {} only in one version, {} preselected",
                summary.rows, summary.different, summary.singletons, summary.selected
            );
        }
        Command::Merge {
            files,
            output,
            selections,
        } => {
            let mut session = load_session(&files)?;
            if let Some(path) = selections {
                let applied = session.import_selections(&read_selections(&path)?);
                println!("✅ Applied {} selections from {}", applied, path.display());
            }
            let merged = session.merge()?;
            let output = output
                .unwrap_or_else(|| PathBuf::from(merge_file_name(&merged.version_label, Utc::now())));
            fs::write(&output, serialize_document(&merged))?;
            println!(
                "✅ Wrote {} ({} of {} segments translated)",
                output.display(),
                merged.translated_count(),
                merged.segment_count()
            );
        }
        Command::Selections {
            files,
            import,
            output,
        } => {
            let mut session = load_session(&files)?;
            if let Some(path) = import {
                session.import_selections(&read_selections(&path)?);
            }
            let json = session.export_selections(Utc::now()).to_json()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!("✅ Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Diff { old, new } => {
            let session = load_session(&[old, new])?;
            let (first, second) = (slot(1)?, slot(2)?);
            for row in session.rows().iter().filter(|row| row.is_different) {
                let (Some(before), Some(after)) = (row.target(first), row.target(second)) else {
                    continue;
                };
                let rendered: String = diff_words(before, after)
                    .iter()
                    .map(|part| match part.kind {
                        DiffKind::Unchanged => part.text.clone(),
                        DiffKind::Removed => format!("[-{}-]", part.text),
                        DiffKind::Added => format!("{{+{}+}}", part.text),
                    })
                    .collect();
                println!("#{} \"{}\"\n    {}", row.row_id, row.source, rendered);
            }
        }
        Command::Rename { dir, apply } => {
            let plans = plan_renames(&dir)?;
            if plans.is_empty() {
                println!("Nothing to rename in {}", dir.display());
            }
            if !apply {
                for plan in &plans {
                    println!("{} → {}", plan.from.display(), plan.to.display());
                }
                return Ok(());
            }
            for outcome in apply_renames(&plans) {
                match outcome {
                    RenameOutcome::Renamed(plan) => {
                        println!("✅ {} → {}", plan.from.display(), plan.to.display())
                    }
                    RenameOutcome::TargetExists(plan) => {
                        eprintln!("⚠️  Skipped {}: {} already exists", plan.from.display(), plan.to.display())
                    }
                    RenameOutcome::Failed { plan, reason } => {
                        eprintln!("❌ Failed to rename {}: {}", plan.from.display(), reason)
                    }
                }
            }
        }
    }

    Ok(())
}

fn slot(n: u8) -> Result<VersionSlot, Box<dyn std::error::Error>> {
    VersionSlot::new(n).ok_or_else(|| format!("invalid version slot {}", n).into())
}
