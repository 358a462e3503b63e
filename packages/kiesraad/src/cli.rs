//! Command-line interface.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{default_output_dir, sanitize_file_stem, DEFAULT_OUTPUT_DIR, DEFAULT_PAGES_DIR};
use crate::error::{KiesraadError, Result};
use crate::normalize::Granularity;
use crate::output::{save_outcome, save_page_results};
use crate::pages::{parse_saved_pages, remove_saved_pages, PageUnit};
use crate::pipeline::process_directory;

/// Kiesraad - Convert Dutch election results to CSV tables.
#[derive(Parser)]
#[command(name = "kiesraad")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a directory of EML count files to CSV tables per municipality.
    Eml {
        /// Directory with the EML files of one election
        source: PathBuf,

        /// Output directory (default: output/<election id>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// One row per candidate instead of per party
        #[arg(long)]
        per_candidate: bool,
    },

    /// Convert saved results pages of an election to one CSV table.
    Pages {
        /// Election folder name (e.g., TK2017)
        election: String,

        /// Folder holding the saved pages per election and province
        #[arg(long, default_value = DEFAULT_PAGES_DIR)]
        data_folder: PathBuf,

        /// Read votes or seats per party
        #[arg(long, value_enum, default_value_t = PageUnit::Votes)]
        unit: PageUnit,

        /// Output file (default: output/<election>_<unit>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delete the saved pages after they have been converted
        #[arg(long)]
        remove_html: bool,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Eml {
            source,
            output,
            per_candidate,
        } => eml_command(
            &source,
            output.as_deref(),
            Granularity::from_per_candidate(per_candidate),
        ),
        Commands::Pages {
            election,
            data_folder,
            unit,
            output,
            remove_html,
        } => pages_command(&election, &data_folder, unit, output.as_deref(), remove_html),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// An existing output path must be a directory.
fn validate_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(KiesraadError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Output path is not a directory: {}", output_dir.display()),
        )));
    }
    Ok(())
}

/// Execute the eml command.
fn eml_command(source: &Path, output: Option<&Path>, granularity: Granularity) -> Result<()> {
    if let Some(output_dir) = output {
        validate_output_dir(output_dir)?;
    }

    println!(
        "{} {} ({} level)",
        style("Converting").bold(),
        style(source.display()).cyan(),
        match granularity {
            Granularity::Party => "party",
            Granularity::Candidate => "candidate",
        }
    );
    println!();

    let pb = spinner();
    pb.set_message("Parsing count files...");

    let outcome = match process_directory(source, granularity) {
        Ok(outcome) => outcome,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_dir(outcome.dataset.as_ref().map(|d| d.id.as_str())));
    validate_output_dir(&target)?;

    pb.set_message("Writing CSV files...");

    let written = match save_outcome(&outcome, &target) {
        Ok(written) => written,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    if let Some(dataset) = &outcome.dataset {
        println!("  Election: {}", style(dataset.label()).green());
    }
    println!("  Municipalities: {}", outcome.results.len());
    println!("  Rows: {}", outcome.row_count());
    if !outcome.skipped.is_empty() {
        println!("  Skipped files: {}", outcome.skipped.len());
    }
    if let Some(candidates) = &outcome.candidates {
        println!("  Candidates: {}", candidates.len());
    }

    let warnings = outcome.warning_count();
    if warnings > 0 {
        println!(
            "  Reconciliation warnings: {}",
            style(warnings).yellow().bold()
        );
    }

    if !outcome.failures.is_empty() {
        println!(
            "  Failed files: {}",
            style(outcome.failures.len()).yellow().bold()
        );
        for failure in &outcome.failures {
            println!("    {} {failure}", style("warning:").yellow());
        }
    }

    println!();
    println!(
        "{} {} ({} files)",
        style("Saved to:").green().bold(),
        target.display(),
        written.len()
    );

    Ok(())
}

/// Execute the pages command.
fn pages_command(
    election: &str,
    data_folder: &Path,
    unit: PageUnit,
    output: Option<&Path>,
    remove_html: bool,
) -> Result<()> {
    let output_file = output.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(DEFAULT_OUTPUT_DIR).join(format!(
            "{}_{}.csv",
            sanitize_file_stem(election),
            unit.as_str()
        ))
    });

    println!(
        "{} {} {} from {}",
        style("Reading").bold(),
        unit.as_str(),
        style(election).cyan(),
        data_folder.display()
    );
    println!();

    let pb = spinner();
    pb.set_message("Parsing results pages...");

    let results = match parse_saved_pages(data_folder, election, unit) {
        Ok(results) => results,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Writing CSV file...");

    if let Err(e) = save_page_results(&results, &output_file) {
        pb.finish_and_clear();
        return Err(e);
    }

    pb.finish_and_clear();

    if results.is_empty() {
        println!("  {} no results pages found", style("warning:").yellow());
    } else {
        println!("  Municipalities: {}", results.len());
    }

    if remove_html && !results.is_empty() {
        remove_saved_pages(data_folder, election)?;
        println!("  Removed saved pages of {election}");
    }

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        output_file.display()
    );

    Ok(())
}
