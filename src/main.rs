mod media_file_discovery;
mod mojibake;
mod tag_scanner;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;

use media_file_discovery::collect_media_files_from_folder;
use tag_scanner::{scan_file, FieldCorrection};

/// Command-line entry: scan files or folders for repairable tag text.
#[derive(Parser, Debug)]
#[command(
    name = "tagmend",
    version,
    about = "Reports double-encoded text in MP3 ID3 tags"
)]
struct Cli {
    /// Files or folders to scan
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct ScanSummary {
    files_scanned: usize,
    candidates_reported: usize,
}

fn report_corrections(path: &Path, corrections: &[FieldCorrection]) {
    for correction in corrections {
        println!("candidate: {} [{}]", path.display(), correction.frame_id);
        println!("    from file: {:?}", correction.current_text);
        println!("    corrected: {:?}", correction.corrected_text);
        println!("    advisory only, file left unmodified");
    }
}

fn process_file(path: &Path, summary: &mut ScanSummary) {
    let corrections = scan_file(path);
    summary.files_scanned += 1;
    summary.candidates_reported += corrections.len();
    report_corrections(path, &corrections);
}

fn process_path(path: &Path, summary: &mut ScanSummary) -> Result<(), Box<dyn Error>> {
    if path.is_file() {
        process_file(path, summary);
    } else if path.is_dir() {
        for file in collect_media_files_from_folder(path) {
            process_file(&file, summary);
        }
    } else {
        return Err(format!("invalid path: {}", path.display()).into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    let cli = Cli::parse();

    let mut summary = ScanSummary::default();
    for path in &cli.paths {
        process_path(path, &mut summary)?;
    }

    info!(
        "scan finished. files={} candidates={}",
        summary.files_scanned, summary.candidates_reported
    );
    Ok(())
}
