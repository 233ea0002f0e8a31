//! Per-file ID3v2 text-frame scanning backed by `lofty`.
//!
//! Reads the typed ID3v2 tag so each frame's declared encoding is visible,
//! runs the mojibake check on the frames the vendor is known to mangle,
//! and reports advisory corrections. Files are opened read-only and never
//! modified.

use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use lofty::config::ParseOptions;
use lofty::file::AudioFile;
use lofty::id3::v2::{Frame, FrameId, Id3v2Tag};
use lofty::mpeg::MpegFile;
use lofty::TextEncoding;
use log::debug;

use crate::media_file_discovery::is_supported_media_file;
use crate::mojibake::{correct, CorrectionResult};

/// Text frames the affected vendor writes, in reporting order.
pub const CANDIDATE_TEXT_FRAMES: [&str; 11] = [
    "TPE1", "TIT1", "TIT2", "TIT3", "TALB", "TOPE", "TOAL", "TPE2", "TPE3", "TPE4", "TCOM",
];

/// One advisory correction for a single text frame of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCorrection {
    pub frame_id: &'static str,
    pub current_text: String,
    pub corrected_text: String,
}

/// Scans one file's candidate text frames and returns the corrections that
/// would change the stored text. Unsupported extensions, unreadable files,
/// and files without an ID3v2 tag all yield an empty result.
pub fn scan_file(path: &Path) -> Vec<FieldCorrection> {
    if !is_supported_media_file(path) {
        debug!("skip file (unsupported extension): {}", path.display());
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            debug!("skip file (open failed): {}: {}", path.display(), error);
            return Vec::new();
        }
    };

    let mut reader = BufReader::new(file);
    let mpeg_file =
        match MpegFile::read_from(&mut reader, ParseOptions::new().read_properties(false)) {
            Ok(mpeg_file) => mpeg_file,
            Err(error) => {
                debug!("skip file (tag parse failed): {}: {}", path.display(), error);
                return Vec::new();
            }
        };

    let tag = match mpeg_file.id3v2() {
        Some(tag) => tag,
        None => {
            debug!("skip file (no ID3v2 tag): {}", path.display());
            return Vec::new();
        }
    };

    collect_frame_corrections(tag, path)
}

fn collect_frame_corrections(tag: &Id3v2Tag, path: &Path) -> Vec<FieldCorrection> {
    let mut corrections = Vec::new();

    for frame_id in CANDIDATE_TEXT_FRAMES {
        let frame = match tag.get(&FrameId::Valid(Cow::Borrowed(frame_id))) {
            Some(Frame::Text(frame)) => frame,
            Some(_) => {
                debug!(
                    "skip frame {} (not a text frame): {}",
                    frame_id,
                    path.display()
                );
                continue;
            }
            None => {
                debug!("skip frame {} (absent): {}", frame_id, path.display());
                continue;
            }
        };

        if frame.encoding != TextEncoding::UTF8 {
            debug!(
                "skip frame {} (declared {:?}, not UTF-8): {}",
                frame_id,
                frame.encoding,
                path.display()
            );
            continue;
        }

        if let CorrectionResult::Corrected(corrected_text) = correct(frame.value.as_bytes()) {
            if corrected_text != frame.value {
                corrections.push(FieldCorrection {
                    frame_id,
                    current_text: frame.value.clone(),
                    corrected_text,
                });
            }
        }
    }

    corrections
}
