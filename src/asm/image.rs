//! Program image text format (`.ccp`).
//!
//! - `@xx` starts a segment at hex address `xx`
//! - every other line holds whitespace-separated hex bytes
//! - `;` starts a comment
//!
//! ```text
//! ; load/store
//! @00
//! 10 80 11 81 ff 00
//! @80
//! 0a
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::computer::{Computer, ComputerError};

/// Bytes destined for consecutive addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub origin: u64,
    pub bytes: Vec<u8>,
}

impl Segment {
    pub fn new(origin: u64) -> Self {
        Self {
            origin,
            bytes: Vec::new(),
        }
    }

    /// One past the last address written.
    pub fn end(&self) -> u64 {
        self.origin + self.bytes.len() as u64
    }
}

/// A program as a list of memory segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramImage {
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of bytes across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.bytes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every segment into memory through the console.
    pub fn load_into(&self, computer: &mut Computer) -> Result<(), ComputerError> {
        for segment in &self.segments {
            let words: Vec<u64> = segment.bytes.iter().map(|&b| u64::from(b)).collect();
            computer.write_ram(segment.origin, &words)?;
        }
        Ok(())
    }
}

/// Parse image text.
pub fn parse_image(text: &str) -> Result<ProgramImage, ImageError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1;
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        if let Some(origin) = line.strip_prefix('@') {
            let origin = u64::from_str_radix(origin.trim(), 16).map_err(|_| ImageError::Parse {
                line: line_num,
                message: format!("invalid origin '{origin}'"),
            })?;
            image.segments.push(Segment::new(origin));
            continue;
        }

        if image.segments.is_empty() {
            image.segments.push(Segment::new(0));
        }
        for token in line.split_whitespace() {
            let byte = u8::from_str_radix(token, 16).map_err(|_| ImageError::Parse {
                line: line_num,
                message: format!("invalid byte '{token}'"),
            })?;
            if let Some(segment) = image.segments.last_mut() {
                segment.bytes.push(byte);
            }
        }
    }

    image.segments.retain(|s| !s.bytes.is_empty());
    Ok(image)
}

/// Render an image as text, sixteen bytes per line.
pub fn format_image(image: &ProgramImage) -> String {
    let mut output = String::new();
    output.push_str(&format!("; {} bytes\n", image.len()));
    for segment in &image.segments {
        output.push_str(&format!("@{:02x}\n", segment.origin));
        for row in segment.bytes.chunks(16) {
            let bytes: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
            output.push_str(&bytes.join(" "));
            output.push('\n');
        }
    }
    output
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    parse_image(&text)
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    std::fs::write(path.as_ref(), format_image(image)).map_err(|e| ImageError::Io(e.to_string()))
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
