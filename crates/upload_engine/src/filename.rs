use std::path::Path;

use image::ImageFormat;
use sha2::{Digest, Sha256};

/// Deterministic, filesystem-safe name for a processed image:
/// `{sanitized_stem}--{phase}--{short_hash(bytes)}.{ext}`.
///
/// The extension follows the response content type, then the image magic bytes.
pub fn result_filename(
    source_name: &str,
    phase: &str,
    bytes: &[u8],
    content_type: Option<&str>,
) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("untitled");
    let sanitized = sanitize_stem(stem);
    let phase = sanitize_stem(phase);
    let hash = short_hash(bytes);
    let ext = extension_for(bytes, content_type);
    format!("{sanitized}--{phase}--{hash}.{ext}")
}

fn extension_for(bytes: &[u8], content_type: Option<&str>) -> &'static str {
    let from_header = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .and_then(ImageFormat::from_mime_type);
    from_header
        .or_else(|| image::guess_format(bytes).ok())
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin")
}

fn sanitize_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return "untitled".to_string();
    }
    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c != '_' || !prev_underscore {
            compacted.push(c);
        }
        prev_underscore = c == '_';
    }
    if compacted.len() > 80 {
        let mut end = 80;
        while !compacted.is_char_boundary(end) {
            end -= 1;
        }
        compacted.truncate(end);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
