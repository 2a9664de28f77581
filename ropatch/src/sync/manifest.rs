/// One unit of deployable content, as declared by the patch manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub version: u64,
    pub filename: String,
}

/// Parses manifest text into records, in source order.
///
/// A line yields a record iff it starts with a version number followed by a
/// whitespace-separated filename token. Everything else (blank lines,
/// comments, malformed rows, versions too large for u64) is skipped so that
/// manifest authors can interleave non-record lines freely.
pub fn parse_manifest(text: &str) -> Vec<PatchRecord> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<PatchRecord> {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let version = tokens.next()?.parse::<u64>().ok()?;
    let filename = tokens.next()?;
    // Trailing tokens are ignored, like any other non-record content.
    Some(PatchRecord {
        version,
        filename: filename.to_string(),
    })
}
