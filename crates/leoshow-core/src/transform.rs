use crate::config::StylesheetRef;

/// The marker line old Leo files carry in place of a usable stylesheet
/// reference. Always rewritten.
pub const LEGACY_MARKER: &str = "<?xml-stylesheet ekr_test?>";

/// Substring identifying an existing canonical stylesheet reference.
pub const CANONICAL_MARKER: &str = "leo_to_html.xsl";

/// One known stale form of the canonical reference. It does not count as a
/// usable reference, so a document carrying only this line still gets the
/// current line injected.
pub const DEPRECATED_CANONICAL: &str =
    r#"<?xml-stylesheet type="text/xsl" href="http://leoeditor.com/leo_to_html.xsl"?>"#;

/// How many leading lines are scanned for either marker.
const SCAN_LINES: usize = 10;

/// Normalize a document's stylesheet reference.
///
/// Within the first ten lines, a legacy marker means every legacy-marker
/// line in the document is replaced with the canonical line; an existing
/// canonical reference means the document passes through untouched;
/// otherwise the canonical line is injected as the new second line. The
/// transformation is idempotent: its output always lands in the
/// pass-through branch.
///
/// Lines are raw bytes; only the ASCII marker lines are interpreted, so a
/// document in any encoding passes through byte-for-byte outside them.
#[must_use]
pub fn transform(lines: &[Vec<u8>], stylesheet: StylesheetRef) -> Vec<Vec<u8>> {
    let pi = stylesheet.pi_line();

    let mut legacy_found = false;
    let mut canonical_found = false;
    for line in lines.iter().take(SCAN_LINES) {
        if is_legacy(line) {
            legacy_found = true;
        }
        if contains(line, CANONICAL_MARKER.as_bytes())
            && !contains(line, DEPRECATED_CANONICAL.as_bytes())
        {
            canonical_found = true;
        }
    }

    if legacy_found {
        return lines
            .iter()
            .map(|line| {
                if is_legacy(line) {
                    let mut replaced = pi.as_bytes().to_vec();
                    replaced.extend_from_slice(line_ending(line));
                    replaced
                } else {
                    line.clone()
                }
            })
            .collect();
    }

    if canonical_found {
        return lines.to_vec();
    }

    inject_second_line(lines, &pi)
}

fn inject_second_line(lines: &[Vec<u8>], pi: &str) -> Vec<Vec<u8>> {
    let mut injected = pi.as_bytes().to_vec();
    injected.push(b'\n');
    if lines.is_empty() {
        return vec![injected];
    }
    let mut out = Vec::with_capacity(lines.len() + 1);
    let mut first = lines[0].clone();
    if line_ending(&first).is_empty() {
        first.push(b'\n');
    }
    out.push(first);
    out.push(injected);
    out.extend(lines.iter().skip(1).cloned());
    out
}

fn is_legacy(line: &[u8]) -> bool {
    strip_ending(line) == LEGACY_MARKER.as_bytes()
}

fn strip_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn line_ending(line: &[u8]) -> &'static [u8] {
    if line.ends_with(b"\r\n") {
        b"\r\n"
    } else if line.ends_with(b"\n") {
        b"\n"
    } else {
        b""
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
