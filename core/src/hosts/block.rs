//! Locating, removing and composing the managed block.

use hostpin_common::markers::Markers;
use hostpin_common::network::target::HostEntry;

/// A marker layout that cannot be safely treated as a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAnomaly {
    StartOnly,
    EndOnly,
    /// Both markers exist but the end comes first.
    Misordered,
}

impl MarkerAnomaly {
    pub fn describe(&self) -> &'static str {
        match self {
            MarkerAnomaly::StartOnly => "start marker without a matching end marker",
            MarkerAnomaly::EndOnly => "end marker without a matching start marker",
            MarkerAnomaly::Misordered => "end marker appears before the start marker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripped {
    pub content: String,
    pub removed: bool,
    pub anomaly: Option<MarkerAnomaly>,
}

/// Removes every well-formed block, markers inclusive, along with the
/// whitespace that follows each one.
///
/// A block is an end marker paired with the nearest start marker before it,
/// so an orphaned start marker higher up never swallows the lines between it
/// and a later block. Markers left unpaired are kept verbatim and reported.
pub fn strip_block(content: &str, markers: &Markers) -> Stripped {
    let mut text = content.to_string();
    let mut removed = false;

    while let Some((s, block_end)) = locate(&text, markers) {
        let rest = text[block_end..].trim_start();
        text = format!("{}{}", &text[..s], rest);
        removed = true;
    }

    let anomaly = leftover(&text, markers);
    Stripped {
        content: text,
        removed,
        anomaly,
    }
}

/// Byte range `(start, end)` of the first block, end marker inclusive.
fn locate(content: &str, markers: &Markers) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(offset) = content[from..].find(&markers.end) {
        let e = from + offset;
        if let Some(s) = content[..e].rfind(&markers.start) {
            return Some((s, e + markers.end.len()));
        }
        from = e + markers.end.len();
    }
    None
}

/// Classifies markers that could not be paired.
fn leftover(content: &str, markers: &Markers) -> Option<MarkerAnomaly> {
    match (content.contains(&markers.start), content.contains(&markers.end)) {
        (false, false) => None,
        (true, false) => Some(MarkerAnomaly::StartOnly),
        (false, true) => Some(MarkerAnomaly::EndOnly),
        // Nothing pairs, so every end precedes every start.
        (true, true) => Some(MarkerAnomaly::Misordered),
    }
}

/// Appends a fresh block to `content`, which is right-trimmed first.
pub fn compose(content: &str, markers: &Markers, entries: &[HostEntry]) -> String {
    let body = entries
        .iter()
        .map(HostEntry::hosts_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n{}\n{}\n{}\n",
        content.trim_end(),
        markers.start,
        body,
        markers.end
    )
}

/// Lines inside the first well-formed block, if there is one.
pub fn block_lines<'a>(content: &'a str, markers: &Markers) -> Option<Vec<&'a str>> {
    let (s, block_end) = locate(content, markers)?;
    let inner = &content[s + markers.start.len()..block_end - markers.end.len()];
    Some(inner.lines().map(str::trim).filter(|l| !l.is_empty()).collect())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(s: &str) -> HostEntry {
        s.parse().unwrap()
    }

    #[test]
    fn well_formed_block_is_removed_with_trailing_whitespace() {
        let m = Markers::for_label("T");
        let content = "127.0.0.1 localhost\n# === T Start ===\n1.1.1.1 a.test\n# === T End ===\n\n::1 localhost\n";

        let stripped = strip_block(content, &m);

        assert!(stripped.removed);
        assert_eq!(stripped.anomaly, None);
        assert_eq!(stripped.content, "127.0.0.1 localhost\n::1 localhost\n");
    }

    #[test]
    fn lone_start_marker_is_kept_verbatim() {
        let m = Markers::for_label("T");
        let content = "127.0.0.1 localhost\n# === T Start ===\n9.9.9.9 old.test\n";

        let stripped = strip_block(content, &m);

        assert!(!stripped.removed);
        assert_eq!(stripped.anomaly, Some(MarkerAnomaly::StartOnly));
        assert_eq!(stripped.content, content);
    }

    #[test]
    fn orphan_start_above_a_block_is_not_paired_with_it() {
        let m = Markers::for_label("T");
        let content = "127.0.0.1 localhost\n# === T Start ===\n9.9.9.9 old.test\n# === T Start ===\n1.1.1.1 a.test\n# === T End ===\n";

        let stripped = strip_block(content, &m);

        assert!(stripped.removed);
        assert_eq!(stripped.anomaly, Some(MarkerAnomaly::StartOnly));
        assert_eq!(
            stripped.content,
            "127.0.0.1 localhost\n# === T Start ===\n9.9.9.9 old.test\n"
        );
        assert_eq!(block_lines(content, &m), Some(vec!["1.1.1.1 a.test"]));
    }

    #[test]
    fn orphan_end_before_a_block_is_kept() {
        let m = Markers::for_label("T");
        let content = "# === T End ===\n8.8.8.8 keep.test\n# === T Start ===\n1.1.1.1 a.test\n# === T End ===\n";

        let stripped = strip_block(content, &m);

        assert!(stripped.removed);
        assert_eq!(stripped.anomaly, Some(MarkerAnomaly::EndOnly));
        assert_eq!(stripped.content, "# === T End ===\n8.8.8.8 keep.test\n");
    }

    #[test]
    fn misordered_markers_are_an_anomaly() {
        let m = Markers::for_label("T");
        let content = "# === T End ===\nx\n# === T Start ===\n";
        let stripped = strip_block(content, &m);
        assert_eq!(stripped.anomaly, Some(MarkerAnomaly::Misordered));
        assert_eq!(stripped.content, content);
    }

    #[test]
    fn compose_puts_one_line_per_entry_in_order() {
        let m = Markers::for_label("T");
        let text = compose(
            "127.0.0.1 localhost\n\n\n",
            &m,
            &[entry("1.1.1.1 b.test"), entry("2.2.2.2=a.test")],
        );

        assert_eq!(
            text,
            "127.0.0.1 localhost\n# === T Start ===\n1.1.1.1 b.test\n2.2.2.2 a.test\n# === T End ===\n"
        );
        assert_eq!(
            block_lines(&text, &m),
            Some(vec!["1.1.1.1 b.test", "2.2.2.2 a.test"])
        );
    }

    #[test]
    fn strip_then_compose_is_idempotent() {
        let m = Markers::default();
        let entries = [entry("192.30.255.113 github.com")];
        let once = compose("127.0.0.1 localhost\n", &m, &entries);
        let twice = compose(&strip_block(&once, &m).content, &m, &entries);
        assert_eq!(once, twice);
        assert_eq!(twice.matches(&m.start).count(), 1);
    }
}
