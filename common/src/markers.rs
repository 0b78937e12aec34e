/// The pair of comment lines that delimit the managed block in the hosts file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Markers {
    /// Builds `# === <label> Start ===` / `# === <label> End ===`.
    pub fn for_label(label: &str) -> Self {
        Self {
            start: format!("# === {label} Start ==="),
            end: format!("# === {label} End ==="),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::for_label(crate::config::DEFAULT_MARKER_LABEL)
    }
}
