//! Text rendering of the models
//!
//! Every function returns the full generated region of a target file,
//! newline-terminated, with trailing whitespace trimmed on each line. Column
//! widths are recomputed from the values on every call.

pub mod cpp;
pub mod markdown;

/// Accumulates lines, trimming their trailing whitespace
#[derive(Debug, Default)]
pub(crate) struct Lines(String);

impl Lines {
    pub fn push<S: AsRef<str>>(&mut self, line: S) {
        self.0.push_str(line.as_ref().trim_end());
        self.0.push('\n');
    }

    pub fn blank(&mut self) {
        self.0.push('\n');
    }

    pub fn finish(self) -> String {
        self.0
    }
}

/// Width of the widest of `header` and `values`
pub(crate) fn column_width<'a, I: IntoIterator<Item = &'a str>>(header: &str, values: I) -> usize {
    values
        .into_iter()
        .map(|v| v.chars().count())
        .chain([header.chars().count()])
        .max()
        .unwrap_or_default()
}
