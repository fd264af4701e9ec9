//! Text files with a generated region between two marker lines

use {
    crate::error::{Error, Result},
    common::util::create_file_buffered,
    errctx::PathCtx,
    std::{
        fs,
        io::Write,
        path::{Path, PathBuf},
    },
};

pub const BEGIN: &str = "@AUTOGEN-BEGIN";
pub const END: &str = "@AUTOGEN-END";

/// A file split into the lines before the generated region (including the
/// begin marker), the generated region, and the lines after it (including
/// the end marker).
///
/// Trailing whitespace is stripped from every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutogenFile {
    path: PathBuf,
    pub before: Vec<String>,
    pub content: Vec<String>,
    pub after: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Before,
    Content,
    After,
}

impl AutogenFile {
    /// Loads `path`, keeping the previous generated content only if
    /// `keep_content` is set.
    pub fn load<P: AsRef<Path>>(path: P, keep_content: bool) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(PathCtx::f(path.as_ref()))?;
        Self::parse(path, &text, keep_content)
    }

    pub fn parse<P: AsRef<Path>>(path: P, text: &str, keep_content: bool) -> Result<Self> {
        let mut file = Self {
            path: path.as_ref().to_owned(),
            before: vec![],
            content: vec![],
            after: vec![],
        };

        let mut state = State::Before;
        for line in text.lines().map(str::trim_end) {
            match state {
                State::Before => {
                    file.before.push(line.to_owned());
                    if line.contains(BEGIN) {
                        state = State::Content;
                    }
                }
                State::Content => {
                    if line.contains(END) {
                        state = State::After;
                        file.after.push(line.to_owned());
                    } else if keep_content {
                        file.content.push(line.to_owned());
                    }
                }
                State::After => file.after.push(line.to_owned()),
            }
        }

        match state {
            State::Before => Err(Error::MissingMarker {
                marker: BEGIN,
                path: file.path,
            }),
            State::Content => Err(Error::MissingMarker {
                marker: END,
                path: file.path,
            }),
            State::After => Ok(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, for messages
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Full text of the file with `content` as the generated region.
    ///
    /// `content` is expected to be newline-terminated.
    pub fn render(&self, content: &str) -> String {
        let mut out = String::new();
        for line in &self.before {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(content);
        for line in &self.after {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Rewrites the file in place with `content` as the generated region
    pub fn rewrite(&self, content: &str) -> Result<()> {
        let mut writer = create_file_buffered(&self.path)?;
        writer
            .write_all(self.render(content).as_bytes())
            .and_then(|_| writer.flush())
            .map_err(PathCtx::f(&self.path))?;
        Ok(())
    }
}
