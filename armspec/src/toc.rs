//! Markdown table of contents
//!
//! A file containing a line `**Contents:**` gets the bullet list following
//! that line rebuilt from the headers of the rest of the file.

use {
    crate::error::Result,
    errctx::PathCtx,
    std::{fs, path::Path},
};

pub const HEADER: &str = "**Contents:**";

/// New text of the document, `None` if it has no table of contents or if
/// the existing one is up to date
pub fn rebuild(text: &str) -> Option<String> {
    enum State {
        Intro,
        Toc,
        Body,
    }

    let mut state = State::Intro;
    let mut intro = String::new();
    let mut current = String::new();
    let mut body = String::new();
    let mut entries: Vec<(usize, String)> = vec![];
    let mut in_code = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();

        match state {
            State::Intro => {
                intro.push_str(line);
                if trimmed == HEADER {
                    state = State::Toc;
                }
                continue;
            }
            State::Toc if trimmed.starts_with("* ") => {
                current.push_str(line);
                continue;
            }
            State::Toc if trimmed.is_empty() => continue,
            State::Toc | State::Body => state = State::Body,
        }

        body.push_str(line);
        if trimmed == "~~~" || trimmed == "```" {
            in_code = !in_code;
        }
        if !in_code {
            entries.extend(header(trimmed));
        }
    }

    let min_level = entries.iter().map(|(level, _)| *level).min()?;
    let toc = entries
        .iter()
        .map(|(level, text)| {
            format!(
                "{}* [{text}](#{})\n",
                "  ".repeat(level - min_level),
                anchor(text)
            )
        })
        .collect::<String>();

    (toc != current).then(|| format!("{intro}\n{toc}\n{body}"))
}

/// Level and text of a `#` header line
fn header(line: &str) -> Option<(usize, String)> {
    if !line.starts_with('#') {
        return None;
    }
    let level = line.find(|c| c != '#')?;
    Some((level, line[level..].trim().replace('`', "")))
}

/// GitHub-style anchor of a header
pub fn anchor(text: &str) -> String {
    text.to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Rebuilds the table of contents of a file in place, returns whether it
/// was rewritten
pub fn update_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(PathCtx::f(path))?;

    match rebuild(&text) {
        Some(text) => {
            fs::write(path, text).map_err(PathCtx::f(path))?;
            Ok(true)
        }
        None => Ok(false),
    }
}
