//! Feature matrix of tested CPU cores
//!
//! Every sub-directory of the collection root describes one system: its
//! `description.txt` names the core and its `cpusysregs-features.txt` lists
//! the state of each feature as reported on that system.

use {
    crate::{error::Result, render::Lines},
    common::HashMap,
    errctx::PathCtx,
    itertools::Itertools,
    log::debug,
    std::{fs, path::Path},
    walkdir::WalkDir,
};

pub const DESCRIPTION_FILE: &str = "description.txt";
pub const FEATURES_FILE: &str = "cpusysregs-features.txt";

/// Name of the core from a `core: <name>` line
pub fn core_name(description: &str) -> Option<&str> {
    description
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "core")
        .map(|(_, value)| value.trim())
        .filter(|name| !name.is_empty())
}

/// `FEAT_<X> <state>` lines, dots removed
pub fn feature_states(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(|line| line.trim().replace('.', ""))
        .filter_map(|line| {
            let (name, state) = line.split_once(' ')?;
            name.starts_with("FEAT")
                .then(|| (name.trim().to_owned(), state.trim().to_owned()))
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct FeatureMatrix {
    /// Encounter order
    features: Vec<String>,
    cores: HashMap<String, HashMap<String, String>>,
}

impl FeatureMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every system found directly below `root`
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let mut matrix = Self::new();

        for entry in WalkDir::new(root.as_ref())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let (description, features) = (
                entry.path().join(DESCRIPTION_FILE),
                entry.path().join(FEATURES_FILE),
            );
            if !description.is_file() || !features.is_file() {
                continue;
            }

            let description = fs::read_to_string(&description).map_err(PathCtx::f(&description))?;
            let Some(core) = core_name(&description) else {
                debug!("no core name in {:?}", entry.path());
                continue;
            };
            let text = fs::read_to_string(&features).map_err(PathCtx::f(&features))?;

            matrix.add(core, &text);
        }

        Ok(matrix)
    }

    /// Records the feature states of a core, replacing any previous system
    /// with the same core
    pub fn add(&mut self, core: &str, features: &str) {
        let states = self.cores.entry(core.to_owned()).or_default();
        states.clear();

        for (name, state) in feature_states(features) {
            if !self.features.contains(&name) {
                self.features.push(name.clone());
            }
            states.insert(name, state);
        }
    }

    pub fn render(&self) -> String {
        const TITLE: &str = "Feature";

        let cores = self.cores.keys().sorted().collect::<Vec<_>>();
        let features = self
            .features
            .iter()
            .sorted_by_cached_key(|f| f.to_lowercase())
            .collect::<Vec<_>>();
        let width = features
            .iter()
            .map(|f| f.len())
            .chain([TITLE.len()])
            .max()
            .unwrap_or_default();

        let mut out = Lines::default();

        out.push(format!(
            "| {TITLE:<width$} |{}",
            cores.iter().map(|c| format!(" {c} |")).join("")
        ));
        out.push(format!(
            "| {} |{}",
            "-".repeat(width),
            cores
                .iter()
                .map(|c| format!(" :{}: |", "-".repeat(c.len().saturating_sub(2))))
                .join("")
        ));
        for feature in features {
            let states = cores
                .iter()
                .map(|core| {
                    let state = self.cores[*core]
                        .get(feature)
                        .map(String::as_str)
                        .unwrap_or_default();
                    format!(" {state:<w$} |", w = core.len())
                })
                .join("");
            out.push(format!("| {feature:<width$} |{states}"));
        }

        out.finish()
    }
}
