//! Arm architectural features
//!
//! Merges the hand-maintained feature table with the features documented in
//! the vendor JSON index.

use {
    crate::{
        error::{Error, Result},
        warning::Warning,
    },
    common::HashMap,
    errctx::PathCtx,
    itertools::Itertools,
    once_cell::sync::Lazy,
    regex::Regex,
    serde::{de::IgnoredAny, Deserialize},
    serde_json::Value,
    std::{fs, path::Path},
};

/// Prefix of every feature name
pub const PREFIX: &str = "FEAT_";

/// Sysregs marker of features which must be checked by a human
pub const NEEDS_REVIEW: &str = "???";

/// Sysregs marker of features detectable from system registers
pub const DETECTABLE: &str = "X";

const REMOVED_SUFFIX: &str = "(removed)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    /// Architecture version from which the feature is optional
    pub optional: String,
    /// Architecture version from which the feature is mandatory
    pub mandatory: String,
    pub sysregs: String,
    pub description: String,
    /// Documented by the vendor specification being processed
    pub documented: bool,
}

impl Feature {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_removed(&self) -> bool {
        self.description.ends_with(REMOVED_SUFFIX)
    }
}

/// Column labels of the feature table, as found in the existing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    pub name: String,
    pub optional: String,
    pub mandatory: String,
    pub sysregs: String,
    pub description: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: "Feature".to_owned(),
            optional: "Optional".to_owned(),
            mandatory: "Mandatory".to_owned(),
            sysregs: "sysregs".to_owned(),
            description: "Description".to_owned(),
        }
    }
}

/// Vendor JSON feature index
#[derive(Debug, Default, Deserialize)]
pub struct FeatureIndex {
    #[serde(default)]
    parameters: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Description {
    before: Option<Text>,
    after: Option<Text>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    One(String),
    Many(Vec<Value>),
    Other(IgnoredAny),
}

impl Text {
    fn append_to(&self, buf: &mut String) {
        match self {
            Text::One(s) => buf.push_str(s),
            Text::Many(items) => items.iter().for_each(|item| match item {
                Value::String(s) => buf.push_str(s),
                other => buf.push_str(&other.to_string()),
            }),
            Text::Other(_) => (),
        }
    }
}

impl FeatureIndex {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(PathCtx::f(path.as_ref()))?;
        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.as_ref().to_owned(),
            source,
        })
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Outcome of merging the vendor index
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub loaded: usize,
    pub new: usize,
}

/// All known features, indexed by name
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: HashMap<String, Feature>,
    columns: Columns,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a feature, creating it if necessary
    pub fn get_or_insert(&mut self, name: &str) -> &mut Feature {
        self.features
            .entry(name.to_owned())
            .or_insert_with(|| Feature::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Features sorted case-insensitively by name
    pub fn sorted(&self) -> Vec<&Feature> {
        self.features
            .values()
            .sorted_by_cached_key(|f| (f.name.to_lowercase(), f.name.clone()))
            .collect()
    }

    /// Loads the rows of an existing markdown feature table, returns the
    /// number of features marked as removed.
    ///
    /// The first row which does not describe a feature is the header.
    pub fn load_table<'a, I: IntoIterator<Item = &'a str>>(&mut self, lines: I) -> usize {
        static ROW: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^\| +([^|]+)\|([^|]+)\|([^|]+)\|([^|]+)\|(.*)$").unwrap()
        });

        let mut header_found = false;
        let mut removed = 0;

        for line in lines {
            let Some(caps) = ROW.captures(line) else {
                continue;
            };
            if caps[1].starts_with('-') {
                continue;
            }

            let [name, optional, mandatory, sysregs, description] =
                [1, 2, 3, 4, 5].map(|i| caps[i].trim().to_owned());

            if name.starts_with(PREFIX) {
                let feature = Feature {
                    name,
                    optional,
                    mandatory,
                    sysregs,
                    description,
                    documented: false,
                };
                if feature.is_removed() {
                    removed += 1;
                }
                self.features.insert(feature.name.clone(), feature);
            } else if !header_found {
                header_found = true;
                self.columns = Columns {
                    name,
                    optional,
                    mandatory,
                    sysregs,
                    description,
                };
            }
        }

        removed
    }

    /// Marks the features tested by a `bool FEAT_xxx() const {` method of the
    /// feature-detection header as detectable, returns their number.
    pub fn mark_detectable<'a, I: IntoIterator<Item = &'a str>>(&mut self, lines: I) -> usize {
        static METHOD: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^ *bool +(FEAT_[a-zA-Z0-9_]+)\(\) +const +\{").unwrap()
        });

        let mut count = 0;
        for caps in lines.into_iter().filter_map(|line| METHOD.captures(line)) {
            self.get_or_insert(&caps[1]).sysregs = DETECTABLE.to_owned();
            count += 1;
        }
        count
    }

    /// Merges the features documented in the vendor index
    pub fn merge_index(&mut self, index: &FeatureIndex) -> MergeStats {
        let mut stats = MergeStats::default();

        for param in &index.parameters {
            let Some(name) = param
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| n.starts_with(PREFIX))
            else {
                continue;
            };

            stats.loaded += 1;
            if !self.features.contains_key(name) {
                stats.new += 1;
            }

            let feature = self.get_or_insert(name);
            feature.documented = true;
            if feature.sysregs.is_empty() {
                feature.sysregs = NEEDS_REVIEW.to_owned();
            }
            if feature.description.is_empty() {
                let title = param.get("title").and_then(Value::as_str);
                feature.description = title.unwrap_or_default().trim().to_owned();
            }

            // descriptions which are not objects carry no version text
            let mut text = String::new();
            if let Some(desc) = param
                .get("description")
                .and_then(|d| Description::deserialize(d).ok())
            {
                for part in [&desc.before, &desc.after].into_iter().flatten() {
                    part.append_to(&mut text);
                }
            }
            let text = text.to_lowercase();

            if let Some(version) = version_from(&text, name, "optional") {
                feature.optional = version;
            }
            if let Some(version) = version_from(&text, name, "mandatory") {
                feature.mandatory = version;
            }
        }

        stats
    }

    /// Reports features whose removal status disagrees with the vendor index
    pub fn check(&self) -> Vec<Warning> {
        self.sorted()
            .into_iter()
            .filter_map(|f| match (f.documented, f.is_removed()) {
                (true, true) => Some(Warning::RemovedButDocumented(f.name.clone())),
                (false, false) => Some(Warning::Undocumented(f.name.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Searches `"<name> is <status> from armv<version>"` in lowercase `text`
fn version_from(text: &str, name: &str, status: &str) -> Option<String> {
    let pattern = format!(
        r"{} +is +{status} +from +armv([0-9.]*[0-9])",
        regex::escape(&name.to_lowercase())
    );
    let regex = Regex::new(&pattern).ok()?;
    regex
        .captures(text)
        .map(|caps| format!("Armv{}", &caps[1]))
}

#[cfg(test)]
mod tests {
    use {
        super::{FeatureIndex, FeatureRegistry, MergeStats, DETECTABLE, NEEDS_REVIEW},
        crate::warning::Warning,
    };

    const TABLE: &[&str] = &[
        "Total: 3 features, 1 detectable, 1 removed.",
        "",
        "| Feature name | Opt.    | Mand.   | regs | What it is",
        "| ------------ | ------- | ------- | :--: | ----------",
        "| FEAT_AES     | Armv8.0 |         |  X   | AES instructions",
        "| FEAT_OLD     |         |         |      | Something old (removed)",
        "| FEAT_GONE    |         |         | ???  | Something gone",
    ];

    fn registry() -> FeatureRegistry {
        let mut registry = FeatureRegistry::new();
        registry.load_table(TABLE.iter().copied());
        registry
    }

    #[test]
    fn table() {
        let mut registry = FeatureRegistry::new();
        assert_eq!(registry.load_table(TABLE.iter().copied()), 1);
        assert_eq!(registry.len(), 3);

        let aes = registry.get("FEAT_AES").unwrap();
        assert_eq!(aes.optional, "Armv8.0");
        assert_eq!(aes.mandatory, "");
        assert_eq!(aes.sysregs, "X");
        assert_eq!(aes.description, "AES instructions");
        assert!(!aes.documented);

        assert!(registry.get("FEAT_OLD").unwrap().is_removed());

        let columns = registry.columns();
        assert_eq!(columns.name, "Feature name");
        assert_eq!(columns.sysregs, "regs");
        assert_eq!(columns.description, "What it is");
    }

    #[test]
    fn detectable() {
        let mut registry = registry();
        let header = [
            "    bool FEAT_GONE() const { return ID_AA64PFR0_EL1_X() >= 1; }",
            "    bool FEAT_NEW() const { return false; }",
            "    bool notfeature() const { return false; }",
        ];
        assert_eq!(registry.mark_detectable(header), 2);
        assert_eq!(registry.get("FEAT_GONE").unwrap().sysregs, DETECTABLE);
        assert_eq!(registry.get("FEAT_NEW").unwrap().sysregs, DETECTABLE);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn merge() {
        let mut registry = registry();
        let index = FeatureIndex::from_json(
            r#"{"parameters": [
                {"name": "FEAT_AES", "title": "Advanced Encryption Standard",
                 "description": {"before": ["FEAT_AES is OPTIONAL from ", "Armv8.0."]}},
                {"name": "FEAT_OLD", "title": "Old"},
                {"name": "FEAT_X", "title": "  Example feature ",
                 "description": {"before": "Intro.", "after": [3, "FEAT_X is mandatory from Armv9.4."]}},
                {"name": "NotAFeature", "title": "ignored"},
                42
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            registry.merge_index(&index),
            MergeStats { loaded: 3, new: 1 }
        );

        // existing description and sysregs are kept
        let aes = registry.get("FEAT_AES").unwrap();
        assert!(aes.documented);
        assert_eq!(aes.description, "AES instructions");
        assert_eq!(aes.sysregs, "X");
        assert_eq!(aes.optional, "Armv8.0");

        let x = registry.get("FEAT_X").unwrap();
        assert!(x.documented);
        assert_eq!(x.sysregs, NEEDS_REVIEW);
        assert_eq!(x.description, "Example feature");
        assert_eq!(x.optional, "");
        assert_eq!(x.mandatory, "Armv9.4");

        assert_eq!(
            registry.check(),
            [
                Warning::Undocumented("FEAT_GONE".to_owned()),
                Warning::RemovedButDocumented("FEAT_OLD".to_owned()),
            ]
        );
    }

    #[test]
    fn merge_unexpected_shapes() {
        let mut registry = FeatureRegistry::new();
        let index = FeatureIndex::from_json(
            r#"{"parameters": [
                {"name": "FEAT_Y", "title": "Why", "description": "plain text"},
                {"name": "FEAT_Z", "title": 7},
                {"name": "FEAT_W", "description": {"before": 3, "after": "FEAT_W is optional from Armv8.1."}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            registry.merge_index(&index),
            MergeStats { loaded: 3, new: 3 }
        );

        let y = registry.get("FEAT_Y").unwrap();
        assert!(y.documented);
        assert_eq!(y.description, "Why");
        assert_eq!(y.optional, "");

        let z = registry.get("FEAT_Z").unwrap();
        assert!(z.documented);
        assert_eq!(z.sysregs, NEEDS_REVIEW);
        assert_eq!(z.description, "");

        assert_eq!(registry.get("FEAT_W").unwrap().optional, "Armv8.1");
        assert!(registry.check().is_empty());
    }

    #[test]
    fn merge_is_by_name() {
        let mut registry = FeatureRegistry::new();
        let index =
            FeatureIndex::from_json(r#"{"parameters": [{"name": "FEAT_A"}, {"name": "FEAT_A"}]}"#)
                .unwrap();
        assert_eq!(
            registry.merge_index(&index),
            MergeStats { loaded: 2, new: 1 }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn sorted_case_insensitive() {
        let mut registry = FeatureRegistry::new();
        for name in ["FEAT_b", "FEAT_A", "FEAT_C"] {
            registry.get_or_insert(name);
        }
        let names = registry
            .sorted()
            .into_iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["FEAT_A", "FEAT_b", "FEAT_C"]);
    }
}
