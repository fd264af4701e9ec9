//! Locations of the vendor archives and of the project files to update

use {
    crate::error::{Error, Result},
    errctx::PathCtx,
    serde::Deserialize,
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Exploration tools download page
pub const BASE_URL: &str = "https://developer.arm.com/downloads/-/exploration-tools";

/// Every field may be omitted from the JSON configuration file, relative
/// paths are relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    /// Downloaded and expanded archives
    pub downloads: PathBuf,
    pub features_md: PathBuf,
    pub registers_md: PathBuf,
    pub bitfields_md: PathBuf,
    pub instructions_md: PathBuf,
    pub armfeatures_h: PathBuf,
    pub cpusysregs_h: PathBuf,
    /// Always written in full, no autogen markers
    pub regview_cpp: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_owned(),
            downloads: "aarch/downloads".into(),
            features_md: "docs/features.md".into(),
            registers_md: "docs/registers.md".into(),
            bitfields_md: "docs/registers-fields.md".into(),
            instructions_md: "docs/instructions.md".into(),
            armfeatures_h: "apps/armfeatures.h".into(),
            cpusysregs_h: "kernel/cpusysregs.h".into(),
            regview_cpp: "aarch/partial_regview.cpp".into(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(PathCtx::f(path.as_ref()))?;
        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.as_ref().to_owned(),
            source,
        })
    }

    /// Makes every relative path relative to `root` instead
    pub fn resolve<P: AsRef<Path>>(mut self, root: P) -> Self {
        let root = root.as_ref();
        for path in [
            &mut self.downloads,
            &mut self.features_md,
            &mut self.registers_md,
            &mut self.bitfields_md,
            &mut self.instructions_md,
            &mut self.armfeatures_h,
            &mut self.cpusysregs_h,
            &mut self.regview_cpp,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }
}
