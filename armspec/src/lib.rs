//! Arm64 feature, system register and instruction tables
//!
//! Cross-references the Arm exploration tools specifications (features JSON,
//! register and instruction XML) with the hand-maintained project files and
//! regenerates the marked regions of the documentation and C/C++ headers.

use {
    crate::{
        autogen::AutogenFile,
        config::Config,
        feature::{FeatureIndex, FeatureRegistry},
        fetch::SpecFiles,
        instruction::{InstructionClass, InstructionRegistry},
        register::{
            headers::{scan_feature_header, scan_kernel_header, PendingPairs},
            xml::{load_encoding_index, load_register_file, load_register_index},
            RegisterRegistry,
        },
        render::{cpp, markdown},
    },
    common::util::create_file_buffered,
    errctx::PathCtx,
    log::info,
    std::{
        fs,
        io::Write,
        path::{Path, PathBuf},
    },
};

pub mod autogen;
pub mod config;
pub mod error;
pub mod feature;
pub mod fetch;
pub mod instruction;
pub mod matrix;
pub mod register;
pub mod render;
pub mod toc;
pub mod warning;
pub mod xml;

pub use {
    error::{Error, Result},
    warning::{Warning, Warnings},
};

/// Where the generated text goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Replace the marked region of each target file
    InPlace,
    /// Write each generated region alone to a file of the same name in the
    /// directory, leaving the targets untouched
    Review(PathBuf),
}

/// Project files with a generated region
#[derive(Debug)]
pub struct ProjectFiles {
    pub features_md: AutogenFile,
    pub registers_md: AutogenFile,
    pub bitfields_md: AutogenFile,
    pub instructions_md: AutogenFile,
    pub armfeatures_h: AutogenFile,
    pub cpusysregs_h: AutogenFile,
}

impl ProjectFiles {
    /// Loads every target, only the feature table keeps its generated region
    /// which is the source of the hand-edited feature rows
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self {
            features_md: AutogenFile::load(&config.features_md, true)?,
            registers_md: AutogenFile::load(&config.registers_md, false)?,
            bitfields_md: AutogenFile::load(&config.bitfields_md, false)?,
            instructions_md: AutogenFile::load(&config.instructions_md, false)?,
            armfeatures_h: AutogenFile::load(&config.armfeatures_h, false)?,
            cpusysregs_h: AutogenFile::load(&config.cpusysregs_h, false)?,
        })
    }
}

/// Generated text of every target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub features: String,
    pub registers: String,
    pub bitfields: String,
    pub instructions: String,
    pub feature_header: String,
    pub kernel_header: String,
    pub regview: String,
}

/// Everything learnt from the project and vendor files
#[derive(Debug, Default)]
pub struct Models {
    pub features: FeatureRegistry,
    pub registers: RegisterRegistry,
    pub instructions: InstructionRegistry,
    pub warnings: Warnings,
}

impl Models {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every builder in order
    pub fn build(project: &ProjectFiles, spec: &SpecFiles) -> Result<Self> {
        let mut models = Self::new();

        let pairs = models.scan_project(project);
        models.merge_features(&spec.features_json)?;
        models.load_registers(&spec.register_index, &spec.encoding_index)?;
        models.finish_registers(pairs);
        models.load_instructions(spec)?;

        let undefined = models.registers.check_encodings();
        models.warnings.extend(undefined);

        Ok(models)
    }

    /// Learns features and registers from the hand-maintained files.
    ///
    /// Register pairs of the kernel header are returned for resolution once
    /// all registers are known.
    pub fn scan_project(&mut self, project: &ProjectFiles) -> PendingPairs {
        let removed = self
            .features
            .load_table(project.features_md.content.iter().map(String::as_str));
        info!(
            "Existing features in {}: {}, {removed} marked as \"removed\"",
            project.features_md.name(),
            self.features.len()
        );

        let armfeatures = || project.armfeatures_h.after.iter().map(String::as_str);

        let detectable = self.features.mark_detectable(armfeatures());
        info!(
            "Detectable features in {}: {detectable}",
            project.armfeatures_h.name()
        );

        let bound = scan_feature_header(&mut self.registers, armfeatures());
        info!(
            "Registers used to check features in {}: {bound}",
            project.armfeatures_h.name()
        );

        let (accessible, pairs) = scan_kernel_header(
            &mut self.registers,
            project.cpusysregs_h.before.iter().map(String::as_str),
        );
        info!(
            "Registers accessible through {}: {accessible}, {} register pairs",
            project.cpusysregs_h.name(),
            pairs.len()
        );

        pairs
    }

    /// Merges the vendor feature index into the feature table
    pub fn merge_features<P: AsRef<Path>>(&mut self, features_json: P) -> Result<()> {
        let index = FeatureIndex::load(&features_json)?;
        self.merge_feature_index(&index, &parent_name(features_json.as_ref()));
        Ok(())
    }

    pub fn merge_feature_index(&mut self, index: &FeatureIndex, source: &str) {
        let stats = self.features.merge_index(index);
        info!(
            "Loaded features from {source}: {}, {} new",
            stats.loaded, stats.new
        );
        self.warnings.extend(self.features.check());
    }

    /// Loads every register file of the register index, then the encoding
    /// index
    pub fn load_registers<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        register_index: P,
        encoding_index: Q,
    ) -> Result<()> {
        let register_index = register_index.as_ref();
        let dir = register_index.parent().unwrap_or(Path::new("."));
        let files = load_register_index(register_index)?;
        info!(
            "XML files for system registers in {}: {}",
            parent_name(register_index),
            files.len()
        );

        for file in files {
            load_register_file(&mut self.registers, dir.join(file), &mut self.warnings)?;
        }
        info!(
            "Known registers in {}: {}",
            parent_name(register_index),
            self.registers.len()
        );

        let encodings = load_encoding_index(&mut self.registers, encoding_index, &mut self.warnings)?;
        info!("Encodings from encoding index: {encodings}");

        Ok(())
    }

    /// Fills in descriptions of `_EL12`/`_EL02` registers and flags the
    /// registers behind the kernel register pairs
    pub fn finish_registers(&mut self, pairs: PendingPairs) {
        let backfilled = self.registers.backfill_descriptions();
        info!("Descriptions copied to EL12/EL02 registers: {backfilled}");

        let flagged = pairs.resolve(&mut self.registers);
        info!("Registers accessible by pair: {flagged}");
    }

    pub fn load_instructions(&mut self, spec: &SpecFiles) -> Result<()> {
        for class in InstructionClass::ALL {
            let count = self
                .instructions
                .load_index(spec.instruction_index(class), class)?;
            info!("Number of {class} instructions: {count}");
        }
        info!("Total number of instructions: {}", self.instructions.total());
        Ok(())
    }

    pub fn render(&self) -> Rendered {
        Rendered {
            features: markdown::features(&self.features),
            registers: markdown::registers(&self.registers),
            bitfields: markdown::bitfields(&self.registers),
            instructions: markdown::instructions(&self.instructions),
            feature_header: cpp::feature_header(&self.registers),
            kernel_header: cpp::kernel_header(&self.registers),
            regview: cpp::regview(&self.registers),
        }
    }
}

/// Builds the models and writes every generated file, returns the
/// warnings found on the way.
///
/// Every output directory is created before the first target is touched.
pub fn generate(config: &Config, spec: &SpecFiles, output: &Output) -> Result<Warnings> {
    let project = ProjectFiles::load(config)?;
    let models = Models::build(&project, spec)?;
    let rendered = models.render();

    let regview = match output {
        Output::InPlace => config.regview_cpp.clone(),
        Output::Review(dir) => dir.join(config.regview_cpp.file_name().unwrap_or_default()),
    };
    create_parent(&regview)?;

    let targets = [
        (&project.features_md, &rendered.features),
        (&project.registers_md, &rendered.registers),
        (&project.bitfields_md, &rendered.bitfields),
        (&project.instructions_md, &rendered.instructions),
        (&project.armfeatures_h, &rendered.feature_header),
        (&project.cpusysregs_h, &rendered.kernel_header),
    ];

    for (target, content) in targets {
        match output {
            Output::InPlace => {
                info!("Updating {}", target.path().display());
                target.rewrite(content)?;
            }
            Output::Review(dir) => write_text(dir.join(target.name()), content)?,
        }
    }

    write_text(regview, &rendered.regview)?;

    Ok(models.warnings)
}

fn write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path = path.as_ref();
    info!("Writing {}", path.display());

    create_parent(path)?;
    let mut writer = create_file_buffered(path)?;
    writer
        .write_all(text.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(PathCtx::f(path))?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => Ok(fs::create_dir_all(dir).map_err(PathCtx::f(dir))?),
        None => Ok(()),
    }
}

/// Name of the directory holding `path`, for messages
fn parent_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
