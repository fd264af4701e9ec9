use {
    armspec::matrix::FeatureMatrix,
    clap::{self, Parser},
    color_eyre::eyre::WrapErr,
    common::util::{create_file_buffered, init_logger},
    log::info,
    std::{io::Write, path::PathBuf},
};

/// Builds the markdown matrix comparing the features of the tested CPU cores
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Logging filter string (e.g. "debug")
    #[arg(long)]
    log: Option<String>,
    /// Directory holding one sub-directory per tested system
    root: PathBuf,
    /// Output markdown file, defaults to FEATURES.md in the root
    output: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let Cli { log, root, output } = Cli::parse();

    init_logger(log.as_deref().unwrap_or("info"))?;

    let matrix = FeatureMatrix::load(&root).wrap_err("Failed to load collected features")?;
    let output = output.unwrap_or_else(|| root.join("FEATURES.md"));

    info!("Writing {}", output.display());
    let mut writer = create_file_buffered(&output)?;
    writer.write_all(matrix.render().as_bytes())?;
    writer.flush()?;

    Ok(())
}
