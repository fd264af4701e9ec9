use {
    armspec::toc,
    clap::{self, Parser},
    color_eyre::eyre::WrapErr,
    common::util::init_logger,
    log::info,
    std::{path::PathBuf, process},
};

/// Rebuilds the table of contents following the `**Contents:**` line of
/// markdown files
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Markdown files, updated in place
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let Cli { files } = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            e.print()?;
            process::exit(1);
        }
        Err(e) => e.exit(),
    };

    init_logger("info")?;

    for file in files {
        if toc::update_file(&file).wrap_err_with(|| format!("Failed to update {file:?}"))? {
            info!("updating ToC of {}", file.display());
        }
    }

    Ok(())
}
