use {
    armspec::{config::Config, fetch, generate, Output},
    clap::Parser,
    color_eyre::eyre::{Result, WrapErr},
    common::util::init_logger,
    log::info,
    std::path::PathBuf,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Download and expand the specifications only, do not generate anything
    #[arg(short, long)]
    download: bool,

    /// Download and expand the specifications even if already present
    #[arg(short, long)]
    force: bool,

    /// Logging filter string (e.g. "armspec=debug" or "trace")
    #[arg(long)]
    log: Option<String>,

    /// Project root, relative paths of the configuration are resolved from it
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// JSON configuration file, defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the generated fragments into this directory instead of updating
    /// the project files
    #[arg(long)]
    review: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    init_logger(args.log.as_deref().unwrap_or("info"))?;

    let config = match &args.config {
        Some(path) => Config::load(path).wrap_err("Failed to load configuration")?,
        None => Config::default(),
    }
    .resolve(&args.root);

    let spec = fetch::fetch(&config, args.force).wrap_err("Failed to fetch specifications")?;

    if args.download {
        return Ok(());
    }

    let output = match args.review {
        Some(dir) => Output::Review(dir),
        None => Output::InPlace,
    };

    let warnings = generate(&config, &spec, &output)?;
    warnings.report();

    info!("done, {} warnings", warnings.len());

    Ok(())
}
