use {errctx::PathCtx, std::path::PathBuf};

/// Fatal errors, any of which aborts the run
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum Error {
    /// I/O error: {0}
    Io(#[from] PathCtx<std::io::Error>),
    /// Failed to walk directory: {0}
    Walk(#[from] walkdir::Error),
    /// Failed to parse JSON {path:?}: {source}
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Failed to parse XML {path:?}: {source}
    Xml {
        path: PathBuf,
        source: roxmltree::Error,
    },
    /// No {marker} found in {path:?}
    MissingMarker { marker: &'static str, path: PathBuf },
    /// Information not found in returned HTML, install Chrome to generate the page
    NoBrowser,
    /// Headless browser {browser:?} failed with {status}
    BrowserFailed {
        browser: PathBuf,
        status: std::process::ExitStatus,
    },
    /// Failed to fetch {url}: {source}
    Http {
        url: String,
        source: Box<ureq::Error>,
    },
    /// Failed to read response from {url}: {source}
    Response {
        url: String,
        source: std::io::Error,
    },
    /// Invalid URL: {0}
    Url(#[from] url::ParseError),
    /// No URL found for {0} archive
    ArchiveNotFound(&'static str),
    /// Failed to read archive {path:?}: {source}
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
