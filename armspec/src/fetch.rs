//! Downloading and expanding the specification archives
//!
//! The download page only sometimes carries the archive links in its static
//! HTML, otherwise they are generated by scripts and a headless browser is
//! needed to render the page.

use {
    crate::{
        config::Config,
        error::{Error, Result},
        instruction::InstructionClass,
    },
    common::util::{bytes, create_file_buffered},
    errctx::PathCtx,
    flate2::read::GzDecoder,
    itertools::Itertools,
    log::{debug, info},
    once_cell::sync::Lazy,
    regex::Regex,
    std::{
        env,
        fs::{self, File},
        io::{self, Write},
        path::{Path, PathBuf},
        process::Command,
    },
    tar::Archive,
    url::Url,
};

pub const TAR_SUFFIX: &str = ".tar.gz";

/// Encoding index, next to the register index
pub const ENCODING_INDEX: &str = "enc_index.xml";

const BROWSERS: [&str; 4] = ["chrome-browser", "chromium-browser", "chrome", "chromium"];
const MACOS_CHROME: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

/// The three downloaded specifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecArchive {
    Isa,
    Features,
    SysReg,
}

impl SpecArchive {
    pub const ALL: [SpecArchive; 3] = [Self::Isa, Self::Features, Self::SysReg];

    pub fn name(self) -> &'static str {
        match self {
            Self::Isa => "ISA",
            Self::Features => "Features",
            Self::SysReg => "SysReg",
        }
    }

    /// Start of the archive file name, followed by a version
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Isa => "ISA_A64_xml_A_profile",
            Self::Features => "AARCHMRS_A_profile",
            Self::SysReg => "SysReg_xml_A_profile",
        }
    }

    /// Reference file inside the expanded archive, `@` stands for the
    /// archive base name
    pub fn anchor(self) -> &'static str {
        match self {
            Self::Isa => "@/index.xml",
            Self::Features => "Features.json",
            Self::SysReg => "@/AArch64-regindex.xml",
        }
    }
}

/// Paths of the expanded input files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFiles {
    pub isa_index: PathBuf,
    pub features_json: PathBuf,
    pub register_index: PathBuf,
    pub encoding_index: PathBuf,
}

impl SpecFiles {
    pub fn new(isa_index: PathBuf, features_json: PathBuf, register_index: PathBuf) -> Self {
        Self {
            encoding_index: register_index.with_file_name(ENCODING_INDEX),
            isa_index,
            features_json,
            register_index,
        }
    }

    /// Per-class instruction index, next to the ISA index
    pub fn instruction_index(&self, class: InstructionClass) -> PathBuf {
        self.isa_index.with_file_name(class.index_file())
    }
}

/// Makes the three archives available and expanded in the downloads
/// directory, downloading them if any is missing or `force` is set
pub fn fetch(config: &Config, force: bool) -> Result<SpecFiles> {
    let dir = &config.downloads;
    fs::create_dir_all(dir).map_err(PathCtx::f(dir))?;

    let tarballs = match local_archives(dir)? {
        Some(tarballs) if !force => {
            for tarball in &tarballs {
                info!("Already downloaded: {}", tarball.display());
            }
            tarballs
        }
        _ => download_all(&config.base_url, dir)?,
    };

    let [isa, features, sysreg] = tarballs;
    let [isa_kind, features_kind, sysreg_kind] = SpecArchive::ALL;

    Ok(SpecFiles::new(
        expand(dir, &isa, isa_kind.anchor(), force)?,
        expand(dir, &features, features_kind.anchor(), force)?,
        expand(dir, &sysreg, sysreg_kind.anchor(), force)?,
    ))
}

/// Most recent local archive of each kind, `None` unless all three exist
fn local_archives(dir: &Path) -> Result<Option<[PathBuf; 3]>> {
    let names = file_names(dir)?;
    let [isa, features, sysreg] = SpecArchive::ALL
        .map(|kind| last_match(names.iter().map(String::as_str), kind.prefix(), TAR_SUFFIX));

    Ok(match (isa, features, sysreg) {
        (Some(isa), Some(features), Some(sysreg)) => {
            Some([isa, features, sysreg].map(|name| dir.join(name)))
        }
        _ => None,
    })
}

fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = vec![];
    for entry in fs::read_dir(dir).map_err(PathCtx::f(dir))? {
        let entry = entry.map_err(PathCtx::f(dir))?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Last of the names matching `<prefix>*<suffix>` in case-insensitive
/// order, which is the most recent version for the vendor naming scheme
pub fn last_match<'a, I: IntoIterator<Item = &'a str>>(
    names: I,
    prefix: &str,
    suffix: &str,
) -> Option<&'a str> {
    let candidates = names
        .into_iter()
        .filter(|name| {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        })
        .sorted_by_cached_key(|name| (name.to_lowercase(), *name))
        .collect::<Vec<_>>();

    debug!("candidates for {prefix}*{suffix}: {candidates:?}");
    candidates.last().copied()
}

/// Finds the last `href` pointing to a `<prefix>...<suffix>` file in an HTML
/// page, resolved against the page URL
pub fn extract_url(html: &str, prefix: &str, suffix: &str, base: &Url) -> Result<Option<Url>> {
    static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="([^"]*)""#).unwrap());

    let mut urls = HREF
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|href| href.as_str())
        .filter(|href| links_to(href, prefix, suffix))
        .map(|href| base.join(href))
        .collect::<Result<Vec<_>, _>>()?;
    urls.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    debug!("candidates for {prefix}*{suffix}: {urls:?}");
    Ok(urls.pop())
}

/// `href` is `.../<prefix>...<suffix>`
fn links_to(href: &str, prefix: &str, suffix: &str) -> bool {
    href.ends_with(suffix)
        && href
            .find(&format!("/{prefix}"))
            .is_some_and(|start| start + 1 + prefix.len() + suffix.len() <= href.len())
}

fn archive_urls(html: &str, base: &Url) -> Result<[Option<Url>; 3]> {
    let [isa, features, sysreg] =
        SpecArchive::ALL.map(|kind| extract_url(html, kind.prefix(), TAR_SUFFIX, base));
    Ok([isa?, features?, sysreg?])
}

fn download_all(base_url: &str, dir: &Path) -> Result<[PathBuf; 3]> {
    let base = Url::parse(base_url)?;

    info!("Downloading {base} ...");
    let html = download_text(base.as_str())?;
    let mut urls = archive_urls(&html, &base)?;

    if urls.iter().any(Option::is_none) {
        let browser = find_browser().ok_or(Error::NoBrowser)?;
        info!(
            "Information not found in returned HTML, using {} to generate the page",
            browser.display()
        );
        let html = render_with_browser(&browser, base.as_str())?;
        urls = archive_urls(&html, &base)?;
    }

    let [isa, features, sysreg] = urls;
    let [isa_kind, features_kind, sysreg_kind] = SpecArchive::ALL;

    Ok([
        download_archive(isa_kind, isa, dir)?,
        download_archive(features_kind, features, dir)?,
        download_archive(sysreg_kind, sysreg, dir)?,
    ])
}

fn download_archive(kind: SpecArchive, url: Option<Url>, dir: &Path) -> Result<PathBuf> {
    let url = url.ok_or(Error::ArchiveNotFound(kind.name()))?;
    let name = Path::new(url.path())
        .file_name()
        .ok_or(Error::ArchiveNotFound(kind.name()))?;

    download(url.as_str(), dir.join(name))
}

/// Gets the body of `url` as text
pub fn download_text(url: &str) -> Result<String> {
    get(url)?.into_string().map_err(|source| Error::Response {
        url: url.to_owned(),
        source,
    })
}

/// Downloads `url` into the file `path`
pub fn download<P: AsRef<Path>>(url: &str, path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    info!("Downloading {url} ...");

    let mut reader = get(url)?.into_reader();
    let mut writer = create_file_buffered(path)?;
    let size = io::copy(&mut reader, &mut writer).map_err(|source| Error::Response {
        url: url.to_owned(),
        source,
    })?;
    writer.flush().map_err(PathCtx::f(path))?;

    info!("Downloaded {} ({:.2})", path.display(), bytes(size));
    Ok(path.to_owned())
}

fn get(url: &str) -> Result<ureq::Response> {
    ureq::get(url).call().map_err(|source| Error::Http {
        url: url.to_owned(),
        source: Box::new(source),
    })
}

/// Looks for Chrome or Chromium in the `PATH`
pub fn find_browser() -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    let found = BROWSERS.iter().find_map(|name| {
        env::split_paths(&path)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    });

    found.or_else(|| {
        let app = Path::new(MACOS_CHROME);
        (cfg!(target_os = "macos") && is_executable(app)).then(|| app.to_owned())
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Dumps the DOM of `url` once rendered by a headless browser
pub fn render_with_browser(browser: &Path, url: &str) -> Result<String> {
    let output = Command::new(browser)
        .args(["--headless", "--dump-dom", url])
        .output()
        .map_err(PathCtx::f(browser))?;

    if !output.status.success() {
        return Err(Error::BrowserFailed {
            browser: browser.to_owned(),
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Expands `tarball` into `dir/<archive base name>`, unless the anchor file
/// is already there. Returns the path of the anchor file.
///
/// Some archives hold a single top-level directory named after the archive,
/// others hold the files directly, both end up in the same place.
pub fn expand(dir: &Path, tarball: &Path, anchor: &str, force: bool) -> Result<PathBuf> {
    let tarname = tarball
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = tarname.strip_suffix(TAR_SUFFIX).unwrap_or(&tarname);
    let outdir = dir.join(base);
    let anchor = outdir.join(anchor.replace('@', base));

    if !force && anchor.exists() {
        info!("Already expanded: {tarname}");
        return Ok(anchor);
    }

    info!("Expanding {tarname} into {} ...", outdir.display());

    let archive_error = |source: io::Error| Error::Archive {
        path: tarball.to_owned(),
        source,
    };

    let paths = {
        let mut archive = open_archive(tarball)?;
        let mut paths = vec![];
        for entry in archive.entries().map_err(archive_error)? {
            paths.push(entry.map_err(archive_error)?.path().map_err(archive_error)?.into_owned());
        }
        paths
    };

    let dest = if has_single_root(&paths, base) {
        dir
    } else {
        outdir.as_path()
    };
    debug!("unpacking {tarname} into {}", dest.display());

    open_archive(tarball)?.unpack(dest).map_err(archive_error)?;

    Ok(anchor)
}

fn open_archive(tarball: &Path) -> Result<Archive<GzDecoder<File>>> {
    let file = File::open(tarball).map_err(PathCtx::f(tarball))?;
    Ok(Archive::new(GzDecoder::new(file)))
}

/// Every member lies below a directory named `root`
fn has_single_root<P: AsRef<Path>>(paths: &[P], root: &str) -> bool {
    paths.iter().all(|p| {
        let p = p.as_ref();
        p.starts_with(root) && p != Path::new(root)
    })
}

#[cfg(test)]
mod tests {
    use {
        super::{
            expand, extract_url, has_single_root, last_match, SpecArchive, SpecFiles, TAR_SUFFIX,
        },
        crate::instruction::InstructionClass,
        flate2::{write::GzEncoder, Compression},
        std::{
            fs::{self, File},
            path::{Path, PathBuf},
        },
        tar::{Builder, Header},
        url::Url,
    };

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("armspec-fetch-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn tarball(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut tar = Builder::new(GzEncoder::new(
            File::create(&path).unwrap(),
            Compression::default(),
        ));
        for (member, text) in files {
            let mut header = Header::new_gnu();
            header.set_size(text.len() as u64);
            header.set_mode(0o644);
            tar.append_data(&mut header, member, text.as_bytes()).unwrap();
        }
        tar.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn last_local_archive() {
        let names = [
            "ISA_A64_xml_A_profile-2023-03.tar.gz",
            "isa_A64_xml_A_profile-2024-12.tar.gz",
            "ISA_A64_xml_A_profile-2024-09.tar.gz",
            "ISA_A64_xml_A_profile-2025-03",
            "ISA_A64_xml_A_profile.tar.gz",
            "SysReg_xml_A_profile-2025-03.tar.gz",
        ];
        let prefix = SpecArchive::Isa.prefix();

        assert_eq!(
            last_match(names, prefix, TAR_SUFFIX),
            Some("ISA_A64_xml_A_profile.tar.gz")
        );
        assert_eq!(
            last_match(names[..3].iter().copied(), prefix, TAR_SUFFIX),
            Some("ISA_A64_xml_A_profile-2024-09.tar.gz")
        );
        assert_eq!(last_match(names, "AARCHMRS_A_profile", TAR_SUFFIX), None);
    }

    #[test]
    fn urls() {
        let base = Url::parse("https://developer.arm.com/downloads/-/exploration-tools").unwrap();
        let html = r#"
            <a href="/-/media/Files/ATG/Beta10/ISA_A64_xml_A_profile-2024-12.tar.gz">2024-12</a>
            <a href="https://cdn.example.com/files/ISA_A64_xml_A_profile-2025-03.tar.gz">2025-03</a>
            <a href="ISA_A64_xml_A_profile-2099-01.tar.gz">no slash</a>
            <a href="/files/SysReg_xml_A_profile-2025-03.tar.gz">sysreg</a>
        "#;

        assert_eq!(
            extract_url(html, "ISA_A64_xml_A_profile", TAR_SUFFIX, &base)
                .unwrap()
                .unwrap()
                .as_str(),
            "https://developer.arm.com/-/media/Files/ATG/Beta10/ISA_A64_xml_A_profile-2024-12.tar.gz"
        );
        assert_eq!(
            extract_url(html, "SysReg_xml_A_profile", TAR_SUFFIX, &base)
                .unwrap()
                .unwrap()
                .as_str(),
            "https://developer.arm.com/files/SysReg_xml_A_profile-2025-03.tar.gz"
        );
        assert!(extract_url(html, "AARCHMRS_A_profile", TAR_SUFFIX, &base)
            .unwrap()
            .is_none());
    }

    #[test]
    fn single_root() {
        let nested = [
            PathBuf::from("ISA_A64_xml_A_profile-2024-12/index.xml"),
            PathBuf::from("ISA_A64_xml_A_profile-2024-12/add.xml"),
        ];
        assert!(has_single_root(&nested, "ISA_A64_xml_A_profile-2024-12"));

        let flat = [PathBuf::from("Features.json"), PathBuf::from("Registers.json")];
        assert!(!has_single_root(&flat, "AARCHMRS_A_profile-2024-12"));

        let prefix_only = [PathBuf::from("ISA_A64_xml_A_profile-2024-12-extra/index.xml")];
        assert!(!has_single_root(&prefix_only, "ISA_A64_xml_A_profile-2024-12"));
    }

    #[test]
    fn spec_files() {
        let files = SpecFiles::new(
            "dl/ISA/ISA/index.xml".into(),
            "dl/AARCHMRS/Features.json".into(),
            "dl/SysReg/SysReg/AArch64-regindex.xml".into(),
        );
        assert_eq!(files.encoding_index, Path::new("dl/SysReg/SysReg/enc_index.xml"));
        assert_eq!(
            files.instruction_index(InstructionClass::Sme),
            Path::new("dl/ISA/ISA/mortlachindex.xml")
        );
    }

    #[test]
    fn expand_rooted_archive() {
        let dir = scratch("rooted");
        let tar = tarball(
            &dir,
            "ISA_A64_xml_A_profile-2024-12.tar.gz",
            &[
                ("ISA_A64_xml_A_profile-2024-12/ISA_A64_xml_A_profile-2024-12/index.xml", "<index/>"),
                ("ISA_A64_xml_A_profile-2024-12/ISA_A64_xml_A_profile-2024-12/add.xml", "<add/>"),
            ],
        );

        let anchor = expand(&dir, &tar, SpecArchive::Isa.anchor(), false).unwrap();
        let outdir = dir.join("ISA_A64_xml_A_profile-2024-12");
        assert_eq!(anchor, outdir.join("ISA_A64_xml_A_profile-2024-12/index.xml"));
        assert_eq!(fs::read_to_string(&anchor).unwrap(), "<index/>");
        assert!(!outdir.join("ISA_A64_xml_A_profile-2024-12/ISA_A64_xml_A_profile-2024-12").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn expand_flat_archive() {
        let dir = scratch("flat");
        let tar = tarball(
            &dir,
            "AARCHMRS_A_profile-2024-12.tar.gz",
            &[("Features.json", "{}"), ("Registers.json", "[]")],
        );

        let anchor = expand(&dir, &tar, SpecArchive::Features.anchor(), false).unwrap();
        assert_eq!(anchor, dir.join("AARCHMRS_A_profile-2024-12/Features.json"));
        assert_eq!(fs::read_to_string(&anchor).unwrap(), "{}");
        assert!(dir.join("AARCHMRS_A_profile-2024-12/Registers.json").is_file());
        assert!(!dir.join("Features.json").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn expand_once_unless_forced() {
        let dir = scratch("forced");
        let tar = tarball(&dir, "AARCHMRS_A_profile-2025-03.tar.gz", &[("Features.json", "{}")]);

        let anchor = expand(&dir, &tar, "Features.json", false).unwrap();
        fs::write(&anchor, "edited").unwrap();

        expand(&dir, &tar, "Features.json", false).unwrap();
        assert_eq!(fs::read_to_string(&anchor).unwrap(), "edited");

        expand(&dir, &tar, "Features.json", true).unwrap();
        assert_eq!(fs::read_to_string(&anchor).unwrap(), "{}");

        fs::remove_dir_all(&dir).ok();
    }
}
