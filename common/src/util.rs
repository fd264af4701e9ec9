use {
    byte_unit::{AdjustedByte, Byte, UnitType},
    color_eyre::{eyre::WrapErr, Result},
    errctx::PathCtx,
    std::{
        fs::File,
        io::{self, BufWriter},
        path::Path,
    },
};

/// Initialize the logger
pub fn init_logger(filters: &str) -> Result<()> {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.parse_filters(filters);
    builder.try_init().wrap_err("Failed to initialise logger")?;
    Ok(())
}

/// Creates the file supplied in `path`.
///
/// If the file at the supplied path already exists it will
/// be overwritten.
pub fn create_file_buffered<P: AsRef<Path>>(
    path: P,
) -> Result<BufWriter<File>, PathCtx<io::Error>> {
    File::options()
        .write(true) // we want to write to the file...
        .create(true) // ...creating if it does not exist..
        .truncate(true) // ...and truncate before writing
        .open(path.as_ref())
        .map(BufWriter::new)
        .map_err(PathCtx::f(path))
}

/// Number of bytes to human-readable `Display`able
pub fn bytes(num: u64) -> AdjustedByte {
    Byte::from(num).get_appropriate_unit(UnitType::Binary)
}

#[cfg(test)]
mod tests {
    use {
        super::create_file_buffered,
        std::{fs, io::Write},
    };

    #[test]
    fn buffered_file() {
        let dir = std::env::temp_dir().join(format!("common-util-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.txt");

        let mut writer = create_file_buffered(&path).unwrap();
        writer.write_all(b"text").unwrap();
        writer.flush().unwrap();
        drop(writer);
        assert_eq!(fs::read_to_string(&path).unwrap(), "text");

        assert!(create_file_buffered(dir.join("missing/out.txt")).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
