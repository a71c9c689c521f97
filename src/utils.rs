pub mod path {
    use snafu::prelude::*;
    use std::{backtrace::Backtrace, path::*};

    #[derive(Debug, Snafu)]
    pub enum Error {
        #[snafu(display("cannot create directory {dir}"))]
        CreateDir {
            source: std::io::Error,
            dir: String,
            backtrace: Option<Backtrace>,
        },
    }

    type Result<T> = std::result::Result<T, Error>;

    /// create path to a file from path prefix and an extension name
    ///
    /// This function will create all folders as needed and remove all
    /// extensions from the prefix filename and then add the given extension
    /// name.
    pub fn from_prefix(prefix: impl AsRef<Path>, suffix: &str) -> Result<PathBuf> {
        // if parental path does not exist, then try to create all folders needed
        if let Some(parent) = prefix.as_ref().parent() {
            if parent != Path::new("") && !parent.exists() {
                std::fs::create_dir_all(parent).context(CreateDirSnafu {
                    dir: parent.to_string_lossy().to_string(),
                })?;
            }
        }
        // remove all extensions from path
        let mut o = prefix.as_ref().to_path_buf();
        while o.extension().is_some() {
            o.set_extension("");
        }

        // add suffix to the path name
        o.set_extension(suffix);
        Ok(o)
    }

    #[test]
    fn test_from_prefix() {
        assert_eq!(
            Path::new("/tmp/1/2/x.csv"),
            from_prefix("/tmp/1/2/x.cdf", "csv").unwrap()
        );
        assert_eq!(
            Path::new("/tmp/1/2/x.pq"),
            from_prefix("/tmp/1/2/x.cdf.efg", "pq").unwrap()
        );
        assert_eq!(
            Path::new("/tmp/1/2/x.csv"),
            from_prefix("/tmp/1/2/x", "csv").unwrap()
        );
        assert_eq!(Path::new("x.csv"), from_prefix("x", "csv").unwrap());
    }
}

pub mod error {
    use regex::Regex;
    use snafu::{AsErrorSource, Backtrace, ErrorCompat};

    #[derive(Debug)]
    struct Frame {
        func: String,
        file: String,
        line: u32,
    }

    fn extract_frames(bt: &Backtrace) -> Vec<Frame> {
        let bt_str = format!("{bt:?}");
        let re = match Regex::new(r#"fn: "([^"]+)", file: "([^"]+)", line: (\d+)"#) {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };

        re.captures_iter(&bt_str)
            .filter_map(|cap| {
                let func = cap.get(1)?.as_str().to_string();
                let file = cap.get(2)?.as_str().to_string();
                let line = cap.get(3)?.as_str().parse().ok()?;
                Some(Frame { func, file, line })
            })
            .collect()
    }

    /// Print the chain of error causes to stderr, then the backtrace frames
    /// that belong to this crate (only captured when `RUST_BACKTRACE` or
    /// `RUST_LIB_BACKTRACE` is set).
    pub fn show_snafu_error<E>(e: E)
    where
        E: ErrorCompat + AsErrorSource,
    {
        for (ic, c) in ErrorCompat::iter_chain(&e).enumerate() {
            if ic == 0 {
                eprintln!("ERROR");
            }
            eprintln!("{ic:>4}: {c}");
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            let frames: Vec<_> = extract_frames(bt)
                .into_iter()
                .filter(|f| {
                    !(f.file.contains("/rustc/")
                        || f.file.contains("crates.io")
                        || f.file.contains("toolchains")
                        || f.func.contains("as snafu::IntoError"))
                })
                .collect();
            if frames.is_empty() {
                return;
            }
            eprintln!("BACKTRACE");
            for (iframe, frame) in frames.iter().enumerate() {
                eprintln!("{iframe:>4}: {}\n        {}:{}", frame.func, frame.file, frame.line);
            }
        }
    }

}
