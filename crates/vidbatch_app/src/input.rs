//! Run input resolution: input file, then the default store's `INPUT.json`,
//! then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use vidbatch_core::RunInput;
use vidbatch_logging::batch_info;

use crate::cli::Cli;

/// Where the platform leaves the run input inside a storage directory.
pub fn default_input_path(storage_dir: &Path) -> PathBuf {
    storage_dir
        .join("key_value_stores")
        .join("default")
        .join("INPUT.json")
}

pub fn resolve_input(cli: &Cli) -> anyhow::Result<RunInput> {
    let mut input = match &cli.input {
        Some(path) => read_input(path)?,
        None => {
            let fallback = default_input_path(&cli.storage_dir);
            if fallback.is_file() {
                read_input(&fallback)?
            } else {
                RunInput::default()
            }
        }
    };

    if !cli.urls.is_empty() {
        input.video_urls = cli.urls.clone();
    }
    if let Some(quality) = &cli.quality {
        input.quality = quality.clone();
    }
    if let Some(group) = &cli.proxy_group {
        input.proxy_type = group.clone();
    }

    Ok(input.validated()?)
}

fn read_input(path: &Path) -> anyhow::Result<RunInput> {
    batch_info!("Reading run input from {:?}", path);
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read input file {}", path.display()))?;
    RunInput::from_json(&raw).with_context(|| format!("invalid input file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;
    use vidbatch_core::ConfigurationError;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vidbatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn default_store_input_is_picked_up() {
        let storage = TempDir::new().unwrap();
        let path = default_input_path(storage.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"videoUrls": ["https://x/a", "  "], "quality": "worst", "proxyType": "NONE"}"#,
        )
        .unwrap();

        let input =
            resolve_input(&cli(&["--storage-dir", storage.path().to_str().unwrap()])).unwrap();
        assert_eq!(input.video_urls, vec!["https://x/a"]);
        assert_eq!(input.quality, "worst");
        assert_eq!(input.proxy_group(), None);
    }

    #[test]
    fn command_line_overrides_the_input_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.json");
        fs::write(&path, r#"{"videoUrls": ["https://x/a"], "quality": "worst"}"#).unwrap();

        let input = resolve_input(&cli(&[
            "--input",
            path.to_str().unwrap(),
            "--url",
            "https://x/b",
            "--quality",
            "bestaudio",
            "--proxy-group",
            "DATACENTER",
        ]))
        .unwrap();
        assert_eq!(input.video_urls, vec!["https://x/b"]);
        assert_eq!(input.quality, "bestaudio");
        assert_eq!(input.proxy_group(), Some("DATACENTER"));
    }

    #[test]
    fn no_input_and_no_urls_is_an_empty_list() {
        let storage = TempDir::new().unwrap();
        let err = resolve_input(&cli(&["--storage-dir", storage.path().to_str().unwrap()]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::EmptyUrlList)
        ));
    }

    #[test]
    fn broken_input_file_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.json");
        fs::write(&path, "{not json").unwrap();

        let err = resolve_input(&cli(&["--input", path.to_str().unwrap()])).unwrap_err();
        assert!(format!("{err:#}").contains("input.json"));
    }
}
