use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "vidbatch")]
#[command(
    about = "Download a batch of videos concurrently and record one result per URL",
    long_about = None
)]
pub struct Cli {
    /// JSON run input with `videoUrls`, `quality` and `proxyType`
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Video URL to download; repeat for several. Replaces the input file's list
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// Format selector handed to the extractor, e.g. `best` or `bestaudio`
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Proxy group to route through, or NONE to connect directly
    #[arg(long)]
    pub proxy_group: Option<String>,

    /// Root of the local dataset and key-value store
    #[arg(long, default_value = "storage")]
    pub storage_dir: PathBuf,

    /// Upload downloaded files to the key-value store instead of keeping them
    #[arg(long)]
    pub upload: bool,

    /// Base URL under which uploaded files are served
    #[arg(long)]
    pub public_base_url: Option<String>,

    #[arg(long, value_enum, default_value_t = ExtractorChoice::Ytdlp)]
    pub extractor: ExtractorChoice,

    /// Path of the yt-dlp executable
    #[arg(long, default_value = "yt-dlp")]
    pub ytdlp_path: PathBuf,

    /// Static proxy endpoint; repeat for several. Replaces the platform proxy
    #[arg(long = "proxy-url")]
    pub proxy_urls: Vec<String>,

    #[arg(long, default_value = "info", value_parser = parse_log_level)]
    pub log_level: LevelFilter,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractorChoice {
    /// Any site yt-dlp supports
    Ytdlp,
    /// URLs that point straight at a media file
    Http,
}

fn parse_log_level(raw: &str) -> Result<LevelFilter, String> {
    vidbatch_logging::parse_level(raw).ok_or_else(|| format!("unknown log level '{raw}'"))
}
