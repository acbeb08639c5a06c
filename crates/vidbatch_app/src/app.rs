//! Builds the collaborators from the command line and runs the batch.

use std::sync::Arc;

use anyhow::Context;
use vidbatch_core::RunSummary;
use vidbatch_engine::{
    Extractor, FsResultSink, FsSinkSettings, HttpExtractor, HttpSettings, Orchestrator,
    PersistMode, PlatformProxyPool, PlatformProxySettings, ProxyPool, StaticProxyPool,
    TerminalStatus, YtDlpExtractor, YtDlpSettings,
};
use vidbatch_logging::batch_info;

use crate::cli::{Cli, ExtractorChoice};
use crate::input::resolve_input;

pub async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let input = resolve_input(cli)?;

    let downloads = cli.storage_dir.join("downloads");
    let extractor: Arc<dyn Extractor> = match cli.extractor {
        ExtractorChoice::Ytdlp => Arc::new(YtDlpExtractor::new(YtDlpSettings {
            binary: cli.ytdlp_path.clone(),
            ..YtDlpSettings::with_output_dir(downloads)
        })),
        ExtractorChoice::Http => {
            Arc::new(HttpExtractor::new(HttpSettings::with_output_dir(downloads)))
        }
    };

    let proxies = proxy_pool(&cli.proxy_urls, |name| std::env::var(name).ok())?;

    let sink = FsResultSink::open(FsSinkSettings {
        public_base_url: cli.public_base_url.clone(),
        ..FsSinkSettings::with_root(cli.storage_dir.clone())
    })
    .with_context(|| format!("could not open storage in {}", cli.storage_dir.display()))?;

    let mode = if cli.upload {
        PersistMode::UploadBlob
    } else {
        PersistMode::LocalPath
    };
    batch_info!("Storing results under {:?} ({:?})", cli.storage_dir, mode);

    let orchestrator = Orchestrator::new(
        extractor,
        proxies,
        Arc::new(sink),
        Arc::new(TerminalStatus::new()),
        mode,
    );
    Ok(orchestrator.run_input(&input).await?)
}

/// Static endpoints win over the platform proxy.
fn proxy_pool(
    static_urls: &[String],
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Arc<dyn ProxyPool>> {
    if !static_urls.is_empty() {
        return Ok(Arc::new(StaticProxyPool::new(static_urls.to_vec())));
    }
    Ok(Arc::new(PlatformProxyPool::new(platform_settings(env)?)))
}

fn platform_settings(
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PlatformProxySettings> {
    let mut settings = PlatformProxySettings {
        password: env("APIFY_PROXY_PASSWORD").filter(|value| !value.is_empty()),
        ..PlatformProxySettings::default()
    };
    if let Some(hostname) = env("APIFY_PROXY_HOSTNAME").filter(|value| !value.is_empty()) {
        settings.hostname = hostname;
    }
    if let Some(port) = env("APIFY_PROXY_PORT") {
        settings.port = port
            .trim()
            .parse()
            .with_context(|| format!("APIFY_PROXY_PORT '{port}' is not a port number"))?;
    }
    Ok(settings)
}
