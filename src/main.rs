use anyhow::Context;

use wave::cli::CliFrontend;
use wave::config::WaveConfig;
use wave::onboarding::load_configured;
use wave::session::SessionScope;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to warn so log lines don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = WaveConfig::from_env().context("Invalid WAVE_* environment")?;

    let script = load_configured(&config)
        .await
        .context("Failed to load onboarding script")?;

    eprintln!("🌊 Wave v{}", env!("CARGO_PKG_VERSION"));
    match &config.script_path {
        Some(path) => eprintln!("   Script: {} ({} steps)", path.display(), script.len()),
        None => eprintln!("   Script: built-in ({} steps)", script.len()),
    }
    eprintln!("   Typing delay: {:?}", config.timing.typing_delay);

    let mut scope = SessionScope::new();
    let session = scope.open();

    CliFrontend::new(session, script, config.timing).run().await;

    scope.close();
    Ok(())
}
