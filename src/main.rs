use anyhow::Context;
use bookshare_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshare settings")?;

    bookshare_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        database = %settings.database.name,
        auth = ?settings.auth.provider,
        "bookshare bootstrap starting"
    );

    bookshare::run(settings).await
}
