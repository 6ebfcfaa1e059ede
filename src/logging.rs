// File-based logging via tracing. Writes to ~/.local/share/tunefeed/tunefeed.log.

use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() -> anyhow::Result<()> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("tunefeed");
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = rolling::never(&data_dir, "tunefeed.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive("tunefeed=debug".parse()?))
        .init();

    // Leak the guard so the file writer stays open for the whole program.
    std::mem::forget(guard);
    Ok(())
}
