//! Process-wide stop signal.

use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancelled once on Ctrl+C; every long-running task selects on it.
pub static SHUTDOWN: Lazy<CancellationToken> = Lazy::new(CancellationToken::new);

pub fn cancel_on_ctrl_c() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            SHUTDOWN.cancel();
        }
    });
}
