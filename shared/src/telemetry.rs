use tracing_subscriber::EnvFilter;

/// Install the JSON log formatter used by every Lambda binary.
///
/// Level comes from `RUST_LOG` (default `info`). No timestamps: CloudWatch
/// stamps each line itself.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
