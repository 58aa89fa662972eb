use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

/// Handle returned by [`init_tracing`] that lets callers change the active
/// filter after startup (e.g. once configuration has been loaded).
pub struct TracingHandle {
    filter_handle: reload::Handle<EnvFilter, tracing_subscriber::Registry>,
}

impl TracingHandle {
    /// ## Summary
    /// Replaces the active `EnvFilter` with one parsed from `directive`.
    ///
    /// Invalid directives are logged and ignored, leaving the previous
    /// filter in place.
    pub fn set_filter(&self, directive: &str) {
        match EnvFilter::try_new(directive) {
            Ok(filter) => {
                if let Err(err) = self.filter_handle.modify(|current| *current = filter) {
                    tracing::warn!(error = %err, "failed to update log filter");
                }
            }
            Err(err) => {
                tracing::warn!(directive, error = %err, "invalid log filter directive, keeping previous filter");
            }
        }
    }
}

/// ## Summary
/// Installs a global `tracing` subscriber with a reloadable `EnvFilter`,
/// defaulting to `debug`.
///
/// ## Side Effects
/// Attempts to set the global default subscriber. A subscriber already
/// installed elsewhere in the process (e.g. by a test harness) is left in
/// place rather than causing a panic, so this is safe to call from every
/// caller that wants a [`TracingHandle`], not just the first one.
pub fn init_tracing() -> TracingHandle {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init();

    TracingHandle { filter_handle }
}
