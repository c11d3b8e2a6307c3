//! Tracing setup shared by tests and embedding applications.
//!
//! The admission protocol emits `tracing` events (grants, cancellations,
//! deadlock rejections) but never installs a subscriber on its own.

/// Install a `RUST_LOG`-driven fmt subscriber, unless the embedding
/// application already set a dispatcher of its own. Safe to call from
/// every test; only the first call has an effect.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
