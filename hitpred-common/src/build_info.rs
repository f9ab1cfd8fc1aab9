//! Build identification captured by `build.rs`

use tracing::info;

pub const GIT_HASH: &str = env!("GIT_HASH");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

/// First eight characters of the commit hash
pub fn short_hash() -> &'static str {
    GIT_HASH.get(..8).unwrap_or(GIT_HASH)
}

/// Log the startup banner for `module` at `version`
pub fn log_startup(module: &str, version: &str) {
    info!(
        "Starting {} v{} [{}] built {} ({})",
        module, version, GIT_HASH, BUILD_TIMESTAMP, BUILD_PROFILE
    );
}
