//! Build metadata embedded by the build script, shown by `stillcode version`.

/// Short git commit hash, or `unknown` outside a checkout.
pub const GIT_HASH: &str = env!("STILLCODE_GIT_HASH");

/// Whether tracked files had uncommitted changes at build time.
pub const GIT_DIRTY: &str = env!("STILLCODE_GIT_DIRTY");

/// Build time as Unix epoch seconds.
pub const BUILD_TIMESTAMP: &str = env!("STILLCODE_BUILD_TIMESTAMP");

pub const BUILD_PROFILE: &str = env!("STILLCODE_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"0.1.0 (abc1234, debug)"`, with a `-dirty` hash suffix for modified trees.
pub fn version_string() -> String {
    let dirty = if GIT_DIRTY == "true" { "-dirty" } else { "" };
    format!("{VERSION} ({GIT_HASH}{dirty}, {BUILD_PROFILE})")
}
