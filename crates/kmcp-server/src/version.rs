//! Build and version information

use std::sync::OnceLock;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit the binary was built from, when `KMCP_GIT_COMMIT` was set at build time
pub fn git_commit() -> &'static str {
    option_env!("KMCP_GIT_COMMIT").unwrap_or("unknown")
}

/// ISO-8601 build date, when `KMCP_BUILD_DATE` was set at build time
pub fn build_date() -> &'static str {
    option_env!("KMCP_BUILD_DATE").unwrap_or("unknown")
}

/// Multi-line text for `--version`
pub fn long_version() -> &'static str {
    static LONG: OnceLock<String> = OnceLock::new();
    LONG.get_or_init(|| {
        format!(
            "{VERSION}\ngit commit: {}\nbuild date: {}",
            git_commit(),
            build_date()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_version_starts_with_version() {
        assert!(long_version().starts_with(VERSION));
        assert!(long_version().contains("git commit:"));
    }
}
