//! Default values applied when a setting is not supplied.
//!
//! # Design
//! - Keep the historical tool defaults in one place so the CLI help and
//!   validation agree.

/// Source root used when none is configured.
pub const DEFAULT_SOURCE_ROOT: &str = "test_tar_dir";
/// Destination root used when none is configured.
pub const DEFAULT_DESTINATION_ROOT: &str = "tmp";
/// Format selector used when none is configured.
pub const DEFAULT_FORMAT: &str = "tar.gz";
/// Number of date directories archived at once.
pub const DEFAULT_CONCURRENCY: i64 = 1;
