//! Size limits mirrored from the original command-language contract.
//!
//! These bound the size of keys/values, the number of pairs a single
//! WRITE/READ/DELETE may carry, and the length of a job file path. They
//! exist so that the lexer and directory walker have a deterministic
//! cutoff for rejecting malformed or oversized input rather than growing
//! buffers without bound.

/// Maximum length, in bytes, of a single key or value.
pub const MAX_STRING_SIZE: usize = 40;

/// Maximum number of (key, value) pairs accepted by a single WRITE, or
/// keys accepted by a single READ/DELETE.
pub const MAX_WRITE_SIZE: usize = 10;

/// Maximum length, in bytes, of a job file path produced by the
/// directory walker.
pub const MAX_JOB_FILE_NAME_SIZE: usize = 256;

/// Number of buckets in the store; one per letter `a`-`z`.
pub const TABLE_SIZE: usize = 26;
