//! Exit code constants for the corral CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing entry, invalid config)
//! - 2: State failure (corrupt or unserializable state file)
//! - 3: Filesystem failure
//! - 4: Lock busy (timed out waiting; retry later)
//! - 5: Internal misuse (a bug in a consumer of the lock API)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unknown entries, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// A protected state file is corrupt or could not be serialized.
pub const STATE_FAILURE: i32 = 2;

/// Filesystem failure: permission denied, disk full, path not found.
pub const IO_FAILURE: i32 = 3;

/// Lock acquisition timed out.
pub const LOCK_BUSY: i32 = 4;

/// Double-lock, unlock without lock, or reentrant scoped call.
pub const INTERNAL_MISUSE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            STATE_FAILURE,
            IO_FAILURE,
            LOCK_BUSY,
            INTERNAL_MISUSE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
