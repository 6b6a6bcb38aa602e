//! Client-supplied profile overrides.
//!
//! A web layer may collect profile ids on the client (for example from a
//! script that measures the real screen) and send them back as a
//! pipe-separated list such as `"17779|18092"`. Those ids refine a server
//! side match before its properties are read.

use crate::error::Result;
use crate::result::Match;
use tracing::debug;

/// Separator between profile ids in an override list.
pub const PROFILE_ID_SEPARATOR: char = '|';

/// Parse a pipe-separated list of profile ids. Tokens that are not
/// unsigned integers are logged and skipped.
pub fn parse_profile_ids(raw: &str) -> Vec<u32> {
    raw.split(PROFILE_ID_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<u32>() {
            Ok(id) => Some(id),
            Err(err) => {
                debug!(token, error = %err, "Skipping invalid profile id");
                None
            }
        })
        .collect()
}

/// Parse `raw` and apply every valid, known profile id to `result`.
/// Returns how many profiles were replaced.
pub fn apply_overrides(result: &mut Match, raw: &str) -> Result<usize> {
    result.apply_profile_overrides(&parse_profile_ids(raw))
}
