//! Byte-range requests
//!
//! Single `bytes=` ranges only, enough for media elements seeking through
//! bundled audio and video. Multi-range requests get the full body.

use std::ops::RangeInclusive;

/// Outcome of evaluating a `Range` header against a body length
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole body with 200
    Full,
    /// Serve these bytes with 206
    Partial(RangeInclusive<usize>),
    /// Reply 416
    NotSatisfiable,
}

/// Evaluate `Range` for a body of `len` bytes
///
/// # Examples
/// ```
/// use assetshell::http::range::{evaluate, RangeOutcome};
/// assert_eq!(evaluate(Some("bytes=0-9"), 100), RangeOutcome::Partial(0..=9));
/// assert_eq!(evaluate(None, 100), RangeOutcome::Full);
/// ```
pub fn evaluate(range_header: Option<&str>, len: usize) -> RangeOutcome {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix form: last N bytes
        return match last.parse::<usize>() {
            Ok(0) => RangeOutcome::NotSatisfiable,
            Ok(_) if len == 0 => RangeOutcome::NotSatisfiable,
            Ok(n) => RangeOutcome::Partial(len.saturating_sub(n)..=len - 1),
            Err(_) => RangeOutcome::Full,
        };
    }

    let Ok(start) = first.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    if start >= len {
        return RangeOutcome::NotSatisfiable;
    }
    let end = if last.is_empty() {
        len - 1
    } else {
        match last.parse::<usize>() {
            Ok(e) if e < start => return RangeOutcome::NotSatisfiable,
            Ok(e) => e.min(len - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };
    RangeOutcome::Partial(start..=end)
}
