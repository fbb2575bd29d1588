//! Utility functions used by loadsuite.

use regex::Regex;
use std::str::FromStr;
use std::time::Duration;

/// Parse a string representing a time span and return the number of seconds.
///
/// Can be specified as an integer, indicating seconds. Or can use integers
/// together with one or more of "h", "m", and "s", in that order, indicating
/// "hours", "minutes", and "seconds".
///
/// Valid formats include: 20, 20s, 3m, 2h, 1h20m, 3h30m10s, etc. Returns `None` for
/// anything else.
///
/// # Example
/// ```rust
/// use loadsuite::util;
///
/// // 1 hour 2 minutes and 3 seconds is 3,723 seconds.
/// assert_eq!(util::parse_timespan("1h2m3s"), Some(3_723));
///
/// // 45 seconds is 45 seconds.
/// assert_eq!(util::parse_timespan("45"), Some(45));
///
/// // Not a time span.
/// assert_eq!(util::parse_timespan("foo"), None);
/// ```
pub fn parse_timespan(time_str: &str) -> Option<usize> {
    let time_str = time_str.trim();
    if time_str.is_empty() {
        return None;
    }

    // If an integer is passed in, assume it's seconds.
    if let Ok(seconds) = usize::from_str(time_str) {
        trace!("{} is integer: {} seconds", time_str, seconds);
        return Some(seconds);
    }

    // Otherwise use a regex to extract hours, minutes and seconds from string.
    let re = Regex::new(r"^((?P<hours>\d+)h)?((?P<minutes>\d+)m)?((?P<seconds>\d+)s)?$").ok()?;
    let time_matches = re.captures(time_str)?;

    let component = |name: &str| -> Option<usize> {
        match time_matches.name(name) {
            Some(value) => usize::from_str(value.as_str()).ok(),
            None => Some(0),
        }
    };
    let hours = component("hours")?;
    let minutes = component("minutes")?;
    let seconds = component("seconds")?;
    // Spans too large for a usize are not time spans.
    let total = hours
        .checked_mul(60 * 60)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    trace!(
        "{} hours {} minutes {} seconds: {} seconds",
        hours,
        minutes,
        seconds,
        total
    );
    Some(total)
}

/// Sleep for the given duration, skipping the timer entirely for zero.
pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Turn a free-form name into a folder-friendly one: lowercase, spaces become underscores.
///
/// # Example
/// ```rust
/// use loadsuite::util;
///
/// assert_eq!(util::slugify("Nightly Run"), "nightly_run");
/// ```
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
