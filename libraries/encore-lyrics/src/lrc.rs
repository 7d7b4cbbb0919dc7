//! LRC synced-lyrics parser.
//!
//! Accepts lines of the form `[mm:ss.xx]text`. A line may carry several
//! leading timestamps (`[00:12.00][01:40.50]chorus`), each producing its own
//! entry. ID tags such as `[ar:Artist]` and lines without text are skipped.

use encore_core::SyncedLine;

/// Parse LRC content into time-ordered lines.
///
/// Returns an empty vector when nothing in `content` is timed.
pub fn parse_lrc(content: &str) -> Vec<SyncedLine> {
    let mut lines = Vec::new();

    for raw in content.lines() {
        let mut rest = raw.trim();
        let mut times = Vec::new();

        while let Some(inner) = rest.strip_prefix('[') {
            let Some(end) = inner.find(']') else {
                break;
            };
            let Some(time_ms) = parse_timestamp(&inner[..end]) else {
                break;
            };
            times.push(time_ms);
            rest = &inner[end + 1..];
        }

        let text = rest.trim();
        if times.is_empty() || text.is_empty() {
            continue;
        }

        lines.extend(times.into_iter().map(|time_ms| SyncedLine {
            time_ms,
            text: text.to_string(),
        }));
    }

    // Stable, so lines sharing a timestamp keep file order
    lines.sort_by_key(|line| line.time_ms);
    lines
}

/// Parse `mm:ss`, `mm:ss.x`, `mm:ss.xx` or `mm:ss.xxx` into milliseconds
fn parse_timestamp(tag: &str) -> Option<u64> {
    let (minutes, seconds) = tag.split_once(':')?;
    let minutes: u64 = parse_digits(minutes)?;

    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (seconds, ""),
    };
    let whole: u64 = parse_digits(whole)?;

    let fraction_ms = if fraction.is_empty() {
        0
    } else {
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Scale to three digits: "5" is 500 ms, "05" is 50 ms, "1234" truncates
        let digits: String = fraction.chars().chain("000".chars()).take(3).collect();
        digits.parse::<u64>().ok()?
    };

    Some(minutes * 60_000 + whole * 1_000 + fraction_ms)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
