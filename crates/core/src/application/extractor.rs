//! Failed disc extraction
//!
//! The scanner logs every disc it had to skip on a single line, e.g.
//!
//! ```text
//! ERROR Disc failed validation | Set: Woodpecker Electro | Partition: 4 | Main Stat: ATK% | Level: 15 | skipping: unreadable substat
//! ```
//!
//! Each field is located independently. A field that cannot be found falls
//! back to its default; a malformed line never fails the whole record.

use crate::domain::FailedItemRecord;
use regex::Regex;
use std::sync::OnceLock;

/// Both tags must appear on a line for it to describe a skipped disc
pub const ERROR_TAG: &str = "ERROR";
pub const VALIDATION_TAG: &str = "failed validation";

pub const UNKNOWN_SET: &str = "Unknown";
pub const UNKNOWN_FIELD: &str = "?";
pub const UNKNOWN_REASON: &str = "Unknown error";

struct FieldPatterns {
    set: Regex,
    partition: Regex,
    main_stat: Regex,
    level: Regex,
    reason: Regex,
}

fn patterns() -> &'static FieldPatterns {
    static PATTERNS: OnceLock<FieldPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FieldPatterns {
        set: labeled("Set"),
        partition: labeled("Partition"),
        main_stat: labeled("Main Stat"),
        level: labeled("Level"),
        reason: labeled("skipping"),
    })
}

/// `<label>: ` followed by everything up to the next `|`
fn labeled(label: &str) -> Regex {
    let pattern = format!(r"{}: ([^|]+)", regex::escape(label));
    Regex::new(&pattern).expect("static field pattern")
}

fn field(pattern: &Regex, line: &str, default: &str) -> String {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

pub fn is_failed_item_line(line: &str) -> bool {
    line.contains(ERROR_TAG) && line.contains(VALIDATION_TAG)
}

/// Parse one failure line into a record, defaulting missing fields
pub fn parse_failed_item(line: &str) -> FailedItemRecord {
    let p = patterns();
    FailedItemRecord {
        set: field(&p.set, line, UNKNOWN_SET),
        partition: field(&p.partition, line, UNKNOWN_FIELD),
        main_stat: field(&p.main_stat, line, UNKNOWN_FIELD),
        level: field(&p.level, line, UNKNOWN_FIELD),
        reason: field(&p.reason, line, UNKNOWN_REASON),
    }
}

/// Collect a record for every failure line, in log order
pub fn extract_failed_items<S: AsRef<str>>(lines: &[S]) -> Vec<FailedItemRecord> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| is_failed_item_line(line))
        .map(parse_failed_item)
        .collect()
}
