//! Order-timing policy: pure functions over order timestamps.
//!
//! The same lead-time arithmetic drives two call sites: the live receipt flow
//! (coupon eligibility, duration formatting) and the monthly report engine
//! (on-time/late classification against the stored duration).

use crate::error::{AppError, AppResult};
use chrono::NaiveDateTime;

/// Lead times up to and including this many minutes are short-lead.
pub const SHORT_LEAD_MAX_MINUTES: i64 = 120;
/// Delay past the requested time a short-lead order may accrue and still be
/// on-time (inclusive).
pub const SHORT_LEAD_GRACE_MINUTES: i64 = 60;
/// Same, for long-lead orders.
pub const LONG_LEAD_GRACE_MINUTES: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadClass {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeliness {
    OnTime,
    Late,
}

/// Classify the interval between placement and requested fulfillment.
pub fn lead_class(placed_at: NaiveDateTime, requested_at: NaiveDateTime) -> LeadClass {
    if (requested_at - placed_at).num_minutes() <= SHORT_LEAD_MAX_MINUTES {
        LeadClass::Short
    } else {
        LeadClass::Long
    }
}

fn grace_minutes(class: LeadClass) -> i64 {
    match class {
        LeadClass::Short => SHORT_LEAD_GRACE_MINUTES,
        LeadClass::Long => LONG_LEAD_GRACE_MINUTES,
    }
}

/// Post-hoc on-time/late classification of a Received order, from its stored
/// duration string. Delay exactly at the grace bound is on-time.
pub fn classify_received(
    placed_at: NaiveDateTime,
    requested_at: NaiveDateTime,
    duration: &str,
) -> AppResult<Timeliness> {
    let delay_minutes = parse_duration_minutes(duration)?;
    if delay_minutes <= grace_minutes(lead_class(placed_at, requested_at)) {
        Ok(Timeliness::OnTime)
    } else {
        Ok(Timeliness::Late)
    }
}

/// Whether marking the order received right `now` earns the customer a
/// loyalty coupon. The grace bound itself is not eligible; one minute past
/// it is.
pub fn coupon_eligible(
    placed_at: NaiveDateTime,
    requested_at: NaiveDateTime,
    now: NaiveDateTime,
) -> bool {
    let delay_minutes = (now - requested_at).num_minutes();
    delay_minutes > grace_minutes(lead_class(placed_at, requested_at))
}

/// Format `now - requested_at` as `D:HH:MM`. Early receipts produce a
/// negative difference, rendered with a single leading sign over the
/// absolute components (e.g. `-0:00:25`).
pub fn format_elapsed(requested_at: NaiveDateTime, now: NaiveDateTime) -> String {
    let total_minutes = (now - requested_at).num_minutes();
    let sign = if total_minutes < 0 { "-" } else { "" };
    let abs = total_minutes.abs();
    format!("{}{}:{:02}:{:02}", sign, abs / 1440, (abs % 1440) / 60, abs % 60)
}

/// Parse a signed `D:HH:MM` duration string into whole minutes.
pub fn parse_duration_minutes(duration: &str) -> AppResult<i64> {
    let (sign, body) = match duration.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, duration),
    };
    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() != 3 {
        return Err(AppError::ValidationError(format!(
            "Unparsable duration: {duration:?}"
        )));
    }
    let mut fields = [0i64; 3];
    for (i, part) in parts.iter().enumerate() {
        fields[i] = part.parse::<i64>().map_err(|_| {
            AppError::ValidationError(format!("Unparsable duration: {duration:?}"))
        })?;
        if fields[i] < 0 {
            return Err(AppError::ValidationError(format!(
                "Unparsable duration: {duration:?}"
            )));
        }
    }
    Ok(sign * (fields[0] * 1440 + fields[1] * 60 + fields[2]))
}

/// Parse a stored duration into whole seconds (duration strings carry minute
/// precision).
pub fn duration_seconds(duration: &str) -> AppResult<i64> {
    Ok(parse_duration_minutes(duration)? * 60)
}

/// Format a delay in seconds as `HH:MM:SS`, sign-prefixed when negative.
/// Hours are not wrapped at 24.
pub fn format_delay_seconds(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.abs();
    format!("{}{:02}:{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60, abs % 60)
}
