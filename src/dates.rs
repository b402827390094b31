//! Free-text date normalization for Azerbaijani news sites.
//!
//! Sites print timestamps in a dozen shapes: `"21 fevral"`, `"15 Noy 2025 12:44"`,
//! `"Bu gün / 12:18"`, `"09.11.2025 | 10:59"`, `"2 saat əvvəl"`, ISO 8601 in
//! `<time datetime>` attributes and so on. Everything without an explicit offset
//! is read as Baku local time (UTC+04:00, no DST) and returned as UTC.
//!
//! Unparseable input yields `None`, never an error.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use crate::utils::fold_case;
use once_cell::sync::Lazy;
use regex::Regex;

const BAKU_UTC_OFFSET_SECS: i32 = 4 * 3600;

static BAKU: Lazy<FixedOffset> = Lazy::new(|| {
    FixedOffset::east_opt(BAKU_UTC_OFFSET_SECS).expect("UTC+04:00 is a valid offset")
});

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d+)\s*(saat|dəqiqə|deqiqe|dəq|gün|gun|hours?|minutes?|mins?|days?)\s*(əvvəl|evvel|ago)",
    )
    .expect("relative date regex")
});
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").expect("time regex"));
static DOTTED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").expect("dotted date regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("iso date regex"));
static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s+(\p{L}+)\.?(?:\s+(\d{4}))?").expect("day month regex")
});

/// The fixed Baku offset used for every site-local timestamp.
pub fn baku_offset() -> FixedOffset {
    *BAKU
}

/// Current wall-clock time in Baku.
pub fn baku_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&*BAKU)
}

/// Parse a site-local date string into an absolute UTC timestamp.
///
/// # Arguments
///
/// * `raw` - The text as printed by the site
/// * `now` - Reference time used for relative phrases and missing years
///
/// # Returns
///
/// `Some` UTC timestamp, or `None` when no supported pattern matches.
pub fn parse_date(raw: &str, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(dt) = parse_iso(raw) {
        return Some(dt);
    }

    let now = now.with_timezone(&*BAKU);
    let text = normalize(raw);

    if let Some(caps) = RELATIVE_RE.captures(&text) {
        let amount: i64 = caps[1].parse().ok()?;
        let delta = match &caps[2] {
            "saat" | "hour" | "hours" => Duration::try_hours(amount),
            "gün" | "gun" | "day" | "days" => Duration::try_days(amount),
            _ => Duration::try_minutes(amount),
        }?;
        return now
            .checked_sub_signed(delta)
            .map(|dt| dt.with_timezone(&Utc));
    }

    let time = TIME_RE.captures(&text).and_then(|caps| {
        let h = caps[1].parse().ok()?;
        let m = caps[2].parse().ok()?;
        let s = caps.get(3).and_then(|s| s.as_str().parse().ok()).unwrap_or(0);
        NaiveTime::from_hms_opt(h, m, s)
    });
    let without_time = TIME_RE.replace_all(&text, " ");
    let today = now.date_naive();

    let date = if is_today(&without_time) {
        Some(today)
    } else if is_yesterday(&without_time) {
        today.pred_opt()
    } else if let Some(caps) = DOTTED_DATE_RE.captures(&without_time) {
        NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        )
    } else if let Some(caps) = ISO_DATE_RE.captures(&without_time) {
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    } else if let Some(date) = day_month(&without_time, now) {
        Some(date)
    } else if time.is_some() {
        Some(today)
    } else {
        None
    }?;

    let local = date.and_time(time.unwrap_or(NaiveTime::MIN));
    BAKU.from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return BAKU
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    None
}

/// Case-fold and turn separators into spaces.
fn normalize(raw: &str) -> String {
    let lowered: String = fold_case(raw)
        .chars()
        .map(|c| match c {
            '|' | ',' | '/' | '\u{00a0}' => ' ',
            other => other,
        })
        .collect();
    lowered.replace("(utc+04)", " ").replace("(utc +04)", " ")
}

fn is_today(text: &str) -> bool {
    ["bu gün", "bugün", "today", "сегодня"]
        .iter()
        .any(|phrase| text.contains(phrase))
}

fn is_yesterday(text: &str) -> bool {
    ["dünən", "dunen", "yesterday", "вчера"]
        .iter()
        .any(|phrase| text.contains(phrase))
}

/// `"21 fevral"`, `"15 noy 2025"`, `"3 марта"`. A missing year means the most
/// recent occurrence that is not more than a day in the future.
fn day_month(text: &str, now: DateTime<FixedOffset>) -> Option<NaiveDate> {
    DAY_MONTH_RE.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        match caps.get(3) {
            Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
            None => {
                let candidate = NaiveDate::from_ymd_opt(now.year(), month, day)?;
                if candidate > now.date_naive() + Duration::days(1) {
                    NaiveDate::from_ymd_opt(now.year() - 1, month, day)
                } else {
                    Some(candidate)
                }
            }
        }
    })
}

/// Map a month word in Azerbaijani, English or Russian (full or abbreviated) to 1..=12.
fn month_number(word: &str) -> Option<u32> {
    match word {
        "iyun" | "june" => return Some(6),
        "iyul" | "july" => return Some(7),
        _ => {}
    }
    let prefix: String = word.chars().take(3).collect();
    let month = match prefix.as_str() {
        "yan" | "jan" | "янв" => 1,
        "fev" | "feb" | "фев" => 2,
        "mar" | "мар" => 3,
        "apr" | "апр" => 4,
        "may" | "мая" | "май" => 5,
        "iyn" | "jun" | "июн" => 6,
        "iyl" | "jul" | "июл" => 7,
        "avq" | "aug" | "авг" => 8,
        "sen" | "sep" | "сен" => 9,
        "okt" | "oct" | "окт" => 10,
        "noy" | "nov" | "ноя" => 11,
        "dek" | "dec" | "дек" => 12,
        _ => return None,
    };
    Some(month)
}
