use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Raw fields pulled out of a transcript before normalization. All free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFields {
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub guests: Option<String>,
    pub special_requests: Option<String>,
}

/// A reservation with every field resolved to its structured form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedReservation {
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub date: NaiveDate,
    /// 24-hour "HH:MM".
    pub time: String,
    pub guests: i64,
    pub special_requests: Option<String>,
}

/// Result of normalizing extracted fields. Malformed input never errors;
/// anything ambiguous is routed to staging instead of guessed at.
#[derive(Debug, Clone)]
pub enum Outcome {
    Ready(NormalizedReservation),
    Staged { reason: String },
    /// The transcript carried no reservation signal at all (pure hours/menu
    /// inquiries and the like). Log the call, stage nothing.
    NoReservation,
}

fn re(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

// ── Extraction ──

/// Scan a transcript for reservation fields. Pure; no validation happens
/// here, that is `normalize`'s job.
pub fn extract_fields(transcript: &str) -> RawFields {
    static NAME: OnceLock<Regex> = OnceLock::new();
    static PHONE: OnceLock<Regex> = OnceLock::new();
    static DATE: OnceLock<Regex> = OnceLock::new();
    static TIME: OnceLock<Regex> = OnceLock::new();
    static GUESTS: OnceLock<Regex> = OnceLock::new();
    static SPECIAL: OnceLock<Regex> = OnceLock::new();
    static NO_SPECIAL: OnceLock<Regex> = OnceLock::new();

    let mut raw = RawFields::default();

    let name_re = re(
        &NAME,
        r"(?i)\b(?:my name is|this is|i am|i'm)\s+([A-Za-z]+(?:\s+[A-Za-z]+)?)",
    );
    if let Some(caps) = name_re.captures(transcript) {
        raw.guest_name = Some(caps[1].trim().to_string());
    }

    let phone_re = re(&PHONE, r"(\+?\d[\d\s\-\.]{5,}\d)");
    if let Some(caps) = phone_re.captures(transcript) {
        raw.guest_phone = Some(caps[1].to_string());
    }

    let date_re = re(
        &DATE,
        r"(?ix)\b(
            today | tomorrow | day\ after\ tomorrow
            | (?:in|after)\s+\d+\s+days?
            | (?:next\s+|this\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)
            | \d{4}-\d{2}-\d{2}
            | \d{1,2}[/-]\d{1,2}[/-]\d{2,4}
            | \d{1,2}\s+(?:january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)(?:\s+\d{4})?
        )\b",
    );
    if let Some(caps) = date_re.captures(transcript) {
        raw.date = Some(caps[1].to_string());
    }

    // A bare number never counts as a time ("20" in "the 20th" is not 8pm);
    // it needs minutes, a meridiem, or an o'clock form.
    let time_re = re(
        &TIME,
        r"(?ix)\b(
            \d{1,2}:\d{2}\s*(?:am|pm)?
            | \d{1,2}\s*(?:am|pm)
            | (?:one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)
              \s*o'?clock(?:\s+(?:in\s+the\s+)?(?:morning|afternoon|evening|night))?
            | noon | midday | midnight
        )\b",
    );
    if let Some(caps) = time_re.captures(transcript) {
        raw.time = Some(caps[1].to_string());
    }

    let guests_re = re(
        &GUESTS,
        r"(?ix)\b(?:
            (-?\d{1,3}|zero|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)
            \s*(?:people|guests|persons|pax)
            | (?:party\ of|table\ for)\s+(-?\d{1,3}|zero|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)
        )\b",
    );
    if let Some(caps) = guests_re.captures(transcript) {
        raw.guests = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string());
    }

    let no_special = re(&NO_SPECIAL, r"(?i)\b(?:no|nothing)\s+special\b");
    let special_re = re(
        &SPECIAL,
        r"(?i)\b(birthday|anniversary|vegan|vegetarian|allergic|allergy|gluten|wheelchair|window\s+seat|outdoor)\b",
    );
    if !no_special.is_match(transcript) {
        if let Some(caps) = special_re.captures(transcript) {
            raw.special_requests = Some(caps[1].to_lowercase());
        }
    }

    raw
}

// ── Normalization ──

/// Resolve extracted fields into a structured reservation, or decide to
/// stage them. `today` is the call's date, used as the anchor for relative
/// expressions. Never panics or errors on malformed input.
pub fn normalize(raw: &RawFields, today: NaiveDate) -> Outcome {
    if raw.guest_name.is_none() && raw.date.is_none() && raw.time.is_none() {
        return Outcome::NoReservation;
    }

    let staged = |reason: String| Outcome::Staged { reason };

    let Some(guest_name) = raw.guest_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    else {
        return staged("guest name missing".to_string());
    };

    let date = match raw.date.as_deref() {
        None => return staged("date missing".to_string()),
        Some(expr) => match normalize_date(expr, today) {
            Some(d) => d,
            None => return staged(format!("date not understood: {expr}")),
        },
    };

    let time = match raw.time.as_deref() {
        None => return staged("time missing".to_string()),
        Some(expr) => match normalize_time(expr) {
            Some(t) => t,
            None => return staged(format!("time not understood: {expr}")),
        },
    };

    let guests = match raw.guests.as_deref() {
        None => return staged("guest count missing".to_string()),
        Some(expr) => match normalize_guests(expr) {
            Some(n) => n,
            None => return staged(format!("guest count not plausible: {expr}")),
        },
    };

    Outcome::Ready(NormalizedReservation {
        guest_name: guest_name.to_string(),
        guest_phone: raw.guest_phone.as_deref().and_then(clean_phone),
        date,
        time,
        guests,
        special_requests: raw.special_requests.clone(),
    })
}

/// Extraction + normalization in one step, for the webhook flow.
pub fn process_transcript(transcript: &str, today: NaiveDate) -> (RawFields, Outcome) {
    let raw = extract_fields(transcript);
    let outcome = normalize(&raw, today);
    (raw, outcome)
}

/// Map an informal time expression to 24-hour "HH:MM". Ambiguous input
/// (a bare hour with no meridiem) yields None, never a guess.
pub fn normalize_time(expr: &str) -> Option<String> {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    static WORDS: OnceLock<Regex> = OnceLock::new();

    let s = expr.trim().to_lowercase();

    match s.as_str() {
        "noon" | "midday" => return Some("12:00".to_string()),
        "midnight" => return Some("00:00".to_string()),
        _ => {}
    }

    // "7.30pm" is a dotted minutes separator, not punctuation to discard
    let condensed: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '.' { ':' } else { c })
        .collect();
    let numeric = re(&NUMERIC, r"^(\d{1,2})(?::(\d{2}))?(am|pm)?$");
    if let Some(caps) = numeric.captures(&condensed) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if minute > 59 {
            return None;
        }
        return match caps.get(3).map(|m| m.as_str()) {
            Some(meridiem) => {
                if !(1..=12).contains(&hour) {
                    return None;
                }
                let hour = match (meridiem, hour) {
                    ("am", 12) => 0,
                    ("pm", h) if h != 12 => h + 12,
                    (_, h) => h,
                };
                Some(format!("{hour:02}:{minute:02}"))
            }
            None => {
                // without a meridiem, only an explicit HH:MM is unambiguous
                if caps.get(2).is_none() || hour > 23 {
                    return None;
                }
                Some(format!("{hour:02}:{minute:02}"))
            }
        };
    }

    let words = re(
        &WORDS,
        r"^(one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s*(?:o'?\s?clock)?\s*(?:in\s+the\s+)?(morning|afternoon|evening|night|am|pm)?$",
    );
    let caps = words.captures(&s)?;
    let hour = word_number(&caps[1])? as u32;
    let meridiem = caps.get(2)?.as_str();
    let hour = match meridiem {
        // "twelve in the morning" / "twelve at night" both mean midnight
        "morning" | "am" => if hour == 12 { 0 } else { hour },
        "night" if hour == 12 => 0,
        // afternoon, evening, night, pm
        _ => if hour == 12 { 12 } else { hour + 12 },
    };
    Some(format!("{hour:02}:00"))
}

/// Map a free-text date expression to an absolute date, anchored on `today`.
pub fn normalize_date(expr: &str, today: NaiveDate) -> Option<NaiveDate> {
    static IN_DAYS: OnceLock<Regex> = OnceLock::new();
    static WEEKDAY: OnceLock<Regex> = OnceLock::new();

    let s = expr.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }
    if s.contains("day after tomorrow") {
        return Some(today + Duration::days(2));
    }

    if let Some(caps) = re(&IN_DAYS, r"^(?:in|after)\s+(\d+)\s+days?$").captures(&s) {
        // absurd offsets ("in 999999999 days") stage rather than overflow
        let days: i64 = caps[1].parse().ok()?;
        return today.checked_add_signed(Duration::try_days(days)?);
    }

    if let Some(caps) = re(
        &WEEKDAY,
        r"^(next|this)?\s*(monday|tuesday|wednesday|thursday|friday|saturday|sunday)$",
    )
    .captures(&s)
    {
        let target = match &caps[2] {
            "monday" => Weekday::Mon,
            "tuesday" => Weekday::Tue,
            "wednesday" => Weekday::Wed,
            "thursday" => Weekday::Thu,
            "friday" => Weekday::Fri,
            "saturday" => Weekday::Sat,
            _ => Weekday::Sun,
        };
        let mut ahead = (target.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if ahead == 0 {
            ahead = 7;
        }
        if caps.get(1).map(|m| m.as_str()) == Some("next") {
            ahead += 7;
        }
        return Some(today + Duration::days(ahead));
    }

    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d %b %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
            // "25/12/25" parses under %d/%m/%Y as year 0025; a 2-digit year
            // is ambiguous, so it stages instead
            if d.year() >= 1000 {
                return Some(d);
            }
        }
    }

    None
}

/// Coerce a guest-count expression to an integer. Values outside 1..=50 are
/// rejected, not clamped.
pub fn normalize_guests(expr: &str) -> Option<i64> {
    let s = expr.trim().to_lowercase();
    let n = s.parse::<i64>().ok().or_else(|| word_number(&s))?;
    (1..=50).contains(&n).then_some(n)
}

fn word_number(s: &str) -> Option<i64> {
    let n = match s {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        _ => return None,
    };
    Some(n)
}

/// Keep digits only; a plausible phone number has 7 to 15 of them.
pub fn clean_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (7..=15).contains(&digits.len()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // ── time ──

    #[test]
    fn test_time_am_pm_forms() {
        assert_eq!(normalize_time("7pm").as_deref(), Some("19:00"));
        assert_eq!(normalize_time("7am").as_deref(), Some("07:00"));
        assert_eq!(normalize_time("7:30 pm").as_deref(), Some("19:30"));
        assert_eq!(normalize_time("7.30pm").as_deref(), Some("19:30"));
        assert_eq!(normalize_time("12am").as_deref(), Some("00:00"));
        assert_eq!(normalize_time("12pm").as_deref(), Some("12:00"));
        assert_eq!(normalize_time("12:15 AM").as_deref(), Some("00:15"));
    }

    #[test]
    fn test_time_24h_kept() {
        assert_eq!(normalize_time("19:00").as_deref(), Some("19:00"));
        assert_eq!(normalize_time("00:30").as_deref(), Some("00:30"));
        assert_eq!(normalize_time("9:05").as_deref(), Some("09:05"));
    }

    #[test]
    fn test_time_words() {
        assert_eq!(
            normalize_time("seven o'clock in the evening").as_deref(),
            Some("19:00")
        );
        assert_eq!(normalize_time("seven oclock evening").as_deref(), Some("19:00"));
        assert_eq!(normalize_time("eleven in the morning").as_deref(), Some("11:00"));
        assert_eq!(normalize_time("twelve night").as_deref(), Some("00:00"));
        assert_eq!(normalize_time("noon").as_deref(), Some("12:00"));
        assert_eq!(normalize_time("midnight").as_deref(), Some("00:00"));
    }

    #[test]
    fn test_time_ambiguous_is_none() {
        // bare hour, no meridiem: could be 07:00 or 19:00
        assert_eq!(normalize_time("7"), None);
        assert_eq!(normalize_time("seven o'clock"), None);
        assert_eq!(normalize_time("25:00"), None);
        assert_eq!(normalize_time("13pm"), None);
        assert_eq!(normalize_time("7:75pm"), None);
        assert_eq!(normalize_time("sometime late"), None);
        assert_eq!(normalize_time(""), None);
    }

    // ── date ──

    #[test]
    fn test_date_relative() {
        let today = day("2025-06-16"); // a Monday
        assert_eq!(normalize_date("today", today), Some(today));
        assert_eq!(normalize_date("tomorrow", today), Some(day("2025-06-17")));
        assert_eq!(
            normalize_date("day after tomorrow", today),
            Some(day("2025-06-18"))
        );
        assert_eq!(normalize_date("in 5 days", today), Some(day("2025-06-21")));
        assert_eq!(normalize_date("after 2 days", today), Some(day("2025-06-18")));
    }

    #[test]
    fn test_date_huge_day_offset_is_none() {
        let today = day("2025-06-16");
        assert_eq!(normalize_date("in 999999999 days", today), None);
        assert_eq!(normalize_date("in 99999999999999999999 days", today), None);
    }

    #[test]
    fn test_date_weekdays() {
        let monday = day("2025-06-16");
        assert_eq!(normalize_date("friday", monday), Some(day("2025-06-20")));
        assert_eq!(normalize_date("this friday", monday), Some(day("2025-06-20")));
        assert_eq!(normalize_date("next friday", monday), Some(day("2025-06-27")));
        // same weekday rolls a full week forward
        assert_eq!(normalize_date("monday", monday), Some(day("2025-06-23")));
    }

    #[test]
    fn test_date_absolute() {
        let today = day("2025-06-16");
        assert_eq!(normalize_date("2025-12-25", today), Some(day("2025-12-25")));
        assert_eq!(normalize_date("25/12/2025", today), Some(day("2025-12-25")));
        assert_eq!(normalize_date("25-12-2025", today), Some(day("2025-12-25")));
        assert_eq!(normalize_date("25 Dec 2025", today), Some(day("2025-12-25")));
        assert_eq!(normalize_date("25 December 2025", today), Some(day("2025-12-25")));
    }

    #[test]
    fn test_date_unparsable_is_none() {
        let today = day("2025-06-16");
        assert_eq!(normalize_date("whenever works", today), None);
        assert_eq!(normalize_date("the 45th", today), None);
        assert_eq!(normalize_date("32/13/2025", today), None);
        assert_eq!(normalize_date("", today), None);
    }

    #[test]
    fn test_date_two_digit_year_is_none() {
        let today = day("2025-06-16");
        assert_eq!(normalize_date("25/12/25", today), None);
        assert_eq!(normalize_date("25-12-25", today), None);
        // the unambiguous 4-digit forms still parse
        assert_eq!(normalize_date("25/12/2025", today), Some(day("2025-12-25")));
    }

    // ── guests ──

    #[test]
    fn test_guests_digits_and_words() {
        assert_eq!(normalize_guests("4"), Some(4));
        assert_eq!(normalize_guests("four"), Some(4));
        assert_eq!(normalize_guests("twenty"), Some(20));
        assert_eq!(normalize_guests("50"), Some(50));
    }

    #[test]
    fn test_guests_out_of_range_rejected() {
        assert_eq!(normalize_guests("zero"), None);
        assert_eq!(normalize_guests("0"), None);
        assert_eq!(normalize_guests("-1"), None);
        assert_eq!(normalize_guests("51"), None);
        assert_eq!(normalize_guests("200"), None);
        assert_eq!(normalize_guests("a few"), None);
    }

    // ── phone ──

    #[test]
    fn test_clean_phone() {
        assert_eq!(clean_phone("+1 555-111-2222").as_deref(), Some("15551112222"));
        assert_eq!(clean_phone("123"), None);
        assert_eq!(clean_phone("12345678901234567890"), None);
    }

    // ── extraction ──

    #[test]
    fn test_extract_full_transcript() {
        let t = "Hi, my name is John Smith. I'd like a table for four tomorrow at 7pm. \
                 My number is 555 123 4567. It's a birthday dinner.";
        let raw = extract_fields(t);
        assert_eq!(raw.guest_name.as_deref(), Some("John Smith"));
        assert_eq!(raw.date.as_deref(), Some("tomorrow"));
        assert_eq!(raw.time.as_deref(), Some("7pm"));
        assert_eq!(raw.guests.as_deref(), Some("four"));
        assert_eq!(raw.special_requests.as_deref(), Some("birthday"));
        assert!(raw.guest_phone.is_some());
    }

    #[test]
    fn test_extract_ordinal_day_is_not_a_time() {
        let raw = extract_fields("see you on the 20 of the month");
        assert_eq!(raw.time, None);
    }

    #[test]
    fn test_extract_no_special_requests() {
        let raw = extract_fields("no special requests, thanks");
        assert_eq!(raw.special_requests, None);
    }

    #[test]
    fn test_extract_party_of() {
        let raw = extract_fields("party of 6 on friday at 8 pm, I am Dana");
        assert_eq!(raw.guests.as_deref(), Some("6"));
        assert_eq!(raw.date.as_deref(), Some("friday"));
        assert_eq!(raw.time.as_deref(), Some("8 pm"));
        assert_eq!(raw.guest_name.as_deref(), Some("Dana"));
    }

    // ── end to end ──

    #[test]
    fn test_normalize_ready() {
        let today = day("2025-06-16");
        let (_, outcome) = process_transcript(
            "my name is Alice, table for two tomorrow at 7pm",
            today,
        );
        match outcome {
            Outcome::Ready(r) => {
                assert_eq!(r.guest_name, "Alice");
                assert_eq!(r.date, day("2025-06-17"));
                assert_eq!(r.time, "19:00");
                assert_eq!(r.guests, 2);
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_ambiguous_time_stages() {
        let today = day("2025-06-16");
        let raw = RawFields {
            guest_name: Some("Alice".to_string()),
            date: Some("tomorrow".to_string()),
            time: Some("seven o'clock".to_string()),
            guests: Some("2".to_string()),
            ..Default::default()
        };
        assert!(matches!(normalize(&raw, today), Outcome::Staged { .. }));
    }

    #[test]
    fn test_normalize_bad_guest_count_stages() {
        let today = day("2025-06-16");
        for bad in ["zero", "-1"] {
            let raw = RawFields {
                guest_name: Some("Alice".to_string()),
                date: Some("tomorrow".to_string()),
                time: Some("7pm".to_string()),
                guests: Some(bad.to_string()),
                ..Default::default()
            };
            assert!(
                matches!(normalize(&raw, today), Outcome::Staged { .. }),
                "guest count {bad:?} should stage"
            );
        }
    }

    #[test]
    fn test_normalize_no_signal_is_not_staged() {
        let today = day("2025-06-16");
        let (_, outcome) = process_transcript("what are your opening hours?", today);
        assert!(matches!(outcome, Outcome::NoReservation));
    }

    #[test]
    fn test_normalize_missing_date_stages() {
        let today = day("2025-06-16");
        let (_, outcome) =
            process_transcript("my name is Bob, table for three at 6pm", today);
        assert!(matches!(outcome, Outcome::Staged { .. }));
    }
}
