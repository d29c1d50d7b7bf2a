use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

struct DatePattern {
    regex: &'static LazyLock<Regex>,
    format: &'static str,
}

static RE_0: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d-\d{6})").unwrap());
static RE_1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d_\d{6})").unwrap());
static RE_2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}-(01|02|03|04|05|06|07|08|09|10|11|12)-[0-3]\d-\d{2}-\d{2}-\d{2})").unwrap());
static RE_3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}-(01|02|03|04|05|06|07|08|09|10|11|12)-[0-3]\d-\d{6})").unwrap());
static RE_4: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}(01|02|03|04|05|06|07|08|09|10|11|12)[0-3]\d{7})").unwrap());
static RE_5: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?P<date>(20|19|18)\d{2}_(01|02|03|04|05|06|07|08|09|10|11|12)_[0-3]\d_\d{2}_\d{2}_\d{2})").unwrap());

/// Camera/app conventions carrying a full timestamp.
static PATTERNS: &[DatePattern] = &[
    DatePattern { regex: &RE_0, format: "%Y%m%d-%H%M%S" },   // Screenshot_20190919-053857
    DatePattern { regex: &RE_1, format: "%Y%m%d_%H%M%S" },   // IMG_20190509_154733, PXL_...
    DatePattern { regex: &RE_2, format: "%Y-%m-%d-%H-%M-%S" },
    DatePattern { regex: &RE_3, format: "%Y-%m-%d-%H%M%S" }, // signal-2020-10-26-163832
    DatePattern { regex: &RE_4, format: "%Y%m%d%H%M%S" },
    DatePattern { regex: &RE_5, format: "%Y_%m_%d_%H_%M_%S" }, // 2016_01_30_11_49_15.mp4
];

/// WhatsApp names carry a date but no time: IMG-20140828-WA0001.jpg
static WHATSAPP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<y>(20|19|18)\d{2})(?P<m>01|02|03|04|05|06|07|08|09|10|11|12)(?P<d>[0-3]\d)-WA\d+")
        .unwrap()
});

/// Guess a timestamp embedded in a filename.
///
/// A match counts only when it forms a calendar-valid date; `20190231` falls
/// through to the next pattern rather than producing a bogus date.
pub fn guess_date_from_filename(filename: &str) -> Option<NaiveDateTime> {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    for pat in PATTERNS {
        if let Some(caps) = pat.regex.captures(basename) {
            if let Some(date_str) = caps.name("date") {
                // For the YYYYMMDDhhmmss pattern, only take first 14 chars
                let s = if pat.format == "%Y%m%d%H%M%S" {
                    &date_str.as_str()[..14.min(date_str.as_str().len())]
                } else {
                    date_str.as_str()
                };
                // parse_from_str enforces calendar validity, including
                // days-per-month and leap-year February.
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, pat.format) {
                    return Some(dt);
                }
            }
        }
    }

    if let Some(caps) = WHATSAPP_RE.captures(basename) {
        let y: i32 = caps.name("y")?.as_str().parse().ok()?;
        let m: u32 = caps.name("m")?.as_str().parse().ok()?;
        let d: u32 = caps.name("d")?.as_str().parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Guess from a full path's file name.
pub fn guess_date_from_path(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    guess_date_from_filename(name)
}
