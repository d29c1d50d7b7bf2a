use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Localized prefixes: "<prefix>YYYY"
const YEAR_FOLDER_PREFIXES: &[&str] = &[
    "Photos from ",      // EN
    "Fotos von ",        // DE
    "Fotos aus ",        // DE (alternate)
    "Photos de ",        // FR
    "Fotos de ",         // ES, PT, CA
    "Foto's uit ",       // NL
    "Foto dal ",         // IT
    "Foto del ",         // IT (alternate)
    "Zdjęcia z ",        // PL
    "Фото за ",          // RU
    "Фотографии за ",    // RU (alternate)
    "Fotky z ",          // CS
    "Fotografii din ",   // RO
    "Foton från ",       // SV
    "Bilder fra ",       // NO
    "Billeder fra ",     // DA
    "Valokuvat ",        // FI
    "Fényképek - ",      // HU
    "Fotoğraflar ",      // TR
];

/// Localized suffixes: "YYYY<suffix>"
const YEAR_FOLDER_SUFFIXES: &[&str] = &[
    " 年の写真",   // JA
    "年のフォト",   // JA (alternate)
    "년의 사진",    // KO
    "年的照片",     // ZH-CN
    "年的相片",     // ZH-TW
];

static YEAR_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static YEAR_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<y>\d{4})-(?P<m>0[1-9]|1[0-2])$").unwrap());
static YEAR_PHOTOS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?P<y>\d{4}) photos$").unwrap());
static PHOTOS_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^photos from (?P<y>\d{4})$").unwrap());

/// Oldest year a photo folder can plausibly name (exclusive; 1800 itself is
/// treated as a placeholder, not a real capture year).
const MIN_YEAR: i32 = 1800;

fn max_year() -> i32 {
    Utc::now().year() + 2
}

fn in_bounds(year: i32) -> bool {
    year > MIN_YEAR && year <= max_year()
}

/// Extract (year, month) from a folder name, month defaulting to 1.
///
/// Accepts the case-insensitive "Photos from YYYY" / "YYYY Photos" / bare
/// "YYYY" / "YYYY-MM" shapes plus the localized Takeout year-folder
/// prefixes and suffixes. Out-of-bounds years yield None.
pub fn year_from_folder_name(name: &str) -> Option<(i32, u32)> {
    let name = name.trim();

    let year_str = if let Some(caps) = PHOTOS_FROM_RE.captures(name) {
        Some(caps.name("y")?.as_str().to_string())
    } else if let Some(caps) = YEAR_PHOTOS_RE.captures(name) {
        Some(caps.name("y")?.as_str().to_string())
    } else if YEAR_ONLY_RE.is_match(name) {
        Some(name.to_string())
    } else {
        YEAR_FOLDER_PREFIXES
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))
            .or_else(|| {
                YEAR_FOLDER_SUFFIXES
                    .iter()
                    .find_map(|suffix| name.strip_suffix(suffix))
            })
            .filter(|rest| YEAR_ONLY_RE.is_match(rest))
            .map(str::to_string)
    };

    if let Some(y) = year_str {
        let year: i32 = y.parse().ok()?;
        return in_bounds(year).then_some((year, 1));
    }

    if let Some(caps) = YEAR_MONTH_RE.captures(name) {
        let year: i32 = caps.name("y")?.as_str().parse().ok()?;
        let month: u32 = caps.name("m")?.as_str().parse().ok()?;
        return in_bounds(year).then_some((year, month));
    }

    None
}

/// True if a folder name matches a Takeout year-folder pattern (any bound
/// year counts, album names do not).
pub fn is_year_folder(name: &str) -> bool {
    year_from_folder_name(name).is_some()
}

/// Date from the enclosing folder of a media file, nearest ancestor first.
/// Missing month and day default to January 1st.
pub fn folder_date(media_path: &Path) -> Option<NaiveDateTime> {
    for ancestor in media_path.ancestors().skip(1) {
        let Some(name) = ancestor.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some((year, month)) = year_from_folder_name(name) {
            return NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_year_folders() {
        assert!(is_year_folder("Photos from 2023"));
        assert!(is_year_folder("photos from 2023"));
        assert!(is_year_folder("Fotos von 2021"));
        assert!(is_year_folder("2023 年の写真"));
        assert!(is_year_folder("2023년의 사진"));
        assert!(is_year_folder("2023 Photos"));
        assert!(is_year_folder("2023"));
        assert!(is_year_folder("2023-07"));
        assert!(!is_year_folder("My Vacation"));
        assert!(!is_year_folder("Photos from abcd"));
    }

    #[test]
    fn year_bounds() {
        assert_eq!(year_from_folder_name("Photos from 1800"), None);
        assert_eq!(year_from_folder_name("Photos from 1801"), Some((1801, 1)));
        let too_far = Utc::now().year() + 5;
        assert_eq!(year_from_folder_name(&format!("Photos from {too_far}")), None);
        assert_eq!(year_from_folder_name("Photos from 2005"), Some((2005, 1)));
    }

    #[test]
    fn year_month_folder() {
        assert_eq!(year_from_folder_name("2019-03"), Some((2019, 3)));
        assert_eq!(year_from_folder_name("2019-13"), None);
        assert_eq!(year_from_folder_name("2019-00"), None);
    }

    #[test]
    fn nearest_ancestor_wins() {
        let p = PathBuf::from("/takeout/Photos from 2019/2021/a.jpg");
        let dt = folder_date(&p).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2021-01-01");
    }

    #[test]
    fn defaults_to_january_first() {
        let p = PathBuf::from("/takeout/Photos from 2005/holiday.jpg");
        let dt = folder_date(&p).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2005-01-01 00:00:00");
    }

    #[test]
    fn no_year_anywhere() {
        assert!(folder_date(&PathBuf::from("/takeout/My Album/a.jpg")).is_none());
    }
}
