use unicode_normalization::UnicodeNormalization;

/// Localized "edited" suffixes (lowercase). Google appends these to the name
/// of an edited copy while the sidecar keeps the unedited name.
pub const EXTRA_FORMATS: &[&str] = &[
    "-edited",      // EN
    "-effects",     // EN
    "-smile",       // EN
    "-mix",         // EN
    "-edytowane",   // PL
    "-bearbeitet",  // DE
    "-bewerkt",     // NL
    "-編集済み",     // JA
    "-modificato",  // IT
    "-modifié",     // FR
    "-ha editado",  // ES
    "-editado",     // ES (alternate)
    "-editat",      // CA
];

/// Shortest partial form of a truncated suffix token worth trying: the dash
/// plus at least one letter ("-e").
const MIN_PARTIAL_LEN: usize = 2;

fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Byte offset in `name` where a case-insensitive match of `token` ends the
/// string. Compared char by char so the offset is valid for `name` itself;
/// lowercasing a char of `name` must yield exactly the token char (a char
/// whose lowercase form expands, like `İ`, never matches).
fn ci_suffix_start(name: &str, token: &str) -> Option<usize> {
    let mut start = name.len();
    let mut chars = name.char_indices().rev();
    for t in token.chars().rev() {
        let (i, c) = chars.next()?;
        if !c.to_lowercase().eq(std::iter::once(t)) {
            return None;
        }
        start = i;
    }
    Some(start)
}

/// Check if a filename (without extension) carries an "edited" suffix.
pub fn is_extra(filename_without_ext: &str) -> bool {
    let name = normalize(filename_without_ext);
    EXTRA_FORMATS.iter().any(|extra| name.ends_with(extra))
}

/// Remove a complete edited suffix from a filename if present.
///
/// The suffix may sit before the extension (`a-edited.jpg`) or at the very
/// end of an extension-less name; comparison is NFC-normalized and
/// case-insensitive while the returned string keeps the original casing
/// elsewhere.
pub fn remove_extra(filename: &str) -> String {
    let normalized: String = filename.nfc().collect();
    for extra in EXTRA_FORMATS {
        // Token at the very end of an extension-less name.
        if let Some(pos) = ci_suffix_start(&normalized, extra) {
            return normalized[..pos].to_string();
        }
        // Token immediately before an extension dot, rightmost dot first.
        let dots: Vec<usize> = normalized
            .char_indices()
            .rev()
            .filter(|&(_, c)| c == '.')
            .map(|(i, _)| i)
            .collect();
        for dot in dots {
            if let Some(pos) = ci_suffix_start(&normalized[..dot], extra) {
                let mut result = normalized.clone();
                result.replace_range(pos..dot, "");
                return result;
            }
        }
    }
    normalized
}

/// Remove a prefix-truncated edited suffix (minimum 2 characters).
///
/// Google's 51-character cut can land mid-token, leaving e.g. `-edi` or
/// `-bear` at the end of a name. Tries the longest partial form first so
/// `-edited` is preferred over `-edi` when both would match.
pub fn remove_partial_extra(filename: &str) -> String {
    let normalized: String = filename.nfc().collect();

    // (start byte in `normalized`, matched char count)
    let mut best: Option<(usize, usize)> = None;
    for extra in EXTRA_FORMATS {
        let chars: Vec<char> = extra.chars().collect();
        for take in (MIN_PARTIAL_LEN..=chars.len()).rev() {
            let partial: String = chars[..take].iter().collect();
            if let Some(pos) = ci_suffix_start(&normalized, &partial) {
                if best.map_or(true, |(_, l)| take > l) {
                    best = Some((pos, take));
                }
                break;
            }
        }
    }

    match best {
        Some((pos, _)) => normalized[..pos].to_string(),
        None => normalized,
    }
}

/// Remove one or two trailing characters from a dash-suffixed stem, for the
/// truncation edge cases the partial strip cannot see (the cut left only
/// `-e` or a lone dash behind).
pub fn remove_dangling_suffix(stem: &str) -> Option<String> {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    if n >= 2 && chars[n - 2] == '-' {
        return Some(chars[..n - 2].iter().collect());
    }
    if n >= 1 && chars[n - 1] == '-' {
        return Some(chars[..n - 1].iter().collect());
    }
    None
}
