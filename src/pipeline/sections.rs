//! Section scanning: list the section titles a model response contains.
//!
//! Responses are never rewritten. This module only *reads* them, so the run
//! summary can say which of the requested sections the model actually
//! produced. Models mark sections either as ATX headings (`## Patient
//! Summary`) or as bold label lines (`**Patient Information:**`); both are
//! recognised, and stray bold markers inside headings are stripped.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}(?:\*\*)?(#{1,6})[ \t]+(.+?)[ \t#\r]*$").unwrap());

static RE_BOLD_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\*\*([^*#\n][^*\n]*?):?\*\*:?[ \t\r]*$").unwrap());

/// Section titles in document order, without `#`/`**` markup.
pub fn find_sections(markdown: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    for caps in RE_HEADING.captures_iter(markdown) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((start, clean_title(&caps[2])));
    }
    for caps in RE_BOLD_LABEL.captures_iter(markdown) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((start, clean_title(&caps[1])));
    }

    found.sort_by_key(|(pos, _)| *pos);
    found
        .into_iter()
        .map(|(_, title)| title)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whether `markdown` has a section whose title starts with `title`
/// (case-insensitive), e.g. `"Patient Information"` matches
/// `"### Patient Information (Demographics)"`.
pub fn has_section(markdown: &str, title: &str) -> bool {
    let wanted = title.trim().to_lowercase();
    find_sections(markdown)
        .iter()
        .any(|t| t.to_lowercase().starts_with(&wanted))
}

fn clean_title(raw: &str) -> String {
    raw.replace("**", "").trim().trim_end_matches(':').trim().to_string()
}
