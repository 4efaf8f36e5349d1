use regex::Regex;
use std::sync::LazyLock;

static NON_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D").unwrap());

fn digits(input: &str) -> String {
    NON_DIGIT_RE.replace_all(input, "").into_owned()
}

/// Normalize user input to the `+1XXXXXXXXXX` wire form.
///
/// Ten digits get a `+1` prefix, eleven digits starting with `1` get a `+`.
/// Anything else is passed through trimmed; rejecting it is the form layer's job.
pub fn normalize_phone(input: &str) -> String {
    let d = digits(input);
    match d.len() {
        10 => format!("+1{}", d),
        11 if d.starts_with('1') => format!("+{}", d),
        _ => input.trim().to_string(),
    }
}

/// `+14155552671` → `+1 (415) 555-2671`. Other shapes are returned as-is.
pub fn format_phone_for_display(phone: &str) -> String {
    let d = digits(phone);
    if d.len() == 11 && d.starts_with('1') {
        format!("+1 ({}) {}-{}", &d[1..4], &d[4..7], &d[7..])
    } else {
        phone.to_string()
    }
}
