//! Utility functions for notification channels

/// Truncate a string to at most `max_chars` characters, appending `suffix`
/// when anything was cut. Never splits a multi-byte character.
pub fn truncate_string(s: &str, max_chars: usize, suffix: &str) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}{}", &s[..idx], suffix),
    }
}

/// Normalize a phone number for messaging gateways.
///
/// Strips spaces, dashes and parentheses. Numbers without a leading `+` get
/// `country_code` (e.g. `"+91"`) prepended, unless they already start with
/// the country digits and are longer than a national number.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let phone: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if phone.starts_with('+') {
        return phone;
    }

    let cc_digits = country_code.trim_start_matches('+');
    if !cc_digits.is_empty() && phone.starts_with(cc_digits) && phone.len() > 10 {
        format!("+{phone}")
    } else {
        format!("+{cc_digits}{phone}")
    }
}

/// Capitalize the first letter of each `_`/space separated word.
pub fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Minimal HTML escaping for text interpolated into email bodies.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
