// src/core/sanitize.rs

/// Collapse whitespace runs (NBSP included) into single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Break an element's text content into its visible lines.
/// Each line is whitespace-normalized; blank lines are dropped.
pub fn text_lines(s: &str) -> Vec<String> {
    s.split(['\n', '\r'])
        .map(normalize_ws)
        .filter(|l| !l.is_empty())
        .collect()
}

/// First whitespace-separated token of a display name ("Anna Svensson" → "Anna").
pub fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or("")
}

/// Split on the first whitespace run: "Lokförare Malmö C" → ("Lokförare", "Malmö C").
pub fn split_first_ws(s: &str) -> (String, String) {
    let t = s.trim();
    match t.find(char::is_whitespace) {
        Some(i) => (t[..i].to_string(), normalize_ws(&t[i..])),
        None => (t.to_string(), s!()),
    }
}

/// Turn a person name into a safe file stem; falls back when nothing survives.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_us = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() { out.push(ch); last_us = false; }
        else if ch.is_whitespace() { if !last_us { out.push('_'); last_us = true; } }
        else if ch=='-' || ch=='_' { if !(last_us && ch=='_') { out.push(ch); } last_us = ch=='_'; }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { fallback.to_string() } else { out }
}
