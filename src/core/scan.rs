// src/core/scan.rs
//
// Hand-rolled scanners for the small token shapes the planning app prints:
// clock times, time ranges, digit runs, ISO dates. Everything here is total:
// no panics, `None` when the shape is absent.

use chrono::NaiveDate;

const DASHES: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

/// "6:05" / "06:05" → "06:05". Hours up to 29 (night turns run past midnight).
pub fn hhmm(s: &str) -> Option<String> {
    let chars: Vec<char> = s.trim().chars().collect();
    match time_at(&chars, 0) {
        Some((t, end)) if end == chars.len() => Some(t),
        _ => None,
    }
}

/// Minutes since midnight for a normalized "HH:MM".
pub fn minutes(t: &str) -> Option<u32> {
    let (h, m) = t.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if m >= 60 { return None; }
    Some(h * 60 + m)
}

/// First `HH:MM - HH:MM` in the text (any dash, optional spaces), normalized.
pub fn find_time_range(text: &str) -> Option<(String, String)> {
    let chars: Vec<char> = text.chars().collect();
    for i in 0..chars.len() {
        let Some((start, mut k)) = time_at(&chars, i) else { continue };
        while k < chars.len() && chars[k] == ' ' { k += 1; }
        if k >= chars.len() || !DASHES.contains(&chars[k]) { continue; }
        k += 1;
        while k < chars.len() && chars[k] == ' ' { k += 1; }
        if let Some((end, _)) = time_at(&chars, k) {
            return Some((start, end));
        }
    }
    None
}

/// A clock time starting exactly at `i`, bounded by non-digits on both sides.
/// Returns the normalized time and the index just past it.
fn time_at(chars: &[char], i: usize) -> Option<(String, usize)> {
    if i > 0 && chars[i - 1].is_ascii_digit() { return None; }
    let mut j = i;
    let mut h = 0u32;
    while j < chars.len() && j - i < 2 {
        let Some(d) = chars[j].to_digit(10) else { break };
        h = h * 10 + d;
        j += 1;
    }
    if j == i || j >= chars.len() || chars[j] != ':' { return None; }
    j += 1;
    if j + 2 > chars.len() { return None; }
    let m1 = chars[j].to_digit(10)?;
    let m2 = chars[j + 1].to_digit(10)?;
    j += 2;
    if j < chars.len() && chars[j].is_ascii_digit() { return None; }
    let m = m1 * 10 + m2;
    if h > 29 || m >= 60 { return None; }
    Some((format!("{h:02}:{m:02}"), j))
}

/// `DDDDDD-DDDDDD`, nothing else.
pub fn is_changed_reserve(s: &str) -> bool {
    let b = s.trim().as_bytes();
    b.len() == 13
        && b[6] == b'-'
        && b[..6].iter().all(u8::is_ascii_digit)
        && b[7..].iter().all(u8::is_ascii_digit)
}

/// First maximal run of ASCII digits whose length lies in `min..=max`.
pub fn digit_run(s: &str, min: usize, max: usize) -> Option<String> {
    let mut run = s!();
    for ch in s.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() {
            run.push(ch);
            continue;
        }
        if (min..=max).contains(&run.len()) {
            return Some(run);
        }
        run.clear();
    }
    None
}

/// First `YYYY-MM-DD` token that is also a real calendar date.
pub fn find_iso_date(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    if b.len() < 10 { return None; }
    for i in 0..=b.len() - 10 {
        if i > 0 && b[i - 1].is_ascii_digit() { continue; }
        let w = &b[i..i + 10];
        let shape = w.iter().enumerate().all(|(k, c)| match k {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        });
        if !shape { continue; }
        if b.get(i + 10).is_some_and(u8::is_ascii_digit) { continue; }
        // ASCII-only window, so the slice is on char boundaries.
        if let Ok(d) = NaiveDate::parse_from_str(&s[i..i + 10], "%Y-%m-%d") {
            return Some(d);
        }
    }
    None
}
