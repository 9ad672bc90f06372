// src/specs/turn_code.rs
//
// Turn codes are the compact shift ids printed on each roster entry.
//
//   51284A        5 → location, 2 → country (even = B), 8 → reserve, A → overnight 1
//   51284TP       same, changed by planning
//   123456-123456 changed reserve: no location in the code at all
//   Reserv Lund  reserve, nothing else readable
//
// `decode` is pure and total. It never consults the location cache; callers
// fall back to the cache when the result carries no location.

use serde::{Deserialize, Serialize};

use crate::config::options::Vocabulary;
use crate::core::scan::is_changed_reserve;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overnight {
    /// Suffix starting with 'A'.
    First,
    /// Suffix starting with 'B'.
    Second,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInfo {
    pub loc: String,
    pub loc_name: String,
    pub country: String,
    pub is_reserve: bool,
    pub overnight: Option<Overnight>,
    pub is_changed: bool,
}

impl TurnInfo {
    /// `DDDDDD-DDDDDD`: reserve and changed, but with nothing to locate it by.
    pub fn is_changed_reserve(&self) -> bool {
        self.is_reserve && self.is_changed && self.loc.is_empty()
    }

    /// A decode good enough to stand on its own (and to be remembered).
    pub fn has_location(&self) -> bool {
        !self.loc.is_empty()
    }
}

pub fn decode(raw: &str, vocab: &Vocabulary) -> TurnInfo {
    let code = raw.trim();
    let mut out = TurnInfo::default();

    if code.is_empty() || vocab.is_none_sentinel(code) {
        return out;
    }
    if starts_with_ci(code, &vocab.reserve_prefix) {
        out.is_reserve = true;
        return out;
    }
    if is_changed_reserve(code) {
        out.is_reserve = true;
        out.is_changed = true;
        return out;
    }

    let mut body = code;
    if let Some(rest) = strip_suffix_ci(code, &vocab.changed_suffix) {
        out.is_changed = true;
        body = rest.trim_end();
    }

    let Some((digits, suffix)) = split_shape(body) else { return out };

    out.loc = digits[0].to_string();
    out.loc_name = vocab.location_name(&out.loc).unwrap_or_default().to_string();
    out.country = match digits[2].to_digit(10) {
        Some(d) if d % 2 == 0 => vocab.country_b.clone(),
        Some(_) => vocab.country_a.clone(),
        None => s!(),
    };
    out.is_reserve = matches!(digits[3], '8' | '9');
    out.overnight = match suffix.chars().next() {
        Some('A') => Some(Overnight::First),
        Some('B') => Some(Overnight::Second),
        _ => None,
    };
    out
}

/// Key for the fixed-time table: upper case, changed suffix dropped.
pub fn normalize(raw: &str, vocab: &Vocabulary) -> String {
    let t = raw.trim();
    let t = strip_suffix_ci(t, &vocab.changed_suffix).unwrap_or(t);
    t.trim().to_uppercase()
}

/// Does this roster line look like a turn code at all?
pub fn looks_like_turn_code(line: &str, vocab: &Vocabulary) -> bool {
    let t = line.trim();
    if t.is_empty() { return false; }
    if starts_with_ci(t, &vocab.reserve_prefix) || is_changed_reserve(t) {
        return true;
    }
    if split_shape(t).is_some() {
        return true;
    }
    // "1234TP", "KURSTP": one token with something before the suffix.
    match strip_suffix_ci(t, &vocab.changed_suffix) {
        Some(rest) => !rest.trim().is_empty() && !t.contains(char::is_whitespace),
        None => false,
    }
}

/// `^(\d)(\d)(\d)(\d)(\d)([A-Z]{1,2})?$` without a regex.
fn split_shape(s: &str) -> Option<([char; 5], &str)> {
    let mut digits = ['0'; 5];
    let mut it = s.char_indices();
    for d in digits.iter_mut() {
        let (_, c) = it.next()?;
        if !c.is_ascii_digit() { return None; }
        *d = c;
    }
    let rest = &s[5.min(s.len())..];
    let ok = rest.len() <= 2 && rest.chars().all(|c| c.is_ascii_uppercase());
    ok.then_some((digits, rest))
}

fn starts_with_ci(s: &str, prefix: &str) -> bool {
    if prefix.is_empty() { return false; }
    let n = prefix.chars().count();
    let head: String = s.chars().take(n).collect();
    head.to_lowercase() == prefix.to_lowercase()
}

fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if suffix.is_empty() { return None; }
    let n = suffix.chars().count();
    let (idx, _) = s.char_indices().rev().nth(n - 1)?;
    (s[idx..].to_lowercase() == suffix.to_lowercase()).then(|| &s[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v() -> Vocabulary { Vocabulary::default() }

    #[test]
    fn reserve_with_overnight_suffix() {
        let t = decode("51284A", &v());
        assert_eq!(t.loc, "5");
        assert_eq!(t.loc_name, "Göteborg");
        assert!(t.is_reserve);
        assert_eq!(t.overnight, Some(Overnight::First));
        assert_eq!(t.country, "DK"); // third digit 2 is even
        assert!(!t.is_changed);
    }

    #[test]
    fn odd_third_digit_is_country_a() {
        let t = decode("13105", &v());
        assert_eq!(t.country, "SE");
        assert!(!t.is_reserve);
        assert_eq!(t.overnight, None);
    }

    #[test]
    fn changed_reserve_has_no_location() {
        let t = decode("123456-123456", &v());
        assert!(t.is_reserve && t.is_changed);
        assert!(t.loc.is_empty() && t.loc_name.is_empty());
        assert!(t.is_changed_reserve());
    }

    #[test]
    fn tp_suffix_keeps_decoding() {
        let t = decode("31190BTP", &v());
        assert!(t.is_changed);
        assert_eq!(t.loc, "3");
        assert_eq!(t.overnight, Some(Overnight::Second));
        assert!(t.is_reserve);
        assert!(decode("kurstp", &v()).is_changed);
    }

    #[test]
    fn reserve_prefix_and_sentinels() {
        let r = decode("Reserv Malmö", &v());
        assert!(r.is_reserve && r.loc.is_empty());
        assert_eq!(decode("none", &v()), TurnInfo::default());
        assert_eq!(decode("   ", &v()), TurnInfo::default());
    }

    #[test]
    fn unclassified_codes_stay_empty() {
        for raw in ["UTB", "5128", "512845", "51284abc", "51284ABC", "Möte 10:00", "ÅÄÖ51284"] {
            assert_eq!(decode(raw, &v()), TurnInfo::default(), "{raw}");
        }
    }

    #[test]
    fn never_panics_on_odd_input() {
        for raw in ["TP", "tp", "-", "123456-", "€€€€€", "5\u{301}1284", "reserv", "99999ZZTP"] {
            let _ = decode(raw, &v());
            let _ = normalize(raw, &v());
            let _ = looks_like_turn_code(raw, &v());
        }
    }

    #[test]
    fn normalize_and_shape() {
        assert_eq!(normalize(" til3tp ", &v()), "TIL3");
        assert!(looks_like_turn_code("51284A", &v()));
        assert!(looks_like_turn_code("TIL3TP", &v()));
        assert!(!looks_like_turn_code("Lokförare", &v()));
        assert!(!looks_like_turn_code("Anna Stopp", &v()));
    }
}
