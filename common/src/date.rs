//! 日付文字列から年を取り出す
//!
//! 対応形式: `1066-10-14` / `1066` / `-0044-03-15`（紀元前） /
//! `+1066-10-14T00:00:00Z`（Wikidataの時刻値） / `44 BC` / `52 av. J.-C.`

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref YEAR_RE: Regex = Regex::new(r"^\s*([+-]?)(\d{1,6})(?:[-/T\s.]|$)").unwrap();
    static ref BEFORE_ERA_RE: Regex =
        Regex::new(r"(?i)\b(?:bce?|b\.c\.|av\.?\s*j\.?-?\s*c\.?)\s*$").unwrap();
}

/// 年を取り出す。解釈できなければNone
pub fn parse_year(date: &str) -> Option<i32> {
    let caps = YEAR_RE.captures(date)?;
    let year: i32 = caps[2].parse().ok()?;
    if &caps[1] == "-" || BEFORE_ERA_RE.is_match(date) {
        Some(-year)
    } else {
        Some(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("1066-10-14"), Some(1066));
        assert_eq!(parse_year("1922"), Some(1922));
        assert_eq!(parse_year("-0044-03-15"), Some(-44));
        assert_eq!(parse_year("+1789-07-14T00:00:00Z"), Some(1789));
        assert_eq!(parse_year("1429/05/08"), Some(1429));
    }

    #[test]
    fn test_parse_year_era_suffix() {
        assert_eq!(parse_year("44 BC"), Some(-44));
        assert_eq!(parse_year("52 av. J.-C."), Some(-52));
        assert_eq!(parse_year("2560 av J-C"), Some(-2560));
        assert_eq!(parse_year("800 apr. J.-C."), Some(800));
    }

    #[test]
    fn test_parse_year_invalid() {
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("inconnue"), None);
        assert_eq!(parse_year("12ab"), None);
    }
}
