//! ファイル名・自由入力の正規化
//!
//! - 拡張子除去（既知のファイル拡張子のみ。"St.Louis" は残す）
//! - アクセント除去（NFKD分解＋結合文字除去、合字はASCII展開）
//! - 小文字化、英数字以外を区切り `_` に統一
//! - 生成ツールのプレフィックス（`DALL·E 2023-05-01 14.22.10 - `）除去
//! - 末尾の一意ID（8桁16進）除去。数字だけの日付（`_19221104`）は残す
//!
//! 不正な入力でも失敗しない。最悪の場合は空文字列を返す。

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 正規形の区切り文字
pub const SEPARATOR: char = '_';

/// 拡張子として扱う末尾（小文字）
const FILE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "heic", "heif", "avif", "svg",
    "txt", "json", "csv", "xlsx",
];

lazy_static! {
    // 英字で始まる1-5文字の拡張子のみ（"14.22.10" のような時刻は対象外）
    static ref EXTENSION_RE: Regex = Regex::new(r"\.([A-Za-z][A-Za-z0-9]{0,4})$").unwrap();
    // 正規化後の形で判定するので大文字小文字・記号の揺れを吸収できる
    static ref GENERATOR_PREFIX_RE: Regex =
        Regex::new(r"^dall_?e(?:_[23])?_\d{4}_\d{2}_\d{2}_\d{2}_\d{2}_\d{2}(?:_|$)").unwrap();
    static ref UNIQUE_ID_SUFFIX_RE: Regex = Regex::new(r"_([0-9a-f]{8})$").unwrap();
}

/// ファイル名または自由入力を比較用の正規形に変換する
///
/// # Examples
/// ```
/// use event_curator_common::normalize_query;
///
/// assert_eq!(
///     normalize_query("DALL·E 2023-05-01 14.22.10 - battle of hastings"),
///     "battle_of_hastings"
/// );
/// ```
pub fn normalize_query(raw: &str) -> String {
    let stem = strip_extension(raw.trim());
    let canonical = canonicalize(stem);
    let canonical = strip_generator_prefix(&canonical);
    strip_unique_id(canonical).trim_matches(SEPARATOR).to_string()
}

/// 拡張子を除去（正規化前の生文字列に対して）
///
/// 既知の拡張子のみ対象。自由入力中の "St.Louis" などはそのまま返す。
pub fn strip_extension(name: &str) -> &str {
    let Some(caps) = EXTENSION_RE.captures(name) else {
        return name;
    };
    let (Some(whole), Some(ext)) = (caps.get(0), caps.get(1)) else {
        return name;
    };
    let known = FILE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext.as_str()));
    if known && whole.start() > 0 {
        &name[..whole.start()]
    } else {
        name
    }
}

/// アクセント除去・小文字化・区切り統一のみ行う
///
/// 拡張子やプレフィックスは扱わない。レコード側のタイトルや
/// キーワードの正規化に使う。
pub fn canonicalize(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        for lower in c.to_lowercase().filter(|l| !is_combining_mark(*l)) {
            match transliterate(lower) {
                Some(ascii) => result.push_str(ascii),
                None if lower.is_ascii_alphanumeric() => result.push(lower),
                None => push_separator(&mut result),
            }
        }
    }

    result.trim_matches(SEPARATOR).to_string()
}

/// NFKDで分解されない文字のASCII表記
fn transliterate(c: char) -> Option<&'static str> {
    match c {
        'ß' => Some("ss"),
        'æ' => Some("ae"),
        'œ' => Some("oe"),
        'ø' => Some("o"),
        'đ' | 'ð' => Some("d"),
        'ł' => Some("l"),
        'þ' => Some("th"),
        'ı' => Some("i"),
        _ => None,
    }
}

/// 連続する区切りは1つにまとめる
fn push_separator(buf: &mut String) {
    if !buf.is_empty() && !buf.ends_with(SEPARATOR) {
        buf.push(SEPARATOR);
    }
}

fn strip_generator_prefix(canonical: &str) -> &str {
    match GENERATOR_PREFIX_RE.find(canonical) {
        Some(m) => &canonical[m.end()..],
        None => canonical,
    }
}

/// 末尾の8桁16進ID（`_3fa2c9b1`）を除去
///
/// 英単語と区別するため数字を含む場合のみ対象とする。
/// 数字だけのもの（`_19221104`）は日付として残す。
fn strip_unique_id(canonical: &str) -> &str {
    if let Some(caps) = UNIQUE_ID_SUFFIX_RE.captures(canonical) {
        let id = &caps[1];
        let has_digit = id.chars().any(|c| c.is_ascii_digit());
        let has_letter = id.chars().any(|c| c.is_ascii_alphabetic());
        if has_digit && has_letter {
            if let Some(m) = caps.get(0) {
                return &canonical[..m.start()];
            }
        }
    }
    canonical
}

/// 正規形をトークンに分割
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(|c: char| c == SEPARATOR || c.is_whitespace())
        .filter(|t| !t.is_empty())
}
