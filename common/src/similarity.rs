//! 文字列類似度（0-100の整数スコア）
//!
//! 照合ロジックは `Similarity` トレイト越しに類似度を使うので、
//! テストや別アルゴリズムへの差し替えができる。

use std::collections::BTreeSet;

use crate::normalize::tokens;

/// 類似度の計算方式
///
/// `similarity` と `partial_similarity` だけ実装すれば、
/// トークン単位の比較は既定実装で得られる。
pub trait Similarity {
    /// 文字列全体の類似度。空文字列を含む場合は0、完全一致は100
    fn similarity(&self, a: &str, b: &str) -> u8;

    /// 短い方が長い方のどこかに含まれる度合い
    fn partial_similarity(&self, needle: &str, haystack: &str) -> u8;

    /// トークンを並べ替えてから比較（語順の違いを無視）
    fn token_sort_similarity(&self, a: &str, b: &str) -> u8 {
        self.similarity(&sorted_tokens(a), &sorted_tokens(b))
    }

    /// トークン集合の共通部分と差分で比較（重複・語順を無視）
    fn token_set_similarity(&self, a: &str, b: &str) -> u8 {
        let left: BTreeSet<&str> = tokens(a).collect();
        let right: BTreeSet<&str> = tokens(b).collect();
        if left.is_empty() || right.is_empty() {
            return 0;
        }

        let common = join(left.intersection(&right));
        let with_left = join_after(&common, left.difference(&right));
        let with_right = join_after(&common, right.difference(&left));

        self.similarity(&common, &with_left)
            .max(self.similarity(&common, &with_right))
            .max(self.similarity(&with_left, &with_right))
    }
}

/// 編集距離ベースの類似度（strsim）
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzySimilarity;

impl Similarity for FuzzySimilarity {
    fn similarity(&self, a: &str, b: &str) -> u8 {
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        if a == b {
            return 100;
        }
        percent(strsim::normalized_levenshtein(a, b))
    }

    fn partial_similarity(&self, needle: &str, haystack: &str) -> u8 {
        if needle.is_empty() || haystack.is_empty() {
            return 0;
        }
        let (short, long) = if needle.chars().count() > haystack.chars().count() {
            (haystack, needle)
        } else {
            (needle, haystack)
        };
        if long.contains(short) {
            return 100;
        }

        // 文字単位の窓は無関係な短い語でも高得点になるため、トークン境界に揃える
        let mut short_tokens: Vec<&str> = tokens(short).collect();
        let mut long_tokens: Vec<&str> = tokens(long).collect();
        if short_tokens.is_empty() || long_tokens.is_empty() {
            return 0;
        }
        if short_tokens.len() > long_tokens.len() {
            std::mem::swap(&mut short_tokens, &mut long_tokens);
        }

        long_tokens
            .windows(short_tokens.len())
            .map(|window| aligned_score(&short_tokens, window))
            .max()
            .unwrap_or(0)
    }
}

/// 位置を揃えたトークン同士の編集距離の合計から算出
fn aligned_score(left: &[&str], right: &[&str]) -> u8 {
    let (distance, length) = left
        .iter()
        .zip(right)
        .fold((0usize, 0usize), |(d, l), (a, b)| {
            (
                d + strsim::levenshtein(a, b),
                l + a.chars().count().max(b.chars().count()),
            )
        });
    if length == 0 {
        return 0;
    }
    percent(1.0 - distance as f64 / length as f64)
}

fn percent(ratio: f64) -> u8 {
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

fn sorted_tokens(text: &str) -> String {
    let mut parts: Vec<&str> = tokens(text).collect();
    parts.sort_unstable();
    parts.join(" ")
}

fn join<'a, 'b: 'a>(parts: impl Iterator<Item = &'a &'b str>) -> String {
    parts.copied().collect::<Vec<_>>().join(" ")
}

fn join_after<'a, 'b: 'a>(head: &str, rest: impl Iterator<Item = &'a &'b str>) -> String {
    let tail = join(rest);
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail,
        (_, true) => head.to_string(),
        _ => format!("{} {}", head, tail),
    }
}
