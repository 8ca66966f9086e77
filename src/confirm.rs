//! 照合結果の確認
//!
//! `link` は照合結果をそのまま採用せず、`Confirmer` に判断を委ねる。

use crate::error::{CuratorError, Result};
use dialoguer::Input;
use event_curator_common::{EventRecord, MatchResult};

/// 確認の結果
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// このイベントに紐付ける
    Accept(EventRecord),
    /// キーワードを指定して照合し直す
    Manual(String),
    /// この画像をスキップ
    Skip,
    /// 残りをすべて中断
    Quit,
}

pub trait Confirmer {
    fn decide(&mut self, file_name: &str, result: &MatchResult) -> Result<Decision>;
}

/// 閾値を超えた照合だけを採用する
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirmer;

impl Confirmer for AutoConfirmer {
    fn decide(&mut self, _file_name: &str, result: &MatchResult) -> Result<Decision> {
        Ok(match &result.matched {
            Some(record) => Decision::Accept(record.clone()),
            None => Decision::Skip,
        })
    }
}

/// 端末で1件ずつ確認する
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveConfirmer;

impl Confirmer for InteractiveConfirmer {
    fn decide(&mut self, file_name: &str, result: &MatchResult) -> Result<Decision> {
        println!("\n🖼  {}", file_name);
        if result.ranking.is_empty() {
            println!("  候補なし");
        }
        for (i, candidate) in result.ranking.iter().enumerate() {
            let marker = if i == 0 && result.is_match() { "★" } else { " " };
            println!(
                "  {}{}. {} [{}] ({})",
                marker,
                i + 1,
                candidate.record.display_title(),
                candidate.record.date.as_deref().unwrap_or("日付なし"),
                candidate.score
            );
        }

        let prompt = if result.is_match() {
            "番号で選択 (Enter:★を採用 s:スキップ q:終了 その他:キーワード)"
        } else {
            "番号で選択 (Enter/s:スキップ q:終了 その他:キーワード)"
        };
        let input: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| CuratorError::Prompt(e.to_string()))?;

        Ok(parse_answer(&input, result))
    }
}

/// 入力文字列を判断に変換
pub fn parse_answer(input: &str, result: &MatchResult) -> Decision {
    let trimmed = input.trim();
    match trimmed {
        "" => match &result.matched {
            Some(record) => Decision::Accept(record.clone()),
            None => Decision::Skip,
        },
        "s" | "S" => Decision::Skip,
        "q" | "Q" => Decision::Quit,
        _ => match trimmed.parse::<usize>() {
            Ok(n) if (1..=result.ranking.len()).contains(&n) => {
                Decision::Accept(result.ranking[n - 1].record.clone())
            }
            _ => Decision::Manual(trimmed.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_curator_common::{match_event, MatchConfig, MatchMode};

    fn result(threshold: u8) -> MatchResult {
        let candidates = vec![
            EventRecord::new("1", "Prise de la Bastille"),
            EventRecord::new("2", "Fête de la Fédération"),
        ];
        match_event(
            "prise_de_la_bastille",
            &candidates,
            &MatchConfig::new(MatchMode::WholeString, threshold),
        )
        .unwrap()
    }

    #[test]
    fn test_auto_confirmer() {
        let mut confirmer = AutoConfirmer;
        match confirmer.decide("x.png", &result(60)).unwrap() {
            Decision::Accept(record) => assert_eq!(record.id, "1"),
            other => panic!("unexpected: {:?}", other),
        }
        // 100を超えるスコアはないので閾値100では採用されない
        assert_eq!(confirmer.decide("x.png", &result(100)).unwrap(), Decision::Skip);
    }

    #[test]
    fn test_parse_answer_default() {
        assert!(matches!(parse_answer("", &result(60)), Decision::Accept(r) if r.id == "1"));
        assert_eq!(parse_answer("  ", &result(100)), Decision::Skip);
    }

    #[test]
    fn test_parse_answer_pick_alternative() {
        assert!(matches!(parse_answer("2", &result(60)), Decision::Accept(r) if r.id == "2"));
        // 範囲外の番号はキーワード扱い
        assert_eq!(parse_answer("9", &result(60)), Decision::Manual("9".into()));
    }

    #[test]
    fn test_parse_answer_commands() {
        assert_eq!(parse_answer("s", &result(60)), Decision::Skip);
        assert_eq!(parse_answer("Q", &result(60)), Decision::Quit);
        assert_eq!(
            parse_answer(" bastille 1789 ", &result(60)),
            Decision::Manual("bastille 1789".into())
        );
    }
}
