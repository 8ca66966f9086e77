pub mod excel;

use crate::cli::ReportFormat;
use crate::error::Result;
use event_curator_common::{MatchResult, SubScores};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 照合・処理レポートの1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub file_name: String,
    pub matched_id: Option<String>,
    pub title: Option<String>,
    pub score: u8,
    pub status: String,
    /// 採用されなかった最上位候補（"タイトル (スコア)"）
    pub runner_up: Option<String>,
}

impl ReportRow {
    pub fn from_match(file_name: &str, result: &MatchResult, status: &str) -> Self {
        let matched_id = result.matched.as_ref().map(|r| r.id.clone());
        let runner_up = result
            .ranking
            .iter()
            .find(|c| Some(&c.record.id) != matched_id.as_ref())
            .map(|c| format!("{} ({})", c.record.display_title(), c.score));

        Self {
            file_name: file_name.to_string(),
            matched_id,
            title: result.matched.as_ref().map(|r| r.display_title()),
            score: result.score,
            status: status.to_string(),
            runner_up,
        }
    }
}

/// 照合結果の順位表示（順位は1始まり、入力順ではなくスコア順）
pub fn ranking_lines(result: &MatchResult) -> Vec<String> {
    result
        .ranking
        .iter()
        .enumerate()
        .flat_map(|(rank, candidate)| {
            [
                format!(
                    "  {}. {} [{}] スコア {}",
                    rank + 1,
                    candidate.record.display_title(),
                    candidate.record.date.as_deref().unwrap_or("日付なし"),
                    candidate.score
                ),
                format!("     {}", format_breakdown(&candidate.breakdown)),
            ]
        })
        .collect()
}

/// シグナル別スコアの1行表示（未計算は "-"）
pub fn format_breakdown(scores: &SubScores) -> String {
    let show = |v: Option<u8>| v.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "タイトル {} / 翻訳 {} / キーワード {} / 日付 {}",
        show(scores.title),
        show(scores.title_translated),
        show(scores.keyword),
        show(scores.date)
    )
}

fn output_path_for_format(output: &Path, title: &str, extension: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", title, extension))
    } else {
        output.with_extension(extension)
    }
}

pub fn save_json(rows: &[ReportRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(rows)?)?;
    Ok(())
}

/// レポートを書き出し、出力したパスを返す
pub fn export_report(
    rows: &[ReportRow],
    format: &ReportFormat,
    output: &Path,
    title: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if matches!(format, ReportFormat::Json | ReportFormat::Both) {
        let path = output_path_for_format(output, title, "json");
        save_json(rows, &path)?;
        println!("✔ JSON出力: {}", path.display());
        written.push(path);
    }

    if matches!(format, ReportFormat::Excel | ReportFormat::Both) {
        let path = output_path_for_format(output, title, "xlsx");
        println!("- Excelを生成中...");
        excel::generate_excel(rows, &path, title)?;
        println!("✔ Excel出力: {}", path.display());
        written.push(path);
    }

    Ok(written)
}
