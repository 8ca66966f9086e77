//! Excel生成（照合レポート）

use super::ReportRow;
use crate::error::{CuratorError, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::path::Path;

const HEADERS: [(&str, f64); 6] = [
    ("ファイル", 48.0),
    ("イベントID", 14.0),
    ("タイトル", 48.0),
    ("スコア", 8.0),
    ("状態", 12.0),
    ("次点", 48.0),
];

pub fn generate_excel(rows: &[ReportRow], output_path: &Path, title: &str) -> Result<()> {
    let buffer = build_workbook(rows, title).map_err(CuratorError::ExcelGeneration)?;
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, buffer)?;
    Ok(())
}

fn build_workbook(rows: &[ReportRow], title: &str) -> std::result::Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));
    let value_format = Format::new()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));
    let rejected_format = value_format.clone().set_font_color(Color::RGB(0xB00020));

    let worksheet = workbook.add_worksheet();
    let sheet_name: String = title.chars().filter(|c| !"[]:*?/\\".contains(*c)).take(31).collect();
    if !sheet_name.is_empty() {
        worksheet
            .set_name(&sheet_name)
            .map_err(|e| format!("シート名設定エラー: {}", e))?;
    }

    for (col, (header, width)) in HEADERS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .set_column_width(col, *width)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
        worksheet
            .write_string_with_format(0, col, *header, &header_format)
            .map_err(|e| format!("見出し書き込みエラー: {}", e))?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let format = if row.matched_id.is_some() { &value_format } else { &rejected_format };
        let cells = [
            row.file_name.as_str(),
            row.matched_id.as_deref().unwrap_or(""),
            row.title.as_deref().unwrap_or(""),
        ];
        for (col, value) in cells.iter().enumerate() {
            worksheet
                .write_string_with_format(r, col as u16, *value, format)
                .map_err(|e| format!("値書き込みエラー: {}", e))?;
        }
        worksheet
            .write_number_with_format(r, 3, row.score as f64, format)
            .map_err(|e| format!("値書き込みエラー: {}", e))?;
        worksheet
            .write_string_with_format(r, 4, &row.status, format)
            .map_err(|e| format!("値書き込みエラー: {}", e))?;
        worksheet
            .write_string_with_format(r, 5, row.runner_up.as_deref().unwrap_or(""), format)
            .map_err(|e| format!("値書き込みエラー: {}", e))?;
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}
