//! リネームテスト
//!
//! 実ファイルを使って clean / events のリネームを検証

use event_curator::rename::{self, content_id};
use event_curator_common::{EventMatcher, EventRecord, MatchConfig, MatchMode};
use std::fs;
use tempfile::tempdir;

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// 整理は2回目以降なにも変えない
#[test]
fn test_clean_folder_idempotent() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("Prise de la Bastille (1).PNG"), b"bastille").unwrap();
    fs::write(dir.path().join("notes.txt"), b"text").unwrap();

    let first = rename::clean_folder(dir.path(), false).unwrap();
    assert_eq!(first.renamed.len(), 1);
    let expected = format!("prise_de_la_bastille_1_{}.png", content_id(b"bastille"));
    assert_eq!(first.renamed[0].to, expected);
    assert_eq!(file_names(dir.path()), vec![expected.clone(), "notes.txt".to_string()]);

    let second = rename::clean_folder(dir.path(), false).unwrap();
    assert!(second.renamed.is_empty());
    assert_eq!(second.skipped, vec![expected]);
}

/// dry-runではファイルを変更しない
#[test]
fn test_clean_folder_dry_run() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("Verdun.jpg"), b"verdun").unwrap();

    let summary = rename::clean_folder(dir.path(), true).unwrap();
    assert_eq!(summary.renamed.len(), 1);
    assert_eq!(file_names(dir.path()), vec!["Verdun.jpg".to_string()]);
}

/// 同じイベントに照合された2枚目は上書きせずエラー
#[test]
fn test_rename_by_events_collision() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("bastille.jpg"), b"a").unwrap();
    fs::write(dir.path().join("bastille_2.jpg"), b"b").unwrap();
    fs::write(dir.path().join("zzz.jpg"), b"c").unwrap();

    let candidates = vec![EventRecord::new("1", "Prise de la Bastille")
        .with_date("1789-07-14")
        .with_keywords(["Bastille"])];
    let matcher = EventMatcher::new(MatchConfig::new(MatchMode::WholeString, 60)).unwrap();

    let summary = rename::rename_by_events(dir.path(), &candidates, &matcher, false).unwrap();

    assert_eq!(summary.renamed.len(), 1);
    assert_eq!(summary.renamed[0].from, "bastille.jpg");
    assert_eq!(summary.renamed[0].to, "1789-07-14_prise_de_la_bastille.jpg");
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].0, "bastille_2.jpg");
    assert_eq!(summary.skipped, vec!["zzz.jpg".to_string()]);

    // 1枚目の内容は残っている
    assert_eq!(fs::read(dir.path().join("1789-07-14_prise_de_la_bastille.jpg")).unwrap(), b"a");
    assert!(dir.path().join("bastille_2.jpg").exists());

    let statuses: Vec<&str> = summary.rows.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, vec!["renamed", "error", "no-match"]);
}

/// dry-runでも同じ名前への2件目は衝突として報告（実行時と同じ結果）
#[test]
fn test_rename_by_events_dry_run_collision() {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("prise_de_la_bastille.png"), b"a").unwrap();
    fs::write(dir.path().join("prise_de_la_bastille_v2.png"), b"b").unwrap();

    let candidates = vec![EventRecord::new("1", "Prise de la Bastille")
        .with_date("1789-07-14")
        .with_keywords(["Bastille"])];
    let matcher = EventMatcher::new(MatchConfig::new(MatchMode::WholeString, 60)).unwrap();

    let planned = rename::rename_by_events(dir.path(), &candidates, &matcher, true).unwrap();
    assert_eq!(planned.renamed.len(), 1);
    assert_eq!(planned.renamed[0].to, "1789-07-14_prise_de_la_bastille.png");
    assert_eq!(planned.errors.len(), 1);
    assert_eq!(planned.errors[0].0, "prise_de_la_bastille_v2.png");
    // ファイルは変更しない
    assert_eq!(
        file_names(dir.path()),
        vec!["prise_de_la_bastille.png".to_string(), "prise_de_la_bastille_v2.png".to_string()]
    );

    let applied = rename::rename_by_events(dir.path(), &candidates, &matcher, false).unwrap();
    assert_eq!(applied.renamed, planned.renamed);
    assert_eq!(applied.errors.len(), planned.errors.len());
}
