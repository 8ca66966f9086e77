//! 画像圧縮
//!
//! 長辺を上限サイズに縮小（Lanczos3）し、JPEGで再エンコードする。
//! 透過情報は破棄する。

use crate::config::Config;
use crate::error::{CuratorError, Result};
use crate::scanner::{self, ImageInfo};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, GenericImageView};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    pub quality: u8,
    pub max_size: u32,
}

impl CompressOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quality: config.compression_quality,
            max_size: config.max_image_size,
        }
    }
}

/// 圧縮結果（エンコード済みJPEG）
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_bytes: u64,
}

impl CompressedImage {
    pub fn stats(&self) -> CompressionStats {
        CompressionStats {
            original_bytes: self.original_bytes,
            compressed_bytes: self.bytes.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompressionStats {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl CompressionStats {
    /// 削減率（%）。元サイズ0なら0
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

impl std::ops::Add for CompressionStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            original_bytes: self.original_bytes + other.original_bytes,
            compressed_bytes: self.compressed_bytes + other.compressed_bytes,
        }
    }
}

/// 縦横比を保ったまま長辺をmax_edgeに収める（拡大はしない）
pub fn fit_to_max_edge(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// メモリ上の画像を圧縮
pub fn compress_bytes(data: &[u8], options: &CompressOptions) -> Result<CompressedImage> {
    let decoded = image::load_from_memory(data)?;
    let (width, height) = decoded.dimensions();
    let (target_w, target_h) = fit_to_max_edge(width, height, options.max_size);

    let resized = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize(target_w, target_h, FilterType::Lanczos3)
    };

    let rgb = resized.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, options.quality).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;

    Ok(CompressedImage {
        bytes,
        width: rgb.width(),
        height: rgb.height(),
        original_bytes: data.len() as u64,
    })
}

pub fn compress_file(path: &Path, options: &CompressOptions) -> Result<CompressedImage> {
    if !path.is_file() {
        return Err(CuratorError::FileNotFound(path.display().to_string()));
    }
    let data = std::fs::read(path)?;
    compress_bytes(&data, options)
}

/// 1ファイル分の圧縮結果
#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub file_name: String,
    pub output_path: PathBuf,
    pub stats: CompressionStats,
}

/// フォルダ一括圧縮の結果
#[derive(Debug, Default)]
pub struct FolderCompression {
    pub reports: Vec<CompressionReport>,
    pub failures: Vec<(String, String)>,
}

impl FolderCompression {
    pub fn total(&self) -> CompressionStats {
        self.reports
            .iter()
            .fold(CompressionStats::default(), |acc, r| acc + r.stats)
    }
}

/// フォルダ内の画像をすべて圧縮して `<stem>.jpg` で出力
pub fn compress_folder(input: &Path, output_dir: &Path, options: &CompressOptions) -> Result<FolderCompression> {
    let images = scanner::scan_folder(input)?;
    if images.is_empty() {
        return Err(CuratorError::NoImagesFound(input.display().to_string()));
    }
    std::fs::create_dir_all(output_dir)?;

    let progress = ProgressBar::new(images.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let outcomes: Vec<(String, Result<CompressionReport>)> = images
        .par_iter()
        .map(|image| {
            let outcome = compress_one(image, output_dir, options);
            progress.inc(1);
            (image.file_name.clone(), outcome)
        })
        .collect();
    progress.finish_and_clear();

    let mut result = FolderCompression::default();
    for (file_name, outcome) in outcomes {
        match outcome {
            Ok(report) => result.reports.push(report),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "圧縮に失敗");
                result.failures.push((file_name, e.to_string()));
            }
        }
    }
    Ok(result)
}

fn compress_one(image: &ImageInfo, output_dir: &Path, options: &CompressOptions) -> Result<CompressionReport> {
    let compressed = compress_file(&image.path, options)?;
    let stem = image
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| image.file_name.clone());
    let output_path = output_dir.join(format!("{}.jpg", stem));
    std::fs::write(&output_path, &compressed.bytes)?;

    Ok(CompressionReport {
        file_name: image.file_name.clone(),
        output_path,
        stats: compressed.stats(),
    })
}
