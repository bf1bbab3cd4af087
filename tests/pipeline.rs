// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/pipeline.rs - 流水线集成测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tempfile::TempDir;

use shanan_defect::detection::CRACK;
use shanan_defect::input::ImageFolderInput;
use shanan_defect::model::{ModelConfig, ModelDetector, ModelDetectorConfig};
use shanan_defect::output::{Annotator, DetectionRecord, Render, SaveImageFileOutput};
use shanan_defect::task::{BatchTask, Task};
use shanan_defect::{DefectPipeline, PipelineError};

fn pipeline_without_model(dir: &Path) -> DefectPipeline {
  let config = ModelConfig::single_file(dir.join("missing.onnx"));
  let model = ModelDetector::load_or_disable(&config, ModelDetectorConfig::default());
  assert!(!model.is_enabled());
  DefectPipeline::builder()
    .with_model(model)
    .with_annotator(Annotator::default())
    .build()
}

fn bar_image() -> RgbImage {
  let mut image = RgbImage::from_pixel(640, 640, Rgb([20, 20, 20]));
  draw_filled_rect_mut(&mut image, Rect::at(200, 300).of_size(100, 10), Rgb([230, 230, 230]));
  image
}

fn blank_image() -> RgbImage {
  RgbImage::from_pixel(640, 640, Rgb([128, 128, 128]))
}

fn write_png(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
  let path = dir.join(name);
  image.save(&path).unwrap();
  path
}

#[test]
fn missing_model_falls_back_to_classical_paths() {
  let dir = TempDir::new().unwrap();
  let pipeline = pipeline_without_model(dir.path());
  assert_eq!(pipeline.detector_names(), vec!["crack", "irregularity"]);

  let path = write_png(dir.path(), "bar.png", &bar_image());
  let out = pipeline.run_path(&path).unwrap();
  assert_eq!(out.detections.count_of(CRACK), 1);
  assert!(out.failures.is_empty());
}

#[test]
fn blank_image_has_no_defects() {
  let dir = TempDir::new().unwrap();
  let pipeline = pipeline_without_model(dir.path());
  let path = write_png(dir.path(), "blank.png", &blank_image());

  let out = pipeline.run_path(&path).unwrap();
  assert!(out.detections.is_empty());
  assert_eq!(out.annotated.dimensions(), (640, 640));
}

#[test]
fn undecodable_file_is_an_input_error() {
  let dir = TempDir::new().unwrap();
  let pipeline = pipeline_without_model(dir.path());
  let path = dir.path().join("broken.png");
  std::fs::write(&path, b"this is not a png").unwrap();

  assert!(matches!(pipeline.run_path(&path), Err(PipelineError::Input(_))));
}

#[test]
fn annotated_image_is_saved() {
  let dir = TempDir::new().unwrap();
  let pipeline = pipeline_without_model(dir.path());
  let out = pipeline.run_image(&image::DynamicImage::ImageRgb8(bar_image()));

  let target = dir.path().join("nested").join("out.png");
  SaveImageFileOutput::new(&target)
    .render_result("bar.png", &out)
    .unwrap();

  let saved = image::open(&target).unwrap();
  assert_eq!((saved.width(), saved.height()), (640, 640));
}

fn find_records(dir: &Path) -> Vec<PathBuf> {
  let mut found = Vec::new();
  for entry in std::fs::read_dir(dir).unwrap() {
    let path = entry.unwrap().path();
    if path.is_dir() {
      found.extend(find_records(&path));
    } else if path.extension().is_some_and(|e| e == "json") {
      found.push(path);
    }
  }
  found
}

#[cfg(feature = "directory_record")]
#[test]
fn batch_over_folder_writes_one_record_per_image() {
  use shanan_defect::output::DirectoryRecordOutput;

  let work = TempDir::new().unwrap();
  let inputs = work.path().join("inputs");
  std::fs::create_dir_all(&inputs).unwrap();
  write_png(&inputs, "a_bar.png", &bar_image());
  write_png(&inputs, "b_blank.png", &blank_image());
  std::fs::write(inputs.join("notes.txt"), b"ignored").unwrap();

  let records = work.path().join("records");
  let output = DirectoryRecordOutput::new(&records);
  let pipeline = pipeline_without_model(work.path());

  let summary = BatchTask::default()
    .with_workers(2)
    .run_task(ImageFolderInput::scan(&inputs).unwrap(), &pipeline, &output)
    .unwrap();
  assert_eq!(summary.processed, 2);
  assert_eq!(summary.failed, 0);

  let files = find_records(&records);
  assert_eq!(files.len(), 2);
  for file in files {
    let record = DetectionRecord::read_json(&file).unwrap();
    assert_eq!(record.defect_count, record.detections.len());
    let processed = file.with_file_name(&record.processed_filename);
    assert!(processed.is_file());
    match record.original_filename.as_str() {
      "a_bar.png" => assert_eq!(record.detections.count_of(CRACK), 1),
      "b_blank.png" => assert_eq!(record.defect_count, 0),
      other => panic!("unexpected record for {}", other),
    }
  }
}

#[cfg(feature = "directory_record")]
#[test]
fn only_defects_skips_clean_images() {
  use shanan_defect::FromUrl;
  use shanan_defect::output::DirectoryRecordOutput;

  let work = TempDir::new().unwrap();
  let records = work.path().join("records");
  let url = url::Url::from_directory_path(&records).unwrap();
  let url = url::Url::parse(&format!("folder://{}?only_defects", url.path())).unwrap();
  let output = DirectoryRecordOutput::from_url(&url).unwrap();

  let pipeline = pipeline_without_model(work.path());
  let out = pipeline.run_image(&image::DynamicImage::ImageRgb8(blank_image()));
  output.render_result("blank.png", &out).unwrap();

  assert!(!records.exists() || find_records(&records).is_empty());
}
