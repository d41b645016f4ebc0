// 该文件是 PCB Defect （板检） 项目的一部分。
// src/model/yolov5.rs - YOLOv5 ONNX 模型
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

use std::{fmt::Display, marker::PhantomData, path::Path, sync::Mutex};

use image::RgbImage;
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::TensorRef,
};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Letterbox, RgbNchwFrame},
  model::{DetectItem, DetectResult, Model, WithLabel},
};

const YOLOV5_NUM_INPUTS: usize = 1;
const YOLOV5_INPUT_SIZE: u32 = 640;
// cx, cy, w, h, objectness
const YOLOV5_BOX_ATTRS: usize = 5;
const YOLOV5_MAX_NMS: usize = 30_000;

/// 后处理阈值，默认值与 YOLOv5 hub 模型一致
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectParams {
  pub confidence: f32,
  pub iou: f32,
  pub max_det: usize,
}

impl Default for DetectParams {
  fn default() -> Self {
    Self {
      confidence: 0.25,
      iou: 0.45,
      max_det: 1000,
    }
  }
}

#[derive(Error, Debug)]
pub enum Yolov5Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}, 错误: {1}")]
  RuntimeError(String, String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型输出形状错误: {0:?}")]
  OutputShape(Vec<usize>),
  #[error("推理会话锁已失效")]
  Poisoned,
}

impl Yolov5Error {
  pub fn runtime(msg: &str, e: impl Display) -> Self {
    Yolov5Error::RuntimeError(msg.to_string(), e.to_string())
  }
}

pub struct Yolov5<L> {
  session: Mutex<Session>,
  input_name: String,
  output_name: String,
  input_size: u32,
  params: DetectParams,
  _phantom: PhantomData<fn() -> L>,
}

pub struct Yolov5Builder {
  model_path: String,
  input_size: u32,
  intra_threads: Option<usize>,
  params: DetectParams,
}

impl FromUrlWithScheme for Yolov5Builder {
  const SCHEME: &'static str = "yolov5";
}

impl FromUrl for Yolov5Builder {
  type Error = Yolov5Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov5Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }
    if url.path().is_empty() {
      return Err(Yolov5Error::ModelPathError("模型路径为空".to_string()));
    }

    Ok(Yolov5Builder {
      model_path: url.path().to_string(),
      input_size: YOLOV5_INPUT_SIZE,
      intra_threads: None,
      params: DetectParams::default(),
    })
  }
}

impl Yolov5Builder {
  pub fn model_path(&self) -> &str {
    &self.model_path
  }

  pub fn params(mut self, params: DetectParams) -> Self {
    self.params = params;
    self
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn intra_threads(mut self, intra_threads: Option<usize>) -> Self {
    self.intra_threads = intra_threads;
    self
  }

  pub fn build<L: WithLabel>(self) -> Result<Yolov5<L>, Yolov5Error> {
    info!("加载模型文件: {}", self.model_path);
    let path = Path::new(&self.model_path);
    let metadata = std::fs::metadata(path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      metadata.len() as f64 / (1024.0 * 1024.0)
    );

    if self.input_size == 0 || self.input_size % 32 != 0 {
      return Err(Yolov5Error::ModelInvalid(format!(
        "输入尺寸必须是 32 的正整数倍, 实际为 {}",
        self.input_size
      )));
    }

    info!("创建 ONNX Runtime 推理会话");
    let mut builder = Session::builder()
      .map_err(|e| Yolov5Error::runtime("无法创建会话构建器", e))?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(|e| Yolov5Error::runtime("无法设置优化等级", e))?;

    if let Some(threads) = self.intra_threads {
      builder = builder
        .with_intra_threads(threads)
        .map_err(|e| Yolov5Error::runtime("无法设置线程数", e))?;
    }

    #[cfg(feature = "cuda")]
    {
      builder = builder
        .with_execution_providers([
          ort::execution_providers::CUDAExecutionProvider::default().build()
        ])
        .map_err(|e| Yolov5Error::runtime("无法注册 CUDA 执行器", e))?;
    }

    let session = builder
      .commit_from_file(path)
      .map_err(|e| Yolov5Error::runtime("无法加载 ONNX 模型", e))?;

    let num_inputs = session.inputs.len();
    let num_outputs = session.outputs.len();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != YOLOV5_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLOV5_NUM_INPUTS, num_inputs
      );
      return Err(Yolov5Error::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLOV5_NUM_INPUTS, num_inputs
      )));
    }

    let (Some(input), Some(output)) = (session.inputs.first(), session.outputs.first()) else {
      error!("模型没有输出");
      return Err(Yolov5Error::ModelInvalid("模型没有输出".to_string()));
    };
    let input_name = input.name.clone();
    let output_name = output.name.clone();
    info!(
      "模型加载完成, 输入 '{}', 输出 '{}'",
      input_name, output_name
    );

    Ok(Yolov5 {
      session: Mutex::new(session),
      input_name,
      output_name,
      input_size: self.input_size,
      params: self.params,
      _phantom: PhantomData,
    })
  }
}

impl<L> Yolov5<L> {
  pub fn params(&self) -> &DetectParams {
    &self.params
  }

  fn run(&self, frame: &RgbNchwFrame) -> Result<(Vec<f32>, Vec<usize>), Yolov5Error> {
    let input = frame.tensor().as_standard_layout();
    let tensor = TensorRef::from_array_view(&input)
      .map_err(|e| Yolov5Error::runtime("无法创建输入张量", e))?;

    // ONNX Runtime 会话需要独占访问，推理因此串行执行
    let mut session = self.session.lock().map_err(|_| Yolov5Error::Poisoned)?;

    debug!("执行模型推理");
    let outputs = session
      .run(ort::inputs![self.input_name.as_str() => tensor])
      .map_err(|e| Yolov5Error::runtime("推理失败", e))?;

    let output = outputs
      .get(self.output_name.as_str())
      .ok_or_else(|| Yolov5Error::ModelInvalid(format!("找不到输出 '{}'", self.output_name)))?;
    let (shape, data) = output
      .try_extract_tensor::<f32>()
      .map_err(|e| Yolov5Error::runtime("无法读取输出张量", e))?;

    let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    Ok((data.to_vec(), shape))
  }
}

impl<L: WithLabel> Model for Yolov5<L> {
  type Input = RgbImage;
  type Output = DetectResult<L>;
  type Error = Yolov5Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("预处理输入图像 {}x{}", input.width(), input.height());
    let frame = RgbNchwFrame::letterbox(input, self.input_size);

    let (data, shape) = self.run(&frame)?;
    debug!("模型输出形状: {:?}", shape);

    let items = decode_predictions(&data, &shape, frame.geometry(), &self.params)?;
    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult::from(items))
  }
}

#[derive(Debug, Clone)]
struct Candidate {
  class_id: u32,
  score: f32,
  xyxy: [f32; 4],
}

/// 解码 `[1, N, 5 + nc]` 输出：阈值过滤、按类别 NMS、映射回原图
pub fn decode_predictions<L: WithLabel>(
  data: &[f32],
  shape: &[usize],
  letterbox: &Letterbox,
  params: &DetectParams,
) -> Result<Vec<DetectItem<L>>, Yolov5Error> {
  let (rows, attrs) = match shape {
    [1, rows, attrs] if *attrs > YOLOV5_BOX_ATTRS && rows * attrs <= data.len() => (*rows, *attrs),
    _ => return Err(Yolov5Error::OutputShape(shape.to_vec())),
  };

  let mut candidates = Vec::new();
  for row in data.chunks_exact(attrs).take(rows) {
    let objectness = row[4];
    if objectness.is_nan() || objectness <= params.confidence {
      continue;
    }

    let (class_id, class_score) = row[YOLOV5_BOX_ATTRS..]
      .iter()
      .copied()
      .enumerate()
      .fold((0usize, f32::MIN), |best, (id, score)| {
        if score > best.1 { (id, score) } else { best }
      });

    let score = objectness * class_score;
    // 输出里的 NaN 一并丢弃
    if score.is_nan() || score <= params.confidence {
      continue;
    }

    let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
    let (x_min, y_min) = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
    let (x_max, y_max) = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);

    candidates.push(Candidate {
      class_id: class_id as u32,
      score,
      xyxy: [x_min, y_min, x_max, y_max],
    });
  }
  debug!("阈值过滤后剩余 {} 个候选框", candidates.len());

  let kept = nms(candidates, params.iou, params.max_det);

  let (w, h) = (
    letterbox.source_width.max(1) as f32,
    letterbox.source_height.max(1) as f32,
  );
  Ok(
    kept
      .into_iter()
      .map(|c| DetectItem {
        kind: L::from_label_id(c.class_id),
        score: c.score,
        bbox: [c.xyxy[0] / w, c.xyxy[1] / h, c.xyxy[2] / w, c.xyxy[3] / h],
      })
      .collect(),
  )
}

/// 按类别的贪心非极大值抑制，结果按置信度降序
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32, max_det: usize) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
  candidates.truncate(YOLOV5_MAX_NMS);

  let mut result: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    if result.len() >= max_det {
      break;
    }
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == candidate.class_id && iou(&kept.xyxy, &candidate.xyxy) > iou_threshold);
    if !suppressed {
      result.push(candidate);
    }
  }

  result
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::PcbDefect;

  const NC: usize = 6;

  fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class_id: usize, cls: f32) -> Vec<f32> {
    let mut row = vec![cx, cy, w, h, obj];
    let mut classes = vec![0.01; NC];
    classes[class_id] = cls;
    row.extend(classes);
    row
  }

  fn decode(rows: &[Vec<f32>], letterbox: &Letterbox) -> Vec<DetectItem<PcbDefect>> {
    let data: Vec<f32> = rows.concat();
    decode_predictions(
      &data,
      &[1, rows.len(), YOLOV5_BOX_ATTRS + NC],
      letterbox,
      &DetectParams::default(),
    )
    .unwrap()
  }

  fn identity() -> Letterbox {
    Letterbox::fit(640, 640, 640)
  }

  #[test]
  fn filters_by_objectness_times_class_score() {
    let items = decode(
      &[
        row(100.0, 100.0, 20.0, 20.0, 0.9, 3, 0.9),
        // obj 高但类别分数低: 0.9 * 0.2 = 0.18
        row(300.0, 300.0, 20.0, 20.0, 0.9, 1, 0.2),
        // obj 低于阈值
        row(500.0, 500.0, 20.0, 20.0, 0.2, 2, 1.0),
      ],
      &identity(),
    );

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, PcbDefect::Short);
    assert!((items[0].score - 0.81).abs() < 1e-6);
    let bbox = items[0].bbox_px(640, 640);
    assert!((bbox[0] - 90.0).abs() < 1e-3 && (bbox[3] - 110.0).abs() < 1e-3);
  }

  #[test]
  fn nms_is_per_class_and_sorted_by_confidence() {
    let items = decode(
      &[
        row(100.0, 100.0, 40.0, 40.0, 0.6, 0, 1.0),
        row(102.0, 100.0, 40.0, 40.0, 0.9, 0, 1.0),
        // 同位置不同类别不被抑制
        row(100.0, 100.0, 40.0, 40.0, 0.7, 4, 1.0),
        row(400.0, 400.0, 40.0, 40.0, 0.95, 5, 1.0),
      ],
      &identity(),
    );

    let kinds: Vec<_> = items.iter().map(|i| i.kind).collect();
    assert_eq!(
      kinds,
      vec![PcbDefect::SpuriousCopper, PcbDefect::MissingHole, PcbDefect::Spur]
    );
    assert!((items[1].score - 0.9).abs() < 1e-6);
    assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
  }

  #[test]
  fn boxes_are_mapped_back_through_letterbox() {
    // 1280x640 -> scale 0.5, 上下各填充 160
    let letterbox = Letterbox::fit(1280, 640, 640);
    let items = decode(&[row(320.0, 320.0, 100.0, 50.0, 0.9, 1, 1.0)], &letterbox);

    let bbox = items[0].bbox_px(1280, 640);
    assert!((bbox[0] - 540.0).abs() < 1e-3);
    assert!((bbox[1] - 270.0).abs() < 1e-3);
    assert!((bbox[2] - 740.0).abs() < 1e-3);
    assert!((bbox[3] - 370.0).abs() < 1e-3);
    assert!(items[0].bbox.iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn max_det_truncates_after_nms() {
    let rows: Vec<_> = (0..5)
      .map(|i| row(50.0 + 100.0 * i as f32, 50.0, 20.0, 20.0, 0.9, 0, 1.0))
      .collect();
    let data: Vec<f32> = rows.concat();
    let params = DetectParams {
      max_det: 3,
      ..DetectParams::default()
    };
    let items: Vec<DetectItem<PcbDefect>> =
      decode_predictions(&data, &[1, 5, YOLOV5_BOX_ATTRS + NC], &identity(), &params).unwrap();
    assert_eq!(items.len(), 3);
  }

  #[test]
  fn nan_scores_are_discarded() {
    let items = decode(
      &[
        row(100.0, 100.0, 20.0, 20.0, f32::NAN, 0, 0.9),
        row(200.0, 200.0, 20.0, 20.0, 0.9, 1, f32::NAN),
        row(300.0, 300.0, 20.0, 20.0, 0.9, 2, 0.8),
      ],
      &identity(),
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, PcbDefect::OpenCircuit);
    assert!(items[0].score.is_finite());
  }

  #[test]
  fn no_candidates_is_an_empty_result() {
    let items = decode(&[row(10.0, 10.0, 5.0, 5.0, 0.1, 0, 0.1)], &identity());
    assert!(items.is_empty());
  }

  #[test]
  fn unexpected_output_shape_is_an_error() {
    let err = decode_predictions::<PcbDefect>(&[0.0; 10], &[1, 2, 5], &identity(), &DetectParams::default())
      .unwrap_err();
    assert!(matches!(err, Yolov5Error::OutputShape(_)));

    let err = decode_predictions::<PcbDefect>(&[0.0; 10], &[1, 100, 11], &identity(), &DetectParams::default())
      .unwrap_err();
    assert!(matches!(err, Yolov5Error::OutputShape(_)));
  }

  #[test]
  fn builder_reads_path_from_url() {
    let url = Url::parse("yolov5:yolov5/models/best.onnx").unwrap();
    let builder = Yolov5Builder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), "yolov5/models/best.onnx");

    let url = Url::parse("rknn:///models/best.rknn").unwrap();
    assert!(matches!(
      Yolov5Builder::from_url(&url),
      Err(Yolov5Error::ModelPathError(_))
    ));
  }

  #[test]
  fn missing_artifact_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::parse(&format!("yolov5:{}/best.onnx", dir.path().display())).unwrap();
    let err = Yolov5Builder::from_url(&url)
      .unwrap()
      .build::<PcbDefect>()
      .err()
      .unwrap();
    assert!(matches!(err, Yolov5Error::ModelLoadError(ref e) if e.kind() == std::io::ErrorKind::NotFound));
  }
}
