// 该文件是 PCB Defect （板检） 项目的一部分。
// src/model/loader.rs - 进程级模型缓存
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

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

/// 只加载一次、随进程存活的只读模型
///
/// 加载失败不会被缓存，但调用方应把首次失败视为致命错误。
pub struct ModelLoader<M> {
  cell: OnceCell<Arc<M>>,
  loads: AtomicUsize,
}

impl<M> ModelLoader<M> {
  pub const fn new() -> Self {
    Self {
      cell: OnceCell::new(),
      loads: AtomicUsize::new(0),
    }
  }

  pub fn get_or_load<E, F>(&self, load: F) -> Result<Arc<M>, E>
  where
    F: FnOnce() -> Result<M, E>,
  {
    self
      .cell
      .get_or_try_init(|| {
        let count = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        info!("首次加载模型 (第 {} 次尝试)", count);
        load().map(Arc::new)
      })
      .map(|model| {
        debug!("复用已加载的模型");
        Arc::clone(model)
      })
  }

  pub fn get(&self) -> Option<Arc<M>> {
    self.cell.get().cloned()
  }

  /// 实际执行加载闭包的次数
  pub fn load_count(&self) -> usize {
    self.loads.load(Ordering::SeqCst)
  }
}

impl<M> Default for ModelLoader<M> {
  fn default() -> Self {
    Self::new()
  }
}
