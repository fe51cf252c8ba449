// 该文件是 Tianma （天马） 项目的一部分。
// src/server/state.rs - 服务共享状态
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

use std::sync::Arc;

use crate::output::{AuditRecorder, draw::Draw};

/// 启动后只读的服务状态，模型、标注器与存档器在请求间共享
pub struct AppState<M> {
  model: Option<Arc<M>>,
  draw: Arc<Draw<'static>>,
  recorder: Arc<AuditRecorder>,
}

// 手写 Clone，避免要求 `M: Clone`
impl<M> Clone for AppState<M> {
  fn clone(&self) -> Self {
    Self {
      model: self.model.clone(),
      draw: Arc::clone(&self.draw),
      recorder: Arc::clone(&self.recorder),
    }
  }
}

impl<M> AppState<M> {
  pub fn new(model: M, recorder: AuditRecorder) -> Self {
    Self {
      model: Some(Arc::new(model)),
      draw: Arc::new(Draw::default()),
      recorder: Arc::new(recorder),
    }
  }

  /// 未加载模型的状态，健康检查报告 `model_loaded = false`
  pub fn without_model(recorder: AuditRecorder) -> Self {
    Self {
      model: None,
      draw: Arc::new(Draw::default()),
      recorder: Arc::new(recorder),
    }
  }

  pub fn model_loaded(&self) -> bool {
    self.model.is_some()
  }

  pub fn model(&self) -> Option<Arc<M>> {
    self.model.clone()
  }

  pub fn draw(&self) -> Arc<Draw<'static>> {
    Arc::clone(&self.draw)
  }

  pub fn recorder(&self) -> Arc<AuditRecorder> {
    Arc::clone(&self.recorder)
  }
}
