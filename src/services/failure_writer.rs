//! 失败记录服务 - 业务能力层
//!
//! 只负责"把被跳过的条目写入失败记录文件"，不关心流程

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// 条目在哪个阶段失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => write!(f, "resolve"),
            Stage::Download => write!(f, "download"),
        }
    }
}

/// 失败记录服务
///
/// 下载阶段会被多个任务同时调用，写入时加锁保证每行完整。
/// 设置了标题时，本次运行的第一条记录前会先写入带时间的标题行。
#[derive(Clone)]
pub struct FailureWriter {
    path: PathBuf,
    /// 待写入的标题，写入后置为 `None`
    header: Arc<Mutex<Option<String>>>,
}

impl FailureWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header: Arc::new(Mutex::new(None)),
        }
    }

    /// 使用组前缀作为本次运行的标题
    pub fn with_header(self, group: &str) -> Self {
        let header = format!(
            "# {} - {}\n",
            group,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        Self {
            header: Arc::new(Mutex::new(Some(header))),
            ..self
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入一条失败记录
    ///
    /// # 参数
    /// - `stage`: 失败阶段
    /// - `index`: 条目索引
    /// - `filename`: 条目文件名
    /// - `reason`: 失败原因
    pub async fn write(
        &self,
        stage: Stage,
        index: usize,
        filename: &str,
        reason: &str,
    ) -> Result<()> {
        debug!("写入失败记录: {} | {} | {}", stage, index, filename);
        let line = format!(
            "{} | {} | {} | {}\n",
            stage,
            index,
            filename,
            reason.replace(['\r', '\n'], " ")
        );
        self.append(&line).await
    }

    async fn append(&self, text: &str) -> Result<()> {
        let mut header = self.header.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("无法打开失败记录文件: {}", self.path.display()))?;
        if let Some(h) = header.take() {
            file.write_all(h.as_bytes()).await?;
        }
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
