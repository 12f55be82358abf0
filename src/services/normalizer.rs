//! 扩展名规范化 - 业务能力层
//!
//! 给目录中缺少扩展名的文件补上扩展名，不访问网络，可重复执行

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub struct Normalizer {
    extension: String,
}

impl Normalizer {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// 补齐扩展名后的文件名；已带扩展名则返回 `None`
    pub fn normalized_name(&self, name: &str) -> Option<String> {
        if name.ends_with(&self.extension) {
            None
        } else {
            Some(format!("{}{}", name, self.extension))
        }
    }

    /// 重命名目录中所有缺少扩展名的普通文件
    ///
    /// # 返回
    /// 返回重命名的文件数
    pub async fn normalize(&self, dir: &Path) -> Result<usize> {
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("无法读取目录: {}", dir.display()))?;

        // 先收集再重命名，避免遍历过程中看到新名字
        let mut pending = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(new_name) = self.normalized_name(&name) {
                pending.push((entry.path(), new_name));
            }
        }

        for (path, new_name) in &pending {
            fs::rename(path, dir.join(new_name))
                .await
                .with_context(|| format!("无法重命名 {} -> {}", path.display(), new_name))?;
            debug!("重命名: {} -> {}", path.display(), new_name);
        }
        Ok(pending.len())
    }
}
