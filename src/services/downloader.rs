//! 下载服务 - 业务能力层
//!
//! 并发下载所有直链，每个文件独立重试，失败只记录不抛出

use anyhow::{Context, Result};
use futures::StreamExt;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{describe, DownloadError};
use crate::models::{DownloadTask, ResolvedLink};
use crate::services::failure_writer::{FailureWriter, Stage};
use crate::workflow::GroupCtx;

/// 文件名中不允许出现的字符
fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("valid regex"))
}

/// 本地文件名：三位补零的索引 + 原文件名
///
/// 纯函数；扩展名由规范化阶段补齐
pub fn local_file_name(index: usize, filename: &str) -> String {
    let sanitized = invalid_chars().replace_all(filename.trim(), "_");
    format!("{:03}_{}", index, sanitized)
}

/// 统计目录中的普通文件数
pub async fn count_local_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("无法读取目录: {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// 下载统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub succeeded: usize,
    pub failed: Vec<usize>,
    /// 是否因本地文件数已满足而跳过整个阶段
    pub skipped_by_gate: bool,
}

/// 下载服务
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    max_attempts: usize,
    retry_delay: Duration,
    request_timeout: Duration,
    max_concurrent: usize,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.download_timeout())
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            client,
            max_attempts: config.max_retries + 2,
            retry_delay: config.retry_delay(),
            request_timeout: config.download_timeout(),
            max_concurrent: config.max_concurrent_downloads.max(1),
        })
    }

    /// 根据直链生成下载任务
    pub fn tasks(links: &[ResolvedLink], dir: &Path) -> Vec<DownloadTask> {
        links
            .iter()
            .map(|link| DownloadTask {
                target: dir.join(local_file_name(link.index, &link.filename)),
                link: link.clone(),
            })
            .collect()
    }

    /// 下载一个组的所有文件
    ///
    /// 本地文件数已不少于直链数时直接跳过（只比较数量，不校验内容）
    pub async fn download_group(
        &self,
        ctx: &GroupCtx,
        links: &[ResolvedLink],
        failures: &FailureWriter,
    ) -> Result<DownloadReport> {
        let existing = count_local_files(&ctx.local_dir).await?;
        info!("{} 本地已有文件: {}", ctx, existing);

        if existing >= links.len() {
            info!("{} 文件数已满足，跳过下载", ctx);
            return Ok(DownloadReport {
                skipped_by_gate: true,
                ..Default::default()
            });
        }

        info!("{} ⬇️ 开始下载缺失文件...", ctx);
        Ok(self
            .download_all(Self::tasks(links, &ctx.local_dir), failures)
            .await)
    }

    /// 并发执行所有下载任务，并发数受信号量限制
    pub async fn download_all(
        &self,
        tasks: Vec<DownloadTask>,
        failures: &FailureWriter,
    ) -> DownloadReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let semaphore = semaphore.clone();
            let downloader = self.clone();
            let failures = failures.clone();
            let index = task.link.index;

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                match downloader.download(&task).await {
                    Ok(bytes) => {
                        debug!("✅ 下载完成: {} ({} bytes)", task.target.display(), bytes);
                        Some(true)
                    }
                    Err(e) => {
                        let reason = describe(&e);
                        error!("❌ 放弃下载 {}: {}", task.target.display(), reason);
                        if let Err(e) = failures
                            .write(Stage::Download, task.link.index, &task.link.filename, &reason)
                            .await
                        {
                            warn!("写入失败记录失败: {:#}", e);
                        }
                        Some(false)
                    }
                }
            });
            handles.push((index, handle));
        }

        let mut report = DownloadReport::default();
        for (index, handle) in handles {
            match handle.await {
                Ok(Some(true)) => report.succeeded += 1,
                Ok(_) => report.failed.push(index),
                Err(e) => {
                    error!("下载任务 {} 执行失败: {}", index, e);
                    report.failed.push(index);
                }
            }
        }
        report.failed.sort_unstable();
        report
    }

    /// 下载单个文件，最多尝试 `max_retries + 2` 次
    pub async fn download(&self, task: &DownloadTask) -> Result<u64, DownloadError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(task).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    error!("❌ 下载失败 ({}): {}", task.target.display(), describe(&e));
                    let _ = tokio::fs::remove_file(&task.target).await;
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    warn!("重试中 ({}/{})...", attempt, self.max_attempts);
                    sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn attempt(&self, task: &DownloadTask) -> Result<u64, DownloadError> {
        let url = &task.link.direct_link;
        let response = timeout(self.request_timeout, self.client.get(url).send())
            .await
            .map_err(|_| DownloadError::Timeout { url: url.clone() })?
            .map_err(|e| DownloadError::RequestFailed {
                url: url.clone(),
                source: Box::new(e),
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(DownloadError::BadStatus {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }

        let write_failed = |path: &PathBuf, e: std::io::Error| DownloadError::WriteFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        };

        let mut file = File::create(&task.target)
            .await
            .map_err(|e| write_failed(&task.target, e))?;
        let mut stream = response.bytes_stream();
        let mut total = 0u64;

        // 每次读取都受超时限制
        loop {
            let chunk = match timeout(self.request_timeout, stream.next()).await {
                Err(_) => return Err(DownloadError::Timeout { url: url.clone() }),
                Ok(None) => break,
                Ok(Some(chunk)) => chunk.map_err(|e| DownloadError::RequestFailed {
                    url: url.clone(),
                    source: Box::new(e),
                })?,
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| write_failed(&task.target, e))?;
            total += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| write_failed(&task.target, e))?;
        Ok(total)
    }
}
