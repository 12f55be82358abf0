//! 组处理流程 - 流程层
//!
//! 核心职责：定义"一个组"的完整处理流程
//!
//! 流程顺序：
//! 1. 目录（读取断点或抓取）
//! 2. 直链解析（从断点续跑）
//! 3. 下载（数量已满足则跳过）
//! 4. 扩展名规范化

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::infrastructure::SessionFactory;
use crate::models::ResolvedLink;
use crate::services::checkpoint_store;
use crate::services::downloader::count_local_files;
use crate::services::{
    CatalogFetcher, DownloadReport, Downloader, FailureWriter, LinkResolver, Normalizer,
};
use crate::utils::logging::log_group_complete;
use crate::workflow::group_ctx::GroupCtx;

/// 一个组的处理结果
#[derive(Debug, Default)]
pub struct GroupReport {
    pub catalog_size: usize,
    pub resolved: usize,
    pub resolve_skipped: usize,
    pub download: DownloadReport,
    pub renamed: usize,
    /// 处理结束时本地文件数
    pub local_files: usize,
}

/// 组处理流程
///
/// - 按顺序编排四个阶段
/// - 不持有浏览器资源，会话由各阶段按需打开并关闭
pub struct GroupFlow {
    fetcher: CatalogFetcher,
    resolver: LinkResolver,
    downloader: Downloader,
    normalizer: Normalizer,
}

impl GroupFlow {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: CatalogFetcher::new(config.catalog_selector.clone()),
            resolver: LinkResolver::new(config),
            downloader: Downloader::new(config)?,
            normalizer: Normalizer::new(config.file_extension.clone()),
        })
    }

    /// 运行一个组的完整流程
    ///
    /// 目录抓取失败会返回错误；单个条目的失败只记录不中止
    pub async fn run(&self, factory: &dyn SessionFactory, ctx: &GroupCtx) -> Result<GroupReport> {
        tokio::fs::create_dir_all(&ctx.local_dir)
            .await
            .with_context(|| format!("无法创建目录: {}", ctx.local_dir.display()))?;

        let failures = FailureWriter::new(&ctx.failures_path).with_header(&ctx.prefix);

        // ========== 阶段 1: 目录 ==========
        let catalog = self.fetcher.load_or_fetch(factory, ctx).await?;

        // ========== 阶段 2: 直链 ==========
        let resolved: Vec<ResolvedLink> =
            if tokio::fs::try_exists(&ctx.resolved_path).await.unwrap_or(false) {
                info!(
                    "{} 使用已有直链: {}",
                    ctx,
                    ctx.resolved_path.display()
                );
                checkpoint_store::load(&ctx.resolved_path).await?
            } else {
                info!("{} 正在获取直链...", ctx);
                Vec::new()
            };

        let resolve_report = self
            .resolver
            .resolve(factory, ctx, &catalog, &resolved, &failures)
            .await?;
        let links = resolve_report.links;

        // ========== 阶段 3: 下载 ==========
        let download = self.downloader.download_group(ctx, &links, &failures).await?;

        // ========== 阶段 4: 规范化 ==========
        let renamed = self.normalizer.normalize(&ctx.local_dir).await?;

        let local_files = count_local_files(&ctx.local_dir).await?;
        log_group_complete(&ctx.prefix, local_files, links.len());

        Ok(GroupReport {
            catalog_size: catalog.len(),
            resolved: links.len(),
            resolve_skipped: resolve_report.skipped.len(),
            download,
            renamed,
            local_files,
        })
    }
}
