//! 直链解析服务 - 业务能力层
//!
//! 逐个访问详情页，读取下载按钮的 `href` 并追加到直链断点文件。
//! 从已解析的最大索引之后继续，不会重复写入同一索引。

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{describe, BrowserError};
use crate::infrastructure::{BrowserSession, SessionFactory};
use crate::models::{CatalogEntry, ResolvedLink};
use crate::services::checkpoint_store;
use crate::services::failure_writer::{FailureWriter, Stage};
use crate::utils::logging::truncate_text;
use crate::workflow::GroupCtx;

/// 解析结果
#[derive(Debug, Default)]
pub struct ResolveReport {
    /// 从断点文件重新读取的全部直链
    pub links: Vec<ResolvedLink>,
    /// 本次新解析的数量
    pub newly_resolved: usize,
    /// 本次跳过的条目索引
    pub skipped: Vec<usize>,
}

/// 单个条目的导航结果
enum Navigation {
    Loaded,
    Skipped(String),
    /// 超时后无法重建会话，后续条目都无法解析
    SessionLost(String),
}

pub struct LinkResolver {
    button_selector: String,
    max_retries: usize,
    retry_delay: Duration,
    element_wait: Duration,
}

impl LinkResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            button_selector: config.download_button_selector.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            element_wait: config.element_wait(),
        }
    }

    /// 续跑起点：已解析最大索引 + 1
    pub fn resume_point(resolved: &[ResolvedLink]) -> usize {
        resolved.iter().map(|l| l.index + 1).max().unwrap_or(0)
    }

    /// 解析所有尚未解析的条目
    ///
    /// # 参数
    /// - `factory`: 浏览器会话工厂
    /// - `ctx`: 组上下文
    /// - `catalog`: 目录条目
    /// - `resolved`: 已解析的直链（来自断点文件）
    /// - `failures`: 失败记录
    ///
    /// # 返回
    /// 返回从断点文件重新读取的全部直链以及本次统计
    pub async fn resolve(
        &self,
        factory: &dyn SessionFactory,
        ctx: &GroupCtx,
        catalog: &[CatalogEntry],
        resolved: &[ResolvedLink],
        failures: &FailureWriter,
    ) -> Result<ResolveReport> {
        let next_idx = Self::resume_point(resolved);
        let pending: Vec<&CatalogEntry> = catalog.iter().filter(|e| e.index >= next_idx).collect();

        let mut report = ResolveReport::default();

        if pending.is_empty() {
            info!("{} 所有直链均已解析 ({} 条)", ctx, resolved.len());
        } else {
            info!(
                "{} 🔍 开始解析直链: 从索引 {} 起, 共 {} 条",
                ctx,
                next_idx,
                pending.len()
            );

            match factory.open().await {
                Ok(mut session) => {
                    let outcome = self
                        .resolve_pending(factory, &mut session, ctx, &pending, failures, &mut report)
                        .await;
                    session.close().await;
                    outcome?;
                }
                Err(e) => {
                    let reason = format!("无法打开浏览器会话: {}", describe(&e));
                    error!("{} ❌ {}", ctx, reason);
                    self.skip_rest(&pending, &reason, failures, &mut report)
                        .await?;
                }
            }
        }

        report.links = checkpoint_store::load_if_exists(&ctx.resolved_path).await?;
        info!(
            "{} ✓ 直链解析完成: 新增 {}, 跳过 {}, 共 {}",
            ctx,
            report.newly_resolved,
            report.skipped.len(),
            report.links.len()
        );
        Ok(report)
    }

    async fn resolve_pending(
        &self,
        factory: &dyn SessionFactory,
        session: &mut Box<dyn BrowserSession>,
        ctx: &GroupCtx,
        pending: &[&CatalogEntry],
        failures: &FailureWriter,
        report: &mut ResolveReport,
    ) -> Result<()> {
        for (pos, entry) in pending.iter().enumerate() {
            debug!(
                "{} 解析 {} | {}",
                ctx,
                entry.index,
                truncate_text(&entry.detail_link, 80)
            );

            match self.navigate(factory, session, ctx, entry).await {
                Navigation::Loaded => {}
                Navigation::Skipped(reason) => {
                    error!("{} ❌ 跳过 {},{}: {}", ctx, entry.index, entry.filename, reason);
                    self.skip(entry, &reason, failures, report).await?;
                    continue;
                }
                Navigation::SessionLost(reason) => {
                    error!("{} ❌ {}，停止解析剩余 {} 条", ctx, reason, pending.len() - pos);
                    self.skip_rest(&pending[pos..], &reason, failures, report)
                        .await?;
                    break;
                }
            }

            match session
                .wait_for_href(&self.button_selector, self.element_wait)
                .await
            {
                Ok(direct_link) => {
                    let link = ResolvedLink {
                        index: entry.index,
                        filename: entry.filename.clone(),
                        direct_link,
                    };
                    checkpoint_store::append(&ctx.resolved_path, &link).await?;
                    report.newly_resolved += 1;
                }
                Err(e) => {
                    let reason = describe(&e);
                    error!(
                        "{} ❌ 无法获取直链 {},{}: {}",
                        ctx, entry.index, entry.filename, reason
                    );
                    self.skip(entry, &reason, failures, report).await?;
                }
            }
        }
        Ok(())
    }

    /// 导航到详情页
    ///
    /// 超时类错误最多尝试 `max_retries` 次，每次失败后关闭会话、等待并重建；
    /// 其他导航错误不重试。重建会话失败时返回 `SessionLost`。
    async fn navigate(
        &self,
        factory: &dyn SessionFactory,
        session: &mut Box<dyn BrowserSession>,
        ctx: &GroupCtx,
        entry: &CatalogEntry,
    ) -> Navigation {
        let mut last_error: Option<BrowserError> = None;

        for attempt in 1..=self.max_retries {
            match session.goto(&entry.detail_link).await {
                Ok(()) => return Navigation::Loaded,
                Err(e) if e.is_timeout() => {
                    warn!(
                        "{} ⚠️ {}. 重试中 ({}/{})...",
                        ctx,
                        describe(&e),
                        attempt,
                        self.max_retries
                    );
                    session.close().await;
                    sleep(self.retry_delay).await;
                    match factory.open().await {
                        Ok(fresh) => *session = fresh,
                        Err(open_err) => {
                            return Navigation::SessionLost(format!(
                                "无法重建浏览器会话: {}",
                                describe(&open_err)
                            ))
                        }
                    }
                    last_error = Some(e);
                }
                Err(e) => return Navigation::Skipped(describe(&e)),
            }
        }

        let reason = match last_error {
            Some(e) => format!("重试 {} 次后仍失败: {}", self.max_retries, describe(&e)),
            None => "未尝试导航".to_string(),
        };
        Navigation::Skipped(reason)
    }

    async fn skip(
        &self,
        entry: &CatalogEntry,
        reason: &str,
        failures: &FailureWriter,
        report: &mut ResolveReport,
    ) -> Result<()> {
        failures
            .write(Stage::Resolve, entry.index, &entry.filename, reason)
            .await?;
        report.skipped.push(entry.index);
        Ok(())
    }

    async fn skip_rest(
        &self,
        entries: &[&CatalogEntry],
        reason: &str,
        failures: &FailureWriter,
        report: &mut ResolveReport,
    ) -> Result<()> {
        for entry in entries {
            self.skip(entry, reason, failures, report).await?;
        }
        Ok(())
    }
}
