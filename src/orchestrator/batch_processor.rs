//! 批量组处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责所有组的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建浏览器会话工厂和组处理流程
//! 2. **枚举组**：按年级、科目生成待处理的组（`Vec<Group>`）
//! 3. **顺序处理**：组与组之间串行，一个组失败不影响下一个
//! 4. **全局统计**：汇总所有组的处理结果
//!
//! 进程退出码不区分部分成功和全部成功，失败只体现在日志中。

use crate::config::Config;
use crate::infrastructure::{ChromeSessionFactory, SessionFactory};
use crate::models::Group;
use crate::utils::logging::{log_group_start, log_startup, print_final_stats};
use crate::workflow::{GroupCtx, GroupFlow, GroupReport};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, warn};

/// 应用主结构
pub struct App {
    config: Config,
    factory: Arc<dyn SessionFactory>,
    flow: GroupFlow,
}

impl App {
    /// 使用 Chromium 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let factory = Arc::new(ChromeSessionFactory::new(&config));
        Self::with_factory(config, factory)
    }

    /// 使用指定的会话工厂初始化应用
    pub fn with_factory(config: Config, factory: Arc<dyn SessionFactory>) -> Result<Self> {
        let flow = GroupFlow::new(&config)?;
        Ok(Self {
            config,
            factory,
            flow,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        let groups = Group::enumerate(&self.config.levels, &self.config.subjects);

        if groups.is_empty() {
            warn!("⚠️ 没有需要处理的组，程序结束");
            return Ok(RunStats::default());
        }

        log_startup(groups.len(), self.config.max_concurrent_downloads);

        let mut stats = RunStats::default();
        for (i, group) in groups.iter().enumerate() {
            let ctx = GroupCtx::new(*group, &self.config);
            log_group_start(i + 1, groups.len(), &ctx.prefix);

            match self.flow.run(self.factory.as_ref(), &ctx).await {
                Ok(report) => stats.record(&report),
                Err(e) => {
                    error!("{} ❌ 处理失败: {:#}", ctx, e);
                    stats.failed_groups += 1;
                }
            }
        }

        print_final_stats(
            stats.succeeded_groups,
            stats.failed_groups,
            stats.downloaded_files,
            stats.skipped_items,
        );

        Ok(stats)
    }
}

/// 全部组的处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub succeeded_groups: usize,
    pub failed_groups: usize,
    pub downloaded_files: usize,
    pub skipped_items: usize,
}

impl RunStats {
    fn record(&mut self, report: &GroupReport) {
        self.succeeded_groups += 1;
        self.downloaded_files += report.download.succeeded;
        self.skipped_items += report.resolve_skipped + report.download.failed.len();
    }
}
