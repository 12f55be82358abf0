//! # Exam Paper Fetch
//!
//! 抓取试卷目录页、解析每份试卷的网盘直链并批量下载到本地
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Browser / Page），只暴露能力
//! - `BrowserSession` - 导航、查询链接、等待元素
//! - `SessionFactory` - 按需创建全新会话（重试时重建）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `CatalogFetcher` - 抓取目录
//! - `LinkResolver` - 解析直链（可续跑）
//! - `Downloader` - 并发下载（有界重试）
//! - `Normalizer` - 补齐扩展名
//! - `FailureWriter` - 写失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个组"的完整处理流程
//! - `GroupCtx` - 上下文封装（年级 + 科目 + 路径）
//! - `GroupFlow` - 流程编排（目录 → 直链 → 下载 → 规范化）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 枚举所有组并依次处理
//!
//! ## 断点文件
//!
//! 每个组两个断点文件，每个阶段的输出即下一阶段的输入，中断后可安全重跑：
//! - `<group>_filenames_and_links.txt`
//! - `<group>_google_drive_links.txt`

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserSession, ChromeSessionFactory, SessionFactory};
pub use models::{CatalogEntry, Group, ResolvedLink, Subject};
pub use orchestrator::{App, RunStats};
pub use workflow::{GroupCtx, GroupFlow, GroupReport};
