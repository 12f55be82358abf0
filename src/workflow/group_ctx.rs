//! 组处理上下文
//!
//! 封装"我正在处理哪个年级哪个科目"以及它对应的 URL、目录和断点文件

use std::fmt::Display;
use std::path::PathBuf;

use crate::config::Config;
use crate::models::Group;

/// 组处理上下文
///
/// 每个组一个实例，显式传递给每个阶段
#[derive(Debug, Clone)]
pub struct GroupCtx {
    pub group: Group,
    /// 组前缀，如 `primary-1-english`
    pub prefix: String,
    /// 目录页 URL
    pub listing_url: String,
    /// 本地下载目录
    pub local_dir: PathBuf,
    /// 目录断点文件
    pub catalog_path: PathBuf,
    /// 直链断点文件
    pub resolved_path: PathBuf,
    /// 失败记录文件
    pub failures_path: PathBuf,
}

impl GroupCtx {
    pub fn new(group: Group, config: &Config) -> Self {
        let prefix = group.prefix();
        Self {
            group,
            listing_url: config.listing_url(&prefix),
            local_dir: config.download_root.join(&prefix),
            catalog_path: config
                .checkpoint_dir
                .join(format!("{}_filenames_and_links.txt", prefix)),
            resolved_path: config
                .checkpoint_dir
                .join(format!("{}_google_drive_links.txt", prefix)),
            failures_path: config
                .checkpoint_dir
                .join(format!("{}_failures.txt", prefix)),
            prefix,
        }
    }
}

impl Display for GroupCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.prefix)
    }
}
