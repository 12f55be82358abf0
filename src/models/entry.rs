use std::path::PathBuf;

/// 目录页中的一条试卷记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub index: usize,
    pub filename: String,
    pub detail_link: String,
}

/// 解析出直链后的试卷记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub index: usize,
    pub filename: String,
    pub direct_link: String,
}

/// 单个下载任务，写入完成或重试耗尽后即丢弃
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub link: ResolvedLink,
    pub target: PathBuf,
}

/// 断点文件中的一行：`index,filename,link`
pub trait CheckpointRecord: Sized {
    fn from_parts(index: usize, filename: String, link: String) -> Self;
    fn index(&self) -> usize;
    fn filename(&self) -> &str;
    fn link(&self) -> &str;
}

impl CheckpointRecord for CatalogEntry {
    fn from_parts(index: usize, filename: String, link: String) -> Self {
        Self {
            index,
            filename,
            detail_link: link,
        }
    }

    fn index(&self) -> usize {
        self.index
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn link(&self) -> &str {
        &self.detail_link
    }
}

impl CheckpointRecord for ResolvedLink {
    fn from_parts(index: usize, filename: String, link: String) -> Self {
        Self {
            index,
            filename,
            direct_link: link,
        }
    }

    fn index(&self) -> usize {
        self.index
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn link(&self) -> &str {
        &self.direct_link
    }
}
