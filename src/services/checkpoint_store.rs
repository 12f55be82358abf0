//! 断点文件 - 业务能力层
//!
//! 每行一条记录：`index,filename,link`。
//! 解析时 index 取第一个逗号之前，link 取最后一个逗号之后，
//! 中间全部视为文件名，因此文件名中的逗号不会破坏解析。
//! 写入时 link 中的逗号转义为 `%2C`（URL 语义不变），换行替换为空格。
//! 追加中途崩溃留下的不完整末行会在下次读取时丢弃并从文件中移除。

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{AppError, CheckpointError};
use crate::models::CheckpointRecord;

/// 解析单行记录
pub fn parse_line(line: &str) -> Option<(usize, String, String)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let first = line.find(',')?;
    let last = line.rfind(',')?;
    if first == last {
        return None;
    }
    let index = line[..first].trim().parse().ok()?;
    let filename = line[first + 1..last].to_string();
    let link = line[last + 1..].trim().to_string();
    Some((index, filename, link))
}

/// 格式化单行记录（含换行符）
pub fn format_line<R: CheckpointRecord>(record: &R) -> String {
    let filename = record.filename().replace(['\r', '\n'], " ");
    let link = record.link().trim().replace(',', "%2C");
    format!("{},{},{}\n", record.index(), filename, link)
}

/// 读取断点文件，空行忽略
///
/// 格式错误的末行视为追加时中断，丢弃并重写文件；其他格式错误的行报错
pub async fn load<R: CheckpointRecord>(path: &Path) -> Result<Vec<R>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let mut records = Vec::with_capacity(lines.len());
    for (pos, &(i, line)) in lines.iter().enumerate() {
        match parse_line(line) {
            Some((index, filename, link)) => records.push(R::from_parts(index, filename, link)),
            None if pos + 1 == lines.len() => {
                warn!(
                    "⚠️ {} 第 {} 行不完整，已丢弃: {:?}",
                    path.display(),
                    i + 1,
                    line
                );
                save(path, &records).await?;
            }
            None => {
                return Err(AppError::from(CheckpointError::MalformedLine {
                    path: path.display().to_string(),
                    line_no: i + 1,
                    line: line.to_string(),
                })
                .into())
            }
        }
    }
    Ok(records)
}

/// 断点文件存在时读取，否则返回空列表
pub async fn load_if_exists<R: CheckpointRecord>(path: &Path) -> Result<Vec<R>> {
    if fs::try_exists(path).await.unwrap_or(false) {
        load(path).await
    } else {
        Ok(Vec::new())
    }
}

/// 覆盖写入整个断点文件
pub async fn save<R: CheckpointRecord>(path: &Path, records: &[R]) -> Result<()> {
    let content: String = records.iter().map(format_line).collect();
    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    Ok(())
}

/// 追加一条记录
pub async fn append<R: CheckpointRecord>(path: &Path, record: &R) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("无法打开断点文件: {}", path.display()))?;
    file.write_all(format_line(record).as_bytes())
        .await
        .with_context(|| format!("无法写入断点文件: {}", path.display()))?;
    file.flush().await?;
    Ok(())
}
