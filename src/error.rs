use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 下载错误
    Download(DownloadError),
    /// 文件操作错误
    File(FileError),
    /// 断点文件错误
    Checkpoint(CheckpointError),
    /// 配置错误
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Download(e) => write!(f, "下载错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Checkpoint(e) => write!(f, "断点文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
        }
    }
}

// Display 已包含内层错误的描述，source 直接跳到内层错误的 source
impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => std::error::Error::source(e),
            AppError::Download(e) => std::error::Error::source(e),
            AppError::File(e) => std::error::Error::source(e),
            AppError::Checkpoint(e) => std::error::Error::source(e),
            AppError::Config(e) => std::error::Error::source(e),
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面加载超时
    NavigationTimeout { url: String },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 等待元素超时（元素不存在）
    ElementNotFound { selector: String },
    /// 元素缺少属性
    AttributeMissing { selector: String, attribute: String },
    /// 查询 DOM 失败
    QueryFailed {
        selector: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 会话已关闭
    SessionClosed,
}

impl BrowserError {
    /// 是否属于超时类错误（可重建会话后重试）
    pub fn is_timeout(&self) -> bool {
        match self {
            BrowserError::NavigationTimeout { .. } => true,
            BrowserError::NavigationFailed { source, .. } => matches!(
                source.downcast_ref::<chromiumoxide::error::CdpError>(),
                Some(chromiumoxide::error::CdpError::Timeout)
            ),
            _ => false,
        }
    }
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchFailed { .. } => write!(f, "启动浏览器失败"),
            BrowserError::ConnectionFailed { port, .. } => {
                write!(f, "无法连接到浏览器 (端口: {})", port)
            }
            BrowserError::PageCreationFailed { .. } => write!(f, "创建页面失败"),
            BrowserError::NavigationTimeout { url } => write!(f, "页面加载超时: {}", url),
            BrowserError::NavigationFailed { url, .. } => write!(f, "导航到 {} 失败", url),
            BrowserError::ElementNotFound { selector } => {
                write!(f, "未找到元素: {}", selector)
            }
            BrowserError::AttributeMissing {
                selector,
                attribute,
            } => write!(f, "元素 {} 缺少属性 {}", selector, attribute),
            BrowserError::QueryFailed { selector, .. } => {
                write!(f, "查询元素 {} 失败", selector)
            }
            BrowserError::SessionClosed => write!(f, "浏览器会话已关闭"),
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::ConnectionFailed { source, .. }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::QueryFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 下载错误
#[derive(Debug)]
pub enum DownloadError {
    /// 服务器返回非 200 状态
    BadStatus { url: String, status: u16 },
    /// 网络请求失败
    RequestFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 请求或读取超时
    Timeout { url: String },
    /// 写入本地文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::BadStatus { url, status } => {
                write!(f, "HTTP {} ({})", status, url)
            }
            DownloadError::RequestFailed { url, .. } => write!(f, "请求失败 ({})", url),
            DownloadError::Timeout { url } => write!(f, "请求超时: {}", url),
            DownloadError::WriteFailed { path, .. } => write!(f, "写入文件失败 ({})", path),
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::RequestFailed { source, .. }
            | DownloadError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::ReadFailed { path, .. } => write!(f, "读取文件失败 ({})", path),
            FileError::WriteFailed { path, .. } => write!(f, "写入文件失败 ({})", path),
            FileError::TomlParseFailed { path, .. } => write!(f, "TOML解析失败 ({})", path),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 断点文件错误
#[derive(Debug)]
pub enum CheckpointError {
    /// 行格式错误
    MalformedLine {
        path: String,
        line_no: usize,
        line: String,
    },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::MalformedLine {
                path,
                line_no,
                line,
            } => write!(f, "{} 第 {} 行格式错误: {:?}", path, line_no, line),
        }
    }
}

impl std::error::Error for CheckpointError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 未知科目
    UnknownSubject { subject: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::UnknownSubject { subject } => write!(f, "未知科目: {}", subject),
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========

impl From<BrowserError> for AppError {
    fn from(err: BrowserError) -> Self {
        AppError::Browser(err)
    }
}

impl From<DownloadError> for AppError {
    fn from(err: DownloadError) -> Self {
        AppError::Download(err)
    }
}

impl From<CheckpointError> for AppError {
    fn from(err: CheckpointError) -> Self {
        AppError::Checkpoint(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建 TOML 解析错误
    pub fn toml_parse_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

/// 把错误及其 source 链拼成一行，用于失败记录和日志
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        let timeout = BrowserError::NavigationTimeout {
            url: "https://sgexam.com/a/".to_string(),
        };
        assert!(timeout.is_timeout());

        let cdp_timeout = BrowserError::NavigationFailed {
            url: "https://sgexam.com/a/".to_string(),
            source: Box::new(chromiumoxide::error::CdpError::Timeout),
        };
        assert!(cdp_timeout.is_timeout());

        let missing = BrowserError::ElementNotFound {
            selector: "a.vc_general.vc_btn3".to_string(),
        };
        assert!(!missing.is_timeout());
    }

    #[test]
    fn test_display_contains_context() {
        let err = AppError::from(DownloadError::BadStatus {
            url: "https://drive.example/x".to_string(),
            status: 404,
        });
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("https://drive.example/x"));
    }

    #[test]
    fn test_cause_printed_once() {
        let err = BrowserError::LaunchFailed {
            source: "chrome crashed".into(),
        };
        assert_eq!(describe(&err), "启动浏览器失败: chrome crashed");

        let app = anyhow::Error::from(AppError::from(err));
        assert_eq!(
            format!("{:#}", app),
            "浏览器错误: 启动浏览器失败: chrome crashed"
        );
    }
}
