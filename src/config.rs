use crate::error::{AppError, AppResult, ConfigError};
use crate::models::Subject;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件名（存在时自动加载）
pub const DEFAULT_CONFIG_FILE: &str = "exam_config.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 目录页 URL 模板，`{group}` 会被替换为组前缀
    pub base_url_template: String,
    /// 需要抓取的年级
    pub levels: Vec<u8>,
    /// 需要抓取的科目
    pub subjects: Vec<Subject>,
    /// 下载文件根目录，每个组一个子目录
    pub download_root: PathBuf,
    /// 断点文件存放目录
    pub checkpoint_dir: PathBuf,
    /// 下载文件应有的扩展名
    pub file_extension: String,
    /// 目录页中试卷链接的选择器
    pub catalog_selector: String,
    /// 详情页中下载按钮的选择器
    pub download_button_selector: String,
    /// 详情页导航的最大尝试次数（下载为该值 + 2）
    pub max_retries: usize,
    /// 重试间隔（秒）
    pub retry_delay_secs: u64,
    /// 等待下载按钮出现的时间（秒）
    pub element_wait_secs: u64,
    /// 页面加载超时（秒）
    pub page_load_timeout_secs: u64,
    /// 单个下载请求超时（秒）
    pub download_timeout_secs: u64,
    /// 同时下载的文件数量
    pub max_concurrent_downloads: usize,
    /// 浏览器调试端口，设置后连接已运行的浏览器而不是启动新的
    pub browser_debug_port: Option<u16>,
    /// 浏览器可执行文件路径
    pub chrome_executable: Option<PathBuf>,
    /// 是否使用无头模式
    pub headless: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url_template: "https://sgexam.com/{group}/".to_string(),
            levels: (1..=6).collect(),
            subjects: Subject::ALL.to_vec(),
            download_root: PathBuf::from("exam_papers"),
            checkpoint_dir: PathBuf::from("."),
            file_extension: ".pdf".to_string(),
            catalog_selector: "ul.lcp_catlist li a".to_string(),
            download_button_selector: "a.vc_general.vc_btn3".to_string(),
            max_retries: 3,
            retry_delay_secs: 5,
            element_wait_secs: 10,
            page_load_timeout_secs: 30,
            download_timeout_secs: 10,
            max_concurrent_downloads: default_worker_count(),
            browser_debug_port: None,
            chrome_executable: None,
            headless: true,
            verbose_logging: false,
        }
    }
}

/// 与线程池默认大小一致：min(32, CPU 数 + 4)
fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let file = std::env::var("EXAM_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let base = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        base.with_env_overrides()
    }

    /// 从 TOML 文件加载，缺失的字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
            .map_err(|e| AppError::toml_parse_failed(path.display().to_string(), e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 使用环境变量覆盖配置
    pub fn with_env_overrides(mut self) -> AppResult<Self> {
        if let Ok(v) = std::env::var("BASE_URL_TEMPLATE") {
            self.base_url_template = v;
        }
        if let Ok(v) = std::env::var("DOWNLOAD_ROOT") {
            self.download_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CHECKPOINT_DIR") {
            self.checkpoint_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("SUBJECTS") {
            self.subjects = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    Subject::from_slug(s).ok_or_else(|| ConfigError::UnknownSubject {
                        subject: s.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = env_parse::<usize>("MAX_RETRIES", "usize")? {
            self.max_retries = v;
        }
        if let Some(v) = env_parse::<u64>("RETRY_DELAY_SECS", "u64")? {
            self.retry_delay_secs = v;
        }
        if let Some(v) = env_parse::<usize>("MAX_CONCURRENT_DOWNLOADS", "usize")? {
            self.max_concurrent_downloads = v;
        }
        if let Some(v) = env_parse::<u16>("BROWSER_DEBUG_PORT", "u16")? {
            self.browser_debug_port = Some(v);
        }
        if let Some(v) = env_parse::<bool>("HEADLESS", "bool")? {
            self.headless = v;
        }
        if let Some(v) = env_parse::<bool>("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        Ok(self)
    }

    /// 目录页 URL
    pub fn listing_url(&self, prefix: &str) -> String {
        self.base_url_template.replace("{group}", prefix)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(AppError::from(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            })),
        },
        Err(_) => Ok(None),
    }
}
