//! 浏览器会话 - 基础设施层
//!
//! 持有稀缺资源（Browser / Page），只暴露"导航、查询、等待元素"的能力

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::browser;
use crate::config::Config;
use crate::error::BrowserError;

/// 元素轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 页面中的一个链接元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkElement {
    /// 可见文本（已去除首尾空白）
    pub text: String,
    /// `href`（已解析为绝对地址）
    pub href: Option<String>,
}

/// 浏览器会话能力
///
/// 会话不是线程安全的，同一时间只访问一个页面。
/// 调用方必须在所有退出路径上调用 `close()`，重复调用无副作用。
#[async_trait]
pub trait BrowserSession: Send {
    /// 导航到指定 URL 并等待加载完成
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// 查询所有匹配选择器的链接元素
    async fn query_links(&mut self, selector: &str) -> Result<Vec<LinkElement>, BrowserError>;

    /// 等待匹配选择器的元素出现并读取其 `href`
    async fn wait_for_href(
        &mut self,
        selector: &str,
        wait: Duration,
    ) -> Result<String, BrowserError>;

    /// 关闭会话
    async fn close(&mut self);
}

/// 会话工厂：每次调用都返回一个全新的会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// 基于 chromiumoxide 的会话
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
    /// 是否由本会话启动（连接模式下不关闭用户的浏览器）
    owns_browser: bool,
    page_load_timeout: Duration,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::SessionClosed)
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let page_load_timeout = self.page_load_timeout;
        let page = self.page()?;
        debug!("导航到: {}", url);

        match timeout(page_load_timeout, page.goto(url)).await {
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
            }),
            Ok(Err(chromiumoxide::error::CdpError::Timeout)) => {
                Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) => Err(BrowserError::NavigationFailed {
                url: url.to_string(),
                source: Box::new(e),
            }),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn query_links(&mut self, selector: &str) -> Result<Vec<LinkElement>, BrowserError> {
        let page = self.page()?;
        let query_failed = |e: chromiumoxide::error::CdpError| BrowserError::QueryFailed {
            selector: selector.to_string(),
            source: Box::new(e),
        };

        let elements = page.find_elements(selector).await.map_err(query_failed)?;
        let mut links = Vec::with_capacity(elements.len());
        for element in elements {
            let text = element
                .inner_text()
                .await
                .map_err(query_failed)?
                .unwrap_or_default()
                .trim()
                .to_string();
            let href = element
                .property("href")
                .await
                .map_err(query_failed)?
                .and_then(|v| v.as_str().map(str::to_string));
            links.push(LinkElement { text, href });
        }
        Ok(links)
    }

    async fn wait_for_href(
        &mut self,
        selector: &str,
        wait: Duration,
    ) -> Result<String, BrowserError> {
        let page = self.page()?;
        let deadline = Instant::now() + wait;

        loop {
            if let Ok(element) = page.find_element(selector).await {
                let href = element
                    .property("href")
                    .await
                    .map_err(|e| BrowserError::QueryFailed {
                        selector: selector.to_string(),
                        source: Box::new(e),
                    })?
                    .and_then(|v| v.as_str().map(str::to_string))
                    .filter(|s| !s.is_empty());
                return href.ok_or_else(|| BrowserError::AttributeMissing {
                    selector: selector.to_string(),
                    attribute: "href".to_string(),
                });
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::ElementNotFound {
                    selector: selector.to_string(),
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if !self.owns_browser {
                if let Err(e) = page.close().await {
                    warn!("关闭页面失败: {}", e);
                }
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if self.owns_browser {
                if let Err(e) = browser.close().await {
                    warn!("关闭浏览器失败: {}", e);
                }
                let _ = browser.wait().await;
            }
        }
        self.handler.abort();
        debug!("浏览器会话已关闭");
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// 根据配置启动或连接浏览器的工厂
pub struct ChromeSessionFactory {
    debug_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    headless: bool,
    page_load_timeout: Duration,
}

impl ChromeSessionFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            debug_port: config.browser_debug_port,
            chrome_executable: config.chrome_executable.clone(),
            headless: config.headless,
            page_load_timeout: config.page_load_timeout(),
        }
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let (browser, handler, owns_browser) = match self.debug_port {
            Some(port) => {
                let (browser, handler) = browser::connect_to_browser(port).await?;
                (browser, handler, false)
            }
            None => {
                let (browser, handler) = browser::launch_browser(
                    self.chrome_executable.as_deref(),
                    self.headless,
                    self.page_load_timeout,
                )
                .await?;
                (browser, handler, true)
            }
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::PageCreationFailed {
                    source: Box::new(e),
                });
            }
        };

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            page: Some(page),
            handler,
            owns_browser,
            page_load_timeout: self.page_load_timeout,
        }))
    }
}
