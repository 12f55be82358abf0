//! 目录抓取服务 - 业务能力层
//!
//! 打开目录页，收集所有试卷链接并写入目录断点文件

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::infrastructure::{BrowserSession, SessionFactory};
use crate::models::CatalogEntry;
use crate::services::checkpoint_store;
use crate::workflow::GroupCtx;

pub struct CatalogFetcher {
    selector: String,
}

impl CatalogFetcher {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    /// 目录断点存在则直接读取，否则抓取目录页
    pub async fn load_or_fetch(
        &self,
        factory: &dyn SessionFactory,
        ctx: &GroupCtx,
    ) -> Result<Vec<CatalogEntry>> {
        if tokio::fs::try_exists(&ctx.catalog_path).await.unwrap_or(false) {
            info!(
                "{} 使用已有目录: {}",
                ctx,
                ctx.catalog_path.display()
            );
            return checkpoint_store::load(&ctx.catalog_path).await;
        }

        info!("{} 正在抓取目录...", ctx);
        self.fetch(factory, ctx).await
    }

    /// 抓取目录页并覆盖写入目录断点文件
    ///
    /// 不重试，失败直接返回错误（整组中止）
    pub async fn fetch(
        &self,
        factory: &dyn SessionFactory,
        ctx: &GroupCtx,
    ) -> Result<Vec<CatalogEntry>> {
        let mut session = factory.open().await.context("无法打开浏览器会话")?;
        let result = self.collect(session.as_mut(), ctx).await;
        session.close().await;

        let entries = result?;
        checkpoint_store::save(&ctx.catalog_path, &entries).await?;
        info!("{} ✓ 目录中共有 {} 份试卷", ctx, entries.len());
        Ok(entries)
    }

    async fn collect(
        &self,
        session: &mut dyn BrowserSession,
        ctx: &GroupCtx,
    ) -> Result<Vec<CatalogEntry>> {
        session
            .goto(&ctx.listing_url)
            .await
            .with_context(|| format!("无法加载目录页: {}", ctx.listing_url))?;

        let links = session
            .query_links(&self.selector)
            .await
            .with_context(|| format!("无法读取目录页链接: {}", ctx.listing_url))?;
        debug!("{} 匹配到 {} 个链接元素", ctx, links.len());

        let mut entries = Vec::with_capacity(links.len());
        for link in links {
            match link.href {
                Some(href) => entries.push(CatalogEntry {
                    index: entries.len(),
                    filename: link.text,
                    detail_link: href,
                }),
                None => warn!("{} ⚠️ 链接缺少 href，已忽略: {}", ctx, link.text),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::BrowserError;
    use crate::infrastructure::LinkElement;
    use crate::models::{Group, Subject};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ListingSession {
        links: Vec<LinkElement>,
        fail_goto: bool,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserSession for ListingSession {
        async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
            if self.fail_goto {
                return Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                });
            }
            Ok(())
        }

        async fn query_links(&mut self, _selector: &str) -> Result<Vec<LinkElement>, BrowserError> {
            Ok(self.links.clone())
        }

        async fn wait_for_href(
            &mut self,
            selector: &str,
            _wait: Duration,
        ) -> Result<String, BrowserError> {
            Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ListingFactory {
        links: Vec<LinkElement>,
        fail_goto: bool,
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    impl ListingFactory {
        fn new(links: Vec<LinkElement>, fail_goto: bool) -> Self {
            Self {
                links,
                fail_goto,
                opened: AtomicUsize::new(0),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SessionFactory for ListingFactory {
        async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ListingSession {
                links: self.links.clone(),
                fail_goto: self.fail_goto,
                closed: self.closed.clone(),
            }))
        }
    }

    fn link(text: &str, href: Option<&str>) -> LinkElement {
        LinkElement {
            text: text.to_string(),
            href: href.map(str::to_string),
        }
    }

    fn test_ctx(dir: &Path) -> GroupCtx {
        let config = Config {
            download_root: dir.join("papers"),
            checkpoint_dir: dir.to_path_buf(),
            ..Config::default()
        };
        GroupCtx::new(Group::new(1, Subject::English), &config)
    }

    #[tokio::test]
    async fn test_fetch_writes_checkpoint_and_skips_missing_href() {
        let dir = TempDir::new().unwrap();
        let ctx = test_ctx(dir.path());
        let factory = ListingFactory::new(
            vec![
                link("Paper A", Some("https://sgexam.com/a/")),
                link("Broken", None),
                link("Paper B", Some("https://sgexam.com/b/")),
            ],
            false,
        );

        let fetcher = CatalogFetcher::new("ul.lcp_catlist li a");
        let entries = fetcher.fetch(&factory, &ctx).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].filename, "Paper B");
        assert_eq!(factory.closed.load(Ordering::SeqCst), 1);

        let content = std::fs::read_to_string(&ctx.catalog_path).unwrap();
        assert_eq!(
            content,
            "0,Paper A,https://sgexam.com/a/\n1,Paper B,https://sgexam.com/b/\n"
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates_and_closes_session() {
        let dir = TempDir::new().unwrap();
        let ctx = test_ctx(dir.path());
        let factory = ListingFactory::new(vec![], true);

        let fetcher = CatalogFetcher::new("ul.lcp_catlist li a");
        assert!(fetcher.fetch(&factory, &ctx).await.is_err());
        assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
        assert!(!ctx.catalog_path.exists());
    }

    #[tokio::test]
    async fn test_load_or_fetch_uses_existing_checkpoint() {
        let dir = TempDir::new().unwrap();
        let ctx = test_ctx(dir.path());
        std::fs::write(&ctx.catalog_path, "0,Cached,https://sgexam.com/c/\n").unwrap();
        let factory = ListingFactory::new(vec![], true);

        let fetcher = CatalogFetcher::new("ul.lcp_catlist li a");
        let entries = fetcher.load_or_fetch(&factory, &ctx).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "Cached");
        assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
    }
}
