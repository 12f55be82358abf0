use async_trait::async_trait;
use exam_paper_fetch::error::BrowserError;
use exam_paper_fetch::infrastructure::{BrowserSession, LinkElement, SessionFactory};
use exam_paper_fetch::utils::logging;
use exam_paper_fetch::{App, ChromeSessionFactory, Config, Group, GroupCtx, GroupFlow, Subject};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 模拟站点：目录页 URL → 链接列表，详情页 URL → 下载按钮 href
#[derive(Default)]
struct FakeSite {
    listings: HashMap<String, Vec<LinkElement>>,
    buttons: HashMap<String, String>,
    /// 总是加载超时的页面
    timeouts: HashSet<String>,
}

struct FakeSession {
    site: Arc<FakeSite>,
    current: Option<String>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.site.timeouts.contains(url) {
            return Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn query_links(&mut self, _selector: &str) -> Result<Vec<LinkElement>, BrowserError> {
        let url = self.current.clone().unwrap_or_default();
        Ok(self.site.listings.get(&url).cloned().unwrap_or_default())
    }

    async fn wait_for_href(
        &mut self,
        selector: &str,
        _wait: Duration,
    ) -> Result<String, BrowserError> {
        let url = self.current.clone().unwrap_or_default();
        self.site
            .buttons
            .get(&url)
            .cloned()
            .ok_or_else(|| BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    async fn close(&mut self) {}
}

struct FakeFactory {
    site: Arc<FakeSite>,
    opened: AtomicUsize,
    /// 成功启动这么多次后浏览器崩溃，无法再启动
    open_limit: Option<usize>,
}

impl FakeFactory {
    fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            opened: AtomicUsize::new(0),
            open_limit: None,
        }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if let Some(limit) = self.open_limit {
            if self.opened.load(Ordering::SeqCst) >= limit {
                return Err(BrowserError::LaunchFailed {
                    source: "chrome crashed".into(),
                });
            }
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            site: self.site.clone(),
            current: None,
        }))
    }
}

fn test_config(root: &Path) -> Config {
    Config {
        base_url_template: "https://sgexam.test/{group}/".to_string(),
        levels: vec![1],
        subjects: vec![Subject::English],
        download_root: root.join("papers"),
        checkpoint_dir: root.to_path_buf(),
        retry_delay_secs: 0,
        element_wait_secs: 0,
        max_concurrent_downloads: 2,
        ..Config::default()
    }
}

/// 三份试卷，第三份详情页没有下载按钮
async fn build_site(mock_server: &MockServer) -> FakeSite {
    let mut site = FakeSite::default();
    let listing = "https://sgexam.test/primary-1-english/".to_string();
    let names = ["Paper A", "Paper B", "Paper C"];

    site.listings.insert(
        listing,
        names
            .iter()
            .enumerate()
            .map(|(i, name)| LinkElement {
                text: name.to_string(),
                href: Some(format!("https://sgexam.test/detail-{}/", i)),
            })
            .collect(),
    );

    for i in 0..2 {
        site.buttons.insert(
            format!("https://sgexam.test/detail-{}/", i),
            format!("{}/drive/{}", mock_server.uri(), i),
        );
        Mock::given(method("GET"))
            .and(path(format!("/drive/{}", i)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(format!("%PDF-{}", i)))
            .mount(mock_server)
            .await;
    }
    site
}

#[tokio::test]
async fn test_group_pipeline_end_to_end() {
    logging::init(false);

    let root = TempDir::new().unwrap();
    let config = test_config(root.path());
    let mock_server = MockServer::start().await;
    let factory = FakeFactory::new(build_site(&mock_server).await);

    let ctx = GroupCtx::new(Group::new(1, Subject::English), &config);
    let flow = GroupFlow::new(&config).unwrap();
    let report = flow.run(&factory, &ctx).await.unwrap();

    assert_eq!(report.catalog_size, 3);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.resolve_skipped, 1);
    assert_eq!(report.download.succeeded, 2);
    assert_eq!(report.renamed, 2);
    assert_eq!(report.local_files, 2);

    let catalog = std::fs::read_to_string(&ctx.catalog_path).unwrap();
    assert_eq!(catalog.lines().count(), 3);

    let resolved = std::fs::read_to_string(&ctx.resolved_path).unwrap();
    let indices: Vec<&str> = resolved
        .lines()
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(indices, vec!["0", "1"]);

    assert_eq!(
        std::fs::read(ctx.local_dir.join("000_Paper A.pdf")).unwrap(),
        b"%PDF-0"
    );
    assert!(ctx.local_dir.join("001_Paper B.pdf").exists());

    let failures = std::fs::read_to_string(&ctx.failures_path).unwrap();
    assert!(failures.contains("resolve | 2 | Paper C |"), "{}", failures);

    // 重跑：目录和直链都来自断点，文件数已满足，不再发起下载
    let requests_before = mock_server.received_requests().await.unwrap().len();
    let rerun = flow.run(&factory, &ctx).await.unwrap();
    assert!(rerun.download.skipped_by_gate);
    assert_eq!(rerun.resolved, 2);
    assert_eq!(
        mock_server.received_requests().await.unwrap().len(),
        requests_before
    );
}

#[tokio::test]
async fn test_resolved_links_downloaded_after_browser_crash() {
    logging::init(false);

    let root = TempDir::new().unwrap();
    let config = test_config(root.path());
    let mock_server = MockServer::start().await;
    let mut site = build_site(&mock_server).await;
    site.timeouts.insert("https://sgexam.test/detail-1/".to_string());

    // 目录页和解析各用一个会话，超时后的重建失败
    let factory = FakeFactory {
        open_limit: Some(2),
        ..FakeFactory::new(site)
    };

    let ctx = GroupCtx::new(Group::new(1, Subject::English), &config);
    let flow = GroupFlow::new(&config).unwrap();
    let report = flow.run(&factory, &ctx).await.unwrap();

    assert_eq!(report.resolved, 1);
    assert_eq!(report.resolve_skipped, 2);
    assert_eq!(report.download.succeeded, 1);
    assert_eq!(
        std::fs::read(ctx.local_dir.join("000_Paper A.pdf")).unwrap(),
        b"%PDF-0"
    );

    let failures = std::fs::read_to_string(&ctx.failures_path).unwrap();
    assert!(failures.contains("resolve | 1 | Paper B | 无法重建浏览器会话"), "{}", failures);
    assert!(failures.contains("resolve | 2 | Paper C |"), "{}", failures);
}

#[tokio::test]
async fn test_app_continues_after_group_failure() {
    logging::init(false);

    let root = TempDir::new().unwrap();
    let mut config = test_config(root.path());
    config.subjects = vec![Subject::English, Subject::Science];
    config.levels = vec![3];

    // 英语目录页挂到三年级
    let mock_server = MockServer::start().await;
    let mut site = build_site(&mock_server).await;
    let english = site
        .listings
        .remove("https://sgexam.test/primary-1-english/")
        .unwrap();
    site.listings
        .insert("https://sgexam.test/primary-3-english/".to_string(), english);

    // 让科学组的下载目录无法创建：同名文件占位
    std::fs::create_dir_all(&config.download_root).unwrap();
    std::fs::write(config.download_root.join("primary-3-science"), b"").unwrap();

    let factory = Arc::new(FakeFactory::new(site));
    let app = App::with_factory(config, factory).unwrap();
    let stats = app.run().await.unwrap();

    assert_eq!(stats.succeeded_groups, 1);
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.downloaded_files, 2);
    assert_eq!(stats.skipped_items, 1);
}

#[tokio::test]
#[ignore] // 默认忽略，需要本机浏览器和网络：cargo test -- --ignored
async fn test_real_catalog_page() {
    logging::init(true);

    let root = TempDir::new().unwrap();
    let config = Config {
        download_root: root.path().join("papers"),
        checkpoint_dir: root.path().to_path_buf(),
        ..Config::default()
    };
    let factory = ChromeSessionFactory::new(&config);
    let ctx = GroupCtx::new(Group::new(6, Subject::Maths), &config);

    let fetcher = exam_paper_fetch::services::CatalogFetcher::new(config.catalog_selector.clone());
    let entries = fetcher.fetch(&factory, &ctx).await.expect("抓取目录失败");

    assert!(!entries.is_empty(), "目录页应该包含试卷");
}
