//! Integration tests for full site imports
//!
//! These tests use wiremock to serve a small site and run complete imports
//! against an in-memory SQLite repository.

use site_import::config::{Config, ImporterConfig, OutputConfig, UserAgentConfig};
use site_import::connectivity::{HttpConnectivity, HttpDownloader};
use site_import::pipeline::ImportServices;
use site_import::repository::{
    AssetStore, PageCatalogService, PageStatus, PageStore, SiteStore, SqliteRepository,
    TemplateStore, ThemeStore,
};
use site_import::{ImportOutcome, ImportRequest, SiteImporter};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration
fn create_test_config(synchronous_commits: bool) -> Config {
    Config {
        importer: ImporterConfig {
            max_depth: 3,
            follow_redirects: true,
            synchronous_commits,
            max_commit_workers: 2,
            commit_drain_timeout_ms: 10_000,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestImporter".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: ":memory:".to_string(),
            summary_path: "./test_summary.md".to_string(),
        },
    }
}

/// Builds an importer over real HTTP collaborators and an in-memory repository
fn create_importer(synchronous_commits: bool) -> (SiteImporter, Arc<SqliteRepository>) {
    let config = create_test_config(synchronous_commits);
    let repo = Arc::new(SqliteRepository::in_memory().expect("in-memory repository"));
    let timeout = config.importer.request_timeout();
    let connectivity = Arc::new(HttpConnectivity::new(timeout).expect("http client"));
    let downloader = Arc::new(
        HttpDownloader::new(repo.clone(), config.user_agent.header_value(), timeout)
            .expect("download client"),
    );
    let services = ImportServices::from_repository(Arc::clone(&repo), connectivity, downloader);

    (
        SiteImporter::with_services(config, services, Some(Arc::clone(&repo))),
        repo,
    )
}

fn request(server: &MockServer, site: &str) -> ImportRequest {
    ImportRequest {
        seed_url: format!("{}/", server.uri()),
        site_name: site.to_string(),
        user: "tester".to_string(),
    }
}

async fn mount_html(server: &MockServer, at: &str, body: &str, expected_hits: Option<u64>) {
    let mock = Mock::given(method("GET")).and(path(at)).respond_with(
        ResponseTemplate::new(200)
            .set_body_raw(
                format!(
                    "<html><head><title>{}</title></head><body>{}</body></html>",
                    at, body
                ),
                "text/html; charset=utf-8",
            ),
    );
    match expected_hits {
        Some(hits) => mock.expect(hits).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn mount_png(server: &MockServer, at: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a]),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_import_end_to_end() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<h1>Home</h1>
        <a href="/a">A</a>
        <a href="/b">B</a>
        <img src="/img/one.png" alt="One">
        <img src="/img/two.png" alt="Two">
        <a href="http://elsewhere.invalid/x">External</a>"#,
        None,
    )
    .await;
    mount_html(&server, "/a", r#"<p>A</p><a href="/b">Back to B</a>"#, Some(1)).await;
    mount_html(&server, "/b", "<p>B</p>", Some(1)).await;
    mount_png(&server, "/img/one.png").await;
    mount_png(&server, "/img/two.png").await;

    let (importer, repo) = create_importer(false);
    let summary = importer
        .import(request(&server, "docs"))
        .await
        .expect("import should start");

    assert_eq!(summary.outcome, ImportOutcome::Completed);
    assert_eq!(summary.stat("pages"), 2);
    assert_eq!(summary.stat("internallinks"), 3);
    assert_eq!(summary.stat("files"), 2);
    assert_eq!(summary.stat("errors"), 0);
    assert!(summary.commits_drained);
    assert_eq!(summary.pages_imported, 3);
    assert_eq!(summary.pages_pending, 0);

    // One site, one template, landing page plus two cataloged pages
    let site = repo.find_site("docs").await.unwrap().expect("site exists");
    assert_eq!(repo.list_sites().unwrap().len(), 1);
    assert!(repo.find_template_for_site(site.id).await.unwrap().is_some());
    assert!(repo.find_theme("docs").await.unwrap().is_some());

    let pages = repo.pages_under("/docs").await.unwrap();
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.status == PageStatus::Imported));

    let a = repo.find_page_by_path("/docs/a").await.unwrap().unwrap();
    assert!(a.body_content.contains(r#"href="/docs/b""#));

    let landing = repo.find_page_by_path("/docs/index.html").await.unwrap().unwrap();
    assert!(landing.body_content.contains(r#"src="/docs/img/one.png""#));

    assert!(repo.find_asset("/docs/img/one.png").await.unwrap().is_some());
    assert!(repo.find_asset("/docs/img/two.png").await.unwrap().is_some());
    assert_eq!(repo.count_thumbnails(site.id).unwrap(), 1);

    let stored = repo.load_summary("docs").unwrap();
    assert_eq!(stored.get("pages"), Some(&2));
    assert_eq!(stored.get("internallinks"), Some(&3));
    assert!(!stored.contains_key("stylesheets"));
}

#[tokio::test]
async fn test_anchor_variants_catalog_one_page() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r##"<a href="/page#one">One</a><a href="/page#two">Two</a>"##,
        None,
    )
    .await;
    mount_html(&server, "/page", "<p>Page</p>", Some(1)).await;

    let (importer, repo) = create_importer(true);
    let summary = importer.import(request(&server, "docs")).await.unwrap();

    assert_eq!(summary.stat("pages"), 1);
    assert_eq!(summary.stat("internallinks"), 2);
    assert!(repo.find_page_by_path("/docs/page").await.unwrap().is_some());
    assert_eq!(repo.pages_under("/docs").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_index_page_demotes_stub_page() {
    check_index_demotion(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_index_page_demotes_stub_page_with_background_commits() {
    check_index_demotion(false).await;
}

async fn check_index_demotion(synchronous_commits: bool) {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<a href="/foo">Stub</a><a href="/foo/">Real</a>"#,
        None,
    )
    .await;
    mount_html(&server, "/foo", "<p>Stub</p>", Some(1)).await;
    mount_html(&server, "/foo/", "<p>Real</p>", Some(1)).await;

    let (importer, repo) = create_importer(synchronous_commits);
    let summary = importer.import(request(&server, "docs")).await.unwrap();

    assert_eq!(summary.outcome, ImportOutcome::Completed);
    assert!(summary.commits_drained);
    assert_eq!(summary.stat("errors"), 0);
    assert_eq!(summary.pages_imported, 3);
    assert!(repo.folder_exists("/docs/foo").await.unwrap());
    assert!(repo.find_page_by_path("/docs/foo").await.unwrap().is_none());

    let demoted = repo
        .find_page_by_path("/docs/foo/index-foo")
        .await
        .unwrap()
        .expect("demoted page");
    assert!(demoted.body_content.contains("Stub"));

    let index = repo
        .find_page_by_path("/docs/foo/index.html")
        .await
        .unwrap()
        .expect("index page");
    assert!(index.body_content.contains("Real"));
}

#[tokio::test]
async fn test_mandatory_failure_rolls_back_site() {
    let server = MockServer::start().await;
    mount_html(&server, "/", "<p>Home</p>", None).await;

    let (importer, repo) = create_importer(true);

    // Something else already occupies the landing page path
    repo.add_catalog_page("other", "index.html", "", "/docs", "")
        .await
        .unwrap()
        .expect("blocking page");

    let summary = importer.import(request(&server, "docs")).await.unwrap();

    match &summary.outcome {
        ImportOutcome::Failed { stage, .. } => assert_eq!(stage, "template"),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(repo.find_site("docs").await.unwrap().is_none());
    assert!(repo.find_theme("docs").await.unwrap().is_none());
    assert!(repo.find_page_by_path("/docs/index.html").await.unwrap().is_some());
    assert!(repo.load_summary("docs").unwrap().is_empty());
}

#[tokio::test]
async fn test_broken_link_gives_partial_import() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/",
        r#"<a href="/missing">Missing</a><a href="/ok">OK</a>"#,
        None,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_html(&server, "/ok", "<p>OK</p>", Some(1)).await;

    let (importer, repo) = create_importer(true);
    let summary = importer.import(request(&server, "docs")).await.unwrap();

    assert_eq!(summary.outcome, ImportOutcome::Completed);
    assert_eq!(summary.stat("pages"), 1);
    assert_eq!(summary.stat("errors"), 1);
    assert!(repo.find_page_by_path("/docs/ok").await.unwrap().is_some());
    assert!(summary
        .log
        .iter()
        .any(|m| m.category == "links" && m.text.contains("/missing")));
}

#[tokio::test]
async fn test_binary_link_is_downloaded_as_file() {
    let server = MockServer::start().await;

    mount_html(&server, "/", r#"<a href="/guide.pdf">Guide</a>"#, None).await;
    Mock::given(method("GET"))
        .and(path("/guide.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;

    let (importer, repo) = create_importer(true);
    let summary = importer.import(request(&server, "docs")).await.unwrap();

    assert_eq!(summary.stat("files"), 1);
    assert_eq!(summary.stat("pages"), 0);
    let asset = repo.find_asset("/docs/guide.pdf").await.unwrap().unwrap();
    assert_eq!(asset.content_type, "application/pdf");
}

#[tokio::test]
async fn test_depth_limit_stops_following_links() {
    let server = MockServer::start().await;

    mount_html(&server, "/", r#"<a href="/one">1</a>"#, None).await;
    mount_html(&server, "/one", r#"<a href="/two">2</a>"#, Some(1)).await;
    mount_html(&server, "/two", r#"<a href="/three">3</a>"#, Some(1)).await;
    mount_html(&server, "/three", r#"<a href="/four">4</a>"#, Some(1)).await;
    mount_html(&server, "/four", "<p>too deep</p>", Some(0)).await;

    let (importer, repo) = create_importer(true);
    let summary = importer.import(request(&server, "docs")).await.unwrap();

    assert_eq!(summary.stat("pages"), 3);
    let three = repo.find_page_by_path("/docs/three").await.unwrap().unwrap();
    assert_eq!(three.status, PageStatus::Imported);
    assert!(repo.find_page_by_path("/docs/four").await.unwrap().is_none());
}
