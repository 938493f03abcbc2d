//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing, work and chapter pages and
//! drive the full crawl loop end-to-end against a temporary database.

use folio_crawl::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use folio_crawl::crawler::{run_crawl, Coordinator};
use folio_crawl::storage::{RunStatus, SqliteStorage, Storage};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_url: format!("{}/fictions/search", base_url),
            pages: 1,
            page_offset: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
    }
}

fn listing_entry(href: &str, title: &str, followers: &str) -> String {
    format!(
        r#"
    <div class="fiction-list-item row">
      <div class="search-content">
        <h2 class="fiction-title"><a href="{href}">{title}</a></h2>
        <div class="tags">Fantasy
Adventure
</div>
        <div class="row stats">
          <div>{followers} Followers</div>
          <div><i class="fa fa-star"></i><span class="star" title="4.50"></span></div>
          <div>5,678 Views</div>
          <div>12 Chapters</div>
          <div>345 Pages</div>
        </div>
      </div>
    </div>"#
    )
}

fn listing_page(entries: &[String]) -> String {
    format!(
        "<html><body><div class=\"fiction-list\">{}</div></body></html>",
        entries.concat()
    )
}

const WORK_PAGE: &str = r#"<html><body>
    <div class="row fic-header">
      <h1>Some Work</h1>
      <h4><span>by</span> <span><a href="/profile/9">Jane Doe</a></span></h4>
    </div>
    <table id="chapters"><tbody>
      <tr class="chapter-row"><td><a href="/fiction/42/some-slug/chapter/100/prologue">Prologue</a></td></tr>
      <tr class="chapter-row"><td><a href="/fiction/42/some-slug/chapter/101/one">One</a></td></tr>
    </tbody></table>
    </body></html>"#;

fn chapter_page(title: &str, published: i64, text: &str, comments: u64, next: Option<&str>) -> String {
    let nav = match next {
        Some(href) => format!(r#"<a class="btn btn-primary" href="{}">Next <br>Chapter</a>"#, href),
        None => r#"<button class="btn" disabled>Next <br>Chapter</button>"#.to_string(),
    };

    format!(
        r#"<html><body>
        <div class="fic-header"><h1>{title}</h1></div>
        <div class="profile-info"><i class="fa fa-calendar"></i> <time unixtime="{published}">ago</time></div>
        <div class="chapter-inner chapter-content"><p>{text}</p></div>
        <div class="row nav-buttons">{nav}</div>
        <span class="caption-subject">Comments({comments})</span>
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Mounts a listing with two works: 42 has two chapters, 43 is gone
async fn mount_site(server: &MockServer, listing_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/fictions/search"))
        .and(query_param("page", "1"))
        .respond_with(html(listing_page(&[
            listing_entry("/fiction/42/some-slug", "Some Work", "1,234"),
            listing_entry("/fiction/43/gone", "Gone Work", "7"),
        ])))
        .expect(listing_fetches)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fiction/42/some-slug"))
        .respond_with(html(WORK_PAGE.to_string()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fiction/43/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fiction/42/some-slug/chapter/100/prologue"))
        .respond_with(html(chapter_page(
            "Prologue",
            1_600_000_000,
            "It was a dark and stormy night.",
            3,
            Some("/fiction/42/some-slug/chapter/101/one"),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fiction/42/some-slug/chapter/101/one"))
        .respond_with(html(chapter_page(
            "One",
            1_600_086_400,
            "The rain fell.",
            0,
            None,
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_listing_to_last_chapter() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path);

    let summary = run_crawl(config, false, "test-hash")
        .await
        .expect("Crawl should complete");

    // listing + two works + two chapters
    assert_eq!(summary.tasks_processed, 5);
    assert_eq!(summary.tasks_failed, 1);
    assert_eq!(summary.works, 2);
    assert_eq!(summary.chapters, 2);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");

    let works = storage.load_works().unwrap();
    let work = &works[&42];
    assert_eq!(work.title.as_deref(), Some("Some Work"));
    assert_eq!(work.follower_count, Some(1234));
    assert_eq!(work.view_count, Some(5678));
    assert_eq!(work.chapter_count, Some(12));
    assert_eq!(work.page_count, Some(345));
    assert_eq!(work.rating, Some(4.5));
    assert_eq!(
        work.tags,
        Some(vec!["Fantasy".to_string(), "Adventure".to_string()])
    );
    assert_eq!(work.author.as_deref(), Some("Jane Doe"));

    // The 404 work keeps its listing data and never gains an author
    let gone = &works[&43];
    assert_eq!(gone.title.as_deref(), Some("Gone Work"));
    assert_eq!(gone.author, None);

    let chapters = storage.load_chapters().unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[&100].work_id, 42);
    assert_eq!(chapters[&100].title, "Prologue");
    assert_eq!(chapters[&100].word_count, 7);
    assert_eq!(chapters[&100].comment_count, 3);
    assert_eq!(chapters[&101].published_at, 1_600_086_400);

    assert_eq!(storage.count_pending().unwrap(), 0);
    assert_eq!(storage.count_visited().unwrap(), 5);

    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.tasks_processed, 5);
    assert_eq!(run.tasks_failed, 1);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_second_run_does_not_refetch_visited_pages() {
    let mock_server = MockServer::start().await;
    // The listing must be fetched exactly once across both runs
    mount_site(&mock_server, 1).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    run_crawl(
        create_test_config(&mock_server.uri(), &db_path),
        false,
        "test-hash",
    )
    .await
    .expect("First crawl should complete");

    let mut coordinator = Coordinator::new(
        create_test_config(&mock_server.uri(), &db_path),
        false,
        "test-hash",
    )
    .expect("Failed to create coordinator");
    assert!(coordinator.frontier().is_empty());
    assert_eq!(coordinator.records().work_count(), 2);

    let summary = coordinator.run().await.expect("Second crawl should complete");
    assert_eq!(summary.tasks_processed, 0);
    assert_eq!(summary.works, 2);
    assert_eq!(summary.chapters, 2);
}

#[tokio::test]
async fn test_fresh_run_recrawls_and_keeps_records() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 2).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    run_crawl(
        create_test_config(&mock_server.uri(), &db_path),
        false,
        "test-hash",
    )
    .await
    .expect("First crawl should complete");

    let summary = run_crawl(
        create_test_config(&mock_server.uri(), &db_path),
        true,
        "test-hash",
    )
    .await
    .expect("Fresh crawl should complete");

    assert_eq!(summary.tasks_processed, 5);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
    assert_eq!(storage.count_works().unwrap(), 2);
    assert_eq!(storage.count_chapters().unwrap(), 2);
    assert_eq!(storage.count_authored_works().unwrap(), 1);
}

#[tokio::test]
async fn test_resume_interrupted_frontier() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 0).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");
    let base_url = mock_server.uri();

    // Simulate a run that stopped after queueing the work page: the listing
    // is visited and the work task is still pending.
    {
        let mut storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
        storage.create_run("old-hash").unwrap();

        let mut frontier = folio_crawl::Frontier::new();
        frontier.enqueue(folio_crawl::CrawlTask::listing(format!(
            "{}/fictions/search?page=1",
            base_url
        )));
        frontier.dequeue();
        frontier.enqueue(folio_crawl::CrawlTask::work(format!(
            "{}/fiction/42/some-slug",
            base_url
        )));
        storage
            .save_checkpoint(&Default::default(), &frontier.take_journal())
            .unwrap();
    }

    let summary = run_crawl(create_test_config(&base_url, &db_path), false, "test-hash")
        .await
        .expect("Resumed crawl should complete");

    // work + two chapters, no listing
    assert_eq!(summary.tasks_processed, 3);
    assert_eq!(summary.tasks_failed, 0);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
    let works = storage.load_works().unwrap();
    assert_eq!(works[&42].author.as_deref(), Some("Jane Doe"));
    assert_eq!(works[&42].title, None);
    assert_eq!(storage.count_chapters().unwrap(), 2);

    let first_run = storage.get_run(1).unwrap();
    assert_eq!(first_run.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_malformed_page_does_not_halt_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fictions/search"))
        .respond_with(html(listing_page(&[listing_entry(
            "/fiction/42/some-slug",
            "Some Work",
            "1,234",
        )])))
        .mount(&mock_server)
        .await;

    // No header, so the author can't be found
    Mock::given(method("GET"))
        .and(path("/fiction/42/some-slug"))
        .respond_with(html("<html><body><p>Maintenance</p></body></html>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("crawl.db");

    let summary = run_crawl(
        create_test_config(&mock_server.uri(), &db_path),
        false,
        "test-hash",
    )
    .await
    .expect("Crawl should complete despite the bad page");

    assert_eq!(summary.tasks_processed, 2);
    assert_eq!(summary.tasks_failed, 1);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
    let works = storage.load_works().unwrap();
    assert_eq!(works[&42].title.as_deref(), Some("Some Work"));
    assert_eq!(works[&42].author, None);
}
