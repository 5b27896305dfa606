//! Integration test: cover pipeline against a local catalog server.
//!
//! Drives the curl-backed MangaDex client through search, paged cover
//! listing and cover download, then re-runs over the same directory.

mod common;

use common::catalog_server::{self, CatalogServer, Route};
use mangashelf_core::catalog::MangaDexClient;
use mangashelf_core::config::{EndpointsConfig, HttpConfig};
use mangashelf_core::covers::{run_covers, CoverOptions, CoverRequest};
use mangashelf_core::http::HttpClient;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn manga(id: &str, title: &str) -> String {
    format!(
        r#"{{"result":"ok","response":"collection","data":[{{"id":"{}","type":"manga","attributes":{{"title":{{"en":"{}"}}}}}}],"limit":10,"offset":0,"total":1}}"#,
        id, title
    )
}

fn cover_page(entries: &[(&str, Option<&str>)], total: usize) -> String {
    let data: Vec<String> = entries
        .iter()
        .map(|(file, volume)| {
            let volume = match volume {
                Some(v) => format!("\"{}\"", v),
                None => "null".to_string(),
            };
            format!(
                r#"{{"id":"c-{}","type":"cover_art","attributes":{{"volume":{},"fileName":"{}"}}}}"#,
                file, volume, file
            )
        })
        .collect();
    format!(r#"{{"result":"ok","data":[{}],"total":{}}}"#, data.join(","), total)
}

fn start_server(broken_cover: bool) -> CatalogServer {
    let mut routes = vec![
        Route::get("/manga", manga("id-a", "Title A")).when("title=Title+A"),
        Route::get("/manga", manga("id-b", "Title B Remastered")).when("title=Title+B"),
        Route::get("/manga", r#"{"result":"ok","data":[],"total":0}"#),
        // Two pages: the server ignores `limit`, so the client must follow `total`.
        Route::get("/cover", cover_page(&[("one.jpg", Some("1")), ("two.png", Some("2"))], 3))
            .when("id-a")
            .when("offset=0"),
        Route::get("/cover", cover_page(&[("extra.jpg", None)], 3))
            .when("id-a")
            .when("offset=2"),
        Route::get("/uploads/covers/id-a/one.jpg", b"jpeg one".to_vec()),
        Route::get("/uploads/covers/id-a/extra.jpg", b"jpeg extra".to_vec()),
    ];
    let two = Route::get("/uploads/covers/id-a/two.png", b"png two".to_vec());
    routes.push(if broken_cover { two.status(500) } else { two });
    catalog_server::start(routes)
}

fn client(server: &CatalogServer) -> Arc<MangaDexClient> {
    let endpoints = EndpointsConfig {
        mangadex_api: server.base().to_string(),
        mangadex_uploads: format!("{}/uploads", server.base()),
        mangaupdates_api: server.base().to_string(),
    };
    let http = HttpClient::new(&HttpConfig::default());
    Arc::new(MangaDexClient::new(http, &endpoints).unwrap())
}

fn options(dir: &Path) -> CoverOptions {
    CoverOptions {
        out_dir: dir.to_path_buf(),
        cover_concurrency: 5,
        entry_concurrency: 0,
        search_interval: Duration::ZERO,
        download_inexact_matches: false,
    }
}

fn request() -> CoverRequest {
    CoverRequest::Titles(vec![
        "Title A".to_string(),
        "Title B".to_string(),
        "Nothing".to_string(),
    ])
}

fn archive_entry(path: &Path) -> (String, Vec<u8>) {
    let mut zip = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut entry = zip.by_index(0).unwrap();
    let name = entry.name().to_string();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    (name, data)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn downloads_covers_then_skips_them_on_rerun() {
    let server = start_server(false);
    let source = client(&server);
    let dir = tempdir().unwrap();
    let opts = options(dir.path());

    let mut report = Vec::new();
    let summary = run_covers(
        Arc::clone(&source),
        request(),
        &mut report,
        &opts,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.not_found, 2);
    assert_eq!(summary.fetched, 3);
    assert_eq!(
        String::from_utf8(report).unwrap(),
        "Title B,\nNothing,\n"
    );
    assert_eq!(server.requests_to("/cover").len(), 2, "{:?}", server.requests());

    let series = dir.path().join("Title A");
    assert_eq!(
        archive_entry(&series.join("Title A - Volume 1.zip")),
        ("cover.jpg".to_string(), b"jpeg one".to_vec())
    );
    assert_eq!(
        archive_entry(&series.join("Title A - Volume 2.zip")),
        ("cover.png".to_string(), b"png two".to_vec())
    );
    assert_eq!(
        archive_entry(&series.join("Title A - No Volume.zip")).1,
        b"jpeg extra".to_vec()
    );

    let before = server.requests_to("/uploads").len();
    let mut report = Vec::new();
    let summary = run_covers(source, request(), &mut report, &opts, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.fetched, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(server.requests_to("/uploads").len(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn server_error_on_a_cover_fails_the_run() {
    let server = start_server(true);
    let dir = tempdir().unwrap();

    let mut report = Vec::new();
    let err = run_covers(
        client(&server),
        request(),
        &mut report,
        &options(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    let msg = format!("{:#}", err);
    assert!(msg.contains("error downloading cover two.png"), "{}", msg);
    assert!(msg.contains("HTTP 500"), "{}", msg);
    assert!(!dir.path().join("Title A").join("Title A - Volume 2.zip").exists());
    assert!(!dir
        .path()
        .join("Title A")
        .join("Title A - Volume 2.zip.part")
        .exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ids_skip_the_search_endpoint() {
    let server = catalog_server::start(vec![
        Route::get(
            "/manga/id-a",
            r#"{"result":"ok","data":{"id":"id-a","type":"manga","attributes":{"title":{"en":"Title A"}}}}"#,
        ),
        Route::get("/cover", cover_page(&[("one.jpg", Some("1"))], 1)).when("id-a"),
        Route::get("/uploads/covers/id-a/one.jpg", b"jpeg one".to_vec()),
    ]);
    let dir = tempdir().unwrap();

    let mut report = Vec::new();
    let summary = run_covers(
        client(&server),
        CoverRequest::Ids(vec!["id-a".to_string(), "id-missing".to_string()]),
        &mut report,
        &options(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.fetched, 1);
    assert_eq!(
        String::from_utf8(report).unwrap(),
        "id-missing,\n"
    );
    assert!(server
        .requests()
        .iter()
        .all(|line| !line.contains("/manga?")));
}
