//! Source resolution and converter dispatch against files on disk.

use markitdown::{
    convert, convert_bytes, convert_local, load, ConversionConfig, FileType, MarkitdownError,
};
use reqwest::Url;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Ignored</title><style>p { color: red }</style></head>
<body>
  <header><h1>Site name</h1></header>
  <main>
    <h2>Getting started</h2>
    <p>Read the <a href="/docs/install">install guide</a> first.</p>
    <ol start="3"><li>Build</li><li>Test</li></ol>
  </main>
  <footer><p>Contact us</p></footer>
</body>
</html>"#;

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

#[tokio::test]
async fn local_html_uses_readability_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.HTM", ARTICLE);

    let md = convert_local(&path, &ConversionConfig::default()).await.unwrap();
    assert!(md.starts_with("Getting started") || md.starts_with("## Getting started"), "got: {md}");
    assert!(md.contains("[install guide](/docs/install)"), "got: {md}");
    assert!(md.contains("Build") && md.contains("Test"));
    assert!(!md.contains("Site name"));
    assert!(!md.contains("Contact us"));
}

#[tokio::test]
async fn raw_mode_keeps_page_chrome() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.html", ARTICLE);
    let config = ConversionConfig::builder()
        .html_readability(false)
        .build()
        .unwrap();

    let md = convert(&path, &config).await.unwrap();
    assert!(md.starts_with("Site name") || md.starts_with("# Site name"), "got: {md}");
    assert!(md.contains("Contact us"));
    assert!(!md.contains("color: red"));
}

#[tokio::test]
async fn html_host_absolutises_links() {
    let config = ConversionConfig::builder()
        .html_host("docs.example.org")
        .build()
        .unwrap();
    let md = convert_bytes(ARTICLE.as_bytes().to_vec(), FileType::Html, &config)
        .await
        .unwrap();
    assert!(
        md.contains("[install guide](https://docs.example.org/docs/install)"),
        "got: {md}"
    );
}

#[tokio::test]
async fn file_url_is_converted_like_a_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.html", ARTICLE);
    let url = Url::from_file_path(&path).unwrap();

    let from_url = convert(url.as_str(), &ConversionConfig::default()).await.unwrap();
    let from_path = convert(&path, &ConversionConfig::default()).await.unwrap();
    assert_eq!(from_url, from_path);
}

#[tokio::test]
async fn recognised_types_without_converter_are_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["book.epub", "letter.docx", "notes.md", "readme.txt"] {
        let path = write(dir.path(), name, "content");
        let err = convert(&path, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, MarkitdownError::UnsupportedFileType { .. }),
            "{name}: {err}"
        );
    }
}

#[tokio::test]
async fn load_reports_type_and_no_url_for_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "page.html", "<p>x</p>");

    let loaded = load(&path, 5).await.unwrap();
    assert_eq!(loaded.file_type, FileType::Html);
    assert!(loaded.url.is_none());
}

#[test]
fn html_conversion_is_deterministic() {
    let config = ConversionConfig::default();
    let first = tokio_test::block_on(convert_bytes(
        ARTICLE.as_bytes().to_vec(),
        FileType::Html,
        &config,
    ))
    .unwrap();
    let second = tokio_test::block_on(convert_bytes(
        ARTICLE.as_bytes().to_vec(),
        FileType::Html,
        &config,
    ))
    .unwrap();
    assert_eq!(first, second);
}

/// Serve `body` as `text/html` to a single connection on a loopback port.
async fn serve_once(body: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
    });
    port
}

#[tokio::test]
async fn fetched_page_links_keep_scheme_and_port() {
    let port = serve_once("<html><body><p><a href=\"/next.html\">next</a></p></body></html>").await;
    let url = format!("http://127.0.0.1:{port}/page.html");

    let md = convert(&url, &ConversionConfig::default()).await.unwrap();
    assert!(
        md.contains(&format!("[next](http://127.0.0.1:{port}/next.html)")),
        "got: {md}"
    );
}
