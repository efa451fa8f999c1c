// End-to-end pipeline tests against a mocked traffic API.

use figment::Figment;
use figment::providers::{Format, Toml};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use traffic_md::{Config, RepositoryRef, render, write_report};

const TOKEN: &str = "test-token";

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer, repos: &[&str], order: &[&str]) -> Config {
    let toml = format!(
        r#"
        api_token = "{TOKEN}"
        owner = "me"
        repositories = {repos:?}
        display_order = {order:?}
        api_base = "{base}"
        preview = false
        "#,
        base = server.uri(),
    );
    Config::from_figment(&Figment::new().merge(Toml::string(&toml))).unwrap()
}

fn views(count: u64, uniques: u64) -> Value {
    json!({
        "count": count,
        "uniques": uniques,
        "views": [
            { "timestamp": "2023-01-01T00:00:00Z", "count": count, "uniques": uniques }
        ]
    })
}

fn clones(count: u64) -> Value {
    json!({
        "count": count,
        "uniques": 1,
        "clones": [
            { "timestamp": "2023-01-02T00:00:00Z", "count": count, "uniques": 1 }
        ]
    })
}

fn paths(repo: &str) -> Value {
    json!([
        { "path": format!("/me/{repo}"), "title": repo, "count": 4, "uniques": 2 }
    ])
}

async fn mount(server: &MockServer, endpoint: String, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_repo(server: &MockServer, repo: &str) {
    let base = format!("/repos/me/{repo}/traffic");
    mount(
        server,
        format!("{base}/views"),
        ResponseTemplate::new(200).set_body_json(views(10, 8)),
    )
    .await;
    mount(
        server,
        format!("{base}/popular/paths"),
        ResponseTemplate::new(200).set_body_json(paths(repo)),
    )
    .await;
    mount(
        server,
        format!("{base}/clones"),
        ResponseTemplate::new(200).set_body_json(clones(3)),
    )
    .await;
}

fn section<'a>(doc: &'a str, name: &str) -> &'a str {
    let heading = format!("# {name} <br/>\n");
    let start = doc.find(&heading).unwrap();
    let rest = &doc[start + heading.len()..];
    let end = rest.find("\n# ").map(|i| i + 1).unwrap_or(rest.len());
    &rest[..end]
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn one_failed_endpoint_only_drops_that_metric() {
    let server = MockServer::start().await;
    mount_repo(&server, "alpha").await;
    mount_repo(&server, "charlie").await;
    mount(
        &server,
        "/repos/me/bravo/traffic/views".into(),
        ResponseTemplate::new(200).set_body_json(views(2, 1)),
    )
    .await;
    mount(
        &server,
        "/repos/me/bravo/traffic/popular/paths".into(),
        ResponseTemplate::new(200).set_body_json(paths("bravo")),
    )
    .await;
    mount(
        &server,
        "/repos/me/bravo/traffic/clones".into(),
        ResponseTemplate::new(500).set_body_string("boom"),
    )
    .await;

    let config = config_for(&server, &["alpha", "bravo", "charlie"], &[]);
    let doc = traffic_md::generate(&config).await.unwrap();

    for name in ["alpha", "charlie"] {
        let body = section(&doc, name);
        assert!(body.contains("**views** <br/>"), "{name}: {body}");
        assert!(body.contains(&format!("`github.com/me/{name}`: all = 4, unique = 2<br/>")));
        assert!(body.contains("**clones** <br/>"), "{name}: {body}");
    }

    let bravo = section(&doc, "bravo");
    assert!(bravo.contains("| `total` | 2 | 1 |"));
    assert!(bravo.contains("**paths** <br/>"));
    assert!(!bravo.contains("**clones**"));
    assert!(!doc.contains("boom"));
}

#[tokio::test]
async fn display_order_wins_over_completion_order() {
    let server = MockServer::start().await;
    for repo in ["alpha", "bravo", "charlie"] {
        mount_repo(&server, repo).await;
    }

    let config = config_for(
        &server,
        &["alpha", "bravo", "charlie"],
        &["charlie", "bravo", "alpha"],
    );
    let doc = traffic_md::generate(&config).await.unwrap();

    let headings: Vec<&str> = doc.lines().filter(|l| l.starts_with("# ")).collect();
    assert_eq!(
        headings,
        vec!["# charlie <br/>", "# bravo <br/>", "# alpha <br/>"]
    );
}

#[tokio::test]
async fn quiet_repository_gets_no_heading() {
    let server = MockServer::start().await;
    mount_repo(&server, "busy").await;
    let base = "/repos/me/quiet/traffic";
    mount(
        &server,
        format!("{base}/views"),
        ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "uniques": 0, "views": [] })),
    )
    .await;
    mount(
        &server,
        format!("{base}/popular/paths"),
        ResponseTemplate::new(200).set_body_json(json!([])),
    )
    .await;
    mount(
        &server,
        format!("{base}/clones"),
        ResponseTemplate::new(200).set_body_json(json!({ "count": 0, "uniques": 0, "clones": [] })),
    )
    .await;

    let config = config_for(&server, &["quiet", "busy"], &[]);
    let report = traffic_md::collect_report(&config).await.unwrap();

    assert!(report.get(&RepositoryRef::new("me", "quiet")).is_none());
    let doc = render(&report, &config.display_order());
    assert!(doc.starts_with("# busy <br/>\n"));
    assert!(!doc.contains("quiet"));
}

#[tokio::test]
async fn report_file_is_replaced_on_each_run() {
    let server = MockServer::start().await;
    mount_repo(&server, "alpha").await;
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("traffic.md");
    std::fs::write(&output, "# old <br/>\n".repeat(50)).unwrap();

    let config = config_for(&server, &["alpha"], &[]);
    let doc = traffic_md::generate(&config).await.unwrap();
    write_report(&doc, &output).unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, doc);
    assert!(!written.contains("# old"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
