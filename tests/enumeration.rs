use std::collections::HashSet;
use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use pagode_lib::{Credential, CredentialPool, Dispatcher, Error, ResultSink, SearchClient};
use serde_json::json;
use tokio::fs::File;

const PATH: &str = "/customsearch/v1";

fn search_client(server: &ServerGuard, keys: &[&str]) -> Arc<SearchClient> {
    let pool = CredentialPool::new(
        keys.iter()
            .map(|key| Credential::new(*key, "cx"))
            .collect(),
    )
    .unwrap();
    Arc::new(
        SearchClient::new(Arc::new(pool), None)
            .unwrap()
            .with_endpoint(format!("{}{}", server.url(), PATH)),
    )
}

fn body(links: &[&str]) -> String {
    let items: Vec<_> = links.iter().map(|link| json!({ "link": link })).collect();
    json!({ "items": items }).to_string()
}

async fn answer(server: &mut ServerGuard, query: &str, start: usize, body: String) {
    server
        .mock("GET", PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), query.into()),
            Matcher::UrlEncoded("start".into(), start.to_string()),
        ]))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
}

async fn read_set(path: &std::path::Path) -> HashSet<String> {
    tokio::fs::read_to_string(path)
        .await
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn domain_scoped_dorks_stream_every_link() {
    let mut server = Server::new_async().await;
    answer(&mut server, "a site:example.com", 1, body(&["u1"])).await;
    answer(&mut server, "a site:example.com", 11, "{}".into()).await;
    answer(&mut server, "b site:example.com", 1, "{}".into()).await;
    answer(&mut server, "c site:example.com", 1, body(&["u2", "u3"])).await;
    answer(&mut server, "c site:example.com", 11, "{}".into()).await;

    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("stdout.txt");
    let mirror = dir.path().join("mirror.txt");
    let sink = ResultSink::new(File::create(&primary).await.unwrap())
        .with_output_file(&mirror)
        .await
        .unwrap();

    let summary = Dispatcher::new(search_client(&server, &["k0"]), 2)
        .with_domain(Some("example.com"))
        .run("a\nb\nc\n".as_bytes(), sink)
        .await
        .unwrap();

    let expected: HashSet<String> = ["u1", "u2", "u3"].iter().map(|s| s.to_string()).collect();
    assert_eq!(summary.dorks, 3);
    assert_eq!(summary.links, 3);
    assert_eq!(read_set(&primary).await, expected);
    assert_eq!(read_set(&mirror).await, expected);
}

#[tokio::test]
async fn pool_exhaustion_is_the_run_error() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(429)
        .expect_at_least(3)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let sink = ResultSink::new(File::create(&out).await.unwrap());

    let err = Dispatcher::new(search_client(&server, &["k0", "k1", "k2"]), 4)
        .run("a\nb\nc\nd\ne\n".as_bytes(), sink)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CredentialsExhausted { .. }));
    assert!(read_set(&out).await.is_empty());
    // Each of the three keys was tried before giving up.
    limited.assert_async().await;
}
