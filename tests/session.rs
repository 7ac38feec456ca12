//! Walker behaviour against a live HTTP server through `HttpSession`

use disclosure_fetcher::app::{
    GateOutcome, ListingOutcome, ListingSource, NoProgress, PageWalker, SessionConfig,
    SkipReason, WalkTermination, WalkerConfig,
};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/epstein/doj-disclosures/data-set-9-files";
const CONSENT_COOKIE: &str = "justiceGovAgeVerified=true";

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

fn listing(server: &MockServer) -> ListingSource {
    ListingSource::new(&format!("{}{}", server.uri(), LISTING_PATH), None).unwrap()
}

fn walker_config() -> WalkerConfig {
    WalkerConfig::default().without_delays()
}

const LINK_GATE: &str = r#"
    <div class="age-gate">
        <h2>Are you 18 years of age or older?</h2>
        <a class="button" href="/age-verify?destination=/epstein/doj-disclosures/data-set-9-files">Yes</a>
        <a class="button" href="https://www.example.gov/">No</a>
    </div>
"#;

const FIRST_PAGE: &str = r#"
    <ul>
        <li><a href="/files/DataSet%209/EFTA00039025.pdf">EFTA00039025.pdf</a></li>
        <li><a href="/files/DataSet%209/EFTA00039026.PPDF">EFTA00039026.PPDF</a></li>
        <li><a href="/epstein/about">About</a></li>
    </ul>
    <nav class="pager"><ul>
        <li class="pager__item pager__item--next"><a href="?page=1" rel="next">Next page</a></li>
    </ul></nav>
"#;

const SECOND_PAGE: &str = r#"
    <ul>
        <li><a href="/files/DataSet%209/EFTA00039025.pdf">EFTA00039025.pdf</a></li>
        <li><a href="/files/DataSet%209/EFTA00039027.pdf#page=3">EFTA00039027.pdf</a></li>
    </ul>
"#;

/// Listing pages answer with the gate until the consent cookie is present
async fn mount_gated_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .and(header("cookie", CONSENT_COOKIE))
        .respond_with(html(SECOND_PAGE))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(header("cookie", CONSENT_COOKIE))
        .respond_with(html(FIRST_PAGE))
        .with_priority(2)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(LINK_GATE))
        .mount(server)
        .await;
}

fn consent_redirect() -> ResponseTemplate {
    ResponseTemplate::new(302)
        .insert_header("location", LISTING_PATH)
        .insert_header("set-cookie", format!("{}; Path=/", CONSENT_COOKIE).as_str())
}

#[tokio::test]
async fn test_link_gate_sets_cookie_and_pagination_is_followed() {
    let server = MockServer::start().await;
    mount_gated_listing(&server).await;
    Mock::given(method("GET"))
        .and(path("/age-verify"))
        .respond_with(consent_redirect())
        .mount(&server)
        .await;

    let mut session = SessionConfig::default().launch().unwrap();
    let config = walker_config();
    let walker = PageWalker::new(&config, &NoProgress);
    let outcome = walker.walk_listing(&listing(&server), &mut session).await;

    let ListingOutcome::Walked { gate, report } = outcome else {
        panic!("listing should have been walked");
    };
    assert_eq!(gate, GateOutcome::Cleared);
    assert_eq!(report.termination, WalkTermination::Exhausted);
    assert_eq!(report.pages.len(), 2);
    assert!(report.pages[1].ends_with("?page=1"));

    let names: Vec<String> = report
        .documents
        .sorted()
        .iter()
        .map(|url| url.file_name())
        .collect();
    assert_eq!(
        names,
        vec!["EFTA00039025.pdf", "EFTA00039026.pdf", "EFTA00039027.pdf"]
    );
}

#[tokio::test]
async fn test_form_gate_is_submitted_with_its_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(header("cookie", CONSENT_COOKIE))
        .respond_with(html(SECOND_PAGE))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(
            r#"<p>Are you 18 years of age or older?</p>
               <form method="post" action="/consent">
                   <input type="hidden" name="form_token" value="abc">
                   <button type="submit" name="op" value="yes">Yes</button>
                   <button type="submit" name="op" value="no">No</button>
               </form>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/consent"))
        .and(body_string_contains("form_token=abc"))
        .and(body_string_contains("op=yes"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("location", LISTING_PATH)
                .insert_header("set-cookie", format!("{}; Path=/", CONSENT_COOKIE).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = SessionConfig::default().launch().unwrap();
    let config = walker_config();
    let walker = PageWalker::new(&config, &NoProgress);
    let outcome = walker.walk_listing(&listing(&server), &mut session).await;

    let ListingOutcome::Walked { gate, report } = outcome else {
        panic!("listing should have been walked");
    };
    assert_eq!(gate, GateOutcome::Cleared);
    assert_eq!(report.documents.len(), 2);
}

#[tokio::test]
async fn test_forbidden_listing_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("Access Denied"))
        .mount(&server)
        .await;

    let mut session = SessionConfig::default().launch().unwrap();
    let config = walker_config();
    let walker = PageWalker::new(&config, &NoProgress);
    let outcome = walker.walk_listing(&listing(&server), &mut session).await;

    assert!(matches!(
        outcome,
        ListingOutcome::Skipped {
            reason: SkipReason::Status { status: 403 }
        }
    ));
}

#[tokio::test]
async fn test_stuck_pager_terminates_as_loop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(&format!(
            r#"<a href="/files/A.pdf">A</a>
               <ul><li class="pager__item--next"><a href="{}">Next</a></li></ul>"#,
            LISTING_PATH
        )))
        .expect(2)
        .mount(&server)
        .await;

    let mut session = SessionConfig::default().launch().unwrap();
    let config = walker_config();
    let walker = PageWalker::new(&config, &NoProgress);
    let outcome = walker.walk_listing(&listing(&server), &mut session).await;

    let ListingOutcome::Walked { gate, report } = outcome else {
        panic!("listing should have been walked");
    };
    assert_eq!(gate, GateOutcome::NotPresent);
    assert!(matches!(report.termination, WalkTermination::LoopDetected { .. }));
    assert_eq!(report.documents.len(), 1);
}
