// Popup handshake against stub procedure and issuer services
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::{test, web, App, HttpResponse, HttpServer};
use serde_json::{json, Value};

use stampgate::handshake::{
    AuthorizationHandshake, HandshakeOutcome, HandshakeServices, HandshakeState, RedirectHub,
};
use stampgate::issuance::MemoryStampStore;
use stampgate::models::HandshakeError;
use stampgate::settings::HandshakeSettings;
use stampgate::testing::constants::TEST_ADDRESS;
use stampgate::testing::mock::{MockSigner, RecordingPopupOpener};
use stampgate::testing::TestFixtures;
use stampgate::{configure_services, ProviderRegistry};

#[derive(Default)]
struct StubState {
    verify_calls: AtomicUsize,
}

async fn stub_generate_auth_url(path: web::Path<String>, body: web::Json<Value>) -> HttpResponse {
    let provider = path.into_inner();
    let callback = body["callback"].as_str().unwrap_or_default().to_string();
    HttpResponse::Ok().json(json!({
        "authUrl": format!("https://auth.example/{provider}/authorize?redirect_uri={callback}")
    }))
}

async fn stub_broken_auth_url() -> HttpResponse {
    HttpResponse::InternalServerError().finish()
}

async fn stub_malformed_auth_url() -> HttpResponse {
    HttpResponse::Ok().json(json!({"url": "https://auth.example"}))
}

async fn stub_challenge(body: web::Json<Value>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "credential": {
            "credentialSubject": {
                "address": body["payload"]["address"],
                "challenge": "I commit that this wallet is under my control"
            }
        }
    }))
}

async fn stub_verify(body: web::Json<Value>, state: web::Data<StubState>) -> HttpResponse {
    state.verify_calls.fetch_add(1, Ordering::SeqCst);
    let signed = body["signature"]
        .as_str()
        .is_some_and(|signature| signature.starts_with("signed:"));
    if signed && body["payload"]["proofs"]["code"] == "good-code" {
        HttpResponse::Ok().json(json!({
            "credential": {
                "credentialSubject": {
                    "provider": body["payload"]["type"],
                    "address": body["payload"]["address"]
                }
            },
            "record": {"username": "octocat"}
        }))
    } else {
        HttpResponse::Ok().json(json!({"error": "Unable to verify proofs"}))
    }
}

async fn start_stub(state: web::Data<StubState>) -> (String, ServerHandle) {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/procedure/{provider}/generateAuthUrl", web::post().to(stub_generate_auth_url))
            .route("/broken/{provider}/generateAuthUrl", web::post().to(stub_broken_auth_url))
            .route("/malformed/{provider}/generateAuthUrl", web::post().to(stub_malformed_auth_url))
            .route("/api/v0.0.0/challenge", web::post().to(stub_challenge))
            .route("/api/v0.0.0/verify", web::post().to(stub_verify))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let address = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (format!("http://{address}"), handle)
}

struct Flow {
    handshake: AuthorizationHandshake,
    popup: Arc<RecordingPopupOpener>,
    store: Arc<MemoryStampStore>,
}

fn flow(base: &str, procedure_path: &str) -> Flow {
    let settings = HandshakeSettings {
        procedure_url: format!("{base}/{procedure_path}/"),
        issuer_url: format!("{base}/api/"),
        ..HandshakeSettings::default()
    };
    let popup = Arc::new(RecordingPopupOpener::default());
    let store = Arc::new(MemoryStampStore::new());
    let services = HandshakeServices {
        popup: popup.clone(),
        ..HandshakeServices::from_settings(
            &settings,
            &reqwest::Client::new(),
            Arc::new(MockSigner::new(TEST_ADDRESS)),
            store.clone(),
        )
    };
    let callback = "http://localhost:8080/github/callback";
    Flow {
        handshake: AuthorizationHandshake::new("Github", callback, &settings, services),
        popup,
        store,
    }
}

#[actix_web::test]
async fn duplicate_callbacks_issue_one_stamp() {
    let state = web::Data::new(StubState::default());
    let (base, stub) = start_stub(state.clone()).await;
    let mut flow = flow(&base, "procedure");

    flow.handshake.start().await.unwrap();
    assert_eq!(flow.handshake.state(), HandshakeState::AwaitingRedirect);
    let opened = flow.popup.opened();
    assert!(opened[0].0.starts_with("https://auth.example/github/authorize"));
    assert!(opened[0].0.ends_with("redirect_uri=http://localhost:8080/github/callback"));

    let hub = RedirectHub::new();
    let mut subscription = flow.handshake.subscribe(&hub);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(TestFixtures::oauth_config()))
            .app_data(web::Data::new(ProviderRegistry::new()))
            .app_data(web::Data::new(hub.clone()))
            .configure(configure_services),
    )
    .await;

    // the browser fires the redirect twice
    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/github/callback?code=good-code&state=state-1")
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }

    let outcome = flow.handshake.listen(&mut subscription).await;
    assert!(
        matches!(outcome, Some(HandshakeOutcome::Issued(ref stamp)) if stamp.provider == "Github")
    );
    assert_eq!(flow.handshake.state(), HandshakeState::Idle);

    let pending = flow.handshake.listen(&mut subscription);
    let second = tokio::time::timeout(Duration::from_millis(100), pending).await;
    assert!(second.is_err(), "duplicate redirect must not be processed");

    assert_eq!(state.verify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(flow.store.stamps().len(), 1);

    drop(subscription);
    assert_eq!(hub.subscriber_count("github_oauth_channel"), 0);
    stub.stop(false).await;
}

#[actix_web::test]
async fn rejected_proofs_store_nothing() {
    let state = web::Data::new(StubState::default());
    let (base, stub) = start_stub(state.clone()).await;
    let mut flow = flow(&base, "procedure");

    let hub = RedirectHub::new();
    let mut subscription = flow.handshake.subscribe(&hub);
    hub.publish(
        "github_oauth_channel",
        stampgate::models::RedirectMessage::new("github", "expired-code", "state-2"),
    );

    let outcome = flow.handshake.listen(&mut subscription).await;
    assert_eq!(outcome, Some(HandshakeOutcome::NotIssued));
    assert_eq!(flow.handshake.state(), HandshakeState::Idle);
    assert!(flow.store.stamps().is_empty());
    assert_eq!(state.verify_calls.load(Ordering::SeqCst), 1);
    stub.stop(false).await;
}

#[actix_web::test]
async fn failing_procedure_service_leaves_handshake_idle() {
    let (base, stub) = start_stub(web::Data::new(StubState::default())).await;

    for path in ["broken", "malformed"] {
        let mut flow = flow(&base, path);
        let result = flow.handshake.start().await;

        assert!(matches!(result, Err(HandshakeError::AuthUrl(_))), "{path}");
        assert_eq!(flow.handshake.state(), HandshakeState::Idle);
        assert!(flow.popup.opened().is_empty());
    }
    stub.stop(false).await;
}
