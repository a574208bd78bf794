//! End-to-end flows through the router: signed login, sessions, proof
//! tokens and payments.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, Utc};
use identity_proof::{AlgorithmId, CircuitStore, DevBackend};
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use gateway_server::services::accounts::hash_password;
use gateway_server::services::authenticator::format_timestamp;
use gateway_server::services::{
    CanonicalRequestSigner, IdentitySource, PaymentOrder, RequestSigner,
};
use gateway_server::store::{MemoryCache, MemoryStore, Store};
use gateway_server::types::{AdditionalInfo, Amount, CustomerRecord, PartnerIdentity};
use gateway_server::{create_routes, AppState, Config};

const SECRET: &str = "secret";
const PASSWORD: &str = "s3cret";

struct Harness {
    app: Router,
    state: AppState,
    store: Arc<MemoryStore>,
    rsa: RequestSigner,
    hmac: RequestSigner,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();

    let key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let public_key_path = dir.path().join("rsa256-public.pem");
    let private_key_path = dir.path().join("rsa256-private.pem");
    std::fs::write(
        &public_key_path,
        key.to_public_key().to_public_key_pem(LineEnding::LF).unwrap(),
    )
    .unwrap();
    std::fs::write(
        &private_key_path,
        key.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes(),
    )
    .unwrap();

    let config = Config {
        secret: SECRET.into(),
        dev_mode: true,
        public_key_path,
        private_key_path,
        circuit_dir: dir.path().join("circuit"),
        ..Default::default()
    };

    let backend = Arc::new(DevBackend::new());
    let circuits = CircuitStore::new(&config.circuit_dir);
    for algorithm in AlgorithmId::ALL {
        circuits.initialize(backend.as_ref(), algorithm).unwrap();
    }

    let store = Arc::new(MemoryStore::new());
    store
        .add_customer(CustomerRecord {
            id: "C1".into(),
            ktp: "3171012345678901".into(),
            account: "0011223344".into(),
            name: "Siti Rahma".into(),
            branch: "Jakarta".into(),
            mother_name: "Ani".into(),
        })
        .await;
    store
        .add_partner(PartnerIdentity {
            id: "partner-1".into(),
            reference_no: "P1".into(),
            username: "acme".into(),
            password_hash: hash_password(PASSWORD).unwrap(),
        })
        .await;

    let state = AppState::new(config, store.clone(), Arc::new(MemoryCache::new()), backend).unwrap();

    Harness {
        app: create_routes(state.clone()),
        state,
        store,
        rsa: RequestSigner::Rsa(key),
        hmac: RequestSigner::Hmac(SECRET.as_bytes().to_vec()),
        _dir: dir,
    }
}

fn now() -> String {
    format_timestamp(Utc::now().fixed_offset())
}

fn signed(
    signer: &RequestSigner,
    method: &str,
    path: &str,
    body: &str,
    timestamp: &str,
    bearer: Option<&str>,
) -> Request<Body> {
    let string_to_sign = CanonicalRequestSigner::new(SECRET)
        .string_to_sign(method, path, body.as_bytes(), timestamp)
        .unwrap();

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .header("X-SIGNATURE", signer.sign(&string_to_sign).unwrap())
        .header("X-TIMESTAMP", timestamp)
        .header("X-PARTNER-ID", "partner-1")
        .header("X-EXTERNAL-ID", "ext-1")
        .header("CHANNEL-ID", "95221")
        .header("X-DEVICE-ID", "dev-1");
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn login(h: &Harness, signer: &RequestSigner, path: &str) -> String {
    let body = json!({"username": "acme", "password": PASSWORD}).to_string();
    let (status, value) = send(&h.app, signed(signer, "POST", path, &body, &now(), None)).await;
    assert_eq!(status, StatusCode::OK, "{value}");
    value["data"]["accessToken"].as_str().unwrap().to_string()
}

async fn issue(h: &Harness, algo: &str, id: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(format!("/api/v1/proof?algo={algo}&id={id}"))
        .body(Body::empty())
        .unwrap();
    send(&h.app, request).await
}

#[tokio::test]
async fn test_payment_with_redeemed_proof() {
    let h = harness().await;

    let token = tokio_test::assert_ok!(h.state.proofs().issue("C1", AlgorithmId::Elliptic).await);
    let redemption = h.state.proofs().redeem(&token, AlgorithmId::Elliptic).await;
    assert!(redemption.valid);
    assert_eq!(redemption.customer_id, "C1");

    let order = PaymentOrder {
        partner_reference_no: "P1".into(),
        amount: Amount {
            value: "100".into(),
            currency: "USD".into(),
        },
        additional_info: AdditionalInfo::default(),
    };
    let id = tokio_test::assert_ok!(
        h.state
            .payments()
            .authorize(IdentitySource::Proof(redemption), order)
            .await
    );

    let record = h.store.payment_by_id(&id).await.unwrap().unwrap();
    assert_eq!(record.partner_id, "partner-1");
    assert_eq!(record.consumer_id, "C1");
    assert_eq!(record.amount, "100");
    assert_eq!(record.currency, "USD");
}

#[tokio::test]
async fn test_hmac_login_and_ping() {
    let h = harness().await;
    let token = login(&h, &h.hmac, "/api/v1/hmac/login").await;

    let (status, value) = send(
        &h.app,
        signed(&h.hmac, "GET", "/api/v1/hmac/ping", "", &now(), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["data"]["name"], "gateway-server");

    // Signed but no session
    let (status, value) = send(
        &h.app,
        signed(&h.hmac, "GET", "/api/v1/hmac/ping", "", &now(), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_rejected_signatures_look_alike() {
    let h = harness().await;
    let body = json!({"username": "acme", "password": PASSWORD}).to_string();

    let (ok_status, ok_body) = send(
        &h.app,
        signed(&h.hmac, "POST", "/api/v1/hmac/login", &body, &now(), None),
    )
    .await;
    assert_eq!(ok_status, StatusCode::OK, "{ok_body}");

    let stale = format_timestamp((Utc::now() - Duration::hours(6)).fixed_offset());
    let (stale_status, stale_body) = send(
        &h.app,
        signed(&h.hmac, "POST", "/api/v1/hmac/login", &body, &stale, None),
    )
    .await;

    let forged = RequestSigner::Hmac(b"not-the-secret".to_vec());
    let (forged_status, forged_body) = send(
        &h.app,
        signed(&forged, "POST", "/api/v1/hmac/login", &body, &now(), None),
    )
    .await;

    // An HMAC signature on an RSA route
    let (cross_status, _) = send(
        &h.app,
        signed(&h.hmac, "POST", "/api/v1/rsa/login", &body, &now(), None),
    )
    .await;

    assert_eq!(stale_status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged_status, StatusCode::UNAUTHORIZED);
    assert_eq!(cross_status, StatusCode::UNAUTHORIZED);
    assert_eq!(stale_body, forged_body);
}

#[tokio::test]
async fn test_rsa_signature_with_one_corrupted_byte() {
    let h = harness().await;
    let body = json!({"username": "acme", "password": PASSWORD}).to_string();
    let timestamp = now();

    let (status, value) = send(
        &h.app,
        signed(&h.rsa, "POST", "/api/v1/rsa/login", &body, &timestamp, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{value}");

    let mut request = signed(&h.rsa, "POST", "/api/v1/rsa/login", &body, &timestamp, None);
    let mut signature = STANDARD
        .decode(request.headers()["x-signature"].as_bytes())
        .unwrap();
    signature[17] ^= 0x80;
    request
        .headers_mut()
        .insert("x-signature", STANDARD.encode(signature).parse().unwrap());

    let (status, value) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_signature_covers_full_route_path() {
    let h = harness().await;
    let body = json!({"username": "acme", "password": PASSWORD}).to_string();
    let timestamp = now();

    // Signed over the path without the root URL, sent to the real route
    let string_to_sign = CanonicalRequestSigner::new(SECRET)
        .string_to_sign("POST", "/hmac/login", body.as_bytes(), &timestamp)
        .unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/hmac/login")
        .header("content-type", "application/json")
        .header("X-SIGNATURE", h.hmac.sign(&string_to_sign).unwrap())
        .header("X-TIMESTAMP", timestamp.as_str())
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, value) = send(
        &h.app,
        signed(&h.hmac, "POST", "/api/v1/hmac/login", &body, &timestamp, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{value}");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let h = harness().await;
    let body = format!(r#"{{"username": "{}"}}"#, "a".repeat(3 * 1024 * 1024));

    let (status, value) = send(
        &h.app,
        signed(&h.hmac, "POST", "/api/v1/hmac/login", &body, &now(), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_proof_tokens_over_http() {
    let h = harness().await;
    let session = login(&h, &h.rsa, "/api/v1/rsa/login").await;

    for algo in ["elliptic", "hash", "eddsa"] {
        let (status, value) = issue(&h, algo, "C1").await;
        assert_eq!(status, StatusCode::OK, "{algo}: {value}");
        let hash = value["data"]["hash"].as_str().unwrap();

        let body = json!({"algo": algo, "proof": hash}).to_string();
        let (status, value) = send(
            &h.app,
            signed(&h.rsa, "POST", "/api/v1/rsa/proof", &body, &now(), Some(&session)),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{algo}: {value}");
        assert_eq!(value["message"], "Success");
    }

    let body = json!({"algo": "elliptic", "proof": "bm90LWEtdG9rZW4="}).to_string();
    let (status, _) = send(
        &h.app,
        signed(&h.rsa, "POST", "/api/v1/rsa/proof", &body, &now(), Some(&session)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, value) = issue(&h, "groth", "C1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "INVALID_INPUT");

    let (status, value) = issue(&h, "elliptic", "C404").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_payment_endpoints() {
    let h = harness().await;
    let session = login(&h, &h.rsa, "/api/v1/rsa/login").await;

    let body = json!({
        "partnerReferenceNo": "P1",
        "customerNumber": "0011223344",
        "amount": {"value": "250", "currency": "IDR"},
        "additionalInfo": {"deviceId": "dev-7", "channel": "mobile"}
    })
    .to_string();
    let (status, value) = send(
        &h.app,
        signed(&h.rsa, "POST", "/api/v1/transaction/payment", &body, &now(), Some(&session)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{value}");
    let id = value["data"]["id"].as_str().unwrap();
    let record = h.store.payment_by_id(id).await.unwrap().unwrap();
    assert_eq!(record.consumer_id, "C1");
    assert_eq!(record.additional_info.device_id, "dev-7");

    let (_, issued) = issue(&h, "hash", "C1").await;
    let body = json!({
        "partnerReferenceNo": "P1",
        "algo": "hash",
        "proof": issued["data"]["hash"],
        "amount": {"value": "100", "currency": "USD"}
    })
    .to_string();
    let (status, value) = send(
        &h.app,
        signed(&h.rsa, "POST", "/api/v1/transaction/payment-proof", &body, &now(), Some(&session)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{value}");
    let id = value["data"]["id"].as_str().unwrap();
    let record = h.store.payment_by_id(id).await.unwrap().unwrap();
    assert_eq!(record.partner_id, "partner-1");
    assert_eq!(record.consumer_id, "C1");
    // Filled from the signed headers
    assert_eq!(record.additional_info.device_id, "dev-1");
    assert_eq!(record.additional_info.channel, "95221");

    let body = json!({
        "partnerReferenceNo": "P1",
        "algo": "hash",
        "proof": "garbage",
        "amount": {"value": "100", "currency": "USD"}
    })
    .to_string();
    let (status, _) = send(
        &h.app,
        signed(&h.rsa, "POST", "/api/v1/transaction/payment-proof", &body, &now(), Some(&session)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.store.payment_count().await, 2);
}

#[tokio::test]
async fn test_signup_and_signing_helper() {
    let h = harness().await;

    let signup = |username: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/v1/signup")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"username": username, "password": "hunter22"}).to_string(),
            ))
            .unwrap()
    };
    let (status, value) = send(&h.app, signup("globex")).await;
    assert_eq!(status, StatusCode::CREATED, "{value}");
    assert!(value["data"]["id"].as_str().is_some());

    let (status, value) = send(&h.app, signup("globex")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], "INVALID_INPUT");

    // Let the gateway sign the login for the new partner
    let timestamp = now();
    let login_body = r#"{"username":"globex","password":"hunter22"}"#;
    let helper = Request::builder()
        .method("POST")
        .uri("/api/v1/token-hmac")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "method": "POST",
                "endpoint": "/api/v1/hmac/login",
                "timestamp": timestamp,
                "bodyCompact": login_body
            })
            .to_string(),
        ))
        .unwrap();
    let (status, value) = send(&h.app, helper).await;
    assert_eq!(status, StatusCode::CREATED, "{value}");
    let signature = value["data"]["signature"].as_str().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/hmac/login")
        .header("content-type", "application/json")
        .header("X-SIGNATURE", signature)
        .header("X-TIMESTAMP", timestamp.as_str())
        .body(Body::from(login_body))
        .unwrap();
    let (status, value) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK, "{value}");
    assert!(value["data"]["refreshToken"].as_str().is_some());
}

#[tokio::test]
async fn test_health_lists_ready_circuits() {
    let h = harness().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, value) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["circuits_ready"], json!(["elliptic", "hash", "eddsa"]));
}
