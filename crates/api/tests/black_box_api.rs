use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use guildhall_auth::{Hs256SessionCodec, PasswordHasher, Principal, SessionClaims};
use guildhall_core::{DomainResult, UserId};
use guildhall_infra::{BootstrapAdmin, GuildhallConfig, InMemoryDirectory, Services, seed};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@guildhall.test";
const ADMIN_PASSWORD: &str = "admin-password";

/// Skips argon2 so each test stays fast.
struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> DomainResult<bool> {
        Ok(hash.strip_prefix("plain$") == Some(password))
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = GuildhallConfig {
            jwt_secret: JWT_SECRET.to_string(),
            bootstrap_admin: Some(BootstrapAdmin {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            }),
            ..GuildhallConfig::default()
        };
        let directory = Arc::new(InMemoryDirectory::new());
        seed(&directory, config.bootstrap_admin.as_ref(), &PlainHasher).unwrap();
        let services = Services::with_collaborators(
            directory,
            &config,
            Arc::new(PlainHasher),
            Arc::new(Hs256SessionCodec::new(JWT_SECRET.as_bytes())),
        );

        // Same router as prod, bound to an ephemeral port.
        let app = guildhall_api::app::router(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Value {
        let res = self
            .client
            .post(self.url("/auth/sign-in"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    async fn admin_token(&self) -> String {
        self.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, epoch: u64) -> String {
    let principal = Principal::new(sub, Default::default(), epoch);
    let claims = SessionClaims::issue(&principal, Utc::now(), ChronoDuration::minutes(10));
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Create a user, an organisation, and make the user a member at `tier`.
async fn create_member(srv: &TestServer, admin: &str, email: &str, tier: &str) -> String {
    let res = srv
        .send(reqwest::Method::POST, "/admin/organisations", admin, json!({ "name": "Acme Ltd", "type": "INDUSTRY" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let org: Value = res.json().await.unwrap();

    let res = srv
        .send(
            reqwest::Method::POST,
            "/users",
            admin,
            json!({ "email": email, "first_name": "Mia", "last_name": "Member", "password": "password1" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    let id = user["id"].as_str().unwrap().to_string();

    let res = srv
        .send(
            reqwest::Method::PATCH,
            &format!("/users/{id}"),
            admin,
            json!({
                "first_name": "Mia",
                "last_name": "Member",
                "email": email,
                "admin": {
                    "organisation": { "kind": "existing", "id": org["id"] },
                    "roles": [{ "kind": "existing", "id": "MEMBER" }],
                    "membership": { "tier": tier, "expiry_text": "31/12/2027" }
                }
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    id
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_signs_in_and_lands_on_dashboard() {
    let srv = TestServer::spawn().await;
    let signed_in = srv.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(signed_in["landing"]["kind"], "app");
    assert_eq!(signed_in["landing"]["app"], "MEMBERSHIP_DASHBOARD");

    let token = signed_in["token"].as_str().unwrap();
    let body: Value = srv.get("/whoami", token).await.json().await.unwrap();
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "ADMIN"));

    let res = srv.get("/access/NO_SUCH_APP", token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let decision: Value = res.json().await.unwrap();
    assert_eq!(decision["granted"], true);
    assert_eq!(decision["reason"]["kind"], "admin_override");
}

#[tokio::test]
async fn wrong_password_is_rejected_without_detail() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/auth/sign-in"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "nope-nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    let res = srv
        .client
        .post(srv.url("/auth/admin-check"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["is_admin"], true);
}

#[tokio::test]
async fn forged_token_for_unknown_user_is_rejected() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(UserId::new(), 0);
    let res = srv.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn member_access_redemptions_and_dashboards() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let member_id = create_member(&srv, &admin, "mia@acme.test", "SILVER").await;

    let signed_in = srv.sign_in("mia@acme.test", "password1").await;
    let token = signed_in["token"].as_str().unwrap().to_string();

    let talent: Value = srv.get("/access/talent_discovery", &token).await.json().await.unwrap();
    assert_eq!(talent["granted"], true);
    let ixn: Value = srv.get("/access/IXN_WORKFLOW_MANAGER", &token).await.json().await.unwrap();
    assert_eq!(ixn["granted"], false);
    assert_eq!(ixn["reason"]["kind"], "tier_insufficient");

    let res = srv
        .send(
            reqwest::Method::PUT,
            &format!("/users/{member_id}/redemptions"),
            &admin,
            json!({ "benefits": ["B01", "B02"] }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let dash: Value = srv.get("/me/dashboard?state=REDEEMED", &token).await.json().await.unwrap();
    assert_eq!(dash["tier"]["key"], "SILVER");
    assert_eq!(dash["expiry"], "31/12/2027");
    assert_eq!(dash["counts"]["redeemed"], 2);
    assert_eq!(dash["benefits"].as_array().unwrap().len(), 2);

    let res = srv.get("/admin/dashboard", &token).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin_dash: Value = srv.get("/admin/dashboard", &admin).await.json().await.unwrap();
    assert_eq!(admin_dash["total_members"], 1);
    assert_eq!(admin_dash["annual_revenue"], 5000);
    assert_eq!(admin_dash["selected"]["member"]["user_id"], member_id.as_str());
}

#[tokio::test]
async fn role_change_revokes_existing_session() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let member_id = create_member(&srv, &admin, "rev@acme.test", "GOLD").await;

    let token = srv.sign_in("rev@acme.test", "password1").await["token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(srv.get("/whoami", &token).await.status(), StatusCode::OK);

    let res = srv
        .send(
            reqwest::Method::PATCH,
            &format!("/users/{member_id}"),
            &admin,
            json!({
                "first_name": "Mia",
                "last_name": "Member",
                "email": "rev@acme.test",
                "admin": { "roles": [{ "kind": "existing", "id": "STUDENT" }] }
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: Value = res.json().await.unwrap();
    assert_eq!(outcome["sessions_revoked"], true);

    let res = srv.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn domain_errors_map_to_status_codes() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let member_id = create_member(&srv, &admin, "err@acme.test", "BRONZE").await;

    let res = srv
        .send(
            reqwest::Method::PUT,
            &format!("/users/{member_id}/membership"),
            &admin,
            json!({ "tier": "GOLD", "expiry_text": "31/02/2026" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = srv
        .send(
            reqwest::Method::POST,
            "/users",
            &admin,
            json!({ "email": "ERR@acme.test", "first_name": "A", "last_name": "B", "password": "password1" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv.get(&format!("/users/{}", UserId::new()), &admin).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.get("/users/not-a-uuid", &admin).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .send(reqwest::Method::DELETE, &format!("/users/{member_id}"), &admin, json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}
