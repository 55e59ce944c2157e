use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use config::Config;
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_identity::RegisterUser;
use dentacare_server::{config::AppConfig, create_app, ClinicServer};

const PASSWORD: &str = "rahasia123";

/// In-memory server with the access catalog seeded and one user per role.
struct TestApp {
    server: ClinicServer,
    app: Router,
    dokter_id: i64,
}

impl TestApp {
    async fn new() -> Self {
        let config: AppConfig = AppConfig::defaults(Config::builder())
            .unwrap()
            .set_override("bcrypt_cost", "4")
            .unwrap()
            .set_override("jwt_secret_key", "integration-test-secret")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let server = ClinicServer::in_memory(config).expect("Failed to build test server");
        auth_rbac::seeder::seed_all(&server.rbac).await.unwrap();

        let mut dokter_id = 0;
        for (username, role) in [("admin", "admin"), ("drg.sari", "dokter"), ("resepsionis", "resepsionis")] {
            let user = server
                .identity
                .register_user(RegisterUser {
                    nama_lengkap: format!("Staf {}", username),
                    username: username.to_string(),
                    email: format!("{}@klinik.test", username.replace('.', "")),
                    password: PASSWORD.to_string(),
                    role: role.to_string(),
                    status: None,
                    phone_number: None,
                    profile_pic_url: None,
                })
                .await
                .unwrap();
            if role == "dokter" {
                dokter_id = user.id;
            }
        }

        let app = create_app(server.clone());
        Self { server, app, dokter_id }
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self, username: &str, role: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_patient(&self, token: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/pasien",
                Some(token),
                Some(json!({
                    "namaLengkap": "Budi Santoso",
                    "tanggalLahir": "1990-04-12",
                    "jenisKelamin": "Laki-laki",
                    "nomorTelepon": "081234567890"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "patient create failed: {}", body);
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_ping_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/api/v1/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], "in-memory");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/api/v1/pasien", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.send("GET", "/api/v1/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;

    let attempts = [
        json!({ "username": "nobody", "password": PASSWORD, "role": "admin" }),
        json!({ "username": "admin", "password": PASSWORD, "role": "dokter" }),
        json!({ "username": "admin", "password": "salah-sandi", "role": "admin" }),
    ];
    let mut bodies = Vec::new();
    for attempt in attempts {
        let (status, body) = app.send("POST", "/api/v1/auth/login", None, Some(attempt)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);
}

#[tokio::test]
async fn test_inactive_account_cannot_log_in() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/admin/users/register",
            Some(&admin),
            Some(json!({
                "namaLengkap": "Staf Cuti",
                "username": "cuti",
                "email": "cuti@klinik.test",
                "password": PASSWORD,
                "role": "resepsionis",
                "status": "nonaktif"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "cuti", "password": PASSWORD, "role": "resepsionis" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_and_me_carry_permissions() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "drg.sari", "password": PASSWORD, "role": "dokter" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tokenType"], "Bearer");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.send("GET", "/api/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "drg.sari");
    let permissions: Vec<&str> = body["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(permissions.contains(&"emr:create"));
    assert!(!permissions.contains(&"settings:manage_users"));
}

#[tokio::test]
async fn test_role_outside_allow_list_is_forbidden() {
    let app = TestApp::new().await;
    let dokter = app.login("drg.sari", "dokter").await;

    let (status, body) = app.send("GET", "/api/v1/admin/users", Some(&dokter), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_missing_permission_is_forbidden() {
    let app = TestApp::new().await;
    let resepsionis = app.login("resepsionis", "resepsionis").await;
    let patient = app.create_patient(&resepsionis).await;

    // Resepsionis is on the allow-list but lacks patient:delete.
    let uri = format!("/api/v1/pasien/{}", patient["id"]);
    let (status, _) = app.send("DELETE", &uri, Some(&resepsionis), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.login("admin", "admin").await;
    let (status, _) = app.send("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patient_lookup_by_medical_record_number() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin").await;
    let patient = app.create_patient(&admin).await;

    let no_rm = patient["noRm"].as_str().unwrap();
    assert!(no_rm.starts_with("RM-"));

    let (status, body) = app.send("GET", &format!("/api/v1/pasien/{}", no_rm), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], patient["id"]);

    let (status, body) = app.send("GET", "/api/v1/pasien?search=budi&limit=5", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalRecords"], 1);
    assert_eq!(body["pagination"]["pageSize"], 5);
}

#[tokio::test]
async fn test_patient_field_validation() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/pasien",
            Some(&admin),
            Some(json!({ "namaLengkap": "Budi Santoso", "nomorTelepon": "0812" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["nomorTelepon"].is_array());
}

#[tokio::test]
async fn test_malformed_json_gets_error_envelope() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/pasien")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"namaLengkap\": "))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_emr_lines_are_priced_server_side() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin").await;
    let dokter = app.login("drg.sari", "dokter").await;
    let patient = app.create_patient(&admin).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/master/treatments",
            Some(&admin),
            Some(json!({ "kode": "SCL", "nama": "Scaling", "harga": 150000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/emr",
            Some(&dokter),
            Some(json!({
                "patientId": patient["id"],
                "doctorId": app.dokter_id,
                "complaint": "Gusi berdarah",
                "treatments": [{ "code": "SCL", "quantity": 2, "discountPercent": 10 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["treatments"][0]["subTotal"].as_f64(), Some(270000.0));
    let visit_id = body["data"]["visitId"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/emr",
            Some(&dokter),
            Some(json!({
                "patientId": patient["id"],
                "doctorId": app.dokter_id,
                "complaint": "Kontrol",
                "treatments": [{ "code": "SCL", "quantity": 2, "discountPercent": 10, "subTotal": 300000 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["treatments[0].subTotal"].is_array());

    let (status, body) = app.send("GET", &format!("/api/v1/emr/{}", visit_id), Some(&dokter), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["complaint"], "Gusi berdarah");

    let uri = format!("/api/v1/emr/pasien/{}", patient["id"]);
    let (status, body) = app.send("GET", &uri, Some(&dokter), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_role_permission_replacement_takes_effect() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin").await;
    let dokter = app.login("drg.sari", "dokter").await;

    let (status, _) = app.send("GET", "/api/v1/emr/pasien/1", Some(&dokter), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, roles) = app.send("GET", "/api/v1/admin/access/roles", Some(&admin), None).await;
    let role_id = roles["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|role| role["kode"] == "dokter")
        .map(|role| role["id"].clone())
        .unwrap();
    let uri = format!("/api/v1/admin/access/roles/{}", role_id);

    // Omitting permissionKodes keeps the grants.
    let (status, body) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "deskripsi": "Dokter gigi umum" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"]["permissions"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "permissionKodes": ["patient:view"] })))
        .await;
    assert_eq!(status, StatusCode::OK);

    // The same token is now refused.
    let (status, _) = app.send("GET", "/api/v1/emr/pasien/1", Some(&dokter), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "permissionKodes": ["emr:teleport"] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["permissionKodes"].is_array());
}

#[tokio::test]
async fn test_reservations_are_scoped_to_the_doctor() {
    let app = TestApp::new().await;
    let resepsionis = app.login("resepsionis", "resepsionis").await;
    let dokter = app.login("drg.sari", "dokter").await;
    let patient = app.create_patient(&resepsionis).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/reservasi",
            Some(&resepsionis),
            Some(json!({
                "patientId": patient["id"],
                "doctorId": app.dokter_id,
                "tanggal": "2026-11-02",
                "waktu": "09:30"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let reservation_id = body["data"]["id"].clone();

    let (status, body) = app.send("GET", "/api/v1/reservasi?date=2026-11-02", Some(&dokter), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalRecords"], 1);

    let (status, body) = app.send("GET", "/api/v1/reservasi?date=02-11-2026", Some(&dokter), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["date"].is_array());

    let uri = format!("/api/v1/reservasi/{}/confirm", reservation_id);
    let (status, body) = app.send("POST", &uri, Some(&resepsionis), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Dikonfirmasi");

    let (status, _) = app.send("POST", &uri, Some(&dokter), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(app.server.identity.dangling_roles().await.unwrap().is_empty());
}
