use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use dormkeep::config::Config;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

async fn spawn_app() -> TestApp {
    let dir = std::env::temp_dir().join(format!("dormkeep-api-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", dir.join("test.db").display());
    config.general.uploads_path = dir.join("uploads").display().to_string();
    config.server.secure_cookies = false;

    let state = dormkeep::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: dormkeep::api::router(state),
        dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/login",
                None,
                &json!({ "username": username, "password": password }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("session cookie")
            .to_string()
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

const BOUNDARY: &str = "dormkeep-test-boundary";

fn multipart_ticket(
    cookie: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/student/repair")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let (status, body) = app.send(get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_role_gates() {
    let app = spawn_app().await;

    let (status, body) = app.send(get("/api/admin/dormitories", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let student = app.login("student", "student123").await;

    let (status, _) = app
        .send(get("/api/admin/dormitories", Some(&student)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(get("/api/staff/repairs", Some(&student))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(get("/api/student/profile", Some(&student))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["student_number"], "2024001");

    let admin = app.login("admin", "admin123").await;
    let (status, body) = app.send(get("/api/admin/dormitories", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["occupant_count"], 1);

    let (status, _) = app.send(get("/api/student/profile", Some(&admin))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(get("/api/admin/metrics", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_me_logout() {
    let app = spawn_app().await;

    let (status, _) = app.send(get("/api/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/login",
            None,
            &json!({ "username": "student", "password": "nope" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cookie = app.login("2024001", "student123").await;
    let (status, body) = app.send(get("/api/me", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "student");
    assert_eq!(body["data"]["role"], "student");

    let (status, _) = app.send(get("/api/logout", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(get("/api/me", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_and_reset_over_http() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/register",
            None,
            &json!({
                "username": "newbie",
                "name": "新生",
                "password": "secret123",
                "confirm_password": "secret123",
                "role": "student",
                "building": "2号楼",
                "room_number": "202"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dormitory_created"], true);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/register",
            None,
            &json!({
                "username": "newbie",
                "name": "新生",
                "password": "secret123",
                "confirm_password": "secret123",
                "role": "student"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/forgot_password",
            None,
            &json!({ "username": "newbie", "name": "别人" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/forgot_password",
            None,
            &json!({ "username": "newbie", "name": "新生" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let reset_url = body["data"]["reset_url"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(json_request(
            "POST",
            &reset_url,
            None,
            &json!({ "use_default": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request(
            "POST",
            &reset_url,
            None,
            &json!({ "use_default": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.login("newbie", "123456").await;
}

#[tokio::test]
async fn test_dormitory_admin_errors() {
    let app = spawn_app().await;
    let admin = app.login("admin", "admin123").await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/admin/dormitory",
            Some(&admin),
            &json!({
                "building": "2号楼",
                "room_number": "201",
                "room_type": "4人间",
                "capacity": 5,
                "status": "良好"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/admin/dormitory",
            Some(&admin),
            &json!({
                "building": "2号楼",
                "room_number": "201",
                "room_type": "4人间",
                "capacity": 0,
                "status": "良好"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/admin/dormitory",
            Some(&admin),
            &json!({
                "building": "2号楼",
                "room_number": "201",
                "room_type": "4人间",
                "capacity": 4,
                "status": "良好"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .send(empty_request(
            "DELETE",
            &format!("/api/admin/dormitory/{id}"),
            &admin,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(empty_request("DELETE", "/api/admin/dormitory/1", &admin))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(empty_request("DELETE", "/api/admin/dormitory/0", &admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(get("/api/admin/dashboard", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dormitories"], 1);
    assert_eq!(body["data"]["male_students"], 1);
}

#[tokio::test]
async fn test_ticket_flow_over_http() {
    let app = spawn_app().await;
    let student = app.login("student", "student123").await;
    let staff = app.login("staff1", "staff123").await;
    let admin = app.login("admin", "admin123").await;

    let fields = [
        ("building", "5号楼"),
        ("room_number", "502"),
        ("applicant_name", "张三"),
        ("description", "灯坏了"),
    ];

    let (status, body) = app
        .send(multipart_ticket(
            &student,
            &fields,
            Some(("lamp.png", &b"\x89PNG"[..])),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dormitory_created"], true);
    assert_eq!(body["data"]["ticket"]["status"], "pending");
    let id = body["data"]["ticket"]["id"].as_i64().unwrap();
    let image_url = body["data"]["ticket"]["image_url"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .clone()
        .oneshot(get(&image_url, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = app
        .send(multipart_ticket(&student, &fields[..2], None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send(get("/api/staff/repairs", Some(&staff))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["tickets"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(empty_request(
            "POST",
            &format!("/api/staff/repair/{id}/accept"),
            &staff,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, _) = app
        .send(empty_request(
            "DELETE",
            &format!("/api/student/repair/{id}"),
            &student,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(empty_request(
            "POST",
            &format!("/api/staff/repair/{id}/accept"),
            &staff,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(empty_request(
            "POST",
            &format!("/api/staff/repair/{id}/complete"),
            &staff,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = app.send(get("/api/admin/repairs", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "all");
    assert_eq!(body["data"]["counts"]["completed"], 1);

    let (status, _) = app
        .send(get("/api/admin/repairs?status=bogus", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(get(&format!("/api/admin/repair/{id}"), Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["handler_number"], "S2024001");
    assert_eq!(body["data"]["dormitory"], "5号楼-502");

    let (status, _) = app.send(get("/api/admin/repair/999", Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send(get("/api/student/repairs", Some(&student))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tickets"][0]["id"], id);
}
