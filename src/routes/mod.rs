use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::{AppState, middleware::auth_middleware};

pub mod attendance;
pub mod auth;
pub mod health;
pub mod leave;
pub mod payroll;
pub mod reimbursement;
pub mod user;

// 认证相关的路由，无需令牌
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/logout", post(auth::logout))
}

// 员工目录
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(user::me))
        .route("/users", get(user::list_users).post(user::create_user))
        .route("/users/{id}", get(user::get_user).patch(user::update_user))
        .route("/users/{id}/deactivate", post(user::deactivate_user))
}

// 请假
fn leave_routes() -> Router<AppState> {
    Router::new()
        .route("/leaves", get(leave::list_leaves).post(leave::apply_leave))
        .route("/leaves/balance", get(leave::my_balance))
        .route("/leaves/balance/{userId}", get(leave::user_balance))
        .route("/leaves/{id}", get(leave::get_leave))
        .route("/leaves/{id}/approve", patch(leave::decide_leave))
}

// 工资单
fn payroll_routes() -> Router<AppState> {
    Router::new()
        .route("/payroll", get(payroll::list_payrolls))
        .route("/payroll/generate", post(payroll::generate_payroll))
        .route("/payroll/ytd", get(payroll::my_ytd))
        .route("/payroll/ytd/{employeeId}", get(payroll::user_ytd))
        .route("/payroll/{id}", get(payroll::get_payroll))
        .route("/payroll/{id}/download", get(payroll::download_payroll))
}

// 考勤
fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(attendance::list_attendance))
        .route("/attendance/clock-in", post(attendance::clock_in))
        .route("/attendance/clock-out", post(attendance::clock_out))
        .route("/attendance/{id}", get(attendance::get_attendance))
        .route("/attendance/{id}/approve", post(attendance::approve_timesheet))
}

// 报销
fn reimbursement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reimbursements",
            get(reimbursement::list_reimbursements).post(reimbursement::submit_reimbursement),
        )
        .route("/reimbursements/{id}", get(reimbursement::get_reimbursement))
        .route(
            "/reimbursements/{id}/action",
            patch(reimbursement::act_on_reimbursement),
        )
}

/// 业务路由：`/api` 下的公开路由和受保护路由，外加 `/health`
///
/// 限流、CORS 和访问日志在 `main` 里按部署环境叠加。
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(user_routes())
        .merge(leave_routes())
        .merge(payroll_routes())
        .merge(attendance_routes())
        .merge(reimbursement_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api", auth_routes().merge(protected_routes))
        .route("/health", get(health::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::models::{Role, User, audit::actions};
    use crate::testing::{TEST_PASSWORD, TestApp, settle};

    async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.router().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn protected_routes_need_bearer() {
        let app = TestApp::new();
        let (status, body) =
            send(&app, Request::get("/api/users/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_ne!(body["code"], 0);

        let req = Request::get("/api/leaves")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_then_me_then_refresh() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/auth/login",
                json!({ "email": "John@Company.com", "password": TEST_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        let data = &body["resp_data"];
        assert_eq!(data["user"]["id"], john.id.to_string());
        assert!(data["user"].get("passwordHash").is_none());
        let access = data["accessToken"].as_str().unwrap().to_string();
        let refresh = data["refreshToken"].as_str().unwrap().to_string();

        let req = Request::get("/api/users/me")
            .header(header::AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["email"], "john@company.com");

        let (status, body) = send(
            &app,
            post_json("/api/auth/refresh", json!({ "refreshToken": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(body["resp_data"]["refreshToken"], refresh.as_str());

        // 旧令牌只能用一次
        let (status, _) = send(
            &app,
            post_json("/api/auth/refresh", json!({ "refreshToken": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn spoofed_forwarding_headers_are_not_recorded() {
        let app = TestApp::new();
        app.user("john@company.com", Role::Employee).await;

        let mut req = post_json(
            "/api/auth/login",
            json!({ "email": "john@company.com", "password": TEST_PASSWORD }),
        );
        req.headers_mut()
            .insert("x-real-ip", "198.51.100.2".parse().unwrap());
        req.headers_mut()
            .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let audits = app.store.login_audits();
        assert_eq!(audits.len(), 1);
        assert!(audits[0].success);
        assert_eq!(audits[0].ip, None);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = TestApp::new();
        app.user("john@company.com", Role::Employee).await;
        let (status, body) = send(
            &app,
            post_json(
                "/api/auth/login",
                json!({ "email": "john@company.com", "password": "nope" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("resp_data").is_none());
    }

    #[tokio::test]
    async fn employee_leave_listing_is_scoped_to_self() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let jane = app.user("jane@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;
        app.approved_leave(john.id, "2025-03-03", "2025-03-04").await;
        app.approved_leave(jane.id, "2025-03-05", "2025-03-06").await;

        let req = Request::get(format!("/api/leaves?employee={}", jane.id))
            .header(header::AUTHORIZATION, app.bearer(&john))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["resp_data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["employeeId"], john.id.to_string());

        let req = Request::get("/api/leaves?page=1&limit=10")
            .header(header::AUTHORIZATION, app.bearer(&hr))
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, req).await;
        assert_eq!(body["resp_data"]["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn apply_and_decide_over_http() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;

        let mut req = post_json(
            "/api/leaves",
            json!({
                "leaveType": "Casual",
                "fromDate": "2025-06-02",
                "toDate": "2025-06-03",
                "reason": "family event",
            }),
        );
        req.headers_mut()
            .insert(header::AUTHORIZATION, app.bearer(&john).parse().unwrap());
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["resp_data"]["id"].as_str().unwrap().to_string();

        let decide = |user: &User, action: &str| {
            Request::patch(format!("/api/leaves/{id}/approve"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, app.bearer(user))
                .body(Body::from(json!({ "action": action }).to_string()))
                .unwrap()
        };

        let (status, _) = send(&app, decide(&john, "approve")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, decide(&hr, "archive")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, decide(&hr, "approve")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["status"], "Approved");
        assert_eq!(body["resp_data"]["approver"]["id"], hr.id.to_string());
        let (status, _) = send(&app, decide(&hr, "approve")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn payroll_generate_and_download() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;

        let mut req = post_json(
            "/api/payroll/generate",
            json!({
                "employeeId": john.id,
                "month": 3,
                "year": 2025,
                "basicSalary": 50000,
                "allowances": { "hra": 10000, "travel": 2000 },
                "deductions": { "tax": 5000 },
            }),
        );
        req.headers_mut()
            .insert(header::AUTHORIZATION, app.bearer(&hr).parse().unwrap());
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["resp_data"]["grossSalary"], 62000.0);
        assert_eq!(body["resp_data"]["netSalary"], 57000.0);
        let id = body["resp_data"]["id"].as_str().unwrap().to_string();

        let req = Request::get(format!("/api/payroll/{id}/download"))
            .header(header::AUTHORIZATION, app.bearer(&john))
            .body(Body::empty())
            .unwrap();
        let response = app.router().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("salary-EMP-john-2025-03.pdf"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let req = Request::get("/api/payroll/ytd?year=2025")
            .header(header::AUTHORIZATION, app.bearer(&john))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["monthsCount"], 1);
    }

    #[tokio::test]
    async fn clock_in_without_body_then_clock_out() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;

        let clock = |path: &str| {
            Request::post(format!("/api/attendance/{path}"))
                .header(header::AUTHORIZATION, app.bearer(&john))
                .body(Body::empty())
                .unwrap()
        };

        let (status, body) = send(&app, clock("clock-in")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["resp_data"]["employeeId"], john.id.to_string());
        assert!(body["resp_data"]["clockOut"].is_null());

        let (status, _) = send(&app, clock("clock-in")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, clock("clock-out")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["resp_data"]["clockOut"].is_string());
        assert_eq!(body["resp_data"]["overtimeMinutes"], 0);

        let req = Request::get("/api/attendance?from=not-a-date")
            .header(header::AUTHORIZATION, app.bearer(&john))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reimbursement_flow_over_http() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;

        let mut req = post_json(
            "/api/reimbursements",
            json!({
                "amount": 420.75,
                "description": "Taxi to client site",
                "receipts": [{ "name": "taxi.pdf", "url": "https://files.company.com/taxi.pdf" }],
            }),
        );
        req.headers_mut()
            .insert(header::AUTHORIZATION, app.bearer(&john).parse().unwrap());
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["resp_data"]["status"], "Pending");
        assert_eq!(body["resp_data"]["receipts"][0]["name"], "taxi.pdf");
        let id = body["resp_data"]["id"].as_str().unwrap().to_string();

        let act = |user: &User, action: &str| {
            Request::patch(format!("/api/reimbursements/{id}/action"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, app.bearer(user))
                .body(Body::from(json!({ "action": action }).to_string()))
                .unwrap()
        };

        let (status, _) = send(&app, act(&john, "approve")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, act(&hr, "paid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, act(&hr, "approve")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["status"], "Approved");
        let (status, body) = send(&app, act(&hr, "paid")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["resp_data"]["paidAt"].is_string());

        settle().await;
        let logged: Vec<_> = app.store.audit_logs().iter().map(|e| e.action).collect();
        assert!(logged.contains(&actions::REIMBURSEMENT_APPROVE));
        assert!(logged.contains(&actions::REIMBURSEMENT_PAID));

        let req = Request::get("/api/reimbursements?status=Paid")
            .header(header::AUTHORIZATION, app.bearer(&john))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["pagination"]["total"], 1);
    }
}
