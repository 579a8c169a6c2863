//! Application state and router

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use eduflow_common::{
    auth::JwtManager, config::AppConfig, Completer, Mailer, StudyStore,
};
use eduflow_ingestion::IngestionService;
use eduflow_study::{StudyService, StudySettings};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::{
    metrics::track_requests,
    rate_limit::{rate_limit_middleware, RateLimit},
};

/// Headroom above the PDF limit so oversized files reach the ingestion check
const UPLOAD_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StudyStore>,
    pub study: StudyService,
    pub ingestion: IngestionService,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StudyStore>,
        completer: Arc<dyn Completer>,
        mailer: Arc<dyn Mailer>,
        jwt: JwtManager,
    ) -> Self {
        let study = StudyService::new(
            store.clone(),
            completer,
            mailer,
            StudySettings::from_config(&config),
        );
        let ingestion = IngestionService::new(store.clone(), config.ingestion.clone());

        Self {
            config: Arc::new(config),
            store,
            study,
            ingestion,
            jwt: Arc::new(jwt),
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Completion-backed routes share one limiter
    let rate_limit = config
        .rate_limit
        .enabled
        .then(|| RateLimit::new(config.rate_limit.requests_per_second, config.rate_limit.burst));
    let limited = |route: MethodRouter<AppState>| match &rate_limit {
        Some(limit) => route.layer(from_fn_with_state(limit.clone(), rate_limit_middleware)),
        None => route,
    };

    let upload_limit = config.ingestion.max_pdf_bytes + UPLOAD_OVERHEAD_BYTES;

    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Study sources
        .route(
            "/sources",
            post(handlers::sources::create_source).get(handlers::sources::list_sources),
        )
        .route(
            "/sources/upload",
            post(handlers::sources::upload_source).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/sources/{id}", get(handlers::sources::get_source))

        // Diagnostics
        .route(
            "/sources/{id}/questions",
            limited(post(handlers::diagnostics::generate_questions)),
        )
        .route(
            "/sources/{id}/answers",
            limited(post(handlers::diagnostics::submit_answer)),
        )

        // Learning plans; only generation is limited
        .route(
            "/sources/{id}/plan",
            limited(post(handlers::plans::generate_plan)).get(handlers::plans::get_plan),
        )

        // Reviews
        .route("/reviews", get(handlers::reviews::review_board))
        .route("/reviews/{id}/complete", post(handlers::reviews::complete_review))

        // Scheduled trigger (cron secret, no user auth)
        .route(
            "/send-review-reminders",
            get(handlers::reminders::send_review_reminders),
        )
        .route_layer(from_fn(track_requests));

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::Duration;
    use eduflow_common::db::MemoryStore;
    use eduflow_common::email::MockMailer;
    use eduflow_common::llm::MockCompleter;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "gateway-test-secret";

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        completer: Arc<MockCompleter>,
        jwt: JwtManager,
    }

    fn test_app() -> TestApp {
        test_app_with(AppConfig::default())
    }

    fn test_app_with(mut config: AppConfig) -> TestApp {
        config.auth.jwt_secret = Some(SECRET.to_string());
        let store = Arc::new(MemoryStore::new());
        let completer = Arc::new(MockCompleter::new());
        let state = AppState::new(
            config,
            store.clone(),
            completer.clone(),
            Arc::new(MockMailer::new()),
            JwtManager::new(SECRET, None),
        );

        TestApp {
            router: create_router(state),
            store,
            completer,
            jwt: JwtManager::new(SECRET, None),
        }
    }

    impl TestApp {
        fn token(&self, user: Uuid) -> String {
            self.jwt
                .generate_token(user, Some("student@example.com"), Duration::hours(1))
                .unwrap()
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn get(&self, user: Uuid, uri: &str) -> Response {
            let request = Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .body(Body::empty())
                .unwrap();
            self.send(request).await
        }

        async fn post_json(&self, user: Uuid, uri: &str, body: Value) -> Response {
            let request = Request::post(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        async fn create_source(&self, user: Uuid, title: &str) -> Uuid {
            let response = self
                .post_json(
                    user,
                    "/api/sources",
                    json!({"title": title, "raw_text": "Mitochondria produce ATP."}),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = json_body(response).await;
            body["id"].as_str().unwrap().parse().unwrap()
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn questions_reply(n: usize) -> String {
        let questions: Vec<String> = (1..=n).map(|i| format!("Question {}?", i)).collect();
        serde_json::to_string(&questions).unwrap()
    }

    fn plan_reply() -> String {
        json!({
            "macro": [{"id": "m1", "title": "Cells", "description": "Basics", "order": 0}],
            "meso": [{"id": "me1", "macroId": "m1", "title": "Membranes", "description": "Bilayer", "order": 0}],
            "micro": [{"id": "mi1", "mesoId": "me1", "title": "Sketch", "description": "Draw it", "estimatedMinutes": 10, "order": 0}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = test_app();

        let response = app
            .send(Request::get("/api/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");

        let response = app
            .send(Request::get("/api/ready").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["checks"]["database"]["status"], "up");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = test_app();
        let response = app
            .send(Request::get("/api/sources").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_and_list_sources() {
        let app = test_app();
        let user = Uuid::new_v4();

        let id = app.create_source(user, "Cell Biology").await;
        assert_eq!(app.store.user_count().await, 1);

        let response = app.get(user, "/api/sources").await;
        assert_eq!(response.status(), StatusCode::OK);
        let rows = json_body(response).await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["id"], id.to_string());
        assert_eq!(rows[0]["has_plan"], false);

        // Other users see nothing
        let response = app.get(Uuid::new_v4(), "/api/sources").await;
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let app = test_app();
        let response = app
            .post_json(
                Uuid::new_v4(),
                "/api/sources",
                json!({"title": "   ", "raw_text": "Body"}),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["field"], "title");
        assert_eq!(app.store.source_count().await, 0);
    }

    #[tokio::test]
    async fn test_foreign_source_is_not_found() {
        let app = test_app();
        let id = app.create_source(Uuid::new_v4(), "Private").await;

        let response = app.get(Uuid::new_v4(), &format!("/api/sources/{}", id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_study_flow() {
        let app = test_app();
        let user = Uuid::new_v4();
        let id = app.create_source(user, "Cell Biology").await;

        app.completer.push_text(questions_reply(8)).await;
        let response = app
            .post_json(user, &format!("/api/sources/{}/questions", id), json!({}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let outcome = json_body(response).await;
        let questions = outcome["questions"].as_array().unwrap().clone();
        assert_eq!(questions.len(), 8);

        // Second call returns the stored questions without generating
        let response = app
            .post_json(user, &format!("/api/sources/{}/questions", id), json!({}))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["created"], false);

        app.completer.push_text("Good start.").await;
        let response = app
            .post_json(
                user,
                &format!("/api/sources/{}/answers", id),
                json!({"question_id": questions[0]["id"], "answer": "They make ATP"}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["ai_feedback"], "Good start.");

        app.completer.push_text(plan_reply()).await;
        let response = app
            .post_json(user, &format!("/api/sources/{}/plan", id), json!({}))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["reviews"].as_array().unwrap().len(), 3);

        let response = app.get(user, &format!("/api/sources/{}/plan", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["plan"]["macro"][0]["id"], "m1");

        let response = app.get(user, "/api/reviews").await;
        let board = json_body(response).await;
        let upcoming = board["upcoming"].as_array().unwrap();
        assert_eq!(upcoming.len(), 3);
        let review_id = upcoming[0]["id"].as_str().unwrap().to_string();

        let response = app
            .post_json(user, &format!("/api/reviews/{}/complete", review_id), json!({}))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let board = json_body(app.get(user, "/api/reviews").await).await;
        assert_eq!(board["completed"].as_array().unwrap().len(), 1);
        assert_eq!(board["upcoming"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_plan_view_without_plan() {
        let app = test_app();
        let user = Uuid::new_v4();
        let id = app.create_source(user, "Bio").await;

        let response = app.get(user, &format!("/api/sources/{}/plan", id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reminder_trigger_requires_cron_secret() {
        let mut config = AppConfig::default();
        config.auth.cron_secret = Some("nightly".to_string());
        let app = test_app_with(config);

        let response = app
            .send(
                Request::get("/api/send-review-reminders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .send(
                Request::get("/api/send-review-reminders")
                    .header(header::AUTHORIZATION, "Bearer nightly")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json_body(response).await;
        assert_eq!(report["message"], "No reviews scheduled for today");
        assert_eq!(report["total"], 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let app = test_app();
        let boundary = "eduflow-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nNotes\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"pdf_file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nplain text\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::post("/api/sources/upload")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", app.token(Uuid::new_v4())),
            )
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["field"], "pdf_file");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .ends_with("Only PDF files are allowed"));
        assert_eq!(app.store.source_count().await, 0);
    }

    #[tokio::test]
    async fn test_generation_routes_are_rate_limited() {
        let mut config = AppConfig::default();
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = test_app_with(config);
        let user = Uuid::new_v4();
        let id = app.create_source(user, "Bio").await;

        app.completer.push_text(questions_reply(8)).await;
        let uri = format!("/api/sources/{}/questions", id);
        let first = app.post_json(user, &uri, json!({})).await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.post_json(user, &uri, json!({})).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // Read routes are not limited
        let response = app.get(user, &format!("/api/sources/{}", id)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
