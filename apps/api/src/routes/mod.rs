pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/chat", post(handlers::handle_chat))
        .route("/api/slots", get(handlers::handle_get_slots))
        .route("/api/summary", post(handlers::handle_summary))
        .route("/api/summary/edit", post(handlers::handle_summary_edit))
        .route("/api/phq9_fixed", post(handlers::handle_fixed_turn))
        .route("/api/phq9_fixed/dialog", get(handlers::handle_fixed_dialog))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::interview::test_support::{answered_json, test_state};

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _, _) = test_state(vec![], vec![]);
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(build_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let output = format!("[{}]", answered_json("피로감", 3, "거의 매일"));
        let (state, _, _) = test_state(vec![Some(output)], vec!["최근 2주간 식욕은 어떠셨어요?"]);
        let router = build_router(state);

        let (status, body) = send(
            router.clone(),
            post_json(
                "/api/chat",
                json!({"message": "거의 매일 피곤해", "user_id": "s1", "conversation_history": ""}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "최근 2주간 식욕은 어떠셨어요?");
        assert_eq!(body["complete"], false);
        assert_eq!(body["updated_items"], json!(["피로감"]));

        let request = Request::get("/api/slots?user_id=s1").body(Body::empty()).unwrap();
        let (status, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["slots"][3]["status"], "answered");
        assert_eq!(body["record"]["slots"][3]["score"], 3);
        assert_eq!(body["evaluation"]["answered_count"], 1);
    }

    #[tokio::test]
    async fn test_chat_without_message_is_bad_request() {
        let (state, _, _) = test_state(vec![], vec![]);
        let (status, body) =
            send(build_router(state), post_json("/api/chat", json!({"user_id": "s1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_summary_edit_validation() {
        let (state, _, _) = test_state(vec![], vec![]);
        let (status, body) = send(
            build_router(state),
            post_json(
                "/api/summary/edit",
                json!({"user_id": "s1", "edited_items": [{"edited_answer": "x"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "edited_items[0] missing item");
    }

    #[tokio::test]
    async fn test_fixed_interview_routes() {
        let (state, _, _) = test_state(vec![], vec![]);
        let router = build_router(state);

        let (status, body) = send(
            router.clone(),
            post_json("/api/phq9_fixed", json!({"user_id": "fx", "message": "네"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question_number"], 1);
        assert_eq!(body["complete"], false);

        let request = Request::get("/api/phq9_fixed/dialog?user_id=fx")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[0]["sender"], "user");
        assert_eq!(body[1]["sender"], "bot");
    }
}
