//! Integration tests for the networked decision client.
//!
//! Each test serves a small Axum router on an ephemeral local port that
//! stands in for an OpenAI-compatible server, then drives a real
//! `DecisionClient` against it over HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hearth_runner::{
    ChatBackend, DecisionClient, DecisionError, FailureKind, LlmBackendConfig, OfflineConfig,
    OfflineGenerator, Outcome, ProbeStatus, PromptEngine,
};
use hearth_types::{
    ActionKind, AgentArchetype, AgentId, ContextSnapshot, Decision, DialogueRole, PlayerProximity,
    Vec2,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Serve `router` on 127.0.0.1 and return its `/v1` base URL.
async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1")
}

/// A base URL nothing is listening on.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1")
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn client(api_url: String, timeout: Duration) -> DecisionClient {
    let backend = ChatBackend::new(&LlmBackendConfig {
        api_url,
        model: "test-model".to_owned(),
        ..LlmBackendConfig::default()
    });
    DecisionClient::networked(backend, PromptEngine::new().unwrap(), timeout)
        .with_generator(OfflineGenerator::seeded(OfflineConfig::default(), 17))
}

fn snapshot(archetype: AgentArchetype) -> ContextSnapshot {
    ContextSnapshot {
        agent_id: AgentId::new(),
        name: "Grunt".to_owned(),
        archetype,
        position: Vec2::new(200.0, 150.0),
        health: 100,
        last_action: Some(ActionKind::MoveLeft),
        nearby_agents: Vec::new(),
        player: Some(PlayerProximity {
            position: Vec2::new(240.0, 150.0),
            distance: 40.0,
        }),
        nearby_obstacles: Vec::new(),
        can_attack: archetype.can_attack(),
    }
}

fn replying(content: &'static str) -> Router {
    Router::new().route(
        "/v1/chat/completions",
        post(move || async move { Json(completion(content)) }),
    )
}

#[tokio::test]
async fn french_reply_with_token_moves_up() {
    let url = serve(replying("Je vais MOVE_UP maintenant")).await;
    let client = client(url, Duration::from_secs(5));

    let resolved = client.resolve(&snapshot(AgentArchetype::Combatant)).await;
    assert_eq!(resolved.decision, Decision::act(ActionKind::MoveUp));
    assert_eq!(resolved.outcome, Outcome::Success);
}

#[tokio::test]
async fn request_carries_model_prompts_and_budget() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let router = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *seen.lock().unwrap() = Some(body);
                    Json(completion("IDLE"))
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let url = serve(router).await;
    let client = client(url, Duration::from_secs(5));

    let decision = client
        .decide(&snapshot(AgentArchetype::Combatant))
        .await
        .unwrap();
    assert_eq!(decision, Decision::idle());

    let body = seen.lock().unwrap().take().unwrap();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 64);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    let system = body["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("ATTACK_PLAYER"));
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Player detected"));
}

#[tokio::test]
async fn server_error_falls_back_to_idle() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
    );
    let url = serve(router).await;
    let client = client(url, Duration::from_secs(5));
    let snap = snapshot(AgentArchetype::Combatant);

    let err = client.decide(&snap).await.unwrap_err();
    assert!(matches!(err, DecisionError::BadStatus { status: 500, .. }));

    let resolved = client.resolve(&snap).await;
    assert_eq!(resolved.decision, Decision::idle());
    assert_eq!(resolved.outcome, Outcome::Fallback(FailureKind::Protocol));
}

#[tokio::test]
async fn slow_server_times_out_to_idle() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(completion("ATTACK_PLAYER"))
        }),
    );
    let url = serve(router).await;
    let client = client(url, Duration::from_millis(200));
    let snap = snapshot(AgentArchetype::Combatant);

    let err = client.decide(&snap).await.unwrap_err();
    assert!(matches!(err, DecisionError::Timeout { timeout_ms: 200 }));

    let resolved = client.resolve(&snap).await;
    assert_eq!(resolved.decision, Decision::idle());
    assert_eq!(resolved.outcome, Outcome::Fallback(FailureKind::Transport));
}

#[tokio::test]
async fn refused_connection_falls_back_to_idle() {
    let client = client(dead_url().await, Duration::from_secs(5));
    let snap = snapshot(AgentArchetype::Caster);

    let err = client.decide(&snap).await.unwrap_err();
    assert!(matches!(err, DecisionError::Unreachable(_)));

    let resolved = client.resolve(&snap).await;
    assert_eq!(resolved.decision, Decision::idle());
    assert_eq!(resolved.outcome, Outcome::Fallback(FailureKind::Transport));
}

#[tokio::test]
async fn non_json_body_is_a_format_failure() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { "<html>gateway</html>" }),
    );
    let url = serve(router).await;
    let client = client(url, Duration::from_secs(5));

    let resolved = client.resolve(&snapshot(AgentArchetype::Combatant)).await;
    assert_eq!(resolved.decision, Decision::idle());
    assert_eq!(resolved.outcome, Outcome::Fallback(FailureKind::Format));
}

#[tokio::test]
async fn missing_content_is_a_format_failure() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let url = serve(router).await;
    let client = client(url, Duration::from_secs(5));

    let err = client
        .decide(&snapshot(AgentArchetype::Combatant))
        .await
        .unwrap_err();
    assert!(matches!(err, DecisionError::MalformedBody(_)));
}

#[tokio::test]
async fn unrecognized_reply_is_a_semantic_failure() {
    let url = serve(replying("I would rather not say.")).await;
    let client = client(url, Duration::from_secs(5));

    let resolved = client.resolve(&snapshot(AgentArchetype::Combatant)).await;
    assert_eq!(resolved.decision, Decision::idle());
    assert_eq!(resolved.outcome, Outcome::Fallback(FailureKind::Semantic));
}

#[tokio::test]
async fn dialogue_reply_becomes_a_line() {
    let url = serve(replying("MOVE_LEFT|SAY:Potions, two for one!")).await;
    let client = client(url, Duration::from_secs(5));
    let merchant = snapshot(AgentArchetype::Dialogue {
        role: DialogueRole::Merchant,
    });

    let resolved = client.resolve(&merchant).await;
    assert_eq!(
        resolved.decision,
        Decision::speak(ActionKind::MoveLeft, "Potions, two for one!")
    );
}

#[tokio::test]
async fn failed_dialogue_falls_back_to_a_canned_line() {
    let client = client(dead_url().await, Duration::from_secs(5));
    let guard = snapshot(AgentArchetype::Dialogue {
        role: DialogueRole::Guard,
    });

    let resolved = client.resolve(&guard).await;
    assert!(resolved.is_fallback());
    assert_eq!(resolved.decision.action, ActionKind::Idle);
    assert!(resolved.decision.line.is_some());
}

#[tokio::test]
async fn probe_reports_models_and_failures() {
    let router = Router::new().route(
        "/v1/models",
        get(|| async { Json(json!({"data": [{"id": "mistral-7b"}, {"id": "phi-3"}]})) }),
    );
    let url = serve(router).await;
    let status = client(url, Duration::from_secs(5)).probe().await;
    assert_eq!(
        status,
        Some(ProbeStatus::Ready {
            models: vec!["mistral-7b".to_owned(), "phi-3".to_owned()],
        })
    );

    let router = Router::new().route(
        "/v1/models",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let url = serve(router).await;
    let status = client(url, Duration::from_secs(5)).probe().await;
    assert_eq!(status, Some(ProbeStatus::ServerError(503)));

    let status = client(dead_url().await, Duration::from_secs(5)).probe().await;
    assert_eq!(status, Some(ProbeStatus::Unreachable));
}
