//! Edge functions driven through the router

mod common;

use axum::http::StatusCode;
use common::{spawn_app, spawn_with, test_config};
use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_chatbot_answers_and_stores_output() {
    let app = spawn_app().await;
    app.mock_chat("A RDC 658 trata de Boas Práticas de Fabricação.").await;

    let (status, body) = app
        .post(
            "/functions/v1/ai-chatbot",
            "u1",
            json!({"message": "O que diz a RDC 658?"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "A RDC 658 trata de Boas Práticas de Fabricação.");

    let (status, outputs) = app.get("/rest/v1/ai_agent_outputs", "u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outputs.as_array().unwrap().len(), 1);
    assert_eq!(outputs[0]["id"], body["output_id"]);

    let (_, others) = app.get("/rest/v1/ai_agent_outputs", "u2").await;
    assert!(others.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limit_rejects_call_over_budget() {
    let (mut config, upstream) = test_config().await;
    config.security.rate_limit_max_calls = 2;
    let app = spawn_with(config, upstream);
    app.mock_chat("ok").await;

    for _ in 0..2 {
        let (status, _) = app
            .post("/functions/v1/ai-chatbot", "u1", json!({"message": "oi"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .post("/functions/v1/ai-chatbot", "u1", json!({"message": "oi"}))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");

    // Budgets are per user
    let (status, _) = app
        .post("/functions/v1/ai-chatbot", "u2", json!({"message": "oi"}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_key_rejection_maps_to_401() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post("/functions/v1/ai-chatbot", "u1", json!({"message": "oi"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UPSTREAM_UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let app = spawn_app().await;
    let (status, body) = app.post("/functions/v1/ai-chatbot", "u1", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[rstest]
#[case("11.222.333/0001-81", true)]
#[case("11222333000181", true)]
#[case("CNPJ 11.222.333/0001-81", true)]
#[case("11.111.111/1111-11", false)]
#[case("11.222.333/0001-82", false)]
#[tokio::test]
async fn test_validate_cnpj(#[case] cnpj: &str, #[case] valid: bool) {
    let app = spawn_app().await;
    let (status, body) = app
        .post("/functions/v1/validate-cnpj", "u1", json!({"cnpj": cnpj}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], valid);
}

#[tokio::test]
async fn test_sentiment_analysis_labels_text() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/functions/v1/sentiment-analysis",
            "u1",
            json!({"text": "Parceria excelente, entrega rápida e ótima qualidade"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "positive");

    let (status, body) = app
        .post(
            "/functions/v1/sentiment-analysis",
            "u1",
            json!({"text": "Atraso, falha no lote e multa da ANVISA"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "negative");
}

#[tokio::test]
async fn test_knowledge_ingest_then_rag() {
    let app = spawn_app().await;
    app.mock_chat("Use a zona climática IVb nos estudos de estabilidade.").await;

    let (status, ingested) = app
        .post(
            "/functions/v1/kb-ingest",
            "u1",
            json!({
                "title": "Guia de estabilidade",
                "text": "Estudos de estabilidade no Brasil seguem a RDC 318.\n\n\
                         O Brasil pertence à zona climática IVb, quente e muito úmida."
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ingested["chunks"].as_u64().unwrap() >= 1);

    let (status, answer) = app
        .post(
            "/functions/v1/kb-rag",
            "u1",
            json!({"question": "Qual zona climática usar na estabilidade?", "top_k": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["output"], "Use a zona climática IVb nos estudos de estabilidade.");
    let sources = answer["sources"].as_array().unwrap();
    assert!(!sources.is_empty());
    assert!(sources.iter().all(|s| s["source_id"] == ingested["source_id"]));

    let (status, listed) = app.get("/rest/v1/knowledge_sources", "u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["chunk_count"], ingested["chunks"]);
}

#[tokio::test]
async fn test_regulatory_sync_alerts_visible_to_everyone() {
    let app = spawn_app().await;
    app.mock_chat(
        r#"Seguem as atualizações:
        [{"title": "RDC 900/2024", "summary": "Novas regras de rotulagem", "severity": "alta",
          "url": "https://www.gov.br/anvisa"}]"#,
    )
    .await;

    let (status, body) = app
        .post("/functions/v1/regulatory-sync", "u1", json!({"topic": "rotulagem"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alerts"][0]["title"], "RDC 900/2024");
    assert_eq!(body["alerts"][0]["severity"], "high");

    let (status, alerts) = app.get("/rest/v1/regulatory_alerts", "u2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alerts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_checkout_posts_form_to_stripe() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("price_premium"))
        .and(body_string_contains("client_reference_id=u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post("/functions/v1/create-checkout", "u1", json!({"price_id": "price_premium"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "cs_test_1");
    assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_1");
}

#[tokio::test]
async fn test_match_score_ranks_laboratories() {
    let app = spawn_app().await;

    let (status, company) = app
        .post(
            "/rest/v1/companies",
            "buyer",
            json!({
                "name": "Farma Norte",
                "cnpj": "11.222.333/0001-81",
                "state": "SP",
                "needs": ["estabilidade", "microbiologia"],
                "certifications": ["BPF"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    for (name, specialties, state) in [
        ("Lab Estável", json!(["estabilidade", "microbiologia"]), "SP"),
        ("Lab Distante", json!(["bioequivalência"]), "AM"),
    ] {
        let (status, _) = app
            .post(
                "/rest/v1/laboratories",
                "lab-owner",
                json!({
                    "name": name,
                    "state": state,
                    "specialties": specialties,
                    "certifications": ["BPF"],
                    "capacity": 10
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .post(
            "/functions/v1/match-score",
            "buyer",
            json!({"company_id": company["id"], "limit": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["laboratory_name"], "Lab Estável");

    // Another user's company is invisible
    let (status, _) = app
        .post(
            "/functions/v1/match-score",
            "lab-owner",
            json!({"company_id": company["id"]}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
