use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use daybook::config::{NluConfig, PlacesConfig, WeatherConfig, WikiConfig};
use daybook::core::{Identity, JournalStore, PromptBank, PromptSelector, Sentiment};
use daybook::http_client::ServiceClient;
use daybook::journal::JournalService;
use daybook::services::{NluClient, PlacesClient, TextAnalyzer, WeatherClient, WikiClient};
use daybook::JournalError;

fn http() -> ServiceClient {
    ServiceClient::new(Duration::from_secs(5)).unwrap()
}

fn nlu_config(server: &MockServer) -> NluConfig {
    NluConfig {
        url: server.uri(),
        api_key: Some("secret".to_string()),
        ..NluConfig::default()
    }
}

fn analyze_body() -> serde_json::Value {
    json!({
        "language": "en",
        "emotion": {
            "document": {
                "emotion": {"sadness": 0.1, "joy": 0.9, "fear": 0.05, "disgust": 0.0, "anger": 0.02}
            }
        },
        "entities": [
            {
                "type": "Person",
                "text": "Anna",
                "relevance": 0.95,
                "sentiment": {"score": 0.7, "label": "positive"},
                "count": 1
            },
            {
                "type": "Location",
                "text": "Boston",
                "relevance": 0.3
            }
        ]
    })
}

#[tokio::test]
async fn nlu_analyze_parses_entities_and_emotion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .and(query_param("version", "2022-04-07"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({"text": "Lunch with Anna in Boston"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(analyze_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = NluClient::new(http(), nlu_config(&server));
    let analysis = client.analyze("Lunch with Anna in Boston").await.unwrap();

    assert_eq!(analysis.entities.len(), 2);
    assert_eq!(analysis.entities[0].text, "Anna");
    assert_eq!(
        analysis.entities[0].sentiment.as_ref().map(|s| s.label),
        Some(Sentiment::Positive)
    );
    assert!(analysis.entities[1].sentiment.is_none());
    assert_eq!(analysis.emotion.get("joy"), Some(0.9));
}

#[tokio::test]
async fn nlu_without_key_is_config_error() {
    let server = MockServer::start().await;
    let config = NluConfig {
        api_key: None,
        ..nlu_config(&server)
    };

    let err = NluClient::new(http(), config).emotions("hello").await.unwrap_err();
    assert!(matches!(err, JournalError::Config(_)));
}

#[tokio::test]
async fn nlu_upstream_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = NluClient::new(http(), nlu_config(&server))
        .emotions("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Upstream { service: "nlu", status: 401 }));
}

#[tokio::test]
async fn weather_is_cached_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("id", "4931972"))
        .and(query_param("APPID", "key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Boston", "main": {"temp": 280.1}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = WeatherClient::new(
        http(),
        WeatherConfig {
            base_url: server.uri(),
            api_key: Some("key".to_string()),
            ..WeatherConfig::default()
        },
    );

    let first = client.current().await.unwrap();
    let second = client.current().await.unwrap();
    assert_eq!(first["name"], "Boston");
    assert_eq!(first, second);
}

#[tokio::test]
async fn weather_refetches_when_cache_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Boston"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = WeatherClient::new(
        http(),
        WeatherConfig {
            base_url: server.uri(),
            api_key: Some("key".to_string()),
            cache_ttl_secs: 0,
            ..WeatherConfig::default()
        },
    );

    client.current().await.unwrap();
    client.current().await.unwrap();
}

fn weather_config(server: &MockServer) -> WeatherConfig {
    WeatherConfig {
        base_url: server.uri(),
        api_key: Some("key".to_string()),
        ..WeatherConfig::default()
    }
}

#[tokio::test]
async fn weather_cache_file_is_shared_between_clients() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Boston"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("weather_cache.json");

    let first = WeatherClient::new(http(), weather_config(&server))
        .with_cache_file(cache.clone())
        .current()
        .await
        .unwrap();
    assert!(cache.exists());

    let second = WeatherClient::new(http(), weather_config(&server))
        .with_cache_file(cache)
        .current()
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn weather_cache_file_expires() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Boston"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("weather_cache.json");
    std::fs::write(
        &cache,
        json!({
            "city_id": "4931972",
            "fetched_at": "2020-01-01T00:00:00Z",
            "body": {"name": "Stale"}
        })
        .to_string(),
    )
    .unwrap();

    let body = WeatherClient::new(http(), weather_config(&server))
        .with_cache_file(cache)
        .current()
        .await
        .unwrap();
    assert_eq!(body["name"], "Boston");
}

#[tokio::test]
async fn places_reuses_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/security/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok", "expires_in": 1799, "token_type": "Bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/reference-data/locations/pois"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"name": "Common"}]})))
        .expect(2)
        .mount(&server)
        .await;

    let client = PlacesClient::new(
        http(),
        PlacesConfig {
            base_url: server.uri(),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
        },
    );

    let pois = client.points_of_interest(42.35, -71.06).await.unwrap();
    assert_eq!(pois["data"][0]["name"], "Common");
    client.points_of_interest(42.35, -71.06).await.unwrap();
}

#[tokio::test]
async fn wiki_article_extracts_title_and_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "parse"))
        .and(query_param("page", "Boston"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "parse": {"title": "Boston", "pageid": 24437894, "text": {"*": "<p>Boston is a city.</p>"}}
        })))
        .mount(&server)
        .await;

    let client = WikiClient::new(http(), WikiConfig { base_url: server.uri() });
    let article = client.article("Boston").await.unwrap();
    assert_eq!(article.title, "Boston");
    assert_eq!(article.content, "<p>Boston is a city.</p>");
}

#[tokio::test]
async fn wiki_missing_page_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}
        })))
        .mount(&server)
        .await;

    let client = WikiClient::new(http(), WikiConfig { base_url: server.uri() });
    let err = client.article("Nowhere").await.unwrap_err();
    assert!(matches!(err, JournalError::MalformedResponse { service: "wikipedia", .. }));
}

#[tokio::test]
async fn scoring_a_page_through_the_nlu_client_persists_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analyze_body()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("journal.json");
    let who = Identity::new("grey", "Grey");
    let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

    {
        let mut service = JournalService::new(
            JournalStore::new(journal.clone()).unwrap(),
            NluClient::new(http(), nlu_config(&server)),
            PromptSelector::new(PromptBank::builtin().unwrap()),
        );
        service.write_page(&who, date, "Lunch with Anna".to_string()).unwrap();
        let scores = service.score_page(&who, date).await.unwrap();
        assert_eq!(scores.scores["joy"].get(), 5);
        assert_eq!(scores.scores["sadness"].get(), 1);
    }

    let store = JournalStore::new(journal).unwrap();
    let joy = store.metric(&who, date, "joy").unwrap();
    assert_eq!(joy.value.get(), 5);
}

#[tokio::test]
async fn prompt_through_the_nlu_client_uses_dominant_entity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analyze_body()))
        .mount(&server)
        .await;

    let service = JournalService::new(
        JournalStore::in_memory(),
        NluClient::new(http(), nlu_config(&server)),
        PromptSelector::new(PromptBank::builtin().unwrap()),
    );

    let prompt = service
        .prompt(
            "Lunch with Anna in Boston",
            &Default::default(),
            &mut rand::thread_rng(),
        )
        .await
        .unwrap();
    assert_eq!(prompt.entity, "Anna");
    assert_eq!(prompt.sentiment, Sentiment::Positive);
    assert!(prompt.question.contains("Anna"));
}
