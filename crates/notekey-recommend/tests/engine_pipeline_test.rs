//! End-to-end pipeline tests: real trend client against a mock trend
//! service, real word2vec source over a temporary model file, and an
//! in-memory page store.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notekey_recommend::{
    Error, ErrorKind, PageKeyword, PageStore, RecommendConfig, RecommendationEngine, Result,
};
use notekey_sources::{
    EmbeddingModelConfig, EmbeddingModelStore, ModelFormat, TrendsClient, TrendsConfig,
    Word2VecSource,
};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXPLORE: &str = "/trends/api/explore";
const WIDGET: &str = "/trends/api/widgetdata/relatedsearches";

const MODEL: &str = "\
6 3
파이썬 1.0 0.0 0.0
자바 0.9 0.2 0.0
러스트 0.8 0.3 0.1
판다스 0.7 0.1 0.4
고양이 0.0 1.0 0.0
요리 -1.0 0.0 0.0
";

/// Note 10 owns pages 1 and 2; note 20 owns page 3.
struct FixedPages {
    pages: HashMap<i64, (i64, &'static str)>,
}

impl FixedPages {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(1, (10, "파이썬"));
        pages.insert(2, (10, "자바"));
        pages.insert(3, (20, "고양이"));
        Self { pages }
    }
}

#[async_trait]
impl PageStore for FixedPages {
    async fn find_note_id_by_page_id(&self, page_id: i64) -> Result<Option<i64>> {
        Ok(self.pages.get(&page_id).map(|(note_id, _)| *note_id))
    }

    async fn find_keywords_by_note_id(&self, note_id: i64) -> Result<Vec<PageKeyword>> {
        Ok(self
            .pages
            .iter()
            .filter(|(_, (owner, _))| *owner == note_id)
            .map(|(page_id, (_, keyword))| PageKeyword {
                page_id: *page_id,
                keyword: keyword.to_string(),
            })
            .collect())
    }
}

fn model_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create model file");
    file.write_all(MODEL.as_bytes()).expect("write model file");
    file
}

fn explore_body() -> String {
    let json = serde_json::json!({
        "widgets": [{"id": "RELATED_TOPICS", "token": "tok-topics", "request": {"language": "ko"}}]
    });
    format!(")]}}'\n{}", json)
}

fn widget_body(titles: &[(&str, u32)]) -> String {
    let top: Vec<serde_json::Value> = titles
        .iter()
        .map(|(title, value)| {
            serde_json::json!({
                "topic": {"mid": "/m/x", "title": title, "type": "Topic"},
                "value": value,
                "formattedValue": value.to_string()
            })
        })
        .collect();
    let json = serde_json::json!({
        "default": {"rankedList": [{"rankedKeyword": top}, {"rankedKeyword": []}]}
    });
    format!(")]}}',\n{}", json)
}

fn engine(server: &MockServer, model: &NamedTempFile, trend_timeout: Duration) -> RecommendationEngine {
    let trends = TrendsClient::new(
        TrendsConfig::default()
            .with_base_url(server.uri())
            .with_timeout(trend_timeout),
    )
    .expect("Failed to create trend client");

    let store = EmbeddingModelStore::new(
        EmbeddingModelConfig::new(model.path()).with_format(ModelFormat::Text),
    );

    RecommendationEngine::new(
        Arc::new(FixedPages::new()),
        Arc::new(trends),
        Arc::new(Word2VecSource::new(Arc::new(store))),
    )
}

fn keywords(result: &notekey_recommend::RecommendationResult) -> HashSet<String> {
    result.keywords().map(str::to_string).collect()
}

#[tokio::test]
async fn test_trend_recommendation_excludes_note_keywords() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(200).set_body_string(explore_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(WIDGET))
        .respond_with(ResponseTemplate::new(200).set_body_string(widget_body(&[
            ("파이썬", 100),
            ("자바", 30),
            ("장고", 12),
            ("판다스", 7),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let model = model_file();
    let result = engine(&server, &model, Duration::from_secs(5))
        .recommend_by_trend("파이썬", 2)
        .await
        .unwrap();

    let expected: HashSet<String> = ["장고", "판다스"].iter().map(|s| s.to_string()).collect();
    assert_eq!(keywords(&result), expected);
}

#[tokio::test]
async fn test_embedding_recommendation_uses_model_neighbors() {
    let server = MockServer::start().await;
    let model = model_file();

    let result = engine(&server, &model, Duration::from_secs(5))
        .recommend_by_embedding("파이썬", 1)
        .await
        .unwrap();

    // 자바 is on the same note; 고양이 is orthogonal and 요리 opposite
    let expected: HashSet<String> = ["러스트", "판다스"].iter().map(|s| s.to_string()).collect();
    assert_eq!(keywords(&result), expected);
    assert!(result.candidates().iter().all(|c| c.score > 0.0));
}

#[tokio::test]
async fn test_out_of_vocabulary_keyword_fails_with_model_lookup() {
    let server = MockServer::start().await;
    let model = model_file();

    let err = engine(&server, &model, Duration::from_secs(5))
        .recommend_by_embedding("자전거", 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ModelLookup);
    let response = serde_json::to_value(err.to_response()).unwrap();
    assert_eq!(response["state"], "fail");
    assert_eq!(response["kind"], "model_lookup");
}

#[tokio::test]
async fn test_trend_timeout_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXPLORE))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(explore_body())
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let model = model_file();
    let err = engine(&server, &model, Duration::from_millis(300))
        .recommend_by_trend("파이썬", 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalService);
}

#[tokio::test]
async fn test_unknown_page_fails_before_any_source_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EXPLORE))
        .respond_with(ResponseTemplate::new(200).set_body_string(explore_body()))
        .expect(0)
        .mount(&server)
        .await;

    let model = model_file();
    let err = engine(&server, &model, Duration::from_secs(5))
        .recommend_by_trend("파이썬", 404)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamData);
    assert!(matches!(err.inner(), Error::PageNotFound(404)));
}

#[tokio::test]
async fn test_everything_excluded_is_configurable() {
    let server = MockServer::start().await;
    let model = model_file();

    // Page 3's note only excludes 고양이
    let lenient = engine(&server, &model, Duration::from_secs(5));
    assert!(!lenient
        .recommend_by_embedding("고양이", 3)
        .await
        .unwrap()
        .is_empty());

    let strict = engine(&server, &model, Duration::from_secs(5)).with_config(RecommendConfig {
        output_size: 5,
        embedding_top_n: 1,
        empty_as_error: true,
        sample_seed: Some(1),
    });
    // With top_n 1 the only neighbor of 파이썬 is 자바, which note 10 already has
    let err = strict.recommend_by_embedding("파이썬", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyCandidateSet);
}
