use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medai_agent::clinical::{DEFAULT_DOCUMENT_LABEL, FOLLOW_UP_PROMPT, WEB_LABEL};
use medai_agent::dialogue::{CLINICAL_FAREWELL, FORWARDING, GOODBYE, WELCOME, WRAP_UP};
use medai_agent::{
    Assistant, ClinicalAgent, DialoguePolicy, DialogueState, GeminiGenerator, LogEntry,
    PatientDirectory, Role, SessionLog, TavilySearch, WebSearch,
};
use medai_rag::{EmbeddingProvider, RagConfig, Result as RagResult, Retriever, VectorIndex};
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const PATIENTS: &str = r#"[
    {
        "patient_name": "Maria Gomez",
        "discharge_date": "2025-05-02",
        "primary_diagnosis": "Chronic Kidney Disease Stage 4",
        "medications": ["Furosemide 40mg daily", "Calcium acetate 667mg with meals"],
        "dietary_restrictions": "Low potassium, low phosphorus",
        "follow_up": "Nephrology clinic in 2 weeks",
        "warning_signs": ["Shortness of breath", "Decreased urine output"],
        "discharge_instructions": "Weigh yourself daily."
    }
]"#;

struct TableEmbedder;

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        Ok(match text {
            "Dialysis removes waste when the kidneys fail." | "What is dialysis?" => vec![1.0, 0.0],
            "Potassium builds up in kidney disease." => vec![0.0, 1.0],
            _ => vec![5.0, 5.0],
        })
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_id(&self) -> &str {
        "table"
    }
}

#[derive(Default)]
struct CountingSearch {
    calls: AtomicUsize,
}

#[async_trait]
impl WebSearch for CountingSearch {
    async fn search(&self, _query: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        "Drink water unless your doctor limits fluids.".to_string()
    }
}

fn retriever() -> Arc<Retriever> {
    let index = VectorIndex::build(
        "table",
        2,
        vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        vec![
            "Dialysis removes waste when the kidneys fail.".to_string(),
            "Potassium builds up in kidney disease.".to_string(),
        ],
    )
    .unwrap();
    Arc::new(Retriever::new(Arc::new(TableEmbedder), Arc::new(index), RagConfig::default()).unwrap())
}

async fn gemini(server: &MockServer) -> Arc<GeminiGenerator> {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Dialysis filters your blood."}]}}]
        })))
        .mount(server)
        .await;
    Arc::new(
        GeminiGenerator::new(server.uri(), "test-key", "gemini-2.5-flash", Duration::from_secs(5))
            .unwrap(),
    )
}

fn contents(replies: &[medai_agent::Reply]) -> Vec<&str> {
    replies.iter().map(|r| r.content.as_str()).collect()
}

#[tokio::test]
async fn full_conversation_is_answered_and_logged() {
    let server = MockServer::start().await;
    let search = Arc::new(CountingSearch::default());
    let clinical = ClinicalAgent::new(retriever(), search.clone(), gemini(&server).await);

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.jsonl");
    let directory = PatientDirectory::new(serde_json::from_str(PATIENTS).unwrap());
    let mut assistant = Assistant::new(directory, DialoguePolicy::default(), clinical)
        .with_session_log(SessionLog::open(&log_path).unwrap());

    assert_eq!(contents(&assistant.welcome()), [WELCOME]);

    let replies = assistant.handle_turn("maria gomez").await;
    assert!(replies[0].content.starts_with("Hello Maria Gomez!"));
    assert!(replies[0].content.ends_with(
        "Are you taking your medications as prescribed: Furosemide 40mg daily, Calcium acetate 667mg with meals?"
    ));

    // A document-grounded answer.
    let replies = assistant.handle_turn("What is dialysis?").await;
    assert_eq!(assistant.session().state(), DialogueState::ClinicalMode);
    assert_eq!(replies[0].content, FORWARDING);
    assert_eq!(replies[1].role, Role::Clinical);
    assert_eq!(replies[1].content, format!("Dialysis filters your blood.{FOLLOW_UP_PROMPT}"));
    assert_eq!(replies[2].role, Role::Source);
    assert_eq!(replies[2].content, DEFAULT_DOCUMENT_LABEL);
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);

    // Nothing in the document is close: exactly one web search.
    let replies = assistant.handle_turn("How much water should I drink for my kidney?").await;
    assert_eq!(replies[2].content, WEB_LABEL);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);

    // Back to the checklist, starting with the first unanswered question.
    let replies = assistant.handle_turn("thanks").await;
    assert_eq!(replies[0].content, CLINICAL_FAREWELL);
    assert_eq!(replies[1].content, assistant.session().checklist()[0]);
    for _ in 0..3 {
        assistant.handle_turn("yes").await;
    }
    assert_eq!(contents(&assistant.handle_turn("yes").await), [WRAP_UP]);
    assert_eq!(contents(&assistant.handle_turn("bye").await), [GOODBYE]);
    assert!(assistant.is_done());

    let entries: Vec<LogEntry> = std::fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.first().map(|e| e.content.as_str()), Some(WELCOME));
    assert_eq!(entries.last().map(|e| e.content.as_str()), Some(GOODBYE));
    let clinical_entries: Vec<&LogEntry> = entries.iter().filter(|e| e.role == Role::Clinical).collect();
    assert_eq!(clinical_entries[0].source.as_deref(), Some(DEFAULT_DOCUMENT_LABEL));
    assert_eq!(clinical_entries[1].source.as_deref(), Some(WEB_LABEL));
    assert!(entries.iter().filter(|e| e.role == Role::User).count() >= 9);
}

#[tokio::test]
async fn unreachable_services_still_produce_replies() {
    let search = Arc::new(
        TavilySearch::new("http://127.0.0.1:9/search", Some("k".into()), Duration::from_millis(300))
            .unwrap(),
    );
    let generator = Arc::new(
        GeminiGenerator::new("http://127.0.0.1:9", "k", "gemini-2.5-flash", Duration::from_millis(300))
            .unwrap(),
    );
    let clinical = ClinicalAgent::new(retriever(), search, generator);
    let directory = PatientDirectory::new(serde_json::from_str(PATIENTS).unwrap());
    let mut assistant = Assistant::new(directory, DialoguePolicy::default(), clinical);

    assistant.handle_turn("Maria Gomez").await;

    let replies = assistant.handle_turn("What is dialysis?").await;
    assert_eq!(replies[2].content, medai_agent::clinical::UNAVAILABLE_LABEL);

    let replies = assistant.handle_turn("Is my kidney pain normal?").await;
    assert!(replies[1].content.starts_with(medai_agent::NO_WEB_RESULTS));
    assert_eq!(replies[2].content, WEB_LABEL);
}
