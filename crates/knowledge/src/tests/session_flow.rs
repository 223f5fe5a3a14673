//! Dataset selection and question answering end to end.

use super::support::{
    indexer, knowledge_config, session, write_doc, LetterCountEmbedder, ScriptedLlm,
};
use crate::config::get_question_log_path;
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::rag::EMPTY_ANSWER_RETRY_MESSAGE;
use crate::session::Role;
use crate::snapshot;
use crate::vector_index::VectorIndex;
use manualqa_core::{AppError, DatasetConfig};
use manualqa_prompt::NOT_IN_CONTEXT_ANSWER;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn datasets() -> Vec<DatasetConfig> {
    vec![
        DatasetConfig::new("Letters", &["letters.txt"]),
        DatasetConfig::new("Admin Guide", &["admin.txt"]),
        DatasetConfig::new("Broken", &["missing.pdf"]),
    ]
}

#[tokio::test]
async fn test_small_document_ranks_matching_chunk_first() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "letters.txt", "A B C D");

    let embedder = LetterCountEmbedder::new();
    let llm = ScriptedLlm::replying("A and B.");
    let mut session = session(
        knowledge_config(temp.path(), 4, 1),
        datasets(),
        embedder.clone(),
        llm.clone(),
    );

    let active = session.select_dataset("Letters").await.unwrap();
    assert!(active.index().len() >= 2);

    let query = embedder.embed("A B").await.unwrap();
    let hits = active.index().search(&query, 1).unwrap();
    assert!(hits[0].chunk.text.contains("A B"));

    let response = active.ask("A B").await.unwrap();
    assert_eq!(response.answer, "A and B.");
    assert!(response.sources[0].snippet.contains("A B"));

    // Best passage reaches the model first.
    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].prompt;
    let best = prompt.find("A B").unwrap();
    let other = prompt.find("C D").unwrap();
    assert!(best < other);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].temperature, Some(0.0));
}

#[tokio::test]
async fn test_sentinel_answer_is_stored_verbatim() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let llm = ScriptedLlm::replying(NOT_IN_CONTEXT_ANSWER);
    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        llm,
    );

    let active = session.select_dataset("Admin Guide").await.unwrap();
    let response = active.ask("What colour is the chassis?").await.unwrap();

    assert!(!response.retry_substituted);
    let history = active.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "What colour is the chassis?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, NOT_IN_CONTEXT_ANSWER);
}

#[tokio::test]
async fn test_blank_answer_becomes_retry_message() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let llm = ScriptedLlm::replying("");
    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        llm.clone(),
    );

    let active = session.select_dataset("Admin Guide").await.unwrap();
    let response = active.ask("How do I reset?").await.unwrap();
    assert!(response.retry_substituted);
    assert_eq!(response.answer, EMPTY_ANSWER_RETRY_MESSAGE);
    assert_eq!(active.history()[1].content, EMPTY_ANSWER_RETRY_MESSAGE);

    llm.set_reply(Some("  \n\t "));
    let response = active.ask("How do I reset it?").await.unwrap();
    assert!(response.retry_substituted);
    assert_eq!(active.history()[3].content, EMPTY_ANSWER_RETRY_MESSAGE);
}

#[tokio::test]
async fn test_missing_source_on_first_selection() {
    let temp = TempDir::new().unwrap();
    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("ok"),
    );

    match session.select_dataset("Broken").await {
        Err(AppError::DatasetUnavailable { dataset, missing }) => {
            assert_eq!(dataset, "Broken");
            assert_eq!(missing, vec![temp.path().join("missing.pdf")]);
        }
        other => panic!("expected DatasetUnavailable, got {:?}", other.map(|_| ())),
    }
    assert!(!session.is_indexed());
}

#[tokio::test]
async fn test_failed_selection_keeps_previous_conversation() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");
    write_doc(temp.path(), "letters.txt", "A B C D");

    let embedder = LetterCountEmbedder::new();
    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        embedder.clone(),
        ScriptedLlm::replying("Ten seconds."),
    );

    let active = session.select_dataset("Admin Guide").await.unwrap();
    active.ask("How long?").await.unwrap();
    let chunks_before = active.index().len();

    // Missing documents.
    let err = session.select_dataset("Broken").await.unwrap_err();
    assert!(matches!(err, AppError::DatasetUnavailable { .. }));

    // Unknown dataset.
    let err = session.select_dataset("Nope").await.unwrap_err();
    assert!(matches!(err, AppError::DatasetUnavailable { .. }));

    // Embedding failure.
    embedder.set_failing(true);
    let err = session.select_dataset("Letters").await.unwrap_err();
    assert!(matches!(err, AppError::IndexBuild(_)));
    assert!(!snapshot::exists(&temp.path().join(".manualqa"), "letters"));

    let active = session.active().unwrap();
    assert_eq!(active.dataset_label(), "Admin Guide");
    assert_eq!(active.index().len(), chunks_before);
    assert_eq!(active.history().len(), 2);
}

#[tokio::test]
async fn test_unreadable_source_reports_extraction_error() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "broken.json", "{ not json");

    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        vec![DatasetConfig::new("Params", &["broken.json"])],
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("ok"),
    );

    let err = session.select_dataset("Params").await.unwrap_err();
    assert!(matches!(err, AppError::TextExtraction { .. }));
    assert!(!session.is_indexed());
}

#[tokio::test]
async fn test_selection_resets_history() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");
    write_doc(temp.path(), "letters.txt", "A B C D");

    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("answer"),
    );

    let active = session.select_dataset("Admin Guide").await.unwrap();
    active.ask("first").await.unwrap();
    assert_eq!(active.history().len(), 2);

    let active = session.select_dataset("Admin Guide").await.unwrap();
    assert!(active.history().is_empty());

    let active = session.select_dataset("letters").await.unwrap();
    assert!(active.history().is_empty());
    assert_eq!(active.dataset_label(), "Letters");
    assert_eq!(active.slug(), "letters");
}

#[tokio::test]
async fn test_model_failure_leaves_history_untouched() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let llm = ScriptedLlm::replying("Ten seconds.");
    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        llm.clone(),
    );

    let active = session.select_dataset("Admin Guide").await.unwrap();
    active.ask("How long?").await.unwrap();

    llm.set_reply(None);
    let err = active.ask("And then?").await.unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert_eq!(active.history().len(), 2);

    llm.set_reply(Some("Release it."));
    active.ask("And then?").await.unwrap();
    assert_eq!(active.history().len(), 4);
    assert_eq!(active.history()[3].content, "Release it.");
}

#[tokio::test]
async fn test_unavailable_model_on_first_question() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let llm = ScriptedLlm::failing();
    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        llm.clone(),
    );

    let active = session.select_dataset("Admin Guide").await.unwrap();
    let err = active.ask("How long?").await.unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert!(active.history().is_empty());
    assert_eq!(llm.requests().len(), 1);

    llm.set_reply(Some("Ten seconds."));
    let response = active.ask("How long?").await.unwrap();
    assert_eq!(response.answer, "Ten seconds.");
    assert_eq!(active.history().len(), 2);
    assert_eq!(active.history()[0].role, Role::User);
}

#[tokio::test]
async fn test_questions_are_logged_and_blank_rejected() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let config = knowledge_config(temp.path(), 200, 20);
    let log_path = get_question_log_path(&config.data_dir);
    let llm = ScriptedLlm::replying("ok");
    let mut session = session(config, datasets(), LetterCountEmbedder::new(), llm.clone());

    let active = session.select_dataset("Admin Guide").await.unwrap();
    active.ask("How do I reset?").await.unwrap();

    let err = active.ask("   ").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(active.history().len(), 2);
    assert_eq!(llm.requests().len(), 1);

    let log = fs::read_to_string(log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("\tAdmin Guide\tHow do I reset?"));
}

#[tokio::test]
async fn test_open_dataset_reuses_snapshot() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds. Then wait.");

    let config = knowledge_config(temp.path(), 20, 5);
    let mut first = session(
        config.clone(),
        datasets(),
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("ok"),
    );
    let built_chunks: Vec<String> = first
        .select_dataset("Admin Guide")
        .await
        .unwrap()
        .index()
        .chunks()
        .map(|c| c.text.clone())
        .collect();

    let mut second = session(
        config,
        datasets(),
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("ok"),
    );
    let active = second.open_dataset("admin-guide", false).await.unwrap();
    let loaded_chunks: Vec<String> = active.index().chunks().map(|c| c.text.clone()).collect();
    assert_eq!(loaded_chunks, built_chunks);
    assert!(active.history().is_empty());
}

#[tokio::test]
async fn test_open_dataset_without_snapshot() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("ok"),
    );

    let err = session.open_dataset("Admin Guide", false).await.unwrap_err();
    assert!(matches!(err, AppError::IndexNotFound(_)));
    assert!(!session.is_indexed());

    session.open_dataset("Admin Guide", true).await.unwrap();
    assert!(session.is_indexed());
    assert!(snapshot::exists(&temp.path().join(".manualqa"), "admin-guide"));
}

#[tokio::test]
async fn test_changed_source_makes_snapshot_stale() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");

    let mut session = session(
        knowledge_config(temp.path(), 200, 20),
        datasets(),
        LetterCountEmbedder::new(),
        ScriptedLlm::replying("ok"),
    );
    session.select_dataset("Admin Guide").await.unwrap();

    write_doc(temp.path(), "admin.txt", "Press and hold the power button.");

    let err = session.open_dataset("Admin Guide", false).await.unwrap_err();
    match err {
        AppError::IndexCorrupt(reason) => assert!(reason.contains("stale")),
        other => panic!("expected IndexCorrupt, got {:?}", other),
    }
    // Still the conversation built before the edit.
    assert!(session.active().unwrap().index().chunks().any(|c| c.text.contains("reset")));

    let active = session.open_dataset("Admin Guide", true).await.unwrap();
    assert!(active.index().chunks().any(|c| c.text.contains("power")));
}

#[tokio::test]
async fn test_snapshot_from_other_embedder_is_stale() {
    let temp = TempDir::new().unwrap();
    write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");
    let config = knowledge_config(temp.path(), 200, 20);

    indexer(config.clone(), datasets(), LetterCountEmbedder::new())
        .build("Admin Guide")
        .await
        .unwrap();

    let trigram: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(26));
    let other = indexer(config, datasets(), trigram);
    let err = other.load_fresh("Admin Guide", false).await.unwrap_err();
    assert!(matches!(err, AppError::IndexCorrupt(_)));

    let rebuilt = other.load_fresh("Admin Guide", true).await.unwrap();
    assert_eq!(rebuilt.meta.provider, "trigram");
}

#[tokio::test]
async fn test_snapshot_served_when_sources_are_gone() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "admin.txt", "Hold the reset button for ten seconds.");
    let config = knowledge_config(temp.path(), 200, 20);
    let indexer = indexer(config, datasets(), LetterCountEmbedder::new());

    let built = indexer.build("Admin Guide").await.unwrap();
    fs::remove_file(doc).unwrap();

    let loaded = indexer.load_fresh("Admin Guide", false).await.unwrap();
    assert_eq!(loaded.index.len(), built.index.len());
    assert_eq!(loaded.meta.sources, built.meta.sources);
}
