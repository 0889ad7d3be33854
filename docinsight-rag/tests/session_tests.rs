//! Session behaviour with a scripted chat model.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docinsight_rag::{
    Answer, ChatModel, ChunkingStrategy, EmbeddingProvider, GREETING, HashingEmbeddingProvider,
    NO_DOCUMENT_MESSAGE, NO_RELEVANT_CONTENT_MESSAGE, Prompt, RagConfig, RagError, Role, Session,
    TempFileStore,
};
use tempfile::TempDir;

/// Replies with a fixed text and remembers every prompt it was sent.
struct ScriptedChat {
    response: std::result::Result<String, String>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedChat {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self { response: Ok(text.to_string()), prompts: Mutex::new(Vec::new()) })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self { response: Err(message.to_string()), prompts: Mutex::new(Vec::new()) })
    }

    fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, prompt: &Prompt) -> docinsight_rag::Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.response.clone().map_err(|message| RagError::chat("scripted", message))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn session_with(chat: Arc<ScriptedChat>) -> (Session, TempDir) {
    let uploads = tempfile::tempdir().unwrap();
    let config = RagConfig::builder()
        .chunk_size(20)
        .chunk_overlap(5)
        .top_k(1)
        .chunking(ChunkingStrategy::FixedSize)
        .embedding_model_name("hashing")
        .build()
        .unwrap();
    let session = Session::builder()
        .config(config)
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .chat_model(chat)
        .upload_store(TempFileStore::new(uploads.path()))
        .build()
        .unwrap();
    (session, uploads)
}

fn dir_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}

#[tokio::test]
async fn new_session_starts_with_greeting_and_no_document() {
    let (session, _uploads) = session_with(ScriptedChat::replying("unused"));

    assert!(!session.has_document().await);
    let history = session.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::Assistant);
    assert_eq!(history[0].content, GREETING);
}

#[tokio::test]
async fn question_before_upload_is_answered_without_the_model() {
    let chat = ScriptedChat::replying("unused");
    let (session, _uploads) = session_with(chat.clone());

    let answer = session.ask("What color is grass?").await.unwrap();
    assert!(matches!(answer, Answer::NoDocument));
    assert!(chat.prompts().is_empty());

    let history = session.history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[2].content, NO_DOCUMENT_MESSAGE);
}

#[tokio::test]
async fn upload_then_ask_returns_grounded_reply() {
    let raw = "<think>\nThe context mentions grass.\n</think>\n\nGrass is green.";
    let chat = ScriptedChat::replying(raw);
    let (session, uploads) = session_with(chat.clone());

    let indexed =
        session.upload(b"The sky is blue. Grass is green.", "colors.txt").await.unwrap();
    assert_eq!(indexed.source, "colors.txt");
    assert_eq!(indexed.segments, 2);
    assert!(dir_is_empty(&uploads));

    let answer = session.ask("What color is grass?").await.unwrap();
    let Answer::Grounded { reply, sources } = &answer else {
        panic!("expected a grounded answer, got {answer:?}");
    };
    assert_eq!(answer.text(), "Grass is green.");
    assert_eq!(reply.reasoning_text(), Some("The context mentions grass."));
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].segment.id, "colors.txt#1");

    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user_message.contains(". Grass is green."));
    assert!(prompts[0].user_message.ends_with("Question: What color is grass?"));

    let last = session.history().await.pop().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.to_reply().to_raw(), raw);
}

fn source_ids(answer: &Answer) -> Vec<(String, f32)> {
    match answer {
        Answer::Grounded { sources, .. } => {
            sources.iter().map(|r| (r.segment.id.clone(), r.score)).collect()
        }
        other => panic!("expected a grounded answer, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_rebuild_keeps_the_previous_index() {
    let (session, uploads) = session_with(ScriptedChat::replying("ok"));
    session.upload(b"The sky is blue. Grass is green.", "colors.txt").await.unwrap();
    let before = session.current_index().await.unwrap();
    let query = HashingEmbeddingProvider::default().embed("What color is grass?").await.unwrap();
    let hits_before = before.search(&query, 2).unwrap();
    let answer_before = session.ask("What color is grass?").await.unwrap();

    let err = session.upload(b"not a pdf at all", "broken.pdf").await.unwrap_err();
    assert!(matches!(err, RagError::LoadError(_)));

    let after = session.current_index().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.search(&query, 2).unwrap(), hits_before);

    let answer_after = session.ask("What color is grass?").await.unwrap();
    assert_eq!(source_ids(&answer_after), source_ids(&answer_before));
    assert_eq!(source_ids(&answer_after)[0].0, "colors.txt#1");
    assert!(dir_is_empty(&uploads));
}

#[tokio::test]
async fn reasoning_after_a_preamble_survives_the_history() {
    let raw = "\nLet me check. <think>page 1 says green</think>\nGrass is green.";
    let (session, _uploads) = session_with(ScriptedChat::replying(raw));
    session.upload(b"The sky is blue. Grass is green.", "colors.txt").await.unwrap();

    let answer = session.ask("What color is grass?").await.unwrap();
    assert_eq!(answer.text(), "Let me check. \nGrass is green.");

    let last = session.history().await.pop().unwrap();
    assert_eq!(last.reasoning.as_deref(), Some("page 1 says green"));
    assert_eq!(last.to_reply().to_raw(), raw);
}

#[tokio::test]
async fn new_upload_replaces_the_index() {
    let (session, _uploads) = session_with(ScriptedChat::replying("ok"));
    session.upload(b"The sky is blue. Grass is green.", "colors.txt").await.unwrap();
    let first = session.current_index().await.unwrap();

    session.upload(b"Short.", "short.md").await.unwrap();
    let second = session.current_index().await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.len(), 1);
    // A reader holding the old index can still search it.
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let (session, uploads) = session_with(ScriptedChat::replying("ok"));

    let err = session.upload(b"cells", "sheet.xlsx").await.unwrap_err();
    assert!(matches!(err, RagError::LoadError(_)));
    assert!(!session.has_document().await);
    assert!(dir_is_empty(&uploads));
}

#[tokio::test]
async fn blank_document_gives_fallback_without_calling_the_model() {
    let chat = ScriptedChat::replying("unused");
    let (session, _uploads) = session_with(chat.clone());
    session.upload(b"          ", "blank.txt").await.unwrap();

    let answer = session.ask("Anything here?").await.unwrap();
    assert!(matches!(answer, Answer::NoRelevantContent));
    assert_eq!(answer.text(), NO_RELEVANT_CONTENT_MESSAGE);
    assert!(chat.prompts().is_empty());
    assert_eq!(session.history().await.last().unwrap().content, NO_RELEVANT_CONTENT_MESSAGE);
}

#[tokio::test]
async fn chat_failure_is_returned_and_recorded() {
    let (session, _uploads) = session_with(ScriptedChat::failing("model not found"));
    session.upload(b"The sky is blue. Grass is green.", "colors.txt").await.unwrap();

    let err = session.ask("What color is grass?").await.unwrap_err();
    assert!(matches!(err, RagError::ChatError { .. }));

    let history = session.history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].role, Role::Assistant);
    assert!(history[2].content.contains("model not found"));
}

#[tokio::test]
async fn close_discards_index_and_history() {
    let (session, _uploads) = session_with(ScriptedChat::replying("ok"));
    session.upload(b"The sky is blue.", "sky.txt").await.unwrap();
    session.ask("What color is the sky?").await.unwrap();

    session.close().await;
    assert!(!session.has_document().await);
    assert!(session.history().await.is_empty());
}

#[tokio::test]
async fn builder_requires_components() {
    let err = Session::builder().config(RagConfig::default()).build().err().unwrap();
    assert!(matches!(err, RagError::ConfigError(_)));

    let invalid = RagConfig { chunk_overlap: 600, ..RagConfig::default() };
    let err = Session::builder()
        .config(invalid)
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .chat_model(ScriptedChat::replying("ok"))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, RagError::ConfigError(_)));
}
