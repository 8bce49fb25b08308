use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Settings;
use crate::embedder::Embedder;
use crate::indexer::query_index;
use crate::llm::LlmProvider;
use crate::store::{QueryHit, VectorStore};

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Context information is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the question:
Question: {question}
Answer:";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// A generated answer and the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub hits: Vec<QueryHit>,
}

/// Fill the prompt template with the retrieved chunks and the question.
///
/// Returns `None` when there is nothing to ground the answer on.
/// Placeholders are substituted in one pass, so braces inside the
/// retrieved text or the question are left untouched.
pub fn format_qa_prompt(question: &str, hits: &[QueryHit], template: Option<&str>) -> Option<String> {
    if hits.is_empty() {
        return None;
    }

    let context = hits
        .iter()
        .map(|hit| format!("[Source: {}]\n{}", hit.source, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = template
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
        .split(CONTEXT_PLACEHOLDER)
        .map(|piece| piece.replace(QUESTION_PLACEHOLDER, question))
        .collect::<Vec<_>>()
        .join(&context);

    Some(prompt)
}

/// Retrieve chunks for `search_query` and have the language model answer
/// `question` from them. `Ok(None)` when retrieval finds nothing.
pub async fn answer_question(
    search_query: &str,
    question: &str,
    settings: &Settings,
    embedder: &dyn Embedder,
    store: &VectorStore,
    llm: &dyn LlmProvider,
) -> Result<Option<Answer>> {
    let hits = query_index(search_query, settings, embedder, store).await?;

    let Some(prompt) = format_qa_prompt(question, &hits, settings.prompt_template.as_deref())
    else {
        info!("No context found for '{}'", search_query);
        return Ok(None);
    };
    debug!("Prompt is {} characters from {} chunks", prompt.chars().count(), hits.len());

    let text = llm
        .complete(&prompt, settings.temperature, settings.max_tokens)
        .await
        .context(format!("Failed to get an answer from {}", llm.model()))?;

    Ok(Some(Answer { text, hits }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentChunk;
    use crate::test_support::{LetterEmbedder, RecordingLlm};

    fn hit(source: &str, content: &str) -> QueryHit {
        QueryHit {
            id: format!("{}_0", source),
            source: source.to_string(),
            chunk_index: 0,
            content: content.to_string(),
            distance: 0.5,
        }
    }

    #[test]
    fn test_no_hits_no_prompt() {
        assert_eq!(format_qa_prompt("why?", &[], None), None);
    }

    #[test]
    fn test_default_template() {
        let hits = vec![hit("a.txt", "Alpha text."), hit("b.txt", "Beta text.")];
        let prompt = format_qa_prompt("What is alpha?", &hits, None).unwrap();

        assert_eq!(
            prompt,
            "Context information is below.\n\
             ---------------------\n\
             [Source: a.txt]\nAlpha text.\n\n[Source: b.txt]\nBeta text.\n\
             ---------------------\n\
             Given the context information and not prior knowledge, answer the question:\n\
             Question: What is alpha?\n\
             Answer:"
        );
    }

    #[test]
    fn test_custom_template() {
        let hits = vec![hit("a.txt", "Alpha.")];
        let prompt = format_qa_prompt("Q?", &hits, Some("{question} | {context} | {question}")).unwrap();
        assert_eq!(prompt, "Q? | [Source: a.txt]\nAlpha. | Q?");
    }

    #[test]
    fn test_placeholders_in_content_untouched() {
        let hits = vec![hit("code.txt", "fn main() { println!(\"{question}\") }")];
        let prompt = format_qa_prompt("{context}", &hits, Some("{context}\n{question}")).unwrap();
        assert_eq!(
            prompt,
            "[Source: code.txt]\nfn main() { println!(\"{question}\") }\n{context}"
        );
    }

    #[tokio::test]
    async fn test_answer_question() {
        let mut store = VectorStore::open_in_memory().unwrap();
        let embedder = LetterEmbedder::new();
        let settings = Settings {
            collection_name: "qa".to_string(),
            num_results: 1,
            ..Settings::default()
        };

        let mut collection = store
            .get_or_create_collection("qa", embedder.model(), settings.distance)
            .unwrap();
        let texts = ["The moon orbits the earth.", "Quartz is a hard mineral."];
        let chunks: Vec<DocumentChunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| DocumentChunk {
                id: format!("facts.txt_{}", i),
                source: "facts.txt".to_string(),
                index: i,
                text: t.to_string(),
            })
            .collect();
        let embeddings: Vec<Vec<f32>> = texts.iter().map(|t| LetterEmbedder::vector(t)).collect();
        store
            .upsert_document(&mut collection, "facts.txt", "h", &chunks, &embeddings)
            .unwrap();

        let llm = RecordingLlm::new("It orbits the earth.");
        let answer = answer_question(
            "the moon orbits the earth",
            "What does the moon do?",
            &settings,
            &embedder,
            &store,
            &llm,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(answer.text, "It orbits the earth.");
        assert_eq!(answer.hits.len(), 1);
        assert_eq!(answer.hits[0].id, "facts.txt_0");

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[Source: facts.txt]\nThe moon orbits the earth."));
        assert!(prompts[0].contains("Question: What does the moon do?"));
        assert!(!prompts[0].contains("Quartz"));
    }

    #[tokio::test]
    async fn test_empty_collection_skips_llm() {
        let store = VectorStore::open_in_memory().unwrap();
        let embedder = LetterEmbedder::new();
        let settings = Settings {
            collection_name: "empty".to_string(),
            ..Settings::default()
        };
        store
            .get_or_create_collection("empty", embedder.model(), settings.distance)
            .unwrap();

        let llm = RecordingLlm::new("unused");
        let answer = answer_question("q", "q?", &settings, &embedder, &store, &llm)
            .await
            .unwrap();

        assert!(answer.is_none());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }
}
