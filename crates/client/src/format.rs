//! LLM-facing formatting: context strings, citation maps, prompt assembly.
//!
//! Two renderings of a `RagQueryResponse` are supported: a plain numbered
//! context block for human-readable prompts, and a tagged source listing
//! whose ids line up with a `CitationMap` so inline `[N]` markers in a model
//! answer can be resolved back to origin documents.

use crate::types::RagQueryResponse;
use std::collections::HashMap;

/// Default prompt template for retrieval-augmented answers.
///
/// `{{CONTEXT}}` is replaced with the tagged source listing and `{{QUERY}}`
/// with the user's question.
pub const DEFAULT_RAG_TEMPLATE: &str = "\
### Task:
Respond to the user query using the provided context, incorporating inline citations in the format [id] where the id matches the source tag.

### Guidelines:
- If you don't know the answer, clearly state that.
- Only cite a source when you are explicitly referencing it.
- Do not use XML tags in your response.

<context>
{{CONTEXT}}
</context>

<user_query>
{{QUERY}}
</user_query>
";

/// Mapping between citation ids and source documents.
///
/// Ids are dense, start at 1, and follow first appearance in the ranked
/// result order. One id per unique source; repeated passages from the same
/// document share an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationMap {
    ids: HashMap<String, u32>,
    sources: Vec<String>,
}

impl CitationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `source`, assigning the next one on first sight.
    pub fn assign(&mut self, source: &str) -> u32 {
        if let Some(id) = self.ids.get(source) {
            return *id;
        }
        self.sources.push(source.to_string());
        let id = self.sources.len() as u32;
        self.ids.insert(source.to_string(), id);
        id
    }

    /// Id already assigned to `source`, if any.
    pub fn id_for(&self, source: &str) -> Option<u32> {
        self.ids.get(source).copied()
    }

    /// Source document behind a citation id.
    pub fn source_for(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.sources.get(id as usize - 1).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// `(id, source)` pairs in ascending id order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &str)> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, s)| (i as u32 + 1, s.as_str()))
    }
}

/// Format ranked results as a plain numbered context block.
///
/// Returns "No relevant information found." when the result set is empty so
/// callers can hand the string to a model either way.
pub fn format_results_for_llm(response: &RagQueryResponse) -> String {
    if response.results.is_empty() {
        return "No relevant information found.".to_string();
    }

    let mut parts = vec![format!(
        "Found {} relevant documents for query: '{}'\n",
        response.total_results, response.query
    )];

    for (index, result) in response.results.iter().enumerate() {
        let source_info = match &result.source {
            Some(source) => format!(" (from {})", source),
            None => String::new(),
        };
        parts.push(format!(
            "\n[{}] Relevance: {:.2}{}\n{}\n",
            index + 1,
            result.relevance_score,
            source_info,
            result.text
        ));
    }

    parts.join("\n")
}

/// Format ranked results as tagged source blocks with a matching citation map.
///
/// Each passage becomes `<source id="N" name="...">text</source>`, where `N`
/// comes from the citation map. A passage without a source field falls back
/// to its collection name so every block stays citable.
pub fn format_sources_for_llm(response: &RagQueryResponse) -> (String, CitationMap) {
    let mut citations = CitationMap::new();
    let mut blocks = Vec::with_capacity(response.results.len());

    for result in &response.results {
        let source = result
            .source
            .as_deref()
            .unwrap_or(result.collection_name.as_str());
        let id = citations.assign(source);
        blocks.push(format!(
            "<source id=\"{}\" name=\"{}\">{}</source>",
            id, source, result.text
        ));
    }

    (blocks.join("\n"), citations)
}

/// Assemble a full prompt from a template, a context block, and the query.
///
/// Any template works as long as it carries the `{{CONTEXT}}` and `{{QUERY}}`
/// placeholders; missing placeholders are left untouched rather than erroring.
pub fn build_rag_prompt(template: &str, context: &str, query: &str) -> String {
    template
        .replace("{{CONTEXT}}", context)
        .replace("{{QUERY}}", query)
}

/// Unique source documents referenced by the results, in first-seen ranked
/// order.
pub fn get_unique_sources(response: &RagQueryResponse) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut sources = Vec::new();

    for result in &response.results {
        if let Some(source) = &result.source {
            if seen.insert(source.clone(), ()).is_none() {
                sources.push(source.clone());
            }
        }
    }

    sources
}

/// Extract `[N]` citation markers from a model answer, deduplicated in order
/// of first appearance.
///
/// Only plain bracketed integers count; `[12a]` and empty brackets are
/// ignored.
pub fn parse_citation_markers(answer: &str) -> Vec<u32> {
    let mut markers = Vec::new();
    let bytes = answer.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start && end < bytes.len() && bytes[end] == b']' {
                // Digits only between brackets; overly long runs are not
                // citations and fail the parse
                if let Ok(id) = answer[start..end].parse::<u32>() {
                    if !markers.contains(&id) {
                        markers.push(id);
                    }
                }
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Collection, DocumentResult, RagQueryResponse};
    use serde_json::json;

    fn result(text: &str, source: Option<&str>, relevance: f32) -> DocumentResult {
        DocumentResult {
            text: text.to_string(),
            metadata: json!({}),
            distance: 2.0 * (1.0 - relevance),
            relevance_score: relevance,
            source: source.map(|s| s.to_string()),
            collection_id: "col-1".to_string(),
            collection_name: "Docs".to_string(),
        }
    }

    fn response(results: Vec<DocumentResult>) -> RagQueryResponse {
        RagQueryResponse::new(
            "test query",
            results,
            vec![Collection::new("col-1", "Docs")],
            Vec::new(),
            10.0,
        )
    }

    #[test]
    fn test_format_results_empty() {
        let response = response(Vec::new());
        assert_eq!(
            format_results_for_llm(&response),
            "No relevant information found."
        );
    }

    #[test]
    fn test_format_results_numbered_blocks() {
        let response = response(vec![
            result("First passage", Some("guide.pdf"), 0.92),
            result("Second passage", None, 0.75),
        ]);

        let formatted = format_results_for_llm(&response);

        assert!(formatted.starts_with("Found 2 relevant documents for query: 'test query'"));
        assert!(formatted.contains("[1] Relevance: 0.92 (from guide.pdf)"));
        assert!(formatted.contains("First passage"));
        // No source field, no "(from ...)" suffix
        assert!(formatted.contains("[2] Relevance: 0.75\n"));
        assert!(formatted.contains("Second passage"));
    }

    #[test]
    fn test_citation_map_dedups_and_orders() {
        let mut map = CitationMap::new();
        assert_eq!(map.assign("a.pdf"), 1);
        assert_eq!(map.assign("b.pdf"), 2);
        assert_eq!(map.assign("a.pdf"), 1);

        assert_eq!(map.len(), 2);
        assert_eq!(map.id_for("b.pdf"), Some(2));
        assert_eq!(map.source_for(1), Some("a.pdf"));
        assert_eq!(map.source_for(0), None);
        assert_eq!(map.source_for(3), None);

        let entries: Vec<(u32, &str)> = map.entries().collect();
        assert_eq!(entries, vec![(1, "a.pdf"), (2, "b.pdf")]);
    }

    #[test]
    fn test_format_sources_shares_ids_per_source() {
        let response = response(vec![
            result("chunk one", Some("guide.pdf"), 0.9),
            result("chunk two", Some("notes.md"), 0.8),
            result("chunk three", Some("guide.pdf"), 0.7),
        ]);

        let (context, citations) = format_sources_for_llm(&response);

        assert_eq!(citations.len(), 2);
        assert!(context.contains("<source id=\"1\" name=\"guide.pdf\">chunk one</source>"));
        assert!(context.contains("<source id=\"2\" name=\"notes.md\">chunk two</source>"));
        // Same document, same id
        assert!(context.contains("<source id=\"1\" name=\"guide.pdf\">chunk three</source>"));
    }

    #[test]
    fn test_format_sources_falls_back_to_collection_name() {
        let response = response(vec![result("orphan chunk", None, 0.6)]);

        let (context, citations) = format_sources_for_llm(&response);

        assert!(context.contains("<source id=\"1\" name=\"Docs\">orphan chunk</source>"));
        assert_eq!(citations.source_for(1), Some("Docs"));
    }

    #[test]
    fn test_build_rag_prompt_substitutes_placeholders() {
        let prompt = build_rag_prompt(DEFAULT_RAG_TEMPLATE, "CTX-BLOCK", "why is the sky blue?");

        assert!(prompt.contains("CTX-BLOCK"));
        assert!(prompt.contains("why is the sky blue?"));
        assert!(!prompt.contains("{{CONTEXT}}"));
        assert!(!prompt.contains("{{QUERY}}"));
    }

    #[test]
    fn test_unique_sources_first_seen_order() {
        let response = response(vec![
            result("a", Some("z.pdf"), 0.9),
            result("b", Some("a.pdf"), 0.8),
            result("c", Some("z.pdf"), 0.7),
            result("d", None, 0.6),
        ]);

        // Ranked first-seen order, not alphabetical
        assert_eq!(get_unique_sources(&response), vec!["z.pdf", "a.pdf"]);
    }

    #[test]
    fn test_parse_citation_markers() {
        let answer = "X is fast [1] and portable [2]. See also [1] and [10].";
        assert_eq!(parse_citation_markers(answer), vec![1, 2, 10]);

        assert!(parse_citation_markers("no citations here").is_empty());
        assert!(parse_citation_markers("[not] [a1] []").is_empty());
        assert_eq!(parse_citation_markers("[3]"), vec![3]);
    }

    #[test]
    fn test_citation_round_trip() {
        let response = response(vec![
            result("alpha", Some("alpha.md"), 0.9),
            result("beta", Some("beta.md"), 0.8),
        ]);

        let (context, citations) = format_sources_for_llm(&response);
        let prompt = build_rag_prompt(DEFAULT_RAG_TEMPLATE, &context, "q");
        assert!(prompt.contains("<context>"));

        let answer = "Alpha does this [1], while beta does that [2].";
        let resolved: Vec<&str> = parse_citation_markers(answer)
            .into_iter()
            .filter_map(|id| citations.source_for(id))
            .collect();
        assert_eq!(resolved, vec!["alpha.md", "beta.md"]);
    }
}
