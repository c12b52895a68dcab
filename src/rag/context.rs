//! Context assembly and the grounding system prompt.
//!
//! The `[Source i]` labels are 1-based and follow *input order*, so the
//! citations the model emits map positionally onto the `sources` array the
//! API returns. That mapping is relied on end to end; nothing here reorders
//! results.

use crate::rag::retrieval::RetrievedPassage;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Assemble retrieved passages into a numbered, citation-tagged context
/// block. Title and page are omitted from a label when absent.
pub fn build_context(results: &[RetrievedPassage]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let mut label = format!("[Source {}]", i + 1);
            if !result.title.is_empty() {
                label.push_str(&format!(" {}", result.title));
            }
            if let Some(page) = result.page_start {
                label.push_str(&format!(" (Page {})", page));
            }
            format!("{}\n{}", label, result.content)
        })
        .collect();

    blocks.join(BLOCK_SEPARATOR)
}

/// Fixed grounding instruction embedding the assembled context.
pub fn build_system_prompt(context: &str) -> String {
    format!(
        "You are an expert assistant specializing in regulatory guidance documents. \
Your role is to help users understand regulations, guidance, and compliance requirements.

When answering questions:
1. Base your answers primarily on the provided context from the guidance documents
2. Cite your sources using [Source N] notation when referencing specific information
3. If the context doesn't contain enough information to fully answer the question, acknowledge this
4. Provide clear, accurate, and helpful responses
5. If asked about something outside the scope of the guidance corpus, politely redirect to relevant topics

Here is the relevant context from the guidance documents:

{}

Remember to cite sources when using information from the context above.",
        context
    )
}
