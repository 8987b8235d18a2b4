//! Prompt construction for the analyst's four operations.

use super::{KnowledgeChunk, PageListing};

/// Guidelines threaded into the compilation prompt.
pub fn compilation_guidelines(language: &str) -> String {
    format!(
        "Guidelines for structuring the knowledge base in {language}:\n\
         1. Introduction & Conclusion: provide an overview and a summary.\n\
         2. Logical flow: organize thematically; synthesize related points from different pages.\n\
         3. Clear headings: Markdown H1 for major topics, H2/H3 for sub-topics (all in {language}).\n\
         4. Clarity (in {language}): clear, active sentences; explain jargon.\n\
         5. Lists & tables (in {language}): represent procedural steps as lists; recreate tables.\n\
         6. Examples & edge cases: include them when the source provides them (translated if needed).\n\
         7. Q/A (in {language}): represent FAQs clearly, e.g. '**Q:**' and '**A:**'.\n\
         8. LANGUAGE: the final document MUST be entirely in {language}; translate where needed.\n\
         9. Completeness & accuracy: reflect ALL relevant information; for policy pages preserve \
            every clause and condition, or summarize with extreme care.\n\
         10. Format: one single, well-formatted Markdown document in {language}."
    )
}

/// System + user messages for language detection.
pub fn language_detection(text_snippet: &str, url: &str) -> (String, String) {
    let system = "You are a language detection AI. Respond with only the full English name \
                  of the language (e.g. \"English\", \"Persian\", \"German\") or \"Undetermined\"."
        .to_string();
    let user = format!(
        "Analyze the following text snippet from {url}. Identify the primary human language \
         used in it. Respond with the full name of the language in English. If the language is \
         unclear or too mixed, respond with \"Undetermined\".\n\n\
         Text snippet:\n\"\"\"{text_snippet}\"\"\"\n\nPrimary language:"
    );
    (system, user)
}

/// System + user messages for page selection.
pub fn page_selection(
    pages: &[PageListing],
    root_url: &str,
    budget: usize,
    language: &str,
) -> (String, String) {
    let listing: String = pages
        .iter()
        .map(|p| {
            format!(
                "- URL: {} (Title: {})\n",
                p.url,
                p.title.as_deref().unwrap_or("N/A")
            )
        })
        .collect();

    let system = format!(
        "You are an AI page selector for foundational company/organizational knowledge. \
         Focus strictly on policies, about, contact, core operational guides, and main service \
         overviews. Strictly limit or exclude individual products and most blog posts. \
         Respond with JSON. Any 'reason' text MUST be in {language}."
    );

    let user = format!(
        "Select the MOST CRUCIAL pages from {root_url} to build a foundational knowledge base \
         about the organization, its core operations, policies, and how to interact with it. \
         The goal is NOT to cover every product or blog post.\n\n\
         From the available pages below, select up to {budget}.\n\n\
         PRIORITIZE pages like: About Us / company information, Contact / support channels, \
         broad service overviews, shipping and delivery policy, return and refund policy, \
         terms and conditions, privacy policy, FAQ, how-to-order and payment guides.\n\n\
         DE-PRIORITIZE and aim to exclude: individual product detail pages, individual blog \
         posts, listing pages without substantial informational text of their own, and generic \
         functional pages (login, cart, account) unless they carry significant policy text.\n\n\
         Available pages:\n{listing}\n\
         Respond with a JSON object of the form \
         {{\"pages\": [{{\"url\": \"...\", \"reason\": \"...\"}}]}}. The \"url\" field is \
         required and must be one of the URLs above; \"reason\" is optional and MUST be in \
         {language}. Select no more than {budget} pages, fewer if fewer qualify, and \
         {{\"pages\": []}} if none do."
    );

    (system, user)
}

/// System + user messages for knowledge extraction from one page.
pub fn knowledge_extraction(
    html: &str,
    url: &str,
    title: Option<&str>,
    language: &str,
) -> (String, String) {
    let system = format!(
        "You are an AI that extracts detailed knowledge from raw HTML. Respond with JSON. \
         All generated text MUST be in {language}, translating where needed. Be comprehensive, \
         accurate, and structured."
    );

    let user = format!(
        "Analyze the raw HTML from '{url}' (Title: \"{}\") for a knowledge base.\n\
         CRITICAL:\n\
         1. LANGUAGE: both fields MUST be in {language}; translate accurately if the page is in \
            another language.\n\
         2. COMPLETENESS: extract ALL meaningful text, data, lists, tables, descriptions, \
            features, FAQs, contacts, and policies. Prioritize user-visible content; recreate \
            table structures faithfully.\n\
         3. You receive raw HTML; ignore scripts and styles unless their metadata matters.\n\
         Respond with a JSON object of the form \
         {{\"title_suggestion\": \"concise title in {language}\", \
           \"extracted_chunk\": \"detailed Markdown in {language}\"}}.\n\
         Raw HTML (possibly truncated):\n```html\n{html}\n```",
        title.unwrap_or("N/A"),
    );

    (system, user)
}

/// System + user messages for final compilation.
pub fn knowledge_compilation(
    chunks: &[KnowledgeChunk],
    root_url: &str,
    language: &str,
) -> (String, String) {
    let mut combined = format!("Knowledge chunks from {root_url} (already in {language}):\n\n");
    for (i, chunk) in chunks.iter().enumerate() {
        combined.push_str(&format!(
            "--- Chunk {} (Source URL: {}) ---\nTitle ({language}): {}\nContent ({language}):\n{}\n--------------------\n\n",
            i + 1,
            chunk.url,
            chunk.title,
            chunk.content,
        ));
    }

    let system = format!(
        "Expert knowledge base compiler. Output Markdown. The final document MUST be in \
         {language}; the chunks are already in {language}. Ensure a comprehensive, flowing \
         narrative with an introduction and a conclusion."
    );

    let user = format!(
        "Compile a comprehensive knowledge base from the chunks below, gathered from \
         {root_url}. Synthesize them into a single Markdown document in {language}.\n\
         Guidelines:\n{}\n\
         Use the chunk titles for section headings, organize logically, preserve every \
         distinct piece of information, and start directly with the content.\n\n{}",
        compilation_guidelines(language),
        combined,
    );

    (system, user)
}
