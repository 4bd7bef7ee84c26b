//! Prompt template for chunked article analysis.

/// Stands in for an empty `article` cell.
pub const MISSING_ARTICLE_PLACEHOLDER: &str = "no content";
/// Separates articles inside one chunk.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join one chunk of article cells into a prompt body.
#[must_use]
pub fn join_articles(articles: &[Option<&str>]) -> String {
    articles
        .iter()
        .map(|a| a.unwrap_or(MISSING_ARTICLE_PLACEHOLDER))
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Wrap a chunk in the analysis instructions.
#[must_use]
pub fn build_prompt(chunk: &str) -> String {
    format!(
        "Below is the article column of a CSV file:\n{chunk}\n\
         Analyze the articles and group them by country, then answer in this format: \
         1. Analysis summary: - one or two sentences outlining the main content for the country. \
         2. Key points: - list the 2~3 most important points of the country's articles. \
         3. Conclusion: - a short conclusion based on the country's articles."
    )
}
