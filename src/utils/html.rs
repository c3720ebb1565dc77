use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) are kept while
/// dangerous tags (like <script>, <iframe>) and malicious attributes
/// (like onclick) are stripped. Applied to creator-authored rich text
/// (quiz descriptions, question text, open-ended guidelines) before
/// storage, as a fail-safe against Stored XSS on the public taking page.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
