use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) survive,
/// dangerous tags (like <script>, <iframe>) and attributes (like onclick)
/// are stripped. Applied to instructor-authored prompt and option text
/// before it is stored and later rendered to quiz takers.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
