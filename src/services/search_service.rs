use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Case-, accent- and whitespace-insensitive form used by every text search.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when every term of `query` appears in at least one of `fields`.
/// An empty query matches everything.
pub fn matches_query(query: &str, fields: &[&str]) -> bool {
    let query = normalize(query);
    if query.is_empty() {
        return true;
    }

    let haystack: Vec<String> = fields.iter().map(|field| normalize(field)).collect();
    query
        .split(' ')
        .all(|term| haystack.iter().any(|field| field.contains(term)))
}
