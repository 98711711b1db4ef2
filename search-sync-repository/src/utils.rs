//! Query-string escaping helpers.

/// Characters with special meaning in the engine's query-string syntax.
pub const RESERVED_CHARACTERS: [char; 16] = [
    '(', ')', '[', ']', '{', '}', '?', '\\', '"', '!', '^', '+', '-', '*', ':', '~',
];

fn is_reserved(c: char) -> bool {
    RESERVED_CHARACTERS.contains(&c)
}

/// Escape every reserved character with a single preceding backslash.
///
/// # Example
///
/// ```
/// use search_sync_repository::escape_query;
///
/// assert_eq!(escape_query("a:b (c)"), r"a\:b \(c\)");
/// ```
pub fn escape_query(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() * 2);
    for c in query.chars() {
        if is_reserved(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a query while keeping its grouping intact.
///
/// Balanced parentheses and balanced double quotes are left alone; unbalanced
/// ones are escaped. A `!` directly followed by a word character is the NOT
/// prefix and is kept. Every other reserved character is escaped.
///
/// # Example
///
/// ```
/// use search_sync_repository::escape_query_grouped;
///
/// assert_eq!(escape_query_grouped("(foo OR bar"), r"\(foo OR bar");
/// assert_eq!(escape_query_grouped("\"foo bar\" !baz"), "\"foo bar\" !baz");
/// ```
pub fn escape_query_grouped(query: &str) -> String {
    let chars: Vec<char> = query.chars().collect();
    let mut keep = vec![false; chars.len()];
    let mut open_parens = Vec::new();
    let mut open_quote: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' => open_parens.push(i),
            ')' => {
                if let Some(start) = open_parens.pop() {
                    keep[start] = true;
                    keep[i] = true;
                }
            }
            '"' => match open_quote.take() {
                Some(start) => {
                    keep[start] = true;
                    keep[i] = true;
                }
                None => open_quote = Some(i),
            },
            '!' => {
                keep[i] = chars
                    .get(i + 1)
                    .is_some_and(|next| next.is_alphanumeric() || *next == '_');
            }
            _ => {}
        }
    }

    let mut escaped = String::with_capacity(query.len() * 2);
    for (i, &c) in chars.iter().enumerate() {
        if is_reserved(c) && !keep[i] {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
