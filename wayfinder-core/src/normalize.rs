//! Query Normalizer (spec.md §4.C8): a pure, idempotent text transform
//! applied to every incoming query before it reaches a predictor or the
//! structural cache key.

const FILLER_PREFIXES: &[&str] = &[
    "show me",
    "show",
    "get",
    "find",
    "look up",
    "search for",
    "display",
    "view",
    "see",
    "give me",
    "bring up",
];

/// Collapse a bare plural-looking word followed by another word into a
/// possessive, word-by-word rather than via a leftmost-greedy regex: on
/// `"james smiths lease"` a regex anchored at `(\w+)s\s+(\w+)` matches
/// `"james smiths"` first and mangles `james` into `jame's`. Scanning
/// tokens instead means `smiths` is only ever collapsed against `lease`,
/// its actual neighbor. A token already carrying an apostrophe, or
/// followed by one, is left alone so a second pass is a no-op.
fn collapse_possessive(words: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        if i + 1 < words.len() {
            let next = words[i + 1];
            let is_candidate = word.len() > 1 && word.ends_with('s') && !word.contains('\'');
            let next_is_candidate = next.len() > 1 && next.ends_with('s') && !next.contains('\'');
            if is_candidate && !next_is_candidate && !next.contains('\'') {
                out.push(format!("{}'s", &word[..word.len() - 1]));
                out.push(next.to_string());
                i += 2;
                continue;
            }
        }
        out.push(word.to_string());
        i += 1;
    }
    out
}

/// Synonym canonicalization, applied after filler-stripping and
/// possessive-collapsing. Order matters only in that longer phrases
/// must be checked before the shorter ones they contain.
const SYNONYMS: &[(&str, &str)] = &[
    ("real estate", "property"),
    ("properties", "property"),
    ("earnings", "income"),
    ("revenue", "income"),
    ("phone number", "contact"),
    ("email address", "contact"),
];

/// Lowercase, trim, strip a leading filler verb, collapse possessives,
/// and canonicalize known synonyms. `normalize(normalize(q)) ==
/// normalize(q)` always holds.
pub fn normalize_query(query: &str) -> String {
    let mut q = query.trim().to_lowercase();

    for prefix in FILLER_PREFIXES {
        if let Some(rest) = q.strip_prefix(prefix) {
            if rest.starts_with(' ') || rest.is_empty() {
                q = rest.trim_start().to_string();
                break;
            }
        }
    }

    let words: Vec<&str> = q.split_whitespace().collect();
    q = collapse_possessive(&words).join(" ");

    for (phrase, canonical) in SYNONYMS {
        if q.contains(phrase) {
            q = q.replace(phrase, canonical);
        }
    }

    q.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_filler_verb() {
        assert_eq!(normalize_query("Show me James Smith"), "james smith");
        assert_eq!(normalize_query("find the lease"), "the lease");
    }

    #[test]
    fn collapses_possessive() {
        assert_eq!(normalize_query("james smiths lease"), "james smith's lease");
    }

    #[test]
    fn canonicalizes_known_synonyms() {
        assert_eq!(normalize_query("show me revenue"), "income");
        assert_eq!(normalize_query("find phone number"), "contact");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "Show me James Smiths income",
            "  find   the   properties  ",
            "DISPLAY earnings for the tenant",
            "already normalized text",
            "",
        ];
        for q in inputs {
            let once = normalize_query(q);
            let twice = normalize_query(&once);
            assert_eq!(once, twice, "not idempotent for input {q:?}");
        }
    }

    #[test]
    fn collapses_repeated_whitespace() {
        assert_eq!(normalize_query("john   smith"), "john smith");
    }
}
