//! URL slugs shared by posts, categories, authors and hubs

/// Longest slug generated from a title
const MAX_SLUG_LEN: usize = 80;

/// Generate a slug from a title or name.
///
/// Lowercase ASCII letters and digits are kept, every other run of
/// characters becomes a single hyphen, and leading/trailing hyphens are
/// trimmed. Common Latin accents are folded to their base letter.
pub fn generate_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        let trimmed_len = slug.trim_end_matches('-').len();
        slug.truncate(trimmed_len);
    }
    slug
}

/// A caller-supplied slug is valid when it is what `generate_slug` would produce
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 200
        && slug
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

/// Use an explicit slug if given (it must already be valid), otherwise
/// generate one from `source`. The error is a user-facing message.
pub fn resolve_slug(explicit: Option<&str>, source: &str) -> Result<String, String> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) if is_valid_slug(slug) => Ok(slug.to_string()),
        Some(slug) => Err(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            slug
        )),
        None => {
            let generated = generate_slug(source);
            if generated.is_empty() {
                Err("Cannot derive a slug from the name; provide one".to_string())
            } else {
                Ok(generated)
            }
        }
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
