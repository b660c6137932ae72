// src/utils/slug.rs

use regex::Regex;

/// Turns a store name into a URL-safe slug (`^[a-z0-9-]*$`).
///
/// Accented Latin letters are folded to ASCII, `&` reads as "and", and any
/// other run of non-alphanumeric characters collapses into one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        let folded: Option<&str> = match c {
            '&' => Some("and"),
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => Some("a"),
            'æ' | 'Æ' => Some("ae"),
            'ç' | 'Ç' => Some("c"),
            'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => Some("e"),
            'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => Some("i"),
            'ñ' | 'Ñ' => Some("n"),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => Some("o"),
            'œ' | 'Œ' => Some("oe"),
            'ß' => Some("ss"),
            'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => Some("u"),
            'ý' | 'ÿ' | 'Ý' => Some("y"),
            _ => None,
        };

        if let Some(ascii) = folded {
            push_word(&mut slug, ascii, &mut pending_dash);
        } else if c.is_ascii_alphanumeric() {
            let lower = c.to_ascii_lowercase();
            let mut buf = [0u8; 4];
            push_word(&mut slug, lower.encode_utf8(&mut buf), &mut pending_dash);
        } else if c == '\'' || c == '’' {
            // "Joe's" reads better as "joes" than "joe-s"
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn push_word(slug: &mut String, word: &str, pending_dash: &mut bool) {
    if *pending_dash && !slug.is_empty() {
        slug.push('-');
    }
    *pending_dash = false;
    slug.push_str(word);
}

/// Matches `base` itself and every numbered variant of it (`base-2`, `base-17`, `base-`).
pub fn collision_pattern(base: &str) -> Regex {
    let pattern = format!(r"(?i)^({})(-[0-9]*)?$", regex::escape(base));
    Regex::new(&pattern).expect("escaped slug is always a valid pattern")
}

/// Picks the slug for `base` given the slugs of the other stores that share its prefix.
///
/// With `n` colliding slugs the result is `base-{n+1}`. If that one is taken too
/// (a store was explicitly named "X 3", say) the counter keeps climbing.
pub fn choose_slug(base: &str, existing: &[String]) -> String {
    let pattern = collision_pattern(base);
    let collisions: Vec<&str> = existing
        .iter()
        .map(String::as_str)
        .filter(|s| pattern.is_match(s))
        .collect();

    if collisions.is_empty() {
        return base.to_string();
    }

    let mut counter = collisions.len() + 1;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !collisions.iter().any(|s| s.eq_ignore_ascii_case(&candidate)) {
            return candidate;
        }
        counter += 1;
    }
}
