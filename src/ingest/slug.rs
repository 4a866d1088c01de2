// src/ingest/slug.rs
// DOCUMENTATION: URL slugs and name normalization
// PURPOSE: Derive the unique keys used for upserts

use unidecode::unidecode;

const MAX_SLUG_LEN: usize = 100;

/// Build a URL-safe slug
/// DOCUMENTATION: ASCII transliteration, lowercase, runs of non-alphanumerics
/// collapsed to '-', trimmed; cut at a '-' boundary when longer than 100 bytes
pub fn slugify(input: &str) -> String {
    let ascii = unidecode(input).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        let cut = slug[..MAX_SLUG_LEN]
            .rfind('-')
            .filter(|&idx| idx > MAX_SLUG_LEN / 2)
            .unwrap_or(MAX_SLUG_LEN);
        slug.truncate(cut);
    }

    slug
}

/// Slug of a place: name and city together, so same-named venues in
/// different cities do not collide
pub fn place_slug(name: &str, city: &str) -> String {
    slugify(&format!("{} {}", name, city))
}

/// Name form used for similarity matching
pub fn normalize_name(name: &str) -> String {
    slugify(name).replace('-', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Parc de la Ciutadella"), "parc-de-la-ciutadella");
        assert_eq!(slugify("  --Hello,  World!-- "), "hello-world");
    }

    #[test]
    fn test_slugify_transliterates() {
        assert_eq!(slugify("Café Zürich"), "cafe-zurich");
        assert_eq!(slugify("Plaça d'Espanya"), "placa-d-espanya");
    }

    #[test]
    fn test_slugify_empty_for_symbols() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_truncates_on_boundary() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= 100);
        assert!(!slug.ends_with('-'));
        assert!(slug.ends_with("word"));
    }

    #[test]
    fn test_place_slug_includes_city() {
        assert_eq!(place_slug("Bark Café", "Lisboa"), "bark-cafe-lisboa");
        assert_ne!(place_slug("Dog Beach", "Nice"), place_slug("Dog Beach", "Cannes"));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("The Dog's Café!"), "the dog s cafe");
    }
}
