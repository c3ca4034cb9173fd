/// Company slug derivation
///
/// # Example
///
/// ```
/// use tallybook_shared::domain::slug::slugify;
///
/// assert_eq!(slugify("Padaria São João"), "padaria-sao-joao");
/// assert_eq!(slugify("  Acme, Inc.  "), "acme-inc");
/// ```

use unicode_normalization::UnicodeNormalization;

/// Longest slug produced by [`slugify`]
pub const MAX_SLUG_LEN: usize = 50;

/// Base used when a name has no slug-able characters
pub const FALLBACK_SLUG: &str = "company";

/// Highest numeric suffix tried by [`candidate_slugs`]
pub const MAX_SLUG_SUFFIX: u32 = 99;

/// Lowercases, strips accents and collapses other characters to `-`
///
/// The result never starts or ends with `-` and has at most
/// [`MAX_SLUG_LEN`] characters. It may be empty.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    let stripped = value
        .to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>();

    for c in stripped.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug.chars()
        .take(MAX_SLUG_LEN)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

/// Whether `slug` only contains `[a-z0-9-]` and is non-empty
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Slug candidates in the order they should be tried
///
/// Yields `base`, then `base-2` through `base-99`. An empty base becomes
/// [`FALLBACK_SLUG`]. Suffixed candidates truncate the base so the whole
/// slug stays within [`MAX_SLUG_LEN`].
pub fn candidate_slugs(base: &str) -> impl Iterator<Item = String> {
    let base = if base.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        base.to_string()
    };

    std::iter::once(base.clone()).chain((2..=MAX_SLUG_SUFFIX).map(move |n| {
        let suffix = format!("-{}", n);
        let keep = MAX_SLUG_LEN.saturating_sub(suffix.len());
        let head: String = base.chars().take(keep).collect();
        format!("{}{}", head.trim_end_matches('-'), suffix)
    }))
}
