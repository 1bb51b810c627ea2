//! Text helpers applied to article and category input: slugs, markup stripping,
//! reading-time estimation and excerpts.

/// Reading speed used for `reading_time`.
pub const WORDS_PER_MINUTE: usize = 200;

/// Default excerpt length when the author does not provide one.
pub const EXCERPT_CHARS: usize = 160;

const MAX_SLUG_CHARS: usize = 80;

/// ASCII replacement for the accented letters common in culinary vocabulary.
fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'ç' | 'ć' | 'č' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ž' | 'ź' | 'ż' => "z",
        'š' | 'ś' => "s",
        'ł' => "l",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        _ => return None,
    };
    Some(folded)
}

/// slugify
///
/// Turns free text into a URL segment: lowercase ASCII letters and digits separated by
/// single dashes. Never returns an empty string.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let piece = if c.is_ascii_alphanumeric() {
            Some(c.to_string())
        } else {
            fold(c).map(str::to_string)
        };

        match piece {
            Some(piece) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(&piece);
            }
            None => pending_dash = true,
        }
    }

    if slug.len() > MAX_SLUG_CHARS {
        slug.truncate(MAX_SLUG_CHARS);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// unique_slug
///
/// Returns `base` when no existing record uses it, otherwise the first free
/// `base-2`, `base-3`, ...
pub fn unique_slug<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: std::collections::HashSet<&str> = taken.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }

    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// strip_markup
///
/// Removes `<...>` tags and decodes the handful of entities rich-text editors emit.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!` and closed by a later
/// `>`. Anything else, such as `1 < 2` in a markdown body, is kept as text.
pub fn strip_markup(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        plain.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let opens_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');

        match after.find('>').filter(|_| opens_tag) {
            Some(close) => {
                // Block tags separate words.
                plain.push(' ');
                rest = &after[close + 1..];
            }
            None => {
                plain.push('<');
                rest = after;
            }
        }
    }
    plain.push_str(rest);

    plain
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub fn word_count(text: &str) -> usize {
    strip_markup(text).split_whitespace().count()
}

/// reading_time
///
/// Whole minutes needed to read `body`, rounded up, never less than one.
pub fn reading_time(body: &str) -> u32 {
    let minutes = word_count(body).div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// excerpt
///
/// Plain-text preview of `body` of at most `max_chars` characters, cut on a word
/// boundary and terminated by an ellipsis when shortened.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let plain = strip_markup(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if plain.chars().count() <= max_chars {
        return plain;
    }

    let mut cut = String::new();
    for word in plain.split(' ') {
        let next_len = cut.chars().count() + word.chars().count() + usize::from(!cut.is_empty());
        if next_len > max_chars {
            break;
        }
        if !cut.is_empty() {
            cut.push(' ');
        }
        cut.push_str(word);
    }

    if cut.is_empty() {
        // A single word longer than the limit.
        cut = plain.chars().take(max_chars).collect();
    }

    let trimmed = cut.trim_end_matches(|c: char| c.is_ascii_punctuation());
    format!("{trimmed}…")
}

/// Normalizes a tag list: trimmed, lowercase, no blanks, no duplicates, first
/// occurrence order kept.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// `#RRGGBB` check for category colors.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
