use std::borrow::Cow;
use std::collections::HashSet;

pub const ROOT_SLUG: &str = "/";
pub const TAG_PREFIX: &str = "tags/";

const INDEX_SUFFIX: &str = "/index";

/// Canonicalizes a page identifier so that `a/b/index`, `/a/b/` and `a/b`
/// compare equal. The rules are repeated until nothing changes, which keeps
/// the result stable under re-normalization.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let mut slug = raw;
    if slug.len() >= INDEX_SUFFIX.len() {
        let split = slug.len() - INDEX_SUFFIX.len();
        if slug.is_char_boundary(split) && slug[split..].eq_ignore_ascii_case(INDEX_SUFFIX) {
            slug = &slug[..split];
        }
    }

    let slug = slug.strip_prefix('/').unwrap_or(slug);
    let slug = slug.strip_suffix('/').unwrap_or(slug);

    if slug.is_empty() {
        ROOT_SLUG.to_owned()
    } else {
        slug.to_owned()
    }
}

pub fn is_tag(id: &str) -> bool {
    id.starts_with(TAG_PREFIX)
}

pub fn tag_name(id: &str) -> &str {
    id.strip_prefix(TAG_PREFIX).unwrap_or(id)
}

/// Accepts either a bare tag name (`rust`) or a tag identifier (`tags/rust`).
pub fn tag_slug(tag: &str) -> String {
    let trimmed = tag.trim().trim_start_matches('/');
    let prefixed = if is_tag(trimmed) {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{TAG_PREFIX}{trimmed}"))
    };
    normalize(&prefixed)
}

/// Location a node click leads to, relative to the site root.
pub fn navigation_href(id: &str, base_path: &str) -> String {
    let base = base_path.trim_matches('/');
    let prefix = if base.is_empty() {
        String::new()
    } else {
        format!("/{base}")
    };

    if is_tag(id) {
        format!("{prefix}/{TAG_PREFIX}{}/", tag_name(id))
    } else {
        format!("{prefix}/{id}.html")
    }
}

/// Maps a page location (as typed by the user or produced by
/// [`navigation_href`]) back to the identifier it names.
pub fn resolve_page<'a, I>(raw_path: &str, base_path: &str, known_ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let decoded = urlencoding::decode(raw_path)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw_path.to_owned());

    let mut path = decoded.as_str();
    path = path.strip_prefix('/').unwrap_or(path);
    path = path.strip_suffix(".html").unwrap_or(path);
    path = path.strip_suffix('/').unwrap_or(path);

    let base = base_path.trim_matches('/');
    if !base.is_empty() {
        if let Some(rest) = path.strip_prefix(base)
            && let Some(rest) = rest.strip_prefix('/')
        {
            path = rest;
        }
        return normalize(path);
    }

    let known = known_ids.into_iter().collect::<HashSet<_>>();
    if !known.contains(path)
        && let Some((_, without_first)) = path.split_once('/')
        && known.contains(without_first)
    {
        path = without_first;
    }

    normalize(path)
}
