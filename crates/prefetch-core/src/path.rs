//! Route path normalization and classification.

/// Collapse runs of slashes and trim leading/trailing slashes.
pub fn clean_slashes(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len());
    let mut last_was_slash = false;

    for c in path.chars() {
        if c == '/' {
            if !last_was_slash {
                cleaned.push(c);
            }
            last_was_slash = true;
        } else {
            cleaned.push(c);
            last_was_slash = false;
        }
    }

    cleaned.trim_matches('/').to_string()
}

/// Split a leading `scheme://` off a path.
fn split_protocol(path: &str) -> (&str, &str) {
    match path.find("://") {
        Some(idx) if is_scheme(&path[..idx]) => path.split_at(idx + 3),
        _ => ("", path),
    }
}

/// Join path segments with single slashes.
///
/// A leading `scheme://` is preserved, repeated slashes collapse and
/// leading/trailing slashes are trimmed. An empty result is `/`.
///
/// ```
/// use prefetch_core::path_join;
///
/// assert_eq!(path_join(&["/", "routeInfo.json"]), "routeInfo.json");
/// assert_eq!(path_join(&["blog/", "/post"]), "blog/post");
/// assert_eq!(path_join(&["https://cdn.example.com/", "staticData/h1.json"]),
///            "https://cdn.example.com/staticData/h1.json");
/// ```
pub fn path_join(parts: &[&str]) -> String {
    let joined = parts.join("/");
    let (protocol, rest) = split_protocol(&joined);
    let cleaned = clean_slashes(rest);

    if protocol.is_empty() && cleaned.is_empty() {
        return "/".to_string();
    }
    format!("{}{}", protocol, cleaned)
}

/// Make a joined path absolute unless it already carries a protocol.
pub fn absolute_path(path: &str) -> String {
    if path.starts_with('/') || !split_protocol(path).0.is_empty() {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Normalization settings for [`get_route_path`].
#[derive(Debug, Clone, Default)]
pub struct RoutePathOptions {
    /// Origin stripped from absolute links (e.g. `https://example.com`).
    pub site_origin: Option<String>,
    /// Deployment base path stripped from the front of the route.
    pub base_path: Option<String>,
}

impl RoutePathOptions {
    /// Create options with neither origin nor base path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the site origin.
    pub fn with_site_origin(mut self, origin: impl Into<String>) -> Self {
        self.site_origin = Some(origin.into());
        self
    }

    /// Set the base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }
}

/// Normalize a link or location into the canonical route key.
///
/// ```
/// use prefetch_core::{get_route_path, RoutePathOptions};
///
/// let opts = RoutePathOptions::new();
/// assert_eq!(get_route_path("/about/?tab=1#team", &opts), "about");
/// assert_eq!(get_route_path("", &opts), "/");
/// assert_eq!(get_route_path("/", &opts), "/");
/// ```
pub fn get_route_path(raw: &str, options: &RoutePathOptions) -> String {
    if raw.is_empty() || raw == "/" {
        return "/".to_string();
    }

    let mut path = raw;

    if let Some(origin) = options.site_origin.as_deref() {
        let origin = origin.trim_end_matches('/');
        if !origin.is_empty() {
            path = path.strip_prefix(origin).unwrap_or(path);
        }
    }

    // Links to other origins are left as written.
    if has_scheme(path) || path.starts_with("//") {
        return path.to_string();
    }

    if let Some(idx) = path.find('#') {
        path = &path[..idx];
    }
    if let Some(idx) = path.find('?') {
        path = &path[..idx];
    }

    let mut path = path.to_string();
    if let Some(base) = options.base_path.as_deref() {
        let base = base.trim_matches('/');
        if !base.is_empty() {
            let trimmed = path.strip_prefix('/').unwrap_or(&path);
            if let Some(rest) = trimmed.strip_prefix(base) {
                if rest.is_empty() || rest.starts_with('/') {
                    path = rest.to_string();
                }
            }
        }
    }

    let cleaned = clean_slashes(&path);
    if cleaned.is_empty() {
        "/".to_string()
    } else {
        cleaned
    }
}

/// Decides whether a normalized path names a route worth prefetching.
pub trait RouteClassifier: Send + Sync {
    /// Check whether the path is a prefetchable site route.
    fn is_prefetchable(&self, path: &str) -> bool;
}

/// Default classifier: same-site page links only.
///
/// Rejects paths that still carry a scheme after origin stripping
/// (foreign origins, `mailto:`, `tel:`), protocol-relative links and
/// file links with an extension other than `.html`/`.htm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteRouteClassifier;

impl RouteClassifier for SiteRouteClassifier {
    fn is_prefetchable(&self, path: &str) -> bool {
        if path.is_empty() || path.starts_with("//") {
            return false;
        }

        if has_scheme(path) {
            return false;
        }

        let last = path.rsplit('/').next().unwrap_or(path);
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && is_extension(ext) => {
                ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm")
            }
            _ => true,
        }
    }
}

impl<F> RouteClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_prefetchable(&self, path: &str) -> bool {
        self(path)
    }
}

fn has_scheme(path: &str) -> bool {
    path.split_once(':')
        .map_or(false, |(scheme, _)| is_scheme(scheme))
}

fn is_scheme(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

fn is_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
