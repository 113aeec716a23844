use regex::Regex;
use std::sync::OnceLock;

fn uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?")
            .expect("URI pattern compiles")
    })
}

/// Relative cache path for `url`: authority labels reversed (`cdn.example.com`
/// becomes `com/example/cdn`) followed by the path segments. Scheme, query and
/// fragment are dropped, so URLs differing only by query share a path.
///
/// Empty, `.` and `..` segments are skipped so the result stays under the
/// cache root.
pub fn relative_path_for_url(url: &str) -> String {
    let (authority, path) = match uri_pattern().captures(url) {
        Some(caps) => (
            caps.get(2).map(|m| m.as_str()).unwrap_or_default(),
            caps.get(3).map(|m| m.as_str()).unwrap_or_default(),
        ),
        None => ("", url),
    };
    authority
        .rsplit('.')
        .chain(path.split('/'))
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}
