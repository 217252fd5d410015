//! POSIX-style path normalization for locator paths.

/// Join `segment` onto `base` and collapse `.`/`..`/empty segments.
///
/// An absolute `segment` still joins (locator joins never replace the base).
/// `..` never climbs above the root of an absolute path. A relative path that
/// collapses to nothing becomes `.`.
pub fn join_normalized(base: &str, segment: &str) -> String {
    let absolute = base.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in base.split('/').chain(segment.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_segment() {
        assert_eq!(join_normalized("/ws/api", "scripts/setup.js"), "/ws/api/scripts/setup.js");
    }

    #[test]
    fn parent_of_file_is_its_directory() {
        assert_eq!(join_normalized("/ws/api/get.http", ".."), "/ws/api");
    }

    #[test]
    fn parent_of_root_stays_root() {
        assert_eq!(join_normalized("/", ".."), "/");
    }

    #[test]
    fn collapses_dots_and_duplicate_slashes() {
        assert_eq!(join_normalized("/a//b/./c/", "../d"), "/a/b/d");
    }

    #[test]
    fn relative_base_keeps_leading_parent_segments() {
        assert_eq!(join_normalized("Untitled-1", ".."), ".");
        assert_eq!(join_normalized("a", "../../b"), "../b");
    }

    #[test]
    fn absolute_segment_still_appends() {
        assert_eq!(join_normalized("/ws", "/etc/init.js"), "/ws/etc/init.js");
    }
}
