//! Where to look for a configured script.

use std::path::Path;

use crate::core::locator::{PathLike, ResourceLocator, resolve};

/// Ordered locators to try for a configured script path.
///
/// An absolute path yields exactly itself. A relative path yields one
/// candidate per workspace root, in declaration order.
pub fn script_candidates(configured: &str, roots: &[ResourceLocator]) -> Vec<ResourceLocator> {
    let configured = configured.trim();
    if configured.is_empty() {
        return Vec::new();
    }
    if Path::new(configured).is_absolute() {
        return resolve(&PathLike::from(configured)).into_iter().collect();
    }
    roots.iter().map(|root| root.join(configured)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ResourceLocator {
        ResourceLocator::from_file_path(path).expect("file locator")
    }

    #[test]
    fn absolute_path_is_its_only_candidate() {
        let roots = [file("/a"), file("/b")];
        assert_eq!(script_candidates("/abs/init.js", &roots), vec![file("/abs/init.js")]);
    }

    #[test]
    fn relative_path_follows_root_order() {
        let roots = [file("/a"), file("/b")];
        assert_eq!(
            script_candidates("scripts/setup.js", &roots),
            vec![file("/a/scripts/setup.js"), file("/b/scripts/setup.js")]
        );
    }

    #[test]
    fn relative_path_without_roots_has_no_candidates() {
        assert!(script_candidates("scripts/setup.js", &[]).is_empty());
    }

    #[test]
    fn blank_path_has_no_candidates() {
        assert!(script_candidates("  ", &[file("/a")]).is_empty());
    }
}
