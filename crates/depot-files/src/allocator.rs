//! Storage path allocation
//!
//! Produces unique, filesystem-safe relative paths under a MIME-partitioned
//! storage root: `{category}/{2ch}/{2ch}/{16ch}{ext}`. Pure path computation;
//! the caller creates the file.

use std::path::Path;

use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;

/// Shape a caller-proposed path must match to be reused verbatim
static PROPOSED_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w{2})/(\w{2})/(\w{16})(\.\w+)$").expect("valid regex"));

fn random_segment(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

fn random_candidate(ext: &str) -> String {
    format!(
        "{}/{}/{}{}",
        random_segment(2),
        random_segment(2),
        random_segment(16),
        ext
    )
}

/// Allocate a unique relative storage path for a file named `name` with the
/// given MIME type.
///
/// A well-formed `proposed` path (`xx/yy/zzzzzzzzzzzzzzzz.ext`) is tried
/// verbatim as the first candidate, and its extension is adopted for any
/// fallback candidates. On collision a brand-new fully random candidate is
/// generated; the proposal is never retried. The loop is unbounded — the
/// random alphabet makes exhaustion a non-concern.
pub fn allocate(storage_root: &Path, name: &str, mime: &str, proposed: Option<&str>) -> String {
    let category = mime.split('/').next().unwrap_or("application");

    let mut ext = Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = random_candidate(&ext);
    if let Some(caps) = proposed.and_then(|p| PROPOSED_SHAPE.captures(p)) {
        ext = caps[4].to_string();
        candidate = format!("{}/{}/{}{}", &caps[1], &caps[2], &caps[3], ext);
    }

    loop {
        let relative = format!("{}/{}", category, candidate);
        if !storage_root.join(&relative).exists() {
            return relative;
        }
        candidate = random_candidate(&ext);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir()
            .join("depot-allocator-tests")
            .join(uuid::Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&dir).expect("create temp root");
        dir
    }

    #[test]
    fn test_default_shape() {
        let root = temp_root();
        let path = allocate(&root, "photo.jpg", "image/jpeg", None);

        assert!(path.starts_with("image/"));
        assert!(path.ends_with(".jpg"));
        let tail = path.strip_prefix("image/").unwrap();
        assert!(PROPOSED_SHAPE.is_match(tail), "unexpected shape: {}", path);
    }

    #[test]
    fn test_partitioned_by_mime_category() {
        let root = temp_root();
        let doc = allocate(&root, "report.pdf", "application/pdf", None);
        let img = allocate(&root, "photo.png", "image/png", None);

        assert!(doc.starts_with("application/"));
        assert!(img.starts_with("image/"));
    }

    #[test]
    fn test_no_extension() {
        let root = temp_root();
        let path = allocate(&root, "README", "text/plain", None);
        assert!(!path.contains('.'), "unexpected extension in {}", path);
    }

    #[test]
    fn test_proposed_path_reused_verbatim() {
        let root = temp_root();
        let path = allocate(
            &root,
            "photo.jpg",
            "image/jpeg",
            Some("ab/cd/0123456789abcdef.png"),
        );
        // Both the shape and the proposal's extension are adopted.
        assert_eq!(path, "image/ab/cd/0123456789abcdef.png");
    }

    #[test]
    fn test_malformed_proposal_ignored() {
        let root = temp_root();
        for bad in ["abc/de/0123456789abcdef.png", "ab/cd/short.png", "ab/cd/0123456789abcdef"] {
            let path = allocate(&root, "photo.jpg", "image/jpeg", Some(bad));
            assert_ne!(path, format!("image/{}", bad));
            assert!(path.ends_with(".jpg"));
        }
    }

    #[test]
    fn test_proposed_collision_falls_back_to_random() {
        let root = temp_root();
        let proposed = "ab/cd/0123456789abcdef.jpg";
        let occupied = root.join("image").join(proposed);
        fs::create_dir_all(occupied.parent().unwrap()).unwrap();
        fs::write(&occupied, b"taken").unwrap();

        let path = allocate(&root, "photo.jpg", "image/jpeg", Some(proposed));
        assert_ne!(path, format!("image/{}", proposed));
        assert!(path.ends_with(".jpg"));
        assert!(!root.join(&path).exists());
    }

    #[test]
    fn test_sequential_allocations_never_collide() {
        let root = temp_root();
        for i in 0..10_000 {
            let path = allocate(&root, "photo.jpg", "image/jpeg", None);
            let abs = root.join(&path);
            assert!(!abs.exists(), "allocation {} returned occupied path {}", i, path);
            fs::create_dir_all(abs.parent().unwrap()).unwrap();
            fs::write(&abs, b"x").unwrap();
        }
    }
}
