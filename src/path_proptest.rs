//! Property-based tests for path manipulation functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use std::path::{Component, Path, PathBuf};

    use crate::filesystem::{FileSystem, MemoryFS};
    use crate::path::{clean, encode_url_path, ConfirmedDir};
    use proptest::prelude::*;

    /// Relative paths built from names, `.` and `..`
    fn messy_path() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                3 => "[a-z]{1,6}",
                1 => Just(".".to_string()),
                1 => Just("..".to_string()),
            ],
            0..8,
        )
        .prop_map(|segments| segments.join("/"))
    }

    fn names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,4}", 1..5)
    }

    // ============================================================================
    // clean property tests
    // ============================================================================

    proptest! {
        /// Property: cleaning is idempotent
        #[test]
        fn clean_is_idempotent(path in messy_path(), absolute in any::<bool>()) {
            let path = if absolute { format!("/{}", path) } else { path };
            let once = clean(&path);
            prop_assert_eq!(clean(&once), once);
        }

        /// Property: a cleaned path never contains `.` segments
        #[test]
        fn clean_drops_cur_dir(path in messy_path()) {
            let cleaned = clean(&path);
            if cleaned != Path::new(".") {
                prop_assert!(!cleaned.components().any(|c| c == Component::CurDir));
            }
        }

        /// Property: an absolute path stays absolute and never contains `..`
        #[test]
        fn clean_absolute_never_climbs(path in messy_path()) {
            let cleaned = clean(format!("/{}", path));
            prop_assert!(cleaned.is_absolute());
            prop_assert!(!cleaned.components().any(|c| c == Component::ParentDir));
        }

        /// Property: `..` only ever appears as a leading run in relative paths
        #[test]
        fn clean_relative_parent_dirs_lead(path in messy_path()) {
            let cleaned = clean(&path);
            let mut seen_name = false;
            for component in cleaned.components() {
                match component {
                    Component::ParentDir => prop_assert!(!seen_name),
                    Component::Normal(_) => seen_name = true,
                    _ => {}
                }
            }
        }
    }

    // ============================================================================
    // ConfirmedDir prefix property tests
    // ============================================================================

    proptest! {
        /// Property: a directory has every one of its parents as a prefix
        #[test]
        fn confirmed_dir_has_parent_prefixes(segments in names()) {
            let fs = MemoryFS::new();
            let full: PathBuf = Path::new("/").join(segments.join("/"));
            fs.mkdir_all(&full).unwrap();
            let dir = ConfirmedDir::new(&fs, &full).unwrap();

            for ancestor in full.ancestors() {
                let ancestor = ConfirmedDir::new(&fs, ancestor).unwrap();
                prop_assert!(dir.has_prefix(&ancestor));
                prop_assert!(ancestor.is_ancestor_of(&dir));
            }
        }

        /// Property: extending the last name of a directory does not make it a prefix
        #[test]
        fn confirmed_dir_prefix_respects_boundaries(segments in names(), suffix in "[a-z]{1,3}") {
            let fs = MemoryFS::new();
            let base: PathBuf = Path::new("/").join(segments.join("/"));
            let longer = PathBuf::from(format!("{}{}", base.display(), suffix));
            fs.mkdir_all(&base).unwrap();
            fs.mkdir_all(&longer).unwrap();

            let base = ConfirmedDir::new(&fs, &base).unwrap();
            let longer = ConfirmedDir::new(&fs, &longer).unwrap();
            prop_assert!(!longer.has_prefix(&base));
            prop_assert!(!base.has_prefix(&longer));
        }
    }

    // ============================================================================
    // encode_url_path property tests
    // ============================================================================

    proptest! {
        /// Property: encode_url_path never produces filesystem-unsafe characters
        #[test]
        fn encode_url_path_never_produces_unsafe_chars(input in ".*") {
            let result = encode_url_path(&input);
            let unsafe_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
            for ch in unsafe_chars {
                prop_assert!(
                    !result.contains(ch),
                    "encode_url_path produced unsafe character '{}' from input '{}'",
                    ch,
                    input
                );
            }
        }

        /// Property: encode_url_path preserves alphanumeric characters
        #[test]
        fn encode_url_path_preserves_alphanumeric(input in "[a-zA-Z0-9]+") {
            let result = encode_url_path(&input);
            prop_assert_eq!(result, input);
        }

        /// Property: characters are replaced one for one
        #[test]
        fn encode_url_path_preserves_char_count(input in ".+") {
            let result = encode_url_path(&input);
            prop_assert_eq!(result.chars().count(), input.chars().count());
        }

        /// Property: encoded names are usable as a clone directory prefix
        #[test]
        fn encode_url_path_of_org_repo_is_one_segment(org in "[a-zA-Z0-9_-]{1,10}", repo in "[a-zA-Z0-9_.-]{1,10}") {
            let encoded = encode_url_path(&format!("{}/{}", org, repo));
            prop_assert_eq!(Path::new(&encoded).components().count(), 1);
        }
    }
}
