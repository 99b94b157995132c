// ─── Release Version Ordering ───
// Semantic versions first, with a lenient numeric fallback for tags the
// strict grammar rejects (extra components, missing patch).

use semver::Version;

/// Parse a release tag. Accepts a leading `v`. Tags that are not valid
/// semver but are dotted numbers are normalized: missing components
/// become 0, components beyond the patch are dropped.
pub fn parse_release_version(tag: &str) -> Option<Version> {
    let trimmed = tag.trim().trim_start_matches('v');
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let parts: Option<Vec<u64>> = trimmed.split('.').map(|p| p.parse().ok()).collect();
    let parts = parts?;
    Some(Version::new(
        parts[0],
        parts.get(1).copied().unwrap_or(0),
        parts.get(2).copied().unwrap_or(0),
    ))
}

/// Version the updater compares against. A malformed string is treated
/// as older than anything, so a broken marker forces an update.
pub fn current_or_oldest(raw: &str) -> Version {
    parse_release_version(raw).unwrap_or_else(|| Version::new(0, 0, 0))
}

/// True when the feed's tag is strictly newer than the installed
/// version. An unparsable feed tag never counts as newer.
pub fn is_newer(latest_tag: &str, current: &str) -> bool {
    match parse_release_version(latest_tag) {
        Some(latest) => latest > current_or_oldest(current),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_components_not_lexical_ordering() {
        assert!(is_newer("1.10.0", "1.2.0"));
        assert!(!is_newer("1.2.0", "1.10.0"));
    }

    #[test]
    fn malformed_current_is_older_than_anything() {
        assert!(is_newer("0.0.1", "not-a-version"));
        assert!(is_newer("1.0.0", ""));
        assert_eq!(current_or_oldest("garbage"), Version::new(0, 0, 0));
    }

    #[test]
    fn v_prefix_and_short_tags_parse() {
        assert_eq!(parse_release_version("v1.3.0"), Some(Version::new(1, 3, 0)));
        assert_eq!(parse_release_version("1.3"), Some(Version::new(1, 3, 0)));
    }

    #[test]
    fn four_component_tags_compare_on_leading_three() {
        assert_eq!(
            parse_release_version("1.105.27.9"),
            Some(Version::new(1, 105, 27))
        );
        assert!(is_newer("1.105.27.9", "1.99.0"));
    }

    #[test]
    fn equal_versions_are_not_newer() {
        assert!(!is_newer("1.3.0", "1.3.0"));
        assert!(!is_newer("v1.3.0", "1.3.0"));
    }

    #[test]
    fn unparsable_feed_tag_is_never_newer() {
        assert!(!is_newer("latest", "1.0.0"));
    }
}
