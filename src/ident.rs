use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel canonical id for identifiers that carry no usable token.
pub const UNKNOWN_ID: &str = "unknown";

static INSTANCE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bi-[0-9a-f]{8,17}\b").unwrap());

/// Extract the embedded instance-style token from a raw identifier, if any.
///
/// Raw edges reference EC2 instances by full ARN, by bare instance id, or
/// by a composite collector string; all three embed the same `i-...` token.
pub fn instance_token(raw: &str) -> Option<&str> {
    INSTANCE_TOKEN_RE.find(raw).map(|m| m.as_str())
}

/// Canonicalize a raw resource identifier to the key the rest of the
/// pipeline joins on.
///
/// Resolution order: embedded instance token, then the last segment of a
/// slash- or colon-delimited identifier, then the trimmed input itself.
/// Total and idempotent; blank input maps to [`UNKNOWN_ID`].
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return UNKNOWN_ID.to_string();
    }
    if let Some(token) = instance_token(trimmed) {
        return token.to_string();
    }
    let tail = trimmed.rsplit('/').find(|part| !part.is_empty()).unwrap_or("");
    let tail = tail.rsplit(':').find(|part| !part.is_empty()).unwrap_or("");
    if tail.is_empty() {
        return UNKNOWN_ID.to_string();
    }
    tail.to_string()
}

/// Compact display form of a resource name: the canonical tail, truncated
/// for badge-sized labels.
pub fn short_name(name: &str) -> String {
    const MAX: usize = 22;
    let tail = normalize(name);
    if tail.chars().count() <= MAX {
        return tail;
    }
    let mut out: String = tail.chars().take(MAX - 1).collect();
    out.push('\u{2026}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_instance_token_from_arn() {
        let arn = "arn:aws:ec2:us-east-1:123456789012:instance/i-0abc1234def56789a";
        assert_eq!(normalize(arn), "i-0abc1234def56789a");
    }

    #[test]
    fn extracts_instance_token_from_composite_string() {
        assert_eq!(
            normalize("flowlog-collector/i-00112233aabbccdd rejected"),
            "i-00112233aabbccdd"
        );
    }

    #[test]
    fn falls_back_to_last_path_segment() {
        assert_eq!(normalize("arn:aws:iam::123456789012:role/app-reader"), "app-reader");
        assert_eq!(normalize("arn:aws:s3:::orders-archive"), "orders-archive");
    }

    #[test]
    fn plain_identifiers_pass_through() {
        assert_eq!(normalize("sg-11aa22bb"), "sg-11aa22bb");
        assert_eq!(normalize("orders-queue"), "orders-queue");
    }

    #[test]
    fn blank_input_maps_to_unknown() {
        assert_eq!(normalize(""), UNKNOWN_ID);
        assert_eq!(normalize("   "), UNKNOWN_ID);
        assert_eq!(normalize(":::"), UNKNOWN_ID);
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "arn:aws:ec2:us-east-1:123456789012:instance/i-0abc1234def56789a",
            "arn:aws:iam::123456789012:role/app-reader",
            "sg-11aa22bb",
            "i-00112233aabbccdd",
            "",
            "a/b/c",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn short_name_truncates_long_names() {
        let short = short_name("an-extremely-long-resource-name-for-the-badge");
        assert!(short.chars().count() <= 22);
        assert!(short.ends_with('\u{2026}'));
    }
}
