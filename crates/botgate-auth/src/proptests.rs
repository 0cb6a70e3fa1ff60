//! Property-based tests for header parsing and body extraction.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{BEARER_PREFIX, activities_from_json, extract_bearer_token};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_non_bearer_header_never_yields_token(value in "\\PC*") {
            prop_assume!(!value.starts_with(BEARER_PREFIX));
            prop_assert_eq!(extract_bearer_token(&value), None);
        }

        #[test]
        fn test_bearer_token_is_trimmed_remainder(token in "[A-Za-z0-9._-]{1,64}", pad in " {0,4}") {
            let header = format!("{BEARER_PREFIX}{pad}{token}{pad}");
            prop_assert_eq!(extract_bearer_token(&header), Some(token.as_str()));
        }

        #[test]
        fn test_arbitrary_bytes_never_panic(body in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = activities_from_json(&body);
        }

        #[test]
        fn test_service_url_survives_extraction(host in "[a-z]{1,12}") {
            let url = format!("https://{host}.example/api");
            let body = format!(r#"[{{"type":"message","serviceUrl":"{url}"}}]"#);
            let activities = activities_from_json(body.as_bytes());
            prop_assert_eq!(activities.len(), 1);
            prop_assert_eq!(activities[0].service_url(), Some(url.as_str()));
        }
    }
}
