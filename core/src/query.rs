//! Query-string resolution for GET and DELETE.

use crate::error::{RequestError, Result};
use crate::payload::{query_segments, FormEncoding, Payload};

/// Split `url` on its first `?` and return the existing `key=value`
/// segments in order. Every segment must contain `=`.
pub fn parse_query(url: &str) -> Result<Vec<String>> {
    let Some((_, query)) = url.split_once('?') else {
        return Ok(Vec::new());
    };
    query
        .split('&')
        .map(|segment| {
            if segment.contains('=') {
                Ok(segment.to_string())
            } else {
                Err(RequestError::MalformedQuery(segment.to_string()))
            }
        })
        .collect()
}

/// Merge the query already on `url` with the segments `payload` contributes.
///
/// Existing pairs keep their position ahead of the appended ones. When no
/// segments remain the bare base is returned, without a trailing `?`.
pub fn build_url(url: &str, payload: Payload, encoding: FormEncoding) -> Result<String> {
    let mut segments = parse_query(url)?;
    segments.extend(query_segments(payload, encoding)?);

    let base = url.split_once('?').map_or(url, |(base, _)| base);
    if segments.is_empty() {
        return Ok(base.to_string());
    }
    Ok(format!("{base}?{}", segments.join("&")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_without_query_has_no_segments() {
        assert!(parse_query("http://x/y").unwrap().is_empty());
    }

    #[test]
    fn existing_pairs_are_kept_in_order() {
        assert_eq!(
            parse_query("http://x/y?b=2&a=1&c=").unwrap(),
            vec!["b=2", "a=1", "c="]
        );
    }

    #[test]
    fn segment_without_equals_is_malformed() {
        let err = parse_query("http://x/y?bad").unwrap_err();
        assert!(matches!(err, RequestError::MalformedQuery(s) if s == "bad"));
        assert!(build_url("http://x/y?a=1&bad", ().into(), FormEncoding::Raw).is_err());
    }

    #[test]
    fn mapping_appends_after_existing_pairs() {
        let url = build_url("http://x/y?a=1", json!({"b": "2"}).into(), FormEncoding::Raw).unwrap();
        assert_eq!(url, "http://x/y?a=1&b=2");
    }

    #[test]
    fn no_segments_means_no_trailing_question_mark() {
        assert_eq!(build_url("http://x/y", ().into(), FormEncoding::Raw).unwrap(), "http://x/y");
        assert_eq!(build_url("http://x/y", "".into(), FormEncoding::Raw).unwrap(), "http://x/y");
    }

    #[test]
    fn text_payload_is_one_raw_segment() {
        let url = build_url("http://x/y?a=1", "year=2018&m=1".into(), FormEncoding::Raw).unwrap();
        assert_eq!(url, "http://x/y?a=1&year=2018&m=1");
    }

    #[test]
    fn non_string_values_are_json_serialized() {
        let url = build_url("http://x/y", json!({"n": 5, "t": true}).into(), FormEncoding::Raw)
            .unwrap();
        assert_eq!(url, "http://x/y?n=5&t=true");
    }

    #[test]
    fn percent_encoding_leaves_existing_pairs_alone() {
        let url = build_url(
            "http://x/y?raw=a%20b",
            json!({"q": "a b"}).into(),
            FormEncoding::Percent,
        )
        .unwrap();
        assert_eq!(url, "http://x/y?raw=a%20b&q=a+b");
    }

    #[test]
    fn unsupported_payload_shapes_fail() {
        let err = build_url("http://x/y", 5i32.into(), FormEncoding::Raw).unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedPayload(_)));
    }
}
