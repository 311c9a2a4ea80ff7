use anyhow::anyhow;
use reqwest::StatusCode;

/// Failure raised while constructing a typed record from a JSON document.
///
/// Construction is atomic: the first failing field aborts the whole record,
/// and the error names the path of the offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Wrong discriminant literal, missing required field, or a field with
    /// the wrong primitive type.
    #[error("{path}: expected {expected}, got {got}")]
    Structural {
        path: String,
        expected: String,
        got: String,
    },

    /// Value outside a closed set, e.g. an unknown review `status`.
    #[error("{path}: {value:?} is not one of {allowed:?}")]
    EnumConstraint {
        path: String,
        value: String,
        allowed: &'static [&'static str],
    },

    /// A product content object that cannot be identified as exactly one of
    /// the inline-bytes or remote-url variants.
    #[error("{path}: {detail}")]
    ContentDiscrimination { path: String, detail: String },
}

/// Translates an FDSN event-service error response into an actionable error.
///
/// The service answers with plain-text bodies (not JSON): a leading
/// `Error NNN: ...` line, a description paragraph, then usage boilerplate.
pub(crate) fn format_fdsn_error(status: StatusCode, url: &str, body: &str) -> anyhow::Error {
    // The service reports an empty result set as a status code, per the FDSN
    // convention: 204 by default, 404 when the query carries `nodata=404`.
    if status == StatusCode::NO_CONTENT
        || (status == StatusCode::NOT_FOUND && body.to_lowercase().contains("no data"))
    {
        return anyhow!(
            "no events matched the query (HTTP {}).\n- Widen starttime/endtime or relax minmagnitude\n- Pass nodata=404 if you prefer a 404 over an empty 204\nrequest: {}",
            status.as_u16(),
            url
        );
    }

    // Everything before the usage boilerplate is the actual server message.
    let message = body
        .lines()
        .take_while(|line| !line.trim_start().starts_with("Usage details"))
        .collect::<Vec<_>>()
        .join("\n");
    let message = message.trim();

    if status == StatusCode::BAD_REQUEST {
        return anyhow!(
            "the event service rejected the query (HTTP 400).\n- Check parameter names and value formats (times are ISO8601, e.g. 2024-03-01)\n\nServer message: {}\nrequest: {}",
            if message.is_empty() { "(none)" } else { message },
            url
        );
    }

    if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::TOO_MANY_REQUESTS {
        return anyhow!(
            "the event service is overloaded or throttling (HTTP {}).\n- Reduce the query window or result size (limit/offset)\n- Wait and retry\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            if message.is_empty() { "(none)" } else { message },
            url
        );
    }

    anyhow!(
        "API request failed: HTTP {} for url ({})\n{}",
        status.as_u16(),
        url,
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_content_means_no_events() {
        let err = format_fdsn_error(StatusCode::NO_CONTENT, "http://example/query", "");
        assert!(err.to_string().contains("no events matched"));
    }

    #[test]
    fn nodata_404_means_no_events() {
        let err = format_fdsn_error(
            StatusCode::NOT_FOUND,
            "http://example/query",
            "Error 404: Not Found\n\nNo data available for your query.",
        );
        assert!(err.to_string().contains("no events matched"));
    }

    #[test]
    fn bad_request_echoes_server_message() {
        let body = "Error 400: Bad Request\n\nBad starttime value \"yesterday\".\n\nUsage details are available from https://earthquake.usgs.gov/fdsnws/event/1/\n\nRequest:\n/fdsnws/event/1/query";
        let err = format_fdsn_error(StatusCode::BAD_REQUEST, "http://example/query", body);
        let text = err.to_string();
        assert!(text.contains("Bad starttime value"));
        assert!(!text.contains("Usage details"));
    }

    #[test]
    fn validation_error_display_names_the_path() {
        let err = ValidationError::Structural {
            path: "features[0].properties.sig".to_string(),
            expected: "integer".to_string(),
            got: "string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "features[0].properties.sig: expected integer, got string"
        );
    }
}
