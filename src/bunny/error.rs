use thiserror::Error;

/// Failures talking to the destination video library.
///
/// Covers collection lookup and creation as well as the two-step upload.
/// None of these are retried: a blind retry of video registration would leave
/// orphaned entries in the library.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{op} request failed: {source}")]
    Http {
        op: &'static str,
        source: reqwest::Error,
    },

    #[error("{op} returned HTTP {status}: {body}")]
    HttpStatus {
        op: &'static str,
        status: u16,
        body: String,
    },

    #[error("{op} returned malformed JSON: {source}")]
    Decode {
        op: &'static str,
        source: serde_json::Error,
    },

    #[error("{op} response is missing '{field}'")]
    MissingField {
        op: &'static str,
        field: &'static str,
    },

    #[error("Upload rejected (statusCode={status_code:?}): {message}")]
    Rejected {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Cannot read upload source: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_includes_body_status() {
        let e = UploadError::Rejected {
            status_code: Some(400),
            message: "Invalid file".into(),
        };
        assert_eq!(
            e.to_string(),
            "Upload rejected (statusCode=Some(400)): Invalid file"
        );
    }

    #[test]
    fn test_missing_field_names_operation() {
        let e = UploadError::MissingField {
            op: "create video",
            field: "guid",
        };
        assert_eq!(e.to_string(), "create video response is missing 'guid'");
    }
}
