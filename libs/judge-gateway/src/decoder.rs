/// Response Decoder - base64 text fields to plain UTF-8
///
/// The judge is always called with `base64_encoded=true`, so every text field
/// travels encoded in both directions. Decoding is best-effort: a field that
/// is not valid base64 (or not valid UTF-8 once decoded) is returned exactly
/// as received. Nothing here can fail.

use crate::types::{SubmissionRequest, SubmissionResponse, WireSubmission};
use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

/// Decode a single output field, keeping `None` as `None`
pub fn decode_field(raw: Option<String>) -> Option<String> {
    let raw = raw?;

    // The judge wraps encoded output at 60 columns
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let decoded = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    match decoded {
        Some(text) => Some(text),
        None => {
            debug!(len = raw.len(), "Field is not valid base64 text, keeping raw value");
            Some(raw)
        }
    }
}

/// Decode `stdout`, `stderr` and `compile_output`; all other fields pass through
pub fn decode_response(mut response: SubmissionResponse) -> SubmissionResponse {
    response.stdout = decode_field(response.stdout.take());
    response.stderr = decode_field(response.stderr.take());
    response.compile_output = decode_field(response.compile_output.take());
    response
}

fn encode_field(plain: &str) -> String {
    general_purpose::STANDARD.encode(plain.as_bytes())
}

/// Encode the text fields of a request for the wire
pub fn encode_request(request: &SubmissionRequest) -> WireSubmission {
    WireSubmission {
        source_code: encode_field(&request.source_code),
        language_id: request.language_id,
        stdin: request.stdin.as_deref().map(encode_field),
        expected_output: request.expected_output.as_deref().map(encode_field),
        cpu_time_limit: request.cpu_time_limit,
        wall_time_limit: request.wall_time_limit,
        memory_limit: request.memory_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusId;

    #[test]
    fn test_null_fields_stay_null() {
        let response = SubmissionResponse::pending("t1", StatusId::Accepted);
        let decoded = decode_response(response);

        assert_eq!(decoded.stdout, None);
        assert_eq!(decoded.stderr, None);
        assert_eq!(decoded.compile_output, None);
    }

    #[test]
    fn test_valid_base64_decodes_to_text() {
        let mut response = SubmissionResponse::pending("t1", StatusId::Accepted);
        response.stdout = Some("aGVsbG8gd29ybGQK".to_string());
        response.stderr = Some(String::new());

        let decoded = decode_response(response);
        assert_eq!(decoded.stdout.as_deref(), Some("hello world\n"));
        // Empty output is still output
        assert_eq!(decoded.stderr.as_deref(), Some(""));
    }

    #[test]
    fn test_invalid_base64_is_returned_unchanged() {
        let raw = "not base64 at all!".to_string();
        assert_eq!(decode_field(Some(raw.clone())), Some(raw));
    }

    #[test]
    fn test_non_utf8_payload_is_returned_unchanged() {
        // 0xff 0xfe is valid base64 content but not UTF-8
        let raw = "//4=".to_string();
        assert_eq!(decode_field(Some(raw.clone())), Some(raw));
    }

    #[test]
    fn test_line_wrapped_base64_decodes() {
        let plain = "x".repeat(100);
        let encoded = general_purpose::STANDARD.encode(plain.as_bytes());
        let wrapped = format!("{}\n{}\n", &encoded[..60], &encoded[60..]);

        assert_eq!(decode_field(Some(wrapped)), Some(plain));
    }

    #[test]
    fn test_other_fields_pass_through() {
        let mut response = SubmissionResponse::pending("abc", StatusId::CompilationError);
        response.message = Some("RXhpdGVk".to_string());
        response.time = Some("0.01".to_string());
        response.compile_output = Some("ZXJyb3I=".to_string());

        let decoded = decode_response(response);
        assert_eq!(decoded.token.as_deref(), Some("abc"));
        assert_eq!(decoded.message.as_deref(), Some("RXhpdGVk"));
        assert_eq!(decoded.time.as_deref(), Some("0.01"));
        assert_eq!(decoded.compile_output.as_deref(), Some("error"));
        assert_eq!(decoded.status.id, StatusId::CompilationError);
    }

    #[test]
    fn test_encode_request_encodes_text_only() {
        let mut request = SubmissionRequest::new("print(input())", 71).with_stdin("hi");
        request.memory_limit = Some(128_000);

        let wire = encode_request(&request);
        assert_eq!(wire.source_code, "cHJpbnQoaW5wdXQoKSk=");
        assert_eq!(wire.stdin.as_deref(), Some("aGk="));
        assert_eq!(wire.expected_output, None);
        assert_eq!(wire.memory_limit, Some(128_000));
        assert_eq!(wire.language_id, 71);
    }
}
