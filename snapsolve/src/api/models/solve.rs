use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response envelope for the upload pipeline.
///
/// Invariant: `success: false` carries only `error`; `success: true`
/// carries both `extracted_text` and `solution`. A `solution` of the form
/// `"Could not solve: ..."` is still a successful request - OCR output is
/// frequently not valid math, and that outcome is data, not an error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SolveResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw OCR output, untrimmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Simplified expression, or a "Could not solve: ..." message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl SolveResponse {
    pub fn solved(extracted_text: String, solution: String) -> Self {
        Self {
            success: true,
            error: None,
            extracted_text: Some(extracted_text),
            solution: Some(solution),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            extracted_text: None,
            solution: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_responses_omit_the_error_field() {
        let response = SolveResponse::solved("2 + 2\n".to_string(), "4".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["extracted_text"], "2 + 2\n");
        assert_eq!(json["solution"], "4");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_responses_carry_only_the_error() {
        let response = SolveResponse::failure("No image uploaded.");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No image uploaded.");
        assert!(json.get("extracted_text").is_none());
        assert!(json.get("solution").is_none());
    }
}
