//! Deterministic stand-in for the security provider
//!
//! With canned responses enabled a session never touches the provider or its
//! handles. The two fixed outcomes let callers check that they surface
//! driver-reported errors even when a flow "succeeds".

use super::StepResult;
use crate::error::SecurityStatus;
use crate::token::Token;

/// Length of the canned token returned for an empty input
pub const CANNED_TOKEN_LEN: usize = 25;

pub const CANNED_WITHOUT_INPUT_MESSAGE: &str = "Canned Response without input data.";
pub const CANNED_WITH_INPUT_MESSAGE: &str = "Canned Response with input data.";

/// Produce the canned step result for `input`
pub fn respond(input: &[u8]) -> StepResult {
    if input.is_empty() {
        let bytes: Vec<u8> = (0..CANNED_TOKEN_LEN as u8).collect();
        StepResult {
            token: Token::from(bytes),
            done: true,
            status: SecurityStatus::InternalError.code(),
            error_message: CANNED_WITHOUT_INPUT_MESSAGE.to_string(),
        }
    } else {
        StepResult {
            token: Token::from(input.to_vec()),
            done: false,
            status: SecurityStatus::TargetUnknown.code(),
            error_message: CANNED_WITH_INPUT_MESSAGE.to_string(),
        }
    }
}
