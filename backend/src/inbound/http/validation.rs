//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper produces an `invalid_request` error whose `details` carry the
//! offending `field`, a machine-readable `code` and, where useful, the
//! rejected `value`.

use serde_json::json;
use uuid::Uuid;

use crate::domain::{Error, JobId, MAX_TOKEN_AMOUNT, PaymentReference, PromotionTier, TokenAmount};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTier,
    InvalidAmount,
    InvalidPaymentReference,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTier => "invalid_tier",
            ErrorCode::InvalidAmount => "invalid_amount",
            ErrorCode::InvalidPaymentReference => "invalid_payment_reference",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn parse_job_id(value: &str, field: FieldName) -> Result<JobId, Error> {
    parse_uuid(value, field).map(JobId::from_uuid)
}

/// Parse a tier name, ignoring ASCII case.
pub(crate) fn parse_tier(value: &str, field: FieldName) -> Result<PromotionTier, Error> {
    value.parse::<PromotionTier>().map_err(|err| {
        ValidationError::new(field.as_str(), err.to_string())
            .with_value(ErrorCode::InvalidTier, value)
    })
}

/// Parse a credit amount; negative and oversized inputs are reported as-is.
pub(crate) fn parse_token_amount(value: i64, field: FieldName) -> Result<TokenAmount, Error> {
    let field = field.as_str();
    let invalid = || {
        ValidationError::new(
            field,
            format!("{field} must be between 1 and {MAX_TOKEN_AMOUNT}"),
        )
        .with_value(ErrorCode::InvalidAmount, value.to_string())
    };
    let raw = u32::try_from(value).map_err(|_| invalid())?;
    TokenAmount::new(raw).map_err(|_| invalid())
}

pub(crate) fn parse_payment_reference(
    value: String,
    field: FieldName,
) -> Result<PaymentReference, Error> {
    PaymentReference::new(value.clone()).map_err(|err| {
        ValidationError::new(field.as_str(), err.to_string())
            .with_value(ErrorCode::InvalidPaymentReference, value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode as DomainErrorCode;
    use rstest::rstest;

    const TIER: FieldName = FieldName::new("tier");
    const AMOUNT: FieldName = FieldName::new("amount");

    fn detail<'a>(error: &'a Error, key: &str) -> Option<&'a str> {
        error
            .details()
            .and_then(|details| details.get(key))
            .and_then(|value| value.as_str())
    }

    #[rstest]
    fn missing_field_reports_field_and_code() {
        let error = missing_field_error(TIER);
        assert_eq!(error.code(), DomainErrorCode::InvalidRequest);
        assert_eq!(detail(&error, "field"), Some("tier"));
        assert_eq!(detail(&error, "code"), Some("missing_field"));
    }

    #[rstest]
    fn invalid_job_id_echoes_value() {
        let error = parse_job_id("not-a-uuid", FieldName::new("jobId")).expect_err("invalid");
        assert_eq!(detail(&error, "code"), Some("invalid_uuid"));
        assert_eq!(detail(&error, "value"), Some("not-a-uuid"));
    }

    #[rstest]
    #[case("gold", PromotionTier::Gold)]
    #[case("Premium", PromotionTier::Premium)]
    #[case("SILVER", PromotionTier::Silver)]
    fn tier_names_ignore_case(#[case] raw: &str, #[case] expected: PromotionTier) {
        assert_eq!(parse_tier(raw, TIER).expect("valid tier"), expected);
    }

    #[rstest]
    fn unknown_tier_is_rejected() {
        let error = parse_tier("bronze", TIER).expect_err("unknown tier");
        assert_eq!(detail(&error, "code"), Some("invalid_tier"));
        assert_eq!(detail(&error, "value"), Some("bronze"));
    }

    #[rstest]
    #[case(0)]
    #[case(-5)]
    #[case(i64::from(MAX_TOKEN_AMOUNT) + 1)]
    fn out_of_range_amounts_are_rejected(#[case] raw: i64) {
        let error = parse_token_amount(raw, AMOUNT).expect_err("out of range");
        assert_eq!(detail(&error, "code"), Some("invalid_amount"));
        assert_eq!(detail(&error, "value"), Some(raw.to_string().as_str()));
    }

    #[rstest]
    fn payment_reference_with_spaces_is_rejected() {
        let error = parse_payment_reference("has space".to_owned(), FieldName::new("ref"))
            .expect_err("invalid reference");
        assert_eq!(detail(&error, "code"), Some("invalid_payment_reference"));
    }
}
