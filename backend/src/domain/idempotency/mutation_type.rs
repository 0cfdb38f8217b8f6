//! Operation discriminators for idempotency records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operations protected by idempotency keys.
///
/// Keys are scoped per operation, so the same UUID may be reused across
/// different endpoints without collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// `POST /api/v1/jobs/{job_id}/promotion`
    Promotions,
    /// `POST /api/v1/wallet/top-ups`
    TopUps,
}

impl MutationType {
    /// Every variant.
    pub const ALL: [Self; 2] = [Self::Promotions, Self::TopUps];

    /// Database representation.
    ///
    /// ```
    /// # use gigzz_backend::domain::MutationType;
    /// assert_eq!(MutationType::Promotions.as_str(), "promotions");
    /// assert_eq!(MutationType::TopUps.as_str(), "top_ups");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Promotions => "promotions",
            Self::TopUps => "top_ups",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mutation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMutationTypeError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseMutationTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected: Vec<_> = MutationType::ALL.iter().map(|v| v.as_str()).collect();
        write!(
            f,
            "invalid mutation type '{}': expected one of {}",
            self.input,
            expected.join(", ")
        )
    }
}

impl std::error::Error for ParseMutationTypeError {}

impl FromStr for MutationType {
    type Err = ParseMutationTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| ParseMutationTypeError {
                input: s.to_owned(),
            })
    }
}
