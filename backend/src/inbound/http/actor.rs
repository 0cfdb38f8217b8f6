//! Acting-user extraction.
//!
//! The identity gateway in front of the service authenticates callers and
//! forwards the verified user id in the `X-User-Id` header. Handlers take an
//! [`ActingUser`] argument instead of reading headers themselves.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};
use tracing::debug;

use crate::domain::{Error, UserId};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The user on whose behalf a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(UserId);

impl ActingUser {
    /// Identifier of the acting user.
    pub fn id(&self) -> UserId {
        self.0
    }

    fn from_headers(req: &HttpRequest) -> Result<Self, Error> {
        let raw = req
            .headers()
            .get(USER_ID_HEADER)
            .ok_or_else(|| Error::unauthorized("missing X-User-Id header"))?;
        let raw = raw
            .to_str()
            .map_err(|_| Error::unauthorized("X-User-Id header must be a valid UUID"))?;
        UserId::new(raw).map(Self).map_err(|err| {
            debug!(error = %err, "rejected malformed acting user header");
            Error::unauthorized("X-User-Id header must be a valid UUID")
        })
    }
}

impl FromRequest for ActingUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req))
    }
}
