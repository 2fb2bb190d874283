//! Request extractors.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{HeaderMap, HeaderValue};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use campus_ledger_types::validation::ValidationError;
use campus_ledger_types::{DeviceMeta, StudentId};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Header carrying the authenticated student, set by the front door.
pub const STUDENT_ID_HEADER: &str = "x-student-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";

/// Boundary validation for request bodies.
pub trait Validate {
    /// Returns every field that fails its constraint.
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

/// JSON body that is deserialized and then validated.
///
/// Malformed JSON and validation failures both become a 400 with the
/// per-field `errors` list.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate().map_err(ApiError::invalid)?;
        Ok(Self(value))
    }
}

/// The calling student, from the `x-student-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentIdentity(pub StudentId);

impl<S: Send + Sync> FromRequestParts<S> for StudentIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(STUDENT_ID_HEADER) else {
            return Err(ApiError::Unauthenticated {
                message: format!("Missing {STUDENT_ID_HEADER} header"),
            });
        };
        parse_student_id(value).map(Self).ok_or_else(|| ApiError::Unauthenticated {
            message: format!("Malformed {STUDENT_ID_HEADER} header"),
        })
    }
}

fn parse_student_id(value: &HeaderValue) -> Option<StudentId> {
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|id| *id > 0)
        .map(StudentId::new)
}

/// Client metadata from `User-Agent` and the proxy address headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDevice(pub DeviceMeta);

impl ClientDevice {
    /// Reads the user agent and the originating client address.
    ///
    /// The first `X-Forwarded-For` entry wins; `X-Real-IP` is the fallback.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = header_str(headers, FORWARDED_FOR_HEADER)
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .or_else(|| header_str(headers, REAL_IP_HEADER).filter(|ip| !ip.is_empty()))
            .map(str::to_owned);

        let user_agent = header_str(headers, USER_AGENT.as_str()).map(str::to_owned);
        Self(DeviceMeta { user_agent, ip_address })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

impl<S: Send + Sync> FromRequestParts<S> for ClientDevice {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let device = ClientDevice::from_headers(&headers(&[
            ("user-agent", "Mozilla/5.0"),
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]));
        assert_eq!(device.0.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(device.0.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_real_ip_fallback() {
        let device = ClientDevice::from_headers(&headers(&[("x-real-ip", "10.0.0.2")]));
        assert_eq!(device.0.ip_address.as_deref(), Some("10.0.0.2"));
        assert!(device.0.user_agent.is_none());
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(ClientDevice::from_headers(&HeaderMap::new()), ClientDevice::default());
    }

    #[test]
    fn test_student_id_rejects_zero_and_garbage() {
        for raw in ["0", "-1", "abc", "", "1.5"] {
            assert!(parse_student_id(&HeaderValue::from_static(raw)).is_none(), "{raw}");
        }
        assert_eq!(
            parse_student_id(&HeaderValue::from_static(" 42 ")),
            Some(StudentId::new(42))
        );
    }

    proptest! {
        #[test]
        fn prop_positive_ids_parse(id in 1u64..) {
            let value = HeaderValue::from_str(&id.to_string()).unwrap();
            prop_assert_eq!(parse_student_id(&value), Some(StudentId::new(id)));
        }
    }
}
