use std::str::FromStr;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use siteline_types::{Role, UserId};

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the gateway.
pub const USER_HEADER: &str = "x-siteline-user";
/// Header carrying the authenticated role, set by the gateway.
pub const ROLE_HEADER: &str = "x-siteline-role";

/// The already-authenticated caller.
///
/// Authentication happens upstream (the API gateway verifies the token
/// and stamps these headers); the core trusts them and never re-checks
/// credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user: UserId,
    pub role: Role,
}

impl Identity {
    pub fn worker(user: UserId) -> Self {
        Self {
            user,
            role: Role::Worker,
        }
    }

    pub fn supervisor(user: UserId) -> Self {
        Self {
            user,
            role: Role::Supervisor,
        }
    }

    pub fn operator(user: UserId) -> Self {
        Self {
            user,
            role: Role::Operator,
        }
    }

    /// Guard for operator-only endpoints.
    pub fn require_operator(&self) -> Result<(), ApiError> {
        if self.role == Role::Operator {
            Ok(())
        } else {
            Err(ApiError::Forbidden("operator role required".into()))
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = header_value(parts, USER_HEADER)?;
        let role = header_value(parts, ROLE_HEADER)?;

        let user = UserId::from_str(user)
            .map_err(|e| ApiError::Unauthorized(format!("bad {USER_HEADER}: {e}")))?;
        let role = Role::from_str(role)
            .map_err(|e| ApiError::Unauthorized(format!("bad {ROLE_HEADER}: {e}")))?;
        Ok(Self { user, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("unreadable {name} header")))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<Identity, ApiError> {
        let (mut parts, ()) = request.into_parts();
        Identity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_identity_from_headers() {
        let user = UserId::new();
        let request = Request::builder()
            .header(USER_HEADER, user.to_string())
            .header(ROLE_HEADER, "supervisor")
            .body(())
            .unwrap();

        let identity = extract(request).await.unwrap();
        assert_eq!(identity, Identity::supervisor(user));
    }

    #[tokio::test]
    async fn missing_headers_are_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(request).await.unwrap_err(),
            ApiError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn bad_role_is_unauthorized() {
        let request = Request::builder()
            .header(USER_HEADER, UserId::new().to_string())
            .header(ROLE_HEADER, "intern")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(request).await.unwrap_err(),
            ApiError::Unauthorized(_)
        ));
    }

    #[test]
    fn operator_guard() {
        let operator = Identity::operator(UserId::new());
        operator.require_operator().unwrap();

        let worker = Identity::worker(UserId::new());
        assert!(worker.require_operator().is_err());
    }
}
