use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use retouch_common::{AppError, UserRole};

use crate::jwt::{Claims, JwtService};

/// The authenticated identity behind a request. Handlers take it as an
/// argument and pass it down to every service call that needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Caller {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff access required".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Admin access required".to_string()))
        }
    }
}

/// What the users table says about the caller right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStanding {
    pub is_blocked: bool,
    pub role: UserRole,
}

impl Caller {
    /// Checks a token's identity against the stored account. A missing account
    /// or a role that changed since the token was issued forces a new login.
    pub fn check_standing(&self, standing: Option<AccountStanding>) -> Result<(), AppError> {
        let standing =
            standing.ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;

        if standing.is_blocked {
            return Err(AppError::Authorization("Your account has been blocked".to_string()));
        }
        if standing.role != self.role {
            return Err(AppError::Authentication("Your role has changed, please log in again".to_string()));
        }
        Ok(())
    }
}

impl From<&Claims> for Caller {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}

/// Admin-only variant of [`Caller`].
#[derive(Debug, Clone, Copy)]
pub struct AdminCaller(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
    JwtService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;

        JwtService::from_ref(state).validate_token(token)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    JwtService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        Ok(Caller::from(&claims))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminCaller
where
    S: Send + Sync,
    JwtService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        caller.require_admin()?;
        Ok(AdminCaller(caller))
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};
    use retouch_common::JwtConfig;

    fn jwt() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: "middleware-secret".to_string(),
            expiration_hours: 1,
            issuer: "retouch".to_string(),
        })
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/chats");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_token_from_headers(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token_from_headers(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token_from_headers(&headers), None);
    }

    #[tokio::test]
    async fn test_caller_from_valid_token() {
        let jwt = jwt();
        let user_id = Uuid::new_v4();
        let (token, _) = jwt.issue(user_id, "agent@retouch.app", UserRole::Support).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let caller = Caller::from_request_parts(&mut parts, &jwt).await.unwrap();

        assert_eq!(caller.user_id, user_id);
        assert!(caller.is_staff());
        assert!(caller.require_admin().is_err());
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let jwt = jwt();
        let mut parts = parts_with(None);

        let err = Caller::from_request_parts(&mut parts, &jwt).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn test_standing_follows_the_stored_account() {
        let admin = Caller { user_id: Uuid::new_v4(), role: UserRole::Admin };
        let active = AccountStanding { is_blocked: false, role: UserRole::Admin };

        assert!(admin.check_standing(Some(active)).is_ok());
        assert!(matches!(admin.check_standing(None), Err(AppError::Authentication(_))));
        assert!(matches!(
            admin.check_standing(Some(AccountStanding { is_blocked: true, ..active })),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            admin.check_standing(Some(AccountStanding { role: UserRole::User, ..active })),
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_caller_requires_admin_role() {
        let jwt = jwt();
        let (token, _) = jwt.issue(Uuid::new_v4(), "user@retouch.app", UserRole::User).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let err = AdminCaller::from_request_parts(&mut parts, &jwt).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }
}
