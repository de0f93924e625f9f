use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::marker::PhantomData;
use std::sync::Arc;

use super::api::error::ErrorResponse;
use crate::config::{Config, Permission};
use crate::scan::{ScanHandle, StatusBoard};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: ScanHandle,
    pub status: StatusBoard,
}

/// Ties a route to the permission its API key must carry.
pub trait Grant {
    const PERMISSION: Permission;
}

/// Routes that move the gimbal or change engine state.
pub struct Control;

/// Read-only routes.
pub struct View;

impl Grant for Control {
    const PERMISSION: Permission = Permission::ControlScan;
}

impl Grant for View {
    const PERMISSION: Permission = Permission::ViewScan;
}

/// Caller whose API key holds `G`'s permission. Extraction fails otherwise,
/// so a handler taking an `Operator<Control>` never runs for a viewer.
pub struct Operator<G> {
    pub name: String,
    grant: PhantomData<fn() -> G>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingKey,
    MalformedHeader,
    UnknownKey,
    Forbidden(Permission),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::MissingKey => (StatusCode::UNAUTHORIZED, ErrorResponse::new("missing_api_key")),
            AuthError::MalformedHeader => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::with_message("malformed_authorization", "expected 'Bearer <key>'"),
            ),
            AuthError::UnknownKey => (StatusCode::UNAUTHORIZED, ErrorResponse::new("unknown_api_key")),
            AuthError::Forbidden(needed) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::with_message("forbidden", &format!("requires {}", needed)),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn bearer_key(parts: &Parts) -> Result<&str, AuthError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingKey)?
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MalformedHeader)
}

impl<G: Grant> FromRequestParts<AppState> for Operator<G> {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = bearer_key(parts)?;
        let api_key = state
            .config
            .find_api_key(key)
            .ok_or(AuthError::UnknownKey)?;

        if !api_key.permissions.contains(&G::PERMISSION) {
            log::warn!(
                "{} denied {} {}: needs {}",
                api_key.name,
                parts.method,
                parts.uri.path(),
                G::PERMISSION
            );
            return Err(AuthError::Forbidden(G::PERMISSION));
        }

        Ok(Operator {
            name: api_key.name.clone(),
            grant: PhantomData,
        })
    }
}

#[cfg(test)]
impl AppState {
    /// State with a control key `ctl`, a view-only key `eye` and no engine.
    pub(crate) fn detached() -> (Self, crossbeam::channel::Receiver<crate::scan::ScanCommand>) {
        let config = Config::from_str(
            r#"
sensor:
  kind: replay
  path: samples.json
api_keys:
  - key: ctl
    name: operator
    permissions: [control_scan, view_scan]
  - key: eye
    name: viewer
    permissions: [view_scan]
"#,
        )
        .unwrap();
        let (engine, commands) = ScanHandle::detached();
        let state = AppState {
            config: Arc::new(config),
            engine,
            status: StatusBoard::new(),
        };
        (state, commands)
    }
}

#[cfg(test)]
impl<G> Operator<G> {
    pub(crate) fn named(name: &str) -> Self {
        Operator {
            name: name.to_string(),
            grant: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().method("POST").uri("/api/scan/full");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_key_is_unauthorized() {
        let (state, _commands) = AppState::detached();
        let rejection = Operator::<Control>::from_request_parts(&mut parts(None), &state)
            .await
            .err();
        assert_eq!(rejection, Some(AuthError::MissingKey));
        assert_eq!(
            AuthError::MissingKey.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn non_bearer_header_is_malformed() {
        let (state, _commands) = AppState::detached();
        let rejection = Operator::<View>::from_request_parts(&mut parts(Some("Basic ctl")), &state)
            .await
            .err();
        assert_eq!(rejection, Some(AuthError::MalformedHeader));
    }

    #[tokio::test]
    async fn unknown_key_is_unauthorized() {
        let (state, _commands) = AppState::detached();
        let rejection =
            Operator::<View>::from_request_parts(&mut parts(Some("Bearer nope")), &state)
                .await
                .err();
        assert_eq!(rejection, Some(AuthError::UnknownKey));
    }

    #[tokio::test]
    async fn view_key_cannot_control() {
        let (state, _commands) = AppState::detached();
        let rejection =
            Operator::<Control>::from_request_parts(&mut parts(Some("Bearer eye")), &state)
                .await
                .err();
        assert_eq!(rejection, Some(AuthError::Forbidden(Permission::ControlScan)));
        assert_eq!(
            AuthError::Forbidden(Permission::ControlScan)
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );

        let viewer = Operator::<View>::from_request_parts(&mut parts(Some("Bearer eye")), &state)
            .await
            .map(|op| op.name);
        assert_eq!(viewer, Ok("viewer".to_string()));
    }

    #[tokio::test]
    async fn control_key_is_accepted() {
        let (state, _commands) = AppState::detached();
        let operator =
            Operator::<Control>::from_request_parts(&mut parts(Some("Bearer ctl")), &state)
                .await
                .map(|op| op.name);
        assert_eq!(operator, Ok("operator".to_string()));
    }
}
