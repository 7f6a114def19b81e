use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    app::{AppState, ServiceError, ServiceResult},
    store::PlayerId,
};

pub const SESSION_COOKIE: &str = "party_bank_session";

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "player_id", rename_all = "snake_case")]
pub enum Role {
    Guest,
    Player(PlayerId),
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
}

/// A notice shown once on the next rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    role: Role,
    flash: Option<Flash>,
    exp: usize,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    fn encode(&self, session: &Session) -> ServiceResult<String> {
        let claims = Claims {
            role: session.role,
            flash: session.flash.clone(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(SESSION_TTL_HOURS)).timestamp()
                as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(format!("failed to sign session: {}", e)))
    }

    fn decode(&self, token: &str) -> Option<Session> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).ok()?;
        Some(Session {
            role: data.claims.role,
            flash: data.claims.flash,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    pub flash: Option<Flash>,
}

impl Session {
    pub fn guest() -> Self {
        Self {
            role: Role::Guest,
            flash: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn success(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(Flash {
            level: FlashLevel::Success,
            message: message.into(),
        });
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(Flash {
            level: FlashLevel::Error,
            message: message.into(),
        });
        self
    }

    pub fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }

    /// 303 to `to`, storing the session (and any pending flash) in the cookie.
    pub fn redirect(&self, keys: &SessionKeys, to: &str) -> Response {
        self.respond(keys, Redirect::to(to))
    }

    pub fn render(&self, keys: &SessionKeys, page: String) -> Response {
        self.respond(keys, Html(page))
    }

    fn respond(&self, keys: &SessionKeys, body: impl IntoResponse) -> Response {
        let cookie = match keys.encode(self) {
            Ok(token) => session_cookie(&token),
            Err(e) => return e.into_response(),
        };
        let mut response = body.into_response();
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
                response
            }
            Err(e) => ServiceError::Internal(format!("invalid session cookie: {}", e))
                .into_response(),
        }
    }
}

fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        SESSION_TTL_HOURS * 60 * 60
    )
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Missing, expired and tampered cookies all fall back to a guest.
        let session = session_token(&parts.headers)
            .and_then(|token| app.session_keys.decode(token))
            .unwrap_or_else(Session::guest);
        Ok(session)
    }
}

/// Only extractable by an admin session; anyone else is sent to the admin login.
pub struct AdminSession(pub Session);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(session) = Session::from_request_parts(parts, app).await;
        match session.role {
            Role::Admin => Ok(AdminSession(session)),
            _ => Err(Redirect::to("/admin/login")),
        }
    }
}

/// Only extractable by a logged-in player; anyone else is sent to the player login.
pub struct PlayerSession {
    pub session: Session,
    pub player_id: PlayerId,
}

impl FromRequestParts<AppState> for PlayerSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(session) = Session::from_request_parts(parts, app).await;
        match session.role {
            Role::Player(player_id) => Ok(PlayerSession { session, player_id }),
            _ => Err(Redirect::to("/player/login")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let keys = SessionKeys::new(b"secret");
        let session = Session::guest()
            .with_role(Role::Player(PlayerId::new(3)))
            .error("Wrong credentials");
        let token = keys.encode(&session).unwrap();
        assert_eq!(keys.decode(&token), Some(session));
    }

    #[test]
    fn test_foreign_or_garbage_tokens_are_rejected() {
        let keys = SessionKeys::new(b"secret");
        let other = SessionKeys::new(b"other secret");
        let token = other.encode(&Session::guest().with_role(Role::Admin)).unwrap();
        assert_eq!(keys.decode(&token), None);
        assert_eq!(keys.decode("not a token"), None);
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; party_bank_session=abc.def"));
        assert_eq!(session_token(&headers), Some("abc.def"));

        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_take_flash_clears_it() {
        let mut session = Session::guest().success("Logged out");
        assert_eq!(
            session.take_flash().map(|f| f.level),
            Some(FlashLevel::Success)
        );
        assert_eq!(session.take_flash(), None);
    }
}
