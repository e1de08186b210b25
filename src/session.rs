//! Cookie sessions.
//!
//! # Responsibilities
//! - Define the storage seam (`SessionProvider`); no backend ships here
//! - Load the session named by the request cookie into the data bag
//! - Start and end sessions from handlers, issuing or expiring the cookie
//!
//! # Design Decisions
//! - The cookie is looked up by name, other cookies are ignored
//! - An empty stored session counts as absent

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use thiserror::Error;

use crate::error::HttpError;
use crate::http::stack::Middleware;
use crate::http::{Context, SESSION_KEY, SID_KEY};

pub type SessionValues = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(String),

    #[error("invalid session id: {0:?}")]
    InvalidId(String),
}

impl From<SessionError> for HttpError {
    fn from(err: SessionError) -> Self {
        HttpError::server(err.to_string())
    }
}

/// Session storage.
pub trait SessionProvider: Send + Sync + 'static {
    /// Stored values for `sid`; empty when unknown or expired.
    fn get(&self, sid: &str) -> Result<SessionValues, SessionError>;

    fn set(&self, sid: &str, values: &SessionValues) -> Result<(), SessionError>;

    fn destroy(&self, sid: &str) -> Result<(), SessionError>;

    /// Push the expiry of `sid` forward by the configured lifetime.
    fn refresh_expiry(&self, sid: &str) -> Result<(), SessionError>;
}

/// A loaded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    sid: String,
    values: SessionValues,
}

impl Session {
    pub fn new(sid: impl Into<String>, values: SessionValues) -> Self {
        Self {
            sid: sid.into(),
            values,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &SessionValues {
        &self.values
    }
}

/// Attributes of the session cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub max_age: Duration,
    pub http_only: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "sid".to_string(),
            path: "/".to_string(),
            max_age: Duration::from_secs(30 * 60),
            http_only: true,
        }
    }
}

impl CookieSettings {
    /// `Set-Cookie` value carrying `sid`.
    pub fn issue(&self, sid: &str) -> Option<HeaderValue> {
        self.render(sid, self.max_age.as_secs() as i64)
    }

    /// `Set-Cookie` value telling the client to drop the cookie.
    pub fn expire(&self) -> Option<HeaderValue> {
        self.render("", -1)
    }

    fn render(&self, value: &str, max_age: i64) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name,
            value,
            self.path,
            max_age.max(0)
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        HeaderValue::from_str(&cookie).ok()
    }

    /// Value of this cookie in the request `Cookie` headers.
    pub fn find<'h>(&self, headers: &'h axum::http::HeaderMap) -> Option<&'h str> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value)
    }
}

/// Middleware loading the session named by the request cookie.
pub struct SessionLoader<P> {
    provider: Arc<P>,
    cookie: CookieSettings,
}

impl<P: SessionProvider> SessionLoader<P> {
    pub fn new(provider: Arc<P>, cookie: CookieSettings) -> Self {
        Self { provider, cookie }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Create a session for `values`, store it and issue the cookie.
    pub fn start(&self, ctx: &mut Context, values: SessionValues) -> Result<Session, SessionError> {
        let sid = uuid::Uuid::new_v4().simple().to_string();
        self.provider.set(&sid, &values)?;
        let session = Session::new(sid.clone(), values);
        self.set_cookie(ctx, self.cookie.issue(&sid));
        ctx.insert_data(SESSION_KEY, session.clone());
        ctx.insert_data(SID_KEY, sid);
        Ok(session)
    }

    /// Destroy the current session, if any, and expire the cookie.
    pub fn end(&self, ctx: &mut Context) -> Result<(), SessionError> {
        if let Some(sid) = ctx.data::<String>(SID_KEY).cloned() {
            self.provider.destroy(&sid)?;
        }
        ctx.remove_data(SESSION_KEY);
        ctx.remove_data(SID_KEY);
        self.set_cookie(ctx, self.cookie.expire());
        Ok(())
    }

    fn load(&self, sid: &str) -> Result<Option<Session>, SessionError> {
        let values = self.provider.get(sid)?;
        if values.is_empty() {
            return Ok(None);
        }
        self.provider.refresh_expiry(sid)?;
        Ok(Some(Session::new(sid, values)))
    }

    fn set_cookie(&self, ctx: &mut Context, value: Option<HeaderValue>) {
        match (value, ctx.writer_mut().headers_mut()) {
            (Some(value), Some(headers)) => {
                headers.insert(header::SET_COOKIE, value);
            }
            (None, _) => tracing::warn!(cookie = %self.cookie.name, "Unrepresentable session cookie"),
            (_, None) => {}
        }
    }
}

impl<P: SessionProvider> Middleware for SessionLoader<P> {
    fn handle(&self, ctx: &mut Context) {
        let Some(sid) = self.cookie.find(ctx.headers()).map(str::to_string) else {
            ctx.next();
            return;
        };

        match self.load(&sid) {
            Ok(Some(session)) => {
                self.set_cookie(ctx, self.cookie.issue(&sid));
                ctx.insert_data(SESSION_KEY, session);
                ctx.insert_data(SID_KEY, sid);
            }
            Ok(None) => {
                tracing::debug!("Session cookie without stored session");
            }
            Err(e) => {
                ctx.fail(&HttpError::from(e));
                return;
            }
        }
        ctx.next();
    }
}
