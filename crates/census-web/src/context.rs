//! Per-request context handed to route handlers and templates.
//!
//! A [`RequestContext`] is created fresh for every request from the
//! immutable [`RequestFacts`] (what the client sent) and then passed by
//! value through the pipeline stages in [`crate::pipeline`]. Handlers
//! receive the finished value through the [`Ctx`] extractor.

use std::collections::BTreeMap;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri, header};
use census_types::User;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::cookies;
use crate::error::WebError;
use crate::locale;
use crate::session::{FlashQueues, SessionSnapshot};

/// Facts about the incoming request, gathered once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFacts {
    /// `http` or `https` (honours `X-Forwarded-Proto`).
    pub scheme: String,
    /// `Host` header value.
    pub host: String,
    /// Request path.
    pub path: String,
    /// Decoded query parameters.
    pub query: BTreeMap<String, String>,
    /// Request cookies.
    pub cookies: BTreeMap<String, String>,
    /// Raw `Accept-Language` header.
    pub accept_language: Option<String>,
    /// Session loaded by the session layer, in census mode.
    pub session: Option<SessionSnapshot>,
}

impl RequestFacts {
    /// Gather facts from request parts.
    pub fn from_parts(headers: &HeaderMap, uri: &Uri, session: Option<SessionSnapshot>) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        let scheme = header_str("x-forwarded-proto")
            .or_else(|| uri.scheme_str().map(str::to_owned))
            .unwrap_or_else(|| String::from("http"));
        let host = header_str(header::HOST.as_str())
            .or_else(|| uri.authority().map(|a| a.as_str().to_owned()))
            .unwrap_or_default();

        Self {
            scheme,
            host,
            path: uri.path().to_owned(),
            query: Query::<BTreeMap<String, String>>::try_from_uri(uri)
                .map(|Query(query)| query)
                .unwrap_or_default(),
            cookies: cookies::parse(headers),
            accept_language: header_str(header::ACCEPT_LANGUAGE.as_str()),
            session,
        }
    }

    /// `scheme://host`.
    pub fn current_domain(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// `scheme://host/path`.
    pub fn current_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.path)
    }
}

/// The session as templates see it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// Session id; `None` for the synthetic readonly session.
    pub id: Option<Uuid>,
    /// Whether a user is logged in through the session.
    pub logged_in: bool,
}

/// Values exposed to every template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateGlobals {
    /// Site name.
    pub sitename: String,
    /// Short site name.
    pub sitename_short: String,
    /// Extra stylesheet URL.
    pub custom_css: Option<String>,
    /// Analytics property key.
    pub google_analytics_key: Option<String>,
    /// Footer HTML.
    pub custom_footer: String,
    /// Navbar logo HTML.
    pub navbar_logo: String,
    /// Banner text.
    pub banner_text: String,
    /// Absolute URL of this page.
    pub current_url: String,
    /// Absolute URL of the site root.
    pub current_domain: String,
    /// Post-submission message.
    pub post_submission_info: Option<String>,
    /// Share template for submissions.
    pub share_submission_template: String,
    /// Share template for pages.
    pub share_page_template: String,
    /// Whether a contribute page is configured.
    pub has_contribute_page: bool,
    /// Supported locales.
    pub locales: Vec<String>,
    /// Locale of this response.
    pub current_locale: String,
    /// Query parameters of this request.
    pub url_query: BTreeMap<String, String>,
    /// Pending error messages.
    pub error_messages: Vec<String>,
    /// Pending info messages.
    pub info_messages: Vec<String>,
}

/// Derived per-request state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    /// Authenticated user.
    pub current_user: Option<User>,
    /// Resolved locale.
    pub locale: String,
    /// Readonly deployment.
    pub readonly: bool,
    /// Session as seen by templates.
    pub session: SessionView,
    /// Flash messages not yet moved into the template globals.
    #[serde(skip)]
    pub flash: FlashQueues,
    /// Template globals.
    pub globals: TemplateGlobals,
}

impl RequestContext {
    /// The starting context: header-negotiated locale and whatever the
    /// session layer loaded.
    pub fn new(facts: &RequestFacts, settings: &Settings) -> Self {
        let locale = locale::negotiate(facts.accept_language.as_deref(), &settings.locales);
        let (session, current_user, flash) = facts.session.as_ref().map_or_else(
            || (SessionView::default(), None, FlashQueues::default()),
            |snapshot| {
                (
                    SessionView {
                        id: Some(snapshot.id),
                        logged_in: snapshot.user.is_some(),
                    },
                    snapshot.user.clone(),
                    snapshot.flash.clone(),
                )
            },
        );

        Self {
            current_user,
            locale,
            readonly: false,
            session,
            flash,
            globals: TemplateGlobals::default(),
        }
    }

    /// Session id, when a real session exists.
    pub const fn session_id(&self) -> Option<Uuid> {
        self.session.id
    }
}

/// Extractor for the finished [`RequestContext`].
///
/// Fails with a 500 if the pipeline middleware did not run, which only
/// happens when a handler is mounted outside the router.
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(Self)
            .ok_or_else(|| WebError::Internal(String::from("request context missing")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn facts_capture_url_parts() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("census.example.org"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        let uri: Uri = "/place/gb?lang=fr&q=open+data".parse().unwrap();

        let facts = RequestFacts::from_parts(&headers, &uri, None);
        assert_eq!(facts.current_url(), "https://census.example.org/place/gb");
        assert_eq!(facts.current_domain(), "https://census.example.org");
        assert_eq!(facts.query.get("q").map(String::as_str), Some("open data"));
    }

    #[test]
    fn facts_decode_query_escapes() {
        let uri: Uri = "/?name=a%20b+c&empty=&flag".parse().unwrap();
        let facts = RequestFacts::from_parts(&HeaderMap::new(), &uri, None);
        assert_eq!(facts.query.get("name").map(String::as_str), Some("a b c"));
        assert_eq!(facts.query.get("empty").map(String::as_str), Some(""));
        assert_eq!(facts.query.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn new_context_reads_session() {
        let user = User {
            id: String::from("u1"),
            name: String::from("Ada"),
            email: None,
            provider: census_types::AuthProvider::Anonymous,
        };
        let facts = RequestFacts {
            session: Some(SessionSnapshot {
                id: Uuid::nil(),
                user: Some(user.clone()),
                flash: FlashQueues::default(),
            }),
            ..RequestFacts::default()
        };
        let ctx = RequestContext::new(&facts, &Settings::default());
        assert_eq!(ctx.current_user, Some(user));
        assert!(ctx.session.logged_in);
        assert_eq!(ctx.locale, "en");
    }
}
