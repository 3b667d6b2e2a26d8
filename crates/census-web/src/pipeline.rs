//! The request-context pipeline.
//!
//! The stage list is fixed at boot from the [`StartupProfile`] and never
//! re-examined per request:
//!
//! | # | Stage | Kind | Installed |
//! |---|-------|------|-----------|
//! | 1 | [`Stage::Cors`] | response | always |
//! | 2 | [`Stage::CacheControl`] | response | readonly |
//! | 3 | [`Stage::TestUser`] | request | `test.testing` with a test user |
//! | 4 | [`Stage::LocaleOverride`] | request | always |
//! | 5 | [`Stage::ReadonlySession`] | request | readonly |
//! | 6 | [`Stage::TemplateGlobals`] | request | always |
//!
//! Request stages are pure functions from one [`RequestContext`] to the
//! next. Response stages only touch headers and run in the outermost
//! layer, so every response (including basic-auth rejections and 404s)
//! carries them.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::Settings;
use crate::context::{RequestContext, RequestFacts, SessionView, TemplateGlobals};
use crate::mode::StartupProfile;
use crate::session::{FlashKind, SessionSnapshot};
use crate::state::AppState;

/// Methods advertised in `Access-Control-Allow-Methods`.
pub const CORS_ALLOW_METHODS: &str = "GET,PUT,POST,DELETE";
/// Headers advertised in `Access-Control-Allow-Headers`.
pub const CORS_ALLOW_HEADERS: &str = "Content-Type";
/// Cookie that overrides header locale negotiation.
pub const LANG_COOKIE: &str = "lang";

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Set the three CORS headers.
    Cors,
    /// Set `Cache-Control: public, max-age=N` unless already set.
    CacheControl {
        /// Seconds.
        max_age: u32,
    },
    /// Treat the configured test user as logged in.
    TestUser,
    /// Let the `lang` cookie override the negotiated locale.
    LocaleOverride,
    /// Attach a logged-out synthetic session.
    ReadonlySession,
    /// Populate template globals and drain flash messages.
    TemplateGlobals,
}

impl Stage {
    /// Whether the stage acts on the response rather than the context.
    pub const fn is_response_stage(self) -> bool {
        matches!(self, Self::Cors | Self::CacheControl { .. })
    }
}

/// The ordered stage list plus the settings its stages read.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    settings: Arc<Settings>,
}

impl Pipeline {
    /// Assemble the stages for a startup profile.
    pub fn new(profile: &StartupProfile, settings: Arc<Settings>) -> Self {
        let mut stages = vec![Stage::Cors];
        if profile.is_readonly() {
            stages.push(Stage::CacheControl {
                max_age: settings.appconfig.cache_max_age,
            });
        }
        if settings.test.testing && settings.test.user.is_some() {
            stages.push(Stage::TestUser);
        }
        stages.push(Stage::LocaleOverride);
        if profile.is_readonly() {
            stages.push(Stage::ReadonlySession);
        }
        stages.push(Stage::TemplateGlobals);

        Self { stages, settings }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Settings the stages read.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run every request stage in order.
    pub fn run(&self, facts: &RequestFacts) -> RequestContext {
        let initial = RequestContext::new(facts, &self.settings);
        self.stages
            .iter()
            .filter(|stage| !stage.is_response_stage())
            .fold(initial, |ctx, stage| match stage {
                Stage::TestUser => with_test_user(ctx, &self.settings),
                Stage::LocaleOverride => with_locale_override(ctx, facts),
                Stage::ReadonlySession => with_readonly_session(ctx),
                Stage::TemplateGlobals => with_template_globals(ctx, facts, &self.settings),
                Stage::Cors | Stage::CacheControl { .. } => ctx,
            })
    }

    /// Run every response stage in order.
    pub fn finish(&self, headers: &mut HeaderMap) {
        for stage in &self.stages {
            match stage {
                Stage::Cors => apply_cors(headers),
                Stage::CacheControl { max_age } => apply_cache_control(headers, *max_age),
                _ => {}
            }
        }
    }
}

/// Set the CORS headers, replacing any existing values.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
}

/// Set `Cache-Control` unless the handler already chose one.
pub fn apply_cache_control(headers: &mut HeaderMap, max_age: u32) {
    if headers.contains_key(header::CACHE_CONTROL) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age}")) {
        headers.insert(header::CACHE_CONTROL, value);
    }
}

/// Stage 3: log in the test user when nobody is logged in.
pub fn with_test_user(mut ctx: RequestContext, settings: &Settings) -> RequestContext {
    if settings.test.testing && ctx.current_user.is_none() {
        ctx.current_user.clone_from(&settings.test.user);
    }
    ctx
}

/// Stage 4: the `lang` cookie beats header negotiation.
pub fn with_locale_override(mut ctx: RequestContext, facts: &RequestFacts) -> RequestContext {
    if let Some(lang) = facts.cookies.get(LANG_COOKIE).filter(|l| !l.is_empty()) {
        ctx.locale.clone_from(lang);
    }
    ctx
}

/// Stage 5: readonly deployments get a logged-out session and no user
/// from it.
pub fn with_readonly_session(mut ctx: RequestContext) -> RequestContext {
    ctx.readonly = true;
    ctx.session = SessionView {
        id: None,
        logged_in: false,
    };
    ctx
}

/// Stage 6: derive template globals and move flash messages into them.
pub fn with_template_globals(
    mut ctx: RequestContext,
    facts: &RequestFacts,
    settings: &Settings,
) -> RequestContext {
    let locale = ctx.locale.as_str();
    let fallback = settings.default_locale();
    let site = &settings.site;

    let error_messages = ctx.flash.take(FlashKind::Error);
    let info_messages = ctx.flash.take(FlashKind::Info);

    ctx.globals = TemplateGlobals {
        sitename: site.title.resolve(locale, fallback),
        sitename_short: site.title_short.resolve(locale, fallback),
        custom_css: site.custom_css.clone(),
        google_analytics_key: site.google_analytics_key.clone(),
        custom_footer: site.custom_footer.resolve(locale, fallback),
        navbar_logo: site.navbar_logo.resolve(locale, fallback),
        banner_text: site.banner_text.resolve(locale, fallback),
        current_url: facts.current_url(),
        current_domain: facts.current_domain(),
        post_submission_info: site.post_submission_info.clone(),
        share_submission_template: site.share_submission_template.resolve(locale, fallback),
        share_page_template: site.share_page_template.resolve(locale, fallback),
        has_contribute_page: site.contribute_page.is_present(),
        locales: settings.locales.clone(),
        current_locale: ctx.locale.clone(),
        url_query: facts.query.clone(),
        error_messages,
        info_messages,
    };
    ctx
}

/// Outermost layer: run the response stages on whatever comes back.
pub async fn response_headers(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    state.pipeline.finish(response.headers_mut());
    response
}

/// Build the request context and attach it to the request.
pub async fn request_context(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let session = request.extensions_mut().remove::<SessionSnapshot>();
    let facts = RequestFacts::from_parts(request.headers(), request.uri(), session);
    let ctx = state.pipeline.run(&facts);
    tracing::trace!(
        path = %facts.path,
        locale = %ctx.locale,
        user = ctx.current_user.as_ref().map(|u| u.id.as_str()).unwrap_or(""),
        "request context built"
    );
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use census_types::{AuthProvider, User};
    use uuid::Uuid;

    use super::*;
    use crate::config::{ContributePage, Localized};
    use crate::mode::{Gate, Mode};
    use crate::session::FlashQueues;

    fn profile(mode: Mode) -> StartupProfile {
        StartupProfile {
            mode,
            gate: Gate::Open,
            request_logging: false,
        }
    }

    fn test_user() -> User {
        User {
            id: String::from("tester"),
            name: String::from("Tester"),
            email: None,
            provider: AuthProvider::Test,
        }
    }

    fn facts_with_cookie(lang: Option<&str>) -> RequestFacts {
        let mut cookies = BTreeMap::new();
        if let Some(lang) = lang {
            cookies.insert(String::from(LANG_COOKIE), lang.to_owned());
        }
        RequestFacts {
            scheme: String::from("http"),
            host: String::from("localhost:5000"),
            path: String::from("/"),
            accept_language: Some(String::from("en")),
            cookies,
            ..RequestFacts::default()
        }
    }

    #[test]
    fn readonly_profile_adds_cache_and_session_stages() {
        let settings = Arc::new(Settings::default());
        let pipeline = Pipeline::new(&profile(Mode::Readonly), settings);
        assert_eq!(
            pipeline.stages(),
            &[
                Stage::Cors,
                Stage::CacheControl { max_age: 1800 },
                Stage::LocaleOverride,
                Stage::ReadonlySession,
                Stage::TemplateGlobals,
            ]
        );
    }

    #[test]
    fn census_profile_skips_readonly_stages() {
        let settings = Arc::new(Settings::default());
        let pipeline = Pipeline::new(&profile(Mode::Census), settings);
        assert_eq!(
            pipeline.stages(),
            &[Stage::Cors, Stage::LocaleOverride, Stage::TemplateGlobals]
        );
    }

    #[test]
    fn cors_headers_always_set() {
        let mut headers = HeaderMap::new();
        apply_cors(&mut headers);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET,PUT,POST,DELETE");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    }

    #[test]
    fn cache_control_is_first_writer_wins() {
        let mut fresh = HeaderMap::new();
        apply_cache_control(&mut fresh, 1800);
        assert_eq!(fresh[header::CACHE_CONTROL], "public, max-age=1800");

        let mut preset = HeaderMap::new();
        preset.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        apply_cache_control(&mut preset, 1800);
        assert_eq!(preset[header::CACHE_CONTROL], "no-store");
    }

    #[test]
    fn lang_cookie_overrides_negotiation() {
        let mut settings = Settings::default();
        settings.locales = vec![String::from("en"), String::from("de")];
        let pipeline = Pipeline::new(&profile(Mode::Census), Arc::new(settings));

        let ctx = pipeline.run(&facts_with_cookie(Some("fr")));
        assert_eq!(ctx.locale, "fr");
        assert_eq!(ctx.globals.current_locale, "fr");

        let ctx = pipeline.run(&facts_with_cookie(None));
        assert_eq!(ctx.locale, "en");
    }

    #[test]
    fn test_user_only_when_testing_and_nobody_logged_in() {
        let mut settings = Settings::default();
        settings.test.testing = true;
        settings.test.user = Some(test_user());
        let pipeline = Pipeline::new(&profile(Mode::Census), Arc::new(settings.clone()));
        assert!(pipeline.stages().contains(&Stage::TestUser));
        assert_eq!(pipeline.run(&facts_with_cookie(None)).current_user, Some(test_user()));

        let real = User {
            id: String::from("real"),
            name: String::from("Real"),
            email: None,
            provider: AuthProvider::Anonymous,
        };
        let mut ctx = RequestContext::default();
        ctx.current_user = Some(real.clone());
        assert_eq!(with_test_user(ctx, &settings).current_user, Some(real));

        settings.test.testing = false;
        let pipeline = Pipeline::new(&profile(Mode::Census), Arc::new(settings));
        assert!(!pipeline.stages().contains(&Stage::TestUser));
        assert_eq!(pipeline.run(&facts_with_cookie(None)).current_user, None);
    }

    #[test]
    fn readonly_session_is_logged_out() {
        let pipeline = Pipeline::new(&profile(Mode::Readonly), Arc::new(Settings::default()));
        let ctx = pipeline.run(&facts_with_cookie(None));
        assert!(ctx.readonly);
        assert!(!ctx.session.logged_in);
        assert_eq!(ctx.session.id, None);
    }

    #[test]
    fn globals_resolve_per_locale_and_tolerate_missing_values() {
        let mut settings = Settings::default();
        settings.locales = vec![String::from("en"), String::from("fr")];
        let mut titles = BTreeMap::new();
        titles.insert(String::from("en"), String::from("Open Data Census"));
        titles.insert(String::from("fr"), String::from("Recensement"));
        settings.site.title = Localized::PerLocale(titles);
        settings.site.contribute_page = ContributePage::Placeholder;
        let pipeline = Pipeline::new(&profile(Mode::Census), Arc::new(settings));

        let ctx = pipeline.run(&facts_with_cookie(Some("fr")));
        assert_eq!(ctx.globals.sitename, "Recensement");
        assert_eq!(ctx.globals.sitename_short, "");
        assert_eq!(ctx.globals.custom_css, None);
        assert!(!ctx.globals.has_contribute_page);
        assert_eq!(ctx.globals.current_url, "http://localhost:5000/");
        assert_eq!(ctx.globals.current_domain, "http://localhost:5000");
    }

    #[test]
    fn flash_moves_into_globals_once() {
        let pipeline = Pipeline::new(&profile(Mode::Census), Arc::new(Settings::default()));
        let mut flash = FlashQueues::default();
        flash.push(FlashKind::Error, "bad");
        flash.push(FlashKind::Info, "good");
        let mut facts = facts_with_cookie(None);
        facts.session = Some(SessionSnapshot {
            id: Uuid::nil(),
            user: None,
            flash,
        });

        let mut ctx = pipeline.run(&facts);
        assert_eq!(ctx.globals.error_messages, vec!["bad"]);
        assert_eq!(ctx.globals.info_messages, vec!["good"]);
        assert!(ctx.flash.take(FlashKind::Error).is_empty());
    }
}
