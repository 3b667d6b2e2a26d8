//! Census route handlers, registered only when data is editable.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/contribute` | Configured contribute page |
//! | `GET` | `/setlocale/{locale}` | Set the `lang` cookie and go back |
//! | `GET`/`POST` | `/submit` | Submission form |
//! | `GET`/`POST` | `/submission/{id}` | Submission view and review |
//! | `GET`/`POST` | `/login` | Login page and anonymous login |
//! | `GET` | `/auth/logout` | Clear the session user |
//! | `GET` | `/auth/loggedin` | Post-login landing |
//! | `GET` | `/admin/reload` | Re-read the census data file |
//! | `GET` | `/auth/google` | Start Google login |
//! | `GET` | `/auth/google/callback` | Google login return |
//!
//! Submitting, reviewing and reloading need a logged-in user; anyone else
//! is sent to `/login` with a flash error.

use std::borrow::Cow;
use std::sync::Arc;

use axum::Form;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use census_types::{
    Answers, AuthProvider, Choice, Dataset, DatasetId, Place, PlaceId, Question, Submission,
    SubmissionId, SubmissionStatus, User,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::config::{CONTRIBUTE_PLACEHOLDER, ContributePage};
use crate::context::{Ctx, RequestContext};
use crate::error::WebError;
use crate::handlers::{AnswerRow, answer_rows};
use crate::pipeline::LANG_COOKIE;
use crate::session::FlashKind;
use crate::state::AppState;
use crate::store::{Decision, NewSubmission, StoreError};

/// OAuth scopes requested from Google.
const GOOGLE_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.profile \
                            https://www.googleapis.com/auth/userinfo.email";

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

fn is_choice(value: &str) -> Result<(), ValidationError> {
    if value.parse::<Choice>().is_ok() {
        return Ok(());
    }
    Err(ValidationError::new("choice").with_message(Cow::Borrowed(
        "Every question must be answered Yes, No or Unsure.",
    )))
}

fn is_decision(value: &str) -> Result<(), ValidationError> {
    match value {
        "accept" | "reject" => Ok(()),
        _ => Err(ValidationError::new("decision")
            .with_message(Cow::Borrowed("Choose accept or reject."))),
    }
}

/// The `/submit` form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SubmitForm {
    /// Place slug.
    #[validate(length(min = 1, message = "Choose a place."))]
    pub place: String,
    /// Dataset slug.
    #[validate(length(min = 1, message = "Choose a dataset."))]
    pub dataset: String,
    /// Does the data exist?
    #[validate(custom(function = "is_choice"))]
    pub exists: String,
    /// Digital form?
    #[validate(custom(function = "is_choice"))]
    pub digital: String,
    /// Publicly available?
    #[validate(custom(function = "is_choice"))]
    pub public: String,
    /// Free of charge?
    #[validate(custom(function = "is_choice"))]
    pub free: String,
    /// Online?
    #[validate(custom(function = "is_choice"))]
    pub online: String,
    /// Machine readable?
    #[validate(custom(function = "is_choice"))]
    pub machinereadable: String,
    /// Available in bulk?
    #[validate(custom(function = "is_choice"))]
    pub bulk: String,
    /// Openly licensed?
    #[validate(custom(function = "is_choice"))]
    pub openlicense: String,
    /// Up to date?
    #[validate(custom(function = "is_choice"))]
    pub uptodate: String,
    /// Free-text details.
    #[validate(length(max = 5000, message = "Details are limited to 5000 characters."))]
    pub details: String,
}

impl SubmitForm {
    fn choice_field(&self, question: Question) -> &str {
        match question {
            Question::Exists => &self.exists,
            Question::Digital => &self.digital,
            Question::Public => &self.public,
            Question::Free => &self.free,
            Question::Online => &self.online,
            Question::MachineReadable => &self.machinereadable,
            Question::Bulk => &self.bulk,
            Question::OpenLicense => &self.openlicense,
            Question::UpToDate => &self.uptodate,
        }
    }

    /// Parsed answers. Only meaningful once the form has validated.
    pub fn answers(&self) -> Answers {
        Question::ALL
            .iter()
            .filter_map(|q| {
                self.choice_field(*q)
                    .parse::<Choice>()
                    .ok()
                    .map(|choice| (*q, choice))
            })
            .collect()
    }
}

/// The review form on `/submission/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ReviewForm {
    /// `accept` or `reject`.
    #[validate(custom(function = "is_decision"))]
    pub decision: String,
    /// Reviewer comment.
    #[validate(length(max = 2000, message = "Comments are limited to 2000 characters."))]
    pub comment: String,
}

impl ReviewForm {
    fn decision(&self) -> Decision {
        if self.decision == "accept" {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }
}

/// The anonymous login form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "Enter a name between 1 and 100 characters."))]
    pub name: String,
    /// Optional contact address.
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
}

/// Flatten validation errors into sorted, human-readable messages.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                err.message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid."), ToString::to_string)
            })
        })
        .collect();
    messages.sort();
    messages.dedup();
    messages
}

// ---------------------------------------------------------------------------
// Page models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct QuestionView {
    key: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct SubmitPage<'a> {
    places: &'a [Place],
    datasets: &'a [Dataset],
    questions: Vec<QuestionView>,
    choices: Vec<&'static str>,
    selected_place: String,
    selected_dataset: String,
}

#[derive(Debug, Serialize)]
struct SubmissionPage<'a> {
    submission: &'a Submission,
    place: Option<&'a Place>,
    dataset: Option<&'a Dataset>,
    score: u32,
    answers: Vec<AnswerRow>,
    can_review: bool,
}

#[derive(Debug, Serialize)]
struct LoginPage {
    google_enabled: bool,
}

#[derive(Debug, Serialize)]
struct StaticPage {
    title: &'static str,
    content: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn flash(
    state: &AppState,
    ctx: &RequestContext,
    kind: FlashKind,
    message: impl Into<String>,
) {
    if let Some(id) = ctx.session_id() {
        state.sessions.flash(id, kind, message).await;
    }
}

/// The logged-in user, or a redirect to `/login` with a flash error.
async fn require_user(state: &AppState, ctx: &RequestContext) -> Result<User, Response> {
    if let Some(user) = &ctx.current_user {
        return Ok(user.clone());
    }
    flash(state, ctx, FlashKind::Error, "You need to log in first.").await;
    Err(Redirect::to("/login").into_response())
}

fn parse_submission_id(raw: &str) -> Result<SubmissionId, WebError> {
    Uuid::parse_str(raw)
        .map(SubmissionId::from)
        .map_err(|e| WebError::NotFound(format!("submission {raw}: {e}")))
}

/// Google's consent-screen URL for `client_id`, returning to `callback`.
///
/// # Errors
///
/// Returns the encoder's error if the query cannot be serialized.
pub fn authorize_url(
    base: &str,
    client_id: &str,
    callback: &str,
) -> Result<String, serde_urlencoded::ser::Error> {
    let query = serde_urlencoded::to_string([
        ("response_type", "code"),
        ("client_id", client_id),
        ("redirect_uri", callback),
        ("scope", GOOGLE_SCOPE),
    ])?;
    Ok(format!("{base}?{query}"))
}

// ---------------------------------------------------------------------------
// GET /contribute, GET /setlocale/{locale}
// ---------------------------------------------------------------------------

/// Render the contribute page. An unconfigured page shows the
/// placeholder so operators know where to set it.
pub async fn contribute(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Response, WebError> {
    let content = match &state.settings.site.contribute_page {
        ContributePage::Present(html) => html.clone(),
        ContributePage::Placeholder | ContributePage::Absent => {
            String::from(CONTRIBUTE_PLACEHOLDER)
        }
    };
    let page = StaticPage {
        title: "Contribute",
        content,
    };
    Ok(state.views.render("page.html", &ctx, &page)?.into_response())
}

/// Remember a locale in the `lang` cookie and return to the referring
/// page on this site (or `/`). Unknown locales are ignored.
pub async fn setlocale(
    State(state): State<Arc<AppState>>,
    Path(locale): Path<String>,
    headers: HeaderMap,
    Ctx(ctx): Ctx,
) -> Response {
    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|referer| referer.starts_with(&ctx.globals.current_domain))
        .unwrap_or("/")
        .to_owned();
    let mut response = Redirect::to(&back).into_response();

    if state.settings.locales.iter().any(|l| *l == locale) {
        let cookie = format!("{LANG_COOKIE}={locale}; Path=/");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    } else {
        tracing::debug!(%locale, "ignoring unsupported locale");
    }
    response
}

// ---------------------------------------------------------------------------
// GET|POST /submit
// ---------------------------------------------------------------------------

fn render_submit(
    state: &AppState,
    ctx: &RequestContext,
    places: &[Place],
    datasets: &[Dataset],
    selected_place: String,
    selected_dataset: String,
) -> Result<axum::response::Html<String>, WebError> {
    let page = SubmitPage {
        places,
        datasets,
        questions: Question::ALL
            .iter()
            .map(|q| QuestionView {
                key: q.key(),
                label: q.label(),
            })
            .collect(),
        choices: Choice::ALL.iter().map(|c| c.as_str()).collect(),
        selected_place,
        selected_dataset,
    };
    state.views.render("submit.html", ctx, &page)
}

/// Show the submission form, preselecting `?place=` and `?dataset=`.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Response, WebError> {
    if let Err(redirect) = require_user(&state, &ctx).await {
        return Ok(redirect);
    }
    let query = &ctx.globals.url_query;
    let selected_place = query.get("place").cloned().unwrap_or_default();
    let selected_dataset = query.get("dataset").cloned().unwrap_or_default();

    let store = state.store.read().await;
    let page = render_submit(
        &state,
        &ctx,
        store.places(),
        store.datasets(),
        selected_place,
        selected_dataset,
    )?;
    Ok(page.into_response())
}

/// Validate and queue a submission, then show it.
pub async fn submit_post(
    State(state): State<Arc<AppState>>,
    Ctx(mut ctx): Ctx,
    Form(form): Form<SubmitForm>,
) -> Result<Response, WebError> {
    let user = match require_user(&state, &ctx).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let mut errors = form
        .validate()
        .err()
        .map(|e| validation_messages(&e))
        .unwrap_or_default();

    if errors.is_empty() {
        let new = NewSubmission {
            place: PlaceId::new(form.place.clone()),
            dataset: DatasetId::new(form.dataset.clone()),
            answers: form.answers(),
            details: form.details.trim().to_owned(),
            submitter: Some(user),
        };
        let result = state.store.write().await.submit(new, Utc::now());
        match result {
            Ok(id) => {
                tracing::info!(
                    submission = %id,
                    place = %form.place,
                    dataset = %form.dataset,
                    "submission queued"
                );
                flash(
                    &state,
                    &ctx,
                    FlashKind::Info,
                    "Thank you! Your submission is awaiting review.",
                )
                .await;
                return Ok(Redirect::to(&format!("/submission/{id}")).into_response());
            }
            Err(e @ (StoreError::UnknownPlace(_) | StoreError::UnknownDataset(_))) => {
                errors.push(e.to_string());
            }
            Err(e) => return Err(e.into()),
        }
    }

    ctx.globals.error_messages.extend(errors);
    let store = state.store.read().await;
    let page = render_submit(
        &state,
        &ctx,
        store.places(),
        store.datasets(),
        form.place,
        form.dataset,
    )?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

// ---------------------------------------------------------------------------
// GET|POST /submission/{id}
// ---------------------------------------------------------------------------

fn render_submission(
    state: &AppState,
    ctx: &RequestContext,
    store: &crate::store::CensusStore,
    submission: &Submission,
) -> Result<axum::response::Html<String>, WebError> {
    let current = store.entry(submission.place.as_str(), submission.dataset.as_str());
    let page = SubmissionPage {
        submission,
        place: store.place(submission.place.as_str()),
        dataset: store.dataset(submission.dataset.as_str()),
        score: submission.score(),
        answers: answer_rows(&submission.answers, current.map(|e| &e.answers)),
        can_review: ctx.current_user.is_some() && submission.status == SubmissionStatus::Pending,
    };
    state.views.render("submission.html", ctx, &page)
}

/// Show one submission, with the review form for logged-in users.
pub async fn submission(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Ctx(ctx): Ctx,
) -> Result<Response, WebError> {
    let id = parse_submission_id(&raw_id)?;
    let store = state.store.read().await;
    let submission = store
        .submission(id)
        .ok_or(StoreError::UnknownSubmission(id))?;
    Ok(render_submission(&state, &ctx, &store, submission)?.into_response())
}

/// Accept or reject a pending submission.
pub async fn review(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Ctx(mut ctx): Ctx,
    Form(form): Form<ReviewForm>,
) -> Result<Response, WebError> {
    let id = parse_submission_id(&raw_id)?;
    let reviewer = match require_user(&state, &ctx).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    if let Err(errors) = form.validate() {
        ctx.globals.error_messages.extend(validation_messages(&errors));
        let store = state.store.read().await;
        let submission = store
            .submission(id)
            .ok_or(StoreError::UnknownSubmission(id))?;
        let page = render_submission(&state, &ctx, &store, submission)?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let decision = form.decision();
    let result = state
        .store
        .write()
        .await
        .review(id, decision, reviewer, form.comment.trim().to_owned(), Utc::now())
        .map(|_| ());
    match result {
        Ok(()) => {
            let verdict = match decision {
                Decision::Accept => "accepted",
                Decision::Reject => "rejected",
            };
            tracing::info!(submission = %id, verdict, "submission reviewed");
            flash(&state, &ctx, FlashKind::Info, format!("Submission {verdict}.")).await;
        }
        Err(StoreError::AlreadyReviewed(_)) => {
            flash(
                &state,
                &ctx,
                FlashKind::Error,
                "This submission has already been reviewed.",
            )
            .await;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(&format!("/submission/{id}")).into_response())
}

// ---------------------------------------------------------------------------
// Login and logout
// ---------------------------------------------------------------------------

/// Show the login page.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Response, WebError> {
    let page = LoginPage {
        google_enabled: state.settings.oauth.google_client_id.is_some(),
    };
    Ok(state.views.render("login.html", &ctx, &page)?.into_response())
}

/// Log in under a self-declared name.
pub async fn anon_login(
    State(state): State<Arc<AppState>>,
    Ctx(mut ctx): Ctx,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, WebError> {
    form.name = form.name.trim().to_owned();
    form.email = form
        .email
        .map(|e| e.trim().to_owned())
        .filter(|e| !e.is_empty());

    if let Err(errors) = form.validate() {
        ctx.globals.error_messages.extend(validation_messages(&errors));
        let page = LoginPage {
            google_enabled: state.settings.oauth.google_client_id.is_some(),
        };
        let page = state.views.render("login.html", &ctx, &page)?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    let Some(session) = ctx.session_id() else {
        return Err(WebError::Internal(String::from("no session for login")));
    };
    let user = User {
        id: format!("anon-{}", Uuid::new_v4()),
        name: form.name,
        email: form.email,
        provider: AuthProvider::Anonymous,
    };
    tracing::info!(user = %user.id, "anonymous login");
    state.sessions.set_user(session, user).await;
    Ok(Redirect::to("/auth/loggedin").into_response())
}

/// Drop the session, keeping only a goodbye message under its id.
pub async fn logout(State(state): State<Arc<AppState>>, Ctx(ctx): Ctx) -> Redirect {
    if let Some(session) = ctx.session_id() {
        state.sessions.end(session).await;
        state
            .sessions
            .flash(session, FlashKind::Info, "You have been logged out.")
            .await;
    }
    Redirect::to("/")
}

/// Landing after a successful login.
pub async fn loggedin(State(state): State<Arc<AppState>>, Ctx(ctx): Ctx) -> Redirect {
    if let Some(user) = &ctx.current_user {
        flash(&state, &ctx, FlashKind::Info, format!("Welcome, {}.", user.name)).await;
    }
    Redirect::to("/")
}

// ---------------------------------------------------------------------------
// GET /admin/reload
// ---------------------------------------------------------------------------

/// Re-read the census data file.
pub async fn reload(State(state): State<Arc<AppState>>, Ctx(ctx): Ctx) -> Response {
    if let Err(redirect) = require_user(&state, &ctx).await {
        return redirect;
    }
    match state.reload().await {
        Ok(()) => flash(&state, &ctx, FlashKind::Info, "Census data reloaded.").await,
        Err(e) => {
            tracing::warn!(error = %e, "census data reload failed");
            flash(&state, &ctx, FlashKind::Error, format!("Reload failed: {e}")).await;
        }
    }
    Redirect::to("/").into_response()
}

// ---------------------------------------------------------------------------
// Google OAuth
// ---------------------------------------------------------------------------

/// Send the browser to Google's consent screen.
pub async fn google(State(state): State<Arc<AppState>>, Ctx(ctx): Ctx) -> Redirect {
    let oauth = &state.settings.oauth;
    let Some(client_id) = oauth.google_client_id.as_deref() else {
        flash(&state, &ctx, FlashKind::Error, "Google login is not configured.").await;
        return Redirect::to("/login");
    };
    let callback = format!("{}/auth/google/callback", ctx.globals.current_domain);
    match authorize_url(&oauth.google_authorize_url, client_id, &callback) {
        Ok(url) => Redirect::to(&url),
        Err(e) => {
            tracing::warn!(error = %e, "could not build google authorize url");
            flash(&state, &ctx, FlashKind::Error, "Google login is not configured.").await;
            Redirect::to("/login")
        }
    }
}

/// Google's redirect back. Token exchange is not supported, so this
/// always ends on the login page.
pub async fn google_callback(State(state): State<Arc<AppState>>, Ctx(ctx): Ctx) -> Redirect {
    tracing::warn!("google callback received but token exchange is unavailable");
    flash(
        &state,
        &ctx,
        FlashKind::Error,
        "Google login could not be completed. Please log in anonymously.",
    )
    .await;
    Redirect::to("/login")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn all(value: &str) -> SubmitForm {
        SubmitForm {
            place: String::from("gb"),
            dataset: String::from("budget"),
            exists: value.to_owned(),
            digital: value.to_owned(),
            public: value.to_owned(),
            free: value.to_owned(),
            online: value.to_owned(),
            machinereadable: value.to_owned(),
            bulk: value.to_owned(),
            openlicense: value.to_owned(),
            uptodate: value.to_owned(),
            details: String::new(),
        }
    }

    #[test]
    fn choice_validator_accepts_exactly_three_values() {
        assert!(is_choice("Yes").is_ok());
        assert!(is_choice("No").is_ok());
        assert!(is_choice("Unsure").is_ok());
        assert!(is_choice("yes").is_err());
        assert!(is_choice("").is_err());
    }

    #[test]
    fn valid_submit_form_parses_answers() {
        let form = all("Yes");
        assert!(form.validate().is_ok());
        assert_eq!(census_types::score_answers(&form.answers()), 100);
    }

    #[test]
    fn invalid_choice_is_reported_once() {
        let mut form = all("Unsure");
        form.bulk = String::from("Maybe");
        form.free = String::from("Sometimes");
        let errors = form.validate().err().map(|e| validation_messages(&e));
        assert_eq!(
            errors,
            Some(vec![String::from("Every question must be answered Yes, No or Unsure.")])
        );
    }

    #[test]
    fn missing_place_is_reported() {
        let mut form = all("No");
        form.place = String::new();
        let errors = form.validate().err().map(|e| validation_messages(&e));
        assert_eq!(errors, Some(vec![String::from("Choose a place.")]));
    }

    #[test]
    fn review_form_requires_a_decision() {
        let form = ReviewForm {
            decision: String::from("maybe"),
            comment: String::new(),
        };
        assert!(form.validate().is_err());
        let form = ReviewForm {
            decision: String::from("accept"),
            comment: String::new(),
        };
        assert!(form.validate().is_ok());
        assert_eq!(form.decision(), Decision::Accept);
    }

    #[test]
    fn login_form_checks_email_only_when_given() {
        let form = LoginForm {
            name: String::from("Ada"),
            email: None,
        };
        assert!(form.validate().is_ok());
        let form = LoginForm {
            name: String::from("Ada"),
            email: Some(String::from("not-an-email")),
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn authorize_url_encodes_callback() {
        let url = authorize_url(
            "https://accounts.example.com/auth",
            "client id",
            "http://localhost:5000/auth/google/callback",
        )
        .unwrap();
        assert!(url.starts_with("https://accounts.example.com/auth?response_type=code&"));
        assert!(url.contains("client_id=client+id"));
        assert!(
            url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Fauth%2Fgoogle%2Fcallback")
        );
        assert!(url.contains("&scope=https%3A%2F%2F"));
    }
}
