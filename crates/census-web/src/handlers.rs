//! Core route handlers, registered in every deployment.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Overview table |
//! | `GET` | `/overview.json` | Summary consumed by the table renderer |
//! | `GET` | `/about` | Configured about page |
//! | `GET` | `/faq` | Configured FAQ page |
//! | `GET` | `/changes` | Recent submissions |
//! | `GET` | `/place/{place}` | One place across all datasets |
//! | `GET` | `/dataset/{dataset}` | One dataset across all places |
//! | `GET` | `/entry/{place}/{dataset}` | One entry's answers |
//! | `GET` | `/api/entries.{format}` | Entry export, `json` or `csv` |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Json};
use census_render::{SortOrders, SummaryTable};
use census_types::{Dataset, Entry, Place, Question, Submission, Summary};
use serde::Serialize;

use crate::context::{Ctx, RequestContext};
use crate::error::WebError;
use crate::state::AppState;

/// How many submissions `/changes` lists.
pub const CHANGES_LIMIT: usize = 50;

/// `Cache-Control` the entry export sets for itself.
pub const API_CACHE_CONTROL: &str = "public, max-age=600";

// ---------------------------------------------------------------------------
// Page models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OverviewPage<'a> {
    table: &'a SummaryTable,
    orders: SortOrders,
}

#[derive(Debug, Serialize)]
struct StaticPage {
    title: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChangeRow<'a> {
    #[serde(flatten)]
    submission: &'a Submission,
    score: u32,
}

#[derive(Debug, Serialize)]
struct ChangesPage<'a> {
    submissions: Vec<ChangeRow<'a>>,
}

#[derive(Debug, Serialize)]
struct PlaceRow<'a> {
    dataset: &'a Dataset,
    entry: Option<&'a Entry>,
    score: u32,
    color: String,
}

#[derive(Debug, Serialize)]
struct PlacePage<'a> {
    place: &'a Place,
    score: u32,
    rows: Vec<PlaceRow<'a>>,
}

#[derive(Debug, Serialize)]
struct DatasetRow<'a> {
    place: &'a Place,
    entry: Option<&'a Entry>,
    score: u32,
    color: String,
}

#[derive(Debug, Serialize)]
struct DatasetPage<'a> {
    dataset: &'a Dataset,
    rows: Vec<DatasetRow<'a>>,
}

/// One question on an entry or submission page.
#[derive(Debug, Serialize)]
pub(crate) struct AnswerRow {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) weight: u32,
    pub(crate) choice: &'static str,
    pub(crate) current: &'static str,
}

#[derive(Debug, Serialize)]
struct EntryPage<'a> {
    place: &'a Place,
    dataset: &'a Dataset,
    entry: &'a Entry,
    score: u32,
    answers: Vec<AnswerRow>,
}

#[derive(Debug, Serialize)]
struct NotFoundPage {
    message: String,
}

/// Answer rows for every question, in form order. `current` is the
/// accepted entry's answer, if one is given.
pub(crate) fn answer_rows(
    answers: &census_types::Answers,
    current: Option<&census_types::Answers>,
) -> Vec<AnswerRow> {
    let show = |answers: Option<&census_types::Answers>, question: Question| {
        answers
            .and_then(|a| a.get(&question))
            .map_or("-", |choice| choice.as_str())
    };
    Question::ALL
        .iter()
        .map(|question| AnswerRow {
            key: question.key(),
            label: question.label(),
            weight: question.weight(),
            choice: show(Some(answers), *question),
            current: show(current, *question),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// GET / and GET /overview.json
// ---------------------------------------------------------------------------

/// Render the overview table, colored and ordered by score.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let summary = state.store.read().await.summary();
    let table = census_render::prepare(&summary, &state.scale);
    let page = OverviewPage {
        orders: table.orders(),
        table: &table,
    };
    state.views.render("overview.html", &ctx, &page)
}

/// The summary as JSON.
pub async fn result_json(State(state): State<Arc<AppState>>) -> Json<Summary> {
    Json(state.store.read().await.summary())
}

// ---------------------------------------------------------------------------
// GET /about and GET /faq
// ---------------------------------------------------------------------------

/// Render the configured about page.
pub async fn about(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let content = state
        .settings
        .site
        .about_page
        .resolve(&ctx.locale, state.settings.default_locale());
    state.views.render(
        "page.html",
        &ctx,
        &StaticPage {
            title: "About",
            content,
        },
    )
}

/// Render the configured FAQ page.
pub async fn faq(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let content = state
        .settings
        .site
        .faq_page
        .resolve(&ctx.locale, state.settings.default_locale());
    state.views.render(
        "page.html",
        &ctx,
        &StaticPage {
            title: "FAQ",
            content,
        },
    )
}

// ---------------------------------------------------------------------------
// GET /changes
// ---------------------------------------------------------------------------

/// List the most recent submissions, newest first.
pub async fn changes(
    State(state): State<Arc<AppState>>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let store = state.store.read().await;
    let submissions = store
        .changes(CHANGES_LIMIT)
        .into_iter()
        .map(|submission| ChangeRow {
            score: submission.score(),
            submission,
        })
        .collect();
    state
        .views
        .render("changes.html", &ctx, &ChangesPage { submissions })
}

// ---------------------------------------------------------------------------
// GET /place/{place}, /dataset/{dataset}, /entry/{place}/{dataset}
// ---------------------------------------------------------------------------

/// One place's row of the matrix.
pub async fn place(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let store = state.store.read().await;
    let place = store
        .place(&place_id)
        .ok_or_else(|| WebError::NotFound(format!("place {place_id}")))?;
    let score = store.summary().place_score(&place_id).unwrap_or(0);

    let rows = store
        .datasets()
        .iter()
        .map(|dataset| {
            let entry = store.entry(&place_id, dataset.id.as_str());
            let score = entry.map_or(0, Entry::score);
            PlaceRow {
                dataset,
                entry,
                score,
                color: state.scale.hex(score),
            }
        })
        .collect();

    state
        .views
        .render("place.html", &ctx, &PlacePage { place, score, rows })
}

/// One dataset's column of the matrix.
pub async fn dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let store = state.store.read().await;
    let dataset = store
        .dataset(&dataset_id)
        .ok_or_else(|| WebError::NotFound(format!("dataset {dataset_id}")))?;

    let rows = store
        .places()
        .iter()
        .map(|place| {
            let entry = store.entry(place.id.as_str(), &dataset_id);
            let score = entry.map_or(0, Entry::score);
            DatasetRow {
                place,
                entry,
                score,
                color: state.scale.hex(score),
            }
        })
        .collect();

    state
        .views
        .render("dataset.html", &ctx, &DatasetPage { dataset, rows })
}

/// The accepted answers for one place/dataset pair.
pub async fn entry(
    State(state): State<Arc<AppState>>,
    Path((place_id, dataset_id)): Path<(String, String)>,
    Ctx(ctx): Ctx,
) -> Result<Html<String>, WebError> {
    let store = state.store.read().await;
    let place = store
        .place(&place_id)
        .ok_or_else(|| WebError::NotFound(format!("place {place_id}")))?;
    let dataset = store
        .dataset(&dataset_id)
        .ok_or_else(|| WebError::NotFound(format!("dataset {dataset_id}")))?;
    let entry = store
        .entry(&place_id, &dataset_id)
        .ok_or_else(|| WebError::NotFound(format!("no entry for {place_id}/{dataset_id}")))?;

    let page = EntryPage {
        place,
        dataset,
        entry,
        score: entry.score(),
        answers: answer_rows(&entry.answers, None),
    };
    state.views.render("entry.html", &ctx, &page)
}

// ---------------------------------------------------------------------------
// GET /api/entries.{format}
// ---------------------------------------------------------------------------

/// Export formats for `/api/entries.{format}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON array of entries.
    Json,
    /// One CSV row per entry.
    Csv,
}

impl ExportFormat {
    /// Parse the last path segment (`entries.json`, `entries.csv`).
    pub fn from_file_name(file: &str) -> Option<Self> {
        match file.strip_prefix("entries.")? {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// Render entries as CSV: place, dataset, one column per question, score,
/// reviewer, last update and details.
pub fn entries_csv<'a>(entries: impl Iterator<Item = &'a Entry>) -> String {
    let mut header: Vec<&str> = vec!["place", "dataset"];
    header.extend(Question::ALL.iter().map(|q| q.key()));
    header.extend(["score", "reviewer", "updated_at", "details"]);

    let mut out = header.join(",");
    out.push('\n');
    for entry in entries {
        let mut fields = vec![
            csv_field(entry.place.as_str()),
            csv_field(entry.dataset.as_str()),
        ];
        fields.extend(Question::ALL.iter().map(|q| {
            entry
                .answers
                .get(q)
                .map(|choice| choice.as_str().to_owned())
                .unwrap_or_default()
        }));
        fields.push(entry.score().to_string());
        fields.push(csv_field(entry.reviewer.as_deref().unwrap_or_default()));
        fields.push(entry.updated_at.to_rfc3339());
        fields.push(csv_field(&entry.details));
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Export every accepted entry.
///
/// Sets its own `Cache-Control`, which readonly deployments keep.
pub async fn api_entries(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Response, WebError> {
    let format = ExportFormat::from_file_name(&file)
        .ok_or_else(|| WebError::NotFound(format!("/api/{file}")))?;
    let store = state.store.read().await;

    let mut response = match format {
        ExportFormat::Json => Json(store.entries().collect::<Vec<_>>()).into_response(),
        ExportFormat::Csv => (
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            entries_csv(store.entries()),
        )
            .into_response(),
    };
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(API_CACHE_CONTROL));
    Ok(response)
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// 404 page for unregistered paths. Falls back to the JSON error if the
/// page cannot be rendered.
pub async fn not_found(
    State(state): State<Arc<AppState>>,
    ctx: Option<Extension<RequestContext>>,
) -> Response {
    let message = String::from("The page you are looking for does not exist.");
    let Some(Extension(ctx)) = ctx else {
        return WebError::NotFound(message).into_response();
    };
    match state
        .views
        .render("not_found.html", &ctx, &NotFoundPage { message: message.clone() })
    {
        Ok(page) => (StatusCode::NOT_FOUND, page).into_response(),
        Err(_) => WebError::NotFound(message).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use census_types::{Choice, DatasetId, PlaceId};
    use chrono::{TimeZone, Utc};

    use super::*;

    fn entry(details: &str) -> Entry {
        let mut answers = census_types::Answers::new();
        answers.insert(Question::Exists, Choice::Yes);
        answers.insert(Question::Free, Choice::No);
        Entry {
            place: PlaceId::new("gb"),
            dataset: DatasetId::new("budget"),
            answers,
            details: details.to_owned(),
            reviewer: Some(String::from("Reviewer")),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap(),
        }
    }

    #[test]
    fn export_format_from_file_name() {
        assert_eq!(ExportFormat::from_file_name("entries.json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_file_name("entries.csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_file_name("entries.xml"), None);
        assert_eq!(ExportFormat::from_file_name("places.json"), None);
    }

    #[test]
    fn csv_has_header_and_quotes_details() {
        let entries = [entry("see \"budget\", 2024")];
        let csv = entries_csv(entries.iter());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some(
                "place,dataset,exists,digital,public,free,online,machinereadable,bulk,openlicense,uptodate,score,reviewer,updated_at,details"
            )
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("gb,budget,Yes,,,No,"));
        assert!(row.ends_with("\"see \"\"budget\"\", 2024\""));
        assert!(row.contains(",5,Reviewer,"));
    }

    #[test]
    fn answer_rows_cover_every_question() {
        let e = entry("");
        let rows = answer_rows(&e.answers, None);
        assert_eq!(rows.len(), Question::ALL.len());
        assert_eq!(rows.first().map(|r| r.choice), Some("Yes"));
        assert!(rows.iter().all(|r| r.current == "-"));
    }
}
