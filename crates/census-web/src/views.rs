//! Page templates via `minijinja`.
//!
//! Templates are compiled into the binary and registered once at boot.
//! Every render merges the request's template globals, the current user,
//! the readonly flag and the session view with the page's own values, so
//! templates never need to null-check shared fields.

use axum::response::Html;
use minijinja::{Environment, Value};
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::WebError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("overview.html", include_str!("../templates/overview.html")),
    ("place.html", include_str!("../templates/place.html")),
    ("dataset.html", include_str!("../templates/dataset.html")),
    ("entry.html", include_str!("../templates/entry.html")),
    ("page.html", include_str!("../templates/page.html")),
    ("changes.html", include_str!("../templates/changes.html")),
    ("submit.html", include_str!("../templates/submit.html")),
    ("submission.html", include_str!("../templates/submission.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
];

/// Resolve a named route to its path. Unknown names resolve to `/`.
fn url_for(name: &str) -> String {
    match name {
        "about" => String::from("/about"),
        "faq" => String::from("/faq"),
        "changes" => String::from("/changes"),
        "submit" => String::from("/submit"),
        "login" => String::from("/login"),
        "logout" => String::from("/auth/logout"),
        "contribute" => String::from("/contribute"),
        _ => String::from("/"),
    }
}

/// The template environment.
#[derive(Debug)]
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    /// Register all templates and helpers.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_function("url_for", url_for);
        Ok(Self { env })
    }

    /// Render `name` for the current request with page-specific values.
    ///
    /// `page` should serialize to a map; its keys shadow the shared ones.
    pub fn render<T: Serialize>(
        &self,
        name: &str,
        ctx: &RequestContext,
        page: &T,
    ) -> Result<Html<String>, WebError> {
        let mut values = match serde_json::to_value(&ctx.globals)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        values.insert(String::from("current_user"), serde_json::to_value(&ctx.current_user)?);
        values.insert(String::from("readonly"), serde_json::Value::Bool(ctx.readonly));
        values.insert(String::from("session"), serde_json::to_value(&ctx.session)?);
        if let serde_json::Value::Object(extra) = serde_json::to_value(page)? {
            values.extend(extra);
        }

        let template = self.env.get_template(name)?;
        let html = template.render(Value::from_serialize(&values))?;
        Ok(Html(html))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_compile() {
        assert!(Views::new().is_ok());
    }

    #[test]
    fn url_for_overview_is_root() {
        assert_eq!(url_for("overview"), "/");
        assert_eq!(url_for("about"), "/about");
    }

    #[test]
    fn page_values_shadow_globals() {
        let views = Views::new().unwrap();
        let mut ctx = RequestContext::default();
        ctx.globals.sitename = String::from("Census");
        let html = views
            .render(
                "page.html",
                &ctx,
                &serde_json::json!({ "title": "About", "content": "<p>Hi</p>" }),
            )
            .unwrap()
            .0;
        assert!(html.contains("Census"));
        assert!(html.contains("<p>Hi</p>"));
    }
}
