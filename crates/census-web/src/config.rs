//! Configuration loading and typed settings.
//!
//! Settings come from a YAML file (default `census-config.yaml`) layered
//! with `CENSUS__`-prefixed environment variables, `__` separating
//! sections: `CENSUS__APPCONFIG__READONLY=true` overrides
//! `appconfig.readonly`. Every field has a default so a missing file or
//! key never aborts startup; display values that are absent render empty.
//!
//! The resulting [`Settings`] value is immutable and shared behind an
//! `Arc`. Nothing in request handling reads configuration any other way.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use census_types::User;
use serde::Deserialize;

/// Text shown on the contribute page before an operator configures it.
pub const CONTRIBUTE_PLACEHOLDER: &str =
    "<h1>To set content for this page update your configuration file</h1>";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The sources could not be read or merged.
    #[error("failed to load configuration: {source}")]
    Load {
        /// The underlying error from the `config` crate.
        #[from]
        source: config::ConfigError,
    },
}

/// Top-level application settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Server and mode flags.
    #[serde(default)]
    pub appconfig: AppConfig,

    /// Test deployment hooks.
    #[serde(default)]
    pub test: TestConfig,

    /// Branding and page content.
    #[serde(default)]
    pub site: SiteConfig,

    /// Supported locale codes; the first is the default.
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// OAuth provider settings.
    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            appconfig: AppConfig::default(),
            test: TestConfig::default(),
            site: SiteConfig::default(),
            locales: default_locales(),
            oauth: OAuthConfig::default(),
        }
    }
}

impl Settings {
    /// Load from a YAML file (optional) plus environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse from a YAML string, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The locale used when negotiation finds nothing better.
    pub fn default_locale(&self) -> &str {
        self.locales.first().map_or("en", String::as_str)
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("CENSUS")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn default_locales() -> Vec<String> {
    vec![String::from("en")]
}

/// Server and mode flags (`appconfig` section).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Display-only deployment: no sessions, no edit routes.
    pub readonly: bool,
    /// Put HTTP basic auth in front of every route.
    pub auth_on: bool,
    /// Basic auth username.
    pub auth_user: String,
    /// Basic auth password hash (`sha256$<salt>$<hex>`).
    pub auth_passhash: String,
    /// `max-age` seconds for the readonly `Cache-Control` header.
    pub cache_max_age: u32,
    /// Seed file for the census store.
    pub data_path: Option<PathBuf>,
    /// Seconds a session may sit idle before it is dropped.
    pub session_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
            readonly: false,
            auth_on: false,
            auth_user: String::new(),
            auth_passhash: String::new(),
            cache_max_age: 1800,
            data_path: None,
            session_ttl_secs: 604_800,
        }
    }
}

/// Test deployment hooks (`test` section). Never enable in production.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Marks a test deployment: disables request logging and enables the
    /// test user.
    pub testing: bool,
    /// User treated as logged in when nobody else is.
    pub user: Option<User>,
}

/// A display string, either the same in every locale or per locale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Localized {
    /// One value for all locales.
    Plain(String),
    /// Values keyed by locale code.
    PerLocale(BTreeMap<String, String>),
}

impl Default for Localized {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl Localized {
    /// Value for `locale`, falling back to `fallback`, then to empty.
    pub fn resolve(&self, locale: &str, fallback: &str) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::PerLocale(values) => values
                .get(locale)
                .or_else(|| values.get(fallback))
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Whether a contribute page is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum ContributePage {
    /// Operator-supplied HTML.
    Present(String),
    /// Not configured.
    #[default]
    Absent,
    /// Still the shipped placeholder text.
    Placeholder,
}

impl From<Option<String>> for ContributePage {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::Absent,
            Some(text) if text.trim().is_empty() => Self::Absent,
            Some(text) if text.trim() == CONTRIBUTE_PLACEHOLDER => Self::Placeholder,
            Some(text) => Self::Present(text),
        }
    }
}

impl ContributePage {
    /// Only real content counts as a contribute page.
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Branding and page content (`site` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name.
    pub title: Localized,
    /// Short site name for the navbar.
    pub title_short: Localized,
    /// Extra stylesheet URL.
    pub custom_css: Option<String>,
    /// Google Analytics property key.
    pub google_analytics_key: Option<String>,
    /// Footer HTML.
    pub custom_footer: Localized,
    /// Navbar logo HTML.
    pub navbar_logo: Localized,
    /// Banner shown above every page.
    pub banner_text: Localized,
    /// Message shown after a submission.
    pub post_submission_info: Option<String>,
    /// Share text template for submissions.
    pub share_submission_template: Localized,
    /// Share text template for pages.
    pub share_page_template: Localized,
    /// Contribute page content.
    pub contribute_page: ContributePage,
    /// About page HTML.
    pub about_page: Localized,
    /// FAQ page HTML.
    pub faq_page: Localized,
}

/// OAuth provider settings (`oauth` section).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Google OAuth client id. Google login is offered only when set.
    pub google_client_id: Option<String>,
    /// Google authorization endpoint.
    pub google_authorize_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google_client_id: None,
            google_authorize_url: String::from("https://accounts.google.com/o/oauth2/auth"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let settings = Settings::from_yaml("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.appconfig.cache_max_age, 1800);
        assert_eq!(settings.default_locale(), "en");
    }

    #[test]
    fn parses_flags_and_localized_values() {
        let yaml = r"
appconfig:
  readonly: true
  auth_on: true
  port: 8080
locales: [en, fr]
site:
  title: Open Data Census
  banner_text:
    en: Hello
    fr: Bonjour
";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert!(settings.appconfig.readonly);
        assert!(settings.appconfig.auth_on);
        assert_eq!(settings.appconfig.port, 8080);
        assert_eq!(settings.site.title.resolve("fr", "en"), "Open Data Census");
        assert_eq!(settings.site.banner_text.resolve("fr", "en"), "Bonjour");
        assert_eq!(settings.site.banner_text.resolve("de", "en"), "Hello");
    }

    #[test]
    fn missing_localized_value_is_empty() {
        let values = Localized::PerLocale(BTreeMap::new());
        assert_eq!(values.resolve("en", "en"), "");
    }

    #[test]
    fn contribute_page_is_tri_state() {
        assert_eq!(ContributePage::from(None), ContributePage::Absent);
        assert_eq!(ContributePage::from(Some(String::new())), ContributePage::Absent);
        assert_eq!(
            ContributePage::from(Some(CONTRIBUTE_PLACEHOLDER.to_owned())),
            ContributePage::Placeholder
        );
        let page = ContributePage::from(Some(String::from("<p>Join us</p>")));
        assert!(page.is_present());
        assert!(!ContributePage::Placeholder.is_present());
    }

    #[test]
    fn test_user_parses() {
        let yaml = r"
test:
  testing: true
  user:
    id: tester
    name: Test User
    provider: test
";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert!(settings.test.testing);
        assert_eq!(settings.test.user.map(|u| u.name), Some(String::from("Test User")));
    }
}
