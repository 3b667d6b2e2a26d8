//! Boot-time composition of the application.
//!
//! Two independent flags decide, once per process, what gets wired in:
//!
//! | `readonly` | `auth_on` | Census routes | Sessions | Basic auth |
//! |------------|-----------|---------------|----------|------------|
//! | `false` | `false` | registered | yes | no |
//! | `false` | `true` | registered | yes | yes |
//! | `true` | `false` | never registered | no | no |
//! | `true` | `true` | never registered | no | yes |

use crate::config::Settings;

/// Whether data can be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Submissions, reviews and login enabled.
    Census,
    /// Display pages only.
    Readonly,
}

/// What stands in front of every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Nothing.
    Open,
    /// HTTP basic auth against `appconfig.auth_user`/`auth_passhash`.
    BasicAuth,
}

/// The startup configuration derived from [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StartupProfile {
    /// Edit mode.
    pub mode: Mode,
    /// Auth gate.
    pub gate: Gate,
    /// Whether HTTP request logging is installed (off in test deployments).
    pub request_logging: bool,
}

impl StartupProfile {
    /// Derive the profile from settings.
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: if settings.appconfig.readonly {
                Mode::Readonly
            } else {
                Mode::Census
            },
            gate: if settings.appconfig.auth_on {
                Gate::BasicAuth
            } else {
                Gate::Open
            },
            request_logging: !settings.test.testing,
        }
    }

    /// Readonly deployment.
    pub const fn is_readonly(&self) -> bool {
        matches!(self.mode, Mode::Readonly)
    }

    /// Census (edit) routes are registered.
    pub const fn census_routes(&self) -> bool {
        matches!(self.mode, Mode::Census)
    }

    /// The session layer is installed.
    pub const fn sessions(&self) -> bool {
        matches!(self.mode, Mode::Census)
    }

    /// The basic-auth gate is installed.
    pub const fn basic_auth(&self) -> bool {
        matches!(self.gate, Gate::BasicAuth)
    }

    /// Short label for logs.
    pub const fn label(&self) -> &'static str {
        match (self.mode, self.gate) {
            (Mode::Census, Gate::Open) => "census",
            (Mode::Census, Gate::BasicAuth) => "census+basic-auth",
            (Mode::Readonly, Gate::Open) => "readonly",
            (Mode::Readonly, Gate::BasicAuth) => "readonly+basic-auth",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(readonly: bool, auth_on: bool) -> StartupProfile {
        let mut settings = Settings::default();
        settings.appconfig.readonly = readonly;
        settings.appconfig.auth_on = auth_on;
        StartupProfile::from_settings(&settings)
    }

    #[test]
    fn four_configurations() {
        let cases = [
            (false, false, true, false),
            (false, true, true, true),
            (true, false, false, false),
            (true, true, false, true),
        ];
        for (readonly, auth_on, census, basic) in cases {
            let p = profile(readonly, auth_on);
            assert_eq!(p.census_routes(), census, "{}", p.label());
            assert_eq!(p.sessions(), census, "{}", p.label());
            assert_eq!(p.basic_auth(), basic, "{}", p.label());
            assert_eq!(p.is_readonly(), readonly, "{}", p.label());
        }
    }

    #[test]
    fn testing_disables_request_logging() {
        let mut settings = Settings::default();
        assert!(StartupProfile::from_settings(&settings).request_logging);
        settings.test.testing = true;
        assert!(!StartupProfile::from_settings(&settings).request_logging);
    }
}
