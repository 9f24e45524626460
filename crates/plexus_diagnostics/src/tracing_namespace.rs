//! The `tracing` namespace.
//!
//! [`TracingNamespace::build`] runs in three steps:
//!
//! 1. The builder's values are written as *defaults* into the branch's
//!    [`Settings`](plexus_registry::Settings), under `level`, `format`,
//!    `env_filter`, and `span_events`.
//! 2. The final settings view is read back, so values the host assigned or
//!    required on the branch beforehand win over the builder.
//! 3. The resulting [`TracingConfig`] is stored as the `config` component of
//!    the branch and, unless disabled, a `tracing-subscriber` registry is
//!    installed as the global default.
//!
//! Installing is best effort: if a global subscriber already exists the new
//! one is discarded.

use core::str::FromStr;

use plexus_registry::tag::Apps;
use plexus_registry::{Component, Namespace, Registry, RegistryError};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Label of the branch the namespace builds by default.
pub const DEFAULT_LABEL: &str = "tracing";

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The effective tracing configuration, stored as the `config` component of
/// the tracing branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Maximum log level.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Target-specific filter directives, if any.
    pub env_filter: Option<String>,
    /// Whether span enter/exit events are emitted.
    pub span_events: bool,
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    /// Installs a global subscriber for this configuration.
    ///
    /// Returns `false` if a global subscriber was already set.
    pub fn install(&self) -> bool {
        let filter = self.filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(tracing_subscriber::fmt::layer().pretty().with_span_events(span_events))
                .try_init(),
            TracingFormat::Compact => registry
                .with(tracing_subscriber::fmt::layer().compact().with_span_events(span_events))
                .try_init(),
            TracingFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_span_events(span_events))
                .try_init(),
        }
        .is_ok();

        tracing::debug!(
            level = %self.level,
            format = ?self.format,
            installed,
            "tracing configured"
        );
        installed
    }
}

/// Serialized form of [`TracingConfig`] kept in branch settings.
#[derive(Debug, Serialize, Deserialize)]
struct TracingSettings {
    level: String,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl TryFrom<TracingSettings> for TracingConfig {
    type Error = RegistryError;

    fn try_from(settings: TracingSettings) -> Result<Self, Self::Error> {
        let level = Level::from_str(&settings.level).map_err(|_| {
            RegistryError::configuration(format!("invalid tracing level '{}'", settings.level))
        })?;
        Ok(Self {
            level,
            format: settings.format,
            env_filter: settings.env_filter,
            span_events: settings.span_events,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingNamespace
// ─────────────────────────────────────────────────────────────────────────────

/// Namespace that configures `tracing` output.
///
/// ```
/// use plexus_diagnostics::{TracingFormat, TracingNamespace};
/// use tracing::Level;
///
/// // Development: pretty output with span enter/exit
/// let dev = TracingNamespace::new()
///     .with_level(Level::DEBUG)
///     .with_span_events(true);
///
/// // Production: JSON output, quiet dependencies
/// let prod = TracingNamespace::new()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("plexus_registry=info,plexus_events=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingNamespace {
    label: String,
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
    install: bool,
}

impl Default for TracingNamespace {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            install: true,
        }
    }
}

impl TracingNamespace {
    /// Creates a namespace with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds into a branch other than `tracing`.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets filter directives, `target=level,target=level,...`.
    ///
    /// Invalid directives fall back to the plain level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Emits span enter/exit events.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Controls whether `build` installs a global subscriber.
    #[must_use]
    pub fn installing(mut self, install: bool) -> Self {
        self.install = install;
        self
    }

    fn defaults(&self) -> TracingSettings {
        TracingSettings {
            level: self.level.to_string(),
            format: self.format,
            env_filter: self.env_filter.clone(),
            span_events: self.span_events,
        }
    }
}

impl Namespace for TracingNamespace {
    fn label(&self) -> &str {
        &self.label
    }

    fn build(&self, registry: &Registry) -> Result<(), RegistryError> {
        let settings = registry.settings();
        settings.extend_defaults_from(&self.defaults())?;

        let view = serde_json::Value::Object(settings.final_view());
        let effective: TracingSettings = serde_json::from_value(view)
            .map_err(|err| RegistryError::Settings(err.into()))?;
        let config = TracingConfig::try_from(effective)?;

        if self.install {
            config.install();
        }
        registry.set::<Apps>("config", Component::new(config));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(namespace: &TracingNamespace) -> Registry {
        let registry = Registry::new();
        registry.add_namespace(&namespace.clone().installing(false)).unwrap()
    }

    #[test]
    fn tracing_format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn builder_values_become_config() {
        let branch = build(
            &TracingNamespace::new()
                .with_level(Level::WARN)
                .with_format(TracingFormat::Json)
                .with_env_filter("plexus_registry=trace")
                .with_span_events(true),
        );

        let config = branch.component::<TracingConfig>("config").unwrap();
        assert_eq!(
            *config,
            TracingConfig {
                level: Level::WARN,
                format: TracingFormat::Json,
                env_filter: Some("plexus_registry=trace".into()),
                span_events: true,
            }
        );
        assert_eq!(branch.settings().get("format"), Some(json!("json")));
    }

    #[test]
    fn assigned_settings_override_builder() {
        let registry = Registry::new();
        let branch = registry.branch(DEFAULT_LABEL).unwrap();
        branch.settings().set("level", "trace").unwrap();
        branch.settings().set_required("format", "compact").unwrap();

        registry
            .add_namespace(&TracingNamespace::new().with_level(Level::ERROR).installing(false))
            .unwrap();

        let config = branch.component::<TracingConfig>("config").unwrap();
        assert_eq!(config.level, Level::TRACE);
        assert_eq!(config.format, TracingFormat::Compact);
    }

    #[test]
    fn invalid_level_is_configuration_error() {
        let registry = Registry::new();
        registry
            .branch(DEFAULT_LABEL)
            .unwrap()
            .settings()
            .set("level", "loud")
            .unwrap();

        let err = registry
            .add_namespace(&TracingNamespace::new().installing(false))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn custom_label() {
        let branch = build(&TracingNamespace::new().with_label("logs"));
        assert_eq!(branch.label(), "logs");
    }

    #[test]
    fn install_is_best_effort() {
        let config = TracingConfig {
            level: Level::INFO,
            format: TracingFormat::Compact,
            env_filter: None,
            span_events: false,
        };
        // Whichever call comes first may win; a second install never panics.
        config.install();
        assert!(!config.install());
    }
}
