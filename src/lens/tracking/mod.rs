//! Tracking code lens
//!
//! Generates the snippets a site owner pastes into a website or app to start
//! sending page views: an HTML `<script>` tag for the hosted tracker, plus
//! small client implementations for TypeScript, JavaScript, Kotlin, Java and
//! Swift that post events to the collection endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use sitegauge::lens::tracking::{TrackingCodeArgs, TrackingCodeLens, TrackingLanguage};
//!
//! let args = TrackingCodeArgs::new("b59e9c65-ae32-47f1-8400-119fcf4861c4")
//!     .with_host_url("https://analytics.example.com");
//! let lens = TrackingCodeLens::new(&args);
//!
//! println!("{}", lens.generate(TrackingLanguage::Html));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AppConfig;

/// Tracker script served by the dashboard when none is configured
pub const DEFAULT_SCRIPT_NAME: &str = "script.js";

const TS_TEMPLATE: &str = include_str!("templates/client.ts");
const JS_TEMPLATE: &str = include_str!("templates/client.js");
const KOTLIN_TEMPLATE: &str = include_str!("templates/Tracker.kt");
const JAVA_TEMPLATE: &str = include_str!("templates/Tracker.java");
const SWIFT_TEMPLATE: &str = include_str!("templates/Tracker.swift");

// =============================================================================
// Types
// =============================================================================

/// Target language of a tracking snippet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TrackingLanguage {
    /// `<script>` tag for web pages (default)
    #[default]
    Html,
    #[cfg_attr(feature = "cli", value(name = "typescript", alias = "ts"))]
    TypeScript,
    #[cfg_attr(feature = "cli", value(name = "javascript", alias = "js"))]
    JavaScript,
    Kotlin,
    Java,
    Swift,
}

impl TrackingLanguage {
    /// All languages, in the order the dashboard shows them
    pub const ALL: [TrackingLanguage; 6] = [
        TrackingLanguage::Html,
        TrackingLanguage::TypeScript,
        TrackingLanguage::JavaScript,
        TrackingLanguage::Kotlin,
        TrackingLanguage::Java,
        TrackingLanguage::Swift,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TrackingLanguage::Html => "HTML",
            TrackingLanguage::TypeScript => "TypeScript",
            TrackingLanguage::JavaScript => "JavaScript",
            TrackingLanguage::Kotlin => "Kotlin",
            TrackingLanguage::Java => "Java",
            TrackingLanguage::Swift => "Swift",
        }
    }

    fn template(&self) -> Option<&'static str> {
        match self {
            TrackingLanguage::Html => None,
            TrackingLanguage::TypeScript => Some(TS_TEMPLATE),
            TrackingLanguage::JavaScript => Some(JS_TEMPLATE),
            TrackingLanguage::Kotlin => Some(KOTLIN_TEMPLATE),
            TrackingLanguage::Java => Some(JAVA_TEMPLATE),
            TrackingLanguage::Swift => Some(SWIFT_TEMPLATE),
        }
    }
}

impl fmt::Display for TrackingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A generated snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingSnippet {
    pub language: TrackingLanguage,
    pub code: String,
}

// =============================================================================
// Args
// =============================================================================

/// Arguments for tracking code generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct TrackingCodeArgs {
    /// Website ID the snippet reports to
    #[cfg_attr(feature = "cli", clap(long))]
    pub website_id: String,

    /// Public URL of the dashboard, e.g. https://analytics.example.com
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub host_url: Option<String>,

    /// Path prefix the dashboard is served under
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub base_path: Option<String>,

    /// Comma-separated tracker script names, the first one is used
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub tracker_script_name: Option<String>,
}

impl TrackingCodeArgs {
    pub fn new(website_id: &str) -> Self {
        Self {
            website_id: website_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_host_url(mut self, host_url: &str) -> Self {
        self.host_url = Some(host_url.to_string());
        self
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = Some(base_path.to_string());
        self
    }

    pub fn with_tracker_script_name(mut self, name: &str) -> Self {
        self.tracker_script_name = Some(name.to_string());
        self
    }

    /// Fill unset values from the configuration
    pub fn with_config_defaults(mut self, config: &AppConfig) -> Self {
        if self.host_url.is_none() {
            self.host_url = config.host_url.clone();
        }
        if self.base_path.is_none() {
            self.base_path = Some(config.base_path.clone());
        }
        if self.tracker_script_name.is_none() {
            self.tracker_script_name = config.tracker_script_name.clone();
        }
        self
    }
}

// =============================================================================
// Lens
// =============================================================================

/// Tracking code generator for one website
pub struct TrackingCodeLens {
    website_id: String,
    origin: String,
    script_name: String,
}

impl TrackingCodeLens {
    pub fn new(args: &TrackingCodeArgs) -> Self {
        let host = args.host_url.as_deref().unwrap_or_default().trim_end_matches('/');
        let base_path = args
            .base_path
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/');

        let script_name = args
            .tracker_script_name
            .as_deref()
            .and_then(|names| names.split(',').map(str::trim).next())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SCRIPT_NAME);

        Self {
            website_id: args.website_id.clone(),
            origin: format!("{}{}", host, base_path),
            script_name: script_name.to_string(),
        }
    }

    /// URL of the tracker script
    ///
    /// An absolute script name (starting with `http`) is used as-is.
    pub fn script_url(&self) -> String {
        if self.script_name.starts_with("http") {
            self.script_name.clone()
        } else {
            format!("{}/{}", self.origin, self.script_name)
        }
    }

    /// Base URL the client snippets send events to
    pub fn endpoint(&self) -> &str {
        &self.origin
    }

    pub fn generate(&self, language: TrackingLanguage) -> String {
        match language.template() {
            None => format!(
                r#"<script defer src="{}" data-website-id="{}"></script>"#,
                self.script_url(),
                self.website_id
            ),
            Some(template) => template
                .replace("{{website_id}}", &self.website_id)
                .replace("{{host_url}}", self.endpoint()),
        }
    }

    pub fn generate_all(&self) -> Vec<TrackingSnippet> {
        TrackingLanguage::ALL
            .iter()
            .map(|&language| TrackingSnippet {
                language,
                code: self.generate(language),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEBSITE_ID: &str = "b59e9c65-ae32-47f1-8400-119fcf4861c4";

    #[test]
    fn test_html_snippet() {
        let args = TrackingCodeArgs::new(WEBSITE_ID)
            .with_host_url("https://stats.example.com/")
            .with_base_path("/analytics");
        let lens = TrackingCodeLens::new(&args);

        assert_eq!(
            lens.generate(TrackingLanguage::Html),
            r#"<script defer src="https://stats.example.com/analytics/script.js" data-website-id="b59e9c65-ae32-47f1-8400-119fcf4861c4"></script>"#
        );
        assert_eq!(lens.endpoint(), "https://stats.example.com/analytics");
    }

    #[test]
    fn test_first_configured_script_name() {
        let args = TrackingCodeArgs::new(WEBSITE_ID)
            .with_host_url("https://stats.example.com")
            .with_tracker_script_name(" insights.js , script.js");
        let lens = TrackingCodeLens::new(&args);
        assert_eq!(lens.script_url(), "https://stats.example.com/insights.js");

        let args = TrackingCodeArgs::new(WEBSITE_ID)
            .with_tracker_script_name("https://cdn.example.com/t.js,other.js");
        let lens = TrackingCodeLens::new(&args);
        assert_eq!(lens.script_url(), "https://cdn.example.com/t.js");
    }

    #[test]
    fn test_client_snippets_are_interpolated() {
        let args = TrackingCodeArgs::new(WEBSITE_ID).with_host_url("https://stats.example.com");
        let lens = TrackingCodeLens::new(&args);

        for snippet in lens.generate_all().iter().skip(1) {
            assert!(
                snippet.code.contains(WEBSITE_ID),
                "{} snippet lacks website id",
                snippet.language
            );
            assert!(snippet.code.contains("https://stats.example.com"));
            assert!(snippet.code.contains("/api/send"));
            assert!(snippet.code.contains("x-umami-cache"));
            assert!(!snippet.code.contains("{{"));
        }
    }

    #[test]
    fn test_generate_all_order() {
        let lens = TrackingCodeLens::new(&TrackingCodeArgs::new(WEBSITE_ID));
        let languages: Vec<TrackingLanguage> =
            lens.generate_all().into_iter().map(|s| s.language).collect();
        assert_eq!(languages, TrackingLanguage::ALL.to_vec());
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig {
            host_url: Some("https://stats.example.com".to_string()),
            base_path: "/umami".to_string(),
            tracker_script_name: Some("t.js".to_string()),
            ..Default::default()
        };
        let args = TrackingCodeArgs::new(WEBSITE_ID)
            .with_tracker_script_name("override.js")
            .with_config_defaults(&config);
        let lens = TrackingCodeLens::new(&args);
        assert_eq!(lens.script_url(), "https://stats.example.com/umami/override.js");
    }
}
