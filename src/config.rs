//! Configuration types for a gazette watch run.
//!
//! Everything a run needs lives in one [`WatchConfig`], built via
//! [`WatchConfigBuilder`] and passed explicitly to [`crate::run`]. The CLI
//! fills it from flags and environment variables; library callers set only
//! the fields they care about and rely on the defaults for the rest.
//!
//! [`WatchConfigBuilder::build`] validates everything that can be checked
//! offline (search phrase, URL, selector, regex, mail addresses) so that a
//! misconfigured job fails before it touches the network.

use crate::error::GazetteError;
use crate::pipeline::notify::parse_mailbox;
use crate::pipeline::scan::{SearchTerm, DEFAULT_SNIPPET_RADIUS};
use crate::progress::{ProgressCallback, RunProgressCallback};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// "Latest edition" page of the São Paulo municipal gazette.
pub const DEFAULT_PAGE_URL: &str =
    "https://diariooficial.prefeitura.sp.gov.br/md_epubli_controlador.php?acao=edicao_ver_ultima";

pub const DEFAULT_TERM: &str = "conservação de pavimento";

/// CSS selector of the anchor that links the edition's PDF.
pub const DEFAULT_LINK_SELECTOR: &str = r#"a[data-format="pdf"]"#;

pub const DEFAULT_LINK_ATTRIBUTE: &str = "href";

/// Matches the `href` of an anchor marked `data-format="pdf"`, in either
/// attribute order. One of the two groups captures the link.
pub const DEFAULT_LINK_PATTERN: &str = r#"(?is)<a\b[^>]*?(?:\bhref\s*=\s*["']([^"']+)["'][^>]*?\bdata-format\s*=\s*["']pdf["']|\bdata-format\s*=\s*["']pdf["'][^>]*?\bhref\s*=\s*["']([^"']+)["'])"#;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Implicit TLS (SMTPS).
pub const DEFAULT_SMTP_PORT: u16 = 465;

pub const DEFAULT_SUBJECT: &str = "Alerta Diário Oficial SP";

pub const DEFAULT_ATTACHMENT_NAME: &str = "gazette.pdf";

/// How the PDF link is located on the index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrategy {
    /// Render the page in headless Chromium and read the link attribute
    /// once scripts have run. Needs the `browser` feature.
    Browser,
    /// Fetch the raw HTML and query it with a CSS selector. (default)
    #[default]
    Dom,
    /// Fetch the raw HTML and apply a regular expression.
    Regex,
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkStrategy::Browser => "browser",
            LinkStrategy::Dom => "dom",
            LinkStrategy::Regex => "regex",
        })
    }
}

impl std::str::FromStr for LinkStrategy {
    type Err = GazetteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(LinkStrategy::Browser),
            "dom" | "html" => Ok(LinkStrategy::Dom),
            "regex" => Ok(LinkStrategy::Regex),
            other => Err(GazetteError::InvalidConfig(format!(
                "unknown link strategy '{other}' (expected browser, dom or regex)"
            ))),
        }
    }
}

/// SMTP and message settings.
#[derive(Clone)]
pub struct MailConfig {
    /// Sender address; also the SMTP login.
    pub sender: String,
    /// SMTP password (an app password for Gmail).
    pub password: String,
    /// Comma-separated recipient list. `None` sends to the sender.
    pub recipients: Option<String>,
    pub smtp_host: String,
    /// 465 connects with implicit TLS, anything else upgrades with STARTTLS.
    pub smtp_port: u16,
    pub subject: String,
    pub attachment_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            password: String::new(),
            recipients: None,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            subject: DEFAULT_SUBJECT.to_string(),
            attachment_name: DEFAULT_ATTACHMENT_NAME.to_string(),
        }
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &self.sender)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("recipients", &self.recipients)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("subject", &self.subject)
            .field("attachment_name", &self.attachment_name)
            .finish()
    }
}

impl MailConfig {
    /// Recipient addresses: the comma-separated list split and trimmed,
    /// empty entries dropped. Falls back to the sender.
    pub fn recipient_list(&self) -> Vec<String> {
        let list: Vec<String> = self
            .recipients
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if list.is_empty() {
            vec![self.sender.clone()]
        } else {
            list
        }
    }
}

/// Configuration for one watch run.
///
/// Built via [`WatchConfig::builder()`].
///
/// # Example
/// ```rust
/// use gazette_watch::{LinkStrategy, WatchConfig};
///
/// let config = WatchConfig::builder()
///     .term("conservação de pavimento")
///     .strategy(LinkStrategy::Regex)
///     .sender("alerts@example.org")
///     .password("app-password")
///     .recipients("a@example.org,b@example.org")
///     .build()
///     .unwrap();
/// assert_eq!(config.mail.recipient_list().len(), 2);
/// ```
#[derive(Clone)]
pub struct WatchConfig {
    /// Index page that links the current edition.
    pub page_url: String,

    /// Phrase to search for. Default: [`DEFAULT_TERM`].
    pub term: String,

    /// Link resolution strategy. Default: [`LinkStrategy::Dom`].
    pub strategy: LinkStrategy,

    /// CSS selector for the PDF anchor (browser and dom strategies).
    pub link_selector: String,

    /// Attribute holding the link (browser and dom strategies).
    pub link_attribute: String,

    /// Regular expression for the regex strategy. The first capture group
    /// that participates in the match is the link; with no groups, the whole
    /// match is.
    pub link_pattern: String,

    /// Seconds to let the page's scripts run before reading the link. Default: 5.
    pub browser_settle_secs: u64,

    /// Connect/read timeout for the index page. Default: 30.
    pub page_timeout_secs: u64,

    /// Timeout for the PDF download. Default: 120.
    pub download_timeout_secs: u64,

    /// Fixed download location. `None` uses a fresh temporary directory.
    /// The file is removed at the end of the run either way.
    pub download_path: Option<PathBuf>,

    /// Characters of context on each side of a match. Default: 50.
    pub snippet_radius: usize,

    /// Compose the notification but do not send it. Default: false.
    pub dry_run: bool,

    pub mail: MailConfig,

    /// Stage events receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            term: DEFAULT_TERM.to_string(),
            strategy: LinkStrategy::default(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            link_attribute: DEFAULT_LINK_ATTRIBUTE.to_string(),
            link_pattern: DEFAULT_LINK_PATTERN.to_string(),
            browser_settle_secs: 5,
            page_timeout_secs: 30,
            download_timeout_secs: 120,
            download_path: None,
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            dry_run: false,
            mail: MailConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchConfig")
            .field("page_url", &self.page_url)
            .field("term", &self.term)
            .field("strategy", &self.strategy)
            .field("link_selector", &self.link_selector)
            .field("link_attribute", &self.link_attribute)
            .field("link_pattern", &self.link_pattern)
            .field("browser_settle_secs", &self.browser_settle_secs)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("download_path", &self.download_path)
            .field("snippet_radius", &self.snippet_radius)
            .field("dry_run", &self.dry_run)
            .field("mail", &self.mail)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl WatchConfig {
    /// Create a new builder for `WatchConfig`.
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// The validated search term.
    pub fn search_term(&self) -> Result<SearchTerm, GazetteError> {
        SearchTerm::new(&self.term)
    }
}

/// Builder for [`WatchConfig`].
#[derive(Debug)]
pub struct WatchConfigBuilder {
    config: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.config.page_url = url.into();
        self
    }

    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.config.term = term.into();
        self
    }

    pub fn strategy(mut self, strategy: LinkStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn link_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.link_selector = selector.into();
        self
    }

    pub fn link_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.config.link_attribute = attribute.into();
        self
    }

    pub fn link_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.link_pattern = pattern.into();
        self
    }

    pub fn browser_settle_secs(mut self, secs: u64) -> Self {
        self.config.browser_settle_secs = secs;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn download_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.download_path = Some(path.into());
        self
    }

    pub fn snippet_radius(mut self, radius: usize) -> Self {
        self.config.snippet_radius = radius;
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.config.dry_run = v;
        self
    }

    pub fn sender(mut self, address: impl Into<String>) -> Self {
        self.config.mail.sender = address.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.mail.password = password.into();
        self
    }

    pub fn recipients(mut self, list: impl Into<String>) -> Self {
        self.config.mail.recipients = Some(list.into());
        self
    }

    pub fn smtp_host(mut self, host: impl Into<String>) -> Self {
        self.config.mail.smtp_host = host.into();
        self
    }

    pub fn smtp_port(mut self, port: u16) -> Self {
        self.config.mail.smtp_port = port;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.config.mail.subject = subject.into();
        self
    }

    pub fn attachment_name(mut self, name: impl Into<String>) -> Self {
        self.config.mail.attachment_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn RunProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WatchConfig, GazetteError> {
        let c = &self.config;

        SearchTerm::new(&c.term)?;

        reqwest::Url::parse(&c.page_url).map_err(|e| {
            GazetteError::InvalidConfig(format!("page URL '{}': {}", c.page_url, e))
        })?;

        match c.strategy {
            LinkStrategy::Browser | LinkStrategy::Dom => {
                scraper::Selector::parse(&c.link_selector).map_err(|e| {
                    GazetteError::InvalidConfig(format!(
                        "CSS selector '{}': {}",
                        c.link_selector, e
                    ))
                })?;
                if c.link_attribute.trim().is_empty() {
                    return Err(GazetteError::InvalidConfig(
                        "link attribute must not be empty".into(),
                    ));
                }
            }
            LinkStrategy::Regex => {
                Regex::new(&c.link_pattern).map_err(|e| {
                    GazetteError::InvalidConfig(format!("link pattern: {}", e))
                })?;
            }
        }

        if c.strategy == LinkStrategy::Browser && !cfg!(feature = "browser") {
            return Err(GazetteError::InvalidConfig(
                "the browser strategy needs a build with the `browser` feature".into(),
            ));
        }

        if c.mail.sender.trim().is_empty() {
            return Err(GazetteError::MissingSetting {
                name: "EMAIL_REMETENTE".into(),
            });
        }
        if c.mail.password.is_empty() && !c.dry_run {
            return Err(GazetteError::MissingSetting {
                name: "EMAIL_SENHA".into(),
            });
        }
        parse_mailbox(&c.mail.sender)?;
        for address in c.mail.recipient_list() {
            parse_mailbox(&address)?;
        }
        if c.mail.smtp_port == 0 {
            return Err(GazetteError::InvalidConfig("SMTP port must be ≥ 1".into()));
        }

        Ok(self.config)
    }
}
