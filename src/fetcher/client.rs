/// Upstream dictionary HTTP client.
///
/// This module provides `HttpPageSource` for making synchronous requests to the
/// dictionary site, the `PageSource` trait used to mock it, and the typed
/// errors shared with the retry layer.
use std::time::Duration;

use thiserror::Error;

use crate::extractor::ExtractError;

/// Default search URL template. `{word}` and `{locale}` are substituted.
pub const DEFAULT_URL_TEMPLATE: &str = "https://cn.bing.com/dict/search?q={word}&mkt={locale}";

/// Default market/locale parameter.
pub const DEFAULT_LOCALE: &str = "zh-cn";

/// Errors that can occur while fetching and reading a dictionary page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failures, DNS resolution and other transport errors
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The page could not be parsed at all
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Invalid URL configuration
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Every attempt failed; carries the last cause
    #[error("Giving up after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Maps a transport error to `Timeout` or `Network`.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }

    /// The innermost cause, looking through `RetriesExhausted`.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

/// Trait for the upstream page boundary.
///
/// This trait enables mocking in unit tests; nothing else in the crate
/// touches the network.
pub trait PageSource: Send + Sync {
    /// Returns the raw HTML of the search page for `word`.
    fn fetch_page(&self, word: &str) -> Result<String, FetchError>;
}

/// Builder for constructing `HttpPageSource` instances.
///
/// # Examples
///
/// ```
/// use wordbank::fetcher::HttpPageSourceBuilder;
///
/// let source = HttpPageSourceBuilder::new()
///     .url_template("https://dict.example.com/search?q={word}&mkt={locale}")
///     .locale("zh-cn")
///     .build()
///     .expect("Failed to create source");
/// assert_eq!(source.url_for("hello"), "https://dict.example.com/search?q=hello&mkt=zh-cn");
/// ```
#[derive(Debug, Default)]
pub struct HttpPageSourceBuilder {
    url_template: Option<String>,
    locale: Option<String>,
    timeout: Option<Duration>,
}

impl HttpPageSourceBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search URL template (`{word}` and `{locale}` placeholders).
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    /// Sets the locale substituted for `{locale}`.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `HttpPageSource`.
    ///
    /// # Environment Variables
    ///
    /// If `url_template()` was not called, `WORDBANK_SOURCE_URL` is used, then
    /// [`DEFAULT_URL_TEMPLATE`]. If `locale()` was not called,
    /// `WORDBANK_LOCALE` is used, then [`DEFAULT_LOCALE`].
    pub fn build(self) -> Result<HttpPageSource, FetchError> {
        let url_template = self.url_template.unwrap_or_else(|| {
            std::env::var("WORDBANK_SOURCE_URL").unwrap_or_else(|_| DEFAULT_URL_TEMPLATE.to_string())
        });
        let locale = self.locale.unwrap_or_else(|| {
            std::env::var("WORDBANK_LOCALE").unwrap_or_else(|_| DEFAULT_LOCALE.to_string())
        });
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        if !url_template.contains("{word}") {
            return Err(FetchError::InvalidUrl(format!(
                "{url_template}: template has no {{word}} placeholder"
            )));
        }
        let probe = render_url(&url_template, "probe", &locale);
        reqwest::Url::parse(&probe)
            .map_err(|e| FetchError::InvalidUrl(format!("{url_template}: {e}")))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("wordbank/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Network)?;

        Ok(HttpPageSource {
            client,
            url_template,
            locale,
        })
    }
}

/// Synchronous HTTP client for the dictionary search page.
pub struct HttpPageSource {
    client: reqwest::blocking::Client,
    url_template: String,
    locale: String,
}

impl HttpPageSource {
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// The concrete search URL for `word`.
    pub fn url_for(&self, word: &str) -> String {
        render_url(&self.url_template, word, &self.locale)
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, word: &str) -> Result<String, FetchError> {
        let url = self.url_for(word);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        response.text().map_err(FetchError::from_transport)
    }
}

fn render_url(template: &str, word: &str, locale: &str) -> String {
    template
        .replace("{word}", &urlencoding::encode(word))
        .replace("{locale}", &urlencoding::encode(locale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::error::Error;

    #[test]
    fn http_error_variant_with_status_code() {
        let error = FetchError::Http { status: 404 };
        let msg = format!("{error}");
        assert!(msg.contains("HTTP error"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn exhausted_error_exposes_last_cause() {
        let error = FetchError::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchError::Http { status: 503 }),
        };

        assert!(format!("{error}").contains("3 attempt(s)"));
        assert!(error.source().is_some());
        assert!(matches!(error.root_cause(), FetchError::Http { status: 503 }));
    }

    #[test]
    fn network_error_variant_display() {
        let reqwest_error = reqwest::blocking::Client::new()
            .get("not-a-valid-url")
            .build()
            .unwrap_err();
        let error = FetchError::from_transport(reqwest_error);
        assert!(format!("{error}").contains("Network error"));
    }

    #[test]
    fn url_template_substitutes_and_encodes() {
        let source = HttpPageSourceBuilder::new()
            .url_template("https://dict.test/search?q={word}&mkt={locale}")
            .locale("zh-cn")
            .build()
            .unwrap();

        assert_eq!(
            source.url_for("ice cream"),
            "https://dict.test/search?q=ice%20cream&mkt=zh-cn"
        );
        assert_eq!(
            source.url_for("café"),
            "https://dict.test/search?q=caf%C3%A9&mkt=zh-cn"
        );
    }

    #[test]
    fn template_without_word_placeholder_is_rejected() {
        let result = HttpPageSourceBuilder::new()
            .url_template("https://dict.test/search")
            .build();
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn unparseable_template_is_rejected() {
        let result = HttpPageSourceBuilder::new()
            .url_template("not a url {word}")
            .build();
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    #[serial]
    fn build_uses_defaults_when_env_not_set() {
        unsafe {
            std::env::remove_var("WORDBANK_SOURCE_URL");
            std::env::remove_var("WORDBANK_LOCALE");
        }

        let source = HttpPageSourceBuilder::new().build().unwrap();

        assert_eq!(source.url_template(), DEFAULT_URL_TEMPLATE);
        assert_eq!(source.locale(), DEFAULT_LOCALE);
    }

    #[test]
    #[serial]
    fn builder_values_take_precedence_over_environment() {
        unsafe {
            std::env::set_var("WORDBANK_LOCALE", "en-us");
        }

        let from_env = HttpPageSourceBuilder::new().build().unwrap();
        let explicit = HttpPageSourceBuilder::new().locale("zh-tw").build().unwrap();

        assert_eq!(from_env.locale(), "en-us");
        assert_eq!(explicit.locale(), "zh-tw");

        unsafe {
            std::env::remove_var("WORDBANK_LOCALE");
        }
    }

    #[test]
    fn trait_can_be_implemented_by_mock_struct() {
        struct Fixed(&'static str);

        impl PageSource for Fixed {
            fn fetch_page(&self, _word: &str) -> Result<String, FetchError> {
                Ok(self.0.to_string())
            }
        }

        let source: &dyn PageSource = &Fixed("<html></html>");
        assert_eq!(source.fetch_page("x").unwrap(), "<html></html>");
    }
}
