use crate::Result;
use async_trait::async_trait;

/// Browser capabilities the portal workflow needs.
///
/// Form fields are addressed by their `name` attribute, lists and links by
/// XPath. Every failure is reported as [`crate::Error::Element`].
#[async_trait]
pub trait PortalDriver: Send {
    /// Load `url` in the current tab
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Page source followed by the rendered body text
    async fn page_text(&mut self) -> Result<String>;

    /// Empty a text field the way a user would (select all, delete)
    async fn clear_field(&mut self, name: &str) -> Result<()>;

    /// Type into a field, optionally pressing Enter afterwards
    async fn type_into(&mut self, name: &str, text: &str, submit: bool) -> Result<()>;

    /// Pick the option at `index` of a `<select>`
    async fn select_option(&mut self, name: &str, index: usize) -> Result<()>;

    /// Visible labels of a `<select>`'s options, in order
    async fn option_labels(&mut self, name: &str) -> Result<Vec<String>>;

    /// Number of elements matching an XPath expression
    async fn count_elements(&mut self, xpath: &str) -> Result<usize>;

    /// `href` of the first element matching an XPath expression
    async fn link_href(&mut self, xpath: &str) -> Result<String>;

    /// Start a file download from `url` without waiting for a page load
    async fn trigger_download(&mut self, url: &str) -> Result<()>;
}
