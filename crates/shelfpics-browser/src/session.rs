use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shelfpics_core::portal::PortalDriver;
use std::fmt::Display;
use std::path::PathBuf;
use tokio::task::JoinHandle;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// How to start the browser for a run
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Chrome executable; chromiumoxide looks for one when unset
    pub chrome_path: Option<PathBuf>,
    pub profile_dir: PathBuf,
    /// Where downloads are saved without asking
    pub download_dir: PathBuf,
    pub headless: bool,
}

/// A single Chrome tab driven over the DevTools protocol
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chrome and open the tab the whole run works in
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&options.profile_dir)
            .viewport(None)
            .arg("--start-maximized")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled");

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(Error::Browser)?;

        tracing::info!(
            "Launching Chrome (profile {}, headless: {})",
            options.profile_dir.display(),
            options.headless
        );
        let (browser, mut handler) = Browser::launch(config).await?;

        // The handler must be polled for any command to complete
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        let mut downloads = SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Allow);
        downloads.download_path = Some(options.download_dir.display().to_string());
        browser.execute(downloads).await?;
        tracing::debug!("Downloads go to {}", options.download_dir.display());

        let page = browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT)).await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER))
            .await?;

        tracing::info!("Chrome session ready");
        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Close Chrome and wait for the process to exit
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for Chrome to exit failed: {}", e);
        }
        self.handler_task.abort();
        tracing::info!("Chrome closed");
        Ok(())
    }

    async fn field(&self, name: &str) -> shelfpics_core::Result<Element> {
        self.page
            .find_element(field_selector(name))
            .await
            .map_err(|e| interaction("find field", name, e))
    }

    /// Evaluate a JavaScript expression and deserialize its value
    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .build()
            .map_err(Error::Cdp)?;

        let result = self.page.evaluate_expression(params).await?;
        result
            .into_value()
            .map_err(|e| Error::Cdp(format!("unexpected script result: {}", e)))
    }
}

/// Script result for lookups that may come up empty
#[derive(Debug, Deserialize)]
struct Lookup<T> {
    found: bool,
    value: Option<T>,
}

impl<T> Lookup<T> {
    fn into_option(self) -> Option<T> {
        if self.found { self.value } else { None }
    }
}

fn field_selector(name: &str) -> String {
    format!("[name=\"{}\"]", name)
}

/// JavaScript string literal for `text`
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn interaction(action: &str, target: &str, err: impl Display) -> shelfpics_core::Error {
    shelfpics_core::Error::Element(format!("{} '{}': {}", action, target, err))
}

#[async_trait]
impl PortalDriver for ChromeSession {
    async fn navigate(&mut self, url: &str) -> shelfpics_core::Result<()> {
        tracing::debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| interaction("navigate to", url, e))?;
        Ok(())
    }

    async fn page_text(&mut self) -> shelfpics_core::Result<String> {
        let mut text = self
            .page
            .content()
            .await
            .map_err(|e| interaction("read", "page source", e))?;

        if let Ok(body) = self.page.find_element("body").await {
            if let Ok(Some(rendered)) = body.inner_text().await {
                text.push_str(&rendered);
            }
        }
        Ok(text)
    }

    async fn clear_field(&mut self, name: &str) -> shelfpics_core::Result<()> {
        let script = format!(
            "(() => {{ \
                const el = document.querySelector({selector}); \
                if (!el) return false; \
                el.focus(); \
                if (typeof el.select === 'function') el.select(); \
                document.execCommand('delete'); \
                if (el.value) {{ el.value = ''; }} \
                el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                return true; \
            }})()",
            selector = js_string(&field_selector(name))
        );

        match self.eval::<bool>(script).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(interaction("clear", name, "no such field")),
            Err(e) => Err(interaction("clear", name, e)),
        }
    }

    async fn type_into(&mut self, name: &str, text: &str, submit: bool) -> shelfpics_core::Result<()> {
        let field = self.field(name).await?;
        field
            .click()
            .await
            .map_err(|e| interaction("focus", name, e))?;
        field
            .type_str(text)
            .await
            .map_err(|e| interaction("type into", name, e))?;
        if submit {
            field
                .press_key("Enter")
                .await
                .map_err(|e| interaction("submit", name, e))?;
        }
        Ok(())
    }

    async fn select_option(&mut self, name: &str, index: usize) -> shelfpics_core::Result<()> {
        let script = format!(
            "(() => {{ \
                const el = document.querySelector({selector}); \
                if (!el || !el.options || {index} >= el.options.length) return false; \
                el.selectedIndex = {index}; \
                el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                return true; \
            }})()",
            selector = js_string(&field_selector(name)),
            index = index
        );

        match self.eval::<bool>(script).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(interaction("select option in", name, format!("no option {}", index))),
            Err(e) => Err(interaction("select option in", name, e)),
        }
    }

    async fn option_labels(&mut self, name: &str) -> shelfpics_core::Result<Vec<String>> {
        let script = format!(
            "(() => {{ \
                const el = document.querySelector({selector}); \
                if (!el || !el.options) return {{ found: false }}; \
                return {{ found: true, value: Array.from(el.options) \
                    .map(o => o.innerText.replace(/\\n/g, '').trim()) }}; \
            }})()",
            selector = js_string(&field_selector(name))
        );

        self.eval::<Lookup<Vec<String>>>(script)
            .await
            .map_err(|e| interaction("read options of", name, e))?
            .into_option()
            .ok_or_else(|| interaction("read options of", name, "no such drop-down"))
    }

    async fn count_elements(&mut self, xpath: &str) -> shelfpics_core::Result<usize> {
        let script = format!(
            "document.evaluate({xpath}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
            xpath = js_string(xpath)
        );

        self.eval::<usize>(script)
            .await
            .map_err(|e| interaction("count", xpath, e))
    }

    async fn link_href(&mut self, xpath: &str) -> shelfpics_core::Result<String> {
        let script = format!(
            "(() => {{ \
                const node = document.evaluate({xpath}, document, null, \
                    XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue; \
                const href = node ? (node.href || node.getAttribute('href')) : null; \
                return href ? {{ found: true, value: href }} : {{ found: false }}; \
            }})()",
            xpath = js_string(xpath)
        );

        self.eval::<Lookup<String>>(script)
            .await
            .map_err(|e| interaction("read link", xpath, e))?
            .into_option()
            .ok_or_else(|| interaction("read link", xpath, "no matching element"))
    }

    async fn trigger_download(&mut self, url: &str) -> shelfpics_core::Result<()> {
        tracing::debug!("Requesting download {}", url);
        let script = format!(
            "(() => {{ window.location.assign({}); return true; }})()",
            js_string(url)
        );
        self.eval::<bool>(script)
            .await
            .map_err(|e| interaction("download", url, e))?;
        Ok(())
    }
}
