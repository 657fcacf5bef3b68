use super::PortalDriver;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

/// Scripted stand-in for a browser
#[derive(Default)]
pub(crate) struct FakeDriver {
    /// Served by `page_text` before falling back to `page`
    pub pages: VecDeque<String>,
    pub page: String,
    /// Replaces `page` once something is submitted
    pub on_submit: Option<String>,
    pub page_reads: usize,
    /// Successive answers of `count_elements`; the last one repeats
    pub result_counts: VecDeque<usize>,
    pub href: Option<String>,
    pub labels: HashMap<String, Vec<String>>,
    /// Where `trigger_download` drops a file, and its name
    pub download: Option<(PathBuf, String)>,
    pub broken_fields: Vec<String>,
    pub calls: Vec<String>,
}

impl FakeDriver {
    pub fn showing(page: &str) -> Self {
        Self {
            page: page.to_string(),
            ..Self::default()
        }
    }

    fn check_field(&self, name: &str) -> Result<()> {
        if self.broken_fields.iter().any(|f| f == name) {
            return Err(Error::Element(format!("no field named '{}'", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl PortalDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.calls.push(format!("navigate {}", url));
        Ok(())
    }

    async fn page_text(&mut self) -> Result<String> {
        self.page_reads += 1;
        Ok(self.pages.pop_front().unwrap_or_else(|| self.page.clone()))
    }

    async fn clear_field(&mut self, name: &str) -> Result<()> {
        self.calls.push(format!("clear {}", name));
        self.check_field(name)
    }

    async fn type_into(&mut self, name: &str, text: &str, submit: bool) -> Result<()> {
        self.check_field(name)?;
        let suffix = if submit { " +enter" } else { "" };
        self.calls.push(format!("type {} {}{}", name, text, suffix));
        if submit {
            if let Some(next) = self.on_submit.take() {
                self.page = next;
            }
        }
        Ok(())
    }

    async fn select_option(&mut self, name: &str, index: usize) -> Result<()> {
        self.check_field(name)?;
        self.calls.push(format!("select {} {}", name, index));
        Ok(())
    }

    async fn option_labels(&mut self, name: &str) -> Result<Vec<String>> {
        self.check_field(name)?;
        Ok(self.labels.get(name).cloned().unwrap_or_default())
    }

    async fn count_elements(&mut self, _xpath: &str) -> Result<usize> {
        let count = if self.result_counts.len() > 1 {
            self.result_counts.pop_front()
        } else {
            self.result_counts.front().copied()
        };
        Ok(count.unwrap_or(1))
    }

    async fn link_href(&mut self, xpath: &str) -> Result<String> {
        self.href
            .clone()
            .ok_or_else(|| Error::Element(format!("nothing matches {}", xpath)))
    }

    async fn trigger_download(&mut self, url: &str) -> Result<()> {
        self.calls.push(format!("download {}", url));
        if let Some((dir, name)) = &self.download {
            std::fs::write(dir.join(name), b"PK")?;
        }
        Ok(())
    }
}
