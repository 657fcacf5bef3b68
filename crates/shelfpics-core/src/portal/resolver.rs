use super::auth::clear_softly;
use super::{PortalDriver, fields};
use crate::catalog::CatalogRecord;
use crate::classify::{LookupKind, classify, search_term};
use crate::config::DownloadMatch;
use crate::download::{archive_name, claim_download, rename_long_named, snapshot, wait_for_new_file};
use crate::poll::{PollPolicy, pause};
use crate::{Error, Result, Settings};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Filter choices offered by the portal's search form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortalOptions {
    pub brands: Vec<String>,
    pub product_types: Vec<String>,
}

impl PortalOptions {
    /// Read the brand and product type drop-downs of the search form
    pub async fn read<D>(driver: &mut D) -> Result<Self>
    where
        D: PortalDriver + ?Sized,
    {
        let brands = driver.option_labels(fields::BRAND).await?;
        let product_types = driver.option_labels(fields::PRODUCT_TYPE).await?;
        tracing::debug!("Portal brands: {:?}", brands);
        tracing::debug!("Portal product types: {:?}", product_types);

        Ok(Self {
            brands,
            product_types,
        })
    }

    /// Index of the brand option naming `trademark`.
    ///
    /// Option 0 is the "any brand" placeholder and never matches. An exact
    /// case-insensitive match beats a partial one.
    pub fn brand_index(&self, trademark: &str) -> Option<usize> {
        let wanted = trademark.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        let labels: Vec<(usize, String)> = self
            .brands
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, label)| (i, label.trim().to_lowercase()))
            .collect();

        labels
            .iter()
            .find(|(_, label)| *label == wanted)
            .or_else(|| labels.iter().find(|(_, label)| label.contains(&wanted)))
            .map(|(i, _)| *i)
    }
}

/// What fetching one catalog record produced
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedItem {
    pub record: CatalogRecord,
    pub lookup: LookupKind,
    pub model: String,
    pub download_url: String,
    /// Renamed archive, if a download was identified
    pub archive: Option<PathBuf>,
}

/// Looks catalog records up on the portal and downloads their pictures
pub struct ItemResolver<'a> {
    settings: &'a Settings,
    options: PortalOptions,
    step_pause: Duration,
    settle: Duration,
    download_policy: PollPolicy,
}

impl<'a> ItemResolver<'a> {
    pub fn new(settings: &'a Settings, options: PortalOptions) -> Self {
        Self {
            settings,
            options,
            step_pause: Duration::from_secs(1),
            settle: Duration::from_secs(3),
            download_policy: PollPolicy::per_second(settings.download_pause),
        }
    }

    /// Override the pauses taken after each search and after a download
    /// starts, and the policy used to wait for the downloaded file
    pub fn with_timing(mut self, step_pause: Duration, settle: Duration, download: PollPolicy) -> Self {
        self.step_pause = step_pause;
        self.settle = settle;
        self.download_policy = download;
        self
    }

    /// Search for one record, follow its first hit and download the
    /// model's picture archive into the working directory
    pub async fn resolve<D>(&self, driver: &mut D, record: &CatalogRecord) -> Result<ResolvedItem>
    where
        D: PortalDriver + ?Sized,
    {
        if record.item_code.trim().is_empty() {
            return Err(Error::Element(format!(
                "record without an item code (trademark '{}', type '{}')",
                record.trademark, record.product_type
            )));
        }

        self.reset_filters(driver).await?;

        let term = search_term(&record.item_code);
        let lookup = classify(term);
        tracing::info!("{}: searching by {}", term, lookup);

        self.search(driver, lookup, term).await?;

        let mut hits = driver.count_elements(fields::RESULTS).await?;
        if hits > 1 {
            hits = self.narrow_by_trademark(driver, record, lookup, term, hits).await?;
        }
        tracing::debug!("{}: {} result(s)", term, hits);

        let href = driver.link_href(fields::FIRST_RESULT_LINK).await?;
        let model = model_id_from_href(&href).ok_or_else(|| {
            Error::Element(format!("no model id in result link '{}'", href))
        })?;

        let download_url = self.settings.model_download_url(&model);
        tracing::info!("{}: model {}, downloading {}", term, model, download_url);

        let archive = self.download(driver, &download_url, &record.item_code).await?;

        Ok(ResolvedItem {
            record: record.clone(),
            lookup,
            model,
            download_url,
            archive,
        })
    }

    async fn reset_filters<D>(&self, driver: &mut D) -> Result<()>
    where
        D: PortalDriver + ?Sized,
    {
        clear_softly(driver, fields::NAME).await;
        clear_softly(driver, fields::SKU).await;
        driver.select_option(fields::BRAND, 0).await
    }

    async fn search<D>(&self, driver: &mut D, lookup: LookupKind, term: &str) -> Result<()>
    where
        D: PortalDriver + ?Sized,
    {
        clear_softly(driver, lookup.field()).await;
        driver.type_into(lookup.field(), term, true).await?;
        pause(self.step_pause).await;
        Ok(())
    }

    /// Restrict an ambiguous search to the record's trademark and search
    /// again. Returns the new hit count; the first hit is used either way.
    async fn narrow_by_trademark<D>(
        &self,
        driver: &mut D,
        record: &CatalogRecord,
        lookup: LookupKind,
        term: &str,
        hits: usize,
    ) -> Result<usize>
    where
        D: PortalDriver + ?Sized,
    {
        let Some(index) = self.options.brand_index(&record.trademark) else {
            tracing::warn!(
                "{}: {} results and no brand matching '{}', taking the first",
                term,
                hits,
                record.trademark
            );
            return Ok(hits);
        };

        tracing::info!(
            "{}: {} results, narrowing to brand '{}'",
            term,
            hits,
            self.options.brands[index].trim()
        );
        driver.select_option(fields::BRAND, index).await?;
        pause(self.step_pause).await;
        self.search(driver, lookup, term).await?;

        let narrowed = driver.count_elements(fields::RESULTS).await?;
        if narrowed > 1 {
            tracing::warn!("{}: still {} results, taking the first", term, narrowed);
        }
        Ok(narrowed)
    }

    async fn download<D>(&self, driver: &mut D, url: &str, item_code: &str) -> Result<Option<PathBuf>>
    where
        D: PortalDriver + ?Sized,
    {
        let dir = &self.settings.base_dir;

        match self.settings.download_match {
            DownloadMatch::Snapshot => {
                let before = snapshot(dir)?;
                driver.trigger_download(url).await?;

                let downloaded = wait_for_new_file(dir, &before, &self.download_policy)
                    .await?
                    .ok_or_else(|| {
                        Error::Download(format!(
                            "nothing arrived in {} for {} within {}s",
                            dir.display(),
                            item_code,
                            self.settings.download_pause.as_secs()
                        ))
                    })?;
                claim_download(dir, &downloaded, item_code).map(Some)
            }
            DownloadMatch::Length => {
                driver.trigger_download(url).await?;
                pause(self.settle).await;

                if rename_long_named(dir, item_code)?.is_empty() {
                    tracing::warn!("{}: no downloaded file found", item_code);
                    return Ok(None);
                }
                Ok(Some(dir.join(archive_name(item_code))))
            }
        }
    }
}

/// Model identifier carried by a search result link (text after the last `=`)
pub fn model_id_from_href(href: &str) -> Option<String> {
    let (_, id) = href.rsplit_once('=')?;
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::fake::FakeDriver;

    fn settings(dir: &std::path::Path, extra: &str) -> Settings {
        Settings::from_ini_str(&format!(
            "[Settings]\nLOGIN = a\nPASSWORD = b\nBASE_DIR = {}\n{}",
            dir.display(),
            extra
        ))
        .unwrap()
    }

    fn record(code: &str, trademark: &str) -> CatalogRecord {
        CatalogRecord {
            item_code: code.to_string(),
            trademark: trademark.to_string(),
            product_type: "tights".to_string(),
        }
    }

    fn quick<'a>(settings: &'a Settings, options: PortalOptions) -> ItemResolver<'a> {
        ItemResolver::new(settings, options).with_timing(
            Duration::ZERO,
            Duration::ZERO,
            PollPolicy::new(3, Duration::ZERO),
        )
    }

    fn brands() -> PortalOptions {
        PortalOptions {
            brands: vec![
                "Все бренды".to_string(),
                "Conte Elegant".to_string(),
                "Conte".to_string(),
            ],
            product_types: vec![],
        }
    }

    #[test]
    fn test_model_id_from_href() {
        assert_eq!(
            model_id_from_href("https://contebank.com/model?id=5521"),
            Some("5521".to_string())
        );
        assert_eq!(model_id_from_href("/catalog?a=1&model=77"), Some("77".to_string()));
        assert_eq!(model_id_from_href("https://contebank.com/model/5521"), None);
        assert_eq!(model_id_from_href("/model?id="), None);
    }

    #[test]
    fn test_brand_index_prefers_exact_match() {
        let options = brands();
        assert_eq!(options.brand_index("conte"), Some(2));
        assert_eq!(options.brand_index("Elegant"), Some(1));
        assert_eq!(options.brand_index("Все бренды"), None);
        assert_eq!(options.brand_index(""), None);
        assert_eq!(options.brand_index("Other"), None);
    }

    #[tokio::test]
    async fn test_sku_lookup_downloads_and_renames() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.href = Some("https://contebank.com/model?id=5521".to_string());
        driver.download = Some((temp.path().to_path_buf(), "models_5521_photos.zip".to_string()));

        let item = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("4711", "Conte"))
            .await
            .unwrap();

        assert_eq!(item.lookup, LookupKind::Sku);
        assert_eq!(item.model, "5521");
        assert_eq!(item.archive, Some(temp.path().join("4711.zip")));
        assert!(temp.path().join("4711.zip").exists());
        assert_eq!(
            driver.calls,
            vec![
                "clear name",
                "clear sku_mf",
                "select brand_id 0",
                "clear sku_mf",
                "type sku_mf 4711 +enter",
                "download https://contebank.com/downloadAll/5521",
            ]
        );
    }

    #[tokio::test]
    async fn test_name_lookup_uses_name_field() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.href = Some("/model?id=9".to_string());
        driver.download = Some((temp.path().to_path_buf(), "x.zip".to_string()));

        let item = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("Bella", ""))
            .await
            .unwrap();

        assert_eq!(item.lookup, LookupKind::Name);
        assert!(driver.calls.contains(&"type name Bella +enter".to_string()));
    }

    #[tokio::test]
    async fn test_ambiguous_results_narrowed_by_trademark() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.result_counts = [3, 1].into_iter().collect();
        driver.href = Some("/model?id=12".to_string());
        driver.download = Some((temp.path().to_path_buf(), "pics.zip".to_string()));

        quick(&settings, brands())
            .resolve(&mut driver, &record("Fantasy 40", "Conte"))
            .await
            .unwrap();

        let select = driver.calls.iter().position(|c| c == "select brand_id 2").unwrap();
        let searches: Vec<usize> = driver
            .calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == "type sku_mf 40 +enter")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(searches.len(), 2);
        assert!(searches[0] < select && select < searches[1]);
        assert!(temp.path().join("Fantasy 40.zip").exists());
    }

    #[tokio::test]
    async fn test_unmatched_trademark_keeps_first_result() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.result_counts = [4].into_iter().collect();
        driver.href = Some("/model?id=1".to_string());
        driver.download = Some((temp.path().to_path_buf(), "pics.zip".to_string()));

        let item = quick(&settings, brands())
            .resolve(&mut driver, &record("Bella", "Unknown"))
            .await
            .unwrap();

        assert_eq!(item.model, "1");
        assert_eq!(
            driver.calls.iter().filter(|c| c.starts_with("select")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_result_link_aborts() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();

        let err = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("4711", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Element(_)));
        assert!(!driver.calls.iter().any(|c| c.starts_with("download")));
    }

    #[tokio::test]
    async fn test_blank_item_code_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.href = Some("/model?id=1".to_string());
        driver.download = Some((temp.path().to_path_buf(), "models_1.zip".to_string()));

        let err = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("  ", "Conte"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Element(_)));
        assert!(driver.calls.is_empty());
        assert!(!temp.path().join(".zip").exists());
    }

    #[tokio::test]
    async fn test_download_that_never_arrives_fails() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.href = Some("/model?id=1".to_string());

        let err = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("4711", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Download(_)));
    }

    #[tokio::test]
    async fn test_length_matching_renames_long_names() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "DOWNLOAD_MATCH = length\n");
        let mut driver = FakeDriver::default();
        driver.href = Some("/model?id=1".to_string());
        driver.download = Some((
            temp.path().to_path_buf(),
            "report_download_long_filename_123.zip".to_string(),
        ));

        let item = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("4711", ""))
            .await
            .unwrap();

        assert_eq!(item.archive, Some(temp.path().join("4711.zip")));
    }

    #[tokio::test]
    async fn test_clear_failures_are_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let settings = settings(temp.path(), "");
        let mut driver = FakeDriver::default();
        driver.broken_fields.push("name".to_string());
        driver.href = Some("/model?id=1".to_string());
        driver.download = Some((temp.path().to_path_buf(), "pics.zip".to_string()));

        let item = quick(&settings, PortalOptions::default())
            .resolve(&mut driver, &record("4711", ""))
            .await;

        assert!(item.is_ok());
    }
}
