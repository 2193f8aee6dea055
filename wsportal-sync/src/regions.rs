//! Region resolution for an import run.
//!
//! Resolution never fails: an explicit `REGIONLIST` wins verbatim,
//! discovery is tried next, and anything else degrades to the single
//! hardcoded default region.

use wsportal_cloud::RegionCatalog;
use wsportal_core::config::{Config, DEFAULT_REGION};
use wsportal_core::types::RegionName;

/// Resolve the ordered region list for one run.
///
/// - Explicit `REGIONLIST`: comma-split, used verbatim, no validation.
/// - Otherwise the catalog's enabled regions.
/// - Discovery failure or an empty catalog: the default region alone.
pub async fn resolve(catalog: &dyn RegionCatalog, config: &Config) -> Vec<RegionName> {
    if let Some(raw) = &config.region_list {
        let regions: Vec<RegionName> = raw.split(',').map(RegionName::from).collect();
        tracing::info!("regions: {raw}");
        return regions;
    }

    match catalog.enabled_regions().await {
        Ok(regions) if !regions.is_empty() => {
            let joined: Vec<&str> = regions.iter().map(|r| r.0.as_str()).collect();
            tracing::info!("all regions: {}", joined.join(","));
            regions
        }
        Ok(_) => {
            tracing::warn!("region discovery returned nothing; using {DEFAULT_REGION}");
            vec![RegionName::from(DEFAULT_REGION)]
        }
        Err(err) => {
            tracing::error!("unable to get a list of regions: {err}");
            vec![RegionName::from(DEFAULT_REGION)]
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wsportal_cloud::mock::MockCatalog;

    fn config_with_list(list: Option<&str>) -> Config {
        Config {
            region_list: list.map(str::to_string),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn explicit_list_is_split_verbatim() {
        let catalog = MockCatalog::failing();
        let config = config_with_list(Some("us-east-1,eu-west-1"));
        let regions = resolve(&catalog, &config).await;
        assert_eq!(
            regions,
            vec![RegionName::from("us-east-1"), RegionName::from("eu-west-1")]
        );
    }

    #[tokio::test]
    async fn explicit_list_is_not_validated() {
        let catalog = MockCatalog::failing();
        let config = config_with_list(Some("us-east-1,,bogus-region"));
        let regions = resolve(&catalog, &config).await;
        // Verbatim means verbatim: empty and unknown entries pass through.
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[1], RegionName::from(""));
        assert_eq!(regions[2], RegionName::from("bogus-region"));
    }

    #[tokio::test]
    async fn discovery_is_used_when_no_list_is_set() {
        let catalog = MockCatalog::with_regions(["ap-southeast-2", "us-west-2"]);
        let regions = resolve(&catalog, &config_with_list(None)).await;
        assert_eq!(
            regions,
            vec![
                RegionName::from("ap-southeast-2"),
                RegionName::from("us-west-2")
            ]
        );
    }

    #[tokio::test]
    async fn discovery_failure_falls_back_to_default_region() {
        let catalog = MockCatalog::failing();
        let regions = resolve(&catalog, &config_with_list(None)).await;
        assert_eq!(regions, vec![RegionName::from("us-east-1")]);
    }

    #[tokio::test]
    async fn empty_discovery_falls_back_to_default_region() {
        let catalog = MockCatalog::with_regions([]);
        let regions = resolve(&catalog, &config_with_list(None)).await;
        assert_eq!(regions, vec![RegionName::from("us-east-1")]);
    }
}
