// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Strategy holders and the catalog built from them.
//!
//! Families, in run order:
//! - object bindings: the primary tier, no category
//! - raw value types and `int -> int` callbacks
//! - one string family per configured test string

pub mod boundary;
pub mod buffer_pool;
pub mod primary;
pub mod sink;
pub mod strings;

use marshalbench_core::{discover, retag, BenchError, BenchResult, Catalog, StrategyConfig};
use tracing::info;

pub use boundary::BoundaryTests;
pub use primary::ObjectBindingTests;
pub use strings::StringTests;

/// Category of the value-type and callback family.
pub const PINVOKE_CATEGORY: &str = "PInvoke tests";

/// Category of the string family for a test string of `len` UTF-16 units.
pub fn string_category(len: usize) -> String {
    format!("String tests (length {len})")
}

/// Discover every family and concatenate them into one catalog.
pub fn build_catalog(config: &StrategyConfig) -> BenchResult<Catalog> {
    let object_bindings = ObjectBindingTests::new(config.primary_inner_rounds).map_err(|source| {
        BenchError::BoundaryInvocation {
            test: "object_binding_setup".to_string(),
            source,
        }
    })?;
    let mut catalog = discover(object_bindings)?.into_primary();

    catalog.append(retag(
        discover(BoundaryTests::new(config.boundary_inner_rounds))?,
        PINVOKE_CATEGORY,
    )?);

    for text in config.test_strings() {
        let family = StringTests::new(text, config.boundary_inner_rounds, config.buffer_capacity);
        let label = string_category(family.len());
        catalog.append(retag(discover(family)?, label)?);
    }

    info!(
        tests = catalog.len(),
        string_families = config.string_repeats.len(),
        "Built strategy catalog"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshalbench_core::Config;

    fn small_config() -> StrategyConfig {
        let mut config = Config::default().strategies;
        config.primary_inner_rounds = 2;
        config.boundary_inner_rounds = 2;
        config
    }

    #[test]
    fn test_catalog_layout() {
        let catalog = build_catalog(&small_config()).unwrap();
        let descriptors: Vec<_> = catalog.iter().collect();

        // 11 primary + 15 boundary + 2 x 19 string
        assert_eq!(descriptors.len(), 64);

        let primary: Vec<_> = descriptors.iter().take_while(|d| d.is_primary()).collect();
        assert_eq!(primary.len(), 11);
        assert!(primary.iter().all(|d| d.category().is_none()));
        assert_eq!(primary[0].name().as_str(), "empty_function");

        let categories: Vec<_> = descriptors[11..]
            .iter()
            .map(|d| d.category().map(|c| c.as_str().to_owned()))
            .collect();
        assert!(categories[..15]
            .iter()
            .all(|c| c.as_deref() == Some(PINVOKE_CATEGORY)));
        assert!(categories[15..34]
            .iter()
            .all(|c| c.as_deref() == Some("String tests (length 10)")));
        assert!(categories[34..]
            .iter()
            .all(|c| c.as_deref() == Some("String tests (length 1000)")));
    }

    #[test]
    fn test_every_descriptor_runs_once() {
        let mut config = small_config();
        config.string_repeats = vec![3];
        for mut descriptor in build_catalog(&config).unwrap().into_descriptors() {
            assert!(descriptor.invoke().is_ok(), "{}", descriptor.name());
        }
    }
}
