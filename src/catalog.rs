//! Catalog ingestion
//!
//! The catalog is read once at startup from an ordered feed of service and
//! package records, the same shape the hosting page exposes in its markup.
//! Packages attach to the service whose slug matches their `parent`. A
//! package whose parent is unknown stays in the flat package list only and is
//! reported with a warning.

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, SelfServeError};
use crate::types::{Package, Service};

/// Raw service block from the feed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceRecord {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub whats_included: String,
    pub whats_excluded: String,
}

/// Raw package block from the feed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRecord {
    pub slug: String,
    pub name: String,
    #[serde(deserialize_with = "lenient_int")]
    pub value: i64,
    pub units: String,
    #[serde(deserialize_with = "lenient_int")]
    pub cost: i64,
    /// Slug of the owning service
    pub parent: String,
}

impl PackageRecord {
    fn to_package(&self) -> Package {
        Package {
            slug: self.slug.clone(),
            name: self.name.clone(),
            value: self.value,
            units: self.units.clone(),
            cost: self.cost,
        }
    }
}

/// Ordered, read-only feed consumed once at startup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFeed {
    pub services: Vec<ServiceRecord>,
    pub packages: Vec<PackageRecord>,
}

/// Anything that can supply the catalog feed
pub trait CatalogSource {
    fn load_catalog(&self) -> Result<CatalogFeed>;
}

/// Catalog feed stored as a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonCatalogFile {
    path: PathBuf,
}

impl JsonCatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<CatalogFeed> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog from {:?}", self.path))?;
        let feed = serde_json::from_str(&content).context("Failed to parse catalog JSON")?;
        Ok(feed)
    }
}

impl CatalogSource for JsonCatalogFile {
    fn load_catalog(&self) -> Result<CatalogFeed> {
        self.read()
            .map_err(|e| SelfServeError::catalog(format!("{e:#}")))
    }
}

/// Feed held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog(pub CatalogFeed);

impl CatalogSource for StaticCatalog {
    fn load_catalog(&self) -> Result<CatalogFeed> {
        Ok(self.0.clone())
    }
}

/// Services with their attached packages, plus every package seen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    services: Vec<Service>,
    all_packages: Vec<Package>,
    orphans: Vec<PackageRecord>,
}

impl Catalog {
    /// Load and index the catalog from a source.
    pub fn load(source: &impl CatalogSource) -> Result<Self> {
        Ok(Self::from_feed(source.load_catalog()?))
    }

    /// Build services in feed order and attach packages by parent slug.
    pub fn from_feed(feed: CatalogFeed) -> Self {
        let mut services: Vec<Service> = feed
            .services
            .into_iter()
            .map(|record| Service {
                slug: record.slug,
                name: record.title,
                description: record.description,
                whats_included: record.whats_included,
                whats_excluded: record.whats_excluded,
                packages: Vec::new(),
            })
            .collect();

        let mut all_packages = Vec::with_capacity(feed.packages.len());
        let mut orphans = Vec::new();

        for record in feed.packages {
            let package = record.to_package();
            match services.iter_mut().find(|s| s.slug == record.parent) {
                Some(service) => service.packages.push(package.clone()),
                None => {
                    warn!(
                        package = %record.slug,
                        parent = %record.parent,
                        "Package references an unknown service; not attached"
                    );
                    orphans.push(record);
                }
            }
            all_packages.push(package);
        }

        info!(
            services = services.len(),
            packages = all_packages.len(),
            orphans = orphans.len(),
            "Catalog loaded"
        );

        Self {
            services,
            all_packages,
            orphans,
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Every package in feed order, attached or not
    pub fn all_packages(&self) -> &[Package] {
        &self.all_packages
    }

    /// Packages whose parent slug matched no service
    pub fn orphan_packages(&self) -> &[PackageRecord] {
        &self.orphans
    }

    pub fn service(&self, slug: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.slug == slug)
    }

    pub fn service_index(&self, slug: &str) -> Option<usize> {
        self.services.iter().position(|s| s.slug == slug)
    }

    pub fn package(&self, service_slug: &str, package_slug: &str) -> Option<&Package> {
        self.service(service_slug)?.package(package_slug)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Parse the leading integer of a string, the way page attributes are read.
///
/// `"1200"` → 1200, `" 42 hours"` → 42, `"-5"` → -5, `""` or `"abc"` → 0.
pub fn parse_leading_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end]
        .chars()
        .fold(0i64, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(i64::from(c as u8 - b'0'))
        });

    if negative { -value } else { value }
}

fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        Missing(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n,
        Raw::Float(f) => f.trunc() as i64,
        Raw::Text(s) => parse_leading_int(&s),
        Raw::Missing(_) => 0,
    })
}
