//! The static pet catalog.

use crate::{errors::FsPathError, fs};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::PathBuf,
    str::FromStr,
};
use url::Url;

/// Identifier of a pet, unique within the catalog and used as the contract argument.
pub type PetId = u64;

/// A single entry of the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetRecord {
    /// Catalog-unique identifier.
    pub id: PetId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Image reference, accepted as `image` or `picture`.
    #[serde(default, alias = "picture", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any further display fields, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PetRecord {
    /// Creates a record with only an id and a name.
    pub fn new(id: PetId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), description: None, image: None, extra: BTreeMap::new() }
    }
}

/// Errors when loading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Fs(#[from] FsPathError),
    #[error("failed to fetch catalog from {url}: {source}")]
    Http { url: Url, source: reqwest::Error },
    #[error("catalog is not a valid JSON list of pets: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pet id {0} appears more than once in the catalog")]
    DuplicateId(PetId),
}

/// Where the catalog is served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    /// A local JSON file.
    Path(PathBuf),
    /// An http(s) resource.
    Url(Url),
}

impl FromStr for CatalogSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url)),
            _ => Ok(Self::Path(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => path.display().fmt(f),
            Self::Url(url) => url.fmt(f),
        }
    }
}

/// The ordered, immutable list of pets offered for adoption.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    pets: Vec<PetRecord>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate ids.
    pub fn new(pets: Vec<PetRecord>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(pets.len());
        if let Some(dup) = pets.iter().find(|pet| !seen.insert(pet.id)) {
            return Err(CatalogError::DuplicateId(dup.id));
        }
        Ok(Self { pets })
    }

    /// Parses a JSON array of pet objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Loads the catalog once from `source`.
    pub async fn load(source: &CatalogSource) -> Result<Self, CatalogError> {
        let json = match source {
            CatalogSource::Path(path) => fs::read_to_string(path)?,
            CatalogSource::Url(url) => fetch(url).await?,
        };
        let catalog = Self::from_json(&json)?;
        debug!(%source, pets = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Returns the pet with the given id.
    pub fn get(&self, id: PetId) -> Option<&PetRecord> {
        self.pets.iter().find(|pet| pet.id == id)
    }

    /// Returns true if the catalog lists `id`.
    pub fn contains(&self, id: PetId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates the pets in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &PetRecord> {
        self.pets.iter()
    }

    /// Number of pets.
    pub fn len(&self) -> usize {
        self.pets.len()
    }

    /// Returns true if the catalog has no pets.
    pub fn is_empty(&self) -> bool {
        self.pets.is_empty()
    }
}

async fn fetch(url: &Url) -> Result<String, CatalogError> {
    let http = |source| CatalogError::Http { url: url.clone(), source };
    reqwest::get(url.clone())
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(http)?
        .text()
        .await
        .map_err(http)
}
