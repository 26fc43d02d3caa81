//! Where species and move documents come from.

use super::documents::{EvolutionChainDocument, MoveDocument, SpeciesDocument};
use crate::errors::{TemplateError, TemplateResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies raw documents to a `TemplateProvider`.
///
/// Implementors may write these as `async fn`.
pub trait TemplateSource: Send + Sync {
    fn fetch_species(
        &self,
        identifier: &str,
    ) -> impl Future<Output = TemplateResult<SpeciesDocument>> + Send;

    fn fetch_move(&self, name: &str) -> impl Future<Output = TemplateResult<MoveDocument>> + Send;

    /// `Ok(None)` when the species has no known evolution chain.
    fn fetch_evolution_chain(
        &self,
        identifier: &str,
    ) -> impl Future<Output = TemplateResult<Option<EvolutionChainDocument>>> + Send;
}

/// In-memory documents, keyed by the identifier callers ask for.
#[derive(Debug, Default)]
pub struct StaticSource {
    species: HashMap<String, SpeciesDocument>,
    moves: HashMap<String, MoveDocument>,
    chains: HashMap<String, EvolutionChainDocument>,
    species_fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_species(mut self, identifier: &str, document: SpeciesDocument) -> Self {
        self.species.insert(identifier.to_string(), document);
        self
    }

    pub fn with_move(mut self, document: MoveDocument) -> Self {
        self.moves.insert(document.name.clone(), document);
        self
    }

    pub fn with_evolution_chain(mut self, identifier: &str, document: EvolutionChainDocument) -> Self {
        self.chains.insert(identifier.to_string(), document);
        self
    }

    /// Number of species documents served so far.
    pub fn species_fetches(&self) -> usize {
        self.species_fetches.load(Ordering::Relaxed)
    }
}

impl TemplateSource for StaticSource {
    async fn fetch_species(&self, identifier: &str) -> TemplateResult<SpeciesDocument> {
        self.species_fetches.fetch_add(1, Ordering::Relaxed);
        self.species
            .get(identifier)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(identifier.to_string()))
    }

    async fn fetch_move(&self, name: &str) -> TemplateResult<MoveDocument> {
        self.moves
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    async fn fetch_evolution_chain(
        &self,
        identifier: &str,
    ) -> TemplateResult<Option<EvolutionChainDocument>> {
        Ok(self.chains.get(identifier).cloned())
    }
}

/// Reads API-shaped JSON from a local mirror:
///
/// ```text
/// <root>/pokemon/<identifier>.json
/// <root>/move/<name>.json
/// <root>/evolution/<identifier>.json   (optional)
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, kind: &str, identifier: &str) -> PathBuf {
        self.root.join(kind).join(format!("{}.json", identifier))
    }

    async fn read_document<T: DeserializeOwned>(
        &self,
        kind: &str,
        identifier: &str,
    ) -> TemplateResult<Option<T>> {
        let path = self.document_path(kind, identifier);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(TemplateError::UpstreamFetch {
                    identifier: identifier.to_string(),
                    reason: format!("failed to read {}: {}", path.display(), err),
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| TemplateError::UpstreamFetch {
                identifier: identifier.to_string(),
                reason: format!("failed to parse {}: {}", path.display(), err),
            })
    }
}

impl TemplateSource for DirectorySource {
    async fn fetch_species(&self, identifier: &str) -> TemplateResult<SpeciesDocument> {
        self.read_document("pokemon", identifier)
            .await?
            .ok_or_else(|| TemplateError::NotFound(identifier.to_string()))
    }

    async fn fetch_move(&self, name: &str) -> TemplateResult<MoveDocument> {
        self.read_document("move", name)
            .await?
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    async fn fetch_evolution_chain(
        &self,
        identifier: &str,
    ) -> TemplateResult<Option<EvolutionChainDocument>> {
        self.read_document("evolution", identifier).await
    }
}
