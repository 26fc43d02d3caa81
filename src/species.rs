//! Species templates: resolving, caching and turning them into units.

pub mod documents;
pub mod sources;

pub use documents::{EvolutionChainDocument, MoveDocument, SpeciesDocument};
pub use sources::{DirectorySource, StaticSource, TemplateSource};

use crate::config::BattleConfig;
use crate::errors::{TemplateError, TemplateResult};
use crate::unit::{calculate_stats, MoveInstance, Unit, UnitId};
use schema::{Direction, LearnMethod, LearnableMove, Position, SpeciesTemplate, TeamId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Synchronous, cache-only template access used during battle.
pub trait TemplateLookup: Send + Sync {
    fn template(&self, id: &str) -> Option<Arc<SpeciesTemplate>>;
}

/// Shared handle to resolved templates. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    entries: Arc<RwLock<HashMap<String, Arc<SpeciesTemplate>>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, template: SpeciesTemplate) -> Arc<SpeciesTemplate> {
        let template = Arc::new(template);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(template.id.clone(), Arc::clone(&template));
        template
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TemplateLookup for TemplateCache {
    fn template(&self, id: &str) -> Option<Arc<SpeciesTemplate>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

/// Optional settings for `create_unit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOptions {
    pub nickname: Option<String>,
    pub is_leader: bool,
    pub team: Option<TeamId>,
}

/// Build a fresh unit from a resolved template.
///
/// The unit knows the last `max_known_moves` natural moves available at its
/// level, in template order, each at full PP.
pub fn unit_from_template(
    template: &SpeciesTemplate,
    level: u8,
    position: Position,
    options: UnitOptions,
    max_known_moves: usize,
) -> Unit {
    let stats = calculate_stats(&template.base_stats, level);
    let moves = template
        .moves_known_at(level, max_known_moves)
        .into_iter()
        .map(|learnable| MoveInstance::new(learnable.move_.clone()))
        .collect();

    Unit {
        id: UnitId::new_random(),
        template_id: template.id.clone(),
        name: template.name.clone(),
        nickname: options.nickname,
        level,
        experience: 0,
        current_stats: stats,
        max_stats: stats,
        moves,
        status: None,
        position,
        facing: Direction::South,
        team: options.team,
        is_leader: options.is_leader,
        has_moved: false,
        has_attacked: false,
        is_fainted: false,
    }
}

/// Resolves species through a `TemplateSource` and remembers the results.
///
/// Templates are cached under the identifier they were requested with, and
/// `SpeciesTemplate::id` is set to that identifier so units built from them
/// always resolve through the cache.
pub struct TemplateProvider<S: TemplateSource> {
    source: S,
    cache: TemplateCache,
    config: BattleConfig,
}

impl<S: TemplateSource> TemplateProvider<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, BattleConfig::default())
    }

    pub fn with_config(source: S, config: BattleConfig) -> Self {
        Self {
            source,
            cache: TemplateCache::new(),
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Handle for the battle engine. Sees templates fetched later, too.
    pub fn cache(&self) -> TemplateCache {
        self.cache.clone()
    }

    pub fn insert_template(&self, template: SpeciesTemplate) -> Arc<SpeciesTemplate> {
        self.cache.insert(template)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub async fn fetch_and_cache_template(&self, id: &str) -> TemplateResult<Arc<SpeciesTemplate>> {
        if let Some(template) = self.cache.template(id) {
            debug!(id, "template cache hit");
            return Ok(template);
        }

        debug!(id, "template cache miss, fetching");
        let template = self.fetch_template(id).await.inspect_err(|err| {
            warn!(id, error = %err, "failed to resolve template");
        })?;
        Ok(self.cache.insert(template))
    }

    async fn fetch_template(&self, id: &str) -> TemplateResult<SpeciesTemplate> {
        let document = self.source.fetch_species(id).await?;
        let base_stats = document.base_stats()?;
        let types = document.elemental_types()?;

        let mut natural_moves = Vec::new();
        for (name, level_learned) in document.level_up_moves() {
            let move_document = self.source.fetch_move(name).await?;
            natural_moves.push(LearnableMove {
                move_: move_document.to_template()?,
                level_learned,
                method: LearnMethod::LevelUp,
            });
        }

        let evolution = self
            .source
            .fetch_evolution_chain(id)
            .await?
            .and_then(|chain| chain.chain.find_evolution(&document.name));

        Ok(SpeciesTemplate {
            id: id.to_string(),
            name: document.name.clone(),
            types,
            base_stats,
            natural_moves,
            evolution,
            size: document.body_size(),
            recruit_difficulty: base_stats.total() as f32 / 100.0,
        })
    }

    /// Resolve the template (fetching if needed) and build a unit at `position`.
    pub async fn create_unit(
        &self,
        id: &str,
        level: u8,
        position: Position,
        options: UnitOptions,
    ) -> TemplateResult<Unit> {
        if level == 0 || level > self.config.max_level {
            return Err(TemplateError::Malformed {
                identifier: id.to_string(),
                details: format!("level {} outside 1..={}", level, self.config.max_level),
            });
        }
        let template = self.fetch_and_cache_template(id).await?;
        Ok(unit_from_template(
            &template,
            level,
            position,
            options,
            self.config.max_known_moves,
        ))
    }
}

impl<S: TemplateSource> TemplateLookup for TemplateProvider<S> {
    fn template(&self, id: &str) -> Option<Arc<SpeciesTemplate>> {
        self.cache.template(id)
    }
}
