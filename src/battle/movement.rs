use crate::config::BattleConfig;
use crate::map::MapAccessor;
use crate::species::TemplateLookup;
use crate::unit::Unit;
use ordered_float::OrderedFloat;
use schema::{ElementalType, Position, Terrain};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;

/// Cost of entering `terrain` for a unit of the given types.
/// `None` means the unit cannot enter it at all.
pub fn terrain_cost_for(terrain: Terrain, types: &[ElementalType]) -> Option<f32> {
    let restricted: &[ElementalType] = match terrain {
        Terrain::Water => &[ElementalType::Fire, ElementalType::Ground, ElementalType::Rock],
        Terrain::Mountain => &[ElementalType::Water],
        Terrain::Plain | Terrain::Grass | Terrain::Forest => &[],
    };
    if types.iter().any(|t| restricted.contains(t)) {
        return None;
    }

    Some(match terrain {
        Terrain::Plain | Terrain::Grass => 1.0,
        Terrain::Forest => 1.5,
        Terrain::Water | Terrain::Mountain => 2.0,
    })
}

/// Works out where a unit may walk this turn.
pub struct MovementPlanner {
    templates: Arc<dyn TemplateLookup>,
    speed_divisor: u32,
    base_bonus: u32,
}

impl MovementPlanner {
    pub fn new(templates: Arc<dyn TemplateLookup>, config: &BattleConfig) -> Self {
        Self {
            templates,
            speed_divisor: config.movement_speed_divisor.max(1),
            base_bonus: config.movement_base_bonus,
        }
    }

    /// Movement points from the species' base speed.
    pub fn base_range(&self, unit: &Unit) -> Option<u32> {
        let template = self.templates.template(&unit.template_id)?;
        Some(template.base_stats.speed as u32 / self.speed_divisor + self.base_bonus)
    }

    pub fn terrain_cost(&self, terrain: Terrain, unit: &Unit) -> Option<f32> {
        let template = self.templates.template(&unit.template_id)?;
        terrain_cost_for(terrain, &template.types)
    }

    /// Every position the unit can end its move on, its own included.
    ///
    /// Cheapest-path search over orthogonal steps. Entering a tile costs its
    /// terrain; impassable terrain and tiles held by other units are never
    /// entered.
    pub fn reachable_tiles(&self, unit: &Unit, map: &dyn MapAccessor) -> BTreeSet<Position> {
        let mut reachable = BTreeSet::from([unit.position]);

        let Some(template) = self.templates.template(&unit.template_id) else {
            return reachable;
        };
        let Some(range) = self.base_range(unit) else {
            return reachable;
        };
        let budget = OrderedFloat(range as f32);

        let mut dist: HashMap<Position, OrderedFloat<f32>> = HashMap::new();
        let mut queue: BinaryHeap<Reverse<(OrderedFloat<f32>, Position)>> = BinaryHeap::new();
        dist.insert(unit.position, OrderedFloat(0.0));
        queue.push(Reverse((OrderedFloat(0.0), unit.position)));

        while let Some(Reverse((cost, position))) = queue.pop() {
            // Stale entry, a cheaper path was already found
            if dist.get(&position).is_some_and(|best| cost > *best) {
                continue;
            }

            for next in position.neighbors() {
                let Some(terrain) = map.terrain_at(next) else {
                    continue;
                };
                let Some(step) = terrain_cost_for(terrain, &template.types) else {
                    continue;
                };
                if map.unit_at(next).is_some_and(|occupant| occupant.id != unit.id) {
                    continue;
                }

                let next_cost = cost + OrderedFloat(step);
                if next_cost > budget {
                    continue;
                }
                if dist.get(&next).is_some_and(|best| next_cost >= *best) {
                    continue;
                }
                dist.insert(next, next_cost);
                queue.push(Reverse((next_cost, next)));
            }
        }

        reachable.extend(dist.into_keys());
        reachable
    }
}
