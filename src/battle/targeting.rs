use crate::map::MapAccessor;
use crate::unit::{MoveInstance, Unit};
use schema::{AreaOfEffect, Direction, Position, RangeBounds, Terrain};
use std::collections::BTreeSet;
use thiserror::Error;

/// Decides whether anything stands between two tiles.
pub trait LineOfSight: Send + Sync {
    fn is_clear(&self, from: Position, to: Position, map: &dyn MapAccessor) -> bool;
}

/// Nothing ever blocks sight.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl LineOfSight for OpenField {
    fn is_clear(&self, _from: Position, _to: Position, _map: &dyn MapAccessor) -> bool {
        true
    }
}

/// Mountains between the two tiles block sight. Units do not.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainSightline;

impl LineOfSight for TerrainSightline {
    fn is_clear(&self, from: Position, to: Position, map: &dyn MapAccessor) -> bool {
        bresenham_line(from, to)
            .into_iter()
            .filter(|position| *position != from && *position != to)
            .all(|position| map.terrain_at(position) != Some(Terrain::Mountain))
    }
}

/// Grid cells on the line from `from` to `to`, both ends included.
pub fn bresenham_line(from: Position, to: Position) -> Vec<Position> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut cells = Vec::new();
    let mut current = from;
    let mut err = dx + dy;
    loop {
        cells.push(current);
        if current == to {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            current.x += sx;
        }
        if doubled <= dx {
            err += dx;
            current.y += sy;
        }
    }
    cells
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("No PP remaining")]
    NoPpRemaining,
    #[error("Target out of range ({distance} not in {}..={})", .range.min, .range.max)]
    OutOfRange { distance: u32, range: RangeBounds },
    #[error("No line of sight to target")]
    NoLineOfSight,
    #[error("Target is off the map")]
    OffMap,
    #[error("Must target a unit")]
    EmptyTile,
    #[error("Target has already fainted")]
    FaintedTarget,
    #[error("Cannot target self with this move")]
    SelfTarget,
    #[error("Cannot target allies with this move")]
    AllyTarget,
    #[error("Target already has a status effect")]
    StatusAlreadyPresent,
}

/// Outcome of checking one move against one target tile.
/// Every check runs, so all failures are reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub in_range: bool,
    pub has_line_of_sight: bool,
    pub has_pp: bool,
    pub targetable: bool,
    pub errors: Vec<ValidationIssue>,
}

/// Whether `target` may be aimed at by `user` with this move, ignoring
/// range, sight and PP.
pub fn target_issue(
    move_instance: &MoveInstance,
    user: &Unit,
    target: Position,
    map: &dyn MapAccessor,
) -> Option<ValidationIssue> {
    let template = &move_instance.template;
    let rules = &template.tactical.targeting;

    if !map.is_valid_position(target) {
        return Some(ValidationIssue::OffMap);
    }
    let Some(occupant) = map.unit_at(target) else {
        return (!rules.affects_empty).then_some(ValidationIssue::EmptyTile);
    };

    if occupant.is_fainted {
        return Some(ValidationIssue::FaintedTarget);
    }
    if occupant.id == user.id {
        if !rules.affects_self {
            return Some(ValidationIssue::SelfTarget);
        }
    } else if occupant.is_ally_of(user) && !rules.affects_allies {
        return Some(ValidationIssue::AllyTarget);
    }
    if template.is_status() && occupant.status.is_some() && !rules.can_overwrite_status {
        return Some(ValidationIssue::StatusAlreadyPresent);
    }
    None
}

pub fn validate_move(
    move_instance: &MoveInstance,
    user: &Unit,
    target: Position,
    map: &dyn MapAccessor,
    sight: &dyn LineOfSight,
) -> ValidationResult {
    let tactical = &move_instance.template.tactical;
    let mut errors = Vec::new();

    let has_pp = move_instance.current_pp > 0;
    if !has_pp {
        errors.push(ValidationIssue::NoPpRemaining);
    }

    let distance = user.position.manhattan_distance(target);
    let in_range = tactical.range.contains(distance);
    if !in_range {
        errors.push(ValidationIssue::OutOfRange {
            distance,
            range: tactical.range,
        });
    }

    let has_line_of_sight =
        !tactical.targeting.requires_line_of_sight || sight.is_clear(user.position, target, map);
    if !has_line_of_sight {
        errors.push(ValidationIssue::NoLineOfSight);
    }

    let issue = target_issue(move_instance, user, target, map);
    let targetable = issue.is_none();
    errors.extend(issue);

    ValidationResult {
        is_valid: errors.is_empty(),
        in_range,
        has_line_of_sight,
        has_pp,
        targetable,
        errors,
    }
}

/// Every tile in the move's range band the user could aim at.
/// PP is not considered.
pub fn valid_targets(
    move_instance: &MoveInstance,
    user: &Unit,
    map: &dyn MapAccessor,
    sight: &dyn LineOfSight,
) -> BTreeSet<Position> {
    let tactical = &move_instance.template.tactical;
    let reach = tactical.range.max as i32;

    let mut targets = BTreeSet::new();
    for dy in -reach..=reach {
        let span = reach - dy.abs();
        for dx in -span..=span {
            let target = user.position.offset(dx, dy);
            if !tactical.range.contains(user.position.manhattan_distance(target)) {
                continue;
            }
            if target_issue(move_instance, user, target, map).is_some() {
                continue;
            }
            if tactical.targeting.requires_line_of_sight
                && !sight.is_clear(user.position, target, map)
            {
                continue;
            }
            targets.insert(target);
        }
    }
    targets
}

/// Tiles hit when the move is centred on `center`. `Line` needs a direction
/// and yields nothing here; see `affected_tiles_from`.
pub fn affected_tiles(
    area: AreaOfEffect,
    center: Position,
    map: &dyn MapAccessor,
) -> BTreeSet<Position> {
    let candidates: Vec<Position> = match area {
        AreaOfEffect::Single => vec![center],
        AreaOfEffect::Cross { size } => {
            let size = size as i32;
            (1..=size)
                .flat_map(|i| {
                    [
                        center.offset(i, 0),
                        center.offset(-i, 0),
                        center.offset(0, i),
                        center.offset(0, -i),
                    ]
                })
                .collect()
        }
        AreaOfEffect::Square { size } => {
            let size = size as i32;
            (-size..=size)
                .flat_map(|dy| (-size..=size).map(move |dx| center.offset(dx, dy)))
                .collect()
        }
        AreaOfEffect::Diamond { size } => {
            let size = size as i32;
            (-size..=size)
                .flat_map(|dy| {
                    let span = size - dy.abs();
                    (-span..=span).map(move |dx| center.offset(dx, dy))
                })
                .collect()
        }
        AreaOfEffect::Line { .. } => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|position| map.is_valid_position(*position))
        .collect()
}

/// Like `affected_tiles`, but a `Line` runs from the tile next to `origin`
/// toward `center` for its full length.
pub fn affected_tiles_from(
    area: AreaOfEffect,
    origin: Position,
    center: Position,
    map: &dyn MapAccessor,
) -> BTreeSet<Position> {
    let AreaOfEffect::Line { length } = area else {
        return affected_tiles(area, center, map);
    };
    let Some(direction) = Direction::toward(origin, center) else {
        return BTreeSet::new();
    };

    let mut tiles = BTreeSet::new();
    let mut position = origin;
    for _ in 0..length {
        position = position.step(direction);
        if !map.is_valid_position(position) {
            break;
        }
        tiles.insert(position);
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{BattleMap, Tile};
    use crate::unit::{StatusEffect, UnitId};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::{
        ElementalType, MoveCategory, MoveEffects, MoveTemplate, StatusKind, TacticalProfile,
        TargetingRules, TeamId,
    };

    struct Board {
        map: BattleMap,
        units: Vec<Unit>,
    }

    impl MapAccessor for Board {
        fn tile(&self, position: Position) -> Option<Tile> {
            let mut tile = self.map.tile(position)?;
            tile.occupant = self.unit_at(position).map(|u| u.id);
            Some(tile)
        }

        fn is_valid_position(&self, position: Position) -> bool {
            self.map.contains(position)
        }

        fn unit_at(&self, position: Position) -> Option<&Unit> {
            self.units.iter().find(|u| u.position == position)
        }
    }

    fn test_move(category: MoveCategory, tactical: TacticalProfile) -> MoveInstance {
        MoveInstance::new(MoveTemplate {
            id: "1".to_string(),
            name: "test-move".to_string(),
            elemental_type: ElementalType::Normal,
            category,
            base_power: if category == MoveCategory::Status { 0 } else { 40 },
            accuracy: 100,
            pp: 5,
            priority: 0,
            tactical,
            effects: MoveEffects::default(),
            description: String::new(),
        })
    }

    fn melee() -> MoveInstance {
        test_move(MoveCategory::Physical, TacticalProfile::default())
    }

    fn ranged(min: u32, max: u32, targeting: TargetingRules) -> MoveInstance {
        test_move(
            MoveCategory::Special,
            TacticalProfile {
                range: RangeBounds { min, max },
                area_of_effect: AreaOfEffect::Single,
                targeting,
            },
        )
    }

    fn unit(id: u128, team: TeamId, x: i32, y: i32) -> Unit {
        Unit {
            id: UnitId::from_u128(id),
            template_id: "dummy".to_string(),
            name: format!("unit-{}", id),
            nickname: None,
            level: 5,
            experience: 0,
            current_stats: Default::default(),
            max_stats: Default::default(),
            moves: Vec::new(),
            status: None,
            position: Position::new(x, y),
            facing: Direction::South,
            team: Some(team),
            is_leader: false,
            has_moved: false,
            has_attacked: false,
            is_fainted: false,
        }
    }

    fn board(units: Vec<Unit>) -> Board {
        Board {
            map: BattleMap::filled(5, 5, schema::Terrain::Plain),
            units,
        }
    }

    #[test]
    fn test_adjacent_enemy_is_valid() {
        let user = unit(1, TeamId::Team1, 2, 2);
        let enemy = unit(2, TeamId::Team2, 2, 3);
        let board = board(vec![user.clone(), enemy]);

        let result = validate_move(&melee(), &user, Position::new(2, 3), &board, &OpenField);
        assert_eq!(
            result,
            ValidationResult {
                is_valid: true,
                in_range: true,
                has_line_of_sight: true,
                has_pp: true,
                targetable: true,
                errors: Vec::new(),
            }
        );
    }

    #[test]
    fn test_all_failures_are_reported() {
        let user = unit(1, TeamId::Team1, 0, 0);
        let ally = unit(2, TeamId::Team1, 3, 0);
        let board = board(vec![user.clone(), ally]);
        let mut spent = melee();
        spent.current_pp = 0;

        let result = validate_move(&spent, &user, Position::new(3, 0), &board, &OpenField);
        assert!(!result.is_valid);
        assert!(!result.has_pp);
        assert!(!result.in_range);
        assert!(result.has_line_of_sight);
        assert!(!result.targetable);
        assert_eq!(
            result.errors,
            vec![
                ValidationIssue::NoPpRemaining,
                ValidationIssue::OutOfRange {
                    distance: 3,
                    range: RangeBounds { min: 1, max: 1 }
                },
                ValidationIssue::AllyTarget,
            ]
        );
        assert_eq!(result.errors[0].to_string(), "No PP remaining");
    }

    #[test]
    fn test_empty_tile_needs_affects_empty() {
        let user = unit(1, TeamId::Team1, 2, 2);
        let board = board(vec![user.clone()]);

        let result = validate_move(&melee(), &user, Position::new(2, 1), &board, &OpenField);
        assert_eq!(result.errors, vec![ValidationIssue::EmptyTile]);

        let mut rules = TacticalProfile::default().targeting;
        rules.affects_empty = true;
        let ground = ranged(1, 1, rules);
        assert!(validate_move(&ground, &user, Position::new(2, 1), &board, &OpenField).is_valid);
    }

    #[test]
    fn test_status_move_against_statused_target() {
        let user = unit(1, TeamId::Team1, 2, 2);
        let mut enemy = unit(2, TeamId::Team2, 3, 2);
        enemy.status = Some(StatusEffect::new(StatusKind::Poison, 3));
        let board = board(vec![user.clone(), enemy]);

        let powder = test_move(MoveCategory::Status, TacticalProfile::default());
        let result = validate_move(&powder, &user, Position::new(3, 2), &board, &OpenField);
        assert_eq!(result.errors, vec![ValidationIssue::StatusAlreadyPresent]);

        // Damaging moves do not care
        assert!(validate_move(&melee(), &user, Position::new(3, 2), &board, &OpenField).is_valid);
    }

    #[test]
    fn test_melee_targets_are_adjacent_enemies() {
        let user = unit(1, TeamId::Team1, 2, 2);
        let board = board(vec![
            user.clone(),
            unit(2, TeamId::Team2, 2, 1),
            unit(3, TeamId::Team2, 3, 2),
            unit(4, TeamId::Team1, 1, 2),
            unit(5, TeamId::Team2, 4, 4),
        ]);

        assert_eq!(
            valid_targets(&melee(), &user, &board, &OpenField),
            BTreeSet::from([Position::new(2, 1), Position::new(3, 2)])
        );
    }

    #[test]
    fn test_targets_exclude_fainted_and_off_map() {
        let user = unit(1, TeamId::Team1, 0, 0);
        let mut fainted = unit(2, TeamId::Team2, 1, 0);
        fainted.is_fainted = true;
        let board = board(vec![user.clone(), fainted, unit(3, TeamId::Team2, 0, 1)]);

        assert_eq!(
            valid_targets(&melee(), &user, &board, &OpenField),
            BTreeSet::from([Position::new(0, 1)])
        );
    }

    #[test]
    fn test_self_target_needs_zero_min_range_and_flag() {
        let user = unit(1, TeamId::Team1, 2, 2);
        let board = board(vec![user.clone()]);
        let mut rules = TacticalProfile::default().targeting;
        rules.affects_self = true;

        let buff = ranged(0, 0, rules);
        assert_eq!(
            valid_targets(&buff, &user, &board, &OpenField),
            BTreeSet::from([Position::new(2, 2)])
        );

        rules.affects_self = false;
        let no_self = ranged(0, 0, rules);
        assert!(valid_targets(&no_self, &user, &board, &OpenField).is_empty());
    }

    #[test]
    fn test_ranged_band_skips_inner_ring() {
        let user = unit(1, TeamId::Team1, 2, 2);
        let mut rules = TacticalProfile::default().targeting;
        rules.affects_empty = true;
        let board = board(vec![user.clone()]);

        let targets = valid_targets(&ranged(2, 2, rules), &user, &board, &OpenField);
        assert_eq!(targets.len(), 8);
        assert!(targets.iter().all(|p| p.manhattan_distance(user.position) == 2));
    }

    #[test]
    fn test_mountain_blocks_sight() {
        let map = BattleMap::from_ascii(".^..").unwrap();
        assert!(!TerrainSightline.is_clear(Position::new(0, 0), Position::new(3, 0), &map));
        assert!(TerrainSightline.is_clear(Position::new(2, 0), Position::new(3, 0), &map));
        // The endpoints themselves never block
        assert!(TerrainSightline.is_clear(Position::new(1, 0), Position::new(3, 0), &map));
        assert!(OpenField.is_clear(Position::new(0, 0), Position::new(3, 0), &map));
    }

    #[test]
    fn test_sight_failure_is_reported() {
        let user = unit(1, TeamId::Team1, 0, 0);
        let enemy = unit(2, TeamId::Team2, 2, 0);
        let board = Board {
            map: BattleMap::from_ascii(".^.").unwrap(),
            units: vec![user.clone(), enemy],
        };
        let shot = ranged(1, 3, TacticalProfile::default().targeting);

        let result = validate_move(&shot, &user, Position::new(2, 0), &board, &TerrainSightline);
        assert_eq!(result.errors, vec![ValidationIssue::NoLineOfSight]);
        assert!(valid_targets(&shot, &user, &board, &TerrainSightline).is_empty());
        assert_eq!(
            valid_targets(&shot, &user, &board, &OpenField),
            BTreeSet::from([Position::new(2, 0)])
        );
    }

    #[test]
    fn test_bresenham_diagonal() {
        assert_eq!(
            bresenham_line(Position::new(0, 0), Position::new(3, 3)),
            vec![
                Position::new(0, 0),
                Position::new(1, 1),
                Position::new(2, 2),
                Position::new(3, 3)
            ]
        );
        assert_eq!(bresenham_line(Position::new(1, 1), Position::new(1, 1)), vec![Position::new(1, 1)]);
    }

    #[rstest]
    #[case(AreaOfEffect::Single, 1)]
    #[case(AreaOfEffect::Cross { size: 1 }, 4)]
    #[case(AreaOfEffect::Cross { size: 2 }, 8)]
    #[case(AreaOfEffect::Square { size: 1 }, 9)]
    #[case(AreaOfEffect::Diamond { size: 2 }, 13)]
    #[case(AreaOfEffect::Line { length: 3 }, 0)]
    fn test_area_sizes_in_open_field(#[case] area: AreaOfEffect, #[case] expected: usize) {
        let map = BattleMap::filled(9, 9, schema::Terrain::Plain);
        assert_eq!(affected_tiles(area, Position::new(4, 4), &map).len(), expected);
    }

    #[test]
    fn test_cross_excludes_center_and_clips() {
        let map = BattleMap::filled(5, 5, schema::Terrain::Plain);
        assert_eq!(
            affected_tiles(AreaOfEffect::Cross { size: 2 }, Position::new(0, 0), &map),
            BTreeSet::from([
                Position::new(1, 0),
                Position::new(2, 0),
                Position::new(0, 1),
                Position::new(0, 2)
            ])
        );
    }

    #[test]
    fn test_square_clips_at_corner() {
        let map = BattleMap::filled(5, 5, schema::Terrain::Plain);
        assert_eq!(
            affected_tiles(AreaOfEffect::Square { size: 1 }, Position::new(4, 4), &map).len(),
            4
        );
    }

    #[test]
    fn test_line_runs_toward_target() {
        let map = BattleMap::filled(5, 5, schema::Terrain::Plain);
        let line = AreaOfEffect::Line { length: 3 };

        assert_eq!(
            affected_tiles_from(line, Position::new(1, 2), Position::new(2, 2), &map),
            BTreeSet::from([Position::new(2, 2), Position::new(3, 2), Position::new(4, 2)])
        );
        assert_eq!(
            affected_tiles_from(line, Position::new(1, 1), Position::new(1, 0), &map),
            BTreeSet::from([Position::new(1, 0)])
        );
        assert!(affected_tiles_from(line, Position::new(1, 1), Position::new(1, 1), &map).is_empty());
        assert_eq!(
            affected_tiles_from(AreaOfEffect::Single, Position::new(0, 0), Position::new(1, 0), &map),
            BTreeSet::from([Position::new(1, 0)])
        );
    }
}
