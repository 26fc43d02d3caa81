use schema::{Evolution, SpeciesTemplate};

/// The template's level evolution, if leveling from `previous_level` to
/// `level` crossed its threshold. Evolving itself is left to the caller.
pub fn evolution_reached(
    template: &SpeciesTemplate,
    previous_level: u8,
    level: u8,
) -> Option<&Evolution> {
    template
        .evolution
        .as_ref()
        .filter(|evolution| previous_level < evolution.level && level >= evolution.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{BaseStats, BodySize, ElementalType};

    fn charmander() -> SpeciesTemplate {
        SpeciesTemplate {
            id: "charmander".to_string(),
            name: "charmander".to_string(),
            types: vec![ElementalType::Fire],
            base_stats: BaseStats {
                hp: 39,
                attack: 52,
                defense: 43,
                sp_attack: 60,
                sp_defense: 50,
                speed: 65,
            },
            natural_moves: Vec::new(),
            evolution: Some(Evolution {
                level: 16,
                evolves_into: "charmeleon".to_string(),
            }),
            size: BodySize { height: 0.6, weight: 8.5 },
            recruit_difficulty: 3.09,
        }
    }

    #[test]
    fn test_crossing_threshold_reports_evolution() {
        let template = charmander();
        let evolution = evolution_reached(&template, 15, 16).map(|e| e.evolves_into.as_str());
        assert_eq!(evolution, Some("charmeleon"));
        assert!(evolution_reached(&template, 12, 18).is_some());
    }

    #[test]
    fn test_no_report_below_or_after_threshold() {
        let template = charmander();
        assert!(evolution_reached(&template, 10, 15).is_none());
        assert!(evolution_reached(&template, 16, 17).is_none());
        assert!(evolution_reached(&template, 15, 15).is_none());
    }
}
