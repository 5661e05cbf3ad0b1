//! Favorite and unfavorite sectors per regime.

use serde::{Deserialize, Serialize};

use crate::data::Granularity;
use crate::regime::Regime;

use super::aggregate::RegimeSectorAggregate;

/// Best and worst sectors within one regime.
///
/// Unfavorite lists are ordered worst first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorPreferences {
    pub regime: Regime,
    pub granularity: Granularity,
    pub favorite_by_return: Vec<String>,
    pub unfavorite_by_return: Vec<String>,
    pub favorite_by_drawdown: Vec<String>,
    pub unfavorite_by_drawdown: Vec<String>,
}

/// Rank sectors inside each regime present in `aggregates`.
pub fn sector_preferences(
    aggregates: &[RegimeSectorAggregate],
    count: usize,
) -> Vec<SectorPreferences> {
    let mut out = Vec::new();

    for regime in Regime::ALL {
        let rows: Vec<&RegimeSectorAggregate> =
            aggregates.iter().filter(|a| a.regime == regime).collect();
        let Some(first) = rows.first() else {
            continue;
        };

        let by_return = ranked(&rows, |a| a.mean_return);
        let by_drawdown = ranked(&rows, |a| a.max_drawdown);

        out.push(SectorPreferences {
            regime,
            granularity: first.granularity,
            favorite_by_return: by_return.iter().rev().take(count).cloned().collect(),
            unfavorite_by_return: by_return.iter().take(count).cloned().collect(),
            favorite_by_drawdown: by_drawdown.iter().take(count).cloned().collect(),
            unfavorite_by_drawdown: by_drawdown.iter().rev().take(count).cloned().collect(),
        });
    }

    out
}

/// Sector names in ascending order of `key`, ties broken by name.
fn ranked(
    rows: &[&RegimeSectorAggregate],
    key: impl Fn(&RegimeSectorAggregate) -> f64,
) -> Vec<String> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| key(a).total_cmp(&key(b)).then_with(|| a.sector.cmp(&b.sector)));
    sorted.into_iter().map(|a| a.sector.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        regime: Regime,
        sector: &str,
        mean_return: f64,
        max_drawdown: f64,
    ) -> RegimeSectorAggregate {
        RegimeSectorAggregate {
            regime,
            sector: sector.to_string(),
            granularity: Granularity::Monthly,
            periods: 5,
            mean_return,
            max_drawdown,
            avg_drawdown: max_drawdown / 2.0,
        }
    }

    #[test]
    fn test_preferences_by_return_and_drawdown() {
        let rows = vec![
            row(Regime::StableExpansion, "XLK", 0.03, 0.10),
            row(Regime::StableExpansion, "XLU", -0.01, 0.02),
            row(Regime::StableExpansion, "XLE", 0.01, 0.25),
            row(Regime::StructuralStress, "XLP", 0.00, 0.05),
        ];

        let prefs = sector_preferences(&rows, 2);
        assert_eq!(prefs.len(), 2);

        let stable = &prefs[0];
        assert_eq!(stable.regime, Regime::StableExpansion);
        assert_eq!(stable.favorite_by_return, vec!["XLK", "XLE"]);
        assert_eq!(stable.unfavorite_by_return, vec!["XLU", "XLE"]);
        assert_eq!(stable.favorite_by_drawdown, vec!["XLU", "XLK"]);
        assert_eq!(stable.unfavorite_by_drawdown, vec!["XLE", "XLK"]);

        let stress = &prefs[1];
        assert_eq!(stress.favorite_by_return, vec!["XLP"]);
        assert_eq!(stress.unfavorite_by_drawdown, vec!["XLP"]);
    }

    #[test]
    fn test_ties_break_by_name() {
        let rows = vec![
            row(Regime::LateCycle, "XLV", 0.01, 0.1),
            row(Regime::LateCycle, "XLB", 0.01, 0.1),
        ];
        let prefs = sector_preferences(&rows, 1);
        assert_eq!(prefs[0].unfavorite_by_return, vec!["XLB"]);
        assert_eq!(prefs[0].favorite_by_return, vec!["XLV"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(sector_preferences(&[], 4).is_empty());
    }
}
