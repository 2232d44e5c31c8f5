//! Removal of organelle-derived OTUs.

use crate::data::{Lineage, ObservationTable, Rank};
use log::info;

/// A rank assignment that marks an OTU as organelle-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganelleRule {
    pub rank: Rank,
    pub name: &'static str,
}

/// Mitochondrial and chloroplast lineages. Matching is exact and case-sensitive.
pub const ORGANELLE_RULES: [OrganelleRule; 2] = [
    OrganelleRule {
        rank: Rank::Family,
        name: "mitochondria",
    },
    OrganelleRule {
        rank: Rank::Class,
        name: "Chloroplast",
    },
];

/// Whether `lineage` matches any organelle rule. Unassigned ranks never match.
pub fn is_organelle(lineage: &Lineage) -> bool {
    ORGANELLE_RULES
        .iter()
        .any(|rule| lineage.get(rule.rank) == Some(rule.name))
}

/// Drop every observation whose lineage is organelle-derived.
pub fn remove_organelles(table: &ObservationTable) -> ObservationTable {
    let filtered = table.filtered(|obs| !is_organelle(&obs.lineage));
    info!(
        "Organelle filter removed {} of {} observations",
        table.len() - filtered.len(),
        table.len()
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;

    fn obs(otu: &str, lineage: Lineage) -> Observation {
        let mut o = Observation::new("S1", otu, 1);
        o.lineage = lineage;
        o
    }

    #[test]
    fn test_matches_exact_names_only() {
        assert!(is_organelle(&Lineage::default().with(Rank::Family, "mitochondria")));
        assert!(is_organelle(&Lineage::default().with(Rank::Class, "Chloroplast")));
        assert!(!is_organelle(&Lineage::default().with(Rank::Family, "Mitochondria")));
        assert!(!is_organelle(&Lineage::default().with(Rank::Class, "chloroplast")));
        // Names only count at their own rank
        assert!(!is_organelle(&Lineage::default().with(Rank::Order, "Chloroplast")));
        assert!(!is_organelle(&Lineage::default()));
    }

    #[test]
    fn test_remove_organelles() {
        let table = ObservationTable::new(
            vec![],
            vec![
                obs("OTU1", Lineage::default().with(Rank::Family, "mitochondria")),
                obs("OTU2", Lineage::default().with(Rank::Family, "Bacillaceae")),
                obs("OTU3", Lineage::default().with(Rank::Class, "Chloroplast")),
            ],
        );
        let filtered = remove_organelles(&table);
        assert_eq!(filtered.otu_ids(), vec!["OTU2"]);
        assert_eq!(table.len(), 3);
    }
}
