//! Pairing of source-period offerings with target-period offerings.
//!
//! Every function here is pure: it takes a [`PairingTable`] by reference and
//! returns a new one, so the planner can be tested without a store.

use crate::domain::model::{ClassOffering, OfferingId, ProfessorId};
use crate::utils::error::{MigrateError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingDecision {
    pub target: OfferingId,
    pub professor: Option<ProfessorId>,
}

/// Source offering id to its chosen target, `None` when unpaired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingTable {
    entries: BTreeMap<OfferingId, Option<PairingDecision>>,
}

impl PairingTable {
    pub fn get(&self, source: OfferingId) -> Option<&PairingDecision> {
        self.entries.get(&source).and_then(|d| d.as_ref())
    }

    pub fn contains(&self, source: OfferingId) -> bool {
        self.entries.contains_key(&source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OfferingId, Option<&PairingDecision>)> {
        self.entries.iter().map(|(id, d)| (*id, d.as_ref()))
    }

    pub fn paired_count(&self) -> usize {
        self.entries.values().filter(|d| d.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowest (level, sublevel) target that promotes `source`. Ties keep roster order.
pub fn next_level_candidate<'a>(
    source: &ClassOffering,
    targets: &'a [ClassOffering],
) -> Option<&'a ClassOffering> {
    let mut candidates: Vec<&ClassOffering> = targets
        .iter()
        .filter(|t| t.subject.promotes_from(&source.subject))
        .collect();
    candidates.sort_by_key(|t| t.subject.rank());
    candidates.first().copied()
}

pub fn compute_default_pairings<'a>(
    sources: impl IntoIterator<Item = &'a ClassOffering>,
    targets: &[ClassOffering],
) -> PairingTable {
    let entries = sources
        .into_iter()
        .map(|source| {
            let decision = next_level_candidate(source, targets).map(|t| PairingDecision {
                target: t.id,
                professor: t.professor_id,
            });
            (source.id, decision)
        })
        .collect();
    PairingTable { entries }
}

/// Points `source` at `target` and resets its professor to the target's professor.
/// Any target-roster offering is accepted, including ones that are not a promotion.
pub fn apply_override(
    table: &PairingTable,
    source: OfferingId,
    target: OfferingId,
    targets: &[ClassOffering],
) -> Result<PairingTable> {
    ensure_source(table, source)?;
    let chosen = targets
        .iter()
        .find(|t| t.id == target)
        .ok_or_else(|| MigrateError::UnknownOffering {
            offering_id: target.0,
            roster: "target".to_string(),
        })?;

    let mut next = table.clone();
    next.entries.insert(
        source,
        Some(PairingDecision {
            target: chosen.id,
            professor: chosen.professor_id,
        }),
    );
    Ok(next)
}

pub fn clear_pairing(table: &PairingTable, source: OfferingId) -> Result<PairingTable> {
    ensure_source(table, source)?;
    let mut next = table.clone();
    next.entries.insert(source, None);
    Ok(next)
}

/// Reassigns the professor of an existing pairing. The professor must teach at
/// least one offering of the target roster.
pub fn assign_professor(
    table: &PairingTable,
    source: OfferingId,
    professor: ProfessorId,
    targets: &[ClassOffering],
) -> Result<PairingTable> {
    ensure_source(table, source)?;
    let decision = table.get(source).copied().ok_or(MigrateError::NotPaired {
        offering_id: source.0,
    })?;
    if !targets.iter().any(|t| t.professor_id == Some(professor)) {
        return Err(MigrateError::UnknownProfessor {
            professor_id: professor.0,
        });
    }

    let mut next = table.clone();
    next.entries.insert(
        source,
        Some(PairingDecision {
            professor: Some(professor),
            ..decision
        }),
    );
    Ok(next)
}

fn ensure_source(table: &PairingTable, source: OfferingId) -> Result<()> {
    if table.contains(source) {
        Ok(())
    } else {
        Err(MigrateError::UnknownOffering {
            offering_id: source.0,
            roster: "source".to_string(),
        })
    }
}
