use crate::core::pairing::{self, PairingDecision, PairingTable};
use crate::domain::model::{
    ClassOffering, Enrollment, OfferingId, Period, PeriodId, ProfessorId, Rosters, SourceOffering,
    StudentId,
};
use crate::domain::ports::{Query, RecordStore};
use crate::utils::error::{MigrateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const ROSTER_COLUMNS: &str = "id,period_id,subject_id,professor_id,active,\
subjects(id,name,level,sublevel),professors(id,name,role)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerPhase {
    Idle,
    RostersLoaded,
    Selected,
    Executed,
}

impl PlannerPhase {
    fn name(&self) -> &'static str {
        match self {
            PlannerPhase::Idle => "idle",
            PlannerPhase::RostersLoaded => "rosters loaded",
            PlannerPhase::Selected => "selection made",
            PlannerPhase::Executed => "migration executed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Migrated { count: usize },
    DryRun { count: usize },
    NothingToMigrate,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub source_period: PeriodId,
    pub target_period: PeriodId,
    pub offerings: usize,
    pub outcome: MigrationOutcome,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct StudentRow {
    student_id: StudentId,
}

/// Drives one migration session: load both rosters, pair, edit, select, execute.
pub struct MigrationPlanner<S: RecordStore> {
    store: S,
    professor_role: String,
    periods: Option<(PeriodId, PeriodId)>,
    rosters: Rosters,
    pairings: PairingTable,
    selected: BTreeSet<OfferingId>,
    phase: PlannerPhase,
}

impl<S: RecordStore> MigrationPlanner<S> {
    pub fn new(store: S, professor_role: impl Into<String>) -> Self {
        Self {
            store,
            professor_role: professor_role.into(),
            periods: None,
            rosters: Rosters::default(),
            pairings: PairingTable::default(),
            selected: BTreeSet::new(),
            phase: PlannerPhase::Idle,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> PlannerPhase {
        self.phase
    }

    pub fn periods(&self) -> Option<(PeriodId, PeriodId)> {
        self.periods
    }

    pub fn rosters(&self) -> &Rosters {
        &self.rosters
    }

    pub fn pairings(&self) -> &PairingTable {
        &self.pairings
    }

    pub fn selected(&self) -> &BTreeSet<OfferingId> {
        &self.selected
    }

    pub async fn list_periods(&self) -> Result<Vec<Period>> {
        let rows = self
            .store
            .select(&Query::table("periods").select("id,name,active").order("id"))
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(MigrateError::from))
            .collect()
    }

    /// Fetches both rosters and computes the default pairings. A failed load
    /// leaves the previous session untouched; a successful one replaces it.
    pub async fn load_rosters(&mut self, source: PeriodId, target: PeriodId) -> Result<&Rosters> {
        if source == target {
            tracing::warn!("Source and target period are both {}", source);
        }
        tracing::info!("Loading rosters for periods {} -> {}", source, target);

        let (source_classes, target_classes) =
            tokio::try_join!(self.fetch_roster(source), self.fetch_roster(target))?;

        let mut source_roster = Vec::with_capacity(source_classes.len());
        for offering in source_classes {
            let active_enrollments = self
                .store
                .count(&active_enrollments_of(offering.id))
                .await
                .map_err(|e| load_failure(source, e))?;
            source_roster.push(SourceOffering {
                offering,
                active_enrollments,
            });
        }

        let rosters = Rosters {
            source: source_roster,
            target: target_classes,
        };
        let pairings = pairing::compute_default_pairings(rosters.source_offerings(), &rosters.target);

        tracing::info!(
            "Loaded {} source and {} target offerings, {} paired by default",
            rosters.source.len(),
            rosters.target.len(),
            pairings.paired_count()
        );

        self.periods = Some((source, target));
        self.rosters = rosters;
        self.pairings = pairings;
        self.selected.clear();
        self.phase = PlannerPhase::RostersLoaded;
        Ok(&self.rosters)
    }

    async fn fetch_roster(&self, period: PeriodId) -> Result<Vec<ClassOffering>> {
        let query = Query::table("classes")
            .select(ROSTER_COLUMNS)
            .eq("period_id", period.0)
            .eq("active", true);
        let rows = self
            .store
            .select(&query)
            .await
            .map_err(|e| load_failure(period, e))?;

        let mut offerings = Vec::with_capacity(rows.len());
        for row in rows {
            let offering: ClassOffering =
                serde_json::from_value(row).map_err(|e| load_failure(period, e.into()))?;
            if offering.has_professor_role(&self.professor_role) {
                offerings.push(offering);
            } else {
                tracing::debug!(
                    "Skipping class {} in period {}: professor is not a '{}'",
                    offering.id,
                    period,
                    self.professor_role
                );
            }
        }
        Ok(offerings)
    }

    pub fn override_pairing(&mut self, source: OfferingId, target: OfferingId) -> Result<()> {
        self.ensure_editable()?;
        self.pairings =
            pairing::apply_override(&self.pairings, source, target, &self.rosters.target)?;
        tracing::debug!("Class {} now migrates to {}", source, target);
        Ok(())
    }

    pub fn clear_pairing(&mut self, source: OfferingId) -> Result<()> {
        self.ensure_editable()?;
        self.pairings = pairing::clear_pairing(&self.pairings, source)?;
        Ok(())
    }

    pub fn assign_professor(&mut self, source: OfferingId, professor: ProfessorId) -> Result<()> {
        self.ensure_editable()?;
        self.pairings =
            pairing::assign_professor(&self.pairings, source, professor, &self.rosters.target)?;
        Ok(())
    }

    /// Replaces the selection. Every id must belong to the source roster.
    pub fn select(&mut self, sources: impl IntoIterator<Item = OfferingId>) -> Result<()> {
        self.ensure_editable()?;
        let mut selection = BTreeSet::new();
        for id in sources {
            if self.rosters.find_source(id).is_none() {
                return Err(MigrateError::UnknownOffering {
                    offering_id: id.0,
                    roster: "source".to_string(),
                });
            }
            selection.insert(id);
        }
        self.selected = selection;
        self.phase = PlannerPhase::Selected;
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<()> {
        let all: Vec<OfferingId> = self.rosters.source_offerings().map(|c| c.id).collect();
        self.select(all)
    }

    /// Returns whether `source` is selected after the toggle.
    pub fn toggle(&mut self, source: OfferingId) -> Result<bool> {
        let mut selection = self.selected.clone();
        let now_selected = if selection.remove(&source) {
            false
        } else {
            selection.insert(source);
            true
        };
        self.select(selection)?;
        Ok(now_selected)
    }

    /// Selected offerings that also have a target, in source roster order.
    pub fn resolved_selections(&self) -> Vec<(OfferingId, PairingDecision)> {
        self.rosters
            .source_offerings()
            .filter(|c| self.selected.contains(&c.id))
            .filter_map(|c| self.pairings.get(c.id).map(|d| (c.id, *d)))
            .collect()
    }

    /// Reads the active enrollments of every resolved selection and remaps them
    /// to the paired target offering.
    pub async fn stage(&self) -> Result<Vec<Enrollment>> {
        let mut staged = Vec::new();
        for (source, decision) in self.resolved_selections() {
            let rows = self
                .store
                .select(&active_enrollments_of(source).select("student_id"))
                .await?;
            tracing::debug!(
                "Class {} -> {}: {} enrollments",
                source,
                decision.target,
                rows.len()
            );
            for row in rows {
                let student: StudentRow = serde_json::from_value(row)?;
                staged.push(Enrollment::new(student.student_id, decision.target));
            }
        }
        Ok(staged)
    }

    /// Copies the enrollments of the resolved selections with one batch insert.
    /// Source enrollments are never deactivated. The write is not transactional
    /// from this side: a rejected batch is reported as-is.
    pub async fn execute(&mut self, dry_run: bool) -> Result<MigrationReport> {
        let (source_period, target_period) = self.periods.ok_or_else(|| self.invalid_state())?;
        if self.phase == PlannerPhase::Executed {
            return Err(self.invalid_state());
        }

        let offerings = self.resolved_selections().len();
        let staged = self.stage().await?;

        let outcome = if staged.is_empty() {
            tracing::warn!("Nothing to migrate");
            MigrationOutcome::NothingToMigrate
        } else if dry_run {
            tracing::info!("Dry run: {} enrollments would be copied", staged.len());
            MigrationOutcome::DryRun {
                count: staged.len(),
            }
        } else {
            let count = staged.len();
            let rows = staged
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            self.store
                .insert("enrollments", rows)
                .await
                .map_err(write_failure)?;
            tracing::info!(
                "Migrated {} enrollments from {} classes ({} -> {})",
                count,
                offerings,
                source_period,
                target_period
            );
            MigrationOutcome::Migrated { count }
        };

        if !dry_run {
            self.phase = PlannerPhase::Executed;
        }

        Ok(MigrationReport {
            source_period,
            target_period,
            offerings,
            outcome,
            executed_at: Utc::now(),
        })
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.phase {
            PlannerPhase::RostersLoaded | PlannerPhase::Selected => Ok(()),
            _ => Err(self.invalid_state()),
        }
    }

    fn invalid_state(&self) -> MigrateError {
        MigrateError::InvalidState {
            expected: "rosters loaded".to_string(),
            actual: self.phase.name().to_string(),
        }
    }
}

fn active_enrollments_of(offering: OfferingId) -> Query {
    Query::table("enrollments")
        .eq("class_id", offering.0)
        .eq("active", true)
}

fn load_failure(period: PeriodId, error: MigrateError) -> MigrateError {
    let message = match error {
        MigrateError::StoreError { message, .. } => message,
        other => other.to_string(),
    };
    MigrateError::LoadFailure {
        period_id: period.0,
        message,
    }
}

fn write_failure(error: MigrateError) -> MigrateError {
    let message = match error {
        MigrateError::StoreError { message, .. } => message,
        other => other.to_string(),
    };
    MigrateError::WriteFailure { message }
}
