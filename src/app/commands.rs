use crate::core::planner::{MigrationPlanner, MigrationReport};
use crate::core::preview::MigrationPreview;
use crate::domain::model::{OfferingId, PeriodId, ProfessorId, Session};
use crate::domain::ports::RecordStore;
use crate::utils::error::{MigrateError, Result};

/// Edits applied on top of the default pairing, in this order: unpair, pair, professor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRequest {
    pub source: PeriodId,
    pub target: PeriodId,
    pub unpair: Vec<OfferingId>,
    pub pairs: Vec<(OfferingId, OfferingId)>,
    pub professors: Vec<(OfferingId, ProfessorId)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(Vec<OfferingId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateRequest {
    pub plan: PlanRequest,
    pub selection: Selection,
    pub dry_run: bool,
}

pub async fn prepare_plan<S: RecordStore>(
    planner: &mut MigrationPlanner<S>,
    request: &PlanRequest,
) -> Result<MigrationPreview> {
    planner.load_rosters(request.source, request.target).await?;

    for source in &request.unpair {
        planner.clear_pairing(*source)?;
    }
    for (source, target) in &request.pairs {
        planner.override_pairing(*source, *target)?;
    }
    for (source, professor) in &request.professors {
        planner.assign_professor(*source, *professor)?;
    }

    MigrationPreview::from_planner(planner)
}

pub async fn migrate<S: RecordStore>(
    planner: &mut MigrationPlanner<S>,
    request: &MigrateRequest,
) -> Result<(MigrationPreview, MigrationReport)> {
    prepare_plan(planner, &request.plan).await?;

    match &request.selection {
        Selection::All => planner.select_all()?,
        Selection::Only(ids) => planner.select(ids.iter().copied())?,
    }

    let skipped = planner.selected().len() - planner.resolved_selections().len();
    if skipped > 0 {
        tracing::warn!("{} selected classes have no target and will be skipped", skipped);
    }

    let preview = MigrationPreview::from_planner(planner)?;
    let report = planner.execute(request.dry_run).await?;
    Ok((preview, report))
}

/// Migrations write to other users' records; only administrators may run them.
pub fn ensure_admin(session: Option<&Session>) -> Result<()> {
    match session {
        Some(session) if !session.is_admin() => Err(MigrateError::AuthError {
            message: format!(
                "{} is signed in as {}, migrations require an admin",
                session.email, session.role
            ),
        }),
        _ => Ok(()),
    }
}
