use crate::core::planner::MigrationPlanner;
use crate::domain::model::{OfferingId, PeriodId, ProfessorId};
use crate::domain::ports::RecordStore;
use crate::utils::error::{MigrateError, Result};
use crate::utils::validation::validate_file_extension;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

/// One line of the migration preview table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub source_class_id: OfferingId,
    pub source_subject: String,
    pub source_level: i32,
    pub source_sublevel: i32,
    pub students: u64,
    pub selected: bool,
    pub target_class_id: Option<OfferingId>,
    pub target_subject: Option<String>,
    pub target_level: Option<i32>,
    pub target_sublevel: Option<i32>,
    pub professor_id: Option<ProfessorId>,
    pub professor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationPreview {
    pub source_period: PeriodId,
    pub target_period: PeriodId,
    pub rows: Vec<PreviewRow>,
    pub total_students: u64,
}

impl MigrationPreview {
    pub fn from_planner<S: RecordStore>(planner: &MigrationPlanner<S>) -> Result<Self> {
        let (source_period, target_period) =
            planner
                .periods()
                .ok_or_else(|| MigrateError::InvalidState {
                    expected: "rosters loaded".to_string(),
                    actual: "idle".to_string(),
                })?;
        let rosters = planner.rosters();

        let rows = rosters
            .source
            .iter()
            .map(|source| {
                let decision = planner.pairings().get(source.offering.id);
                let target = decision.and_then(|d| rosters.find_target(d.target));
                let professor_id = decision.and_then(|d| d.professor);
                let professor_name = professor_id.and_then(|id| {
                    rosters
                        .target_professors()
                        .into_iter()
                        .find(|p| p.id == id)
                        .and_then(|p| p.name.clone())
                });
                PreviewRow {
                    source_class_id: source.offering.id,
                    source_subject: source.offering.subject.name.clone(),
                    source_level: source.offering.subject.level,
                    source_sublevel: source.offering.subject.sublevel,
                    students: source.active_enrollments,
                    selected: planner.selected().contains(&source.offering.id),
                    target_class_id: target.map(|t| t.id),
                    target_subject: target.map(|t| t.subject.name.clone()),
                    target_level: target.map(|t| t.subject.level),
                    target_sublevel: target.map(|t| t.subject.sublevel),
                    professor_id,
                    professor_name,
                }
            })
            .collect();

        Ok(Self {
            source_period,
            target_period,
            rows,
            total_students: rosters.total_students(),
        })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the preview as CSV or JSON depending on the file extension.
    pub fn save(&self, path: &str) -> Result<()> {
        let extension = validate_file_extension("output", path, &["csv", "json"])?;
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if extension == "csv" {
            let mut buffer = Vec::new();
            self.write_csv(&mut buffer)?;
            fs::write(path, buffer)?;
        } else {
            fs::write(path, self.to_json()?)?;
        }
        tracing::debug!("Preview written to {}", path);
        Ok(())
    }

    /// Fixed-width table for the terminal.
    pub fn render_table(&self) -> String {
        let mut lines = vec![format!(
            "{:<3} {:>6} {:<24} {:>7} {:>8}  {:<24} {:>7} {:<20}",
            "✔", "class", "subject", "lvl/sub", "students", "new subject", "lvl/sub", "professor"
        )];
        for row in &self.rows {
            let target_rank = match (row.target_level, row.target_sublevel) {
                (Some(level), Some(sublevel)) => format!("{}/{}", level, sublevel),
                _ => "-".to_string(),
            };
            lines.push(format!(
                "{:<3} {:>6} {:<24} {:>7} {:>8}  {:<24} {:>7} {:<20}",
                if row.selected { "x" } else { "" },
                row.source_class_id,
                row.source_subject,
                format!("{}/{}", row.source_level, row.source_sublevel),
                row.students,
                row.target_subject.as_deref().unwrap_or("-"),
                target_rank,
                row.professor_name.as_deref().unwrap_or("-"),
            ));
        }
        lines.push(format!("Total students: {}", self.total_students));
        lines.join("\n")
    }
}
