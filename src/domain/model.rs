use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(PeriodId);
id_type!(SubjectId);
id_type!(ProfessorId);
id_type!(OfferingId);
id_type!(StudentId);
id_type!(EnrollmentId);

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub level: i32,
    pub sublevel: i32,
}

impl Subject {
    /// Sort key used when choosing the next step for a promotion.
    pub fn rank(&self) -> (i32, i32) {
        (self.level, self.sublevel)
    }

    /// True when `self` is strictly further along than `from`: a later
    /// sublevel of the same level, or any higher level.
    pub fn promotes_from(&self, from: &Subject) -> bool {
        (self.level == from.level && self.sublevel > from.sublevel) || self.level > from.level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: ProfessorId,
    /// Placeholder and admin accounts may have no name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// One subject taught in one period by one professor, as returned by the
/// `classes` table joined with `subjects` and `professors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOffering {
    pub id: OfferingId,
    #[serde(default)]
    pub period_id: Option<PeriodId>,
    pub subject_id: SubjectId,
    #[serde(default)]
    pub professor_id: Option<ProfessorId>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(rename = "subjects")]
    pub subject: Subject,
    #[serde(rename = "professors", default)]
    pub professor: Option<Professor>,
}

impl ClassOffering {
    pub fn has_professor_role(&self, role: &str) -> bool {
        self.professor
            .as_ref()
            .and_then(|p| p.role.as_deref())
            .map(|r| r == role)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EnrollmentId>,
    pub student_id: StudentId,
    #[serde(rename = "class_id")]
    pub offering_id: OfferingId,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Enrollment {
    /// A not-yet-persisted enrollment row.
    pub fn new(student_id: StudentId, offering_id: OfferingId) -> Self {
        Self {
            id: None,
            student_id,
            offering_id,
            active: true,
        }
    }
}

/// A source offering as shown to the operator before migrating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOffering {
    pub offering: ClassOffering,
    pub active_enrollments: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rosters {
    pub source: Vec<SourceOffering>,
    pub target: Vec<ClassOffering>,
}

impl Rosters {
    pub fn source_offerings(&self) -> impl Iterator<Item = &ClassOffering> {
        self.source.iter().map(|s| &s.offering)
    }

    pub fn find_source(&self, id: OfferingId) -> Option<&SourceOffering> {
        self.source.iter().find(|s| s.offering.id == id)
    }

    pub fn find_target(&self, id: OfferingId) -> Option<&ClassOffering> {
        self.target.iter().find(|c| c.id == id)
    }

    pub fn total_students(&self) -> u64 {
        self.source.iter().map(|s| s.active_enrollments).sum()
    }

    /// Distinct professors of the target roster, in first-seen order.
    pub fn target_professors(&self) -> Vec<&Professor> {
        let mut seen = Vec::new();
        for professor in self.target.iter().filter_map(|c| c.professor.as_ref()) {
            if !seen.iter().any(|p: &&Professor| p.id == professor.id) {
                seen.push(professor);
            }
        }
        seen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Professor,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Professor => "professor",
            Role::Student => "student",
        };
        write!(f, "{}", name)
    }
}

/// The signed-in user, passed explicitly to whatever talks to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub token: String,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
