//! Step registry and role gate.
//!
//! The onboarding sequence is a fixed, globally ordered list of steps.
//! Each step carries the set of roles allowed to see and act on it; an
//! empty set means the step is visible to everyone. The role gate
//! filters the registry down to the sub-sequence visible to an actor,
//! always preserving canonical order.

use serde::{Deserialize, Serialize};

use crate::roles::{Role, RoleSet};

/// Identifier for an onboarding step, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    InstitutionProfile,
    AcademicCalendar,
    ClassSetup,
    SubjectSetup,
    FeeStructure,
    DataImport,
    GoLive,
}

impl StepId {
    /// All steps in canonical order.
    pub const ALL: [StepId; 7] = [
        StepId::InstitutionProfile,
        StepId::AcademicCalendar,
        StepId::ClassSetup,
        StepId::SubjectSetup,
        StepId::FeeStructure,
        StepId::DataImport,
        StepId::GoLive,
    ];

    /// Position in the canonical order.
    pub fn position(&self) -> usize {
        match self {
            Self::InstitutionProfile => 0,
            Self::AcademicCalendar => 1,
            Self::ClassSetup => 2,
            Self::SubjectSetup => 3,
            Self::FeeStructure => 4,
            Self::DataImport => 5,
            Self::GoLive => 6,
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InstitutionProfile => "institution_profile",
            Self::AcademicCalendar => "academic_calendar",
            Self::ClassSetup => "class_setup",
            Self::SubjectSetup => "subject_setup",
            Self::FeeStructure => "fee_structure",
            Self::DataImport => "data_import",
            Self::GoLive => "go_live",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "institution_profile" => Ok(Self::InstitutionProfile),
            "academic_calendar" => Ok(Self::AcademicCalendar),
            "class_setup" => Ok(Self::ClassSetup),
            "subject_setup" => Ok(Self::SubjectSetup),
            "fee_structure" => Ok(Self::FeeStructure),
            "data_import" => Ok(Self::DataImport),
            "go_live" => Ok(Self::GoLive),
            other => Err(format!("Unknown step id: {other}")),
        }
    }
}

/// A single entry in the step registry.
#[derive(Debug, Clone, Serialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    pub description: &'static str,
    /// Roles allowed to see/edit this step. Empty = visible to all roles.
    pub visible_to_roles: &'static [Role],
}

impl StepDefinition {
    /// Whether an actor holding `roles` can see this step.
    pub fn visible_to(&self, roles: &RoleSet) -> bool {
        self.visible_to_roles.is_empty()
            || self.visible_to_roles.iter().any(|r| roles.contains(*r))
    }
}

/// The full onboarding step registry, in canonical order.
pub static STEPS: [StepDefinition; 7] = [
    StepDefinition {
        id: StepId::InstitutionProfile,
        title: "Institution profile",
        description: "Name, contact details and branding for the school",
        visible_to_roles: &[],
    },
    StepDefinition {
        id: StepId::AcademicCalendar,
        title: "Academic calendar",
        description: "Academic years and terms",
        visible_to_roles: &[
            Role::SuperAdmin,
            Role::SchoolAdmin,
            Role::AcademicDirector,
            Role::Registrar,
        ],
    },
    StepDefinition {
        id: StepId::ClassSetup,
        title: "Classes",
        description: "Class levels and streams",
        visible_to_roles: &[
            Role::SuperAdmin,
            Role::SchoolAdmin,
            Role::AcademicDirector,
            Role::Registrar,
        ],
    },
    StepDefinition {
        id: StepId::SubjectSetup,
        title: "Subjects",
        description: "Subjects taught per class level",
        visible_to_roles: &[Role::SuperAdmin, Role::SchoolAdmin, Role::AcademicDirector],
    },
    StepDefinition {
        id: StepId::FeeStructure,
        title: "Fee structure",
        description: "Fee items and amounts per class and term",
        visible_to_roles: &[
            Role::SuperAdmin,
            Role::SchoolAdmin,
            Role::Bursar,
            Role::Accountant,
        ],
    },
    StepDefinition {
        id: StepId::DataImport,
        title: "Data import",
        description: "Bulk import of students and staff",
        visible_to_roles: &[Role::SuperAdmin, Role::SchoolAdmin],
    },
    StepDefinition {
        id: StepId::GoLive,
        title: "Go live",
        description: "Review readiness and open the institution",
        visible_to_roles: &[],
    },
];

/// Filter the registry down to the steps visible to `roles`.
///
/// Pure, order-preserving. An actor whose roles intersect nothing still
/// gets the all-roles steps; callers must tolerate an empty result.
pub fn visible_steps(roles: &RoleSet) -> Vec<&'static StepDefinition> {
    STEPS.iter().filter(|s| s.visible_to(roles)).collect()
}

/// Ids of the steps visible to `roles`, in canonical order.
pub fn visible_step_ids(roles: &RoleSet) -> Vec<StepId> {
    visible_steps(roles).iter().map(|s| s.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_in_canonical_order_without_duplicates() {
        let ids: Vec<StepId> = STEPS.iter().map(|s| s.id).collect();
        assert_eq!(ids, StepId::ALL.to_vec());
        for window in ids.windows(2) {
            assert!(window[0].position() < window[1].position());
        }
    }

    #[test]
    fn display_matches_serde() {
        for step in StepId::ALL {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{display}\""), json);
            let parsed: StepId = display.parse().unwrap();
            assert_eq!(parsed, step);
        }
    }

    #[test]
    fn admin_sees_every_step() {
        let roles = RoleSet::single(Role::SchoolAdmin);
        assert_eq!(visible_step_ids(&roles), StepId::ALL.to_vec());
    }

    #[test]
    fn registrar_sees_records_subset() {
        let roles = RoleSet::single(Role::Registrar);
        assert_eq!(
            visible_step_ids(&roles),
            vec![
                StepId::InstitutionProfile,
                StepId::AcademicCalendar,
                StepId::ClassSetup,
                StepId::GoLive,
            ]
        );
    }

    #[test]
    fn bursar_sees_finance_subset() {
        let roles = RoleSet::single(Role::Bursar);
        assert_eq!(
            visible_step_ids(&roles),
            vec![
                StepId::InstitutionProfile,
                StepId::FeeStructure,
                StepId::GoLive,
            ]
        );
    }

    #[test]
    fn empty_role_set_sees_only_unrestricted_steps() {
        let roles = RoleSet::new();
        assert_eq!(
            visible_step_ids(&roles),
            vec![StepId::InstitutionProfile, StepId::GoLive]
        );
    }

    #[test]
    fn visibility_is_a_subsequence_of_canonical_order() {
        let combos = [
            RoleSet::single(Role::SuperAdmin),
            RoleSet::single(Role::AcademicDirector),
            RoleSet::single(Role::Accountant),
            [Role::Registrar, Role::Bursar].into_iter().collect(),
        ];
        for roles in combos {
            let ids = visible_step_ids(&roles);
            let mut last = None;
            for id in &ids {
                assert!(StepId::ALL.contains(id));
                if let Some(prev) = last {
                    assert!(id.position() > prev, "order must be preserved");
                }
                last = Some(id.position());
            }
        }
    }
}
