//! Actor roles and role classification.
//!
//! Role tags arrive from the identity provider as opaque strings; this
//! module closes them into an enum so a bad tag is a parse error at the
//! boundary, not a silent mismatch deep in the workflow. The
//! classification predicates here are the single source of truth for
//! both step visibility and checklist required-ness.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A role an actor can hold within an institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
    AcademicDirector,
    Registrar,
    Bursar,
    Accountant,
}

impl Role {
    /// Administrative roles with full onboarding access.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::SchoolAdmin)
    }

    /// Roles responsible for academic structure (calendar, classes).
    pub fn is_academic(&self) -> bool {
        matches!(self, Self::AcademicDirector | Self::Registrar)
    }

    /// Finance roles (fee structure, billing).
    pub fn is_finance(&self) -> bool {
        matches!(self, Self::Bursar | Self::Accountant)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SuperAdmin => "super_admin",
            Self::SchoolAdmin => "school_admin",
            Self::AcademicDirector => "academic_director",
            Self::Registrar => "registrar",
            Self::Bursar => "bursar",
            Self::Accountant => "accountant",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "super_admin" => Ok(Self::SuperAdmin),
            "school_admin" => Ok(Self::SchoolAdmin),
            "academic_director" => Ok(Self::AcademicDirector),
            "registrar" => Ok(Self::Registrar),
            "bursar" => Ok(Self::Bursar),
            "accountant" => Ok(Self::Accountant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// The set of roles held by the current actor.
///
/// Actors commonly hold more than one role (e.g. a school admin who is
/// also the bursar at a small campus).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(role: Role) -> Self {
        Self(BTreeSet::from([role]))
    }

    pub fn insert(&mut self, role: Role) {
        self.0.insert(role);
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    /// Whether any held role is administrative.
    pub fn any_admin(&self) -> bool {
        self.0.iter().any(Role::is_admin)
    }

    /// Whether any held role is academic.
    pub fn any_academic(&self) -> bool {
        self.0.iter().any(Role::is_academic)
    }

    /// Whether any held role is a finance role.
    pub fn any_finance(&self) -> bool {
        self.0.iter().any(Role::is_finance)
    }

    /// Finance-only actors get a stricter go-live gate: the fee structure
    /// is required for them, merely advisory for admins.
    pub fn finance_only(&self) -> bool {
        self.any_finance() && !self.any_admin()
    }

    /// Parse a comma-separated role list (the identity header format).
    /// Fails on the first unknown tag.
    pub fn parse_list(s: &str) -> Result<Self, String> {
        let mut set = BTreeSet::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            set.insert(part.parse::<Role>()?);
        }
        Ok(Self(set))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        let roles = [
            Role::SuperAdmin,
            Role::SchoolAdmin,
            Role::AcademicDirector,
            Role::Registrar,
            Role::Bursar,
            Role::Accountant,
        ];
        for role in roles {
            let display = format!("{role}");
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(format!("\"{display}\""), json);
            let parsed: Role = display.parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("janitor".parse::<Role>().is_err());
        assert!(RoleSet::parse_list("school_admin,janitor").is_err());
    }

    #[test]
    fn parse_list_skips_blanks() {
        let set = RoleSet::parse_list("school_admin, bursar,,").unwrap();
        assert!(set.contains(Role::SchoolAdmin));
        assert!(set.contains(Role::Bursar));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn classification_predicates() {
        assert!(Role::SuperAdmin.is_admin());
        assert!(Role::SchoolAdmin.is_admin());
        assert!(Role::AcademicDirector.is_academic());
        assert!(Role::Registrar.is_academic());
        assert!(Role::Bursar.is_finance());
        assert!(Role::Accountant.is_finance());
        assert!(!Role::Bursar.is_admin());
    }

    #[test]
    fn finance_only_requires_no_admin() {
        let bursar = RoleSet::single(Role::Bursar);
        assert!(bursar.finance_only());

        let admin_bursar: RoleSet =
            [Role::SchoolAdmin, Role::Bursar].into_iter().collect();
        assert!(admin_bursar.any_finance());
        assert!(!admin_bursar.finance_only());

        let admin = RoleSet::single(Role::SchoolAdmin);
        assert!(!admin.finance_only());
    }
}
