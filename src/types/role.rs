use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The three coarse capability grants. The set is closed: anything else is
/// rejected wherever a role crosses a boundary (JSON, SQL, CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Writer,
    Reader,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Writer, Role::Reader];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Writer => "writer",
            Role::Reader => "reader",
        }
    }

    /// Converts a role string to its enum value.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "writer" => Some(Role::Writer),
            "reader" => Some(Role::Reader),
            _ => None,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Role::Admin => 1 << 0,
            Role::Writer => 1 << 1,
            Role::Reader => 1 << 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| Error::InvalidRole(s.to_string()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Role::parse(s)
            .ok_or_else(|| FromSqlError::Other(Box::new(Error::InvalidRole(s.to_string()))))
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// RoleSet is the set of roles stored for one user, packed as a bitmask.
///
/// Membership and capability are deliberately separate: `contains` answers
/// "is this role stored", `grants` answers "may this user act as" after the
/// hierarchy rule (admin implies writer and reader, writer implies reader).
/// The hierarchy lives here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    #[must_use]
    pub fn of(roles: &[Role]) -> RoleSet {
        roles.iter().copied().collect()
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn remove(&mut self, role: Role) {
        self.0 &= !role.bit();
    }

    /// Raw stored membership, no hierarchy applied.
    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Expands the stored set to include implied roles.
    #[must_use]
    pub const fn effective(self) -> RoleSet {
        let mut bits = self.0;
        if bits & Role::Admin.bit() != 0 {
            bits |= Role::Writer.bit();
        }
        if bits & Role::Writer.bit() != 0 {
            bits |= Role::Reader.bit();
        }
        RoleSet(bits)
    }

    /// Returns true if the user is treated as holding `role` once the
    /// hierarchy rule is applied.
    #[must_use]
    pub const fn grants(self, role: Role) -> bool {
        self.effective().contains(role)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.iter().count()
    }

    /// Stored roles, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }

    #[must_use]
    pub fn to_vec(self) -> Vec<Role> {
        self.iter().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::EMPTY;
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Role::as_str).collect();
        write!(f, "{}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_subsets() -> impl Iterator<Item = RoleSet> {
        (0u8..8).map(|bits| {
            let mut set = RoleSet::EMPTY;
            for role in Role::ALL {
                if bits & role.bit() != 0 {
                    set.insert(role);
                }
            }
            set
        })
    }

    #[test]
    fn grants_matches_hierarchy_rule_for_every_subset() {
        for set in all_subsets() {
            for role in Role::ALL {
                let expected = set.contains(role)
                    || (role == Role::Writer && set.contains(Role::Admin))
                    || (role == Role::Reader
                        && (set.contains(Role::Admin) || set.contains(Role::Writer)));
                assert_eq!(set.grants(role), expected, "set={set:?} role={role:?}");
            }
        }
    }

    #[test]
    fn admin_grants_everything() {
        let set = RoleSet::of(&[Role::Admin]);
        assert!(set.grants(Role::Admin));
        assert!(set.grants(Role::Writer));
        assert!(set.grants(Role::Reader));
        assert!(!set.contains(Role::Writer));
    }

    #[test]
    fn writer_grants_reader_but_not_admin() {
        let set = RoleSet::of(&[Role::Writer]);
        assert!(set.grants(Role::Writer));
        assert!(set.grants(Role::Reader));
        assert!(!set.grants(Role::Admin));
    }

    #[test]
    fn reader_grants_nothing_further() {
        let set = RoleSet::of(&[Role::Reader]);
        assert!(set.grants(Role::Reader));
        assert!(!set.grants(Role::Writer));
        assert!(!set.grants(Role::Admin));
    }

    #[test]
    fn empty_set_grants_nothing() {
        for role in Role::ALL {
            assert!(!RoleSet::EMPTY.grants(role));
        }
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse("moderator"), None);
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for role in Role::ALL {
            assert_eq!(Role::parse(&role.to_string()), Some(role));
        }
    }
}
