#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Lead = 2,
    Member = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Lead),
            3 => Some(Role::Member),
            _ => None,
        }
    }

    /// Only members work a team check-in schedule; admins and leads float.
    pub fn requires_team(&self) -> bool {
        matches!(self, Role::Member)
    }
}
