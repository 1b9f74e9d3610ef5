use crate::models::Collection;
use serde::{Deserialize, Serialize};

/// Identity carried by the session marker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct SessionUser {
    pub email: String,
    pub role: String,
    pub name: String,
}

impl SessionUser {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    /// Cooperative staff.
    Pengurus,
    /// Regular member.
    Anggota,
    Other(String),
}

impl Role {
    pub fn parse(value: &str) -> Role {
        match value.trim() {
            "Admin" => Role::Admin,
            "Pengurus" => Role::Pengurus,
            "Anggota" => Role::Anggota,
            other => Role::Other(other.to_string()),
        }
    }

    /// Whether this role may add or change rows in `collection`.
    /// Sheets outside the known collections are admin-only.
    pub fn can_write(&self, collection: Option<Collection>) -> bool {
        match self {
            Role::Admin => true,
            Role::Pengurus => matches!(
                collection,
                Some(Collection::Inventory) | Some(Collection::Transactions)
            ),
            Role::Anggota | Role::Other(_) => false,
        }
    }

    /// Dashboard tabs this role may add data to.
    pub fn writable_tabs(&self) -> Vec<&'static str> {
        Collection::ALL
            .iter()
            .filter(|c| self.can_write(Some(**c)))
            .map(|c| c.tab())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_writes_everything() {
        let role = Role::parse("Admin");
        assert!(role.can_write(Some(Collection::Members)));
        assert!(role.can_write(None));
        assert_eq!(role.writable_tabs().len(), Collection::ALL.len());
    }

    #[test]
    fn test_pengurus_limited_to_inventory_and_transactions() {
        let role = Role::parse("Pengurus");
        assert!(role.can_write(Some(Collection::Inventory)));
        assert!(role.can_write(Some(Collection::Transactions)));
        assert!(!role.can_write(Some(Collection::Members)));
        assert!(!role.can_write(None));
        assert_eq!(role.writable_tabs(), vec!["transactions", "inventory"]);
    }

    #[test]
    fn test_anggota_and_unknown_roles_are_read_only() {
        assert!(Role::parse("Anggota").writable_tabs().is_empty());
        let other = Role::parse("Tamu");
        assert_eq!(other, Role::Other("Tamu".to_string()));
        assert!(!other.can_write(Some(Collection::Savings)));
    }
}
