use crate::config::AuthMode;

/// The six sheets the dashboard knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Members,
    Savings,
    Products,
    Transactions,
    Inventory,
    Users,
}

impl Collection {
    /// Creation and seed order.
    pub const ALL: [Collection; 6] = [
        Collection::Members,
        Collection::Savings,
        Collection::Products,
        Collection::Transactions,
        Collection::Inventory,
        Collection::Users,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Members => "Members",
            Collection::Savings => "Savings",
            Collection::Products => "Products",
            Collection::Transactions => "Transactions",
            Collection::Inventory => "Inventory",
            Collection::Users => "Users",
        }
    }

    /// Exact sheet title match; sheet titles are case-sensitive upstream.
    pub fn from_name(name: &str) -> Option<Collection> {
        Collection::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// Header row written when the sheet is created.
    pub fn headers(&self, mode: AuthMode) -> Vec<&'static str> {
        match self {
            Collection::Members => vec!["ID", "Name", "Email", "Phone", "JoinDate"],
            Collection::Savings => vec!["MemberID", "Type", "Amount", "Date"],
            Collection::Products => vec!["ID", "Name", "Price", "Category", "Stock"],
            Collection::Transactions => {
                vec!["ID", "MemberID", "Type", "Amount", "Date", "Description"]
            }
            Collection::Inventory => vec!["ProductID", "Quantity", "LastUpdated"],
            Collection::Users => match mode {
                AuthMode::Session => vec!["Email", "Password", "Role", "Name"],
                AuthMode::OAuth => vec!["Email", "Role", "Name"],
            },
        }
    }

    /// `None` for append-only collections.
    pub fn id_field(&self) -> Option<&'static str> {
        match self {
            Collection::Members | Collection::Products | Collection::Transactions => Some("ID"),
            Collection::Inventory => Some("ProductID"),
            Collection::Users => Some("Email"),
            Collection::Savings => None,
        }
    }

    /// Prefix for generated record IDs, e.g. `MBR-1234`.
    pub fn id_prefix(&self) -> Option<&'static str> {
        match self {
            Collection::Members => Some("MBR"),
            Collection::Products => Some("PRD"),
            Collection::Transactions => Some("TX"),
            _ => None,
        }
    }

    /// Dashboard tab identifier.
    pub fn tab(&self) -> &'static str {
        match self {
            Collection::Members => "members",
            Collection::Savings => "savings",
            Collection::Products => "products",
            Collection::Transactions => "transactions",
            Collection::Inventory => "inventory",
            Collection::Users => "users",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_exact() {
        assert_eq!(Collection::from_name("Members"), Some(Collection::Members));
        assert_eq!(Collection::from_name("members"), None);
        assert_eq!(Collection::from_name("Loans"), None);
    }

    #[test]
    fn test_users_header_depends_on_auth_mode() {
        assert_eq!(
            Collection::Users.headers(AuthMode::Session),
            vec!["Email", "Password", "Role", "Name"]
        );
        assert_eq!(
            Collection::Users.headers(AuthMode::OAuth),
            vec!["Email", "Role", "Name"]
        );
    }

    #[test]
    fn test_savings_is_append_only() {
        assert_eq!(Collection::Savings.id_field(), None);
        assert_eq!(Collection::Savings.id_prefix(), None);
        assert_eq!(Collection::Inventory.id_field(), Some("ProductID"));
    }
}
