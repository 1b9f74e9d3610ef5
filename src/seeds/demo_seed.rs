use crate::config::AuthMode;
use crate::models::Collection;

/// Canned rows written by the seed endpoint, in header order.
pub fn demo_rows(collection: Collection, mode: AuthMode) -> Vec<Vec<String>> {
    let rows: Vec<Vec<&str>> = match collection {
        Collection::Members => vec![
            vec!["MBR-1001", "Budi Santoso", "budi@email.com", "08123456789", "01/01/2024"],
            vec!["MBR-1002", "Siti Aminah", "siti@email.com", "08129876543", "15/01/2024"],
            vec!["MBR-1003", "Agus Setiawan", "agus@email.com", "08131122334", "02/02/2024"],
        ],
        Collection::Savings => vec![
            vec!["MBR-1001", "Simpanan Pokok", "500000", "01/01/2024"],
            vec!["MBR-1001", "Simpanan Wajib", "50000", "01/02/2024"],
            vec!["MBR-1002", "Simpanan Pokok", "500000", "15/01/2024"],
        ],
        Collection::Products => vec![
            vec!["PRD-2001", "Beras Premium 5kg", "75000", "Sembako", "50"],
            vec!["PRD-2002", "Minyak Goreng 2L", "35000", "Sembako", "30"],
            vec!["PRD-2003", "Gula Pasir 1kg", "16000", "Sembako", "100"],
            vec!["PRD-2004", "Sabun Mandi", "5000", "Kebutuhan Rumah", "5"],
        ],
        Collection::Transactions => vec![
            vec!["TX-3001", "MBR-1001", "Simpanan", "500000", "01/01/2024", "Setoran Awal"],
            vec!["TX-3002", "MBR-1002", "Simpanan", "500000", "15/01/2024", "Setoran Awal"],
            vec!["TX-3003", "MBR-1001", "Belanja", "75000", "05/02/2024", "Pembelian Beras"],
        ],
        Collection::Inventory => vec![
            vec!["PRD-2001", "50", "05/02/2024"],
            vec!["PRD-2002", "30", "05/02/2024"],
            vec!["PRD-2003", "100", "05/02/2024"],
        ],
        // Email, Password, Role, Name
        Collection::Users => vec![
            vec!["admin@koperasi.com", "admin123", "Admin", "Administrator"],
            vec!["staff@koperasi.com", "staff123", "Pengurus", "Staff Koperasi"],
            vec!["budi@email.com", "budi123", "Anggota", "Budi Santoso"],
        ],
    };

    rows.into_iter()
        .map(|row| {
            let row = match (collection, mode) {
                // The OAuth Users sheet has no Password column
                (Collection::Users, AuthMode::OAuth) => {
                    row.into_iter().enumerate().filter(|(i, _)| *i != 1).map(|(_, c)| c).collect()
                }
                _ => row,
            };
            row.into_iter().map(String::from).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_match_header_width() {
        for mode in [AuthMode::Session, AuthMode::OAuth] {
            for collection in Collection::ALL {
                let width = collection.headers(mode).len();
                for row in demo_rows(collection, mode) {
                    assert_eq!(row.len(), width, "{} row width", collection.name());
                }
            }
        }
    }

    #[test]
    fn test_oauth_users_drop_password() {
        let rows = demo_rows(Collection::Users, AuthMode::OAuth);
        assert_eq!(rows[2], vec!["budi@email.com", "Anggota", "Budi Santoso"]);
    }
}
