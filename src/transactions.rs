// 💳 Transactions - immutable input rows for one persona
// Parsed once from CSV, never mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Category label that is never counted as spend.
pub const INCOME_CATEGORY: &str = "Income";

/// Transaction value as read from `transactions.csv`
/// Header: date,category,merchant,amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Calendar date string (kept verbatim)
    pub date: String,

    /// Spend category label (e.g. "Dining")
    pub category: String,

    /// Merchant label
    pub merchant: String,

    /// Signed amount
    pub amount: f64,
}

impl Transaction {
    pub fn new(date: &str, category: &str, merchant: &str, amount: f64) -> Self {
        Transaction {
            date: date.to_string(),
            category: category.to_string(),
            merchant: merchant.to_string(),
            amount,
        }
    }

    pub fn is_income(&self) -> bool {
        self.category == INCOME_CATEGORY
    }
}

/// Load all transactions from a CSV file.
///
/// A malformed row aborts the load and names the file and 1-based line.
pub fn load_transactions(csv_path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open transactions file: {}", csv_path.display()))?;

    let mut transactions = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        // +2: header line plus 1-based numbering
        let transaction: Transaction = result.with_context(|| {
            format!(
                "Malformed transaction row at {}:{}",
                csv_path.display(),
                index + 2
            )
        })?;

        if !transaction.amount.is_finite() {
            anyhow::bail!(
                "Malformed transaction row at {}:{}: amount is not a finite number",
                csv_path.display(),
                index + 2
            );
        }

        transactions.push(transaction);
    }

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_transactions() {
        let file = write_csv(
            "date,category,merchant,amount\n\
             2025-01-03,Dining,Noodle Bar,42.50\n\
             2025-01-04,Income,Employer,3000\n",
        );

        let transactions = load_transactions(file.path()).unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].category, "Dining");
        assert_eq!(transactions[0].amount, 42.5);
        assert!(transactions[1].is_income());
    }

    #[test]
    fn test_malformed_row_names_line() {
        let file = write_csv(
            "date,category,merchant,amount\n\
             2025-01-03,Dining,Noodle Bar,42.50\n\
             2025-01-04,Transport,Metro,not-a-number\n",
        );

        let err = load_transactions(file.path()).unwrap_err();
        let message = format!("{:#}", err);

        assert!(message.contains(":3"), "error should name line 3: {}", message);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = load_transactions(Path::new("/definitely/not/here.csv"));
        assert!(result.is_err());
    }
}
