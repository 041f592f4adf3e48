//! P&L CSV export
//!
//! Appends ArbRecords to a CSV file, writing the header once. Fields that
//! may contain commas or quotes are escaped; everything else is written
//! verbatim so the numbers survive a round trip through spreadsheet tools.
//!
//! Author: AI-Generated
//! Created: 2026-02-28

use super::ArbRecord;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order is a contract; see the module docs
const HEADERS: &[&str] = &[
    "id",
    "timestamp",
    "buy_venue",
    "sell_venue",
    "symbol",
    "buy_price",
    "sell_price",
    "amount",
    "gross_pnl",
    "net_pnl",
    "net_pnl_bps",
    "fees",
    "gas_cost",
];

pub struct PnlCsvWriter {
    path: PathBuf,
    headers_written: bool,
}

impl PnlCsvWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating pnl directory {:?}", parent))?;
        }
        let headers_written = path.exists();
        Ok(Self {
            path,
            headers_written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header first if the file is new
    pub fn log(&mut self, record: &ArbRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening pnl csv {:?}", self.path))?;

        if !self.headers_written {
            writeln!(file, "{}", HEADERS.join(","))?;
            self.headers_written = true;
        }
        self.write_record(&mut file, record)
    }

    fn write_record(&self, file: &mut File, record: &ArbRecord) -> Result<()> {
        let fields = vec![
            escape_csv_field(&record.id),
            record.timestamp.to_rfc3339(),
            escape_csv_field(&record.buy_leg.venue),
            escape_csv_field(&record.sell_leg.venue),
            escape_csv_field(&record.buy_leg.symbol),
            record.buy_leg.price.to_string(),
            record.sell_leg.price.to_string(),
            record.buy_leg.amount.to_string(),
            record.gross_pnl().to_string(),
            record.net_pnl().to_string(),
            record.net_pnl_bps().round_dp(2).to_string(),
            record.total_fees().to_string(),
            record.gas_cost.to_string(),
        ];
        writeln!(file, "{}", fields.join(","))?;
        Ok(())
    }

    /// Rows currently in the file, excluding the header
    pub fn record_count(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().count().saturating_sub(1))
    }
}

/// Quote a field containing separators or quotes
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
