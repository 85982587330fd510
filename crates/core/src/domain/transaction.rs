use crate::domain::catalog::{services_label, total_price, Service};
use crate::time::dates::{format_date, parse_date_lenient};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const COLUMNS: [&str; 5] = [
    "id_transaksi",
    "tanggal",
    "nama_pelanggan",
    "layanan",
    "harga",
];

// Kept as text so a hand-edited file still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id_transaksi: String,
    pub tanggal: String,
    pub nama_pelanggan: String,
    pub layanan: String,
    pub harga: String,
}

impl TransactionRecord {
    pub fn date(&self) -> Option<NaiveDate> {
        parse_date_lenient(&self.tanggal)
    }

    // Non-numeric counts as zero.
    pub fn price(&self) -> f64 {
        self.harga
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn sequence(&self) -> Option<u64> {
        parse_transaction_seq(&self.id_transaksi)
    }

    pub(crate) fn into_row(self) -> [String; 5] {
        [
            self.id_transaksi,
            self.tanggal,
            self.nama_pelanggan,
            self.layanan,
            self.harga,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub customer_name: String,
    pub date: NaiveDate,
    pub services: Vec<Service>,
}

impl NewTransaction {
    // Catalog sum at entry time; later price changes never touch stored rows.
    pub fn price(&self) -> u64 {
        total_price(&self.services)
    }

    pub fn into_record(self, seq: u64) -> TransactionRecord {
        let harga = self.price().to_string();
        TransactionRecord {
            id_transaksi: transaction_id(seq),
            tanggal: format_date(self.date),
            nama_pelanggan: self.customer_name.trim().to_string(),
            layanan: services_label(&self.services),
            harga,
        }
    }
}

pub fn transaction_id(seq: u64) -> String {
    format!("T{seq:03}")
}

pub fn parse_transaction_seq(id: &str) -> Option<u64> {
    id.trim().strip_prefix('T')?.parse::<u64>().ok()
}
