use crate::domain::series::{DailyRevenue, DailySatisfaction};
use crate::domain::survey::SurveyRecord;
use crate::domain::transaction::TransactionRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

// Rows whose date does not parse are left out.
pub fn aggregate_revenue(transactions: &[TransactionRecord]) -> Vec<DailyRevenue> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut dropped: usize = 0;

    for tx in transactions {
        match tx.date() {
            Some(date) => *by_date.entry(date).or_insert(0.0) += tx.price(),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "transactions with unparseable dates excluded from revenue");
    }

    by_date
        .into_iter()
        .map(|(date, total)| DailyRevenue { date, total })
        .collect()
}

pub fn aggregate_satisfaction(records: &[SurveyRecord]) -> Vec<DailySatisfaction> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for rec in records {
        let (Some(date), Some(rating)) = (rec.date, rec.rating) else {
            continue;
        };
        let acc = by_date.entry(date).or_insert((0.0, 0));
        acc.0 += rating;
        acc.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (sum, n))| DailySatisfaction {
            date,
            rating: sum / n as f64,
        })
        .collect()
}
