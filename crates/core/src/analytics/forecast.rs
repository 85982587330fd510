use crate::domain::series::{DailyRevenue, ForecastPoint};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

pub const DEFAULT_HORIZON_DAYS: u32 = 7;
pub const MIN_FORECAST_POINTS: usize = 3;
pub const MAX_HORIZON_DAYS: u32 = 365;

// Auto seasonality needs two weeks of history and at least two points on every observed weekday.
const AUTO_WEEKLY_MIN_SPAN_DAYS: i64 = 14;
const AUTO_WEEKLY_MIN_PER_WEEKDAY: usize = 2;
const BACKFIT_ROUNDS: usize = 3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("not enough daily points to forecast: have {points}, need {required}")]
    InsufficientData { points: usize, required: usize },

    #[error("forecast model failed to fit: {0}")]
    FitFailed(String),
}

pub trait Forecaster: Send + Sync {
    fn name(&self) -> &'static str;

    // `series` is ascending by date with no duplicate dates.
    fn fit(&self, series: &[DailyRevenue]) -> Result<Box<dyn FittedModel>, ForecastError>;
}

pub trait FittedModel: Send + Sync {
    fn predict(&self, horizon_days: u32) -> Result<Vec<ForecastPoint>, ForecastError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seasonality {
    #[default]
    Auto,
    Weekly,
    None,
}

// `level + slope * t + weekday_offset`, backfitted a few rounds between trend and offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalTrendForecaster {
    pub seasonality: Seasonality,
}

#[derive(Debug, Clone)]
struct SeasonalTrendModel {
    start: NaiveDate,
    end: NaiveDate,
    level: f64,
    slope: f64,
    weekday_offsets: [f64; 7],
}

impl Forecaster for SeasonalTrendForecaster {
    fn name(&self) -> &'static str {
        "seasonal_trend"
    }

    fn fit(&self, series: &[DailyRevenue]) -> Result<Box<dyn FittedModel>, ForecastError> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(ForecastError::FitFailed("empty series".to_string()));
        };
        if series.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::FitFailed(
                "series dates must be strictly increasing".to_string(),
            ));
        }
        if series.iter().any(|p| !p.total.is_finite()) {
            return Err(ForecastError::FitFailed(
                "series contains non-finite values".to_string(),
            ));
        }

        let start = first.date;
        let end = last.date;
        let t: Vec<f64> = series
            .iter()
            .map(|p| (p.date - start).num_days() as f64)
            .collect();
        let y: Vec<f64> = series.iter().map(|p| p.total).collect();
        let weekdays: Vec<usize> = series
            .iter()
            .map(|p| p.date.weekday().num_days_from_monday() as usize)
            .collect();

        let weekly = match self.seasonality {
            Seasonality::Weekly => true,
            Seasonality::None => false,
            Seasonality::Auto => {
                (end - start).num_days() + 1 >= AUTO_WEEKLY_MIN_SPAN_DAYS
                    && every_weekday_repeats(&weekdays)
            }
        };

        let mut offsets = [0.0f64; 7];
        let (mut level, mut slope) = least_squares(&t, &y)?;

        if weekly {
            for _ in 0..BACKFIT_ROUNDS {
                let residuals: Vec<f64> = t
                    .iter()
                    .zip(&y)
                    .map(|(ti, yi)| yi - (level + slope * ti))
                    .collect();
                offsets = weekday_means(&weekdays, &residuals);

                let deseasoned: Vec<f64> = y
                    .iter()
                    .zip(&weekdays)
                    .map(|(yi, &w)| yi - offsets[w])
                    .collect();
                (level, slope) = least_squares(&t, &deseasoned)?;
            }
        }

        let model = SeasonalTrendModel {
            start,
            end,
            level,
            slope,
            weekday_offsets: offsets,
        };

        tracing::debug!(
            forecaster = self.name(),
            points = series.len(),
            weekly,
            level = model.level,
            slope = model.slope,
            "forecast model fitted"
        );

        Ok(Box::new(model))
    }
}

impl FittedModel for SeasonalTrendModel {
    fn predict(&self, horizon_days: u32) -> Result<Vec<ForecastPoint>, ForecastError> {
        let until = self
            .end
            .checked_add_signed(Duration::days(i64::from(horizon_days)))
            .ok_or_else(|| ForecastError::FitFailed("horizon runs past the calendar".to_string()))?;

        let mut out = Vec::new();
        for date in self.start.iter_days().take_while(|d| *d <= until) {
            let t = (date - self.start).num_days() as f64;
            let w = date.weekday().num_days_from_monday() as usize;
            let value = self.level + self.slope * t + self.weekday_offsets[w];
            if !value.is_finite() {
                return Err(ForecastError::FitFailed(format!(
                    "non-finite prediction for {date}"
                )));
            }
            // Revenue cannot go negative.
            out.push(ForecastPoint {
                date,
                predicted: value.max(0.0),
            });
        }
        Ok(out)
    }
}

/// Fits `forecaster` to `series` and extends it `horizon_days` (at most [`MAX_HORIZON_DAYS`]) past
/// the last observed date. Fewer than [`MIN_FORECAST_POINTS`] distinct dates is
/// `InsufficientData`.
pub fn forecast(
    series: &[DailyRevenue],
    horizon_days: u32,
    forecaster: &dyn Forecaster,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let horizon_days = horizon_days.min(MAX_HORIZON_DAYS);
    let distinct: BTreeSet<NaiveDate> = series.iter().map(|p| p.date).collect();
    if distinct.len() < MIN_FORECAST_POINTS {
        return Err(ForecastError::InsufficientData {
            points: distinct.len(),
            required: MIN_FORECAST_POINTS,
        });
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|p| p.date);

    let model = forecaster.fit(&sorted)?;
    let predicted = model.predict(horizon_days)?;

    let first = sorted[0].date;
    let last = sorted[sorted.len() - 1].date;
    check_coverage(&predicted, first, last, horizon_days)?;

    Ok(predicted)
}

fn check_coverage(
    predicted: &[ForecastPoint],
    first: NaiveDate,
    last: NaiveDate,
    horizon_days: u32,
) -> Result<(), ForecastError> {
    let expected_len = (last - first).num_days() + 1 + i64::from(horizon_days);
    let gap_free = predicted.first().map(|p| p.date) == Some(first)
        && predicted.len() as i64 == expected_len
        && predicted
            .windows(2)
            .all(|w| w[1].date - w[0].date == Duration::days(1));
    let finite = predicted.iter().all(|p| p.predicted.is_finite());

    if gap_free && finite {
        Ok(())
    } else {
        Err(ForecastError::FitFailed(
            "model output does not cover the requested dates".to_string(),
        ))
    }
}

fn least_squares(t: &[f64], y: &[f64]) -> Result<(f64, f64), ForecastError> {
    let n = t.len() as f64;
    let mean_t = t.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (ti, yi) in t.iter().zip(y) {
        cov += (ti - mean_t) * (yi - mean_y);
        var += (ti - mean_t) * (ti - mean_t);
    }

    if var == 0.0 {
        // A single distinct date: flat line through the mean.
        return Ok((mean_y, 0.0));
    }

    let slope = cov / var;
    let level = mean_y - slope * mean_t;
    if !level.is_finite() || !slope.is_finite() {
        return Err(ForecastError::FitFailed(
            "trend coefficients are not finite".to_string(),
        ));
    }
    Ok((level, slope))
}

fn every_weekday_repeats(weekdays: &[usize]) -> bool {
    let mut counts = [0usize; 7];
    for &w in weekdays {
        counts[w] += 1;
    }
    counts
        .iter()
        .all(|&c| c == 0 || c >= AUTO_WEEKLY_MIN_PER_WEEKDAY)
}

// Mean residual per weekday, centred over the weekdays that were observed.
fn weekday_means(weekdays: &[usize], residuals: &[f64]) -> [f64; 7] {
    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];
    for (&w, r) in weekdays.iter().zip(residuals) {
        sums[w] += r;
        counts[w] += 1;
    }

    let mut out = [0.0f64; 7];
    let mut observed = 0usize;
    let mut total = 0.0;
    for w in 0..7 {
        if counts[w] > 0 {
            out[w] = sums[w] / counts[w] as f64;
            total += out[w];
            observed += 1;
        }
    }

    if observed > 0 {
        let centre = total / observed as f64;
        for w in 0..7 {
            if counts[w] > 0 {
                out[w] -= centre;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(start: NaiveDate, values: &[f64]) -> Vec<DailyRevenue> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailyRevenue {
                date: start + Duration::days(i as i64),
                total: *v,
            })
            .collect()
    }

    fn assert_covers(out: &[ForecastPoint], first: NaiveDate, until: NaiveDate) {
        assert_eq!(out.first().unwrap().date, first);
        assert_eq!(out.last().unwrap().date, until);
        assert!(out
            .windows(2)
            .all(|w| w[1].date - w[0].date == Duration::days(1)));
        assert!(out.iter().all(|p| p.predicted.is_finite()));
    }

    #[test]
    fn covers_history_plus_horizon_without_gaps() {
        let s = series(d(2024, 1, 1), &[35_000.0, 30_000.0, 50_000.0]);
        let out = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap();
        assert_eq!(out.len(), 3 + 7);
        assert_covers(&out, d(2024, 1, 1), d(2024, 1, 10));
    }

    #[test]
    fn fills_gaps_in_the_observed_series() {
        let s = vec![
            DailyRevenue {
                date: d(2024, 1, 1),
                total: 20_000.0,
            },
            DailyRevenue {
                date: d(2024, 1, 5),
                total: 40_000.0,
            },
            DailyRevenue {
                date: d(2024, 1, 9),
                total: 60_000.0,
            },
        ];
        let out = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap();
        assert_covers(&out, d(2024, 1, 1), d(2024, 1, 16));
        // Exactly linear input is reproduced.
        assert!((out[2].predicted - 30_000.0).abs() < 1e-6);
    }

    #[test]
    fn unordered_input_is_sorted_first() {
        let mut s = series(d(2024, 1, 1), &[10.0, 20.0, 30.0, 40.0]);
        s.reverse();
        let out = forecast(&s, 2, &SeasonalTrendForecaster::default()).unwrap();
        assert_covers(&out, d(2024, 1, 1), d(2024, 1, 6));
        assert!((out[5].predicted - 60.0).abs() < 1e-6);
    }

    #[test]
    fn fewer_than_three_points_is_insufficient() {
        let s = series(d(2024, 1, 1), &[1.0, 2.0]);
        let err = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                points: 2,
                required: 3
            }
        );
        assert!(matches!(
            forecast(&[], 7, &SeasonalTrendForecaster::default()),
            Err(ForecastError::InsufficientData { points: 0, .. })
        ));
    }

    #[test]
    fn duplicate_dates_count_once_toward_minimum() {
        let s = vec![
            DailyRevenue {
                date: d(2024, 1, 1),
                total: 1.0,
            },
            DailyRevenue {
                date: d(2024, 1, 1),
                total: 2.0,
            },
            DailyRevenue {
                date: d(2024, 1, 2),
                total: 3.0,
            },
        ];
        assert!(matches!(
            forecast(&s, 7, &SeasonalTrendForecaster::default()),
            Err(ForecastError::InsufficientData { points: 2, .. })
        ));
    }

    #[test]
    fn non_finite_input_fails_to_fit() {
        let s = series(d(2024, 1, 1), &[1.0, f64::NAN, 3.0]);
        let err = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap_err();
        assert!(matches!(err, ForecastError::FitFailed(_)));
    }

    #[test]
    fn recovers_weekly_pattern() {
        // Flat 100k with +30k every Saturday, four weeks starting Monday 2024-01-01.
        let values: Vec<f64> = (0..28)
            .map(|i| if i % 7 == 5 { 130_000.0 } else { 100_000.0 })
            .collect();
        let s = series(d(2024, 1, 1), &values);
        let out = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap();
        assert_covers(&out, d(2024, 1, 1), d(2024, 2, 4));

        let saturday = out.iter().find(|p| p.date == d(2024, 2, 3)).unwrap();
        let friday = out.iter().find(|p| p.date == d(2024, 2, 2)).unwrap();
        assert!(saturday.predicted - friday.predicted > 25_000.0);
    }

    #[test]
    fn no_seasonality_is_a_straight_line() {
        let values: Vec<f64> = (0..21)
            .map(|i| if i % 7 == 5 { 130_000.0 } else { 100_000.0 })
            .collect();
        let s = series(d(2024, 1, 1), &values);
        let forecaster = SeasonalTrendForecaster {
            seasonality: Seasonality::None,
        };
        let out = forecast(&s, 7, &forecaster).unwrap();
        let diffs: Vec<f64> = out
            .windows(2)
            .map(|w| w[1].predicted - w[0].predicted)
            .collect();
        assert!(diffs.iter().all(|x| (x - diffs[0]).abs() < 1e-6));
    }

    #[test]
    fn sparse_history_gets_trend_only() {
        // Three points over 20 days: each weekday seen once, so no weekday offsets.
        let s = vec![
            DailyRevenue {
                date: d(2024, 1, 1),
                total: 100_000.0,
            },
            DailyRevenue {
                date: d(2024, 1, 10),
                total: 20_000.0,
            },
            DailyRevenue {
                date: d(2024, 1, 20),
                total: 110_000.0,
            },
        ];
        let out = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap();
        assert_covers(&out, d(2024, 1, 1), d(2024, 1, 27));

        let diffs: Vec<f64> = out
            .windows(2)
            .map(|w| w[1].predicted - w[0].predicted)
            .collect();
        assert!(diffs.iter().all(|x| (x - diffs[0]).abs() < 1e-6));

        let wed = out.iter().find(|p| p.date == d(2024, 1, 17)).unwrap();
        let tue = out.iter().find(|p| p.date == d(2024, 1, 16)).unwrap();
        assert!(wed.predicted > tue.predicted);
    }

    #[test]
    fn horizon_is_capped() {
        let s = series(d(2024, 1, 1), &[10.0, 20.0, 30.0]);
        let out = forecast(&s, u32::MAX, &SeasonalTrendForecaster::default()).unwrap();
        assert_eq!(out.len(), 3 + MAX_HORIZON_DAYS as usize);
        assert_covers(&out, d(2024, 1, 1), d(2024, 1, 3) + Duration::days(365));
    }

    #[test]
    fn predictions_never_go_negative() {
        let s = series(d(2024, 1, 1), &[90_000.0, 50_000.0, 10_000.0]);
        let out = forecast(&s, 7, &SeasonalTrendForecaster::default()).unwrap();
        assert!(out.iter().all(|p| p.predicted >= 0.0));
        assert_eq!(out.last().unwrap().predicted, 0.0);
    }
}
