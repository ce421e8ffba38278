//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of a ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Import,
    Adjustment,
    Receipt,
    Reversal,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Import => "import",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Receipt => "receipt",
            MovementKind::Reversal => "reversal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "import" => Some(MovementKind::Import),
            "adjustment" => Some(MovementKind::Adjustment),
            "receipt" => Some(MovementKind::Receipt),
            "reversal" => Some(MovementKind::Reversal),
            _ => None,
        }
    }
}

/// Expiry risk classification of a stock lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryState {
    Critical,
    Proximate,
    Ok,
    NoDate,
}

impl ExpiryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryState::Critical => "CRITICAL",
            ExpiryState::Proximate => "PROXIMATE",
            ExpiryState::Ok => "OK",
            ExpiryState::NoDate => "NO_DATE",
        }
    }
}

/// Day thresholds for expiry classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpiryThresholds {
    /// Lots expiring within this many days are critical
    pub critical_days: i64,
    /// Lots expiring within this many days (but past critical) are proximate
    pub proximate_days: i64,
}

impl Default for ExpiryThresholds {
    fn default() -> Self {
        Self {
            critical_days: 7,
            proximate_days: 30,
        }
    }
}

impl ExpiryThresholds {
    pub fn new(critical_days: i64, proximate_days: i64) -> Self {
        Self {
            critical_days,
            proximate_days,
        }
        .normalized()
    }

    /// Swap the bounds if they were configured inverted, so the smaller
    /// value is always the critical one.
    pub fn normalized(self) -> Self {
        if self.critical_days > self.proximate_days {
            Self {
                critical_days: self.proximate_days,
                proximate_days: self.critical_days,
            }
        } else {
            self
        }
    }

    /// Classify a lot by the days remaining until its expiry date.
    pub fn classify(&self, days_left: Option<i64>) -> ExpiryState {
        let t = self.normalized();
        match days_left {
            None => ExpiryState::NoDate,
            Some(d) if d <= t.critical_days => ExpiryState::Critical,
            Some(d) if d <= t.proximate_days => ExpiryState::Proximate,
            Some(_) => ExpiryState::Ok,
        }
    }
}

/// A calendar month, the unit of sales reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("month key holds a valid calendar month")
    }

    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .expect("month key holds a valid calendar month")
            .pred_opt()
            .expect("first day of a month always has a predecessor")
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// How an import snapshot identifies its target location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationRef {
    /// Explicit numeric id, matching the external ERP
    Id(i64),
    /// Resolve or create by name
    Name(String),
}
