use std::fmt;

use serde::{Deserialize, Serialize};

/// A Nigerian Naira banknote value.
///
/// The set is closed: these eight notes are the only values the reader can
/// report. Their declaration order is the master order every language pack
/// is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Denomination {
    #[serde(rename = "1000")]
    N1000,
    #[serde(rename = "500")]
    N500,
    #[serde(rename = "200")]
    N200,
    #[serde(rename = "100")]
    N100,
    #[serde(rename = "50")]
    N50,
    #[serde(rename = "20")]
    N20,
    #[serde(rename = "10")]
    N10,
    #[serde(rename = "5")]
    N5,
}

/// Number of denominations; length of every per-language result list.
pub const DENOMINATION_COUNT: usize = 8;

impl Denomination {
    /// All denominations, largest first.
    pub const ALL: [Denomination; DENOMINATION_COUNT] = [
        Self::N1000,
        Self::N500,
        Self::N200,
        Self::N100,
        Self::N50,
        Self::N20,
        Self::N10,
        Self::N5,
    ];

    /// Face value in Naira.
    pub fn value(self) -> u32 {
        match self {
            Self::N1000 => 1000,
            Self::N500 => 500,
            Self::N200 => 200,
            Self::N100 => 100,
            Self::N50 => 50,
            Self::N20 => 20,
            Self::N10 => 10,
            Self::N5 => 5,
        }
    }

    /// Position in [`Denomination::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::N1000 => 0,
            Self::N500 => 1,
            Self::N200 => 2,
            Self::N100 => 3,
            Self::N50 => 4,
            Self::N20 => 5,
            Self::N10 => 6,
            Self::N5 => 7,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.value() == value)
    }

    /// The literal reply string the classifier is instructed to produce.
    pub fn model_label(self) -> String {
        format!("₦{} - Nigerian Naira", self.value())
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₦{}", self.value())
    }
}

/// Language-neutral outcome of normalizing a classifier answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CanonicalLabel {
    Note(Denomination),
    /// No confident match. A valid outcome, not a fault.
    Unrecognized,
}

impl CanonicalLabel {
    pub fn denomination(self) -> Option<Denomination> {
        match self {
            Self::Note(d) => Some(d),
            Self::Unrecognized => None,
        }
    }

    pub fn is_recognized(self) -> bool {
        matches!(self, Self::Note(_))
    }
}

impl From<Denomination> for CanonicalLabel {
    fn from(d: Denomination) -> Self {
        Self::Note(d)
    }
}
