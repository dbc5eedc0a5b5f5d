use serde::{Deserialize, Serialize};

/// How a key lookup resolves when no row has exactly that key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    #[default]
    Exact,
    ExactOrPrev,
    ExactOrNext,
    Nearest,
}

/// Rows of a storage that fall into a key range, plus their outside neighbours.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub start_key: i64,
    pub end_key: i64,
    pub pre_first_index: Option<usize>,
    pub first_index: Option<usize>,
    pub last_index: Option<usize>,
    pub post_last_index: Option<usize>,
    /// Smallest key gap between neighbouring rows of the whole storage, NaN if under two rows.
    pub min_distance: f64,
}

impl Selection {
    pub fn empty(start_key: i64, end_key: i64) -> Self {
        Self {
            start_key,
            end_key,
            pre_first_index: None,
            first_index: None,
            last_index: None,
            post_last_index: None,
            min_distance: f64::NAN,
        }
    }

    /// Number of rows inside the range.
    pub fn count(&self) -> usize {
        match (self.first_index, self.last_index) {
            (Some(first), Some(last)) if last >= first => last - first + 1,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
