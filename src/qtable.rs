//! Region-local Q-table.
//!
//! A [`QTable`] stores [`ACTION_COUNT`] action-values for every cell of a
//! [`Region`]. It is addressed with global grid coordinates; the translation
//! to local offsets is bounds-checked and reported as
//! [`MazeError::OutOfBounds`].

use ndarray::{s, Array3, ArrayView1, ArrayViewMut1};

use crate::error::{MazeError, Result};
use crate::types::{Action, Position, Region, ACTION_COUNT};

#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    region: Region,
    values: Array3<f64>,
}

impl QTable {
    /// All-zero table for `region`
    pub fn new(region: Region) -> Self {
        QTable {
            region,
            values: Array3::zeros((region.height(), region.width(), ACTION_COUNT)),
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.values
    }

    fn offset(&self, pos: Position) -> Result<(usize, usize)> {
        self.region.local(pos).ok_or(MazeError::OutOfBounds {
            row: pos.0,
            col: pos.1,
            rows: self.region.end_row + 1,
            cols: self.region.end_col + 1,
        })
    }

    /// The action-values of the cell at `pos`
    pub fn values(&self, pos: Position) -> Result<ArrayView1<'_, f64>> {
        let (r, c) = self.offset(pos)?;
        Ok(self.values.slice(s![r, c, ..]))
    }

    pub fn values_mut(&mut self, pos: Position) -> Result<ArrayViewMut1<'_, f64>> {
        let (r, c) = self.offset(pos)?;
        Ok(self.values.slice_mut(s![r, c, ..]))
    }

    pub fn get(&self, pos: Position, action: Action) -> Result<f64> {
        let (r, c) = self.offset(pos)?;
        Ok(self.values[[r, c, action.index()]])
    }

    pub fn set(&mut self, pos: Position, action: Action, value: f64) -> Result<()> {
        let (r, c) = self.offset(pos)?;
        self.values[[r, c, action.index()]] = value;
        Ok(())
    }

    pub fn max_value(&self, pos: Position) -> Result<f64> {
        Ok(self
            .values(pos)?
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max))
    }

    /// Highest-valued action among `candidates`; the earliest wins ties.
    pub fn best_action(&self, pos: Position, candidates: &[Action]) -> Result<Option<Action>> {
        let values = self.values(pos)?;
        let mut best: Option<Action> = None;
        for &action in candidates {
            match best {
                Some(current) if values[action.index()] <= values[current.index()] => {}
                _ => best = Some(action),
            }
        }
        Ok(best)
    }

    /// Up to `k` candidates ordered by value, highest first.
    ///
    /// Equal values are ordered by descending action index.
    pub fn top_actions(&self, pos: Position, candidates: &[Action], k: usize) -> Result<Vec<Action>> {
        let values = self.values(pos)?;
        let mut ranked: Vec<(f64, Action)> = candidates
            .iter()
            .map(|&action| (values[action.index()], action))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.index().cmp(&a.1.index())));
        Ok(ranked.into_iter().take(k).map(|(_, action)| action).collect())
    }

    /// `Q(s,a) += α (r + γ max_a' Q(s',a') − Q(s,a))`
    pub fn td_update(
        &mut self,
        state: Position,
        action: Action,
        reward: f64,
        next_state: Position,
        learning_rate: f64,
        discount_factor: f64,
    ) -> Result<()> {
        let max_next = self.max_value(next_state)?;
        let (r, c) = self.offset(state)?;
        let q = &mut self.values[[r, c, action.index()]];
        *q += learning_rate * (reward + discount_factor * max_next - *q);
        Ok(())
    }

    /// Copies the values of every cell in `region` from `source`.
    ///
    /// `region` must lie inside both tables.
    pub fn copy_region_from(&mut self, source: &QTable, region: &Region) -> Result<()> {
        let (dr, dc) = self.offset((region.start_row, region.start_col))?;
        self.offset((region.end_row, region.end_col))?;
        let (sr, sc) = source.offset((region.start_row, region.start_col))?;
        source.offset((region.end_row, region.end_col))?;

        let (h, w) = (region.height(), region.width());
        self.values
            .slice_mut(s![dr..dr + h, dc..dc + w, ..])
            .assign(&source.values.slice(s![sr..sr + h, sc..sc + w, ..]));
        Ok(())
    }

    /// Largest entry-wise absolute difference; tables must share a region.
    pub fn max_abs_diff(&self, other: &QTable) -> Result<f64> {
        if self.region != other.region {
            return Err(MazeError::invalid_parameter(
                "other".to_string(),
                format!("region {} differs from {}", other.region, self.region),
            ));
        }
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max))
    }

    /// Mutable access to the raw `(rows, cols, actions)` array
    pub(crate) fn as_array_mut(&mut self) -> &mut Array3<f64> {
        &mut self.values
    }
}
