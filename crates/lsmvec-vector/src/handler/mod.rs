//! Per-query search cursor.
//!
//! A [`SearchHandler`] is a small state machine:
//!
//! ```text
//! Idle --prepare--> ScanPrepared | KnnPrepared | HybridPrepared
//!      --execute--> Executed (or Exhausted if the strategy call fails)
//! any  --reset----> Idle
//! ```
//!
//! The row-fetch methods ([`has_next`](SearchHandler::has_next),
//! [`advance`](SearchHandler::advance), [`current_key`](SearchHandler::current_key),
//! [`current_value`](SearchHandler::current_value)) are valid only in
//! `Executed`; elsewhere they return [`VectorError::InvalidState`].
//!
//! After `execute` the cursor is positioned on the first row, if any.

use lsmvec_storage::Transaction;
use tracing::debug;

use crate::cancel::CancellationFlag;
use crate::distance::Metric;
use crate::error::{Result, VectorError};
use crate::index::{IvfScanCursor, SearchParams, VectorIndex};
use crate::ops::{Coordinate, Haversine, SearchHit, SpatialDistance};
use crate::store::{ListEntry, ListFilter};

/// How a query uses the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Unranked or prefetch scan, filtered and ordered downstream.
    IndexScan,
    /// Top-k nearest neighbours.
    KnnFirst,
    /// Top-k by combined vector and spatial cost.
    KnnHybrid,
}

/// The ORDER BY initialisation the planner hands to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByBinding {
    /// Distance function name, e.g. `fb_vector_l2` or `ip`.
    pub function: String,
    /// LIMIT of the query.
    pub limit: usize,
    /// Lists probed by IVF indexes.
    pub nprobe: usize,
    /// Search mode chosen by the planner.
    pub mode: SearchMode,
    /// Query vector.
    pub query: Vec<f32>,
    /// Spatial weight, for hybrid searches.
    pub weight: f32,
    /// Query point geometry, for hybrid searches.
    pub geometry: Option<Vec<u8>>,
}

impl OrderByBinding {
    /// Convert into typed search parameters.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidArgument`] for an unknown distance
    /// function or an undecodable geometry.
    pub fn to_params(&self) -> Result<SearchParams> {
        let metric: Metric = self.function.parse()?;
        let mut params = SearchParams::new(self.query.clone(), self.limit)
            .with_metric(metric)
            .with_nprobe(self.nprobe)
            .with_weight(self.weight);
        if let Some(geometry) = &self.geometry {
            let point = Coordinate::from_geometry(geometry).map_err(|e| {
                VectorError::InvalidArgument(format!("query geometry: {e}"))
            })?;
            params = params.with_coordinate(point);
        }
        Ok(params)
    }
}

/// Observable state of a [`SearchHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerPhase {
    /// No search prepared.
    Idle,
    /// An index scan is prepared.
    ScanPrepared,
    /// A knn search is prepared.
    KnnPrepared,
    /// A hybrid search is prepared.
    HybridPrepared,
    /// Results are available through the cursor methods.
    Executed,
    /// The strategy call failed; there are no results.
    Exhausted,
}

enum Results<'a, T: Transaction + 'a> {
    /// Ranked hits and the position of the current one.
    Ranked { hits: Vec<SearchHit>, pos: usize },
    /// Live list scan and its current entry.
    Streaming { cursor: IvfScanCursor<'a, T>, current: Option<ListEntry> },
}

enum State<'a, T: Transaction + 'a> {
    Idle,
    Prepared { mode: SearchMode, params: SearchParams },
    Executed(Results<'a, T>),
    Exhausted,
}

/// Search session of one query against one index.
pub struct SearchHandler<'a, T: Transaction + 'a> {
    index: &'a VectorIndex,
    tx: &'a T,
    filter: Option<&'a ListFilter>,
    spatial: &'a dyn SpatialDistance,
    cancel: Option<CancellationFlag>,
    state: State<'a, T>,
}

impl<'a, T: Transaction + 'a> SearchHandler<'a, T> {
    /// Create an idle handler reading through `tx`.
    ///
    /// Hybrid searches use [`Haversine`] until
    /// [`with_spatial`](Self::with_spatial) names another distance.
    #[must_use]
    pub fn new(index: &'a VectorIndex, tx: &'a T) -> Self {
        Self { index, tx, filter: None, spatial: &Haversine, cancel: None, state: State::Idle }
    }

    /// Push a row predicate down into IVF list scans.
    #[must_use]
    pub fn with_filter(mut self, filter: &'a ListFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the spatial distance of hybrid searches.
    #[must_use]
    pub fn with_spatial(mut self, spatial: &'a dyn SpatialDistance) -> Self {
        self.spatial = spatial;
        self
    }

    /// Poll `cancel` during scans.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> HandlerPhase {
        match &self.state {
            State::Idle => HandlerPhase::Idle,
            State::Prepared { mode: SearchMode::IndexScan, .. } => HandlerPhase::ScanPrepared,
            State::Prepared { mode: SearchMode::KnnFirst, .. } => HandlerPhase::KnnPrepared,
            State::Prepared { mode: SearchMode::KnnHybrid, .. } => HandlerPhase::HybridPrepared,
            State::Executed(_) => HandlerPhase::Executed,
            State::Exhausted => HandlerPhase::Exhausted,
        }
    }

    /// Validate and store the parameters of the next search.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidState`] outside `Idle`, or
    /// [`VectorError::InvalidArgument`] for invalid parameters, in which case
    /// the handler stays `Idle`.
    pub fn prepare(&mut self, mode: SearchMode, params: SearchParams) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            return Err(VectorError::InvalidState(format!(
                "prepare called in {:?}",
                self.phase()
            )));
        }
        match mode {
            SearchMode::IndexScan => params.validate_scan()?,
            SearchMode::KnnFirst => params.validate_knn()?,
            SearchMode::KnnHybrid => params.validate_hybrid()?,
        }
        self.state = State::Prepared { mode, params };
        Ok(())
    }

    /// Prepare from the planner's ORDER BY binding.
    ///
    /// # Errors
    ///
    /// As [`prepare`](Self::prepare), plus [`VectorError::InvalidArgument`]
    /// for an unknown distance function.
    pub fn prepare_order_by(&mut self, binding: &OrderByBinding) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            return Err(VectorError::InvalidState(format!(
                "prepare called in {:?}",
                self.phase()
            )));
        }
        self.prepare(binding.mode, binding.to_params()?)
    }

    /// Run the prepared search once.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidState`] unless a search is prepared.
    /// If the strategy call fails its error is returned and the handler is
    /// `Exhausted`.
    pub fn execute(&mut self) -> Result<()> {
        let (mode, params) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Prepared { mode, params } => (mode, params),
            other => {
                self.state = other;
                return Err(VectorError::InvalidState(format!(
                    "execute called in {:?}",
                    self.phase()
                )));
            }
        };
        debug!(index_id = %self.index.index_id(), ?mode, k = params.k, "executing vector search");
        match self.run(mode, &params) {
            Ok(results) => {
                self.state = State::Executed(results);
                Ok(())
            }
            Err(e) => {
                self.state = State::Exhausted;
                Err(e)
            }
        }
    }

    fn run(&self, mode: SearchMode, params: &SearchParams) -> Result<Results<'a, T>> {
        let cancel = self.cancel.as_ref();
        match mode {
            SearchMode::IndexScan => {
                match self.index.index_scan(self.tx, params, self.filter, cancel) {
                    Ok(mut cursor) => {
                        let current = cursor.next_entry()?;
                        Ok(Results::Streaming { cursor, current })
                    }
                    Err(e) if e.is_unsupported() => {
                        let hits = self.index.index_scan_with_value(self.tx, params, cancel)?;
                        Ok(Results::Ranked { hits, pos: 0 })
                    }
                    Err(e) => Err(e),
                }
            }
            SearchMode::KnnFirst => {
                let hits = match self.index.knn_search_with_value(self.tx, params, cancel) {
                    Err(e) if e.is_unsupported() => {
                        self.index.knn_search(self.tx, params, self.filter, cancel)?
                    }
                    other => other?,
                };
                Ok(Results::Ranked { hits, pos: 0 })
            }
            SearchMode::KnnHybrid => {
                let limit = params.k;
                let widen = self.index.config().linear_scan.hybrid_widen_factor.max(1);
                let mut widened = params.clone();
                widened.k = limit.saturating_mul(widen);
                let mut hits = self.index.knn_search_hybrid_with_value(
                    self.tx,
                    &widened,
                    self.spatial,
                    cancel,
                )?;
                hits.truncate(limit);
                Ok(Results::Ranked { hits, pos: 0 })
            }
        }
    }

    fn results(&self, op: &str) -> Result<&Results<'a, T>> {
        match &self.state {
            State::Executed(results) => Ok(results),
            _ => Err(VectorError::InvalidState(format!("{op} called in {:?}", self.phase()))),
        }
    }

    /// Whether the cursor is on a row.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidState`] outside `Executed`.
    pub fn has_next(&self) -> Result<bool> {
        Ok(match self.results("has_next")? {
            Results::Ranked { hits, pos } => *pos < hits.len(),
            Results::Streaming { current, .. } => current.is_some(),
        })
    }

    /// Move past the current row.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidState`] outside `Executed`. A failing
    /// streamed scan returns its error and leaves the handler `Exhausted`.
    pub fn advance(&mut self) -> Result<()> {
        self.results("advance")?;
        let step = match &mut self.state {
            State::Executed(Results::Ranked { hits, pos }) => {
                *pos = (*pos + 1).min(hits.len());
                Ok(())
            }
            State::Executed(Results::Streaming { cursor, current }) => {
                if current.is_none() {
                    Ok(())
                } else {
                    cursor.next_entry().map(|next| *current = next)
                }
            }
            _ => Ok(()),
        };
        if step.is_err() {
            self.state = State::Exhausted;
        }
        step
    }

    /// Key of the current row.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidState`] outside `Executed` or past the
    /// last row.
    pub fn current_key(&self) -> Result<&[u8]> {
        let key = match self.results("current_key")? {
            Results::Ranked { hits, pos } => hits.get(*pos).map(|h| h.key.as_slice()),
            Results::Streaming { current, .. } => current.as_ref().map(|e| e.key.as_slice()),
        };
        key.ok_or_else(|| VectorError::InvalidState("no current row".to_string()))
    }

    /// Score of the current row, if the search ranked rows.
    ///
    /// # Errors
    ///
    /// As [`current_key`](Self::current_key).
    pub fn current_distance(&self) -> Result<Option<f32>> {
        match self.results("current_distance")? {
            Results::Ranked { hits, pos } => hits
                .get(*pos)
                .map(|h| Some(h.distance))
                .ok_or_else(|| VectorError::InvalidState("no current row".to_string())),
            Results::Streaming { current, .. } => current
                .as_ref()
                .map(|_| None)
                .ok_or_else(|| VectorError::InvalidState("no current row".to_string())),
        }
    }

    /// Stored row value of the current row.
    ///
    /// # Errors
    ///
    /// As [`current_key`](Self::current_key), plus
    /// [`VectorError::Unsupported`] when the strategy returned keys only.
    pub fn current_value(&self) -> Result<&[u8]> {
        match self.results("current_value")? {
            Results::Ranked { hits, pos } => {
                let hit = hits
                    .get(*pos)
                    .ok_or_else(|| VectorError::InvalidState("no current row".to_string()))?;
                hit.value.as_deref().ok_or(VectorError::Unsupported("current_value"))
            }
            Results::Streaming { current, .. } => {
                if current.is_none() {
                    return Err(VectorError::InvalidState("no current row".to_string()));
                }
                Err(VectorError::Unsupported("current_value"))
            }
        }
    }

    /// Drop any prepared search or results and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}
