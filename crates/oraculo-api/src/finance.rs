//! Handlers for `/finance` — margin figures, recomputed on every request
//! and rounded to two decimal places only here, at the display boundary.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use oraculo_core::{
  finance::{self, Figures, MonthFigures, Pipeline, round2},
  store::{CollectionStore, SnapshotRemote},
};

use crate::{AppState, error::ApiError};

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub pipeline: Option<Pipeline>,
  pub year:     Option<i32>,
  pub month:    Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
  /// Number of bids behind the figures.
  pub bids: usize,
  #[serde(flatten)]
  pub figures: Figures,
  /// Net profit over total cost, in percent.
  pub roi: f64,
}

/// `GET /finance/summary[?pipeline=ganhas&year=2024&month=6]`
///
/// Without a pipeline filter the figures cover every bid.
pub async fn summary<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let bids = state.store.load_bids().await.map_err(ApiError::store)?;

  let response = match (params.pipeline, params.year, params.month) {
    (Some(pipeline), Some(year), Some(month)) => {
      if !(1..=12).contains(&month) {
        return Err(ApiError::BadRequest(format!("invalid month: {month}")));
      }
      let selected = finance::bids_in_month(&bids, pipeline, year, month);
      let mut figures = Figures::default();
      for bid in &selected {
        figures.add(finance::bid_figures(bid));
      }
      SummaryResponse {
        bids: selected.len(),
        roi:  round2(figures.roi()),
        figures: figures.rounded(),
      }
    }
    (None, None, None) => {
      let figures = finance::summary(&bids);
      SummaryResponse {
        bids: bids.len(),
        roi:  round2(figures.roi()),
        figures: figures.rounded(),
      }
    }
    _ => {
      return Err(ApiError::BadRequest(
        "pipeline, year, and month must be given together".to_string(),
      ));
    }
  };

  Ok(Json(response))
}

// ─── Annual report ────────────────────────────────────────────────────────────

/// `GET /finance/report/{year}` — twelve per-month buckets of the won
/// pipeline.
pub async fn report<L, R>(
  State(state): State<AppState<L, R>>,
  Path(year): Path<i32>,
) -> Result<Json<Vec<MonthFigures>>, ApiError>
where
  L: CollectionStore + 'static,
  R: SnapshotRemote + 'static,
{
  let bids = state.store.load_bids().await.map_err(ApiError::store)?;
  let report = finance::monthly_report(&bids, year)
    .into_iter()
    .map(|m| MonthFigures {
      month:      m.month,
      revenue:    round2(m.revenue),
      cost:       round2(m.cost),
      net_profit: round2(m.net_profit),
    })
    .collect();
  Ok(Json(report))
}
