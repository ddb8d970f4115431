//! Margin and ROI figures over a bid's priced items.
//!
//! Figures are always recomputed from the current items — nothing here is
//! ever persisted. Arithmetic runs at full `f64` precision; rounding to two
//! decimal places happens only at the display boundary via [`round2`].

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::bid::{Bid, BidItem};

// ─── Unit price ──────────────────────────────────────────────────────────────

/// The price a sold unit actually commands: the first *set* value among
/// winning, reference, and minimum price, in that priority order.
///
/// An entered value of `0.0` is a real price and does not fall through.
pub fn effective_unit_price(item: &BidItem) -> Option<f64> {
  item
    .winning_price
    .or(item.reference_price)
    .or(item.min_price)
}

// ─── Per-item figures ────────────────────────────────────────────────────────

/// Derived money figures for one item (or summed over many).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Figures {
  pub revenue:        f64,
  pub cost:           f64,
  pub margin:         f64,
  pub investor_share: f64,
  pub net_profit:     f64,
}

impl Figures {
  pub fn add(&mut self, other: Figures) {
    self.revenue += other.revenue;
    self.cost += other.cost;
    self.margin += other.margin;
    self.investor_share += other.investor_share;
    self.net_profit += other.net_profit;
  }

  /// Return on investment: net profit over total cost, as a percentage.
  /// Zero when there is no cost to measure against.
  pub fn roi(&self) -> f64 {
    if self.cost > 0.0 {
      self.net_profit / self.cost * 100.0
    } else {
      0.0
    }
  }

  /// Copy with every field rounded to two decimal places.
  pub fn rounded(self) -> Figures {
    Figures {
      revenue:        round2(self.revenue),
      cost:           round2(self.cost),
      margin:         round2(self.margin),
      investor_share: round2(self.investor_share),
      net_profit:     round2(self.net_profit),
    }
  }
}

/// Compute the figures for a single item.
pub fn item_figures(item: &BidItem) -> Figures {
  let quantity = f64::from(item.quantity);
  let revenue = effective_unit_price(item).unwrap_or(0.0) * quantity;
  let cost = item.cost_price.unwrap_or(0.0) * quantity
    + item.shipping_cost.unwrap_or(0.0)
    + revenue * item.tax_percentage.unwrap_or(0.0) / 100.0;
  let margin = revenue - cost;
  let investor_share = if margin > 0.0 {
    margin * item.investor_percentage.unwrap_or(0.0) / 100.0
  } else {
    0.0
  };

  Figures {
    revenue,
    cost,
    margin,
    investor_share,
    net_profit: margin - investor_share,
  }
}

/// Sum of the item figures of a bid.
pub fn bid_figures(bid: &Bid) -> Figures {
  let mut total = Figures::default();
  for item in &bid.items {
    total.add(item_figures(item));
  }
  total
}

/// Sum across many bids.
pub fn summary(bids: &[Bid]) -> Figures {
  let mut total = Figures::default();
  for bid in bids {
    total.add(bid_figures(bid));
  }
  total
}

// ─── Pipelines ───────────────────────────────────────────────────────────────

/// The two finance views: revenue still forecast vs. won and in fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pipeline {
  #[serde(rename = "previstas")]
  Forecast,
  #[serde(rename = "ganhas")]
  Won,
}

impl Pipeline {
  fn includes(self, bid: &Bid) -> bool {
    match self {
      Pipeline::Forecast => bid.status.is_forecast(),
      Pipeline::Won => bid.status.is_won(),
    }
  }

  /// The date a bid is bucketed under: won bids use the payment date when
  /// present; forecasts always use the auction session date.
  fn bucket_date<'a>(self, bid: &'a Bid) -> &'a str {
    match self {
      Pipeline::Won => bid.payment_date.as_deref().unwrap_or(&bid.date),
      Pipeline::Forecast => &bid.date,
    }
  }
}

/// Bids of a pipeline falling in a given month, most recent first.
/// Bids whose bucket date does not parse are skipped.
pub fn bids_in_month(bids: &[Bid], pipeline: Pipeline, year: i32, month: u32) -> Vec<&Bid> {
  let mut selected: Vec<(&Bid, NaiveDate)> = bids
    .iter()
    .filter(|b| pipeline.includes(b))
    .filter_map(|b| {
      let date = parse_loose_date(pipeline.bucket_date(b))?;
      (date.year() == year && date.month() == month).then_some((b, date))
    })
    .collect();
  selected.sort_by(|a, b| b.1.cmp(&a.1));
  selected.into_iter().map(|(b, _)| b).collect()
}

// ─── Annual report ───────────────────────────────────────────────────────────

/// One month's totals in the annual report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthFigures {
  pub month:      u32,
  pub revenue:    f64,
  pub cost:       f64,
  pub net_profit: f64,
}

/// Twelve per-month buckets of won-pipeline figures for one year.
pub fn monthly_report(bids: &[Bid], year: i32) -> Vec<MonthFigures> {
  let mut months: Vec<MonthFigures> = (1..=12)
    .map(|m| MonthFigures { month: m, ..MonthFigures::default() })
    .collect();

  for bid in bids.iter().filter(|b| Pipeline::Won.includes(b)) {
    let Some(date) = parse_loose_date(Pipeline::Won.bucket_date(bid)) else {
      continue;
    };
    if date.year() != year {
      continue;
    }
    let figures = bid_figures(bid);
    let bucket = &mut months[date.month0() as usize];
    bucket.revenue += figures.revenue;
    bucket.cost += figures.cost;
    bucket.net_profit += figures.net_profit;
  }

  months
}

// ─── Date parsing ────────────────────────────────────────────────────────────

/// Parse the loosely-formatted date strings bids carry: RFC 3339,
/// `YYYY-MM-DDTHH:mm`, or bare `YYYY-MM-DD`.
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
  if raw.is_empty() {
    return None;
  }
  if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
    return Some(dt.date_naive());
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
    return Some(dt.date());
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Round to two decimal places (display boundary only).
pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::bid::{BidModality, BidStatus};

  fn item() -> BidItem {
    BidItem {
      id:                  Uuid::new_v4(),
      number:              "1".to_string(),
      name:                "Torniquete".to_string(),
      quantity:            1,
      brand:               None,
      model:               None,
      manufacturer:        None,
      reference_price:     None,
      min_price:           None,
      winning_price:       None,
      lost_price:          None,
      cost_price:          None,
      shipping_cost:       None,
      tax_percentage:      None,
      investor_percentage: None,
      created_at:          None,
      updated_at:          None,
    }
  }

  fn bid(status: BidStatus, date: &str, items: Vec<BidItem>) -> Bid {
    Bid {
      id: Uuid::new_v4(),
      user_id: None,
      order: None,
      uasg: None,
      title: "Pregão".to_string(),
      bidding_number: "1/2024".to_string(),
      organ: "Prefeitura".to_string(),
      modality: BidModality::ElectronicAuction,
      disputed_item: String::new(),
      items,
      date: date.to_string(),
      value: 0.0,
      anvisa: false,
      sample: false,
      status,
      documents: Vec::new(),
      notes: None,
      payment_date: None,
      commitment_date: None,
      tracking_code: None,
      delivery_deadline: None,
      created_at: None,
      updated_at: None,
    }
  }

  #[test]
  fn full_figures_for_a_won_item() {
    let mut it = item();
    it.quantity = 10;
    it.winning_price = Some(5.0);
    it.cost_price = Some(2.0);
    it.shipping_cost = Some(3.0);
    it.tax_percentage = Some(10.0);
    it.investor_percentage = Some(50.0);

    let f = item_figures(&it);

    assert_eq!(f.revenue, 50.0);
    assert_eq!(f.cost, 28.0);
    assert_eq!(f.margin, 22.0);
    assert_eq!(f.investor_share, 11.0);
    assert_eq!(f.net_profit, 11.0);
  }

  #[test]
  fn unit_price_falls_back_to_reference_then_min() {
    let mut it = item();
    it.quantity = 2;
    it.reference_price = Some(8.0);
    assert_eq!(item_figures(&it).revenue, 16.0);

    it.reference_price = None;
    it.min_price = Some(3.0);
    assert_eq!(item_figures(&it).revenue, 6.0);
  }

  #[test]
  fn a_set_zero_winning_price_does_not_fall_through() {
    let mut it = item();
    it.quantity = 4;
    it.winning_price = Some(0.0);
    it.reference_price = Some(9.0);

    assert_eq!(effective_unit_price(&it), Some(0.0));
    assert_eq!(item_figures(&it).revenue, 0.0);
  }

  #[test]
  fn negative_margin_pays_no_investor_share() {
    let mut it = item();
    it.quantity = 1;
    it.winning_price = Some(10.0);
    it.cost_price = Some(15.0);
    it.investor_percentage = Some(50.0);

    let f = item_figures(&it);

    assert_eq!(f.margin, -5.0);
    assert_eq!(f.investor_share, 0.0);
    assert_eq!(f.net_profit, -5.0);
  }

  #[test]
  fn bid_figures_sum_items() {
    let mut a = item();
    a.quantity = 2;
    a.winning_price = Some(10.0);
    let mut b = item();
    b.quantity = 1;
    b.winning_price = Some(5.0);
    b.cost_price = Some(1.0);

    let f = bid_figures(&bid(BidStatus::PaidConcluded, "2024-02-01T09:00", vec![a, b]));

    assert_eq!(f.revenue, 25.0);
    assert_eq!(f.cost, 1.0);
    assert_eq!(f.net_profit, 24.0);
  }

  #[test]
  fn monthly_report_buckets_by_payment_date_then_session_date() {
    let mut it = item();
    it.quantity = 1;
    it.winning_price = Some(100.0);

    let mut paid = bid(BidStatus::PaidConcluded, "2024-01-15T09:00", vec![it.clone()]);
    paid.payment_date = Some("2024-03-02".to_string());
    let shipped = bid(BidStatus::ProductShipped, "2024-01-20T09:00", vec![it.clone()]);
    // Forecast bids never enter the annual report.
    let forecast = bid(BidStatus::ProposalSent, "2024-01-25T09:00", vec![it]);

    let report = monthly_report(&[paid, shipped, forecast], 2024);

    assert_eq!(report.len(), 12);
    assert_eq!(report[0].revenue, 100.0); // January: the shipped bid
    assert_eq!(report[2].revenue, 100.0); // March: the paid bid, by payment date
    assert_eq!(report[1].revenue, 0.0);
  }

  #[test]
  fn bids_in_month_skips_unparseable_dates() {
    let mut it = item();
    it.winning_price = Some(1.0);
    let good = bid(BidStatus::WaitingPayment, "2024-05-10T14:00", vec![it.clone()]);
    let bad = bid(BidStatus::WaitingPayment, "sem data", vec![it]);

    let bids = [good.clone(), bad];
    let selected = bids_in_month(&bids, Pipeline::Won, 2024, 5);

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, good.id);
  }

  #[test]
  fn roi_relates_net_profit_to_cost() {
    let mut it = item();
    it.quantity = 10;
    it.winning_price = Some(5.0);
    it.cost_price = Some(2.0);
    it.shipping_cost = Some(3.0);
    it.tax_percentage = Some(10.0);
    it.investor_percentage = Some(50.0);

    let f = item_figures(&it);
    // net 11 over cost 28
    assert!((f.roi() - 39.285714).abs() < 1e-4);
    assert_eq!(Figures::default().roi(), 0.0);
  }

  #[test]
  fn round2_keeps_two_decimal_places() {
    assert_eq!(round2(1.2345), 1.23);
    assert_eq!(round2(10.0 / 3.0), 3.33);
    assert_eq!(round2(-1.238), -1.24);
  }
}
