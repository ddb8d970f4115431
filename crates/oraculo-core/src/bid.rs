//! Bid — the central business entity: one tracked public-procurement
//! process, its priced line items, and its attached documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  record::{Recency, Touch},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Pipeline stage of a bid.
///
/// Wire values are the product's Portuguese labels; they are shared with the
/// persisted JSON of existing installations and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
  #[serde(rename = "Lançado")]
  Launched,
  #[serde(rename = "Inserir Marca Modelo")]
  InsertModel,
  #[serde(rename = "Pronto Ag Leilão")]
  ReadyWaiting,
  #[serde(rename = "Leilão Ganho")]
  WonAuction,
  #[serde(rename = "Proposta Enviada")]
  ProposalSent,
  #[serde(rename = "Em Disputa")]
  InDispute,
  #[serde(rename = "Aguardando Envio Amostra")]
  WaitingSamples,
  #[serde(rename = "Amostra Enviada")]
  SamplesSent,
  #[serde(rename = "Aguardando Homologação")]
  WaitingHomologation,
  #[serde(rename = "Homologado")]
  Homologated,
  #[serde(rename = "Empenho Gerado")]
  CommitmentGenerated,
  #[serde(rename = "Produto Encomendado")]
  ProductOrdered,
  #[serde(rename = "Produto Separado")]
  ProductPicked,
  #[serde(rename = "Produto Enviado")]
  ProductShipped,
  #[serde(rename = "Aguardando Pagamento")]
  WaitingPayment,
  #[serde(rename = "Pago/Concluído")]
  PaidConcluded,
  #[serde(rename = "Perdido")]
  Lost,
  #[serde(rename = "Em Fase de Recurso")]
  InAppeal,
}

impl BidStatus {
  /// Every stage, in pipeline order.
  pub const ALL: [BidStatus; 18] = [
    BidStatus::Launched,
    BidStatus::InsertModel,
    BidStatus::ReadyWaiting,
    BidStatus::WonAuction,
    BidStatus::ProposalSent,
    BidStatus::InDispute,
    BidStatus::WaitingSamples,
    BidStatus::SamplesSent,
    BidStatus::WaitingHomologation,
    BidStatus::Homologated,
    BidStatus::CommitmentGenerated,
    BidStatus::ProductOrdered,
    BidStatus::ProductPicked,
    BidStatus::ProductShipped,
    BidStatus::WaitingPayment,
    BidStatus::PaidConcluded,
    BidStatus::Lost,
    BidStatus::InAppeal,
  ];

  /// The Portuguese wire label. Must match the serde renames above.
  pub fn label(self) -> &'static str {
    match self {
      Self::Launched => "Lançado",
      Self::InsertModel => "Inserir Marca Modelo",
      Self::ReadyWaiting => "Pronto Ag Leilão",
      Self::WonAuction => "Leilão Ganho",
      Self::ProposalSent => "Proposta Enviada",
      Self::InDispute => "Em Disputa",
      Self::WaitingSamples => "Aguardando Envio Amostra",
      Self::SamplesSent => "Amostra Enviada",
      Self::WaitingHomologation => "Aguardando Homologação",
      Self::Homologated => "Homologado",
      Self::CommitmentGenerated => "Empenho Gerado",
      Self::ProductOrdered => "Produto Encomendado",
      Self::ProductPicked => "Produto Separado",
      Self::ProductShipped => "Produto Enviado",
      Self::WaitingPayment => "Aguardando Pagamento",
      Self::PaidConcluded => "Pago/Concluído",
      Self::Lost => "Perdido",
      Self::InAppeal => "Em Fase de Recurso",
    }
  }

  /// Parse a wire label, e.g. from an assistant function call.
  pub fn from_label(label: &str) -> Result<Self> {
    Self::ALL
      .iter()
      .copied()
      .find(|s| s.label() == label)
      .ok_or_else(|| Error::UnknownStatus(label.to_string()))
  }

  /// Stages whose revenue is still a forecast.
  pub fn is_forecast(self) -> bool {
    matches!(
      self,
      Self::WonAuction
        | Self::ProposalSent
        | Self::InDispute
        | Self::WaitingSamples
        | Self::SamplesSent
        | Self::WaitingHomologation
        | Self::Homologated
    )
  }

  /// Stages won and in fulfilment or already paid.
  pub fn is_won(self) -> bool {
    matches!(
      self,
      Self::CommitmentGenerated
        | Self::ProductOrdered
        | Self::ProductPicked
        | Self::ProductShipped
        | Self::WaitingPayment
        | Self::PaidConcluded
    )
  }
}

impl std::fmt::Display for BidStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

// ─── Modality ────────────────────────────────────────────────────────────────

/// Procurement modality under Brazilian public-bidding law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidModality {
  #[serde(rename = "Pregão Eletrônico")]
  ElectronicAuction,
  #[serde(rename = "Pregão Presencial")]
  InPersonAuction,
  #[serde(rename = "Leilão")]
  Auction,
  #[serde(rename = "Dispensa")]
  Waiver,
  #[serde(rename = "Inexigibilidade")]
  Exemption,
}

// ─── Documents attached to a bid ─────────────────────────────────────────────

/// A file attached to a bid (edital, proposal, commitment note, …).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidDocument {
  pub id:          Uuid,
  pub name:        String,
  #[serde(rename = "type")]
  pub kind:        String,
  pub upload_date: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base64:      Option<String>,
  #[serde(default, rename = "updated_at", skip_serializing_if = "Option::is_none")]
  pub updated_at:  Option<DateTime<Utc>>,
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// One priced line within a bid.
///
/// The price fields are independently optional: a field that was never
/// entered is `None`, which is distinct from an entered value of `0.0`.
/// Derived figures (revenue, margin, …) are never stored here — see
/// [`crate::finance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidItem {
  pub id:       Uuid,
  pub number:   String,
  pub name:     String,
  pub quantity: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brand:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub manufacturer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reference_price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_price:       Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub winning_price:   Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lost_price:      Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cost_price:      Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shipping_cost:   Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tax_percentage:      Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub investor_percentage: Option<f64>,
  #[serde(default, rename = "created_at", skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, rename = "updated_at", skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

// ─── Bid ─────────────────────────────────────────────────────────────────────

/// A tracked public-procurement process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
  pub id: Uuid,
  #[serde(default, rename = "user_id", skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,
  /// Internal order number.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order: Option<String>,
  /// Government purchasing-unit code.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uasg: Option<String>,
  /// Object of the purchase.
  pub title:          String,
  pub bidding_number: String,
  /// Contracting organ or city hall.
  pub organ:          String,
  pub modality:       BidModality,
  pub disputed_item:  String,
  #[serde(default)]
  pub items: Vec<BidItem>,
  /// Auction session date/time as entered or extracted (`YYYY-MM-DDTHH:mm`).
  pub date:  String,
  /// Estimated total value of the opportunity.
  pub value: f64,
  /// ANVISA sanitary registration required.
  pub anvisa: bool,
  /// Physical sample required.
  pub sample: bool,
  pub status: BidStatus,
  #[serde(default)]
  pub documents: Vec<BidDocument>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payment_date:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub commitment_date:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tracking_code:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delivery_deadline: Option<String>,
  #[serde(default, rename = "created_at", skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, rename = "updated_at", skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Bid {
  /// Insert or replace an item by id, stamping both item and bid.
  /// Returns `true` when an existing item was replaced.
  pub fn upsert_item(&mut self, mut item: BidItem, now: DateTime<Utc>) -> bool {
    item.updated_at = Some(now);
    self.updated_at = Some(now);
    if let Some(slot) = self.items.iter_mut().find(|i| i.id == item.id) {
      *slot = item;
      true
    } else {
      item.created_at = Some(now);
      self.items.push(item);
      false
    }
  }

  /// Remove an item by id, stamping the bid. Returns `true` if it existed.
  pub fn remove_item(&mut self, item_id: Uuid, now: DateTime<Utc>) -> bool {
    let before = self.items.len();
    self.items.retain(|i| i.id != item_id);
    let removed = self.items.len() != before;
    if removed {
      self.updated_at = Some(now);
    }
    removed
  }

  /// Move the bid to a new pipeline stage.
  pub fn set_status(&mut self, status: BidStatus, now: DateTime<Utc>) {
    self.status = status;
    self.updated_at = Some(now);
  }
}

impl Recency for Bid {
  fn record_id(&self) -> Uuid {
    self.id
  }

  fn recency(&self) -> Option<DateTime<Utc>> {
    self.updated_at
  }
}

impl Touch for Bid {
  fn touch(&mut self, now: DateTime<Utc>) {
    self.updated_at = Some(now);
  }
}

// ─── Collection helpers ──────────────────────────────────────────────────────

/// Insert or replace a bid by id: an existing bid is updated in place with a
/// fresh `updated_at`; a new bid is stamped `created_at` + `updated_at` and
/// prepended (newest first). Returns `true` when an existing bid was
/// replaced.
pub fn upsert_bid(bids: &mut Vec<Bid>, mut bid: Bid, now: DateTime<Utc>) -> bool {
  bid.updated_at = Some(now);
  if let Some(slot) = bids.iter_mut().find(|b| b.id == bid.id) {
    *slot = bid;
    true
  } else {
    bid.created_at = Some(now);
    bids.insert(0, bid);
    false
  }
}

/// Remove a bid by id; deletion is immediate, with no tombstone — the next
/// sync propagates it as an absence.
pub fn remove_bid(bids: &mut Vec<Bid>, id: Uuid) -> Option<Bid> {
  let idx = bids.iter().position(|b| b.id == id)?;
  Some(bids.remove(idx))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn bid(title: &str) -> Bid {
    Bid {
      id:                Uuid::new_v4(),
      user_id:           None,
      order:             None,
      uasg:              None,
      title:             title.to_string(),
      bidding_number:    "90012/2024".to_string(),
      organ:             "Prefeitura de João Pessoa".to_string(),
      modality:          BidModality::ElectronicAuction,
      disputed_item:     "Kit APH".to_string(),
      items:             Vec::new(),
      date:              "2024-05-10T09:00".to_string(),
      value:             10_000.0,
      anvisa:            true,
      sample:            false,
      status:            BidStatus::Launched,
      documents:         Vec::new(),
      notes:             None,
      payment_date:      None,
      commitment_date:   None,
      tracking_code:     None,
      delivery_deadline: None,
      created_at:        None,
      updated_at:        None,
    }
  }

  fn item(name: &str) -> BidItem {
    BidItem {
      id:                  Uuid::new_v4(),
      number:              "1".to_string(),
      name:                name.to_string(),
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

  #[test]
  fn status_labels_round_trip_through_serde() {
    for status in BidStatus::ALL {
      let json = serde_json::to_string(&status).unwrap();
      assert_eq!(json, format!("\"{}\"", status.label()));
      let back: BidStatus = serde_json::from_str(&json).unwrap();
      assert_eq!(back, status);
    }
  }

  #[test]
  fn status_from_label() {
    assert_eq!(
      BidStatus::from_label("Empenho Gerado").unwrap(),
      BidStatus::CommitmentGenerated
    );
    assert!(matches!(
      BidStatus::from_label("Inexistente"),
      Err(Error::UnknownStatus(_))
    ));
  }

  #[test]
  fn forecast_and_won_pipelines_are_disjoint() {
    for status in BidStatus::ALL {
      assert!(!(status.is_forecast() && status.is_won()), "{status}");
    }
    assert!(BidStatus::ProposalSent.is_forecast());
    assert!(BidStatus::WaitingPayment.is_won());
    assert!(!BidStatus::Lost.is_forecast());
    assert!(!BidStatus::Lost.is_won());
  }

  #[test]
  fn upsert_new_bid_prepends_and_stamps_both_timestamps() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut bids = vec![bid("antiga")];

    let existed = upsert_bid(&mut bids, bid("nova"), now);

    assert!(!existed);
    assert_eq!(bids.len(), 2);
    assert_eq!(bids[0].title, "nova");
    assert_eq!(bids[0].created_at, Some(now));
    assert_eq!(bids[0].updated_at, Some(now));
  }

  #[test]
  fn upsert_existing_bid_replaces_in_place_with_fresh_updated_at() {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
    let mut bids = Vec::new();
    upsert_bid(&mut bids, bid("original"), t0);

    let mut edited = bids[0].clone();
    edited.title = "editada".to_string();
    let existed = upsert_bid(&mut bids, edited, t1);

    assert!(existed);
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].title, "editada");
    // created_at survives from the first insert; updated_at moves forward.
    assert_eq!(bids[0].created_at, Some(t0));
    assert_eq!(bids[0].updated_at, Some(t1));
  }

  #[test]
  fn upsert_item_stamps_item_and_parent_bid() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut b = bid("com itens");

    let replaced = b.upsert_item(item("torniquete"), now);
    assert!(!replaced);
    assert_eq!(b.items.len(), 1);
    assert_eq!(b.items[0].updated_at, Some(now));
    assert_eq!(b.updated_at, Some(now));

    let later = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
    let mut edit = b.items[0].clone();
    edit.quantity = 5;
    assert!(b.upsert_item(edit, later));
    assert_eq!(b.items.len(), 1);
    assert_eq!(b.items[0].quantity, 5);
    assert_eq!(b.updated_at, Some(later));
  }

  #[test]
  fn remove_item_only_stamps_when_something_was_removed() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut b = bid("com itens");
    b.upsert_item(item("gaze"), now);
    let item_id = b.items[0].id;

    let later = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
    assert!(b.remove_item(item_id, later));
    assert!(b.items.is_empty());
    assert_eq!(b.updated_at, Some(later));

    let unrelated = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
    assert!(!b.remove_item(Uuid::new_v4(), unrelated));
    assert_eq!(b.updated_at, Some(later));
  }

  #[test]
  fn bid_wire_shape_keeps_original_field_names() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut b = bid("wire");
    b.updated_at = Some(now);

    let value = serde_json::to_value(&b).unwrap();
    assert!(value.get("biddingNumber").is_some());
    assert!(value.get("disputedItem").is_some());
    assert!(value.get("updated_at").is_some());
    assert_eq!(value["status"], "Lançado");
    assert_eq!(value["modality"], "Pregão Eletrônico");
  }
}
