use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Product line a set belongs to, used by the UI for filter chips and color
/// coding. Derived from the set name when the dataset does not carry it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
  Flagship,
  Chrome,
  Holiday,
  Sapphire,
  Midnight,
  BlackFriday,
}

impl CollectionKind {
  pub fn from_set_name(set_name: &str) -> Self {
    let lower = set_name.to_lowercase();
    if lower.contains("sapphire") {
      return CollectionKind::Sapphire;
    }
    if lower.contains("chrome") {
      return CollectionKind::Chrome;
    }
    if lower.contains("holiday") {
      return CollectionKind::Holiday;
    }
    if lower.contains("midnight") {
      return CollectionKind::Midnight;
    }
    if lower.contains("black friday") || lower.contains("blackfriday") {
      return CollectionKind::BlackFriday;
    }
    CollectionKind::Flagship
  }
}

/// Cosmetic banding of a serial-numbered parallel's print run. Never
/// validated against anything; the UI only picks an accent color from it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RarityTier {
  Standard,
  Numbered,
  Limited,
  Scarce,
  Rare,
  SuperRare,
  UltraRare,
  OneOfOne,
}

impl RarityTier {
  pub fn from_serial(serial: Option<&str>) -> Self {
    let Some(serial) = serial else {
      return RarityTier::Standard;
    };
    let trimmed = serial.trim();
    if trimmed.is_empty() {
      return RarityTier::Standard;
    }
    match print_run(trimmed) {
      Some(1) => RarityTier::OneOfOne,
      Some(run) if run <= 10 => RarityTier::UltraRare,
      Some(run) if run <= 25 => RarityTier::SuperRare,
      Some(run) if run <= 50 => RarityTier::Rare,
      Some(run) if run <= 99 => RarityTier::Scarce,
      Some(run) if run <= 199 => RarityTier::Limited,
      _ => RarityTier::Numbered,
    }
  }
}

/// Print run from markers like "/99", "1/1" or "23/150". The digits after
/// the last slash are the run size.
fn print_run(serial: &str) -> Option<u32> {
  let (_, run) = serial.rsplit_once('/')?;
  let run = run.trim();
  if run.is_empty() || run.len() > 6 {
    return None;
  }
  run.parse::<u32>().ok().filter(|run| *run > 0)
}

/// A single checklist entry. Dataset cards keep the ids the bundled dataset
/// assigned; user-created cards get a fresh UUID at creation. The id is never
/// derived from display fields.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
  pub id: String,
  pub set_name: String,
  #[serde(default)]
  pub card_name: Option<String>,
  pub parallel: String,
  #[serde(default)]
  pub card_number: String,
  #[serde(default)]
  pub serial: Option<String>,
  #[serde(default)]
  pub source: Option<String>,
  #[serde(default)]
  pub collected: bool,
  pub collection_type: CollectionKind,
  #[serde(default)]
  pub purchase_price: Option<f64>,
  #[serde(default)]
  pub purchase_date: Option<String>,
  #[serde(default)]
  pub current_value: Option<f64>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub serial_number: Option<String>,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub custom: bool,
}

impl Card {
  /// Label shown on the card row; falls back to the parallel when the card
  /// has no dedicated name.
  pub fn display_label(&self) -> &str {
    match &self.card_name {
      Some(name) if !name.trim().is_empty() => name,
      _ => &self.parallel,
    }
  }

  pub fn gain(&self) -> Option<f64> {
    match (self.purchase_price, self.current_value) {
      (Some(price), Some(value)) => Some(value - price),
      _ => None,
    }
  }

  pub fn gain_percent(&self) -> Option<f64> {
    let price = self.purchase_price?;
    if price <= 0.0 {
      return None;
    }
    self.gain().map(|gain| gain / price * 100.0)
  }

  pub fn rarity_tier(&self) -> RarityTier {
    RarityTier::from_serial(self.serial.as_deref())
  }
}

/// The shape of the per-user remote document, and of the local cache body.
/// `customOrder` is a BTreeMap and `hiddenCards` stays sorted so the
/// canonical serialization (and the revision hash over it) is deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDocument {
  #[serde(default)]
  pub cards: Vec<Card>,
  #[serde(default)]
  pub custom_order: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub hidden_cards: Vec<String>,
  #[serde(default)]
  pub collection_order: Vec<String>,
  #[serde(default)]
  pub updated_at: String,
}

impl CollectionDocument {
  pub fn is_empty(&self) -> bool {
    self.cards.is_empty()
  }
}

/// Card plus the derived fields the UI renders directly.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
  #[serde(flatten)]
  pub card: Card,
  pub gain: Option<f64>,
  pub gain_percent: Option<f64>,
  pub rarity_tier: RarityTier,
}

impl From<&Card> for CardDto {
  fn from(card: &Card) -> Self {
    CardDto {
      gain: card.gain(),
      gain_percent: card.gain_percent(),
      rarity_tier: card.rarity_tier(),
      card: card.clone(),
    }
  }
}

/// Fields accepted when creating a card. `collection_type` falls back to
/// derivation from the set name.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddCardInput {
  #[serde(default)]
  pub set_name: String,
  #[serde(default)]
  pub card_name: Option<String>,
  #[serde(default)]
  pub parallel: String,
  #[serde(default)]
  pub card_number: String,
  #[serde(default)]
  pub serial: Option<String>,
  #[serde(default)]
  pub source: Option<String>,
  #[serde(default)]
  pub collection_type: Option<CollectionKind>,
  #[serde(default)]
  pub purchase_price: Option<f64>,
  #[serde(default)]
  pub purchase_date: Option<String>,
  #[serde(default)]
  pub current_value: Option<f64>,
  #[serde(default)]
  pub notes: Option<String>,
}

/// Partial update for an existing card. Absent fields stay untouched;
/// optional text fields provided as empty strings are cleared.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EditCardInput {
  pub id: String,
  #[serde(default)]
  pub set_name: Option<String>,
  #[serde(default)]
  pub card_name: Option<String>,
  #[serde(default)]
  pub parallel: Option<String>,
  #[serde(default)]
  pub card_number: Option<String>,
  #[serde(default)]
  pub serial: Option<String>,
  #[serde(default)]
  pub source: Option<String>,
  #[serde(default)]
  pub collection_type: Option<CollectionKind>,
  #[serde(default)]
  pub purchase_price: Option<f64>,
  #[serde(default)]
  pub purchase_date: Option<String>,
  #[serde(default)]
  pub current_value: Option<f64>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub serial_number: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn card(serial: Option<&str>) -> Card {
    Card {
      id: "c-1".to_string(),
      set_name: "Flagship Base".to_string(),
      card_name: None,
      parallel: "Gold".to_string(),
      card_number: "124".to_string(),
      serial: serial.map(|s| s.to_string()),
      source: None,
      collected: false,
      collection_type: CollectionKind::Flagship,
      purchase_price: None,
      purchase_date: None,
      current_value: None,
      notes: None,
      serial_number: None,
      image: None,
      custom: false,
    }
  }

  #[test]
  fn kind_derivation_from_set_name() {
    assert_eq!(CollectionKind::from_set_name("Chrome Base"), CollectionKind::Chrome);
    assert_eq!(CollectionKind::from_set_name("Sapphire Selections"), CollectionKind::Sapphire);
    assert_eq!(CollectionKind::from_set_name("Holiday"), CollectionKind::Holiday);
    assert_eq!(CollectionKind::from_set_name("Midnight"), CollectionKind::Midnight);
    assert_eq!(CollectionKind::from_set_name("Black Friday Bonus"), CollectionKind::BlackFriday);
    assert_eq!(CollectionKind::from_set_name("Clutch Gene"), CollectionKind::Flagship);
  }

  #[test]
  fn rarity_bands_by_print_run() {
    assert_eq!(RarityTier::from_serial(Some("1/1")), RarityTier::OneOfOne);
    assert_eq!(RarityTier::from_serial(Some("/1")), RarityTier::OneOfOne);
    assert_eq!(RarityTier::from_serial(Some("/5")), RarityTier::UltraRare);
    assert_eq!(RarityTier::from_serial(Some("/25")), RarityTier::SuperRare);
    assert_eq!(RarityTier::from_serial(Some("/50")), RarityTier::Rare);
    assert_eq!(RarityTier::from_serial(Some("/99")), RarityTier::Scarce);
    assert_eq!(RarityTier::from_serial(Some("/150")), RarityTier::Limited);
    assert_eq!(RarityTier::from_serial(Some("/299")), RarityTier::Numbered);
    assert_eq!(RarityTier::from_serial(Some("23/150")), RarityTier::Limited);
    assert_eq!(RarityTier::from_serial(Some("/XX")), RarityTier::Numbered);
    assert_eq!(RarityTier::from_serial(None), RarityTier::Standard);
  }

  #[test]
  fn gain_requires_both_price_and_value() {
    let mut entry = card(None);
    assert_eq!(entry.gain(), None);
    assert_eq!(entry.gain_percent(), None);

    entry.purchase_price = Some(100.0);
    assert_eq!(entry.gain(), None);

    entry.current_value = Some(150.0);
    assert_eq!(entry.gain(), Some(50.0));
    assert_eq!(entry.gain_percent(), Some(50.0));
  }

  #[test]
  fn gain_percent_guards_zero_price() {
    let mut entry = card(None);
    entry.purchase_price = Some(0.0);
    entry.current_value = Some(25.0);
    assert_eq!(entry.gain(), Some(25.0));
    assert_eq!(entry.gain_percent(), None);
  }

  #[test]
  fn display_label_falls_back_to_parallel() {
    let mut entry = card(None);
    assert_eq!(entry.display_label(), "Gold");
    entry.card_name = Some("Rookie Debut".to_string());
    assert_eq!(entry.display_label(), "Rookie Debut");
  }

  #[test]
  fn document_deserializes_with_missing_fields() {
    let document: CollectionDocument = serde_json::from_str("{}").unwrap();
    assert!(document.is_empty());
    assert!(document.custom_order.is_empty());
    assert!(document.hidden_cards.is_empty());
  }
}
