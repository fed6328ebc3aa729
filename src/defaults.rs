use crate::model::{Card, CollectionKind};
use serde::Deserialize;
use std::collections::BTreeMap;

const DEFAULT_DATASET: &str = include_str!("../data/default_cards.json");

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultDataset {
  sets: BTreeMap<String, DefaultSet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultSet {
  name: String,
  #[serde(default)]
  category: Option<CollectionKind>,
  #[serde(default)]
  card_number: Option<String>,
  cards: Vec<DefaultCard>,
}

/// Dataset entries inherit `setName` and `cardNumber` from their set when
/// they do not carry their own, like insert sets with per-card numbers do.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultCard {
  id: String,
  #[serde(default)]
  set_name: Option<String>,
  #[serde(default)]
  card_number: Option<String>,
  #[serde(default)]
  card_name: Option<String>,
  parallel: String,
  #[serde(default)]
  serial: Option<String>,
  #[serde(default)]
  source: Option<String>,
}

/// Flattens the bundled checklist into cards, all uncollected and
/// default-origin. Used to seed a user whose remote document is absent.
pub fn default_cards() -> Result<Vec<Card>, String> {
  flatten_dataset(DEFAULT_DATASET)
}

fn flatten_dataset(raw: &str) -> Result<Vec<Card>, String> {
  let dataset: DefaultDataset = serde_json::from_str(raw).map_err(|e| e.to_string())?;

  let mut cards = Vec::new();
  for set in dataset.sets.values() {
    for entry in &set.cards {
      let set_name = entry
        .set_name
        .clone()
        .unwrap_or_else(|| set.name.clone());
      let collection_type = set
        .category
        .unwrap_or_else(|| CollectionKind::from_set_name(&set_name));

      cards.push(Card {
        id: entry.id.clone(),
        set_name,
        card_name: entry.card_name.clone(),
        parallel: entry.parallel.clone(),
        card_number: entry
          .card_number
          .clone()
          .or_else(|| set.card_number.clone())
          .unwrap_or_default(),
        serial: entry.serial.clone(),
        source: entry.source.clone(),
        collected: false,
        collection_type,
        purchase_price: None,
        purchase_date: None,
        current_value: None,
        notes: None,
        serial_number: None,
        image: None,
        custom: false,
      });
    }
  }

  Ok(cards)
}
