use crate::model::{AddCardInput, Card, CollectionDocument, CollectionKind, EditCardInput};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// The authoritative in-memory state for a signed-in user: the flat card
/// list, tombstones for removed default cards, and the manual orderings.
/// Reads go through `live_cards`; every write goes through the mutation
/// methods below.
///
/// Deleting a card that came from the bundled dataset tombstones its id
/// instead of removing it, so a later reseed from defaults cannot resurrect
/// it. User-created cards are removed outright. Tombstones are keyed by the
/// immutable card id alone; renaming a set never detaches them.
#[derive(Clone, Debug, Default)]
pub struct CollectionStore {
  cards: Vec<Card>,
  hidden_card_ids: HashSet<String>,
  custom_order: BTreeMap<String, Vec<String>>,
  collection_order: Vec<String>,
}

fn required(value: &str, label: &str) -> Result<String, String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(format!("{} is required.", label));
  }
  Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
  value
    .map(|text| text.trim().to_string())
    .filter(|text| !text.is_empty())
}

impl CollectionStore {
  pub fn seed(cards: Vec<Card>) -> Self {
    CollectionStore {
      cards,
      ..CollectionStore::default()
    }
  }

  pub fn from_document(document: CollectionDocument) -> Self {
    let mut seen = HashSet::new();
    let cards = document
      .cards
      .into_iter()
      .filter(|card| seen.insert(card.id.clone()))
      .collect();

    CollectionStore {
      cards,
      hidden_card_ids: document.hidden_cards.into_iter().collect(),
      custom_order: document.custom_order,
      collection_order: document.collection_order,
    }
  }

  pub fn to_document(&self, updated_at: String) -> CollectionDocument {
    let mut hidden: Vec<String> = self.hidden_card_ids.iter().cloned().collect();
    hidden.sort();

    CollectionDocument {
      cards: self.cards.clone(),
      custom_order: self.custom_order.clone(),
      hidden_cards: hidden,
      collection_order: self.collection_order.clone(),
      updated_at,
    }
  }

  pub fn live_cards(&self) -> impl Iterator<Item = &Card> {
    self
      .cards
      .iter()
      .filter(|card| !self.hidden_card_ids.contains(&card.id))
  }

  pub fn hidden_cards(&self) -> impl Iterator<Item = &Card> {
    self
      .cards
      .iter()
      .filter(|card| self.hidden_card_ids.contains(&card.id))
  }

  pub fn custom_order(&self) -> &BTreeMap<String, Vec<String>> {
    &self.custom_order
  }

  pub fn collection_order(&self) -> &[String] {
    &self.collection_order
  }

  fn live_position(&self, id: &str) -> Result<usize, String> {
    if self.hidden_card_ids.contains(id) {
      return Err(format!("Card not found: {}", id));
    }
    self
      .cards
      .iter()
      .position(|card| card.id == id)
      .ok_or_else(|| format!("Card not found: {}", id))
  }

  pub fn toggle_collected(&mut self, id: &str) -> Result<bool, String> {
    let index = self.live_position(id)?;
    let card = &mut self.cards[index];
    card.collected = !card.collected;
    Ok(card.collected)
  }

  /// Appends a user-created card with a fresh id. An unknown set name
  /// creates the collection implicitly.
  pub fn add_card(&mut self, input: AddCardInput) -> Result<String, String> {
    let card = self.build_card(input)?;
    let id = card.id.clone();
    self.cards.push(card);
    Ok(id)
  }

  /// Adds several cards to one set; validates every entry before inserting
  /// any of them.
  pub fn bulk_add_cards(
    &mut self,
    set_name: &str,
    entries: Vec<AddCardInput>,
  ) -> Result<Vec<String>, String> {
    let set_name = required(set_name, "Set name")?;
    let mut cards = Vec::with_capacity(entries.len());
    for mut entry in entries {
      entry.set_name = set_name.clone();
      cards.push(self.build_card(entry)?);
    }

    let ids = cards.iter().map(|card| card.id.clone()).collect();
    self.cards.extend(cards);
    Ok(ids)
  }

  fn build_card(&self, input: AddCardInput) -> Result<Card, String> {
    let set_name = required(&input.set_name, "Set name")?;
    let parallel = required(&input.parallel, "Parallel")?;
    let card_number = required(&input.card_number, "Card number")?;
    let collection_type = input
      .collection_type
      .unwrap_or_else(|| CollectionKind::from_set_name(&set_name));

    Ok(Card {
      id: Uuid::new_v4().to_string(),
      set_name,
      card_name: optional(input.card_name.as_deref()),
      parallel,
      card_number,
      serial: optional(input.serial.as_deref()),
      source: optional(input.source.as_deref()),
      collected: false,
      collection_type,
      purchase_price: input.purchase_price,
      purchase_date: optional(input.purchase_date.as_deref()),
      current_value: input.current_value,
      notes: optional(input.notes.as_deref()),
      serial_number: None,
      image: None,
      custom: true,
    })
  }

  /// Merges the provided fields into the card. Ids are stable, so moving a
  /// card between sets or rewriting its labels never changes its identity
  /// or loses its collected state.
  pub fn edit_card(&mut self, input: EditCardInput) -> Result<(), String> {
    let index = self.live_position(&input.id)?;

    let mut updated = self.cards[index].clone();
    if let Some(set_name) = &input.set_name {
      updated.set_name = required(set_name, "Set name")?;
      if input.collection_type.is_none() {
        updated.collection_type = CollectionKind::from_set_name(&updated.set_name);
      }
    }
    if let Some(parallel) = &input.parallel {
      updated.parallel = required(parallel, "Parallel")?;
    }
    if let Some(card_number) = &input.card_number {
      updated.card_number = required(card_number, "Card number")?;
    }
    if let Some(kind) = input.collection_type {
      updated.collection_type = kind;
    }
    if input.card_name.is_some() {
      updated.card_name = optional(input.card_name.as_deref());
    }
    if input.serial.is_some() {
      updated.serial = optional(input.serial.as_deref());
    }
    if input.source.is_some() {
      updated.source = optional(input.source.as_deref());
    }
    if input.notes.is_some() {
      updated.notes = optional(input.notes.as_deref());
    }
    if input.serial_number.is_some() {
      updated.serial_number = optional(input.serial_number.as_deref());
    }
    if input.purchase_date.is_some() {
      updated.purchase_date = optional(input.purchase_date.as_deref());
    }
    if let Some(price) = input.purchase_price {
      updated.purchase_price = Some(price);
    }
    if let Some(value) = input.current_value {
      updated.current_value = Some(value);
    }

    self.cards[index] = updated;
    Ok(())
  }

  /// Clones a card right after the original. The clone is uncollected, has
  /// cleared investment fields, and is always custom-origin regardless of
  /// where the original came from.
  pub fn duplicate_card(&mut self, id: &str) -> Result<String, String> {
    let index = self.live_position(id)?;

    let mut clone = self.cards[index].clone();
    clone.id = Uuid::new_v4().to_string();
    clone.collected = false;
    clone.purchase_price = None;
    clone.purchase_date = None;
    clone.current_value = None;
    clone.custom = true;

    let new_id = clone.id.clone();
    self.cards.insert(index + 1, clone);
    Ok(new_id)
  }

  /// Custom-origin cards are removed outright; default-origin cards are
  /// tombstoned. Already-deleted ids are accepted, so a retried delete is
  /// harmless.
  pub fn delete_card(&mut self, id: &str) -> Result<(), String> {
    if self.hidden_card_ids.contains(id) {
      return Ok(());
    }
    let index = self
      .cards
      .iter()
      .position(|card| card.id == id)
      .ok_or_else(|| format!("Card not found: {}", id))?;

    let set_name = self.cards[index].set_name.clone();
    if self.cards[index].custom {
      self.cards.remove(index);
    } else {
      self.hidden_card_ids.insert(id.to_string());
    }
    self.prune_order_entry(&set_name, id);
    Ok(())
  }

  fn prune_order_entry(&mut self, set_name: &str, id: &str) {
    if let Some(order) = self.custom_order.get_mut(set_name) {
      order.retain(|entry| entry != id);
      if order.is_empty() {
        self.custom_order.remove(set_name);
      }
    }
  }

  /// Retitles every card in the set, tombstoned ones included, and migrates
  /// the manual orders keyed by the old name. The kind follows the new name.
  pub fn rename_collection(&mut self, old_name: &str, new_name: &str) -> Result<(), String> {
    let new_name = required(new_name, "Collection name")?;
    if new_name == old_name {
      return Ok(());
    }
    if !self.cards.iter().any(|card| card.set_name == old_name) {
      return Err(format!("Collection not found: {}", old_name));
    }
    if self.cards.iter().any(|card| card.set_name == new_name) {
      return Err(format!("A collection named {} already exists.", new_name));
    }

    let collection_type = CollectionKind::from_set_name(&new_name);
    for card in self
      .cards
      .iter_mut()
      .filter(|card| card.set_name == old_name)
    {
      card.set_name = new_name.clone();
      card.collection_type = collection_type;
    }

    if let Some(order) = self.custom_order.remove(old_name) {
      self.custom_order.insert(new_name.clone(), order);
    }
    for entry in self.collection_order.iter_mut() {
      if entry == old_name {
        *entry = new_name.clone();
      }
    }
    Ok(())
  }

  /// Clears collected state on every member, then tombstones default-origin
  /// cards and removes custom-origin ones. Manual orders for the set are
  /// dropped.
  pub fn delete_collection(&mut self, set_name: &str) -> Result<(), String> {
    if !self.cards.iter().any(|card| card.set_name == set_name) {
      return Err(format!("Collection not found: {}", set_name));
    }

    let mut kept = Vec::with_capacity(self.cards.len());
    for mut card in self.cards.drain(..) {
      if card.set_name != set_name {
        kept.push(card);
        continue;
      }
      card.collected = false;
      if card.custom {
        continue;
      }
      self.hidden_card_ids.insert(card.id.clone());
      kept.push(card);
    }
    self.cards = kept;

    self.custom_order.remove(set_name);
    self.collection_order.retain(|entry| entry != set_name);
    Ok(())
  }

  /// Clones every live card of the source set into a new set with fresh
  /// ids, all uncollected and with investment fields cleared.
  pub fn duplicate_collection(
    &mut self,
    source_name: &str,
    new_name: &str,
  ) -> Result<usize, String> {
    let new_name = required(new_name, "Collection name")?;
    if self.cards.iter().any(|card| card.set_name == new_name) {
      return Err(format!("A collection named {} already exists.", new_name));
    }

    let clones: Vec<Card> = self
      .live_cards()
      .filter(|card| card.set_name == source_name)
      .map(|card| {
        let mut clone = card.clone();
        clone.id = Uuid::new_v4().to_string();
        clone.set_name = new_name.clone();
        clone.collected = false;
        clone.purchase_price = None;
        clone.purchase_date = None;
        clone.current_value = None;
        clone.custom = true;
        clone
      })
      .collect();

    if clones.is_empty() {
      return Err(format!("Collection not found: {}", source_name));
    }
    let count = clones.len();
    self.cards.extend(clones);
    Ok(count)
  }

  /// Stores the manual card order for a set. Ids that are not live members
  /// of the set are dropped, so the order map never accumulates stale
  /// entries.
  pub fn reorder_cards_in_set(
    &mut self,
    set_name: &str,
    ordered_ids: Vec<String>,
  ) -> Result<(), String> {
    let members: HashSet<String> = self
      .live_cards()
      .filter(|card| card.set_name == set_name)
      .map(|card| card.id.clone())
      .collect();
    if members.is_empty() {
      return Err(format!("Collection not found: {}", set_name));
    }

    let mut seen = HashSet::new();
    let filtered: Vec<String> = ordered_ids
      .into_iter()
      .filter(|id| members.contains(id) && seen.insert(id.clone()))
      .collect();

    if filtered.is_empty() {
      self.custom_order.remove(set_name);
    } else {
      self.custom_order.insert(set_name.to_string(), filtered);
    }
    Ok(())
  }

  /// Stores the manual collection order, filtered to sets that currently
  /// have live cards.
  pub fn reorder_collections(&mut self, ordered_set_names: Vec<String>) {
    let live: HashSet<String> = self.live_cards().map(|card| card.set_name.clone()).collect();
    let mut seen = HashSet::new();
    self.collection_order = ordered_set_names
      .into_iter()
      .filter(|name| live.contains(name) && seen.insert(name.clone()))
      .collect();
  }

  /// Un-tombstones the given ids. Ids that were never tombstoned (including
  /// custom-origin cards deleted outright) are ignored.
  pub fn restore_hidden(&mut self, ids: &[String]) {
    for id in ids {
      self.hidden_card_ids.remove(id);
    }
  }

  pub fn set_card_image(&mut self, id: &str, image: Option<String>) -> Result<(), String> {
    let index = self.live_position(id)?;
    self.cards[index].image = image;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn default_card(id: &str, set_name: &str, parallel: &str) -> Card {
    Card {
      id: id.to_string(),
      set_name: set_name.to_string(),
      card_name: None,
      parallel: parallel.to_string(),
      card_number: "124".to_string(),
      serial: None,
      source: None,
      collected: false,
      collection_type: CollectionKind::from_set_name(set_name),
      purchase_price: None,
      purchase_date: None,
      current_value: None,
      notes: None,
      serial_number: None,
      image: None,
      custom: false,
    }
  }

  fn seeded() -> CollectionStore {
    CollectionStore::seed(vec![
      default_card("b-1", "Base", "Base"),
      default_card("b-2", "Base", "Gold"),
      default_card("b-3", "Base", "Platinum"),
    ])
  }

  fn add_input(set_name: &str, parallel: &str, number: &str) -> AddCardInput {
    AddCardInput {
      set_name: set_name.to_string(),
      parallel: parallel.to_string(),
      card_number: number.to_string(),
      ..AddCardInput::default()
    }
  }

  #[test]
  fn toggle_twice_restores_original_state() {
    let mut store = seeded();
    assert!(store.toggle_collected("b-1").unwrap());
    assert!(!store.toggle_collected("b-1").unwrap());
    assert!(!store.live_cards().find(|c| c.id == "b-1").unwrap().collected);
  }

  #[test]
  fn toggle_unknown_card_fails() {
    let mut store = seeded();
    assert!(store.toggle_collected("missing").is_err());
  }

  #[test]
  fn add_card_validates_required_fields() {
    let mut store = seeded();
    assert!(store.add_card(add_input("", "Gold", "1")).is_err());
    assert!(store.add_card(add_input("Base", "  ", "1")).is_err());
    assert!(store.add_card(add_input("Base", "Gold", "")).is_err());
  }

  #[test]
  fn add_card_creates_collection_implicitly() {
    let mut store = seeded();
    let id = store.add_card(add_input("Chrome Inserts", "Refractor", "7")).unwrap();
    let card = store.live_cards().find(|c| c.id == id).unwrap();
    assert_eq!(card.set_name, "Chrome Inserts");
    assert_eq!(card.collection_type, CollectionKind::Chrome);
    assert!(card.custom);
    assert!(!card.collected);
  }

  #[test]
  fn explicit_collection_type_wins_over_derivation() {
    let mut store = seeded();
    let mut input = add_input("Oddities", "Base", "9");
    input.collection_type = Some(CollectionKind::Midnight);
    let id = store.add_card(input).unwrap();
    let card = store.live_cards().find(|c| c.id == id).unwrap();
    assert_eq!(card.collection_type, CollectionKind::Midnight);
  }

  #[test]
  fn bulk_add_is_all_or_nothing() {
    let mut store = seeded();
    let before = store.live_cards().count();
    let result = store.bulk_add_cards(
      "Base",
      vec![add_input("ignored", "Aqua", "2"), add_input("ignored", "", "3")],
    );
    assert!(result.is_err());
    assert_eq!(store.live_cards().count(), before);

    let ids = store
      .bulk_add_cards(
        "Base",
        vec![add_input("ignored", "Aqua", "2"), add_input("ignored", "Teal", "3")],
      )
      .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(store.live_cards().count(), before + 2);
  }

  #[test]
  fn edit_merges_fields_and_keeps_identity() {
    let mut store = seeded();
    store.toggle_collected("b-2").unwrap();

    store
      .edit_card(EditCardInput {
        id: "b-2".to_string(),
        parallel: Some("Gold Rainbow".to_string()),
        serial: Some("/50".to_string()),
        purchase_price: Some(40.0),
        ..EditCardInput::default()
      })
      .unwrap();

    let card = store.live_cards().find(|c| c.id == "b-2").unwrap();
    assert_eq!(card.parallel, "Gold Rainbow");
    assert_eq!(card.serial.as_deref(), Some("/50"));
    assert_eq!(card.purchase_price, Some(40.0));
    assert!(card.collected, "collected state must survive edits");
    assert_eq!(card.card_number, "124", "untouched fields stay");
  }

  #[test]
  fn edit_clears_optional_fields_via_empty_string() {
    let mut store = seeded();
    store
      .edit_card(EditCardInput {
        id: "b-1".to_string(),
        serial: Some("/99".to_string()),
        ..EditCardInput::default()
      })
      .unwrap();
    store
      .edit_card(EditCardInput {
        id: "b-1".to_string(),
        serial: Some("".to_string()),
        ..EditCardInput::default()
      })
      .unwrap();
    assert!(store.live_cards().find(|c| c.id == "b-1").unwrap().serial.is_none());
  }

  #[test]
  fn edit_set_name_rederives_kind() {
    let mut store = seeded();
    store
      .edit_card(EditCardInput {
        id: "b-1".to_string(),
        set_name: Some("Sapphire Stash".to_string()),
        ..EditCardInput::default()
      })
      .unwrap();
    let card = store.live_cards().find(|c| c.id == "b-1").unwrap();
    assert_eq!(card.collection_type, CollectionKind::Sapphire);
  }

  #[test]
  fn duplicate_clears_state_and_sits_after_original() {
    let mut store = seeded();
    store.toggle_collected("b-1").unwrap();
    store
      .edit_card(EditCardInput {
        id: "b-1".to_string(),
        purchase_price: Some(100.0),
        current_value: Some(150.0),
        ..EditCardInput::default()
      })
      .unwrap();

    let new_id = store.duplicate_card("b-1").unwrap();
    let order: Vec<&str> = store.live_cards().map(|c| c.id.as_str()).collect();
    assert_eq!(order[0], "b-1");
    assert_eq!(order[1], new_id.as_str());

    let clone = store.live_cards().find(|c| c.id == new_id).unwrap();
    assert_ne!(clone.id, "b-1");
    assert!(!clone.collected);
    assert!(clone.purchase_price.is_none());
    assert!(clone.current_value.is_none());
    assert!(clone.custom);
    assert_eq!(clone.parallel, "Base");
  }

  #[test]
  fn deleting_default_card_tombstones_and_restore_revives() {
    let mut store = seeded();
    store.toggle_collected("b-2").unwrap();
    store.delete_card("b-2").unwrap();

    assert_eq!(store.live_cards().count(), 2);
    assert!(store.live_cards().all(|c| c.id != "b-2"));
    assert_eq!(store.hidden_cards().count(), 1);

    // retried delete of a tombstoned id is accepted
    store.delete_card("b-2").unwrap();

    store.restore_hidden(&["b-2".to_string()]);
    assert_eq!(store.live_cards().count(), 3);
    let card = store.live_cards().find(|c| c.id == "b-2").unwrap();
    assert!(card.collected, "tombstoned card comes back unchanged");
  }

  #[test]
  fn deleting_custom_card_is_permanent() {
    let mut store = seeded();
    let id = store.add_card(add_input("Base", "Aqua", "2")).unwrap();
    store.delete_card(&id).unwrap();

    assert_eq!(store.live_cards().count(), 3);
    store.restore_hidden(&[id.clone()]);
    assert_eq!(store.live_cards().count(), 3, "restore has nothing to revive");
    assert!(store.delete_card(&id).is_err(), "the id is gone entirely");
  }

  #[test]
  fn delete_prunes_custom_order_entry() {
    let mut store = seeded();
    store
      .reorder_cards_in_set(
        "Base",
        vec!["b-3".to_string(), "b-1".to_string(), "b-2".to_string()],
      )
      .unwrap();
    store.delete_card("b-3").unwrap();

    let order = store.custom_order().get("Base").unwrap();
    assert_eq!(order, &vec!["b-1".to_string(), "b-2".to_string()]);
  }

  #[test]
  fn rename_moves_every_card_and_bookkeeping() {
    let mut store = seeded();
    store.toggle_collected("b-1").unwrap();
    store
      .reorder_cards_in_set("Base", vec!["b-2".to_string(), "b-1".to_string()])
      .unwrap();
    store.reorder_collections(vec!["Base".to_string()]);
    store.delete_card("b-3").unwrap();

    store.rename_collection("Base", "Chrome Vault").unwrap();

    assert!(store.live_cards().all(|c| c.set_name != "Base"));
    assert_eq!(
      store.live_cards().filter(|c| c.set_name == "Chrome Vault").count(),
      2
    );
    let renamed = store.live_cards().find(|c| c.id == "b-1").unwrap();
    assert!(renamed.collected, "collected state survives the rename");
    assert_eq!(renamed.collection_type, CollectionKind::Chrome);

    assert!(store.custom_order().get("Base").is_none());
    assert_eq!(
      store.custom_order().get("Chrome Vault").unwrap(),
      &vec!["b-2".to_string(), "b-1".to_string()]
    );
    assert_eq!(store.collection_order(), vec!["Chrome Vault".to_string()]);

    // the tombstoned card followed the rename, so restore lands in the new set
    store.restore_hidden(&["b-3".to_string()]);
    let restored = store.live_cards().find(|c| c.id == "b-3").unwrap();
    assert_eq!(restored.set_name, "Chrome Vault");
  }

  #[test]
  fn rename_rejects_taken_or_empty_names() {
    let mut store = seeded();
    store.add_card(add_input("Inserts", "Base", "I-1")).unwrap();
    assert!(store.rename_collection("Base", "Inserts").is_err());
    assert!(store.rename_collection("Base", "  ").is_err());
    assert!(store.rename_collection("Missing", "Anything").is_err());
  }

  #[test]
  fn delete_collection_splits_by_origin_and_clears_collected() {
    let mut store = seeded();
    let custom_id = store.add_card(add_input("Base", "Aqua", "2")).unwrap();
    store.toggle_collected("b-1").unwrap();
    store
      .reorder_cards_in_set("Base", vec!["b-1".to_string(), "b-2".to_string()])
      .unwrap();
    store.reorder_collections(vec!["Base".to_string()]);

    store.delete_collection("Base").unwrap();

    assert_eq!(store.live_cards().count(), 0);
    assert_eq!(store.hidden_cards().count(), 3, "defaults are tombstoned");
    assert!(store.custom_order().get("Base").is_none());
    assert!(store.collection_order().is_empty());

    store.restore_hidden(&["b-1".to_string(), custom_id.clone()]);
    assert_eq!(store.live_cards().count(), 1, "the custom card is gone for good");
    let restored = store.live_cards().find(|c| c.id == "b-1").unwrap();
    assert!(!restored.collected, "collected state was cleared on delete");
  }

  #[test]
  fn duplicate_collection_clones_with_fresh_state() {
    let mut store = seeded();
    store.toggle_collected("b-1").unwrap();
    store
      .edit_card(EditCardInput {
        id: "b-1".to_string(),
        purchase_price: Some(75.0),
        current_value: Some(90.0),
        ..EditCardInput::default()
      })
      .unwrap();

    let count = store.duplicate_collection("Base", "Base Trade Stack").unwrap();
    assert_eq!(count, 3);

    let clones: Vec<&Card> = store
      .live_cards()
      .filter(|c| c.set_name == "Base Trade Stack")
      .collect();
    assert_eq!(clones.len(), 3);
    for clone in &clones {
      assert!(!clone.collected);
      assert!(clone.purchase_price.is_none());
      assert!(clone.current_value.is_none());
      assert!(clone.custom);
      assert!(store.live_cards().filter(|c| c.id == clone.id).count() == 1);
      assert!(!["b-1", "b-2", "b-3"].contains(&clone.id.as_str()));
    }
    assert_eq!(store.live_cards().filter(|c| c.set_name == "Base").count(), 3);
  }

  #[test]
  fn duplicate_collection_rejects_taken_name() {
    let mut store = seeded();
    assert!(store.duplicate_collection("Base", "Base").is_err());
    assert!(store.duplicate_collection("Missing", "Copy").is_err());
  }

  #[test]
  fn reorder_filters_foreign_and_duplicate_ids() {
    let mut store = seeded();
    store
      .reorder_cards_in_set(
        "Base",
        vec![
          "b-2".to_string(),
          "stale".to_string(),
          "b-2".to_string(),
          "b-1".to_string(),
        ],
      )
      .unwrap();
    assert_eq!(
      store.custom_order().get("Base").unwrap(),
      &vec!["b-2".to_string(), "b-1".to_string()]
    );

    store.reorder_collections(vec!["Base".to_string(), "Nope".to_string()]);
    assert_eq!(store.collection_order(), vec!["Base".to_string()]);
  }

  #[test]
  fn document_round_trip_preserves_state() {
    let mut store = seeded();
    store.toggle_collected("b-1").unwrap();
    store.delete_card("b-2").unwrap();
    store
      .reorder_cards_in_set("Base", vec!["b-3".to_string(), "b-1".to_string()])
      .unwrap();
    store.reorder_collections(vec!["Base".to_string()]);

    let document = store.to_document("2026-08-07T00:00:00Z".to_string());
    let rebuilt = CollectionStore::from_document(document.clone());

    assert_eq!(
      rebuilt.to_document("2026-08-07T00:00:00Z".to_string()),
      document
    );
    assert_eq!(rebuilt.live_cards().count(), 2);
    assert_eq!(rebuilt.hidden_cards().count(), 1);
  }

  #[test]
  fn duplicate_ids_in_document_keep_first_occurrence() {
    let mut document = CollectionDocument::default();
    document.cards.push(default_card("b-1", "Base", "Base"));
    document.cards.push(default_card("b-1", "Base", "Gold"));

    let store = CollectionStore::from_document(document);
    assert_eq!(store.live_cards().count(), 1);
    assert_eq!(store.live_cards().next().unwrap().parallel, "Base");
  }
}
