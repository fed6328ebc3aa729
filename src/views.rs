use crate::model::{Card, CardDto, CollectionKind};
use crate::store::CollectionStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CollectedFilter {
  #[default]
  All,
  Collected,
  Needed,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CardSort {
  #[default]
  Custom,
  Name,
  Number,
  CollectedFirst,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CollectionSort {
  #[default]
  Manual,
  NameAsc,
  NameDesc,
  TotalCount,
  CollectedCount,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
  #[serde(default)]
  pub search: Option<String>,
  #[serde(default)]
  pub collection_type: Option<CollectionKind>,
  #[serde(default)]
  pub collected: CollectedFilter,
  #[serde(default)]
  pub card_sort: CardSort,
  #[serde(default)]
  pub collection_sort: CollectionSort,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
  pub collected: usize,
  pub total: usize,
  pub percent: u32,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CollectionGroupDto {
  pub set_name: String,
  pub collection_type: CollectionKind,
  pub collected: usize,
  pub total: usize,
  pub percent: u32,
  pub cards: Vec<CardDto>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CollectionViewDto {
  pub groups: Vec<CollectionGroupDto>,
  pub overall: ProgressDto,
  pub by_type: BTreeMap<CollectionKind, ProgressDto>,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDto {
  pub total_invested: f64,
  pub total_current_value: f64,
  pub total_gain: f64,
  pub total_gain_percent: f64,
  pub top_performers: Vec<CardDto>,
  pub worst_performer: Option<CardDto>,
}

pub fn percent(collected: usize, total: usize) -> u32 {
  if total == 0 {
    return 0;
  }
  (collected as f64 / total as f64 * 100.0).round() as u32
}

fn round_cents(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

fn matches_search(card: &Card, query: &str) -> bool {
  let fields = [
    card.card_name.as_deref(),
    Some(card.parallel.as_str()),
    Some(card.card_number.as_str()),
    card.serial.as_deref(),
    Some(card.set_name.as_str()),
    card.source.as_deref(),
  ];
  fields
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(query))
}

fn matches_collected(card: &Card, filter: CollectedFilter) -> bool {
  match filter {
    CollectedFilter::All => true,
    CollectedFilter::Collected => card.collected,
    CollectedFilter::Needed => !card.collected,
  }
}

enum Segment {
  Number(u64),
  Text(String),
}

fn number_segments(value: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut current = String::new();
  let mut digits = false;

  for ch in value.trim().to_lowercase().chars() {
    let ch_is_digit = ch.is_ascii_digit();
    if !current.is_empty() && ch_is_digit != digits {
      push_segment(&mut segments, &current, digits);
      current.clear();
    }
    digits = ch_is_digit;
    current.push(ch);
  }
  if !current.is_empty() {
    push_segment(&mut segments, &current, digits);
  }
  segments
}

fn push_segment(segments: &mut Vec<Segment>, text: &str, digits: bool) {
  if digits {
    if let Ok(number) = text.parse::<u64>() {
      segments.push(Segment::Number(number));
      return;
    }
  }
  segments.push(Segment::Text(text.to_string()));
}

/// Numeric-aware comparison for free-text card numbers, so "CG-2" sorts
/// before "CG-11" and "9" before "124".
pub fn compare_card_numbers(a: &str, b: &str) -> Ordering {
  let a_segments = number_segments(a);
  let b_segments = number_segments(b);

  for (left, right) in a_segments.iter().zip(b_segments.iter()) {
    let ordering = match (left, right) {
      (Segment::Number(l), Segment::Number(r)) => l.cmp(r),
      (Segment::Text(l), Segment::Text(r)) => l.cmp(r),
      (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
      (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
    };
    if ordering != Ordering::Equal {
      return ordering;
    }
  }
  a_segments.len().cmp(&b_segments.len())
}

fn sort_cards(cards: &mut [&Card], sort: CardSort, manual_order: Option<&Vec<String>>) {
  match sort {
    CardSort::Custom => {
      let Some(order) = manual_order else {
        return;
      };
      let index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(position, id)| (id.as_str(), position))
        .collect();
      // ids absent from the manual order sort after every ordered one,
      // keeping their original relative order
      cards.sort_by_key(|card| index.get(card.id.as_str()).copied().unwrap_or(usize::MAX));
    }
    CardSort::Name => {
      cards.sort_by(|a, b| {
        a.display_label()
          .to_lowercase()
          .cmp(&b.display_label().to_lowercase())
      });
    }
    CardSort::Number => {
      cards.sort_by(|a, b| compare_card_numbers(&a.card_number, &b.card_number));
    }
    CardSort::CollectedFirst => {
      cards.sort_by_key(|card| !card.collected);
    }
  }
}

fn sort_groups(groups: &mut [CollectionGroupDto], sort: CollectionSort, manual_order: &[String]) {
  match sort {
    CollectionSort::Manual => {
      let index: HashMap<&str, usize> = manual_order
        .iter()
        .enumerate()
        .map(|(position, name)| (name.as_str(), position))
        .collect();
      groups.sort_by(|a, b| {
        let left = index.get(a.set_name.as_str()).copied().unwrap_or(usize::MAX);
        let right = index.get(b.set_name.as_str()).copied().unwrap_or(usize::MAX);
        left
          .cmp(&right)
          .then_with(|| a.set_name.to_lowercase().cmp(&b.set_name.to_lowercase()))
      });
    }
    CollectionSort::NameAsc => {
      groups.sort_by(|a, b| a.set_name.to_lowercase().cmp(&b.set_name.to_lowercase()));
    }
    CollectionSort::NameDesc => {
      groups.sort_by(|a, b| b.set_name.to_lowercase().cmp(&a.set_name.to_lowercase()));
    }
    CollectionSort::TotalCount => {
      groups.sort_by(|a, b| {
        b.total
          .cmp(&a.total)
          .then_with(|| a.set_name.to_lowercase().cmp(&b.set_name.to_lowercase()))
      });
    }
    CollectionSort::CollectedCount => {
      groups.sort_by(|a, b| {
        b.collected
          .cmp(&a.collected)
          .then_with(|| a.set_name.to_lowercase().cmp(&b.set_name.to_lowercase()))
      });
    }
  }
}

fn progress<'a>(cards: impl Iterator<Item = &'a Card>) -> ProgressDto {
  let mut collected = 0;
  let mut total = 0;
  for card in cards {
    total += 1;
    if card.collected {
      collected += 1;
    }
  }
  ProgressDto {
    collected,
    total,
    percent: percent(collected, total),
  }
}

/// Derives the grouped, filtered and sorted view plus the progress stats.
/// Stats are computed over the whole live list; the search and collected
/// filters only shape the groups.
pub fn collection_view(store: &CollectionStore, query: &ViewQuery) -> CollectionViewDto {
  let search = query
    .search
    .as_deref()
    .map(|text| text.trim().to_lowercase())
    .filter(|text| !text.is_empty());

  let mut group_index: HashMap<String, usize> = HashMap::new();
  let mut grouped: Vec<(String, CollectionKind, Vec<&Card>)> = Vec::new();

  for card in store.live_cards() {
    if let Some(kind) = query.collection_type {
      if card.collection_type != kind {
        continue;
      }
    }
    if !matches_collected(card, query.collected) {
      continue;
    }
    if let Some(search) = &search {
      if !matches_search(card, search) {
        continue;
      }
    }

    match group_index.get(&card.set_name) {
      Some(&slot) => grouped[slot].2.push(card),
      None => {
        group_index.insert(card.set_name.clone(), grouped.len());
        grouped.push((card.set_name.clone(), card.collection_type, vec![card]));
      }
    }
  }

  let mut groups = Vec::with_capacity(grouped.len());
  for (set_name, collection_type, mut cards) in grouped {
    sort_cards(&mut cards, query.card_sort, store.custom_order().get(&set_name));
    let collected = cards.iter().filter(|card| card.collected).count();
    let total = cards.len();
    groups.push(CollectionGroupDto {
      percent: percent(collected, total),
      set_name,
      collection_type,
      collected,
      total,
      cards: cards.into_iter().map(CardDto::from).collect(),
    });
  }
  sort_groups(&mut groups, query.collection_sort, store.collection_order());

  let overall = progress(store.live_cards());
  let mut by_type: BTreeMap<CollectionKind, ProgressDto> = BTreeMap::new();
  for kind in [
    CollectionKind::Flagship,
    CollectionKind::Chrome,
    CollectionKind::Holiday,
    CollectionKind::Sapphire,
    CollectionKind::Midnight,
    CollectionKind::BlackFriday,
  ] {
    let stats = progress(store.live_cards().filter(|card| card.collection_type == kind));
    if stats.total > 0 {
      by_type.insert(kind, stats);
    }
  }

  CollectionViewDto {
    groups,
    overall,
    by_type,
  }
}

/// Investment roll-up over collected cards. Sums only consider the fields
/// that are present; the percent is zero-guarded and rounded to cents.
pub fn portfolio(store: &CollectionStore) -> PortfolioDto {
  let collected: Vec<&Card> = store.live_cards().filter(|card| card.collected).collect();

  let total_invested: f64 = collected.iter().filter_map(|card| card.purchase_price).sum();
  let total_current_value: f64 = collected.iter().filter_map(|card| card.current_value).sum();
  let total_gain = total_current_value - total_invested;
  let total_gain_percent = if total_invested > 0.0 {
    round_cents(total_gain / total_invested * 100.0)
  } else {
    0.0
  };

  let mut performers: Vec<&Card> = collected
    .iter()
    .copied()
    .filter(|card| card.gain_percent().is_some())
    .collect();
  performers.sort_by(|a, b| {
    b.gain_percent()
      .partial_cmp(&a.gain_percent())
      .unwrap_or(Ordering::Equal)
  });

  let top_performers = performers.iter().take(2).map(|card| CardDto::from(*card)).collect();
  let worst_performer = if performers.len() > 2 {
    performers.last().map(|card| CardDto::from(*card))
  } else {
    None
  };

  PortfolioDto {
    total_invested,
    total_current_value,
    total_gain,
    total_gain_percent,
    top_performers,
    worst_performer,
  }
}
