//! The tile grid as the user sees it: active tiles from the config document, minus
//! operator-curated exclusions, grouped by metric category.

use tally_common::api::{ConfigDocument, DrinkTemplate, Metric, Person, Tile};

const EXCLUDED_TILE_IDS: &[&str] = &[
    "T_IDEA_STAR",
    "T_SLEEP",
    "T_WORKOUT_SKIP",
    "T_EXERCISE_RESULT",
    "T_VOICE",
    "T_STAKE_CHAT",
    "T_MEMO",
    "T_VP_PITCH",
    "T_INIT_IDEA",
    "T_ACTIVITY_CANCEL",
    "T_INVEST_COVER",
];

const EXCLUDED_METRIC_CODES: &[&str] = &[
    "IDEA_STAR",
    "SLEEP_HOURS",
    "WORKOUT_SKIPPED",
    "EXERCISE_RESULT_KG",
    "VOICE_SAMPLE",
    "STAKEHOLDER_CHAT",
    "MEMO_WRITTEN",
    "INITIATIVE_PRESENTED_VP",
    "INITIATIVE_IDEA",
    "ACTIVITY_CANCELLED",
    "INVESTMENT_COVERAGE",
];

const EXCLUDED_CATEGORY: &str = "dating";
const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone)]
pub struct TileGroup {
    pub label: String,
    pub tiles: Vec<(Tile, Metric)>,
}

/// Active tiles ordered by `Order`. Ties keep config order.
pub fn active_tiles(config: &ConfigDocument) -> Vec<&Tile> {
    let mut tiles: Vec<&Tile> = config.tile_catalog.iter().filter(|t| t.active).collect();
    tiles.sort_by(|a, b| {
        a.order
            .unwrap_or(0.0)
            .total_cmp(&b.order.unwrap_or(0.0))
    });
    tiles
}

pub fn is_excluded(tile: &Tile) -> bool {
    let tile_id = tile.tile_id.to_uppercase();
    let metric_code = tile.metric_code.to_uppercase();
    EXCLUDED_TILE_IDS.contains(&tile_id.as_str())
        || EXCLUDED_METRIC_CODES.contains(&metric_code.as_str())
}

pub fn metric<'a>(config: &'a ConfigDocument, metric_code: &str) -> Option<&'a Metric> {
    config
        .metric_catalog
        .iter()
        .find(|m| m.metric_code == metric_code)
}

/// Looks a tile up by id, case-insensitively, among the tiles the grid shows.
pub fn find_tile<'a>(config: &'a ConfigDocument, tile_id: &str) -> Option<&'a Tile> {
    tile_groups_refs(config)
        .into_iter()
        .flat_map(|(_, tiles)| tiles)
        .find(|t| t.tile_id.eq_ignore_ascii_case(tile_id))
}

pub fn tile_groups(config: &ConfigDocument) -> Vec<TileGroup> {
    tile_groups_refs(config)
        .into_iter()
        .map(|(label, tiles)| TileGroup {
            label,
            tiles: tiles
                .into_iter()
                .map(|tile| {
                    let metric = metric(config, &tile.metric_code).cloned().unwrap_or_default();
                    (tile.clone(), metric)
                })
                .collect(),
        })
        .collect()
}

fn tile_groups_refs(config: &ConfigDocument) -> Vec<(String, Vec<&Tile>)> {
    let mut groups: Vec<(String, Vec<&Tile>)> = vec![];

    for tile in active_tiles(config) {
        if is_excluded(tile) {
            continue;
        }

        let category = metric(config, &tile.metric_code)
            .map(|m| m.category.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);
        if category.eq_ignore_ascii_case(EXCLUDED_CATEGORY) {
            continue;
        }

        match groups
            .iter_mut()
            .find(|(label, _)| label.eq_ignore_ascii_case(category))
        {
            Some((_, tiles)) => tiles.push(tile),
            None => groups.push((category.to_string(), vec![tile])),
        }
    }

    groups
}

pub fn people(config: &ConfigDocument) -> impl Iterator<Item = &Person> {
    config.people.iter().filter(|p| !p.person_id.is_empty())
}

pub fn drink_templates(config: &ConfigDocument) -> Vec<DrinkTemplate> {
    config
        .drink_templates
        .iter()
        .filter(|t| !t.drink_template_id.is_empty())
        .cloned()
        .collect()
}
