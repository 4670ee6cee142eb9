use std::cmp::Ordering;
use std::collections::HashSet;

use crate::game_log::GameRecord;

#[derive(Debug, Clone, Default)]
pub struct GameRecordStore {
    records: Vec<GameRecord>,
    duplicates: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerTimeline<'a> {
    pub player_id: u64,
    pub games: &'a [GameRecord],
}

impl GameRecordStore {
    pub fn new(records: Vec<GameRecord>) -> Self {
        let before = records.len();
        let mut records = last_per_game(records);
        let duplicates = before - records.len();
        records.sort_by(player_date_order);
        attach_rest_days(&mut records);
        Self {
            records,
            duplicates,
        }
    }

    pub fn from_sorted(records: Vec<GameRecord>) -> Self {
        debug_assert!(
            records
                .windows(2)
                .all(|w| player_date_order(&w[0], &w[1]) != Ordering::Greater)
        );
        Self {
            records,
            duplicates: 0,
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GameRecord> {
        self.records
    }

    pub fn timelines(&self) -> Timelines<'_> {
        Timelines {
            rest: &self.records,
            offset: 0,
        }
    }

    pub fn timeline(&self, player_id: u64) -> Option<PlayerTimeline<'_>> {
        self.timelines().find(|(_, t)| t.player_id == player_id).map(|(_, t)| t)
    }
}

pub struct Timelines<'a> {
    rest: &'a [GameRecord],
    offset: usize,
}

impl<'a> Iterator for Timelines<'a> {
    type Item = (usize, PlayerTimeline<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.first()?;
        let player_id = first.player_id;
        let len = self
            .rest
            .iter()
            .position(|g| g.player_id != player_id)
            .unwrap_or(self.rest.len());
        let (games, rest) = self.rest.split_at(len);
        let start = self.offset;
        self.rest = rest;
        self.offset += len;
        Some((start, PlayerTimeline { player_id, games }))
    }
}

pub fn player_date_order(a: &GameRecord, b: &GameRecord) -> Ordering {
    a.player_id
        .cmp(&b.player_id)
        .then(a.game_date.cmp(&b.game_date))
        .then(a.game_id.cmp(&b.game_id))
}

/// Same rule as the sqlite upsert: the last row written for a game wins.
fn last_per_game(records: Vec<GameRecord>) -> Vec<GameRecord> {
    let mut seen = HashSet::new();
    let mut kept: Vec<GameRecord> = records
        .into_iter()
        .rev()
        .filter(|g| seen.insert((g.player_id, g.game_id.clone())))
        .collect();
    kept.reverse();
    kept
}

fn attach_rest_days(records: &mut [GameRecord]) {
    let mut prev: Option<(u64, chrono::NaiveDate)> = None;
    for record in records.iter_mut() {
        record.rest_days = match prev {
            Some((player_id, date)) if player_id == record.player_id => {
                Some((record.game_date - date).num_days() - 1)
            }
            _ => None,
        };
        prev = Some((record.player_id, record.game_date));
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn game(player_id: u64, date: &str) -> GameRecord {
        GameRecord {
            player_id,
            player_name: format!("P{player_id}"),
            game_id: format!("{player_id}-{date}"),
            season: None,
            game_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            matchup: "AAA vs. BBB".to_string(),
            team: "AAA".to_string(),
            opponent: "BBB".to_string(),
            is_home: true,
            minutes: 30.0,
            points: 10.0,
            rebounds: 5.0,
            assists: 3.0,
            fgm: None,
            fga: None,
            fg_pct: None,
            fg3m: None,
            fg3a: None,
            fg3_pct: None,
            ftm: None,
            fta: None,
            plus_minus: None,
            win: None,
            rest_days: None,
        }
    }

    #[test]
    fn timelines_are_grouped_and_rest_days_attached() {
        let store = GameRecordStore::new(vec![
            game(2, "2024-01-05"),
            game(1, "2024-01-03"),
            game(1, "2024-01-01"),
            game(2, "2024-01-01"),
            game(1, "2024-01-02"),
        ]);

        let timelines: Vec<_> = store.timelines().collect();
        assert_eq!(timelines.len(), 2);
        assert_eq!(timelines[0].0, 0);
        assert_eq!(timelines[0].1.games.len(), 3);
        assert_eq!(timelines[1].0, 3);

        let rest: Vec<_> = store.records().iter().map(|g| g.rest_days).collect();
        assert_eq!(rest, vec![None, Some(0), Some(0), None, Some(3)]);
    }

    #[test]
    fn later_copy_of_a_game_wins() {
        let mut first = game(1, "2024-01-01");
        first.points = 40.0;
        let store = GameRecordStore::new(vec![
            first,
            game(1, "2024-01-03"),
            game(1, "2024-01-01"),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.duplicates(), 1);
        assert_eq!(store.records()[0].points, 10.0);
        assert_eq!(store.records()[1].rest_days, Some(1));
    }
}
