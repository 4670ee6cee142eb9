use crate::game_log::GameRecord;

pub const MIN_MINUTES_EXCLUSIVE: f64 = 5.0;
pub const MAX_POINTS_EXCLUSIVE: f64 = 70.0;
pub const MAX_REBOUNDS_EXCLUSIVE: f64 = 30.0;
pub const MAX_ASSISTS_EXCLUSIVE: f64 = 25.0;
pub const MAX_REST_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalCounts {
    pub malformed: usize,
    pub low_minutes: usize,
    pub implausible: usize,
}

impl RemovalCounts {
    pub fn total(&self) -> usize {
        self.malformed + self.low_minutes + self.implausible
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<GameRecord>,
    pub removed: RemovalCounts,
}

enum Verdict {
    Keep(GameRecord),
    Malformed,
    LowMinutes,
    Implausible,
}

pub fn filter_records(records: Vec<GameRecord>) -> FilterOutcome {
    let mut out = FilterOutcome {
        kept: Vec::with_capacity(records.len()),
        removed: RemovalCounts::default(),
    };
    for record in records {
        match check(record) {
            Verdict::Keep(record) => out.kept.push(record),
            Verdict::Malformed => out.removed.malformed += 1,
            Verdict::LowMinutes => out.removed.low_minutes += 1,
            Verdict::Implausible => out.removed.implausible += 1,
        }
    }
    out
}

pub fn clip_rest_days(rest_days: i64) -> i64 {
    rest_days.clamp(0, MAX_REST_DAYS)
}

fn check(mut record: GameRecord) -> Verdict {
    let required = [
        record.minutes,
        record.points,
        record.rebounds,
        record.assists,
    ];
    if required.iter().any(|v| !v.is_finite()) {
        return Verdict::Malformed;
    }
    if record.minutes <= MIN_MINUTES_EXCLUSIVE {
        return Verdict::LowMinutes;
    }
    if record.points >= MAX_POINTS_EXCLUSIVE
        || record.rebounds >= MAX_REBOUNDS_EXCLUSIVE
        || record.assists >= MAX_ASSISTS_EXCLUSIVE
    {
        return Verdict::Implausible;
    }

    for value in [
        &mut record.fgm,
        &mut record.fga,
        &mut record.fg_pct,
        &mut record.fg3m,
        &mut record.fg3a,
        &mut record.fg3_pct,
        &mut record.ftm,
        &mut record.fta,
        &mut record.plus_minus,
    ] {
        *value = value.filter(|v| v.is_finite());
    }
    record.rest_days = record.rest_days.map(clip_rest_days);
    Verdict::Keep(record)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(minutes: f64, points: f64, rebounds: f64, assists: f64) -> GameRecord {
        GameRecord {
            player_id: 1,
            player_name: "A".to_string(),
            game_id: format!("{minutes}-{points}"),
            season: None,
            game_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            matchup: "AAA @ BBB".to_string(),
            team: "AAA".to_string(),
            opponent: "BBB".to_string(),
            is_home: false,
            minutes,
            points,
            rebounds,
            assists,
            fgm: None,
            fga: Some(f64::INFINITY),
            fg_pct: Some(0.5),
            fg3m: None,
            fg3a: None,
            fg3_pct: Some(f64::NEG_INFINITY),
            ftm: None,
            fta: None,
            plus_minus: None,
            win: None,
            rest_days: Some(10),
        }
    }

    #[test]
    fn drops_by_rule_and_keeps_order() {
        let out = filter_records(vec![
            record(30.0, 20.0, 5.0, 5.0),
            record(5.0, 20.0, 5.0, 5.0),
            record(30.0, 70.0, 5.0, 5.0),
            record(30.0, 20.0, 30.0, 5.0),
            record(30.0, 20.0, 5.0, 25.0),
            record(f64::NAN, 20.0, 5.0, 5.0),
            record(5.1, 69.0, 29.0, 24.0),
        ]);
        assert_eq!(out.kept.len(), 2);
        assert_eq!(out.kept[0].points, 20.0);
        assert_eq!(out.kept[1].points, 69.0);
        assert_eq!(
            out.removed,
            RemovalCounts {
                malformed: 1,
                low_minutes: 1,
                implausible: 3,
            }
        );
        assert_eq!(out.removed.total(), 5);
    }

    #[test]
    fn clips_rest_and_blanks_infinities() {
        let out = filter_records(vec![record(30.0, 20.0, 5.0, 5.0)]);
        let kept = &out.kept[0];
        assert_eq!(kept.rest_days, Some(7));
        assert_eq!(kept.fga, None);
        assert_eq!(kept.fg3_pct, None);
        assert_eq!(kept.fg_pct, Some(0.5));
        assert_eq!(clip_rest_days(-3), 0);
    }
}
