//! Upstream payload shapes and their flatteners.
//!
//! These structs mirror the nested JSON the upstream API returns for each
//! entity kind; we only deserialize the fields the mirror stores. The
//! flatteners at the bottom turn the nested optional shapes (score pairs,
//! standing totals) into flat column values. They are pure: a missing
//! nested path becomes `None`, never a sentinel value, and nothing here
//! can fail.

use chrono::{DateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Countries
// ---------------------------------------------------------------------------

/// A country record — both the `countries` endpoint shape and the nested
/// `country` object inside a league payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

impl CountryPayload {
    /// Flag URL to store: the payload's own when present, otherwise derived
    /// from the country code the way the upstream media CDN lays them out.
    pub fn flag_url(&self) -> Option<String> {
        self.flag.clone().or_else(|| {
            self.code
                .as_ref()
                .map(|code| format!("https://media.api-sports.io/flags/{code}.svg"))
        })
    }
}

// ---------------------------------------------------------------------------
// Leagues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LeaguePayload {
    pub league: LeagueCore,
    #[serde(default)]
    pub country: Option<CountryPayload>,
    #[serde(default)]
    pub seasons: Vec<SeasonEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueCore {
    pub id: i64,
    pub name: String,
    /// "League" or "Cup".
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonEntry {
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub current: bool,
}

/// The season upstream marks current, if any. Only this entry feeds the
/// league's season window columns.
pub fn current_season(seasons: &[SeasonEntry]) -> Option<&SeasonEntry> {
    seasons.iter().find(|s| s.current)
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TeamPayload {
    pub team: TeamCore,
    #[serde(default)]
    pub venue: Option<VenueInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamCore {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub founded: Option<i64>,
    #[serde(default)]
    pub logo: Option<String>,
}

/// Venue scalars stored inline on the team row, not as a separate entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub city: Option<String>,
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FixturePayload {
    pub fixture: FixtureCore,
    pub league: FixtureLeague,
    pub teams: FixtureTeams,
    #[serde(default)]
    pub goals: GoalPair,
    #[serde(default)]
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureCore {
    pub id: i64,
    #[serde(default)]
    pub referee: Option<String>,
    /// Kickoff timestamp as an RFC 3339 string.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub venue: Option<VenueInfo>,
    #[serde(default)]
    pub status: Option<FixtureStatus>,
}

impl FixtureCore {
    /// Parsed kickoff timestamp. `None` when absent or unparseable; the
    /// caller decides whether that is worth a log line.
    pub fn kickoff(&self) -> Option<DateTime<Utc>> {
        self.date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// Short status code ("NS", "1H", "FT", ...).
    pub fn status_code(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.short.as_deref())
    }

    pub fn venue_name(&self) -> Option<&str> {
        self.venue.as_ref().and_then(|v| v.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureStatus {
    #[serde(default)]
    pub short: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureLeague {
    pub id: i64,
    #[serde(default)]
    pub season: Option<i64>,
    #[serde(default)]
    pub round: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTeams {
    pub home: TeamRef,
    pub away: TeamRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRef {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A (home, away) score pair. Both sides independently nullable: `None`
/// means unknown, which is distinct from 0.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct GoalPair {
    #[serde(default)]
    pub home: Option<i64>,
    #[serde(default)]
    pub away: Option<i64>,
}

/// Per-period score snapshots. Each period may be absent entirely or
/// present with null sides; both flatten to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub halftime: Option<GoalPair>,
    #[serde(default)]
    pub fulltime: Option<GoalPair>,
    #[serde(default)]
    pub extratime: Option<GoalPair>,
    #[serde(default)]
    pub penalty: Option<GoalPair>,
}

/// The ten flat score columns of a fixture row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatScores {
    pub home: Option<i64>,
    pub away: Option<i64>,
    pub halftime_home: Option<i64>,
    pub halftime_away: Option<i64>,
    pub fulltime_home: Option<i64>,
    pub fulltime_away: Option<i64>,
    pub extratime_home: Option<i64>,
    pub extratime_away: Option<i64>,
    pub penalty_home: Option<i64>,
    pub penalty_away: Option<i64>,
}

pub fn flatten_scores(goals: &GoalPair, score: &ScoreBreakdown) -> FlatScores {
    let side = |pair: &Option<GoalPair>, home: bool| {
        pair.as_ref()
            .and_then(|p| if home { p.home } else { p.away })
    };
    FlatScores {
        home: goals.home,
        away: goals.away,
        halftime_home: side(&score.halftime, true),
        halftime_away: side(&score.halftime, false),
        fulltime_home: side(&score.fulltime, true),
        fulltime_away: side(&score.fulltime, false),
        extratime_home: side(&score.extratime, true),
        extratime_away: side(&score.extratime, false),
        penalty_home: side(&score.penalty, true),
        penalty_away: side(&score.penalty, false),
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// A standings payload: one element of the upstream response, carrying the
/// league's standings as groups of rows (most leagues have one group;
/// group-stage competitions have several).
#[derive(Debug, Clone, Deserialize)]
pub struct StandingsPayload {
    pub league: StandingsLeague,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingsLeague {
    pub id: i64,
    #[serde(default)]
    pub season: Option<i64>,
    #[serde(default)]
    pub standings: Vec<Vec<StandingEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingEntry {
    #[serde(default)]
    pub rank: Option<i64>,
    pub team: TeamRef,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default, rename = "goalsDiff")]
    pub goals_diff: Option<i64>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub all: Option<StandingTotals>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandingTotals {
    #[serde(default)]
    pub played: Option<i64>,
    #[serde(default)]
    pub win: Option<i64>,
    #[serde(default)]
    pub draw: Option<i64>,
    #[serde(default)]
    pub lose: Option<i64>,
    #[serde(default)]
    pub goals: Option<GoalTotals>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GoalTotals {
    #[serde(default, rename = "for")]
    pub goals_for: Option<i64>,
    #[serde(default, rename = "against")]
    pub goals_against: Option<i64>,
}

/// The six flat aggregate columns of a standing row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatTotals {
    pub played: Option<i64>,
    pub win: Option<i64>,
    pub draw: Option<i64>,
    pub lose: Option<i64>,
    pub goals_for: Option<i64>,
    pub goals_against: Option<i64>,
}

pub fn flatten_totals(entry: &StandingEntry) -> FlatTotals {
    let all = entry.all.as_ref();
    let goals = all.and_then(|a| a.goals.as_ref());
    FlatTotals {
        played: all.and_then(|a| a.played),
        win: all.and_then(|a| a.win),
        draw: all.and_then(|a| a.draw),
        lose: all.and_then(|a| a.lose),
        goals_for: goals.and_then(|g| g.goals_for),
        goals_against: goals.and_then(|g| g.goals_against),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_null_extratime_stays_null() {
        let payload: FixturePayload = serde_json::from_value(json!({
            "fixture": { "id": 1, "date": "2026-08-22T14:00:00+00:00" },
            "league": { "id": 39, "season": 2026, "round": "Regular Season - 1" },
            "teams": { "home": { "id": 10 }, "away": { "id": 20 } },
            "goals": { "home": 2, "away": 0 },
            "score": {
                "halftime": { "home": 1, "away": 0 },
                "fulltime": { "home": 2, "away": 0 },
                "extratime": null,
                "penalty": { "home": null, "away": null }
            }
        }))
        .unwrap();

        let flat = flatten_scores(&payload.goals, &payload.score);
        assert_eq!(flat.home, Some(2));
        assert_eq!(flat.away, Some(0));
        assert_eq!(flat.halftime_home, Some(1));
        assert_eq!(flat.extratime_home, None);
        assert_eq!(flat.extratime_away, None);
        assert_eq!(flat.penalty_home, None);
        assert_eq!(flat.penalty_away, None);
    }

    #[test]
    fn test_flatten_zero_is_not_null() {
        let flat = flatten_scores(
            &GoalPair { home: Some(0), away: Some(0) },
            &ScoreBreakdown::default(),
        );
        assert_eq!(flat.home, Some(0));
        assert_eq!(flat.halftime_home, None);
    }

    #[test]
    fn test_current_season_picks_marked_entry() {
        let seasons: Vec<SeasonEntry> = serde_json::from_value(json!([
            { "year": 2022, "start": "2022-08-05", "end": "2023-05-28", "current": false },
            { "year": 2023, "start": "2023-08-11", "end": "2024-05-19", "current": true }
        ]))
        .unwrap();

        let current = current_season(&seasons).unwrap();
        assert_eq!(current.year, Some(2023));
        assert_eq!(current.start.as_deref(), Some("2023-08-11"));
    }

    #[test]
    fn test_current_season_none_marked() {
        let seasons = vec![SeasonEntry { year: Some(2021), ..Default::default() }];
        assert!(current_season(&seasons).is_none());
    }

    #[test]
    fn test_kickoff_parses_rfc3339() {
        let core: FixtureCore = serde_json::from_value(json!({
            "id": 9,
            "date": "2026-01-15T19:45:00+00:00",
            "status": { "short": "NS" }
        }))
        .unwrap();
        let kickoff = core.kickoff().unwrap();
        assert_eq!(kickoff.to_rfc3339(), "2026-01-15T19:45:00+00:00");
        assert_eq!(core.status_code(), Some("NS"));
    }

    #[test]
    fn test_kickoff_invalid_date_is_none() {
        let core = FixtureCore {
            id: 9,
            referee: None,
            date: Some("not-a-date".into()),
            venue: None,
            status: None,
        };
        assert!(core.kickoff().is_none());
    }

    #[test]
    fn test_flag_url_derived_from_code() {
        let country = CountryPayload {
            name: Some("England".into()),
            code: Some("GB".into()),
            flag: None,
        };
        assert_eq!(
            country.flag_url().as_deref(),
            Some("https://media.api-sports.io/flags/GB.svg")
        );

        let with_flag = CountryPayload {
            flag: Some("https://example.com/gb.svg".into()),
            ..country
        };
        assert_eq!(with_flag.flag_url().as_deref(), Some("https://example.com/gb.svg"));
    }

    #[test]
    fn test_flatten_totals_missing_all() {
        let entry: StandingEntry = serde_json::from_value(json!({
            "rank": 4,
            "team": { "id": 50, "name": "Chelsea" },
            "points": 61,
            "goalsDiff": 18,
            "form": "WWDLW"
        }))
        .unwrap();
        let flat = flatten_totals(&entry);
        assert_eq!(flat, FlatTotals::default());
        assert_eq!(entry.goals_diff, Some(18));
    }

    #[test]
    fn test_flatten_totals_full() {
        let entry: StandingEntry = serde_json::from_value(json!({
            "rank": 1,
            "team": { "id": 42 },
            "points": 84,
            "goalsDiff": 45,
            "all": {
                "played": 38, "win": 26, "draw": 6, "lose": 6,
                "goals": { "for": 78, "against": 33 }
            }
        }))
        .unwrap();
        let flat = flatten_totals(&entry);
        assert_eq!(flat.played, Some(38));
        assert_eq!(flat.goals_for, Some(78));
        assert_eq!(flat.goals_against, Some(33));
    }
}
