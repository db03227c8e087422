// Player statistics and ranking computation.
//
// All aggregation runs in application code over raw match rows.
// Callers must pass matches in recorded (chronological) order;
// streaks are meaningless otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::db::Match;

/// Aggregated statistics for one player within a league.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_name: String,
    pub matches_played: i64,
    pub matches_won: i64,
    pub matches_lost: i64,
    pub total_score: i64,
    pub win_rate: f64,
    pub average_score: f64,
    pub highest_score: i64,
    pub win_streak: i64,
    pub current_streak: i64,
}

impl PlayerStats {
    /// A zeroed stats row for a player with no recorded matches.
    pub fn new(player_name: &str) -> Self {
        Self {
            player_name: player_name.to_string(),
            ..Default::default()
        }
    }
}

/// League-wide summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSummary {
    pub total_matches: i64,
    pub total_players: i64,
    pub average_score: f64,
    pub highest_score: i64,
}

/// Decide the winner of a match. Higher score wins; on equal scores
/// player2 is recorded as the winner (long-standing API behavior).
pub fn decide_winner<'a>(
    player1: &'a str,
    player2: &'a str,
    player1_score: i64,
    player2_score: i64,
) -> &'a str {
    if player1_score > player2_score {
        player1
    } else {
        player2
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-player accumulator: running tallies plus the win/loss sequence.
#[derive(Default)]
struct Tally {
    stats: PlayerStats,
    outcomes: Vec<bool>,
}

fn record_appearance(tallies: &mut HashMap<String, Tally>, name: &str, score: i64, won: bool) {
    let tally = tallies.entry(name.to_string()).or_insert_with(|| Tally {
        stats: PlayerStats::new(name),
        outcomes: Vec::new(),
    });
    tally.stats.matches_played += 1;
    tally.stats.total_score += score;
    tally.stats.highest_score = tally.stats.highest_score.max(score);
    if won {
        tally.stats.matches_won += 1;
    } else {
        tally.stats.matches_lost += 1;
    }
    tally.outcomes.push(won);
}

/// Trailing run of identical outcomes; positive when it is a winning run.
fn current_streak(outcomes: &[bool]) -> i64 {
    let Some(&last) = outcomes.last() else {
        return 0;
    };
    let run = outcomes.iter().rev().take_while(|&&o| o == last).count() as i64;
    if last {
        run
    } else {
        -run
    }
}

/// Longest run of consecutive wins anywhere in the sequence.
fn longest_win_streak(outcomes: &[bool]) -> i64 {
    let mut best = 0i64;
    let mut run = 0i64;
    for &won in outcomes {
        if won {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// Deterministic ranking order: win rate, then wins, then average score,
/// then highest score (all descending), with name as the final ascending
/// tie-break.
fn ranking_order(a: &PlayerStats, b: &PlayerStats) -> Ordering {
    b.win_rate
        .total_cmp(&a.win_rate)
        .then_with(|| b.matches_won.cmp(&a.matches_won))
        .then_with(|| b.average_score.total_cmp(&a.average_score))
        .then_with(|| b.highest_score.cmp(&a.highest_score))
        .then_with(|| a.player_name.cmp(&b.player_name))
}

/// Compute ranked statistics for every player in the league.
///
/// `matches` must be in recorded order. Roster players who have not
/// played yet appear with all-zero stats at the bottom of the table.
pub fn compute_rankings(matches: &[Match], roster: &[String]) -> Vec<PlayerStats> {
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for m in matches {
        record_appearance(&mut tallies, &m.player1, m.player1_score, m.winner == m.player1);
        record_appearance(&mut tallies, &m.player2, m.player2_score, m.winner == m.player2);
    }

    for name in roster {
        tallies
            .entry(name.clone())
            .or_insert_with(|| Tally {
                stats: PlayerStats::new(name),
                outcomes: Vec::new(),
            });
    }

    let mut rankings: Vec<PlayerStats> = tallies
        .into_values()
        .map(|tally| {
            let mut stats = tally.stats;
            if stats.matches_played > 0 {
                stats.win_rate =
                    round2(stats.matches_won as f64 / stats.matches_played as f64 * 100.0);
                stats.average_score =
                    round2(stats.total_score as f64 / stats.matches_played as f64);
                stats.current_streak = current_streak(&tally.outcomes);
                stats.win_streak = longest_win_streak(&tally.outcomes);
            }
            stats
        })
        .collect();

    rankings.sort_by(ranking_order);
    rankings
}

/// Statistics for a single player, or None if they have never played.
pub fn player_stats(matches: &[Match], player_name: &str) -> Option<PlayerStats> {
    let involved: Vec<Match> = matches
        .iter()
        .filter(|m| m.player1 == player_name || m.player2 == player_name)
        .cloned()
        .collect();
    if involved.is_empty() {
        return None;
    }
    compute_rankings(&involved, &[])
        .into_iter()
        .find(|s| s.player_name == player_name)
}

/// Head-to-head summary between two players.
///
/// The wire format keys wins/rates by player name (`"alice_wins"`), which
/// is what the frontend consumes, so the payload is built as a JSON map.
pub fn head_to_head(matches: &[Match], player1: &str, player2: &str) -> Value {
    let total_matches = matches.len() as i64;

    let mut summary = Map::new();
    summary.insert("total_matches".into(), json!(total_matches));
    summary.insert(format!("{player1}_wins"), json!(0));
    summary.insert(format!("{player2}_wins"), json!(0));
    summary.insert(format!("{player1}_win_rate"), json!(0.0));
    summary.insert(format!("{player2}_win_rate"), json!(0.0));
    summary.insert("average_score_difference".into(), json!(0.0));
    summary.insert("match_history".into(), json!([]));

    if total_matches == 0 {
        return Value::Object(summary);
    }

    let mut player1_wins = 0i64;
    let mut player1_total_score = 0i64;
    let mut player2_total_score = 0i64;
    let mut history = Vec::with_capacity(matches.len());

    for m in matches {
        if m.winner == player1 {
            player1_wins += 1;
        }

        if m.player1 == player1 {
            player1_total_score += m.player1_score;
            player2_total_score += m.player2_score;
        } else {
            player1_total_score += m.player2_score;
            player2_total_score += m.player1_score;
        }

        let mut entry = Map::new();
        entry.insert("id".into(), json!(m.id));
        entry.insert("date".into(), json!(m.created_at));
        entry.insert(format!("{}_score", m.player1), json!(m.player1_score));
        entry.insert(format!("{}_score", m.player2), json!(m.player2_score));
        entry.insert("winner".into(), json!(m.winner));
        history.push(Value::Object(entry));
    }

    let player2_wins = total_matches - player1_wins;
    summary.insert(format!("{player1}_wins"), json!(player1_wins));
    summary.insert(format!("{player2}_wins"), json!(player2_wins));
    summary.insert(
        format!("{player1}_win_rate"),
        json!(round2(player1_wins as f64 / total_matches as f64 * 100.0)),
    );
    summary.insert(
        format!("{player2}_win_rate"),
        json!(round2(player2_wins as f64 / total_matches as f64 * 100.0)),
    );
    summary.insert(
        "average_score_difference".into(),
        json!(round2(
            (player1_total_score - player2_total_score) as f64 / total_matches as f64
        )),
    );
    summary.insert(
        format!("{player1}_average_score"),
        json!(round2(player1_total_score as f64 / total_matches as f64)),
    );
    summary.insert(
        format!("{player2}_average_score"),
        json!(round2(player2_total_score as f64 / total_matches as f64)),
    );
    summary.insert("match_history".into(), Value::Array(history));

    Value::Object(summary)
}

/// League-wide summary over all matches plus the roster.
pub fn league_summary(matches: &[Match], roster: &[String]) -> LeagueSummary {
    let mut players: HashSet<&str> = HashSet::new();
    let mut total_score = 0i64;
    let mut highest_score = 0i64;

    for m in matches {
        players.insert(&m.player1);
        players.insert(&m.player2);
        total_score += m.player1_score + m.player2_score;
        highest_score = highest_score.max(m.player1_score).max(m.player2_score);
    }
    for name in roster {
        players.insert(name);
    }

    let average_score = if matches.is_empty() {
        0.0
    } else {
        total_score as f64 / (matches.len() as f64 * 2.0)
    };

    LeagueSummary {
        total_matches: matches.len() as i64,
        total_players: players.len() as i64,
        average_score,
        highest_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(player1: &str, player2: &str, score1: i64, score2: i64) -> Match {
        Match {
            id: format!("{player1}-{player2}-{score1}-{score2}"),
            league_id: "league".into(),
            player1: player1.into(),
            player2: player2.into(),
            player1_score: score1,
            player2_score: score2,
            winner: decide_winner(player1, player2, score1, score2).into(),
            created_at: "2026-01-01 00:00:00".into(),
            updated_at: "2026-01-01 00:00:00".into(),
        }
    }

    fn stats_for<'a>(rankings: &'a [PlayerStats], name: &str) -> &'a PlayerStats {
        rankings
            .iter()
            .find(|s| s.player_name == name)
            .expect("player missing from rankings")
    }

    #[test]
    fn test_decide_winner() {
        assert_eq!(decide_winner("a", "b", 2, 1), "a");
        assert_eq!(decide_winner("a", "b", 1, 2), "b");
        // Equal scores go to player2
        assert_eq!(decide_winner("a", "b", 3, 3), "b");
    }

    #[test]
    fn test_empty_league() {
        assert!(compute_rankings(&[], &[]).is_empty());
    }

    #[test]
    fn test_basic_tally() {
        let matches = vec![m("a", "b", 21, 15), m("b", "a", 21, 18)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(rankings.len(), 2);

        let a = stats_for(&rankings, "a");
        assert_eq!(a.matches_played, 2);
        assert_eq!(a.matches_won, 1);
        assert_eq!(a.matches_lost, 1);
        assert_eq!(a.total_score, 39);
        assert_eq!(a.highest_score, 21);
        assert_eq!(a.win_rate, 50.0);
        assert_eq!(a.average_score, 19.5);
    }

    #[test]
    fn test_win_rate_rounded_to_two_decimals() {
        // 1 win out of 3 -> 33.333...% -> 33.33
        let matches = vec![m("a", "b", 2, 1), m("a", "b", 0, 1), m("a", "b", 0, 1)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(stats_for(&rankings, "a").win_rate, 33.33);
        assert_eq!(stats_for(&rankings, "b").win_rate, 66.67);
    }

    #[test]
    fn test_average_score_rounded() {
        // 10 points over 3 matches -> 3.333... -> 3.33
        let matches = vec![m("a", "b", 4, 5), m("a", "b", 3, 5), m("a", "b", 3, 5)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(stats_for(&rankings, "a").average_score, 3.33);
    }

    #[test]
    fn test_current_streak_wins() {
        // a: loss, win, win -> current streak +2
        let matches = vec![m("a", "b", 0, 1), m("a", "b", 2, 1), m("a", "b", 2, 1)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(stats_for(&rankings, "a").current_streak, 2);
        assert_eq!(stats_for(&rankings, "b").current_streak, -2);
    }

    #[test]
    fn test_current_streak_losses() {
        // a: win, loss, loss, loss -> current streak -3
        let matches = vec![
            m("a", "b", 2, 1),
            m("a", "b", 0, 1),
            m("a", "b", 0, 1),
            m("a", "b", 0, 1),
        ];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(stats_for(&rankings, "a").current_streak, -3);
        assert_eq!(stats_for(&rankings, "b").current_streak, 3);
    }

    #[test]
    fn test_longest_win_streak_not_necessarily_current() {
        // a: win, win, win, loss, win -> longest 3, current +1
        let matches = vec![
            m("a", "b", 2, 1),
            m("a", "b", 2, 1),
            m("a", "b", 2, 1),
            m("a", "b", 0, 1),
            m("a", "b", 2, 1),
        ];
        let rankings = compute_rankings(&matches, &[]);
        let a = stats_for(&rankings, "a");
        assert_eq!(a.win_streak, 3);
        assert_eq!(a.current_streak, 1);
    }

    #[test]
    fn test_all_losses_zero_win_streak() {
        let matches = vec![m("a", "b", 0, 1), m("a", "b", 0, 1)];
        let rankings = compute_rankings(&matches, &[]);
        let a = stats_for(&rankings, "a");
        assert_eq!(a.win_streak, 0);
        assert_eq!(a.current_streak, -2);
        assert_eq!(a.win_rate, 0.0);
    }

    #[test]
    fn test_roster_player_without_matches_gets_zero_stats() {
        let matches = vec![m("a", "b", 2, 1)];
        let rankings = compute_rankings(&matches, &["carol".to_string()]);
        assert_eq!(rankings.len(), 3);
        let carol = stats_for(&rankings, "carol");
        assert_eq!(carol.matches_played, 0);
        assert_eq!(carol.win_rate, 0.0);
        assert_eq!(carol.current_streak, 0);
        // Zero win rate sorts below both participants
        assert_eq!(rankings[2].player_name, "carol");
    }

    #[test]
    fn test_roster_player_with_matches_not_duplicated() {
        let matches = vec![m("a", "b", 2, 1)];
        let rankings = compute_rankings(&matches, &["a".to_string(), "b".to_string()]);
        assert_eq!(rankings.len(), 2);
        assert_eq!(stats_for(&rankings, "a").matches_played, 1);
    }

    #[test]
    fn test_ranking_primary_key_win_rate() {
        // a wins 2/2 (100%), b wins 1/2 against c (50%)
        let matches = vec![m("a", "c", 2, 1), m("a", "c", 2, 1), m("b", "c", 2, 1), m("c", "b", 2, 1)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(rankings[0].player_name, "a");
    }

    #[test]
    fn test_ranking_tiebreak_wins_then_average_score() {
        // a and b both at 100%, but a has 2 wins to b's 1
        let matches = vec![m("a", "c", 2, 1), m("a", "c", 2, 1), m("b", "c", 2, 1)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(rankings[0].player_name, "a");
        assert_eq!(rankings[1].player_name, "b");

        // Equal wins and rate: higher average score first
        let matches = vec![m("a", "c", 10, 1), m("b", "c", 5, 1)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(rankings[0].player_name, "a");
    }

    #[test]
    fn test_ranking_tiebreak_highest_score_then_name() {
        // Identical records except a single higher peak score
        let matches = vec![
            m("a", "c", 5, 1),
            m("a", "c", 9, 1),
            m("b", "c", 7, 1),
            m("b", "c", 7, 1),
        ];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(rankings[0].player_name, "a"); // peak 9 vs 7

        // Fully identical records fall back to name order
        let matches = vec![m("b", "c", 5, 1), m("a", "c", 5, 1)];
        let rankings = compute_rankings(&matches, &[]);
        assert_eq!(rankings[0].player_name, "a");
        assert_eq!(rankings[1].player_name, "b");
    }

    #[test]
    fn test_player_stats_found() {
        let matches = vec![m("a", "b", 2, 1), m("b", "c", 3, 1), m("a", "b", 0, 1)];
        let stats = player_stats(&matches, "a").unwrap();
        assert_eq!(stats.matches_played, 2);
        assert_eq!(stats.matches_won, 1);
        assert_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.current_streak, -1);
    }

    #[test]
    fn test_player_stats_unknown_player() {
        let matches = vec![m("a", "b", 2, 1)];
        assert!(player_stats(&matches, "nobody").is_none());
        assert!(player_stats(&[], "a").is_none());
    }

    #[test]
    fn test_head_to_head_empty() {
        let value = head_to_head(&[], "a", "b");
        assert_eq!(value["total_matches"], 0);
        assert_eq!(value["a_wins"], 0);
        assert_eq!(value["b_wins"], 0);
        assert_eq!(value["match_history"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_head_to_head_counts_and_rates() {
        let matches = vec![m("a", "b", 2, 1), m("b", "a", 3, 1), m("a", "b", 5, 0)];
        let value = head_to_head(&matches, "a", "b");
        assert_eq!(value["total_matches"], 3);
        assert_eq!(value["a_wins"], 2);
        assert_eq!(value["b_wins"], 1);
        assert_eq!(value["a_win_rate"], 66.67);
        assert_eq!(value["b_win_rate"], 33.33);
        // a scored 2+1+5=8, b scored 1+3+0=4 -> diff (8-4)/3 = 1.33
        assert_eq!(value["average_score_difference"], 1.33);
        assert_eq!(value["a_average_score"], 2.67);
        assert_eq!(value["b_average_score"], 1.33);

        let history = value["match_history"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["a_score"], 2);
        assert_eq!(history[0]["b_score"], 1);
        assert_eq!(history[0]["winner"], "a");
        // Second match was recorded with b as player1
        assert_eq!(history[1]["b_score"], 3);
        assert_eq!(history[1]["winner"], "b");
    }

    #[test]
    fn test_league_summary() {
        let matches = vec![m("a", "b", 10, 5), m("b", "c", 3, 7)];
        let summary = league_summary(&matches, &["d".to_string()]);
        assert_eq!(summary.total_matches, 2);
        assert_eq!(summary.total_players, 4);
        // (10+5+3+7) / (2 matches * 2 players) = 6.25
        assert_eq!(summary.average_score, 6.25);
        assert_eq!(summary.highest_score, 10);
    }

    #[test]
    fn test_league_summary_empty() {
        let summary = league_summary(&[], &[]);
        assert_eq!(summary.total_matches, 0);
        assert_eq!(summary.total_players, 0);
        assert_eq!(summary.average_score, 0.0);
        assert_eq!(summary.highest_score, 0);
    }
}
