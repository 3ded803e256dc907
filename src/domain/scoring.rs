use serde::Serialize;

use super::reservation::Reservation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreAdjustment {
    pub user_id: String,
    pub delta: i64,
}

/// Score changes after an intention is confirmed.
///
/// The winner pays one point; every other user who loses an intention in the
/// same decision gains one, once, however many of their intentions were
/// dropped. Intentions without a user are ignored.
pub fn score_adjustments(winner: &Reservation, losers: &[Reservation]) -> Vec<ScoreAdjustment> {
    let winner_id = winner.user_id.as_deref();
    let mut adjustments: Vec<ScoreAdjustment> = Vec::new();

    if let Some(id) = winner_id {
        adjustments.push(ScoreAdjustment {
            user_id: id.to_string(),
            delta: -1,
        });
    }

    for loser in losers {
        let Some(id) = loser.user_id.as_deref() else {
            continue;
        };
        if Some(id) == winner_id || adjustments.iter().any(|a| a.user_id == id) {
            continue;
        }
        adjustments.push(ScoreAdjustment {
            user_id: id.to_string(),
            delta: 1,
        });
    }

    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::apartment::Apartment;
    use crate::test_helpers::{d, make_intention};

    fn intention(id: &str, user: &str) -> Reservation {
        make_intention(id, user, Apartment::App35, d(2025, 7, 5), d(2025, 7, 12))
    }

    #[test]
    fn winner_pays_and_each_loser_gains() {
        let winner = intention("i1", "u1");
        let losers = vec![intention("i2", "u2"), intention("i3", "u3")];
        let adj = score_adjustments(&winner, &losers);
        assert_eq!(
            adj,
            vec![
                ScoreAdjustment { user_id: "u1".into(), delta: -1 },
                ScoreAdjustment { user_id: "u2".into(), delta: 1 },
                ScoreAdjustment { user_id: "u3".into(), delta: 1 },
            ]
        );
    }

    #[test]
    fn duplicate_and_own_intentions_are_not_compensated() {
        let winner = intention("i1", "u1");
        let losers = vec![
            intention("i2", "u2"),
            intention("i3", "u2"),
            intention("i4", "u1"),
        ];
        let adj = score_adjustments(&winner, &losers);
        assert_eq!(adj.len(), 2);
        assert_eq!(adj[1], ScoreAdjustment { user_id: "u2".into(), delta: 1 });
    }

    #[test]
    fn anonymous_intentions_are_ignored() {
        let mut winner = intention("i1", "u1");
        winner.user_id = None;
        let mut anon = intention("i2", "x");
        anon.user_id = None;
        let adj = score_adjustments(&winner, &[anon, intention("i3", "u3")]);
        assert_eq!(adj, vec![ScoreAdjustment { user_id: "u3".into(), delta: 1 }]);
    }

    #[test]
    fn net_change_is_zero_for_distinct_users() {
        let winner = intention("i1", "u1");
        let losers = vec![intention("i2", "u2")];
        let total: i64 = score_adjustments(&winner, &losers).iter().map(|a| a.delta).sum();
        assert_eq!(total, 0);
    }
}
