//! Derived game economics.
//!
//! All arithmetic is in integer cents. Add-ons contribute to the prizepool
//! but never pay rake.

use crate::models::{Game, GameEconomics};

/// Compute derived economics and apply the guarantee inference policy.
///
/// `inference_min_cents` is the margin by which the paid prizepool must
/// exceed player contributions before an undeclared guarantee is inferred.
pub fn compute(game: &mut Game, inference_min_cents: i64) {
    let buy_in = match game.buy_in {
        Some(b) => b,
        None => return,
    };
    let rake = game.rake.unwrap_or(0);
    let initial = game.total_initial_entries.unwrap_or(0);
    let rebuys = game.total_rebuys.unwrap_or(0);
    let addons = game.total_addons.unwrap_or(0);
    let jackpot = game.jackpot_per_entry.unwrap_or(0);

    let entries_for_rake = initial + rebuys;
    let total_entries = initial + rebuys + addons;
    let rake_revenue = rake * entries_for_rake;
    let total_buy_ins_collected = buy_in * total_entries;

    let prizepool_from_er = (buy_in - rake - jackpot) * entries_for_rake;
    let prizepool_from_addons = (buy_in - jackpot) * addons;
    let player_contributions = prizepool_from_er + prizepool_from_addons;

    // Undeclared guarantees show up as a prizepool the players did not fund
    if !game.has_guarantee {
        if let Some(paid) = game.prizepool_paid {
            if paid > player_contributions + inference_min_cents {
                game.has_guarantee = true;
                game.guarantee_amount = Some(paid);
                game.guarantee_was_inferred = true;
            }
        }
    }

    let guarantee = game.guarantee_amount.unwrap_or(0);
    let shortfall = if game.has_guarantee && guarantee > 0 {
        Some(guarantee - player_contributions)
    } else {
        None
    };
    let overlay_cost = shortfall.map(|s| s.max(0)).unwrap_or(0);
    let prizepool_surplus = shortfall.filter(|s| *s < 0).map(|s| -s);
    let game_profit = rake_revenue - overlay_cost;

    game.economics = Some(GameEconomics {
        entries_for_rake,
        total_entries,
        rake_revenue,
        total_buy_ins_collected,
        prizepool_player_contributions: player_contributions,
        overlay_cost,
        prizepool_surplus,
        game_profit,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with(
        buy_in: i64,
        rake: i64,
        initial: i64,
        rebuys: i64,
        addons: i64,
    ) -> Game {
        let mut g = Game::empty("E1", "https://host/t.php?id=1", Some("1".into()));
        g.buy_in = Some(buy_in);
        g.rake = Some(rake);
        g.total_initial_entries = Some(initial);
        g.total_rebuys = Some(rebuys);
        g.total_addons = Some(addons);
        g
    }

    #[test]
    fn test_basic_economics() {
        let mut g = game_with(15000, 2500, 40, 10, 5);
        compute(&mut g, 100);
        let e = g.economics.unwrap();
        assert_eq!(e.entries_for_rake, 50);
        assert_eq!(e.total_entries, 55);
        assert_eq!(e.rake_revenue, 125_000);
        assert_eq!(e.total_buy_ins_collected, 825_000);
        // 50 * $125 + 5 * $150
        assert_eq!(e.prizepool_player_contributions, 700_000);
        assert_eq!(e.overlay_cost, 0);
        assert_eq!(e.game_profit, 125_000);
    }

    #[test]
    fn test_addons_never_pay_rake() {
        let mut g = game_with(10000, 1000, 0, 0, 10);
        compute(&mut g, 100);
        let e = g.economics.unwrap();
        assert_eq!(e.rake_revenue, 0);
        assert_eq!(e.prizepool_player_contributions, 100_000);
    }

    #[test]
    fn test_overlay_on_declared_guarantee() {
        let mut g = game_with(15000, 2500, 8, 0, 0);
        g.has_guarantee = true;
        g.guarantee_amount = Some(500_000);
        compute(&mut g, 100);
        let e = g.economics.unwrap();
        // 8 * $125 = $1,000 contributed against a $5,000 guarantee
        assert_eq!(e.prizepool_player_contributions, 100_000);
        assert_eq!(e.overlay_cost, 400_000);
        assert_eq!(e.prizepool_surplus, None);
        assert_eq!(e.game_profit, 20_000 - 400_000);
    }

    #[test]
    fn test_surplus_when_guarantee_exceeded() {
        let mut g = game_with(15000, 2500, 100, 0, 0);
        g.has_guarantee = true;
        g.guarantee_amount = Some(500_000);
        compute(&mut g, 100);
        let e = g.economics.unwrap();
        assert_eq!(e.prizepool_player_contributions, 1_250_000);
        assert_eq!(e.overlay_cost, 0);
        assert_eq!(e.prizepool_surplus, Some(750_000));
        assert_eq!(e.game_profit, e.rake_revenue);
    }

    #[test]
    fn test_guarantee_inference() {
        // buyIn $150, rake $25, 8 initial entries, prizepool paid $6,000
        let mut g = game_with(15000, 2500, 8, 0, 0);
        g.prizepool_paid = Some(600_000);
        compute(&mut g, 100);

        assert!(g.has_guarantee);
        assert!(g.guarantee_was_inferred);
        assert_eq!(g.guarantee_amount, Some(600_000));

        let e = g.economics.unwrap();
        assert_eq!(e.prizepool_player_contributions, 100_000);
        assert_eq!(e.overlay_cost, 500_000);
        assert_eq!(e.game_profit, 20_000 - 500_000);
    }

    #[test]
    fn test_inference_respects_minimum_margin() {
        let mut g = game_with(15000, 2500, 8, 0, 0);
        // Only 50 cents over contributions, below the $1 minimum
        g.prizepool_paid = Some(100_050);
        compute(&mut g, 100);
        assert!(!g.has_guarantee);
        assert!(!g.guarantee_was_inferred);
    }

    #[test]
    fn test_jackpot_withholding() {
        let mut g = game_with(10000, 1000, 10, 0, 5);
        g.jackpot_per_entry = Some(500);
        compute(&mut g, 100);
        let e = g.economics.unwrap();
        // ER: 10 * (100-10-5) = $850; addons: 5 * (100-5) = $475
        assert_eq!(e.prizepool_player_contributions, 85_000 + 47_500);
        // identity: rake + contribs == b*efr + b*addons - j*totalEntries
        let lhs = e.rake_revenue + e.prizepool_player_contributions;
        let rhs = 10000 * e.entries_for_rake + 10000 * 5 - 500 * e.total_entries;
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_missing_buy_in_skips_economics() {
        let mut g = Game::empty("E1", "https://host/t.php?id=1", Some("1".into()));
        g.total_initial_entries = Some(50);
        compute(&mut g, 100);
        assert!(g.economics.is_none());
    }
}
