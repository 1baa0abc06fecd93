//! Property tests for rate policy, accrual and ledger mutations.

use proptest::prelude::*;

use tide_accrual::engine::{realize_interest, AccrualEngine};
use tide_core::account_ledger::MemoryAccountLedger;
use tide_core::constants::{DEFAULT_INTEREST_RATE, RATE_PRECISION, SECONDS_PER_YEAR};
use tide_core::traits::{AccountLedger, InterestCalculator};
use tide_core::types::{HolderAccount, TransferAmount};
use tide_tests::helpers::*;

/// Rates up to ~3% per day keep every generated scenario far from overflow.
const MAX_RATE: u64 = 350_000_000_000;
const MAX_BALANCE: u64 = 1_000_000_000_000_000;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The observed rate never increases, and rejected proposals change nothing.
    #[test]
    fn rate_is_monotonic(proposals in prop::collection::vec(0u64..=2 * DEFAULT_INTEREST_RATE, 1..32)) {
        let (token, _) = setup();
        for proposed in proposals {
            let before = token.interest_rate();
            let result = token.set_interest_rate(&OWNER, proposed);
            let after = token.interest_rate();
            if proposed < before {
                prop_assert!(result.is_ok());
                prop_assert_eq!(after, proposed);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(after, before);
            }
            prop_assert!(after <= before);
        }
    }

    /// Accrued balance follows the closed form and grows linearly in time.
    #[test]
    fn accrual_is_linear(
        raw in 0u64..MAX_BALANCE,
        rate in 0u64..MAX_RATE,
        t in 0u64..SECONDS_PER_YEAR,
    ) {
        let engine = AccrualEngine::new();
        let account = HolderAccount { raw_balance: raw, snapshot_rate: rate, last_accrual: T0 };

        let at = |elapsed: u64| engine.accrued_balance(&account, T0 + elapsed).unwrap();
        let expected = raw as u128 * (RATE_PRECISION as u128 + rate as u128 * t as u128)
            / RATE_PRECISION as u128;
        prop_assert_eq!(at(t) as u128, expected);

        let first = at(t) - at(0);
        let second = at(2 * t) - at(t);
        prop_assert!(first.abs_diff(second) <= 1, "first={} second={}", first, second);
    }

    /// After any mutation, principal equals the accrued balance just before
    /// it, adjusted by the operation amount.
    #[test]
    fn mutations_realize_first(
        deposit in 1u64..MAX_BALANCE,
        other in 1u64..MAX_BALANCE,
        elapsed in 0u64..SECONDS_PER_YEAR,
        fraction in 0u64..=100,
        op in 0u8..3,
    ) {
        let (token, vault) = setup();
        let alice = holder(0xA1);
        let bob = holder(0xB1);
        vault.deposit(&alice, deposit, T0).unwrap();
        vault.deposit(&bob, other, T0).unwrap();

        let now = T0 + elapsed;
        let alice_before = token.balance_of(&alice, now).unwrap();
        let bob_before = token.balance_of(&bob, now).unwrap();
        let amount = (alice_before as u128 * fraction as u128 / 100) as u64;

        match op {
            0 => {
                token.mint(&VAULT, &alice, amount, DEFAULT_INTEREST_RATE, now).unwrap();
                prop_assert_eq!(token.principal_balance_of(&alice), alice_before + amount);
            }
            1 => {
                token.burn(&VAULT, &alice, amount, now).unwrap();
                prop_assert_eq!(token.principal_balance_of(&alice), alice_before - amount);
            }
            _ => {
                token.transfer(&alice, &bob, amount, now).unwrap();
                prop_assert_eq!(token.principal_balance_of(&alice), alice_before - amount);
                prop_assert_eq!(token.principal_balance_of(&bob), bob_before + amount);
            }
        }
        prop_assert_eq!(token.last_accrual(&alice), Some(now));
        prop_assert_eq!(token.balance_of(&alice, now).unwrap(), token.principal_balance_of(&alice));
    }

    /// Realizing twice at the same timestamp mints nothing the second time.
    #[test]
    fn realization_is_idempotent(
        raw in 1u64..MAX_BALANCE,
        rate in 0u64..MAX_RATE,
        elapsed in 0u64..SECONDS_PER_YEAR,
    ) {
        let engine = AccrualEngine::new();
        let alice = holder(0xA1);
        let mut ledger = MemoryAccountLedger::new();
        ledger.mint_raw(&alice, raw).unwrap();
        let mut account = HolderAccount { raw_balance: raw, snapshot_rate: rate, last_accrual: T0 };

        let now = T0 + elapsed;
        realize_interest(&engine, &alice, &mut account, &mut ledger, now).unwrap();
        let after_first = ledger.raw_balance_of(&alice);
        let second = realize_interest(&engine, &alice, &mut account, &mut ledger, now).unwrap();

        prop_assert_eq!(second, 0);
        prop_assert_eq!(ledger.raw_balance_of(&alice), after_first);
        prop_assert_eq!(account.raw_balance, after_first);
    }

    /// Same property through the ledger: zero-value transfers realize once.
    #[test]
    fn zero_transfer_realizes_once(deposit in 1u64..MAX_BALANCE, elapsed in 0u64..SECONDS_PER_YEAR) {
        let (token, vault) = setup();
        let alice = holder(0xA1);
        let bob = holder(0xB1);
        vault.deposit(&alice, deposit, T0).unwrap();

        let now = T0 + elapsed;
        token.transfer(&alice, &bob, 0, now).unwrap();
        let supply = token.total_supply();
        let principal = token.principal_balance_of(&alice);
        token.transfer(&alice, &bob, 0, now).unwrap();

        prop_assert_eq!(token.total_supply(), supply);
        prop_assert_eq!(token.principal_balance_of(&alice), principal);
    }

    /// Drained recipients adopt the sender's rate; funded ones keep theirs.
    #[test]
    fn recipient_rate_inheritance(
        sender_rate in 1u64..MAX_RATE,
        recipient_rate in 1u64..MAX_RATE,
        recipient_funded in any::<bool>(),
        deposit in 1u64..MAX_BALANCE,
        amount_pct in 0u64..=100,
        elapsed in 0u64..SECONDS_PER_YEAR,
    ) {
        let (token, _) = setup_with_rate(u64::MAX);
        let alice = holder(0xA1);
        let bob = holder(0xB1);
        token.mint(&VAULT, &alice, deposit, sender_rate, T0).unwrap();
        // A drained holder keeps a stale rate that must be replaced.
        token.mint(&VAULT, &bob, 1, recipient_rate, T0).unwrap();
        if !recipient_funded {
            token.burn(&VAULT, &bob, 1, T0).unwrap();
        }

        let now = T0 + elapsed;
        let amount = (token.balance_of(&alice, now).unwrap() as u128 * amount_pct as u128 / 100) as u64;
        token.transfer(&alice, &bob, TransferAmount::Exact(amount), now).unwrap();

        let expected = if recipient_funded { recipient_rate } else { sender_rate };
        prop_assert_eq!(token.user_interest_rate(&bob), expected);
        prop_assert_eq!(token.user_interest_rate(&alice), sender_rate);
    }

    /// Total supply is the sum of raw balances after any sequence of moves.
    #[test]
    fn supply_matches_balances(
        deposits in prop::collection::vec(1u64..1_000_000_000, 2..6),
        steps in prop::collection::vec((0usize..6, 0usize..6, 0u64..=100, 0u64..SECONDS_PER_YEAR / 12), 0..16),
    ) {
        let (token, vault) = setup();
        let holders: Vec<_> = (0..deposits.len()).map(|i| holder(0x10 + i as u8)).collect();
        for (h, d) in holders.iter().zip(&deposits) {
            vault.deposit(h, *d, T0).unwrap();
        }

        let mut now = T0;
        for (from, to, pct, dt) in steps {
            now += dt;
            let from = &holders[from % holders.len()];
            let to = &holders[to % holders.len()];
            let amount = (token.balance_of(from, now).unwrap() as u128 * pct as u128 / 100) as u64;
            token.transfer(from, to, amount, now).unwrap();
        }

        let sum: u64 = holders.iter().map(|h| token.principal_balance_of(h)).sum();
        prop_assert_eq!(token.total_supply(), sum);
    }
}
