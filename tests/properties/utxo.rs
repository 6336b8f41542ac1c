//! Apportionment bounds: emitted amounts and fees never exceed the
//! transaction totals they are carved from.

use proptest::prelude::*;

use wallet_tracker::services::utxo::apportion;

proptest! {
	#[test]
	fn shares_stay_within_transaction_totals(
		outputs in proptest::collection::vec(0i64..=10_000_000, 1..12),
		fees in 0i64..=1_000_000,
	) {
		let total: i64 = outputs.iter().sum();

		for &value in &outputs {
			let (amount, fee_share) = apportion(value, total, fees);
			prop_assert!(amount <= total as u64);
			prop_assert!(fee_share <= fees as u64);
			if value <= 0 || total <= 0 {
				prop_assert_eq!(amount, 0);
				prop_assert_eq!(fee_share, 0);
			}
		}
	}

	#[test]
	fn truncation_never_overcounts_across_outputs(
		outputs in proptest::collection::vec(1i64..=10_000_000, 1..12),
		fees in 0i64..=1_000_000,
	) {
		let total: i64 = outputs.iter().sum();
		let mut amount_sum: u64 = 0;
		let mut fee_sum: u64 = 0;

		for &value in &outputs {
			let (amount, fee_share) = apportion(value, total, fees);
			amount_sum += amount;
			fee_sum += fee_share;
		}

		// Truncation may undercount by up to one unit per output, but the
		// split can never exceed what the transaction carried
		prop_assert!(amount_sum <= total as u64);
		prop_assert!(fee_sum <= fees as u64);
		prop_assert!(amount_sum + outputs.len() as u64 >= total as u64);
	}
}
