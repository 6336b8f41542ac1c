//! Balance-delta semantics: every emitted event carries exactly the matched
//! wallet's absolute delta, with the fee attached to the sending side only.

use proptest::prelude::*;
use tokio::sync::mpsc;
use web3::types::U256;

use wallet_tracker::services::{
	slot::{
		process_block, SlotBlock, SlotMessage, SlotTransaction, SlotTransactionBody,
		SlotTransactionMeta,
	},
	subscriber::WalletRegistry,
};

/// Deterministic distinct 32-byte keys rendered in base58.
fn account_key(index: usize) -> String {
	let mut bytes = [0u8; 32];
	bytes[0] = index as u8;
	bytes[31] = 0xA5;
	bs58::encode(bytes).into_string()
}

proptest! {
	#[test]
	fn events_carry_absolute_deltas_and_sender_side_fees(
		balances in proptest::collection::vec((0i64..=1_000_000, 0i64..=1_000_000), 1..8),
		fee in 0u64..=10_000,
	) {
		let accounts: Vec<String> = (0..balances.len()).map(account_key).collect();
		let block = SlotBlock {
			transactions: vec![SlotTransaction {
				meta: Some(SlotTransactionMeta {
					fee,
					pre_balances: balances.iter().map(|(pre, _)| *pre).collect(),
					post_balances: balances.iter().map(|(_, post)| *post).collect(),
				}),
				transaction: SlotTransactionBody {
					message: SlotMessage {
						account_keys: accounts.clone(),
					},
				},
			}],
		};

		let registry = WalletRegistry::new();
		for account in &accounts {
			let decoded: [u8; 32] =
				bs58::decode(account).into_vec().unwrap().try_into().unwrap();
			registry.insert(decoded);
		}

		let deltas: Vec<i64> = balances.iter().map(|(pre, post)| post - pre).collect();
		let senders: Vec<usize> =
			(0..deltas.len()).filter(|&i| deltas[i] < 0).collect();
		let recipients: Vec<usize> =
			(0..deltas.len()).filter(|&i| deltas[i] > 0).collect();

		let runtime = tokio::runtime::Builder::new_current_thread()
			.build()
			.unwrap();
		let events = runtime.block_on(async {
			let (tx, mut rx) = mpsc::channel(64);
			process_block(&block, &registry, &tx).await;
			drop(tx);

			let mut collected = Vec::new();
			while let Some(event) = rx.recv().await {
				collected.push(event);
			}
			collected
		});

		prop_assert_eq!(events.len(), senders.len() + recipients.len());

		// Sender events come first, in account order, each with the fee
		for (event, &index) in events.iter().zip(&senders) {
			prop_assert_eq!(&event.source, &accounts[index]);
			prop_assert_eq!(event.amount, U256::from((-deltas[index]) as u64));
			prop_assert_eq!(event.fees, U256::from(fee));
		}

		// Recipient events follow, each fee-free
		for (event, &index) in events.iter().skip(senders.len()).zip(&recipients) {
			prop_assert_eq!(&event.destination, &accounts[index]);
			prop_assert_eq!(event.amount, U256::from(deltas[index] as u64));
			prop_assert_eq!(event.fees, U256::zero());
		}
	}
}
