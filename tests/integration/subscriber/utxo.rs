//! End-to-end scenarios for the UTXO subscriber driven through a mock RPC
//! client.

use std::time::Duration;

use mockall::predicate::eq;
use tokio::time::timeout;
use web3::types::U256;

use crate::integration::mocks::{
	utxo_block, utxo_input, utxo_output, utxo_transaction, MockUtxoRpc,
};
use wallet_tracker::{
	models::ChainName,
	services::{
		subscriber::TransactionSubscriber,
		utxo::{UtxoSubscriber, UtxoTransaction},
	},
};

// Well-known mainnet addresses reused as fixtures
const ADDR_A: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
const ADDR_B: &str = "bc1qgx3xl9f6scnh34tph2my3tytmy0m9zqurqstpp";
const ADDR_X: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";
const ADDR_Y: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

/// 100 satoshi expressed in whole coins.
const SATS_100: f64 = 0.000_001;
const SATS_110: f64 = 0.000_001_1;
const SATS_150: f64 = 0.000_001_5;
const SATS_50: f64 = 0.000_000_5;

fn subscriber_with_tip_block(
	tip_transactions: Vec<UtxoTransaction>,
	prev_outputs: Vec<(&'static str, UtxoTransaction)>,
) -> UtxoSubscriber<MockUtxoRpc> {
	let mut client = MockUtxoRpc::new();
	client.expect_block_count().returning(|| Ok(100));
	client
		.expect_block_hash()
		.with(eq(100i64))
		.returning(|_| Ok("tip-hash".to_string()));
	client
		.expect_block()
		.with(eq("tip-hash"))
		.returning(move |_| Ok(utxo_block("tip-hash", 100, tip_transactions.clone())));
	for (txid, prev_tx) in prev_outputs {
		client
			.expect_raw_transaction()
			.with(eq(txid))
			.returning(move |_| Ok(prev_tx.clone()));
	}

	// Cursor sits one behind the tip so the first poll processes it
	UtxoSubscriber::with_client(client, 99)
}

#[tokio::test]
async fn apportions_amount_and_fees_to_the_matched_output() {
	// Inputs A and B worth 100 sats each; outputs X:150 and Y:50; no fee
	let block_tx = utxo_transaction(
		"tx-1",
		vec![utxo_input("prev-a", 0), utxo_input("prev-b", 0)],
		vec![utxo_output(ADDR_X, SATS_150, 0), utxo_output(ADDR_Y, SATS_50, 1)],
	);
	let subscriber = subscriber_with_tip_block(
		vec![block_tx],
		vec![
			("prev-a", utxo_transaction("prev-a", vec![], vec![utxo_output(ADDR_A, SATS_100, 0)])),
			("prev-b", utxo_transaction("prev-b", vec![], vec![utxo_output(ADDR_B, SATS_100, 0)])),
		],
	);
	subscriber.track_wallet(ADDR_Y).unwrap();

	let (mut events, _errors) = subscriber.start();
	let event = timeout(Duration::from_secs(1), events.recv())
		.await
		.expect("expected an event for the tracked output")
		.unwrap();

	assert_eq!(event.chain_name, ChainName::UtxoMainnet);
	assert_eq!(event.source, format!("{},{}", ADDR_A, ADDR_B));
	assert_eq!(event.destination, ADDR_Y);
	assert_eq!(event.amount, U256::from(50u64));
	assert_eq!(event.fees, U256::zero());

	// Only the tracked output produces an event
	assert!(timeout(Duration::from_millis(200), events.recv())
		.await
		.is_err());
}

#[tokio::test]
async fn splits_the_fee_by_output_share() {
	// Inputs worth 220 sats, outputs 150 + 50, so 20 sats of fees
	let block_tx = utxo_transaction(
		"tx-1",
		vec![utxo_input("prev-a", 0), utxo_input("prev-b", 0)],
		vec![utxo_output(ADDR_X, SATS_150, 0), utxo_output(ADDR_Y, SATS_50, 1)],
	);
	let subscriber = subscriber_with_tip_block(
		vec![block_tx],
		vec![
			("prev-a", utxo_transaction("prev-a", vec![], vec![utxo_output(ADDR_A, SATS_110, 0)])),
			("prev-b", utxo_transaction("prev-b", vec![], vec![utxo_output(ADDR_B, SATS_110, 0)])),
		],
	);
	subscriber.track_wallet(ADDR_X).unwrap();
	subscriber.track_wallet(ADDR_Y).unwrap();

	let (mut events, _errors) = subscriber.start();

	let first = timeout(Duration::from_secs(1), events.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(first.destination, ADDR_X);
	assert_eq!(first.amount, U256::from(150u64));
	assert_eq!(first.fees, U256::from(15u64));

	let second = timeout(Duration::from_secs(1), events.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(second.destination, ADDR_Y);
	assert_eq!(second.amount, U256::from(50u64));
	assert_eq!(second.fees, U256::from(5u64));
}

#[tokio::test]
async fn unresolvable_inputs_are_dropped_from_sources_and_totals() {
	let block_tx = utxo_transaction(
		"tx-1",
		vec![utxo_input("prev-a", 0), utxo_input("prev-missing", 0)],
		vec![utxo_output(ADDR_Y, SATS_100, 0)],
	);

	let mut client = MockUtxoRpc::new();
	client.expect_block_count().returning(|| Ok(100));
	client
		.expect_block_hash()
		.returning(|_| Ok("tip-hash".to_string()));
	client
		.expect_block()
		.returning(move |_| Ok(utxo_block("tip-hash", 100, vec![block_tx.clone()])));
	client
		.expect_raw_transaction()
		.with(eq("prev-a"))
		.returning(|_| {
			Ok(utxo_transaction("prev-a", vec![], vec![utxo_output(ADDR_A, SATS_100, 0)]))
		});
	client
		.expect_raw_transaction()
		.with(eq("prev-missing"))
		.returning(|_| {
			Err(wallet_tracker::services::subscriber::SubscriberError::request_error(
				"transaction not found",
			))
		});

	let subscriber = UtxoSubscriber::with_client(client, 99);
	subscriber.track_wallet(ADDR_Y).unwrap();

	let (mut events, _errors) = subscriber.start();
	let event = timeout(Duration::from_secs(1), events.recv())
		.await
		.unwrap()
		.unwrap();

	// Only the resolvable input contributes an address
	assert_eq!(event.source, ADDR_A);
	assert_eq!(event.amount, U256::from(100u64));
	assert_eq!(event.fees, U256::zero());
}

#[tokio::test]
async fn coinbase_rewards_have_no_source() {
	let coinbase_tx = UtxoTransaction {
		txid: "coinbase".to_string(),
		vin: vec![Default::default()],
		vout: vec![utxo_output(ADDR_Y, SATS_100, 0)],
	};
	let subscriber = subscriber_with_tip_block(vec![coinbase_tx], vec![]);
	subscriber.track_wallet(ADDR_Y).unwrap();

	let (mut events, _errors) = subscriber.start();
	let event = timeout(Duration::from_secs(1), events.recv())
		.await
		.unwrap()
		.unwrap();

	assert_eq!(event.source, "");
	assert_eq!(event.destination, ADDR_Y);
	assert_eq!(event.amount, U256::from(100u64));
}

#[tokio::test]
async fn reports_tip_query_failures_and_keeps_polling() {
	let mut client = MockUtxoRpc::new();
	client
		.expect_block_count()
		.returning(|| {
			Err(wallet_tracker::services::subscriber::SubscriberError::request_error(
				"connection reset",
			))
		});

	let subscriber = UtxoSubscriber::with_client(client, 99);
	let (_events, mut errors) = subscriber.start();

	let error = timeout(Duration::from_secs(1), errors.recv())
		.await
		.unwrap()
		.unwrap();
	assert!(error.to_string().contains("failed to get block count"));
}
