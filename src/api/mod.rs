//! Administrative HTTP surface.
//!
//! Exposes wallet registration over HTTP: `POST /tracked-wallets` starts
//! tracking, `DELETE /tracked-wallets` stops. A request can carry one wallet
//! per chain; they are applied in a fixed order (EVM, UTXO, slot) and the
//! first failure aborts the remainder of the request.

use std::sync::Arc;

use actix_web::{dev::Server, web, App, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use tracing::{error, info};

use crate::{models::ChainName, services::subscriber::SubscriberManager};

/// Wallet registration request. Empty fields mean "no action for that
/// chain".
#[derive(Debug, Clone, Deserialize)]
pub struct TrackedWalletsRequest {
	#[serde(default)]
	pub user_id: i64,
	#[serde(default)]
	pub ethereum_wallet: String,
	#[serde(default)]
	pub bitcoin_wallet: String,
	#[serde(default)]
	pub solana_wallet: String,
}

impl TrackedWalletsRequest {
	/// Wallet fields paired with their chain, in application order.
	fn wallets_by_chain(&self) -> [(&str, ChainName); 3] {
		[
			(self.ethereum_wallet.as_str(), ChainName::EvmMainnet),
			(self.bitcoin_wallet.as_str(), ChainName::UtxoMainnet),
			(self.solana_wallet.as_str(), ChainName::SlotMainnet),
		]
	}
}

async fn track_wallets(
	manager: web::Data<Arc<SubscriberManager>>,
	body: web::Bytes,
) -> impl Responder {
	let request: TrackedWalletsRequest = match serde_json::from_slice(&body) {
		Ok(request) => request,
		Err(e) => {
			error!(error = %e, "failed to parse request");
			return HttpResponse::BadRequest().body("failed to parse request");
		}
	};

	for (wallet, chain) in request.wallets_by_chain() {
		if wallet.is_empty() {
			continue;
		}
		if let Err(e) = manager.track_wallet(wallet, chain) {
			error!(chain = %chain, error = %e, "failed to track wallet");
			return HttpResponse::BadRequest()
				.body(format!("failed to register wallet tracking for {}", chain));
		}
		info!(
			chain = %chain,
			wallet,
			user_id = request.user_id,
			"registered wallet for tracking"
		);
	}

	HttpResponse::Ok().body("OK")
}

async fn untrack_wallets(
	manager: web::Data<Arc<SubscriberManager>>,
	body: web::Bytes,
) -> impl Responder {
	let request: TrackedWalletsRequest = match serde_json::from_slice(&body) {
		Ok(request) => request,
		Err(e) => {
			error!(error = %e, "failed to parse request");
			return HttpResponse::BadRequest().body("failed to parse request");
		}
	};

	for (wallet, chain) in request.wallets_by_chain() {
		if wallet.is_empty() {
			continue;
		}
		if let Err(e) = manager.untrack_wallet(wallet, chain) {
			error!(chain = %chain, error = %e, "failed to untrack wallet");
			return HttpResponse::BadRequest()
				.body(format!("failed to deregister wallet tracking for {}", chain));
		}
		info!(
			chain = %chain,
			wallet,
			user_id = request.user_id,
			"deregistered wallet from tracking"
		);
	}

	HttpResponse::Ok().body("OK")
}

/// Creates the admin API server bound to `bind_address`.
///
/// # Arguments
/// * `bind_address` - `host:port` pair to listen on
/// * `manager` - subscriber manager handling the track/untrack calls
///
/// # Returns
/// * `std::io::Result<Server>` - Running server future, or the bind error
pub fn create_api_server(
	bind_address: String,
	manager: Arc<SubscriberManager>,
) -> std::io::Result<Server> {
	info!(bind_address = %bind_address, "starting http api server");

	Ok(HttpServer::new(move || {
		App::new()
			.app_data(web::Data::new(manager.clone()))
			.route("/tracked-wallets", web::post().to(track_wallets))
			.route("/tracked-wallets", web::delete().to(untrack_wallets))
	})
	.workers(2)
	.bind(bind_address)?
	.shutdown_timeout(5)
	.run())
}
