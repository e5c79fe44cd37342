pub mod admin;
pub mod auctions;
pub mod auth;
pub mod health;
pub mod partners;

use crate::clock::Clock;
use crate::db::Repository;
use crate::orchestration::{AuctionService, PartnerService};
use crate::session::SessionResolver;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub partners: PartnerService,
    pub auctions: AuctionService,
    pub sessions: Arc<dyn SessionResolver>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        partners: PartnerService,
        auctions: AuctionService,
        sessions: Arc<dyn SessionResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            partners,
            auctions,
            sessions,
            clock,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/partner/levels", get(partners::get_levels))
        .route("/partner/apply", post(partners::apply))
        .route("/partner/me", get(partners::get_me))
        .route("/partner/claim", post(partners::claim))
        .route("/partner/withdraw", post(partners::withdraw))
        .route("/auctions", get(auctions::list_auctions))
        .route("/auctions/:id", get(auctions::get_auction))
        .route("/auctions/:id/bid", post(auctions::place_bid))
        .route("/admin/partners/:user_id/approve", post(admin::approve_partner))
        .route("/admin/partners/:user_id/reject", post(admin::reject_partner))
        .route("/admin/partners/:user_id/sales", post(admin::record_sale))
        .route("/admin/withdrawals/:id/settle", post(admin::settle_withdrawal))
        .route("/admin/auctions", post(admin::create_auction))
        .route("/admin/auctions/:id/finalize", post(admin::finalize_auction))
        .route("/admin/auctions/:id/cancel", post(admin::cancel_auction))
        .layer(cors)
        .with_state(state)
}
