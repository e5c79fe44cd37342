pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Auction, AuctionStatus, BankInfo, Decimal, PartnerAccount, PartnerStatus, RewardTable, TimeMs,
    UserId,
};
pub use error::AppError;
pub use orchestration::{AuctionService, PartnerService, PartnerSettings, ServiceError};
pub use session::{HttpSessionResolver, Identity, SessionResolver, StaticSessionResolver};
