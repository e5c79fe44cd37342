use rust_decimal_macros::dec;
use shuttle_market::db::init_db;
use shuttle_market::domain::{Auction, AuctionStatus, NewAuction};
use shuttle_market::engine::{auction, partner_ledger, AmountRules, LedgerPolicy};
use shuttle_market::{BankInfo, Decimal, PartnerAccount, Repository, RewardTable, TimeMs, UserId};
use tempfile::TempDir;

const T0: i64 = 1_700_000_000_000;

async fn setup_repo() -> (Repository, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Repository::new(pool), temp_dir)
}

fn approved_account() -> PartnerAccount {
    let mut account = PartnerAccount::pending(UserId::new("alice"), "SMASH".to_string(), TimeMs::new(T0));
    partner_ledger::approve(&mut account, Decimal::new(dec!(0.1)), TimeMs::new(T0)).unwrap();
    account
}

#[tokio::test]
async fn test_partner_round_trip_with_logs() {
    let (repo, _temp) = setup_repo().await;
    let policy = LedgerPolicy::default();
    let mut account = approved_account();

    let mut tx = repo.begin().await.unwrap();
    Repository::insert_partner(&mut tx, &account).await.unwrap();

    partner_ledger::record_sale(&mut account, Decimal::new(dec!(12345.67)), &policy).unwrap();
    let claim = partner_ledger::claim_reward(&mut account, &RewardTable::default(), 1, TimeMs::new(T0 + 1)).unwrap();
    let bank = BankInfo {
        bank_name: "SCB".to_string(),
        account_number: "42".to_string(),
        account_name: "Alice".to_string(),
    };
    let withdrawal = partner_ledger::request_withdrawal(
        &mut account,
        Decimal::from(500),
        bank.clone(),
        &policy,
        TimeMs::new(T0 + 2),
    )
    .unwrap();

    Repository::insert_reward_claim(&mut tx, &account.user_id, &claim).await.unwrap();
    Repository::insert_withdrawal(&mut tx, &account.user_id, &withdrawal).await.unwrap();
    assert!(Repository::save_partner(&mut tx, &account).await.unwrap());
    tx.commit().await.unwrap();

    let loaded = repo.get_partner(&UserId::new("alice")).await.unwrap().unwrap();
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.total_sales, Decimal::new(dec!(12345.67)));
    // Commission 1234.567 rounds to 1234.57, plus the 300 level reward.
    assert_eq!(loaded.total_commission, Decimal::new(dec!(1534.57)));
    assert_eq!(loaded.available_commission, Decimal::new(dec!(1034.57)));
    assert_eq!(loaded.paid_commission, Decimal::from(500));
    assert!(loaded.claimed_levels.contains(&1));
    assert_eq!(loaded.reward_claims.len(), 1);
    assert_eq!(loaded.withdrawals[0].bank_info, bank);
    assert_eq!(loaded.last_bank_info, Some(bank));
    assert_eq!(loaded.discount_codes[0].code, "SMASH10");
    assert!(loaded.commission_balanced());
}

#[tokio::test]
async fn test_stale_partner_write_is_rejected() {
    let (repo, _temp) = setup_repo().await;
    let account = approved_account();

    let mut tx = repo.begin().await.unwrap();
    Repository::insert_partner(&mut tx, &account).await.unwrap();
    tx.commit().await.unwrap();

    let mut first = repo.get_partner(&account.user_id).await.unwrap().unwrap();
    let mut second = first.clone();
    first.partner_points = Decimal::from(10);
    second.partner_points = Decimal::from(20);

    let mut tx = repo.begin().await.unwrap();
    assert!(Repository::save_partner(&mut tx, &first).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = repo.begin().await.unwrap();
    assert!(!Repository::save_partner(&mut tx, &second).await.unwrap());
    drop(tx);

    let loaded = repo.get_partner(&account.user_id).await.unwrap().unwrap();
    assert_eq!(loaded.partner_points, Decimal::from(10));
}

#[tokio::test]
async fn test_duplicate_sale_reference_is_ignored() {
    let (repo, _temp) = setup_repo().await;
    let mut account = approved_account();
    let credit = partner_ledger::record_sale(&mut account, Decimal::from(100), &LedgerPolicy::default()).unwrap();

    let mut tx = repo.begin().await.unwrap();
    Repository::insert_partner(&mut tx, &account).await.unwrap();
    assert!(Repository::insert_sale(&mut tx, &account.user_id, "ord-9", &credit, TimeMs::new(T0)).await.unwrap());
    assert!(!Repository::insert_sale(&mut tx, &account.user_id, "ord-9", &credit, TimeMs::new(T0)).await.unwrap());
    tx.commit().await.unwrap();

    let mut conn = repo.begin().await.unwrap();
    assert_eq!(
        Repository::sale_owner(&mut conn, "ord-9").await.unwrap(),
        Some(account.user_id.clone())
    );
    assert_eq!(Repository::sale_owner(&mut conn, "ord-missing").await.unwrap(), None);
    conn.rollback().await.unwrap();

    assert_eq!(repo.sum_recorded_sales(&account.user_id).await.unwrap(), Decimal::from(100));
}

fn new_auction(end_offset: i64) -> Auction {
    auction::create(
        NewAuction {
            title: "Feather shuttles".to_string(),
            description: "Dozen".to_string(),
            start_price: Decimal::from(50),
            bid_increment: Decimal::from(5),
            reserve_price: Some(Decimal::from(80)),
            start_time: TimeMs::new(T0),
            end_time: TimeMs::new(T0 + end_offset),
        },
        &AmountRules::default(),
        TimeMs::new(T0),
    )
    .unwrap()
}

#[tokio::test]
async fn test_auction_round_trip_and_due_listing() {
    let (repo, _temp) = setup_repo().await;

    let mut tx = repo.begin().await.unwrap();
    let mut early = new_auction(1_000);
    early.id = Repository::insert_auction(&mut tx, &early).await.unwrap();
    let mut late = new_auction(10_000);
    late.id = Repository::insert_auction(&mut tx, &late).await.unwrap();

    let receipt = auction::place_bid(
        &mut early,
        UserId::new("bob"),
        Decimal::from(55),
        &AmountRules::default(),
        TimeMs::new(T0 + 10),
    ).unwrap();
    Repository::append_winning_bid(&mut tx, &receipt.bid).await.unwrap();
    assert!(Repository::save_auction(&mut tx, &early).await.unwrap());
    tx.commit().await.unwrap();

    let loaded = repo.get_auction(early.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, AuctionStatus::Active);
    assert_eq!(loaded.current_price, Decimal::from(55));
    assert_eq!(loaded.reserve_price, Some(Decimal::from(80)));
    assert_eq!(loaded.bids.len(), 1);
    assert!(loaded.bids[0].is_winning);
    assert_eq!(loaded.version, 1);

    assert_eq!(repo.due_auction_ids(TimeMs::new(T0 + 1_000)).await.unwrap(), vec![early.id]);
    assert_eq!(
        repo.due_auction_ids(TimeMs::new(T0 + 10_000)).await.unwrap(),
        vec![early.id, late.id]
    );
    assert_eq!(repo.list_auctions().await.unwrap().len(), 2);
    assert!(repo.get_auction(999).await.unwrap().is_none());
}
