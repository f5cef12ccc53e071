//! End-to-end flows through the public store API.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use kotoba_engine::{
    EconomyClock, JsonFileVault, MAX_HEARTS, MemoryVault, ProgressionError, ProgressionStore,
    StageStatus, stats, unlock,
};
use learner_utils::challenge_path::find_unit;
use learner_utils::{CardDraft, CardKind, Category, DeckDraft, GeneratedDeck, Level};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn kana_card(front: &str, back: &str) -> CardDraft {
    CardDraft {
        front: front.to_string(),
        back: back.to_string(),
        reading: None,
        kind: CardKind::Recognition,
        level: Level::N5,
    }
}

fn open_memory_store(now: DateTime<Utc>) -> ProgressionStore {
    ProgressionStore::open("hana", MemoryVault::default(), now).unwrap()
}

#[test]
fn test_mastering_cards_moves_the_completion_percent() {
    init_logging();
    let mut store = open_memory_store(Utc::now());

    let deck = store.add_deck(DeckDraft {
        title: "Kana Basics".to_string(),
        category: Category::Kana,
        level: Level::N5,
    });
    for (front, back) in [("か", "ka"), ("き", "ki"), ("く", "ku")] {
        store.add_card(deck, kana_card(front, back)).unwrap();
    }
    assert_eq!(stats::deck_completion(store.state(), deck), Some(0));

    store.set_mastered_count(deck, 2).unwrap();
    assert_eq!(
        stats::deck_completion(store.state(), deck),
        Some(67),
        "2 of 3 rounds half up"
    );

    // deleting a card re-derives the total and clamps progress to it
    let second_card = store.state().deck(deck).unwrap().cards[1].id;
    store.delete_card(deck, second_card).unwrap();
    let stat = store.state().deck_stat(deck).unwrap();
    assert_eq!((stat.progress, stat.total), (2, 2));
    assert_eq!(stats::deck_completion(store.state(), deck), Some(100));
}

#[test]
fn test_buying_hearts_back_with_diamonds() {
    init_logging();
    let now = Utc::now();
    let mut store = open_memory_store(now);

    store.add_diamonds(10);
    assert_eq!(store.state().diamonds, 20);
    store.lose_heart(now);
    store.lose_heart(now);
    assert_eq!(store.state().hearts, 3);

    assert!(store.purchase_hearts(2, 15));
    assert_eq!(store.state().diamonds, 5);
    assert_eq!(store.state().hearts, MAX_HEARTS);
    assert_eq!(store.state().last_heart_loss, None);

    assert!(!store.purchase_hearts(1, 5), "already at the cap");
    assert_eq!(store.state().diamonds, 5);
}

#[test]
fn test_challenge_stages_unlock_in_play_order() {
    init_logging();
    let mut store = open_memory_store(Utc::now());
    let unit = find_unit(Level::N5, "unit-1").unwrap();

    let statuses = unlock::unit_statuses(&store.state().challenge_progress, Level::N5, unit);
    assert_eq!(statuses[0], ("stage-1", StageStatus::Active));

    let skipped = store.complete_challenge_stage(Level::N5, "unit-1", "stage-3");
    assert!(matches!(skipped, Err(ProgressionError::StageLocked { .. })));

    assert_eq!(
        store.complete_challenge_stage(Level::N5, "unit-1", "stage-1"),
        Ok(true)
    );
    assert_eq!(
        store.complete_challenge_stage(Level::N5, "unit-1", "stage-1"),
        Ok(false),
        "re-completion is quiet"
    );
    assert_eq!(
        store.complete_challenge_stage(Level::N5, "unit-1", "stage-2"),
        Ok(true)
    );

    let statuses = unlock::unit_statuses(&store.state().challenge_progress, Level::N5, unit);
    assert_eq!(statuses[2], ("stage-3", StageStatus::Active));

    let unknown = store.complete_challenge_stage(Level::N5, "unit-9", "stage-1");
    assert!(matches!(
        unknown,
        Err(ProgressionError::UnknownChallengeStage { .. })
    ));
}

#[test]
fn test_document_survives_a_reload() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let session_one = now - chrono::Duration::minutes(40);

    let deck;
    {
        let vault = JsonFileVault::new(dir.path()).unwrap();
        let mut store = ProgressionStore::open("hana", vault, session_one).unwrap();
        deck = store.add_deck(DeckDraft {
            title: "Food stalls".to_string(),
            category: Category::Vocabulary,
            level: Level::N5,
        });
        store
            .complete_challenge_stage(Level::N5, "unit-1", "stage-1")
            .unwrap();
        store.lose_heart(session_one);
        assert_eq!(store.state().hearts, 4);
    }

    let vault = JsonFileVault::new(dir.path()).unwrap();
    let store = ProgressionStore::open("hana", vault, now).unwrap();

    assert!(store.state().deck(deck).is_some());
    assert_eq!(
        store
            .state()
            .challenge_progress
            .stored(Level::N5, "unit-1", "stage-1"),
        Some(StageStatus::Completed)
    );
    // the heart lost 40 minutes ago regenerated during open
    assert_eq!(store.state().hearts, MAX_HEARTS);
    assert_eq!(store.state().last_heart_loss, None);
}

#[tokio::test(start_paused = true)]
async fn test_clock_converges_after_a_long_absence() {
    init_logging();
    let away_since = Utc::now() - chrono::Duration::minutes(65);
    let mut store = ProgressionStore::open("hana", MemoryVault::default(), away_since).unwrap();
    store.lose_heart(away_since);
    store.lose_heart(away_since);
    assert_eq!(store.state().hearts, 3);

    let shared = store.into_shared();
    let _clock = EconomyClock::spawn(shared.clone());
    tokio::time::sleep(Duration::from_secs(5)).await;

    let store = shared.lock().await;
    assert_eq!(
        store.state().hearts,
        MAX_HEARTS,
        "two full intervals elapsed, capped at five"
    );
    assert_eq!(store.state().last_heart_loss, None);
}

#[tokio::test(start_paused = true)]
async fn test_disposed_clock_grants_nothing() {
    init_logging();
    let long_ago = Utc::now() - chrono::Duration::minutes(65);
    let store = ProgressionStore::open("hana", MemoryVault::default(), long_ago).unwrap();
    let shared = store.into_shared();

    let clock = EconomyClock::spawn(shared.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;
    clock.dispose();

    {
        let mut store = shared.lock().await;
        store.lose_heart(long_ago);
        store.lose_heart(long_ago);
        assert_eq!(store.state().hearts, 3, "both hearts long overdue");
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    let store = shared.lock().await;
    assert_eq!(store.state().hearts, 3, "a disposed clock grants nothing");
}

#[test]
fn test_generated_content_lands_with_fresh_ids() {
    init_logging();
    let mut store = open_memory_store(Utc::now());

    let mut existing: BTreeSet<u64> = BTreeSet::new();
    for deck in &store.state().decks {
        existing.insert(deck.id.0);
        existing.extend(deck.cards.iter().map(|card| card.id.0));
    }

    let deck = store.import_generated_deck(GeneratedDeck {
        title: "Weather small talk".to_string(),
        category: Category::Vocabulary,
        level: Level::N4,
        cards: vec![kana_card("あつい", "hot"), kana_card("さむい", "cold")],
    });

    let imported = store.state().deck(deck).unwrap();
    assert!(!existing.contains(&deck.0));
    for card in &imported.cards {
        assert!(!existing.contains(&card.id.0));
    }

    let stat = store.state().deck_stat(deck).unwrap();
    assert_eq!((stat.progress, stat.total), (0, 2));
}
