use timetable::config::FirestoreConfig;
use timetable::firestore::FirestoreStore;
use timetable::models::{Period, ScheduleEntry, ScheduleFilter, SessionType};
use timetable::store::ScheduleStore;

fn live_store() -> FirestoreStore {
    dotenvy::dotenv().ok();
    let config = FirestoreConfig::new_from_env().expect("Failed to load Firestore config");
    FirestoreStore::new(config).expect("Failed to create Firestore client")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_insert_then_exists_against_firestore() {
    let store = live_store();

    // period 5 on a far-future date keeps this away from real timetables
    let entry = ScheduleEntry::new(
        chrono::NaiveDate::from_ymd_opt(2099, 1, 1).unwrap(),
        format!("it-{}", chrono::Utc::now().timestamp()),
        "Toán",
        Period::new(5).unwrap(),
        SessionType::Study,
    );

    let id = store.upsert_schedule(&entry, None).await.expect("create");
    println!("Created schedule {}", id);

    let check = store
        .schedule_exists(entry.date, &entry.class_id, entry.period)
        .await
        .expect("exists");
    assert!(check.exists);
    assert_eq!(check.id.as_deref(), Some(id.as_str()));

    let updated = ScheduleEntry {
        session_type: SessionType::Exam,
        ..entry.clone()
    };
    store.upsert_schedule(&updated, Some(&id)).await.expect("update");

    let filter = ScheduleFilter {
        class_id: Some(entry.class_id.clone()),
        month: Some("2099-01".parse().unwrap()),
    };
    let listed = store.list_schedules(&filter).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_type, SessionType::Exam);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_fetch_classes_from_firestore() {
    let store = live_store();
    store.ping().await.expect("ping");

    let classes = store.list_classes().await.expect("Failed to fetch classes");
    for class in &classes {
        println!("ID: {}, Name: {}", class.id, class.name);
    }
    assert!(!classes.is_empty(), "No classes found");
}
