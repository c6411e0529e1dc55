use std::sync::{Arc, Mutex};
use taskmate_core::gateway::TASKS_KEY;
use taskmate_core::{
    Category, InMemoryGateway, PersistPolicy, PersistenceGateway, SqliteGateway, StoreError,
    Task, TaskListQuery, TaskStore,
};

fn memory_store(policy: PersistPolicy) -> (Arc<InMemoryGateway>, TaskStore) {
    let gateway = Arc::new(InMemoryGateway::new());
    let store = TaskStore::new(gateway.clone(), policy);
    (gateway, store)
}

#[tokio::test]
async fn create_defaults_to_open_task_with_fresh_id() {
    let (gateway, store) = memory_store(PersistPolicy::Optimistic);

    let first = store.create("  Buy milk ", Category::Shopping).await.unwrap();
    let second = store.create("Call mom", Category::default()).await.unwrap();

    assert_eq!(first.title, "Buy milk");
    assert!(!first.completed);
    assert_eq!(second.category, Category::Personal);
    assert_ne!(first.id, second.id);
    assert!(first.created_at.ends_with('Z'));

    let ids: Vec<_> = store.list().into_iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![first.id.clone(), second.id.clone()]);
    assert_eq!(gateway.write_count(), 2);
}

#[tokio::test]
async fn create_rejects_blank_title_without_touching_gateway() {
    let (gateway, store) = memory_store(PersistPolicy::Optimistic);

    let err = store.create(" \t ", Category::Work).await.unwrap_err();
    assert!(err.is_validation());
    assert!(store.is_empty());
    assert_eq!(gateway.write_count(), 0);
    assert_eq!(gateway.peek(TASKS_KEY), None);
}

#[tokio::test]
async fn toggle_twice_restores_original_state() {
    let (_gateway, store) = memory_store(PersistPolicy::Optimistic);
    let task = store.create("Stretch", Category::Health).await.unwrap();

    let toggled = store.toggle_completion(&task.id).await.unwrap().unwrap();
    assert!(toggled.completed);
    let restored = store.toggle_completion(&task.id).await.unwrap().unwrap();
    assert!(!restored.completed);
    assert_eq!(restored, task);
}

#[tokio::test]
async fn edit_replaces_title_and_keeps_other_fields() {
    let (_gateway, store) = memory_store(PersistPolicy::Optimistic);
    let task = store.create("Draft report", Category::Work).await.unwrap();

    let edited = store.edit(&task.id, " Final report ").await.unwrap().unwrap();
    assert_eq!(edited.title, "Final report");
    assert_eq!(edited.id, task.id);
    assert_eq!(edited.category, Category::Work);
    assert_eq!(edited.created_at, task.created_at);

    let err = store.edit(&task.id, "").await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get(&task.id).unwrap().title, "Final report");
}

#[tokio::test]
async fn delete_removes_one_and_keeps_order() {
    let (_gateway, store) = memory_store(PersistPolicy::Optimistic);
    let a = store.create("a", Category::Other).await.unwrap();
    let b = store.create("b", Category::Other).await.unwrap();
    let c = store.create("c", Category::Other).await.unwrap();

    let removed = store.delete(&b.id).await.unwrap().unwrap();
    assert_eq!(removed.id, b.id);
    assert_eq!(store.len(), 2);
    let ids: Vec<_> = store.list().into_iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![a.id, c.id]);

    assert_eq!(store.delete(&b.id).await.unwrap(), None);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn persisted_collection_reloads_into_fresh_store() {
    let gateway = Arc::new(InMemoryGateway::new());
    let store = TaskStore::new(gateway.clone(), PersistPolicy::Optimistic);
    let milk = store.create("Buy milk", Category::Shopping).await.unwrap();
    store.create("Run", Category::Health).await.unwrap();
    store.toggle_completion(&milk.id).await.unwrap();

    let reloaded = TaskStore::new(gateway, PersistPolicy::Optimistic);
    assert_eq!(reloaded.load().await.unwrap(), 2);
    assert_eq!(reloaded.list(), store.list());
}

#[tokio::test]
async fn buy_milk_lifecycle_ends_with_key_absent() {
    let (gateway, store) = memory_store(PersistPolicy::Optimistic);
    assert_eq!(store.load().await.unwrap(), 0);

    let task = store.create("Buy milk", Category::Shopping).await.unwrap();
    let stored = gateway.peek(TASKS_KEY).unwrap();
    assert!(stored.contains("\"createdAt\""));
    assert!(stored.contains("\"Shopping\""));

    store.toggle_completion(&task.id).await.unwrap();
    assert!(gateway.peek(TASKS_KEY).unwrap().contains("\"completed\":true"));

    store.delete(&task.id).await.unwrap();
    assert_eq!(gateway.peek(TASKS_KEY).as_deref(), Some("[]"));

    store.create("Buy bread", Category::Shopping).await.unwrap();
    assert_eq!(store.clear_all().await.unwrap(), 1);
    assert!(store.is_empty());
    assert_eq!(gateway.peek(TASKS_KEY), None);
}

#[tokio::test]
async fn optimistic_failure_keeps_in_memory_change() {
    let (gateway, store) = memory_store(PersistPolicy::Optimistic);
    gateway.set_failing(true);

    let err = store.create("Offline task", Category::Work).await.unwrap_err();
    assert!(err.is_persistence());
    assert!(matches!(err, StoreError::Persistence { key: "tasks", .. }));
    assert_eq!(store.len(), 1);

    gateway.set_failing(false);
    assert_eq!(gateway.peek(TASKS_KEY), None);
}

#[tokio::test]
async fn write_ahead_failure_leaves_state_untouched() {
    let (gateway, store) = memory_store(PersistPolicy::WriteAhead);
    let task = store.create("Keep me", Category::Work).await.unwrap();

    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let _subscription = store.subscribe(move |_| *counter.lock().unwrap() += 1);

    gateway.set_failing(true);
    assert!(store.toggle_completion(&task.id).await.unwrap_err().is_persistence());
    assert!(store.delete(&task.id).await.unwrap_err().is_persistence());

    assert_eq!(store.list(), vec![task]);
    assert_eq!(*seen.lock().unwrap(), 0);
}

#[tokio::test]
async fn subscribers_see_each_commit_until_unsubscribed() {
    let (_gateway, store) = memory_store(PersistPolicy::Optimistic);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let subscription = store.subscribe(move |tasks| sink.lock().unwrap().push(tasks.len()));
    assert_eq!(store.subscriber_count(), 1);

    let task = store.create("a", Category::Work).await.unwrap();
    store.create("b", Category::Work).await.unwrap();
    store.toggle_completion("missing").await.unwrap();
    store.delete(&task.id).await.unwrap();

    subscription.unsubscribe();
    assert_eq!(store.subscriber_count(), 0);
    store.clear_all().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1]);
}

#[tokio::test]
async fn query_filters_live_collection() {
    let (_gateway, store) = memory_store(PersistPolicy::Optimistic);
    let work = store.create("Ship", Category::Work).await.unwrap();
    store.create("Groceries", Category::Shopping).await.unwrap();
    store.toggle_completion(&work.id).await.unwrap();

    let done_work = store.query(&TaskListQuery {
        category: Some(Category::Work),
        completed: Some(true),
    });
    assert_eq!(done_work.len(), 1);
    assert_eq!(done_work[0].id, work.id);

    let open = store.query(&TaskListQuery {
        completed: Some(false),
        ..TaskListQuery::default()
    });
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].category, Category::Shopping);
}

fn stored_titles(gateway: &InMemoryGateway) -> Vec<String> {
    let raw = gateway.peek(TASKS_KEY).expect("tasks key present");
    let tasks: Vec<Task> = serde_json::from_str(&raw).unwrap();
    tasks.into_iter().map(|task| task.title).collect()
}

#[tokio::test]
async fn load_repairs_colliding_legacy_ids_without_losing_tasks() {
    let raw = r#"[
        {"id":"1714555800000","title":"Buy milk","category":"Shopping","completed":false,"createdAt":"2024-05-01T09:30:00.000Z"},
        {"id":"1714555800000","title":"Call mom","category":"Personal","completed":true,"createdAt":"2024-05-01T09:30:00.000Z"},
        {"id":"1714555900000","title":"Run","category":"Health","completed":false,"createdAt":"2024-05-01T09:31:40.000Z"}
    ]"#;
    let gateway = Arc::new(InMemoryGateway::with_entries([(TASKS_KEY, raw)]));
    let store = TaskStore::new(gateway.clone(), PersistPolicy::Optimistic);

    assert_eq!(store.load().await.unwrap(), 3);
    assert_eq!(store.load_failure(), None);
    let loaded = store.list();
    assert_eq!(loaded[0].id, "1714555800000");
    assert_ne!(loaded[1].id, "1714555800000");
    assert_eq!(loaded[2].id, "1714555900000");

    store.create("New", Category::Other).await.unwrap();
    assert_eq!(
        stored_titles(&gateway),
        vec!["Buy milk", "Call mom", "Run", "New"]
    );

    let reloaded = TaskStore::new(gateway, PersistPolicy::Optimistic);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.list()[1].id, loaded[1].id);
}

#[tokio::test]
async fn failed_load_blocks_writes_until_cleared() {
    let raw = r#"[
        {"id":"1","title":"Keep me","category":"Work","completed":false,"createdAt":"2024-05-01T09:30:00.000Z"},
        {"id":"2","title":"   ","category":"Work","completed":false,"createdAt":"2024-05-01T09:30:00.000Z"}
    ]"#;
    let gateway = Arc::new(InMemoryGateway::with_entries([(TASKS_KEY, raw)]));
    let store = TaskStore::new(gateway.clone(), PersistPolicy::Optimistic);

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { key: "tasks", .. }));
    assert!(store.is_empty());
    assert!(store.load_failure().is_some());

    let blocked = store.create("New", Category::Other).await.unwrap_err();
    assert!(matches!(blocked, StoreError::InvalidData { key: "tasks", .. }));
    assert!(store.toggle_completion("1").await.is_err());
    assert!(store.is_empty());
    assert_eq!(gateway.peek(TASKS_KEY).as_deref(), Some(raw));
    assert_eq!(gateway.write_count(), 0);

    assert_eq!(store.clear_all().await.unwrap(), 0);
    assert_eq!(store.load_failure(), None);
    store.create("Fresh start", Category::Other).await.unwrap();
    assert_eq!(stored_titles(&gateway), vec!["Fresh start"]);
}

#[tokio::test]
async fn gateway_failure_on_load_blocks_writes_until_reload() {
    let (gateway, store) = memory_store(PersistPolicy::Optimistic);
    gateway.set_failing(true);
    assert!(store.load().await.unwrap_err().is_persistence());

    gateway.set_failing(false);
    assert!(store.create("Too early", Category::Work).await.is_err());
    assert_eq!(gateway.write_count(), 0);

    assert_eq!(store.load().await.unwrap(), 0);
    store.create("Now", Category::Work).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn optimistic_clear_all_failure_empties_memory_and_reports() {
    let (gateway, store) = memory_store(PersistPolicy::Optimistic);
    store.create("a", Category::Work).await.unwrap();
    store.create("b", Category::Work).await.unwrap();

    gateway.set_failing(true);
    let err = store.clear_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence { key: "tasks", .. }));
    assert!(store.is_empty());

    gateway.set_failing(false);
    assert_eq!(stored_titles(&gateway), vec!["a", "b"]);
}

#[tokio::test]
async fn write_ahead_clear_all_failure_keeps_tasks_and_key() {
    let (gateway, store) = memory_store(PersistPolicy::WriteAhead);
    store.create("a", Category::Work).await.unwrap();
    store.create("b", Category::Work).await.unwrap();

    gateway.set_failing(true);
    let err = store.clear_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence { key: "tasks", .. }));
    assert_eq!(store.len(), 2);

    gateway.set_failing(false);
    assert!(gateway.peek(TASKS_KEY).is_some());
    assert_eq!(stored_titles(&gateway), vec!["a", "b"]);
}

#[tokio::test]
async fn load_notifies_subscribers_with_stored_collection() {
    let raw = r#"[{"id":"1","title":"Buy milk","category":"Shopping","completed":false,"createdAt":"2024-05-01T09:30:00.000Z"}]"#;
    let gateway = Arc::new(InMemoryGateway::with_entries([(TASKS_KEY, raw)]));
    let store = TaskStore::new(gateway, PersistPolicy::Optimistic);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = store.subscribe(move |tasks| {
        sink.lock()
            .unwrap()
            .extend(tasks.iter().map(|task| task.id.clone()));
    });

    store.load().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["1".to_string()]);
}

#[tokio::test]
async fn concurrent_creates_are_all_persisted() {
    let gateway = Arc::new(InMemoryGateway::new());
    let store = Arc::new(TaskStore::new(gateway.clone(), PersistPolicy::Optimistic));

    let mut handles = Vec::new();
    for index in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create(&format!("task {index}"), Category::Other)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reloaded = TaskStore::new(gateway, PersistPolicy::Optimistic);
    assert_eq!(reloaded.load().await.unwrap(), 16);
}

#[tokio::test]
async fn sqlite_gateway_round_trips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskmate.sqlite3");

    let created = {
        let gateway = Arc::new(SqliteGateway::open(&path).unwrap());
        let store = TaskStore::new(gateway, PersistPolicy::WriteAhead);
        store.create("Durable", Category::Personal).await.unwrap()
    };

    let gateway: Arc<dyn PersistenceGateway> = Arc::new(SqliteGateway::open(&path).unwrap());
    let store = TaskStore::new(gateway, PersistPolicy::WriteAhead);
    assert_eq!(store.load().await.unwrap(), 1);
    assert_eq!(store.get(&created.id), Some(created));
}
