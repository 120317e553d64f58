use rusqlite::Connection;
use taskweave_core::db::migrations::latest_version;
use taskweave_core::db::open_db_in_memory;
use taskweave_core::{OwnerId, PersistenceError, SqliteTaskStore, TaskDraft, TaskPatch, TaskStore};
use uuid::Uuid;

fn new_owner() -> OwnerId {
    OwnerId::new(Uuid::new_v4())
}

#[tokio::test]
async fn insert_assigns_ids_and_owner() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let owner = new_owner();

    let first = store.insert(owner, &TaskDraft::new(" Pay rent ")).await.unwrap();
    let second = store.insert(owner, &TaskDraft::new("Book dentist")).await.unwrap();

    assert!(second.id > first.id);
    assert_eq!(first.text, "Pay rent");
    assert_eq!(first.owner_id, Some(owner));
    assert!(first.is_active());

    let active = store.load_active(owner).await.unwrap();
    assert_eq!(active, vec![first, second]);
}

#[tokio::test]
async fn owners_never_see_each_others_rows() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let alice = new_owner();
    let bob = new_owner();

    let task = store.insert(alice, &TaskDraft::new("Alice only")).await.unwrap();

    assert!(store.load_active(bob).await.unwrap().is_empty());
    assert!(matches!(
        store.mark_completed(task.id, bob, 1).await,
        Err(PersistenceError::NotFound(_))
    ));
    let patch = TaskPatch {
        text: Some("hijacked".to_string()),
        ..TaskPatch::default()
    };
    assert!(matches!(
        store.update(task.id, bob, &patch).await,
        Err(PersistenceError::NotFound(_))
    ));

    let active = store.load_active(alice).await.unwrap();
    assert_eq!(active, vec![task]);
}

#[tokio::test]
async fn completed_rows_load_most_recent_first() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let owner = new_owner();

    let a = store.insert(owner, &TaskDraft::new("A")).await.unwrap();
    let b = store.insert(owner, &TaskDraft::new("B")).await.unwrap();
    let c = store.insert(owner, &TaskDraft::new("C")).await.unwrap();
    store.mark_completed(a.id, owner, 100).await.unwrap();
    store.mark_completed(c.id, owner, 300).await.unwrap();
    store.mark_completed(b.id, owner, 200).await.unwrap();

    let completed = store.load_completed(owner).await.unwrap();
    let order: Vec<_> = completed.iter().map(|task| task.id).collect();
    assert_eq!(order, vec![c.id, b.id, a.id]);
    assert!(completed.iter().all(|task| task.is_completed));
    assert!(store.load_active(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_overwrites_mutable_fields_only() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let owner = new_owner();
    let task = store.insert(owner, &TaskDraft::new("Draft email")).await.unwrap();

    let patch = TaskPatch {
        text: Some("Send email".to_string()),
        enjoyment: Some(2),
        estimated_minutes: Some(5),
        is_recurring: Some(true),
        ..TaskPatch::default()
    };
    let updated = store.update(task.id, owner, &patch).await.unwrap();

    assert_eq!(updated.id, task.id);
    assert_eq!(updated.created_at, task.created_at);
    assert_eq!(updated.text, "Send email");
    assert_eq!(updated.urgency, 5);
    assert_eq!(updated.enjoyment, 2);
    assert_eq!(updated.estimated_minutes, 5);
    assert!(updated.is_recurring);
    assert_eq!(store.load_active(owner).await.unwrap(), vec![updated]);
}

#[tokio::test]
async fn update_on_completed_task_is_not_found() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let owner = new_owner();
    let task = store.insert(owner, &TaskDraft::new("Done already")).await.unwrap();
    store.mark_completed(task.id, owner, 50).await.unwrap();

    let patch = TaskPatch {
        urgency: Some(10),
        ..TaskPatch::default()
    };
    assert!(matches!(
        store.update(task.id, owner, &patch).await,
        Err(PersistenceError::NotFound(id)) if id == task.id
    ));
    let completed = store.load_completed(owner).await.unwrap();
    assert_eq!(completed[0].urgency, 5);
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_table() {
    let store = SqliteTaskStore::open_in_memory().unwrap();
    let owner = new_owner();
    let mut draft = TaskDraft::new("Too urgent");
    draft.urgency = 0;

    assert!(matches!(
        store.insert(owner, &draft).await,
        Err(PersistenceError::Validation(_))
    ));
    assert!(store.load_active(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskweave.sqlite3");
    let owner = new_owner();

    let store = SqliteTaskStore::open(&path).unwrap();
    let task = store.insert(owner, &TaskDraft::new("Persist me")).await.unwrap();
    drop(store);

    let reopened = SqliteTaskStore::open(&path).unwrap();
    assert_eq!(reopened.load_active(owner).await.unwrap(), vec![task]);
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    match SqliteTaskStore::try_new(conn) {
        Err(PersistenceError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection was accepted"),
    }
}

#[test]
fn try_new_accepts_migrated_connection() {
    let conn = open_db_in_memory().unwrap();
    assert!(SqliteTaskStore::try_new(conn).is_ok());
}
