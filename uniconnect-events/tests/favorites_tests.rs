//! Favorite event tests

mod helpers;

use helpers::*;
use uniconnect_common::Error;
use uniconnect_events::db::favorites::{add_favorite, list_favorites, remove_favorite};
use uuid::Uuid;

#[tokio::test]
async fn test_add_is_idempotent() {
    let db = create_test_db().await;
    let club = seed_club(&db.pool).await;
    let event = seed_event(&db.pool, club, "Kodlama Gecesi", "", date(2030, 1, 1), 0, &[]).await;
    let student = seed_student(&db.pool, "burak", &[]).await;

    assert!(add_favorite(&db.pool, student, event).await.unwrap());
    assert!(!add_favorite(&db.pool, student, event).await.unwrap());

    let list = list_favorites(&db.pool, student).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].event_id, event);
    assert_eq!(list[0].student_id, student);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let db = create_test_db().await;
    let club = seed_club(&db.pool).await;
    let first = seed_event(&db.pool, club, "Bir", "", date(2030, 1, 1), 0, &[]).await;
    let second = seed_event(&db.pool, club, "İki", "", date(2030, 1, 2), 0, &[]).await;
    let student = seed_student(&db.pool, "cem", &[]).await;

    add_favorite(&db.pool, student, first).await.unwrap();
    add_favorite(&db.pool, student, second).await.unwrap();

    let events: Vec<Uuid> = list_favorites(&db.pool, student)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.event_id)
        .collect();
    assert_eq!(events, vec![second, first]);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let db = create_test_db().await;
    let club = seed_club(&db.pool).await;
    let event = seed_event(&db.pool, club, "Panel", "", date(2030, 1, 1), 0, &[]).await;
    let student = seed_student(&db.pool, "derya", &[]).await;

    assert!(matches!(
        add_favorite(&db.pool, Uuid::new_v4(), event).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        add_favorite(&db.pool, student, Uuid::new_v4()).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        list_favorites(&db.pool, Uuid::new_v4()).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remove_missing_favorite_is_not_found() {
    let db = create_test_db().await;
    let club = seed_club(&db.pool).await;
    let event = seed_event(&db.pool, club, "Sergi", "", date(2030, 1, 1), 0, &[]).await;
    let student = seed_student(&db.pool, "emre", &[]).await;

    assert!(matches!(
        remove_favorite(&db.pool, student, event).await,
        Err(Error::NotFound(_))
    ));

    add_favorite(&db.pool, student, event).await.unwrap();
    remove_favorite(&db.pool, student, event).await.unwrap();
    assert!(list_favorites(&db.pool, student).await.unwrap().is_empty());
}
