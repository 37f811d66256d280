//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  str::FromStr,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{Duration, TimeZone, Utc};
use paddock_core::{
  filter::ReadingFilter,
  horse::HorseChanges,
  reading::{Metric, NewReading, ReadingUpdate, Telemetry},
  store::PaddockStore,
  user::{NewUser, User},
};
use rust_decimal::Decimal;

use crate::{Error, MAX_KEY_ATTEMPTS, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str) -> User {
  s.create_user(NewUser::new(email.into(), String::new(), "hash".into()))
    .await
    .unwrap()
    .expect("fresh email")
}

fn dec(s: &str) -> Decimal { Decimal::from_str(s).unwrap() }

fn reading_for(horse_id: i64) -> NewReading {
  NewReading { horse_id, telemetry: Telemetry::default() }
}

// ─── Users and tokens ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_user() {
  let s = store().await;
  let u = user(&s, "rider@example.com").await;
  assert!(u.is_active);
  assert!(!u.is_staff);
  assert_eq!(u.password_hash, "hash");

  let found = s.find_user_by_email("rider@example.com".into()).await.unwrap();
  assert_eq!(found, Some(u.clone()));
  assert_eq!(s.get_user(u.id).await.unwrap(), Some(u));
  assert!(s.find_user_by_email("nobody@example.com".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_refused() {
  let s = store().await;
  user(&s, "rider@example.com").await;
  let again = s
    .create_user(NewUser::new("rider@example.com".into(), String::new(), "x".into()))
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn token_digest_resolves_to_user() {
  let s = store().await;
  let u = user(&s, "rider@example.com").await;
  s.store_token(u.id, "digest-1".into()).await.unwrap();

  let resolved = s.user_for_token("digest-1".into()).await.unwrap();
  assert_eq!(resolved.map(|r| r.id), Some(u.id));
  assert!(s.user_for_token("digest-2".into()).await.unwrap().is_none());
}

// ─── Horses ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_horse_is_found_by_key() {
  let s = store().await;
  let u = user(&s, "a@example.com").await;
  let horse = s.create_horse(u.id, "Seabiscuit".into()).await.unwrap();

  assert_eq!(horse.owner_id, u.id);
  assert_eq!(horse.api_key.len(), 12);
  assert_eq!(horse.image, None);

  let found = s.horse_by_api_key(horse.api_key.clone()).await.unwrap();
  assert_eq!(found, Some(horse));
  assert!(s.horse_by_api_key("AAAAAAAAAAAA".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn horses_listed_newest_first_per_owner() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let first = s.create_horse(a.id, "First".into()).await.unwrap();
  let second = s.create_horse(a.id, "Second".into()).await.unwrap();
  s.create_horse(b.id, "Other".into()).await.unwrap();

  let listed = s.list_horses(a.id).await.unwrap();
  let ids: Vec<_> = listed.iter().map(|h| h.id).collect();
  assert_eq!(ids, [second.id, first.id]);
}

#[tokio::test]
async fn foreign_horse_behaves_as_missing() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let horse = s.create_horse(a.id, "Mine".into()).await.unwrap();

  assert!(s.get_horse(horse.id, b.id).await.unwrap().is_none());
  let renamed = s
    .update_horse(horse.id, b.id, HorseChanges { name: Some("Stolen".into()) })
    .await
    .unwrap();
  assert!(renamed.is_none());
  assert!(s.set_horse_image(horse.id, b.id, "x.png".into()).await.unwrap().is_none());
  assert!(s.delete_horse(horse.id, b.id).await.unwrap().is_none());

  assert_eq!(s.get_horse(horse.id, a.id).await.unwrap(), Some(horse));
}

#[tokio::test]
async fn update_keeps_api_key() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "Old".into()).await.unwrap();

  let updated = s
    .update_horse(horse.id, a.id, HorseChanges { name: Some("New".into()) })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.name, "New");
  assert_eq!(updated.api_key, horse.api_key);

  let untouched = s
    .update_horse(horse.id, a.id, HorseChanges::default())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(untouched, updated);
}

#[tokio::test]
async fn image_replacement_reports_previous_path() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "Pic".into()).await.unwrap();

  let (h, old) = s
    .set_horse_image(horse.id, a.id, "uploads/horse/one.png".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(h.image.as_deref(), Some("uploads/horse/one.png"));
  assert_eq!(old, None);

  let (_, old) = s
    .set_horse_image(horse.id, a.id, "uploads/horse/two.png".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(old.as_deref(), Some("uploads/horse/one.png"));
}

#[tokio::test]
async fn key_collision_is_regenerated() {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = calls.clone();
  // The first two keys are identical; the third is fresh.
  let keys = ["AAAAAAAAAAAA", "AAAAAAAAAAAA", "BBBBBBBBBBBB"];
  let s = store().await.with_key_generator(Arc::new(move || {
    keys[counter.fetch_add(1, Ordering::SeqCst).min(2)].to_owned()
  }));
  let a = user(&s, "a@example.com").await;

  let first = s.create_horse(a.id, "One".into()).await.unwrap();
  let second = s.create_horse(a.id, "Two".into()).await.unwrap();
  assert_eq!(first.api_key, "AAAAAAAAAAAA");
  assert_eq!(second.api_key, "BBBBBBBBBBBB");
  assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_key_space_is_an_error() {
  let s = store()
    .await
    .with_key_generator(Arc::new(|| "AAAAAAAAAAAA".to_owned()));
  let a = user(&s, "a@example.com").await;
  s.create_horse(a.id, "One".into()).await.unwrap();

  let err = s.create_horse(a.id, "Two".into()).await.unwrap_err();
  assert!(matches!(err, Error::KeySpaceExhausted(n) if n == MAX_KEY_ATTEMPTS));
  assert_eq!(s.list_horses(a.id).await.unwrap().len(), 1);
}

// ─── Readings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reading_owner_comes_from_horse() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "Sensor".into()).await.unwrap();

  let telemetry = Telemetry {
    gps_lat: Some(dec("40.866389")),
    gps_long: Some(dec("-73.885278")),
    hr: Some(dec("24.10")),
    ..Default::default()
  };
  let reading = s
    .create_reading(NewReading { horse_id: horse.id, telemetry: telemetry.clone() })
    .await
    .unwrap()
    .unwrap();

  assert_eq!(reading.owner_id, a.id);
  assert_eq!(reading.horse_id, horse.id);
  assert_eq!(reading.name, "Sensor");
  assert_eq!(reading.api_key, horse.api_key);
  assert_eq!(reading.telemetry, telemetry);
  assert_eq!(reading.telemetry.gps_lat.unwrap().to_string(), "40.866389");
  assert_eq!(reading.telemetry.hr.unwrap().to_string(), "24.10");
}

#[tokio::test]
async fn reading_for_missing_horse_is_none() {
  let s = store().await;
  assert!(s.create_reading(reading_for(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn readings_are_tenant_scoped() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let ha = s.create_horse(a.id, "A".into()).await.unwrap();
  let hb = s.create_horse(b.id, "B".into()).await.unwrap();

  let ra = s.create_reading(reading_for(ha.id)).await.unwrap().unwrap();
  let rb = s.create_reading(reading_for(hb.id)).await.unwrap().unwrap();

  let filter = ReadingFilter::default();
  let listed = s.list_readings(a.id, &filter).await.unwrap();
  assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), [ra.id]);

  assert!(s.get_reading(rb.id, a.id).await.unwrap().is_none());
  assert!(
    s.update_reading(rb.id, a.id, ReadingUpdate::default())
      .await
      .unwrap()
      .is_none()
  );
  assert!(!s.delete_reading(rb.id, a.id).await.unwrap());
  assert!(s.get_reading(rb.id, b.id).await.unwrap().is_some());
}

#[tokio::test]
async fn filters_combine_as_conjunction() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "Clock".into()).await.unwrap();
  let other = s.create_horse(a.id, "Other".into()).await.unwrap();

  let t = |day| Utc.with_ymd_and_hms(2023, 3, day, 23, 59, 59).unwrap();
  let mut ids = Vec::new();
  for day in 17..=20 {
    let r = s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();
    let backdated = ReadingUpdate { date_created: Some(t(day)), metrics: vec![] };
    s.update_reading(r.id, a.id, backdated).await.unwrap().unwrap();
    ids.push(r.id);
  }
  s.create_reading(reading_for(other.id)).await.unwrap().unwrap();

  let after_t2 = ReadingFilter { created_gt: Some(t(18)), ..Default::default() };
  let listed = s.list_readings(a.id, &after_t2).await.unwrap();
  // The reading on `other` was stamped now, which is after T2 too.
  assert_eq!(listed.len(), 3);

  let window = ReadingFilter {
    api_key: Some(horse.api_key.clone()),
    created_gt: Some(t(18)),
    created_lt: Some(t(20)),
    ..Default::default()
  };
  let listed = s.list_readings(a.id, &window).await.unwrap();
  assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), [ids[2]]);

  let inclusive = ReadingFilter {
    api_key: Some(horse.api_key.clone()),
    created_gte: Some(t(18)),
    created_lte: Some(t(19)),
    ..Default::default()
  };
  let listed = s.list_readings(a.id, &inclusive).await.unwrap();
  assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), [ids[2], ids[1]]);
}

#[tokio::test]
async fn readings_listed_newest_first() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "H".into()).await.unwrap();
  let r1 = s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();
  let r2 = s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();
  assert!(r2.date_created >= r1.date_created);

  let listed = s.list_readings(a.id, &ReadingFilter::default()).await.unwrap();
  assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), [r2.id, r1.id]);
}

#[tokio::test]
async fn update_sets_and_clears_metrics() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "H".into()).await.unwrap();
  let reading = s
    .create_reading(NewReading {
      horse_id:  horse.id,
      telemetry: Telemetry {
        temp: Some(dec("37.40")),
        batt: Some(dec("88.00")),
        ..Default::default()
      },
    })
    .await
    .unwrap()
    .unwrap();

  let update = ReadingUpdate {
    date_created: None,
    metrics:      vec![(Metric::Hr, Some(dec("19.90"))), (Metric::Batt, None)],
  };
  let updated = s.update_reading(reading.id, a.id, update).await.unwrap().unwrap();
  assert_eq!(updated.telemetry.temp, Some(dec("37.40")));
  assert_eq!(updated.telemetry.hr, Some(dec("19.90")));
  assert_eq!(updated.telemetry.batt, None);
  assert_eq!(updated.date_created, reading.date_created);
  assert_eq!(updated.horse_id, horse.id);
}

#[tokio::test]
async fn backdated_timestamp_round_trips() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "H".into()).await.unwrap();
  let reading = s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();

  let when = Utc::now() - Duration::days(30);
  let update = ReadingUpdate { date_created: Some(when), metrics: vec![] };
  let updated = s.update_reading(reading.id, a.id, update).await.unwrap().unwrap();
  // Stored with microsecond precision.
  assert_eq!(updated.date_created.timestamp_micros(), when.timestamp_micros());
}

#[tokio::test]
async fn deleting_horse_removes_its_readings() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "H".into()).await.unwrap();
  let keep = s.create_horse(a.id, "Keep".into()).await.unwrap();
  let gone = s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();
  let kept = s.create_reading(reading_for(keep.id)).await.unwrap().unwrap();

  let deleted = s.delete_horse(horse.id, a.id).await.unwrap();
  assert_eq!(deleted.map(|h| h.id), Some(horse.id));
  assert!(s.get_reading(gone.id, a.id).await.unwrap().is_none());
  assert!(s.get_reading(kept.id, a.id).await.unwrap().is_some());
  assert!(s.horse_by_api_key(horse.api_key).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_user_cascades() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "H".into()).await.unwrap();
  s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();
  s.store_token(a.id, "digest".into()).await.unwrap();

  assert!(s.delete_user(a.id).await.unwrap());
  assert!(!s.delete_user(a.id).await.unwrap());
  assert!(s.horse_by_api_key(horse.api_key).await.unwrap().is_none());
  assert!(s.user_for_token("digest".into()).await.unwrap().is_none());
  assert!(s.list_readings(a.id, &ReadingFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_reading_only_once() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let horse = s.create_horse(a.id, "H".into()).await.unwrap();
  let r = s.create_reading(reading_for(horse.id)).await.unwrap().unwrap();

  assert!(s.delete_reading(r.id, a.id).await.unwrap());
  assert!(!s.delete_reading(r.id, a.id).await.unwrap());
}
