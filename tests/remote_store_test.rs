use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use family_stays::adapters::file_store::FileStore;
use family_stays::adapters::remote::client::RemoteStore;
use family_stays::adapters::synced::SyncedStore;
use family_stays::config::types::RemoteConfig;
use family_stays::domain::apartment::{Apartment, Family};
use family_stays::domain::reservation::{ReservationPatch, ReservationStatus};
use family_stays::error::BookingError;
use family_stays::ports::store::BookingStore;

fn remote_config(base_url: &str) -> RemoteConfig {
    RemoteConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        token: Some("secret".into()),
    }
}

fn stored_record(status: &str) -> serde_json::Value {
    json!({
        "id": "r1",
        "appartement": "A",
        "naam": "Member b1",
        "email": "b1@stays.test",
        "userId": "b1",
        "aankomst": "2025-08-02",
        "vertrek": "2025-08-09",
        "personen": 4,
        "prijs": 675.0,
        "status": status,
        "isIntention": false,
        "family": "B",
        "created": "2025-01-20T09:00:00Z"
    })
}

#[tokio::test]
async fn reads_legacy_record_layout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored_record("paid")])))
        .mount(&mock_server)
        .await;

    let store = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    let records = store.all_reservations().await.unwrap();

    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.apartment, Apartment::App35);
    assert_eq!(r.arrival, NaiveDate::from_ymd_opt(2025, 8, 2).unwrap());
    assert_eq!(r.guests, 4);
    assert_eq!(r.family, Some(Family::B));
    assert_eq!(r.status, ReservationStatus::Paid);
}

#[tokio::test]
async fn empty_collection_reads_as_empty() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let store = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    assert!(store.all_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn status_checked_patch_is_sent_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored_record("pending")))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/reservations/r1"))
        .and(body_partial_json(json!({ "status": "approved" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    let patch = ReservationPatch::status(ReservationStatus::Approved).expecting(ReservationStatus::Pending);
    let updated = store.update_fields("r1", &patch).await.unwrap();
    assert_eq!(updated.status, ReservationStatus::Approved);
}

#[tokio::test]
async fn stale_status_skips_the_patch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored_record("paid")))
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/reservations/r1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    let patch = ReservationPatch::status(ReservationStatus::Approved).expecting(ReservationStatus::Pending);
    let err = store.update_fields("r1", &patch).await.unwrap_err();
    assert!(matches!(
        err,
        BookingError::StaleWrite {
            found: ReservationStatus::Paid,
            ..
        }
    ));
}

#[tokio::test]
async fn deleting_a_missing_document_is_tolerated() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/reservations/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let store = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    assert!(store.remove("gone").await.is_ok());
}

#[tokio::test]
async fn server_error_surfaces_as_storage_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let store = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    let err = store.all_reservations().await.unwrap_err();
    assert!(matches!(err, BookingError::Storage { .. }), "{err}");
}

#[tokio::test]
async fn failed_remote_write_diverges_until_resync() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/reservations/r1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/reservations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = FileStore::open(dir.path().join("mirror.json")).await.unwrap();
    let remote = RemoteStore::new(&remote_config(&mock_server.uri())).unwrap();
    let store = SyncedStore::new(Arc::new(remote), Arc::new(local), Duration::from_secs(5));

    let record: family_stays::domain::reservation::Reservation =
        serde_json::from_value(stored_record("pending")).unwrap();
    store.persist(&record).await.unwrap();

    assert_eq!(store.diverged_ids(), vec!["r1".to_string()]);
    let mirrored = store.all_reservations().await.unwrap();
    assert_eq!(mirrored.len(), 1);

    let report = store.resync().await.unwrap();
    assert_eq!(report.written, 1);
    assert!(report.kept_remote.is_empty());
    assert!(!store.is_diverged());
}
