use crate::fixtures::test_app::TestApp;
use chrono::{TimeZone, Utc};
use lumdash_db::models::ManualReservation;
use serde_json::Value;

async fn create_manual(app: &TestApp, token: &str, body: Value) -> reqwest::Response {
    app.auth_post("/api/manual-reservations", token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn dates_are_stored_at_utc_midnight() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let tripod = app
        .create_inventory(&admin.access_token, "Sachtler", "Support", 2, None)
        .await;

    let resp = create_manual(
        &app,
        &admin.access_token,
        serde_json::json!({
            "person_name": "Walk-in renter",
            "person_email": "renter@example.com",
            "start_date": "2024-10-01T23:30:00-07:00",
            "end_date": "2024-10-03",
            "inventory_id": tripod,
        }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["label"], "Sachtler");
    assert_eq!(record["quantity"], 1);
    assert!(record["start_date"].as_str().unwrap().starts_with("2024-10-01T00:00:00"));
    let id = bson::oid::ObjectId::parse_str(record["id"].as_str().unwrap()).unwrap();

    let stored = app
        .db
        .collection::<bson::Document>(ManualReservation::COLLECTION)
        .find_one(bson::doc! { "_id": id })
        .await
        .unwrap()
        .unwrap();
    let start = *stored.get_datetime("start_date").unwrap();
    let end = *stored.get_datetime("end_date").unwrap();
    assert_eq!(
        start,
        bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(
        end,
        bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2024, 10, 3, 0, 0, 0).unwrap())
    );

    let entries = app.inventory_entries(&admin.access_token, &tripod).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["manual_reservation_id"], id.to_hex().as_str());
    assert_eq!(entries[0]["check_out_date"], "2024-10-01");
    assert_eq!(entries[0]["check_in_date"], "2024-10-03");
}

#[tokio::test]
async fn members_cannot_manage_manual_reservations() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let tripod = app
        .create_inventory(&admin.access_token, "Sachtler", "Support", 2, None)
        .await;

    let resp = create_manual(
        &app,
        &alice.access_token,
        serde_json::json!({
            "person_name": "Alice",
            "start_date": "2024-10-01",
            "end_date": "2024-10-02",
            "inventory_id": tripod,
        }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get("/api/manual-reservations", &alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn manual_reservations_share_capacity_with_events() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let slider = app
        .create_inventory(&admin.access_token, "Slider", "Support", 1, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Slider shoot", "2024-10-02", "2024-10-04")
        .await;

    let resp = create_manual(
        &app,
        &admin.access_token,
        serde_json::json!({
            "person_name": "Renter",
            "start_date": "2024-10-01",
            "end_date": "2024-10-02",
            "inventory_id": slider,
        }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let record: Value = resp.json().await.unwrap();
    let id = record["id"].as_str().unwrap().to_string();

    let resp = app.reserve(&alice.access_token, &table_id, &slider, 1).await;
    assert_eq!(resp.status().as_u16(), 409);

    // A second manual booking on the same days fails and leaves no record.
    let resp = create_manual(
        &app,
        &admin.access_token,
        serde_json::json!({
            "person_name": "Other renter",
            "start_date": "2024-10-02",
            "end_date": "2024-10-02",
            "inventory_id": slider,
        }),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 409);
    let resp = app
        .auth_get("/api/manual-reservations", &admin.access_token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);

    let resp = app
        .auth_delete(&format!("/api/manual-reservations/{id}"), &admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = app.reserve(&alice.access_token, &table_id, &slider, 1).await;
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn updating_one_date_keeps_the_other() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let monitor = app
        .create_inventory(&admin.access_token, "SmallHD", "Monitor", 1, None)
        .await;

    let resp = create_manual(
        &app,
        &admin.access_token,
        serde_json::json!({
            "person_name": "Renter",
            "start_date": "2024-11-01",
            "end_date": "2024-11-03",
            "inventory_id": monitor,
        }),
    )
    .await;
    let record: Value = resp.json().await.unwrap();
    let id = record["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/manual-reservations/{id}"), &admin.access_token)
        .json(&serde_json::json!({ "end_date": "2024-11-05" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert!(updated["start_date"].as_str().unwrap().starts_with("2024-11-01"));
    assert!(updated["end_date"].as_str().unwrap().starts_with("2024-11-05"));

    let entries = app.inventory_entries(&admin.access_token, &monitor).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["check_in_date"], "2024-11-05");

    let resp = app
        .auth_put(&format!("/api/manual-reservations/{id}"), &admin.access_token)
        .json(&serde_json::json!({ "start_date": "2024-11-09" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let battery = app
        .create_inventory(&admin.access_token, "V-Mount", "Power", 10, None)
        .await;
    let charger = app
        .create_inventory(&admin.access_token, "Charger", "Power", 10, None)
        .await;

    for (inventory, day) in [(&battery, "01"), (&battery, "02"), (&battery, "03"), (&charger, "04")] {
        let resp = create_manual(
            &app,
            &admin.access_token,
            serde_json::json!({
                "person_name": format!("Renter {day}"),
                "start_date": format!("2024-12-{day}"),
                "end_date": format!("2024-12-{day}"),
                "inventory_id": inventory,
            }),
        )
        .await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    let resp = app
        .auth_get(
            &format!("/api/manual-reservations?inventory_id={battery}&page=1&per_page=2"),
            &admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
}
