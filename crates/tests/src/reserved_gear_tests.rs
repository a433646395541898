use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn reserving_and_removing_tracks_availability() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let camera = app
        .create_inventory(&admin.access_token, "FX6", "Camera", 3, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Shoot", "2024-06-10", "2024-06-12")
        .await;

    let resp = app.reserve(&alice.access_token, &table_id, &camera, 2).await;
    assert_eq!(resp.status().as_u16(), 201);
    let item: Value = resp.json().await.unwrap();
    assert_eq!(item["label"], "FX6");
    assert_eq!(item["category"], "Camera");
    assert_eq!(item["quantity"], 2);
    assert_eq!(item["is_packed"], false);
    let item_id = item["id"].as_str().unwrap().to_string();

    let report = app
        .availability(&alice.access_token, &camera, "2024-06-11", "2024-06-11")
        .await;
    assert_eq!(report["owned"], 3);
    assert_eq!(report["peak_reserved"], 2);
    assert_eq!(report["available"], 1);

    let entries = app.inventory_entries(&alice.access_token, &camera).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["reservation_id"], item_id.as_str());
    assert_eq!(entries[0]["event_id"], table_id.as_str());
    assert_eq!(entries[0]["check_out_date"], "2024-06-10");
    assert_eq!(entries[0]["check_in_date"], "2024-06-12");

    let resp = app
        .auth_delete(
            &format!("/api/tables/{table_id}/reserved-gear/{item_id}"),
            &alice.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let report = app
        .availability(&alice.access_token, &camera, "2024-06-10", "2024-06-12")
        .await;
    assert_eq!(report["available"], 3);
    assert!(app.inventory_entries(&alice.access_token, &camera).await.is_empty());
}

#[tokio::test]
async fn overlapping_events_cannot_overbook() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let lens = app
        .create_inventory(&admin.access_token, "24-70", "Lens", 2, None)
        .await;

    let first = app
        .create_table(&alice.access_token, "First", "2024-07-01", "2024-07-05")
        .await;
    let overlapping = app
        .create_table(&bob.access_token, "Overlap", "2024-07-05", "2024-07-08")
        .await;
    let later = app
        .create_table(&bob.access_token, "Later", "2024-07-06", "2024-07-08")
        .await;

    let resp = app.reserve(&alice.access_token, &first, &lens, 2).await;
    assert_eq!(resp.status().as_u16(), 201);

    // Ranges are inclusive, so the shared check-in/check-out day collides.
    let resp = app.reserve(&bob.access_token, &overlapping, &lens, 1).await;
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "conflict");

    let resp = app.reserve(&bob.access_token, &later, &lens, 2).await;
    assert_eq!(resp.status().as_u16(), 201);

    // The failed attempt left nothing behind.
    let resp = app
        .auth_get(&format!("/api/tables/{overlapping}/reserved-gear"), &bob.access_token)
        .send()
        .await
        .unwrap();
    let items: Vec<Value> = resp.json().await.unwrap();
    assert!(items.is_empty());
    assert_eq!(app.inventory_entries(&bob.access_token, &lens).await.len(), 2);
}

#[tokio::test]
async fn users_only_see_their_own_items() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let light = app
        .create_inventory(&admin.access_token, "Aputure 600d", "Lighting", 4, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Shared", "2024-06-10", "2024-06-12")
        .await;
    app.auth_put(&format!("/api/tables/{table_id}/share"), &alice.access_token)
        .json(&serde_json::json!({ "user_ids": [bob.id] }))
        .send()
        .await
        .unwrap();

    let resp = app.reserve(&alice.access_token, &table_id, &light, 1).await;
    assert_eq!(resp.status().as_u16(), 201);
    let alice_item: Value = resp.json().await.unwrap();
    let resp = app.reserve(&bob.access_token, &table_id, &light, 1).await;
    assert_eq!(resp.status().as_u16(), 201);

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}/reserved-gear"), &bob.access_token)
        .send()
        .await
        .unwrap();
    let items: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["user_id"], bob.id.as_str());

    let resp = app.auth_get("/api/reserved-gear", &alice.access_token).send().await.unwrap();
    let mine: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], alice_item["id"]);

    // Bob cannot touch Alice's item.
    let resp = app
        .auth_delete(
            &format!(
                "/api/tables/{table_id}/reserved-gear/{}",
                alice_item["id"].as_str().unwrap()
            ),
            &bob.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn zero_quantity_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let mic = app
        .create_inventory(&admin.access_token, "SM7B", "Audio", 2, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Podcast", "2024-06-10", "2024-06-10")
        .await;

    let resp = app.reserve(&alice.access_token, &table_id, &mic, 0).await;
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["fields"], serde_json::json!(["quantity"]));
}

#[tokio::test]
async fn event_without_gear_window_cannot_reserve() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let mic = app
        .create_inventory(&admin.access_token, "SM7B", "Audio", 2, None)
        .await;

    let resp = app
        .auth_post("/api/tables", &alice.access_token)
        .json(&serde_json::json!({ "title": "Undated" }))
        .send()
        .await
        .unwrap();
    let table: Value = resp.json().await.unwrap();
    let table_id = table["id"].as_str().unwrap();

    let resp = app.reserve(&alice.access_token, table_id, &mic, 1).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn changing_gear_window_moves_reservations() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let drone = app
        .create_inventory(&admin.access_token, "Inspire 3", "Drone", 1, None)
        .await;
    let moved = app
        .create_table(&alice.access_token, "Moved", "2024-08-01", "2024-08-02")
        .await;
    let fixed = app
        .create_table(&bob.access_token, "Fixed", "2024-08-10", "2024-08-11")
        .await;

    assert_eq!(app.reserve(&alice.access_token, &moved, &drone, 1).await.status().as_u16(), 201);
    assert_eq!(app.reserve(&bob.access_token, &fixed, &drone, 1).await.status().as_u16(), 201);

    let entry_dates = |entries: Vec<Value>| {
        let entry = entries
            .into_iter()
            .find(|e| e["event_id"] == moved.as_str())
            .unwrap();
        (
            entry["check_out_date"].as_str().unwrap().to_string(),
            entry["check_in_date"].as_str().unwrap().to_string(),
        )
    };

    // Landing on the other event's days would need two drones.
    let resp = app
        .auth_put(&format!("/api/tables/{moved}/gear"), &alice.access_token)
        .json(&serde_json::json!({
            "check_out_date": "2024-08-09",
            "check_in_date": "2024-08-10",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "conflict");

    let dates = entry_dates(app.inventory_entries(&alice.access_token, &drone).await);
    assert_eq!(dates, ("2024-08-01".to_string(), "2024-08-02".to_string()));
    let resp = app
        .auth_get(&format!("/api/tables/{moved}/gear"), &alice.access_token)
        .send()
        .await
        .unwrap();
    let gear: Value = resp.json().await.unwrap();
    assert_eq!(gear["check_out_date"], "2024-08-01");

    let resp = app
        .auth_put(&format!("/api/tables/{moved}/gear"), &alice.access_token)
        .json(&serde_json::json!({
            "check_out_date": "2024-08-04",
            "check_in_date": "2024-08-09",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["reservations_synced"], 1);
    assert_eq!(json["gear"]["check_in_date"], "2024-08-09");

    let dates = entry_dates(app.inventory_entries(&alice.access_token, &drone).await);
    assert_eq!(dates, ("2024-08-04".to_string(), "2024-08-09".to_string()));
}

#[tokio::test]
async fn inverted_gear_window_names_both_dates() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let table_id = app
        .create_table(&alice.access_token, "Backwards", "2024-08-01", "2024-08-02")
        .await;

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/gear"), &alice.access_token)
        .json(&serde_json::json!({
            "check_out_date": "2024-08-09",
            "check_in_date": "2024-08-04",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "validation");
    assert_eq!(json["fields"], serde_json::json!(["check_out_date", "check_in_date"]));
}

#[tokio::test]
async fn specific_serial_must_match_inventory() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let body = app
        .create_inventory(&admin.access_token, "A7S III", "Camera", 1, Some("SN-100"))
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Serials", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_post(&format!("/api/tables/{table_id}/reserved-gear"), &alice.access_token)
        .json(&serde_json::json!({
            "inventory_id": body,
            "list_name": "Main",
            "serial": "SN-999",
            "specific_serial_requested": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["fields"], serde_json::json!(["serial"]));

    let resp = app
        .auth_post(&format!("/api/tables/{table_id}/reserved-gear"), &alice.access_token)
        .json(&serde_json::json!({
            "inventory_id": body,
            "list_name": "  ",
            "quantity": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["fields"], serde_json::json!(["list_name"]));

    let resp = app
        .auth_post(&format!("/api/tables/{table_id}/reserved-gear"), &alice.access_token)
        .json(&serde_json::json!({
            "inventory_id": body,
            "list_name": "Main",
            "serial": "sn-100",
            "specific_serial_requested": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let item: Value = resp.json().await.unwrap();
    assert_eq!(item["serial"], "sn-100");
    assert_eq!(item["quantity"], 1);
}

#[tokio::test]
async fn packing_and_quantity_updates() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let stand = app
        .create_inventory(&admin.access_token, "C-Stand", "Grip", 3, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Grip day", "2024-06-10", "2024-06-12")
        .await;

    let resp = app.reserve(&alice.access_token, &table_id, &stand, 1).await;
    let item: Value = resp.json().await.unwrap();
    let path = format!(
        "/api/tables/{table_id}/reserved-gear/{}",
        item["id"].as_str().unwrap()
    );

    let resp = app
        .auth_put(&path, &alice.access_token)
        .json(&serde_json::json!({ "is_packed": true, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["is_packed"], true);
    assert!(updated["packed_at"].is_string());
    assert_eq!(updated["quantity"], 3);

    assert_eq!(app.reserved_units(&alice.access_token, &stand).await, 3);

    let resp = app
        .auth_put(&path, &alice.access_token)
        .json(&serde_json::json!({ "quantity": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    assert_eq!(app.reserved_units(&alice.access_token, &stand).await, 3);
}

#[tokio::test]
async fn concurrent_resizes_keep_inventory_in_step() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let cable = app
        .create_inventory(&admin.access_token, "SDI 10m", "Cable", 20, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Cables", "2024-06-10", "2024-06-12")
        .await;

    let resp = app.reserve(&alice.access_token, &table_id, &cable, 1).await;
    let item: Value = resp.json().await.unwrap();
    let path = format!(
        "/api/tables/{table_id}/reserved-gear/{}",
        item["id"].as_str().unwrap()
    );

    let resize = |quantity: u32| {
        app.auth_put(&path, &alice.access_token)
            .json(&serde_json::json!({ "quantity": quantity }))
            .send()
    };
    let (first, second) = tokio::join!(resize(3), resize(5));
    let statuses = [first.unwrap().status().as_u16(), second.unwrap().status().as_u16()];
    assert!(statuses.contains(&200), "one resize must win: {statuses:?}");
    assert!(statuses.iter().all(|s| *s == 200 || *s == 409), "{statuses:?}");

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}/reserved-gear"), &alice.access_token)
        .send()
        .await
        .unwrap();
    let items: Vec<Value> = resp.json().await.unwrap();
    let quantity = items[0]["quantity"].as_u64().unwrap();
    assert_eq!(app.reserved_units(&alice.access_token, &cable).await, quantity);
}
