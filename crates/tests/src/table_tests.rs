use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn create_and_list_own_events() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;

    let resp = app
        .auth_post("/api/tables", &alice.access_token)
        .json(&serde_json::json!({
            "title": "Spring Gala",
            "general": { "client": "Acme", "start": "2024-05-01T10:00:00+02:00", "end": "2024-05-03" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let table: Value = resp.json().await.unwrap();
    assert_eq!(table["title"], "Spring Gala");
    assert_eq!(table["general"]["start"], "2024-05-01");
    assert_eq!(table["general"]["end"], "2024-05-03");
    assert_eq!(table["owners"][0], alice.id.as_str());

    let resp = app.auth_get("/api/tables", &alice.access_token).send().await.unwrap();
    let tables: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(tables.len(), 1);
}

#[tokio::test]
async fn reversed_general_dates_are_rejected() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;

    let resp = app
        .auth_post("/api/tables", &alice.access_token)
        .json(&serde_json::json!({
            "title": "Backwards",
            "general": { "start": "2024-05-03", "end": "2024-05-01" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn other_users_cannot_see_event() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let table_id = app
        .create_table(&alice.access_token, "Private", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}"), &bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.auth_get("/api/tables", &bob.access_token).send().await.unwrap();
    let tables: Vec<Value> = resp.json().await.unwrap();
    assert!(tables.is_empty());

    let resp = app
        .auth_get("/api/tables/not-an-id", &bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_sees_every_event() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let table_id = app
        .create_table(&alice.access_token, "Alice's", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}"), &admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn sharing_grants_access_but_not_deletion() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let table_id = app
        .create_table(&alice.access_token, "Shared", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/share"), &alice.access_token)
        .json(&serde_json::json!({ "user_ids": [bob.id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let table: Value = resp.json().await.unwrap();
    assert_eq!(table["shared_with"][0], bob.id.as_str());

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}"), &bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_delete(&format!("/api/tables/{table_id}"), &bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&format!("/api/tables/{table_id}"), &alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}"), &alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn sharing_with_unknown_user_fails() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let table_id = app
        .create_table(&alice.access_token, "Shared", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/share"), &alice.access_token)
        .json(&serde_json::json!({ "user_ids": [bson::oid::ObjectId::new().to_hex()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["fields"][0], "user_ids");
}

#[tokio::test]
async fn section_items_receive_ids() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let table_id = app
        .create_table(&alice.access_token, "Sections", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/schedule"), &alice.access_token)
        .json(&serde_json::json!([
            {
                "date": "2024-06-10T18:30:00-05:00",
                "programs": [
                    { "name": "Load in", "start_time": "08:00" },
                    { "id": "keep-me", "name": "Doors", "start_time": "18:00" },
                ],
            }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let days: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(days[0]["date"], "2024-06-10");
    let generated = days[0]["programs"][0]["id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
    assert_eq!(days[0]["programs"][1]["id"], "keep-me");

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/tasks"), &alice.access_token)
        .json(&serde_json::json!([{ "title": "Charge batteries" }]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}"), &alice.access_token)
        .send()
        .await
        .unwrap();
    let table: Value = resp.json().await.unwrap();
    assert_eq!(table["tasks"][0]["title"], "Charge batteries");
    assert_eq!(table["tasks"][0]["completed"], false);
    assert!(table["tasks"][0]["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(table["program_schedule"][0]["programs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn gear_dates_must_come_together() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let table_id = app
        .create_table(&alice.access_token, "Gear", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/gear"), &alice.access_token)
        .json(&serde_json::json!({ "check_out_date": "2024-06-09" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/gear"), &alice.access_token)
        .json(&serde_json::json!({ "lists": ["Main", " Backup ", "Main", ""] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["gear"]["lists"], serde_json::json!(["Main", "Backup"]));
    assert_eq!(json["gear"]["check_out_date"], "2024-06-10");
    assert_eq!(json["reservations_synced"], 0);
}

#[tokio::test]
async fn malformed_section_body_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let alice = app.member("alice").await;
    let table_id = app
        .create_table(&alice.access_token, "Sections", "2024-06-10", "2024-06-12")
        .await;

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/schedule"), &alice.access_token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "bad_request");

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}/crew"), &alice.access_token)
        .json(&serde_json::json!({ "name": "not a list" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn deleting_event_releases_its_gear() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let lens = app
        .create_inventory(&admin.access_token, "35mm", "Lens", 2, None)
        .await;
    let table_id = app
        .create_table(&alice.access_token, "Wrap party", "2024-06-10", "2024-06-12")
        .await;
    assert_eq!(app.reserve(&alice.access_token, &table_id, &lens, 2).await.status().as_u16(), 201);
    assert_eq!(app.reserved_units(&alice.access_token, &lens).await, 2);

    let resp = app
        .auth_delete(&format!("/api/tables/{table_id}"), &alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    assert_eq!(app.reserved_units(&alice.access_token, &lens).await, 0);
    let resp = app.auth_get("/api/reserved-gear", &alice.access_token).send().await.unwrap();
    let items: Vec<Value> = resp.json().await.unwrap();
    assert!(items.is_empty());

    let report = app
        .availability(&alice.access_token, &lens, "2024-06-10", "2024-06-12")
        .await;
    assert_eq!(report["available"], 2);
}

#[tokio::test]
async fn general_dates_move_reservations_without_gear_window() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let slider = app
        .create_inventory(&admin.access_token, "Edelkrone", "Support", 1, None)
        .await;
    let busy = app
        .create_table(&bob.access_token, "Busy", "2024-09-20", "2024-09-21")
        .await;
    assert_eq!(app.reserve(&bob.access_token, &busy, &slider, 1).await.status().as_u16(), 201);

    let resp = app
        .auth_post("/api/tables", &alice.access_token)
        .json(&serde_json::json!({
            "title": "No gear window",
            "general": { "start": "2024-09-01", "end": "2024-09-02" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let table: Value = resp.json().await.unwrap();
    let table_id = table["id"].as_str().unwrap().to_string();
    assert_eq!(app.reserve(&alice.access_token, &table_id, &slider, 1).await.status().as_u16(), 201);

    let alice_entry = |entries: Vec<Value>| {
        entries
            .into_iter()
            .find(|e| e["event_id"] == table_id.as_str())
            .unwrap()
    };

    let resp = app
        .auth_put(&format!("/api/tables/{table_id}"), &alice.access_token)
        .json(&serde_json::json!({
            "general": { "start": "2024-09-05", "end": "2024-09-07" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let entry = alice_entry(app.inventory_entries(&alice.access_token, &slider).await);
    assert_eq!(entry["check_out_date"], "2024-09-05");
    assert_eq!(entry["check_in_date"], "2024-09-07");

    // Bob already holds the only slider on the 20th.
    let resp = app
        .auth_put(&format!("/api/tables/{table_id}"), &alice.access_token)
        .json(&serde_json::json!({
            "general": { "start": "2024-09-19", "end": "2024-09-20" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let entry = alice_entry(app.inventory_entries(&alice.access_token, &slider).await);
    assert_eq!(entry["check_out_date"], "2024-09-05");

    let resp = app
        .auth_get(&format!("/api/tables/{table_id}"), &alice.access_token)
        .send()
        .await
        .unwrap();
    let table: Value = resp.json().await.unwrap();
    assert_eq!(table["general"]["start"], "2024-09-05");
}
