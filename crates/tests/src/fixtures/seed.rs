use serde_json::Value;

use super::test_app::{ADMIN_EMAIL, TestApp};

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub access_token: String,
}

impl TestApp {
    /// Register a user and return their auth info.
    pub async fn register_user(
        &self,
        email: &str,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "username": username,
                "display_name": display_name,
                "password": password,
            }))
            .send()
            .await
            .expect("Register request failed");

        assert_eq!(
            resp.status().as_u16(),
            201,
            "Register failed: {}",
            resp.text().await.unwrap_or_default()
        );

        let json: Value = resp.json().await.expect("Failed to parse register response");
        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            username: username.to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// A regular member named after `name`.
    pub async fn member(&self, name: &str) -> SeededUser {
        self.register_user(
            &format!("{name}@lumdash.test"),
            name,
            &format!("{name} Test"),
            "Password123!",
        )
        .await
    }

    /// The account registered with the configured admin email.
    pub async fn admin(&self) -> SeededUser {
        self.register_user(ADMIN_EMAIL, "admin", "Admin", "Password123!")
            .await
    }

    /// Create an authenticated request with the given token.
    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Create an event with a gear window and return its id.
    pub async fn create_table(&self, token: &str, title: &str, out: &str, back: &str) -> String {
        let resp = self
            .auth_post("/api/tables", token)
            .json(&serde_json::json!({
                "title": title,
                "general": { "client": "Acme", "start": out, "end": back },
            }))
            .send()
            .await
            .expect("Create table failed");
        assert_eq!(resp.status().as_u16(), 201, "Create table failed");
        let json: Value = resp.json().await.unwrap();
        let id = json["id"].as_str().unwrap().to_string();

        let resp = self
            .auth_put(&format!("/api/tables/{id}/gear"), token)
            .json(&serde_json::json!({
                "check_out_date": out,
                "check_in_date": back,
                "lists": ["Main"],
            }))
            .send()
            .await
            .expect("Set gear window failed");
        assert_eq!(resp.status().as_u16(), 200, "Set gear window failed");

        id
    }

    /// Create an inventory item (admin only) and return its id.
    pub async fn create_inventory(
        &self,
        admin_token: &str,
        label: &str,
        category: &str,
        quantity: u32,
        serial: Option<&str>,
    ) -> String {
        let resp = self
            .auth_post("/api/gear-inventory", admin_token)
            .json(&serde_json::json!({
                "label": label,
                "brand": "Brand",
                "model": "Model",
                "category": category,
                "quantity": quantity,
                "serial": serial,
            }))
            .send()
            .await
            .expect("Create inventory failed");
        assert_eq!(
            resp.status().as_u16(),
            201,
            "Create inventory failed: {}",
            resp.text().await.unwrap_or_default()
        );
        let json: Value = resp.json().await.unwrap();
        json["id"].as_str().unwrap().to_string()
    }

    pub async fn reserve(
        &self,
        token: &str,
        table_id: &str,
        inventory_id: &str,
        quantity: u32,
    ) -> reqwest::Response {
        self.auth_post(&format!("/api/tables/{table_id}/reserved-gear"), token)
            .json(&serde_json::json!({
                "inventory_id": inventory_id,
                "list_name": "Main",
                "quantity": quantity,
            }))
            .send()
            .await
            .expect("Reserve request failed")
    }

    pub async fn availability(
        &self,
        token: &str,
        inventory_id: &str,
        start: &str,
        end: &str,
    ) -> Value {
        let resp = self
            .auth_get(
                &format!("/api/gear-inventory/{inventory_id}/availability?start={start}&end={end}"),
                token,
            )
            .send()
            .await
            .expect("Availability request failed");
        assert_eq!(resp.status().as_u16(), 200);
        resp.json().await.unwrap()
    }

    /// Raw reservation entries stored on an inventory item.
    pub async fn inventory_entries(&self, token: &str, inventory_id: &str) -> Vec<Value> {
        let resp = self
            .auth_get(&format!("/api/gear-inventory/{inventory_id}"), token)
            .send()
            .await
            .expect("Get inventory failed");
        let json: Value = resp.json().await.unwrap();
        json["reservations"].as_array().cloned().unwrap_or_default()
    }

    /// Units claimed on an inventory item, summed over its entries.
    pub async fn reserved_units(&self, token: &str, inventory_id: &str) -> u64 {
        self.inventory_entries(token, inventory_id)
            .await
            .iter()
            .filter_map(|entry| entry["quantity"].as_u64())
            .sum()
    }
}
