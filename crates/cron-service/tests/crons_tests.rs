//! Cron registry integration tests.
//!
//! Drives the `/crons` routes of a real server through `TestCronServer`.

use cron_test_utils::TestCronServer;
use serde_json::{json, Value};
use sqlx::PgPool;

struct Api {
    server: TestCronServer,
    token: String,
}

impl Api {
    async fn new(pool: PgPool) -> Result<Self, anyhow::Error> {
        let server = TestCronServer::spawn(pool).await?;
        let token = server.issue_api_token().await?;
        Ok(Self { server, token })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, anyhow::Error> {
        let response = request.bearer_auth(&self.token).send().await?;
        assert_eq!(response.status(), 200);
        Ok(response.json().await?)
    }

    async fn get(&self, path: &str) -> Result<Value, anyhow::Error> {
        self.send(self.server.client().get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, anyhow::Error> {
        self.send(self.server.client().post(self.url(path)).json(&body))
            .await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, anyhow::Error> {
        self.send(self.server.client().put(self.url(path)).json(&body))
            .await
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> Result<Value, anyhow::Error> {
        let request = self.server.client().delete(self.url(path));
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };
        self.send(request).await
    }

    async fn add(&self, cron: &str) -> Result<i64, anyhow::Error> {
        let body = self.post("/crons", json!({ "cron": cron })).await?;
        assert_eq!(body["error"], false, "add failed: {body}");

        let rows = self.get(&format!("/crons/1?cron={cron}")).await?;
        rows["data"][0]["cron_id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("cron {cron} not found after insert"))
    }
}

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["cron_id"].as_i64()).collect())
        .unwrap_or_default()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_cron_normalizes_value(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;

    let body = api
        .post("/crons", json!({ "cron": "  HTTPS://Example.com/Ping " }))
        .await?;
    assert_eq!(body, json!({ "error": false, "data": "Cron added successfully!" }));

    let list = api.get("/crons").await?;
    assert_eq!(list["data"][0]["cron"], "https://example.com/ping");
    assert_eq!(list["data"][0]["status"], 1);
    assert!(list["data"][0]["deleted_at"].is_null());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_duplicate_cron_is_error(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    api.add("dup.example").await?;

    let body = api.post("/crons", json!({ "cron": "DUP.example" })).await?;
    assert_eq!(body, json!({ "error": true, "data": "Cron already exists!" }));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_cron_validation(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;

    let body = api.post("/crons", json!({})).await?;
    assert_eq!(body, json!({ "error": true, "data": "\"cron\" is Required" }));

    let body = api.post("/crons", json!({ "cron": "   " })).await?;
    assert_eq!(
        body["data"],
        "\"cron\" is String must contain at least 1 character(s)"
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_cron_by_id_and_by_value(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let a = api.add("a.example").await?;
    let b = api.add("b.example").await?;

    let by_id = api.get(&format!("/crons/{a}")).await?;
    assert_eq!(ids(&by_id), vec![a]);

    // The query value overrides the path id.
    let by_value = api.get(&format!("/crons/{a}?cron=B.EXAMPLE")).await?;
    assert_eq!(ids(&by_value), vec![b]);

    let missing = api.get("/crons/999").await?;
    assert_eq!(missing, json!({ "error": false, "data": [] }));

    let invalid = api.get("/crons/abc").await?;
    assert_eq!(
        invalid,
        json!({ "error": true, "data": "\"cron_id\" is Expected number, received nan" })
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_filters_non_numeric_ids(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let a = api.add("a.example").await?;
    let b = api.add("b.example").await?;
    let c = api.add("c.example").await?;
    api.add("d.example").await?;

    let body = api.get(&format!("/crons?cron_ids={a},{b},x,{c}")).await?;
    assert_eq!(ids(&body), vec![a, b, c]);

    let body = api.get("/crons?cron_ids=x,y").await?;
    assert_eq!(body, json!({ "error": false, "data": [] }));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_offset_and_limit(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    api.add("a.example").await?;
    let b = api.add("b.example").await?;
    let c = api.add("c.example").await?;

    let body = api.get("/crons?offset=1&limit=2").await?;
    assert_eq!(ids(&body), vec![b, c]);

    let body = api.get("/crons?limit=abc").await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["data"], "\"limit\" is Expected number, received nan");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_status_only_keeps_value(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let id = api.add("keep.example").await?;

    let body = api.put(&format!("/crons/{id}"), json!({ "status": "0" })).await?;
    assert_eq!(body, json!({ "error": false, "data": "Cron updated successfully!" }));

    let row = api.get(&format!("/crons/{id}")).await?;
    assert_eq!(row["data"][0]["cron"], "keep.example");
    assert_eq!(row["data"][0]["status"], 0);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_deleted_at_roundtrip_keeps_status(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let id = api.add("soft.example").await?;
    api.put(&format!("/crons/{id}"), json!({ "status": 0 })).await?;

    api.put(&format!("/crons/{id}"), json!({ "deleted_at": 1 }))
        .await?;
    let hidden = api.get(&format!("/crons/{id}")).await?;
    assert_eq!(hidden["data"], json!([]));

    let body = api
        .put(&format!("/crons/{id}"), json!({ "deleted_at": 0 }))
        .await?;
    assert_eq!(body["error"], false);

    let row = api.get(&format!("/crons/{id}")).await?;
    assert_eq!(ids(&row), vec![id]);
    assert_eq!(row["data"][0]["status"], 0);
    assert!(row["data"][0]["deleted_at"].is_null());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_missing_cron(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;

    let body = api.put("/crons/42", json!({ "status": 1 })).await?;
    assert_eq!(body, json!({ "error": true, "data": "Cron not found!" }));

    let body = api.put("/crons/42", json!({ "status": 5 })).await?;
    assert_eq!(
        body["data"],
        "\"status\" is Number must be less than or equal to 1"
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_batch_update(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let a = api.add("a.example").await?;
    let b = api.add("b.example").await?;

    let body = api
        .put("/crons", json!({ "cron_ids": [a, b, 999], "deleted_at": 1, "status": 0 }))
        .await?;
    assert_eq!(body, json!({ "error": false, "data": "Crons updated successfully!" }));

    let listed = api.get("/crons").await?;
    assert_eq!(listed["data"], json!([]));

    let explicit = api.get(&format!("/crons?cron_ids={a},{b}")).await?;
    assert_eq!(ids(&explicit), vec![a, b]);
    assert_eq!(explicit["data"][0]["status"], 0);
    assert!(!explicit["data"][1]["deleted_at"].is_null());

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_batch_update_not_found(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;

    let body = api.put("/crons", json!({ "cron_ids": [7], "status": 1 })).await?;
    assert_eq!(body, json!({ "error": true, "data": "Crons not found!" }));

    let body = api.put("/crons", json!({ "cron_ids": [], "status": 1 })).await?;
    assert_eq!(body, json!({ "error": true, "data": "Crons not found!" }));

    let body = api.put("/crons", json!({ "status": 1 })).await?;
    assert_eq!(body, json!({ "error": true, "data": "\"cron_ids\" is Required" }));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_by_id_and_by_value(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let a = api.add("a.example").await?;
    let b = api.add("b.example").await?;

    let body = api.delete(&format!("/crons/{a}"), None).await?;
    assert_eq!(body, json!({ "error": false, "data": "Cron deleted successfully!" }));

    // The body value wins over the path id.
    let body = api
        .delete("/crons/999", Some(json!({ "cron": "B.example" })))
        .await?;
    assert_eq!(body["data"], "Cron deleted successfully!");

    let remaining = api.get(&format!("/crons?cron_ids={a},{b}")).await?;
    assert_eq!(remaining["data"], json!([]));

    let body = api.delete(&format!("/crons/{a}"), None).await?;
    assert_eq!(body, json!({ "error": true, "data": "Cron not found!" }));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_batch_delete_by_ids(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let a = api.add("a.example").await?;
    let b = api.add("b.example").await?;
    let c = api.add("c.example").await?;

    let body = api
        .delete("/crons", Some(json!({ "cron_ids": [a, b, 999] })))
        .await?;
    assert_eq!(body, json!({ "error": false, "data": "Crons deleted successfully!" }));

    let remaining = api.get("/crons").await?;
    assert_eq!(ids(&remaining), vec![c]);

    let body = api.delete("/crons", Some(json!({ "cron_ids": [a] }))).await?;
    assert_eq!(body, json!({ "error": true, "data": "Crons not found!" }));

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_batch_delete_purges_soft_deleted(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let a = api.add("a.example").await?;
    let b = api.add("b.example").await?;

    let body = api.delete("/crons", None).await?;
    assert_eq!(body, json!({ "error": true, "data": "Crons not found!" }));

    api.put(&format!("/crons/{a}"), json!({ "deleted_at": 1 }))
        .await?;

    let body = api.delete("/crons", None).await?;
    assert_eq!(body, json!({ "error": false, "data": "Crons deleted successfully!" }));

    let remaining = api.get(&format!("/crons?cron_ids={a},{b}")).await?;
    assert_eq!(ids(&remaining), vec![b]);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_integral_float_numbers_are_accepted(pool: PgPool) -> Result<(), anyhow::Error> {
    let api = Api::new(pool).await?;
    let id = api.add("float.example").await?;

    let body = api
        .put(&format!("/crons/{id}"), json!({ "status": 0.0 }))
        .await?;
    assert_eq!(body, json!({ "error": false, "data": "Cron updated successfully!" }));

    let body = api
        .put("/crons", json!({ "cron_ids": [id as f64], "status": 1.0 }))
        .await?;
    assert_eq!(body, json!({ "error": false, "data": "Crons updated successfully!" }));

    let row = api.get(&format!("/crons/{id}")).await?;
    assert_eq!(row["data"][0]["status"], 1);

    let body = api
        .put(&format!("/crons/{id}"), json!({ "status": 0.5 }))
        .await?;
    assert_eq!(
        body,
        json!({ "error": true, "data": "\"status\" is Expected integer, received float" })
    );

    Ok(())
}
