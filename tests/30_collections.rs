mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use veerive_api::auth::Role;

/// Static analyst routes sit in front of the generic collection routes, so
/// every registered method must exist on them too. A missing method would
/// surface here as a 405 instead of reaching a handler.
#[tokio::test]
async fn collection_update_and_delete_are_routable() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::token_for(Role::SuperAdmin);
    let id = "00000000-0000-0000-0000-000000000001";

    for name in ["market-data", "query-refiners", "clarification-guidance", "sectors"] {
        let put = client
            .put(format!("{}/api/{}/{}", server.base_url, name, id))
            .bearer_auth(&token)
            .json(&json!({"sectorId": id, "sectorName": "x"}))
            .send()
            .await?;
        assert_ne!(put.status(), StatusCode::METHOD_NOT_ALLOWED, "PUT /api/{}/:id", name);

        let del = client
            .delete(format!("{}/api/{}/{}", server.base_url, name, id))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_ne!(del.status(), StatusCode::METHOD_NOT_ALLOWED, "DELETE /api/{}/:id", name);
    }
    Ok(())
}

#[tokio::test]
async fn analyst_single_get_is_routable() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::token_for(Role::SuperAdmin);
    let id = "00000000-0000-0000-0000-000000000002";

    for name in ["market-data", "query-refiners", "clarification-guidance"] {
        let resp = client
            .get(format!("{}/api/{}/{}?populate=true", server.base_url, name, id))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_ne!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "GET /api/{}/:id", name);
        assert_ne!(resp.status(), StatusCode::UNAUTHORIZED, "GET /api/{}/:id", name);
    }
    Ok(())
}
