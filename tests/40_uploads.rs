mod common;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use veerive_api::auth::Role;

// Uploads never touch the database, so these assertions hold with or without
// one behind the server.

#[tokio::test]
async fn oversized_upload_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::token_for(Role::SuperAdmin);

    // One byte over the 5MB cap
    let part = Part::bytes(vec![0u8; 5 * 1024 * 1024 + 1])
        .file_name("big.png")
        .mime_str("image/png")?;

    let resp = client
        .post(format!("{}/api/uploads", server.base_url))
        .bearer_auth(&token)
        .multipart(Form::new().part("file", part))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = resp.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    Ok(())
}

#[tokio::test]
async fn upload_round_trip_through_memory_store() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::token_for(Role::SuperAdmin);

    let part = Part::bytes(b"hello".to_vec())
        .file_name("note.pdf")
        .mime_str("application/pdf")?;
    let resp = client
        .post(format!("{}/api/uploads", server.base_url))
        .bearer_auth(&token)
        .multipart(Form::new().part("file", part))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await?;
    let key = body["data"]["key"].as_str().expect("key").to_string();
    let url = body["data"]["url"].as_str().expect("url").to_string();
    assert_eq!(url, format!("/files/{}", key));

    let served = client
        .get(format!("{}{}", server.base_url, url))
        .send()
        .await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served.headers()["content-type"].to_str()?,
        "application/pdf"
    );
    assert_eq!(served.bytes().await?.as_ref(), b"hello");

    let deleted = client
        .delete(format!("{}/api/uploads/{}", server.base_url, key))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = client
        .get(format!("{}{}", server.base_url, url))
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn disallowed_upload_type_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let token = common::token_for(Role::SuperAdmin);

    let part = Part::bytes(b"#!/bin/sh".to_vec())
        .file_name("script.sh")
        .mime_str("application/x-sh")?;
    let resp = client
        .post(format!("{}/api/uploads", server.base_url))
        .bearer_auth(&token)
        .multipart(Form::new().part("file", part))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
