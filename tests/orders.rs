use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;
use common::{register, send, ROOT_EMAIL};

fn order_body() -> Value {
    json!({
        "customerName": "Grace Hopper",
        "customerPhone": "+1 555 0100",
        "vehicleModel": "Model Y",
        "trimLevel": "Long Range",
        "optionCodes": ["TOW"],
        "msrpCents": 4799000,
        "depositCents": 25000
    })
}

#[tokio::test]
async fn creation_stamps_the_caller_whatever_the_client_sends() -> Result<()> {
    let db = common::test_db().await?;
    let app = common::app(&db.pool);
    let u1 = register(&app, "u1@example.com", "User One").await?;
    let u2 = register(&app, "u2@example.com", "User Two").await?;

    let mut body = order_body();
    body["creatorId"] = json!(u2.id.to_string());
    body["creatorEmail"] = json!("u2@example.com");
    body["createdAt"] = json!("2001-01-01T00:00:00Z");

    let (status, order) = send(&app, "POST", "/orders", Some(&u1.token), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["creatorId"], u1.id.to_string());
    assert_eq!(order["creatorEmail"], "u1@example.com");
    assert_eq!(order["status"], "FactoryOrder");
    assert_ne!(order["createdAt"], "2001-01-01T00:00:00Z");

    let mut locate = order_body();
    locate["status"] = json!("Locate");
    let (status, order) = send(&app, "POST", "/orders", Some(&u1.token), Some(locate)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "Locate");

    Ok(())
}

#[tokio::test]
async fn orders_must_start_in_an_initial_status() -> Result<()> {
    let db = common::test_db().await?;
    let app = common::app(&db.pool);
    let u1 = register(&app, "u1@example.com", "User One").await?;

    let mut received = order_body();
    received["status"] = json!("Received");
    let (status, _) = send(&app, "POST", "/orders", Some(&u1.token), Some(received)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut unknown = order_body();
    unknown["status"] = json!("Shipped");
    let (status, body) = send(&app, "POST", "/orders", Some(&u1.token), Some(unknown)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid-argument");

    let (status, _) = send(&app, "POST", "/orders", None, Some(order_body())).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn two_users_and_an_admin() -> Result<()> {
    let db = common::test_db().await?;
    let app = common::app(&db.pool);
    let admin = register(&app, ROOT_EMAIL, "Admin").await?;
    let u1 = register(&app, "u1@example.com", "User One").await?;
    let u2 = register(&app, "u2@example.com", "User Two").await?;

    let (_, order) = send(&app, "POST", "/orders", Some(&u1.token), Some(order_body())).await?;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    // u2 can neither read nor list u1's order
    let (status, _) = send(&app, "GET", &uri, Some(&u2.token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, list) = send(&app, "GET", "/orders", Some(&u2.token), None).await?;
    assert_eq!(list, json!([]));
    let (status, _) = send(&app, "PUT", &uri, Some(&u2.token), Some(json!({ "notes": "mine now" }))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // u1 edits owner fields only
    let (status, updated) = send(&app, "PUT", &uri, Some(&u1.token), Some(json!({ "notes": "call after 5pm" }))).await?;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["notes"], "call after 5pm");

    for patch in [
        json!({ "status": "Received" }),
        json!({ "creatorId": u2.id.to_string() }),
        json!({ "vehicleModel": "Model 3" }),
        json!({ "createdAt": "2020-01-01T00:00:00Z" }),
    ] {
        let (status, body) = send(&app, "PUT", &uri, Some(&u1.token), Some(patch.clone())).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{patch} -> {body}");
    }

    // The admin sees everything and drives the status forward
    let (_, list) = send(&app, "GET", "/orders", Some(&admin.token), None).await?;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "PUT", &uri, Some(&admin.token), Some(json!({ "status": "Received" }))).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "Received");
    assert_eq!(body["creatorId"], u1.id.to_string());

    let (status, _) = send(&app, "PUT", &uri, Some(&admin.token), Some(json!({ "status": "FactoryOrder" }))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "PUT", &uri, Some(&admin.token), Some(json!({ "creatorEmail": "admin@example.com" }))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PUT", &uri, Some(&admin.token), Some(json!({ "status": "Delivered" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Delivered");

    let (status, _) = send(&app, "PUT", &uri, Some(&admin.token), Some(json!({ "status": "Received" }))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Only admins delete
    let (status, _) = send(&app, "DELETE", &uri, Some(&u1.token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(&admin.token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &uri, Some(&admin.token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn unknown_order_is_not_found() -> Result<()> {
    let db = common::test_db().await?;
    let app = common::app(&db.pool);
    let u1 = register(&app, "u1@example.com", "User One").await?;

    let (status, body) = send(&app, "GET", &format!("/orders/{}", Uuid::new_v4()), Some(&u1.token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not-found");

    Ok(())
}
