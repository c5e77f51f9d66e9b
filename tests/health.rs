use anyhow::Result;
use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn health_endpoint_reports_db_ok() -> Result<()> {
    let db = common::test_db().await?;
    let app = common::app(&db.pool);

    let (status, v) = common::send(&app, "GET", "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK, "health endpoint did not return 200");

    let db_ok = v.get("dbOk").and_then(|b| b.as_bool()).unwrap_or(false);
    assert!(db_ok, "expected dbOk: true, got: {}", v);

    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let db = common::test_db().await?;
    let doc = preorder::docs::build_openapi(8000)?;
    let app = common::app(&db.pool).merge(preorder::docs::swagger_routes(doc)?);

    let (status, v) = common::send(&app, "GET", "/api-docs/openapi.json", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(v["paths"].get("/admin/disable-user").is_some());

    Ok(())
}
