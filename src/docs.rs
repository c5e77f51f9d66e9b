use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{admin, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::refresh,
		routes::auth::me,
		routes::accounts::list_accounts,
		routes::accounts::get_account,
		routes::accounts::update_account,
		routes::accounts::delete_account,
		routes::orders::list_orders,
		routes::orders::create_order,
		routes::orders::get_order,
		routes::orders::update_order,
		routes::orders::delete_order,
		routes::admin::set_admin_role,
		routes::admin::disable_user,
		routes::admin::audit_log,
		routes::admin::claim_sync_issues
	),
	components(
		schemas(
			routes::health::HealthResponse,
			models::account::Account,
			models::account::AccountPatch,
			models::account::AuthResponse,
			models::account::LoginRequest,
			models::account::RegisterRequest,
			models::order::Order,
			models::order::OrderStatus,
			models::order::OrderCreateRequest,
			models::order::OrderPatch,
			models::audit::AuditAction,
			models::audit::AuditLogEntry,
			models::audit::ClaimSyncIssue,
			admin::SetAdminRoleRequest,
			admin::SetAdminRoleResponse,
			admin::DisableUserRequest,
			admin::DisableUserResponse
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Auth", description = "Registration, sign-in and token refresh"),
		(name = "Accounts", description = "Account records"),
		(name = "Orders", description = "Vehicle pre-orders"),
		(name = "Admin", description = "Role changes, account disabling and the audit trail")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

/// Serves the document at `/api-docs/openapi.json` and Swagger UI at `/docs`.
pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_security_components(doc: &mut Value) {
	let Some(root) = doc.as_object_mut() else { return };

	let components = root.entry("components").or_insert_with(|| json!({}));
	if let Some(components) = components.as_object_mut() {
		let schemes = components.entry("securitySchemes").or_insert_with(|| json!({}));
		if let Some(schemes) = schemes.as_object_mut() {
			schemes.entry("bearerAuth").or_insert_with(|| {
				json!({
					"type": "http",
					"scheme": "bearer",
					"bearerFormat": "JWT"
				})
			});
		}
	}
}

fn add_examples(doc: &mut Value) {
	let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else { return };

	for item in paths.values_mut() {
		let Some(item) = item.as_object_mut() else { continue };
		for operation in item.values_mut() {
			apply_request_example(operation);
		}
	}
}

fn apply_request_example(operation: &mut Value) {
	let Some(app_json) = operation
		.pointer_mut("/requestBody/content/application~1json")
		.and_then(Value::as_object_mut)
	else {
		return;
	};

	let Some(schema_ref) = app_json.get("schema").and_then(|s| s.get("$ref")).and_then(Value::as_str) else {
		return;
	};

	let example = match schema_ref {
		"#/components/schemas/RegisterRequest" => Some(json!({
			"displayName": "Ada Lovelace",
			"email": "ada@example.com",
			"password": "S3cureP@ssw0rd"
		})),
		"#/components/schemas/OrderCreateRequest" => Some(json!({
			"customerName": "Grace Hopper",
			"customerPhone": "+1 555 0100",
			"vehicleModel": "Model Y",
			"trimLevel": "Long Range",
			"exteriorColor": "Pearl White",
			"optionCodes": ["TOW", "FSD"],
			"msrpCents": 4799000,
			"depositCents": 25000,
			"status": "FactoryOrder"
		})),
		"#/components/schemas/OrderPatch" => Some(json!({
			"notes": "Customer prefers pickup on Saturday"
		})),
		"#/components/schemas/SetAdminRoleRequest" => Some(json!({
			"targetId": "9f1c2f7e-5a4b-4c1d-8e2f-0a1b2c3d4e5f",
			"isAdmin": true
		})),
		"#/components/schemas/DisableUserRequest" => Some(json!({
			"targetId": "9f1c2f7e-5a4b-4c1d-8e2f-0a1b2c3d4e5f",
			"disabled": true
		})),
		_ => None,
	};

	if let Some(example) = example {
		app_json.insert("example".to_string(), example);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let tls_enabled = std::env::var("TLS_CERT_PATH").is_ok() && std::env::var("TLS_KEY_PATH").is_ok();
	let scheme = if tls_enabled { "https" } else { "http" };
	let server_url = format!("{}://localhost:{}", scheme, port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_lists_every_route_and_bearer_scheme() {
		let doc = serde_json::to_value(build_openapi(8000).unwrap()).unwrap();

		for path in ["/auth/refresh", "/orders/{id}", "/admin/set-admin-role", "/admin/audit-log"] {
			assert!(doc["paths"].get(path).is_some(), "missing {path}");
		}
		assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
		assert_eq!(doc["servers"][0]["url"], "http://localhost:8000");
	}
}
