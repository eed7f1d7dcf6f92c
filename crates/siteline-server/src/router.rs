use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handler, ws};

/// Build the axum router with all Siteline endpoints.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/v1/health", get(handler::health))
        .route("/v1/info", get(handler::info))
        .route("/v1/sync", post(handler::sync))
        .route("/v1/shifts/start", post(handler::start_shift))
        .route("/v1/shifts/:id/end", post(handler::end_shift))
        .route("/v1/conflicts", get(handler::list_conflicts))
        .route("/v1/conflicts/:id/resolve", post(handler::resolve_conflict))
        .route("/v1/assignments", post(handler::grant_assignment))
        .route("/v1/assignments/:id", delete(handler::revoke_assignment))
        .route("/v1/events", get(ws::events))
        .layer(TraceLayer::new_for_http());

    if state.config.permissive_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        );
    }

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use siteline_ledger::{Assignment, AssignmentStore, Shift, Site};
    use siteline_types::{GeoPoint, SiteId, UserId};

    use crate::auth::{ROLE_HEADER, USER_HEADER};
    use crate::config::ServerConfig;
    use crate::state::{AppState, InMemoryStores};

    struct Harness {
        router: Router,
        stores: InMemoryStores,
        worker: UserId,
        site: SiteId,
        center: GeoPoint,
    }

    /// Router over an in-memory stack with one assigned worker and one
    /// active 50 m site.
    fn harness() -> Harness {
        let (state, stores) = AppState::in_memory(ServerConfig::default());
        let center = GeoPoint::new(43.6532, -79.3832).unwrap();
        let site = stores
            .sites
            .upsert(Site::new("Harbour tower", center, 50))
            .unwrap();
        let worker = UserId::new();
        stores
            .assignments
            .insert(Assignment::new(worker, site.id))
            .unwrap();

        Harness {
            router: super::build_router(state),
            stores,
            worker,
            site: site.id,
            center,
        }
    }

    fn request(
        method: Method,
        uri: &str,
        identity: Option<(UserId, &str)>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user, role)) = identity {
            builder = builder
                .header(USER_HEADER, user.to_string())
                .header(ROLE_HEADER, role);
        }
        match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let h = harness();
        let response = h
            .router
            .oneshot(request(Method::GET, "/v1/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let h = harness();
        let response = h
            .router
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                None,
                Some(json!({"site_id": h.site})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn shift_start_then_second_start_conflicts() {
        let h = harness();

        let response = h
            .router
            .clone()
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                Some((h.worker, "worker")),
                Some(json!({"site_id": h.site, "location": h.center})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let shift: Shift = serde_json::from_value(json_body(response).await).unwrap();
        assert!(shift.active);

        let again = h
            .router
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                Some((h.worker, "worker")),
                Some(json!({"site_id": h.site})),
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn geofence_rejection_carries_detail() {
        let h = harness();
        // ~80 m north of a 50 m fence.
        let away = GeoPoint::new(43.65392, -79.3832).unwrap();

        let response = h
            .router
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                Some((h.worker, "worker")),
                Some(json!({"site_id": h.site, "location": away})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert_eq!(body["detail"]["radius_m"], 50);
        let distance = body["detail"]["distance_m"].as_u64().unwrap();
        assert!((75..=85).contains(&distance), "got {distance}");
    }

    #[tokio::test]
    async fn end_shift_roundtrip() {
        let h = harness();
        let start = h
            .router
            .clone()
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                Some((h.worker, "worker")),
                Some(json!({"site_id": h.site})),
            ))
            .await
            .unwrap();
        let shift: Shift = serde_json::from_value(json_body(start).await).unwrap();

        let end = h
            .router
            .oneshot(request(
                Method::POST,
                &format!("/v1/shifts/{}/end", shift.id),
                Some((h.worker, "worker")),
                Some(json!({})),
            ))
            .await
            .unwrap();
        assert_eq!(end.status(), StatusCode::OK);
        let ended: Shift = serde_json::from_value(json_body(end).await).unwrap();
        assert!(!ended.active);
        assert!(ended.ended_at.is_some());
    }

    #[tokio::test]
    async fn sync_applies_a_device_batch() {
        let h = harness();
        let shift_id = siteline_types::ShiftId::new();

        let response = h
            .router
            .oneshot(request(
                Method::POST,
                "/v1/sync",
                Some((h.worker, "worker")),
                Some(json!({
                    "device_id": "pixel-7a",
                    "mutations": [
                        {"shift_id": shift_id, "kind": "start_shift", "site": h.site},
                        {"shift_id": shift_id, "kind": "end_shift"}
                    ]
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["applied"].as_array().unwrap().len(), 2);
        assert_eq!(body["conflicts"].as_array().unwrap().len(), 0);
        assert_eq!(body["snapshot"]["shifts"].as_array().unwrap().len(), 1);
        assert_eq!(body["snapshot"]["shifts"][0]["active"], false);
        assert!(body["snapshot"]["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn conflict_queue_is_operator_only() {
        let h = harness();

        let as_worker = h
            .router
            .clone()
            .oneshot(request(
                Method::GET,
                "/v1/conflicts",
                Some((h.worker, "worker")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(as_worker.status(), StatusCode::FORBIDDEN);

        let as_operator = h
            .router
            .oneshot(request(
                Method::GET,
                "/v1/conflicts?status=pending",
                Some((UserId::new(), "operator")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(as_operator.status(), StatusCode::OK);
        assert_eq!(json_body(as_operator).await, json!([]));
    }

    #[tokio::test]
    async fn granting_an_assignment_unlocks_shift_start() {
        let h = harness();
        let new_worker = UserId::new();

        // Unassigned: forbidden.
        let before = h
            .router
            .clone()
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                Some((new_worker, "worker")),
                Some(json!({"site_id": h.site})),
            ))
            .await
            .unwrap();
        assert_eq!(before.status(), StatusCode::FORBIDDEN);

        let grant = h
            .router
            .clone()
            .oneshot(request(
                Method::POST,
                "/v1/assignments",
                Some((UserId::new(), "operator")),
                Some(json!({"worker": new_worker, "site_id": h.site})),
            ))
            .await
            .unwrap();
        assert_eq!(grant.status(), StatusCode::OK);

        let after = h
            .router
            .oneshot(request(
                Method::POST,
                "/v1/shifts/start",
                Some((new_worker, "worker")),
                Some(json!({"site_id": h.site})),
            ))
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::OK);

        // Exactly one active shift exists for the new worker.
        use siteline_ledger::ShiftStore;
        let rows = h.stores.shifts.for_worker(&new_worker).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].active);
    }
}
