//! # Gateway Surface
//!
//! The HTTP surface driven through the real router with `tower::oneshot`,
//! on a non-memory backend, with tokens minted the way the identity
//! collaborator mints them.

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use clinic_core::{ClinicStore, NewUser, Principal, Role, SqliteStore, User};
    use clinic_gateway::{mint_token, verify_token, AppState};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "integration-secret";

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(store: &Arc<dyn ClinicStore>, name: &str, email: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                name: name.into(),
                email: email.into(),
                password_hash: "hash".into(),
                role,
                phone: None,
                specialization: None,
                experience: None,
            })
            .await
            .unwrap()
    }

    fn token(user: &User) -> String {
        mint_token(
            SECRET.as_bytes(),
            &Principal {
                id: user.id,
                role: user.role,
            },
        )
    }

    #[tokio::test]
    async fn test_full_flow_over_http_on_sqlite() {
        let store: Arc<dyn ClinicStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let state = AppState::new(store.clone(), SECRET, 16);
        let app = clinic_gateway::router::router(state);

        let patient = register(&store, "Priya", "priya@example.com", Role::Patient).await;
        let doctor = register(&store, "Dr. Okafor", "okafor@example.com", Role::Doctor).await;
        let stranger = register(&store, "Quinn", "quinn@example.com", Role::Patient).await;

        // Booking carries the doctor id; patient_id comes from the token
        // even if the body tries to smuggle one in.
        let (status, booked) = send(
            &app,
            Method::POST,
            "/appointments",
            Some(&token(&patient)),
            Some(json!({
                "doctor_id": doctor.id,
                "patient_id": stranger.id,
                "date": "2024-06-01",
                "time": "10:00",
                "symptoms": "fever",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booked["patient_id"], patient.id.to_string());
        let id = booked["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("/appointments/{id}/status"),
            Some(&token(&doctor)),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, completed) = send(
            &app,
            Method::PATCH,
            &format!("/appointments/{id}/status"),
            Some(&token(&doctor)),
            Some(json!({"status": "completed", "diagnosis": "flu", "prescription": "rest"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["diagnosis"], "flu");

        let (status, posted) = send(
            &app,
            Method::POST,
            &format!("/chat/{id}"),
            Some(&token(&patient)),
            Some(json!({"message": "thanks"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(posted["sender"]["name"], "Priya");

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/chat/{id}"),
            Some(&token(&stranger)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Denormalized listing for the doctor side.
        let (status, mine) = send(
            &app,
            Method::GET,
            "/appointments/mine",
            Some(&token(&doctor)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert_eq!(mine[0]["patient"]["name"], "Priya");
        assert!(mine[0]["patient"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_token_round_trip_matches_gateway_expectations() {
        let principal = Principal {
            id: clinic_core::EntityId::generate(),
            role: Role::Admin,
        };
        let token = mint_token(SECRET.as_bytes(), &principal);
        assert_eq!(verify_token(SECRET.as_bytes(), &token), Some(principal));
        assert_eq!(verify_token(b"wrong", &token), None);

        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);
        tampered.push_str("00");
        assert_eq!(verify_token(SECRET.as_bytes(), &tampered), None);
    }

    #[tokio::test]
    async fn test_conflict_maps_to_409() {
        let store: Arc<dyn ClinicStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        register(&store, "Priya", "priya@example.com", Role::Patient).await;

        let err = store
            .create_user(NewUser {
                name: "Copy".into(),
                email: "priya@example.com".into(),
                password_hash: "hash".into(),
                role: Role::Patient,
                phone: None,
                specialization: None,
                experience: None,
            })
            .await
            .unwrap_err();
        let api: clinic_gateway::ApiError = clinic_core::CoreError::from(err).into();
        assert_eq!(api.status, StatusCode::CONFLICT);
    }
}
