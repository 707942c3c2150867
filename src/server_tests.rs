// src/server_tests.rs

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::str::FromStr;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::{self, AuthService, Role};
    use crate::holidays::builtin_calendar;
    use crate::server::{create_router, AppState};
    use crate::store::{TrackerStore, UserAccount};

    fn test_state() -> AppState {
        AppState {
            store: TrackerStore::new(None),
            auth: AuthService::new(12),
            calendar: Arc::new(builtin_calendar().clone()),
        }
    }

    /// Normalize a decimal string so "1.60" and "1.6" compare equal.
    fn normalize_decimal(s: &str) -> String {
        Decimal::from_str(s).unwrap().normalize().to_string()
    }

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    /// Like `send`, but keeps the raw body and content type (for CSV).
    async fn send_for_text(
        state: &AppState,
        uri: &str,
        token: &str,
    ) -> (StatusCode, Option<String>, String) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn register_trainee(state: &AppState, name: &str, email: &str) -> (String, String) {
        let (status, body) = send(
            state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": "hunter22pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Supervisors are seeded, never registered, so tests plant one
    /// directly in the store and log in through the API.
    async fn seed_supervisor(state: &AppState) -> (String, String) {
        let salt = auth::generate_salt();
        let account = UserAccount {
            id: "sup-tests0001".to_string(),
            name: "Remy the Supervisor".to_string(),
            email: "remy@example.com".to_string(),
            role: Role::Supervisor,
            password_hash: auth::hash_password("supersecret1", &salt),
            salt,
            created_at: Utc::now(),
        };
        state.store.insert_user(account).unwrap();

        let (status, body) = send(
            state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "remy@example.com", "password": "supersecret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            "sup-tests0001".to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Pins the trainee's schedule so tests never depend on the wall clock
    /// that the lazily created default would capture.
    async fn pin_schedule(state: &AppState, token: &str) {
        let (status, body) = send(
            state,
            "PUT",
            "/api/schedule",
            Some(token),
            Some(json!({
                "targetHours": 500,
                "startDate": "2026-01-02",
                "hoursPerDay": 8,
                "excludeHolidays": true,
                "workDays": [1, 2, 3, 4, 5],
                "autoProjection": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "schedule update failed: {}", body);
    }

    #[tokio::test]
    async fn test_register_login_and_me_flow() {
        let state = test_state();
        let (user_id, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;

        let (status, body) = send(&state, "GET", "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user_id.as_str());
        assert_eq!(body["name"], "Ana Cruz");
        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["role"], "trainee");
        assert!(body.get("passwordHash").is_none());

        // A fresh login issues a different, equally valid token.
        let (status, body) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "hunter22pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let second = body["token"].as_str().unwrap().to_string();
        assert_ne!(second, token);
        let (status, _) = send(&state, "GET", "/api/me", Some(&second), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let state = test_state();

        let (status, body) = send(
            &state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "name": "Ana", "email": "ana@example.com", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("password"));

        let (status, _) = send(
            &state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "name": "Ana", "email": "not-an-email", "password": "hunter22pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        let (status, body) = send(
            &state,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "name": "Other Ana", "email": "ANA@example.com", "password": "hunter22pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already registered"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let state = test_state();
        register_trainee(&state, "Ana Cruz", "ana@example.com").await;

        let (status, body) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "wrongwrong1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid email or password");

        // Unknown emails produce the same answer.
        let (status, _) = send(
            &state,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "whatever123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_routes_require_a_valid_token() {
        let state = test_state();

        let (status, body) = send(&state, "GET", "/api/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication required");

        let (status, _) = send(&state, "GET", "/api/me", Some("bogus-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // The health endpoint stays public.
        let (status, body) = send(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_logout_revokes_the_session() {
        let state = test_state();
        let (_, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;

        let (status, _) = send(&state, "POST", "/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&state, "GET", "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_schedule_defaults_then_replacement() {
        let state = test_state();
        let (_, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;

        let (status, body) = send(&state, "GET", "/api/schedule", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["targetHours"], 500);
        assert_eq!(body["hoursPerDay"], 8);
        assert_eq!(body["excludeHolidays"], true);
        assert_eq!(body["autoProjection"], true);
        assert_eq!(body["workDays"], json!([1, 2, 3, 4, 5]));

        let (status, body) = send(
            &state,
            "PUT",
            "/api/schedule",
            Some(&token),
            Some(json!({
                "targetHours": 600,
                "startDate": "2026-02-02",
                "hoursPerDay": 6,
                "excludeHolidays": false,
                "workDays": [1, 2, 3, 4, 5, 6],
                "autoProjection": false
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);

        let (_, body) = send(&state, "GET", "/api/schedule", Some(&token), None).await;
        assert_eq!(body["targetHours"], 600);
        assert_eq!(body["startDate"], "2026-02-02");
        assert_eq!(body["workDays"], json!([1, 2, 3, 4, 5, 6]));

        // Domain-invalid settings are rejected with a pointed message.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/schedule",
            Some(&token),
            Some(json!({
                "targetHours": 600,
                "startDate": "2026-02-02",
                "hoursPerDay": 0,
                "excludeHolidays": false,
                "workDays": [1, 2],
                "autoProjection": false
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("hoursPerDay"));
    }

    #[tokio::test]
    async fn test_log_upsert_rules() {
        let state = test_state();
        let (_, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &token).await;

        // Logging a working Monday with no explicit hours uses the declared
        // rate and defaults to completed.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-05",
            Some(&token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(normalize_decimal(body["hoursWorked"].as_str().unwrap()), "8");
        assert_eq!(body["status"], "completed");

        // Editing the same date replaces, not duplicates.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-05",
            Some(&token),
            Some(json!({ "hoursWorked": "7.5", "tasks": "ticket triage" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(normalize_decimal(body["hoursWorked"].as_str().unwrap()), "7.5");
        assert_eq!(body["tasks"], "ticket triage");

        let (_, body) = send(&state, "GET", "/api/logs", Some(&token), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        // Saturday is outside the Monday-Friday schedule.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-03",
            Some(&token),
            Some(json!({ "hoursWorked": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("not a working day"));

        // Chinese New Year 2026 falls on a Tuesday but is excluded.
        let (status, _) = send(
            &state,
            "PUT",
            "/api/logs/2026-02-17",
            Some(&token),
            Some(json!({ "hoursWorked": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        // Days before the schedule start never count.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2025-12-30",
            Some(&token),
            Some(json!({ "hoursWorked": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("start date"));

        // Malformed dates and out-of-range hours.
        let (status, _) = send(
            &state,
            "PUT",
            "/api/logs/2026-13-40",
            Some(&token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-06",
            Some(&token),
            Some(json!({ "hoursWorked": 25 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("between 0 and 24"));
    }

    #[tokio::test]
    async fn test_log_range_query_and_delete() {
        let state = test_state();
        let (_, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &token).await;

        for day in ["2026-01-05", "2026-01-06", "2026-01-12"] {
            let (status, _) = send(
                &state,
                "PUT",
                &format!("/api/logs/{}", day),
                Some(&token),
                Some(json!({ "hoursWorked": 8 })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &state,
            "GET",
            "/api/logs?from=2026-01-06&to=2026-01-12",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let dates: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, vec!["2026-01-06", "2026-01-12"]);

        let (status, _) = send(
            &state,
            "GET",
            "/api/logs?from=January+6",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&state, "DELETE", "/api/logs/2026-01-06", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&state, "DELETE", "/api/logs/2026-01-06", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("no log entry"));
    }

    #[tokio::test]
    async fn test_progress_endpoint_projects_from_logs() {
        let state = test_state();
        let (_, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &token).await;

        let (status, _) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-05",
            Some(&token),
            Some(json!({ "hoursWorked": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &state,
            "GET",
            "/api/progress?asOf=2026-01-06",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(
            normalize_decimal(body["totalHoursCompleted"].as_str().unwrap()),
            "8"
        );
        assert_eq!(body["totalDaysCompleted"], 1);
        assert_eq!(
            normalize_decimal(body["remainingHours"].as_str().unwrap()),
            "492"
        );
        assert_eq!(body["remainingDays"], 62);
        assert_eq!(
            normalize_decimal(body["progressPercentage"].as_str().unwrap()),
            "1.6"
        );
        assert_eq!(body["projectedEndDate"], "2026-04-07");
        assert_eq!(body["targetHours"], 500);

        let details = &body["projectionDetails"];
        assert_eq!(details["projectionBasis"], "average");
        assert_eq!(details["workingDaysRemaining"], 62);
        assert_eq!(details["workingDaysFromStart"], 3);
        assert_eq!(details["workingDaysUsed"], 1);
        assert_eq!(details["daysBehind"], 2);
        assert_eq!(details["daysAhead"], 0);
        assert_eq!(
            normalize_decimal(details["averageHoursPerLoggedDay"].as_str().unwrap()),
            "8"
        );

        let (status, _) = send(
            &state,
            "GET",
            "/api/progress?asOf=yesterday",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_supervisor_validation_flow() {
        let state = test_state();
        let (trainee_id, trainee_token) =
            register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &trainee_token).await;
        let (supervisor_id, supervisor_token) = seed_supervisor(&state).await;

        let (status, _) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-05",
            Some(&trainee_token),
            Some(json!({ "hoursWorked": 8 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Trainees cannot reach supervisor endpoints.
        let (status, body) = send(&state, "GET", "/api/trainees", Some(&trainee_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("supervisor"));

        let (status, body) = send(&state, "GET", "/api/trainees", Some(&supervisor_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap())
            .collect();
        assert_eq!(listed, vec![trainee_id.as_str()]);

        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/trainees/{}/logs/2026-01-05/validate", trainee_id),
            Some(&supervisor_token),
            Some(json!({ "notes": "matches the attendance sheet" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["isValidated"], true);
        assert_eq!(body["validatedBy"], supervisor_id.as_str());
        assert_eq!(body["validationNotes"], "matches the attendance sheet");
        assert!(body["validatedAt"].as_str().is_some());

        // A trainee edit wipes the stamp: the validated content is gone.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-05",
            Some(&trainee_token),
            Some(json!({ "hoursWorked": 6 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValidated"], false);
        assert!(body.get("validatedBy").is_none());

        // Validate again, then retract.
        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/trainees/{}/logs/2026-01-05/validate", trainee_id),
            Some(&supervisor_token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/trainees/{}/logs/2026-01-05/invalidate", trainee_id),
            Some(&supervisor_token),
            Some(json!({ "reason": "wrong attendance sheet" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValidated"], false);

        // Validating a date with no entry is a 404.
        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/trainees/{}/logs/2026-01-07/validate", trainee_id),
            Some(&supervisor_token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // So is addressing a trainee that does not exist.
        let (status, _) = send(
            &state,
            "GET",
            "/api/trainees/ghost/progress",
            Some(&supervisor_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_special_workday_lifecycle() {
        let state = test_state();
        let (trainee_id, trainee_token) =
            register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &trainee_token).await;
        let (_, supervisor_token) = seed_supervisor(&state).await;

        // Saturday 2026-01-03 is normally inactive.
        let (status, _) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-03",
            Some(&trainee_token),
            Some(json!({ "hoursWorked": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &state,
            "PUT",
            &format!("/api/trainees/{}/special-workdays/2026-01-03", trainee_id),
            Some(&supervisor_token),
            Some(json!({ "reason": "weekend deployment" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["isSpecialWorkday"], true);
        assert_eq!(body["specialWorkdayReason"], "weekend deployment");
        assert_eq!(body["status"], "completed");
        assert_eq!(normalize_decimal(body["hoursWorked"].as_str().unwrap()), "8");

        // The overlay opens the day for ordinary edits.
        let (status, body) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-03",
            Some(&trainee_token),
            Some(json!({ "hoursWorked": 6, "tasks": "cutover support" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSpecialWorkday"], true);
        assert_eq!(normalize_decimal(body["hoursWorked"].as_str().unwrap()), "6");

        // A reason is mandatory.
        let (status, _) = send(
            &state,
            "PUT",
            &format!("/api/trainees/{}/special-workdays/2026-01-10", trainee_id),
            Some(&supervisor_token),
            Some(json!({ "reason": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Unmarking keeps the logged hours but closes the day again.
        let (status, body) = send(
            &state,
            "DELETE",
            &format!("/api/trainees/{}/special-workdays/2026-01-03", trainee_id),
            Some(&supervisor_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSpecialWorkday"], false);
        assert_eq!(normalize_decimal(body["hoursWorked"].as_str().unwrap()), "6");

        let (status, _) = send(
            &state,
            "PUT",
            "/api/logs/2026-01-03",
            Some(&trainee_token),
            Some(json!({ "hoursWorked": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_batch_validation_is_best_effort() {
        let state = test_state();
        let (trainee_id, trainee_token) =
            register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &trainee_token).await;
        let (_, supervisor_token) = seed_supervisor(&state).await;

        for day in ["2026-01-05", "2026-01-06"] {
            let (status, _) = send(
                &state,
                "PUT",
                &format!("/api/logs/{}", day),
                Some(&trainee_token),
                Some(json!({ "hoursWorked": 8 })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &state,
            "POST",
            "/api/validate-batch",
            Some(&supervisor_token),
            Some(json!({
                "notes": "weekly batch",
                "entries": [
                    { "userId": trainee_id, "date": "2026-01-05" },
                    { "userId": trainee_id, "date": "2026-01-07" },
                    { "userId": trainee_id, "date": "2026-01-06" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["validated"], 2);
        assert_eq!(body["failed"], 1);

        let outcomes = body["outcomes"].as_array().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0]["validated"], true);
        assert_eq!(outcomes[1]["validated"], false);
        assert!(outcomes[1]["error"].as_str().unwrap().contains("2026-01-07"));
        assert_eq!(outcomes[2]["validated"], true);
    }

    #[tokio::test]
    async fn test_supervisor_manages_a_trainee_schedule() {
        let state = test_state();
        let (trainee_id, trainee_token) =
            register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        let (_, supervisor_token) = seed_supervisor(&state).await;

        let uri = format!("/api/trainees/{}/schedule", trainee_id);
        let (status, body) = send(&state, "GET", &uri, Some(&supervisor_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["targetHours"], 500);

        let (status, _) = send(
            &state,
            "PUT",
            &uri,
            Some(&supervisor_token),
            Some(json!({
                "targetHours": 320,
                "startDate": "2026-01-05",
                "hoursPerDay": 4,
                "excludeHolidays": true,
                "workDays": [1, 2, 3, 4, 5],
                "autoProjection": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // The trainee sees the schedule the supervisor set.
        let (_, body) = send(&state, "GET", "/api/schedule", Some(&trainee_token), None).await;
        assert_eq!(body["targetHours"], 320);
        assert_eq!(body["hoursPerDay"], 4);

        let (status, _) = send(
            &state,
            "GET",
            "/api/trainees/ghost/schedule",
            Some(&supervisor_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_holidays_endpoint_reports_coverage() {
        let state = test_state();
        let (_, token) = register_trainee(&state, "Ana Cruz", "ana@example.com").await;

        let (status, body) = send(&state, "GET", "/api/holidays?year=2026", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["year"], 2026);
        assert_eq!(body["covered"], true);
        let holidays = body["holidays"].as_array().unwrap();
        assert!(holidays
            .iter()
            .any(|h| h["date"] == "2026-08-31" && h["name"] == "National Heroes Day"));
        assert!(holidays
            .iter()
            .any(|h| h["date"] == "2026-12-24" && h["type"] == "special"));

        let (status, body) = send(&state, "GET", "/api/holidays?year=2027", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["covered"], false);
        assert!(body["holidays"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_csv_export_for_trainee_and_supervisor() {
        let state = test_state();
        let (trainee_id, trainee_token) =
            register_trainee(&state, "Ana Cruz", "ana@example.com").await;
        pin_schedule(&state, &trainee_token).await;
        let (_, supervisor_token) = seed_supervisor(&state).await;

        for (day, hours) in [("2026-01-05", "7.5"), ("2026-01-06", "8")] {
            let (status, _) = send(
                &state,
                "PUT",
                &format!("/api/logs/{}", day),
                Some(&trainee_token),
                Some(json!({ "hoursWorked": hours, "tasks": "onboarding" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, content_type, text) =
            send_for_text(&state, "/api/reports/logs.csv", &trainee_token).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/csv"));
        assert!(text.starts_with("date,status,hoursWorked"));
        assert!(text.contains("2026-01-05,completed,7.5"));
        assert!(text.contains("2026-01-06"));

        // A bounded export slices the history.
        let (status, _, text) = send_for_text(
            &state,
            "/api/reports/logs.csv?from=2026-01-06",
            &trainee_token,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!text.contains("2026-01-05"));
        assert!(text.contains("2026-01-06"));

        let uri = format!("/api/trainees/{}/reports/logs.csv", trainee_id);
        let (status, _, text) = send_for_text(&state, &uri, &supervisor_token).await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("2026-01-05"));

        // Trainees cannot pull another trainee's export.
        let (status, _, _) = send_for_text(&state, &uri, &trainee_token).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
