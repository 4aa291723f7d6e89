//! API integration tests
//!
//! These run against a live server with a migrated database:
//! `cargo test -- --ignored`

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use serde_json::{json, Value};

use labstock_server::models::{enums::Role, user::UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn make_token(sub: &str, role: Role) -> String {
    let secret =
        std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".into());
    let claims = UserClaims {
        sub: sub.to_string(),
        name: sub.to_string(),
        role,
        email: None,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

async fn create_item(client: &Client, admin: &str, total: i32) -> Value {
    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "asset_tag": format!("TST-{}", uuid::Uuid::new_v4()),
            "name": "Function generator",
            "category": "Electronics",
            "condition": "Good",
            "total_quantity": total
        }))
        .send()
        .await
        .expect("Failed to create equipment");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse equipment")
}

async fn submit_borrow(
    client: &Client,
    token: &str,
    equipment_id: &str,
    qty: i32,
    start_days: i64,
    end_days: i64,
) -> reqwest::Response {
    client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "equipment_id": equipment_id,
            "qty": qty,
            "intended_start": Utc::now() + Duration::days(start_days),
            "intended_end": Utc::now() + Duration::days(end_days),
            "purpose": "lab session"
        }))
        .send()
        .await
        .expect("Failed to submit borrow")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_student_cannot_create_equipment() {
    let client = Client::new();
    let student = make_token("s-1001", Role::Student);

    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(&student)
        .json(&json!({
            "asset_tag": "NOPE-1",
            "name": "Multimeter",
            "category": "Measurement",
            "total_quantity": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_abutting_window_is_allowed() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let item = create_item(&client, &admin, 5).await;
    let id = item["id"].as_str().unwrap();

    // Fill [day 1, day 5) completely and release it
    let r = submit_borrow(&client, &admin, id, 5, 1, 5).await;
    assert_eq!(r.status(), 201);
    let reservation: Value = r.json().await.unwrap();
    let rid = reservation["id"].as_str().unwrap();
    for step in ["approve", "release"] {
        let r = client
            .post(format!("{}/borrows/{}/{}", BASE_URL, rid, step))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert!(r.status().is_success(), "step {} failed", step);
    }

    // Abutting window [day 5, day 10) must be available
    let r = client
        .get(format!("{}/equipment/{}/availability", BASE_URL, id))
        .bearer_auth(&admin)
        .query(&[
            ("start", (Utc::now() + Duration::days(5)).to_rfc3339()),
            ("end", (Utc::now() + Duration::days(10)).to_rfc3339()),
            ("qty", "5".to_string()),
        ])
        .send()
        .await
        .unwrap();
    let body: Value = r.json().await.unwrap();
    assert_eq!(body["ok"], true);

    // Overlapping window [day 4, day 6) must not be
    let r = client
        .get(format!("{}/equipment/{}/availability", BASE_URL, id))
        .bearer_auth(&admin)
        .query(&[
            ("start", (Utc::now() + Duration::days(4)).to_rfc3339()),
            ("end", (Utc::now() + Duration::days(6)).to_rfc3339()),
            ("qty", "5".to_string()),
        ])
        .send()
        .await
        .unwrap();
    let body: Value = r.json().await.unwrap();
    assert_eq!(body["ok"], false);
}

#[tokio::test]
#[ignore]
async fn test_release_race_admits_exactly_one() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let item = create_item(&client, &admin, 1).await;
    let id = item["id"].as_str().unwrap();

    // Two approved qty=1 reservations over non-overlapping windows
    let mut reservation_ids = Vec::new();
    for (s, e) in [(1, 3), (10, 12)] {
        let r = submit_borrow(&client, &admin, id, 1, s, e).await;
        assert_eq!(r.status(), 201);
        let v: Value = r.json().await.unwrap();
        let rid = v["id"].as_str().unwrap().to_string();
        let r = client
            .post(format!("{}/borrows/{}/approve", BASE_URL, rid))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert!(r.status().is_success());
        reservation_ids.push(rid);
    }

    // Release both concurrently; the ledger admits exactly one
    let release = |rid: String| {
        let client = client.clone();
        let admin = admin.clone();
        async move {
            client
                .post(format!("{}/borrows/{}/release", BASE_URL, rid))
                .bearer_auth(&admin)
                .send()
                .await
                .unwrap()
                .status()
        }
    };
    let (a, b) = tokio::join!(
        release(reservation_ids[0].clone()),
        release(reservation_ids[1].clone())
    );
    let successes = [a, b].iter().filter(|s| s.is_success()).count();
    assert_eq!(successes, 1, "expected one success, got {:?} {:?}", a, b);
}

#[tokio::test]
#[ignore]
async fn test_return_requested_units_still_reserve_their_window() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let item = create_item(&client, &admin, 5).await;
    let id = item["id"].as_str().unwrap();

    // All 5 units out over [day 1, day 5)
    let r = submit_borrow(&client, &admin, id, 5, 1, 5).await;
    let v: Value = r.json().await.unwrap();
    let rid = v["id"].as_str().unwrap();
    for step in ["approve", "release"] {
        let r = client
            .post(format!("{}/borrows/{}/{}", BASE_URL, rid, step))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert!(r.status().is_success());
    }

    // Hand 2 units back; the review is pending, 3 units remain out
    let r = client
        .post(format!("{}/borrows/{}/return", BASE_URL, rid))
        .bearer_auth(&admin)
        .json(&json!({
            "returned_qty": 2,
            "condition_after": "Good",
            "damage_severity": "None"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 201);

    let check = |qty: i32| {
        let client = client.clone();
        let admin = admin.clone();
        async move {
            let r = client
                .get(format!("{}/equipment/{}/availability", BASE_URL, id))
                .bearer_auth(&admin)
                .query(&[
                    ("start", (Utc::now() + Duration::days(2)).to_rfc3339()),
                    ("end", (Utc::now() + Duration::days(4)).to_rfc3339()),
                    ("qty", qty.to_string()),
                ])
                .send()
                .await
                .unwrap();
            let body: Value = r.json().await.unwrap();
            body["ok"].as_bool().unwrap()
        }
    };
    // 3 units are still out under the pending return, only 2 are free
    assert!(!check(3).await);
    assert!(check(2).await);
}

#[tokio::test]
#[ignore]
async fn test_student_cannot_touch_anothers_borrow() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let student = make_token("s-1001", Role::Student);
    let item = create_item(&client, &admin, 2).await;
    let id = item["id"].as_str().unwrap();

    let r = submit_borrow(&client, &admin, id, 1, 1, 3).await;
    let v: Value = r.json().await.unwrap();
    let rid = v["id"].as_str().unwrap();
    for step in ["approve", "release"] {
        let r = client
            .post(format!("{}/borrows/{}/{}", BASE_URL, rid, step))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert!(r.status().is_success());
    }

    // Neither reading nor returning someone else's reservation is allowed
    let r = client
        .get(format!("{}/borrows/{}", BASE_URL, rid))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 403);

    let r = client
        .post(format!("{}/borrows/{}/return", BASE_URL, rid))
        .bearer_auth(&student)
        .json(&json!({
            "returned_qty": 1,
            "condition_after": "Good",
            "damage_severity": "None"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_partial_return_approval_keeps_loan_open() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let item = create_item(&client, &admin, 3).await;
    let id = item["id"].as_str().unwrap();

    let r = submit_borrow(&client, &admin, id, 3, 1, 5).await;
    let v: Value = r.json().await.unwrap();
    let rid = v["id"].as_str().unwrap();
    for step in ["approve", "release"] {
        let r = client
            .post(format!("{}/borrows/{}/{}", BASE_URL, rid, step))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert!(r.status().is_success());
    }

    let submit_and_approve = |qty: i32| {
        let client = client.clone();
        let admin = admin.clone();
        let rid = rid.to_string();
        async move {
            let r = client
                .post(format!("{}/borrows/{}/return", BASE_URL, rid))
                .bearer_auth(&admin)
                .json(&json!({
                    "returned_qty": qty,
                    "condition_after": "Good",
                    "damage_severity": "None"
                }))
                .send()
                .await
                .unwrap();
            assert_eq!(r.status(), 201);
            let settlement: Value = r.json().await.unwrap();
            let sid = settlement["id"].as_str().unwrap().to_string();
            let r = client
                .post(format!("{}/returns/{}/approve", BASE_URL, sid))
                .bearer_auth(&admin)
                .send()
                .await
                .unwrap();
            assert!(r.status().is_success());
            let settlement: Value = r.json().await.unwrap();
            settlement["state"].as_str().unwrap().to_string()
        }
    };

    // One unit back: the settlement is accepted, the loan stays open
    assert_eq!(submit_and_approve(1).await, "Approved");
    let reservation: Value = client
        .get(format!("{}/borrows/{}", BASE_URL, rid))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reservation["state"], "Released");

    // The remainder closes the reservation and completes the settlement
    assert_eq!(submit_and_approve(2).await, "Completed");
    let reservation: Value = client
        .get(format!("{}/borrows/{}", BASE_URL, rid))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reservation["state"], "Returned");
}

#[tokio::test]
#[ignore]
async fn test_reject_twice_is_an_error() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let item = create_item(&client, &admin, 3).await;
    let id = item["id"].as_str().unwrap();

    let r = submit_borrow(&client, &admin, id, 1, 1, 2).await;
    let v: Value = r.json().await.unwrap();
    let rid = v["id"].as_str().unwrap();

    let r = client
        .post(format!("{}/borrows/{}/reject", BASE_URL, rid))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert!(r.status().is_success());

    let r = client
        .post(format!("{}/borrows/{}/reject", BASE_URL, rid))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_damaged_return_and_exact_reversal() {
    let client = Client::new();
    let admin = make_token("admin", Role::Admin);
    let item = create_item(&client, &admin, 10).await;
    let id = item["id"].as_str().unwrap();

    // Borrow 3 units and release them
    let r = submit_borrow(&client, &admin, id, 3, 1, 5).await;
    let v: Value = r.json().await.unwrap();
    let rid = v["id"].as_str().unwrap();
    for step in ["approve", "release"] {
        let r = client
            .post(format!("{}/borrows/{}/{}", BASE_URL, rid, step))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert!(r.status().is_success());
    }

    let item: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item["borrowed_qty"], 3);
    assert_eq!(item["available_quantity"], 7);

    // Severe-damage return of all 3 units
    let r = client
        .post(format!("{}/borrows/{}/return", BASE_URL, rid))
        .bearer_auth(&admin)
        .json(&json!({
            "returned_qty": 3,
            "condition_after": "Damaged",
            "damage_severity": "Severe"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status(), 201);
    let settlement: Value = r.json().await.unwrap();
    let sid = settlement["id"].as_str().unwrap();
    assert_eq!(settlement["damage_fee"], "100.00");

    let item: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item["borrowed_qty"], 0);
    assert_eq!(item["maintenance_qty"], 3);
    assert_eq!(item["condition"], "NeedsRepair");

    // Rejecting the settlement restores the exact pre-settlement ledger
    let r = client
        .post(format!("{}/returns/{}/reject", BASE_URL, sid))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert!(r.status().is_success());

    let item: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item["borrowed_qty"], 3);
    assert_eq!(item["maintenance_qty"], 0);
    assert_eq!(item["condition"], "Good");

    let reservation: Value = client
        .get(format!("{}/borrows/{}", BASE_URL, rid))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reservation["state"], "Released");
}
