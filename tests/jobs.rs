#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use campus_api::utils::enums::{Qualification, Role};
use common::{bearer, TestContext};

fn private_job(targets: &[&str]) -> Value {
    json!({
        "jobTitle": "Junior Backend Engineer",
        "organization": "Asha Tech",
        "jobCategory": "Private",
        "jobType": "Full-time",
        "jobDescription": "Build and operate the services behind our student placement platform in Hyderabad.",
        "targetQualifications": targets,
        "totalPositions": 3,
        "lastApplicationDate": (Utc::now() + Duration::days(30)).format("%Y-%m-%d").to_string(),
        "privateJobFields": {
            "workMode": "Hybrid",
            "jobLocation": ["Hyderabad"],
            "salaryRange": {"min": 300000, "max": 600000},
            "hrContactEmail": "hr@ashatech.in",
            "hrContactPhone": "9000000200"
        }
    })
}

#[actix_web::test]
async fn posting_a_job_notifies_only_matching_students() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, admin) = ctx.account("Admin", "9000000201", Some("admin@campus.test"), Role::Admin);
    let (_, _, btech) = ctx.student("Asha", "9000000202", "asha@campus.test", Qualification::BTech);
    let (_, _, mba) = ctx.student("Ravi", "9000000203", "ravi@campus.test", Qualification::Mba);

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs/check-matching")
        .insert_header(bearer(&admin))
        .set_json(json!({"targetQualifications": ["B.Tech", "B.Tech", "Diploma"]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["matchingCount"], 1);

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .set_json(private_job(&["B.Tech", "B.Tech"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["totalNotified"], 1);
    assert_eq!(body["job"]["targetQualifications"], json!(["B.Tech"]));
    assert_eq!(body["job"]["privateJobFields"]["salaryRange"]["currency"], "INR");
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/student/notifications")
        .insert_header(bearer(&btech))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["unreadCount"], 1);
    assert_eq!(body["notifications"][0]["job"]["jobId"], job_id.as_str());
    let notification_id = body["notifications"][0]["notificationId"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri(&format!("/api/student/notifications/{notification_id}/read"))
        .insert_header(bearer(&btech))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["notification"]["isRead"], true);

    let req = test::TestRequest::get()
        .uri("/api/student/notifications")
        .insert_header(bearer(&mba))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);

    let req = test::TestRequest::get()
        .uri("/api/student/job-listings")
        .insert_header(bearer(&mba))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn job_is_created_even_when_the_fan_out_fails() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, admin) = ctx.account("Admin", "9000000221", None, Role::Admin);
    ctx.student("Asha", "9000000222", "asha@campus.test", Qualification::BTech);
    ctx.db.lock().execute_batch("DROP TABLE notifications").unwrap();

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .set_json(private_job(&["B.Tech"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["totalNotified"], 0);
    assert_eq!(body["job"]["notificationTracking"]["notificationSent"], false);
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/jobs/{job_id}"))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn oversized_page_number_returns_an_empty_page() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, admin) = ctx.account("Admin", "9000000231", None, Role::Admin);

    let req = test::TestRequest::get()
        .uri("/api/admin/jobs?page=9223372036854775807&limit=50")
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["jobs"], json!([]));

    let req = test::TestRequest::get()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn job_routes_require_admin_and_valid_bodies() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, admin) = ctx.account("Admin", "9000000211", None, Role::SuperAdmin);
    let (_, _, student) = ctx.student("Asha", "9000000212", "asha@campus.test", Qualification::BTech);

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&student))
        .set_json(private_job(&["B.Tech"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Access denied. Admin privileges required");

    let mut job = private_job(&["B.Tech"]);
    job["lastApplicationDate"] = json!("2001-01-01");
    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .set_json(job)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut job = private_job(&["B.Tech"]);
    job["privateJobFields"]["workMode"] = json!("Moon");
    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .set_json(job)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .set_json(private_job(&["PhD"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn students_apply_once_and_admins_review() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, admin) = ctx.account("Admin", "9000000221", None, Role::Admin);
    let (_, _, student) = ctx.student("Asha", "9000000222", "asha@campus.test", Qualification::BTech);

    let req = test::TestRequest::post()
        .uri("/api/admin/jobs")
        .insert_header(bearer(&admin))
        .set_json(private_job(&["B.Tech"]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let apply = || {
        test::TestRequest::post()
            .uri(&format!("/api/student/jobs/{job_id}/apply"))
            .insert_header(bearer(&student))
            .set_json(json!({"coverLetter": "I would love to join."}))
            .to_request()
    };
    let resp = test::call_service(&app, apply()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let application_id = body["application"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(&app, apply()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let review = |status: &str| {
        test::TestRequest::patch()
            .uri(&format!("/api/admin/applications/{application_id}/status"))
            .insert_header(bearer(&admin))
            .set_json(json!({"status": status}))
            .to_request()
    };
    let body: Value = test::call_and_read_body_json(&app, review("SHORTLISTED")).await;
    assert_eq!(body["application"]["status"], "SHORTLISTED");
    let body: Value = test::call_and_read_body_json(&app, review("ACCEPTED")).await;
    assert!(body["application"]["hiredAt"].is_string());

    let resp = test::call_service(&app, review("APPLIED")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/jobs/{job_id}/applications"))
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
