#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};

use campus_api::data::companies::Company;
use campus_api::utils::enums::Role;
use common::{bearer, TestContext};

#[actix_web::test]
async fn posts_likes_comments_and_shares() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, author) = ctx.account("Asha", "9000000401", None, Role::User);
    let (reader, reader_token) = ctx.account("Ravi", "9000000402", None, Role::User);
    let (_, support) = ctx.account("Support", "9000000403", None, Role::Support);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&support))
        .set_json(json!({"text": "staff cannot post"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&author))
        .set_json(json!({"text": "   "}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&author))
        .set_json(json!({"text": "Placement drive on Friday"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["author"]["name"], "Asha");
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let like = || {
        test::TestRequest::post()
            .uri(&format!("/api/posts/{post_id}/like"))
            .insert_header(bearer(&reader_token))
            .to_request()
    };
    let body: Value = test::call_and_read_body_json(&app, like()).await;
    assert_eq!(body["liked"], true);
    assert_eq!(body["likesCount"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}/likes"))
        .insert_header(bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["id"], reader.id.as_str());

    let body: Value = test::call_and_read_body_json(&app, like()).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["likesCount"], 0);

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{post_id}/comments"))
        .insert_header(bearer(&reader_token))
        .set_json(json!({"body": "See you there"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{post_id}/share"))
        .insert_header(bearer(&reader_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["sharedFrom"], post_id.as_str());
    let shared_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}/shares"))
        .insert_header(bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["user"]["id"], reader.id.as_str());
    assert_eq!(body["data"][0]["sharedPost"], shared_id.as_str());

    let req = test::TestRequest::get()
        .uri("/api/posts/feed")
        .insert_header(bearer(&reader_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);
    let original = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == post_id.as_str())
        .unwrap()
        .clone();
    assert_eq!(original["commentsCount"], 1);
    assert_eq!(original["shareCount"], 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{post_id}"))
        .insert_header(bearer(&reader_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{post_id}"))
        .insert_header(bearer(&author))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}/comments"))
        .insert_header(bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn follow_toggles_and_counts() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (asha, asha_token) = ctx.account("Asha", "9000000411", Some("asha@campus.test"), Role::User);
    let (ravi, ravi_token) = ctx.account("Ravi", "9000000412", None, Role::User);

    let req = test::TestRequest::post()
        .uri(&format!("/api/follows/{}", asha.id))
        .insert_header(bearer(&asha_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let follow = || {
        test::TestRequest::post()
            .uri(&format!("/api/follows/{}", asha.id))
            .insert_header(bearer(&ravi_token))
            .to_request()
    };
    let body: Value = test::call_and_read_body_json(&app, follow()).await;
    assert_eq!(body["following"], true);
    assert_eq!(body["followersCount"], 1);
    assert_eq!(body["myFollowingCount"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/follows/{}/followers", asha.id))
        .insert_header(bearer(&asha_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/profile", asha.id))
        .insert_header(bearer(&ravi_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["isFollowing"], true);
    assert_eq!(body["data"]["followersCount"], 1);

    let body: Value = test::call_and_read_body_json(&app, follow()).await;
    assert_eq!(body["following"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/stats", ravi.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["followingCount"], 0);

    let req = test::TestRequest::get()
        .uri("/api/users/not-an-id/stats")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn people_search_matches_name_and_role() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (_, token) = ctx.account("Asha Rao", "9000000421", Some("asha@campus.test"), Role::User);
    ctx.account("Asha Tech", "9000000422", Some("hr@ashatech.in"), Role::Company);
    ctx.account("Ravi", "9000000423", None, Role::User);

    let req = test::TestRequest::get()
        .uri("/api/search/people?q=asha")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);

    let req = test::TestRequest::get()
        .uri("/api/search/people?q=asha&role=COMPANY")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Asha Tech");

    let req = test::TestRequest::get()
        .uri("/api/search/people")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn company_profile_and_verification() {
    let ctx = TestContext::new();
    let app = app!(ctx);
    let (recruiter, recruiter_token) = ctx.account("Ravi", "9000000431", Some("hr@ashatech.in"), Role::Company);
    let (_, admin) = ctx.account("Admin", "9000000432", None, Role::Admin);
    let (_, super_admin) = ctx.account("Root", "9000000433", None, Role::SuperAdmin);

    let req = test::TestRequest::get()
        .uri("/api/companies/me")
        .insert_header(bearer(&recruiter_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["verificationStatus"], "pending");
    let company_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::put()
        .uri("/api/companies/me")
        .insert_header(bearer(&recruiter_token))
        .set_json(json!({
            "companyName": "Asha Tech",
            "industry": "Software",
            "verificationStatus": "verified",
            "tagline": "Hiring freshers"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["companyName"], "Asha Tech");
    assert_eq!(body["data"]["tagline"], "Hiring freshers");
    assert_eq!(body["data"]["verificationStatus"], "pending");

    let req = test::TestRequest::post()
        .uri(&format!("/api/companies/{company_id}/verify"))
        .insert_header(bearer(&admin))
        .set_json(json!({"verificationStatus": "VERIFIED"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/companies/{company_id}/verify"))
        .insert_header(bearer(&super_admin))
        .set_json(json!({"verificationStatus": "Verified"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Company approved successfully");
    assert_eq!(body["data"]["verificationStatus"], "verified");

    let req = test::TestRequest::get()
        .uri("/api/companies/search?q=asha&verificationStatus=VERIFIED")
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);

    let req = test::TestRequest::put()
        .uri("/api/companies/me")
        .insert_header(bearer(&recruiter_token))
        .set_json(json!({"website": "https://ashatech.in"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["message"],
        "Profile updated. Verification set to pending for re-approval."
    );

    let conn = ctx.db.lock();
    let stored = Company::get_by_user(&conn, &recruiter.id).unwrap().unwrap();
    assert_eq!(stored.verification_status.as_str(), "pending");
}
