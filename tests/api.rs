mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};

use common::test_server::{TestServer, signup};

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Creates a published book with `free_chapters` free of `chapters` total,
/// returns the book id.
async fn publish_book(
    base_url: &str,
    writer_token: &str,
    free_chapters: i64,
    chapters: i64,
) -> String {
    let resp: Value = client()
        .post(format!("{}/api/v1/books", base_url))
        .bearer_auth(writer_token)
        .json(&json!({
            "title": "The Gated Serial",
            "description": "A book with a free preview window",
            "price_cents": 499,
            "free_chapters": free_chapters,
        }))
        .send()
        .await
        .expect("create book")
        .json()
        .await
        .expect("parse book");
    let book_id = resp["data"]["id"].as_str().expect("book id").to_string();

    for number in 1..=chapters {
        let resp = client()
            .post(format!("{}/api/v1/books/{}/chapters", base_url, book_id))
            .bearer_auth(writer_token)
            .json(&json!({
                "chapter_number": number,
                "title": format!("Chapter {number}"),
                "content": format!("Words of chapter {number}."),
            }))
            .send()
            .await
            .expect("create chapter");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = client()
        .patch(format!("{}/api/v1/books/{}", base_url, book_id))
        .bearer_auth(writer_token)
        .json(&json!({ "status": "published" }))
        .send()
        .await
        .expect("publish book");
    assert_eq!(resp.status(), StatusCode::OK);

    book_id
}

#[tokio::test]
async fn signup_signin_and_me() {
    let server = TestServer::start().await;
    let (token, _) = signup(&server.base_url, "writer@example.com", "writer").await;

    let resp: Value = client()
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me")
        .json()
        .await
        .expect("parse me");

    let roles: Vec<&str> = resp["data"]["roles"]
        .as_array()
        .expect("roles")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(roles, ["writer"]);

    // The hierarchy rule: a writer is effectively also a reader.
    let effective: Vec<&str> = resp["data"]["effective_roles"]
        .as_array()
        .expect("effective roles")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(effective.contains(&"writer"));
    assert!(effective.contains(&"reader"));
    assert!(!effective.contains(&"admin"));
}

#[tokio::test]
async fn signup_rejects_admin_and_unknown_roles() {
    let server = TestServer::start().await;

    let resp = client()
        .post(format!("{}/api/v1/auth/signup", server.base_url))
        .json(&json!({
            "email": "sneaky@example.com",
            "password": "long-enough-password",
            "display_name": "Sneaky",
            "role": "admin",
        }))
        .send()
        .await
        .expect("signup admin");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Unknown role strings never make it past deserialization.
    let resp = client()
        .post(format!("{}/api/v1/auth/signup", server.base_url))
        .json(&json!({
            "email": "sneaky@example.com",
            "password": "long-enough-password",
            "display_name": "Sneaky",
            "role": "moderator",
        }))
        .send()
        .await
        .expect("signup unknown role");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn role_guards_deny_missing_capabilities() {
    let server = TestServer::start().await;
    let (reader_token, _) = signup(&server.base_url, "reader@example.com", "reader").await;

    // Anonymous writes are 401.
    let resp = client()
        .post(format!("{}/api/v1/books", server.base_url))
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .expect("anonymous create book");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A reader lacks the writer capability.
    let resp = client()
        .post(format!("{}/api/v1/books", server.base_url))
        .bearer_auth(&reader_token)
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .expect("reader create book");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // And the admin surface is admin-only.
    let resp = client()
        .get(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&reader_token)
        .send()
        .await
        .expect("reader list users");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A writer passes the reader guard through the hierarchy.
    let (writer_token, _) = signup(&server.base_url, "writer2@example.com", "writer").await;
    let resp = client()
        .get(format!("{}/api/v1/me/purchases", server.base_url))
        .bearer_auth(&writer_token)
        .send()
        .await
        .expect("writer list purchases");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_grant_and_revoke_roles() {
    let server = TestServer::start().await;
    let (_, user_id) = signup(&server.base_url, "promoted@example.com", "reader").await;

    let grant_url = format!(
        "{}/api/v1/admin/users/{}/roles",
        server.base_url, user_id
    );

    let resp = client()
        .post(&grant_url)
        .bearer_auth(&server.admin_token)
        .json(&json!({ "role": "writer" }))
        .send()
        .await
        .expect("grant writer");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // A duplicate grant is distinguishable from a fresh one.
    let resp = client()
        .post(&grant_url)
        .bearer_auth(&server.admin_token)
        .json(&json!({ "role": "writer" }))
        .send()
        .await
        .expect("grant writer again");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("conflict body");
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("already has")
    );

    // Revoking is idempotent: absent roles revoke as a no-op success.
    let revoke_url = format!(
        "{}/api/v1/admin/users/{}/roles/writer",
        server.base_url, user_id
    );
    let resp = client()
        .delete(&revoke_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("revoke writer");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client()
        .delete(&revoke_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("revoke writer again");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn revocation_applies_to_live_sessions() {
    let server = TestServer::start().await;
    let (writer_token, writer_id) =
        signup(&server.base_url, "demoted@example.com", "writer").await;

    let resp = client()
        .post(format!("{}/api/v1/books", server.base_url))
        .bearer_auth(&writer_token)
        .json(&json!({ "title": "Before demotion" }))
        .send()
        .await
        .expect("create book");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client()
        .delete(format!(
            "{}/api/v1/admin/users/{}/roles/writer",
            server.base_url, writer_id
        ))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("revoke writer");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The same session token no longer passes the writer guard.
    let resp = client()
        .post(format!("{}/api/v1/books", server.base_url))
        .bearer_auth(&writer_token)
        .json(&json!({ "title": "After demotion" }))
        .send()
        .await
        .expect("create book after demotion");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn chapter_gating_end_to_end() {
    let server = TestServer::start().await;
    let (writer_token, _) = signup(&server.base_url, "author@example.com", "writer").await;
    let book_id = publish_book(&server.base_url, &writer_token, 3, 5).await;

    let chapter_url =
        |n: i64| format!("{}/api/v1/books/{}/chapters/{}", server.base_url, book_id, n);

    // Free preview is readable without an account: rule 2 precedes the
    // auth check.
    let resp = client().get(chapter_url(2)).send().await.expect("ch2 anon");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("chapter body");
    assert_eq!(body["data"]["chapter_number"], 2);

    // Past the window, anonymous readers are told to sign in.
    let resp = client().get(chapter_url(5)).send().await.expect("ch5 anon");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Signed in but unpurchased: locked with a purchase hint.
    let (reader_token, _) = signup(&server.base_url, "buyer@example.com", "reader").await;
    let resp = client()
        .get(chapter_url(5))
        .bearer_auth(&reader_token)
        .send()
        .await
        .expect("ch5 signed in");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Purchase unlocks the whole book.
    let resp = client()
        .post(format!(
            "{}/api/v1/books/{}/purchases",
            server.base_url, book_id
        ))
        .bearer_auth(&reader_token)
        .json(&json!({ "amount_cents": 499, "payment_method": "card", "transaction_id": "tx-1" }))
        .send()
        .await
        .expect("purchase");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client()
        .get(chapter_url(5))
        .bearer_auth(&reader_token)
        .send()
        .await
        .expect("ch5 purchased");
    assert_eq!(resp.status(), StatusCode::OK);

    // Purchases are append-only and unique per (user, book).
    let resp = client()
        .post(format!(
            "{}/api/v1/books/{}/purchases",
            server.base_url, book_id
        ))
        .bearer_auth(&reader_token)
        .json(&json!({ "amount_cents": 499, "payment_method": "card" }))
        .send()
        .await
        .expect("purchase again");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Unresolved lookups fail closed.
    let resp = client()
        .get(chapter_url(99))
        .bearer_auth(&reader_token)
        .send()
        .await
        .expect("missing chapter");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client()
        .get(format!(
            "{}/api/v1/books/not-a-book/chapters/1",
            server.base_url
        ))
        .send()
        .await
        .expect("missing book");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn book_detail_marks_locked_chapters() {
    let server = TestServer::start().await;
    let (writer_token, _) = signup(&server.base_url, "toc@example.com", "writer").await;
    let book_id = publish_book(&server.base_url, &writer_token, 1, 3).await;

    let resp: Value = client()
        .get(format!("{}/api/v1/books/{}", server.base_url, book_id))
        .send()
        .await
        .expect("book detail")
        .json()
        .await
        .expect("parse detail");

    let chapters = resp["data"]["chapters"].as_array().expect("chapters");
    assert_eq!(chapters.len(), 3);
    assert_eq!(chapters[0]["locked"], false);
    assert_eq!(chapters[1]["locked"], true);
    assert_eq!(chapters[2]["locked"], true);
    assert_eq!(resp["data"]["purchased"], false);
}

#[tokio::test]
async fn drafts_are_invisible_to_the_public() {
    let server = TestServer::start().await;
    let (writer_token, _) = signup(&server.base_url, "drafts@example.com", "writer").await;

    let resp: Value = client()
        .post(format!("{}/api/v1/books", server.base_url))
        .bearer_auth(&writer_token)
        .json(&json!({ "title": "Unfinished" }))
        .send()
        .await
        .expect("create draft")
        .json()
        .await
        .expect("parse draft");
    let book_id = resp["data"]["id"].as_str().expect("book id");

    let url = format!("{}/api/v1/books/{}", server.base_url, book_id);

    let resp = client().get(&url).send().await.expect("anon draft");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The author still sees their own draft.
    let resp = client()
        .get(&url)
        .bearer_auth(&writer_token)
        .send()
        .await
        .expect("author draft");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn bookmarks_respect_the_gate() {
    let server = TestServer::start().await;
    let (writer_token, _) = signup(&server.base_url, "bm-author@example.com", "writer").await;
    let book_id = publish_book(&server.base_url, &writer_token, 1, 2).await;

    let detail: Value = client()
        .get(format!("{}/api/v1/books/{}", server.base_url, book_id))
        .send()
        .await
        .expect("detail")
        .json()
        .await
        .expect("parse detail");
    let free_chapter = detail["data"]["chapters"][0]["id"].as_str().expect("ch1 id");
    let locked_chapter = detail["data"]["chapters"][1]["id"].as_str().expect("ch2 id");

    let (reader_token, _) = signup(&server.base_url, "bm-reader@example.com", "reader").await;
    let bookmarks_url = format!("{}/api/v1/books/{}/bookmarks", server.base_url, book_id);

    let resp = client()
        .post(&bookmarks_url)
        .bearer_auth(&reader_token)
        .json(&json!({ "chapter_id": free_chapter, "note": "nice opening" }))
        .send()
        .await
        .expect("bookmark free chapter");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client()
        .post(&bookmarks_url)
        .bearer_auth(&reader_token)
        .json(&json!({ "chapter_id": locked_chapter }))
        .send()
        .await
        .expect("bookmark locked chapter");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signout_invalidates_the_session() {
    let server = TestServer::start().await;
    let (token, _) = signup(&server.base_url, "leaver@example.com", "reader").await;

    let resp = client()
        .post(format!("{}/api/v1/auth/signout", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("signout");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client()
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me after signout");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn publish_requires_enough_chapters_for_the_free_window() {
    let server = TestServer::start().await;
    let (writer_token, _) = signup(&server.base_url, "window@example.com", "writer").await;

    let resp: Value = client()
        .post(format!("{}/api/v1/books", server.base_url))
        .bearer_auth(&writer_token)
        .json(&json!({ "title": "Overpromised", "free_chapters": 5 }))
        .send()
        .await
        .expect("create book")
        .json()
        .await
        .expect("parse book");
    let book_id = resp["data"]["id"].as_str().expect("book id");

    // Publishing with free_chapters > total_chapters is rejected at the
    // write boundary.
    let resp = client()
        .patch(format!("{}/api/v1/books/{}", server.base_url, book_id))
        .bearer_auth(&writer_token)
        .json(&json!({ "status": "published" }))
        .send()
        .await
        .expect("publish");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
