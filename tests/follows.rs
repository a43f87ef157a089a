mod common;

use axum::http::StatusCode;

use common::{TestApp, assert_redirect, body_text, count_posts, template};

#[tokio::test]
async fn following_fills_and_unfollowing_empties_the_feed() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let (_, token) = app.login("reader").await;
    app.post(&author, "Worth following", None).await;

    let html = body_text(app.get("/follow/", Some(&token)).await).await;
    assert_eq!(count_posts(&html), 0);

    let response = app.get("/profile/author/follow/", Some(&token)).await;
    assert_redirect(&response, "/profile/author/");

    let html = body_text(app.get("/follow/", Some(&token)).await).await;
    assert_eq!(count_posts(&html), 1);
    assert!(html.contains("Worth following"));

    let response = app.get("/profile/author/unfollow/", Some(&token)).await;
    assert_redirect(&response, "/profile/author/");

    let html = body_text(app.get("/follow/", Some(&token)).await).await;
    assert_eq!(count_posts(&html), 0);
}

#[tokio::test]
async fn feed_skips_authors_nobody_followed() {
    let app = TestApp::new();
    let followed = app.user("followed").await;
    let other = app.user("other").await;
    let (_, token) = app.login("reader").await;
    app.post(&followed, "From followed", None).await;
    app.post(&other, "From other", None).await;

    app.get("/profile/followed/follow/", Some(&token)).await;

    let html = body_text(app.get("/follow/", Some(&token)).await).await;
    assert!(html.contains("From followed"));
    assert!(!html.contains("From other"));

    let (_, bystander) = app.login("bystander").await;
    let html = body_text(app.get("/follow/", Some(&bystander)).await).await;
    assert_eq!(count_posts(&html), 0);
}

#[tokio::test]
async fn following_yourself_changes_nothing() {
    let app = TestApp::new();
    let (me, token) = app.login("me").await;

    let response = app.get("/profile/me/follow/", Some(&token)).await;
    assert_redirect(&response, "/profile/me/");

    let counts = app.state.follows.counts(me.id).await.expect("counts");
    assert_eq!(counts.followers, 0);
    assert_eq!(counts.following, 0);
}

#[tokio::test]
async fn following_twice_keeps_one_subscription() {
    let app = TestApp::new();
    let author = app.user("author").await;
    let (reader, token) = app.login("reader").await;

    app.get("/profile/author/follow/", Some(&token)).await;
    let response = app.get("/profile/author/follow/", Some(&token)).await;
    assert_redirect(&response, "/profile/author/");

    let counts = app.state.follows.counts(author.id).await.expect("counts");
    assert_eq!(counts.followers, 1);
    assert!(
        app.state
            .follows
            .is_following(reader.id, author.id)
            .await
            .expect("lookup")
    );
}

#[tokio::test]
async fn unfollowing_a_stranger_is_harmless() {
    let app = TestApp::new();
    app.user("author").await;
    let (_, token) = app.login("reader").await;

    let response = app.get("/profile/author/unfollow/", Some(&token)).await;
    assert_redirect(&response, "/profile/author/");
}

#[tokio::test]
async fn following_an_unknown_author_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.login("reader").await;

    let response = app.get("/profile/ghost/follow/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(template(&response), Some("core/404.html"));
}

#[tokio::test]
async fn profile_offers_follow_then_unfollow() {
    let app = TestApp::new();
    app.user("author").await;
    let (_, token) = app.login("reader").await;

    let html = body_text(app.get("/profile/author/", Some(&token)).await).await;
    assert!(html.contains("class=\"follow\""));

    app.get("/profile/author/follow/", Some(&token)).await;

    let html = body_text(app.get("/profile/author/", Some(&token)).await).await;
    assert!(html.contains("class=\"unfollow\""));
    assert!(html.contains("Followers: 1"));

    let own = body_text(app.get("/profile/reader/", Some(&token)).await).await;
    assert!(!own.contains("class=\"follow\""));
    assert!(!own.contains("class=\"unfollow\""));
}
