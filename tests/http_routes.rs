mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};

use yatube::infra::http::REQUEST_ID_HEADER;

use common::{TestApp, assert_redirect, body_text, count_posts, template};

#[tokio::test]
async fn public_pages_render_their_templates() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let group = app.group("Cats", "cats").await;
    let post = app.post(&author, "Hello from the cats group", Some(group.id)).await;

    let cases = [
        ("/".to_string(), "posts/index.html"),
        ("/group/cats/".to_string(), "posts/group_list.html"),
        ("/profile/auth/".to_string(), "posts/profile.html"),
        (format!("/posts/{}/", post.id), "posts/post_detail.html"),
        ("/auth/login/".to_string(), "auth/login.html"),
    ];

    for (uri, expected) in cases {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(template(&response), Some(expected), "{uri}");
    }
}

#[tokio::test]
async fn author_only_pages_render_for_their_author() {
    let app = TestApp::new();
    let (author, token) = app.login("auth").await;
    let post = app.post(&author, "Mine", None).await;

    let cases = [
        ("/create/".to_string(), "posts/create_post.html"),
        (format!("/posts/{}/edit/", post.id), "posts/create_post.html"),
        ("/follow/".to_string(), "posts/follow.html"),
    ];

    for (uri, expected) in cases {
        let response = app.get(&uri, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(template(&response), Some(expected), "{uri}");
    }
}

#[tokio::test]
async fn unknown_pages_render_not_found() {
    let app = TestApp::new();

    for uri in [
        "/unexisting_page/",
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/media/posts/missing.gif",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(template(&response), Some("core/404.html"), "{uri}");
    }
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let post = app.post(&author, "Text", None).await;

    let get_cases = [
        "/create/".to_string(),
        format!("/posts/{}/edit/", post.id),
        "/follow/".to_string(),
        "/profile/auth/follow/".to_string(),
        "/profile/auth/unfollow/".to_string(),
    ];
    for uri in get_cases {
        let response = app.get(&uri, None).await;
        assert_redirect(&response, &format!("/auth/login/?next={uri}"));
    }

    let comment_uri = format!("/posts/{}/comment/", post.id);
    let response = app.post_form(&comment_uri, None, "text=hi").await;
    assert_redirect(&response, &format!("/auth/login/?next={comment_uri}"));

    let comments = app.state.comments.list(post.id).await.expect("comments");
    assert!(comments.is_empty());
}

#[tokio::test]
async fn creating_a_post_redirects_to_profile() {
    let app = TestApp::new();
    let (_, token) = app.login("writer").await;
    let group = app.group("Dogs", "dogs").await;

    let response = app
        .post_form(
            "/create/",
            Some(&token),
            &format!("text=Fresh+post&group={}", group.id),
        )
        .await;
    assert_redirect(&response, "/profile/writer/");

    let html = body_text(app.get("/group/dogs/", None).await).await;
    assert_eq!(count_posts(&html), 1);
    assert!(html.contains("Fresh post"));
}

#[tokio::test]
async fn invalid_post_form_is_shown_again() {
    let app = TestApp::new();
    let (author, token) = app.login("writer").await;

    let response = app
        .post_form("/create/", Some(&token), "text=+++&group=")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(template(&response), Some("posts/create_post.html"));

    let response = app
        .post_form("/create/", Some(&token), "text=Valid&group=4242")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(template(&response), Some("posts/create_post.html"));

    let html = body_text(app.get(&format!("/profile/{}/", author.username), None).await).await;
    assert_eq!(count_posts(&html), 0);
}

#[tokio::test]
async fn author_edits_post_in_place() {
    let app = TestApp::new();
    let (author, token) = app.login("writer").await;
    let post = app.post(&author, "Before", None).await;

    let response = app
        .post_form(
            &format!("/posts/{}/edit/", post.id),
            Some(&token),
            "text=After&group=",
        )
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let edited = app.state.posts.find(post.id).await.expect("post");
    assert_eq!(edited.text, "After");
    assert_eq!(edited.author_id, author.id);
}

#[tokio::test]
async fn strangers_cannot_edit_or_delete() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let (_, token) = app.login("stranger").await;
    let post = app.post(&author, "Original", None).await;
    let detail = format!("/posts/{}/", post.id);

    let response = app.get(&format!("{detail}edit/"), Some(&token)).await;
    assert_redirect(&response, &detail);

    let response = app
        .post_form(&format!("{detail}edit/"), Some(&token), "text=Hijacked")
        .await;
    assert_redirect(&response, &detail);

    let response = app
        .post_form(&format!("{detail}delete/"), Some(&token), "")
        .await;
    assert_redirect(&response, &detail);

    let unchanged = app.state.posts.find(post.id).await.expect("post survives");
    assert_eq!(unchanged.text, "Original");
}

#[tokio::test]
async fn comments_show_on_post_and_go_with_it() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let (_, token) = app.login("reader").await;
    let post = app.post(&author, "Discuss", None).await;
    let detail = format!("/posts/{}/", post.id);

    let response = app
        .post_form(&format!("{detail}comment/"), Some(&token), "text=Nice+one")
        .await;
    assert_redirect(&response, &detail);

    let response = app
        .post_form(&format!("{detail}comment/"), Some(&token), "text=")
        .await;
    assert_redirect(&response, &detail);

    let html = body_text(app.get(&detail, None).await).await;
    assert!(html.contains("Nice one"));
    assert_eq!(html.matches("class=\"comment\"").count(), 1);

    let author_token = app
        .state
        .sessions
        .issue("auth")
        .await
        .expect("session")
        .token;
    let response = app
        .post_form(&format!("{detail}delete/"), Some(&author_token), "")
        .await;
    assert_redirect(&response, "/profile/auth/");

    let comments = app.state.comments.list(post.id).await.expect("comments");
    assert!(comments.is_empty());
    assert_eq!(app.get(&detail, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_author_can_delete_their_comment() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let (reader, token) = app.login("reader").await;
    let post = app.post(&author, "Discuss", None).await;
    let comment = app
        .state
        .comments
        .add(post.id, reader.id, "Mine")
        .await
        .expect("comment");

    let uri = format!("/posts/{}/comments/{}/delete/", post.id, comment.id);
    let response = app.post_form(&uri, Some(&token), "").await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));

    let comments = app.state.comments.list(post.id).await.expect("comments");
    assert!(comments.is_empty());
}

#[tokio::test]
async fn database_health_is_no_content() {
    let app = TestApp::new();
    let response = app.get("/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/")
        .header(REQUEST_ID_HEADER, "trace-42")
        .body(Body::empty())
        .expect("request should build");
    let response = app.send(request).await;
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).map(|v| v.as_bytes()),
        Some(&b"trace-42"[..])
    );

    let response = app.get("/missing/", None).await;
    let generated = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .expect("generated request id");
    assert_eq!(generated.len(), 36);
}
