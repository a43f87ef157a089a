mod common;

use yatube::application::follows::FollowError;
use yatube::application::groups::{GroupError, GroupInput};
use yatube::application::posts::{PostError, PostInput};
use yatube::application::users::{UserError, UserService};

use common::TestApp;

#[tokio::test]
async fn post_display_is_first_fifteen_characters() {
    let app = TestApp::new();
    let author = app.user("auth").await;

    let post = app
        .post(&author, "Тестовый пост длиннее пятнадцати символов", None)
        .await;
    assert_eq!(post.to_string(), "Тестовый пост д");

    let short = app.post(&author, "Short", None).await;
    assert_eq!(short.to_string(), "Short");

    let group = app.group("Тестовая группа", "test-group").await;
    assert_eq!(group.to_string(), "Тестовая группа");
}

#[tokio::test]
async fn group_slug_is_derived_and_kept_unique() {
    let app = TestApp::new();
    let create = |title: &str| GroupInput {
        title: title.to_string(),
        slug: None,
        description: String::new(),
    };

    let first = app.state.groups.create(create("Тест Кот")).await.expect("first");
    let second = app.state.groups.create(create("Тест Кот")).await.expect("second");
    assert_eq!(first.slug, "test-kot");
    assert_eq!(second.slug, "test-kot-2");

    let found = app
        .state
        .groups
        .find_by_slug("test-kot-2")
        .await
        .expect("lookup");
    assert_eq!(found.map(|group| group.id), Some(second.id));
}

#[tokio::test]
async fn explicit_slug_collision_is_a_field_error() {
    let app = TestApp::new();
    app.group("Cats", "cats").await;

    let err = app
        .state
        .groups
        .create(GroupInput {
            title: "More cats".to_string(),
            slug: Some("cats".to_string()),
            description: String::new(),
        })
        .await
        .expect_err("slug is taken");
    match err {
        GroupError::Invalid(errors) => assert!(errors.first("slug").is_some()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn deleting_a_group_keeps_its_posts() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let group = app.group("Temporary", "temporary").await;
    let post = app.post(&author, "Filed under a group", Some(group.id)).await;

    app.state.groups.delete(group.id).await.expect("delete group");

    let post = app.state.posts.find(post.id).await.expect("post survives");
    assert_eq!(post.group, None);
}

#[tokio::test]
async fn usernames_are_unique() {
    let app = TestApp::new();
    app.user("taken").await;

    let err = UserService::new(app.repos.clone())
        .register("taken")
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, UserError::UsernameTaken(name) if name == "taken"));

    let err = UserService::new(app.repos.clone())
        .register("bad name!")
        .await
        .expect_err("invalid username");
    assert!(matches!(err, UserError::Domain(_)));
}

#[tokio::test]
async fn post_validation_reports_fields() {
    let app = TestApp::new();
    let author = app.user("auth").await;

    let err = app
        .state
        .posts
        .create(
            author.id,
            PostInput {
                text: "   ".to_string(),
                group_id: Some(404),
            },
            None,
        )
        .await
        .expect_err("invalid post");
    match err {
        PostError::Invalid(errors) => {
            assert!(errors.first("text").is_some());
            assert!(errors.first("group").is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn comments_list_oldest_first() {
    let app = TestApp::new();
    let author = app.user("auth").await;
    let reader = app.user("reader").await;
    let post = app.post(&author, "Thread", None).await;

    for text in ["first", "second", "third"] {
        app.state
            .comments
            .add(post.id, reader.id, text)
            .await
            .expect("comment");
    }

    let texts: Vec<String> = app
        .state
        .comments
        .list(post.id)
        .await
        .expect("comments")
        .into_iter()
        .map(|comment| comment.text)
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn self_follow_is_a_domain_error() {
    let app = TestApp::new();
    let me = app.user("me").await;

    let err = app
        .state
        .follows
        .follow(me.id, "me")
        .await
        .expect_err("self follow");
    assert!(matches!(err, FollowError::Domain(_)));

    let other = app.user("other").await;
    assert!(app.state.follows.follow(me.id, "other").await.expect("follow"));
    assert!(!app.state.follows.follow(me.id, "other").await.expect("again"));
    assert!(app.state.follows.unfollow(me.id, "other").await.expect("unfollow"));
    assert!(!app.state.follows.unfollow(me.id, "other").await.expect("again"));
    assert!(
        !app.state
            .follows
            .is_following(me.id, other.id)
            .await
            .expect("lookup")
    );
}
