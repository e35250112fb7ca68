mod common;

use threadline::core::EntityId;
use threadline::error::AppError;
use threadline::infrastructure::DatabaseInterface;
use threadline::models::PageRequest;

use common::test_app;

#[tokio::test]
async fn test_toggle_follow_flips_stored_edge() {
    let app = test_app().await;
    let alice = app.register_id("alice").await;
    let bob = app.register_id("bob").await;

    let followed = app.state.relationships.toggle_follow(alice, bob).await.unwrap();
    assert!(followed.is_following);

    let unfollowed = app.state.relationships.toggle_follow(alice, bob).await.unwrap();
    assert!(!unfollowed.is_following);

    let again = app.state.relationships.toggle_follow(alice, bob).await.unwrap();
    assert!(again.is_following);
}

#[tokio::test]
async fn test_toggle_parity_matches_stored_edges() {
    let app = test_app().await;
    let alice = app.register_id("alice").await;
    let bob = app.register_id("bob").await;

    for round in 1..=4 {
        let toggled = app.state.relationships.toggle_follow(alice, bob).await.unwrap();
        let odd = round % 2 == 1;
        assert_eq!(toggled.is_following, odd);
        assert_eq!(app.db.find_follow(alice, bob).await.unwrap().is_some(), odd);
        assert!(app.db.find_follow(bob, alice).await.unwrap().is_none());

        let following = app
            .state
            .relationships
            .list_following(alice, alice, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(following.total_docs, u64::from(odd));
    }
}

#[tokio::test]
async fn test_user_without_edges_has_empty_lists() {
    let app = test_app().await;
    let loner = app.register_id("loner").await;
    let viewer = app.register_id("viewer").await;

    let followers = app
        .state
        .relationships
        .list_followers(loner, viewer, PageRequest::new(1, 15))
        .await
        .unwrap();
    assert_eq!(followers.total_docs, 0);
    assert!(followers.docs.is_empty());
    assert_eq!(followers.limit, 15);

    let following = app
        .state
        .relationships
        .list_following(loner, viewer, PageRequest::new(1, 15))
        .await
        .unwrap();
    assert_eq!(following.total_docs, 0);
    assert!(following.docs.is_empty());
}

#[tokio::test]
async fn test_follow_rejects_self_and_unknown_targets() {
    let app = test_app().await;
    let alice = app.register_id("alice").await;

    let own = app.state.relationships.toggle_follow(alice, alice).await.unwrap_err();
    assert!(matches!(own, AppError::Validation(_)));

    let ghost = app
        .state
        .relationships
        .toggle_follow(alice, EntityId(77))
        .await
        .unwrap_err();
    assert!(matches!(ghost, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_follower_lists_mark_who_the_viewer_follows() {
    let app = test_app().await;
    let star = app.register_id("star").await;
    let ann = app.register_id("ann").await;
    let ben = app.register_id("ben").await;
    let viewer = app.register_id("viewer").await;

    app.state.relationships.toggle_follow(ann, star).await.unwrap();
    app.state.relationships.toggle_follow(ben, star).await.unwrap();
    app.state.relationships.toggle_follow(viewer, ann).await.unwrap();

    let followers = app
        .state
        .relationships
        .list_followers(star, viewer, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(followers.total_docs, 2);
    // Most recent edge first
    assert_eq!(followers.docs[0].user_id, ben);
    assert_eq!(followers.docs[1].user_id, ann);
    assert!(!followers.docs[0].is_following);
    assert!(followers.docs[1].is_following);
    assert_eq!(followers.docs[1].username, "ann");

    let following = app
        .state
        .relationships
        .list_following(ann, viewer, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(following.total_docs, 1);
    assert_eq!(following.docs[0].user_id, star);
    assert!(!following.docs[0].is_following);

    let paged = app
        .state
        .relationships
        .list_followers(star, viewer, PageRequest::new(2, 1))
        .await
        .unwrap();
    assert_eq!(paged.docs.len(), 1);
    assert_eq!(paged.docs[0].user_id, ann);
    assert_eq!(paged.total_pages, 2);
    assert!(!paged.has_next_page);

    let unknown = app
        .state
        .relationships
        .list_following(EntityId(404), viewer, PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(unknown, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_profile_counts_and_viewer_state() {
    let app = test_app().await;
    let star = app.register_id("Star").await;
    let fan = app.register_id("fan").await;
    let other = app.register_id("other").await;

    app.state.relationships.toggle_follow(fan, star).await.unwrap();
    app.state.relationships.toggle_follow(other, star).await.unwrap();
    app.state.relationships.toggle_follow(star, fan).await.unwrap();

    let seen_by_fan = app.state.feed.get_user_profile("STAR", Some(fan)).await.unwrap();
    assert_eq!(seen_by_fan.id, star);
    assert_eq!(seen_by_fan.followers, 2);
    assert_eq!(seen_by_fan.following, 1);
    assert!(seen_by_fan.is_following);

    let anonymous = app.state.feed.get_user_profile("star", None).await.unwrap();
    assert!(!anonymous.is_following);

    let body = serde_json::to_value(&anonymous).unwrap();
    assert!(body.get("email").is_none());
    assert_eq!(body["_id"], star.to_string());

    let missing = app.state.feed.get_user_profile("nobody", None).await.unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_profile_lookup_folds_non_ascii_case() {
    let app = test_app().await;
    let id = app.register_id("Ärger").await;

    for spelling in ["ärger", "ÄRGER", " Ärger "] {
        let profile = app.state.feed.get_user_profile(spelling, None).await.unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.username, "ärger");

        let posts = app
            .state
            .feed
            .list_posts_by_user(spelling, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(posts.total_docs, 0);
    }
}
