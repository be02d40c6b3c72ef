use super::*;

#[test]
fn coordinate_new_rejects_out_of_range_values() {
    assert!(Coordinate::new(90.0, 180.0).is_ok());
    assert!(Coordinate::new(-90.0, -180.0).is_ok());
    assert!(matches!(
        Coordinate::new(90.5, 0.0),
        Err(DomainError::InvalidCoordinate { .. })
    ));
    assert!(Coordinate::new(0.0, -180.1).is_err());
    assert!(Coordinate::new(f64::NAN, 0.0).is_err());
}

#[test]
fn distance_to_delegates_to_haversine() {
    let london = Coordinate::new(51.5074, -0.1278).expect("london");
    let paris = Coordinate::new(48.8566, 2.3522).expect("paris");
    assert_eq!(london.distance_to(&paris), geo::distance_km(london, paris));
}

#[test]
fn post_deserializes_with_only_content_and_location() {
    let post: Post = serde_json::from_str(
        r#"{"content":"hi","location":{"latitude":1.5,"longitude":-2.0}}"#,
    )
    .expect("json");
    assert_eq!(post.content, "hi");
    assert_eq!(post.location, Coordinate::new(1.5, -2.0).expect("coord"));
    assert_eq!(post.id, None);
    assert_eq!(post.duration, 0);
}

#[test]
fn post_expiry_uses_created_at_plus_duration() {
    let post = Post {
        id: Some(PostId::new()),
        content: "short lived".into(),
        location: Coordinate::ORIGIN,
        duration: 30,
        created_at: 1_000,
    };
    assert_eq!(post.expires_at(), 1_030);
    assert!(!post.is_expired(1_029));
    assert!(post.is_expired(1_030));
}
