//! Tests for the bucket-mapper fixtures.

use super::test_utils::{RoundRobinMapper, SimpleMapper};

#[test]
fn test_simple_mapper_is_deterministic() {
    let first = SimpleMapper::new("alice").bucket();
    let second = SimpleMapper::new("alice").bucket();
    assert_eq!(first, second);
}

#[test]
fn test_simple_mapper_known_hashes() {
    // md5("admin") starts with '2' (byte 50), md5("foo") with 'a' (byte 97).
    assert_eq!(SimpleMapper::new("admin").bucket(), "1");
    assert_eq!(SimpleMapper::new("foo").bucket(), "3");
}

#[test]
fn test_simple_mapper_bucket_range() {
    // Hex characters are '0'..'9' (48..57) and 'a'..'f' (97..102), so the
    // derived bucket is always "1" or "3".
    for user in ["u1", "u2", "u3", "another-user", "somebody@example.com"] {
        let bucket = SimpleMapper::new(user).bucket();
        assert!(bucket == "1" || bucket == "3", "unexpected bucket {bucket}");
    }
}

#[test]
fn test_round_robin_assigns_in_order() {
    let mapper = RoundRobinMapper::new();
    for i in 0..10 {
        let user = format!("user{}", i);
        assert_eq!(mapper.bucket(&user), (i + 1).to_string());
    }
    // Slot 11 wraps around.
    assert_eq!(mapper.bucket("user10"), "1");
    assert_eq!(mapper.bucket("user11"), "2");
}

#[test]
fn test_round_robin_is_stable_per_user() {
    let mapper = RoundRobinMapper::new();
    let first = mapper.bucket("alice");
    mapper.bucket("bob");
    mapper.bucket("carol");
    assert_eq!(mapper.bucket("alice"), first);
}
