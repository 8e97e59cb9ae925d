use mcprt_template::{parse_template, TemplateCache};

#[test]
fn user_posts_template_round_trips() {
    let cache = TemplateCache::default();
    let parsed = cache
        .get_or_parse("example://{user}/posts/{post_id:int}")
        .expect("valid template");

    let values = parsed.extract("example://john/posts/42").expect("matches");
    assert_eq!(values["user"], serde_json::json!("john"));
    assert_eq!(values["post_id"], serde_json::json!(42));

    let rebuilt = parsed.expand(&values).expect("expand");
    assert_eq!(rebuilt, "example://john/posts/42");
}

#[test]
fn optional_param_with_default_is_applied_on_empty_capture() {
    let parsed = parse_template("search/{query}/{page:int=1}").unwrap();
    let values = parsed.extract("search/rust/").unwrap();
    assert_eq!(values["query"], serde_json::json!("rust"));
    assert_eq!(values["page"], serde_json::json!(1));
}

#[test]
fn pattern_restricted_resource_rejects_non_matching_uri() {
    let parsed = parse_template("logs/{filename:pattern:*.log}").unwrap();
    assert!(parsed.matches("logs/server.log"));
    assert!(!parsed.matches("logs/server.txt"));
}

#[test]
fn cache_serves_repeated_lookups_of_the_same_template_from_cache() {
    let cache = TemplateCache::new(16);
    for _ in 0..5 {
        cache.get_or_parse("a/{x:int}/b/{y}").unwrap();
    }
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 4);
}

#[test]
fn malformed_template_fails_to_parse_without_caching() {
    let cache = TemplateCache::new(8);
    assert!(cache.get_or_parse("a/{bad:uuid}").is_none());
    assert_eq!(cache.len(), 0);
}
