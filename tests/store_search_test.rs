mod helpers;

use cairn::memory::types::{MemoryType, GLOBAL_COLLECTION, WORKSPACE_COLLECTION};
use helpers::{new_memory, test_service};

#[tokio::test]
async fn store_then_scoped_search_finds_record() {
    let t = test_service();
    let text = "Auth service uses JWT with 1h expiry";
    let id = t
        .memory
        .store_memory(new_memory(text, "s60", MemoryType::Decision))
        .await
        .unwrap();

    let hits = t
        .memory
        .semantic_search("auth service JWT expiry", Some("s60"), None, None)
        .await
        .unwrap();

    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].text(), Some(text));
    assert!(hits[0].score > 0.5);

    let payload = hits[0].memory_payload().unwrap();
    assert_eq!(payload.scope, "s60");
    assert_eq!(payload.agent, "main");
    assert_eq!(payload.memory_type, "decision");
    assert!(payload.updated_at.is_none());
}

#[tokio::test]
async fn scope_routes_records_to_collections() {
    let t = test_service();
    t.memory
        .store_memory(new_memory("shared fact", "global", MemoryType::Note))
        .await
        .unwrap();
    t.memory
        .store_memory(new_memory("local fact", "s60", MemoryType::Note))
        .await
        .unwrap();

    assert_eq!(t.store.point_count(GLOBAL_COLLECTION), Some(1));
    assert_eq!(t.store.point_count(WORKSPACE_COLLECTION), Some(1));
}

#[tokio::test]
async fn padded_scope_is_stored_and_searched_the_same_way() {
    let t = test_service();
    let id = t
        .memory
        .store_memory(new_memory("deploys run through argo", "s60 ", MemoryType::Context))
        .await
        .unwrap();

    let hits = t
        .memory
        .semantic_search("deploys run through argo", Some("s60 "), None, None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].scope(), Some("s60"));
}

#[tokio::test]
async fn padded_global_scope_routes_to_global_collection() {
    let t = test_service();
    let id = t
        .memory
        .store_memory(new_memory("backups run nightly", " global", MemoryType::Note))
        .await
        .unwrap();

    assert_eq!(t.store.point_count(GLOBAL_COLLECTION), Some(1));
    assert_eq!(t.store.point_count(WORKSPACE_COLLECTION), Some(0));

    let hits = t
        .memory
        .semantic_search("backups run nightly", Some(" global"), None, None)
        .await
        .unwrap();
    assert_eq!(hits[0].id, id);
}

#[tokio::test]
async fn global_record_is_visible_to_every_search() {
    let t = test_service();
    let id = t
        .memory
        .store_memory(new_memory(
            "n8n encryption key must be backed up",
            "global",
            MemoryType::Note,
        ))
        .await
        .unwrap();

    let global = t
        .memory
        .semantic_search_global("n8n encryption key backup", None)
        .await
        .unwrap();
    assert!(global.iter().any(|h| h.id == id && h.score > 0.4));

    let scoped = t
        .memory
        .semantic_search("n8n encryption key backed up", Some("bw"), None, None)
        .await
        .unwrap();
    assert!(scoped.iter().any(|h| h.id == id));

    let unscoped = t
        .memory
        .semantic_search("n8n encryption key backed up", None, None, None)
        .await
        .unwrap();
    assert!(unscoped.iter().any(|h| h.id == id));
}

#[tokio::test]
async fn workspace_search_never_crosses_scopes() {
    let t = test_service();
    let text = "deploy pipeline runs on merge";
    let fess = t
        .memory
        .store_memory(new_memory(text, "fess", MemoryType::Context))
        .await
        .unwrap();
    let bw = t
        .memory
        .store_memory(new_memory(text, "bw", MemoryType::Context))
        .await
        .unwrap();

    let hits = t
        .memory
        .semantic_search(text, Some("bw"), None, None)
        .await
        .unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec![bw.as_str()]);
    assert!(!ids.contains(&fess.as_str()));
}

#[tokio::test]
async fn workspace_records_need_a_scope_to_be_found() {
    let t = test_service();
    t.memory
        .store_memory(new_memory("cache warms at boot", "s60", MemoryType::Context))
        .await
        .unwrap();

    for scope in [None, Some("global"), Some("  ")] {
        let hits = t
            .memory
            .semantic_search("cache warms at boot", scope, None, None)
            .await
            .unwrap();
        assert!(hits.is_empty(), "scope {scope:?} should search global only");
    }
}

#[tokio::test]
async fn results_are_limited_and_ordered() {
    let t = test_service();
    let texts = [
        "alpha beta gamma delta",
        "alpha beta gamma epsilon",
        "alpha beta zeta eta",
        "alpha beta gamma delta epsilon",
    ];
    for (i, text) in texts.iter().enumerate() {
        let scope = if i % 2 == 0 { "global" } else { "s60" };
        t.memory
            .store_memory(new_memory(text, scope, MemoryType::Note))
            .await
            .unwrap();
    }

    let hits = t
        .memory
        .semantic_search("alpha beta gamma delta", Some("s60"), None, Some(3))
        .await
        .unwrap();

    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(hits[0].text(), Some("alpha beta gamma delta"));
}

#[tokio::test]
async fn equal_scores_keep_global_hits_first() {
    let t = test_service();
    let text = "rotate the signing keys quarterly";
    let workspace = t
        .memory
        .store_memory(new_memory(text, "s60", MemoryType::Decision))
        .await
        .unwrap();
    let global = t
        .memory
        .store_memory(new_memory(text, "global", MemoryType::Decision))
        .await
        .unwrap();

    for _ in 0..3 {
        let hits = t
            .memory
            .semantic_search(text, Some("s60"), None, None)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec![global.as_str(), workspace.as_str()]);
    }
}

#[tokio::test]
async fn type_filter_narrows_workspace_results_only() {
    let t = test_service();
    let text = "billing api returns cents";
    let decision = t
        .memory
        .store_memory(new_memory(text, "s60", MemoryType::Decision))
        .await
        .unwrap();
    let _api = t
        .memory
        .store_memory(new_memory(text, "s60", MemoryType::Api))
        .await
        .unwrap();
    let global_note = t
        .memory
        .store_memory(new_memory(text, "global", MemoryType::Note))
        .await
        .unwrap();

    let hits = t
        .memory
        .semantic_search(text, Some("s60"), Some(MemoryType::Decision), None)
        .await
        .unwrap();

    let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    ids.sort();
    let mut expected = vec![decision.as_str(), global_note.as_str()];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn thresholds_differ_between_search_variants() {
    let t = test_service();
    // 2 shared words out of 4 and 5: cosine = 2 / sqrt(20) ≈ 0.447
    let id = t
        .memory
        .store_memory(new_memory("redis holds session state", "global", MemoryType::Context))
        .await
        .unwrap();
    let query = "redis session cluster failover plan";

    let scoped = t
        .memory
        .semantic_search(query, Some("s60"), None, None)
        .await
        .unwrap();
    assert!(scoped.is_empty(), "0.447 must not clear the 0.5 threshold");

    let global = t.memory.semantic_search_global(query, None).await.unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].id, id);
    assert!(global[0].score > 0.4 && global[0].score < 0.5);
}

#[tokio::test]
async fn no_matches_is_an_empty_result() {
    let t = test_service();
    t.memory
        .store_memory(new_memory("postgres runs on port 5432", "s60", MemoryType::Doc))
        .await
        .unwrap();

    let hits = t
        .memory
        .semantic_search("the bakery opens at seven", Some("s60"), None, None)
        .await
        .unwrap();
    assert!(hits.is_empty());

    let global = t
        .memory
        .semantic_search_global("the bakery opens at seven", None)
        .await
        .unwrap();
    assert!(global.is_empty());
}

#[tokio::test]
async fn tags_are_stored_in_payload() {
    let t = test_service();
    let mut memory = new_memory("staging uses spot instances", "s60", MemoryType::Context);
    memory.tags = vec!["infra".into(), "cost".into()];
    t.memory.store_memory(memory).await.unwrap();

    let hits = t
        .memory
        .semantic_search("staging uses spot instances", Some("s60"), None, None)
        .await
        .unwrap();
    assert_eq!(hits[0].memory_payload().unwrap().tags, vec!["infra", "cost"]);
}
