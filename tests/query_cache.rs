use apocrypha::cache::QueryCache;
use apocrypha::datum::Mapping;
use apocrypha::document::Document;
use apocrypha::store::Store;

fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|t| t.to_string()).collect()
}

fn run(store: &Store, parts: &[&str]) -> String {
    store.execute(&tokens(parts))
}

#[test]
fn hit_returns_the_inserted_output() {
    let mut cache = QueryCache::new(16);
    cache.insert(tokens(&["a"]), vec!["1".to_owned()]);
    assert_eq!(cache.get(&tokens(&["a"])), Some(&["1".to_owned()][..]));
    assert_eq!(cache.get(&tokens(&["b"])), None);
}

#[test]
fn empty_output_is_cacheable() {
    let mut cache = QueryCache::new(16);
    cache.insert(tokens(&["missing"]), Vec::new());
    assert_eq!(cache.get(&tokens(&["missing"])), Some(&[][..]));
}

#[test]
fn clear_drops_everything() {
    let mut cache = QueryCache::new(16);
    cache.insert(tokens(&["a"]), vec!["1".to_owned()]);
    cache.insert(tokens(&["b"]), vec!["2".to_owned()]);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get(&tokens(&["a"])), None);
}

#[test]
fn capacity_bounds_the_cache() {
    let mut cache = QueryCache::new(2);
    cache.insert(tokens(&["a"]), vec![]);
    cache.insert(tokens(&["b"]), vec![]);
    cache.insert(tokens(&["c"]), vec![]);
    assert_eq!(cache.len(), 2);
    // oldest first
    assert_eq!(cache.get(&tokens(&["a"])), None);
    assert!(cache.get(&tokens(&["c"])).is_some());
}

#[test]
fn zero_capacity_disables_caching() {
    let mut cache = QueryCache::new(0);
    cache.insert(tokens(&["a"]), vec![]);
    assert!(cache.is_empty());
}

#[test]
fn reads_populate_the_store_cache() {
    let store = Store::new(Document::new(Mapping::new()), 1024);
    run(&store, &["pizza", "=", "sauce"]);
    assert_eq!(store.cache_len().unwrap(), 0, "writes are never cached");
    run(&store, &["pizza"]);
    assert_eq!(store.cache_len().unwrap(), 1);
    // a second read is served from the cache and stays correct
    assert_eq!(run(&store, &["pizza"]), "sauce\n");
    assert_eq!(store.cache_len().unwrap(), 1);
}

#[test]
fn aliases_share_one_cache_entry() {
    let store = Store::new(Document::new(Mapping::new()), 1024);
    run(&store, &["pizza", "=", "sauce"]);
    run(&store, &["pizza", "--edit"]);
    assert_eq!(store.cache_len().unwrap(), 1);
    assert_eq!(run(&store, &["pizza", "-e"]), "\"sauce\"\n");
    assert_eq!(store.cache_len().unwrap(), 1);
}

#[test]
fn cached_reads_never_serve_stale_values() {
    let store = Store::new(Document::new(Mapping::new()), 1024);
    for round in 0..20 {
        let value = format!("v{round}");
        run(&store, &["key", "=", &value]);
        assert_eq!(run(&store, &["key"]), format!("{value}\n"));
        assert_eq!(run(&store, &["key"]), format!("{value}\n"));
    }
}

#[test]
fn deep_reads_are_cached_under_their_full_path() {
    let store = Store::new(Document::new(Mapping::new()), 1024);
    run(&store, &["a", "b", "c", "d", "e", "=", "f"]);
    run(&store, &["a", "b", "c", "d", "e"]);
    assert_eq!(store.cache_len().unwrap(), 1);
    assert_eq!(run(&store, &["a", "b", "c", "d", "e"]), "f\n");
}
