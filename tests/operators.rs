use apocrypha::datum::Mapping;
use apocrypha::document::Document;
use apocrypha::store::Store;

fn setup() -> Store {
    Store::new(Document::new(Mapping::new()), 1024)
}

fn run(store: &Store, tokens: &[&str]) -> String {
    let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    store.execute(&tokens)
}

#[test]
fn index_after_assign() {
    let store = setup();
    run(&store, &["a", "=", "123"]);
    assert_eq!(run(&store, &["a"]), "123\n");
}

#[test]
fn index_absent_is_empty() {
    let store = setup();
    assert_eq!(run(&store, &["nothing", "here"]), "");
}

#[test]
fn index_empty_query_renders_root() {
    let store = setup();
    run(&store, &["sub", "apple", "=", "red"]);
    assert_eq!(run(&store, &[]), "{'sub': {'apple': 'red'}}\n");
}

#[test]
fn index_list_one_element_per_line() {
    let store = setup();
    run(&store, &["list", "=", "a", "b", "c"]);
    assert_eq!(run(&store, &["list"]), "a\nb\nc\n");
}

#[test]
fn index_through_value_is_an_error() {
    let store = setup();
    run(&store, &["green", "=", "nice"]);
    assert_eq!(
        run(&store, &["green", "nice", "failure"]),
        "error: cannot index through string at 'green'"
    );
}

#[test]
fn assign_overwrites_in_place() {
    let store = setup();
    run(&store, &["first", "=", "1"]);
    run(&store, &["second", "=", "2"]);
    run(&store, &["first", "=", "one"]);
    // overwriting does not move the key to the end
    assert_eq!(run(&store, &["--keys"]), "first\nsecond\n");
    assert_eq!(run(&store, &["first"]), "one\n");
}

#[test]
fn assign_without_values_deletes() {
    let store = setup();
    run(&store, &["gone", "=", "soon"]);
    assert_eq!(run(&store, &["gone", "="]), "");
    assert_eq!(run(&store, &["gone"]), "");
}

#[test]
fn append_creates_a_string() {
    let store = setup();
    run(&store, &["unique", "+", "hello there"]);
    assert_eq!(run(&store, &["unique"]), "hello there\n");
    assert_eq!(run(&store, &["unique", "--edit"]), "\"hello there\"\n");
}

#[test]
fn append_to_string_becomes_a_list() {
    let store = setup();
    run(&store, &["unique", "=", "hello there"]);
    run(&store, &["unique", "+", "apple sauce"]);
    assert_eq!(run(&store, &["unique"]), "hello there\napple sauce\n");
}

#[test]
fn append_to_list_extends() {
    let store = setup();
    run(&store, &["unique", "=", "a"]);
    run(&store, &["unique", "+", "b"]);
    run(&store, &["unique", "+", "c"]);
    assert_eq!(run(&store, &["unique"]), "a\nb\nc\n");
}

#[test]
fn append_to_dict_is_an_error() {
    let store = setup();
    run(&store, &["dict", "a", "=", "1"]);
    assert_eq!(
        run(&store, &["dict", "+", "hello"]),
        "error: cannot append to dict"
    );
}

#[test]
fn remove_from_list() {
    let store = setup();
    run(&store, &["list", "=", "a", "b", "c"]);
    run(&store, &["list", "-", "a"]);
    assert_eq!(run(&store, &["list"]), "b\nc\n");
}

#[test]
fn remove_collapses_a_singleton() {
    let store = setup();
    run(&store, &["list", "=", "a", "b", "c"]);
    run(&store, &["list", "-", "a"]);
    run(&store, &["list", "-", "b"]);
    assert_eq!(run(&store, &["list", "--edit"]), "\"c\"\n");
}

#[test]
fn remove_several_values_at_once() {
    let store = setup();
    run(&store, &["list", "=", "a", "b", "c"]);
    run(&store, &["list", "-", "a", "b"]);
    assert_eq!(run(&store, &["list", "--edit"]), "\"c\"\n");
}

#[test]
fn remove_every_occurrence() {
    let store = setup();
    run(&store, &["list", "=", "x", "y", "x", "z"]);
    run(&store, &["list", "-", "x"]);
    assert_eq!(run(&store, &["list"]), "y\nz\n");
}

#[test]
fn remove_missing_value_is_an_error() {
    let store = setup();
    run(&store, &["list", "=", "a", "b", "c"]);
    assert_eq!(run(&store, &["list", "-", "d"]), "error: value not found");
    // the list is untouched
    assert_eq!(run(&store, &["list"]), "a\nb\nc\n");
}

#[test]
fn remove_matching_string_deletes_it() {
    let store = setup();
    run(&store, &["value", "=", "only"]);
    run(&store, &["value", "-", "only"]);
    assert_eq!(run(&store, &["value"]), "");
}

#[test]
fn remove_mismatching_string_is_an_error() {
    let store = setup();
    run(&store, &["value", "=", "c"]);
    assert_eq!(run(&store, &["value", "-", "a"]), "error: value not found");
}

#[test]
fn remove_from_dict_is_an_error() {
    let store = setup();
    run(&store, &["list", "a", "=", "a", "b", "c"]);
    assert_eq!(
        run(&store, &["list", "-", "a"]),
        "error: cannot subtract from dict"
    );
}

#[test]
fn remove_from_absent_is_an_error() {
    let store = setup();
    assert_eq!(
        run(&store, &["list", "-", "applesauce"]),
        "error: cannot subtract from an absent key"
    );
}

#[test]
fn keys_in_insertion_order() {
    let store = setup();
    run(&store, &["iron mountain", "c", "=", "1"]);
    run(&store, &["iron mountain", "a", "=", "1"]);
    run(&store, &["iron mountain", "b", "=", "1"]);
    assert_eq!(run(&store, &["iron mountain", "--keys"]), "c\na\nb\n");
}

#[test]
fn keys_of_the_root() {
    let store = setup();
    run(&store, &["one", "=", "1"]);
    run(&store, &["two", "=", "2"]);
    assert_eq!(run(&store, &["--keys"]), "one\ntwo\n");
}

#[test]
fn keys_on_list_is_an_error() {
    let store = setup();
    run(&store, &["list", "=", "a", "b"]);
    assert_eq!(
        run(&store, &["list", "--keys"]),
        "error: cannot retrieve keys of list"
    );
}

#[test]
fn keys_on_value_is_an_error() {
    let store = setup();
    run(&store, &["value", "=", "b"]);
    assert_eq!(
        run(&store, &["value", "--keys"]),
        "error: cannot retrieve keys of string"
    );
}

#[test]
fn keys_on_absent_is_an_error() {
    let store = setup();
    assert_eq!(
        run(&store, &["missing", "--keys"]),
        "error: cannot retrieve keys of an absent key"
    );
}

#[test]
fn edit_dumps_compact_json() {
    let store = setup();
    run(&store, &["dict", "--set", r#"{"a":"1","b":"2"}"#]);
    assert_eq!(run(&store, &["dict", "--edit"]), "{\"a\":\"1\",\"b\":\"2\"}\n");
}

#[test]
fn edit_singleton() {
    let store = setup();
    run(&store, &["single", "=", "1"]);
    assert_eq!(run(&store, &["single", "--edit"]), "\"1\"\n");
}

#[test]
fn edit_absent_is_an_empty_object() {
    let store = setup();
    assert_eq!(run(&store, &["unique key", "--edit"]), "{}\n");
}

#[test]
fn set_a_list() {
    let store = setup();
    run(&store, &["list", "=", "a b c d"]);
    run(&store, &["list", "--set", r#"["a", "b", "c"]"#]);
    assert_eq!(run(&store, &["list"]), "a\nb\nc\n");
}

#[test]
fn set_a_dict() {
    let store = setup();
    run(&store, &["dict", "--set", r#"{"a":"1","b":"2"}"#]);
    assert_eq!(run(&store, &["dict", "a"]), "1\n");
    assert_eq!(run(&store, &["dict", "b"]), "2\n");
}

#[test]
fn set_a_singleton() {
    let store = setup();
    run(&store, &["single", "--set", "\"hello\""]);
    assert_eq!(run(&store, &["single"]), "hello\n");
}

#[test]
fn set_coerces_scalars_to_text() {
    let store = setup();
    run(&store, &["number", "--set", "5"]);
    run(&store, &["flag", "--set", "true"]);
    run(&store, &["hole", "--set", "null"]);
    assert_eq!(run(&store, &["number"]), "5\n");
    assert_eq!(run(&store, &["flag"]), "true\n");
    assert_eq!(run(&store, &["hole"]), "null\n");
}

#[test]
fn set_malformed_json_is_an_error() {
    let store = setup();
    assert_eq!(
        run(&store, &["broken", "--set", "gobbeldy gook"]),
        "error: malformed json"
    );
}

#[test]
fn set_with_an_empty_path_replaces_the_root() {
    let store = setup();
    run(&store, &["old", "=", "news"]);
    run(&store, &["--set", r#"{"a":"1"}"#]);
    assert_eq!(run(&store, &["a"]), "1\n");
    assert_eq!(run(&store, &["old"]), "");
}

#[test]
fn set_root_to_non_object_is_an_error() {
    let store = setup();
    assert_eq!(
        run(&store, &["--set", r#"["a"]"#]),
        "error: the root must be a dict, not a list"
    );
}

#[test]
fn del_removes_the_leaf() {
    let store = setup();
    run(&store, &["removable", "=", "gone"]);
    run(&store, &["removable", "--del"]);
    assert_eq!(run(&store, &["removable"]), "");
}

#[test]
fn del_on_absent_is_a_noop() {
    let store = setup();
    assert_eq!(run(&store, &["never", "was", "--del"]), "");
    assert_eq!(store.generation().unwrap(), 0);
}

#[test]
fn pop_takes_the_list_tail() {
    let store = setup();
    run(&store, &["list", "=", "a", "b", "c"]);
    assert_eq!(run(&store, &["list", "--pop"]), "c\n");
    assert_eq!(run(&store, &["list"]), "a\nb\n");
}

#[test]
fn pop_deletes_a_string() {
    let store = setup();
    run(&store, &["value", "=", "only"]);
    assert_eq!(run(&store, &["value", "--pop"]), "only\n");
    assert_eq!(run(&store, &["value"]), "");
}

#[test]
fn pop_on_absent_is_empty() {
    let store = setup();
    assert_eq!(run(&store, &["missing", "--pop"]), "");
}

#[test]
fn search_finds_string_values() {
    let store = setup();
    run(&store, &["rasp", "=", "berry"]);
    run(&store, &["blue", "=", "berry"]);
    assert_eq!(run(&store, &["@", "berry"]), "rasp\nblue\n");
}

#[test]
fn search_finds_list_members() {
    let store = setup();
    run(&store, &["list", "=", "haystack", "haystack", "needle"]);
    run(&store, &["other", "=", "haystack", "haystack"]);
    assert_eq!(run(&store, &["@", "needle"]), "list\n");
}

#[test]
fn search_descends_into_nested_mappings() {
    let store = setup();
    run(&store, &["blue", "berry", "=", "octopus"]);
    run(&store, &["blue", "cobbler", "=", "squid"]);
    assert_eq!(run(&store, &["@", "squid"]), "cobbler\n");
}

#[test]
fn search_emits_one_line_per_entry() {
    let store = setup();
    run(&store, &["twice", "=", "needle", "needle", "hay"]);
    assert_eq!(run(&store, &["@", "needle"]), "twice\n");
}

#[test]
fn short_aliases_are_normalized() {
    let store = setup();
    run(&store, &["dict", "-s", r#"{"a":"1"}"#]);
    assert_eq!(run(&store, &["dict", "-k"]), "a\n");
    assert_eq!(run(&store, &["dict", "-e"]), "{\"a\":\"1\"}\n");
    run(&store, &["dict", "-d"]);
    assert_eq!(run(&store, &["dict"]), "");
    run(&store, &["list", "=", "a", "b"]);
    assert_eq!(run(&store, &["list", "-p"]), "b\n");
}

#[test]
fn unknown_operator_is_an_error() {
    let store = setup();
    assert_eq!(
        run(&store, &["a", "--frobnicate"]),
        "error: unknown operator '--frobnicate'"
    );
}

#[test]
fn multiple_operators_are_an_error() {
    let store = setup();
    assert_eq!(
        run(&store, &["a", "=", "b", "=", "c"]),
        "error: multiple operators in query"
    );
    assert_eq!(
        run(&store, &["a", "=", "-d"]),
        "error: multiple operators in query"
    );
}

#[test]
fn search_takes_exactly_one_value() {
    let store = setup();
    assert_eq!(run(&store, &["@"]), "error: search takes a single value");
    assert_eq!(
        run(&store, &["@", "a", "b"]),
        "error: search takes a single value"
    );
    assert_eq!(
        run(&store, &["path", "@", "a"]),
        "error: search does not take a path"
    );
}
