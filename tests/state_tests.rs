use autofill_engine::{
    screen::screen_model::SemanticFieldType,
    state::{
        memory::{MEMORY_STORE_KEY, MemoryStore},
        normalize::{clean_label, normalize_label_key, significant_words, text_fingerprint},
        profile::{AiSettings, ProfileRecord, RunCounters, custom_parameters},
        store::{JsonFileStore, KeyValueStore, MemoryKv, Record},
    },
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

// =========================================================================
// Normalization
// =========================================================================

#[test]
fn label_keys_are_lowercase_alnum_underscored() {
    assert_eq!(normalize_label_key("  Why do you want   to join us? "), "why_do_you_want_to_join_us");
    assert_eq!(normalize_label_key("Salary (USD) *"), "salary_usd");
    assert_eq!(normalize_label_key("?!"), "");
    assert_eq!(normalize_label_key(&"a ".repeat(60)).len(), 50);
}

#[test]
fn significant_words_drop_short_tokens() {
    assert_eq!(
        significant_words("Why do you want to join us?"),
        vec!["why", "you", "want", "join"]
    );
}

#[test]
fn clean_label_strips_markers() {
    assert_eq!(clean_label("  First   Name *: "), "First Name");
}

#[test]
fn fingerprints_are_hex_sha1() {
    let print = text_fingerprint("input|text|email");
    assert_eq!(print.len(), 40);
    assert_eq!(print, text_fingerprint("input|text|email"));
    assert_ne!(print, text_fingerprint("input|text|phone"));
}

// =========================================================================
// Memory store
// =========================================================================

#[test]
fn remember_then_recall_exact_label() {
    let mut memory = MemoryStore::new();
    assert!(memory.remember("Notice period", "4 weeks"));
    assert_eq!(memory.recall("Notice period"), Some("4 weeks"));
    assert_eq!(memory.recall("notice PERIOD?"), Some("4 weeks"));
}

#[test]
fn recall_matches_paraphrased_questions() {
    let mut memory = MemoryStore::new();
    memory.remember("Why do you want to join us", "Because of the mission.");
    assert_eq!(
        memory.recall("Why do you want to work here"),
        Some("Because of the mission.")
    );
}

#[test]
fn short_labels_recall_on_a_single_shared_word() {
    let mut memory = MemoryStore::new();
    memory.remember("Preferred pronouns", "they/them");
    assert_eq!(memory.recall("Pronouns"), Some("they/them"));
    // A long query needs two words in common.
    assert_eq!(memory.recall("Which pronouns should the interviewer use with you"), None);
}

#[test]
fn values_shorter_than_two_characters_are_not_learned() {
    let mut memory = MemoryStore::new();
    assert!(!memory.remember("Middle initial", "J"));
    assert!(!memory.remember("Middle initial", "  "));
    assert!(memory.is_empty());
    assert!(memory.remember("Middle initial", "JR"));
}

#[test]
fn labels_without_alphanumerics_learn_nothing() {
    let mut memory = MemoryStore::new();
    assert!(!memory.remember("???", "value"));
    assert!(memory.is_empty());
}

#[test]
fn relearning_overwrites_value_and_counts_usage() {
    let mut memory = MemoryStore::new();
    memory.remember_at("Desired salary", "100k", 1);
    memory.remember_at("Desired salary?", "120k", 2);

    assert_eq!(memory.len(), 1);
    let entry = memory.get("desired_salary").unwrap();
    assert_eq!(entry.value, "120k");
    assert_eq!(entry.usage_count, 2);
    assert_eq!(entry.learned_at, 2);
}

#[test]
fn forget_removes_by_key() {
    let mut memory = MemoryStore::new();
    memory.remember("Notice period", "4 weeks");
    assert!(memory.forget("notice_period").is_some());
    assert_eq!(memory.recall("Notice period"), None);
}

#[test]
fn memory_survives_a_storage_round_trip_in_learning_order() {
    let mut memory = MemoryStore::new();
    memory.remember_at("Zip code", "10115", 10);
    memory.remember_at("Alma mater", "MIT", 20);

    let restored = MemoryStore::from_value(Some(&memory.to_value()));
    let keys: Vec<&str> = restored.entries().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["zip_code", "alma_mater"]);
    assert_eq!(restored.recall("Zip code"), Some("10115"));
}

#[test]
fn malformed_memory_entries_are_skipped() {
    let value = json!({
        "good": {"fieldLabel": "Good", "value": "yes", "usageCount": 1, "learnedAt": 5},
        "bad": "not an object"
    });
    let memory = MemoryStore::from_value(Some(&value));
    assert_eq!(memory.len(), 1);
    assert_eq!(memory.recall("Good"), Some("yes"));
    assert!(MemoryStore::from_value(None).is_empty());
}

// =========================================================================
// Key-value stores
// =========================================================================

#[test]
fn in_memory_store_merges_and_filters_keys() {
    let mut store = MemoryKv::with_record(record(json!({"a": 1, "b": 2})));
    store.set(record(json!({"b": 3, "c": 4}))).unwrap();

    let all = store.get(None).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all["b"], json!(3));

    let some = store.get(Some(&["a", "missing"])).unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some["a"], json!(1));
}

#[test]
fn json_file_store_persists_between_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut store = JsonFileStore::new(&path);
    assert!(store.get(None).unwrap().is_empty(), "missing file reads as empty");
    store.set(record(json!({"firstName": "Ada"}))).unwrap();
    store.set(record(json!({"lastName": "Lovelace"}))).unwrap();

    let reopened = JsonFileStore::new(&path);
    let all = reopened.get(None).unwrap();
    assert_eq!(all["firstName"], json!("Ada"));
    assert_eq!(all["lastName"], json!("Lovelace"));
}

#[test]
fn json_file_store_reports_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileStore::new(&path).get(None).unwrap_err();
    assert!(err.to_string().contains("store file"), "{}", err);
}

// =========================================================================
// Profile and settings
// =========================================================================

#[test]
fn profile_reads_scalars_and_joins_arrays() {
    let profile = ProfileRecord::from_record(&record(json!({
        "firstName": "Ada",
        "yearsExperience": 12,
        "workCountries": ["UK", "Germany"],
        "relocate": true,
        "email": "",
        "nested": {"x": 1}
    })));

    assert_eq!(profile.get(&SemanticFieldType::FirstName), Some("Ada"));
    assert_eq!(profile.get(&SemanticFieldType::YearsExperience), Some("12"));
    assert_eq!(profile.get(&SemanticFieldType::WorkCountries), Some("UK, Germany"));
    assert_eq!(profile.get_key("relocate"), Some("Yes"));
    assert_eq!(profile.get(&SemanticFieldType::Email), None, "blank values count as unset");
    assert_eq!(profile.get_key("nested"), None);
}

#[test]
fn custom_parameter_values_live_under_their_key() {
    let data = record(json!({
        "customParams": [
            {"key": "noticePeriod", "label": "Notice period"},
            {"key": "", "label": "Broken"},
            "junk"
        ],
        "noticePeriod": "4 weeks"
    }));

    let params = custom_parameters(&data);
    assert_eq!(params.len(), 1);
    let profile = ProfileRecord::from_record(&data);
    assert_eq!(profile.get(&params[0].field()), Some("4 weeks"));
}

#[test]
fn ai_settings_ignore_blank_values() {
    let settings = AiSettings::from_record(&record(json!({
        "openaiKey": "  ",
        "userContext": "Prefers remote roles",
        "cvContent": "Ten years of compilers."
    })));
    assert_eq!(settings.api_key, None);
    assert_eq!(settings.user_notes.as_deref(), Some("Prefers remote roles"));
    assert_eq!(settings.resume_text.as_deref(), Some("Ten years of compilers."));
}

#[test]
fn run_counters_accumulate_and_count_pages_only_when_filled() {
    let mut store = MemoryKv::new();

    let after_first = RunCounters::record_run(&mut store, 3).unwrap();
    assert_eq!(after_first, RunCounters { fill_count: 3, page_count: 1 });

    let after_empty = RunCounters::record_run(&mut store, 0).unwrap();
    assert_eq!(after_empty, RunCounters { fill_count: 3, page_count: 1 });

    let stored = store.get(None).unwrap();
    assert_eq!(stored["fillCount"], json!(3));
    assert_eq!(stored["pageCount"], json!(1));
}

#[test]
fn memory_is_stored_under_learned_responses() {
    assert_eq!(MEMORY_STORE_KEY, "learnedResponses");
}
