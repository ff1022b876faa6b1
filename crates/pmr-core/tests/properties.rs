//! Property tests for sorted insertion, query filtering and the document codec.

use std::sync::Arc;

use proptest::prelude::*;

use pmr_core::auth::Session;
use pmr_core::cache::{insertion_index, ListCache};
use pmr_core::document::{Timestamp, Value};
use pmr_core::models::{Appointment, Doctor, Entity, Medication, Record};
use pmr_core::store::{DocumentStore, SqliteStore};

fn appt(title: &str, at: i64) -> Appointment {
    Appointment::new("u1".into(), title.into(), Timestamp::from_micros(at))
}

fn is_sorted<E: Entity>(items: &[E]) -> bool {
    items.windows(2).all(|w| w[0].sort_cmp(&w[1]).is_le())
}

fn signed_in_cache<E: Entity>() -> ListCache<E> {
    let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    ListCache::new(store, Arc::new(Session::signed_in("u1")))
}

proptest! {
    #[test]
    fn prop_insertion_keeps_order(starts in prop::collection::vec(-1_000i64..1_000, 0..40)) {
        let mut items: Vec<Appointment> = Vec::new();
        for (i, start) in starts.iter().enumerate() {
            let entity = appt(&format!("a{}", i), *start);
            let index = insertion_index(&items, &entity);
            items.insert(index, entity);
            prop_assert!(is_sorted(&items));
        }
        prop_assert_eq!(items.len(), starts.len());
    }

    #[test]
    fn prop_equal_keys_keep_insertion_order(n in 1usize..20) {
        let mut items: Vec<Appointment> = Vec::new();
        for i in 0..n {
            let entity = appt(&format!("a{}", i), 7);
            let index = insertion_index(&items, &entity);
            items.insert(index, entity);
        }
        let titles: Vec<_> = items.iter().map(|a| a.title.clone()).collect();
        let expected: Vec<_> = (0..n).map(|i| format!("a{}", i)).collect();
        prop_assert_eq!(titles, expected);
    }

    #[test]
    fn prop_doctor_names_insert_case_insensitively(names in prop::collection::vec("[a-zA-Z]{1,8}", 0..20)) {
        let mut items: Vec<Doctor> = Vec::new();
        for name in &names {
            let doctor = Doctor::new("u1".into(), name.clone(), "GP".into());
            let index = insertion_index(&items, &doctor);
            items.insert(index, doctor);
        }
        let lowered: Vec<_> = items.iter().map(|d| d.full_name.to_lowercase()).collect();
        let mut sorted = lowered.clone();
        sorted.sort();
        prop_assert_eq!(lowered, sorted);
    }

    #[test]
    fn prop_records_insert_newest_first(dates in prop::collection::vec(0i64..10_000, 0..30)) {
        let mut items: Vec<Record> = Vec::new();
        for date in &dates {
            let note = Record::note("u1".into(), "n".into(), "c".into(), Timestamp::from_micros(*date));
            let index = insertion_index(&items, &note);
            items.insert(index, note);
        }
        prop_assert!(items.windows(2).all(|w| w[0].date_of_service >= w[1].date_of_service));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_add_path_stays_sorted(starts in prop::collection::vec(-500i64..500, 0..12)) {
        let mut cache = signed_in_cache::<Appointment>();
        for (i, start) in starts.iter().enumerate() {
            let entity = appt(&format!("a{}", i), *start);
            let saved = cache.add(entity);
            prop_assert!(saved.is_some());
            prop_assert!(is_sorted(cache.items()));
        }
    }

    #[test]
    fn prop_filter_is_exact_subsequence(
        titles in prop::collection::vec("[a-cA-C ]{0,6}", 0..12),
        query in "[a-cA-C ]{0,3}",
    ) {
        let mut cache = signed_in_cache::<Appointment>();
        for (i, title) in titles.iter().enumerate() {
            cache.add(appt(title, i as i64)).unwrap();
        }
        cache.set_query(query.clone());
        let filtered = cache.filtered();

        let blank = query.chars().all(char::is_whitespace);
        if blank {
            prop_assert_eq!(filtered, cache.items().to_vec());
        } else {
            // Every hit contains the query exactly as typed, spaces included.
            prop_assert!(filtered.iter().all(|a| a.matches_query(&query)));
            let needle = query.to_lowercase();
            let expected: Vec<_> = cache
                .items()
                .iter()
                .filter(|a| a.title.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            prop_assert_eq!(filtered, expected);
        }
    }

    #[test]
    fn prop_medication_codec_round_trip(
        name in "[a-zA-Z ]{1,12}",
        strength in proptest::option::of("[0-9]{1,3} mg"),
        start in 0i64..1_000_000_000,
        end in proptest::option::of(0i64..1_000_000_000),
    ) {
        let mut med = Medication::new("u1".into(), name, Timestamp::from_micros(start));
        med.strength = strength;
        med.end_date = end.map(Timestamp::from_micros);

        let doc = med.encode();
        let decoded = Medication::decode("m1", &doc).unwrap();
        prop_assert_eq!(decoded.encode(), doc.clone());
        prop_assert_eq!(decoded.id.as_deref(), Some("m1"));

        for required in ["userId", "name", "startDate"] {
            let mut broken = doc.clone();
            broken.remove(required);
            prop_assert!(Medication::decode("m1", &broken).is_err());
        }

        let mut wrong = doc;
        wrong.insert("startDate".into(), Value::from("yesterday"));
        prop_assert!(Medication::decode("m1", &wrong).is_err());
    }
}
