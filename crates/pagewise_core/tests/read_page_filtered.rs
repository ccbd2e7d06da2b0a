mod common;

use common::{add_pet, empty_db, ids, person_repo, schema, seed_people, Person, Pet};
use pagewise_core::db::SharedConnectionProvider;
use pagewise_core::{
    Condition, CountStrategy, EngineOptions, EntityQuery, Pageable, PrebuiltQuery,
    ReadOnlyRepository, RepoError, SortSpec, SortablePageRequest, SqliteReadOnlyRepository,
};
use rusqlite::types::Value;
use rusqlite::Connection;

/// Four people. 1 owns Rex (dog) and Tom (cat), 2 owns Ace and Bolt (both
/// dogs), 3 owns Zed (cat) and Milo (hamster), 4 owns nothing.
fn pet_owners() -> Connection {
    let conn = empty_db();
    seed_people(&conn, 4);
    add_pet(&conn, 1, "dog", "Rex");
    add_pet(&conn, 1, "cat", "Tom");
    add_pet(&conn, 2, "dog", "Ace");
    add_pet(&conn, 2, "dog", "Bolt");
    add_pet(&conn, 3, "cat", "Zed");
    add_pet(&conn, 3, "hamster", "Milo");
    conn
}

fn with_strategy(
    strategy: CountStrategy,
) -> SqliteReadOnlyRepository<Person, SharedConnectionProvider> {
    person_repo(pet_owners()).with_options(EngineOptions {
        count_strategy: strategy,
        ..EngineOptions::default()
    })
}

const STRATEGIES: [CountStrategy; 2] = [CountStrategy::Native, CountStrategy::SubqueryWrap];

#[test]
fn to_many_join_repeats_rows_in_raw_form() {
    let repo = person_repo(pet_owners());
    let translated = repo.translate(&EntityQuery::all().join("pets")).unwrap();

    // Paging the raw translation counts joined rows, not people.
    let raw = PrebuiltQuery::new(translated.sql);
    let page = repo.read_page_prebuilt(&raw, Pageable::new(1, 50)).unwrap();
    assert_eq!(page.total_count(), 6);
    assert_eq!(page.items().len(), 6);
}

#[test]
fn to_many_join_counts_each_entity_once() {
    for strategy in STRATEGIES {
        let repo = with_strategy(strategy);
        let page = repo
            .read_page_filtered(
                &EntityQuery::all().join("pets"),
                &SortablePageRequest::page(1, 50).sorted_by(SortSpec::asc("id")),
            )
            .unwrap();

        assert_eq!(page.total_count(), 3, "strategy={}", strategy.as_str());
        assert_eq!(ids(page.items()), vec![1, 2, 3], "strategy={}", strategy.as_str());
        assert_eq!(page.total_pages(), 1);
    }
}

#[test]
fn filter_through_to_many_relation_counts_distinct_owners() {
    let query = EntityQuery::all().filter(Condition::eq("pets.species", "dog".to_string()));

    for strategy in STRATEGIES {
        let repo = with_strategy(strategy);
        let page = repo
            .read_page_filtered(
                &query,
                &SortablePageRequest::page(1, 1).sorted_by(SortSpec::desc("name")),
            )
            .unwrap();

        assert_eq!(page.total_count(), 2);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(ids(page.items()), vec![2]);
    }
}

#[test]
fn both_count_strategies_agree_for_every_window() {
    let native = with_strategy(CountStrategy::Native);
    let wrapped = with_strategy(CountStrategy::SubqueryWrap);
    let query = EntityQuery::all()
        .join("pets")
        .filter(Condition::lt_eq("age", 23));

    for page_size in 1..=4 {
        for page in 1..=3 {
            let request = SortablePageRequest::page(page, page_size);
            let left = native.read_page_filtered(&query, &request).unwrap();
            let right = wrapped.read_page_filtered(&query, &request).unwrap();
            assert_eq!(left.total_count(), 3);
            assert_eq!(left.total_count(), right.total_count());
        }
    }
}

#[test]
fn sort_through_to_many_relation_uses_min_or_max() {
    let repo = person_repo(pet_owners());
    let query = EntityQuery::all().join("pets");

    let ascending = repo
        .read_page_filtered(
            &query,
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::asc("pets.name")),
        )
        .unwrap();
    // Smallest pet names: Ace (2), Milo (3), Rex (1).
    assert_eq!(ids(ascending.items()), vec![2, 3, 1]);

    let descending = repo
        .read_page_filtered(
            &query,
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::desc("pets.name")),
        )
        .unwrap();
    // Largest pet names: Zed (3), Tom (1), Bolt (2).
    assert_eq!(ids(descending.items()), vec![3, 1, 2]);
}

#[test]
fn sorting_by_to_many_field_does_not_duplicate_or_drop_rows() {
    let repo = person_repo(pet_owners());
    let page = repo
        .read_page(&SortablePageRequest::page(1, 10).sorted_by(SortSpec::asc("pets.name")))
        .unwrap();

    assert_eq!(page.total_count(), 4);
    let mut seen = ids(page.items());
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4]);
}

#[test]
fn left_join_keeps_entities_without_children() {
    let repo = person_repo(pet_owners());
    let page = repo
        .read_page_filtered(
            &EntityQuery::all().left_join("pets"),
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::asc("id")),
        )
        .unwrap();

    assert_eq!(page.total_count(), 4);
    assert_eq!(ids(page.items()), vec![1, 2, 3, 4]);
}

#[test]
fn null_check_on_left_joined_relation_finds_entities_without_children() {
    let query = EntityQuery::all()
        .left_join("pets")
        .filter(Condition::is_null("pets.species"));

    for strategy in STRATEGIES {
        let repo = with_strategy(strategy);
        let page = repo
            .read_page_filtered(&query, &SortablePageRequest::page(1, 10))
            .unwrap();

        assert_eq!(page.total_count(), 1, "strategy={}", strategy.as_str());
        assert_eq!(ids(page.items()), vec![4]);
    }
}

#[test]
fn null_check_without_left_join_inner_joins_the_relation() {
    let repo = person_repo(pet_owners());
    let page = repo
        .read_page_filtered(
            &EntityQuery::all().filter(Condition::is_null("pets.species")),
            &SortablePageRequest::page(1, 10),
        )
        .unwrap();

    assert_eq!(page.total_count(), 0);
    assert!(page.is_empty());
}

#[test]
fn filter_and_sort_compose_on_the_same_relation() {
    let repo = person_repo(pet_owners());
    let query = EntityQuery::all()
        .filter(Condition::eq("pets.species", "cat".to_string()))
        .filter(Condition::not_eq("address.city", "Oslo".to_string()));

    let page = repo
        .read_page_filtered(
            &query,
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::asc("address.city")),
        )
        .unwrap();

    // Cat owners are 1 (Berlin) and 3 (Oslo).
    assert_eq!(page.total_count(), 1);
    assert_eq!(ids(page.items()), vec![1]);
}

#[test]
fn root_field_filters_and_null_checks() {
    let conn = empty_db();
    seed_people(&conn, 10);
    conn.execute("UPDATE people SET address_id = NULL WHERE id > 7", [])
        .unwrap();
    let repo = person_repo(conn);

    let adults = repo
        .read_page_filtered(
            &EntityQuery::all()
                .filter(Condition::gt("age", 24))
                .filter(Condition::is_not_null("addressId")),
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::desc("age")),
        )
        .unwrap();
    assert_eq!(ids(adults.items()), vec![7, 6, 5]);

    let homeless = repo
        .read_page_filtered(
            &EntityQuery::all().filter(Condition::is_null("addressId")),
            &SortablePageRequest::page(1, 10),
        )
        .unwrap();
    assert_eq!(homeless.total_count(), 3);

    let named = repo
        .read_page_filtered(
            &EntityQuery::all().filter(Condition::like("name", "person-0%")),
            &SortablePageRequest::page(1, 3),
        )
        .unwrap();
    assert_eq!(named.total_count(), 9);
    assert_eq!(named.total_pages(), 3);
}

#[test]
fn entity_with_custom_primary_key_counts_by_that_key() {
    let repo: SqliteReadOnlyRepository<Pet, _> =
        SqliteReadOnlyRepository::new(SharedConnectionProvider::new(pet_owners()), schema(), "pet")
            .unwrap()
            .with_options(EngineOptions {
                count_strategy: CountStrategy::SubqueryWrap,
                ..EngineOptions::default()
            });

    let page = repo
        .read_page_filtered(
            &EntityQuery::all().filter(Condition::eq("owner.address.city", "Berlin".to_string())),
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::asc("name")),
        )
        .unwrap();

    assert_eq!(page.total_count(), 2);
    let names: Vec<_> = page.items().iter().map(|pet| pet.name.as_str()).collect();
    assert_eq!(names, vec!["Rex", "Tom"]);
    assert!(page.items().iter().all(|pet| pet.owner_id == 1));
}

#[test]
fn translate_exposes_raw_sql_and_params() {
    let repo = person_repo(empty_db());
    let translated = repo
        .translate(&EntityQuery::all().filter(Condition::eq("pets.species", "dog".to_string())))
        .unwrap();

    assert!(translated.sql.starts_with("SELECT t0.\"id\" AS \"id\""));
    assert!(translated
        .sql
        .contains("FROM \"people\" AS t0 INNER JOIN \"pets\" AS t1 ON t1.\"owner_id\" = t0.\"id\""));
    assert!(translated.sql.ends_with("WHERE t1.\"species\" = ?"));
    assert!(!translated.sql.contains("ORDER BY"));
    assert_eq!(translated.params, vec![Value::Text("dog".to_string())]);
}

#[test]
fn unknown_filter_or_join_path_is_rejected() {
    let repo = person_repo(pet_owners());
    let request = SortablePageRequest::page(1, 10);

    let err = repo
        .read_page_filtered(
            &EntityQuery::all().filter(Condition::eq("address.zip", 1)),
            &request,
        )
        .unwrap_err();
    assert!(
        matches!(&err, RepoError::InvalidFilterField { field, .. } if field == "address.zip"),
        "unexpected error: {err}"
    );

    let err = repo
        .read_page_filtered(&EntityQuery::all().join("friends"), &request)
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidFilterField { .. }));
}

#[test]
fn invalid_sort_is_reported_even_with_valid_filter() {
    let repo = person_repo(pet_owners());
    let err = repo
        .read_page_filtered(
            &EntityQuery::all().join("pets"),
            &SortablePageRequest::page(1, 10).sorted_by(SortSpec::asc("pets.weight")),
        )
        .unwrap_err();

    assert!(matches!(err, RepoError::InvalidSortField { .. }));
}
