//! End-to-end tests of the receipt-to-recipe pipeline over in-memory stores

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use receipt_recipes::catalog_cache::CachedCatalog;
use receipt_recipes::ingredient_matcher::IngredientMatcher;
use receipt_recipes::memory_store::{InMemoryCatalog, InMemoryRecipeStore};
use receipt_recipes::recipe_model::RecipeRecord;
use receipt_recipes::store::IngredientCatalog;
use receipt_recipes::text_processing::Candidate;
use receipt_recipes::{FinderError, Page, RecipeFinder, SearchRequest, SortKey, StoreError};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap()
}

fn create_catalog() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::from_names([
        "사과", "우유", "양파", "대파", "계란", "두부", "돼지고기", "서울우유", "감자",
    ]))
}

fn create_recipes() -> Arc<InMemoryRecipeStore> {
    let t = base_time();
    Arc::new(InMemoryRecipeStore::new(vec![
        RecipeRecord::new(1, "사과 우유 스무디", t)
            .with_ingredient_blob("사과|우유|꿀")
            .with_views(120)
            .with_likes(8),
        RecipeRecord::new(2, "우유 푸딩", t + Duration::days(1))
            .with_ingredient_blob("우유\n설탕\n젤라틴")
            .with_views(40)
            .with_likes(30),
        RecipeRecord::new(3, "제육볶음", t + Duration::days(2))
            .with_ingredient_blob("돼지고기|양파|대파|고추장")
            .with_views(300)
            .with_likes(25),
        RecipeRecord::new(4, "계란 두부 부침", t + Duration::days(3))
            .with_ingredient_blob("계란|두부|대파")
            .with_views(75)
            .with_likes(12),
        RecipeRecord::new(5, "감자조림", t + Duration::days(4))
            .with_ingredient_blob("감자|양파|간장")
            .with_views(10)
            .with_likes(2),
    ]))
}

type Finder = RecipeFinder<Arc<InMemoryCatalog>, Arc<InMemoryRecipeStore>>;

fn create_finder(catalog: &Arc<InMemoryCatalog>, recipes: &Arc<InMemoryRecipeStore>) -> Finder {
    RecipeFinder::new(Arc::clone(catalog), Arc::clone(recipes)).unwrap()
}

fn ids(page: &Page) -> Vec<i64> {
    page.items.iter().map(|r| r.recipe_id).collect()
}

#[tokio::test]
async fn test_scenario_receipt_extraction() {
    let catalog = Arc::new(InMemoryCatalog::from_names(["사과", "우유"]));
    let finder = create_finder(&catalog, &create_recipes());

    let names = finder
        .extract_ingredients("사과 3000원\n우유 2500원\n할인 500원")
        .await
        .unwrap();

    assert_eq!(names, vec!["사과", "우유"]);
}

#[tokio::test]
async fn test_scenario_search_single_main_ingredient() {
    let t = base_time();
    let recipes = Arc::new(InMemoryRecipeStore::new(vec![
        RecipeRecord::new(1, "R1", t).with_ingredients(["사과", "우유"]),
        RecipeRecord::new(2, "R2", t).with_ingredients(["우유"]),
    ]));
    let finder = create_finder(&create_catalog(), &recipes);

    let page = finder
        .search_recipes(&SearchRequest::new(["사과"]).sorted_by(SortKey::Latest).page(10, 0))
        .await
        .unwrap();

    assert_eq!(ids(&page), vec![1]);
    assert_eq!(page.items[0].main_score, 1);
    assert_eq!(page.items[0].sub_score, 0);
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn test_scenario_empty_main_set_skips_store() {
    let recipes = create_recipes();
    let finder = create_finder(&create_catalog(), &recipes);

    let page = finder
        .search_recipes(&SearchRequest::new(Vec::<String>::new()).with_sub_ingredients(["우유"]))
        .await
        .unwrap();

    assert_eq!(page, Page::empty());
    assert_eq!(recipes.query_count(), 0);
}

#[tokio::test]
async fn test_scenario_ties_are_reproducible() {
    let t = base_time();
    let recipes = Arc::new(InMemoryRecipeStore::new(vec![
        RecipeRecord::new(10, "older", t).with_ingredients(["두부"]).with_views(50),
        RecipeRecord::new(11, "newer", t + Duration::hours(1))
            .with_ingredients(["두부"])
            .with_views(50),
        RecipeRecord::new(12, "same time as newer", t + Duration::hours(1))
            .with_ingredients(["두부"])
            .with_views(50),
    ]));
    let finder = create_finder(&create_catalog(), &recipes);
    let request = SearchRequest::new(["두부"]).sorted_by(SortKey::Views);

    let first = finder.search_recipes(&request).await.unwrap();
    assert_eq!(ids(&first), vec![12, 11, 10]);

    for _ in 0..5 {
        let again = finder.search_recipes(&request).await.unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_pages_reconstruct_the_full_ranking() {
    let recipes = create_recipes();
    let finder = create_finder(&create_catalog(), &recipes);
    let main = ["우유", "양파", "대파"];

    for sort_key in [SortKey::Latest, SortKey::Views, SortKey::Likes] {
        let full = finder
            .search_recipes(&SearchRequest::new(main).sorted_by(sort_key).page(50, 0))
            .await
            .unwrap();

        let mut stitched = Vec::new();
        let mut offset = 0;
        loop {
            let page = finder
                .search_recipes(&SearchRequest::new(main).sorted_by(sort_key).page(2, offset))
                .await
                .unwrap();
            assert_eq!(page.total_count, full.total_count);
            if page.items.is_empty() {
                break;
            }
            offset += page.items.len();
            stitched.extend(page.items);
        }

        assert_eq!(stitched, full.items, "pagination drifted for {sort_key}");
    }
}

#[tokio::test]
async fn test_scores_respect_set_semantics() {
    let recipes = create_recipes();
    let finder = create_finder(&create_catalog(), &recipes);

    let page = finder
        .search_recipes(
            &SearchRequest::new(["대파", "대파", " 양파 ", ""])
                .with_sub_ingredients(["돼지고기", "계란"])
                .page(50, 0),
        )
        .await
        .unwrap();

    // Recipe 3 has 대파 and 양파 as main, 돼지고기 as sub
    assert_eq!(page.items[0].recipe_id, 3);
    assert_eq!(page.items[0].main_score, 2);
    assert_eq!(page.items[0].sub_score, 1);

    for item in &page.items {
        assert!(item.main_score <= 2);
        assert!(item.sub_score <= 2);
        assert!(item.main_score > 0 || item.sub_score > 0);
    }

    let mut previous: Option<(i64, i64)> = None;
    for item in &page.items {
        let key = (item.main_score, item.sub_score);
        if let Some(prev) = previous {
            assert!(prev >= key, "scores not descending: {prev:?} then {key:?}");
        }
        previous = Some(key);
    }
}

#[tokio::test]
async fn test_limit_is_validated_before_store_access() {
    let recipes = create_recipes();
    let finder = create_finder(&create_catalog(), &recipes);

    for limit in [0, 51, 1000] {
        let result = finder
            .search_recipes(&SearchRequest::new(["우유"]).page(limit, 0))
            .await;
        assert!(matches!(result, Err(FinderError::Validation(_))), "limit {limit}");
    }
    assert_eq!(recipes.query_count(), 0);

    let ok = finder
        .search_recipes(&SearchRequest::new(["우유"]).page(50, 0))
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_offset_past_the_end_keeps_total() {
    let finder = create_finder(&create_catalog(), &create_recipes());
    let page = finder
        .search_recipes(&SearchRequest::new(["우유"]).page(10, 100))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 2);
}

#[tokio::test]
async fn test_catalog_failure_is_an_extraction_error() {
    let catalog = create_catalog();
    let finder = create_finder(&catalog, &create_recipes());
    catalog.set_unavailable(true);

    let result = finder.extract_ingredients("사과 3000원").await;
    assert!(matches!(
        result,
        Err(FinderError::Extraction(StoreError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn test_recipe_store_failure_is_a_search_error() {
    let recipes = create_recipes();
    let finder = create_finder(&create_catalog(), &recipes);
    recipes.set_unavailable(true);

    let result = finder
        .find_recipes_for_receipt("사과 3000원", SearchRequest::new(Vec::<String>::new()))
        .await;
    assert!(matches!(
        result,
        Err(FinderError::Search(StoreError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn test_partial_matches_resolve_to_catalog_names() {
    let catalog = create_catalog();
    let matcher = IngredientMatcher::new(Arc::clone(&catalog));

    // Candidate contains a catalog name
    let record = matcher.match_candidate("햇양파").await.unwrap().unwrap();
    assert_eq!(record.name, "양파");

    // Catalog name contains the candidate; 서울우유 is the only superstring
    let record = matcher.match_candidate("서울").await.unwrap().unwrap();
    assert_eq!(record.name, "서울우유");

    // Exact matches win over partial ones
    let record = matcher.match_candidate("우유").await.unwrap().unwrap();
    assert_eq!(record.name, "우유");

    assert!(matcher.match_candidate("바나나").await.unwrap().is_none());
}

#[tokio::test]
async fn test_matched_names_are_unique_catalog_entries() {
    let catalog = create_catalog();
    let matcher = IngredientMatcher::new(Arc::clone(&catalog));
    let candidates = vec![
        Candidate::new("햇양파"),
        Candidate::new("양파"),
        Candidate::new("바나나"),
        Candidate::new("국산 대파"),
        Candidate::new("대파"),
    ];

    let names = matcher.match_candidates(&candidates).await.unwrap();
    assert_eq!(names, vec!["양파", "대파"]);

    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
    for name in &names {
        let record = catalog.find_exact(name).await.unwrap();
        assert!(record.is_some(), "{name} is not in the catalog");
    }
}

#[tokio::test]
async fn test_full_receipt_flow_with_cached_catalog() {
    let catalog = Arc::new(CachedCatalog::new(create_catalog()));
    let recipes = create_recipes();
    let finder = RecipeFinder::new(Arc::clone(&catalog), Arc::clone(&recipes)).unwrap();

    let receipt = "이마트 영수증\n\
                   [행사] 국산 대파 1단 2,980원\n\
                   햇양파 1.5kg 4,500원\n\
                   서울우유 1L 2,850원\n\
                   쇼핑봉투 100원\n\
                   합계 10,430원\n\
                   카드결제 10,430원";

    let result = finder
        .find_recipes_for_receipt(
            receipt,
            SearchRequest::new(["돼지고기"])
                .sorted_by(SortKey::Views)
                .page(3, 0),
        )
        .await
        .unwrap();

    assert_eq!(result.extracted, vec!["대파", "양파", "서울우유"]);
    assert_eq!(result.main_ingredients, vec!["대파", "양파", "서울우유", "돼지고기"]);
    assert_eq!(result.page.items[0].recipe_id, 3);
    assert_eq!(result.page.items[0].main_score, 3);
    assert_eq!(result.page.total_count, 3);

    // A second receipt with the same lines is served from the cache
    let lookups = catalog.inner().lookup_count();
    finder.extract_ingredients(receipt).await.unwrap();
    assert_eq!(catalog.inner().lookup_count(), lookups);
}
