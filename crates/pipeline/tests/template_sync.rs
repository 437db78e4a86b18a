//! Template Store sync and single-template edits against a real database.

mod common;

use assert_matches::assert_matches;
use common::Site;
use sqlx::PgPool;
use themesmith_core::error::CoreError;
use themesmith_core::template::TemplateType;
use themesmith_db::repositories::{ConfigRepo, TemplateRepo};
use themesmith_pipeline::cache::CacheInvalidator;
use themesmith_pipeline::store::{SaveTemplate, TemplateStore};
use themesmith_pipeline::ThemeError;

fn store(pool: &PgPool, site: &Site) -> TemplateStore {
    let cache: std::sync::Arc<dyn CacheInvalidator> = site.cache.clone();
    TemplateStore::new(pool.clone(), site.settings.clone(), cache)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_protected_template_creates_nothing(pool: PgPool) {
    let site = Site::new();
    site.write_theme(
        "broken",
        &[
            ("index.html", "i"),
            ("default.html", "d"),
            ("category.html", "c"),
            ("landing.html", "l"),
        ],
    );

    let err = store(&pool, &site).sync("broken").await.unwrap_err();
    assert_matches!(
        err,
        ThemeError::Core(CoreError::InvalidTheme(msgs))
            if msgs == vec!["Theme missing template: news".to_string()]
    );
    assert!(TemplateRepo::list_names(&pool).await.unwrap().is_empty());
    assert_eq!(ConfigRepo::current_theme(&pool).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_protected_file_name_must_match_case(pool: PgPool) {
    let site = Site::new();
    site.valid_theme("old", &[]);
    let store = store(&pool, &site);
    store.sync("old").await.unwrap();

    site.write_theme(
        "mixed",
        &[
            ("Index.html", "<mixed index>"),
            ("default.html", "d"),
            ("category.html", "c"),
            ("news.html", "n"),
        ],
    );

    let err = store.sync("mixed").await.unwrap_err();
    assert_matches!(
        err,
        ThemeError::Core(CoreError::InvalidTheme(msgs))
            if msgs == vec!["Theme missing template: index".to_string()]
    );
    assert!(TemplateRepo::find_by_name(&pool, "Index").await.unwrap().is_none());
    let index = TemplateRepo::find_by_name(&pool, "index").await.unwrap().unwrap();
    assert_eq!(index.content, "<old:index>");
    assert_eq!(
        ConfigRepo::current_theme(&pool).await.unwrap().as_deref(),
        Some("old")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sync_assigns_types_and_sets_current(pool: PgPool) {
    let site = Site::new();
    site.valid_theme(
        "shop",
        &[
            ("product.html", "<p>"),
            ("mobile/index.html", "<m>"),
            ("theme.ini", "product = \"typeproduct\"\n"),
        ],
    );

    let report = store(&pool, &site).sync("shop").await.unwrap();
    assert_eq!(report.created.len(), 6);
    assert!(report.updated.is_empty());

    let product = TemplateRepo::find_by_name(&pool, "product").await.unwrap().unwrap();
    assert_eq!(product.kind(), TemplateType::Product);
    let mobile = TemplateRepo::find_by_name(&pool, "mobile_index").await.unwrap().unwrap();
    assert_eq!(mobile.kind(), TemplateType::Mobile);
    assert_eq!(mobile.content, "<m>");
    let index = TemplateRepo::find_by_name(&pool, "index").await.unwrap().unwrap();
    assert_eq!(index.kind(), TemplateType::Regular);

    assert_eq!(
        ConfigRepo::current_theme(&pool).await.unwrap().as_deref(),
        Some("shop")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clear_then_sync_is_idempotent(pool: PgPool) {
    let site = Site::new();
    site.valid_theme("first", &[("landing.html", "l")]);
    site.valid_theme("second", &[("promo.html", "p")]);
    let store = store(&pool, &site);

    store.sync("first").await.unwrap();

    store.clear_non_protected().await.unwrap();
    store.sync("second").await.unwrap();
    let once = TemplateRepo::list_names(&pool).await.unwrap();

    store.clear_non_protected().await.unwrap();
    store.sync("second").await.unwrap();
    let twice = TemplateRepo::list_names(&pool).await.unwrap();

    assert_eq!(once, twice);
    assert!(!once.contains(&"landing".to_string()));
    assert!(once.contains(&"promo".to_string()));
    let index = TemplateRepo::find_by_name(&pool, "index").await.unwrap().unwrap();
    assert_eq!(index.content, "<second:index>");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unreadable_file_keeps_prior_content(pool: PgPool) {
    let site = Site::new();
    let path = site.valid_theme("shop", &[("landing.html", "old")]);
    let store = store(&pool, &site);
    store.sync("shop").await.unwrap();
    ConfigRepo::set_current_theme(&pool, "previous").await.unwrap();

    common::write_file(&path.join("landing.html"), &[0xff, 0xfe, 0x00]);
    common::write_file(&path.join("fresh.html"), &[0xc3, 0x28]);

    let err = store.sync("shop").await.unwrap_err();
    assert_matches!(err, ThemeError::Core(CoreError::InvalidTheme(msgs)) if msgs.len() == 2);

    let landing = TemplateRepo::find_by_name(&pool, "landing").await.unwrap().unwrap();
    assert_eq!(landing.content, "old");
    assert!(TemplateRepo::find_by_name(&pool, "fresh").await.unwrap().is_none());
    assert_eq!(
        ConfigRepo::current_theme(&pool).await.unwrap().as_deref(),
        Some("previous")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_rename_and_delete(pool: PgPool) {
    let site = Site::new();
    let path = site.valid_theme("shop", &[("landing.html", "l")]);
    let store = store(&pool, &site);
    store.sync("shop").await.unwrap();

    let saved = store
        .save_template(&SaveTemplate {
            name: "promo".into(),
            content: "<promo>".into(),
            template_type: TemplateType::Regular,
            original_name: Some("landing".into()),
        })
        .await
        .unwrap();
    assert_eq!(saved.name, "promo");
    assert!(!path.join("landing.html").exists());
    assert_eq!(std::fs::read_to_string(path.join("promo.html")).unwrap(), "<promo>");

    // Protected templates keep their name.
    let index = store
        .save_template(&SaveTemplate {
            name: "home".into(),
            content: "<new index>".into(),
            template_type: TemplateType::Regular,
            original_name: Some("index".into()),
        })
        .await
        .unwrap();
    assert_eq!(index.name, "index");
    assert_eq!(index.content, "<new index>");

    let dup = store
        .save_template(&SaveTemplate {
            name: "news".into(),
            content: "x".into(),
            template_type: TemplateType::Regular,
            original_name: None,
        })
        .await;
    assert_matches!(dup, Err(ThemeError::Core(CoreError::Conflict(_))));

    assert_matches!(
        store.delete_template("index").await,
        Err(ThemeError::Core(CoreError::Forbidden(_)))
    );
    store.delete_template("promo").await.unwrap();
    assert!(!path.join("promo.html").exists());
    assert_matches!(
        store.delete_template("promo").await,
        Err(ThemeError::Core(CoreError::NotFound { .. }))
    );
}
