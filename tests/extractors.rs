//! Extraction over a fixture project

mod common;

use std::sync::Arc;

use common::{FakeRunner, Fixture};
use laravel_navigator::config::RouteSource;
use laravel_navigator::extractors::{
    ConfigExtractor, EnvExtractor, Extractor, RelationshipExtractor, RouteExtractor, TranslationExtractor,
    ViewExtractor,
};
use laravel_navigator::SymbolIndex;

fn index(extractor: &dyn Extractor, fixture: &Fixture) -> SymbolIndex {
    SymbolIndex::from_entries(extractor.extract(&fixture.project()).unwrap())
}

fn names(index: &SymbolIndex) -> Vec<&str> {
    index.names().collect()
}

#[test]
fn test_route_names_from_files() {
    let fixture = Fixture::laravel_app();
    let index = index(&RouteExtractor::new(), &fixture);

    assert_eq!(
        names(&index),
        vec![
            "admin.users.index",
            "api.user",
            "dashboard",
            "home",
            "photos.create",
            "photos.destroy",
            "photos.edit",
            "photos.index",
            "photos.show",
            "photos.store",
            "photos.update",
        ]
    );
    let home = index.get("home").unwrap();
    assert_eq!(home.source_file, fixture.path("routes/web.php"));
    assert_eq!(home.line(), Some(5));
    assert_eq!(index.get("photos.edit").unwrap().extra("kind"), Some("resource"));
}

#[test]
fn test_routes_from_artisan_query() {
    let fixture = Fixture::laravel_app();
    let runner = Arc::new(FakeRunner::succeeding(
        r#"[
            {"domain":null,"method":"GET|HEAD","uri":"/","name":"home","action":"App\\Http\\Controllers\\HomeController@index","middleware":["web"]},
            {"domain":null,"method":"POST","uri":"logout","name":null,"action":"Closure","middleware":["web"]},
            {"domain":null,"method":"GET|HEAD","uri":"billing","name":"billing","action":"App\\Http\\Controllers\\BillingController","middleware":["web"]}
        ]"#,
    ));
    let extractor = RouteExtractor::with_runner(runner.clone());
    let project = fixture.project_with(|config| config.route_source = RouteSource::Artisan);

    let index = SymbolIndex::from_entries(extractor.extract(&project).unwrap());
    assert_eq!(names(&index), vec!["billing", "home"]);
    assert_eq!(runner.calls(), 1);

    let billing = index.get("billing").unwrap();
    assert_eq!(billing.source_file, fixture.path("app/Http/Controllers/BillingController.php"));
    assert_eq!(billing.extra("uri"), Some("billing"));

    let request = runner.last_request().unwrap();
    assert_eq!(request.program, "php");
    assert_eq!(request.args, vec!["artisan", "route:list", "--json"]);
    assert_eq!(request.cwd, fixture.root());
}

#[test]
fn test_artisan_command_prefix() {
    let fixture = Fixture::laravel_app();
    let runner = Arc::new(FakeRunner::succeeding("[]"));
    let project = fixture.project_with(|config| {
        config.route_source = RouteSource::Artisan;
        config.artisan.command_prefix = vec!["docker".into(), "compose".into(), "exec".into(), "app".into()];
    });

    let entries = RouteExtractor::with_runner(runner.clone()).extract(&project).unwrap();
    assert!(entries.is_empty());

    let request = runner.last_request().unwrap();
    assert_eq!(request.program, "docker");
    assert_eq!(request.args, vec!["compose", "exec", "app", "php", "artisan", "route:list", "--json"]);
}

#[test]
fn test_artisan_garbage_output_is_an_error() {
    let fixture = Fixture::laravel_app();
    let runner = Arc::new(FakeRunner::succeeding("PHP Fatal error: Class not found"));
    let project = fixture.project_with(|config| config.route_source = RouteSource::Artisan);

    assert!(RouteExtractor::with_runner(runner).extract(&project).is_err());
}

#[test]
fn test_auto_source_falls_back_to_route_files() {
    let fixture = Fixture::laravel_app().file("artisan", "#!/usr/bin/env php\n");
    let runner = Arc::new(FakeRunner::succeeding("not json"));
    let project = fixture.project_with(|config| config.route_source = RouteSource::Auto);

    let entries = RouteExtractor::with_runner(runner.clone()).extract(&project).unwrap();
    assert_eq!(runner.calls(), 1);
    assert!(entries.iter().any(|entry| entry.name == "home"));
}

#[test]
fn test_auto_source_without_artisan_skips_query() {
    let fixture = Fixture::laravel_app();
    let runner = Arc::new(FakeRunner::succeeding("[]"));
    let project = fixture.project_with(|config| config.route_source = RouteSource::Auto);

    let entries = RouteExtractor::with_runner(runner.clone()).extract(&project).unwrap();
    assert_eq!(runner.calls(), 0);
    assert!(!entries.is_empty());
}

#[test]
fn test_views_and_components() {
    let fixture = Fixture::laravel_app();
    let index = index(&ViewExtractor, &fixture);

    assert_eq!(
        names(&index),
        vec!["Dashboard", "Settings.Profile", "admin.users.index", "layouts.app", "welcome"]
    );
    assert_eq!(index.get("welcome").unwrap().extra("kind"), Some("template"));
    assert_eq!(index.get("Dashboard").unwrap().extra("kind"), Some("component"));
}

#[test]
fn test_template_wins_over_component_of_same_name() {
    let fixture = Fixture::laravel_app().file("resources/js/Pages/welcome.vue", "<template></template>\n");
    let index = index(&ViewExtractor, &fixture);

    let welcome = index.get("welcome").unwrap();
    assert_eq!(welcome.source_file, fixture.path("resources/views/welcome.blade.php"));
}

#[test]
fn test_config_keys() {
    let fixture = Fixture::laravel_app();
    let index = index(&ConfigExtractor, &fixture);

    assert_eq!(
        names(&index),
        vec![
            "app",
            "app.debug",
            "app.name",
            "app.timezone",
            "database",
            "database.connections",
            "database.connections.mysql",
            "database.connections.mysql.host",
            "database.connections.mysql.port",
            "database.default",
        ]
    );
    assert_eq!(index.get("database.connections.mysql.host").unwrap().line(), Some(7));
}

#[test]
fn test_translation_keys() {
    let fixture = Fixture::laravel_app();
    let index = index(&TranslationExtractor, &fixture);

    assert_eq!(names(&index), vec!["Log out", "Welcome back", "auth", "auth.failed", "auth.throttle"]);

    // The preferred locale is scanned first and wins duplicates
    let failed = index.get("auth.failed").unwrap();
    assert_eq!(failed.source_file, fixture.path("lang/en/auth.php"));
    assert_eq!(failed.extra("locale"), Some("en"));
    assert_eq!(index.get("Log out").unwrap().extra("kind"), Some("json"));
}

#[test]
fn test_keys_of_one_line_arrays() {
    let fixture = Fixture::empty()
        .file("lang/en/auth.php", "<?php\n\nreturn ['failed' => 'msg', 'throttle' => 'x'];\n")
        .file(
            "config/app.php",
            "<?php\n\nreturn [\n    'mail' => ['from' => 'a', 'to' => 'b'],\n    'name' => 'x',\n];\n",
        );

    let translations = index(&TranslationExtractor, &fixture);
    assert_eq!(names(&translations), vec!["auth", "auth.failed", "auth.throttle"]);
    assert_eq!(translations.get("auth.throttle").unwrap().line(), Some(2));

    let config = index(&ConfigExtractor, &fixture);
    assert_eq!(names(&config), vec!["app", "app.mail", "app.mail.from", "app.mail.to", "app.name"]);
}

#[test]
fn test_translation_keys_in_legacy_lang_dir() {
    let fixture = Fixture::empty().file("resources/lang/de/validation.php", "<?php\nreturn [\n    'required' => 'x',\n];\n");
    let index = index(&TranslationExtractor, &fixture);
    assert_eq!(names(&index), vec!["validation", "validation.required"]);
}

#[test]
fn test_env_keys_follow_file_precedence() {
    let fixture = Fixture::laravel_app();
    let index = index(&EnvExtractor, &fixture);

    assert_eq!(names(&index), vec!["APP_DEBUG", "APP_NAME", "DB_HOST", "MAIL_HOST"]);
    assert_eq!(index.get("APP_NAME").unwrap().source_file, fixture.path(".env"));
    assert_eq!(index.get("MAIL_HOST").unwrap().source_file, fixture.path(".env.example"));
}

#[test]
fn test_relationship_entries() {
    let fixture = Fixture::laravel_app();
    let index = index(&RelationshipExtractor, &fixture);

    assert_eq!(names(&index), vec!["Post.user", "User.posts", "User.roles"]);
    let roles = index.get("User.roles").unwrap();
    assert_eq!(roles.extra("kind"), Some("belongsToMany"));
    assert_eq!(roles.extra("related"), Some("Role"));
    assert_eq!(roles.line(), Some(11));
}

#[test]
fn test_missing_directories_yield_nothing() {
    let fixture = Fixture::empty();
    let project = fixture.project();
    for extractor in laravel_navigator::extractors::default_extractors() {
        assert!(extractor.extract(&project).unwrap().is_empty(), "{}", extractor.category());
    }
}

#[cfg(unix)]
#[test]
fn test_view_walk_survives_symlink_cycle() {
    let fixture = Fixture::empty().file("resources/views/a/x.blade.php", "");
    std::os::unix::fs::symlink(fixture.path("resources/views"), fixture.path("resources/views/a/loop")).unwrap();

    let index = index(&ViewExtractor, &fixture);
    assert_eq!(names(&index), vec!["a.x"]);
}
