//! Behavioural tests for `plexus_registry`.
//!
//! These cover deferred resolution, branch nesting, includes, and the
//! interaction between registries that share a locator.

use std::sync::Arc;

use plexus_registry::prelude::*;

// ─────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────

/// A locator with the builtin modules plus a `shop` package.
fn shop_modules(exported: &Registry) -> Arc<ModuleTable> {
    let modules = ModuleTable::with_builtins();
    modules.declare("shop", || Module::new("shop").with_value("currency", "EUR"));
    modules.declare("shop.pricing", || {
        Module::new("shop.pricing").with_value("vat", 0.2_f64)
    });
    let handle = exported.clone();
    modules.declare("shop.catalog", move || {
        Module::new("shop.catalog").with_namespace("apps", handle.clone())
    });
    Arc::new(modules)
}

fn shop_registry() -> (Registry, Registry) {
    let catalog = Registry::new();
    catalog.insert("items", vec!["tea", "coffee"]);
    let registry =
        Registry::with_config(RegistryConfig::default().with_locator(shop_modules(&catalog)));
    (registry, catalog)
}

// ─────────────────────────────────────────────────────────────────────────
// Deferred resolution
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn sqrt_resolves_to_callable() {
    let registry = Registry::new();
    registry.set::<Apps>("sqrt", "math.sqrt");

    let sqrt = registry.component::<fn(f64) -> f64>("sqrt").unwrap();
    assert_eq!(sqrt(4.0), 2.0);
}

#[test]
fn resolution_is_idempotent_by_identity() {
    let (registry, _) = shop_registry();
    for (label, path) in [("vat", "shop.pricing.vat"), ("currency", "shop.currency")] {
        registry.set::<Apps>(label, path);

        let first = registry.get::<Apps>(label).unwrap().into_component().unwrap();
        assert!(!registry.peek::<Apps>(label).unwrap().is_deferred());
        let second = registry.get::<Apps>(label).unwrap().into_component().unwrap();

        assert!(first.ptr_eq(&second), "{label} resolved twice");
    }
}

#[test]
fn labels_deferring_to_one_path_share_the_object() {
    let (registry, _) = shop_registry();
    registry.set::<Apps>("vat", "shop.pricing.vat");
    registry.branch("billing").unwrap().set::<Apps>("tax", "shop.pricing.vat");

    let vat = registry.get::<Apps>("vat").unwrap().into_component().unwrap();
    let tax = registry.lookup("billing.tax").unwrap().into_component().unwrap();
    assert!(vat.ptr_eq(&tax));
}

#[test]
fn submodules_are_imported_on_demand() {
    let (registry, _) = shop_registry();
    registry.set::<Apps>("vat", "shop.pricing.vat");

    assert_eq!(*registry.component::<f64>("vat").unwrap(), 0.2);
}

#[test]
fn resolving_to_a_module_yields_the_module() {
    let (registry, _) = shop_registry();
    registry.set::<Apps>("pricing", "shop.pricing");

    let module = registry.component::<Module>("pricing").unwrap();
    assert_eq!(module.name(), "shop.pricing");
}

#[test]
fn resolution_failures_are_not_cached() {
    let modules = Arc::new(ModuleTable::new());
    let registry = Registry::with_config(
        RegistryConfig::default().with_locator(Arc::clone(&modules) as Arc<dyn Locator>),
    );
    registry.set::<Apps>("late", "late.value");

    assert!(matches!(
        registry.get::<Apps>("late"),
        Err(RegistryError::Resolve(ResolveError::ModuleNotFound(_)))
    ));

    modules.declare("late", || Module::new("late").with_value("value", 7_i32));
    assert_eq!(*registry.component::<i32>("late").unwrap(), 7);
}

#[test]
fn fresh_keys_see_changes_behind_a_namespace() {
    let (registry, catalog) = shop_registry();
    registry.set::<Apps>("before", "shop.catalog.apps.items");
    assert_eq!(*registry.component::<Vec<&str>>("before").unwrap(), vec!["tea", "coffee"]);

    catalog.insert("items", vec!["juice"]);
    registry.set::<Apps>("after", "shop.catalog.apps.items");
    assert_eq!(*registry.component::<Vec<&str>>("after").unwrap(), vec!["juice"]);
    // already resolved keys keep their value
    assert_eq!(*registry.component::<Vec<&str>>("before").unwrap(), vec!["tea", "coffee"]);

    catalog.remove::<Apps>("items");
    registry.set::<Apps>("gone", "shop.catalog.apps.items");
    assert!(matches!(
        registry.get::<Apps>("gone"),
        Err(RegistryError::Resolve(ResolveError::MissingAttribute { .. }))
    ));
}

// ─────────────────────────────────────────────────────────────────────────
// Includes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn include_resolves_to_exported_registry() {
    let (registry, catalog) = shop_registry();
    registry.include("catalog", "shop.catalog");

    let included = registry.get::<Apps>("catalog").unwrap().into_branch().unwrap();
    assert!(included.ptr_eq(&catalog));

    let items = registry.lookup("catalog.items").unwrap().into_component().unwrap();
    assert_eq!(items.downcast_ref::<Vec<&str>>().unwrap(), &vec!["tea", "coffee"]);
}

#[test]
fn include_of_non_namespace_attribute_fails() {
    let (registry, _) = shop_registry();
    registry.set::<Apps>("bad", ("shop", "currency"));

    assert!(matches!(
        registry.get::<Apps>("bad"),
        Err(RegistryError::Resolve(ResolveError::NotANamespace { .. }))
    ));
}

#[test]
fn include_attribute_is_configurable() {
    let exported = Registry::new();
    exported.insert("x", 1_u8);
    let modules = ModuleTable::new();
    let handle = exported.clone();
    modules.declare("plugin", move || {
        Module::new("plugin").with_namespace("exports", handle.clone())
    });

    let registry = Registry::with_config(
        RegistryConfig::default()
            .with_locator(Arc::new(modules))
            .with_include_attr("exports"),
    );
    registry.include("plugin", "plugin");

    assert!(registry.branch("plugin").unwrap().ptr_eq(&exported));
}

// ─────────────────────────────────────────────────────────────────────────
// Branches
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn branches_share_configuration() {
    let registry = Registry::with_config(RegistryConfig::default().with_root_label("app"));
    let views = registry.branch_path("web.views").unwrap();

    assert_eq!(views.root_label(), "app");
    assert_eq!(views.path(), "app.web.views");
    assert!(core::ptr::eq(registry.resolver(), views.resolver()));

    views.set::<Apps>("sqrt", "math.sqrt");
    assert!(views.component::<fn(f64) -> f64>("sqrt").is_ok());
}

#[test]
fn overwriting_a_branch_with_a_component_is_permitted() {
    let registry = Registry::new();
    registry.branch("slot").unwrap();

    let previous = registry.insert("slot", 3_u8).unwrap();
    assert_eq!(previous.kind(), "branch");
    assert!(matches!(
        registry.branch("slot"),
        Err(RegistryError::Configuration(_))
    ));
}

#[test]
fn removing_a_branch_lets_it_be_recreated() {
    let registry = Registry::new();
    let first = registry.branch("tmp").unwrap();
    registry.remove::<Apps>("tmp");

    let second = registry.branch("tmp").unwrap();
    assert!(!first.ptr_eq(&second));
}

#[test]
fn custom_tags_are_independent() {
    struct Validators;
    impl Tag for Validators {}

    let registry = Registry::new();
    registry.set::<Validators>("email", Component::new("[^@]+@[^@]+"));

    assert!(!registry.contains("email"));
    assert!(registry.contains_key::<Validators>("email"));
    assert_eq!(registry.labels::<Validators>(), vec!["email"]);
    assert!(registry.get::<Apps>("email").unwrap_err().is_not_found());
}
