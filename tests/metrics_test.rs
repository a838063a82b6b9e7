use std::sync::Arc;
use stockgrid::formulas::{
    BETA, CAPM, EARNINGS_GROWTH, EARNINGS_GROWTH_TO_CAPM, FormulaConfig, IMPLIED_PRICE,
    MARKET_CAP, REVENUE_GROWTH, REVENUE_GROWTH_TO_CAPM, SHARES_OUTSTANDING, register_defaults,
};
use stockgrid::metrics::MetricEngine;
use stockgrid::store::ValueStore;
use stockgrid::GridError;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

fn stock_engine() -> (Arc<ValueStore>, MetricEngine) {
    let store = Arc::new(ValueStore::new());
    let mut engine = MetricEngine::new(store.clone());
    register_defaults(&mut engine, FormulaConfig::default());
    (store, engine)
}

#[test]
fn test_capm_from_beta() {
    let (store, engine) = stock_engine();
    store.set_true("AAPL", BETA, "1.25");
    let capm = engine.value_of(CAPM, "AAPL").unwrap();
    assert!(close(capm, 0.105), "{}", capm);
}

#[test]
fn test_implied_price_from_market_cap_and_shares() {
    let (store, engine) = stock_engine();
    store.set_true("GOOG", MARKET_CAP, "2.1T");
    store.set_true("GOOG", SHARES_OUTSTANDING, "12000000000");
    let price = engine.value_of(IMPLIED_PRICE, "GOOG").unwrap();
    assert!(close(price, 175.0), "{}", price);
}

#[test]
fn test_growth_to_capm_ratios() {
    let (store, engine) = stock_engine();
    store.set_true("AAPL", BETA, "1.25");
    store.set_true("AAPL", REVENUE_GROWTH, "21%");
    store.set_true("AAPL", EARNINGS_GROWTH, "10.5%");

    assert!(close(engine.value_of(REVENUE_GROWTH_TO_CAPM, "AAPL").unwrap(), 2.0));
    assert!(close(engine.value_of(EARNINGS_GROWTH_TO_CAPM, "AAPL").unwrap(), 1.0));
}

#[test]
fn test_unloaded_dependency_propagates_nan() {
    let (store, engine) = stock_engine();
    assert!(engine.value_of(CAPM, "AAPL").unwrap().is_nan());
    store.set_true("GOOG", MARKET_CAP, "2.1T");
    assert!(engine.value_of(IMPLIED_PRICE, "GOOG").unwrap().is_nan());
}

#[test]
fn test_changing_a_dependency_recomputes() {
    let (store, engine) = stock_engine();
    store.set_true("GOOG", MARKET_CAP, "2.1T");
    store.set_true("GOOG", SHARES_OUTSTANDING, "12000000000");
    assert!(close(engine.value_of(IMPLIED_PRICE, "GOOG").unwrap(), 175.0));

    store.set_override("GOOG", MARKET_CAP, "2.4T");
    assert!(close(engine.value_of(IMPLIED_PRICE, "GOOG").unwrap(), 200.0));

    store.clear_override("GOOG", MARKET_CAP);
    assert!(close(engine.value_of(IMPLIED_PRICE, "GOOG").unwrap(), 175.0));
}

#[test]
fn test_values_are_cached_until_a_declared_dependency_changes() {
    let (store, engine) = stock_engine();
    store.set_true("AAPL", BETA, "1.25");

    engine.value_of(CAPM, "AAPL").unwrap();
    let after_first = engine.recomputations();
    engine.value_of(CAPM, "AAPL").unwrap();
    assert_eq!(engine.recomputations(), after_first);

    // Undeclared attribute and another ticker: no recomputation, same value.
    store.set_true("AAPL", MARKET_CAP, "3T");
    store.set_true("MSFT", BETA, "0.9");
    assert!(close(engine.value_of(CAPM, "AAPL").unwrap(), 0.105));
    assert_eq!(engine.recomputations(), after_first);

    store.set_true("AAPL", BETA, "2");
    let capm = engine.value_of(CAPM, "AAPL").unwrap();
    assert_eq!(engine.recomputations(), after_first + 1);
    assert!(close(capm, 0.04 + 2.0 * 0.052));
}

#[test]
fn test_arbitrary_formulas_and_arity() {
    let store = Arc::new(ValueStore::new());
    let mut engine = MetricEngine::new(store.clone());
    engine.define_metric("Zero", &[], |_| 7.0);
    engine.define_metric("Sum3", &["a", "b", "c"], |args| {
        assert_eq!(args.len(), 3);
        args[0] + 10.0 * args[1] + 100.0 * args[2]
    });

    store.set_true("X", "a", "1");
    store.set_true("X", "b", "2");
    store.set_true("X", "c", "3");

    assert_eq!(engine.value_of("Zero", "X").unwrap(), 7.0);
    assert_eq!(engine.value_of("Sum3", "X").unwrap(), 321.0);

    // Positional: the formula sees parse(new a) with the old b and c.
    store.set_override("X", "a", "5");
    assert_eq!(engine.value_of("Sum3", "X").unwrap(), 325.0);
}

#[test]
fn test_redefining_a_metric_replaces_it() {
    let store = Arc::new(ValueStore::new());
    let mut engine = MetricEngine::new(store.clone());
    store.set_true("X", "a", "2");
    engine.define_metric("M", &["a"], |args| args[0]);
    assert_eq!(engine.value_of("M", "X").unwrap(), 2.0);

    engine.define_metric("M", &["a"], |args| args[0] * 10.0);
    assert_eq!(engine.value_of("M", "X").unwrap(), 20.0);
    assert_eq!(engine.names().count(), 1);
}

#[test]
fn test_unknown_metric_is_an_error() {
    let (_, engine) = stock_engine();
    assert!(matches!(
        engine.value_of("Nope", "AAPL"),
        Err(GridError::UnknownMetric(name)) if name == "Nope"
    ));
}

#[test]
fn test_dependency_lookup_is_declaration_based() {
    let (_, engine) = stock_engine();
    assert!(engine.is_dependency(CAPM, BETA));
    assert!(!engine.is_dependency(CAPM, MARKET_CAP));
    assert!(engine.is_dependency(IMPLIED_PRICE, SHARES_OUTSTANDING));
    assert!(!engine.is_dependency("Nope", BETA));

    assert_eq!(
        engine.dependencies(IMPLIED_PRICE).unwrap(),
        &[MARKET_CAP.to_string(), SHARES_OUTSTANDING.to_string()]
    );
    assert_eq!(
        engine.dependents_of(BETA),
        vec![CAPM, REVENUE_GROWTH_TO_CAPM, EARNINGS_GROWTH_TO_CAPM]
    );
}

#[test]
fn test_custom_capm_constants() {
    let store = Arc::new(ValueStore::new());
    let mut engine = MetricEngine::new(store.clone());
    let config = FormulaConfig {
        risk_free: 0.05,
        market_rate: 0.10,
    };
    register_defaults(&mut engine, config);
    store.set_true("AAPL", BETA, "2");
    assert!(close(engine.value_of(CAPM, "AAPL").unwrap(), 0.15));
}

#[test]
fn test_growth_ratios_depend_on_beta_not_the_capm_row() {
    let (store, engine) = stock_engine();
    assert_eq!(
        engine.dependencies(REVENUE_GROWTH_TO_CAPM).unwrap(),
        &[REVENUE_GROWTH.to_string(), BETA.to_string()]
    );
    assert!(!engine.is_dependency(EARNINGS_GROWTH_TO_CAPM, CAPM));

    // A value typed into a "CAPM" attribute row is not read by the ratio.
    store.set_true("AAPL", BETA, "1.25");
    store.set_true("AAPL", EARNINGS_GROWTH, "10.5%");
    store.set_override("AAPL", CAPM, "0.5");
    assert!(close(engine.value_of(EARNINGS_GROWTH_TO_CAPM, "AAPL").unwrap(), 1.0));
}
