//! Aggregator Integration Tests
//!
//! Verifies the aggregator fan-out against scripted adapters:
//! 1. Results are always ordered by supply APY
//! 2. Failing, slow and panicking adapters are isolated and counted
//! 3. Positions, metrics and comparisons roll up correctly
//!
//! All tests are deterministic (no real network calls) and use mock adapters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use yield_engine::application::{AggregatorConfig, EngineError, YieldAggregator};
use yield_engine::domain::{OpportunityFilter, Position, Protocol, ProtocolMetrics, SortKey};
use yield_engine::ports::mocks::MockProtocolAdapter;
use yield_engine::ports::AdapterError;

// ============================================================================
// Test Fixtures
// ============================================================================

const WALLET: &str = "0x5e1f62dac767b0491e3ce72469c217365d5b48cc";

fn aggregator(adapters: Vec<MockProtocolAdapter>) -> YieldAggregator {
    aggregator_with(AggregatorConfig::default(), adapters)
}

fn aggregator_with(config: AggregatorConfig, adapters: Vec<MockProtocolAdapter>) -> YieldAggregator {
    let mut aggregator = YieldAggregator::new(config);
    for adapter in adapters {
        aggregator.register(Arc::new(adapter));
    }
    aggregator
}

/// Aave 4.5%, Compound 5.2%, Morpho 6.8% on USDC/Ethereum
fn three_markets() -> Vec<MockProtocolAdapter> {
    vec![
        MockProtocolAdapter::new(Protocol::Aave).with_apy("USDC", 1, dec!(4.5), dec!(2000000000)),
        MockProtocolAdapter::new(Protocol::Compound).with_apy("USDC", 1, dec!(5.2), dec!(600000000)),
        MockProtocolAdapter::new(Protocol::Morpho).with_apy("USDC", 1, dec!(6.8), dec!(150000000)),
    ]
}

fn position(protocol: Protocol, token: &str, value: Decimal, apy: Decimal) -> Position {
    Position::new(protocol, token, "0x", 1, "1000000", value, value, apy).unwrap()
}

fn metrics(protocol: Protocol, tvl: Decimal, apy: Decimal, healthy: bool) -> ProtocolMetrics {
    ProtocolMetrics {
        protocol,
        chain_id: 1,
        tvl_usd: tvl,
        total_borrows_usd: None,
        available_liquidity_usd: tvl / dec!(4),
        avg_supply_apy: apy,
        is_healthy: healthy,
        last_updated: chrono::Utc::now(),
    }
}

// ============================================================================
// Opportunity fan-out
// ============================================================================

#[tokio::test]
async fn test_opportunities_sorted_by_apy_descending() {
    let result = aggregator(three_markets())
        .fetch_all_opportunities("USDC", 1, None)
        .await
        .unwrap();

    let apys: Vec<Decimal> = result.opportunities.iter().map(|o| o.supply_apy).collect();
    assert_eq!(apys, vec![dec!(6.8), dec!(5.2), dec!(4.5)]);
    assert_eq!(result.best.as_ref().map(|o| o.protocol), Some(Protocol::Morpho));
    assert_eq!(result.worst.as_ref().map(|o| o.protocol), Some(Protocol::Aave));
    assert_eq!(result.apy_spread, dec!(2.3));
    assert_eq!(result.successful_protocols, 3);
    assert_eq!(result.failed_protocols, 0);
}

#[tokio::test]
async fn test_partial_failure_is_recorded_per_protocol() {
    let mut adapters = three_markets();
    adapters[1] = MockProtocolAdapter::new(Protocol::Compound)
        .with_failure(AdapterError::Network("rpc unreachable".to_string()));

    let result = aggregator(adapters)
        .fetch_all_opportunities("USDC", 1, None)
        .await
        .unwrap();

    assert_eq!(result.successful_protocols, 2);
    assert_eq!(result.failed_protocols, 1);
    assert!(result.errors[&Protocol::Compound].contains("rpc unreachable"));
    assert_eq!(result.opportunities.len(), 2);
}

#[tokio::test]
async fn test_all_adapters_failing_is_an_empty_success() {
    let adapters = vec![
        MockProtocolAdapter::new(Protocol::Aave).with_failure(AdapterError::Malformed("bad json".into())),
        MockProtocolAdapter::new(Protocol::Morpho).with_failure(AdapterError::Network("down".into())),
    ];

    let result = aggregator(adapters)
        .fetch_all_opportunities("USDC", 1, None)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(result.best.is_none());
    assert!(result.worst.is_none());
    assert_eq!(result.apy_spread, Decimal::ZERO);
    assert_eq!(result.failed_protocols, 2);
    assert!(result.failure_summary().is_some());
}

#[tokio::test]
async fn test_slow_adapter_times_out_without_blocking_others() {
    let mut adapters = three_markets();
    adapters[0] = MockProtocolAdapter::new(Protocol::Aave)
        .with_apy("USDC", 1, dec!(9), dec!(2000000000))
        .with_delay(Duration::from_secs(5));
    let config = AggregatorConfig::default().with_adapter_timeout(Duration::from_millis(50));

    let result = aggregator_with(config, adapters)
        .fetch_all_opportunities("USDC", 1, None)
        .await
        .unwrap();

    assert_eq!(result.successful_protocols, 2);
    assert!(result.errors[&Protocol::Aave].contains("Timed out"));
    assert_eq!(result.best.map(|o| o.protocol), Some(Protocol::Morpho));
}

#[tokio::test]
async fn test_fan_out_is_concurrent() {
    let adapters = three_markets()
        .into_iter()
        .map(|adapter| adapter.with_delay(Duration::from_millis(200)))
        .collect();
    let config = AggregatorConfig::default().with_adapter_timeout(Duration::from_secs(10));
    let aggregator = aggregator_with(config, adapters);

    let started = Instant::now();
    let result = aggregator.fetch_all_opportunities("USDC", 1, None).await.unwrap();
    let elapsed = started.elapsed();

    // Three 200ms adapters in sequence would take at least 600ms
    assert_eq!(result.successful_protocols, 3);
    assert!(elapsed < Duration::from_millis(450), "fan-out took {:?}", elapsed);
}

#[tokio::test]
async fn test_token_batches_run_concurrently() {
    let adapters = vec![
        MockProtocolAdapter::new(Protocol::Aave)
            .with_apy("USDC", 1, dec!(4.5), dec!(2000000000))
            .with_apy("USDT", 1, dec!(3.9), dec!(900000000))
            .with_delay(Duration::from_millis(200)),
        MockProtocolAdapter::new(Protocol::Morpho)
            .with_apy("USDC", 1, dec!(6.8), dec!(150000000))
            .with_apy("USDT", 1, dec!(5.1), dec!(80000000))
            .with_delay(Duration::from_millis(200)),
    ];
    let config = AggregatorConfig::default().with_adapter_timeout(Duration::from_secs(10));
    let aggregator = aggregator_with(config, adapters);
    let tokens = vec!["USDC".to_string(), "USDT".to_string()];

    let started = Instant::now();
    let all = aggregator.fetch_opportunities_for_tokens(&tokens, 1).await.unwrap();
    let elapsed = started.elapsed();

    // Four 200ms calls; sequential tokens alone would take 400ms
    assert_eq!(all.len(), 4);
    assert!(elapsed < Duration::from_millis(350), "batch took {:?}", elapsed);
}

#[tokio::test]
async fn test_panicking_adapter_is_isolated() {
    let mut adapters = three_markets();
    adapters[2] = MockProtocolAdapter::new(Protocol::Morpho).panicking();

    let result = aggregator(adapters)
        .fetch_all_opportunities("USDC", 1, None)
        .await
        .unwrap();

    assert_eq!(result.successful_protocols, 2);
    assert!(result.errors[&Protocol::Morpho].contains("panicked"));
    assert_eq!(result.best.map(|o| o.protocol), Some(Protocol::Compound));
}

#[tokio::test]
async fn test_unsupported_token_skips_adapter_call() {
    let aave = MockProtocolAdapter::new(Protocol::Aave).with_apy("USDC", 1, dec!(4.5), dec!(1000));
    let morpho = MockProtocolAdapter::new(Protocol::Morpho).without_token("USDC");
    let morpho_handle = morpho.clone();

    let result = aggregator(vec![aave, morpho])
        .fetch_all_opportunities("USDC", 1, None)
        .await
        .unwrap();

    assert_eq!(morpho_handle.call_count(), 0);
    assert_eq!(result.failed_protocols, 1);
    assert!(result.errors[&Protocol::Morpho].contains("Unsupported"));
}

#[tokio::test]
async fn test_filter_thresholds_and_limit() {
    let filter = OpportunityFilter::new()
        .with_min_apy(dec!(5))
        .with_min_tvl(dec!(200000000))
        .sorted_by(SortKey::Tvl)
        .with_limit(5);

    let result = aggregator(three_markets())
        .fetch_all_opportunities("USDC", 1, Some(&filter))
        .await
        .unwrap();

    // Morpho clears the APY bar but not the TVL floor
    let protocols: Vec<Protocol> = result.opportunities.iter().map(|o| o.protocol).collect();
    assert_eq!(protocols, vec![Protocol::Compound]);
}

#[tokio::test]
async fn test_leaderboard_honours_sort_key() {
    let filter = OpportunityFilter::new().sorted_by(SortKey::Tvl).with_limit(2);
    let ranked = aggregator(three_markets())
        .leaderboard("USDC", 1, &filter)
        .await
        .unwrap();

    let protocols: Vec<Protocol> = ranked.iter().map(|o| o.protocol).collect();
    assert_eq!(protocols, vec![Protocol::Aave, Protocol::Compound]);
}

#[tokio::test]
async fn test_batch_tokens_flattened_and_sorted() {
    let aave = MockProtocolAdapter::new(Protocol::Aave)
        .with_apy("USDC", 1, dec!(4.5), dec!(1000))
        .with_apy("USDT", 1, dec!(5.5), dec!(1000));
    let compound = MockProtocolAdapter::new(Protocol::Compound)
        .with_apy("USDC", 1, dec!(5.0), dec!(1000))
        .with_apy("USDT", 1, dec!(3.0), dec!(1000));

    let tokens = vec!["USDC".to_string(), "USDT".to_string()];
    let all = aggregator(vec![aave, compound])
        .fetch_opportunities_for_tokens(&tokens, 1)
        .await
        .unwrap();

    let apys: Vec<Decimal> = all.iter().map(|o| o.supply_apy).collect();
    assert_eq!(apys, vec![dec!(5.5), dec!(5.0), dec!(4.5), dec!(3.0)]);
}

#[tokio::test]
async fn test_invalid_input_rejected() {
    let agg = aggregator(three_markets());
    assert!(matches!(
        agg.fetch_all_opportunities("  ", 1, None).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        agg.fetch_all_opportunities("USDC", 0, None).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(agg.fetch_opportunities_for_tokens(&[], 1).await.is_err());
}

// ============================================================================
// Positions
// ============================================================================

#[tokio::test]
async fn test_positions_weighted_by_value() {
    let aave = MockProtocolAdapter::new(Protocol::Aave)
        .with_position(WALLET, position(Protocol::Aave, "USDC", dec!(1000), dec!(4)));
    let compound = MockProtocolAdapter::new(Protocol::Compound)
        .with_position(WALLET, position(Protocol::Compound, "USDT", dec!(1000), dec!(10)));
    let morpho = MockProtocolAdapter::new(Protocol::Morpho);

    let summary = aggregator(vec![aave, compound, morpho])
        .get_all_positions(WALLET, 1, None)
        .await
        .unwrap();

    assert_eq!(summary.positions.len(), 2);
    assert_eq!(summary.total_value_usd, dec!(2000));
    assert_eq!(summary.weighted_avg_apy, dec!(7.00));
    assert_eq!(summary.protocol_count, 2);
}

#[tokio::test]
async fn test_position_lookup_failures_are_skipped() {
    let aave = MockProtocolAdapter::new(Protocol::Aave)
        .with_position(WALLET, position(Protocol::Aave, "USDC", dec!(500), dec!(4)));
    let compound = MockProtocolAdapter::new(Protocol::Compound)
        .with_failure(AdapterError::Network("timeout".into()));

    let tokens = vec!["USDC".to_string()];
    let summary = aggregator(vec![aave, compound])
        .get_all_positions(&WALLET.to_uppercase(), 1, Some(&tokens))
        .await
        .unwrap();

    assert_eq!(summary.positions.len(), 1);
    assert_eq!(summary.total_value_usd, dec!(500));
}

#[tokio::test]
async fn test_duplicate_tokens_counted_once() {
    let aave = MockProtocolAdapter::new(Protocol::Aave)
        .with_position(WALLET, position(Protocol::Aave, "USDC", dec!(1000), dec!(4)));
    let morpho = MockProtocolAdapter::new(Protocol::Morpho)
        .with_position(WALLET, position(Protocol::Morpho, "USDC", dec!(3000), dec!(8)));
    let handle = aave.clone();

    let tokens = vec!["USDC".to_string(), "usdc".to_string(), "USDC".to_string()];
    let summary = aggregator(vec![aave, morpho])
        .get_all_positions(WALLET, 1, Some(&tokens))
        .await
        .unwrap();

    assert_eq!(summary.positions.len(), 2);
    assert_eq!(summary.total_value_usd, dec!(4000));
    assert_eq!(summary.weighted_avg_apy, dec!(7.00));
    assert_eq!(handle.call_count(), 1);
}

#[tokio::test]
async fn test_empty_wallet() {
    let summary = aggregator(three_markets())
        .get_all_positions(WALLET, 1, None)
        .await
        .unwrap();

    assert!(summary.positions.is_empty());
    assert_eq!(summary.total_value_usd, Decimal::ZERO);
    assert_eq!(summary.weighted_avg_apy, Decimal::ZERO);
    assert!(summary.best_position.is_none());
}

// ============================================================================
// Metrics and comparisons
// ============================================================================

#[tokio::test]
async fn test_metrics_roll_up() {
    let aave = MockProtocolAdapter::new(Protocol::Aave)
        .with_metrics(metrics(Protocol::Aave, dec!(3000), dec!(4), true));
    let compound = MockProtocolAdapter::new(Protocol::Compound)
        .with_metrics(metrics(Protocol::Compound, dec!(1000), dec!(8), false));
    let morpho = MockProtocolAdapter::new(Protocol::Morpho);

    let rollup = aggregator(vec![aave, compound, morpho])
        .get_aggregated_metrics(1)
        .await
        .unwrap();

    assert_eq!(rollup.total_tvl_usd, dec!(4000));
    assert_eq!(rollup.total_available_liquidity_usd, dec!(1000));
    // (3000 * 4 + 1000 * 8) / 4000
    assert_eq!(rollup.weighted_avg_supply_apy, dec!(5));
    assert_eq!(rollup.best_protocol, Some(Protocol::Compound));
    assert_eq!(rollup.healthy_protocol_count, 1);
    assert_eq!(rollup.total_protocol_count, 3);
    assert!(rollup.errors.contains_key(&Protocol::Morpho));
}

#[tokio::test]
async fn test_compare_protocols() {
    let comparison = aggregator(three_markets())
        .compare_protocols("USDC", 1, Protocol::Aave, Protocol::Morpho)
        .await
        .unwrap();

    assert_eq!(comparison.winner, Protocol::Morpho);
    assert_eq!(comparison.apy_difference, dec!(2.3));
}

#[tokio::test]
async fn test_compare_with_one_side_missing() {
    let adapters = vec![
        MockProtocolAdapter::new(Protocol::Aave),
        MockProtocolAdapter::new(Protocol::Compound).with_apy("USDC", 1, dec!(3.1), dec!(1000)),
    ];

    let comparison = aggregator(adapters)
        .compare_protocols("USDC", 1, Protocol::Aave, Protocol::Compound)
        .await
        .unwrap();

    assert_eq!(comparison.winner, Protocol::Compound);
    assert_eq!(comparison.apy_difference, dec!(3.1));
    assert!(comparison.protocol1.is_none());
}

#[tokio::test]
async fn test_compare_queries_only_the_pair() {
    let adapters = three_markets();
    let compound_handle = adapters[1].clone();

    let _ = aggregator(adapters)
        .compare_protocols("USDC", 1, Protocol::Aave, Protocol::Morpho)
        .await
        .unwrap();

    assert_eq!(compound_handle.call_count(), 0);
}
