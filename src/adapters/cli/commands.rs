//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the yield engine.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::oracle::StaticGasOracle;
use crate::adapters::snapshot::MarketSnapshot;
use crate::application::{MultiChainOptimizer, YieldAggregator, YieldOptimizer};
use crate::config::Config;
use crate::domain::math::{annual_gain, format_usd};
use crate::domain::{
    chain_name, round2, ChainId, Opportunity, OpportunityFilter, Position, Protocol,
    RebalanceConfig, RebalanceRecommendation, RiskLevel, RiskProfile, SortKey, StrategyKind,
};
use crate::ports::GasOracle;

/// Yield Engine - lending yield aggregation and rebalance recommendations
#[derive(Parser, Debug)]
#[command(
    name = "yield-engine",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Lending yield aggregation and gas-aware rebalance recommendations",
    long_about = "Yield Engine queries lending protocols concurrently, ranks their supply \
                  yields and recommends whether a position should move once gas and \
                  risk are accounted for."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/engine.toml", global = true)]
    pub config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every protocol's offer for a token, best APY first
    Opportunities(OpportunitiesCmd),

    /// Show the single best offer for a token
    Best(MarketArgs),

    /// Rank offers by APY, TVL or liquidity
    Leaderboard(LeaderboardCmd),

    /// Show a wallet's positions
    Positions(PositionsCmd),

    /// Protocol-wide TVL and APY for a chain
    Metrics(MetricsCmd),

    /// Compare two protocols on one token
    Compare(CompareCmd),

    /// Recommend what a wallet should do with its position
    Optimize(OptimizeCmd),

    /// Recommend whether an explicit position should move
    Rebalance(RebalanceCmd),

    /// Check whether a move clears the rebalance thresholds
    WorthIt(WorthItCmd),

    /// Days until a move pays for its gas
    BreakEven(BreakEvenCmd),

    /// Find the best chain and protocol split for new capital
    MultiChain(MultiChainCmd),
}

/// Token and chain selection shared by market commands
#[derive(Args, Debug, Clone)]
pub struct MarketArgs {
    /// Token symbol (e.g., USDC)
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// EVM chain id
    #[arg(long, value_name = "ID", default_value_t = 1)]
    pub chain: ChainId,
}

/// List opportunities
#[derive(Parser, Debug)]
pub struct OpportunitiesCmd {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Minimum supply APY (percent)
    #[arg(long, value_name = "APY")]
    pub min_apy: Option<Decimal>,

    /// Maximum supply APY (percent)
    #[arg(long, value_name = "APY")]
    pub max_apy: Option<Decimal>,

    /// Minimum TVL (USD)
    #[arg(long, value_name = "USD")]
    pub min_tvl: Option<Decimal>,

    /// Only query these protocols
    #[arg(long, value_name = "PROTOCOL", value_delimiter = ',')]
    pub protocols: Vec<Protocol>,

    /// Never query these protocols
    #[arg(long, value_name = "PROTOCOL", value_delimiter = ',')]
    pub exclude: Vec<Protocol>,

    /// Keep at most N results
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SortArg {
    Apy,
    Tvl,
    Liquidity,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Apy => SortKey::Apy,
            SortArg::Tvl => SortKey::Tvl,
            SortArg::Liquidity => SortKey::Liquidity,
        }
    }
}

/// Ranked leaderboard
#[derive(Parser, Debug)]
pub struct LeaderboardCmd {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Sort key
    #[arg(long, value_enum, default_value = "apy")]
    pub sort: SortArg,

    /// Keep at most N results
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Wallet positions
#[derive(Parser, Debug)]
pub struct PositionsCmd {
    /// Wallet address
    #[arg(value_name = "WALLET")]
    pub wallet: String,

    /// EVM chain id
    #[arg(long, value_name = "ID", default_value_t = 1)]
    pub chain: ChainId,

    /// Tokens to scan (defaults to the configured set)
    #[arg(long, value_name = "TOKEN", value_delimiter = ',')]
    pub tokens: Vec<String>,
}

/// Chain metrics
#[derive(Parser, Debug)]
pub struct MetricsCmd {
    /// EVM chain id
    #[arg(long, value_name = "ID", default_value_t = 1)]
    pub chain: ChainId,
}

/// Protocol comparison
#[derive(Parser, Debug)]
pub struct CompareCmd {
    #[command(flatten)]
    pub market: MarketArgs,

    /// First protocol
    #[arg(value_name = "A")]
    pub a: Protocol,

    /// Second protocol
    #[arg(value_name = "B")]
    pub b: Protocol,
}

/// Optimize a wallet position
#[derive(Parser, Debug)]
pub struct OptimizeCmd {
    /// Wallet address
    #[arg(value_name = "WALLET")]
    pub wallet: String,

    #[command(flatten)]
    pub market: MarketArgs,

    /// Risk level (defaults to the configured profile)
    #[arg(long, value_name = "LEVEL")]
    pub risk: Option<RiskLevel>,

    /// Ranking strategy (highest-yield, risk-adjusted, gas-aware)
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<StrategyKind>,
}

/// Rebalance check for an explicit position
#[derive(Parser, Debug)]
pub struct RebalanceCmd {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Protocol currently holding the position
    #[arg(long, value_name = "PROTOCOL")]
    pub protocol: Protocol,

    /// APY the position currently earns (percent)
    #[arg(long, value_name = "APY")]
    pub apy: Decimal,

    /// Position value (USD)
    #[arg(long, value_name = "USD")]
    pub value: Decimal,

    /// Gas price in gwei
    #[arg(long, value_name = "GWEI")]
    pub gas_price: Option<Decimal>,

    /// Native asset price (USD)
    #[arg(long, value_name = "USD")]
    pub native_price: Option<Decimal>,

    /// Override the minimum APY improvement (percentage points)
    #[arg(long, value_name = "POINTS")]
    pub min_delta: Option<Decimal>,

    /// Override the gas ceiling (USD)
    #[arg(long, value_name = "USD")]
    pub max_gas: Option<Decimal>,
}

/// Worth-it check
#[derive(Parser, Debug)]
pub struct WorthItCmd {
    /// Current APY (percent)
    #[arg(long, value_name = "APY")]
    pub current_apy: Decimal,

    /// Target APY (percent)
    #[arg(long, value_name = "APY")]
    pub new_apy: Decimal,

    /// Position value (USD)
    #[arg(long, value_name = "USD")]
    pub value: Decimal,

    /// Gas cost of the move (USD)
    #[arg(long, value_name = "USD")]
    pub gas: Decimal,
}

/// Break-even estimate
#[derive(Parser, Debug)]
pub struct BreakEvenCmd {
    /// APY improvement (percentage points)
    #[arg(long, value_name = "POINTS")]
    pub delta: Decimal,

    /// Position value (USD)
    #[arg(long, value_name = "USD")]
    pub value: Decimal,

    /// Gas cost of the move (USD)
    #[arg(long, value_name = "USD")]
    pub gas: Decimal,
}

/// Multi-chain allocation
#[derive(Parser, Debug)]
pub struct MultiChainCmd {
    /// Token symbol (e.g., USDC)
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Risk level
    #[arg(long, value_name = "LEVEL", default_value = "moderate")]
    pub risk: RiskLevel,

    /// Position size (USD, defaults to the configured size)
    #[arg(long, value_name = "USD")]
    pub size: Option<Decimal>,

    /// Hold period in days (defaults to the configured period)
    #[arg(long, value_name = "DAYS")]
    pub hold_days: Option<u32>,
}

/// Services built from the configuration
struct Engine {
    aggregator: Arc<YieldAggregator>,
    optimizer: YieldOptimizer,
    multi_chain: MultiChainOptimizer,
}

impl Engine {
    /// Wire the snapshot adapters and the static oracle
    fn build(config: &Config) -> Result<Self> {
        let path = config.snapshot.get_path();
        let snapshot = MarketSnapshot::load(&path)
            .with_context(|| format!("Failed to load market snapshot from {}", path.display()))?;
        tracing::info!(
            "Loaded snapshot {}: {} markets, {} positions",
            path.display(),
            snapshot.markets.len(),
            snapshot.positions.len()
        );

        let mut aggregator = YieldAggregator::new(config.aggregator_config());
        for adapter in snapshot.adapters() {
            aggregator.register(adapter);
        }
        Ok(Self::assemble(config, aggregator))
    }

    /// Engine with no adapters, for pure calculations
    fn offline(config: &Config) -> Self {
        Self::assemble(config, YieldAggregator::new(config.aggregator_config()))
    }

    fn assemble(config: &Config, aggregator: YieldAggregator) -> Self {
        let aggregator = Arc::new(aggregator);
        let oracle: Arc<dyn GasOracle> = Arc::new(StaticGasOracle::new(config.oracle.clone()));

        let optimizer = YieldOptimizer::new(Arc::clone(&aggregator), config.optimizer.clone())
            .with_rebalance_config(config.rebalance.clone())
            .with_default_risk(config.risk_profile())
            .with_gas_oracle(Arc::clone(&oracle));
        let multi_chain =
            MultiChainOptimizer::new(Arc::clone(&aggregator), oracle).with_config(config.multi_chain.clone());

        Self {
            aggregator,
            optimizer,
            multi_chain,
        }
    }
}

/// Execute the CLI command
pub async fn execute(app: CliApp, config: Config) -> Result<()> {
    let json = app.json;
    let engine = match app.command {
        Command::WorthIt(_) | Command::BreakEven(_) => Engine::offline(&config),
        _ => Engine::build(&config)?,
    };

    match app.command {
        Command::Opportunities(cmd) => opportunities_command(cmd, &engine, json).await,
        Command::Best(cmd) => best_command(cmd, &engine, json).await,
        Command::Leaderboard(cmd) => leaderboard_command(cmd, &engine, json).await,
        Command::Positions(cmd) => positions_command(cmd, &engine, json).await,
        Command::Metrics(cmd) => metrics_command(cmd, &engine, json).await,
        Command::Compare(cmd) => compare_command(cmd, &engine, json).await,
        Command::Optimize(cmd) => optimize_command(cmd, &engine, json).await,
        Command::Rebalance(cmd) => rebalance_command(cmd, &engine, &config, json).await,
        Command::WorthIt(cmd) => worth_it_command(cmd, &engine, json),
        Command::BreakEven(cmd) => break_even_command(cmd, &engine, json),
        Command::MultiChain(cmd) => multi_chain_command(cmd, &engine, &config, json).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode JSON")?);
    Ok(())
}

fn print_opportunity(rank: usize, opp: &Opportunity) {
    let borrow = opp
        .borrow_apy
        .map(|b| format!("{}%", b.round_dp(2)))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>2}. {:<9} supply {:>6}%  borrow {:>7}  TVL {:>18}  liquidity {:>18}",
        rank,
        opp.protocol,
        opp.supply_apy.round_dp(2),
        borrow,
        format_usd(opp.tvl),
        format_usd(opp.liquidity)
    );
}

/// Handle opportunities command
async fn opportunities_command(cmd: OpportunitiesCmd, engine: &Engine, json: bool) -> Result<()> {
    let mut filter = OpportunityFilter::new();
    filter.min_apy = cmd.min_apy;
    filter.max_apy = cmd.max_apy;
    filter.min_tvl = cmd.min_tvl;
    filter.limit = cmd.limit;
    if !cmd.protocols.is_empty() {
        filter = filter.with_protocols(cmd.protocols);
    }
    if !cmd.exclude.is_empty() {
        filter = filter.excluding(cmd.exclude);
    }

    let result = engine
        .aggregator
        .fetch_all_opportunities(&cmd.market.token, cmd.market.chain, Some(&filter))
        .await?;

    if json {
        return print_json(&result);
    }

    println!("{} on {}", result.token, chain_name(result.chain_id));
    for (i, opp) in result.opportunities.iter().enumerate() {
        print_opportunity(i + 1, opp);
    }
    if result.opportunities.is_empty() {
        println!("  No opportunities");
    }
    println!("  APY spread: {}%", result.apy_spread.round_dp(2));
    if let Some(failures) = result.failure_summary() {
        println!("  Unavailable: {}", failures);
    }
    Ok(())
}

/// Handle best command
async fn best_command(cmd: MarketArgs, engine: &Engine, json: bool) -> Result<()> {
    let best = engine.aggregator.get_best_opportunity(&cmd.token, cmd.chain).await?;

    if json {
        return print_json(&best);
    }
    match best {
        Some(opp) => print_opportunity(1, &opp),
        None => println!("No {} opportunities on {}", cmd.token, chain_name(cmd.chain)),
    }
    Ok(())
}

/// Handle leaderboard command
async fn leaderboard_command(cmd: LeaderboardCmd, engine: &Engine, json: bool) -> Result<()> {
    let mut filter = OpportunityFilter::new().sorted_by(cmd.sort.into());
    filter.limit = cmd.limit;

    let ranked = engine
        .aggregator
        .leaderboard(&cmd.market.token, cmd.market.chain, &filter)
        .await?;

    if json {
        return print_json(&ranked);
    }
    println!("{} leaderboard on {} (by {:?})", cmd.market.token, chain_name(cmd.market.chain), cmd.sort);
    for (i, opp) in ranked.iter().enumerate() {
        print_opportunity(i + 1, opp);
    }
    Ok(())
}

/// Handle positions command
async fn positions_command(cmd: PositionsCmd, engine: &Engine, json: bool) -> Result<()> {
    let tokens = (!cmd.tokens.is_empty()).then_some(cmd.tokens.as_slice());
    let summary = engine.aggregator.get_all_positions(&cmd.wallet, cmd.chain, tokens).await?;

    if json {
        return print_json(&summary);
    }
    println!("Wallet {} on {}", cmd.wallet, chain_name(cmd.chain));
    for position in &summary.positions {
        println!(
            "  {:<9} {:<6} {:>18}  at {}%",
            position.protocol,
            position.token,
            format_usd(position.value_usd),
            position.apy.round_dp(2)
        );
    }
    println!("  Total value:    {}", format_usd(summary.total_value_usd));
    println!("  Weighted APY:   {}%", summary.weighted_avg_apy);
    println!("  Yield earned:   {}", format_usd(summary.total_yield_earned));
    println!("  Protocols:      {}", summary.protocol_count);
    Ok(())
}

/// Handle metrics command
async fn metrics_command(cmd: MetricsCmd, engine: &Engine, json: bool) -> Result<()> {
    let metrics = engine.aggregator.get_aggregated_metrics(cmd.chain).await?;

    if json {
        return print_json(&metrics);
    }
    println!("{} metrics", chain_name(metrics.chain_id));
    println!("  Total TVL:         {}", format_usd(metrics.total_tvl_usd));
    println!("  Liquidity:         {}", format_usd(metrics.total_available_liquidity_usd));
    println!("  Weighted APY:      {}%", metrics.weighted_avg_supply_apy);
    match metrics.best_protocol {
        Some(p) => println!("  Best:              {} at {}%", p, metrics.best_supply_apy),
        None => println!("  Best:              -"),
    }
    println!(
        "  Healthy:           {}/{}",
        metrics.healthy_protocol_count, metrics.total_protocol_count
    );
    for (protocol, error) in &metrics.errors {
        println!("  {} unavailable: {}", protocol, error);
    }
    Ok(())
}

/// Handle compare command
async fn compare_command(cmd: CompareCmd, engine: &Engine, json: bool) -> Result<()> {
    let comparison = engine
        .aggregator
        .compare_protocols(&cmd.market.token, cmd.market.chain, cmd.a, cmd.b)
        .await?;

    if json {
        return print_json(&comparison);
    }
    let show = |protocol: Protocol, opp: &Option<Opportunity>| match opp {
        Some(o) => println!("  {:<9} {}%", protocol, o.supply_apy.round_dp(2)),
        None => println!("  {:<9} unavailable", protocol),
    };
    show(cmd.a, &comparison.protocol1);
    show(cmd.b, &comparison.protocol2);
    println!(
        "Winner: {} by {} points",
        comparison.winner,
        comparison.apy_difference.round_dp(2)
    );
    Ok(())
}

fn print_recommendation(rec: &RebalanceRecommendation) {
    println!("{} ({}, confidence {}/100)", rec.action, rec.strategy, rec.confidence);
    println!("  {}", rec.reason);
    if let (Some(current), Some(apy)) = (rec.current_protocol, rec.current_apy) {
        println!("  Current:      {} at {}%", current, apy.round_dp(2));
    }
    if let (Some(target), Some(apy)) = (rec.recommended_protocol, rec.recommended_apy) {
        println!("  Recommended:  {} at {}%", target, apy.round_dp(2));
    }
    println!("  APY delta:    {} points", rec.apy_delta.round_dp(2));
    println!("  Monthly gain: {}", format_usd(rec.estimated_monthly_gain));
    println!("  Annual gain:  {}", format_usd(rec.estimated_annual_gain));
    if let Some(gas) = rec.estimated_gas_cost {
        println!("  Gas cost:     {}", format_usd(gas));
    }
    if let Some(net) = rec.net_gain_after_gas {
        println!("  Net of gas:   {}", format_usd(net));
    }
    if let Some(be) = rec.break_even_days {
        println!("  Break-even:   {}", be);
    }
    for warning in &rec.warnings {
        println!("  ! {}", warning);
    }
}

/// Handle optimize command
async fn optimize_command(cmd: OptimizeCmd, engine: &Engine, json: bool) -> Result<()> {
    let risk = cmd.risk.map(RiskProfile::new);
    let recommendation = engine
        .optimizer
        .optimize_position(&cmd.wallet, &cmd.market.token, cmd.market.chain, risk, cmd.strategy)
        .await?;

    if json {
        return print_json(&recommendation);
    }
    print_recommendation(&recommendation);
    Ok(())
}

/// Handle rebalance command
async fn rebalance_command(cmd: RebalanceCmd, engine: &Engine, config: &Config, json: bool) -> Result<()> {
    let position = Position::new(
        cmd.protocol,
        cmd.market.token.clone(),
        "",
        cmd.market.chain,
        "0",
        cmd.value,
        cmd.value,
        cmd.apy,
    )
    .context("Invalid position")?;

    let mut thresholds: RebalanceConfig = config.rebalance.clone();
    if let Some(delta) = cmd.min_delta {
        thresholds = thresholds.with_min_apy_delta(delta);
    }
    if let Some(max) = cmd.max_gas {
        thresholds = thresholds.with_max_gas_cost(max);
    }

    let recommendation = engine
        .optimizer
        .get_rebalance_recommendation(
            &position,
            &cmd.market.token,
            cmd.market.chain,
            Some(thresholds),
            cmd.gas_price,
            cmd.native_price,
        )
        .await?;

    if json {
        return print_json(&recommendation);
    }
    print_recommendation(&recommendation);

    if let Some(comparison) = engine
        .optimizer
        .compare_position(&position, &cmd.market.token, cmd.market.chain)
        .await?
    {
        if let Some(pct) = comparison.apy_improvement_percent {
            println!("  Best market pays {}% more than the current position", pct);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct WorthItOutput {
    worth_it: bool,
    apy_delta: Decimal,
    annual_gain_usd: Decimal,
}

/// Handle worth-it command
fn worth_it_command(cmd: WorthItCmd, engine: &Engine, json: bool) -> Result<()> {
    let worth_it = engine
        .optimizer
        .is_rebalance_worth_it(cmd.current_apy, cmd.new_apy, cmd.value, cmd.gas, None)?;
    let apy_delta = cmd.new_apy - cmd.current_apy;
    let output = WorthItOutput {
        worth_it,
        apy_delta,
        annual_gain_usd: round2(annual_gain(apy_delta, cmd.value)),
    };

    if json {
        return print_json(&output);
    }
    println!("{}", if worth_it { "Worth it" } else { "Not worth it" });
    println!("  APY delta:   {} points", output.apy_delta);
    println!("  Annual gain: {}", format_usd(output.annual_gain_usd));
    println!("  Gas cost:    {}", format_usd(cmd.gas));
    Ok(())
}

/// Handle break-even command
fn break_even_command(cmd: BreakEvenCmd, engine: &Engine, json: bool) -> Result<()> {
    let break_even = engine
        .optimizer
        .estimate_break_even_days(cmd.delta, cmd.value, cmd.gas)?;

    if json {
        return print_json(&serde_json::json!({ "break_even_days": break_even.days() }));
    }
    println!("Break-even: {}", break_even);
    Ok(())
}

/// Handle multi-chain command
async fn multi_chain_command(cmd: MultiChainCmd, engine: &Engine, config: &Config, json: bool) -> Result<()> {
    let size = cmd.size.unwrap_or(config.multi_chain.default_position_size_usd);
    let hold_days = cmd.hold_days.unwrap_or(config.multi_chain.default_hold_period_days);

    let result = engine
        .multi_chain
        .optimize_across_chains(&cmd.token, cmd.risk, size, hold_days)
        .await?;

    if json {
        return print_json(&result);
    }
    println!(
        "Best chain for {} {} ({}, {} days): {}",
        format_usd(size),
        result.token,
        result.risk_level,
        hold_days,
        result.best_chain_name
    );
    for allocation in &result.allocation {
        println!(
            "  {:>3}% {:<9} at {}%  {}",
            allocation.percentage,
            allocation.protocol,
            allocation.expected_apy.round_dp(2),
            allocation.rationale
        );
    }
    println!("  Blended APY: {}%", result.expected_blended_apy);
    println!("  Net APY:     {}%", result.net_apy);
    println!(
        "  Target:      {}-{}%",
        result.target_apy_range.min, result.target_apy_range.max
    );
    println!("  Gas:         {}", format_usd(result.gas_estimate.total_usd));
    println!("  Confidence:  {}/100", result.confidence);
    for chain in &result.chain_results {
        let marker = if chain.is_recommended { "*" } else { " " };
        println!(
            "  {} {:<10} blended {}%  net {}%  gas {}",
            marker,
            chain.chain_name,
            chain.blended_apy,
            chain.net_apy,
            format_usd(chain.total_gas_cost_usd)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opportunities_with_filters() {
        let app = CliApp::try_parse_from([
            "yield-engine",
            "opportunities",
            "USDC",
            "--chain",
            "8453",
            "--min-apy",
            "3.5",
            "--protocols",
            "aave,morpho",
            "--json",
        ])
        .unwrap();

        assert!(app.json);
        match app.command {
            Command::Opportunities(cmd) => {
                assert_eq!(cmd.market.chain, 8453);
                assert_eq!(cmd.min_apy, Some(Decimal::new(35, 1)));
                assert_eq!(cmd.protocols, vec![Protocol::Aave, Protocol::Morpho]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_optimize_strategy() {
        let app = CliApp::try_parse_from([
            "yield-engine",
            "optimize",
            "0xabc",
            "USDC",
            "--strategy",
            "gas_aware",
            "--risk",
            "conservative",
        ])
        .unwrap();

        match app.command {
            Command::Optimize(cmd) => {
                assert_eq!(cmd.strategy, Some(StrategyKind::GasAware));
                assert_eq!(cmd.risk, Some(RiskLevel::Conservative));
                assert_eq!(cmd.market.chain, 1);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_protocol() {
        let result = CliApp::try_parse_from(["yield-engine", "compare", "USDC", "aave", "uniswap"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let app = CliApp::try_parse_from([
            "yield-engine",
            "break-even",
            "--delta",
            "2",
            "--value",
            "10000",
            "--gas",
            "20",
            "--debug",
            "--config",
            "other.toml",
        ])
        .unwrap();
        assert!(app.debug);
        assert_eq!(app.config, PathBuf::from("other.toml"));
    }
}
