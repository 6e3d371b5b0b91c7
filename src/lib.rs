//! Yield Engine Library
//!
//! Aggregates lending yields across protocols and chains and recommends
//! whether capital should move once gas and risk are accounted for.
//!
//! # Modules
//!
//! - `domain`: Core yield model (Opportunity, Position, RiskProfile, math)
//! - `ports`: Trait abstractions (ProtocolAdapter, GasOracle)
//! - `strategy`: Ranking strategies and confidence scoring
//! - `adapters`: External implementations (snapshot markets, static oracle, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Aggregator, optimizer and multi-chain optimizer

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
