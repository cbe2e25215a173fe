//! stabpool liquidation engine simulation.
//!
//! Wires the in-memory reference collaborators (vault ledger, updatable
//! oracle, constant-product market) into the engine and replays the
//! reference scenario: three vaults under one manager, a price shock that
//! turns the over-leveraged ones liquidable, a candidate scan, and
//! competing liquidation calls racing for the same vault.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use futures::future::join_all;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stabpool_core::{EngineParams, EngineSettings, LiquidationOrchestrator};
use stabpool_ledger::{
    AssetBank, InMemoryLedger, OracleRegistry, PositionLedger, StaticOracle, VaultManagerConfig,
};
use stabpool_market::{AmmRouter, MarketRouter};

/// 1000.00000000 and 900.00000000 in 8-decimal oracle fixed point.
const PRICE_1000: u64 = 100_000_000_000;
const PRICE_900: u64 = 90_000_000_000;

const OWNER: Address = Address::repeat_byte(0x01);
const TREASURY: Address = Address::repeat_byte(0x02);
const REWARD_POOL: Address = Address::repeat_byte(0x03);
const FLASH_POOL: Address = Address::repeat_byte(0x04);
const ENGINE: Address = Address::repeat_byte(0x05);
const ROUTER_ACCOUNT: Address = Address::repeat_byte(0x06);
const MARKET_MAKER: Address = Address::repeat_byte(0x07);
const MANAGER: Address = Address::repeat_byte(0x11);

const WETH: Address = Address::repeat_byte(0xE1);
const USDC: Address = Address::repeat_byte(0xC1);
const MUSD: Address = Address::repeat_byte(0xD1);

fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stabpool_core=debug")),
        )
        .init();

    // Engine parameters: STABPOOL_CONFIG points at a TOML file, otherwise
    // the reference defaults apply (2% caller, 20% treasury, 0.3% flash
    // fee, 2% slippage).
    let params = match std::env::var("STABPOOL_CONFIG") {
        Ok(path) => EngineParams::from_file(&path)?,
        Err(_) => EngineParams::default(),
    };
    info!(
        caller_fee_bps = params.caller_fee_bps,
        treasury_fee_bps = params.treasury_fee_bps,
        flash_fee_bps = params.flash_fee_bps,
        slippage_bps = params.slippage_bps,
        "engine parameters loaded"
    );

    let (engine, world) = build_world(params)?;

    info!("scanning at the opening price");
    let scanner = engine.scanner();
    let quiet = scanner.check_liquidable_vaults(MANAGER).await?;
    info!(candidates = quiet.len(), "no vault is under water yet");

    info!(price = PRICE_900, "oracle price shock");
    world.oracle.update_answer(U256::from(PRICE_900));

    let candidates = scanner.check_liquidable_vaults(MANAGER).await?;
    info!(?candidates, "liquidation candidates");

    // Two incentivized callers race for every candidate; the engine lets
    // exactly one of them win each vault.
    let caller_a = Address::repeat_byte(0x08);
    let caller_b = Address::repeat_byte(0x09);
    let attempts = candidates.iter().flat_map(|&vault_id| {
        [(vault_id, caller_a), (vault_id, caller_b)]
    });
    let outcomes = join_all(attempts.map(|(vault_id, caller)| {
        let engine = engine.clone();
        async move { (vault_id, caller, engine.liquidate(MANAGER, vault_id, caller).await) }
    }))
    .await;

    for (vault_id, caller, outcome) in outcomes {
        match outcome {
            Ok(result) => info!(
                vault_id,
                caller = %caller,
                seized_collateral = %result.seized_collateral,
                swap_proceeds = %result.swap_proceeds,
                caller_fee = %result.caller_fee,
                "liquidation won"
            ),
            Err(err) => warn!(vault_id, caller = %caller, error = %err, "liquidation lost"),
        }
    }

    info!(
        caller_a_weth = %world.bank.balance_of(WETH, caller_a),
        caller_b_weth = %world.bank.balance_of(WETH, caller_b),
        treasury_weth = %world.bank.balance_of(WETH, TREASURY),
        reward_pool_weth = %world.bank.balance_of(WETH, REWARD_POOL),
        flash_pool_musd = %world.bank.balance_of(MUSD, FLASH_POOL),
        "final balances"
    );

    Ok(())
}

struct World {
    bank: Arc<AssetBank>,
    oracle: Arc<StaticOracle>,
}

fn build_world(params: EngineParams) -> Result<(Arc<LiquidationOrchestrator>, World)> {
    let bank = Arc::new(AssetBank::new());
    let ledger = Arc::new(InMemoryLedger::new(bank.clone()));
    ledger.register_manager(
        MANAGER,
        VaultManagerConfig {
            safety_ratio_bps: 12_000,
            debt_token: MUSD,
            collateral_token: WETH,
        },
    );

    let oracle = Arc::new(StaticOracle::new(U256::from(PRICE_1000)));
    let oracles = Arc::new(OracleRegistry::new());
    oracles.register(MANAGER, oracle.clone());

    // Market: a flat 10M/10M USDC-MUSD pool and a WETH-USDC pool priced
    // at 900 USDC per WETH, deep enough to absorb both liquidations.
    let router = Arc::new(AmmRouter::new(bank.clone(), ROUTER_ACCOUNT));
    bank.mint(USDC, MARKET_MAKER, ether(100_000_000));
    bank.mint(MUSD, MARKET_MAKER, ether(10_000_000));
    bank.mint(WETH, MARKET_MAKER, ether(100_000));
    router
        .add_liquidity(USDC, MUSD, ether(10_000_000), ether(10_000_000), MARKET_MAKER)
        .map_err(|e| anyhow::anyhow!("seeding USDC/MUSD pool: {e}"))?;
    router
        .add_liquidity(WETH, USDC, ether(100_000), ether(90_000_000), MARKET_MAKER)
        .map_err(|e| anyhow::anyhow!("seeding WETH/USDC pool: {e}"))?;

    // Debt-asset float for the short-term loan.
    bank.mint(MUSD, FLASH_POOL, ether(1_000_000));

    let settings = Arc::new(EngineSettings::new(
        OWNER,
        TREASURY,
        REWARD_POOL,
        FLASH_POOL,
        params,
    )?);
    settings.set_swap_path(OWNER, MANAGER, &[WETH, USDC, MUSD])?;

    // Three vaults: two over-leveraged at 80k debt, one safe at half.
    for (user, debt) in [
        (Address::repeat_byte(0x21), ether(80_000)),
        (Address::repeat_byte(0x22), ether(80_000)),
        (Address::repeat_byte(0x23), ether(40_000)),
    ] {
        bank.mint(WETH, user, ether(100));
        let id = ledger
            .create_vault(MANAGER, user)
            .map_err(|e| anyhow::anyhow!("creating vault: {e}"))?;
        ledger
            .deposit_collateral(MANAGER, id, ether(100))
            .map_err(|e| anyhow::anyhow!("depositing collateral: {e}"))?;
        ledger
            .borrow(MANAGER, id, debt)
            .map_err(|e| anyhow::anyhow!("borrowing: {e}"))?;
    }

    let engine = Arc::new(LiquidationOrchestrator::new(
        settings,
        ledger as Arc<dyn PositionLedger>,
        oracles,
        router as Arc<dyn MarketRouter>,
        bank.clone(),
        ENGINE,
    ));

    Ok((engine, World { bank, oracle }))
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ┌─┐┌┬┐┌─┐┌┐ ┌─┐┌─┐┌─┐┬
    └─┐ │ ├─┤├┴┐├─┘│ ││ ││
    └─┘ ┴ ┴ ┴└─┘┴  └─┘└─┘┴─┘
    Liquidation Engine v0.1.0
    "#
    );
}
