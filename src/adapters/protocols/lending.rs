//! Lending Adapter - Aave-style Supply and Borrow Markets
//!
//! Supplying an asset mints its interest-bearing receipt token 1:1.
//! Supplied collateral can back variable-rate loans up to the market's
//! loan-to-value ratio; collateral locked by outstanding debt is not
//! withdrawable.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::deposit_cap::DepositCapPolicy;
use crate::domain::error::{AllocationError, AllocationResult};
use crate::domain::types::{
    Action, Amount, Asset, BPS_DENOMINATOR, Instruction, Pool, apply_bps, mul_div,
};
use crate::ports::chain_view::ChainView;
use crate::ports::protocol_adapter::{Borrowing, ProtocolAdapter};

use super::erc20;

sol! {
    interface IPool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
        function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf) external;
        function repay(address asset, uint256 amount, uint256 interestRateMode, address onBehalfOf) external returns (uint256);
    }
}

/// Variable interest rate mode.
const VARIABLE_RATE: u64 = 2;

/// Reserves of one lending market.
#[derive(Debug, Clone, Default)]
pub struct LendingMarket {
    /// asset → receipt (aToken)
    reserves: BTreeMap<Asset, Asset>,
    borrowable: Vec<Asset>,
}

impl LendingMarket {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reserve(mut self, asset: Asset, receipt: Asset) -> Self {
        self.reserves.insert(asset, receipt);
        self
    }

    #[must_use]
    pub fn with_borrowable(mut self, asset: Asset) -> Self {
        if !self.borrowable.contains(&asset) {
            self.borrowable.push(asset);
        }
        self
    }
}

pub struct LendingAdapter {
    protocol_id: String,
    markets: BTreeMap<Pool, LendingMarket>,
    ltv_bps: u16,
}

impl LendingAdapter {
    pub fn new(protocol_id: impl Into<String>, ltv_bps: u16) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            markets: BTreeMap::new(),
            ltv_bps,
        }
    }

    #[must_use]
    pub fn with_market(mut self, pool: Pool, market: LendingMarket) -> Self {
        self.markets.insert(pool, market);
        self
    }

    pub const fn ltv_bps(&self) -> u16 {
        self.ltv_bps
    }

    fn market(&self, pool: Pool) -> AllocationResult<&LendingMarket> {
        self.markets
            .get(&pool)
            .ok_or_else(|| AllocationError::PoolNotConfigured {
                protocol: self.protocol_id.clone(),
                pool,
            })
    }

    fn receipt(&self, pool: Pool, asset: Asset) -> AllocationResult<Asset> {
        self.market(pool)?
            .reserves
            .get(&asset)
            .copied()
            .ok_or(AllocationError::UnsupportedAsset { pool, asset })
    }

    /// Total debt of `owner` at `pool`, valued in `denomination`.
    fn debt_value(
        &self,
        owner: Address,
        pool: Pool,
        denomination: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let market = self.market(pool)?;
        Ok(market.borrowable.iter().fold(U256::ZERO, |acc, borrowed| {
            let debt = chain.debt_of(pool, *borrowed, owner);
            acc.saturating_add(chain.quote(*borrowed, denomination, debt))
        }))
    }
}

impl ProtocolAdapter for LendingAdapter {
    fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    fn pools(&self) -> Vec<Pool> {
        self.markets.keys().copied().collect()
    }

    fn underlying_tokens(&self, pool: Pool) -> AllocationResult<Vec<Asset>> {
        Ok(self.market(pool)?.reserves.keys().copied().collect())
    }

    fn liquidity_pool_token(&self, asset: Asset, pool: Pool) -> AllocationResult<Asset> {
        self.receipt(pool, asset)
    }

    /// Liquidity of the reserve, held by its receipt token contract.
    fn get_pool_value(
        &self,
        pool: Pool,
        asset: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let receipt = self.receipt(pool, asset)?;
        Ok(chain.balance_of(asset, receipt))
    }

    fn calculate_amount_in_lp_token(
        &self,
        asset: Asset,
        pool: Pool,
        amount: Amount,
        _chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        self.receipt(pool, asset)?;
        Ok(amount)
    }

    fn get_some_amount_in_token(
        &self,
        asset: Asset,
        pool: Pool,
        lp_amount: Amount,
        _chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        self.receipt(pool, asset)?;
        Ok(lp_amount)
    }

    fn withdrawable_lp_amount(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let collateral = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
        let debt = self.debt_value(owner, pool, asset, chain)?;
        // zero ltv: any debt locks every unit of collateral
        if self.ltv_bps == 0 && !debt.is_zero() {
            return Ok(U256::ZERO);
        }
        let locked = mul_div(
            debt,
            U256::from(BPS_DENOMINATOR),
            U256::from(self.ltv_bps),
        );
        Ok(collateral.saturating_sub(locked))
    }

    fn get_deposit_some_instructions(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        amount: Amount,
        caps: &DepositCapPolicy,
        chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        self.receipt(pool, asset)?;
        let amount = self.deposit_amount(owner, asset, pool, amount, caps, chain)?;
        let call = IPool::supplyCall {
            asset,
            amount,
            onBehalfOf: owner,
            referralCode: 0,
        };
        Ok(erc20::approve_and(
            asset,
            pool,
            amount,
            Instruction::call(pool, call.abi_encode(), Action::Deposit),
        ))
    }

    fn get_withdraw_some_instructions(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        lp_amount: Amount,
        _chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        self.receipt(pool, asset)?;
        if lp_amount.is_zero() {
            return Ok(Vec::new());
        }
        let call = IPool::withdrawCall {
            asset,
            amount: lp_amount,
            to: owner,
        };
        Ok(vec![Instruction::call(pool, call.abi_encode(), Action::Withdraw)])
    }
}

impl Borrowing for LendingAdapter {
    fn supported_borrow_assets(&self, pool: Pool) -> AllocationResult<Vec<Asset>> {
        Ok(self.market(pool)?.borrowable.clone())
    }

    fn borrow_capacity(
        &self,
        owner: Address,
        collateral_asset: Asset,
        pool: Pool,
        borrow_asset: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        if !self.market(pool)?.borrowable.contains(&borrow_asset) {
            return Err(AllocationError::UnsupportedBorrowAsset {
                pool,
                asset: borrow_asset,
            });
        }
        let collateral =
            self.get_liquidity_pool_token_balance(owner, collateral_asset, pool, chain)?;
        let max = chain.quote(
            collateral_asset,
            borrow_asset,
            apply_bps(collateral, self.ltv_bps),
        );
        let debt = self.debt_value(owner, pool, borrow_asset, chain)?;
        Ok(max.saturating_sub(debt))
    }

    fn get_borrow_all_instructions(
        &self,
        owner: Address,
        collateral_asset: Asset,
        pool: Pool,
        borrow_asset: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        let amount = self.borrow_capacity(owner, collateral_asset, pool, borrow_asset, chain)?;
        if amount.is_zero() {
            return Ok(Vec::new());
        }
        let call = IPool::borrowCall {
            asset: borrow_asset,
            amount,
            interestRateMode: U256::from(VARIABLE_RATE),
            referralCode: 0,
            onBehalfOf: owner,
        };
        Ok(vec![Instruction::call(pool, call.abi_encode(), Action::Borrow)])
    }

    fn get_repay_all_instructions(
        &self,
        owner: Address,
        pool: Pool,
        borrow_asset: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        self.market(pool)?;
        let debt = self.get_debt(owner, pool, borrow_asset, chain)?;
        let amount = debt.min(chain.balance_of(borrow_asset, owner));
        let call = IPool::repayCall {
            asset: borrow_asset,
            amount,
            interestRateMode: U256::from(VARIABLE_RATE),
            onBehalfOf: owner,
        };
        Ok(erc20::approve_and(
            borrow_asset,
            pool,
            amount,
            Instruction::call(pool, call.abi_encode(), Action::Repay),
        ))
    }
}
