//! Curve Adapter - Multi-coin Stable Pools with Reward Gauges
//!
//! Deposits add single-sided liquidity. Withdrawals redeem
//! proportionally across every coin and swap the non-target coins back
//! through the pool, so the owner ends up holding only the requested
//! asset. Receipt tokens can be staked in the pool's gauge, which pays
//! a reward token that harvesting sells through a router.
//!
//! Pool value is the oracle-quoted sum of the pool's coin reserves.

use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::deposit_cap::DepositCapPolicy;
use crate::domain::error::{AllocationError, AllocationResult};
use crate::domain::types::{
    Action, Amount, Asset, BPS_DENOMINATOR, Instruction, Pool, apply_bps, mul_div,
};
use crate::ports::chain_view::ChainView;
use crate::ports::protocol_adapter::{ProtocolAdapter, RewardBearing, Stakeable};

use super::erc20;
use super::swap::SwapRouter;

sol! {
    interface ICurvePool2 {
        function add_liquidity(uint256[2] amounts, uint256 min_mint_amount) external returns (uint256);
        function remove_liquidity(uint256 amount, uint256[2] min_amounts) external returns (uint256[2]);
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy) external returns (uint256);
    }

    interface ICurvePool3 {
        function add_liquidity(uint256[3] amounts, uint256 min_mint_amount) external;
        function remove_liquidity(uint256 amount, uint256[3] min_amounts) external;
    }

    interface ILiquidityGauge {
        function deposit(uint256 value) external;
        function withdraw(uint256 value) external;
        function claim_rewards() external;
    }
}

/// One Curve pool as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurvePool {
    /// Coins in pool index order (2 or 3).
    pub coins: Vec<Asset>,
    pub lp_token: Asset,
    pub gauge: Option<Address>,
    pub reward_token: Option<Asset>,
}

pub struct CurveAdapter {
    protocol_id: String,
    pools: BTreeMap<Pool, CurvePool>,
    router: SwapRouter,
    slippage_bps: u16,
}

impl CurveAdapter {
    pub fn new(protocol_id: impl Into<String>, router: SwapRouter, slippage_bps: u16) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            pools: BTreeMap::new(),
            router,
            slippage_bps,
        }
    }

    #[must_use]
    pub fn with_pool(mut self, pool: Pool, config: CurvePool) -> Self {
        self.pools.insert(pool, config);
        self
    }

    fn pool(&self, pool: Pool) -> AllocationResult<&CurvePool> {
        self.pools
            .get(&pool)
            .ok_or_else(|| AllocationError::PoolNotConfigured {
                protocol: self.protocol_id.clone(),
                pool,
            })
    }

    fn coin_index(&self, pool: Pool, asset: Asset) -> AllocationResult<usize> {
        self.pool(pool)?
            .coins
            .iter()
            .position(|c| *c == asset)
            .ok_or(AllocationError::UnsupportedAsset { pool, asset })
    }

    fn gauge(&self, pool: Pool) -> AllocationResult<Address> {
        self.pool(pool)?
            .gauge
            .ok_or(AllocationError::StakingUnavailable(pool))
    }

    fn less_slippage(&self, amount: Amount) -> Amount {
        apply_bps(amount, BPS_DENOMINATOR.saturating_sub(self.slippage_bps))
    }

    fn unsupported_size(&self, pool: Pool) -> AllocationError {
        AllocationError::PoolNotConfigured {
            protocol: self.protocol_id.clone(),
            pool,
        }
    }

    /// Coin index as the `int128` the pool ABI takes.
    fn coin_arg(&self, pool: Pool, index: usize) -> AllocationResult<i128> {
        i128::try_from(index).map_err(|_| self.unsupported_size(pool))
    }

    fn encode_add_liquidity(
        &self,
        pool: Pool,
        amounts: &[Amount],
        min_mint_amount: Amount,
    ) -> AllocationResult<Bytes> {
        let calldata = match *amounts {
            [a, b] => ICurvePool2::add_liquidityCall {
                amounts: [a, b],
                min_mint_amount,
            }
            .abi_encode(),
            [a, b, c] => ICurvePool3::add_liquidityCall {
                amounts: [a, b, c],
                min_mint_amount,
            }
            .abi_encode(),
            _ => return Err(self.unsupported_size(pool)),
        };
        Ok(calldata.into())
    }

    fn encode_remove_liquidity(
        &self,
        pool: Pool,
        amount: Amount,
        min_amounts: &[Amount],
    ) -> AllocationResult<Bytes> {
        let calldata = match *min_amounts {
            [a, b] => ICurvePool2::remove_liquidityCall {
                amount,
                min_amounts: [a, b],
            }
            .abi_encode(),
            [a, b, c] => ICurvePool3::remove_liquidityCall {
                amount,
                min_amounts: [a, b, c],
            }
            .abi_encode(),
            _ => return Err(self.unsupported_size(pool)),
        };
        Ok(calldata.into())
    }

    /// Oracle value of the owner's unclaimed rewards, in `asset`.
    fn pending_reward_value(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let config = self.pool(pool)?;
        match (config.gauge, config.reward_token) {
            (Some(gauge), Some(reward)) => {
                Ok(chain.quote(reward, asset, chain.pending_rewards(gauge, owner)))
            }
            _ => Ok(U256::ZERO),
        }
    }

    fn staked_and_loose(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let loose = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
        let staked = match self.pool(pool)?.gauge {
            Some(gauge) => chain.balance_of(gauge, owner),
            None => U256::ZERO,
        };
        Ok(loose.saturating_add(staked))
    }
}

impl ProtocolAdapter for CurveAdapter {
    fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    fn pools(&self) -> Vec<Pool> {
        self.pools.keys().copied().collect()
    }

    fn underlying_tokens(&self, pool: Pool) -> AllocationResult<Vec<Asset>> {
        Ok(self.pool(pool)?.coins.clone())
    }

    fn liquidity_pool_token(&self, asset: Asset, pool: Pool) -> AllocationResult<Asset> {
        self.coin_index(pool, asset)?;
        Ok(self.pool(pool)?.lp_token)
    }

    fn get_pool_value(
        &self,
        pool: Pool,
        asset: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        self.coin_index(pool, asset)?;
        Ok(self.pool(pool)?.coins.iter().fold(U256::ZERO, |acc, coin| {
            acc.saturating_add(chain.quote(*coin, asset, chain.balance_of(*coin, pool)))
        }))
    }

    fn calculate_amount_in_lp_token(
        &self,
        asset: Asset,
        pool: Pool,
        amount: Amount,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let lp_token = self.liquidity_pool_token(asset, pool)?;
        let supply = chain.total_supply(lp_token);
        let value = self.get_pool_value(pool, asset, chain)?;
        if supply.is_zero() || value.is_zero() {
            return Ok(amount);
        }
        Ok(mul_div(amount, supply, value))
    }

    fn get_some_amount_in_token(
        &self,
        asset: Asset,
        pool: Pool,
        lp_amount: Amount,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let lp_token = self.liquidity_pool_token(asset, pool)?;
        let supply = chain.total_supply(lp_token);
        let value = self.get_pool_value(pool, asset, chain)?;
        Ok(mul_div(lp_amount, value, supply))
    }

    fn get_all_amount_in_token(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let lp = self.get_liquidity_pool_token_balance(owner, asset, pool, chain)?;
        let value = self.get_some_amount_in_token(asset, pool, lp, chain)?;
        Ok(value.saturating_add(self.pending_reward_value(owner, asset, pool, chain)?))
    }

    fn get_position_value(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let lp = self.staked_and_loose(owner, asset, pool, chain)?;
        self.get_some_amount_in_token(asset, pool, lp, chain)
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
        let index = self.coin_index(pool, asset)?;
        let amount = self.deposit_amount(owner, asset, pool, amount, caps, chain)?;
        if amount.is_zero() {
            return Ok(Vec::new());
        }
        let mut amounts = vec![U256::ZERO; self.pool(pool)?.coins.len()];
        amounts[index] = amount;
        let min_mint = self.less_slippage(self.calculate_amount_in_lp_token(
            asset, pool, amount, chain,
        )?);
        let calldata = self.encode_add_liquidity(pool, &amounts, min_mint)?;
        Ok(vec![
            erc20::approve(asset, pool, amount),
            Instruction::call(pool, calldata, Action::Deposit),
        ])
    }

    fn get_withdraw_some_instructions(
        &self,
        _owner: Address,
        asset: Asset,
        pool: Pool,
        lp_amount: Amount,
        chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        let target = self.coin_index(pool, asset)?;
        if lp_amount.is_zero() {
            return Ok(Vec::new());
        }
        let config = self.pool(pool)?;
        let supply = chain.total_supply(config.lp_token);
        let min_amounts: Vec<Amount> = config
            .coins
            .iter()
            .map(|coin| {
                let share = mul_div(chain.balance_of(*coin, pool), lp_amount, supply);
                self.less_slippage(share)
            })
            .collect();

        let mut instructions = vec![Instruction::call(
            pool,
            self.encode_remove_liquidity(pool, lp_amount, &min_amounts)?,
            Action::Withdraw,
        )];

        for (j, (coin, received)) in config.coins.iter().zip(&min_amounts).enumerate() {
            if j == target || received.is_zero() {
                continue;
            }
            let min_dy = self.less_slippage(chain.quote(*coin, asset, *received));
            let call = ICurvePool2::exchangeCall {
                i: self.coin_arg(pool, j)?,
                j: self.coin_arg(pool, target)?,
                dx: *received,
                min_dy,
            };
            instructions.push(erc20::approve(*coin, pool, *received));
            instructions.push(Instruction::call(pool, call.abi_encode(), Action::Swap));
        }
        Ok(instructions)
    }
}

impl Stakeable for CurveAdapter {
    fn can_stake(&self, pool: Pool) -> bool {
        self.pools.get(&pool).is_some_and(|p| p.gauge.is_some())
    }

    fn staking_token(&self, pool: Pool) -> AllocationResult<Address> {
        self.gauge(pool)
    }

    fn get_stake_some_instructions(
        &self,
        _owner: Address,
        pool: Pool,
        lp_amount: Amount,
        _chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        let gauge = self.gauge(pool)?;
        let lp_token = self.pool(pool)?.lp_token;
        let call = ILiquidityGauge::depositCall { value: lp_amount };
        Ok(erc20::approve_and(
            lp_token,
            gauge,
            lp_amount,
            Instruction::call(gauge, call.abi_encode(), Action::Stake),
        ))
    }

    fn get_unstake_some_instructions(
        &self,
        _owner: Address,
        pool: Pool,
        amount: Amount,
        _chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        let gauge = self.gauge(pool)?;
        if amount.is_zero() {
            return Ok(Vec::new());
        }
        let call = ILiquidityGauge::withdrawCall { value: amount };
        Ok(vec![Instruction::call(gauge, call.abi_encode(), Action::Unstake)])
    }

    fn get_all_amount_in_token_stake(
        &self,
        owner: Address,
        asset: Asset,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        let lp = self.staked_and_loose(owner, asset, pool, chain)?;
        let value = self.get_some_amount_in_token(asset, pool, lp, chain)?;
        Ok(value.saturating_add(self.pending_reward_value(owner, asset, pool, chain)?))
    }
}

impl RewardBearing for CurveAdapter {
    fn reward_token(&self, pool: Pool) -> AllocationResult<Option<Asset>> {
        let config = self.pool(pool)?;
        Ok(config.gauge.and(config.reward_token))
    }

    fn get_unclaimed_rewards(
        &self,
        owner: Address,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        Ok(self
            .pool(pool)?
            .gauge
            .map_or(U256::ZERO, |gauge| chain.pending_rewards(gauge, owner)))
    }

    fn get_claim_instructions(
        &self,
        owner: Address,
        pool: Pool,
        chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        if self.reward_token(pool)?.is_none()
            || self.get_unclaimed_rewards(owner, pool, chain)?.is_zero()
        {
            return Ok(Vec::new());
        }
        let gauge = self.gauge(pool)?;
        let call = ILiquidityGauge::claim_rewardsCall {};
        Ok(vec![Instruction::call(gauge, call.abi_encode(), Action::Claim)])
    }

    fn get_harvest_some_instructions(
        &self,
        owner: Address,
        pool: Pool,
        to_asset: Asset,
        amount: Amount,
        chain: &dyn ChainView,
    ) -> AllocationResult<Vec<Instruction>> {
        let Some(reward) = self.reward_token(pool)? else {
            return Ok(Vec::new());
        };
        let available = chain
            .balance_of(reward, owner)
            .saturating_add(self.get_unclaimed_rewards(owner, pool, chain)?);
        let mut instructions = self.get_claim_instructions(owner, pool, chain)?;
        instructions.extend(self.router.swap_instructions(
            reward,
            to_asset,
            amount.min(available),
            owner,
            chain,
        ));
        Ok(instructions)
    }
}
