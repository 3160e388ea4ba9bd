//! ERC-4626 Adapter - Tokenized Share-price Vaults
//!
//! The vault is both the pool and its receipt token. Share price is
//! `total assets / total supply`, where total assets is the vault's
//! balance of its underlying.

use std::collections::BTreeMap;

use alloy::primitives::Address;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::deposit_cap::DepositCapPolicy;
use crate::domain::error::{AllocationError, AllocationResult};
use crate::domain::types::{Action, Amount, Asset, Instruction, Pool, mul_div};
use crate::ports::chain_view::ChainView;
use crate::ports::protocol_adapter::ProtocolAdapter;

use super::erc20;

sol! {
    interface IERC4626 {
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
    }
}

pub struct Erc4626Adapter {
    protocol_id: String,
    /// vault → underlying asset
    vaults: BTreeMap<Pool, Asset>,
}

impl Erc4626Adapter {
    pub fn new(protocol_id: impl Into<String>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            vaults: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_vault(mut self, vault: Pool, asset: Asset) -> Self {
        self.vaults.insert(vault, asset);
        self
    }

    fn vault_asset(&self, pool: Pool) -> AllocationResult<Asset> {
        self.vaults
            .get(&pool)
            .copied()
            .ok_or_else(|| AllocationError::PoolNotConfigured {
                protocol: self.protocol_id.clone(),
                pool,
            })
    }

    fn checked_asset(&self, pool: Pool, asset: Asset) -> AllocationResult<()> {
        if self.vault_asset(pool)? == asset {
            Ok(())
        } else {
            Err(AllocationError::UnsupportedAsset { pool, asset })
        }
    }

    fn total_assets(&self, pool: Pool, chain: &dyn ChainView) -> AllocationResult<Amount> {
        Ok(chain.balance_of(self.vault_asset(pool)?, pool))
    }
}

impl ProtocolAdapter for Erc4626Adapter {
    fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    fn pools(&self) -> Vec<Pool> {
        self.vaults.keys().copied().collect()
    }

    fn underlying_tokens(&self, pool: Pool) -> AllocationResult<Vec<Asset>> {
        Ok(vec![self.vault_asset(pool)?])
    }

    fn liquidity_pool_token(&self, asset: Asset, pool: Pool) -> AllocationResult<Asset> {
        self.checked_asset(pool, asset)?;
        Ok(pool)
    }

    fn get_pool_value(
        &self,
        pool: Pool,
        asset: Asset,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        self.checked_asset(pool, asset)?;
        self.total_assets(pool, chain)
    }

    fn calculate_amount_in_lp_token(
        &self,
        asset: Asset,
        pool: Pool,
        amount: Amount,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        self.checked_asset(pool, asset)?;
        let supply = chain.total_supply(pool);
        let assets = self.total_assets(pool, chain)?;
        if supply.is_zero() || assets.is_zero() {
            return Ok(amount);
        }
        Ok(mul_div(amount, supply, assets))
    }

    fn get_some_amount_in_token(
        &self,
        asset: Asset,
        pool: Pool,
        lp_amount: Amount,
        chain: &dyn ChainView,
    ) -> AllocationResult<Amount> {
        self.checked_asset(pool, asset)?;
        let supply = chain.total_supply(pool);
        Ok(mul_div(lp_amount, self.total_assets(pool, chain)?, supply))
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
        self.checked_asset(pool, asset)?;
        let amount = self.deposit_amount(owner, asset, pool, amount, caps, chain)?;
        let call = IERC4626::depositCall {
            assets: amount,
            receiver: owner,
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
        self.checked_asset(pool, asset)?;
        if lp_amount.is_zero() {
            return Ok(Vec::new());
        }
        let call = IERC4626::redeemCall {
            shares: lp_amount,
            receiver: owner,
            owner,
        };
        Ok(vec![Instruction::call(pool, call.abi_encode(), Action::Withdraw)])
    }
}

impl Default for Erc4626Adapter {
    fn default() -> Self {
        Self::new("erc4626")
    }
}
