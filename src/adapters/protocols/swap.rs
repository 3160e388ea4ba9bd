//! Swap Router - Reward Liquidation Through a V2-style Router
//!
//! Harvesting converts reward tokens into the strategy asset with
//! `swapExactTokensForTokens`. The minimum output is the oracle quote
//! less the configured slippage.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::types::{Action, Amount, Asset, BPS_DENOMINATOR, Instruction, apply_bps};
use crate::ports::chain_view::ChainView;

use super::erc20;

sol! {
    interface IUniswapV2Router02 {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);
    }
}

/// No deadline: the batch is atomic and executed immediately.
const DEFAULT_DEADLINE: U256 = U256::MAX;

/// Router used to liquidate rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRouter {
    router: Address,
    slippage_bps: u16,
}

impl SwapRouter {
    pub const fn new(router: Address, slippage_bps: u16) -> Self {
        Self {
            router,
            slippage_bps,
        }
    }

    pub const fn address(&self) -> Address {
        self.router
    }

    /// Quote less slippage.
    pub fn min_out(&self, from: Asset, to: Asset, amount: Amount, chain: &dyn ChainView) -> Amount {
        let quoted = chain.quote(from, to, amount);
        apply_bps(quoted, BPS_DENOMINATOR.saturating_sub(self.slippage_bps))
    }

    /// Approve the router and swap `amount` of `from` into `to` for
    /// `recipient`. Empty for a zero amount or identical assets.
    pub fn swap_instructions(
        &self,
        from: Asset,
        to: Asset,
        amount: Amount,
        recipient: Address,
        chain: &dyn ChainView,
    ) -> Vec<Instruction> {
        if amount.is_zero() || from == to {
            return Vec::new();
        }
        let call = IUniswapV2Router02::swapExactTokensForTokensCall {
            amountIn: amount,
            amountOutMin: self.min_out(from, to, amount, chain),
            path: vec![from, to],
            to: recipient,
            deadline: DEFAULT_DEADLINE,
        };
        erc20::approve_and(
            from,
            self.router,
            amount,
            Instruction::call(self.router, call.abi_encode(), Action::Swap),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::chain::ChainSnapshot;
    use alloy::primitives::address;

    const ROUTER: Address = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");
    const CRV: Address = address!("d533a949740bb3306d119cc777fa900ba034cd52");
    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const OWNER: Address = address!("9999999999999999999999999999999999999999");

    #[test]
    fn test_swap_min_out_applies_slippage() {
        let chain = ChainSnapshot::new()
            .with_price(CRV, U256::from(2u64) * U256::from(10u64).pow(U256::from(18u64)))
            .with_price(USDC, U256::from(10u64).pow(U256::from(18u64)));
        let router = SwapRouter::new(ROUTER, 100);

        let ixs = router.swap_instructions(CRV, USDC, U256::from(1000u64), OWNER, &chain);
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].action, Action::Approve);
        assert_eq!(ixs[1].target, ROUTER);

        let call = IUniswapV2Router02::swapExactTokensForTokensCall::abi_decode(&ixs[1].calldata, true)
            .unwrap();
        assert_eq!(call.amountOutMin, U256::from(1980u64));
        assert_eq!(call.path, vec![CRV, USDC]);
        assert_eq!(call.to, OWNER);
    }

    #[test]
    fn test_swap_same_asset_is_noop() {
        let chain = ChainSnapshot::new();
        let router = SwapRouter::new(ROUTER, 50);
        assert!(router.swap_instructions(USDC, USDC, U256::from(5u64), OWNER, &chain).is_empty());
    }
}
