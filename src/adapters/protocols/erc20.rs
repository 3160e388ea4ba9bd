//! ERC-20 Approvals - Spend Allowance Instructions
//!
//! Every deposit, repay, stake and swap is preceded by an exact-amount
//! `approve` so no standing allowance is left behind after the batch.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::types::{Action, Instruction};

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// `token.approve(spender, amount)`.
pub fn approve(token: Address, spender: Address, amount: U256) -> Instruction {
    let call = IERC20::approveCall { spender, amount };
    Instruction::call(token, call.abi_encode(), Action::Approve)
}

/// `approve` followed by `then`, skipped entirely for a zero amount.
pub fn approve_and(
    token: Address,
    spender: Address,
    amount: U256,
    then: Instruction,
) -> Vec<Instruction> {
    if amount.is_zero() {
        return Vec::new();
    }
    vec![approve(token, spender, amount), then]
}
