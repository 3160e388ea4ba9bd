//! Multicall Encoding - One Atomic Transaction per Plan
//!
//! Flattens a compiled plan into a single `Multicall3.aggregate3Value`
//! call with `allowFailure = false` on every inner call, so the whole
//! plan reverts if any instruction does.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::domain::types::{CompiledPlan, Instruction};

sol! {
    interface IMulticall3 {
        struct Call3Value {
            address target;
            bool allowFailure;
            uint256 value;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3Value(Call3Value[] calldata calls) external payable returns (Result[] memory returnData);
    }
}

/// A plan encoded as one transaction to the multicall contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub to: Address,
    pub value: U256,
    pub calldata: Bytes,
}

fn to_call(instruction: &Instruction) -> IMulticall3::Call3Value {
    IMulticall3::Call3Value {
        target: instruction.target,
        allowFailure: false,
        value: instruction.value,
        callData: instruction.calldata.clone(),
    }
}

/// Encode every instruction of `plan`, in order, for `multicall`.
pub fn encode_plan(multicall: Address, plan: &CompiledPlan) -> EncodedBatch {
    let instructions = plan.instructions();
    let value = instructions
        .iter()
        .fold(U256::ZERO, |acc, i| acc.saturating_add(i.value));
    let call = IMulticall3::aggregate3ValueCall {
        calls: instructions.iter().map(to_call).collect(),
    };
    EncodedBatch {
        to: multicall,
        value,
        calldata: call.abi_encode().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, address};

    use crate::adapters::protocols::erc20;
    use crate::domain::types::{GroupKind, InstructionGroup, Operation};

    #[test]
    fn test_encode_preserves_order_and_atomicity() {
        let token = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        let spender = address!("1111111111111111111111111111111111111111");
        let first = erc20::approve(token, spender, U256::from(1u64));
        let second = erc20::approve(token, spender, U256::from(2u64));
        let plan = CompiledPlan {
            strategy: B256::ZERO,
            operation: Operation::DepositAll,
            groups: vec![InstructionGroup {
                step_index: 0,
                pool: spender,
                kind: GroupKind::Deposit,
                instructions: vec![first.clone(), second.clone()],
            }],
        };

        let multicall = address!("ca11bde05977b3631167028862be2a173976ca11");
        let encoded = encode_plan(multicall, &plan);
        assert_eq!(encoded.to, multicall);
        assert_eq!(encoded.value, U256::ZERO);
        assert_eq!(
            &encoded.calldata[..4],
            IMulticall3::aggregate3ValueCall::SELECTOR.as_slice()
        );

        let decoded = IMulticall3::aggregate3ValueCall::abi_decode(&encoded.calldata, true).unwrap();
        assert_eq!(decoded.calls.len(), 2);
        assert!(decoded.calls.iter().all(|c| !c.allowFailure));
        assert_eq!(decoded.calls[0].callData, first.calldata);
        assert_eq!(decoded.calls[1].callData, second.calldata);
    }
}
