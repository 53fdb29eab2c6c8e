//! Contract bindings

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IScalarGateway {
        function sendToken(
            string calldata destinationChain,
            string calldata destinationAddress,
            string calldata symbol,
            uint256 amount
        ) external;

        function callContractWithToken(
            string calldata destinationChain,
            string calldata contractAddress,
            bytes calldata payload,
            string calldata symbol,
            uint256 amount
        ) external;

        function tokenAddresses(string memory symbol) external view returns (address);
    }

    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}
