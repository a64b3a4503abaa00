//! Contract bindings for the module and oracle call surface.
//!
//! Everything the adapters encode or decode goes through these `sol!`
//! declarations; no hand-assembled selectors outside this module. The
//! bindings mirror the deployed interfaces — field and argument order is
//! part of the wire contract.

use alloy::sol;

sol! {
    /// Module fronting the binary-question market oracle.
    interface IRealityModule {
        function avatar() external view returns (address);
        function oracle() external view returns (address);
        function questionCooldown() external view returns (uint32);
        function answerExpiration() external view returns (uint32);
        function minimumBond() external view returns (uint256);
        function buildQuestion(string memory proposalId, bytes32[] memory txHashes) external pure returns (string memory);
        function getQuestionId(string memory question, uint256 nonce) external view returns (bytes32);
        function questionIds(bytes32 questionHash) external view returns (bytes32);
        function executedProposalTransactions(bytes32 questionHash, bytes32 txHash) external view returns (bool);
        function addProposal(string memory proposalId, bytes32[] memory txHashes) external;
        function executeProposalWithIndex(
            string memory proposalId,
            bytes32[] memory txHashes,
            address to,
            uint256 value,
            bytes memory data,
            uint8 operation,
            uint256 txIndex
        ) external;
    }

    /// The market oracle itself (escalation-game question market).
    interface IRealityOracle {
        function resultFor(bytes32 questionId) external view returns (bytes32);
        function getFinalizeTS(bytes32 questionId) external view returns (uint32);
        function getBond(bytes32 questionId) external view returns (uint256);
        function getBestAnswer(bytes32 questionId) external view returns (bytes32);
        function getHistoryHash(bytes32 questionId) external view returns (bytes32);
        function isFinalized(bytes32 questionId) external view returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function token() external view returns (address);
        function submitAnswer(bytes32 questionId, bytes32 answer, uint256 maxPrevious) external payable;
        function submitAnswerERC20(bytes32 questionId, bytes32 answer, uint256 maxPrevious, uint256 tokens) external;
        function claimMultipleAndWithdrawBalance(
            bytes32[] memory questionIds,
            uint256[] memory lengths,
            bytes32[] memory historyHashes,
            address[] memory addrs,
            uint256[] memory bonds,
            bytes32[] memory answers
        ) external;
        function withdraw() external;

        event LogNewAnswer(
            bytes32 answer,
            bytes32 indexed questionId,
            bytes32 historyHash,
            address indexed user,
            uint256 bond,
            uint256 ts,
            bool isCommitment
        );
    }

    /// Transaction layout the assertion-governor module hashes and executes.
    struct GovTransaction {
        address to;
        uint8 operation;
        uint256 value;
        bytes data;
    }

    /// Proposal payload carried inside `TransactionsProposed`.
    struct GovProposal {
        GovTransaction[] transactions;
        uint256 requestTime;
    }

    /// Module fronting the optimistic assertion oracle.
    interface IOptimisticGovernor {
        function avatar() external view returns (address);
        function optimisticOracleV3() external view returns (address);
        function rules() external view returns (string memory);
        function bondAmount() external view returns (uint256);
        function liveness() external view returns (uint64);
        function collateral() external view returns (address);
        function proposalHashes(bytes32 proposalHash) external view returns (uint256);
        function assertionIds(bytes32 proposalHash) external view returns (bytes32);
        function proposeTransactions(GovTransaction[] memory transactions, bytes memory explanation) external;
        function executeProposal(GovTransaction[] memory transactions) external;

        event TransactionsProposed(
            address indexed proposer,
            uint256 indexed proposalTime,
            bytes32 indexed assertionId,
            GovProposal proposal,
            bytes32 proposalHash,
            bytes explanation,
            string rules,
            uint256 challengeWindowEnds
        );
        event ProposalExecuted(bytes32 indexed proposalHash, bytes32 indexed assertionId);
        event ProposalDeleted(bytes32 indexed proposalHash, bytes32 indexed assertionId);
    }

    /// Escalation wiring recorded per assertion.
    struct EscalationManagerSettings {
        bool arbitrateViaEscalationManager;
        bool discardOracle;
        bool validateDisputers;
        address assertingCaller;
        address escalationManager;
    }

    /// Full assertion record held by the optimistic oracle.
    struct Assertion {
        EscalationManagerSettings escalationManagerSettings;
        address asserter;
        uint64 assertionTime;
        bool settled;
        address currency;
        uint64 expirationTime;
        bool settlementResolution;
        bytes32 domainId;
        bytes32 identifier;
        uint256 bond;
        address callbackRecipient;
        address disputer;
    }

    /// The optimistic assertion oracle.
    interface IAssertionOracle {
        function getAssertion(bytes32 assertionId) external view returns (Assertion memory);
        function settleAssertion(bytes32 assertionId) external;
        function disputeAssertion(bytes32 assertionId, address disputer) external;
    }

    /// Minimal ERC-20 surface used for bonds.
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string memory);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
