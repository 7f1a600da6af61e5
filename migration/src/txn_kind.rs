//! Transaction kinds and the partition each one lives in.
//!
//! Upstream stores transactions in `transaction_partition_NN`, one partition per
//! kind, numbered by the kind's wire value.

/// Number of physical transaction partitions
pub const PARTITION_COUNT: u8 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnKind {
    BlockReward = 1,
    BasicTransfer = 2,
    BitcoinExchange = 3,
    PrivateMessage = 4,
    SubmitPost = 5,
    UpdateProfile = 6,
    Unassigned = 7,
    UpdateBitcoinUsdExchangeRate = 8,
    Follow = 9,
    Like = 10,
    CreatorCoin = 11,
    SwapIdentity = 12,
    UpdateGlobalParams = 13,
    CreatorCoinTransfer = 14,
    CreateNft = 15,
    UpdateNft = 16,
    AcceptNftBid = 17,
    NftBid = 18,
    NftTransfer = 19,
    AcceptNftTransfer = 20,
    BurnNft = 21,
    AuthorizeDerivedKey = 22,
    MessagingGroup = 23,
    DaoCoin = 24,
    DaoCoinTransfer = 25,
    DaoCoinLimitOrder = 26,
    CreateUserAssociation = 27,
    DeleteUserAssociation = 28,
    CreatePostAssociation = 29,
    DeletePostAssociation = 30,
    AccessGroup = 31,
    AccessGroupMembers = 32,
    NewMessage = 33,
}

/// Dashboard groupings of transaction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnCategory {
    CreatorCoin,
    Nft,
    Dex,
    Social,
}

impl TxnKind {
    pub fn partition(self) -> u8 {
        self as u8
    }

    /// `transaction_partition_05` for [`TxnKind::SubmitPost`]
    pub fn partition_table(self) -> String {
        partition_table(self.partition())
    }
}

impl TxnCategory {
    pub fn kinds(self) -> &'static [TxnKind] {
        use TxnKind::*;
        match self {
            TxnCategory::CreatorCoin => &[CreatorCoin, CreatorCoinTransfer],
            TxnCategory::Nft => &[
                CreateNft,
                UpdateNft,
                AcceptNftBid,
                NftBid,
                NftTransfer,
                AcceptNftTransfer,
                BurnNft,
            ],
            TxnCategory::Dex => &[DaoCoin, DaoCoinTransfer, DaoCoinLimitOrder],
            TxnCategory::Social => &[
                PrivateMessage,
                SubmitPost,
                UpdateProfile,
                Follow,
                Like,
                MessagingGroup,
                CreateUserAssociation,
                DeleteUserAssociation,
                CreatePostAssociation,
                DeletePostAssociation,
                AccessGroup,
                AccessGroupMembers,
                NewMessage,
            ],
        }
    }

    /// `get_transaction_count(a) + get_transaction_count(b) + ...` over the category
    pub fn count_expression(self) -> String {
        self.kinds()
            .iter()
            .map(|kind| format!("get_transaction_count({})", kind.partition()))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

pub fn partition_table(partition: u8) -> String {
    format!("transaction_partition_{:02}", partition)
}

/// Parses `transaction_partition_NN` back into its partition number
pub fn parse_partition_table(name: &str) -> Option<u8> {
    let suffix = name.strip_prefix("transaction_partition_")?;
    if suffix.len() != 2 {
        return None;
    }
    let partition: u8 = suffix.parse().ok()?;
    (1..=PARTITION_COUNT).contains(&partition).then_some(partition)
}
