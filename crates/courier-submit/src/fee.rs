use std::fmt;

/// Lamports charged per signature on top of any priority fee
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// Compute units assumed when no explicit limit is requested
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

const MICRO_LAMPORTS_PER_LAMPORT: u64 = 1_000_000;

/// Priority fee bid, expressed as a compute unit price in micro-lamports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FeeBid(u64);

impl FeeBid {
    pub const fn from_micro_lamports(micro_lamports: u64) -> Self {
        Self(micro_lamports)
    }

    pub const fn micro_lamports(&self) -> u64 {
        self.0
    }

    /// Upper bound of the priority fee in lamports for a given compute unit limit
    pub fn priority_fee_lamports(&self, compute_unit_limit: u32) -> u64 {
        let micro = (self.0 as u128) * (compute_unit_limit as u128);
        let lamports = micro.div_ceil(MICRO_LAMPORTS_PER_LAMPORT as u128);
        u64::try_from(lamports).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for FeeBid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} micro-lamports/CU", self.0)
    }
}

/// Doubling fee schedule with an optional ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    initial: FeeBid,
    ceiling: Option<FeeBid>,
}

impl FeePolicy {
    pub fn new(initial: FeeBid, ceiling: Option<FeeBid>) -> Self {
        Self { initial, ceiling }
    }

    /// Bid for the first attempt
    pub fn first(&self) -> FeeBid {
        self.cap(self.initial)
    }

    /// Bid for the attempt following `previous`
    pub fn escalate(&self, previous: FeeBid) -> FeeBid {
        self.cap(FeeBid(previous.0.saturating_mul(2)))
    }

    pub fn ceiling(&self) -> Option<FeeBid> {
        self.ceiling
    }

    fn cap(&self, bid: FeeBid) -> FeeBid {
        match self.ceiling {
            Some(ceiling) => bid.min(ceiling),
            None => bid,
        }
    }
}
