//! Stream Subscription Types
//!
//! Domain types naming the ledger push feeds a client can listen to.
//!
//! # Design
//!
//! There are eight feed categories. Each one is listened to independently;
//! the `all` pseudo-category only exists as a [`StreamTarget`] and fans out
//! to every category.
//!
//! Feeds that Horizon can scope to an account are requested under
//! `accounts/{id}/...` when an identity is configured. Ledgers and accounts
//! cannot be scoped and are filtered client-side instead.

use std::fmt;
use std::str::FromStr;

// =============================================================================
// Types
// =============================================================================

/// A ledger push feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamCategory {
    /// Closed ledgers.
    Ledgers,
    /// Transactions.
    Transactions,
    /// Operations.
    Operations,
    /// Payment operations.
    Payments,
    /// Effects.
    Effects,
    /// Account updates.
    Accounts,
    /// Offer updates.
    Offers,
    /// Trades.
    Trades,
}

impl StreamCategory {
    /// Every category, in listen order.
    pub const ALL: [Self; 8] = [
        Self::Ledgers,
        Self::Transactions,
        Self::Operations,
        Self::Payments,
        Self::Effects,
        Self::Accounts,
        Self::Offers,
        Self::Trades,
    ];

    /// Category name as used in configuration and feed paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ledgers => "ledgers",
            Self::Transactions => "transactions",
            Self::Operations => "operations",
            Self::Payments => "payments",
            Self::Effects => "effects",
            Self::Accounts => "accounts",
            Self::Offers => "offers",
            Self::Trades => "trades",
        }
    }

    /// Whether Horizon can scope this feed to one account.
    #[must_use]
    pub const fn is_account_scoped(self) -> bool {
        !matches!(self, Self::Ledgers | Self::Accounts)
    }

    /// Feed path relative to the ledger base URL.
    #[must_use]
    pub fn feed_path(self, identity: Option<&str>) -> String {
        match identity {
            Some(account_id) if self.is_account_scoped() => {
                format!("accounts/{account_id}/{}", self.as_str())
            }
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for StreamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown stream category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stream category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for StreamCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// What a `listen` or `stop` call applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTarget {
    /// Every category.
    All,
    /// A single category.
    One(StreamCategory),
}

impl StreamTarget {
    /// Categories covered by this target.
    #[must_use]
    pub fn categories(self) -> Vec<StreamCategory> {
        match self {
            Self::All => StreamCategory::ALL.to_vec(),
            Self::One(category) => vec![category],
        }
    }
}

impl From<StreamCategory> for StreamTarget {
    fn from(category: StreamCategory) -> Self {
        Self::One(category)
    }
}

impl FromStr for StreamTarget {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::One)
        }
    }
}

/// Lifecycle state of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    /// No connection open.
    #[default]
    Idle,
    /// A connection is open and its messages are being handled.
    Listening,
}

/// Parse a comma separated list of targets into distinct categories.
///
/// Blank entries are ignored; `all` expands to every category.
///
/// # Errors
///
/// Returns the first unknown name.
pub fn parse_categories(list: &str) -> Result<Vec<StreamCategory>, UnknownCategory> {
    let mut categories = Vec::new();
    for part in list.split(',').filter(|p| !p.trim().is_empty()) {
        for category in part.parse::<StreamTarget>()?.categories() {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
    }
    Ok(categories)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(StreamCategory::Ledgers, "ledgers")]
    #[test_case(StreamCategory::Accounts, "accounts")]
    #[test_case(StreamCategory::Transactions, "accounts/GAPP/transactions")]
    #[test_case(StreamCategory::Payments, "accounts/GAPP/payments")]
    #[test_case(StreamCategory::Trades, "accounts/GAPP/trades")]
    fn scoped_feed_paths(category: StreamCategory, expected: &str) {
        assert_eq!(category.feed_path(Some("GAPP")), expected);
    }

    #[test]
    fn unscoped_feed_paths_are_category_names() {
        for category in StreamCategory::ALL {
            assert_eq!(category.feed_path(None), category.as_str());
        }
    }

    #[test]
    fn parse_round_trips_names() {
        for category in StreamCategory::ALL {
            assert_eq!(category.as_str().parse::<StreamCategory>(), Ok(category));
        }
        assert_eq!(" Offers ".parse::<StreamCategory>(), Ok(StreamCategory::Offers));
        assert!("orders".parse::<StreamCategory>().is_err());
    }

    #[test]
    fn all_target_covers_eight_categories() {
        assert_eq!("all".parse::<StreamTarget>(), Ok(StreamTarget::All));
        assert_eq!(StreamTarget::All.categories().len(), 8);
        assert_eq!(
            StreamTarget::from(StreamCategory::Effects).categories(),
            vec![StreamCategory::Effects]
        );
    }

    #[test]
    fn category_list_dedups_and_expands() {
        let parsed = parse_categories("payments, ,effects,payments").unwrap();
        assert_eq!(parsed, vec![StreamCategory::Payments, StreamCategory::Effects]);

        assert_eq!(parse_categories("ledgers,all").unwrap().len(), 8);
        assert!(parse_categories("").unwrap().is_empty());
        assert_eq!(
            parse_categories("ledgers,bogus"),
            Err(UnknownCategory("bogus".to_string()))
        );
    }
}
