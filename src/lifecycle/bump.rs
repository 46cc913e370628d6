//! Bump decision for accepted posts.

/// Decide whether a new post refreshes its thread's bump timestamp.
///
/// `reply_count` is the number of replies the thread had before this post
/// (the OP is not a reply). A thread bumps until it has accumulated
/// `bump_limit` replies, so the reply that reaches the limit is the last
/// one to bump. `bump_limit` of 0 means unlimited. A poster may suppress
/// the bump entirely ("sage").
pub fn should_bump(reply_count: i32, bump_limit: i32, suppress_bump: bool) -> bool {
    if suppress_bump {
        return false;
    }

    bump_limit == 0 || reply_count < bump_limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bumps_below_limit() {
        assert!(should_bump(0, 300, false));
        assert!(should_bump(299, 300, false));
    }

    #[test]
    fn test_does_not_bump_at_limit() {
        assert!(!should_bump(300, 300, false));
        assert!(!should_bump(301, 300, false));
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        assert!(should_bump(0, 0, false));
        assert!(should_bump(1_000_000, 0, false));
    }

    #[test]
    fn test_sage_never_bumps() {
        assert!(!should_bump(0, 300, true));
        assert!(!should_bump(0, 0, true));
    }

    #[test]
    fn test_limit_boundary() {
        // With a limit of 2, the second reply is the last to bump.
        assert!(should_bump(0, 2, false));
        assert!(should_bump(1, 2, false));
        assert!(!should_bump(2, 2, false));
    }
}
