//! Page order planning
//!
//! Which pages a session shows depends only on the connection mode and
//! whether the assistant still needs its first-run bootstrap chat.

use super::types::{ConnectionMode, WizardPage};

use WizardPage::*;

/// Ordered pages for the given mode. Always strictly increasing by page id.
pub fn page_order(mode: ConnectionMode, needs_bootstrap: bool) -> Vec<WizardPage> {
    match mode {
        // Remote setups skip local auth and workspace pages
        ConnectionMode::Remote => {
            if needs_bootstrap {
                vec![Welcome, Connection, Permissions, Chat, Finish]
            } else {
                vec![Welcome, Connection, Permissions, Finish]
            }
        }
        ConnectionMode::Unconfigured => {
            if needs_bootstrap {
                vec![Welcome, Connection, Chat, Finish]
            } else {
                vec![Welcome, Connection, Finish]
            }
        }
        ConnectionMode::Local => {
            if needs_bootstrap {
                vec![Welcome, Connection, Auth, Permissions, Workspace, Chat, Finish]
            } else {
                vec![Welcome, Connection, Auth, Permissions, Workspace, Finish]
            }
        }
    }
}

/// Position in `new_order` for a user who was on `page` at `index` in the
/// previous order.
///
/// Keeps the same page when it survives; otherwise stays at the same index,
/// clamped to the last page.
pub fn reconcile_position(page: WizardPage, index: usize, new_order: &[WizardPage]) -> usize {
    debug_assert!(!new_order.is_empty(), "page order is never empty");
    new_order
        .iter()
        .position(|p| *p == page)
        .unwrap_or_else(|| index.min(new_order.len().saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ConnectionMode::Remote, true, &[0, 1, 5, 8, 9])]
    #[case(ConnectionMode::Remote, false, &[0, 1, 5, 9])]
    #[case(ConnectionMode::Unconfigured, true, &[0, 1, 8, 9])]
    #[case(ConnectionMode::Unconfigured, false, &[0, 1, 9])]
    #[case(ConnectionMode::Local, true, &[0, 1, 2, 5, 6, 8, 9])]
    #[case(ConnectionMode::Local, false, &[0, 1, 2, 5, 6, 9])]
    fn test_page_order_table(
        #[case] mode: ConnectionMode,
        #[case] needs_bootstrap: bool,
        #[case] expected: &[u8],
    ) {
        let ids: Vec<u8> = page_order(mode, needs_bootstrap)
            .iter()
            .map(|p| p.id())
            .collect();
        assert_eq!(ids, expected);
    }

    #[rstest]
    fn test_page_order_strictly_increasing(
        #[values(ConnectionMode::Remote, ConnectionMode::Unconfigured, ConnectionMode::Local)]
        mode: ConnectionMode,
        #[values(true, false)] needs_bootstrap: bool,
    ) {
        let order = page_order(mode, needs_bootstrap);
        assert!(order.windows(2).all(|w| w[0].id() < w[1].id()));
        assert_eq!(order.first(), Some(&Welcome));
        assert_eq!(order.last(), Some(&Finish));
    }

    #[test]
    fn test_reconcile_keeps_surviving_page() {
        let old = page_order(ConnectionMode::Local, true);
        let new = page_order(ConnectionMode::Remote, true);
        let idx = old.iter().position(|p| *p == Permissions).unwrap();
        assert_eq!(new[reconcile_position(Permissions, idx, &new)], Permissions);
    }

    #[test]
    fn test_reconcile_dropped_chat_goes_to_finish() {
        let old = page_order(ConnectionMode::Remote, true);
        let new = page_order(ConnectionMode::Remote, false);
        let idx = old.iter().position(|p| *p == Chat).unwrap();
        assert_eq!(new[reconcile_position(Chat, idx, &new)], Finish);
    }

    #[test]
    fn test_reconcile_dropped_auth_stays_at_index() {
        let old = page_order(ConnectionMode::Local, false);
        let new = page_order(ConnectionMode::Remote, false);
        let idx = old.iter().position(|p| *p == Auth).unwrap();
        assert_eq!(reconcile_position(Auth, idx, &new), 2);
        assert_eq!(new[2], Permissions);
    }

    #[test]
    fn test_reconcile_clamps_to_last() {
        let old = page_order(ConnectionMode::Local, true);
        let new = page_order(ConnectionMode::Unconfigured, false);
        let idx = old.iter().position(|p| *p == Workspace).unwrap();
        assert_eq!(reconcile_position(Workspace, idx, &new), new.len() - 1);
    }
}
